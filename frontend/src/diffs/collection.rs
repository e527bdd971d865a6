//! Paged list of the differences inside one heatmap bucket

use crate::connection::{DiffaApi, DiffsQuery, FetchError};
use crate::dataflow::Relay;
use crate::logging::log_error;
use crate::router::BlobSelection;
use futures::channel::mpsc::UnboundedReceiver;
use shared::{DiffEvent, format_timestamp};
use std::rc::Rc;
use zoon::{Mutable, Signal};

#[derive(Debug, Clone, PartialEq)]
pub enum DiffsEvent {
    /// The event list was replaced.
    Reset,
    SelectedEventChanged(Option<DiffEvent>),
    PageChanged(u32),
    TotalEventsChanged(u64),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffsState {
    pub range: Option<BlobSelection>,
    pub page: u32,
    pub events: Vec<DiffEvent>,
    /// `seq_id` of the selected event.
    pub selected: Option<String>,
    pub total_events: u64,
    pub total_pages: u32,
    pub last_seq_id: Option<String>,
}

impl DiffsState {
    pub fn selected_event(&self) -> Option<&DiffEvent> {
        let selected = self.selected.as_deref()?;
        self.events.iter().find(|event| event.seq_id == selected)
    }

    fn position_of_selected(&self) -> Option<usize> {
        let selected = self.selected.as_deref()?;
        self.events.iter().position(|event| event.seq_id == selected)
    }

    /// `Showing <first> - <last> of <total> differences`, 1-based.
    pub fn summary(&self, list_size: u32) -> String {
        let first = u64::from(self.page) * u64::from(list_size) + 1;
        let last = (first + u64::from(list_size) - 1).min(self.total_events);
        format!(
            "Showing {first} - {last} of {} differences",
            self.total_events
        )
    }

    pub fn has_several_pages(&self) -> bool {
        self.total_pages > 1
    }
}

pub struct DiffsCollection<A> {
    api: Rc<A>,
    list_size: u32,
    state: Mutable<DiffsState>,
    pub diffs_changed_relay: Relay<DiffsEvent>,
}

impl<A> Clone for DiffsCollection<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            list_size: self.list_size,
            state: self.state.clone(),
            diffs_changed_relay: self.diffs_changed_relay.clone(),
        }
    }
}

impl<A> DiffsCollection<A>
where
    A: DiffaApi + 'static,
{
    pub fn new(api: Rc<A>, list_size: u32) -> Self {
        Self {
            api,
            list_size: list_size.max(1),
            state: Mutable::new(DiffsState::default()),
            diffs_changed_relay: Relay::new(),
        }
    }

    pub fn list_size(&self) -> u32 {
        self.list_size
    }

    pub fn snapshot(&self) -> DiffsState {
        self.state.get_cloned()
    }

    pub fn state_signal(&self) -> impl Signal<Item = DiffsState> + use<A> {
        self.state.signal_cloned()
    }

    pub fn subscribe(&self) -> UnboundedReceiver<DiffsEvent> {
        self.diffs_changed_relay.subscribe()
    }

    pub fn selected_event(&self) -> Option<DiffEvent> {
        self.state.lock_ref().selected_event().cloned()
    }

    fn current_query(&self) -> Option<DiffsQuery> {
        let state = self.state.lock_ref();
        let range = state.range.as_ref()?;
        Some(DiffsQuery {
            pair_key: range.pair_key.clone(),
            range_start: format_timestamp(range.start),
            range_end: format_timestamp(range.end),
            offset: state.page * self.list_size,
            length: self.list_size,
        })
    }

    /// Reloads the current page.
    ///
    /// Unless `force` is set, a page whose `seqId` matches the last one seen
    /// is left alone. A page past the end moves back to the last page.
    pub async fn sync(&self, force: bool) -> Result<(), FetchError> {
        let mut force = force;
        loop {
            let Some(query) = self.current_query() else {
                self.state.lock_mut().events.clear();
                self.diffs_changed_relay.send(DiffsEvent::Reset);
                return Ok(());
            };

            let page = match self.api.diffs(&query).await {
                Ok(page) => page,
                Err(error) => {
                    if !error.is_stale() {
                        log_error!("Failed to load differences: {error}");
                    }
                    return Err(error);
                }
            };
            // Range or page changed while this request was in flight.
            if self.current_query().as_ref() != Some(&query) {
                return Err(FetchError::StaleResponse);
            }
            if !force && page.seq_id == self.state.lock_ref().last_seq_id {
                return Ok(());
            }

            let list_size = self.list_size;
            let (total_changed, selection_changed, last_page) = {
                let mut state = self.state.lock_mut();
                let total_changed = (state.total_events != page.total).then(|| {
                    state.total_events = page.total;
                    state.total_pages = page.total.div_ceil(u64::from(list_size)) as u32;
                    page.total
                });
                state.events = page.diffs;
                state.last_seq_id = page.seq_id;

                let selection_changed = state.selected_event().is_none().then(|| {
                    let first = state.events.first().map(|event| event.seq_id.clone());
                    state.selected = first;
                    state.selected_event().cloned()
                });

                let last_page = (state.total_pages > 0 && state.page >= state.total_pages)
                    .then(|| state.total_pages - 1);
                if let Some(last_page) = last_page {
                    state.page = last_page;
                }
                (total_changed, selection_changed, last_page)
            };

            if let Some(total) = total_changed {
                self.diffs_changed_relay.send(DiffsEvent::TotalEventsChanged(total));
            }
            self.diffs_changed_relay.send(DiffsEvent::Reset);
            if let Some(selected) = selection_changed {
                self.diffs_changed_relay
                    .send(DiffsEvent::SelectedEventChanged(selected));
            }

            match last_page {
                Some(last_page) => {
                    self.diffs_changed_relay.send(DiffsEvent::PageChanged(last_page));
                    force = true;
                }
                None => return Ok(()),
            }
        }
    }

    /// Shows the first page of the differences in `range`.
    pub async fn select(&self, range: BlobSelection) -> Result<(), FetchError> {
        self.state.lock_mut().range = Some(range);
        self.set_page(0, true).await
    }

    /// Selects the event with `seq_id`; unknown ids clear the selection.
    pub fn select_event(&self, seq_id: Option<&str>) {
        let selected = {
            let mut state = self.state.lock_mut();
            let known = seq_id
                .filter(|id| state.events.iter().any(|event| event.seq_id == *id))
                .map(str::to_string);
            state.selected = known;
            state.selected_event().cloned()
        };
        self.diffs_changed_relay
            .send(DiffsEvent::SelectedEventChanged(selected));
    }

    pub fn select_next_event(&self) {
        self.select_event_with_offset(1);
    }

    pub fn select_previous_event(&self) {
        self.select_event_with_offset(-1);
    }

    /// Moves the selection within the current page; never wraps.
    fn select_event_with_offset(&self, offset: isize) {
        let target = {
            let state = self.state.lock_ref();
            state
                .position_of_selected()
                .and_then(|index| index.checked_add_signed(offset))
                .and_then(|index| state.events.get(index))
                .map(|event| event.seq_id.clone())
        };
        if let Some(seq_id) = target {
            self.select_event(Some(&seq_id));
        }
    }

    pub async fn next_page(&self) -> Result<(), FetchError> {
        let (page, total_pages) = {
            let state = self.state.lock_ref();
            (state.page, state.total_pages)
        };
        if page + 1 < total_pages {
            self.set_page(page + 1, false).await
        } else {
            Ok(())
        }
    }

    pub async fn previous_page(&self) -> Result<(), FetchError> {
        let page = self.state.lock_ref().page;
        if page > 0 {
            self.set_page(page - 1, false).await
        } else {
            Ok(())
        }
    }

    pub async fn set_page(&self, page: u32, force: bool) -> Result<(), FetchError> {
        let changed = {
            let mut state = self.state.lock_mut();
            let changed = force || state.page != page;
            state.page = page;
            changed
        };
        if !changed {
            return Ok(());
        }
        self.diffs_changed_relay.send(DiffsEvent::PageChanged(page));
        self.sync(true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ApiCall, FakeApi};
    use chrono::{TimeZone, Utc};
    use shared::{DiffsPage, PairRef, VersionId};

    fn event(seq_id: &str) -> DiffEvent {
        DiffEvent {
            seq_id: seq_id.to_string(),
            obj_id: VersionId {
                pair: PairRef {
                    key: "WEB-1".to_string(),
                },
                id: format!("item-{seq_id}"),
            },
            detected_at: "2024-01-01T05:10:00Z".to_string(),
            upstream_vsn: Some("v1".to_string()),
            downstream_vsn: Some("v2".to_string()),
        }
    }

    fn page(seq_ids: &[&str], total: u64, seq_id: &str) -> DiffsPage {
        DiffsPage {
            diffs: seq_ids.iter().map(|id| event(id)).collect(),
            total,
            seq_id: Some(seq_id.to_string()),
        }
    }

    fn range() -> BlobSelection {
        BlobSelection {
            pair_key: "WEB-1".to_string(),
            start: Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 1, 6, 0, 0).unwrap(),
        }
    }

    fn collection() -> (Rc<FakeApi>, DiffsCollection<FakeApi>) {
        let api = Rc::new(FakeApi::default());
        let collection = DiffsCollection::new(api.clone(), 2);
        (api, collection)
    }

    fn drain(stream: &mut UnboundedReceiver<DiffsEvent>) -> Vec<DiffsEvent> {
        let mut events = Vec::new();
        while let Ok(Some(event)) = stream.try_next() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn sync_without_range_resets_to_empty() {
        let (api, collection) = collection();
        let mut events = collection.subscribe();

        collection.sync(false).await.unwrap();

        assert!(api.calls().is_empty());
        assert_eq!(drain(&mut events), [DiffsEvent::Reset]);
    }

    #[tokio::test]
    async fn selecting_a_range_loads_the_first_page() {
        let (api, collection) = collection();
        let mut events = collection.subscribe();
        api.respond_diffs(Ok(page(&["1", "2"], 5, "10")));

        collection.select(range()).await.unwrap();

        assert_eq!(
            api.calls(),
            [ApiCall::Diffs(DiffsQuery {
                pair_key: "WEB-1".to_string(),
                range_start: "20240101T050000Z".to_string(),
                range_end: "20240101T060000Z".to_string(),
                offset: 0,
                length: 2,
            })]
        );
        let state = collection.snapshot();
        assert_eq!(state.total_pages, 3);
        assert_eq!(state.selected.as_deref(), Some("1"));
        assert_eq!(state.summary(2), "Showing 1 - 2 of 5 differences");
        assert_eq!(
            drain(&mut events),
            [
                DiffsEvent::PageChanged(0),
                DiffsEvent::TotalEventsChanged(5),
                DiffsEvent::Reset,
                DiffsEvent::SelectedEventChanged(Some(event("1"))),
            ]
        );
    }

    #[tokio::test]
    async fn unchanged_sequence_is_skipped_unless_forced() {
        let (api, collection) = collection();
        api.respond_diffs(Ok(page(&["1"], 1, "10")));
        api.respond_diffs(Ok(page(&["9"], 1, "10")));
        collection.select(range()).await.unwrap();
        let mut events = collection.subscribe();

        collection.sync(false).await.unwrap();

        assert_eq!(collection.snapshot().events, [event("1")]);
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test]
    async fn vanished_selection_moves_to_the_first_event() {
        let (api, collection) = collection();
        api.respond_diffs(Ok(page(&["1", "2"], 2, "10")));
        api.respond_diffs(Ok(page(&["3"], 1, "11")));
        collection.select(range()).await.unwrap();
        collection.select_event(Some("2"));

        collection.sync(false).await.unwrap();

        assert_eq!(collection.selected_event(), Some(event("3")));
    }

    #[tokio::test]
    async fn empty_page_clears_the_selection() {
        let (api, collection) = collection();
        api.respond_diffs(Ok(page(&["1"], 1, "10")));
        api.respond_diffs(Ok(page(&[], 0, "11")));
        collection.select(range()).await.unwrap();
        let mut events = collection.subscribe();

        collection.sync(false).await.unwrap();

        assert_eq!(collection.selected_event(), None);
        assert_eq!(
            drain(&mut events),
            [
                DiffsEvent::TotalEventsChanged(0),
                DiffsEvent::Reset,
                DiffsEvent::SelectedEventChanged(None),
            ]
        );
    }

    #[tokio::test]
    async fn page_beyond_the_end_moves_back_to_the_last_page() {
        let (api, collection) = collection();
        api.respond_diffs(Ok(page(&["1", "2"], 6, "10")));
        api.respond_diffs(Ok(page(&["5", "6"], 6, "10")));
        api.respond_diffs(Ok(page(&["3"], 3, "12")));
        api.respond_diffs(Ok(page(&["3"], 3, "12")));
        collection.select(range()).await.unwrap();
        collection.set_page(2, false).await.unwrap();

        collection.sync(false).await.unwrap();

        let state = collection.snapshot();
        assert_eq!(state.page, 1);
        assert_eq!(state.total_pages, 2);
        let offsets: Vec<u32> = api
            .calls()
            .iter()
            .filter_map(|call| match call {
                ApiCall::Diffs(query) => Some(query.offset),
                _ => None,
            })
            .collect();
        assert_eq!(offsets, [0, 4, 4, 2]);
    }

    #[tokio::test]
    async fn paging_stays_within_bounds() {
        let (api, collection) = collection();
        api.respond_diffs(Ok(page(&["1", "2"], 3, "10")));
        api.respond_diffs(Ok(page(&["3"], 3, "10")));
        collection.select(range()).await.unwrap();

        collection.previous_page().await.unwrap();
        collection.next_page().await.unwrap();
        collection.next_page().await.unwrap();

        assert_eq!(collection.snapshot().page, 1);
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test]
    async fn keyboard_selection_does_not_wrap() {
        let (api, collection) = collection();
        api.respond_diffs(Ok(page(&["1", "2"], 2, "10")));
        collection.select(range()).await.unwrap();

        collection.select_previous_event();
        assert_eq!(collection.snapshot().selected.as_deref(), Some("1"));
        collection.select_next_event();
        collection.select_next_event();
        assert_eq!(collection.snapshot().selected.as_deref(), Some("2"));
    }

    #[test]
    fn summary_is_clamped_to_the_total() {
        let state = DiffsState {
            page: 2,
            total_events: 45,
            total_pages: 3,
            ..DiffsState::default()
        };
        assert_eq!(state.summary(20), "Showing 41 - 45 of 45 differences");
        assert!(state.has_several_pages());
    }
}
