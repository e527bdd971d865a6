//! Content and metadata of the selected difference

use crate::connection::{DiffaApi, FetchError};
use crate::logging::log_error;
use futures::future::{AbortHandle, Abortable, Aborted};
use shared::{ContentSide, DiffEvent, PairDetails, RepairAction};
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::Rc;
use zoon::{Mutable, Signal};

pub const CONTENT_FAILED: &str = "Content retrieval failed";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailState {
    pub event: Option<DiffEvent>,
    pub pair_details: Option<PairDetails>,
    pub upstream_content: String,
    pub downstream_content: String,
    pub actions: Vec<RepairAction>,
}

impl DetailState {
    pub fn heading(&self) -> String {
        match &self.event {
            Some(event) => format!("Content for item ID: {}", event.obj_id.id),
            None => "No item selected".to_string(),
        }
    }

    pub fn label(&self, side: ContentSide) -> String {
        let name = self.pair_details.as_ref().and_then(|details| match side {
            ContentSide::Upstream => details.upstream_name.clone(),
            ContentSide::Downstream => details.downstream_name.clone(),
        });
        name.unwrap_or_else(|| side.as_str().to_string())
    }

    pub fn version(&self, side: ContentSide) -> String {
        self.event
            .as_ref()
            .and_then(|event| match side {
                ContentSide::Upstream => event.upstream_vsn.clone(),
                ContentSide::Downstream => event.downstream_vsn.clone(),
            })
            .filter(|version| !version.is_empty())
            .unwrap_or_else(|| "no version".to_string())
    }

    pub fn content(&self, side: ContentSide) -> &str {
        match side {
            ContentSide::Upstream => &self.upstream_content,
            ContentSide::Downstream => &self.downstream_content,
        }
    }

    fn content_mut(&mut self, side: ContentSide) -> &mut String {
        match side {
            ContentSide::Upstream => &mut self.upstream_content,
            ContentSide::Downstream => &mut self.downstream_content,
        }
    }

    fn shows(&self, seq_id: &str) -> bool {
        self.event.as_ref().is_some_and(|event| event.seq_id == seq_id)
    }
}

/// One pending content request per side.
#[derive(Default)]
struct PendingContent {
    upstream: Option<AbortHandle>,
    downstream: Option<AbortHandle>,
}

impl PendingContent {
    /// Registers `handle` for `side` and aborts the request it replaces.
    fn supersede(&mut self, side: ContentSide, handle: Option<AbortHandle>) {
        let slot = match side {
            ContentSide::Upstream => &mut self.upstream,
            ContentSide::Downstream => &mut self.downstream,
        };
        if let Some(previous) = std::mem::replace(slot, handle) {
            previous.abort();
        }
    }
}

pub struct DiffDetail<A> {
    api: Rc<A>,
    state: Mutable<DetailState>,
    pair_cache: Rc<RefCell<HashMap<String, PairDetails>>>,
    pending: Rc<RefCell<PendingContent>>,
}

impl<A> Clone for DiffDetail<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            state: self.state.clone(),
            pair_cache: self.pair_cache.clone(),
            pending: self.pending.clone(),
        }
    }
}

impl<A> DiffDetail<A>
where
    A: DiffaApi + 'static,
{
    pub fn new(api: Rc<A>) -> Self {
        Self {
            api,
            state: Mutable::new(DetailState::default()),
            pair_cache: Rc::new(RefCell::new(HashMap::new())),
            pending: Rc::new(RefCell::new(PendingContent::default())),
        }
    }

    pub fn snapshot(&self) -> DetailState {
        self.state.get_cloned()
    }

    pub fn state_signal(&self) -> impl Signal<Item = DetailState> + use<A> {
        self.state.signal_cloned()
    }

    /// Switches the panel to `event` and returns the loading work.
    ///
    /// Content requests still pending for the previous event are aborted
    /// before this returns; their late results never reach the state.
    pub fn show(&self, event: Option<DiffEvent>) -> impl Future<Output = ()> + use<A> {
        let cached_details = event
            .as_ref()
            .and_then(|event| self.pair_cache.borrow().get(event.pair_key()).cloned());
        {
            let mut state = self.state.lock_mut();
            let same_pair = match (&state.event, &event) {
                (Some(shown), Some(next)) => shown.pair_key() == next.pair_key(),
                _ => false,
            };
            if !same_pair {
                state.actions.clear();
            }
            state.pair_details = cached_details.clone();
            state.upstream_content.clear();
            state.downstream_content.clear();
            state.event = event.clone();
        }

        let Some(event) = event else {
            let mut pending = self.pending.borrow_mut();
            pending.supersede(ContentSide::Upstream, None);
            pending.supersede(ContentSide::Downstream, None);
            return futures::future::Either::Left(async {});
        };

        let upstream = self.load_content(&event, ContentSide::Upstream);
        let downstream = self.load_content(&event, ContentSide::Downstream);
        let details = cached_details
            .is_none()
            .then(|| self.load_pair_details(&event));
        let actions = self.load_actions(&event);

        futures::future::Either::Right(async move {
            let details = async move {
                if let Some(details) = details {
                    details.await;
                }
            };
            futures::join!(upstream, downstream, details, actions);
        })
    }

    fn load_content(
        &self,
        event: &DiffEvent,
        side: ContentSide,
    ) -> impl Future<Output = ()> + use<A> {
        let (handle, registration) = AbortHandle::new_pair();
        self.pending.borrow_mut().supersede(side, Some(handle));

        let api = self.api.clone();
        let state = self.state.clone();
        let seq_id = event.seq_id.clone();
        let request = Abortable::new(
            async move { api.event_content(&seq_id, side).await },
            registration,
        );
        async move {
            let content = match request.await {
                Err(Aborted) => return,
                Ok(Err(error)) if error.is_stale() => return,
                Ok(Err(error)) => {
                    log_error!("Failed to load {} content: {error}", side.as_str());
                    CONTENT_FAILED.to_string()
                }
                Ok(Ok(content)) => content
                    .filter(|content| !content.is_empty())
                    .unwrap_or_else(|| format!("no content found for {}", side.as_str())),
            };
            *state.lock_mut().content_mut(side) = content;
        }
    }

    fn load_pair_details(&self, event: &DiffEvent) -> impl Future<Output = ()> + use<A> {
        let api = self.api.clone();
        let state = self.state.clone();
        let cache = self.pair_cache.clone();
        let pair_key = event.pair_key().to_string();
        async move {
            match api.pair_details(&pair_key).await {
                Ok(details) => {
                    cache.borrow_mut().insert(pair_key.clone(), details.clone());
                    let mut state = state.lock_mut();
                    let still_shown = state
                        .event
                        .as_ref()
                        .is_some_and(|event| event.pair_key() == pair_key);
                    if still_shown {
                        state.pair_details = Some(details);
                    }
                }
                Err(error) if error.is_stale() => {}
                Err(error) => log_error!("Failed to load pair {pair_key}: {error}"),
            }
        }
    }

    fn load_actions(&self, event: &DiffEvent) -> impl Future<Output = ()> + use<A> {
        let api = self.api.clone();
        let state = self.state.clone();
        let pair_key = event.pair_key().to_string();
        let seq_id = event.seq_id.clone();
        async move {
            match api.entity_actions(&pair_key).await {
                Ok(actions) => {
                    let mut state = state.lock_mut();
                    if state.shows(&seq_id) {
                        state.actions = actions;
                    }
                }
                Err(error) if error.is_stale() => {}
                Err(error) => log_error!("Failed to load actions for {pair_key}: {error}"),
            }
        }
    }

    /// Ignores the shown difference. Nothing happens without a selection.
    pub async fn ignore(&self) -> Result<(), FetchError> {
        let Some(seq_id) = self.state.lock_ref().event.as_ref().map(|e| e.seq_id.clone()) else {
            return Ok(());
        };
        self.api.ignore_event(&seq_id).await.inspect_err(|error| {
            log_error!("Failed to ignore difference {seq_id}: {error}");
        })
    }
}
