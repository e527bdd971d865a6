//! Difference list, pagination and detail panel

use super::collection::{DiffsCollection, DiffsState};
use super::detail::{DetailState, DiffDetail};
use crate::connection::DiffaApi;
use chrono::DateTime;
use shared::{ContentSide, DiffEvent};
use zoon::*;

const SELECTED_ROW: &str = "rgb(214, 228, 245)";
const ROW: &str = "rgb(255, 255, 255)";
const MUTED_TEXT: &str = "rgb(120, 120, 120)";

/// `dd/MM/yyyy` and `HH:mm:ss` of the detection time; unparsable input is
/// shown as it came.
pub fn detected_at_parts(event: &DiffEvent) -> (String, String) {
    match DateTime::parse_from_rfc3339(&event.detected_at) {
        Ok(detected_at) => (
            detected_at.format("%d/%m/%Y").to_string(),
            detected_at.format("%H:%M:%S").to_string(),
        ),
        Err(_) => (event.detected_at.clone(), String::new()),
    }
}

pub fn diff_list<A>(diffs: DiffsCollection<A>) -> impl Element
where
    A: DiffaApi + 'static,
{
    let list_size = diffs.list_size();
    let keyboard_diffs = diffs.clone();
    let rows_diffs = diffs.clone();

    Column::new()
        .s(Width::fill())
        .s(Gap::new().y(2))
        .item(header_row())
        .items_signal_vec(
            diffs
                .state_signal()
                .map(move |state| {
                    state
                        .events
                        .iter()
                        .map(|event| diff_row(rows_diffs.clone(), &state, event))
                        .collect::<Vec<_>>()
                })
                .to_signal_vec(),
        )
        .item(pagination(diffs, list_size))
        .update_raw_el(move |raw_el| {
            raw_el.global_event_handler(move |event: KeyDown| {
                let diffs = keyboard_diffs.clone();
                match event.key().as_str() {
                    "ArrowUp" => diffs.select_previous_event(),
                    "ArrowDown" => diffs.select_next_event(),
                    "ArrowLeft" => Task::start(async move {
                        let _ = diffs.previous_page().await;
                    }),
                    "ArrowRight" => Task::start(async move {
                        let _ = diffs.next_page().await;
                    }),
                    _ => {}
                }
            })
        })
}

fn header_row() -> impl Element {
    Row::new()
        .s(Width::fill())
        .s(Gap::new().x(12))
        .s(Padding::new().x(8).y(4))
        .s(Font::new().weight(FontWeight::Bold).size(13))
        .items(["Date", "Time", "Pair", "Item ID", "Difference"].map(cell))
}

fn cell(text: impl Into<String>) -> impl Element {
    El::new().s(Width::fill()).child(Text::new(text.into()))
}

fn diff_row<A>(
    diffs: DiffsCollection<A>,
    state: &DiffsState,
    event: &DiffEvent,
) -> impl Element + use<A>
where
    A: DiffaApi + 'static,
{
    let selected = state.selected.as_deref() == Some(event.seq_id.as_str());
    let (date, time) = detected_at_parts(event);
    let seq_id = event.seq_id.clone();

    Row::new()
        .s(Width::fill())
        .s(Gap::new().x(12))
        .s(Padding::new().x(8).y(4))
        .s(Font::new().size(13))
        .s(Background::new().color(if selected { SELECTED_ROW } else { ROW }))
        .s(Cursor::new(CursorIcon::Pointer))
        .item(cell(date))
        .item(cell(time))
        .item(cell(event.pair_key()))
        .item(cell(event.obj_id.id.clone()))
        .item(cell(event.kind().label()))
        .on_click(move || diffs.select_event(Some(&seq_id)))
}

fn pagination<A>(diffs: DiffsCollection<A>, list_size: u32) -> impl Element
where
    A: DiffaApi + 'static,
{
    let state = diffs.state_signal().broadcast();
    let previous = diffs.clone();
    let next = diffs;

    Row::new()
        .s(Gap::new().x(8))
        .s(Padding::new().x(8).y(6))
        .s(Font::new().size(13).color(MUTED_TEXT))
        .item(El::new().child_signal(state.signal_ref(move |state| {
            (state.total_events > 0).then(|| Text::new(state.summary(list_size)))
        })))
        .item_signal(state.signal_ref(|state| state.has_several_pages()).map_true(
            move || {
                let previous = previous.clone();
                let next = next.clone();
                Row::new()
                    .s(Gap::new().x(4))
                    .item(
                        Button::new()
                            .label("Previous")
                            .on_press(move || {
                                let diffs = previous.clone();
                                Task::start(async move {
                                    let _ = diffs.previous_page().await;
                                });
                            }),
                    )
                    .item(Button::new().label("Next").on_press(move || {
                        let diffs = next.clone();
                        Task::start(async move {
                            let _ = diffs.next_page().await;
                        });
                    }))
            },
        ))
}

pub fn diff_detail<A>(detail: DiffDetail<A>, diffs: DiffsCollection<A>) -> impl Element
where
    A: DiffaApi + 'static,
{
    let state = detail.state_signal().broadcast();

    Column::new()
        .s(Width::fill())
        .s(Gap::new().y(8))
        .s(Padding::all(8))
        .item(
            El::new()
                .s(Font::new().weight(FontWeight::Bold))
                .child_signal(state.signal_ref(|state| Text::new(state.heading()))),
        )
        .item(El::new().s(Font::new().size(13)).child_signal(state.signal_ref(|state| {
            state
                .event
                .as_ref()
                .map(|event| Text::new(event.kind().label()))
        })))
        .item(
            Row::new()
                .s(Width::fill())
                .s(Gap::new().x(12))
                .item(content_column(&detail, ContentSide::Upstream))
                .item(content_column(&detail, ContentSide::Downstream)),
        )
        .item(actions_row(&detail))
        .item_signal(state.signal_ref(|state| state.event.is_some()).map_true(move || {
            let detail = detail.clone();
            let diffs = diffs.clone();
            Button::new().label("Ignore").on_press(move || {
                let detail = detail.clone();
                let diffs = diffs.clone();
                Task::start(async move {
                    if detail.ignore().await.is_ok() {
                        let _ = diffs.sync(true).await;
                    }
                });
            })
        }))
}

fn content_column<A>(detail: &DiffDetail<A>, side: ContentSide) -> impl Element + use<A>
where
    A: DiffaApi + 'static,
{
    Column::new()
        .s(Width::fill())
        .s(Gap::new().y(4))
        .item(
            El::new()
                .s(Font::new().weight(FontWeight::SemiBold))
                .child_signal(
                    detail
                        .state_signal()
                        .map(move |state| Text::new(state.label(side))),
                ),
        )
        .item(
            El::new()
                .s(Font::new().size(12).color(MUTED_TEXT))
                .child_signal(
                    detail
                        .state_signal()
                        .map(move |state| Text::new(state.version(side))),
                ),
        )
        .item(
            El::new()
                .s(Font::new().size(12).family([FontFamily::Monospace]))
                .update_raw_el(|raw_el| raw_el.style("white-space", "pre-wrap"))
                .child_signal(
                    detail
                        .state_signal()
                        .map(move |state| Text::new(state.content(side).to_string())),
                ),
        )
}

fn actions_row<A>(detail: &DiffDetail<A>) -> impl Element + use<A>
where
    A: DiffaApi + 'static,
{
    Row::new()
        .s(Gap::new().x(6))
        .s(Font::new().size(12))
        .items_signal_vec(
            detail
                .state_signal()
                .map(|state: DetailState| {
                    state
                        .actions
                        .iter()
                        .map(|action| Text::new(action.name.clone()))
                        .collect::<Vec<_>>()
                })
                .to_signal_vec(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{PairRef, VersionId};

    fn detected_at(detected_at: &str) -> DiffEvent {
        DiffEvent {
            seq_id: "1".to_string(),
            obj_id: VersionId {
                pair: PairRef {
                    key: "WEB-1".to_string(),
                },
                id: "item-1".to_string(),
            },
            detected_at: detected_at.to_string(),
            upstream_vsn: None,
            downstream_vsn: None,
        }
    }

    #[test]
    fn detection_time_is_split_into_date_and_time() {
        assert_eq!(
            detected_at_parts(&detected_at("2024-03-07T05:10:42Z")),
            ("07/03/2024".to_string(), "05:10:42".to_string())
        );
    }

    #[test]
    fn unparsable_detection_time_is_kept() {
        assert_eq!(
            detected_at_parts(&detected_at("yesterday")),
            ("yesterday".to_string(), String::new())
        );
    }
}
