//! Zoom buttons and the `+` / `-` keyboard shortcuts

use super::blobs_model::{BlobsModel, BlobsState};
use crate::connection::DiffaApi;
use zoon::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    fn allowed(self, state: &BlobsState) -> bool {
        match self {
            ZoomDirection::In => state.can_zoom_in(),
            ZoomDirection::Out => state.can_zoom_out(),
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        match key {
            "+" => Some(ZoomDirection::In),
            "-" => Some(ZoomDirection::Out),
            _ => None,
        }
    }
}

/// Zooms unless the bucket size is already at that limit.
pub fn zoom<A>(blobs: &BlobsModel<A>, direction: ZoomDirection)
where
    A: DiffaApi + 'static,
{
    if !direction.allowed(&blobs.snapshot()) {
        return;
    }
    match direction {
        ZoomDirection::In => Task::start(blobs.zoom_in()),
        ZoomDirection::Out => Task::start(blobs.zoom_out()),
    }
}

pub fn zoom_controls<A>(blobs: BlobsModel<A>) -> impl Element
where
    A: DiffaApi + 'static,
{
    let keyboard_blobs = blobs.clone();
    Column::new()
        .s(Gap::new().y(4))
        .item(zoom_button(blobs.clone(), ZoomDirection::In))
        .item(zoom_button(blobs, ZoomDirection::Out))
        .update_raw_el(move |raw_el| {
            raw_el.global_event_handler(move |event: KeyDown| {
                if let Some(direction) = ZoomDirection::from_key(&event.key()) {
                    zoom(&keyboard_blobs, direction);
                }
            })
        })
}

fn zoom_button<A>(blobs: BlobsModel<A>, direction: ZoomDirection) -> impl Element
where
    A: DiffaApi + 'static,
{
    let (label, title) = match direction {
        ZoomDirection::In => ("+", "Zoom in"),
        ZoomDirection::Out => ("-", "Zoom out"),
    };
    let enabled = blobs
        .state_signal()
        .map(move |state| direction.allowed(&state))
        .dedupe()
        .broadcast();

    Button::new()
        .s(Width::exact(24))
        .s(Height::exact(24))
        .s(Font::new().size(16).color_signal(
            enabled
                .signal()
                .map_bool(|| "rgb(30, 30, 30)", || "rgb(170, 170, 170)"),
        ))
        .label(label)
        .on_press(move || zoom(&blobs, direction))
        .update_raw_el(move |raw_el| {
            raw_el
                .attr("title", title)
                .attr_signal(
                    "disabled",
                    enabled.signal().map(|enabled| (!enabled).then_some("disabled")),
                )
        })
}
