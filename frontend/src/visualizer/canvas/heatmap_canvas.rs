//! Heatmap element: four stacked canvases driven by one processing loop
//!
//! DOM pointer events and bucket model events both end up in the loop, which
//! owns the layers and the [`InteractionController`], so drawing never races
//! with input handling.

use super::rendering::{HeatmapLayers, HeatmapRenderer};
use super::web_surface::CanvasSurface;
use crate::connection::DiffaApi;
use crate::dataflow::{Actor, Relay, relay};
use crate::logging::log_error;
use crate::router::BlobSelection;
use crate::visualizer::grid::Point;
use crate::visualizer::interaction::{
    DragState, Intent, InteractionController, PointerResponse, Redraw,
};
use crate::visualizer::timeline::{BlobsEvent, BlobsModel};
use futures::{StreamExt, select};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use zoon::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasInput {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
    PointerLeft,
    Resized(f64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CanvasStatus {
    pub offset_x: f64,
    pub dragging: bool,
}

pub fn heatmap_canvas<A>(
    blobs: BlobsModel<A>,
    renderer: HeatmapRenderer,
    navigation_relay: Relay<BlobSelection>,
) -> impl Element
where
    A: DiffaApi + 'static,
{
    let (canvas_input_relay, canvas_input_stream) = relay::<CanvasInput>();

    let mut underlay = Canvas::new().width(0).height(0);
    let mut grid = Canvas::new().width(0).height(0);
    let mut overlay = Canvas::new().width(0).height(0);
    let mut scale = Canvas::new().width(0).height(0);

    let layers = (|| {
        Some(HeatmapLayers {
            underlay: CanvasSurface::new(underlay.raw_el_mut().dom_element())?,
            grid: CanvasSurface::new(grid.raw_el_mut().dom_element())?,
            overlay: CanvasSurface::new(overlay.raw_el_mut().dom_element())?,
            scale: CanvasSurface::new(scale.raw_el_mut().dom_element())?,
        })
    })();

    let pointer_event_relay = canvas_input_relay.clone();
    let status = Actor::new(CanvasStatus::default(), async move |status| {
        let Some(layers) = layers else {
            log_error!("Heatmap canvas has no 2D context");
            return;
        };
        let _listeners = PointerListeners::install(layers.overlay.canvas(), &pointer_event_relay);
        let mut blobs_changed = blobs.subscribe();
        let mut canvas_inputs = canvas_input_stream;
        let mut canvas_loop = CanvasLoop {
            controller: InteractionController::new(renderer.geometry()),
            blobs,
            renderer,
            layers,
            width: 0.0,
            status,
            navigation_relay,
        };

        loop {
            select! {
                event = blobs_changed.next() => {
                    match event {
                        // A BucketsChanged follows once the resync lands.
                        Some(BlobsEvent::BucketSizeChanged(_)) => {}
                        Some(BlobsEvent::PollingChanged(_)) => canvas_loop.refresh(false),
                        Some(BlobsEvent::BucketsChanged | BlobsEvent::MaxRowsChanged(_)) => {
                            canvas_loop.refresh(true)
                        }
                        None => break,
                    }
                }
                input = canvas_inputs.next() => {
                    match input {
                        Some(input) => canvas_loop.handle_input(input),
                        None => break,
                    }
                }
                complete => break,
            }
        }
    });

    let cursor = status.signal_ref(|status| if status.dragging { "move" } else { "default" });
    let resize_relay = canvas_input_relay;

    Column::new()
        .s(Width::fill())
        .item(
            Stack::new()
                .s(Width::fill())
                .layer(underlay)
                .layer(grid)
                .layer(overlay.update_raw_el(move |raw_el| raw_el.style_signal("cursor", cursor)))
                .update_raw_el(move |raw_el| {
                    raw_el.on_resize(move |width, _height| {
                        resize_relay.send(CanvasInput::Resized(f64::from(width)));
                    })
                }),
        )
        .item(scale)
        .after_remove(move |_| {
            // Cancels the loop, which removes the pointer listeners.
            drop(status);
        })
}

struct CanvasLoop<A> {
    blobs: BlobsModel<A>,
    renderer: HeatmapRenderer,
    controller: InteractionController,
    layers: HeatmapLayers<CanvasSurface>,
    width: f64,
    status: Mutable<CanvasStatus>,
    navigation_relay: Relay<BlobSelection>,
}

impl<A> CanvasLoop<A>
where
    A: DiffaApi + 'static,
{
    /// Resizes and redraws every layer; `snap_to_latest` pans to "now".
    fn refresh(&mut self, snap_to_latest: bool) {
        let blobs = self.blobs.snapshot();
        self.renderer.resize(&mut self.layers, self.width, &blobs);
        self.controller.set_viewport_width(self.width);
        if snap_to_latest {
            self.controller.snap_to_latest();
        }
        let toggle_region = self.renderer.draw_all(
            &mut self.layers,
            &blobs,
            self.controller.offset_x(),
            self.controller.highlighted(),
        );
        self.controller.set_toggle_region(toggle_region);
        self.publish_status();
    }

    fn handle_input(&mut self, input: CanvasInput) {
        let blobs = self.blobs.snapshot();
        let response = match input {
            CanvasInput::Resized(width) => {
                self.width = width;
                self.refresh(true);
                return;
            }
            CanvasInput::PointerDown(at) => {
                self.controller.pointer_down(at);
                self.publish_status();
                return;
            }
            CanvasInput::PointerMove(at) => self.controller.pointer_move(at, &blobs),
            CanvasInput::PointerUp(at) => self.controller.pointer_up(at, &blobs),
            CanvasInput::PointerLeft => self.controller.pointer_left(),
        };
        self.apply(response);
    }

    fn apply(&mut self, response: PointerResponse) {
        let blobs = self.blobs.snapshot();
        let offset_x = self.controller.offset_x();
        match response.redraw {
            Redraw::Nothing => {}
            Redraw::Overlay => self.renderer.draw_overlay(
                &mut self.layers.overlay,
                &blobs,
                offset_x,
                self.controller.highlighted(),
            ),
            Redraw::Panned => self.renderer.draw_panned(&mut self.layers, &blobs, offset_x),
            Redraw::Full => self.refresh(false),
        }

        match response.intent {
            Some(Intent::StopPolling) => self.blobs.stop_polling(),
            Some(Intent::StartPolling) => self.blobs.start_polling(),
            Some(Intent::TogglePolling) => self.blobs.toggle_polling(),
            Some(Intent::Navigate(selection)) => self.navigation_relay.send(selection),
            None => {}
        }
        self.publish_status();
    }

    fn publish_status(&self) {
        self.status.set_neq(CanvasStatus {
            offset_x: self.controller.offset_x(),
            dragging: self.controller.drag_state() != DragState::Idle,
        });
    }
}

type PointerCallback = Closure<dyn FnMut(web_sys::MouseEvent)>;

/// DOM listeners feeding the canvas loop; removed again on drop.
///
/// Moves and releases are tracked on the window so a drag ends even when the
/// pointer is released outside the canvas.
struct PointerListeners {
    registrations: Vec<(web_sys::EventTarget, &'static str, PointerCallback)>,
}

impl PointerListeners {
    fn install(overlay: &web_sys::HtmlCanvasElement, relay: &Relay<CanvasInput>) -> Self {
        let mut listeners = Self {
            registrations: Vec::new(),
        };
        let overlay_target: web_sys::EventTarget = overlay.clone().into();
        listeners.listen(
            overlay_target.clone(),
            "pointerdown",
            overlay,
            relay,
            CanvasInput::PointerDown,
        );
        listeners.listen(overlay_target, "pointerleave", overlay, relay, |_| {
            CanvasInput::PointerLeft
        });
        if let Some(window) = web_sys::window() {
            let window_target: web_sys::EventTarget = window.into();
            listeners.listen(
                window_target.clone(),
                "pointermove",
                overlay,
                relay,
                CanvasInput::PointerMove,
            );
            listeners.listen(window_target, "pointerup", overlay, relay, CanvasInput::PointerUp);
        }
        listeners
    }

    fn listen(
        &mut self,
        target: web_sys::EventTarget,
        kind: &'static str,
        overlay: &web_sys::HtmlCanvasElement,
        relay: &Relay<CanvasInput>,
        to_input: fn(Point) -> CanvasInput,
    ) {
        let overlay = overlay.clone();
        let relay = relay.clone();
        let callback = PointerCallback::new(move |event: web_sys::MouseEvent| {
            if kind == "pointerdown" {
                event.prevent_default();
            }
            let rect = overlay.get_bounding_client_rect();
            let at = Point::new(
                f64::from(event.client_x()) - rect.left(),
                f64::from(event.client_y()) - rect.top(),
            );
            relay.send(to_input(at));
        });
        match target.add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref()) {
            Ok(()) => self.registrations.push((target, kind, callback)),
            Err(error) => log_error!("Failed to listen for {kind}: {error:?}"),
        }
    }
}

impl Drop for PointerListeners {
    fn drop(&mut self) {
        for (target, kind, callback) in &self.registrations {
            let _ =
                target.remove_event_listener_with_callback(kind, callback.as_ref().unchecked_ref());
        }
    }
}
