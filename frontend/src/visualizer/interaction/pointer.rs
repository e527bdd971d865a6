//! Pointer state machine of the heatmap: pan by dragging, hover highlight,
//! click to navigate and click to toggle polling.
//!
//! Coordinates passed in are canvas-relative screen pixels. The controller
//! owns the horizontal pan offset; everything else comes from the bucket
//! model snapshot handed to each call.

use crate::logging::log_info;
use crate::router::BlobSelection;
use crate::visualizer::grid::{Cell, GridGeometry, Point};
use crate::visualizer::timeline::BlobsState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging { last: Point },
}

/// What the rest of the widget should do in response to a pointer event.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    StopPolling,
    StartPolling,
    TogglePolling,
    Navigate(BlobSelection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redraw {
    Nothing,
    /// Hover highlight changed.
    Overlay,
    /// Pan offset changed: grid and scale are redrawn translated.
    Panned,
    /// Pan gesture finished: every layer is rebuilt.
    Full,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointerResponse {
    pub redraw: Redraw,
    pub intent: Option<Intent>,
}

impl PointerResponse {
    const NONE: PointerResponse = PointerResponse {
        redraw: Redraw::Nothing,
        intent: None,
    };

    fn redraw(redraw: Redraw) -> Self {
        Self {
            redraw,
            intent: None,
        }
    }
}

/// Screen-space corner occupied by the polling indicator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToggleRegion {
    pub left: f64,
    pub bottom: f64,
}

impl ToggleRegion {
    pub fn contains(&self, point: Point) -> bool {
        point.x > self.left && point.y < self.bottom
    }
}

#[derive(Debug, Clone)]
pub struct InteractionController {
    geometry: GridGeometry,
    drag: DragState,
    dragged: bool,
    offset_x: f64,
    right_limit: f64,
    viewport_width: f64,
    highlighted: Option<Cell>,
    toggle_region: Option<ToggleRegion>,
}

impl InteractionController {
    pub fn new(geometry: GridGeometry) -> Self {
        Self {
            geometry,
            drag: DragState::Idle,
            dragged: false,
            offset_x: 0.0,
            right_limit: 0.0,
            viewport_width: 0.0,
            highlighted: None,
            toggle_region: None,
        }
    }

    /// Horizontal pan in `[-right_limit, 0]`; zero shows the oldest bucket.
    pub fn offset_x(&self) -> f64 {
        self.offset_x
    }

    pub fn right_limit(&self) -> f64 {
        self.right_limit
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    /// Whether the last gesture moved the pointer while pressed.
    pub fn dragged(&self) -> bool {
        self.dragged
    }

    pub fn highlighted(&self) -> Option<Cell> {
        self.highlighted
    }

    pub fn set_toggle_region(&mut self, region: ToggleRegion) {
        self.toggle_region = Some(region);
    }

    /// Recomputes how far the grid can pan for a canvas `width` pixels wide.
    pub fn set_viewport_width(&mut self, width: f64) {
        self.viewport_width = width;
        self.right_limit = (self.geometry.region_width() - width).max(0.0);
        self.offset_x = self.offset_x.clamp(-self.right_limit, 0.0);
    }

    /// Pans to the newest bucket, as after every data refresh.
    pub fn snap_to_latest(&mut self) {
        self.offset_x = -self.right_limit;
    }

    pub fn pointer_down(&mut self, at: Point) {
        self.drag = DragState::Dragging { last: at };
        self.dragged = false;
    }

    pub fn pointer_move(&mut self, at: Point, blobs: &BlobsState) -> PointerResponse {
        match self.drag {
            DragState::Dragging { last } => {
                self.drag = DragState::Dragging { last: at };
                let offset_x = (self.offset_x + at.x - last.x).clamp(-self.right_limit, 0.0);
                if at == last {
                    return PointerResponse::NONE;
                }
                self.dragged = true;
                self.offset_x = offset_x;
                self.highlighted = None;
                PointerResponse {
                    redraw: Redraw::Panned,
                    intent: Some(Intent::StopPolling),
                }
            }
            DragState::Idle => {
                let hovered = self.cell_at(at, blobs);
                if hovered == self.highlighted {
                    return PointerResponse::NONE;
                }
                self.highlighted = hovered;
                PointerResponse::redraw(Redraw::Overlay)
            }
        }
    }

    /// Ends a gesture. Releasing anywhere on the page counts.
    pub fn pointer_up(&mut self, at: Point, blobs: &BlobsState) -> PointerResponse {
        if self.drag == DragState::Idle {
            return PointerResponse::NONE;
        }
        self.drag = DragState::Idle;

        if self.dragged {
            let caught_up = self.offset_x.abs() >= self.right_limit;
            return PointerResponse {
                redraw: Redraw::Full,
                intent: caught_up.then_some(Intent::StartPolling),
            };
        }

        if self.toggle_region.is_some_and(|region| region.contains(at)) {
            return PointerResponse {
                redraw: Redraw::Nothing,
                intent: Some(Intent::TogglePolling),
            };
        }

        let cell = self.geometry.coords_to_cell(self.to_content(at));
        let label = usize::try_from(cell.row)
            .ok()
            .and_then(|row| blobs.swimlane_labels.get(row));
        match (label, blobs.bucket_range(cell.column)) {
            (Some(pair_key), Some((start, end))) => PointerResponse {
                redraw: Redraw::Nothing,
                intent: Some(Intent::Navigate(BlobSelection {
                    pair_key: pair_key.clone(),
                    start,
                    end,
                })),
            },
            _ => {
                log_info!("No swimlane at row {} column {}", cell.row, cell.column);
                PointerResponse::NONE
            }
        }
    }

    /// Pointer left the canvas.
    pub fn pointer_left(&mut self) -> PointerResponse {
        if self.highlighted.take().is_some() {
            PointerResponse::redraw(Redraw::Overlay)
        } else {
            PointerResponse::NONE
        }
    }

    fn to_content(&self, at: Point) -> Point {
        Point::new(at.x - self.offset_x, at.y)
    }

    /// Cell under a canvas-relative point; `None` beside the visible canvas.
    fn cell_at(&self, at: Point, blobs: &BlobsState) -> Option<Cell> {
        if !(0.0..self.viewport_width).contains(&at.x) {
            return None;
        }
        let cell = self.geometry.coords_to_cell(self.to_content(at));
        let inside = cell.row >= 0
            && (cell.row as usize) < blobs.max_rows
            && cell.column >= 0
            && (cell.column as usize) < self.geometry.max_columns;
        inside.then_some(cell)
    }
}
