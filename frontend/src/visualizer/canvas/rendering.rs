//! Layered heatmap drawing
//!
//! Four layers share one coordinate system:
//! - underlay: swimlane separators, labels, scroll arrows and the polling
//!   indicator, fixed in screen space
//! - grid: one blob per non-empty bucket, translated by the pan offset
//! - overlay: the count of the hovered bucket, translated by the pan offset
//! - scale: date/time ticks under the grid, translated by the pan offset

use super::surface::{Baseline, Gradient, Surface, TextStyle};
use crate::visualizer::grid::{Cell, Direction, GridGeometry, Point};
use crate::visualizer::interaction::ToggleRegion;
use crate::visualizer::timeline::BlobsState;
use chrono::TimeDelta;
use shared::HeatmapConfig;

const BLACK: &str = "black";
const DARK_GREY: &str = "#555555";
const RED: &str = "#d12f19";
const TRANSPARENT: &str = "rgba(0,0,0,0)";
const WHITE: &str = "white";

const LABEL_FONT: &str = "11px 'Lucida Grande', Tahoma, Arial, Verdana, sans-serif";
const INDICATOR_FONT: &str = "12px 'Lucida Grande', Tahoma, Arial, Verdana, sans-serif";
const SCALE_FONT: &str = "9px sans-serif";
const COUNT_FONT: &str = "12px sans-serif";

const ARROW_WIDTH: f64 = 18.0;
const ARROW_HEIGHT: f64 = 12.0;
const DASH_LENGTH: f64 = 2.0;
const INDICATOR_HEIGHT: f64 = 20.0;
const INDICATOR_SPACER: f64 = 20.0;
const SCALE_TICK_EVERY: usize = 3;

pub const LIVE_TEXT: &str = " LIVE ";
pub const PAUSED_TEXT: &str = " CLICK TO POLL ";

#[derive(Debug)]
pub struct HeatmapLayers<S> {
    pub underlay: S,
    pub grid: S,
    pub overlay: S,
    pub scale: S,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatmapRenderer {
    geometry: GridGeometry,
    min_rows: usize,
    bottom_gutter: f64,
    scale_height: f64,
}

impl HeatmapRenderer {
    pub fn from_config(config: &HeatmapConfig) -> Self {
        Self {
            geometry: GridGeometry::from_config(&config.grid),
            min_rows: config.grid.min_rows,
            bottom_gutter: f64::from(config.grid.bottom_gutter),
            scale_height: f64::from(config.grid.scale_height),
        }
    }

    pub fn geometry(&self) -> GridGeometry {
        self.geometry
    }

    /// Enough lanes for every swimlane, never fewer than `min_rows`.
    pub fn canvas_height(&self, blobs: &BlobsState) -> f64 {
        let lanes = self.min_rows.max(blobs.swimlane_labels.len());
        lanes as f64 * self.geometry.lane_height() + self.bottom_gutter
    }

    pub fn resize<S: Surface>(
        &self,
        layers: &mut HeatmapLayers<S>,
        width: f64,
        blobs: &BlobsState,
    ) {
        let height = self.canvas_height(blobs);
        layers.underlay.resize(width, height);
        layers.grid.resize(width, height);
        layers.overlay.resize(width, height);
        layers.scale.resize(width, self.scale_height);
    }

    /// Rebuilds every layer and returns the polling indicator's hit region.
    pub fn draw_all<S: Surface>(
        &self,
        layers: &mut HeatmapLayers<S>,
        blobs: &BlobsState,
        offset_x: f64,
        highlighted: Option<Cell>,
    ) -> ToggleRegion {
        let toggle_region = self.draw_underlay(&mut layers.underlay, blobs, offset_x);
        self.draw_grid(&mut layers.grid, blobs, offset_x);
        self.draw_overlay(&mut layers.overlay, blobs, offset_x, highlighted);
        self.draw_scale(&mut layers.scale, blobs, offset_x);
        toggle_region
    }

    /// Redraw for one drag frame: only the translated layers change.
    pub fn draw_panned<S: Surface>(
        &self,
        layers: &mut HeatmapLayers<S>,
        blobs: &BlobsState,
        offset_x: f64,
    ) {
        self.draw_grid(&mut layers.grid, blobs, offset_x);
        self.draw_overlay(&mut layers.overlay, blobs, offset_x, None);
        self.draw_scale(&mut layers.scale, blobs, offset_x);
    }

    pub fn draw_underlay<S: Surface>(
        &self,
        underlay: &mut S,
        blobs: &BlobsState,
        offset_x: f64,
    ) -> ToggleRegion {
        underlay.clear();
        let width = underlay.width();
        let height = underlay.height();
        let lane_height = self.geometry.lane_height();
        let viewport_x = offset_x.abs();
        let arrow_y_offset = ARROW_HEIGHT / 4.0 + f64::from(self.geometry.grid_size) / 2.0;

        let mut lane = 0usize;
        let mut separator_y = 0.5 + lane_height;
        while separator_y < height {
            underlay.stroke_segments(
                &dashed_segments(Point::new(0.0, separator_y), width, DASH_LENGTH),
                BLACK,
            );
            let lane_top = separator_y - lane_height;

            if let Some(label) = blobs.swimlane_labels.get(lane) {
                underlay.fill_text(
                    label,
                    Point::new(10.0, lane_top + ARROW_HEIGHT),
                    TextStyle {
                        font: LABEL_FONT,
                        colour: BLACK,
                        baseline: Baseline::Alphabetic,
                    },
                );
            }

            let left_cell = self.geometry.find_cell_with_visible_blob(
                Point::new(viewport_x, lane_top),
                Direction::Left,
                &blobs.buckets,
            );
            if blobs
                .buckets
                .non_empty_cell_exists(left_cell.row, 0, left_cell.column)
            {
                let origin = Point::new(10.0, separator_y - arrow_y_offset);
                draw_arrow(underlay, Direction::Left, origin);
            }

            let right_cell = self.geometry.find_cell_with_visible_blob(
                Point::new(viewport_x + width - 1.0, lane_top),
                Direction::Right,
                &blobs.buckets,
            );
            if blobs.buckets.non_empty_cell_exists(
                right_cell.row,
                right_cell.column + 1,
                self.geometry.max_columns as i32,
            ) {
                let origin = Point::new(width - 10.0 - ARROW_WIDTH, separator_y - arrow_y_offset);
                draw_arrow(underlay, Direction::Right, origin);
            }

            lane += 1;
            separator_y += lane_height;
        }

        self.draw_polling_indicator(underlay, blobs.polling)
    }

    fn draw_polling_indicator<S: Surface>(&self, underlay: &mut S, polling: bool) -> ToggleRegion {
        let text = if polling { LIVE_TEXT } else { PAUSED_TEXT };
        let width = underlay.width();
        let text_width = underlay.measure_text(text, INDICATOR_FONT);
        let left = width - text_width - INDICATOR_SPACER;

        underlay.fill_rect(
            Point::new(left, 0.0),
            text_width + INDICATOR_SPACER,
            INDICATOR_HEIGHT,
            RED,
        );
        underlay.fill_text(
            text,
            Point::new(width - text_width - INDICATOR_SPACER / 2.0, 5.0),
            TextStyle {
                font: INDICATOR_FONT,
                colour: WHITE,
                baseline: Baseline::Top,
            },
        );

        ToggleRegion {
            left,
            bottom: INDICATOR_HEIGHT,
        }
    }

    pub fn draw_grid<S: Surface>(&self, grid: &mut S, blobs: &BlobsState, offset_x: f64) {
        grid.clear();
        grid.translate(offset_x);
        let height = grid.height();
        let lane_height = self.geometry.lane_height();

        for column in 0..self.geometry.max_columns as i32 {
            let mut row = 0i32;
            while (row as usize) < blobs.max_rows && f64::from(row) * lane_height + 0.5 < height {
                let cell = Cell::new(row, column);
                let count = blobs.buckets.value(row, column);
                let radius = self.geometry.blob_radius(count);
                if radius.value > 0.0 {
                    let outline_width = if radius.limited { 2.0 } else { 1.0 };
                    grid.draw_blob(self.geometry.blob_center(cell), radius.value, outline_width);
                }
                row += 1;
            }
        }
    }

    pub fn draw_overlay<S: Surface>(
        &self,
        overlay: &mut S,
        blobs: &BlobsState,
        offset_x: f64,
        highlighted: Option<Cell>,
    ) {
        overlay.clear();
        overlay.translate(offset_x);
        let Some(cell) = highlighted.filter(|cell| cell.row >= 0 && cell.column >= 0) else {
            return;
        };
        let count = blobs.buckets.value(cell.row, cell.column);
        if count == 0 {
            return;
        }

        let text = count.to_string();
        let text_width = overlay.measure_text(&text, COUNT_FONT);
        let grid_size = f64::from(self.geometry.grid_size);
        let origin = self.geometry.cell_to_coords(cell);
        let at = Point::new(
            origin.x + (grid_size / 2.0).floor() - (text_width / 2.0).floor(),
            origin.y + f64::from(self.geometry.gutter_size) + grid_size,
        );
        overlay.fill_text(
            &text,
            at,
            TextStyle {
                font: COUNT_FONT,
                colour: BLACK,
                baseline: Baseline::Top,
            },
        );
    }

    pub fn draw_scale<S: Surface>(&self, scale: &mut S, blobs: &BlobsState, offset_x: f64) {
        scale.clear();
        scale.translate(offset_x);
        let style = TextStyle {
            font: SCALE_FONT,
            colour: BLACK,
            baseline: Baseline::Alphabetic,
        };
        let bucket = TimeDelta::seconds(i64::from(blobs.matrix_bucket_size));
        let grid_size = f64::from(self.geometry.grid_size);

        for column in (0..self.geometry.max_columns).step_by(SCALE_TICK_EVERY) {
            let tick = blobs.start_time + bucket * column as i32;
            let x = column as f64 * grid_size;
            scale.fill_text(&tick.format("%d/%m").to_string(), Point::new(x, 10.0), style);
            scale.fill_text(&tick.format("%H:%M").to_string(), Point::new(x, 20.0), style);
        }
    }
}

/// Horizontal dashed line starting at `from`, `length` pixels long.
fn dashed_segments(from: Point, length: f64, dash: f64) -> Vec<(Point, Point)> {
    let dashes = (length / dash).floor() as usize;
    if dashes == 0 {
        return Vec::new();
    }
    let step = length / dashes as f64;
    (0..dashes)
        .step_by(2)
        .map(|index| {
            let start = from.x + index as f64 * step;
            (Point::new(start, from.y), Point::new(start + step, from.y))
        })
        .collect()
}

/// Arrow pointing `direction` whose bounding box starts at `origin`.
fn arrow_polygon(direction: Direction, origin: Point) -> ([Point; 7], Point, Point) {
    let (x, y) = (origin.x, origin.y);
    let head_width = ARROW_WIDTH / 2.0;
    let corner_height = ARROW_HEIGHT - ARROW_HEIGHT / 4.0;
    let (start_x, head_x, end_x) = match direction {
        Direction::Left => (x, x + head_width, x + ARROW_WIDTH),
        Direction::Right => (x + ARROW_WIDTH, x + ARROW_WIDTH - head_width, x),
    };
    let points = [
        Point::new(start_x, y + ARROW_HEIGHT / 2.0),
        Point::new(head_x, y),
        Point::new(head_x, y + corner_height),
        Point::new(end_x, y + corner_height),
        Point::new(end_x, y + ARROW_HEIGHT - corner_height),
        Point::new(head_x, y + ARROW_HEIGHT - corner_height),
        Point::new(head_x, y + ARROW_HEIGHT),
    ];
    (points, Point::new(start_x, y), Point::new(end_x, y))
}

fn draw_arrow<S: Surface>(surface: &mut S, direction: Direction, origin: Point) {
    let (points, from, to) = arrow_polygon(direction, origin);
    surface.fill_polygon(
        &points,
        Gradient {
            from,
            to,
            start: DARK_GREY,
            end: TRANSPARENT,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualizer::grid::BucketMatrix;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Clear,
        Translate(f64),
        Segments(usize),
        Rect { origin: Point, width: f64 },
        Text { text: String, at: Point },
        Blob { centre: Point, radius: f64, outline_width: f64 },
        Arrow { tip: Point },
    }

    #[derive(Debug, Default)]
    struct RecordingSurface {
        width: f64,
        height: f64,
        ops: Vec<Op>,
    }

    impl RecordingSurface {
        fn texts(&self) -> Vec<&str> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Text { text, .. } => Some(text.as_str()),
                    _ => None,
                })
                .collect()
        }

        fn blobs(&self) -> Vec<&Op> {
            self.ops
                .iter()
                .filter(|op| matches!(op, Op::Blob { .. }))
                .collect()
        }

        fn arrows(&self) -> Vec<Point> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Arrow { tip } => Some(*tip),
                    _ => None,
                })
                .collect()
        }
    }

    impl Surface for RecordingSurface {
        fn resize(&mut self, width: f64, height: f64) {
            self.width = width;
            self.height = height;
        }
        fn width(&self) -> f64 {
            self.width
        }
        fn height(&self) -> f64 {
            self.height
        }
        fn clear(&mut self) {
            self.ops.clear();
            self.ops.push(Op::Clear);
        }
        fn translate(&mut self, dx: f64) {
            self.ops.push(Op::Translate(dx));
        }
        fn stroke_segments(&mut self, segments: &[(Point, Point)], _colour: &str) {
            self.ops.push(Op::Segments(segments.len()));
        }
        fn fill_rect(&mut self, origin: Point, width: f64, _height: f64, _colour: &str) {
            self.ops.push(Op::Rect { origin, width });
        }
        fn fill_text(&mut self, text: &str, at: Point, _style: TextStyle<'_>) {
            self.ops.push(Op::Text {
                text: text.to_string(),
                at,
            });
        }
        fn measure_text(&mut self, text: &str, _font: &str) -> f64 {
            text.chars().count() as f64 * 6.0
        }
        fn draw_blob(&mut self, centre: Point, radius: f64, outline_width: f64) {
            self.ops.push(Op::Blob {
                centre,
                radius,
                outline_width,
            });
        }
        fn fill_polygon(&mut self, points: &[Point], _gradient: Gradient<'_>) {
            self.ops.push(Op::Arrow { tip: points[0] });
        }
    }

    fn renderer() -> HeatmapRenderer {
        HeatmapRenderer::from_config(&HeatmapConfig::default())
    }

    fn blobs(rows: Vec<Vec<u32>>) -> BlobsState {
        BlobsState {
            bucket_size: 3600,
            matrix_bucket_size: 3600,
            swimlane_labels: (0..rows.len()).map(|i| format!("PAIR-{i}")).collect(),
            buckets: Arc::new(BucketMatrix::from_rows(rows, 96)),
            max_rows: 10,
            polling: true,
            start_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn layers(width: f64, blobs: &BlobsState) -> HeatmapLayers<RecordingSurface> {
        let mut layers = HeatmapLayers {
            underlay: RecordingSurface::default(),
            grid: RecordingSurface::default(),
            overlay: RecordingSurface::default(),
            scale: RecordingSurface::default(),
        };
        renderer().resize(&mut layers, width, blobs);
        layers
    }

    #[test]
    fn canvas_keeps_a_minimum_of_five_lanes() {
        let renderer = renderer();
        assert_eq!(renderer.canvas_height(&blobs(vec![vec![0]; 2])), 400.0);
        assert_eq!(renderer.canvas_height(&blobs(vec![vec![0]; 7])), 556.0);
    }

    #[test]
    fn resize_gives_the_scale_its_own_height() {
        let blobs = blobs(vec![vec![0]]);
        let layers = layers(600.0, &blobs);
        assert_eq!((layers.grid.width, layers.grid.height), (600.0, 400.0));
        assert_eq!((layers.scale.width, layers.scale.height), (600.0, 40.0));
    }

    #[test]
    fn underlay_labels_lanes_and_shows_polling_state() {
        let mut blobs = blobs(vec![vec![0], vec![0]]);
        let mut layers = layers(600.0, &blobs);

        let region = renderer().draw_underlay(&mut layers.underlay, &blobs, 0.0);

        let texts = layers.underlay.texts();
        assert_eq!(texts, ["PAIR-0", "PAIR-1", LIVE_TEXT]);
        // 400px tall canvas: separators at 78.5 .. 390.5
        let separators = layers
            .underlay
            .ops
            .iter()
            .filter(|op| matches!(op, Op::Segments(150)))
            .count();
        assert_eq!(separators, 5);
        assert_eq!(
            region,
            ToggleRegion {
                left: 600.0 - 36.0 - 20.0,
                bottom: 20.0
            }
        );

        blobs.polling = false;
        renderer().draw_underlay(&mut layers.underlay, &blobs, 0.0);
        assert!(layers.underlay.texts().contains(&PAUSED_TEXT));
    }

    #[test]
    fn blobs_are_sized_by_count() {
        let mut first = vec![0; 96];
        first[2] = 1;
        let mut second = vec![0; 96];
        second[0] = 10_000;
        let blobs = blobs(vec![first, second]);
        let mut layers = layers(600.0, &blobs);

        renderer().draw_grid(&mut layers.grid, &blobs, -30.0);

        assert_eq!(layers.grid.ops[..2], [Op::Clear, Op::Translate(-30.0)]);
        assert_eq!(
            layers.grid.blobs(),
            [
                &Op::Blob {
                    centre: Point::new(15.5, 78.0 + 39.5),
                    radius: 14.0,
                    outline_width: 2.0
                },
                &Op::Blob {
                    centre: Point::new(75.5, 39.5),
                    radius: 2.0,
                    outline_width: 1.0
                },
            ]
        );
    }

    #[test]
    fn arrows_point_at_blobs_outside_the_viewport() {
        let mut row = vec![0; 96];
        row[1] = 5;
        row[90] = 5;
        let blobs = blobs(vec![row]);
        let mut layers = layers(600.0, &blobs);

        // Viewport shows columns 20..40: blobs on both sides are hidden.
        renderer().draw_underlay(&mut layers.underlay, &blobs, -600.0);
        let arrows = layers.underlay.arrows();
        assert_eq!(arrows.len(), 2);
        assert_eq!(arrows[0].x, 10.0);
        assert_eq!(arrows[1].x, 600.0 - 10.0);

        // Scrolled to the start: only the right-hand blob is hidden.
        renderer().draw_underlay(&mut layers.underlay, &blobs, 0.0);
        let arrows = layers.underlay.arrows();
        assert_eq!(arrows.len(), 1);
        assert_eq!(arrows[0].x, 600.0 - 10.0);
    }

    #[test]
    fn scale_ticks_every_third_column() {
        let blobs = blobs(vec![]);
        let mut layers = layers(600.0, &blobs);

        renderer().draw_scale(&mut layers.scale, &blobs, -90.0);

        let texts = layers.scale.texts();
        assert_eq!(texts.len(), 64);
        assert_eq!(texts[..4], ["01/01", "00:00", "01/01", "03:00"]);
        assert_eq!(layers.scale.ops[1], Op::Translate(-90.0));
    }

    #[test]
    fn overlay_shows_the_hovered_count() {
        let mut row = vec![0; 96];
        row[3] = 42;
        let blobs = blobs(vec![row]);
        let mut layers = layers(600.0, &blobs);
        let renderer = renderer();

        renderer.draw_overlay(&mut layers.overlay, &blobs, 0.0, Some(Cell::new(0, 3)));
        assert_eq!(
            layers.overlay.ops.last(),
            Some(&Op::Text {
                text: "42".to_string(),
                at: Point::new(90.0 + 15.0 - 6.0, 24.0 + 30.0),
            })
        );

        renderer.draw_overlay(&mut layers.overlay, &blobs, 0.0, Some(Cell::new(0, 4)));
        assert!(layers.overlay.texts().is_empty());
    }

    #[test]
    fn dashes_alternate_with_gaps() {
        let segments = dashed_segments(Point::new(0.0, 0.5), 10.0, 2.0);
        assert_eq!(
            segments,
            [
                (Point::new(0.0, 0.5), Point::new(2.0, 0.5)),
                (Point::new(4.0, 0.5), Point::new(6.0, 0.5)),
                (Point::new(8.0, 0.5), Point::new(10.0, 0.5)),
            ]
        );
    }
}
