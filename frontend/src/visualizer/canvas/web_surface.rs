//! [`Surface`] backed by a browser `<canvas>` 2D context

use super::surface::{Gradient, Surface, TextStyle};
use crate::visualizer::grid::Point;
use std::f64::consts::TAU;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl CanvasSurface {
    /// `None` when the browser refuses a 2D context.
    pub fn new(canvas: HtmlCanvasElement) -> Option<Self> {
        let context = canvas
            .get_context("2d")
            .ok()
            .flatten()?
            .dyn_into::<CanvasRenderingContext2d>()
            .ok()?;
        Some(Self { canvas, context })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }
}

impl Surface for CanvasSurface {
    fn resize(&mut self, width: f64, height: f64) {
        self.canvas.set_width(width.max(0.0) as u32);
        self.canvas.set_height(height.max(0.0) as u32);
    }

    fn width(&self) -> f64 {
        f64::from(self.canvas.width())
    }

    fn height(&self) -> f64 {
        f64::from(self.canvas.height())
    }

    fn clear(&mut self) {
        // Reassigning the width resets both pixels and transform.
        self.canvas.set_width(self.canvas.width());
    }

    fn translate(&mut self, dx: f64) {
        let _ = self.context.translate(dx, 0.0);
    }

    fn stroke_segments(&mut self, segments: &[(Point, Point)], colour: &str) {
        let context = &self.context;
        context.begin_path();
        for (from, to) in segments {
            context.move_to(from.x, from.y);
            context.line_to(to.x, to.y);
        }
        context.set_line_width(1.0);
        context.set_stroke_style_str(colour);
        context.stroke();
    }

    fn fill_rect(&mut self, origin: Point, width: f64, height: f64, colour: &str) {
        self.context.set_fill_style_str(colour);
        self.context.fill_rect(origin.x, origin.y, width, height);
    }

    fn fill_text(&mut self, text: &str, at: Point, style: TextStyle<'_>) {
        let context = &self.context;
        context.set_font(style.font);
        context.set_fill_style_str(style.colour);
        context.set_text_baseline(style.baseline.as_css());
        let _ = context.fill_text(text, at.x, at.y);
    }

    fn measure_text(&mut self, text: &str, font: &str) -> f64 {
        self.context.set_font(font);
        self.context
            .measure_text(text)
            .map(|metrics| metrics.width())
            .unwrap_or(0.0)
    }

    fn draw_blob(&mut self, centre: Point, radius: f64, outline_width: f64) {
        let context = &self.context;
        context.set_line_width(outline_width);
        context.set_stroke_style_str("black");
        context.set_fill_style_str("white");
        context.begin_path();
        let _ = context.arc(centre.x, centre.y, radius, 0.0, TAU);
        context.close_path();
        context.stroke();
        context.fill();
    }

    fn fill_polygon(&mut self, points: &[Point], gradient: Gradient<'_>) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        let context = &self.context;
        let fill = context.create_linear_gradient(
            gradient.from.x,
            gradient.from.y,
            gradient.to.x,
            gradient.to.y,
        );
        let _ = fill.add_color_stop(0.0, gradient.start);
        let _ = fill.add_color_stop(1.0, gradient.end);

        context.save();
        context.set_fill_style_canvas_gradient(&fill);
        context.begin_path();
        context.move_to(first.x, first.y);
        for point in rest {
            context.line_to(point.x, point.y);
        }
        context.close_path();
        context.fill();
        context.restore();
    }
}
