//! Drawing primitives the heatmap renderer needs from a canvas layer

use crate::visualizer::grid::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baseline {
    Alphabetic,
    Top,
}

impl Baseline {
    pub fn as_css(self) -> &'static str {
        match self {
            Baseline::Alphabetic => "alphabetic",
            Baseline::Top => "top",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle<'a> {
    pub font: &'a str,
    pub colour: &'a str,
    pub baseline: Baseline,
}

/// Linear fill from `from` (`start` colour) to `to` (`end` colour).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gradient<'a> {
    pub from: Point,
    pub to: Point,
    pub start: &'a str,
    pub end: &'a str,
}

/// One canvas layer.
///
/// `clear` wipes the pixels and resets any translation, like assigning a
/// canvas its own width does in the browser.
pub trait Surface {
    fn resize(&mut self, width: f64, height: f64);
    fn width(&self) -> f64;
    fn height(&self) -> f64;
    fn clear(&mut self);
    fn translate(&mut self, dx: f64);
    fn stroke_segments(&mut self, segments: &[(Point, Point)], colour: &str);
    fn fill_rect(&mut self, origin: Point, width: f64, height: f64, colour: &str);
    fn fill_text(&mut self, text: &str, at: Point, style: TextStyle<'_>);
    fn measure_text(&mut self, text: &str, font: &str) -> f64;
    /// White disc with a black outline.
    fn draw_blob(&mut self, centre: Point, radius: f64, outline_width: f64);
    fn fill_polygon(&mut self, points: &[Point], gradient: Gradient<'_>);
}
