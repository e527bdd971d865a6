pub mod heatmap_canvas;
pub mod rendering;
pub mod surface;
pub mod web_surface;

pub use heatmap_canvas::heatmap_canvas;
pub use rendering::{HeatmapLayers, HeatmapRenderer};
