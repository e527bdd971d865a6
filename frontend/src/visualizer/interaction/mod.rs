// Pointer handling for the heatmap canvas
pub mod pointer;

pub use pointer::{
    DragState, Intent, InteractionController, PointerResponse, Redraw, ToggleRegion,
};
