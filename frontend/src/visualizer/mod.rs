// Visualizer Module - Heatmap grid, canvas rendering and interaction
//
// Everything that turns bucketed difference counts into pixels and pointer
// gestures back into polling changes and navigation.

// Grid geometry, bucket matrix and blob sizing
pub mod grid;

// Bucket polling model and zoom controls
pub mod timeline;

// Canvas layers and the heatmap element
pub mod canvas;

// Pointer state machine (drag, hover, click)
pub mod interaction;
