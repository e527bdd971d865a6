//! Heatmap grid: bucket counts, cell geometry and blob sizing

pub mod blob_size;
pub mod bucket_matrix;
pub mod geometry;

pub use bucket_matrix::{BucketMatrix, MergedSwimlanes, merge_swimlanes};
pub use geometry::{Cell, Direction, GridGeometry, Point};
