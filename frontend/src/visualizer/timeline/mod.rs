//! Visible time range: bucket polling and zoom

pub mod blobs_model;
pub mod zoom_controls;

pub use blobs_model::{BlobsEvent, BlobsModel, BlobsState};
pub use zoom_controls::{ZoomDirection, zoom_controls};
