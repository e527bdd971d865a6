//! Difference list and detail collaborators of the heatmap

pub mod collection;
pub mod detail;
pub mod views;

pub use collection::{DiffsCollection, DiffsEvent, DiffsState};
pub use detail::{DetailState, DiffDetail};
pub use views::{diff_detail, diff_list};
