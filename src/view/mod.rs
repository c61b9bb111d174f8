//! Projections of the store for display.
//!
//! Both views are recomputed from the store on every draw and never cached.

pub mod detail;
pub mod list;

pub use detail::{render_detail, DetailView, SubtaskRow, SubtaskState};
pub use list::{render_list, ListRow, ListView, RowActions, RowStatus};
