//! Task collection and the operations over it
//!
//! [`TaskCollection`] owns the active board's tasks. Ordering rules live in
//! [`reorder`] and the view pipeline in [`filter`].

mod collection;
mod create;
pub mod filter;
pub mod reorder;
mod update;

pub use collection::{StatusCounts, TaskCollection};
pub use create::NewTask;
pub use filter::{DateRange, SortMode, StatusFilter, TaskFilter};
pub use reorder::DropPosition;
pub use update::TaskUpdate;
