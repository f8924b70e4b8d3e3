//! Marks, groups and their document-order labels

mod label;
mod model;
mod set;

pub use label::label;
pub use model::{Group, Mark};
pub use set::{DEFAULT_MIN_DRAG_PX, MarkError, MarkSet};
