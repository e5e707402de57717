mod store;

pub use crate::models::{Selection, Snapshot};
pub use store::{SelectionPatch, SelectionStore};
