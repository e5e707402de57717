pub mod entities;
pub mod ids;
pub mod selection;
pub mod session;

pub use entities::{Catalog, Goal, HierarchyNode, Milestone, Mode, Project, Task};
pub use ids::{id_from_value, lenient_id, normalize_id, EntityId};
pub use selection::{Selection, Snapshot};
pub use session::{
    ActiveSession, CompleteNextRequest, CompleteNextResponse, EntityRef, EntityType, NextEntity,
    TimeEntry, TimerKind, TimerPath,
};
