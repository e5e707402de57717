//! Effective-ancestry resolution over the Mode → Goal → Project → Milestone → Task
//! hierarchy, plus the editor scope filter built on top of it.

pub mod derive;
pub mod effective;
pub mod hygiene;
pub mod scope;

pub use derive::{leaf_title, Crumb, TaskLineage};
pub use effective::{Lineage, MilestoneLineage, NodeRef, ParentLinked, ProjectLineage};
pub use hygiene::{
    cleanse_links_by_mode, normalize_milestone_links, normalize_project_links,
    normalize_task_links, AncestorLinks,
};
pub use scope::{
    filter_editor_options, reconcile_after_change, reconcile_batch, EditorOptions, FilterOptions,
    ScopeSelection, SelectionChange,
};
