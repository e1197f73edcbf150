//! Domain layer: entities and business rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod aggregation;
pub mod designation;
pub mod entities;
pub mod error;
pub mod normalize;
pub mod selection;
pub mod tree;

pub use aggregation::{compute_counts, needs_full_tree, Counts};
pub use designation::{current_default, DefaultDesignation};
pub use entities::*;
pub use error::DomainError;
pub use normalize::{normalize, NormalizationService};
pub use selection::{Selection, SelectionCategory, SelectionManager};
pub use tree::TaxonomyTree;
