//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the `TaxonomyBackend` trait but are themselves
//! concrete structs, not traits.

mod batch;
mod defaults;
mod deletion;
mod regroup;
mod session;
mod store;

pub use defaults::DefaultService;
pub use deletion::{DeletionOutcome, DeletionReport, DeletionService};
pub use regroup::{BatchFailure, RegroupReport, RegroupService};
pub use session::TaxonomySession;
pub use store::TaxonomyStore;
