//! Hierarchical taxonomies over a remote store.
//!
//! Layers, innermost first: `domain` (pure rules), `application` (services over
//! the [`TaxonomyBackend`](infrastructure::TaxonomyBackend) trait),
//! `infrastructure` (REST and in-memory backends, wiring) and `cli`.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
