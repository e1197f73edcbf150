//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements the remote store and selector traits and wires up services.

pub mod di;
pub mod error;
pub mod http;
pub mod memory;
pub mod traits;

pub use error::{BackendError, InfraError, InfraResult};
pub use http::HttpBackend;
pub use memory::MemoryBackend;
pub use traits::{BulkDeleteEntry, BulkDeleteResponse, Selector, SelectionItem, SkimSelector, TaxonomyBackend};
