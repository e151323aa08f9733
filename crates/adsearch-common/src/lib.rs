//! Shared types for the advertisement search service.
//!
//! Holds the domain model that both the server and the CLI speak, plus the
//! logging subsystem used by every binary in the workspace.

pub mod logging;
pub mod model;

pub use model::{Advertisement, SearchDocument, SearchFilters};
