//! Repository implementations for database operations.

mod registry_repo;

pub use registry_repo::CompletionRegistry;
