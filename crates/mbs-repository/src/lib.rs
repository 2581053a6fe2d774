//! Name-keyed bean repository for the managed bean server.
//!
//! The repository is the server's only record of which bean is bound to which
//! [`ObjectName`](mbs_types::ObjectName). It knows nothing about beans
//! themselves: it stores any `T: Clone + Send + Sync` and enforces that each
//! concrete name is bound at most once.
//!
//! # Modules
//!
//! - [`error`] — Error types for repository operations
//! - [`traits`] — The [`Repository`] trait defining the storage interface
//! - [`memory`] — In-memory [`InMemoryRepository`], organised per domain
//!
//! # Rules
//!
//! 1. Pattern names are never stored.
//! 2. A name with an empty domain is stored under the default domain.
//! 3. The default domain always exists, even when empty; other domains
//!    disappear with their last entry.
//! 4. The reserved `JMImplementation` domain accepts a single first writer
//!    (the server delegate) and rejects later insertions.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{RepositoryError, Result};
pub use memory::{InMemoryRepository, RESERVED_DOMAIN};
pub use traits::{NamedObject, Repository};
