//! # Confab Store
//!
//! Storage abstraction for confab. Provides a trait-based interface for
//! record persistence with SQLite and in-memory implementations, plus the
//! entity-group transaction primitive the registration engine builds on.
//!
//! ## Overview
//!
//! Records live in entity groups rooted at a profile key: a conference is
//! a descendant of its organizer's profile, so a registration can update a
//! profile and a conference in one atomic commit. Concurrency control is
//! optimistic: [`Store::begin`] observes a group version,
//! [`Store::commit`] validates every observed version and either applies
//! the whole write set or reports [`CommitOutcome::Contended`] with no
//! state change.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`GroupSnapshot`] / [`GroupWrite`] / [`CommitOutcome`] - The
//!   transaction primitive

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{CommitOutcome, GroupSnapshot, GroupWrite, Store};
