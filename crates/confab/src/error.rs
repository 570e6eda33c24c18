//! Error types for the hub.

use confab_core::{MalformedKeyError, QueryShapeError, UserId};
use confab_store::StoreError;
use thiserror::Error;

/// Errors that can occur during hub operations.
///
/// Guard failures (already registered, no seats, not registered, unknown
/// conference) are not errors; they are [`Outcome`](crate::hub::Outcome)
/// values. Only malformed input and infrastructure failures surface here.
#[derive(Debug, Error)]
pub enum HubError {
    /// A caller-supplied key string could not be interpreted.
    #[error("malformed key: {0}")]
    MalformedKey(#[from] MalformedKeyError),

    /// A query's filter/sort combination cannot be executed.
    #[error("invalid query shape: {0}")]
    QueryShape(#[from] QueryShapeError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The user has no profile record yet.
    #[error("no profile exists for user {0}")]
    ProfileNotFound(UserId),

    /// A transaction kept aborting and the retry budget ran out. The whole
    /// request may be retried by the caller.
    #[error("transaction contended after {attempts} attempts")]
    TransientStore { attempts: u32 },
}

/// Result type for hub operations.
pub type Result<T> = std::result::Result<T, HubError>;
