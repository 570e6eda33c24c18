//! Error types for the confab core.

use thiserror::Error;

use crate::key::EntityKind;
use crate::query::ConferenceField;

/// A caller-supplied key string could not be interpreted.
#[derive(Debug, Error)]
pub enum MalformedKeyError {
    #[error("key is not valid hex")]
    Encoding(#[from] hex::FromHexError),

    #[error("key payload is not a valid path: {0}")]
    Payload(String),

    #[error("key path is empty")]
    EmptyPath,

    #[error("key has trailing or non-canonical bytes")]
    NonCanonical,

    #[error("expected a {expected} key, got a {got} key")]
    WrongKind { expected: EntityKind, got: EntityKind },
}

/// A seat booking exceeded the remaining capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not enough seats: requested {requested}, available {available}")]
pub struct CapacityError {
    pub requested: u32,
    pub available: u32,
}

/// A query's filter/sort combination cannot be executed by the store.
///
/// Raised by [`ConferenceQuery::validate`](crate::query::ConferenceQuery::validate)
/// before any storage access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryShapeError {
    #[error("filter value for {field} must be {expected}")]
    TypeMismatch {
        field: ConferenceField,
        expected: &'static str,
    },

    #[error("inequality filters on more than one field: {first} and {second}")]
    MultipleInequalityFields {
        first: ConferenceField,
        second: ConferenceField,
    },

    #[error("first sort field must be {0}, the inequality filter field")]
    SortMismatch(ConferenceField),
}
