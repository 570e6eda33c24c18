//! # Confab Testkit
//!
//! Testing utilities for the confab crates: ready-made fixtures over the
//! in-memory store and proptest generators for property tests.

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    conference_form, multi_attendees, RecordingNotifier, SentConfirmation, TestFixture,
};
pub use generators::RegistrationOp;
