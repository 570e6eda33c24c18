//! # Confab
//!
//! The unified API for the confab conference system: profiles, conference
//! creation, and transactional seat registration.
//!
//! ## Overview
//!
//! A [`ConferenceHub`] wraps a [`Store`](confab_store::Store) and exposes
//! the system's operations. Conferences are keyed under their organizer's
//! profile, putting both records in one entity group; registration and
//! unregistration update the registrant's profile and the conference's
//! seat counter in a single optimistic transaction, retried under a
//! bounded backoff policy when contended.
//!
//! ## Guarantees
//!
//! - A seat counter never goes negative and never exceeds capacity.
//! - A user's attendance list holds a conference key at most once.
//! - Guard failures are [`Outcome`] values, never errors, and are
//!   re-checked from fresh state on every retry.
//! - No partial state: either both records commit or neither does.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use confab::{ConferenceHub, HubConfig};
//! use confab_core::{ConferenceForm, Identity};
//! use confab_store::MemoryStore;
//!
//! async fn example() {
//!     let hub = ConferenceHub::new(MemoryStore::new(), HubConfig::default());
//!     let organizer = Identity::new("organizer", "organizer@example.com");
//!
//!     let conference = hub
//!         .create_conference(
//!             &organizer,
//!             ConferenceForm {
//!                 name: "RustConf".to_string(),
//!                 max_attendees: 200,
//!                 ..Default::default()
//!             },
//!         )
//!         .await
//!         .unwrap();
//!
//!     let attendee = Identity::new("attendee", "attendee@example.com");
//!     let outcome = hub
//!         .register(&attendee, &conference.key().encode())
//!         .await
//!         .unwrap();
//!     assert!(outcome.is_ok());
//! }
//! ```
//!
//! ## Re-exports
//!
//! The component crates are re-exported for convenience:
//!
//! - [`core`](confab_core) - Records, keys, queries
//! - [`store`](confab_store) - Storage backends

pub mod collab;
pub mod error;
pub mod hub;

pub use collab::{
    Announcement, AnnouncementCache, MemoryAnnouncementCache, NullNotifier, Notifier,
};
pub use error::{HubError, Result};
pub use hub::{ConferenceHub, HubConfig, Outcome, RetryPolicy};

pub use confab_core as core;
pub use confab_store as store;
