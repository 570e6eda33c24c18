//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use confab::{ConferenceHub, HubConfig, MemoryAnnouncementCache, Notifier, RetryPolicy};
use confab_core::{Conference, ConferenceForm, Identity};
use confab_store::MemoryStore;

/// A confirmation captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentConfirmation {
    pub email: String,
    pub summary: String,
}

/// A notifier that records every confirmation instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentConfirmation>>,
}

impl RecordingNotifier {
    /// All confirmations captured so far.
    pub fn sent(&self) -> Vec<SentConfirmation> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn confirm_created(&self, email: &str, summary: &str) -> anyhow::Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentConfirmation {
                email: email.to_string(),
                summary: summary.to_string(),
            });
        }
        Ok(())
    }
}

/// A test fixture with a hub over a memory store and recording
/// collaborators.
pub struct TestFixture {
    pub hub: ConferenceHub<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub announcements: Arc<MemoryAnnouncementCache>,
}

impl TestFixture {
    /// Create a fixture with the default retry policy.
    pub fn new() -> Self {
        Self::with_retry(RetryPolicy::default())
    }

    /// Create a fixture with an explicit retry policy.
    pub fn with_retry(retry: RetryPolicy) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let announcements = Arc::new(MemoryAnnouncementCache::new());
        let hub = ConferenceHub::with_collaborators(
            MemoryStore::new(),
            notifier.clone(),
            announcements.clone(),
            HubConfig { retry },
        );
        Self {
            hub,
            notifier,
            announcements,
        }
    }

    /// An identity whose email is derived from the name.
    pub fn identity(name: &str) -> Identity {
        Identity::new(name, format!("{}@example.com", name))
    }

    /// Create a conference and return it.
    pub async fn create_conference(
        &self,
        organizer: &Identity,
        name: &str,
        seats: u32,
    ) -> Conference {
        self.hub
            .create_conference(organizer, conference_form(name, seats))
            .await
            .expect("conference creation in fixture")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A minimal valid conference form.
pub fn conference_form(name: &str, seats: u32) -> ConferenceForm {
    ConferenceForm {
        name: name.to_string(),
        topics: vec!["testing".to_string()],
        max_attendees: seats,
        ..Default::default()
    }
}

/// Distinct identities for multi-party tests.
pub fn multi_attendees(count: usize) -> Vec<Identity> {
    (0..count)
        .map(|i| TestFixture::identity(&format!("attendee-{}", i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use confab::Outcome;

    #[tokio::test]
    async fn test_fixture_creates_and_registers() {
        let fixture = TestFixture::new();
        let organizer = TestFixture::identity("org");
        let conference = fixture.create_conference(&organizer, "FixtureConf", 2).await;

        let attendee = TestFixture::identity("alice");
        let outcome = fixture
            .hub
            .register(&attendee, &conference.key().encode())
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Ok);
    }

    #[tokio::test]
    async fn test_fixture_records_confirmations() {
        let fixture = TestFixture::new();
        let organizer = TestFixture::identity("org");
        fixture.create_conference(&organizer, "FixtureConf", 2).await;

        let sent = fixture.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].email, "org@example.com");
    }

    #[test]
    fn test_multi_attendees_are_distinct() {
        let attendees = multi_attendees(3);
        assert_ne!(attendees[0].user_id, attendees[1].user_id);
        assert_ne!(attendees[1].user_id, attendees[2].user_id);
    }
}
