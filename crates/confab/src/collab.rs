//! Collaborator interfaces: notification dispatch and the announcement
//! cache.
//!
//! Both are injected into the hub rather than reached through process-wide
//! handles, so tests can substitute in-memory fakes.

use async_trait::async_trait;
use std::sync::RwLock;

/// The current site-wide announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub message: String,
}

/// Dispatches best-effort notifications after a commit.
///
/// A failure here must never affect already-committed records; the hub
/// logs it and moves on.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a conference-creation confirmation to the organizer.
    async fn confirm_created(&self, email: &str, summary: &str) -> anyhow::Result<()>;
}

/// A notifier that drops every message.
#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn confirm_created(&self, _email: &str, _summary: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Publishes and serves a single current announcement string.
///
/// The hub only reads it; publication belongs to an out-of-core cron task.
pub trait AnnouncementCache: Send + Sync {
    /// Replace the current announcement.
    fn publish(&self, message: String);

    /// Read the current announcement, if any.
    fn read_current(&self) -> Option<String>;
}

/// In-memory announcement cache.
#[derive(Debug, Default)]
pub struct MemoryAnnouncementCache {
    current: RwLock<Option<String>>,
}

impl MemoryAnnouncementCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnnouncementCache for MemoryAnnouncementCache {
    fn publish(&self, message: String) {
        if let Ok(mut current) = self.current.write() {
            *current = Some(message);
        }
    }

    fn read_current(&self) -> Option<String> {
        self.current.read().ok().and_then(|c| c.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache_publish_and_read() {
        let cache = MemoryAnnouncementCache::new();
        assert_eq!(cache.read_current(), None);

        cache.publish("Seats are running out!".to_string());
        assert_eq!(
            cache.read_current(),
            Some("Seats are running out!".to_string())
        );

        cache.publish("Updated".to_string());
        assert_eq!(cache.read_current(), Some("Updated".to_string()));
    }

    #[tokio::test]
    async fn test_null_notifier_accepts_everything() {
        let notifier = NullNotifier;
        assert!(notifier
            .confirm_created("a@example.com", "summary")
            .await
            .is_ok());
    }
}
