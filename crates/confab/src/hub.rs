//! The ConferenceHub: unified API for the confab system.
//!
//! The hub brings together storage, the transactional registration engine,
//! and the collaborator seams into a cohesive interface. Every mutation
//! runs as an optimistic entity-group transaction: read, apply guards,
//! commit; a contended commit is retried from fresh reads under a bounded
//! backoff policy, so guard conditions are always re-evaluated against
//! current state.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use confab_core::{
    Conference, ConferenceForm, ConferenceQuery, EntityKey, EntityKind, Identity, Profile,
    ProfileForm,
};
use confab_store::{CommitOutcome, GroupWrite, Store};

use crate::collab::{Announcement, AnnouncementCache, MemoryAnnouncementCache, NullNotifier, Notifier};
use crate::error::{HubError, Result};

/// Retry policy for contended transactions.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts before giving up (first try included).
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per attempt, capped.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(5),
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `attempt + 1` (1-based).
    fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(6);
        (self.base_delay * factor).min(Duration::from_millis(500))
    }
}

/// Configuration for the hub.
#[derive(Debug, Clone, Default)]
pub struct HubConfig {
    /// Retry policy for contended transactions.
    pub retry: RetryPolicy,
}

/// Result of a registration operation.
///
/// This is the complete result space: the boundary layer maps `Ok` to
/// success and each other value to a specific user-facing error. Guard
/// failures never surface as `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The state transition was applied and committed.
    Ok,
    /// The conference key decodes but no such record exists.
    NotFound,
    /// The user is already registered for this conference.
    AlreadyRegistered,
    /// No seats remain.
    NoSeats,
    /// The user is not registered for this conference.
    NotRegistered,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Ok => "ok",
            Outcome::NotFound => "not found",
            Outcome::AlreadyRegistered => "already registered",
            Outcome::NoSeats => "no seats available",
            Outcome::NotRegistered => "not registered",
        };
        write!(f, "{}", s)
    }
}

/// One transaction attempt either produced a final value or lost the race
/// and must re-run from fresh reads.
enum Attempt<T> {
    Done(T),
    Contended,
}

/// The main hub struct.
///
/// Provides a unified API for:
/// - Saving and reading profiles
/// - Creating conferences
/// - Registering for and unregistering from conferences
/// - Querying conferences
/// - Reading the current announcement
pub struct ConferenceHub<S: Store> {
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
    announcements: Arc<dyn AnnouncementCache>,
    config: HubConfig,
}

impl<S: Store> ConferenceHub<S> {
    /// Create a hub with default collaborators (no-op notifier, in-memory
    /// announcement cache).
    pub fn new(store: S, config: HubConfig) -> Self {
        Self::with_collaborators(
            store,
            Arc::new(NullNotifier),
            Arc::new(MemoryAnnouncementCache::new()),
            config,
        )
    }

    /// Create a hub with explicit collaborators.
    pub fn with_collaborators(
        store: S,
        notifier: Arc<dyn Notifier>,
        announcements: Arc<dyn AnnouncementCache>,
        config: HubConfig,
    ) -> Self {
        Self {
            store: Arc::new(store),
            notifier,
            announcements,
            config,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────
    // Profiles
    // ─────────────────────────────────────────────────────────────────────

    /// Get the caller's profile, if one has been saved.
    pub async fn get_profile(&self, identity: &Identity) -> Result<Option<Profile>> {
        Ok(self.store.get_profile(&identity.user_id).await?)
    }

    /// Create or update the caller's profile from a form.
    ///
    /// Only provided-and-different fields are applied; an update that
    /// changes nothing skips the write entirely. The attendance list is
    /// never touched through this path.
    pub async fn save_profile(&self, identity: &Identity, form: ProfileForm) -> Result<Profile> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_save_profile(identity, &form).await? {
                Attempt::Done(profile) => return Ok(profile),
                Attempt::Contended => self.backoff(attempt).await?,
            }
        }
    }

    async fn try_save_profile(
        &self,
        identity: &Identity,
        form: &ProfileForm,
    ) -> Result<Attempt<Profile>> {
        let root = EntityKey::profile(&identity.user_id);
        let snapshot = self.store.begin(&root).await?;

        let existing = self.store.get_profile(&identity.user_id).await?;
        let is_new = existing.is_none();
        let mut profile = Profile::or_default(existing, identity);
        let changed = profile.update(form);

        if !is_new && !changed {
            return Ok(Attempt::Done(profile));
        }

        let write = GroupWrite::new().profile(profile.clone());
        match self.store.commit(&[snapshot], write).await? {
            CommitOutcome::Committed => Ok(Attempt::Done(profile)),
            CommitOutcome::Contended => Ok(Attempt::Contended),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Conference Creation
    // ─────────────────────────────────────────────────────────────────────

    /// Create a conference organized by the caller.
    ///
    /// The conference is keyed under the organizer's profile and persisted
    /// together with it in one transaction. After the commit a best-effort
    /// confirmation is dispatched; notification failure never affects the
    /// committed record.
    pub async fn create_conference(
        &self,
        identity: &Identity,
        form: ConferenceForm,
    ) -> Result<Conference> {
        let root = EntityKey::profile(&identity.user_id);
        // Ids are reserved outside the retry loop; one burned on a
        // contended attempt is harmless.
        let id = self.store.allocate_conference_id(&root).await?;

        let mut attempt = 0;
        let conference = loop {
            attempt += 1;
            match self.try_create_conference(identity, id, &form).await? {
                Attempt::Done(conference) => break conference,
                Attempt::Contended => self.backoff(attempt).await?,
            }
        };

        tracing::info!(
            organizer = %identity.user_id,
            conference = %conference.key(),
            seats = conference.max_attendees(),
            "conference created"
        );

        if let Err(e) = self
            .notifier
            .confirm_created(&identity.email, &conference.summary())
            .await
        {
            tracing::warn!(error = %e, "confirmation notification failed");
        }

        Ok(conference)
    }

    async fn try_create_conference(
        &self,
        identity: &Identity,
        id: u64,
        form: &ConferenceForm,
    ) -> Result<Attempt<Conference>> {
        let root = EntityKey::profile(&identity.user_id);
        let snapshot = self.store.begin(&root).await?;

        let profile =
            Profile::or_default(self.store.get_profile(&identity.user_id).await?, identity);
        let conference = Conference::new(id, identity.user_id.clone(), form.clone());

        let write = GroupWrite::new()
            .profile(profile)
            .conference(conference.clone());
        match self.store.commit(&[snapshot], write).await? {
            CommitOutcome::Committed => Ok(Attempt::Done(conference)),
            CommitOutcome::Contended => Ok(Attempt::Contended),
        }
    }

    /// Get a conference by its opaque key.
    pub async fn get_conference(&self, conference_key: &str) -> Result<Option<Conference>> {
        let key = EntityKey::decode(conference_key)?;
        key.expect_kind(EntityKind::Conference)?;
        Ok(self.store.get_conference(&key).await?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────

    /// Register the caller for a conference.
    ///
    /// Guard order is load-bearing: a user already registered for a full
    /// conference gets `AlreadyRegistered`, not `NoSeats`.
    pub async fn register(&self, identity: &Identity, conference_key: &str) -> Result<Outcome> {
        let key = EntityKey::decode(conference_key)?;
        key.expect_kind(EntityKind::Conference)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_register(identity, &key).await? {
                Attempt::Done(outcome) => {
                    if outcome.is_ok() {
                        tracing::info!(user = %identity.user_id, conference = %key, "registered");
                    }
                    return Ok(outcome);
                }
                Attempt::Contended => self.backoff(attempt).await?,
            }
        }
    }

    async fn try_register(&self, identity: &Identity, key: &EntityKey) -> Result<Attempt<Outcome>> {
        let snapshots = self.begin_groups(identity, key).await?;

        let Some(mut conference) = self.store.get_conference(key).await? else {
            return Ok(Attempt::Done(Outcome::NotFound));
        };
        let mut profile =
            Profile::or_default(self.store.get_profile(&identity.user_id).await?, identity);

        if profile.attends(key) {
            return Ok(Attempt::Done(Outcome::AlreadyRegistered));
        }
        if conference.book_seats(1).is_err() {
            return Ok(Attempt::Done(Outcome::NoSeats));
        }
        profile.add_attendance(key.clone());

        let write = GroupWrite::new().profile(profile).conference(conference);
        match self.store.commit(&snapshots, write).await? {
            CommitOutcome::Committed => Ok(Attempt::Done(Outcome::Ok)),
            CommitOutcome::Contended => Ok(Attempt::Contended),
        }
    }

    /// Unregister the caller from a conference, releasing its seat.
    pub async fn unregister(&self, identity: &Identity, conference_key: &str) -> Result<Outcome> {
        let key = EntityKey::decode(conference_key)?;
        key.expect_kind(EntityKind::Conference)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_unregister(identity, &key).await? {
                Attempt::Done(outcome) => {
                    if outcome.is_ok() {
                        tracing::info!(user = %identity.user_id, conference = %key, "unregistered");
                    }
                    return Ok(outcome);
                }
                Attempt::Contended => self.backoff(attempt).await?,
            }
        }
    }

    async fn try_unregister(
        &self,
        identity: &Identity,
        key: &EntityKey,
    ) -> Result<Attempt<Outcome>> {
        let snapshots = self.begin_groups(identity, key).await?;

        let Some(mut conference) = self.store.get_conference(key).await? else {
            return Ok(Attempt::Done(Outcome::NotFound));
        };
        let Some(mut profile) = self.store.get_profile(&identity.user_id).await? else {
            return Ok(Attempt::Done(Outcome::NotRegistered));
        };

        if !profile.remove_attendance(key) {
            return Ok(Attempt::Done(Outcome::NotRegistered));
        }
        conference.release_seats(1);

        let write = GroupWrite::new().profile(profile).conference(conference);
        match self.store.commit(&snapshots, write).await? {
            CommitOutcome::Committed => Ok(Attempt::Done(Outcome::Ok)),
            CommitOutcome::Contended => Ok(Attempt::Contended),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    /// Conferences the caller is registered for, in registration order.
    pub async fn conferences_to_attend(&self, identity: &Identity) -> Result<Vec<Conference>> {
        let profile = self
            .store
            .get_profile(&identity.user_id)
            .await?
            .ok_or_else(|| HubError::ProfileNotFound(identity.user_id.clone()))?;
        Ok(self
            .store
            .get_conferences(profile.conference_keys_to_attend())
            .await?)
    }

    /// Conferences organized by the caller, ordered by name.
    pub async fn conferences_created(&self, identity: &Identity) -> Result<Vec<Conference>> {
        let root = EntityKey::profile(&identity.user_id);
        Ok(self.store.conferences_by_organizer(&root).await?)
    }

    /// Run a filtered/sorted conference query.
    ///
    /// The shape check runs before any store access.
    pub async fn query_conferences(&self, query: ConferenceQuery) -> Result<Vec<Conference>> {
        query.validate()?;
        Ok(self.store.query_conferences(&query).await?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Announcements
    // ─────────────────────────────────────────────────────────────────────

    /// The current site-wide announcement, if one is published.
    pub fn current_announcement(&self) -> Option<Announcement> {
        self.announcements
            .read_current()
            .map(|message| Announcement { message })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    /// Snapshot the entity groups a registration touches: the conference's
    /// group and the registrant's, deduplicated when the registrant is the
    /// organizer.
    async fn begin_groups(
        &self,
        identity: &Identity,
        conference_key: &EntityKey,
    ) -> Result<Vec<confab_store::GroupSnapshot>> {
        let conference_root = conference_key.root();
        let profile_root = EntityKey::profile(&identity.user_id);

        let mut snapshots = vec![self.store.begin(&conference_root).await?];
        if profile_root != conference_root {
            snapshots.push(self.store.begin(&profile_root).await?);
        }
        Ok(snapshots)
    }

    /// Sleep before the next attempt, or give up when the budget is spent.
    async fn backoff(&self, attempt: u32) -> Result<()> {
        if attempt >= self.config.retry.max_attempts {
            return Err(HubError::TransientStore { attempts: attempt });
        }
        tracing::debug!(attempt, "transaction contended, retrying");
        tokio::time::sleep(self.config.retry.delay(attempt)).await;
        Ok(())
    }
}
