//! Store trait: the abstract interface for record persistence.
//!
//! This trait allows the registration engine to be storage-agnostic.
//! Implementations include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use confab_core::{Conference, ConferenceQuery, EntityKey, Profile, UserId};

use crate::error::Result;

/// The version of one entity group, observed at transaction begin.
///
/// A snapshot names the group's root key and the version counter seen when
/// the transaction started. [`Store::commit`] only applies writes while
/// every presented snapshot is still current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSnapshot {
    /// Root key of the entity group (a profile key).
    pub root: EntityKey,
    /// Group version at begin; 0 for a group never written.
    pub version: u64,
}

/// Records to persist together in one commit.
#[derive(Debug, Clone, Default)]
pub struct GroupWrite {
    /// Profile upserts.
    pub profiles: Vec<Profile>,
    /// Conference upserts.
    pub conferences: Vec<Conference>,
}

impl GroupWrite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a profile upsert.
    pub fn profile(mut self, profile: Profile) -> Self {
        self.profiles.push(profile);
        self
    }

    /// Add a conference upsert.
    pub fn conference(mut self, conference: Conference) -> Self {
        self.conferences.push(conference);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty() && self.conferences.is_empty()
    }
}

/// Result of a commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Every snapshot was current; all writes were applied atomically.
    Committed,
    /// Some group changed since its snapshot was taken. Nothing was
    /// written; the caller re-reads and retries.
    Contended,
}

impl CommitOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed)
    }
}

/// The Store trait: async interface for record persistence with
/// entity-group optimistic transactions.
///
/// # Design Notes
///
/// - **Entity groups**: every record belongs to the group rooted at a
///   profile key. Conferences are descendants of their organizer's
///   profile, so a registration can update both records in one commit.
/// - **Optimistic concurrency**: `begin` observes a group's version,
///   `commit` validates all observed versions and applies the write set
///   atomically or reports [`CommitOutcome::Contended`] without touching
///   state. Contention is a value, not an error.
/// - **Reads are plain**: a read between `begin` and `commit` may see
///   newer state, but the version check at commit then fails and the
///   caller retries from fresh reads.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────

    /// Observe the current version of the entity group rooted at `root`.
    async fn begin(&self, root: &EntityKey) -> Result<GroupSnapshot>;

    /// Validate every snapshot and apply the write set atomically.
    ///
    /// On any stale snapshot, nothing is written and `Contended` is
    /// returned. On success the version of every snapshotted group is
    /// advanced, so overlapping commits against the same groups cannot
    /// both succeed.
    async fn commit(
        &self,
        snapshots: &[GroupSnapshot],
        write: GroupWrite,
    ) -> Result<CommitOutcome>;

    // ─────────────────────────────────────────────────────────────────────
    // Profiles
    // ─────────────────────────────────────────────────────────────────────

    /// Get a profile by user id.
    async fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>>;

    // ─────────────────────────────────────────────────────────────────────
    // Conferences
    // ─────────────────────────────────────────────────────────────────────

    /// Reserve a fresh conference id under the organizer's profile key,
    /// without creating a record.
    async fn allocate_conference_id(&self, organizer: &EntityKey) -> Result<u64>;

    /// Get a conference by key. Keys that do not address a conference
    /// resolve to `None`.
    async fn get_conference(&self, key: &EntityKey) -> Result<Option<Conference>>;

    /// Multi-get conferences, preserving input order and skipping absent
    /// keys.
    async fn get_conferences(&self, keys: &[EntityKey]) -> Result<Vec<Conference>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(conference) = self.get_conference(key).await? {
                out.push(conference);
            }
        }
        Ok(out)
    }

    /// All conferences under the given organizer profile key, ordered by
    /// name.
    async fn conferences_by_organizer(&self, organizer: &EntityKey) -> Result<Vec<Conference>>;

    /// Execute a query. The caller validates the query shape first.
    async fn query_conferences(&self, query: &ConferenceQuery) -> Result<Vec<Conference>>;
}
