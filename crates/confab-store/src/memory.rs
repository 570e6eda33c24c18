//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite but
//! keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use confab_core::{Conference, ConferenceQuery, EntityKey, Profile, UserId};

use crate::error::{Result, StoreError};
use crate::traits::{CommitOutcome, GroupSnapshot, GroupWrite, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    /// Profiles indexed by user id.
    profiles: HashMap<UserId, Profile>,

    /// Conferences indexed by (organizer, id).
    conferences: HashMap<(UserId, u64), Conference>,

    /// Entity-group version counters, keyed by group root.
    groups: HashMap<EntityKey, u64>,

    /// Next conference id to allocate.
    next_conference_id: u64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                profiles: HashMap::new(),
                conferences: HashMap::new(),
                groups: HashMap::new(),
                next_conference_id: 1,
            }),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::InvalidData(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::InvalidData(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self, root: &EntityKey) -> Result<GroupSnapshot> {
        let inner = self.read()?;
        let version = inner.groups.get(root).copied().unwrap_or(0);
        Ok(GroupSnapshot {
            root: root.clone(),
            version,
        })
    }

    async fn commit(
        &self,
        snapshots: &[GroupSnapshot],
        write: GroupWrite,
    ) -> Result<CommitOutcome> {
        let mut inner = self.write()?;

        // Validate every snapshot before touching anything.
        for snap in snapshots {
            let current = inner.groups.get(&snap.root).copied().unwrap_or(0);
            if current != snap.version {
                tracing::debug!(root = %snap.root, "commit contended");
                return Ok(CommitOutcome::Contended);
            }
        }

        for snap in snapshots {
            inner.groups.insert(snap.root.clone(), snap.version + 1);
        }

        for profile in write.profiles {
            inner.profiles.insert(profile.user_id().clone(), profile);
        }
        for conference in write.conferences {
            inner.conferences.insert(
                (conference.organizer_user_id().clone(), conference.id()),
                conference,
            );
        }

        Ok(CommitOutcome::Committed)
    }

    async fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>> {
        let inner = self.read()?;
        Ok(inner.profiles.get(user_id).cloned())
    }

    async fn allocate_conference_id(&self, _organizer: &EntityKey) -> Result<u64> {
        let mut inner = self.write()?;
        let id = inner.next_conference_id;
        inner.next_conference_id += 1;
        Ok(id)
    }

    async fn get_conference(&self, key: &EntityKey) -> Result<Option<Conference>> {
        let Some((organizer, id)) = key.as_conference() else {
            return Ok(None);
        };
        let inner = self.read()?;
        Ok(inner.conferences.get(&(organizer, id)).cloned())
    }

    async fn conferences_by_organizer(&self, organizer: &EntityKey) -> Result<Vec<Conference>> {
        let Some(user_id) = organizer.as_profile() else {
            return Ok(Vec::new());
        };
        let inner = self.read()?;
        let mut conferences: Vec<Conference> = inner
            .conferences
            .values()
            .filter(|c| c.organizer_user_id() == &user_id)
            .cloned()
            .collect();
        conferences.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(conferences)
    }

    async fn query_conferences(&self, query: &ConferenceQuery) -> Result<Vec<Conference>> {
        let inner = self.read()?;
        let conferences: Vec<Conference> = inner.conferences.values().cloned().collect();
        Ok(query.apply(conferences))
    }
}
