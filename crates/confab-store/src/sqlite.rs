//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking. Entity-group
//! versions live in the `entity_groups` table and every commit validates
//! them inside one SQLite transaction.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use confab_core::{
    Conference, ConferenceQuery, EntityKey, Profile, TeeShirtSize, UserId,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{CommitOutcome, GroupSnapshot, GroupWrite, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking to
/// avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database. Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

/// Lock the connection, mapping a poisoned mutex to a database error.
fn lock(conn: &Arc<Mutex<Connection>>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|e| {
        StoreError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            Some(format!("mutex poisoned: {}", e)),
        ))
    })
}

/// Map a spawn_blocking join failure to a database error.
fn join_failed(e: tokio::task::JoinError) -> StoreError {
    StoreError::Database(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
        Some(format!("spawn_blocking failed: {}", e)),
    ))
}

fn encode_cbor<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode_cbor<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn date_to_column(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

fn date_from_column(s: Option<String>) -> Result<Option<NaiveDate>> {
    s.map(|s| {
        NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map_err(|e| StoreError::InvalidData(format!("bad date column {:?}: {}", s, e)))
    })
    .transpose()
}

/// Read one `profiles` row. CBOR columns are decoded outside the rusqlite
/// row callback so decode failures surface as store errors.
fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, String, Vec<u8>)> {
    Ok((
        row.get("user_id")?,
        row.get("display_name")?,
        row.get("main_email")?,
        row.get("tee_shirt_size")?,
        row.get("attending")?,
    ))
}

fn profile_from_columns(
    (user_id, display_name, main_email, size, attending): (String, String, String, String, Vec<u8>),
) -> Result<Profile> {
    let tee_shirt_size = TeeShirtSize::parse(&size)
        .ok_or_else(|| StoreError::InvalidData(format!("unknown tee shirt size: {}", size)))?;
    let attending: Vec<EntityKey> = decode_cbor(&attending)?;
    Ok(Profile::from_parts(
        UserId::new(user_id),
        display_name,
        main_email,
        tee_shirt_size,
        attending,
    ))
}

type ConferenceColumns = (
    String,         // organizer_user_id
    i64,            // conference_id
    String,         // name
    Option<String>, // description
    Option<String>, // city
    Vec<u8>,        // topics (CBOR)
    Option<String>, // start_date
    Option<String>, // end_date
    i64,            // max_attendees
    i64,            // seats_available
);

fn row_to_conference_columns(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConferenceColumns> {
    Ok((
        row.get("organizer_user_id")?,
        row.get("conference_id")?,
        row.get("name")?,
        row.get("description")?,
        row.get("city")?,
        row.get("topics")?,
        row.get("start_date")?,
        row.get("end_date")?,
        row.get("max_attendees")?,
        row.get("seats_available")?,
    ))
}

fn conference_from_columns(cols: ConferenceColumns) -> Result<Conference> {
    let (organizer, id, name, description, city, topics, start, end, max, seats) = cols;
    let topics: Vec<String> = decode_cbor(&topics)?;
    Ok(Conference::from_parts(
        id as u64,
        UserId::new(organizer),
        name,
        description,
        city,
        topics,
        date_from_column(start)?,
        date_from_column(end)?,
        max as u32,
        seats as u32,
    ))
}

fn upsert_profile(conn: &Connection, profile: &Profile) -> Result<()> {
    let attending = encode_cbor(&profile.conference_keys_to_attend().to_vec())?;
    conn.execute(
        "INSERT INTO profiles (user_id, display_name, main_email, tee_shirt_size, attending)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_id) DO UPDATE SET
             display_name = ?2, tee_shirt_size = ?4, attending = ?5",
        params![
            profile.user_id().as_str(),
            profile.display_name(),
            profile.main_email(),
            profile.tee_shirt_size().as_str(),
            attending,
        ],
    )?;
    Ok(())
}

fn upsert_conference(conn: &Connection, conference: &Conference) -> Result<()> {
    let topics = encode_cbor(&conference.topics().to_vec())?;
    conn.execute(
        "INSERT INTO conferences (
            organizer_user_id, conference_id, name, description, city,
            topics, start_date, end_date, max_attendees, seats_available
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(organizer_user_id, conference_id) DO UPDATE SET
            seats_available = ?10",
        params![
            conference.organizer_user_id().as_str(),
            conference.id() as i64,
            conference.name(),
            conference.description(),
            conference.city(),
            topics,
            date_to_column(conference.start_date()),
            date_to_column(conference.end_date()),
            conference.max_attendees() as i64,
            conference.seats_available() as i64,
        ],
    )?;
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn begin(&self, root: &EntityKey) -> Result<GroupSnapshot> {
        let root = root.clone();
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let version: Option<i64> = conn
                .query_row(
                    "SELECT version FROM entity_groups WHERE root = ?1",
                    params![root.encode()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(GroupSnapshot {
                root,
                version: version.unwrap_or(0) as u64,
            })
        })
        .await
        .map_err(join_failed)?
    }

    async fn commit(
        &self,
        snapshots: &[GroupSnapshot],
        write: GroupWrite,
    ) -> Result<CommitOutcome> {
        let snapshots = snapshots.to_vec();
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = lock(&conn)?;
            let tx = conn.transaction()?;

            // Validate every snapshot before writing anything. Dropping
            // the transaction on the contended path rolls back.
            for snap in &snapshots {
                let current: Option<i64> = tx
                    .query_row(
                        "SELECT version FROM entity_groups WHERE root = ?1",
                        params![snap.root.encode()],
                        |row| row.get(0),
                    )
                    .optional()?;
                if current.unwrap_or(0) as u64 != snap.version {
                    tracing::debug!(root = %snap.root, "commit contended");
                    return Ok(CommitOutcome::Contended);
                }
            }

            for snap in &snapshots {
                tx.execute(
                    "INSERT INTO entity_groups (root, version) VALUES (?1, ?2)
                     ON CONFLICT(root) DO UPDATE SET version = ?2",
                    params![snap.root.encode(), (snap.version + 1) as i64],
                )?;
            }

            for profile in &write.profiles {
                upsert_profile(&tx, profile)?;
            }
            for conference in &write.conferences {
                upsert_conference(&tx, conference)?;
            }

            tx.commit()?;
            Ok(CommitOutcome::Committed)
        })
        .await
        .map_err(join_failed)?
    }

    async fn get_profile(&self, user_id: &UserId) -> Result<Option<Profile>> {
        let user_id = user_id.clone();
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let columns = conn
                .query_row(
                    "SELECT user_id, display_name, main_email, tee_shirt_size, attending
                     FROM profiles WHERE user_id = ?1",
                    params![user_id.as_str()],
                    row_to_profile,
                )
                .optional()?;
            columns.map(profile_from_columns).transpose()
        })
        .await
        .map_err(join_failed)?
    }

    async fn allocate_conference_id(&self, _organizer: &EntityKey) -> Result<u64> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = lock(&conn)?;
            let tx = conn.transaction()?;

            let current: Option<i64> = tx
                .query_row(
                    "SELECT next_id FROM id_allocations WHERE kind = 'conference'",
                    [],
                    |row| row.get(0),
                )
                .optional()?;
            let id = current.unwrap_or(1);

            tx.execute(
                "INSERT INTO id_allocations (kind, next_id) VALUES ('conference', ?1)
                 ON CONFLICT(kind) DO UPDATE SET next_id = ?1",
                params![id + 1],
            )?;

            tx.commit()?;
            Ok(id as u64)
        })
        .await
        .map_err(join_failed)?
    }

    async fn get_conference(&self, key: &EntityKey) -> Result<Option<Conference>> {
        let Some((organizer, id)) = key.as_conference() else {
            return Ok(None);
        };
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let columns = conn
                .query_row(
                    "SELECT organizer_user_id, conference_id, name, description, city,
                            topics, start_date, end_date, max_attendees, seats_available
                     FROM conferences
                     WHERE organizer_user_id = ?1 AND conference_id = ?2",
                    params![organizer.as_str(), id as i64],
                    row_to_conference_columns,
                )
                .optional()?;
            columns.map(conference_from_columns).transpose()
        })
        .await
        .map_err(join_failed)?
    }

    async fn conferences_by_organizer(&self, organizer: &EntityKey) -> Result<Vec<Conference>> {
        let Some(user_id) = organizer.as_profile() else {
            return Ok(Vec::new());
        };
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let mut stmt = conn.prepare(
                "SELECT organizer_user_id, conference_id, name, description, city,
                        topics, start_date, end_date, max_attendees, seats_available
                 FROM conferences WHERE organizer_user_id = ?1 ORDER BY name",
            )?;
            let rows = stmt.query_map(params![user_id.as_str()], row_to_conference_columns)?;

            let mut conferences = Vec::new();
            for row in rows {
                conferences.push(conference_from_columns(row?)?);
            }
            Ok(conferences)
        })
        .await
        .map_err(join_failed)?
    }

    async fn query_conferences(&self, query: &ConferenceQuery) -> Result<Vec<Conference>> {
        let query = query.clone();
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let mut stmt = conn.prepare(
                "SELECT organizer_user_id, conference_id, name, description, city,
                        topics, start_date, end_date, max_attendees, seats_available
                 FROM conferences",
            )?;
            let rows = stmt.query_map([], row_to_conference_columns)?;

            let mut conferences = Vec::new();
            for row in rows {
                conferences.push(conference_from_columns(row?)?);
            }
            // Filter/sort evaluation is shared with the in-memory backend.
            Ok(query.apply(conferences))
        })
        .await
        .map_err(join_failed)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confab_core::{ConferenceForm, Identity};

    fn sample_conference(organizer: &str, id: u64, name: &str, seats: u32) -> Conference {
        Conference::new(
            id,
            UserId::new(organizer),
            ConferenceForm {
                name: name.to_string(),
                city: Some("London".to_string()),
                topics: vec!["rust".to_string()],
                start_date: NaiveDate::from_ymd_opt(2026, 6, 1),
                end_date: NaiveDate::from_ymd_opt(2026, 6, 3),
                max_attendees: seats,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_profile_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let identity = Identity::new("alice", "alice@example.com");
        let mut profile = Profile::or_default(None, &identity);
        profile.add_attendance(EntityKey::conference(&UserId::new("bob"), 4));

        let snap = store.begin(&profile.key()).await.unwrap();
        store
            .commit(&[snap], GroupWrite::new().profile(profile.clone()))
            .await
            .unwrap();

        let loaded = store.get_profile(profile.user_id()).await.unwrap();
        assert_eq!(loaded, Some(profile));
    }

    #[tokio::test]
    async fn test_conference_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let conference = sample_conference("bob", 1, "RustConf", 100);
        let root = conference.parent().clone();

        let snap = store.begin(&root).await.unwrap();
        store
            .commit(&[snap], GroupWrite::new().conference(conference.clone()))
            .await
            .unwrap();

        let loaded = store.get_conference(&conference.key()).await.unwrap();
        assert_eq!(loaded, Some(conference));
    }

    #[tokio::test]
    async fn test_contended_commit_rolls_back() {
        let store = SqliteStore::open_memory().unwrap();
        let conference = sample_conference("bob", 1, "RustConf", 10);
        let root = conference.parent().clone();

        let snap_a = store.begin(&root).await.unwrap();
        let snap_b = store.begin(&root).await.unwrap();

        let first = store
            .commit(&[snap_a], GroupWrite::new().conference(conference.clone()))
            .await
            .unwrap();
        assert_eq!(first, CommitOutcome::Committed);

        let mut stale = conference.clone();
        stale.book_seats(5).unwrap();
        let second = store
            .commit(&[snap_b], GroupWrite::new().conference(stale))
            .await
            .unwrap();
        assert_eq!(second, CommitOutcome::Contended);

        let loaded = store
            .get_conference(&conference.key())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.seats_available(), 10);
    }

    #[tokio::test]
    async fn test_allocate_conference_ids() {
        let store = SqliteStore::open_memory().unwrap();
        let organizer = EntityKey::profile(&UserId::new("bob"));
        let a = store.allocate_conference_id(&organizer).await.unwrap();
        let b = store.allocate_conference_id(&organizer).await.unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[tokio::test]
    async fn test_query_roundtrip() {
        use confab_core::{ConferenceField, FilterOp, FilterValue};

        let store = SqliteStore::open_memory().unwrap();
        let root = EntityKey::profile(&UserId::new("bob"));
        let snap = store.begin(&root).await.unwrap();
        store
            .commit(
                &[snap],
                GroupWrite::new()
                    .conference(sample_conference("bob", 1, "Small", 5))
                    .conference(sample_conference("bob", 2, "Large", 500)),
            )
            .await
            .unwrap();

        let query = ConferenceQuery::new().filter(
            ConferenceField::MaxAttendees,
            FilterOp::Gt,
            FilterValue::Number(10),
        );
        let result = store.query_conferences(&query).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name(), "Large");
    }

    #[tokio::test]
    async fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("confab.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            let conference = sample_conference("bob", 1, "Persisted", 10);
            let snap = store.begin(conference.parent()).await.unwrap();
            store
                .commit(&[snap], GroupWrite::new().conference(conference))
                .await
                .unwrap();
        }

        // Reopen and read back.
        let store = SqliteStore::open(&path).unwrap();
        let key = EntityKey::conference(&UserId::new("bob"), 1);
        let loaded = store.get_conference(&key).await.unwrap().unwrap();
        assert_eq!(loaded.name(), "Persisted");
    }
}
