//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL
//! string that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at)
                 VALUES (?1, datetime('now'))",
                rusqlite::params![version],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Profiles: one row per user, entity-group roots
        CREATE TABLE profiles (
            user_id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            main_email TEXT NOT NULL,
            tee_shirt_size TEXT NOT NULL,
            attending BLOB NOT NULL           -- CBOR array of conference keys
        );

        -- Conferences: children of their organizer's profile
        CREATE TABLE conferences (
            organizer_user_id TEXT NOT NULL,
            conference_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            city TEXT,
            topics BLOB NOT NULL,             -- CBOR array of strings
            start_date TEXT,                  -- ISO-8601 date
            end_date TEXT,
            max_attendees INTEGER NOT NULL,
            seats_available INTEGER NOT NULL,
            PRIMARY KEY (organizer_user_id, conference_id)
        );

        CREATE INDEX idx_conferences_name ON conferences(organizer_user_id, name);

        -- Optimistic-concurrency version counter per entity group
        CREATE TABLE entity_groups (
            root TEXT PRIMARY KEY,            -- encoded group root key
            version INTEGER NOT NULL
        );

        -- Id allocation counters
        CREATE TABLE id_allocations (
            kind TEXT PRIMARY KEY,
            next_id INTEGER NOT NULL
        );
        "#,
    )?;

    Ok(())
}
