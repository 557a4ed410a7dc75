//! Database Migrations
//!
//! Schema migration definitions for the storage layer.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Initial schema: review rows, interval ladder, student profile",
    up: MIGRATION_V1_UP,
}];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Initial schema
const MIGRATION_V1_UP: &str = r#"
-- One row per learned item; upserted on every review, never deleted.
-- Timestamps are UTC text, %Y-%m-%dT%H:%M:%SZ; intervals are seconds.
CREATE TABLE IF NOT EXISTS review (
    item TEXT PRIMARY KEY,
    interval INTEGER NOT NULL,
    due TEXT NOT NULL,
    learned TEXT NOT NULL,
    reviewed TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_review_due ON review(due);
CREATE INDEX IF NOT EXISTS idx_review_interval ON review(interval);

-- Interval ladder; the primary key keeps rungs unique and ordered.
CREATE TABLE IF NOT EXISTS interval (
    interval INTEGER PRIMARY KEY,
    correct INTEGER NOT NULL DEFAULT 0,
    incorrect INTEGER NOT NULL DEFAULT 0
);

-- Anchor rungs: 0 and 1 day.
INSERT OR IGNORE INTO interval (interval) VALUES (0), (86400);

-- Learner profile singleton.
CREATE TABLE IF NOT EXISTS student (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    frequency_class INTEGER NOT NULL DEFAULT 0,
    correct INTEGER NOT NULL DEFAULT 0,
    incorrect INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO student (id) VALUES (1);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// Get current schema version from database
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );
            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}

// ============================================================================
// TESTS
// ============================================================================
