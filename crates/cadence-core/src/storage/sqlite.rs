//! SQLite Storage Implementation
//!
//! Review rows, the interval ladder, and the learner profile behind one
//! SQLite database. Every review update runs as a single transaction:
//! outcome statistics, the spacing-policy reschedule, the review upsert,
//! and a full tuning pass commit together or not at all.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use rusqlite::{Connection, OptionalExtension, params};

use crate::review::{IntervalRung, Review, StudentProfile};
use crate::spacing::{LadderPolicy, SpacingPolicy};
use crate::tuning;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// TIMESTAMPS
// ============================================================================

/// Canonical timestamp encoding: UTC RFC 3339 at second resolution.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a stored timestamp. A value that fails to parse is fatal to the
/// enclosing operation.
fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| StorageError::InvalidTimestamp(text.to_string()))
}

// ============================================================================
// STORAGE
// ============================================================================

/// Review store with auto-tuning.
///
/// Uses separate reader/writer connections for interior mutability. All
/// methods take `&self` (not `&mut self`), making `Storage` `Send + Sync`
/// so callers can share it as `Arc<Storage>`. Every update holds the
/// writer lock for its whole transaction, serializing ladder and profile
/// mutation against concurrent calls.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    policy: Box<dyn SpacingPolicy>,
}

impl Storage {
    /// Apply PRAGMAs to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    /// Create new storage with the default ladder spacing policy.
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        Self::with_policy(db_path, Box::new(LadderPolicy))
    }

    /// Create new storage with a caller-supplied spacing policy.
    pub fn with_policy(db_path: Option<PathBuf>, policy: Box<dyn SpacingPolicy>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let proj_dirs = ProjectDirs::from("com", "cadence", "core").ok_or_else(|| {
                    StorageError::Init("Could not determine project directories".to_string())
                })?;
                let data_dir = proj_dirs.data_dir();
                std::fs::create_dir_all(data_dir)?;
                data_dir.join("cadence.db")
            }
        };

        let writer = Connection::open(&path)?;
        Self::configure_connection(&writer)?;

        // Apply migrations on writer only
        super::migrations::apply_migrations(&writer)?;

        let reader = Connection::open(&path)?;
        Self::configure_connection(&reader)?;

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            policy,
        })
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))
    }

    fn lock_reader(&self) -> Result<MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))
    }

    // ------------------------------------------------------------------------
    // Write path
    // ------------------------------------------------------------------------

    /// Records a review outcome for `item` at the current time.
    pub fn update_review(&self, item: &str, correct: bool) -> Result<Review> {
        self.update_review_at(item, correct, Utc::now())
    }

    /// Records a review outcome for `item` as of `now`.
    ///
    /// One atomic unit of work: the rung statistics update, the
    /// spacing-policy reschedule, the review upsert, and a full tuning pass
    /// either all commit or none do.
    pub fn update_review_at(
        &self,
        item: &str,
        correct: bool,
        now: DateTime<Utc>,
    ) -> Result<Review> {
        let mut writer = self.lock_writer()?;
        let tx = writer.transaction()?;

        let previous = most_recent_review(&tx, item)?;

        // A review before the due date is cramming; it reschedules the item
        // but must not feed the tuning statistics.
        let crammed = previous.as_ref().is_some_and(|review| now < review.due);
        if !crammed {
            record_rung_outcome(&tx, previous.as_ref(), correct)?;
        }

        let rungs = ladder(&tx)?;
        let next = self
            .policy
            .next_review(&rungs, previous.as_ref(), correct, now);

        // Keep every review pointing at an existing rung.
        tx.execute(
            "INSERT OR IGNORE INTO interval (interval) VALUES (?1)",
            [next.interval.num_seconds()],
        )?;

        tx.execute(
            "INSERT INTO review (item, interval, due, learned, reviewed)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT (item) DO UPDATE SET
                interval = excluded.interval,
                due = excluded.due,
                reviewed = excluded.reviewed",
            params![
                item,
                next.interval.num_seconds(),
                format_timestamp(next.due),
                format_timestamp(now),
            ],
        )?;

        tuning::auto_tune(&tx)?;
        tx.commit()?;

        Ok(Review {
            interval: next.interval,
            due: next.due,
            reviewed: now,
        })
    }

    // ------------------------------------------------------------------------
    // Read paths
    // ------------------------------------------------------------------------

    /// Items with a due date before `due`, ascending by due date, capped at
    /// `count`. A negative `count` returns all of them.
    pub fn schedule_review(&self, due: DateTime<Utc>, count: i64) -> Result<Vec<String>> {
        let reader = self.lock_reader()?;
        let mut stmt =
            reader.prepare("SELECT item FROM review WHERE due < ?1 ORDER BY due LIMIT ?2")?;
        let rows = stmt.query_map(params![format_timestamp(due), count], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    /// Items due for review now.
    pub fn schedule_review_now(&self, count: i64) -> Result<Vec<String>> {
        self.schedule_review(Utc::now(), count)
    }

    /// Items due now that also satisfy `pred`, ascending by due date.
    ///
    /// The predicate runs after the fetch, and collection stops once
    /// `count` items match. A negative `count` collects every match.
    pub fn schedule_review_now_with(
        &self,
        count: i64,
        mut pred: impl FnMut(&str) -> bool,
    ) -> Result<Vec<String>> {
        let reader = self.lock_reader()?;
        let mut stmt = reader.prepare("SELECT item FROM review WHERE due < ?1 ORDER BY due")?;
        let mut rows = stmt.query([format_timestamp(Utc::now())])?;

        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            if count >= 0 && items.len() >= count as usize {
                break;
            }
            let item: String = row.get(0)?;
            if pred(&item) {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Most recent review of `item`, or `None` for an unseen item.
    pub fn most_recent_review(&self, item: &str) -> Result<Option<Review>> {
        let reader = self.lock_reader()?;
        most_recent_review(&reader, item)
    }

    /// The full interval ladder with outcome counters, ascending.
    pub fn intervals(&self) -> Result<Vec<IntervalRung>> {
        let reader = self.lock_reader()?;
        let mut stmt = reader
            .prepare("SELECT interval, correct, incorrect FROM interval ORDER BY interval ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(IntervalRung {
                interval: Duration::seconds(row.get::<_, i64>(0)?),
                correct: row.get(1)?,
                incorrect: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// The learner profile singleton.
    pub fn student(&self) -> Result<StudentProfile> {
        let reader = self.lock_reader()?;
        let profile = reader.query_row(
            "SELECT frequency_class, correct, incorrect FROM student",
            [],
            |row| {
                Ok(StudentProfile {
                    frequency_class: row.get(0)?,
                    correct: row.get(1)?,
                    incorrect: row.get(2)?,
                })
            },
        )?;
        Ok(profile)
    }

    /// The global difficulty tier consumed by item selection.
    pub fn frequency_class(&self) -> Result<u32> {
        Ok(self.student()?.frequency_class)
    }

    /// Every review row keyed by item. Inspection and debugging aid.
    pub fn reviews(&self) -> Result<Vec<(String, Review)>> {
        let reader = self.lock_reader()?;
        let mut stmt =
            reader.prepare("SELECT item, interval, due, reviewed FROM review ORDER BY item")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut reviews = Vec::new();
        for row in rows {
            let (item, interval, due, reviewed) = row?;
            reviews.push((
                item,
                Review {
                    interval: Duration::seconds(interval),
                    due: parse_timestamp(&due)?,
                    reviewed: parse_timestamp(&reviewed)?,
                },
            ));
        }
        Ok(reviews)
    }
}

// ============================================================================
// ROW HELPERS
// ============================================================================

/// Most recent review of an item inside the open transaction.
fn most_recent_review(conn: &Connection, item: &str) -> Result<Option<Review>> {
    let row = conn
        .query_row(
            "SELECT interval, due, reviewed FROM review WHERE item = ?1",
            [item],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    match row {
        None => Ok(None),
        Some((interval, due, reviewed)) => Ok(Some(Review {
            interval: Duration::seconds(interval),
            due: parse_timestamp(&due)?,
            reviewed: parse_timestamp(&reviewed)?,
        })),
    }
}

/// Bumps the outcome counter on the rung the review came from, or the zero
/// rung for a first review.
fn record_rung_outcome(conn: &Connection, previous: Option<&Review>, correct: bool) -> Result<()> {
    let interval = previous.map_or(0, |review| review.interval.num_seconds());
    let query = if correct {
        "UPDATE interval SET correct = correct + 1 WHERE interval = ?1"
    } else {
        "UPDATE interval SET incorrect = incorrect + 1 WHERE interval = ?1"
    };
    conn.execute(query, [interval])?;
    Ok(())
}

/// Current rung keys, ascending.
fn ladder(conn: &Connection) -> Result<Vec<Duration>> {
    let mut stmt = conn.prepare("SELECT interval FROM interval ORDER BY interval ASC")?;
    let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;

    let mut rungs = Vec::new();
    for seconds in rows {
        rungs.push(Duration::seconds(seconds?));
    }
    Ok(rungs)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_storage() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(Some(dir.path().join("cadence.db"))).unwrap();
        (dir, storage)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
    }

    fn rung_stats(storage: &Storage, seconds: i64) -> (u32, u32) {
        let rung = storage
            .intervals()
            .unwrap()
            .into_iter()
            .find(|rung| rung.interval.num_seconds() == seconds)
            .unwrap();
        (rung.correct, rung.incorrect)
    }

    #[test]
    fn test_first_review_schedules_one_day_out() {
        let (_dir, storage) = test_storage();

        let review = storage.update_review_at("apfel", true, t0()).unwrap();
        assert_eq!(review.interval, Duration::days(1));
        assert_eq!(review.due, t0() + Duration::days(1));
        assert_eq!(review.reviewed, t0());

        // First reviews count against the zero rung.
        assert_eq!(rung_stats(&storage, 0), (1, 0));

        let stored = storage.most_recent_review("apfel").unwrap().unwrap();
        assert_eq!(stored, review);
    }

    #[test]
    fn test_incorrect_review_returns_to_zero_rung() {
        let (_dir, storage) = test_storage();

        let review = storage.update_review_at("birne", false, t0()).unwrap();
        assert_eq!(review.interval, Duration::zero());
        assert_eq!(review.due, t0());
        assert_eq!(rung_stats(&storage, 0), (0, 1));
    }

    #[test]
    fn test_upsert_keeps_one_row_and_first_learned_date() {
        let (_dir, storage) = test_storage();

        storage.update_review_at("citron", true, t0()).unwrap();
        storage
            .update_review_at("citron", true, t0() + Duration::days(2))
            .unwrap();

        assert_eq!(storage.reviews().unwrap().len(), 1);

        let learned: String = storage
            .lock_writer()
            .unwrap()
            .query_row("SELECT learned FROM review WHERE item = 'citron'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(learned, "2026-03-01T08:00:00Z");
    }

    #[test]
    fn test_cram_update_reschedules_but_skips_statistics() {
        let (_dir, storage) = test_storage();

        storage.update_review_at("dattel", true, t0()).unwrap();
        assert_eq!(rung_stats(&storage, 0), (1, 0));

        // One hour later, a day before due: outcome is ignored by the
        // tuner, but the item is still rescheduled.
        let review = storage
            .update_review_at("dattel", false, t0() + Duration::hours(1))
            .unwrap();
        assert_eq!(review.interval, Duration::zero());

        assert_eq!(rung_stats(&storage, 0), (1, 0));
        assert_eq!(rung_stats(&storage, 86_400), (0, 0));
        let student = storage.student().unwrap();
        assert_eq!((student.correct, student.incorrect), (0, 0));
    }

    #[test]
    fn test_due_review_counts_against_its_rung() {
        let (_dir, storage) = test_storage();

        storage.update_review_at("erdbeere", true, t0()).unwrap();
        storage
            .update_review_at("erdbeere", true, t0() + Duration::days(1))
            .unwrap();

        // The second review arrived exactly at due and counts against the
        // one-day rung the item came from.
        assert_eq!(rung_stats(&storage, 86_400), (1, 0));

        // The ladder doubled past its top for the new schedule.
        let stored = storage.most_recent_review("erdbeere").unwrap().unwrap();
        assert_eq!(stored.interval, Duration::seconds(172_800));
    }

    #[test]
    fn test_schedule_review_orders_and_limits() {
        let (_dir, storage) = test_storage();

        storage
            .update_review_at("c", true, t0() + Duration::hours(2))
            .unwrap();
        storage.update_review_at("a", true, t0()).unwrap();
        storage
            .update_review_at("b", true, t0() + Duration::hours(1))
            .unwrap();

        let horizon = t0() + Duration::days(3);
        assert_eq!(
            storage.schedule_review(horizon, -1).unwrap(),
            vec!["a", "b", "c"]
        );
        assert_eq!(storage.schedule_review(horizon, 2).unwrap(), vec!["a", "b"]);

        // The bound is exclusive; nothing is due at the moment of review.
        assert_eq!(
            storage
                .schedule_review(t0() + Duration::days(1), -1)
                .unwrap(),
            Vec::<String>::new()
        );
    }

    #[test]
    fn test_schedule_review_now_with_predicate() {
        let (_dir, storage) = test_storage();

        let past = Utc::now() - Duration::days(3);
        storage.update_review_at("a", false, past).unwrap();
        storage
            .update_review_at("b", false, past + Duration::hours(1))
            .unwrap();
        storage
            .update_review_at("c", false, past + Duration::hours(2))
            .unwrap();

        let picked = storage
            .schedule_review_now_with(-1, |item| item != "b")
            .unwrap();
        assert_eq!(picked, vec!["a", "c"]);

        let capped = storage
            .schedule_review_now_with(1, |item| item != "a")
            .unwrap();
        assert_eq!(capped, vec!["b"]);
    }

    #[test]
    fn test_malformed_stored_timestamp_is_fatal() {
        let (_dir, storage) = test_storage();

        storage
            .lock_writer()
            .unwrap()
            .execute(
                "INSERT INTO review (item, interval, due, learned, reviewed)
                 VALUES ('kaputt', 0, 'gestern', 'gestern', 'gestern')",
                [],
            )
            .unwrap();

        let err = storage.most_recent_review("kaputt").unwrap_err();
        assert!(matches!(err, StorageError::InvalidTimestamp(_)));
    }

    #[test]
    fn test_update_storm_preserves_ladder_invariant() {
        let (_dir, storage) = test_storage();

        // Ride one item up the ladder, always reviewing right at due.
        let mut now = t0();
        for _ in 0..12 {
            let review = storage.update_review_at("fichte", true, now).unwrap();
            now = review.due;
        }

        let ladder = storage.intervals().unwrap();
        let keys: Vec<i64> = ladder
            .iter()
            .map(|rung| rung.interval.num_seconds())
            .collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(keys, sorted);
        assert!(keys.contains(&0));
        assert!(keys.contains(&86_400));

        // Every review still points at an existing rung.
        for (_, review) in storage.reviews().unwrap() {
            assert!(keys.contains(&review.interval.num_seconds()));
        }
    }
}
