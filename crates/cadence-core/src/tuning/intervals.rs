//! Interval Ladder Tuner
//!
//! Grows, shrinks, splits, and merges the rungs of the interval ladder from
//! each rung's accumulated outcome counters. Two invariants hold across
//! every mutation: rung keys stay strictly increasing and unique (the
//! primary key), and every review's interval always equals an existing rung
//! key (rung moves carry their reviews along in the same transaction).

use rusqlite::{Connection, params};

use super::wilson::{is_too_easy, is_too_hard};
use crate::storage::Result;

/// Rungs at or below one day are anchors and are never tuned.
pub(crate) const DAY_SECONDS: i64 = 86_400;

/// Runs the per-pass ladder adjustment.
///
/// The rung set is snapshotted before any mutation so that each rung is
/// visited exactly once even as keys move underneath the scan.
pub(crate) fn tune_intervals(conn: &Connection) -> Result<()> {
    let snapshot = {
        let mut stmt = conn
            .prepare("SELECT interval, correct, incorrect FROM interval ORDER BY interval ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, u32>(2)?,
            ))
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    for (interval, correct, incorrect) in snapshot {
        if interval <= DAY_SECONDS {
            // Anchor rungs stay fixed.
            continue;
        }
        if is_too_hard(correct, incorrect) {
            decrease_interval(conn, interval)?;
        } else if is_too_easy(correct, incorrect) {
            increase_interval(conn, interval)?;
        }
    }
    Ok(())
}

/// Shrinks `interval` to the midpoint toward its lower neighbor.
pub(crate) fn decrease_interval(conn: &Connection, interval: i64) -> Result<()> {
    if interval <= DAY_SECONDS {
        return Ok(());
    }
    let prev = previous_interval(conn, interval)?;
    let mid = (prev + interval) / 2;
    replace_rung(conn, interval, mid)
}

/// Stretches `interval` to the midpoint toward its upper neighbor, growing
/// the ladder first when no larger rung exists.
pub(crate) fn increase_interval(conn: &Connection, interval: i64) -> Result<()> {
    if interval <= DAY_SECONDS {
        return Ok(());
    }
    let next = next_interval(conn, interval)?;
    let mid = (interval + next) / 2;
    if mid == interval {
        // Adjacent keys leave no midpoint to move to.
        return Ok(());
    }
    replace_rung(conn, interval, mid)
}

/// Moves a rung to `replacement`, merging when that key already exists.
fn replace_rung(conn: &Connection, interval: i64, replacement: i64) -> Result<()> {
    if rung_exists(conn, replacement)? {
        merge_rung(conn, interval, replacement)
    } else {
        rename_rung(conn, interval, replacement)
    }
}

/// Renames a rung to a fresh key, zeroing its counters, and carries every
/// matching review along: interval repointed and due date shifted by the
/// same delta, so each review keeps its relative position.
fn rename_rung(conn: &Connection, interval: i64, replacement: i64) -> Result<()> {
    tracing::debug!(from = interval, to = replacement, "renaming interval rung");
    conn.execute(
        "UPDATE interval SET interval = ?2, correct = 0, incorrect = 0 WHERE interval = ?1",
        params![interval, replacement],
    )?;
    conn.execute(
        "UPDATE review SET
            interval = ?2,
            due = STRFTIME('%Y-%m-%dT%H:%M:%SZ', UNIXEPOCH(due) + ?2 - ?1, 'unixepoch')
         WHERE interval = ?1",
        params![interval, replacement],
    )?;
    Ok(())
}

/// Deletes a rung whose midpoint landed on an existing key and repoints its
/// reviews there. Due dates and the surviving rung's counters are left
/// alone.
fn merge_rung(conn: &Connection, interval: i64, replacement: i64) -> Result<()> {
    tracing::debug!(from = interval, to = replacement, "merging interval rung");
    conn.execute("DELETE FROM interval WHERE interval = ?1", [interval])?;
    conn.execute(
        "UPDATE review SET interval = ?2 WHERE interval = ?1",
        params![interval, replacement],
    )?;
    Ok(())
}

/// Largest rung strictly below `interval`, or 0 for anything at or below
/// the one-day anchor.
fn previous_interval(conn: &Connection, interval: i64) -> Result<i64> {
    if interval <= DAY_SECONDS {
        return Ok(0);
    }
    let prev = conn.query_row(
        "SELECT COALESCE(MAX(interval), 0) FROM interval WHERE interval < ?1",
        [interval],
        |row| row.get(0),
    )?;
    Ok(prev)
}

/// Smallest rung strictly above `interval`, growing the ladder when the
/// rung has outrun it.
fn next_interval(conn: &Connection, interval: i64) -> Result<i64> {
    insert_missing_intervals(conn, interval)?;
    let next = conn.query_row(
        "SELECT COALESCE(MIN(interval), 0) FROM interval WHERE interval > ?1",
        [interval],
        |row| row.get(0),
    )?;
    Ok(next)
}

/// Doubles from the current maximum until a rung above `interval` exists.
fn insert_missing_intervals(conn: &Connection, interval: i64) -> Result<()> {
    let max: i64 = conn.query_row(
        "SELECT COALESCE(MAX(interval), 0) FROM interval",
        [],
        |row| row.get(0),
    )?;
    if max > interval {
        return Ok(());
    }

    let mut next = if max <= 0 { DAY_SECONDS } else { 2 * max };
    while next <= interval {
        insert_rung(conn, next)?;
        next *= 2;
    }
    insert_rung(conn, next)
}

/// Creates a zero-stat rung unless the key already exists.
fn insert_rung(conn: &Connection, interval: i64) -> Result<()> {
    tracing::debug!(interval, "inserting interval rung");
    conn.execute(
        "INSERT OR IGNORE INTO interval (interval) VALUES (?1)",
        [interval],
    )?;
    Ok(())
}

fn rung_exists(conn: &Connection, interval: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM interval WHERE interval = ?1",
        [interval],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

// ============================================================================
// TESTS
// ============================================================================
