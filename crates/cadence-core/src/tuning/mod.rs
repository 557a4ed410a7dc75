//! Auto-Tuning
//!
//! One tuning pass runs inside every review-update transaction: the global
//! difficulty tier first, then the interval ladder. Both consult the same
//! Wilson-bound classifier over accumulated correct/incorrect counters.

mod difficulty;
mod intervals;
mod wilson;

pub use wilson::{is_too_easy, is_too_hard, wilson_bound};

use rusqlite::Connection;

use crate::storage::Result;

/// Runs one full tuning pass over the open transaction.
pub(crate) fn auto_tune(conn: &Connection) -> Result<()> {
    difficulty::tune_difficulty(conn)?;
    intervals::tune_intervals(conn)
}
