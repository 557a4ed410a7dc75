//! Difficulty Tuner
//!
//! Adjusts the learner's global difficulty tier (`student.frequency_class`)
//! from the profile's accumulated outcome counters. The counters are zeroed
//! whenever the tier moves, so each adjustment is judged on fresh evidence.

use rusqlite::Connection;

use super::wilson::{is_too_easy, is_too_hard};
use crate::storage::Result;

/// Runs the per-pass difficulty adjustment: at most one tier move, with a
/// too-hard classification taking precedence over too-easy.
pub(crate) fn tune_difficulty(conn: &Connection) -> Result<()> {
    let (correct, incorrect): (u32, u32) =
        conn.query_row("SELECT correct, incorrect FROM student", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;

    if is_too_hard(correct, incorrect) {
        decrease_difficulty(conn)
    } else if is_too_easy(correct, incorrect) {
        increase_difficulty(conn)
    } else {
        Ok(())
    }
}

fn increase_difficulty(conn: &Connection) -> Result<()> {
    tracing::info!("student performing above target, raising frequency class");
    conn.execute(
        "UPDATE student SET
            frequency_class = frequency_class + 1,
            correct = 0,
            incorrect = 0",
        [],
    )?;
    Ok(())
}

fn decrease_difficulty(conn: &Connection) -> Result<()> {
    tracing::info!("student performing below target, lowering frequency class");
    conn.execute(
        "UPDATE student SET
            frequency_class = MAX(0, frequency_class - 1),
            correct = 0,
            incorrect = 0",
        [],
    )?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::apply_migrations;
    use rusqlite::params;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_migrations(&conn).unwrap();
        conn
    }

    fn set_student(conn: &Connection, class: u32, correct: u32, incorrect: u32) {
        conn.execute(
            "UPDATE student SET frequency_class = ?1, correct = ?2, incorrect = ?3",
            params![class, correct, incorrect],
        )
        .unwrap();
    }

    fn student(conn: &Connection) -> (u32, u32, u32) {
        conn.query_row(
            "SELECT frequency_class, correct, incorrect FROM student",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap()
    }

    #[test]
    fn test_too_easy_raises_class_and_resets_counters() {
        let conn = test_conn();
        set_student(&conn, 2, 20, 0);
        tune_difficulty(&conn).unwrap();
        assert_eq!(student(&conn), (3, 0, 0));
    }

    #[test]
    fn test_too_hard_lowers_class_and_resets_counters() {
        let conn = test_conn();
        set_student(&conn, 2, 1, 9);
        tune_difficulty(&conn).unwrap();
        assert_eq!(student(&conn), (1, 0, 0));
    }

    #[test]
    fn test_class_never_drops_below_zero() {
        let conn = test_conn();
        set_student(&conn, 0, 0, 9);
        tune_difficulty(&conn).unwrap();
        assert_eq!(student(&conn), (0, 0, 0));
    }

    #[test]
    fn test_ambiguous_counters_leave_profile_untouched() {
        let conn = test_conn();
        set_student(&conn, 2, 6, 4);
        tune_difficulty(&conn).unwrap();
        assert_eq!(student(&conn), (2, 6, 4));
    }

    #[test]
    fn test_fresh_profile_is_untouched() {
        let conn = test_conn();
        tune_difficulty(&conn).unwrap();
        assert_eq!(student(&conn), (0, 0, 0));
    }
}
