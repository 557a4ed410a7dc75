//! Spacing Policy
//!
//! Maps a review outcome to the next interval and due date. The formula is
//! a substitutable component: `Storage` consults whatever policy it was
//! built with, inside the same transaction that records the outcome, and
//! materializes the chosen interval as a ladder rung if it is new.

use chrono::{DateTime, Duration, Utc};

use crate::review::Review;

/// Next schedule for an item, produced by a [`SpacingPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextReview {
    /// Spacing until the next review.
    pub interval: Duration,
    /// When the item comes due again. Never before the review time.
    pub due: DateTime<Utc>,
}

/// Pluggable spacing formula.
///
/// `rungs` is the current interval ladder, ascending and duplicate-free.
/// `previous` is the item's review state before this outcome, absent for an
/// unseen item. Implementations must return `due >= now`.
pub trait SpacingPolicy: Send + Sync {
    /// Computes the next interval and due date for one review outcome.
    fn next_review(
        &self,
        rungs: &[Duration],
        previous: Option<&Review>,
        correct: bool,
        now: DateTime<Utc>,
    ) -> NextReview;
}

/// Default policy: walk the interval ladder.
///
/// An incorrect answer sends the item back to the zero rung for immediate
/// relearning. A correct answer promotes it to the next larger rung,
/// doubling the top rung when the item has outgrown the ladder.
#[derive(Debug, Clone, Copy, Default)]
pub struct LadderPolicy;

impl SpacingPolicy for LadderPolicy {
    fn next_review(
        &self,
        rungs: &[Duration],
        previous: Option<&Review>,
        correct: bool,
        now: DateTime<Utc>,
    ) -> NextReview {
        if !correct {
            return NextReview {
                interval: Duration::zero(),
                due: now,
            };
        }

        let current = previous.map(|r| r.interval).unwrap_or_else(Duration::zero);
        let interval = rungs
            .iter()
            .copied()
            .find(|rung| *rung > current)
            .unwrap_or_else(|| {
                let top = rungs.last().copied().unwrap_or_else(Duration::zero);
                if top <= Duration::zero() {
                    Duration::days(1)
                } else {
                    top * 2
                }
            });

        NextReview {
            interval,
            due: now + interval,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
