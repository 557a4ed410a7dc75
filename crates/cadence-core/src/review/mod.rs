//! Review Records
//!
//! Plain records persisted by the storage layer: per-item review state,
//! interval ladder rungs, and the learner profile singleton.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Serde adapter encoding a `chrono::Duration` as whole seconds.
pub(crate) mod duration_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(value.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::seconds(i64::deserialize(deserializer)?))
    }
}

/// Review state for a single item.
///
/// One row per item, upserted on every review. The interval is the spacing
/// that produced `due`, at second resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Spacing between the last review and `due`.
    #[serde(with = "duration_seconds")]
    pub interval: Duration,
    /// When the item should next be reviewed (UTC).
    pub due: DateTime<Utc>,
    /// When the item was last reviewed (UTC).
    pub reviewed: DateTime<Utc>,
}

impl Review {
    /// Whether the item is due at `now`. Reviewing before this point is
    /// cramming and is excluded from tuning statistics.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due <= now
    }
}

/// One rung of the interval ladder with its accumulated outcome counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalRung {
    /// Rung key: the interval duration, unique across the ladder.
    #[serde(with = "duration_seconds")]
    pub interval: Duration,
    /// Reviews answered correctly at this rung since its last reset.
    pub correct: u32,
    /// Reviews answered incorrectly at this rung since its last reset.
    pub incorrect: u32,
}

impl IntervalRung {
    /// Total outcomes accumulated at this rung.
    pub fn samples(&self) -> u32 {
        self.correct + self.incorrect
    }
}

/// The learner profile singleton.
///
/// `frequency_class` biases new-item selection in the layers above; the
/// counters are maintained by those layers and only read and reset here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    /// Global difficulty tier, never negative.
    pub frequency_class: u32,
    /// Global correct counter since the last tier adjustment.
    pub correct: u32,
    /// Global incorrect counter since the last tier adjustment.
    pub incorrect: u32,
}

// ============================================================================
// TESTS
// ============================================================================
