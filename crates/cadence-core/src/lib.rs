//! # Cadence Core
//!
//! Adaptive spaced-repetition engine: review scheduling with statistical
//! interval auto-tuning.
//!
//! - **Interval ladder**: an ordered set of spacing steps, grown by
//!   doubling and reshaped by midpoint split/merge as evidence accumulates
//! - **Wilson-bound classification**: one-sided confidence bounds decide
//!   "too easy" / "too hard" on sparse per-rung counters, asymmetric on
//!   purpose (a demotion demands 99% confidence, a promotion 80%)
//! - **Cram detection**: reviews before the due date reschedule the item
//!   but never feed the tuner
//! - **Transactional updates**: outcome statistics, the reschedule, and a
//!   full tuning pass commit atomically per review
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cadence_core::Storage;
//!
//! // Create storage (uses default platform-specific location)
//! let storage = Storage::new(None)?;
//!
//! // Record a review outcome; scheduling and tuning happen atomically
//! let review = storage.update_review("einhorn", true)?;
//!
//! // Fetch the next items due, oldest first
//! let due = storage.schedule_review_now(20)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): compile SQLite from source via rusqlite

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod review;
pub mod spacing;
pub mod storage;
pub mod tuning;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Record types
pub use review::{IntervalRung, Review, StudentProfile};

// Spacing policy seam
pub use spacing::{LadderPolicy, NextReview, SpacingPolicy};

// Storage layer
pub use storage::{Result, Storage, StorageError};

// Classifier, reusable on any binomial counter pair
pub use tuning::{is_too_easy, is_too_hard, wilson_bound};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        IntervalRung, LadderPolicy, NextReview, Result, Review, SpacingPolicy, Storage,
        StorageError, StudentProfile,
    };
}
