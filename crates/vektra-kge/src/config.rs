//! Process-wide evaluation settings.
//!
//! Ranking evaluation scores every test triple against every candidate
//! entity, so cost grows as `O(|test| x |entities|)`. Above the entity
//! threshold the evaluator emits a warning and keeps going; it never fails
//! on graph size alone.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Default candidate-pool size above which evaluation warns.
pub const DEFAULT_ENTITY_THRESHOLD: usize = 50_000;

static ENTITY_THRESHOLD: AtomicUsize = AtomicUsize::new(DEFAULT_ENTITY_THRESHOLD);

/// Current entity-count threshold.
pub fn entity_threshold() -> usize {
    ENTITY_THRESHOLD.load(Ordering::Relaxed)
}

/// Override the entity-count threshold for this process.
///
/// Tests that lower the threshold should call [`reset_entity_threshold`]
/// afterwards so the setting does not leak across tests.
pub fn set_entity_threshold(threshold: usize) {
    ENTITY_THRESHOLD.store(threshold, Ordering::Relaxed);
}

/// Restore the threshold to [`DEFAULT_ENTITY_THRESHOLD`].
pub fn reset_entity_threshold() {
    ENTITY_THRESHOLD.store(DEFAULT_ENTITY_THRESHOLD, Ordering::Relaxed);
}
