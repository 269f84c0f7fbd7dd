//! Counters for emitted records, rotations and recovered panics.
//!
//! # Metrics
//! - `ctxlog_records_total` (counter): records passed to the facade, by level
//! - `ctxlog_rotations_total` (counter): pipelines installed by the scheduler
//! - `ctxlog_recovered_panics_total` (counter): panics swallowed by a guard

use crate::level::Severity;

/// Count one record handed to the facade.
pub fn record_emitted(level: Severity) {
    metrics::counter!("ctxlog_records_total", "level" => level.as_str()).increment(1);
}

/// Count one hourly rotation.
pub fn record_rotation() {
    metrics::counter!("ctxlog_rotations_total").increment(1);
}

/// Count one panic converted into an error record.
pub fn record_recovered_panic() {
    metrics::counter!("ctxlog_recovered_panics_total").increment(1);
}
