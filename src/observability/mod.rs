//! Observability of the logging layer itself.
//!
//! # Data Flow
//! ```text
//! facade   → metrics::record_emitted(level)
//! rotation → metrics::record_rotation()
//! recover  → metrics::record_recovered_panic()
//! ```
//!
//! # Design Decisions
//! - Only counters; no exporter is installed here
//! - Embedders install whichever `metrics` recorder they already use

pub mod metrics;
