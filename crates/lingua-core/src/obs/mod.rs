//! Observability: per-process event counters and their report surface.
//!
//! Counters are advisory; engine logic never consults them. Tests use
//! `queries_executed` to pin down the zero-extra-query guarantees.

pub mod metrics;

pub use metrics::{EventReport, report, reset_all};
