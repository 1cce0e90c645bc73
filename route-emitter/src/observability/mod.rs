//! Observability helpers: event names, log-field formatting, and the metrics seam.
//!
//! The workspace uses `tracing` for logs/events. Library code emits
//! events/spans and does not unconditionally initialize a global subscriber;
//! binaries and tests own one-time `tracing_subscriber` initialization at
//! process boundaries. Metrics flow through an injected reporter so the
//! choice of sink stays outside the core.

pub mod events;
pub mod fields;
pub mod metrics;
