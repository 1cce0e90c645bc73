//! Metrics seam: names published by the emitter and the reporter trait they
//! flow through.

use std::time::Duration;

pub const ROUTES_REGISTERED: &str = "RoutesRegistered";
pub const ROUTES_UNREGISTERED: &str = "RoutesUnRegistered";
pub const ROUTES_SYNCED: &str = "RoutesSynced";
pub const ROUTES_TOTAL: &str = "RoutesTotal";
pub const ROUTE_EMITTER_SYNC_DURATION: &str = "RouteEmitterSyncDuration";

/// Sink for the emitter's counters, gauges, and timings. The concrete sink
/// lives outside the core; tests inject recording implementations.
pub trait MetricsReporter: Send + Sync {
    fn increment_counter(&self, name: &'static str, delta: u64);
    fn set_gauge(&self, name: &'static str, value: f64);
    fn record_duration(&self, name: &'static str, duration: Duration);
}

/// Reporter that drops everything, for callers without a metrics sink.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullMetricsReporter;

impl MetricsReporter for NullMetricsReporter {
    fn increment_counter(&self, _name: &'static str, _delta: u64) {}

    fn set_gauge(&self, _name: &'static str, _value: f64) {}

    fn record_duration(&self, _name: &'static str, _duration: Duration) {}
}
