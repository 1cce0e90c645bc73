//! Stable event names attached to structured log records.

pub const SYNC_STARTED: &str = "sync_started";
pub const SYNC_COMPLETED: &str = "sync_completed";
pub const SYNC_SNAPSHOT_FAILED: &str = "sync_snapshot_failed";
pub const SYNC_TICK_IGNORED: &str = "sync_tick_ignored";

pub const EVENT_CACHED: &str = "event_cached";
pub const EVENT_CACHE_OVERFLOW: &str = "event_cache_overflow";
pub const EVENT_APPLIED: &str = "event_applied";
pub const EVENT_UNRECOGNIZED: &str = "event_unrecognized";

pub const SUBSCRIBE_STARTED: &str = "subscribe_started";
pub const SUBSCRIBE_FAILED: &str = "subscribe_failed";
pub const EVENT_STREAM_FAILED: &str = "event_stream_failed";
pub const EVENT_STREAM_CLOSED: &str = "event_stream_closed";

pub const EMIT_FAILED: &str = "emit_failed";
pub const EMIT_TIMED_OUT: &str = "emit_timed_out";

pub const ROUTING_INFO_INVALID: &str = "routing_info_invalid";
pub const ENDPOINTS_MISSING_PORTS: &str = "endpoints_missing_ports";

pub const WATCHER_STARTED: &str = "watcher_started";
pub const WATCHER_STOPPED: &str = "watcher_stopped";
