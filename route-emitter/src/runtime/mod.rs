//! Runtime layer.
//!
//! Hosts the reconciliation event loop and its supporting plumbing: the
//! scheduler channel contract, the sync-time event cache, and the watcher
//! that ties subscription, bulk sync, and emission together. Async and
//! threading behavior stays localized here so the control plane remains
//! plain state manipulation.

pub(crate) mod event_cache;
pub mod syncer;
pub mod watcher;

pub use syncer::{SyncEvents, SyncEventsHandle};
pub use watcher::{RouteWatcher, DEFAULT_EVENT_CACHE_CAPACITY, DEFAULT_PUBLISH_TIMEOUT};
