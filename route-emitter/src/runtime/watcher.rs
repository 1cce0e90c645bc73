/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! The reconciliation event loop: subscription, bulk sync, and emission.

use crate::control_plane::messages::MessagesToEmit;
use crate::control_plane::routing_table::{RoutingTable, TempTable};
use crate::data_plane::emitter::RegistryEmitter;
use crate::models::{ActualLrpGroup, Event};
use crate::observability::metrics::MetricsReporter;
use crate::observability::{events, metrics};
use crate::runtime::event_cache::EventCache;
use crate::runtime::syncer::SyncEvents;
use crate::store::{EventSource, StateStoreClient, StateStoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const COMPONENT: &str = "route_watcher";

/// Safety threshold for the sync-time event cache; past it, buffered events
/// are dropped and another resync is forced.
pub const DEFAULT_EVENT_CACHE_CAPACITY: usize = 4096;
/// Upper bound on any single bus publish.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const INITIAL_RESUBSCRIBE_BACKOFF: Duration = Duration::from_millis(100);
const MAX_RESUBSCRIBE_BACKOFF: Duration = Duration::from_secs(5);

/// The sole mutator of the live routing table.
///
/// Stays idle until the scheduler's first sync tick so the first emission
/// reflects a coherent snapshot rather than a partial event stream. From
/// then on it interleaves the event subscription, sync ticks, and emit
/// ticks, applying events to the table and publishing the derived
/// register/unregister batches.
pub struct RouteWatcher {
    core: WatcherCore,
    sync_events: SyncEvents,
    shutdown: mpsc::Receiver<()>,
}

impl RouteWatcher {
    pub fn new(
        store: Arc<dyn StateStoreClient>,
        table: Arc<RoutingTable>,
        emitter: Arc<dyn RegistryEmitter>,
        metrics: Arc<dyn MetricsReporter>,
        sync_events: SyncEvents,
        shutdown: mpsc::Receiver<()>,
    ) -> Self {
        Self {
            core: WatcherCore {
                store,
                table,
                emitter,
                metrics,
                publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
                event_cache_capacity: DEFAULT_EVENT_CACHE_CAPACITY,
            },
            sync_events,
            shutdown,
        }
    }

    pub fn with_publish_timeout(mut self, publish_timeout: Duration) -> Self {
        self.core.publish_timeout = publish_timeout;
        self
    }

    pub fn with_event_cache_capacity(mut self, capacity: usize) -> Self {
        self.core.event_cache_capacity = capacity;
        self
    }

    /// Runs until shutdown is signaled (or the scheduler channels close).
    /// No store, bus, or parse error escapes this loop.
    pub async fn run(self) {
        let RouteWatcher {
            core,
            sync_events,
            mut shutdown,
        } = self;
        let SyncEvents {
            sync: mut sync_rx,
            emit: mut emit_rx,
        } = sync_events;

        info!(
            event = events::WATCHER_STARTED,
            component = COMPONENT,
            "watcher started; waiting for the first sync tick before subscribing"
        );

        let mut subscription: Option<mpsc::Receiver<Event>> = None;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!(event = events::WATCHER_STOPPED, component = COMPONENT, "shutdown signaled");
                    return;
                }
                tick = sync_rx.recv() => {
                    if tick.is_none() {
                        info!(
                            event = events::WATCHER_STOPPED,
                            component = COMPONENT,
                            "sync channel closed; stopping"
                        );
                        return;
                    }

                    if subscription.is_none() {
                        match core.subscribe_with_backoff(&mut shutdown).await {
                            Some(events_rx) => subscription = Some(events_rx),
                            None => {
                                info!(
                                    event = events::WATCHER_STOPPED,
                                    component = COMPONENT,
                                    "shutdown signaled while subscribing"
                                );
                                return;
                            }
                        }
                    }

                    if let Some(events_rx) = subscription.as_mut() {
                        while core.sync_once(events_rx, &mut sync_rx, &mut emit_rx).await {}
                    }
                }
                tick = emit_rx.recv() => {
                    if tick.is_none() {
                        info!(
                            event = events::WATCHER_STOPPED,
                            component = COMPONENT,
                            "emit channel closed; stopping"
                        );
                        return;
                    }
                    core.emit_full_state().await;
                }
                maybe_event = next_event(&mut subscription) => {
                    match maybe_event {
                        Some(event) => core.handle_event(event).await,
                        None => {
                            warn!(
                                event = events::EVENT_STREAM_CLOSED,
                                component = COMPONENT,
                                "event stream closed; re-subscribing"
                            );
                            match core.subscribe_with_backoff(&mut shutdown).await {
                                Some(events_rx) => subscription = Some(events_rx),
                                None => {
                                    info!(
                                        event = events::WATCHER_STOPPED,
                                        component = COMPONENT,
                                        "shutdown signaled while re-subscribing"
                                    );
                                    return;
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Suspends on the subscription when one exists; pends forever in IDLE so
/// the surrounding select only sees ticks and shutdown.
async fn next_event(subscription: &mut Option<mpsc::Receiver<Event>>) -> Option<Event> {
    match subscription.as_mut() {
        Some(events_rx) => events_rx.recv().await,
        None => std::future::pending().await,
    }
}

struct WatcherCore {
    store: Arc<dyn StateStoreClient>,
    table: Arc<RoutingTable>,
    emitter: Arc<dyn RegistryEmitter>,
    metrics: Arc<dyn MetricsReporter>,
    publish_timeout: Duration,
    event_cache_capacity: usize,
}

impl WatcherCore {
    /// One full resynchronization: snapshot fetches in parallel, events
    /// buffered meanwhile, swap, drain, one merged emission. Returns true
    /// when the event cache overflowed and another sync must follow.
    async fn sync_once(
        &self,
        events_rx: &mut mpsc::Receiver<Event>,
        sync_rx: &mut mpsc::Receiver<()>,
        emit_rx: &mut mpsc::Receiver<()>,
    ) -> bool {
        let sync_started = Instant::now();
        info!(event = events::SYNC_STARTED, component = COMPONENT, "starting bulk sync");

        let desired_store = Arc::clone(&self.store);
        let actual_store = Arc::clone(&self.store);
        let mut desired_task =
            tokio::spawn(async move { desired_store.fetch_desired_scheduling_infos().await });
        let mut actual_task =
            tokio::spawn(async move { actual_store.fetch_actual_lrp_groups().await });

        let mut cache = EventCache::with_capacity(self.event_cache_capacity);
        let mut desired_snapshot = None;
        let mut actual_snapshot = None;
        let mut events_open = true;
        let mut sync_open = true;
        let mut emit_open = true;

        while desired_snapshot.is_none() || actual_snapshot.is_none() {
            tokio::select! {
                joined = &mut desired_task, if desired_snapshot.is_none() => {
                    desired_snapshot = Some(flatten_snapshot(joined));
                }
                joined = &mut actual_task, if actual_snapshot.is_none() => {
                    actual_snapshot = Some(flatten_snapshot(joined));
                }
                maybe_event = events_rx.recv(), if events_open => {
                    match maybe_event {
                        Some(event) => {
                            debug!(
                                event = events::EVENT_CACHED,
                                component = COMPONENT,
                                event_type = event.event_type(),
                                buffered = cache.len(),
                                "buffering event during sync"
                            );
                            if !cache.push(event) && cache.overflowed() {
                                warn!(
                                    event = events::EVENT_CACHE_OVERFLOW,
                                    component = COMPONENT,
                                    capacity = self.event_cache_capacity,
                                    "event cache overflowed; buffered events dropped, a resync will follow"
                                );
                            }
                        }
                        // The reader died mid-sync; the run loop re-subscribes
                        // once the sync settles.
                        None => events_open = false,
                    }
                }
                tick = sync_rx.recv(), if sync_open => {
                    match tick {
                        Some(()) => debug!(
                            event = events::SYNC_TICK_IGNORED,
                            component = COMPONENT,
                            "sync already in flight"
                        ),
                        None => sync_open = false,
                    }
                }
                tick = emit_rx.recv(), if emit_open => {
                    match tick {
                        // Emit ticks during sync are served against the
                        // current live table, pre-swap.
                        Some(()) => self.emit_full_state().await,
                        None => emit_open = false,
                    }
                }
            }
        }

        let (Some(desired_snapshot), Some(actual_snapshot)) = (desired_snapshot, actual_snapshot)
        else {
            return false;
        };

        match (desired_snapshot, actual_snapshot) {
            (Ok(scheduling_infos), Ok(actual_groups)) => {
                let overflowed = cache.overflowed();
                let temp_table = TempTable::from_snapshots(&scheduling_infos, &actual_groups);

                let mut messages = self.table.swap(temp_table).await;
                for event in cache.drain().collect::<Vec<Event>>() {
                    messages.merge(self.apply_event(event).await);
                }
                self.publish(messages).await;

                self.metrics.increment_counter(metrics::ROUTES_SYNCED, 1);
                self.metrics
                    .set_gauge(metrics::ROUTES_TOTAL, self.table.route_count().await as f64);
                let sync_duration = sync_started.elapsed();
                self.metrics
                    .record_duration(metrics::ROUTE_EMITTER_SYNC_DURATION, sync_duration);

                info!(
                    event = events::SYNC_COMPLETED,
                    component = COMPONENT,
                    duration_ms = sync_duration.as_millis() as u64,
                    desired = scheduling_infos.len(),
                    actual = actual_groups.len(),
                    "bulk sync completed"
                );
                overflowed
            }
            (desired_snapshot, actual_snapshot) => {
                let reason = [desired_snapshot.err(), actual_snapshot.err()]
                    .into_iter()
                    .flatten()
                    .map(|err| err.to_string())
                    .collect::<Vec<String>>()
                    .join("; ");
                warn!(
                    event = events::SYNC_SNAPSHOT_FAILED,
                    component = COMPONENT,
                    err = %reason,
                    discarded_events = cache.len(),
                    "bulk sync aborted; keeping the live table until the next tick"
                );
                false
            }
        }
    }

    /// Applies one streamed event and publishes its diff, if any.
    async fn handle_event(&self, event: Event) {
        let event_type = event.event_type().to_string();
        let messages = self.apply_event(event).await;

        if messages.is_empty() {
            return;
        }

        debug!(
            event = events::EVENT_APPLIED,
            component = COMPONENT,
            event_type = %event_type,
            registrations = messages.registrations.len(),
            unregistrations = messages.unregistrations.len(),
            "emitting event diff"
        );
        self.emit_with_counters(messages).await;
    }

    /// Mutates the table for one event and returns the merged diff.
    async fn apply_event(&self, event: Event) -> MessagesToEmit {
        match event {
            Event::DesiredCreated(desired) => self.table.set_routes_from_desired(&desired).await,
            Event::DesiredChanged { before, after } => {
                self.table.update_routes_from_desired(&before, &after).await
            }
            Event::DesiredRemoved(desired) => {
                self.table.remove_routes_from_desired(&desired).await
            }
            Event::ActualCreated(group) => self.apply_actual_create(&group).await,
            Event::ActualChanged { before, after } => {
                self.apply_actual_change(&before, &after).await
            }
            Event::ActualRemoved(group) => self.apply_actual_remove(&group).await,
            Event::Unrecognized { event_type } => {
                info!(
                    event = events::EVENT_UNRECOGNIZED,
                    component = COMPONENT,
                    event_type = %event_type,
                    "dropping unrecognized event"
                );
                MessagesToEmit::default()
            }
        }
    }

    async fn apply_actual_create(&self, group: &ActualLrpGroup) -> MessagesToEmit {
        let mut messages = MessagesToEmit::default();
        for routing_info in group.routing_infos() {
            if routing_info.actual.is_running() {
                messages.merge(self.table.add_endpoints_from_actual(&routing_info).await);
            }
        }
        messages
    }

    async fn apply_actual_change(
        &self,
        before: &ActualLrpGroup,
        after: &ActualLrpGroup,
    ) -> MessagesToEmit {
        let before_infos = before.routing_infos();
        let after_infos = after.routing_infos();

        let mut messages = MessagesToEmit::default();

        // Covers both not-running -> running and running -> running for each
        // side; endpoints that silently disappeared reconcile at the next
        // sync.
        for routing_info in &after_infos {
            if routing_info.actual.is_running() {
                messages.merge(self.table.add_endpoints_from_actual(routing_info).await);
            }
        }

        // A side that was running and no longer is, or vanished from the
        // group, has transitioned out; its endpoints go with it.
        for routing_info in &before_infos {
            if !routing_info.actual.is_running() {
                continue;
            }
            let still_running = after_infos.iter().any(|after_info| {
                after_info.evacuating == routing_info.evacuating
                    && after_info.actual.is_running()
            });
            if !still_running {
                messages.merge(self.table.remove_endpoints_from_actual(routing_info).await);
            }
        }

        messages
    }

    async fn apply_actual_remove(&self, group: &ActualLrpGroup) -> MessagesToEmit {
        let mut messages = MessagesToEmit::default();
        for routing_info in group.routing_infos() {
            if routing_info.actual.is_running() {
                messages.merge(self.table.remove_endpoints_from_actual(&routing_info).await);
            }
        }
        messages
    }

    /// Serves an emit tick: full registration snapshot plus the total gauge.
    async fn emit_full_state(&self) {
        let messages = self.table.messages_to_emit().await;
        self.metrics
            .set_gauge(metrics::ROUTES_TOTAL, self.table.route_count().await as f64);
        self.emit_with_counters(messages).await;
    }

    async fn emit_with_counters(&self, messages: MessagesToEmit) {
        self.metrics.increment_counter(
            metrics::ROUTES_REGISTERED,
            messages.registered_route_count() as u64,
        );
        self.metrics.increment_counter(
            metrics::ROUTES_UNREGISTERED,
            messages.unregistered_route_count() as u64,
        );
        self.publish(messages).await;
    }

    /// Publishes one batch, bounded by the configured timeout. A failed or
    /// timed-out publish is dropped; the next emit tick re-emits full state.
    async fn publish(&self, messages: MessagesToEmit) {
        match tokio::time::timeout(self.publish_timeout, self.emitter.emit(messages)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(
                event = events::EMIT_FAILED,
                component = COMPONENT,
                err = %err,
                "dropping batch"
            ),
            Err(_) => warn!(
                event = events::EMIT_TIMED_OUT,
                component = COMPONENT,
                timeout_ms = self.publish_timeout.as_millis() as u64,
                "dropping batch"
            ),
        }
    }

    /// Opens the event subscription, retrying with capped exponential
    /// backoff until it succeeds or shutdown is signaled. The returned
    /// channel is fed by a spawned reader task.
    async fn subscribe_with_backoff(
        &self,
        shutdown: &mut mpsc::Receiver<()>,
    ) -> Option<mpsc::Receiver<Event>> {
        let mut backoff = INITIAL_RESUBSCRIBE_BACKOFF;

        loop {
            debug!(
                event = events::SUBSCRIBE_STARTED,
                component = COMPONENT,
                "opening event subscription"
            );
            match self.store.subscribe_events().await {
                Ok(source) => {
                    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
                    tokio::spawn(read_events(source, events_tx));
                    return Some(events_rx);
                }
                Err(err) => {
                    warn!(
                        event = events::SUBSCRIBE_FAILED,
                        component = COMPONENT,
                        err = %err,
                        retry_in_ms = backoff.as_millis() as u64,
                        "subscription attempt failed"
                    );
                    tokio::select! {
                        _ = shutdown.recv() => return None,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(MAX_RESUBSCRIBE_BACKOFF);
                }
            }
        }
    }
}

type SnapshotResult<T> = Result<T, StateStoreError>;

fn flatten_snapshot<T>(
    joined: Result<SnapshotResult<T>, tokio::task::JoinError>,
) -> SnapshotResult<T> {
    match joined {
        Ok(result) => result,
        Err(join_error) => Err(StateStoreError::Unavailable(format!(
            "snapshot task failed: {join_error}"
        ))),
    }
}

/// Pumps the subscription into the watcher's bounded channel. Exits when the
/// stream errors (the watcher re-subscribes) or the watcher goes away.
async fn read_events(mut source: Box<dyn EventSource>, events_tx: mpsc::Sender<Event>) {
    loop {
        match source.next_event().await {
            Ok(event) => {
                if events_tx.send(event).await.is_err() {
                    return;
                }
            }
            Err(err) => {
                warn!(
                    event = events::EVENT_STREAM_FAILED,
                    component = COMPONENT,
                    err = %err,
                    "event stream failed; the subscription will be re-created"
                );
                return;
            }
        }
    }
}
