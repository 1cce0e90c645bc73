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

//! # route-emitter
//!
//! `route-emitter` reconciles a cluster's routing fabric with its front-end
//! HTTP router tier. It watches the authoritative state store for desired
//! applications (routes, ports) and running instances (host/port mappings),
//! maintains an in-memory routing table keyed by `(process, container-port)`,
//! and publishes the minimal register/unregister batches the router needs to
//! keep external traffic flowing to healthy backends.
//!
//! The store client, the bus emitter, the scheduler, and the metrics sink
//! are trait seams; the crate owns only the table and the reconciliation
//! loop.
//!
//! ```no_run
//! use route_emitter::observability::metrics::NullMetricsReporter;
//! use route_emitter::runtime::SyncEvents;
//! use route_emitter::{RouteWatcher, RoutingTable};
//! use std::sync::Arc;
//! # use route_emitter::control_plane::MessagesToEmit;
//! # use route_emitter::data_plane::{EmitError, RegistryEmitter};
//! # use route_emitter::models::{ActualLrpGroup, DesiredSchedulingInfo};
//! # use route_emitter::store::{EventSource, StateStoreClient, StateStoreError};
//! # use async_trait::async_trait;
//! #
//! # struct MyStore;
//! # #[async_trait]
//! # impl StateStoreClient for MyStore {
//! #     async fn subscribe_events(&self) -> Result<Box<dyn EventSource>, StateStoreError> {
//! #         Err(StateStoreError::Unavailable("doc".to_string()))
//! #     }
//! #     async fn fetch_desired_scheduling_infos(
//! #         &self,
//! #     ) -> Result<Vec<DesiredSchedulingInfo>, StateStoreError> {
//! #         Ok(Vec::new())
//! #     }
//! #     async fn fetch_actual_lrp_groups(&self) -> Result<Vec<ActualLrpGroup>, StateStoreError> {
//! #         Ok(Vec::new())
//! #     }
//! # }
//! # struct MyEmitter;
//! # #[async_trait]
//! # impl RegistryEmitter for MyEmitter {
//! #     async fn emit(&self, _messages: MessagesToEmit) -> Result<(), EmitError> {
//! #         Ok(())
//! #     }
//! # }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let (scheduler, sync_events) = SyncEvents::channel(1);
//! let (_shutdown, shutdown_rx) = tokio::sync::mpsc::channel(1);
//!
//! let watcher = RouteWatcher::new(
//!     Arc::new(MyStore),
//!     Arc::new(RoutingTable::new()),
//!     Arc::new(MyEmitter),
//!     Arc::new(NullMetricsReporter),
//!     sync_events,
//!     shutdown_rx,
//! );
//!
//! tokio::spawn(watcher.run());
//! scheduler.sync.send(()).await.unwrap();
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - Models: state-store record and event shapes
//! - Store: upstream client and subscription traits
//! - Routing: keying and `cf-router` blob extraction policy
//! - Control plane: routing-table state, tag gates, and diff computation
//! - Data plane: registry-message emitter boundary
//! - Runtime: the watcher event loop, sync-time event cache, scheduler contract
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events. Library code emits
//! events/spans and does not unconditionally initialize a global subscriber.
//! Binaries and tests are responsible for one-time `tracing_subscriber`
//! initialization at process boundaries. Metrics flow through an injected
//! [`observability::metrics::MetricsReporter`].

pub mod control_plane;
pub mod data_plane;
pub mod models;
pub mod observability;
pub mod routing;
pub mod runtime;
pub mod store;

pub use control_plane::{MessagesToEmit, RegistryMessage, RoutingTable, TempTable};
pub use routing::RoutingKey;
pub use runtime::{RouteWatcher, SyncEvents, SyncEventsHandle};
