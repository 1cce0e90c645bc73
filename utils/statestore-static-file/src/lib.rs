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

//! A read-only state store backed by a JSON file on disk.
//!
//! Useful for demos and integration tests that need a
//! [`StateStoreClient`] without a live cluster. The file holds both
//! snapshots:
//!
//! ```json
//! {
//!   "desired": [ { "process_guid": "pg", "ports": [8080], "routes": { "cf-router": [] } } ],
//!   "actual":  [ { "instance": { "process_guid": "pg", "state": "running" } } ]
//! }
//! ```
//!
//! Snapshot fetches re-read the file on every call, so tests can rewrite it
//! between sync ticks. The event subscription is accepted but never yields,
//! since a static file has no deltas.

use async_trait::async_trait;
use route_emitter::models::{ActualLrpGroup, DesiredSchedulingInfo, Event};
use route_emitter::store::{EventSource, StateStoreClient, StateStoreError};
use serde::Deserialize;
use std::fs::{self, canonicalize};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct StaticStoreDocument {
    #[serde(default)]
    desired: Vec<DesiredSchedulingInfo>,
    #[serde(default)]
    actual: Vec<ActualLrpGroup>,
}

pub struct StaticFileStateStore {
    static_file: String,
}

impl StaticFileStateStore {
    pub fn new(static_file: String) -> Self {
        Self { static_file }
    }

    fn canonicalized_static_file_path(&self) -> Result<PathBuf, StateStoreError> {
        let store_json_file = PathBuf::from(self.static_file.clone());
        debug!("store_json_file: {store_json_file:?}");

        canonicalize(store_json_file).map_err(|error| {
            StateStoreError::Unavailable(format!("static store file not found: {error:?}"))
        })
    }

    fn read_static_store_json(&self) -> Result<StaticStoreDocument, StateStoreError> {
        let store_json_file = self.canonicalized_static_file_path()?;
        let data = fs::read_to_string(store_json_file).map_err(|error| {
            StateStoreError::Unavailable(format!("unable to read file: {error:?}"))
        })?;

        serde_json::from_str(&data).map_err(|error| {
            StateStoreError::InvalidRecord(format!("unable to parse JSON: {error:?}"))
        })
    }
}

/// Subscription over a static file: live, but permanently quiet.
struct StaticFileEventSource;

#[async_trait]
impl EventSource for StaticFileEventSource {
    async fn next_event(&mut self) -> Result<Event, StateStoreError> {
        std::future::pending().await
    }
}

#[async_trait]
impl StateStoreClient for StaticFileStateStore {
    async fn subscribe_events(&self) -> Result<Box<dyn EventSource>, StateStoreError> {
        // Validate the file up front so a bad path fails at subscribe time,
        // the same place a live client would fail to connect.
        self.read_static_store_json()?;
        Ok(Box::new(StaticFileEventSource))
    }

    async fn fetch_desired_scheduling_infos(
        &self,
    ) -> Result<Vec<DesiredSchedulingInfo>, StateStoreError> {
        let document = self.read_static_store_json()?;
        debug!(
            "finished reading desired snapshot: {} records",
            document.desired.len()
        );
        Ok(document.desired)
    }

    async fn fetch_actual_lrp_groups(&self) -> Result<Vec<ActualLrpGroup>, StateStoreError> {
        let document = self.read_static_store_json()?;
        debug!(
            "finished reading actual snapshot: {} records",
            document.actual.len()
        );
        Ok(document.actual)
    }
}
