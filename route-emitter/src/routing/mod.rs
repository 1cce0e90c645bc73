/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
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

//! Keying and extraction layer.
//!
//! Translates desired and actual store records into the canonical shapes the
//! routing table consumes: `(process, container-port)` keys, hostname
//! bindings from the `cf-router` blob, and per-port backend endpoints.
//! Extraction is tolerant by contract: a record with a malformed blob or no
//! port mappings contributes nothing and never aborts reconciliation.

pub mod by_routing_key;
pub mod cf_routes;

pub use by_routing_key::{
    endpoints_by_routing_key, endpoints_from_actual, routes_by_routing_key, routes_from_desired,
    routing_keys_from_actual, EndpointExtractionError, RoutingKey,
};
pub use cf_routes::{
    cf_routes_from_routing_info, routing_info_from_cf_routes, CfRoute, RoutingInfoError, CF_ROUTER,
};
