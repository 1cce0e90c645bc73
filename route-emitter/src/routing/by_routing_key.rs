//! Canonical keying of desired and actual records, and extraction into table inputs.

use crate::control_plane::routable_entry::{Endpoint, Routes};
use crate::models::{ActualLrp, ActualLrpGroup, ActualLrpRoutingInfo, DesiredSchedulingInfo};
use crate::routing::cf_routes::{cf_routes_from_routing_info, RoutingInfoError};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

/// One routable slot of an application: a process and one of its container
/// ports. Immutable once formed.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RoutingKey {
    pub process_guid: String,
    pub container_port: u32,
}

impl RoutingKey {
    pub fn new(process_guid: impl Into<String>, container_port: u32) -> Self {
        Self {
            process_guid: process_guid.into(),
            container_port,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EndpointExtractionError {
    /// The actual record carries no port mappings; callers treat this as an
    /// empty contribution.
    MissingPorts,
}

impl Display for EndpointExtractionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EndpointExtractionError::MissingPorts => write!(f, "actual record has no port mappings"),
        }
    }
}

impl Error for EndpointExtractionError {}

/// Extracts the routes a single desired record contributes, one entry per
/// `cf-router` blob element. Malformed blobs surface as an error the caller
/// logs and skips.
pub fn routes_from_desired(
    desired: &DesiredSchedulingInfo,
) -> Result<Vec<(RoutingKey, Routes)>, RoutingInfoError> {
    let cf_routes = cf_routes_from_routing_info(&desired.routes)?;

    Ok(cf_routes
        .into_iter()
        .map(|cf_route| {
            (
                RoutingKey::new(desired.process_guid.clone(), cf_route.port),
                Routes {
                    hostnames: cf_route.hostnames,
                    log_guid: desired.log_guid.clone(),
                    route_service_url: cf_route.route_service_url,
                    modification_tag: desired.modification_tag.clone(),
                },
            )
        })
        .collect())
}

/// Collects routes across a desired snapshot. Records with malformed
/// routing info contribute nothing.
pub fn routes_by_routing_key(
    scheduling_infos: &[DesiredSchedulingInfo],
) -> HashMap<RoutingKey, Routes> {
    let mut routes_by_key = HashMap::new();

    for desired in scheduling_infos {
        if let Ok(routes) = routes_from_desired(desired) {
            for (key, routes) in routes {
                routes_by_key.insert(key, routes);
            }
        }
    }

    routes_by_key
}

/// Extracts one endpoint per port mapping from a resolved actual record,
/// indexed by container port.
pub fn endpoints_from_actual(
    routing_info: &ActualLrpRoutingInfo,
) -> Result<HashMap<u32, Endpoint>, EndpointExtractionError> {
    let actual = &routing_info.actual;

    if actual.ports.is_empty() {
        return Err(EndpointExtractionError::MissingPorts);
    }

    let mut endpoints = HashMap::new();
    for port_mapping in &actual.ports {
        endpoints.insert(
            port_mapping.container_port,
            Endpoint {
                instance_guid: actual.instance_guid.clone(),
                host: actual.address.clone(),
                port: port_mapping.host_port,
                container_port: port_mapping.container_port,
                domain: actual.domain.clone(),
                evacuating: routing_info.evacuating,
                modification_tag: actual.modification_tag.clone(),
            },
        );
    }

    Ok(endpoints)
}

/// Collects endpoints across an actual snapshot. Only running instances
/// contribute; records without port mappings are skipped.
pub fn endpoints_by_routing_key(
    groups: &[ActualLrpGroup],
) -> HashMap<RoutingKey, Vec<Endpoint>> {
    let mut endpoints_by_key: HashMap<RoutingKey, Vec<Endpoint>> = HashMap::new();

    for group in groups {
        for routing_info in group.routing_infos() {
            if !routing_info.actual.is_running() {
                continue;
            }

            let Ok(endpoints) = endpoints_from_actual(&routing_info) else {
                continue;
            };

            for (container_port, endpoint) in endpoints {
                let key =
                    RoutingKey::new(routing_info.actual.process_guid.clone(), container_port);
                endpoints_by_key.entry(key).or_default().push(endpoint);
            }
        }
    }

    endpoints_by_key
}

/// One routing key per port mapping on an actual record.
pub fn routing_keys_from_actual(actual: &ActualLrp) -> Vec<RoutingKey> {
    actual
        .ports
        .iter()
        .map(|port_mapping| {
            RoutingKey::new(actual.process_guid.clone(), port_mapping.container_port)
        })
        .collect()
}
