//! Table value types: desired routes, backend endpoints, and the entry that pairs them.

use crate::models::ModificationTag;
use std::collections::{HashMap, HashSet};

/// Desired externally-visible names bound to one routing key. This is the
/// shape `set_routes` consumes; inside the table the hostnames live as a set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Routes {
    pub hostnames: Vec<String>,
    pub log_guid: String,
    pub route_service_url: Option<String>,
    pub modification_tag: ModificationTag,
}

/// Identity of an endpoint within one routing key. An evacuating instance
/// and its live replacement carry the same instance guid and coexist under
/// distinct keys.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct EndpointKey {
    pub instance_guid: String,
    pub evacuating: bool,
}

impl EndpointKey {
    /// The same instance on the other side of an evacuation.
    pub fn twin(&self) -> EndpointKey {
        EndpointKey {
            instance_guid: self.instance_guid.clone(),
            evacuating: !self.evacuating,
        }
    }
}

/// A single live backend for a routing key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Endpoint {
    pub instance_guid: String,
    pub host: String,
    pub port: u32,
    pub container_port: u32,
    pub domain: String,
    pub evacuating: bool,
    pub modification_tag: ModificationTag,
}

impl Endpoint {
    pub fn key(&self) -> EndpointKey {
        EndpointKey {
            instance_guid: self.instance_guid.clone(),
            evacuating: self.evacuating,
        }
    }
}

/// What the table stores per routing key. Emitted traffic is the cross
/// product of `hostnames` and `endpoints`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoutableEntry {
    pub hostnames: HashSet<String>,
    pub endpoints: HashMap<EndpointKey, Endpoint>,
    pub log_guid: String,
    pub route_service_url: Option<String>,
    pub modification_tag: ModificationTag,
}

impl RoutableEntry {
    pub fn from_routes(routes: &Routes) -> Self {
        Self {
            hostnames: routes.hostnames.iter().cloned().collect(),
            endpoints: HashMap::new(),
            log_guid: routes.log_guid.clone(),
            route_service_url: routes.route_service_url.clone(),
            modification_tag: routes.modification_tag.clone(),
        }
    }

    /// The entry's route bindings with hostnames in sorted order, as used
    /// when building registry messages.
    pub fn routes(&self) -> Routes {
        let mut hostnames: Vec<String> = self.hostnames.iter().cloned().collect();
        hostnames.sort();

        Routes {
            hostnames,
            log_guid: self.log_guid.clone(),
            route_service_url: self.route_service_url.clone(),
            modification_tag: self.modification_tag.clone(),
        }
    }

    /// True when the endpoint, or its evacuation twin, is present.
    pub fn has_endpoint(&self, endpoint: &Endpoint) -> bool {
        let key = endpoint.key();
        self.endpoints.contains_key(&key) || self.endpoints.contains_key(&key.twin())
    }

    /// Endpoints ordered by identity, for deterministic message output.
    pub fn sorted_endpoints(&self) -> Vec<&Endpoint> {
        let mut endpoints: Vec<&Endpoint> = self.endpoints.values().collect();
        endpoints.sort_by(|a, b| {
            (&a.instance_guid, a.evacuating).cmp(&(&b.instance_guid, b.evacuating))
        });
        endpoints
    }
}
