//! Registry messages: the wire objects published to the router bus.

use crate::control_plane::routable_entry::{Endpoint, Routes};
use serde::{Deserialize, Serialize};

/// One register/unregister record as serialized onto the bus. Idempotent at
/// the router: re-registering an identical pairing is a no-op there.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RegistryMessage {
    pub uris: Vec<String>,
    pub host: String,
    pub port: u32,
    pub app: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_service_url: Option<String>,
}

impl RegistryMessage {
    /// Builds the message for one endpoint under one set of route bindings.
    /// URIs are emitted in sorted order so identical states serialize
    /// identically.
    pub fn for_endpoint(endpoint: &Endpoint, routes: &Routes) -> Self {
        let mut uris = routes.hostnames.clone();
        uris.sort();

        Self {
            uris,
            host: endpoint.host.clone(),
            port: endpoint.port,
            app: routes.log_guid.clone(),
            private_instance_id: Some(endpoint.instance_guid.clone()),
            route_service_url: routes.route_service_url.clone(),
        }
    }

    /// Number of hostname bindings this message conveys.
    pub fn route_count(&self) -> usize {
        self.uris.len()
    }
}

/// A batch of registrations and unregistrations derived from one table
/// mutation, one swap, or one full re-emit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessagesToEmit {
    pub registrations: Vec<RegistryMessage>,
    pub unregistrations: Vec<RegistryMessage>,
}

impl MessagesToEmit {
    pub fn merge(&mut self, other: MessagesToEmit) {
        self.registrations.extend(other.registrations);
        self.unregistrations.extend(other.unregistrations);
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty() && self.unregistrations.is_empty()
    }

    pub fn registered_route_count(&self) -> usize {
        self.registrations
            .iter()
            .map(RegistryMessage::route_count)
            .sum()
    }

    pub fn unregistered_route_count(&self) -> usize {
        self.unregistrations
            .iter()
            .map(RegistryMessage::route_count)
            .sum()
    }
}
