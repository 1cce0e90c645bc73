//! Formatting helpers for structured log fields.

use crate::models::RoutingInfo;
use crate::routing::by_routing_key::RoutingKey;
use crate::routing::cf_routes::CF_ROUTER;

/// Renders only the `cf-router` portion of a routing-info blob. Other tags
/// may carry credentials (e.g. SSH key material) and must never reach log
/// output.
pub fn format_router_routes(routing_info: &RoutingInfo) -> String {
    match routing_info.get(CF_ROUTER) {
        Some(value) => value.to_string(),
        None => "null".to_string(),
    }
}

pub fn format_routing_key(key: &RoutingKey) -> String {
    format!("{}:{}", key.process_guid, key.container_port)
}
