//! Wire format of the `cf-router` entry inside a desired record's routing-info blob.

use crate::models::RoutingInfo;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Routing-info tag whose value this emitter interprets. Every other tag in
/// the blob belongs to some other consumer and is passed over untouched.
pub const CF_ROUTER: &str = "cf-router";

/// One hostnames/port binding from the `cf-router` blob.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct CfRoute {
    #[serde(default)]
    pub hostnames: Vec<String>,
    #[serde(default)]
    pub port: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_service_url: Option<String>,
}

#[derive(Debug)]
pub enum RoutingInfoError {
    Malformed(serde_json::Error),
}

impl Display for RoutingInfoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RoutingInfoError::Malformed(err) => {
                write!(f, "malformed cf-router routing info: {err}")
            }
        }
    }
}

impl Error for RoutingInfoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RoutingInfoError::Malformed(err) => Some(err),
        }
    }
}

/// Parses the `cf-router` entry out of a routing-info blob.
///
/// A blob without the tag, or with an explicit `null`, contributes no routes
/// and is not an error. A present-but-malformed entry is an error the caller
/// logs and skips; it never aborts reconciliation.
pub fn cf_routes_from_routing_info(
    routing_info: &RoutingInfo,
) -> Result<Vec<CfRoute>, RoutingInfoError> {
    match routing_info.get(CF_ROUTER) {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(RoutingInfoError::Malformed)
        }
    }
}

/// Builds a routing-info blob holding the given `cf-router` routes. Used by
/// record constructors in demos and tests; the inverse of
/// [`cf_routes_from_routing_info`].
pub fn routing_info_from_cf_routes(routes: &[CfRoute]) -> RoutingInfo {
    let mut routing_info = RoutingInfo::new();
    // CfRoute serialization cannot fail; the blob is plain data.
    if let Ok(value) = serde_json::to_value(routes) {
        routing_info.insert(CF_ROUTER.to_string(), value);
    }
    routing_info
}
