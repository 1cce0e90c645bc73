//! Desired-state records: what the orchestrator wants running, plus routing metadata.

use crate::models::modification_tag::ModificationTag;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The routing-info blob attached to a desired record: a map keyed by
/// protocol tag. Only the `cf-router` tag is interpreted here; every other
/// tag is preserved verbatim for upstream writers and ignored.
pub type RoutingInfo = HashMap<String, serde_json::Value>;

/// Scheduling-relevant slice of a desired record, as served by the bulk
/// snapshot endpoint and carried inside desired events.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct DesiredSchedulingInfo {
    pub process_guid: String,
    #[serde(default)]
    pub log_guid: String,
    #[serde(default)]
    pub ports: Vec<u32>,
    #[serde(default)]
    pub routes: RoutingInfo,
    #[serde(default)]
    pub modification_tag: ModificationTag,
}
