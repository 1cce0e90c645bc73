//! Actual-state records: instances the orchestrator reports as scheduled or running.

use crate::models::modification_tag::ModificationTag;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActualLrpState {
    #[default]
    Unclaimed,
    Claimed,
    Running,
    Crashed,
}

/// One host/container port pair reported by the cell the instance runs on.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct PortMapping {
    pub container_port: u32,
    pub host_port: u32,
}

impl PortMapping {
    pub fn new(host_port: u32, container_port: u32) -> Self {
        Self {
            container_port,
            host_port,
        }
    }
}

/// A single long-running-process instance.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ActualLrp {
    pub process_guid: String,
    #[serde(default)]
    pub instance_guid: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    #[serde(default)]
    pub state: ActualLrpState,
    #[serde(default)]
    pub modification_tag: ModificationTag,
}

impl ActualLrp {
    pub fn is_running(&self) -> bool {
        self.state == ActualLrpState::Running
    }
}

/// The store reports at most one live instance and one evacuating instance
/// per index; both may exist while an evacuation is in flight.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ActualLrpGroup {
    #[serde(default)]
    pub instance: Option<ActualLrp>,
    #[serde(default)]
    pub evacuating: Option<ActualLrp>,
}

impl ActualLrpGroup {
    pub fn from_instance(instance: ActualLrp) -> Self {
        Self {
            instance: Some(instance),
            evacuating: None,
        }
    }

    pub fn from_evacuating(evacuating: ActualLrp) -> Self {
        Self {
            instance: None,
            evacuating: Some(evacuating),
        }
    }

    /// Flattens the group into one routable record per populated side. A
    /// group mid-evacuation carries both; each side keeps serving and keeps
    /// its own endpoint in the table until it departs.
    pub fn routing_infos(&self) -> Vec<ActualLrpRoutingInfo> {
        let mut routing_infos = Vec::new();

        if let Some(instance) = &self.instance {
            routing_infos.push(ActualLrpRoutingInfo {
                actual: instance.clone(),
                evacuating: false,
            });
        }
        if let Some(evacuating) = &self.evacuating {
            routing_infos.push(ActualLrpRoutingInfo {
                actual: evacuating.clone(),
                evacuating: true,
            });
        }

        routing_infos
    }
}

/// An actual record resolved for routing purposes.
#[derive(Clone, Debug, PartialEq)]
pub struct ActualLrpRoutingInfo {
    pub actual: ActualLrp,
    pub evacuating: bool,
}
