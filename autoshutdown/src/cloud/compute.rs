//! Power control for current-generation compute VMs

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::{ArmClient, ObservedPowerState, PowerControl, VirtualMachine};
use crate::constants::api_versions;
use crate::errors::ControlApiError;

pub struct ComputePowerControl {
    client: Arc<ArmClient>,
}

#[derive(Debug, Deserialize)]
struct InstanceView {
    #[serde(default)]
    statuses: Vec<InstanceStatus>,
}

#[derive(Debug, Deserialize)]
struct InstanceStatus {
    code: String,
}

impl ComputePowerControl {
    pub fn new(client: Arc<ArmClient>) -> Self {
        Self { client }
    }
}

/// Maps `PowerState/<state>` status codes from the instance view
pub fn power_state_from_code(code: &str) -> ObservedPowerState {
    let state = code.strip_prefix("PowerState/").unwrap_or(code);
    match state.to_ascii_lowercase().as_str() {
        "running" => ObservedPowerState::Running,
        "starting" => ObservedPowerState::Starting,
        "stopped" => ObservedPowerState::Stopped,
        "stopping" | "deallocating" => ObservedPowerState::Stopping,
        "deallocated" => ObservedPowerState::Deallocated,
        _ => ObservedPowerState::Unknown,
    }
}

#[async_trait]
impl PowerControl for ComputePowerControl {
    async fn power_state(&self, vm: &VirtualMachine) -> Result<ObservedPowerState, ControlApiError> {
        let url = self
            .client
            .resource_url(&vm.id, Some("instanceView"), api_versions::COMPUTE)?;
        let view: InstanceView = self.client.get_json("read power state", &vm.name, url).await?;

        Ok(view
            .statuses
            .iter()
            .find(|s| s.code.starts_with("PowerState/"))
            .map(|s| power_state_from_code(&s.code))
            .unwrap_or(ObservedPowerState::Unknown))
    }

    async fn start(&self, vm: &VirtualMachine) -> Result<(), ControlApiError> {
        let url = self
            .client
            .resource_url(&vm.id, Some("start"), api_versions::COMPUTE)?;
        self.client.post_action("start", &vm.name, url).await
    }

    async fn stop(&self, vm: &VirtualMachine) -> Result<(), ControlApiError> {
        let url = self
            .client
            .resource_url(&vm.id, Some("deallocate"), api_versions::COMPUTE)?;
        self.client.post_action("deallocate", &vm.name, url).await
    }
}
