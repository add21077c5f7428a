//! Power control for legacy classic VMs
//!
//! Classic VMs report a role status string on the resource itself instead of an
//! instance view, and stop through `shutdown` (which leaves them deallocated).

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use super::{ArmClient, ObservedPowerState, PowerControl, VirtualMachine};
use crate::constants::api_versions;
use crate::errors::ControlApiError;

pub struct ClassicPowerControl {
    client: Arc<ArmClient>,
}

#[derive(Debug, Deserialize)]
struct ClassicVm {
    #[serde(default)]
    properties: ClassicProperties,
}

#[derive(Debug, Default, Deserialize)]
struct ClassicProperties {
    #[serde(rename = "instanceView", default)]
    instance_view: Option<ClassicInstanceView>,
}

#[derive(Debug, Deserialize)]
struct ClassicInstanceView {
    status: Option<String>,
}

impl ClassicPowerControl {
    pub fn new(client: Arc<ArmClient>) -> Self {
        Self { client }
    }
}

pub fn power_state_from_status(status: &str) -> ObservedPowerState {
    match status {
        "ReadyRole" | "Started" => ObservedPowerState::Running,
        "StartingVM" | "StartingRole" | "CreatingVM" | "CreatingRole" | "RestartingRole" => {
            ObservedPowerState::Starting
        }
        "StoppingVM" | "StoppingRole" => ObservedPowerState::Stopping,
        "StoppedVM" | "Stopped" => ObservedPowerState::Stopped,
        "StoppedDeallocated" => ObservedPowerState::Deallocated,
        _ => ObservedPowerState::Unknown,
    }
}

#[async_trait]
impl PowerControl for ClassicPowerControl {
    async fn power_state(&self, vm: &VirtualMachine) -> Result<ObservedPowerState, ControlApiError> {
        let url = self
            .client
            .resource_url(&vm.id, None, api_versions::CLASSIC_COMPUTE)?;
        let resource: ClassicVm = self.client.get_json("read power state", &vm.name, url).await?;

        Ok(resource
            .properties
            .instance_view
            .and_then(|view| view.status)
            .map(|status| power_state_from_status(&status))
            .unwrap_or(ObservedPowerState::Unknown))
    }

    async fn start(&self, vm: &VirtualMachine) -> Result<(), ControlApiError> {
        let url = self
            .client
            .resource_url(&vm.id, Some("start"), api_versions::CLASSIC_COMPUTE)?;
        self.client.post_action("start", &vm.name, url).await
    }

    async fn stop(&self, vm: &VirtualMachine) -> Result<(), ControlApiError> {
        let url = self
            .client
            .resource_url(&vm.id, Some("shutdown"), api_versions::CLASSIC_COMPUTE)?;
        self.client.post_action("shutdown", &vm.name, url).await
    }
}
