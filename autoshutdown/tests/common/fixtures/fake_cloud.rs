//! In-memory cloud used by orchestrator and reconciler tests
//!
//! Implements both `Inventory` and `PowerControl`, keeps per-machine power
//! states and records every power call so tests can assert on side effects.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use autoshutdown::cloud::{
    ControlPlane, Inventory, ObservedPowerState, PowerControl, ResourceGroup, ResourceKind,
    VirtualMachine,
};
use autoshutdown::ControlApiError;

/// A power call issued against the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerCall {
    ReadState(String),
    Start(String),
    Stop(String),
}

impl PowerCall {
    pub fn is_action(&self) -> bool {
        !matches!(self, PowerCall::ReadState(_))
    }
}

#[derive(Default)]
struct State {
    machines: Vec<VirtualMachine>,
    groups: Vec<ResourceGroup>,
    power: HashMap<String, ObservedPowerState>,
    read_failures: HashMap<String, ControlApiError>,
    action_failures: HashMap<String, ControlApiError>,
    inventory_failure: Option<ControlApiError>,
    calls: Vec<PowerCall>,
}

#[derive(Default)]
pub struct FakeCloud {
    state: Mutex<State>,
    action_delay: Option<Duration>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every start/stop sleeps this long before completing
    pub fn with_action_delay(delay: Duration) -> Self {
        Self {
            state: Mutex::default(),
            action_delay: Some(delay),
        }
    }

    pub fn add_machine(&self, vm: VirtualMachine, power: ObservedPowerState) -> &Self {
        let mut state = self.state.lock().unwrap();
        state.power.insert(vm.id.clone(), power);
        state.machines.push(vm);
        self
    }

    pub fn add_group(&self, group: ResourceGroup) -> &Self {
        self.state.lock().unwrap().groups.push(group);
        self
    }

    pub fn fail_inventory(&self, error: ControlApiError) {
        self.state.lock().unwrap().inventory_failure = Some(error);
    }

    pub fn fail_power_read(&self, vm_id: &str, error: ControlApiError) {
        self.state
            .lock()
            .unwrap()
            .read_failures
            .insert(vm_id.to_string(), error);
    }

    pub fn fail_actions(&self, vm_id: &str, error: ControlApiError) {
        self.state
            .lock()
            .unwrap()
            .action_failures
            .insert(vm_id.to_string(), error);
    }

    pub fn power_state_of(&self, vm_id: &str) -> Option<ObservedPowerState> {
        self.state.lock().unwrap().power.get(vm_id).copied()
    }

    pub fn calls(&self) -> Vec<PowerCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn actions(&self) -> Vec<PowerCall> {
        self.calls().into_iter().filter(PowerCall::is_action).collect()
    }

    /// Control plane with this fake as inventory and as power control for both kinds
    pub fn control_plane(self: &Arc<Self>) -> Arc<ControlPlane> {
        Arc::new(
            ControlPlane::new(self.clone())
                .with_power_control(ResourceKind::Compute, self.clone())
                .with_power_control(ResourceKind::Classic, self.clone()),
        )
    }

    fn record(&self, call: PowerCall) {
        self.state.lock().unwrap().calls.push(call);
    }

    async fn act(
        &self,
        vm: &VirtualMachine,
        call: PowerCall,
        result_state: ObservedPowerState,
    ) -> Result<(), ControlApiError> {
        self.record(call);
        if let Some(delay) = self.action_delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.action_failures.get(&vm.id) {
            return Err(error.clone());
        }
        state.power.insert(vm.id.clone(), result_state);
        Ok(())
    }
}

#[async_trait]
impl Inventory for FakeCloud {
    async fn list_virtual_machines(&self) -> Result<Vec<VirtualMachine>, ControlApiError> {
        let state = self.state.lock().unwrap();
        match &state.inventory_failure {
            Some(error) => Err(error.clone()),
            None => Ok(state.machines.clone()),
        }
    }

    async fn list_tagged_resource_groups(
        &self,
        tag_key: &str,
    ) -> Result<Vec<ResourceGroup>, ControlApiError> {
        let state = self.state.lock().unwrap();
        match &state.inventory_failure {
            Some(error) => Err(error.clone()),
            None => Ok(state
                .groups
                .iter()
                .filter(|g| g.tag(tag_key).is_some())
                .cloned()
                .collect()),
        }
    }
}

#[async_trait]
impl PowerControl for FakeCloud {
    async fn power_state(&self, vm: &VirtualMachine) -> Result<ObservedPowerState, ControlApiError> {
        self.record(PowerCall::ReadState(vm.name.clone()));
        let state = self.state.lock().unwrap();
        if let Some(error) = state.read_failures.get(&vm.id) {
            return Err(error.clone());
        }
        Ok(state
            .power
            .get(&vm.id)
            .copied()
            .unwrap_or(ObservedPowerState::Unknown))
    }

    async fn start(&self, vm: &VirtualMachine) -> Result<(), ControlApiError> {
        self.act(vm, PowerCall::Start(vm.name.clone()), ObservedPowerState::Running)
            .await
    }

    async fn stop(&self, vm: &VirtualMachine) -> Result<(), ControlApiError> {
        self.act(vm, PowerCall::Stop(vm.name.clone()), ObservedPowerState::Deallocated)
            .await
    }
}
