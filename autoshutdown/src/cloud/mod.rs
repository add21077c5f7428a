//! Cloud inventory and power control
//!
//! The job only needs a small capability set from the cloud:
//!
//! ```text
//! Inventory     list VMs, list tagged resource groups
//! PowerControl  read power state, start, stop (deallocate)
//! ```
//!
//! Two VM representations exist on the platform (current compute VMs and legacy
//! classic VMs). Each gets its own [`PowerControl`] implementation and the
//! [`ControlPlane`] picks one from the VM's resource type.

pub mod arm;
pub mod classic;
pub mod compute;

pub use arm::ArmClient;
pub use classic::ClassicPowerControl;
pub use compute::ComputePowerControl;

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::constants::resource_types;
use crate::errors::ControlApiError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualMachine {
    /// Full resource id, unique across the subscription
    pub id: String,
    pub name: String,
    pub resource_group: String,
    /// Resource type discriminator, e.g. `Microsoft.Compute/virtualMachines`
    pub resource_type: String,
    pub tags: HashMap<String, String>,
}

impl VirtualMachine {
    pub fn kind(&self) -> Option<ResourceKind> {
        ResourceKind::from_resource_type(&self.resource_type)
    }

    /// Tag lookup; keys are matched case-insensitively like the platform does
    pub fn tag(&self, key: &str) -> Option<&str> {
        find_tag(&self.tags, key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceGroup {
    pub name: String,
    pub tags: HashMap<String, String>,
}

impl ResourceGroup {
    pub fn tag(&self, key: &str) -> Option<&str> {
        find_tag(&self.tags, key)
    }
}

fn find_tag<'a>(tags: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    tags.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Compute,
    Classic,
}

impl ResourceKind {
    pub fn from_resource_type(resource_type: &str) -> Option<Self> {
        if resource_type.eq_ignore_ascii_case(resource_types::COMPUTE_VM) {
            Some(Self::Compute)
        } else if resource_type.eq_ignore_ascii_case(resource_types::CLASSIC_VM) {
            Some(Self::Classic)
        } else {
            None
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Compute => write!(f, "compute"),
            ResourceKind::Classic => write!(f, "classic"),
        }
    }
}

/// Power state read from the control API right before acting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedPowerState {
    Running,
    Starting,
    Stopped,
    Stopping,
    Deallocated,
    Unknown,
}

impl ObservedPowerState {
    /// Running, or already on its way there
    pub fn is_running_equivalent(&self) -> bool {
        matches!(self, Self::Running | Self::Starting)
    }
}

impl fmt::Display for ObservedPowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Running => "Running",
            Self::Starting => "Starting",
            Self::Stopped => "Stopped",
            Self::Stopping => "Stopping",
            Self::Deallocated => "Deallocated",
            Self::Unknown => "Unknown",
        };
        write!(f, "{}", label)
    }
}

#[async_trait]
pub trait Inventory: Send + Sync {
    async fn list_virtual_machines(&self) -> Result<Vec<VirtualMachine>, ControlApiError>;

    /// Resource groups carrying `tag_key`
    async fn list_tagged_resource_groups(
        &self,
        tag_key: &str,
    ) -> Result<Vec<ResourceGroup>, ControlApiError>;
}

#[async_trait]
pub trait PowerControl: Send + Sync {
    async fn power_state(&self, vm: &VirtualMachine) -> Result<ObservedPowerState, ControlApiError>;

    async fn start(&self, vm: &VirtualMachine) -> Result<(), ControlApiError>;

    /// Forced stop that releases compute (deallocation), never a guest shutdown
    async fn stop(&self, vm: &VirtualMachine) -> Result<(), ControlApiError>;
}

/// Inventory plus one power control per supported resource kind
pub struct ControlPlane {
    inventory: Arc<dyn Inventory>,
    controls: HashMap<ResourceKind, Arc<dyn PowerControl>>,
}

impl ControlPlane {
    pub fn new(inventory: Arc<dyn Inventory>) -> Self {
        Self {
            inventory,
            controls: HashMap::with_capacity(2),
        }
    }

    /// Resource manager backed control plane handling both VM kinds
    pub fn resource_manager(client: Arc<ArmClient>) -> Self {
        Self::new(client.clone())
            .with_power_control(
                ResourceKind::Compute,
                Arc::new(ComputePowerControl::new(client.clone())),
            )
            .with_power_control(ResourceKind::Classic, Arc::new(ClassicPowerControl::new(client)))
    }

    pub fn with_power_control(mut self, kind: ResourceKind, control: Arc<dyn PowerControl>) -> Self {
        self.controls.insert(kind, control);
        self
    }

    pub fn inventory(&self) -> &dyn Inventory {
        self.inventory.as_ref()
    }

    pub fn power_control(&self, kind: ResourceKind) -> Option<Arc<dyn PowerControl>> {
        self.controls.get(&kind).cloned()
    }
}
