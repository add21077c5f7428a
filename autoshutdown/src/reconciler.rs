//! Maps a schedule verdict onto start/stop actions
//!
//! ```text
//!                     observed
//! desired             Running/Starting   Deallocated   anything else
//! Started             -                  start         start
//! StoppedDeallocated  stop               -             stop
//! ```
//!
//! A reconciler lives for one run and issues at most one action per machine.

use std::collections::HashSet;
use std::fmt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cloud::{ObservedPowerState, PowerControl, VirtualMachine};
use crate::errors::ControlApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredPowerState {
    Started,
    StoppedDeallocated,
}

impl DesiredPowerState {
    /// `true` (shutdown window active) means the machine should be deallocated
    pub fn from_verdict(shutdown_active: bool) -> Self {
        if shutdown_active {
            Self::StoppedDeallocated
        } else {
            Self::Started
        }
    }
}

impl fmt::Display for DesiredPowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => write!(f, "Started"),
            Self::StoppedDeallocated => write!(f, "StoppedDeallocated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    None,
    StartRequested,
    StopRequested,
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::StartRequested => write!(f, "start"),
            Self::StopRequested => write!(f, "stop"),
        }
    }
}

pub fn plan_action(desired: DesiredPowerState, observed: ObservedPowerState) -> ReconcileAction {
    match desired {
        DesiredPowerState::Started if !observed.is_running_equivalent() => {
            ReconcileAction::StartRequested
        }
        DesiredPowerState::StoppedDeallocated if observed != ObservedPowerState::Deallocated => {
            ReconcileAction::StopRequested
        }
        _ => ReconcileAction::None,
    }
}

pub struct PowerStateReconciler {
    simulate: bool,
    acted_on: Mutex<HashSet<String>>,
}

impl PowerStateReconciler {
    pub fn new(simulate: bool) -> Self {
        Self {
            simulate,
            acted_on: Mutex::new(HashSet::with_capacity(32)),
        }
    }

    pub fn is_simulation(&self) -> bool {
        self.simulate
    }

    /// Decide and, unless simulating, issue the action for one machine.
    ///
    /// Control API failures are returned to the caller; nothing is retried.
    pub async fn reconcile(
        &self,
        vm: &VirtualMachine,
        control: &dyn PowerControl,
        desired: DesiredPowerState,
        observed: ObservedPowerState,
    ) -> Result<ReconcileAction, ControlApiError> {
        let action = plan_action(desired, observed);
        if action == ReconcileAction::None {
            info!(
                "{} is already {} (desired {}), no action taken",
                vm.name, observed, desired
            );
            return Ok(ReconcileAction::None);
        }

        {
            let mut acted_on = self.acted_on.lock().await;
            if !acted_on.insert(vm.id.to_ascii_lowercase()) {
                warn!(
                    "{} already had an action issued this run, not repeating {}",
                    vm.name, action
                );
                return Ok(ReconcileAction::None);
            }
        }

        if self.simulate {
            info!(
                "[SIMULATE] Would {} {} (observed {}, desired {})",
                action, vm.name, observed, desired
            );
            return Ok(action);
        }

        info!(
            "Requesting {} for {} (observed {}, desired {})",
            action, vm.name, observed, desired
        );
        match action {
            ReconcileAction::StartRequested => control.start(vm).await?,
            ReconcileAction::StopRequested => control.stop(vm).await?,
            ReconcileAction::None => {}
        }
        info!("{} request accepted for {}", action, vm.name);

        Ok(action)
    }
}
