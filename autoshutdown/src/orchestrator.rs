//! Fleet orchestration for one scheduled run
//!
//! ```text
//! list VMs + tagged resource groups
//!   └─ for each VM (sorted by name)
//!        effective tag ─▶ parse ─▶ evaluate ─▶ desired state
//!        power control (by resource type) ─▶ read state ─▶ reconcile
//! summary + failure notification
//! ```
//!
//! Per-machine failures are counted and reported at the end; only failing to
//! list the inventory (or overrunning the deadline) aborts the run.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::pin::pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::cloud::{ControlPlane, ResourceGroup, VirtualMachine};
use crate::config::Config;
use crate::errors::{ControlApiError, ShutdownError};
use crate::notify::NotificationSink;
use crate::reconciler::{DesiredPowerState, PowerStateReconciler, ReconcileAction};
use crate::schedule;

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub processed: usize,
    pub started: usize,
    pub stopped: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl RunStats {
    fn record(&mut self, outcome: &MachineOutcome) {
        self.processed += 1;
        match outcome {
            MachineOutcome::Skipped(_) => self.skipped += 1,
            MachineOutcome::Reconciled(ReconcileAction::StartRequested) => self.started += 1,
            MachineOutcome::Reconciled(ReconcileAction::StopRequested) => self.stopped += 1,
            MachineOutcome::Reconciled(ReconcileAction::None) => {}
            MachineOutcome::Errored(_) => self.errored += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub simulate: bool,
    pub stats: RunStats,
}

/// Where a VM's schedule came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleSource {
    Direct,
    ResourceGroup(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveSchedule<'a> {
    pub tag_value: &'a str,
    pub source: ScheduleSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoSchedule,
    UnsupportedResourceType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MachineOutcome {
    Skipped(SkipReason),
    Reconciled(ReconcileAction),
    Errored(ControlApiError),
}

/// Direct tag first, then the containing resource group's tag
///
/// `group_schedules` is keyed by lowercase resource group name.
pub fn resolve_effective_schedule<'a>(
    vm: &'a VirtualMachine,
    group_schedules: &'a HashMap<String, String>,
    tag_key: &str,
) -> Option<EffectiveSchedule<'a>> {
    if let Some(tag_value) = vm.tag(tag_key) {
        return Some(EffectiveSchedule {
            tag_value,
            source: ScheduleSource::Direct,
        });
    }

    group_schedules
        .get(&vm.resource_group.to_ascii_lowercase())
        .map(|tag_value| EffectiveSchedule {
            tag_value,
            source: ScheduleSource::ResourceGroup(vm.resource_group.clone()),
        })
}

fn group_schedule_index(groups: &[ResourceGroup], tag_key: &str) -> HashMap<String, String> {
    groups
        .iter()
        .filter_map(|g| {
            g.tag(tag_key)
                .map(|value| (g.name.to_ascii_lowercase(), value.to_string()))
        })
        .collect()
}

pub struct FleetOrchestrator {
    config: Arc<Config>,
    control_plane: Arc<ControlPlane>,
    notifier: Arc<dyn NotificationSink>,
}

impl FleetOrchestrator {
    pub fn new(
        config: Arc<Config>,
        control_plane: Arc<ControlPlane>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            control_plane,
            notifier,
        }
    }

    pub async fn run(&self, simulate: bool) -> Result<RunSummary, ShutdownError> {
        self.run_at(Utc::now(), simulate).await
    }

    /// Run against a fixed reference instant
    pub async fn run_at(
        &self,
        now: DateTime<Utc>,
        simulate: bool,
    ) -> Result<RunSummary, ShutdownError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let limit = self.config.run_timeout();

        info!(
            "Starting auto-shutdown run {} at {} UTC{}",
            run_id,
            now.format("%Y-%m-%d %H:%M:%S"),
            if simulate { " in SIMULATION mode (no power actions will be taken)" } else { "" }
        );

        let mut stats = RunStats::default();
        let mut failures: Vec<String> = Vec::new();

        let result = match timeout(
            limit,
            self.reconcile_fleet(now, simulate, &mut stats, &mut failures),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ShutdownError::DeadlineExceeded { limit }),
        };

        match &result {
            Ok(()) if !failures.is_empty() => {
                let message = format!(
                    "Auto-shutdown run {} finished with {} machine failure(s):\n{}",
                    run_id,
                    failures.len(),
                    failures.join("\n")
                );
                self.notify(&message).await;
            }
            Ok(()) => {}
            Err(e) => {
                error!("Auto-shutdown run {} failed: {}", run_id, e);
                let mut message = format!("Auto-shutdown run {} failed: {}", run_id, e);
                if !failures.is_empty() {
                    message.push_str(&format!("\nMachine failures before abort:\n{}", failures.join("\n")));
                }
                self.notify(&message).await;
            }
        }

        let summary = RunSummary {
            run_id,
            started_at: now,
            elapsed: started.elapsed(),
            simulate,
            stats,
        };
        log_summary(&summary);

        result.map(|()| summary)
    }

    async fn reconcile_fleet(
        &self,
        now: DateTime<Utc>,
        simulate: bool,
        stats: &mut RunStats,
        failures: &mut Vec<String>,
    ) -> Result<(), ShutdownError> {
        let tag_key = self.config.tag_name.as_str();
        let inventory = self.control_plane.inventory();

        let mut machines = inventory
            .list_virtual_machines()
            .await
            .map_err(ShutdownError::Inventory)?;
        let groups = inventory
            .list_tagged_resource_groups(tag_key)
            .await
            .map_err(ShutdownError::Inventory)?;

        let listed = machines.len();
        machines.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        machines.dedup_by(|a, b| a.id.eq_ignore_ascii_case(&b.id));
        if machines.len() < listed {
            warn!(
                "Inventory listed {} duplicate machine entries, processing each once",
                listed - machines.len()
            );
        }

        let group_schedules = group_schedule_index(&groups, tag_key);
        info!(
            "Found {} VMs and {} resource groups tagged '{}'",
            machines.len(),
            group_schedules.len(),
            tag_key
        );

        let reconciler = PowerStateReconciler::new(simulate);
        let mut outcomes = pin!(stream::iter(machines.iter().map(|vm| {
            let reconciler = &reconciler;
            let group_schedules = &group_schedules;
            async move {
                let outcome = self.process_machine(vm, group_schedules, reconciler, now).await;
                (vm, outcome)
            }
        }))
        .buffered(self.config.max_concurrent_machines.max(1)));

        while let Some((vm, outcome)) = outcomes.next().await {
            stats.record(&outcome);
            if let MachineOutcome::Errored(e) = &outcome {
                failures.push(format!(
                    "{} ({}): {} [{}]",
                    vm.name,
                    vm.resource_group,
                    e,
                    e.class()
                ));
            }
        }

        Ok(())
    }

    #[instrument(skip_all, fields(vm = %vm.name, resource_group = %vm.resource_group))]
    async fn process_machine(
        &self,
        vm: &VirtualMachine,
        group_schedules: &HashMap<String, String>,
        reconciler: &PowerStateReconciler,
        now: DateTime<Utc>,
    ) -> MachineOutcome {
        let tag_key = self.config.tag_name.as_str();
        let Some(effective) = resolve_effective_schedule(vm, group_schedules, tag_key) else {
            info!("No {} tag on VM or resource group, skipping", tag_key);
            return MachineOutcome::Skipped(SkipReason::NoSchedule);
        };

        match &effective.source {
            ScheduleSource::Direct => info!("Found direct schedule tag: '{}'", effective.tag_value),
            ScheduleSource::ResourceGroup(group) => info!(
                "Found schedule tag inherited from resource group {}: '{}'",
                group, effective.tag_value
            ),
        }

        let parsed = schedule::parse(effective.tag_value);
        for segment_error in &parsed.errors {
            warn!("Ignoring malformed schedule segment: {}", segment_error);
        }

        let matched = if parsed.is_unusable() {
            warn!(
                "Schedule '{}' has no usable rules, treating as no shutdown window",
                effective.tag_value
            );
            None
        } else {
            schedule::first_match(&parsed.rules, now)
        };

        match matched {
            Some(rule) => info!("Current time falls within scheduled shutdown range '{}'", rule),
            None => info!("Current time is outside all scheduled shutdown ranges"),
        }
        let desired = DesiredPowerState::from_verdict(matched.is_some());

        let Some(kind) = vm.kind() else {
            warn!(
                "Unrecognized resource type '{}', skipping",
                vm.resource_type
            );
            return MachineOutcome::Skipped(SkipReason::UnsupportedResourceType);
        };
        let Some(control) = self.control_plane.power_control(kind) else {
            warn!("No power control registered for {} VMs, skipping", kind);
            return MachineOutcome::Skipped(SkipReason::UnsupportedResourceType);
        };

        let observed = match control.power_state(vm).await {
            Ok(state) => state,
            Err(e) => {
                error!("Failed to read power state ({}): {}", e.class(), e);
                return MachineOutcome::Errored(e);
            }
        };

        match reconciler
            .reconcile(vm, control.as_ref(), desired, observed)
            .await
        {
            Ok(action) => MachineOutcome::Reconciled(action),
            Err(e) => {
                error!("Failed to apply {} ({}): {}", desired, e.class(), e);
                MachineOutcome::Errored(e)
            }
        }
    }

    async fn notify(&self, message: &str) {
        if let Err(e) = self.notifier.notify_failure(message).await {
            warn!(
                "Failed to deliver failure notification via {}: {}",
                self.notifier.channel_name(),
                e
            );
        }
    }
}

fn log_summary(summary: &RunSummary) {
    let stats = &summary.stats;
    info!(
        "Run {} finished in {:.1}s{}: processed={} started={} stopped={} skipped={} errored={}",
        summary.run_id,
        summary.elapsed.as_secs_f64(),
        if summary.simulate { " (simulated)" } else { "" },
        stats.processed,
        stats.started,
        stats.stopped,
        stats.skipped,
        stats.errored
    );
}
