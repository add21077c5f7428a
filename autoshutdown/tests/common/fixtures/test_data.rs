//! Common test data and constants

use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;

use autoshutdown::cloud::{ResourceGroup, VirtualMachine};
use autoshutdown::constants::{resource_types, tags};

pub const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000001";

/// Common resource group names
pub mod groups {
    pub const WEB: &str = "web-rg";
    pub const DATA: &str = "data-rg";
    pub const LEGACY: &str = "legacy-rg";
}

/// Common schedule tag values
pub mod schedules {
    pub const WEEKEND: &str = "Saturday, Sunday";
    pub const NIGHTLY: &str = "Monday 10PM -> 5AM, Tuesday 10PM -> 5AM";
    pub const WEEKEND_NIGHTS: &str = "Saturday, Sunday, 10PM -> 5AM";
    pub const CHRISTMAS: &str = "December 25";
    pub const GARBAGE: &str = "whenever, sometime";
}

/// 2026-10-12 is a Monday; the week runs through Sunday 2026-10-18
pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid test timestamp")
}

pub fn monday(hour: u32) -> DateTime<Utc> {
    at(2026, 10, 12, hour, 0)
}

pub fn saturday(hour: u32) -> DateTime<Utc> {
    at(2026, 10, 17, hour, 0)
}

pub fn vm_id(group: &str, provider_type: &str, name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/{}/{}",
        SUBSCRIPTION, group, provider_type, name
    )
}

fn machine(name: &str, group: &str, resource_type: &str, schedule: Option<&str>) -> VirtualMachine {
    let mut tag_map = HashMap::new();
    if let Some(value) = schedule {
        tag_map.insert(tags::SCHEDULE_TAG.to_string(), value.to_string());
    }
    VirtualMachine {
        id: vm_id(group, resource_type, name),
        name: name.to_string(),
        resource_group: group.to_string(),
        resource_type: resource_type.to_string(),
        tags: tag_map,
    }
}

pub fn compute_vm(name: &str, group: &str, schedule: Option<&str>) -> VirtualMachine {
    machine(name, group, resource_types::COMPUTE_VM, schedule)
}

pub fn classic_vm(name: &str, group: &str, schedule: Option<&str>) -> VirtualMachine {
    machine(name, group, resource_types::CLASSIC_VM, schedule)
}

pub fn scale_set_vm(name: &str, group: &str, schedule: Option<&str>) -> VirtualMachine {
    machine(
        name,
        group,
        "Microsoft.Compute/virtualMachineScaleSets/virtualMachines",
        schedule,
    )
}

pub fn tagged_group(name: &str, schedule: &str) -> ResourceGroup {
    ResourceGroup {
        name: name.to_string(),
        tags: HashMap::from([(tags::SCHEDULE_TAG.to_string(), schedule.to_string())]),
    }
}
