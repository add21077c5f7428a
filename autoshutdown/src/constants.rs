//! Central repository for tag names, API versions, timeouts and defaults
//!
//! Constants are grouped by concern so that the orchestrator, the cloud client
//! and the configuration layer agree on a single source of truth.

use std::time::Duration;

/// Schedule tag constants
pub mod tags {
    /// Tag carrying the weekly shutdown schedule on a VM or resource group
    pub const SCHEDULE_TAG: &str = "AutoShutdownSchedule";
}

/// Resource type discriminators returned by the inventory listing
pub mod resource_types {
    /// Current-generation virtual machines
    pub const COMPUTE_VM: &str = "Microsoft.Compute/virtualMachines";

    /// Legacy classic virtual machines
    pub const CLASSIC_VM: &str = "Microsoft.ClassicCompute/virtualMachines";
}

/// Resource manager API versions per resource family
pub mod api_versions {
    /// Generic resource and resource group listing
    pub const RESOURCES: &str = "2021-04-01";

    /// Microsoft.Compute virtual machine operations
    pub const COMPUTE: &str = "2023-03-01";

    /// Microsoft.ClassicCompute virtual machine operations
    pub const CLASSIC_COMPUTE: &str = "2017-04-01";
}

/// HTTP client constants
pub mod http {
    use super::Duration;

    /// Timeout for establishing connections to the management endpoint
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Webhook delivery timeout
    pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);
}

/// Default configuration values
pub mod defaults {
    /// Resource manager endpoint
    pub const MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

    /// Per-request timeout against the management endpoint
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 60;

    /// Overall deadline for a single run (an hourly trigger leaves headroom)
    pub const RUN_TIMEOUT_SECONDS: u64 = 3000;

    /// Machines reconciled concurrently
    pub const MAX_CONCURRENT_MACHINES: usize = 1;

    /// Default SMTP submission port
    pub const SMTP_PORT: u16 = 587;

    /// Configuration directory used when none is given on the command line
    pub const CONFIG_DIR: &str = "config";
}

/// Environment variable overrides
pub mod env {
    pub const ACCESS_TOKEN: &str = "AUTOSHUTDOWN_ACCESS_TOKEN";
    pub const SUBSCRIPTION_ID: &str = "AUTOSHUTDOWN_SUBSCRIPTION_ID";
    pub const SIMULATE: &str = "AUTOSHUTDOWN_SIMULATE";
    pub const SMTP_USERNAME: &str = "SMTP_USERNAME";
    pub const SMTP_PASSWORD: &str = "SMTP_PASSWORD";
}
