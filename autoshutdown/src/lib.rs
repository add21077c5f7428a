pub mod cloud;
pub mod config;
pub mod constants;
pub mod errors;
pub mod notify;
pub mod orchestrator;
pub mod reconciler;
pub mod schedule;

// Re-export commonly used types
pub use cloud::{ControlPlane, Inventory, PowerControl, VirtualMachine};
pub use config::{Config, ConfigManager};
pub use errors::{ConfigError, ControlApiError, ShutdownError};
pub use notify::NotificationSink;
pub use orchestrator::{FleetOrchestrator, RunStats, RunSummary};
pub use reconciler::{DesiredPowerState, PowerStateReconciler, ReconcileAction};
