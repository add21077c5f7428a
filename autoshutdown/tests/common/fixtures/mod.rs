//! This module provides reusable test utilities:
//! - An in-memory cloud (inventory + power control) that records calls
//! - A mock resource manager endpoint and a mock webhook
//! - Test configuration builders
//! - Common test data

// Not every test binary uses every fixture
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fake_cloud;
pub mod mock_arm;
pub mod recording_notifier;
pub mod test_config;
pub mod test_data;

pub use fake_cloud::{FakeCloud, PowerCall};
pub use mock_arm::{client_for, closed_endpoint, MockArmServer};
pub use mock_webhook::MockWebhookServer;
pub use recording_notifier::RecordingNotifier;
pub use test_config::TestConfigBuilder;
pub use test_data::*;
