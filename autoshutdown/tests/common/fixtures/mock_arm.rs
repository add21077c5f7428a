//! Mock resource manager endpoint
//!
//! Serves inventory listings, instance views and power actions so the real
//! `ArmClient` and power controls can be exercised over HTTP.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use autoshutdown::cloud::arm::{AccessToken, ArmClient};
use autoshutdown::cloud::VirtualMachine;

use super::test_data::SUBSCRIPTION;

pub const TEST_TOKEN: &str = "test-token";

pub struct MockArmServer {
    pub server: MockServer,
    pub base_url: String,
}

impl MockArmServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    pub fn client(&self) -> Arc<ArmClient> {
        self.client_with_timeout(Duration::from_secs(5))
    }

    pub fn client_with_timeout(&self, request_timeout: Duration) -> Arc<ArmClient> {
        client_for(&self.base_url, request_timeout)
    }

    fn resources_path() -> String {
        format!("/subscriptions/{}/resources", SUBSCRIPTION)
    }

    fn groups_path() -> String {
        format!("/subscriptions/{}/resourcegroups", SUBSCRIPTION)
    }

    /// One resource listing entry in the shape the endpoint returns
    pub fn resource_json(vm: &VirtualMachine) -> Value {
        json!({
            "id": vm.id,
            "name": vm.name,
            "type": vm.resource_type,
            "location": "westeurope",
            "tags": vm.tags,
        })
    }

    /// Listing served in two pages joined by `nextLink`
    pub async fn mock_vm_listing_paged(&self, first: &[VirtualMachine], second: &[VirtualMachine]) {
        let next_link = format!("{}/page2", self.base_url);
        Mock::given(method("GET"))
            .and(path(Self::resources_path()))
            .and(header("authorization", format!("Bearer {}", TEST_TOKEN).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": first.iter().map(Self::resource_json).collect::<Vec<_>>(),
                "nextLink": next_link,
            })))
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path("/page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": second.iter().map(Self::resource_json).collect::<Vec<_>>(),
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_vm_listing(&self, machines: &[VirtualMachine]) {
        Mock::given(method("GET"))
            .and(path(Self::resources_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": machines.iter().map(Self::resource_json).collect::<Vec<_>>(),
            })))
            .mount(&self.server)
            .await;
    }

    /// Listing that only answers after `delay`
    pub async fn mock_vm_listing_delayed(&self, machines: &[VirtualMachine], delay: Duration) {
        Mock::given(method("GET"))
            .and(path(Self::resources_path()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "value": machines.iter().map(Self::resource_json).collect::<Vec<_>>(),
                    }))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn mock_vm_listing_status(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path(Self::resources_path()))
            .respond_with(ResponseTemplate::new(status).set_body_string("listing refused"))
            .mount(&self.server)
            .await;
    }

    /// `groups` is a list of (name, optional schedule tag)
    pub async fn mock_resource_groups(&self, groups: &[(&str, Option<&str>)]) {
        let value: Vec<Value> = groups
            .iter()
            .map(|(name, schedule)| match schedule {
                Some(schedule) => json!({ "name": name, "tags": { "AutoShutdownSchedule": schedule } }),
                None => json!({ "name": name }),
            })
            .collect();

        Mock::given(method("GET"))
            .and(path(Self::groups_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": value })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_instance_view(&self, vm: &VirtualMachine, power_code: &str) {
        Mock::given(method("GET"))
            .and(path(format!("{}/instanceView", vm.id)))
            .and(query_param("api-version", "2023-03-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "statuses": [
                    { "code": "ProvisioningState/succeeded" },
                    { "code": power_code },
                ]
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_classic_status(&self, vm: &VirtualMachine, status: &str) {
        Mock::given(method("GET"))
            .and(path(vm.id.clone()))
            .and(query_param("api-version", "2017-04-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": vm.id,
                "name": vm.name,
                "properties": { "instanceView": { "status": status } }
            })))
            .mount(&self.server)
            .await;
    }

    /// POST `{vm.id}/{action}` answers with `status`
    pub async fn mock_action(&self, vm: &VirtualMachine, action: &str, status: u16) {
        Mock::given(method("POST"))
            .and(path(format!("{}/{}", vm.id, action)))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Paths of every POST received so far
    pub async fn posted_paths(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|req| req.method.as_str() == "POST")
            .map(|req| req.url.path().to_string())
            .collect()
    }
}

pub fn client_for(base_url: &str, request_timeout: Duration) -> Arc<ArmClient> {
    Arc::new(
        ArmClient::new(
            base_url,
            SUBSCRIPTION,
            AccessToken::new(TEST_TOKEN),
            request_timeout,
        )
        .expect("client builds"),
    )
}

/// Base URL of a mock server that has already shut down, so connections are refused
pub async fn closed_endpoint() -> String {
    // wiremock pools its servers, so dropping a `MockServer` keeps the port
    // listening; bind and release a plain listener instead.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}
