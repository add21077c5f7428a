//! HTTP client for the cloud resource manager REST API
//!
//! Authentication happens outside this crate: the client is handed an opaque
//! bearer token and a subscription id. List endpoints are paged through
//! `nextLink`; power actions are fire-and-accept (`200`/`202`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use super::{Inventory, ResourceGroup, VirtualMachine};
use crate::constants::{api_versions, http, resource_types};
use crate::errors::ControlApiError;

/// Bearer token that never shows up in logs
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(***)")
    }
}

pub struct ArmClient {
    client: Client,
    endpoint: String,
    subscription_id: String,
    token: AccessToken,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenericResource {
    id: String,
    name: String,
    #[serde(rename = "type")]
    resource_type: String,
    #[serde(default)]
    tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct ResourceGroupResource {
    name: String,
    #[serde(default)]
    tags: Option<HashMap<String, String>>,
}

impl ArmClient {
    pub fn new(
        endpoint: &str,
        subscription_id: &str,
        token: AccessToken,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(http::CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .context("Failed to create HTTP client for resource manager")?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            subscription_id: subscription_id.to_string(),
            token,
        })
    }

    /// URL for a resource id (which starts with `/subscriptions/...`) plus an optional action
    pub(crate) fn resource_url(
        &self,
        resource_id: &str,
        action: Option<&str>,
        api_version: &str,
    ) -> Result<Url, ControlApiError> {
        let mut raw = format!("{}{}", self.endpoint, resource_id);
        if let Some(action) = action {
            raw.push('/');
            raw.push_str(action);
        }
        Url::parse_with_params(&raw, &[("api-version", api_version)])
            .map_err(|e| ControlApiError::permanent("build url", resource_id, e.to_string()))
    }

    fn subscription_url(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, ControlApiError> {
        let raw = format!(
            "{}/subscriptions/{}/{}",
            self.endpoint, self.subscription_id, path
        );
        Url::parse_with_params(&raw, params)
            .map_err(|e| ControlApiError::permanent("build url", &self.subscription_id, e.to_string()))
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        target: &str,
        url: Url,
    ) -> Result<T, ControlApiError> {
        debug!("GET {} ({})", url.path(), operation);
        let response = self
            .client
            .get(url)
            .bearer_auth(self.token.secret())
            .send()
            .await
            .map_err(|e| classify_transport_error(operation, target, e))?;

        let response = check_status(operation, target, response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ControlApiError::decode(operation, target, e.to_string()))
    }

    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        operation: &str,
        first: Url,
    ) -> Result<Vec<T>, ControlApiError> {
        let mut items = Vec::new();
        let mut next = Some(first);

        while let Some(url) = next.take() {
            let page: Page<T> = self.get_json(operation, &self.subscription_id, url).await?;
            items.extend(page.value);
            next = match page.next_link {
                Some(link) => Some(Url::parse(&link).map_err(|e| {
                    ControlApiError::decode(operation, &self.subscription_id, e.to_string())
                })?),
                None => None,
            };
        }

        Ok(items)
    }

    /// POST an action on a resource; accepted asynchronous operations count as success
    pub(crate) async fn post_action(
        &self,
        operation: &str,
        target: &str,
        url: Url,
    ) -> Result<(), ControlApiError> {
        info!("POST {} ({})", url.path(), operation);
        let response = self
            .client
            .post(url)
            .bearer_auth(self.token.secret())
            .header(reqwest::header::CONTENT_LENGTH, "0")
            .send()
            .await
            .map_err(|e| classify_transport_error(operation, target, e))?;

        check_status(operation, target, response).await?;
        Ok(())
    }
}

#[async_trait]
impl Inventory for ArmClient {
    async fn list_virtual_machines(&self) -> Result<Vec<VirtualMachine>, ControlApiError> {
        let filter = format!(
            "resourceType eq '{}' or resourceType eq '{}'",
            resource_types::COMPUTE_VM,
            resource_types::CLASSIC_VM
        );
        let url = self.subscription_url(
            "resources",
            &[("$filter", filter.as_str()), ("api-version", api_versions::RESOURCES)],
        )?;

        let resources: Vec<GenericResource> = self.get_all_pages("list virtual machines", url).await?;
        let machines = resources
            .into_iter()
            .map(|r| VirtualMachine {
                resource_group: resource_group_from_id(&r.id).unwrap_or_default(),
                id: r.id,
                name: r.name,
                resource_type: r.resource_type,
                tags: r.tags.unwrap_or_default(),
            })
            .collect();

        Ok(machines)
    }

    async fn list_tagged_resource_groups(
        &self,
        tag_key: &str,
    ) -> Result<Vec<ResourceGroup>, ControlApiError> {
        let url = self.subscription_url("resourcegroups", &[("api-version", api_versions::RESOURCES)])?;
        let groups: Vec<ResourceGroupResource> =
            self.get_all_pages("list resource groups", url).await?;

        Ok(groups
            .into_iter()
            .map(|g| ResourceGroup {
                name: g.name,
                tags: g.tags.unwrap_or_default(),
            })
            .filter(|g| g.tag(tag_key).is_some())
            .collect())
    }
}

/// Extract the resource group segment from `/subscriptions/{s}/resourceGroups/{rg}/...`
pub fn resource_group_from_id(resource_id: &str) -> Option<String> {
    let mut segments = resource_id.split('/');
    while let Some(segment) = segments.next() {
        if segment.eq_ignore_ascii_case("resourceGroups") {
            return segments.next().map(str::to_string);
        }
    }
    None
}

async fn check_status(
    operation: &str,
    target: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ControlApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let reason = format!("status {}: {}", status, body.trim());
    if is_transient_status(status) {
        Err(ControlApiError::transient(operation, target, reason))
    } else {
        Err(ControlApiError::permanent(operation, target, reason))
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

fn classify_transport_error(operation: &str, target: &str, err: reqwest::Error) -> ControlApiError {
    if err.is_timeout() || err.is_connect() {
        ControlApiError::transient(operation, target, err.to_string())
    } else {
        ControlApiError::permanent(operation, target, err.to_string())
    }
}
