//! HTTP client for the remote fleet API.
//!
//! Implements [`FleetApi`] over JSON:
//! - `GET  .../fleets/{name}` describes a fleet
//! - `GET  .../fleets/{name}/members` lists its members
//! - `PUT  .../fleets/{name}` submits a full update
//! - `POST .../fleets/{name}/deleteMembers` deletes a batch of members
//!
//! Every request and response is logged at debug level. Failures are never
//! retried here.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use fleetd_membership::{FleetApi, FleetDescription, FleetMember};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;

/// Fleet resource as exchanged with the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FleetResource {
    name: String,
    sku: Sku,
    #[serde(default)]
    properties: FleetProperties,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Sku {
    capacity: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FleetProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provisioning_state: Option<String>,
}

impl From<FleetResource> for FleetDescription {
    fn from(resource: FleetResource) -> Self {
        Self {
            name: resource.name,
            capacity: resource.sku.capacity,
            provisioning_state: resource.properties.provisioning_state,
            metadata: resource.tags,
        }
    }
}

impl From<&FleetDescription> for FleetResource {
    fn from(fleet: &FleetDescription) -> Self {
        Self {
            name: fleet.name.clone(),
            sku: Sku {
                capacity: fleet.capacity,
            },
            properties: FleetProperties {
                provisioning_state: fleet.provisioning_state.clone(),
            },
            tags: fleet.metadata.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MemberList {
    value: Vec<MemberResource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberResource {
    id: String,
    instance_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteMembersRequest<'a> {
    instance_ids: &'a [String],
}

/// Fleet API client.
#[derive(Debug, Clone)]
pub struct HttpFleetApi {
    client: reqwest::Client,
    fleets_url: Url,
}

impl HttpFleetApi {
    /// Create a client scoped to the configured subscription and resource group.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.api_token {
            let raw = token.expose().trim();
            let bearer = if raw.starts_with("Bearer ") || raw.starts_with("bearer ") {
                raw.to_string()
            } else {
                format!("Bearer {raw}")
            };

            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&bearer).context("Invalid fleet API token format")?,
            );
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("fleetd-agent/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let mut fleets_url = Url::parse(&config.api_url)
            .with_context(|| format!("Invalid fleet API URL '{}'", config.api_url))?;
        fleets_url
            .path_segments_mut()
            .map_err(|()| anyhow::anyhow!("Fleet API URL '{}' cannot be a base", config.api_url))?
            .pop_if_empty()
            .extend([
                "subscriptions",
                config.subscription_id.as_str(),
                "resourceGroups",
                config.resource_group.as_str(),
                "fleets",
            ]);

        Ok(Self { client, fleets_url })
    }

    /// URL of a fleet resource, with `name` and `suffix` percent-encoded as path segments.
    fn fleet_url(&self, name: &str, suffix: &[&str]) -> Result<Url> {
        let mut url = self.fleets_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("Fleet API URL '{}' cannot be a base", self.fleets_url))?
            .push(name)
            .extend(suffix);
        Ok(url)
    }

    /// Send a request, logging it and its response, and fail on non-2xx.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let request = request.build().context("Failed to build fleet API request")?;
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(method = %method, url = %url, "Inspecting request");

        let response = self
            .client
            .execute(request)
            .await
            .with_context(|| format!("{method} {url} failed"))?;

        let status = response.status();
        debug!(status = %status, method = %method, url = %url, "Inspecting response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{method} {url} failed (status={status}): {body}");
        }

        Ok(response)
    }
}

#[async_trait]
impl FleetApi for HttpFleetApi {
    async fn describe_fleet(&self, name: &str) -> Result<FleetDescription> {
        let response = self.execute(self.client.get(self.fleet_url(name, &[])?)).await?;
        let resource: FleetResource = response
            .json()
            .await
            .context("Invalid fleet response JSON")?;
        Ok(resource.into())
    }

    async fn list_members(&self, name: &str) -> Result<Vec<FleetMember>> {
        let url = self.fleet_url(name, &["members"])?;
        let response = self.execute(self.client.get(url)).await?;
        let list: MemberList = response
            .json()
            .await
            .context("Invalid fleet member list JSON")?;

        Ok(list
            .value
            .into_iter()
            .map(|m| FleetMember {
                instance_id: m.instance_id,
                remote_id: m.id,
            })
            .collect())
    }

    async fn update_fleet(&self, name: &str, fleet: &FleetDescription) -> Result<()> {
        let body = FleetResource::from(fleet);
        self.execute(self.client.put(self.fleet_url(name, &[])?).json(&body))
            .await?;
        Ok(())
    }

    async fn delete_members(&self, name: &str, instance_ids: &[String]) -> Result<()> {
        let url = self.fleet_url(name, &["deleteMembers"])?;
        let body = DeleteMembersRequest { instance_ids };
        self.execute(self.client.post(url).json(&body)).await?;
        Ok(())
    }
}
