//! Configuration for the fleet agent.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use fleetd_membership::FleetDescriptor;

/// Bearer token forwarded to the fleet API. Redacted in debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(<redacted>)")
    }
}

/// Fleet agent configuration (env-driven).
#[derive(Debug, Clone)]
pub struct Config {
    /// Fleet API base URL (example: http://127.0.0.1:8080).
    pub api_url: String,

    /// Subscription that owns the fleets.
    pub subscription_id: String,

    /// Resource group that owns the fleets.
    pub resource_group: String,

    /// Optional bearer token.
    pub api_token: Option<ApiToken>,

    /// Fleets to register, in order.
    pub fleets: Vec<FleetDescriptor>,

    /// Interval between scheduled cache rebuilds.
    pub refresh_interval: Duration,

    /// Per-request timeout for fleet API calls.
    pub request_timeout: Duration,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url =
            lookup("FLEETD_API_URL").unwrap_or_else(|| "http://127.0.0.1:8080".to_string());

        let subscription_id = lookup("FLEETD_SUBSCRIPTION_ID")
            .filter(|v| !v.trim().is_empty())
            .context("Missing subscription id. Set FLEETD_SUBSCRIPTION_ID.")?;

        let resource_group = lookup("FLEETD_RESOURCE_GROUP")
            .filter(|v| !v.trim().is_empty())
            .context("Missing resource group. Set FLEETD_RESOURCE_GROUP.")?;

        let api_token = lookup("FLEETD_API_TOKEN")
            .filter(|v| !v.trim().is_empty())
            .map(ApiToken::new);

        let fleets_raw = lookup("FLEETD_FLEETS")
            .context("Missing fleets. Set FLEETD_FLEETS to comma-separated min:max:name specs.")?;
        let fleets = parse_fleet_specs(&fleets_raw)?;

        let refresh_interval_secs: u64 = lookup("FLEETD_REFRESH_INTERVAL_SECS")
            .map(|v| v.parse())
            .transpose()
            .context("FLEETD_REFRESH_INTERVAL_SECS must be an integer (seconds).")?
            .unwrap_or(3600);
        let refresh_interval = Duration::from_secs(refresh_interval_secs.max(1));

        let request_timeout_secs: u64 = lookup("FLEETD_REQUEST_TIMEOUT_SECS")
            .map(|v| v.parse())
            .transpose()
            .context("FLEETD_REQUEST_TIMEOUT_SECS must be an integer (seconds).")?
            .unwrap_or(30);
        let request_timeout = Duration::from_secs(request_timeout_secs.max(1));

        let log_level = lookup("FLEETD_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            api_url,
            subscription_id,
            resource_group,
            api_token,
            fleets,
            refresh_interval,
            request_timeout,
            log_level,
        })
    }
}

/// Parse one `min:max:name` fleet spec.
pub fn parse_fleet_spec(spec: &str) -> Result<FleetDescriptor> {
    let mut parts = spec.trim().splitn(3, ':');
    let (Some(min), Some(max), Some(name)) = (parts.next(), parts.next(), parts.next()) else {
        anyhow::bail!("Invalid fleet spec '{spec}': expected min:max:name");
    };

    let min: i64 = min
        .trim()
        .parse()
        .with_context(|| format!("Invalid min size in fleet spec '{spec}'"))?;
    let max: i64 = max
        .trim()
        .parse()
        .with_context(|| format!("Invalid max size in fleet spec '{spec}'"))?;
    let name = name.trim();

    if name.is_empty() {
        anyhow::bail!("Invalid fleet spec '{spec}': name cannot be empty");
    }
    if min < 0 || min > max {
        anyhow::bail!("Invalid fleet spec '{spec}': sizes must satisfy 0 <= min <= max");
    }

    Ok(FleetDescriptor::new(name, min, max))
}

/// Parse a comma-separated list of fleet specs. At least one is required.
pub fn parse_fleet_specs(raw: &str) -> Result<Vec<FleetDescriptor>> {
    let fleets = raw
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(parse_fleet_spec)
        .collect::<Result<Vec<_>>>()?;

    if fleets.is_empty() {
        anyhow::bail!("FLEETD_FLEETS must name at least one fleet");
    }
    Ok(fleets)
}
