//! Change relay
//!
//! Sends a locally-initiated flag change to a binding's action endpoint
//! and reports success or failure back to the caller. One request, one
//! definitive result; retries are a policy decision left to callers.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{RelayError, RelayResult};
use crate::flag::FlagValue;
use crate::registry::Binding;

/// Request timeout in seconds
const RELAY_TIMEOUT: u64 = 10;

const USER_AGENT: &str = concat!("flip/", env!("CARGO_PKG_VERSION"));

/// Acknowledgement of a successfully relayed change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ack {
    /// Confirmation message from the endpoint, when it sends one
    pub message: Option<String>,
}

/// Transport for locally-initiated flag changes
#[async_trait]
pub trait ChangeRelay: Send + Sync {
    /// Relay one desired value for one binding
    ///
    /// Picks the enable or disable endpoint from the binding by the
    /// desired value's truthiness and issues a single request. Non-2xx
    /// responses map to `RelayError::Upstream`, transport failures to
    /// `RelayError::Unreachable`.
    async fn send(&self, binding: &Binding, desired: &FlagValue) -> RelayResult<Ack>;
}

/// HTTP-backed change relay
#[derive(Debug, Clone)]
pub struct HttpRelay {
    client: reqwest::Client,
}

impl HttpRelay {
    /// Create a relay with the standard client (timeout + user agent)
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(RELAY_TIMEOUT))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build relay HTTP client")?;
        Ok(Self { client })
    }

    /// Create a relay over an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChangeRelay for HttpRelay {
    async fn send(&self, binding: &Binding, desired: &FlagValue) -> RelayResult<Ack> {
        let url = binding.endpoint_for(desired);
        let body = toggle_payload(&binding.flag, desired);
        debug!(flag = %binding.flag, %url, "relaying flag change");

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|source| RelayError::Unreachable { source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Upstream {
                status: status.as_u16(),
            });
        }

        Ok(ack_from_body(response.json::<Value>().await.ok()))
    }
}

/// Request body for a relayed change
///
/// Boolean flags travel as `{flag, isAvailable}` (the relay server's wire
/// contract); other variations as `{flag, value}`.
fn toggle_payload(flag: &str, desired: &FlagValue) -> Value {
    match desired.as_bool() {
        Some(is_available) => json!({ "flag": flag, "isAvailable": is_available }),
        None => json!({ "flag": flag, "value": desired }),
    }
}

/// Pull a confirmation message out of a response body, if there is one
fn ack_from_body(body: Option<Value>) -> Ack {
    let message = body
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string);
    Ack { message }
}
