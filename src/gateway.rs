//! HTTP adapter for an SMS gateway speaking JSON.
//!
//! Posts `{"to", "message", "from"}` to `<base_url>/messages`. A JSON body with
//! an `error` field is treated as a rejection.

use serde::Deserialize;

use crate::error::GatewayError;
use crate::traits::{OutboundMessage, SmsGateway};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

impl GatewayConfig {
    /// Reads `DISPATCH_GATEWAY_URL`, `DISPATCH_GATEWAY_API_KEY` and
    /// `DISPATCH_GATEWAY_TIMEOUT_SECS`, keeping defaults for unset values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("DISPATCH_GATEWAY_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("DISPATCH_GATEWAY_API_KEY").ok(),
            timeout_secs: std::env::var("DISPATCH_GATEWAY_TIMEOUT_SECS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpGateway {
    config: GatewayConfig,
    client: reqwest::blocking::Client,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/messages", self.config.base_url.trim_end_matches('/'))
    }
}

impl SmsGateway for HttpGateway {
    fn send(&self, message: &OutboundMessage) -> Result<String, GatewayError> {
        let mut request = self.client.post(self.endpoint()).json(message);
        if let Some(key) = &self.config.api_key {
            request = request.header("apiKey", key);
        }

        let body = request
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<GatewayResponse>())?;

        match body.error {
            Some(error) => Err(GatewayError::Rejected(error)),
            None => Ok(body.status.unwrap_or_else(|| "Sent".to_string())),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GatewayResponse {
    status: Option<String>,
    error: Option<String>,
}
