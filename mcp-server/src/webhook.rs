//! Webhook delivery: resolves the target URL and performs the HTTP POST.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config;

/// Environment variable carrying the webhook target URL. Takes precedence
/// over the value supplied by the config file.
pub(crate) const WEBHOOK_URL_ENV_VAR: &str = "WEBHOOK_URL";

pub(crate) const URL_NOT_CONFIGURED_ERROR: &str =
    "WEBHOOK_URL not configured in environment variables";

/// Outcome of a single webhook invocation. Any HTTP response counts as a
/// delivery, whatever its status code; only a missing URL or a transport
/// failure produces the error shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WebhookResult {
    Delivered {
        status_code: u16,
        headers: HashMap<String, String>,
        content: Value,
    },
    Failed {
        error: String,
    },
}

/// Where the sender gets its target URL from. Injected so tests can run
/// without touching the real process environment or filesystem.
pub(crate) type UrlResolver = Box<dyn Fn() -> Option<String> + Send + Sync>;

pub(crate) fn default_url_resolver() -> UrlResolver {
    Box::new(|| {
        url_from_sources(
            std::env::var(WEBHOOK_URL_ENV_VAR).ok(),
            config::load_configured_env(),
        )
    })
}

fn url_from_sources(
    env_value: Option<String>,
    configured: HashMap<String, String>,
) -> Option<String> {
    env_value
        .filter(|v| !v.is_empty())
        .or_else(|| configured.get(WEBHOOK_URL_ENV_VAR).cloned())
}

pub(crate) struct WebhookSender {
    client: reqwest::Client,
    resolve_url: UrlResolver,
}

impl WebhookSender {
    pub(crate) fn new() -> Self {
        Self::with_url_resolver(default_url_resolver())
    }

    pub(crate) fn with_url_resolver(resolve_url: UrlResolver) -> Self {
        Self {
            client: reqwest::Client::new(),
            resolve_url,
        }
    }

    /// POST `payload` as the JSON body to the resolved URL. Returns an error
    /// value without touching the network when no URL is configured.
    pub(crate) async fn send(&self, payload: Value) -> WebhookResult {
        let Some(url) = (self.resolve_url)() else {
            return WebhookResult::Failed {
                error: URL_NOT_CONFIGURED_ERROR.to_string(),
            };
        };

        debug!("POST {url}");
        let response = match self.client.post(&url).json(&payload).send().await {
            Ok(response) => response,
            Err(e) => {
                return WebhookResult::Failed {
                    error: format!("Error sending webhook: {e}"),
                };
            }
        };

        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).to_string(),
                )
            })
            .collect();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                return WebhookResult::Failed {
                    error: format!("Error sending webhook: {e}"),
                };
            }
        };
        // Webhook targets usually answer JSON; fall back to the raw body.
        let content = serde_json::from_str(&text).unwrap_or(Value::String(text));

        WebhookResult::Delivered {
            status_code,
            headers,
            content,
        }
    }
}
