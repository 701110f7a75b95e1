//! Outbound verdict callback.
//!
//! When enabled, the JSON verdict is POSTed to a webhook endpoint with the
//! scan's correlation id in the `X-Malice-ID` header.

use crate::core::WebhookError;

use std::time::Duration;

/// Header carrying the correlation id.
pub const CORRELATION_HEADER: &str = "X-Malice-ID";

/// Posts verdicts to a webhook endpoint, optionally through a proxy.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    endpoint: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Creates a notifier for `endpoint`, routing through `proxy` when given.
    pub fn new(endpoint: impl Into<String>, proxy: Option<&str>) -> Result<Self, WebhookError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(WebhookError::MissingEndpoint);
        }

        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(30));
        if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            endpoint,
            client: builder.build()?,
        })
    }

    /// Returns the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends the rendered JSON verdict and returns the response body.
    pub async fn notify(&self, correlation_id: &str, json: String) -> Result<String, WebhookError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(CORRELATION_HEADER, correlation_id)
            .body(json)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(WebhookError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(
            endpoint = %self.endpoint,
            id = %correlation_id,
            status = status.as_u16(),
            response = %body.trim(),
            "Verdict posted to webhook"
        );
        Ok(body)
    }
}
