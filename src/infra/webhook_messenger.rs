//! HTTP messaging gateway client.
//!
//! The WhatsApp session (login, QR pairing, reconnects) lives in an external
//! gateway; this adapter only posts `{ "to", "text" }` to it.

use crate::app::ports::MessagingPort;
use crate::error::DispatchError;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    to: &'a str,
    text: &'a str,
}

pub struct WebhookMessenger {
    endpoint: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl WebhookMessenger {
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            token,
            client,
        })
    }
}

#[async_trait]
impl MessagingPort for WebhookMessenger {
    async fn send_text(&self, channel: &str, text: &str) -> Result<(), DispatchError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&OutboundMessage { to: channel, text });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                endpoint = %self.endpoint,
                %status,
                body = %body,
                "messaging gateway returned non-2xx status"
            );
            return Err(DispatchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(endpoint = %self.endpoint, %status, "message delivered to gateway");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}
