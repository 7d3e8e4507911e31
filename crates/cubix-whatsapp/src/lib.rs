//! Cubix WhatsApp Adapter
//!
//! Evolution API egress (sendText / sendMedia with base64 media) and the
//! outbound handler draining the event bus. The webhook ingress lives in
//! [`webhook`].

pub mod webhook;

use anyhow::{anyhow, Result};
use base64::Engine;
use cubix_config::EvolutionConfig;
use cubix_ipc::{OutboundBody, OutboundMessage};
use reqwest::{Client, ClientBuilder};
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Artificial delay the gateway applies before delivering, in milliseconds.
/// Paired with a "composing" presence for text so replies feel typed.
const SEND_DELAY_MS: u64 = 1200;

pub struct EvolutionClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    instance: String,
}

impl EvolutionClient {
    pub fn new(config: &EvolutionConfig) -> Self {
        Self {
            client: Self::build_client(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            instance: config.instance.clone(),
        }
    }

    fn build_client() -> Client {
        ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(600))
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Some(Duration::from_secs(30)))
            .timeout(Duration::from_secs(180))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client")
    }

    fn endpoint(&self, operation: &str) -> String {
        format!("{}/message/{}/{}", self.api_url, operation, self.instance)
    }

    pub fn build_text_payload(number: &str, text: &str) -> serde_json::Value {
        serde_json::json!({
            "number": number,
            "options": {
                "delay": SEND_DELAY_MS,
                "presence": "composing",
            },
            "textMessage": {
                "text": text,
            },
        })
    }

    pub fn build_media_payload(
        number: &str,
        media_base64: &str,
        caption: &str,
        file_name: &str,
    ) -> serde_json::Value {
        serde_json::json!({
            "number": number,
            "options": {
                "delay": SEND_DELAY_MS,
            },
            "mediaMessage": {
                "mediatype": "image",
                "media": media_base64,
                "caption": caption,
                "fileName": file_name,
            },
        })
    }

    pub async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        let payload = Self::build_text_payload(to, text);
        self.post(&self.endpoint("sendText"), payload).await
    }

    /// Reads the asset from disk, base64-encodes it, and sends it with the
    /// caption. The caller already verified the asset exists; a race with
    /// asset removal surfaces as a send error, not a crash.
    pub async fn send_image(&self, to: &str, asset_ref: &str, caption: &str) -> Result<()> {
        let bytes = tokio::fs::read(asset_ref)
            .await
            .map_err(|e| anyhow!("failed to read image {}: {}", asset_ref, e))?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        let file_name = Path::new(asset_ref)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("algorithm.png");

        let payload = Self::build_media_payload(to, &encoded, caption, file_name);
        self.post(&self.endpoint("sendMedia"), payload).await
    }

    async fn post(&self, url: &str, payload: serde_json::Value) -> Result<()> {
        let endpoint = url.rsplit('/').nth(1).unwrap_or("evolution");

        let mut request = self.client.post(url).json(&payload);
        if let Some(api_key) = &self.api_key {
            request = request.header("apikey", api_key);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| anyhow!("evolution {} request failed: {}", endpoint, e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("evolution {} HTTP {}: {}", endpoint, status, body));
        }

        Ok(())
    }

    /// Drains the outbound channel for the process lifetime. Delivery is
    /// best-effort: a failed send is logged and never retried, and the
    /// already-committed session transition stands.
    pub async fn run_outbound_handler(&self, mut receiver: broadcast::Receiver<OutboundMessage>) {
        info!("WhatsApp outbound handler started");

        loop {
            match receiver.recv().await {
                Ok(msg) => {
                    let send_result = match &msg.body {
                        OutboundBody::Text { text } => self.send_text(&msg.recipient, text).await,
                        OutboundBody::Image { asset_ref, caption } => {
                            self.send_image(&msg.recipient, asset_ref, caption).await
                        }
                    };

                    if let Err(e) = send_result {
                        warn!("Failed to send outbound message to {}: {}", msg.recipient, e);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("WhatsApp outbound handler stopped: channel closed");
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("WhatsApp outbound handler lagged; skipped {} messages", skipped);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_client() -> EvolutionClient {
        let config = EvolutionConfig {
            api_url: "https://evo.example.com/".to_string(),
            api_key: Some("secret".to_string()),
            instance: "cubebot".to_string(),
        };
        EvolutionClient::new(&config)
    }

    #[test]
    fn endpoint_includes_instance_and_trims_slash() {
        let client = make_client();
        assert_eq!(
            client.endpoint("sendText"),
            "https://evo.example.com/message/sendText/cubebot"
        );
        assert_eq!(
            client.endpoint("sendMedia"),
            "https://evo.example.com/message/sendMedia/cubebot"
        );
    }

    #[test]
    fn text_payload_shape() {
        let payload = EvolutionClient::build_text_payload("5511999990000", "oi");
        assert_eq!(payload["number"], "5511999990000");
        assert_eq!(payload["options"]["delay"], 1200);
        assert_eq!(payload["options"]["presence"], "composing");
        assert_eq!(payload["textMessage"]["text"], "oi");
    }

    #[test]
    fn media_payload_shape() {
        let payload =
            EvolutionClient::build_media_payload("5511999990000", "QUJD", "*Caso 5*", "F2L_Caso 5.png");
        assert_eq!(payload["mediaMessage"]["mediatype"], "image");
        assert_eq!(payload["mediaMessage"]["media"], "QUJD");
        assert_eq!(payload["mediaMessage"]["caption"], "*Caso 5*");
        assert_eq!(payload["mediaMessage"]["fileName"], "F2L_Caso 5.png");
        assert!(payload["options"].get("presence").is_none());
    }
}
