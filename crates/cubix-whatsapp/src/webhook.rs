//! Evolution API webhook ingress
//!
//! Filters `messages.upsert` events down to (sender, text) pairs and
//! publishes them on the event bus. Everything else is acknowledged as
//! ignored with a reason tag, never surfaced to the sender.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use cubix_ipc::{Envelope, EventBus};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

const MESSAGES_UPSERT: &str = "messages.upsert";

#[derive(Debug, Default, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub data: WebhookData,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub messages: Vec<WebhookMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookMessage {
    #[serde(default)]
    pub key: MessageKey,
    #[serde(rename = "pushName")]
    pub push_name: Option<String>,
    pub message: Option<MessageContent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageKey {
    #[serde(rename = "remoteJid", default)]
    pub remote_jid: String,
    #[serde(rename = "fromMe", default)]
    pub from_me: bool,
}

/// Two mutually exclusive text shapes: plain conversation body or an
/// extended-text body.
#[derive(Debug, Default, Deserialize)]
pub struct MessageContent {
    pub conversation: Option<String>,
    #[serde(rename = "extendedTextMessage")]
    pub extended_text: Option<ExtendedText>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExtendedText {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotMessageUpsert,
    NoMessages,
    FromMe,
    NoTextContent,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            IgnoreReason::NotMessageUpsert => "not a message upsert event",
            IgnoreReason::NoMessages => "no messages",
            IgnoreReason::FromMe => "message from me",
            IgnoreReason::NoTextContent => "no text content",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub sender: String,
    pub push_name: Option<String>,
    pub text: String,
}

/// Classifies a webhook event, extracting the first message's sender and
/// trimmed text. Total: malformed shapes become ignore reasons.
pub fn extract_inbound(event: &WebhookEvent) -> Result<Inbound, IgnoreReason> {
    if event.event != MESSAGES_UPSERT {
        return Err(IgnoreReason::NotMessageUpsert);
    }

    let message = event
        .data
        .messages
        .first()
        .ok_or(IgnoreReason::NoMessages)?;

    if message.key.from_me {
        return Err(IgnoreReason::FromMe);
    }

    let text = message
        .message
        .as_ref()
        .and_then(|content| {
            content
                .conversation
                .clone()
                .or_else(|| content.extended_text.as_ref().and_then(|ext| ext.text.clone()))
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(IgnoreReason::NoTextContent);
    }

    let sender = message
        .key
        .remote_jid
        .split('@')
        .next()
        .unwrap_or_default()
        .to_string();

    Ok(Inbound {
        sender,
        push_name: message.push_name.clone(),
        text: text.trim().to_string(),
    })
}

pub struct WebhookState {
    pub bus: EventBus,
    pub dashboard_url: String,
}

pub fn router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/", get(handle_status))
        .route("/manager", get(handle_manager))
        .route("/manager/", get(handle_manager))
        .with_state(state)
}

pub async fn serve(bind: &str, state: Arc<WebhookState>) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Webhook server listening on http://{}", bind);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn handle_webhook(
    State(state): State<Arc<WebhookState>>,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            error!("Failed to parse webhook payload: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "message": e.to_string(),
                })),
            );
        }
    };

    let inbound = match extract_inbound(&event) {
        Ok(inbound) => inbound,
        Err(reason) => {
            return (
                StatusCode::OK,
                Json(serde_json::json!({
                    "status": "ignored",
                    "reason": reason.as_str(),
                })),
            );
        }
    };

    info!("Webhook message from {}: {}", inbound.sender, inbound.text);

    let envelope = Envelope::new(&inbound.sender, &inbound.text).with_push_name(inbound.push_name);
    if let Err(e) = state.bus.publish(envelope) {
        error!("Failed to publish inbound message: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "status": "error",
                "message": e.to_string(),
            })),
        );
    }

    (StatusCode::OK, Json(serde_json::json!({"status": "success"})))
}

async fn handle_status() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "online",
        "message": "Speedcubing Assistant Bot está funcionando!",
    }))
}

async fn handle_manager(State(state): State<Arc<WebhookState>>) -> Redirect {
    info!("Redirecting to Evolution dashboard: {}", state.dashboard_url);
    Redirect::temporary(&state.dashboard_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upsert_event(body: serde_json::Value) -> WebhookEvent {
        serde_json::from_value(body).expect("event")
    }

    #[test]
    fn non_upsert_events_are_ignored() {
        let event = upsert_event(serde_json::json!({
            "event": "connection.update",
            "data": {},
        }));
        assert_eq!(extract_inbound(&event), Err(IgnoreReason::NotMessageUpsert));
        assert_eq!(
            IgnoreReason::NotMessageUpsert.as_str(),
            "not a message upsert event"
        );
    }

    #[test]
    fn empty_message_list_is_ignored() {
        let event = upsert_event(serde_json::json!({
            "event": "messages.upsert",
            "data": { "messages": [] },
        }));
        assert_eq!(extract_inbound(&event), Err(IgnoreReason::NoMessages));
    }

    #[test]
    fn own_messages_are_ignored() {
        let event = upsert_event(serde_json::json!({
            "event": "messages.upsert",
            "data": { "messages": [{
                "key": { "remoteJid": "5511999990000@s.whatsapp.net", "fromMe": true },
                "message": { "conversation": "oi" },
            }]},
        }));
        assert_eq!(extract_inbound(&event), Err(IgnoreReason::FromMe));
    }

    #[test]
    fn media_only_messages_are_ignored() {
        let event = upsert_event(serde_json::json!({
            "event": "messages.upsert",
            "data": { "messages": [{
                "key": { "remoteJid": "5511999990000@s.whatsapp.net" },
                "message": {},
            }]},
        }));
        assert_eq!(extract_inbound(&event), Err(IgnoreReason::NoTextContent));
    }

    #[test]
    fn extracts_plain_conversation_text() {
        let event = upsert_event(serde_json::json!({
            "event": "messages.upsert",
            "data": { "messages": [{
                "key": { "remoteJid": "5511999990000@s.whatsapp.net" },
                "pushName": "Ana",
                "message": { "conversation": "  Caso 05  " },
            }]},
        }));
        let inbound = extract_inbound(&event).expect("inbound");
        assert_eq!(inbound.sender, "5511999990000");
        assert_eq!(inbound.push_name.as_deref(), Some("Ana"));
        assert_eq!(inbound.text, "Caso 05");
    }

    #[test]
    fn extracts_extended_text_shape() {
        let event = upsert_event(serde_json::json!({
            "event": "messages.upsert",
            "data": { "messages": [{
                "key": { "remoteJid": "5511999990000@s.whatsapp.net" },
                "message": { "extendedTextMessage": { "text": "2" } },
            }]},
        }));
        let inbound = extract_inbound(&event).expect("inbound");
        assert_eq!(inbound.text, "2");
    }

    #[tokio::test]
    async fn webhook_handler_acknowledges_and_publishes() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let state = Arc::new(WebhookState {
            bus,
            dashboard_url: "https://evo.example.com".to_string(),
        });

        let body = serde_json::json!({
            "event": "messages.upsert",
            "data": { "messages": [{
                "key": { "remoteJid": "5511999990000@s.whatsapp.net" },
                "message": { "conversation": "1" },
            }]},
        });
        let (status, Json(ack)) =
            handle_webhook(State(state.clone()), Bytes::from(body.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack["status"], "success");

        let envelope = rx.recv().await.expect("published");
        assert_eq!(envelope.sender, "5511999990000");
        assert_eq!(envelope.text, "1");
    }

    #[tokio::test]
    async fn webhook_handler_reports_ignored_events() {
        let bus = EventBus::new();
        let _rx = bus.subscribe();
        let state = Arc::new(WebhookState {
            bus,
            dashboard_url: "https://evo.example.com".to_string(),
        });

        let body = serde_json::json!({"event": "qrcode.updated", "data": {}});
        let (status, Json(ack)) =
            handle_webhook(State(state.clone()), Bytes::from(body.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ack["status"], "ignored");
        assert_eq!(ack["reason"], "not a message upsert event");
    }

    #[tokio::test]
    async fn webhook_handler_rejects_malformed_payloads() {
        let bus = EventBus::new();
        let _rx = bus.subscribe();
        let state = Arc::new(WebhookState {
            bus,
            dashboard_url: "https://evo.example.com".to_string(),
        });

        let (status, Json(ack)) =
            handle_webhook(State(state), Bytes::from_static(b"not json")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ack["status"], "error");
    }
}
