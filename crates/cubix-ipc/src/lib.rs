//! Cubix IPC
//!
//! Event bus between the webhook ingress, the conversation engine, and the
//! outbound transport

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;

static NEXT_TRACE_COUNTER: AtomicU64 = AtomicU64::new(1);

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn generate_trace_id() -> String {
    let ts = now_unix_secs();
    let n = NEXT_TRACE_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("trace-{}-{}", ts, n)
}

fn default_schema_version() -> u16 {
    1
}

fn default_trace_id() -> String {
    generate_trace_id()
}

/// One inbound conversational event: a sender said something.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    #[serde(default = "default_trace_id")]
    pub trace_id: String,
    pub id: String,
    /// Sender identifier: the user part of the WhatsApp JID.
    pub sender: String,
    /// Display name as reported by the gateway, if any.
    pub push_name: Option<String>,
    pub text: String,
}

impl Envelope {
    pub fn new(sender: &str, text: &str) -> Self {
        Self {
            schema_version: default_schema_version(),
            trace_id: generate_trace_id(),
            id: uuid::Uuid::new_v4().to_string(),
            sender: sender.to_string(),
            push_name: None,
            text: text.to_string(),
        }
    }

    pub fn with_push_name(mut self, push_name: Option<String>) -> Self {
        self.push_name = push_name;
        self
    }

    pub fn with_trace_id(mut self, trace_id: String) -> Self {
        self.trace_id = trace_id;
        self
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One step of an outbound message plan, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub recipient: String,
    pub body: OutboundBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundBody {
    Text { text: String },
    Image { asset_ref: String, caption: String },
}

impl OutboundMessage {
    pub fn text(recipient: &str, text: impl Into<String>) -> Self {
        Self {
            recipient: recipient.to_string(),
            body: OutboundBody::Text { text: text.into() },
        }
    }

    pub fn image(recipient: &str, asset_ref: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            recipient: recipient.to_string(),
            body: OutboundBody::Image {
                asset_ref: asset_ref.into(),
                caption: caption.into(),
            },
        }
    }
}

pub const EVENT_BUS_CAPACITY: usize = 256;
pub const OUTBOUND_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    inbound: broadcast::Sender<Envelope>,
    outbound: broadcast::Sender<OutboundMessage>,
}

impl EventBus {
    pub fn new() -> Self {
        let (inbound_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        let (outbound_tx, _) = broadcast::channel(OUTBOUND_CAPACITY);

        Self {
            inbound: inbound_tx,
            outbound: outbound_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.inbound.subscribe()
    }

    pub fn publish(&self, envelope: Envelope) -> anyhow::Result<()> {
        self.inbound.send(envelope)?;
        Ok(())
    }

    pub fn outbound_sender(&self) -> broadcast::Sender<OutboundMessage> {
        self.outbound.clone()
    }

    pub fn outbound_subscribe(&self) -> broadcast::Receiver<OutboundMessage> {
        self.outbound.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
