//! API request and response types

use crate::session::{LogEntry, ReminderCounts, SessionSummary, Timestamps};
use crate::state_machine::{BookingState, InboundMessage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================
// Webhook payloads (WhatsApp Business Account)
// ============================================================

/// Query sent by Meta when registering the webhook
#[derive(Debug, Deserialize)]
pub struct WebhookVerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub object: Option<String>,
    pub entry: Option<Vec<WebhookEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    pub changes: Option<Vec<WebhookChange>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    pub value: Option<WebhookValue>,
    pub field: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookValue {
    pub contacts: Option<Vec<WebhookContact>>,
    pub messages: Option<Vec<WebhookMessage>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookContact {
    pub wa_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookMessage {
    pub from: Option<String>,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub msg_type: Option<String>,
    pub text: Option<WebhookText>,
    pub image: Option<WebhookImage>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookText {
    pub body: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookImage {
    pub id: Option<String>,
}

impl WebhookPayload {
    pub fn is_business_account(&self) -> bool {
        self.object.as_deref() == Some("whatsapp_business_account")
    }

    /// Flatten the payload into inbound messages, dropping kinds the flow
    /// does not handle
    pub fn into_messages(self) -> Vec<InboundMessage> {
        if !self.is_business_account() {
            return Vec::new();
        }
        let mut out = Vec::new();
        let changes = self
            .entry
            .into_iter()
            .flatten()
            .flat_map(|entry| entry.changes.into_iter().flatten())
            .filter(|change| change.field.as_deref() == Some("messages"));

        for change in changes {
            let Some(value) = change.value else { continue };
            let fallback = value
                .contacts
                .as_ref()
                .and_then(|c| c.first())
                .and_then(|c| c.wa_id.clone());

            for msg in value.messages.into_iter().flatten() {
                let Some(identity) = msg.from.clone().or_else(|| fallback.clone()) else {
                    tracing::debug!(message_id = ?msg.id, "Message without sender");
                    continue;
                };
                let inbound = match msg.msg_type.as_deref() {
                    Some("text") => InboundMessage {
                        content: msg.text.and_then(|t| t.body),
                        ..InboundMessage::text(identity, String::new())
                    },
                    Some("image") => InboundMessage {
                        content: msg.image.and_then(|i| i.id),
                        ..InboundMessage::image(identity)
                    },
                    other => {
                        tracing::debug!(kind = ?other, "Ignoring unsupported message type");
                        continue;
                    }
                };
                out.push(match msg.id {
                    Some(id) => inbound.with_message_id(id),
                    None => inbound,
                });
            }
        }
        out
    }
}

// ============================================================
// Admin responses
// ============================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserCounts {
    pub total: usize,
    pub state_distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub whatsapp: String,
    pub reminders: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub users: UserCounts,
    pub service: ServiceStatus,
}

impl StatusResponse {
    pub fn from_states(states: impl IntoIterator<Item = BookingState>, reminders_enabled: bool) -> Self {
        let mut state_distribution = BTreeMap::new();
        let mut total = 0;
        for state in states {
            *state_distribution.entry(state.as_str().to_string()).or_insert(0) += 1;
            total += 1;
        }
        Self {
            status: "operational".to_string(),
            timestamp: Utc::now(),
            users: UserCounts {
                total,
                state_distribution,
            },
            service: ServiceStatus {
                whatsapp: "connected".to_string(),
                reminders: if reminders_enabled { "active" } else { "disabled" }.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub total: usize,
    pub users: Vec<SessionSummary>,
}

/// Detailed view of one session
#[derive(Debug, Serialize)]
pub struct UserDetailResponse {
    #[serde(flatten)]
    pub summary: SessionSummary,
    pub reminders: ReminderCounts,
    pub timestamps: Timestamps,
    pub conversation_length: usize,
    pub recent_messages: Vec<LogEntry>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
