//! WhatsApp Cloud API transport

use crate::config::WhatsAppConfig;
use crate::runtime::{DeliveryReceipt, Transport, TransportError};
use crate::state_machine::OutboundIntent;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct SendPayload<'a> {
    messaging_product: &'static str,
    recipient_type: &'static str,
    to: &'a str,
    #[serde(flatten)]
    body: MessageBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessageBody<'a> {
    Text { text: TextBody<'a> },
    Image { image: ImageBody<'a> },
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct ImageBody<'a> {
    link: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ReadReceipt<'a> {
    messaging_product: &'static str,
    status: &'static str,
    message_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn payload<'a>(to: &'a str, intent: &'a OutboundIntent) -> SendPayload<'a> {
    let body = match intent {
        OutboundIntent::Text { body } => MessageBody::Text {
            text: TextBody { body },
        },
        OutboundIntent::Image { url, caption } => MessageBody::Image {
            image: ImageBody {
                link: url,
                caption: caption.as_deref(),
            },
        },
    };
    SendPayload {
        messaging_product: "whatsapp",
        recipient_type: "individual",
        to,
        body,
    }
}

/// Recipients are phone numbers in international format, digits only
fn check_recipient(to: &str) -> Result<(), TransportError> {
    let digits = to.strip_prefix('+').unwrap_or(to);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TransportError::Rejected(format!("invalid recipient {to:?}")));
    }
    Ok(())
}

/// Prefer the API's own error message over the raw body
fn api_error(status: u16, body: &str) -> TransportError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map_or_else(|_| body.to_string(), |parsed| parsed.error.message);
    TransportError::Api { status, message }
}

pub struct WhatsAppClient {
    http: reqwest::Client,
    messages_url: String,
    token: String,
}

impl WhatsAppClient {
    pub fn new(config: &WhatsAppConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.send_timeout)
            .build()?;
        Ok(Self {
            http,
            messages_url: format!(
                "{}/{}/messages",
                config.api_base.trim_end_matches('/'),
                config.phone_number_id
            ),
            token: config.api_token.clone(),
        })
    }

    async fn post<B: Serialize + Sync>(&self, body: &B) -> Result<String, TransportError> {
        let response = self
            .http
            .post(&self.messages_url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            Ok(text)
        } else {
            Err(api_error(status.as_u16(), &text))
        }
    }
}

#[async_trait]
impl Transport for WhatsAppClient {
    async fn send(&self, to: &str, intent: &OutboundIntent) -> Result<DeliveryReceipt, TransportError> {
        check_recipient(to)?;
        let text = self.post(&payload(to, intent)).await?;
        let message_id = serde_json::from_str::<SendResponse>(&text)
            .ok()
            .and_then(|r| r.messages.into_iter().next())
            .map(|m| m.id);
        Ok(DeliveryReceipt { message_id })
    }

    async fn mark_read(&self, message_id: &str) -> Result<(), TransportError> {
        self.post(&ReadReceipt {
            messaging_product: "whatsapp",
            status: "read",
            message_id,
        })
        .await
        .map(|_| ())
    }
}
