//! Effects produced by state transitions

use crate::booking::BookingField;
use serde::Serialize;

/// Message to deliver to the guest, independent of the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundIntent {
    Text {
        body: String,
    },
    Image {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}

impl OutboundIntent {
    pub fn text(body: impl Into<String>) -> Self {
        OutboundIntent::Text { body: body.into() }
    }

    pub fn image(url: impl Into<String>, caption: Option<String>) -> Self {
        OutboundIntent::Image {
            url: url.into(),
            caption,
        }
    }

    /// Text recorded in the conversation log once delivered
    pub fn log_content(&self) -> &str {
        match self {
            OutboundIntent::Text { body } => body,
            OutboundIntent::Image { url, .. } => url,
        }
    }
}

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Record an accepted answer in the booking
    WriteBooking(BookingField),

    /// Stamp `payment_initiated_at` if not already set
    RecordPaymentInitiated,

    /// Deliver a message to the guest
    Send(OutboundIntent),

    /// Hand the session snapshot to the operator sink
    NotifyHandoff,

    /// Deliver the final confirmation; success completes the booking
    SendConfirmation(OutboundIntent),
}

impl Effect {
    pub fn send_text(body: impl Into<String>) -> Self {
        Effect::Send(OutboundIntent::text(body))
    }

    /// Whether the effect mutates the session (applied inside the store update)
    pub fn is_write(&self) -> bool {
        matches!(self, Effect::WriteBooking(_) | Effect::RecordPaymentInitiated)
    }
}
