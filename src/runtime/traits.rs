//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::booking::BookingData;
use crate::session::{LogEntry, Session};
use crate::state_machine::OutboundIntent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Messaging API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Message rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Handoff endpoint returned {0}")]
    Status(u16),
}

/// Acknowledgement from the messaging provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub message_id: Option<String>,
}

/// Outbound messaging channel
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one intent to `to`
    async fn send(&self, to: &str, intent: &OutboundIntent) -> Result<DeliveryReceipt, TransportError>;

    /// Show the inbound message as read. Optional for transports without receipts.
    async fn mark_read(&self, _message_id: &str) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Everything an operator needs to take over a booking
#[derive(Debug, Clone, Serialize)]
pub struct HandoffSnapshot {
    pub notification_id: Uuid,
    pub identity: String,
    pub booking: BookingData,
    pub conversation: Vec<LogEntry>,
    pub timestamp: DateTime<Utc>,
}

impl HandoffSnapshot {
    pub fn from_session(session: &Session, timestamp: DateTime<Utc>) -> Self {
        Self {
            notification_id: Uuid::new_v4(),
            identity: session.identity.clone(),
            booking: session.booking.clone(),
            conversation: session.conversation.clone(),
            timestamp,
        }
    }

    /// Plain-text summary for operators
    pub fn operator_summary(&self) -> String {
        let b = &self.booking;
        let mut out = format!("New booking handoff for {}\n", self.identity);
        let fields = [
            ("Check-in", b.checkin_date.map(|d| d.to_string())),
            ("Check-out", b.checkout_date.map(|d| d.to_string())),
            ("Guests", b.guest_count.map(|g| g.to_string())),
            ("Stay", b.room_type.map(|r| r.stay_label().to_string())),
            ("Location", b.location.clone()),
            ("Room", b.room_tier.map(|t| t.name().to_string())),
            ("Price", b.price.map(|p| format!("₹{p}"))),
            ("Payment", b.payment_method.map(|m| m.label().to_string())),
        ];
        for (label, value) in fields {
            let _ = writeln!(out, "- {label}: {}", value.as_deref().unwrap_or("-"));
        }
        let _ = write!(out, "Messages exchanged: {}", self.conversation.len());
        out
    }
}

/// Receiver of human-handoff snapshots
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, snapshot: &HandoffSnapshot) -> Result<(), NotifyError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, to: &str, intent: &OutboundIntent) -> Result<DeliveryReceipt, TransportError> {
        (**self).send(to, intent).await
    }

    async fn mark_read(&self, message_id: &str) -> Result<(), TransportError> {
        (**self).mark_read(message_id).await
    }
}

#[async_trait]
impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    async fn notify(&self, snapshot: &HandoffSnapshot) -> Result<(), NotifyError> {
        (**self).notify(snapshot).await
    }
}
