//! Per-guest conversation sessions
//!
//! A session is keyed by the guest's messaging identity (phone number) and
//! holds the flow state, the partial booking, reminder bookkeeping and the
//! conversation log.

mod store;

pub use store::{Activity, MemorySessionStore, Mutator, SessionStore, StoreError};
pub(crate) use store::apply_mutation;

use crate::booking::BookingData;
use crate::reminder::ReminderKind;
use crate::state_machine::BookingState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a conversation log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Bot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub kind: MessageKind,
    pub at: DateTime<Utc>,
}

/// Reminders already sent, per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderCounts {
    pub inactive: u32,
    pub payment_screenshot: u32,
}

impl ReminderCounts {
    pub fn count(&self, kind: ReminderKind) -> u32 {
        match kind {
            ReminderKind::Inactive => self.inactive,
            ReminderKind::PaymentScreenshot => self.payment_screenshot,
        }
    }

    pub fn increment(&mut self, kind: ReminderKind) {
        match kind {
            ReminderKind::Inactive => self.inactive = self.inactive.saturating_add(1),
            ReminderKind::PaymentScreenshot => {
                self.payment_screenshot = self.payment_screenshot.saturating_add(1);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Set once, when a payment method is first chosen
    #[serde(default)]
    pub payment_initiated_at: Option<DateTime<Utc>>,
    /// Set once, when the operator handoff is claimed
    #[serde(default)]
    pub handoff_notified_at: Option<DateTime<Utc>>,
}

impl Timestamps {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            last_activity_at: now,
            payment_initiated_at: None,
            handoff_notified_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub identity: String,
    #[serde(default)]
    pub state: BookingState,
    #[serde(default)]
    pub booking: BookingData,
    #[serde(default)]
    pub reminders: ReminderCounts,
    pub timestamps: Timestamps,
    #[serde(default)]
    pub conversation: Vec<LogEntry>,
}

impl Session {
    pub fn new(identity: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            identity: identity.into(),
            state: BookingState::default(),
            booking: BookingData::default(),
            reminders: ReminderCounts::default(),
            timestamps: Timestamps::new(now),
            conversation: Vec::new(),
        }
    }

    /// Append to the conversation log
    pub fn log(&mut self, role: Role, kind: MessageKind, content: impl Into<String>, at: DateTime<Utc>) {
        self.conversation.push(LogEntry {
            role,
            content: content.into(),
            kind,
            at,
        });
    }

    pub fn summary(&self, now: DateTime<Utc>) -> SessionSummary {
        let secs_since = |t: DateTime<Utc>| now.signed_duration_since(t).num_seconds().max(0);
        SessionSummary {
            identity: self.identity.clone(),
            state: self.state,
            booking: self.booking.clone(),
            booking_fields: self.booking.filled(),
            messages: self.conversation.len(),
            last_activity_at: self.timestamps.last_activity_at,
            session_secs: secs_since(self.timestamps.started_at),
            idle_secs: secs_since(self.timestamps.last_activity_at),
        }
    }
}

/// Compact view used by the admin listing
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub identity: String,
    pub state: BookingState,
    pub booking: BookingData,
    pub booking_fields: usize,
    pub messages: usize,
    pub last_activity_at: DateTime<Utc>,
    pub session_secs: i64,
    pub idle_secs: i64,
}
