//! Events that drive the booking flow

use super::transition::TransitionError;
use crate::session::MessageKind;
use serde::{Deserialize, Serialize};

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Guest sent a text message
    UserText { text: String },
    /// Guest sent an image (payment receipt, or a stray photo)
    UserImage,
    /// The final confirmation reached the guest
    ConfirmationSent,
}

/// One already-deduplicated message as delivered by the webhook receiver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub identity: String,
    pub kind: MessageKind,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
}

impl InboundMessage {
    pub fn text(identity: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            kind: MessageKind::Text,
            content: Some(body.into()),
            message_id: None,
        }
    }

    pub fn image(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            kind: MessageKind::Image,
            content: None,
            message_id: None,
        }
    }

    #[must_use]
    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    pub fn to_event(&self) -> Result<Event, TransitionError> {
        match self.kind {
            MessageKind::Text => self
                .content
                .clone()
                .map(|text| Event::UserText { text })
                .ok_or_else(|| TransitionError::MalformedEvent("text message without a body".into())),
            MessageKind::Image => Ok(Event::UserImage),
        }
    }

    /// What goes into the conversation log for this message
    pub fn log_content(&self) -> String {
        match (self.kind, &self.content) {
            (MessageKind::Text, Some(text)) => text.clone(),
            (MessageKind::Image, Some(id)) => format!("[image {id}]"),
            (_, _) => "[image]".to_string(),
        }
    }
}
