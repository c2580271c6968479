//! Booking runtime executor

use super::traits::{HandoffSnapshot, NotificationSink, Transport};
use super::RuntimeError;

use crate::session::{Activity, MessageKind, Role, Session, SessionStore, StoreError};
use crate::state_machine::{
    prompts, transition, BookingState, Effect, Event, FlowContext, InboundMessage, OutboundIntent,
    TransitionError, TransitionResult,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// What happened while handling one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundOutcome {
    pub previous_state: BookingState,
    pub state: BookingState,
    pub delivered: usize,
    pub failed: usize,
    pub handoff_notified: bool,
    pub confirmed: bool,
}

/// Generic booking runtime that can work with any store, transport and sink
pub struct BookingRuntime<S, T, N>
where
    S: SessionStore + ?Sized,
    T: Transport + ?Sized,
    N: NotificationSink + ?Sized,
{
    context: FlowContext,
    store: Arc<S>,
    transport: Arc<T>,
    notifier: Arc<N>,
}

/// Apply the session-mutating effects of a committed transition
fn apply_writes(session: &mut Session, result: &TransitionResult, now: DateTime<Utc>) {
    for effect in result.writes() {
        match effect {
            Effect::WriteBooking(field) => session.booking.record(field.clone()),
            Effect::RecordPaymentInitiated => {
                session.timestamps.payment_initiated_at.get_or_insert(now);
            }
            _ => {}
        }
    }
    session.state = result.new_state;
}

fn intent_kind(intent: &OutboundIntent) -> MessageKind {
    match intent {
        OutboundIntent::Text { .. } => MessageKind::Text,
        OutboundIntent::Image { .. } => MessageKind::Image,
    }
}

impl<S, T, N> BookingRuntime<S, T, N>
where
    S: SessionStore + ?Sized,
    T: Transport + ?Sized,
    N: NotificationSink + ?Sized,
{
    pub fn new(context: FlowContext, store: Arc<S>, transport: Arc<T>, notifier: Arc<N>) -> Self {
        Self {
            context,
            store,
            transport,
            notifier,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Process one already-deduplicated inbound message end to end
    pub async fn handle_inbound(&self, message: InboundMessage) -> Result<InboundOutcome, RuntimeError> {
        let identity = message.identity.as_str();

        // Malformed events never touch the store
        let event = match message.to_event() {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(identity = %identity, error = %e, "Dropping malformed event");
                self.apologize(identity).await;
                return Err(e.into());
            }
        };

        let session = self.store.get_or_create(identity).await?;
        tracing::info!(
            identity = %identity,
            kind = ?message.kind,
            state = %session.state,
            "Inbound message"
        );

        let now = Utc::now();
        let log_content = message.log_content();
        let context = &self.context;
        let mut outcome: Option<(BookingState, Result<TransitionResult, TransitionError>)> = None;

        self.store
            .update(identity, &mut |session: &mut Session| {
                let previous = session.state;
                let result = transition(previous, &session.booking, context, event.clone());
                let activity = match &result {
                    Ok(committed) => {
                        session.log(Role::User, message.kind, log_content.clone(), now);
                        apply_writes(session, committed, now);
                        Activity::Active
                    }
                    Err(_) => Activity::Quiet,
                };
                outcome = Some((previous, result));
                activity
            })
            .await?;

        let (previous_state, result) = match outcome {
            Some((previous, Ok(result))) => (previous, result),
            Some((state, Err(e))) => {
                tracing::error!(
                    identity = %identity,
                    state = %state,
                    error = %e,
                    "Transition aborted"
                );
                self.apologize(identity).await;
                return Err(e.into());
            }
            None => {
                return Err(TransitionError::InvalidTransition("session update skipped".into()).into());
            }
        };

        if result.new_state == previous_state {
            tracing::debug!(identity = %identity, state = %previous_state, "Input did not advance state");
        } else {
            tracing::info!(
                identity = %identity,
                from = %previous_state,
                to = %result.new_state,
                "Transition committed"
            );
        }

        let mut report = InboundOutcome {
            previous_state,
            state: result.new_state,
            delivered: 0,
            failed: 0,
            handoff_notified: false,
            confirmed: false,
        };

        for effect in result.effects {
            match effect {
                // Already applied inside the store update
                Effect::WriteBooking(_) | Effect::RecordPaymentInitiated => {}
                Effect::Send(intent) => {
                    if self.deliver_one(identity, &intent).await {
                        report.delivered += 1;
                    } else {
                        report.failed += 1;
                    }
                }
                Effect::NotifyHandoff => {
                    report.handoff_notified = self.notify_handoff(identity).await;
                }
                Effect::SendConfirmation(intent) => {
                    if self.deliver_one(identity, &intent).await {
                        report.delivered += 1;
                        if let Some(state) = self.confirm(identity).await {
                            report.state = state;
                            report.confirmed = true;
                        }
                    } else {
                        report.failed += 1;
                    }
                }
            }
        }

        Ok(report)
    }

    /// Deliver intents in order; returns (delivered, failed)
    pub async fn deliver(&self, identity: &str, intents: &[OutboundIntent]) -> (usize, usize) {
        let mut delivered = 0;
        let mut failed = 0;
        for intent in intents {
            if self.deliver_one(identity, intent).await {
                delivered += 1;
            } else {
                failed += 1;
            }
        }
        (delivered, failed)
    }

    /// Mark an inbound message read. Failures are logged only.
    pub async fn mark_read(&self, message_id: &str) {
        if let Err(e) = self.transport.mark_read(message_id).await {
            tracing::warn!(message_id = %message_id, error = %e, "Failed to mark message read");
        }
    }

    async fn deliver_one(&self, identity: &str, intent: &OutboundIntent) -> bool {
        match self.transport.send(identity, intent).await {
            Ok(receipt) => {
                tracing::debug!(identity = %identity, message_id = ?receipt.message_id, "Delivered message");
                let now = Utc::now();
                let kind = intent_kind(intent);
                let content = intent.log_content().to_string();
                let logged = self
                    .store
                    .update(identity, &mut |session: &mut Session| {
                        session.log(Role::Bot, kind, content.clone(), now);
                        Activity::Quiet
                    })
                    .await;
                match logged {
                    Ok(_) => {}
                    // Apology to a guest without a session
                    Err(StoreError::NotFound(_)) => {}
                    Err(e) => {
                        tracing::warn!(identity = %identity, error = %e, "Failed to log delivered message");
                    }
                }
                true
            }
            Err(e) => {
                tracing::error!(identity = %identity, error = %e, "Failed to deliver message");
                false
            }
        }
    }

    /// Claim the handoff and hand the snapshot to the sink, at most once per session
    async fn notify_handoff(&self, identity: &str) -> bool {
        let now = Utc::now();
        let mut snapshot = None;
        let claimed = self
            .store
            .update(identity, &mut |session: &mut Session| {
                if session.timestamps.handoff_notified_at.is_none() {
                    session.timestamps.handoff_notified_at = Some(now);
                    snapshot = Some(HandoffSnapshot::from_session(session, now));
                }
                Activity::Quiet
            })
            .await;

        if let Err(e) = claimed {
            tracing::error!(identity = %identity, error = %e, "Failed to claim handoff");
            return false;
        }
        let Some(snapshot) = snapshot else {
            tracing::debug!(identity = %identity, "Handoff already notified");
            return false;
        };

        tracing::info!(
            identity = %identity,
            notification_id = %snapshot.notification_id,
            "Notifying operator of handoff"
        );
        if let Err(e) = self.notifier.notify(&snapshot).await {
            tracing::error!(identity = %identity, error = %e, "Handoff notification failed");
        }
        true
    }

    /// Feed `ConfirmationSent`; returns the new state if it was accepted
    async fn confirm(&self, identity: &str) -> Option<BookingState> {
        let context = &self.context;
        let mut confirmed = None;
        let updated = self
            .store
            .update(identity, &mut |session: &mut Session| {
                match transition(session.state, &session.booking, context, Event::ConfirmationSent) {
                    Ok(result) => {
                        session.state = result.new_state;
                        confirmed = Some(result.new_state);
                        Activity::Active
                    }
                    Err(e) => {
                        tracing::warn!(identity = %session.identity, error = %e, "Confirmation not applied");
                        Activity::Quiet
                    }
                }
            })
            .await;

        match updated {
            Ok(_) => {
                if let Some(state) = confirmed {
                    tracing::info!(identity = %identity, to = %state, "Booking confirmed");
                }
                confirmed
            }
            Err(e) => {
                tracing::error!(identity = %identity, error = %e, "Failed to record confirmation");
                None
            }
        }
    }

    async fn apologize(&self, identity: &str) {
        let _ = self
            .deliver_one(identity, &OutboundIntent::text(prompts::APOLOGY))
            .await;
    }
}
