//! Per-guest inbound ordering
//!
//! Each guest with pending messages owns one inbox: an unbounded channel
//! drained by a single task, so messages from one guest are handled strictly
//! in arrival order while different guests proceed in parallel. An inbox
//! that stays empty for `idle` is retired and recreated on the next message.

use super::executor::BookingRuntime;
use super::traits::{NotificationSink, Transport};
use super::InboundOutcome;
use crate::session::SessionStore;
use crate::state_machine::InboundMessage;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

type InboxMap = HashMap<String, mpsc::UnboundedSender<InboundMessage>>;
type Inboxes = Arc<Mutex<InboxMap>>;

fn lock(inboxes: &Inboxes) -> MutexGuard<'_, InboxMap> {
    match inboxes.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Manager for per-guest inbound processing
pub struct RuntimeManager<S, T, N>
where
    S: SessionStore + ?Sized + 'static,
    T: Transport + ?Sized + 'static,
    N: NotificationSink + ?Sized + 'static,
{
    runtime: Arc<BookingRuntime<S, T, N>>,
    inboxes: Inboxes,
    idle: Duration,
}

impl<S, T, N> RuntimeManager<S, T, N>
where
    S: SessionStore + ?Sized + 'static,
    T: Transport + ?Sized + 'static,
    N: NotificationSink + ?Sized + 'static,
{
    pub fn new(runtime: Arc<BookingRuntime<S, T, N>>, idle: Duration) -> Self {
        Self {
            runtime,
            inboxes: Arc::default(),
            idle,
        }
    }

    pub fn runtime(&self) -> &Arc<BookingRuntime<S, T, N>> {
        &self.runtime
    }

    /// Queue `message` behind everything already received from the same guest.
    /// Must be called in arrival order; never blocks.
    pub fn dispatch(&self, message: InboundMessage) {
        let mut inboxes = lock(&self.inboxes);

        let message = match inboxes.get(&message.identity) {
            Some(tx) => match tx.send(message) {
                Ok(()) => return,
                // Inbox task is gone; open a new one
                Err(mpsc::error::SendError(message)) => message,
            },
            None => message,
        };

        let identity = message.identity.clone();
        let (tx, rx) = mpsc::unbounded_channel();
        if tx.send(message).is_err() {
            return;
        }
        inboxes.insert(identity.clone(), tx);
        drop(inboxes);

        tracing::debug!(identity = %identity, "Opened guest inbox");
        tokio::spawn(drain(
            self.runtime.clone(),
            self.inboxes.clone(),
            identity,
            rx,
            self.idle,
        ));
    }

    #[cfg(test)]
    pub fn open_inboxes(&self) -> usize {
        lock(&self.inboxes).len()
    }
}

async fn drain<S, T, N>(
    runtime: Arc<BookingRuntime<S, T, N>>,
    inboxes: Inboxes,
    identity: String,
    mut rx: mpsc::UnboundedReceiver<InboundMessage>,
    idle: Duration,
) where
    S: SessionStore + ?Sized + 'static,
    T: Transport + ?Sized + 'static,
    N: NotificationSink + ?Sized + 'static,
{
    loop {
        let message = match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some(message)) => message,
            Ok(None) => break,
            Err(_) => match retire(&inboxes, &identity, &mut rx) {
                Some(message) => message,
                None => break,
            },
        };
        process(&runtime, message).await;
    }
    tracing::debug!(identity = %identity, "Closed guest inbox");
}

/// Remove the idle inbox unless a message arrived in the meantime.
/// `dispatch` sends under the same lock, so nothing can slip in afterwards.
fn retire(
    inboxes: &Inboxes,
    identity: &str,
    rx: &mut mpsc::UnboundedReceiver<InboundMessage>,
) -> Option<InboundMessage> {
    let mut guard = lock(inboxes);
    match rx.try_recv() {
        Ok(message) => Some(message),
        Err(_) => {
            guard.remove(identity);
            None
        }
    }
}

async fn process<S, T, N>(runtime: &BookingRuntime<S, T, N>, message: InboundMessage)
where
    S: SessionStore + ?Sized,
    T: Transport + ?Sized,
    N: NotificationSink + ?Sized,
{
    let identity = message.identity.clone();
    let message_id = message.message_id.clone();

    match runtime.handle_inbound(message).await {
        Ok(outcome) => log_outcome(&identity, &outcome),
        Err(e) => {
            tracing::error!(identity = %identity, error = %e, "Inbound message not processed");
        }
    }

    if let Some(id) = message_id {
        runtime.mark_read(&id).await;
    }
}

fn log_outcome(identity: &str, outcome: &InboundOutcome) {
    tracing::debug!(
        identity = %identity,
        from = %outcome.previous_state,
        to = %outcome.state,
        delivered = outcome.delivered,
        failed = outcome.failed,
        handoff_notified = outcome.handoff_notified,
        confirmed = outcome.confirmed,
        "Inbound message handled"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::Harness;
    use crate::session::Session;
    use crate::state_machine::BookingState;

    const GUEST: &str = "919800000001";

    async fn wait_until<F: Fn(&Session) -> bool>(h: &Harness, identity: &str, done: F) -> Session {
        for _ in 0..400 {
            if let Some(session) = h.store.get(identity).await.unwrap() {
                if done(&session) {
                    return session;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("{identity} never reached the expected state");
    }

    #[tokio::test]
    async fn test_messages_from_one_guest_apply_in_order() {
        let h = Harness::new();
        h.transport.set_read_delay(Duration::from_millis(100));
        let manager = RuntimeManager::new(h.runtime.clone(), Duration::from_secs(60));

        manager.dispatch(InboundMessage::text(GUEST, "hi").with_message_id("wamid.1"));
        manager.dispatch(InboundMessage::text(GUEST, "15-03-2026").with_message_id("wamid.2"));
        manager.dispatch(InboundMessage::text(GUEST, "16-03-2026").with_message_id("wamid.3"));

        let session = wait_until(&h, GUEST, |s| s.state == BookingState::GuestCount).await;
        assert_eq!(
            session.booking.checkin_date.map(|d| d.to_string()).as_deref(),
            Some("15-03-2026")
        );
        assert_eq!(
            session.booking.checkout_date.map(|d| d.to_string()).as_deref(),
            Some("16-03-2026")
        );
    }

    #[tokio::test]
    async fn test_handles_before_marking_read() {
        let h = Harness::new();
        let manager = RuntimeManager::new(h.runtime.clone(), Duration::from_secs(60));

        manager.dispatch(InboundMessage::text(GUEST, "hi").with_message_id("wamid.A"));
        wait_until(&h, GUEST, |s| s.state == BookingState::Checkin).await;

        for _ in 0..200 {
            if !h.transport.read.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(h.transport.read.lock().unwrap().as_slice(), ["wamid.A"]);
    }

    #[tokio::test]
    async fn test_guests_do_not_wait_for_each_other() {
        let h = Harness::new();
        h.transport.set_read_delay(Duration::from_millis(300));
        let manager = RuntimeManager::new(h.runtime.clone(), Duration::from_secs(60));

        manager.dispatch(InboundMessage::text(GUEST, "hi").with_message_id("wamid.1"));
        manager.dispatch(InboundMessage::text(GUEST, "15-03-2026").with_message_id("wamid.2"));
        manager.dispatch(InboundMessage::text("919800000002", "hi"));

        // Second guest is served while the first is stuck on a slow read receipt
        let other = wait_until(&h, "919800000002", |s| s.state == BookingState::Checkin).await;
        assert_eq!(other.state, BookingState::Checkin);
        let first = wait_until(&h, GUEST, |s| s.state == BookingState::Checkin).await;
        assert!(first.booking.checkin_date.is_none());
        assert_eq!(manager.open_inboxes(), 2);
    }

    #[tokio::test]
    async fn test_idle_inbox_is_retired_and_reopened() {
        let h = Harness::new();
        let manager = RuntimeManager::new(h.runtime.clone(), Duration::from_millis(20));

        manager.dispatch(InboundMessage::text(GUEST, "hi"));
        wait_until(&h, GUEST, |s| s.state == BookingState::Checkin).await;

        for _ in 0..200 {
            if manager.open_inboxes() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(manager.open_inboxes(), 0);

        manager.dispatch(InboundMessage::text(GUEST, "15-03-2026"));
        let session = wait_until(&h, GUEST, |s| s.state == BookingState::Checkout).await;
        assert!(session.booking.checkin_date.is_some());
    }
}
