//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::executor::BookingRuntime;
use super::traits::*;
use crate::session::MemorySessionStore;
use crate::state_machine::{FlowContext, OutboundIntent};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock Transport
// ============================================================================

/// Transport that records every send and can be switched to fail
#[derive(Default)]
pub struct MockTransport {
    /// Record of all delivered intents
    pub sent: Mutex<Vec<(String, OutboundIntent)>>,
    /// Message IDs marked read
    pub read: Mutex<Vec<String>>,
    failing: AtomicBool,
    read_delay: Mutex<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Slow down read receipts
    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = delay;
    }

    pub fn recorded_sends(&self) -> Vec<(String, OutboundIntent)> {
        self.sent.lock().unwrap().clone()
    }

    /// Text bodies sent to `identity`, in order
    pub fn texts_to(&self, identity: &str) -> Vec<String> {
        self.recorded_sends()
            .into_iter()
            .filter(|(to, _)| to == identity)
            .filter_map(|(_, intent)| match intent {
                OutboundIntent::Text { body } => Some(body),
                OutboundIntent::Image { .. } => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, to: &str, intent: &OutboundIntent) -> Result<DeliveryReceipt, TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected("mock transport offline".into()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((to.to_string(), intent.clone()));
        Ok(DeliveryReceipt {
            message_id: Some(format!("wamid.mock{}", sent.len())),
        })
    }

    async fn mark_read(&self, message_id: &str) -> Result<(), TransportError> {
        let delay = *self.read_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.read.lock().unwrap().push(message_id.to_string());
        Ok(())
    }
}

// ============================================================================
// Delayed Mock Transport (for overlap testing)
// ============================================================================

/// Mock transport that holds every send for a fixed delay
pub struct DelayedMockTransport {
    pub inner: MockTransport,
    delay: Duration,
    /// Notified when a send starts (for test synchronization)
    pub send_started: Arc<Notify>,
}

impl DelayedMockTransport {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockTransport::new(),
            delay,
            send_started: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl Transport for DelayedMockTransport {
    async fn send(&self, to: &str, intent: &OutboundIntent) -> Result<DeliveryReceipt, TransportError> {
        self.send_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.send(to, intent).await
    }
}

// ============================================================================
// Mock Notification Sink
// ============================================================================

#[derive(Default)]
pub struct MockNotificationSink {
    pub snapshots: Mutex<Vec<HandoffSnapshot>>,
    failing: AtomicBool,
}

impl MockNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn count_for(&self, identity: &str) -> usize {
        self.snapshots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.identity == identity)
            .count()
    }
}

#[async_trait]
impl NotificationSink for MockNotificationSink {
    async fn notify(&self, snapshot: &HandoffSnapshot) -> Result<(), NotifyError> {
        self.snapshots.lock().unwrap().push(snapshot.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Status(503));
        }
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub type TestRuntime = BookingRuntime<MemorySessionStore, MockTransport, MockNotificationSink>;

pub struct Harness {
    pub runtime: Arc<TestRuntime>,
    pub store: Arc<MemorySessionStore>,
    pub transport: Arc<MockTransport>,
    pub notifier: Arc<MockNotificationSink>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_context(FlowContext::default())
    }

    pub fn with_context(context: FlowContext) -> Self {
        let store = Arc::new(MemorySessionStore::new());
        let transport = Arc::new(MockTransport::new());
        let notifier = Arc::new(MockNotificationSink::new());
        let runtime = Arc::new(BookingRuntime::new(
            context,
            store.clone(),
            transport.clone(),
            notifier.clone(),
        ));
        Self {
            runtime,
            store,
            transport,
            notifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{BookingField, GuestCount, PaymentMethod, RoomTier, RoomType};
    use crate::runtime::RuntimeError;
    use crate::session::{Activity, MessageKind, Role, Session, SessionStore};
    use crate::state_machine::{prompts, BookingState, InboundMessage};

    const GUEST: &str = "919800000001";

    async fn say(h: &Harness, text: &str) -> crate::runtime::InboundOutcome {
        h.runtime
            .handle_inbound(InboundMessage::text(GUEST, text))
            .await
            .unwrap()
    }

    async fn session(h: &Harness) -> Session {
        h.store.get(GUEST).await.unwrap().unwrap()
    }

    /// Put the guest directly into `state` with a priced booking
    async fn seed(h: &Harness, state: BookingState, guests: u8, room_type: RoomType) {
        h.store.get_or_create(GUEST).await.unwrap();
        h.store
            .update(GUEST, &mut |s: &mut Session| {
                let count = GuestCount::new(guests).unwrap();
                s.booking.record(BookingField::GuestCount(count));
                s.booking.record(BookingField::RoomType(room_type));
                s.booking.record(BookingField::Location("Andheri".into()));
                s.booking
                    .record(BookingField::Quote(crate::booking::resolve(count, room_type)));
                s.state = state;
                Activity::Quiet
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_scenario_dates_with_retry() {
        let h = Harness::new();

        let first = say(&h, "hello").await;
        assert_eq!(first.previous_state, BookingState::Start);
        assert_eq!(first.state, BookingState::Checkin);

        let rejected = say(&h, "31-02-2026").await;
        assert_eq!(rejected.state, BookingState::Checkin);
        assert!(session(&h).await.booking.checkin_date.is_none());

        let accepted = say(&h, "15-03-2026").await;
        assert_eq!(accepted.state, BookingState::Checkout);
        assert_eq!(
            session(&h).await.booking.checkin_date.map(|d| d.to_string()),
            Some("15-03-2026".to_string())
        );
    }

    #[tokio::test]
    async fn test_scenario_location_prices_booking() {
        let h = Harness::new();
        for text in ["hi", "15-03-2026", "16-03-2026", "2", "hourly"] {
            say(&h, text).await;
        }
        assert_eq!(session(&h).await.state, BookingState::Location);

        let outcome = say(&h, "Andheri").await;
        assert_eq!(outcome.state, BookingState::PriceShared);

        let s = session(&h).await;
        assert_eq!(s.booking.price, Some(200));
        assert_eq!(s.booking.room_tier, Some(RoomTier::Deluxe));
        assert_eq!(s.booking.location.as_deref(), Some("Andheri"));
        assert!(h.transport.texts_to(GUEST).last().unwrap().contains("₹200"));
    }

    #[tokio::test]
    async fn test_scenario_pay_at_hotel_hands_off_once() {
        let h = Harness::new();
        seed(&h, BookingState::PaymentChoice, 2, RoomType::FullDay).await;

        let outcome = say(&h, "hotel").await;
        assert_eq!(outcome.previous_state, BookingState::PaymentChoice);
        assert!(outcome.handoff_notified);
        assert!(outcome.confirmed);
        assert_eq!(outcome.state, BookingState::Confirmed);
        assert_eq!(h.notifier.count_for(GUEST), 1);

        // No QR image was ever sent
        assert!(h
            .transport
            .recorded_sends()
            .iter()
            .all(|(_, intent)| matches!(intent, OutboundIntent::Text { .. })));

        let s = session(&h).await;
        assert_eq!(s.booking.payment_method, Some(PaymentMethod::AtHotel));
        assert!(s.timestamps.payment_initiated_at.is_some());
    }

    #[tokio::test]
    async fn test_scenario_screenshot_wait() {
        let h = Harness::new();
        seed(&h, BookingState::WaitingScreenshot, 1, RoomType::Hourly).await;

        let text = say(&h, "paid already").await;
        assert_eq!(text.state, BookingState::WaitingScreenshot);
        assert_eq!(h.notifier.count_for(GUEST), 0);

        let image = h
            .runtime
            .handle_inbound(InboundMessage::image(GUEST))
            .await
            .unwrap();
        assert_eq!(image.previous_state, BookingState::WaitingScreenshot);
        assert!(image.handoff_notified);
        assert_eq!(image.state, BookingState::Confirmed);
        assert_eq!(h.notifier.count_for(GUEST), 1);
    }

    #[tokio::test]
    async fn test_online_payment_sends_qr_and_waits() {
        let h = Harness::new();
        seed(&h, BookingState::PriceShared, 3, RoomType::FullDay).await;

        let outcome = say(&h, "online").await;
        assert_eq!(outcome.state, BookingState::WaitingScreenshot);
        assert_eq!(outcome.delivered, 3);

        let sends = h.transport.recorded_sends();
        assert!(matches!(
            &sends[1].1,
            OutboundIntent::Image { url, .. } if url.contains("1299")
        ));
        assert!(session(&h).await.timestamps.payment_initiated_at.is_some());
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_roll_back() {
        let h = Harness::new();
        seed(&h, BookingState::WaitingScreenshot, 1, RoomType::Hourly).await;
        h.transport.set_failing(true);

        let outcome = h
            .runtime
            .handle_inbound(InboundMessage::image(GUEST))
            .await
            .unwrap();

        assert_eq!(outcome.delivered, 0);
        assert!(outcome.failed >= 2);
        assert!(!outcome.confirmed);
        assert_eq!(outcome.state, BookingState::HumanHandoff);
        assert_eq!(session(&h).await.state, BookingState::HumanHandoff);
        // The sink is independent of the transport
        assert_eq!(h.notifier.count_for(GUEST), 1);
    }

    #[tokio::test]
    async fn test_handoff_is_never_repeated() {
        let h = Harness::new();
        seed(&h, BookingState::WaitingScreenshot, 1, RoomType::Hourly).await;
        h.transport.set_failing(true);
        h.runtime
            .handle_inbound(InboundMessage::image(GUEST))
            .await
            .unwrap();

        // Force the session back and replay the receipt
        h.store
            .update(GUEST, &mut |s: &mut Session| {
                s.state = BookingState::WaitingScreenshot;
                Activity::Quiet
            })
            .await
            .unwrap();
        let replay = h
            .runtime
            .handle_inbound(InboundMessage::image(GUEST))
            .await
            .unwrap();

        assert!(!replay.handoff_notified);
        assert_eq!(h.notifier.count_for(GUEST), 1);
    }

    #[tokio::test]
    async fn test_sink_failure_is_not_fatal() {
        let h = Harness::new();
        seed(&h, BookingState::PriceShared, 2, RoomType::Hourly).await;
        h.notifier.set_failing(true);

        let outcome = say(&h, "2").await;
        assert!(outcome.handoff_notified);
        assert_eq!(outcome.state, BookingState::Confirmed);
    }

    #[tokio::test]
    async fn test_malformed_event_apologizes_without_mutation() {
        let h = Harness::new();
        say(&h, "hi").await;
        let before = session(&h).await;

        let malformed = InboundMessage {
            identity: GUEST.to_string(),
            kind: MessageKind::Text,
            content: None,
            message_id: None,
        };
        let result = h.runtime.handle_inbound(malformed).await;
        assert!(matches!(result, Err(RuntimeError::Transition(_))));

        let after = session(&h).await;
        assert_eq!(after.state, before.state);
        assert_eq!(after.booking, before.booking);
        assert_eq!(
            h.transport.texts_to(GUEST).last().map(String::as_str),
            Some(prompts::APOLOGY)
        );
    }

    #[tokio::test]
    async fn test_malformed_event_from_new_guest_creates_no_session() {
        let h = Harness::new();
        let malformed = InboundMessage {
            identity: "919800000777".to_string(),
            kind: MessageKind::Text,
            content: None,
            message_id: None,
        };

        let result = h.runtime.handle_inbound(malformed).await;
        assert!(matches!(result, Err(RuntimeError::Transition(_))));
        assert!(h.store.get("919800000777").await.unwrap().is_none());
        assert_eq!(h.transport.texts_to("919800000777"), vec![prompts::APOLOGY.to_string()]);
    }

    #[tokio::test]
    async fn test_conversation_log_records_both_sides() {
        let h = Harness::new();
        say(&h, "namaste").await;

        let log = session(&h).await.conversation;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].role, Role::User);
        assert_eq!(log[0].content, "namaste");
        assert_eq!(log[1].role, Role::Bot);
        assert_eq!(log[1].content, prompts::GREETING);
    }

    #[tokio::test]
    async fn test_mark_read_reaches_transport() {
        let h = Harness::new();
        h.runtime.mark_read("wamid.ABC").await;
        assert_eq!(h.transport.read.lock().unwrap().as_slice(), ["wamid.ABC"]);
    }
}
