//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use crate::booking::{resolve, BookingData, GuestCount, RoomType};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

/// Run one event and apply its booking writes, the way the runtime does.
/// A delivered confirmation is fed back immediately.
fn step(state: BookingState, booking: &mut BookingData, event: Event) -> BookingState {
    let ctx = FlowContext::default();
    let Ok(result) = transition(state, booking, &ctx, event) else {
        return state;
    };

    let mut confirm = false;
    for effect in result.effects {
        match effect {
            Effect::WriteBooking(field) => booking.record(field),
            Effect::SendConfirmation(_) => confirm = true,
            _ => {}
        }
    }

    if confirm {
        if let Ok(done) = transition(result.new_state, booking, &ctx, Event::ConfirmationSent) {
            return done.new_state;
        }
    }
    result.new_state
}

/// Fields set on the booking, as a presence mask
fn presence(booking: &BookingData) -> [bool; 8] {
    [
        booking.checkin_date.is_some(),
        booking.checkout_date.is_some(),
        booking.guest_count.is_some(),
        booking.room_type.is_some(),
        booking.location.is_some(),
        booking.payment_method.is_some(),
        booking.room_tier.is_some(),
        booking.price.is_some(),
    ]
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_state() -> impl Strategy<Value = BookingState> {
    prop::sample::select(BookingState::ALL.to_vec())
}

fn arb_room_type() -> impl Strategy<Value = RoomType> {
    prop_oneof![Just(RoomType::FullDay), Just(RoomType::Hourly)]
}

fn arb_guests() -> impl Strategy<Value = GuestCount> {
    (GuestCount::MIN..=GuestCount::MAX).prop_map(|n| GuestCount::new(n).unwrap())
}

/// Inputs a guest might plausibly send, valid and invalid for every state
fn arb_event() -> impl Strategy<Value = Event> {
    let texts = prop::sample::select(vec![
        "hi",
        "15-03-2026",
        "16-03-2026",
        "31-02-2026",
        "1-1-2024",
        "1",
        "2",
        "3",
        "four",
        "7",
        "hourly",
        "24",
        "online",
        "qr",
        "hotel",
        "Andheri",
        "x",
        "   ",
    ]);
    prop_oneof![
        4 => texts.prop_map(|t| Event::UserText { text: t.to_string() }),
        1 => Just(Event::UserImage),
    ]
}

/// Text none of the parsers accept (but long enough to be a location)
fn arb_gibberish() -> impl Strategy<Value = String> {
    "[x-z]{3,8}"
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_invalid_date_is_idempotent(attempts in 1usize..20, bad in arb_gibberish()) {
        let ctx = FlowContext::default();
        let booking = BookingData::default();
        let mut state = BookingState::Checkin;

        for _ in 0..attempts {
            let result = transition(state, &booking, &ctx, Event::UserText { text: bad.clone() }).unwrap();
            prop_assert_eq!(result.writes().count(), 0);
            state = result.new_state;
        }

        prop_assert_eq!(state, BookingState::Checkin);
        prop_assert!(booking.checkin_date.is_none());
    }

    #[test]
    fn prop_rejected_input_changes_nothing(
        state in prop::sample::select(vec![
            BookingState::Checkin,
            BookingState::Checkout,
            BookingState::GuestCount,
            BookingState::StayType,
            BookingState::PriceShared,
            BookingState::PaymentChoice,
        ]),
        guests in arb_guests(),
        room_type in arb_room_type(),
        bad in arb_gibberish(),
    ) {
        let mut booking = BookingData::default();
        booking.record(crate::booking::BookingField::GuestCount(guests));
        booking.record(crate::booking::BookingField::RoomType(room_type));
        booking.record(crate::booking::BookingField::Quote(resolve(guests, room_type)));

        let result = transition(state, &booking, &FlowContext::default(), Event::UserText { text: bad }).unwrap();
        prop_assert_eq!(result.new_state, state);
        prop_assert_eq!(result.writes().count(), 0);
        prop_assert_eq!(result.effects.len(), 1);
    }

    #[test]
    fn prop_price_is_deterministic(guests in arb_guests(), room_type in arb_room_type()) {
        let first = resolve(guests, room_type);
        let second = resolve(guests, room_type);
        prop_assert_eq!(first, second);
        prop_assert!(first.price > 0);
        prop_assert!(first.tier.capacity() >= guests.get());
    }

    #[test]
    fn prop_images_never_write(state in arb_state(), guests in arb_guests(), room_type in arb_room_type()) {
        let mut booking = BookingData::default();
        booking.record(crate::booking::BookingField::GuestCount(guests));
        booking.record(crate::booking::BookingField::RoomType(room_type));
        booking.record(crate::booking::BookingField::Quote(resolve(guests, room_type)));

        let result = transition(state, &booking, &FlowContext::default(), Event::UserImage).unwrap();
        prop_assert_eq!(result.writes().count(), 0);
        if state != BookingState::WaitingScreenshot {
            prop_assert_eq!(result.new_state, state);
        }
    }

    #[test]
    fn prop_conversations_keep_invariants(events in prop::collection::vec(arb_event(), 0..60)) {
        let mut state = BookingState::Start;
        let mut booking = BookingData::default();

        for event in events {
            let before = presence(&booking);
            state = step(state, &mut booking, event);
            let after = presence(&booking);

            // Fields never disappear
            for (was, is) in before.iter().zip(after.iter()) {
                prop_assert!(!*was || *is);
            }

            prop_assert!(BookingState::ALL.contains(&state));

            if state.requires_quote() {
                prop_assert!(booking.guest_count.is_some());
                prop_assert!(booking.room_type.is_some());
                prop_assert!(booking.location.is_some());
                prop_assert!(booking.price.is_some());
            }

            if let (Some(guests), Some(room_type), Some(price)) =
                (booking.guest_count, booking.room_type, booking.price)
            {
                prop_assert_eq!(resolve(guests, room_type).price, price);
            }
        }
    }
}
