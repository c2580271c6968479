//! Pure state transition function
//!
//! Given the current state, the booking collected so far and one event,
//! decide the next state and the effects to execute. Rejected input never
//! produces a booking write and never changes the state.

use super::effect::OutboundIntent;
use super::prompts::{self, join};
use super::{BookingState, Effect, Event, FlowContext};
use crate::booking::{
    parse_guest_count, parse_payment_method, parse_room_type, parse_stay_date, resolve,
    validate_location, BookingData, BookingField, PaymentMethod,
};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub new_state: BookingState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: BookingState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    /// Stay in `state` and tell the guest
    fn reprompt(state: BookingState, body: String) -> Self {
        Self::new(state).with_effect(Effect::send_text(body))
    }

    /// Booking writes, in order
    pub fn writes(&self) -> impl Iterator<Item = &Effect> {
        self.effects.iter().filter(|e| e.is_write())
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Malformed event: {0}")]
    MalformedEvent(String),
    #[error("Session in {state} is missing {field}")]
    MissingField {
        state: BookingState,
        field: &'static str,
    },
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Same inputs always produce the same outputs; no I/O happens here.
pub fn transition(
    state: BookingState,
    booking: &BookingData,
    context: &FlowContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Confirmation
        // ============================================================
        (BookingState::HumanHandoff, Event::ConfirmationSent) => {
            Ok(TransitionResult::new(BookingState::Confirmed))
        }

        (other, Event::ConfirmationSent) => Err(TransitionError::InvalidTransition(format!(
            "confirmation delivered while in {other}"
        ))),

        // ============================================================
        // Images
        // ============================================================
        (BookingState::WaitingScreenshot, Event::UserImage) => {
            Ok(TransitionResult::new(BookingState::HumanHandoff)
                .with_effect(Effect::send_text(prompts::SCREENSHOT_RECEIVED))
                .with_effect(Effect::NotifyHandoff)
                .with_effect(Effect::SendConfirmation(OutboundIntent::text(
                    prompts::booking_confirmed(booking),
                ))))
        }

        // Anywhere else an image changes nothing
        (other, Event::UserImage) => {
            let prompt = prompts::prompt_for(other, booking)?;
            Ok(TransitionResult::reprompt(
                other,
                join(prompts::IMAGE_IN_WRONG_STATE, &prompt),
            ))
        }

        // ============================================================
        // Text
        // ============================================================
        (BookingState::Start, Event::UserText { .. }) => Ok(TransitionResult::new(
            BookingState::Checkin,
        )
        .with_effect(Effect::send_text(prompts::GREETING))),

        (BookingState::Checkin, Event::UserText { text }) => match parse_stay_date(&text) {
            Some(date) => Ok(TransitionResult::new(BookingState::Checkout)
                .with_effect(Effect::WriteBooking(BookingField::CheckinDate(date)))
                .with_effect(Effect::send_text(prompts::CHECKOUT_PROMPT))),
            None => Ok(TransitionResult::reprompt(
                state,
                join(prompts::INVALID_DATE, prompts::CHECKIN_PROMPT),
            )),
        },

        (BookingState::Checkout, Event::UserText { text }) => {
            match parse_stay_date(&text)
                .filter(|date| context.checkout_order.permits(booking.checkin_date, *date))
            {
                Some(date) => Ok(TransitionResult::new(BookingState::GuestCount)
                    .with_effect(Effect::WriteBooking(BookingField::CheckoutDate(date)))
                    .with_effect(Effect::send_text(prompts::GUEST_COUNT_PROMPT))),
                None => Ok(TransitionResult::reprompt(
                    state,
                    join(prompts::INVALID_DATE, prompts::CHECKOUT_PROMPT),
                )),
            }
        }

        (BookingState::GuestCount, Event::UserText { text }) => match parse_guest_count(&text) {
            Some(count) => Ok(TransitionResult::new(BookingState::StayType)
                .with_effect(Effect::WriteBooking(BookingField::GuestCount(count)))
                .with_effect(Effect::send_text(prompts::ROOM_TYPE_PROMPT))),
            None => Ok(TransitionResult::reprompt(
                state,
                join(prompts::INVALID_INPUT, prompts::GUEST_COUNT_PROMPT),
            )),
        },

        (BookingState::StayType, Event::UserText { text }) => match parse_room_type(&text) {
            Some(room_type) => Ok(TransitionResult::new(BookingState::Location)
                .with_effect(Effect::WriteBooking(BookingField::RoomType(room_type)))
                .with_effect(Effect::send_text(prompts::LOCATION_PROMPT))),
            None => Ok(TransitionResult::reprompt(
                state,
                join(prompts::INVALID_INPUT, prompts::ROOM_TYPE_PROMPT),
            )),
        },

        (BookingState::Location, Event::UserText { text }) => {
            let Some(location) = validate_location(&text) else {
                return Ok(TransitionResult::reprompt(
                    state,
                    join(prompts::INVALID_INPUT, prompts::LOCATION_PROMPT),
                ));
            };
            let guests = booking.guest_count.ok_or(TransitionError::MissingField {
                state,
                field: "guest_count",
            })?;
            let room_type = booking.room_type.ok_or(TransitionError::MissingField {
                state,
                field: "room_type",
            })?;

            let quote = resolve(guests, room_type);
            Ok(TransitionResult::new(BookingState::PriceShared)
                .with_effect(Effect::WriteBooking(BookingField::Location(location)))
                .with_effect(Effect::WriteBooking(BookingField::Quote(quote)))
                .with_effect(Effect::send_text(prompts::price_quote(room_type, quote))))
        }

        (BookingState::PriceShared | BookingState::PaymentChoice, Event::UserText { text }) => {
            let Some(method) = parse_payment_method(&text) else {
                let quote = prompts::stored_quote(state, booking)?;
                return Ok(TransitionResult::reprompt(
                    state,
                    join(prompts::INVALID_INPUT, &quote),
                ));
            };
            let record = [
                Effect::WriteBooking(BookingField::PaymentMethod(method)),
                Effect::RecordPaymentInitiated,
            ];

            match method {
                PaymentMethod::Online => {
                    let price = booking.price.ok_or(TransitionError::MissingField {
                        state,
                        field: "price",
                    })?;
                    Ok(TransitionResult::new(BookingState::WaitingScreenshot)
                        .with_effects(record)
                        .with_effect(Effect::send_text(prompts::QR_MESSAGE))
                        .with_effect(Effect::Send(OutboundIntent::image(
                            context.payment.qr_code_url(price),
                            Some(prompts::QR_CAPTION.to_string()),
                        )))
                        .with_effect(Effect::send_text(prompts::SCREENSHOT_INSTRUCTIONS)))
                }
                PaymentMethod::AtHotel => Ok(TransitionResult::new(BookingState::HumanHandoff)
                    .with_effects(record)
                    .with_effect(Effect::send_text(prompts::HUMAN_HANDOFF))
                    .with_effect(Effect::NotifyHandoff)
                    .with_effect(Effect::SendConfirmation(OutboundIntent::text(
                        prompts::booking_confirmed(booking),
                    )))),
            }
        }

        (BookingState::WaitingScreenshot, Event::UserText { .. }) => Ok(TransitionResult::reprompt(
            state,
            join(prompts::TEXT_IN_IMAGE_STATE, prompts::SCREENSHOT_INSTRUCTIONS),
        )),

        (BookingState::HumanHandoff, Event::UserText { .. }) => Ok(TransitionResult::reprompt(
            state,
            prompts::HUMAN_HANDOFF.to_string(),
        )),

        (BookingState::Confirmed, Event::UserText { .. }) => Ok(TransitionResult::reprompt(
            state,
            prompts::booking_confirmed(booking),
        )),
    }
}
