//! Booking flow states

use crate::booking::{CheckoutOrder, PaymentSettings};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Step of the intake conversation a session occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum BookingState {
    /// Fresh session; the first message only triggers the greeting
    #[default]
    Start,
    Checkin,
    Checkout,
    GuestCount,
    StayType,
    Location,
    /// Quote sent, waiting for a payment choice
    PriceShared,
    /// Accepted like `PriceShared`; the flow never enters it on its own
    PaymentChoice,
    /// Online payment chosen, waiting for a receipt image
    WaitingScreenshot,
    /// Operator has been (or is being) notified
    HumanHandoff,
    /// Terminal
    Confirmed,
}

impl BookingState {
    pub const ALL: [BookingState; 11] = [
        BookingState::Start,
        BookingState::Checkin,
        BookingState::Checkout,
        BookingState::GuestCount,
        BookingState::StayType,
        BookingState::Location,
        BookingState::PriceShared,
        BookingState::PaymentChoice,
        BookingState::WaitingScreenshot,
        BookingState::HumanHandoff,
        BookingState::Confirmed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BookingState::Start => "START",
            BookingState::Checkin => "CHECKIN",
            BookingState::Checkout => "CHECKOUT",
            BookingState::GuestCount => "GUEST_COUNT",
            BookingState::StayType => "STAY_TYPE",
            BookingState::Location => "LOCATION",
            BookingState::PriceShared => "PRICE_SHARED",
            BookingState::PaymentChoice => "PAYMENT_CHOICE",
            BookingState::WaitingScreenshot => "WAITING_SCREENSHOT",
            BookingState::HumanHandoff => "HUMAN_HANDOFF",
            BookingState::Confirmed => "CONFIRMED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BookingState::Confirmed)
    }

    /// States the reminder sweep leaves alone
    pub fn reminders_suspended(self) -> bool {
        self.is_terminal() || self == BookingState::HumanHandoff
    }

    /// Whether the quote fields must already be populated
    #[allow(dead_code)] // Used in property tests
    pub fn requires_quote(self) -> bool {
        matches!(
            self,
            BookingState::PriceShared
                | BookingState::PaymentChoice
                | BookingState::WaitingScreenshot
                | BookingState::HumanHandoff
                | BookingState::Confirmed
        )
    }
}

impl fmt::Display for BookingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownState(pub String);

impl fmt::Display for UnknownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown booking state: {}", self.0)
    }
}

impl std::error::Error for UnknownState {}

impl FromStr for BookingState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        BookingState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}

impl Serialize for BookingState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Unknown, null or missing states decode to `Start`
impl<'de> Deserialize<'de> for BookingState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .and_then(|s| match s.parse() {
                Ok(state) => Some(state),
                Err(e) => {
                    tracing::warn!(error = %e, "Healing unrecognised state to START");
                    None
                }
            })
            .unwrap_or_default())
    }
}

/// Static settings the transition function reads
#[derive(Debug, Clone, Default)]
pub struct FlowContext {
    pub checkout_order: CheckoutOrder,
    pub payment: PaymentSettings,
}
