//! Typed booking values

use super::pricing::{Quote, RoomTier};
use chrono::NaiveDate;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Wire and display format for stay dates
pub const DATE_FORMAT: &str = "%d-%m-%Y";

// ============================================================================
// Scalar values
// ============================================================================

/// Number of guests. Construction guarantees the value is within 1..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct GuestCount(u8);

impl GuestCount {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 4;

    pub fn new(count: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&count).then_some(Self(count))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for GuestCount {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "guest count must be within {}..={}, got {value}",
                Self::MIN,
                Self::MAX
            )
        })
    }
}

impl From<GuestCount> for u8 {
    fn from(count: GuestCount) -> Self {
        count.0
    }
}

impl fmt::Display for GuestCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Length of stay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    /// 24 hour stay
    FullDay,
    /// 6 hour stay
    Hourly,
}

impl RoomType {
    /// Stay length as shown to the guest
    pub fn stay_label(self) -> &'static str {
        match self {
            RoomType::FullDay => "24 घंटे",
            RoomType::Hourly => "6 घंटे",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Pay now by scanning a UPI QR code
    Online,
    /// Pay on arrival
    AtHotel,
}

impl PaymentMethod {
    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::Online => "Online Payment",
            PaymentMethod::AtHotel => "Hotel Payment",
        }
    }
}

/// A real calendar date, rendered as `DD-MM-YYYY`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StayDate(NaiveDate);

impl StayDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for StayDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl Serialize for StayDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StayDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, DATE_FORMAT)
            .map(StayDate)
            .map_err(D::Error::custom)
    }
}

// ============================================================================
// Booking record
// ============================================================================

/// Partial booking. Fields fill in as the conversation advances and are only
/// cleared by dropping the whole session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingData {
    pub checkin_date: Option<StayDate>,
    pub checkout_date: Option<StayDate>,
    pub guest_count: Option<GuestCount>,
    pub room_type: Option<RoomType>,
    pub location: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub room_tier: Option<RoomTier>,
    pub price: Option<u32>,
}

/// A single accepted answer, written into [`BookingData`] by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingField {
    CheckinDate(StayDate),
    CheckoutDate(StayDate),
    GuestCount(GuestCount),
    RoomType(RoomType),
    Location(String),
    /// Derived tier and price, written together
    Quote(Quote),
    PaymentMethod(PaymentMethod),
}

impl BookingData {
    /// Record an accepted answer. There is deliberately no way to unset a field.
    pub fn record(&mut self, field: BookingField) {
        match field {
            BookingField::CheckinDate(date) => self.checkin_date = Some(date),
            BookingField::CheckoutDate(date) => self.checkout_date = Some(date),
            BookingField::GuestCount(count) => self.guest_count = Some(count),
            BookingField::RoomType(room_type) => self.room_type = Some(room_type),
            BookingField::Location(location) => self.location = Some(location),
            BookingField::Quote(quote) => {
                self.room_tier = Some(quote.tier);
                self.price = Some(quote.price);
            }
            BookingField::PaymentMethod(method) => self.payment_method = Some(method),
        }
    }

    /// The stored quote, if both tier and price are present
    pub fn quote(&self) -> Option<Quote> {
        Some(Quote {
            tier: self.room_tier?,
            price: self.price?,
        })
    }

    /// Number of populated fields
    pub fn filled(&self) -> usize {
        [
            self.checkin_date.is_some(),
            self.checkout_date.is_some(),
            self.guest_count.is_some(),
            self.room_type.is_some(),
            self.location.is_some(),
            self.payment_method.is_some(),
            self.room_tier.is_some(),
            self.price.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}
