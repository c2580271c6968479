//! Input parsers for each intake answer
//!
//! Every parser is pure and returns `None` on rejection; the state machine
//! decides which message to send back.

use super::types::{GuestCount, PaymentMethod, RoomType, StayDate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Earliest accepted year for a stay date
const MIN_YEAR: i32 = 2025;

const GUEST_TOKENS: [(&[&str], u8); 4] = [
    (&["1", "one", "एक"], 1),
    (&["2", "two", "दो"], 2),
    (&["3", "three", "तीन"], 3),
    (&["4", "four", "चार"], 4),
];

const FULL_DAY_TOKENS: &[&str] = &["1", "fullday", "24", "24hour", "पूरा दिन"];
const HOURLY_TOKENS: &[&str] = &["2", "hourly", "6", "6hour", "घंटे"];

const ONLINE_TOKENS: &[&str] = &["1", "online", "qr"];
const AT_HOTEL_TOKENS: &[&str] = &["2", "hotel", "at_hotel", "होटल"];

fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Parse `DD-MM-YYYY`. Components may omit leading zeros.
pub fn parse_stay_date(input: &str) -> Option<StayDate> {
    let parts: Vec<&str> = input.trim().split('-').collect();
    let [day, month, year] = parts.as_slice() else {
        return None;
    };

    let day: u32 = day.trim().parse().ok()?;
    let month: u32 = month.trim().parse().ok()?;
    let year: i32 = year.trim().parse().ok()?;

    if !(1..=31).contains(&day) || !(1..=12).contains(&month) || year < MIN_YEAR {
        return None;
    }

    // Catches 31-04 and 29-02 in non-leap years
    NaiveDate::from_ymd_opt(year, month, day).map(StayDate::new)
}

pub fn parse_guest_count(input: &str) -> Option<GuestCount> {
    let token = normalize(input);
    GUEST_TOKENS
        .iter()
        .find(|(tokens, _)| tokens.contains(&token.as_str()))
        .and_then(|(_, count)| GuestCount::new(*count))
}

pub fn parse_room_type(input: &str) -> Option<RoomType> {
    let token = normalize(input);
    if FULL_DAY_TOKENS.contains(&token.as_str()) {
        Some(RoomType::FullDay)
    } else if HOURLY_TOKENS.contains(&token.as_str()) {
        Some(RoomType::Hourly)
    } else {
        None
    }
}

pub fn parse_payment_method(input: &str) -> Option<PaymentMethod> {
    let token = normalize(input);
    if ONLINE_TOKENS.contains(&token.as_str()) {
        Some(PaymentMethod::Online)
    } else if AT_HOTEL_TOKENS.contains(&token.as_str()) {
        Some(PaymentMethod::AtHotel)
    } else {
        None
    }
}

/// Any location of at least two characters after trimming
pub fn validate_location(input: &str) -> Option<String> {
    let trimmed = input.trim();
    (trimmed.chars().count() >= 2).then(|| trimmed.to_string())
}

/// How a check-out date must relate to the stored check-in date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutOrder {
    /// No ordering constraint
    #[default]
    Any,
    /// Check-out on or after check-in
    SameOrLater,
    /// Check-out strictly after check-in
    Later,
}

impl CheckoutOrder {
    /// Without a stored check-in there is nothing to compare against.
    pub fn permits(self, checkin: Option<StayDate>, checkout: StayDate) -> bool {
        let Some(checkin) = checkin else {
            return true;
        };
        match self {
            CheckoutOrder::Any => true,
            CheckoutOrder::SameOrLater => checkout >= checkin,
            CheckoutOrder::Later => checkout > checkin,
        }
    }
}

impl FromStr for CheckoutOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" => Ok(CheckoutOrder::Any),
            "same_or_later" => Ok(CheckoutOrder::SameOrLater),
            "later" => Ok(CheckoutOrder::Later),
            other => Err(format!("unknown checkout order: {other}")),
        }
    }
}
