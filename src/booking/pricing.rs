//! Room tiers and the static price table

use super::types::{GuestCount, RoomType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomTier {
    Standard,
    Deluxe,
    Suite,
}

impl RoomTier {
    /// Tier offered for a party size. Parties of three and four share the suite.
    pub fn for_guests(guests: GuestCount) -> Self {
        match guests.get() {
            1 => RoomTier::Standard,
            2 => RoomTier::Deluxe,
            3 | 4 => RoomTier::Suite,
            other => unreachable!("GuestCount outside 1..=4: {other}"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RoomTier::Standard => "Standard Room",
            RoomTier::Deluxe => "Deluxe Room",
            RoomTier::Suite => "Suite",
        }
    }

    pub fn capacity(self) -> u8 {
        match self {
            RoomTier::Standard => 2,
            RoomTier::Deluxe => 3,
            RoomTier::Suite => 4,
        }
    }

    pub fn amenities(self) -> &'static [&'static str] {
        match self {
            RoomTier::Standard => &["AC", "WiFi", "TV", "Bathroom"],
            RoomTier::Deluxe => &["AC", "WiFi", "TV", "Bathroom", "Mini Bar"],
            RoomTier::Suite => &["AC", "WiFi", "TV", "Bathroom", "Mini Bar", "Living Area"],
        }
    }

    /// Price in rupees
    pub fn price(self, room_type: RoomType) -> u32 {
        match (self, room_type) {
            (RoomTier::Standard, RoomType::FullDay) => 699,
            (RoomTier::Standard, RoomType::Hourly) => 150,
            (RoomTier::Deluxe, RoomType::FullDay) => 999,
            (RoomTier::Deluxe, RoomType::Hourly) => 200,
            (RoomTier::Suite, RoomType::FullDay) => 1299,
            (RoomTier::Suite, RoomType::Hourly) => 250,
        }
    }
}

/// Resolved tier and price for a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub tier: RoomTier,
    pub price: u32,
}

pub fn resolve(guests: GuestCount, room_type: RoomType) -> Quote {
    let tier = RoomTier::for_guests(guests);
    Quote {
        tier,
        price: tier.price(room_type),
    }
}
