//! Booking data collected during the intake conversation
//!
//! Typed values, the input parsers that produce them, and the static room
//! price table.

mod payment;
mod pricing;
mod types;
mod validate;

pub use payment::PaymentSettings;
pub use pricing::{resolve, Quote};
pub use types::{BookingData, BookingField, PaymentMethod, RoomType};
pub use validate::{
    parse_guest_count, parse_payment_method, parse_room_type, parse_stay_date, validate_location,
    CheckoutOrder,
};

#[cfg(test)]
pub use pricing::RoomTier;
#[cfg(test)]
pub use types::{GuestCount, StayDate};
