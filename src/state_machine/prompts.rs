//! Guest-facing message catalogue (Hindi/Hinglish)

use super::state::BookingState;
use super::transition::TransitionError;
use crate::booking::{BookingData, Quote, RoomType};

pub const GREETING: &str = "🙏 नमस्ते!

होटल बुकिंग के लिए आपका स्वागत है।
आपकी बुकिंग को पूरा करने में हमें खुशी होगी।

कृपया अपनी चेक-इन डेट बताएं (DD-MM-YYYY format में):";

pub const CHECKIN_PROMPT: &str = "कृपया अपनी चेक-इन डेट बताएं (DD-MM-YYYY format में):";

pub const CHECKOUT_PROMPT: &str = "✅ धन्यवाद!

अब कृपया अपनी चेक-आउट डेट बताएं (DD-MM-YYYY format में):";

pub const GUEST_COUNT_PROMPT: &str = "✅ शानदार!

कितने लोग ठहरेंगे? कृपया अपना विकल्प चुनें:

1️⃣ 1 मेहमान
2️⃣ 2 मेहमान
3️⃣ 3 मेहमान
4️⃣ 4 मेहमान";

pub const ROOM_TYPE_PROMPT: &str = "✅ बहुत अच्छा!

कृपया कमरे का प्रकार चुनें:

1️⃣ 24 घंटे की स्टे (Full Day)
2️⃣ 6 घंटे की स्टे (Hourly Room)";

pub const LOCATION_PROMPT: &str = "✅ धन्यवाद!

अपने पसंदीदा इलाके या लैंडमार्क का नाम बताएं:

उदाहरण: Bandra, Andheri, Airport, Railway Station, etc.";

pub const QR_MESSAGE: &str = "✅ धन्यवाद!

नीचे QR Code से payment पूरा करें। 👇

Payment के बाद कृपया Payment Receipt/Screenshot यहाँ भेजें। 📸";

pub const QR_CAPTION: &str = "Payment QR Code - scan to pay";

pub const SCREENSHOT_INSTRUCTIONS: &str = "✅ Payment पूरा हो गई?

कृपया Payment Receipt का Screenshot यहाँ भेजें। 📸";

pub const SCREENSHOT_RECEIVED: &str = "🎉 धन्यवाद!

आपकी Payment Receipt प्राप्त हुई।
हमारा टीम आपसे कुछ ही मिनटों में संपर्क करेगा।

📞 होटल टीम से कॉल के लिए तैयार रहें।";

pub const HUMAN_HANDOFF: &str = "📞 होटल टीम से संपर्क

आपकी बुकिंग की जानकारी होटल टीम को भेज दी गई है।
कुछ ही मिनटों में आपको कॉल आएगा।

धन्यवाद! 🙏";

pub const INVALID_INPUT: &str = "❌ क्षमा करें!

कृपया सही विकल्प चुनें। नीचे दिए गए विकल्पों में से कोई एक चुनें।";

pub const INVALID_DATE: &str = "❌ क्षमा करें!

कृपया सही Date Format में भेजें (DD-MM-YYYY)।
उदाहरण: 25-12-2025";

pub const IMAGE_IN_WRONG_STATE: &str = "📸 एक क्षण!

अभी तो हमें Image की जरूरत नहीं है।
कृपया आगे बढ़ने के लिए नीचे दिया गया जवाब दें:";

pub const TEXT_IN_IMAGE_STATE: &str = "❌ कृपया Screenshot भेजें!

हमें Payment Receipt का Screenshot चाहिए।
कुछ भी टाइप न करें, सीधे Image भेजें। 📸";

pub const REMIND_PAYMENT: &str = "⏰ Gentle Reminder

अभी तक Payment का Screenshot नहीं मिला।
कृपया Payment पूरा करने के बाद Screenshot भेजें। 📸";

pub const REMIND_BOOKING: &str = "⏰ Gentle Reminder

आपकी बुकिंग अभी अधूरी है।
कृपया अपनी यात्रा की जानकारी पूरी करने में हमें मदद करें। 🏨";

pub const APOLOGY: &str = "❌ क्षमा करें!

एक तकनीकी समस्या हुई है।
कृपया दोबारा कोशिश करें।";

/// Two catalogue entries sent as one message
pub fn join(notice: &str, prompt: &str) -> String {
    format!("{notice}\n\n{prompt}")
}

pub fn price_quote(room_type: RoomType, quote: Quote) -> String {
    format!(
        "✅ बहुत अच्छा!

आपके लिए उपलब्ध:

🏨 {room}
👥 {capacity} मेहमान तक
✨ {amenities}
💰 Price: ₹{price}
📅 {stay}

कृपया पेमेंट का तरीका चुनें:

1️⃣ Online Payment (QR Code)
2️⃣ Hotel पर Payment करें",
        room = quote.tier.name(),
        capacity = quote.tier.capacity(),
        amenities = quote.tier.amenities().join(", "),
        price = quote.price,
        stay = room_type.stay_label(),
    )
}

pub fn booking_confirmed(booking: &BookingData) -> String {
    fn or_dash<T: ToString>(value: Option<T>) -> String {
        value.map_or_else(|| "-".to_string(), |v| v.to_string())
    }

    format!(
        "✅ आपकी बुकिंग Confirm हो गई!

Booking Details:
- Check-in: {checkin}
- Check-out: {checkout}
- Guests: {guests}
- Room: {room}
- Total Price: ₹{price}

होटल टीम आपसे जल्द संपर्क करेगा। 📞",
        checkin = or_dash(booking.checkin_date),
        checkout = or_dash(booking.checkout_date),
        guests = or_dash(booking.guest_count),
        room = or_dash(booking.room_tier.map(|t| t.name())),
        price = or_dash(booking.price),
    )
}

/// The quote stored on the booking, re-rendered without recomputing
pub fn stored_quote(state: BookingState, booking: &BookingData) -> Result<String, TransitionError> {
    let room_type = booking
        .room_type
        .ok_or(TransitionError::MissingField { state, field: "room_type" })?;
    let quote = booking
        .quote()
        .ok_or(TransitionError::MissingField { state, field: "price" })?;
    Ok(price_quote(room_type, quote))
}

/// What the guest is currently being asked
pub fn prompt_for(state: BookingState, booking: &BookingData) -> Result<String, TransitionError> {
    let prompt = match state {
        BookingState::Start => GREETING,
        BookingState::Checkin => CHECKIN_PROMPT,
        BookingState::Checkout => CHECKOUT_PROMPT,
        BookingState::GuestCount => GUEST_COUNT_PROMPT,
        BookingState::StayType => ROOM_TYPE_PROMPT,
        BookingState::Location => LOCATION_PROMPT,
        BookingState::PriceShared | BookingState::PaymentChoice => {
            return stored_quote(state, booking);
        }
        BookingState::WaitingScreenshot => SCREENSHOT_INSTRUCTIONS,
        BookingState::HumanHandoff => HUMAN_HANDOFF,
        BookingState::Confirmed => return Ok(booking_confirmed(booking)),
    };
    Ok(prompt.to_string())
}
