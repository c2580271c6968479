//! UPI payment details for the online payment path

use reqwest::Url;

const QR_SERVICE: &str = "https://api.qrserver.com/v1/create-qr-code/";
const QR_SIZE: &str = "300x300";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSettings {
    pub upi_id: String,
    pub payee_name: String,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            upi_id: "merchant@upi".to_string(),
            payee_name: "HotelBooking".to_string(),
        }
    }
}

impl PaymentSettings {
    /// `upi://pay` deep link for the given amount in rupees
    pub fn upi_link(&self, amount: u32) -> String {
        format!(
            "upi://pay?pa={upi}&pn={payee}&am={amount}&tn={payee}",
            upi = self.upi_id,
            payee = self.payee_name
        )
    }

    /// Image URL of a QR code that encodes [`Self::upi_link`]
    pub fn qr_code_url(&self, amount: u32) -> String {
        let link = self.upi_link(amount);
        match Url::parse_with_params(QR_SERVICE, [("size", QR_SIZE), ("data", link.as_str())]) {
            Ok(url) => url.into(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to build QR code URL");
                QR_SERVICE.to_string()
            }
        }
    }
}
