//! Environment configuration

use crate::booking::{CheckoutOrder, PaymentSettings};
use crate::reminder::ReminderPolicy;
use crate::state_machine::FlowContext;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_API_BASE: &str = "https://graph.facebook.com/v18.0";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Settings for the WhatsApp Cloud API client
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub phone_number_id: String,
    pub api_token: String,
    pub api_base: String,
    pub send_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderConfig {
    pub enabled: bool,
    pub sweep_every: Duration,
    pub inactive_after: Duration,
    pub payment_after: Duration,
    pub max_reminders: u32,
}

impl ReminderConfig {
    pub fn policy(&self) -> ReminderPolicy {
        ReminderPolicy {
            inactive_after: self.inactive_after,
            payment_after: self.payment_after,
            max_inactive: self.max_reminders,
            max_payment: self.max_reminders,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub verify_token: String,
    pub whatsapp: WhatsAppConfig,
    pub db_path: Option<PathBuf>,
    pub reminders: ReminderConfig,
    pub checkout_order: CheckoutOrder,
    pub payment: PaymentSettings,
    pub handoff_webhook_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        let mut require = |name: &str| {
            let value = get(name);
            if value.is_none() {
                missing.push(name.to_string());
            }
            value.unwrap_or_default()
        };
        let phone_number_id = require("WHATSAPP_PHONE_NUMBER_ID");
        let api_token = require("WHATSAPP_API_TOKEN");
        let verify_token = require("WEBHOOK_VERIFY_TOKEN");
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let defaults = PaymentSettings::default();
        Ok(Self {
            port: parse_or("PORT", get("PORT"), 3000)?,
            verify_token,
            whatsapp: WhatsAppConfig {
                phone_number_id,
                api_token,
                api_base: get("WHATSAPP_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                send_timeout: secs("WHATSAPP_SEND_TIMEOUT_SECS", get("WHATSAPP_SEND_TIMEOUT_SECS"), 10)?,
            },
            db_path: get("BOOKING_DB_PATH").map(PathBuf::from),
            reminders: ReminderConfig {
                enabled: flag("REMINDERS_ENABLED", get("REMINDERS_ENABLED"), true)?,
                sweep_every: secs("REMINDER_SWEEP_SECS", get("REMINDER_SWEEP_SECS"), 300)?,
                inactive_after: secs("REMINDER_INACTIVE_SECS", get("REMINDER_INACTIVE_SECS"), 3600)?,
                payment_after: secs("REMINDER_PAYMENT_SECS", get("REMINDER_PAYMENT_SECS"), 1800)?,
                max_reminders: parse_or("REMINDER_MAX", get("REMINDER_MAX"), 2)?,
            },
            checkout_order: parse_or("CHECKOUT_ORDER", get("CHECKOUT_ORDER"), CheckoutOrder::Any)?,
            payment: PaymentSettings {
                upi_id: get("PAYMENT_UPI_ID").unwrap_or(defaults.upi_id),
                payee_name: get("PAYMENT_PAYEE_NAME").unwrap_or(defaults.payee_name),
            },
            handoff_webhook_url: get("HANDOFF_WEBHOOK_URL"),
        })
    }

    pub fn flow_context(&self) -> FlowContext {
        FlowContext {
            checkout_order: self.checkout_order,
            payment: self.payment.clone(),
        }
    }
}

fn parse_or<T: FromStr>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

fn secs(var: &'static str, raw: Option<String>, default: u64) -> Result<Duration, ConfigError> {
    let raw_copy = raw.clone();
    let n: u64 = parse_or(var, raw, default)?;
    if n == 0 {
        return Err(ConfigError::Invalid {
            var,
            value: raw_copy.unwrap_or_default(),
        });
    }
    Ok(Duration::from_secs(n))
}

fn flag(var: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = raw else {
        return Ok(default);
    };
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { var, value }),
    }
}
