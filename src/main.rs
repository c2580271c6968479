//! Hotel booking intake over WhatsApp
//!
//! Guides a guest through a fixed booking conversation, quotes a price,
//! collects the payment choice and hands the booking to a human operator.

mod api;
mod booking;
mod config;
mod db;
mod notify;
mod reminder;
mod runtime;
mod session;
mod state_machine;
mod whatsapp;

use api::{create_router, AppState};
use config::AppConfig;
use db::SqliteSessionStore;
use notify::{LogNotificationSink, WebhookNotificationSink};
use reminder::ReminderScheduler;
use runtime::{BookingRuntime, NotificationSink, Transport};
use session::{MemorySessionStore, SessionStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use whatsapp::WhatsAppClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hotel_intake=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    // Configuration
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    // Session store
    let store: Arc<dyn SessionStore> = match &config.db_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            tracing::info!(path = %path.display(), "Opening session database");
            Arc::new(SqliteSessionStore::open(path)?)
        }
        None => {
            tracing::warn!("BOOKING_DB_PATH not set, sessions are kept in memory only");
            Arc::new(MemorySessionStore::new())
        }
    };

    // Outbound collaborators
    let transport: Arc<dyn Transport> = Arc::new(WhatsAppClient::new(&config.whatsapp)?);
    let notifier: Arc<dyn NotificationSink> = match &config.handoff_webhook_url {
        Some(url) => {
            tracing::info!(url = %url, "Handoff notifications go to webhook");
            Arc::new(WebhookNotificationSink::new(
                url.clone(),
                config.whatsapp.send_timeout,
            )?)
        }
        None => Arc::new(LogNotificationSink),
    };

    let runtime = Arc::new(BookingRuntime::new(
        config.flow_context(),
        store,
        transport,
        notifier,
    ));

    // Reminders
    let cancel = CancellationToken::new();
    let reminders = if config.reminders.enabled {
        let scheduler = Arc::new(ReminderScheduler::new(
            runtime.clone(),
            config.reminders.policy(),
        ));
        Some(scheduler.spawn(config.reminders.sweep_every, cancel.clone()))
    } else {
        tracing::info!("Reminders disabled");
        None
    };

    let state = AppState::new(runtime, &config.verify_token, config.reminders.enabled);
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Hotel intake listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutting down");
            shutdown.cancel();
        })
        .await?;

    cancel.cancel();
    if let Some(handle) = reminders {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Reminder task ended abnormally");
        }
    }

    Ok(())
}
