//! # slotfeed
//!
//! Follows a booking feed, logs every event and notification, and prints
//! the collection when it stops (Ctrl-C or reconnect exhaustion).

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use slotfeed_client::{
    ConnectionStatus, DisconnectReason, Endpoint, FeedClient, FeedObserver, HandlerResult,
    Notification, ObserverSet,
};
use slotfeed_core::logging::{init_json_subscriber, init_subscriber};
use slotfeed_core::{BookingRecord, DeletedBooking, FeedError};
use slotfeed_settings::{FeedSettings, load_settings_from_path, settings_path};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Booking feed follower.
#[derive(Parser, Debug)]
#[command(name = "slotfeed", about = "Follow a booking feed over WebSocket")]
struct Cli {
    /// Feed URL (overrides settings).
    #[arg(long)]
    url: Option<String>,

    /// Bearer token for the handshake.
    #[arg(long)]
    token: Option<String>,

    /// Settings file (defaults to `~/.slotfeed/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Reconnect attempts before giving up.
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Fixed delay between reconnect attempts, in milliseconds.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Log level or filter directive.
    #[arg(long)]
    log_level: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    /// Load the settings file, then apply command-line overrides.
    fn resolve_settings(&self) -> Result<FeedSettings> {
        let path = self.settings.clone().unwrap_or_else(settings_path);
        let mut settings = load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;

        if let Some(url) = &self.url {
            settings.endpoint.url.clone_from(url);
        }
        if let Some(token) = &self.token {
            settings.endpoint.token = Some(token.clone());
        }
        if let Some(max) = self.max_attempts {
            settings.reconnect.max_attempts = max;
        }
        if let Some(interval) = self.interval_ms {
            settings.reconnect.interval_ms = interval;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        if self.json_logs {
            settings.logging.json = true;
        }

        settings.validate().context("Invalid settings")?;
        Ok(settings)
    }
}

/// Logs feed activity and reports exhaustion to `main`.
struct LoggingObserver {
    exhausted: mpsc::UnboundedSender<u32>,
}

impl FeedObserver for LoggingObserver {
    fn on_connect(&self) -> HandlerResult {
        info!("feed connected");
        Ok(())
    }

    fn on_disconnect(&self, reason: &DisconnectReason) -> HandlerResult {
        info!(%reason, "feed disconnected");
        Ok(())
    }

    fn on_error(&self, error: &FeedError) -> HandlerResult {
        warn!(category = %error.category(), %error, "feed error");
        Ok(())
    }

    fn on_retry_exhausted(&self, attempts: u32) -> HandlerResult {
        let _ = self.exhausted.send(attempts);
        Ok(())
    }

    fn on_snapshot(&self, bookings: &[BookingRecord]) -> HandlerResult {
        info!(count = bookings.len(), "snapshot received");
        Ok(())
    }

    fn on_created(&self, record: &BookingRecord, bookings: &[BookingRecord]) -> HandlerResult {
        debug!(booking_id = %record.id, total = bookings.len(), "created");
        Ok(())
    }

    fn on_updated(&self, record: &BookingRecord, bookings: &[BookingRecord]) -> HandlerResult {
        debug!(booking_id = %record.id, total = bookings.len(), "updated");
        Ok(())
    }

    fn on_deleted(&self, deleted: &DeletedBooking, bookings: &[BookingRecord]) -> HandlerResult {
        debug!(booking_id = %deleted.id, total = bookings.len(), "deleted");
        Ok(())
    }

    fn on_notification(&self, notification: &Notification) -> HandlerResult {
        info!(
            level = %notification.level,
            title = notification.title.as_str(),
            "{}",
            notification.body
        );
        Ok(())
    }
}

fn summary_line(record: &BookingRecord) -> String {
    let customer = record
        .customer_name()
        .unwrap_or_else(|| slotfeed_client::notification::UNKNOWN_CUSTOMER.to_owned());
    let status = record.status.as_deref().unwrap_or("-");
    format!(
        "#{:<6} {} {}  {:<24} {:<24} [{}]",
        record.id.to_string(),
        record.booking_date,
        record.booking_time,
        record.service_name,
        customer,
        status
    )
}

fn print_summary(bookings: &[BookingRecord], status: ConnectionStatus) {
    println!(
        "{} booking(s), last state {} (phase {}, {} failed attempts)",
        bookings.len(),
        status.state,
        status.phase,
        status.attempts
    );
    for record in bookings {
        println!("  {}", summary_line(record));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.resolve_settings()?;

    if settings.logging.json {
        init_json_subscriber(&settings.logging.level);
    } else {
        init_subscriber(&settings.logging.level);
    }
    info!(url = settings.endpoint.url.as_str(), "starting slotfeed");

    let (exhausted_tx, mut exhausted_rx) = mpsc::unbounded_channel();
    let observers = ObserverSet::new().with(Arc::new(LoggingObserver {
        exhausted: exhausted_tx,
    }));
    let client = FeedClient::from_settings(&settings, observers);
    if !settings.client.auto_connect {
        client.connect(Endpoint::from(&settings.endpoint));
    }

    let gave_up = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("interrupted, shutting down");
            None
        }
        Some(attempts) = exhausted_rx.recv() => Some(attempts),
    };

    let bookings = client.bookings();
    let status = client.status();
    client.shutdown().await;
    print_summary(&bookings, status);

    if let Some(attempts) = gave_up {
        anyhow::bail!("feed unavailable after {attempts} reconnect attempts");
    }
    Ok(())
}
