mod api;
mod engine;
mod error;
mod notifications;
mod reminders;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use clap::Parser;
use shared::{Clock, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use engine::BookingEngine;
use notifications::InMemoryNotificationSender;
use reminders::ReminderScheduler;

#[derive(Parser)]
#[command(name = "booking-service")]
struct Args {
    #[arg(long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Seconds between two reminder cycles.
    #[arg(long, env = "REMINDER_INTERVAL_SECS", default_value = "43200")]
    reminder_interval_secs: u64,

    /// How far ahead, in hours, a time slot is considered for a reminder.
    #[arg(long, env = "REMINDER_WINDOW_HOURS", default_value = "72")]
    reminder_window_hours: i64,
}

/// Upper bound for the reminder look-ahead.
const MAX_REMINDER_WINDOW_HOURS: i64 = 24 * 366;

impl Args {
    fn reminder_interval(&self) -> Result<Duration> {
        if self.reminder_interval_secs == 0 {
            anyhow::bail!("Reminder interval must be at least one second");
        }
        Ok(Duration::from_secs(self.reminder_interval_secs))
    }

    fn reminder_window(&self) -> Result<chrono::Duration> {
        let hours = self.reminder_window_hours;
        if !(1..=MAX_REMINDER_WINDOW_HOURS).contains(&hours) {
            anyhow::bail!(
                "Reminder window must be between 1 and {} hours, got {}",
                MAX_REMINDER_WINDOW_HOURS,
                hours
            );
        }
        Ok(chrono::Duration::hours(hours))
    }
}

async fn shutdown_signal(shutdown: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
    let _ = shutdown.send(true);
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();
    let reminder_interval = args.reminder_interval()?;
    let reminder_window = args.reminder_window()?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let engine = Arc::new(BookingEngine::new(clock.clone()));
    let notifications = Arc::new(InMemoryNotificationSender::new(clock.clone()));

    let scheduler = ReminderScheduler::new(
        engine.clone(),
        notifications.clone(),
        clock,
        reminder_interval,
        reminder_window,
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reminder_task = tokio::spawn(async move {
        scheduler.run(shutdown_rx).await;
    });

    let app_state = api::AppState {
        engine,
        notifications,
    };

    let app = api::create_router(app_state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port)).await?;

    info!("Booking service web server started on port {}", args.port);
    info!(
        "Booking service ready to accept HTTP requests at http://0.0.0.0:{}/api",
        args.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    reminder_task.await?;
    info!("Booking service stopped");

    Ok(())
}
