use anyhow::Result;
use shared::{Clock, ReminderCandidate, UserProfile};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info};

use crate::engine::BookingEngine;
use crate::notifications::NotificationSender;

/// Periodically looks for under-subscribed time slots and asks interested,
/// not yet registered users to join.
pub struct ReminderScheduler {
    engine: Arc<BookingEngine>,
    sender: Arc<dyn NotificationSender>,
    clock: Arc<dyn Clock>,
    check_interval: Duration,
    notice_window: chrono::Duration,
}

impl ReminderScheduler {
    pub fn new(
        engine: Arc<BookingEngine>,
        sender: Arc<dyn NotificationSender>,
        clock: Arc<dyn Clock>,
        check_interval: Duration,
        notice_window: chrono::Duration,
    ) -> Self {
        Self {
            engine,
            sender,
            clock,
            check_interval,
            notice_window,
        }
    }

    /// Runs a cycle right away and then once per interval until `shutdown`
    /// flips or its sender goes away.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Time slot reminder service started with interval {:?}",
            self.check_interval
        );
        let mut interval = time::interval(self.check_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = shutdown.changed() => break,
            }

            let sent = self.process_reminders().await;
            if sent > 0 {
                info!("Reminder cycle sent {} reminders", sent);
            }
        }

        info!("Time slot reminder service stopped");
    }

    /// Processes every current candidate and returns how many reminders went
    /// out. A failing candidate is logged and skipped.
    pub async fn process_reminders(&self) -> usize {
        let now = self.clock.now();
        let threshold = now + self.notice_window;

        let candidates = self.engine.reminder_candidates(now, threshold);
        if candidates.is_empty() {
            debug!("No reminder needed at {}", now);
            return 0;
        }

        let mut sent = 0;
        for candidate in &candidates {
            match self.process_candidate(candidate).await {
                Ok(true) => sent += 1,
                Ok(false) => {}
                Err(e) => error!(
                    "Error processing reminder for time slot {}: {}",
                    candidate.time_slot.id, e
                ),
            }
        }
        sent
    }

    async fn process_candidate(&self, candidate: &ReminderCandidate) -> Result<bool> {
        let slot = &candidate.time_slot;
        let recipients = self.recipients_for(candidate)?;
        if recipients.is_empty() {
            debug!("No recipients available for reminder of time slot {}", slot.id);
            return Ok(false);
        }

        self.sender
            .send_reminder(slot, &candidate.field, &recipients)
            .await?;
        self.engine.mark_reminder_sent(slot.id);

        info!(
            "Reminder sent for time slot {} to {} users",
            slot.id,
            recipients.len()
        );
        Ok(true)
    }

    fn recipients_for(&self, candidate: &ReminderCandidate) -> Result<Vec<UserProfile>> {
        let participants: HashSet<_> = candidate
            .time_slot
            .registrations
            .iter()
            .map(|r| r.user_id)
            .collect();

        Ok(self
            .engine
            .users_interested_in_sport(&candidate.field.sport)?
            .into_iter()
            .filter(|user| !participants.contains(&user.id))
            .collect())
    }
}
