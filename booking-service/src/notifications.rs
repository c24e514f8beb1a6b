use anyhow::Result;
use async_trait::async_trait;
use shared::{Clock, EmailNotification, Field, TimeSlot, UserProfile};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;
use uuid::Uuid;

/// Delivers reminder messages for an under-subscribed time slot.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_reminder(
        &self,
        time_slot: &TimeSlot,
        field: &Field,
        recipients: &[UserProfile],
    ) -> Result<()>;
}

/// Renders reminder e-mails into an in-memory outbox instead of sending them.
pub struct InMemoryNotificationSender {
    outbox: Mutex<Vec<EmailNotification>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryNotificationSender {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            outbox: Mutex::new(Vec::new()),
            clock,
        }
    }

    pub fn notifications(&self) -> Vec<EmailNotification> {
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn reminder_subject(time_slot: &TimeSlot, field: &Field) -> String {
    format!(
        "Reminder - {} session on {}",
        field.sport,
        time_slot.start_time.format("%d/%m/%Y %H:%M")
    )
}

fn reminder_body(time_slot: &TimeSlot, field: &Field) -> String {
    format!(
        "Hello,\n\n\
         Players are still missing for the {} session scheduled on {}.\n\
         Register quickly to confirm the session!\n",
        field.sport,
        time_slot.start_time.format("%A %d %B %Y at %H:%M")
    )
}

#[async_trait]
impl NotificationSender for InMemoryNotificationSender {
    async fn send_reminder(
        &self,
        time_slot: &TimeSlot,
        field: &Field,
        recipients: &[UserProfile],
    ) -> Result<()> {
        if recipients.is_empty() {
            return Ok(());
        }

        let subject = reminder_subject(time_slot, field);
        let body = reminder_body(time_slot, field);

        let mut outbox = self.outbox.lock().unwrap_or_else(PoisonError::into_inner);
        for recipient in recipients {
            outbox.push(EmailNotification {
                id: Uuid::new_v4(),
                recipient: recipient.email.clone(),
                subject: subject.clone(),
                body: body.clone(),
                sent_at: self.clock.now(),
                time_slot_id: Some(time_slot.id),
                field_id: Some(field.id),
            });
            info!(
                "Reminder email queued for {} regarding time slot {}",
                recipient.email, time_slot.id
            );
        }

        Ok(())
    }
}
