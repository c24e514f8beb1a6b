use chrono::{DateTime, Utc};
use shared::{
    CancellationResult, CancellationStatus, Registration, RegistrationResult,
    RegistrationStatus, ReminderCandidate, UserProfile,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::validation::normalize_required;
use super::{remove_registration, BookingEngine};
use crate::error::BookingResult;

impl BookingEngine {
    /// Registers a user on a time slot. Once the slot's confirmed seats are
    /// all taken, new registrations join the waitlist.
    pub fn register(&self, time_slot_id: Uuid, user_id: Uuid) -> RegistrationResult {
        let mut state = self.state();
        let state = &mut *state;

        let Some(slot) = state.time_slots.get_mut(&time_slot_id) else {
            return RegistrationResult::status_only(RegistrationStatus::TimeSlotNotFound);
        };
        if !state.users.contains_key(&user_id) {
            return RegistrationResult::status_only(RegistrationStatus::UserNotFound);
        }
        let Some(field) = state.fields.get(&slot.field_id) else {
            warn!(
                "Time slot {} references missing field {}",
                time_slot_id, slot.field_id
            );
            return RegistrationResult::status_only(RegistrationStatus::FieldNotFound);
        };

        if slot.is_registered(user_id) {
            return RegistrationResult {
                status: RegistrationStatus::AlreadyRegistered,
                registration: None,
                time_slot: Some(slot.clone()),
                field: Some(field.clone()),
            };
        }

        let is_waitlisted = slot.confirmed_count() >= slot.effective_maximum(field);
        let registration = Registration {
            user_id,
            registered_at: self.clock.now(),
            is_waitlisted,
        };
        slot.registrations.push(registration.clone());

        let status = if is_waitlisted {
            RegistrationStatus::Waitlisted
        } else {
            RegistrationStatus::Confirmed
        };
        info!(
            "User {} registered on time slot {} with status {:?}",
            user_id, time_slot_id, status
        );

        RegistrationResult {
            status,
            registration: Some(registration),
            time_slot: Some(slot.clone()),
            field: Some(field.clone()),
        }
    }

    /// Cancels a user's registration. A vacated confirmed seat goes to the
    /// earliest waitlisted registration on the slot.
    pub fn cancel(&self, time_slot_id: Uuid, user_id: Uuid) -> CancellationResult {
        let mut state = self.state();
        let state = &mut *state;

        let Some(slot) = state.time_slots.get_mut(&time_slot_id) else {
            return CancellationResult::status_only(CancellationStatus::TimeSlotNotFound);
        };
        if !state.users.contains_key(&user_id) {
            return CancellationResult::status_only(CancellationStatus::UserNotFound);
        }
        let Some(field) = state.fields.get(&slot.field_id) else {
            warn!(
                "Time slot {} references missing field {}",
                time_slot_id, slot.field_id
            );
            return CancellationResult::status_only(CancellationStatus::FieldNotFound);
        };

        let Some(promoted_user_id) = remove_registration(slot, user_id) else {
            return CancellationResult {
                status: CancellationStatus::RegistrationNotFound,
                promoted_user_id: None,
                time_slot: Some(slot.clone()),
                field: Some(field.clone()),
            };
        };

        info!(
            "User {} cancelled registration on time slot {}",
            user_id, time_slot_id
        );
        if let Some(promoted) = promoted_user_id {
            info!(
                "User {} promoted from waitlist on time slot {}",
                promoted, time_slot_id
            );
        }

        CancellationResult {
            status: CancellationStatus::Cancelled,
            promoted_user_id,
            time_slot: Some(slot.clone()),
            field: Some(field.clone()),
        }
    }

    /// Slots starting in `(now, threshold]` that are under their effective
    /// minimum and have not been reminded yet. Order is unspecified.
    pub fn reminder_candidates(
        &self,
        now: DateTime<Utc>,
        threshold: DateTime<Utc>,
    ) -> Vec<ReminderCandidate> {
        let state = self.state();
        state
            .time_slots
            .values()
            .filter(|slot| !slot.reminder_sent)
            .filter(|slot| slot.start_time > now && slot.start_time <= threshold)
            .filter_map(|slot| {
                let field = state.fields.get(&slot.field_id)?;
                (slot.confirmed_count() < slot.effective_minimum(field)).then(|| {
                    ReminderCandidate {
                        time_slot: slot.clone(),
                        field: field.clone(),
                    }
                })
            })
            .collect()
    }

    /// No-op when the slot no longer exists.
    pub fn mark_reminder_sent(&self, time_slot_id: Uuid) {
        if let Some(slot) = self.state().time_slots.get_mut(&time_slot_id) {
            slot.reminder_sent = true;
        }
    }

    pub fn users_interested_in_sport(&self, sport: &str) -> BookingResult<Vec<UserProfile>> {
        let sport = normalize_required(sport, "sport")?;
        Ok(self
            .state()
            .users
            .values()
            .filter(|user| user.interested_sports.contains(&sport))
            .cloned()
            .collect())
    }
}
