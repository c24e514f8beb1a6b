//! In-memory booking engine.
//!
//! Fields, time slots and users live in one [`BookingState`] behind a single
//! mutex. Every public operation takes the lock once, validates, mutates and
//! copies its result before releasing it, so cross-entity invariants (seat
//! counts against field capacity, waitlist promotion) are always checked
//! against one consistent snapshot. Nothing borrowed from the state ever
//! leaves the engine.

mod fields;
mod registrations;
mod time_slots;
mod users;
mod validation;

use shared::{Clock, Field, TimeSlot, UserProfile};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Default)]
struct BookingState {
    fields: HashMap<Uuid, Field>,
    time_slots: HashMap<Uuid, TimeSlot>,
    users: HashMap<Uuid, UserProfile>,
}

impl BookingState {
    fn slots_for_field(&self, field_id: Uuid) -> impl Iterator<Item = &TimeSlot> {
        self.time_slots
            .values()
            .filter(move |slot| slot.field_id == field_id)
    }

    fn slots_for_field_mut(&mut self, field_id: Uuid) -> impl Iterator<Item = &mut TimeSlot> {
        self.time_slots
            .values_mut()
            .filter(move |slot| slot.field_id == field_id)
    }
}

pub struct BookingEngine {
    state: Mutex<BookingState>,
    clock: Arc<dyn Clock>,
}

impl BookingEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(BookingState::default()),
            clock,
        }
    }

    // Mutations validate everything before writing, so the state behind a
    // poisoned lock is still consistent.
    fn state(&self) -> MutexGuard<'_, BookingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes `user_id`'s registration from `slot`. When the removed seat was
/// confirmed, the earliest waitlisted registration takes it over and its
/// user id is returned.
///
/// Returns `None` when the user was not registered on the slot.
fn remove_registration(slot: &mut TimeSlot, user_id: Uuid) -> Option<Option<Uuid>> {
    let index = slot.registrations.iter().position(|r| r.user_id == user_id)?;
    let removed = slot.registrations.remove(index);
    if removed.is_waitlisted {
        return Some(None);
    }

    // min_by_key keeps the first of equal timestamps, i.e. arrival order
    let promoted = slot
        .registrations
        .iter_mut()
        .filter(|r| r.is_waitlisted)
        .min_by_key(|r| r.registered_at)
        .map(|registration| {
            registration.is_waitlisted = false;
            registration.user_id
        });
    Some(promoted)
}
