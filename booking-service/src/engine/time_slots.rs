use chrono::{DateTime, Utc};
use shared::TimeSlot;
use tracing::info;
use uuid::Uuid;

use super::validation::{validate_time_slot_limits, validate_time_slot_range};
use super::BookingEngine;
use crate::error::{BookingError, BookingResult};

impl BookingEngine {
    /// Returns `Ok(None)` when the field does not exist.
    pub fn create_time_slot(
        &self,
        field_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        maximum_override: Option<i32>,
        minimum_override: Option<i32>,
    ) -> BookingResult<Option<TimeSlot>> {
        validate_time_slot_range(start_time, end_time)?;

        let mut state = self.state();
        let Some(field) = state.fields.get(&field_id) else {
            return Ok(None);
        };
        validate_time_slot_limits(field, maximum_override, minimum_override)?;

        let slot = TimeSlot {
            id: Uuid::new_v4(),
            field_id,
            start_time,
            end_time,
            maximum_override,
            minimum_override,
            reminder_sent: false,
            registrations: Vec::new(),
        };
        state.time_slots.insert(slot.id, slot.clone());

        info!("Time slot {} created on field {}", slot.id, field_id);
        Ok(Some(slot))
    }

    /// Edits a slot's schedule and overrides in place.
    ///
    /// A slot that was already reminded becomes eligible again when its
    /// confirmed count falls below the new effective minimum.
    pub fn update_time_slot(
        &self,
        id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        maximum_override: Option<i32>,
        minimum_override: Option<i32>,
    ) -> BookingResult<Option<TimeSlot>> {
        validate_time_slot_range(start_time, end_time)?;

        let mut state = self.state();
        let Some(field_id) = state.time_slots.get(&id).map(|slot| slot.field_id) else {
            return Ok(None);
        };
        let Some(field) = state.fields.get(&field_id).cloned() else {
            return Ok(None);
        };
        validate_time_slot_limits(&field, maximum_override, minimum_override)?;

        let Some(slot) = state.time_slots.get_mut(&id) else {
            return Ok(None);
        };

        let maximum = maximum_override.unwrap_or(field.capacity);
        let confirmed = slot.confirmed_count();
        if confirmed > maximum {
            return Err(BookingError::conflict(
                "Cannot set the maximum participants below the number of confirmed registrations.",
            ));
        }

        slot.start_time = start_time;
        slot.end_time = end_time;
        slot.maximum_override = maximum_override;
        slot.minimum_override = minimum_override;

        if slot.reminder_sent && confirmed < slot.effective_minimum(&field) {
            info!("Time slot {} fell below its minimum, reminder re-armed", id);
            slot.reminder_sent = false;
        }

        info!("Time slot {} updated", id);
        Ok(Some(slot.clone()))
    }

    pub fn delete_time_slot(&self, id: Uuid) -> bool {
        let removed = self.state().time_slots.remove(&id).is_some();
        if removed {
            info!("Time slot {} deleted", id);
        }
        removed
    }

    pub fn get_time_slot(&self, id: Uuid) -> Option<TimeSlot> {
        self.state().time_slots.get(&id).cloned()
    }

    pub fn list_time_slots(&self) -> Vec<TimeSlot> {
        self.state().time_slots.values().cloned().collect()
    }

    pub fn list_time_slots_for_field(&self, field_id: Uuid) -> Vec<TimeSlot> {
        self.state().slots_for_field(field_id).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{engine, slot_times, users};

    #[test]
    fn create_then_get_round_trips() {
        let engine = engine();
        let field = engine.create_field("Court", "Tennis", 4, 2).unwrap();
        let (start, end) = slot_times(48);

        let slot = engine
            .create_time_slot(field.id, start, end, Some(3), None)
            .unwrap()
            .unwrap();

        assert_eq!(slot.field_id, field.id);
        assert_eq!(slot.start_time, start);
        assert_eq!(slot.end_time, end);
        assert_eq!(slot.maximum_override, Some(3));
        assert_eq!(slot.minimum_override, None);
        assert!(!slot.reminder_sent);
        assert!(slot.registrations.is_empty());
        assert_eq!(engine.get_time_slot(slot.id), Some(slot.clone()));
        assert_eq!(engine.list_time_slots_for_field(field.id), vec![slot]);
    }

    #[test]
    fn create_on_unknown_field_is_none() {
        let engine = engine();
        let (start, end) = slot_times(48);
        assert_eq!(
            engine.create_time_slot(Uuid::new_v4(), start, end, None, None),
            Ok(None)
        );
    }

    #[test]
    fn create_validates_range_and_overrides() {
        let engine = engine();
        let field = engine.create_field("Court", "Tennis", 4, 2).unwrap();
        let (start, end) = slot_times(48);

        for (start, end, max, min) in [
            (end, start, None, None),
            (start, start, None, None),
            (start, end, Some(5), None),
            (start, end, Some(0), None),
            (start, end, None, Some(0)),
            (start, end, Some(2), Some(3)),
            (start, end, None, Some(5)),
        ] {
            assert!(matches!(
                engine.create_time_slot(field.id, start, end, max, min),
                Err(BookingError::InvalidArgument(_))
            ));
        }
        assert!(engine.list_time_slots().is_empty());
    }

    #[test]
    fn invalid_range_wins_over_missing_field() {
        let engine = engine();
        let (start, end) = slot_times(48);
        assert!(matches!(
            engine.create_time_slot(Uuid::new_v4(), end, start, None, None),
            Err(BookingError::InvalidArgument(_))
        ));
    }

    #[test]
    fn update_below_confirmed_count_conflicts() {
        let engine = engine();
        let field = engine.create_field("Court", "Tennis", 4, 1).unwrap();
        let (start, end) = slot_times(48);
        let slot = engine
            .create_time_slot(field.id, start, end, None, None)
            .unwrap()
            .unwrap();
        for user in users(&engine, 3, &["Tennis"]) {
            engine.register(slot.id, user.id);
        }

        assert!(matches!(
            engine.update_time_slot(slot.id, start, end, Some(2), None),
            Err(BookingError::Conflict(_))
        ));
        assert_eq!(engine.get_time_slot(slot.id).unwrap().maximum_override, None);

        let updated = engine
            .update_time_slot(slot.id, start, end, Some(3), Some(1))
            .unwrap()
            .unwrap();
        assert_eq!(updated.maximum_override, Some(3));
        assert_eq!(updated.confirmed_count(), 3);
    }

    #[test]
    fn update_unknown_slot_is_none() {
        let engine = engine();
        let (start, end) = slot_times(48);
        assert_eq!(
            engine.update_time_slot(Uuid::new_v4(), start, end, None, None),
            Ok(None)
        );
    }

    #[test]
    fn raising_minimum_above_confirmed_rearms_reminder() {
        let engine = engine();
        let field = engine.create_field("Court", "Tennis", 6, 1).unwrap();
        let (start, end) = slot_times(48);
        let slot = engine
            .create_time_slot(field.id, start, end, None, None)
            .unwrap()
            .unwrap();
        for user in users(&engine, 2, &["Tennis"]) {
            engine.register(slot.id, user.id);
        }
        engine.mark_reminder_sent(slot.id);

        // minimum 2 is still met: flag stays
        let updated = engine
            .update_time_slot(slot.id, start, end, None, Some(2))
            .unwrap()
            .unwrap();
        assert!(updated.reminder_sent);

        let updated = engine
            .update_time_slot(slot.id, start, end, None, Some(4))
            .unwrap()
            .unwrap();
        assert!(!updated.reminder_sent);
    }

    #[test]
    fn delete_is_unconditional() {
        let engine = engine();
        let field = engine.create_field("Court", "Tennis", 2, 1).unwrap();
        let (start, end) = slot_times(48);
        let slot = engine
            .create_time_slot(field.id, start, end, None, None)
            .unwrap()
            .unwrap();
        for user in users(&engine, 3, &[]) {
            engine.register(slot.id, user.id);
        }

        assert!(engine.delete_time_slot(slot.id));
        assert!(!engine.delete_time_slot(slot.id));
        assert_eq!(engine.get_time_slot(slot.id), None);
        assert!(engine.get_field(field.id).is_some());
    }
}
