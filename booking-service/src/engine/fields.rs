use shared::Field;
use tracing::info;
use uuid::Uuid;

use super::validation::{normalize_required, validate_field_limits};
use super::BookingEngine;
use crate::error::{BookingError, BookingResult};

impl BookingEngine {
    pub fn create_field(
        &self,
        name: &str,
        sport: &str,
        capacity: i32,
        minimum_participants: i32,
    ) -> BookingResult<Field> {
        validate_field_limits(capacity, minimum_participants)?;
        let name = normalize_required(name, "name")?;
        let sport = normalize_required(sport, "sport")?;

        let field = Field {
            id: Uuid::new_v4(),
            name,
            sport,
            capacity,
            minimum_participants,
        };

        self.state().fields.insert(field.id, field.clone());

        info!("Field {} created for sport {}", field.id, field.sport);
        Ok(field)
    }

    /// Replaces a field's attributes. Every slot of the field is checked
    /// against the new limits before anything is written; on success slot
    /// overrides that no longer fit are clipped, maximum first.
    ///
    /// Returns `Ok(None)` when the field does not exist.
    pub fn update_field(
        &self,
        id: Uuid,
        name: &str,
        sport: &str,
        capacity: i32,
        minimum_participants: i32,
    ) -> BookingResult<Option<Field>> {
        validate_field_limits(capacity, minimum_participants)?;
        let name = normalize_required(name, "name")?;
        let sport = normalize_required(sport, "sport")?;

        let mut state = self.state();
        if !state.fields.contains_key(&id) {
            return Ok(None);
        }

        for slot in state.slots_for_field(id) {
            let maximum = slot.maximum_override.unwrap_or(capacity).min(capacity);
            let confirmed = slot.confirmed_count();
            if confirmed > maximum {
                return Err(BookingError::conflict(format!(
                    "Cannot reduce the capacity to {} because time slot {} already has {} confirmed players.",
                    capacity, slot.id, confirmed
                )));
            }

            let minimum = slot.minimum_override.unwrap_or(minimum_participants);
            if minimum > capacity {
                return Err(BookingError::conflict(format!(
                    "Cannot set the minimum participants to {} because time slot {} would become invalid.",
                    minimum_participants, slot.id
                )));
            }
        }

        let field = match state.fields.get_mut(&id) {
            Some(field) => {
                field.name = name;
                field.sport = sport;
                field.capacity = capacity;
                field.minimum_participants = minimum_participants;
                field.clone()
            }
            None => return Ok(None),
        };

        for slot in state.slots_for_field_mut(id) {
            if matches!(slot.maximum_override, Some(max) if max > capacity) {
                info!(
                    "Clipping maximum participants of time slot {} to capacity {}",
                    slot.id, capacity
                );
                slot.maximum_override = Some(capacity);
            }

            // an inherited field minimum can exceed the slot's own maximum
            let maximum = slot.effective_maximum(&field);
            if slot.effective_minimum(&field) > maximum {
                info!(
                    "Clipping minimum participants of time slot {} to {}",
                    slot.id, maximum
                );
                slot.minimum_override = Some(maximum);
            }
        }

        info!("Field {} updated", id);
        Ok(Some(field))
    }

    /// Removes a field together with all of its time slots.
    pub fn delete_field(&self, id: Uuid) -> bool {
        let mut state = self.state();
        if state.fields.remove(&id).is_none() {
            return false;
        }

        let before = state.time_slots.len();
        state.time_slots.retain(|_, slot| slot.field_id != id);
        let removed_slots = before - state.time_slots.len();
        drop(state);

        info!("Field {} deleted along with {} time slots", id, removed_slots);
        true
    }

    pub fn get_field(&self, id: Uuid) -> Option<Field> {
        self.state().fields.get(&id).cloned()
    }

    pub fn list_fields(&self) -> Vec<Field> {
        self.state().fields.values().cloned().collect()
    }
}
