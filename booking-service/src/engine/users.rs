use shared::UserProfile;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

use super::validation::{normalize_email, normalize_required, normalize_sports};
use super::{remove_registration, BookingEngine, BookingState};
use crate::error::{BookingError, BookingResult};

impl BookingState {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        let email = email.to_lowercase();
        self.users
            .values()
            .any(|user| Some(user.id) != except && user.email.to_lowercase() == email)
    }
}

fn duplicate_email(email: &str) -> BookingError {
    BookingError::conflict(format!("A user with the email '{}' already exists.", email))
}

impl BookingEngine {
    pub fn create_user<S: AsRef<str>>(
        &self,
        email: &str,
        full_name: &str,
        interested_sports: &[S],
    ) -> BookingResult<UserProfile> {
        let email = normalize_email(email)?;
        let full_name = normalize_required(full_name, "full name")?;
        let interested_sports = normalize_sports(interested_sports);

        let user = UserProfile {
            id: Uuid::new_v4(),
            email,
            full_name,
            interested_sports,
        };

        let mut state = self.state();
        if state.email_taken(&user.email, None) {
            return Err(duplicate_email(&user.email));
        }
        state.users.insert(user.id, user.clone());
        drop(state);

        info!("User {} created", user.id);
        Ok(user)
    }

    /// Returns `Ok(None)` when the user does not exist.
    pub fn update_user<S: AsRef<str>>(
        &self,
        id: Uuid,
        email: &str,
        full_name: &str,
        interested_sports: &[S],
    ) -> BookingResult<Option<UserProfile>> {
        let email = normalize_email(email)?;
        let full_name = normalize_required(full_name, "full name")?;
        let interested_sports = normalize_sports(interested_sports);

        let mut state = self.state();
        if !state.users.contains_key(&id) {
            return Ok(None);
        }
        if state.email_taken(&email, Some(id)) {
            return Err(duplicate_email(&email));
        }

        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        user.email = email;
        user.full_name = full_name;
        user.interested_sports = interested_sports;

        info!("User {} updated", id);
        Ok(Some(user.clone()))
    }

    /// Removes a user and every registration they hold. Each confirmed seat
    /// freed this way is handed to the slot's earliest waitlisted user.
    pub fn delete_user(&self, id: Uuid) -> bool {
        let mut state = self.state();
        if state.users.remove(&id).is_none() {
            return false;
        }

        for slot in state.time_slots.values_mut() {
            if let Some(Some(promoted)) = remove_registration(slot, id) {
                info!(
                    "User {} promoted from waitlist on time slot {}",
                    promoted, slot.id
                );
            }
        }
        drop(state);

        info!("User {} deleted", id);
        true
    }

    pub fn get_user(&self, id: Uuid) -> Option<UserProfile> {
        self.state().users.get(&id).cloned()
    }

    pub fn list_users(&self) -> Vec<UserProfile> {
        self.state().users.values().cloned().collect()
    }

    pub fn get_users_by_ids(&self, ids: &[Uuid]) -> Vec<UserProfile> {
        let requested: HashSet<&Uuid> = ids.iter().collect();
        self.state()
            .users
            .iter()
            .filter(|(id, _)| requested.contains(id))
            .map(|(_, user)| user.clone())
            .collect()
    }
}
