use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A sport venue with a fixed capacity and a minimum-participant policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: Uuid,
    pub name: String,
    pub sport: String,
    pub capacity: i32,
    pub minimum_participants: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub user_id: Uuid,
    pub registered_at: DateTime<Utc>,
    pub is_waitlisted: bool,
}

/// A reservation window on a field.
///
/// `registrations` keeps arrival order; the first `effective_maximum`
/// confirmed entries hold the seats and every waitlisted entry queues behind
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: Uuid,
    pub field_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub maximum_override: Option<i32>,
    pub minimum_override: Option<i32>,
    pub reminder_sent: bool,
    pub registrations: Vec<Registration>,
}

impl TimeSlot {
    pub fn effective_maximum(&self, field: &Field) -> i32 {
        self.maximum_override.unwrap_or(field.capacity)
    }

    pub fn effective_minimum(&self, field: &Field) -> i32 {
        self.minimum_override.unwrap_or(field.minimum_participants)
    }

    pub fn confirmed_count(&self) -> i32 {
        self.registrations.iter().filter(|r| !r.is_waitlisted).count() as i32
    }

    pub fn waitlisted_count(&self) -> i32 {
        self.registrations.iter().filter(|r| r.is_waitlisted).count() as i32
    }

    pub fn registration_for(&self, user_id: Uuid) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.user_id == user_id)
    }

    pub fn is_registered(&self, user_id: Uuid) -> bool {
        self.registration_for(user_id).is_some()
    }
}

/// Sport names compared without regard to case.
///
/// The first spelling inserted for a sport is the one kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SportSet {
    sports: BTreeMap<String, String>,
}

impl SportSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a trimmed sport name. Blank names and case-insensitive
    /// duplicates are ignored and return `false`.
    pub fn insert(&mut self, sport: &str) -> bool {
        let sport = sport.trim();
        if sport.is_empty() {
            return false;
        }

        let key = sport.to_lowercase();
        if self.sports.contains_key(&key) {
            return false;
        }

        self.sports.insert(key, sport.to_string());
        true
    }

    pub fn contains(&self, sport: &str) -> bool {
        self.sports.contains_key(&sport.trim().to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.sports.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sports.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for SportSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = SportSet::new();
        for sport in iter {
            set.insert(sport.as_ref());
        }
        set
    }
}

impl From<Vec<String>> for SportSet {
    fn from(sports: Vec<String>) -> Self {
        sports.into_iter().collect()
    }
}

impl From<SportSet> for Vec<String> {
    fn from(set: SportSet) -> Self {
        set.sports.into_values().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub interested_sports: SportSet,
}

/// A rendered reminder e-mail kept in the notification outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailNotification {
    pub id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub time_slot_id: Option<Uuid>,
    pub field_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationStatus {
    Confirmed,
    Waitlisted,
    AlreadyRegistered,
    TimeSlotNotFound,
    UserNotFound,
    FieldNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancellationStatus {
    Cancelled,
    TimeSlotNotFound,
    UserNotFound,
    FieldNotFound,
    RegistrationNotFound,
}

/// Outcome of a registration attempt. Snapshots are copies taken after the
/// operation was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationResult {
    pub status: RegistrationStatus,
    pub registration: Option<Registration>,
    pub time_slot: Option<TimeSlot>,
    pub field: Option<Field>,
}

impl RegistrationResult {
    pub fn status_only(status: RegistrationStatus) -> Self {
        Self {
            status,
            registration: None,
            time_slot: None,
            field: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationResult {
    pub status: CancellationStatus,
    pub promoted_user_id: Option<Uuid>,
    pub time_slot: Option<TimeSlot>,
    pub field: Option<Field>,
}

impl CancellationResult {
    pub fn status_only(status: CancellationStatus) -> Self {
        Self {
            status,
            promoted_user_id: None,
            time_slot: None,
            field: None,
        }
    }
}

/// An under-subscribed slot inside the notice window, paired with its field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderCandidate {
    pub time_slot: TimeSlot,
    pub field: Field,
}

/// Source of the current time, injectable for deterministic tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn field(capacity: i32, minimum: i32) -> Field {
        Field {
            id: Uuid::new_v4(),
            name: "Court A".to_string(),
            sport: "Tennis".to_string(),
            capacity,
            minimum_participants: minimum,
        }
    }

    fn slot(field: &Field) -> TimeSlot {
        let start = Utc::now();
        TimeSlot {
            id: Uuid::new_v4(),
            field_id: field.id,
            start_time: start,
            end_time: start + Duration::hours(1),
            maximum_override: None,
            minimum_override: None,
            reminder_sent: false,
            registrations: Vec::new(),
        }
    }

    #[test]
    fn effective_limits_fall_back_to_field() {
        let field = field(10, 4);
        let mut slot = slot(&field);
        assert_eq!(slot.effective_maximum(&field), 10);
        assert_eq!(slot.effective_minimum(&field), 4);

        slot.maximum_override = Some(6);
        slot.minimum_override = Some(2);
        assert_eq!(slot.effective_maximum(&field), 6);
        assert_eq!(slot.effective_minimum(&field), 2);
    }

    #[test]
    fn counts_split_confirmed_and_waitlisted() {
        let field = field(1, 1);
        let mut slot = slot(&field);
        let first = Uuid::new_v4();
        slot.registrations.push(Registration {
            user_id: first,
            registered_at: Utc::now(),
            is_waitlisted: false,
        });
        slot.registrations.push(Registration {
            user_id: Uuid::new_v4(),
            registered_at: Utc::now(),
            is_waitlisted: true,
        });

        assert_eq!(slot.confirmed_count(), 1);
        assert_eq!(slot.waitlisted_count(), 1);
        assert!(slot.is_registered(first));
        assert!(!slot.is_registered(Uuid::new_v4()));
    }

    #[test]
    fn sport_set_ignores_case_and_blanks() {
        let sports: SportSet = ["  Football ", "football", "", "   ", "Tennis"]
            .into_iter()
            .collect();

        assert_eq!(sports.len(), 2);
        assert!(sports.contains("FOOTBALL"));
        assert!(sports.contains(" tennis"));
        assert!(!sports.contains("padel"));
        assert_eq!(sports.iter().collect::<Vec<_>>(), vec!["Football", "Tennis"]);
    }

    #[test]
    fn sport_set_serializes_as_list() {
        let sports: SportSet = ["Padel", "PADEL", "Squash"].into_iter().collect();
        let json = serde_json::to_string(&sports).unwrap();
        assert_eq!(json, r#"["Padel","Squash"]"#);

        let back: SportSet = serde_json::from_str(r#"["squash", "Squash", "Golf"]"#).unwrap();
        assert_eq!(back.len(), 2);
        assert!(back.contains("golf"));
    }
}
