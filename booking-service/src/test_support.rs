use chrono::{DateTime, Duration, Utc};
use shared::{Clock, UserProfile};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::engine::BookingEngine;

/// Always returns the same instant.
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Advances by one second on every read so successive registrations get
/// strictly increasing timestamps.
#[derive(Debug)]
pub struct StepClock {
    next: Mutex<DateTime<Utc>>,
}

impl StepClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            next: Mutex::new(start),
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self.next.lock().unwrap();
        let now = *next;
        *next = now + Duration::seconds(1);
        now
    }
}

pub fn engine() -> BookingEngine {
    engine_at(Utc::now())
}

pub fn engine_at(start: DateTime<Utc>) -> BookingEngine {
    BookingEngine::new(Arc::new(StepClock::new(start)))
}

/// A one-hour slot starting `hours_ahead` hours from now.
pub fn slot_times(hours_ahead: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc::now() + Duration::hours(hours_ahead);
    (start, start + Duration::hours(1))
}

pub fn users(engine: &BookingEngine, count: usize, sports: &[&str]) -> Vec<UserProfile> {
    (0..count)
        .map(|n| {
            engine
                .create_user(
                    &format!("player{}-{}@example.com", n, Uuid::new_v4().simple()),
                    &format!("Player {}", n),
                    sports,
                )
                .unwrap()
        })
        .collect()
}
