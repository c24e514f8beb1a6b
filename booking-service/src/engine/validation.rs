use chrono::{DateTime, Utc};
use lettre::message::Mailbox;
use shared::{Field, SportSet};

use crate::error::{BookingError, BookingResult};

pub(crate) fn normalize_required(value: &str, name: &str) -> BookingResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BookingError::invalid(format!("{} is required.", name)));
    }
    Ok(trimmed.to_string())
}

/// Parses a mailbox (`Jane <jane@example.com>` or a bare address) and keeps
/// only the address part.
pub(crate) fn normalize_email(email: &str) -> BookingResult<String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(BookingError::invalid("email is required."));
    }

    let mailbox: Mailbox = trimmed
        .parse()
        .map_err(|_| BookingError::invalid("The provided email address is invalid."))?;
    Ok(mailbox.email.to_string())
}

pub(crate) fn normalize_sports<S: AsRef<str>>(sports: &[S]) -> SportSet {
    sports.iter().map(AsRef::as_ref).collect()
}

pub(crate) fn validate_field_limits(capacity: i32, minimum_participants: i32) -> BookingResult<()> {
    if capacity <= 0 {
        return Err(BookingError::invalid("Capacity must be a positive value."));
    }

    if minimum_participants <= 0 {
        return Err(BookingError::invalid(
            "Minimum participants must be a positive value.",
        ));
    }

    if minimum_participants > capacity {
        return Err(BookingError::invalid(
            "Minimum participants cannot be greater than capacity.",
        ));
    }

    Ok(())
}

pub(crate) fn validate_time_slot_range(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> BookingResult<()> {
    if end_time <= start_time {
        return Err(BookingError::invalid(
            "The end time must be greater than the start time.",
        ));
    }
    Ok(())
}

pub(crate) fn validate_time_slot_limits(
    field: &Field,
    maximum_override: Option<i32>,
    minimum_override: Option<i32>,
) -> BookingResult<()> {
    if matches!(maximum_override, Some(max) if max <= 0) {
        return Err(BookingError::invalid("Maximum participants must be positive."));
    }

    if matches!(minimum_override, Some(min) if min <= 0) {
        return Err(BookingError::invalid("Minimum participants must be positive."));
    }

    let maximum = maximum_override.unwrap_or(field.capacity);
    if maximum > field.capacity {
        return Err(BookingError::invalid(
            "Maximum participants cannot exceed the field capacity.",
        ));
    }

    let minimum = minimum_override.unwrap_or(field.minimum_participants);
    if minimum > maximum {
        return Err(BookingError::invalid(
            "Minimum participants cannot exceed the maximum participants.",
        ));
    }

    Ok(())
}
