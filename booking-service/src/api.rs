use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::*;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::engine::BookingEngine;
use crate::error::BookingError;
use crate::notifications::InMemoryNotificationSender;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BookingEngine>,
    pub notifications: Arc<InMemoryNotificationSender>,
}

#[derive(Debug, Deserialize)]
pub struct FieldRequest {
    pub name: String,
    pub sport: String,
    pub capacity: i32,
    pub minimum_participants: i32,
}

#[derive(Debug, Deserialize)]
pub struct TimeSlotRequest {
    pub field_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub maximum_participants: Option<i32>,
    pub minimum_participants: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct TimeSlotQuery {
    pub field_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub interested_sports: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ParticipantResponse {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub is_waitlisted: bool,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TimeSlotResponse {
    pub id: Uuid,
    pub field_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    pub minimum_participants: i32,
    pub confirmed_participants: i32,
    pub waitlisted_participants: i32,
    pub reminder_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<ParticipantResponse>>,
}

impl TimeSlotResponse {
    fn from_entities(
        slot: &TimeSlot,
        field: &Field,
        participants: Option<Vec<ParticipantResponse>>,
    ) -> Self {
        Self {
            id: slot.id,
            field_id: slot.field_id,
            start_time: slot.start_time,
            end_time: slot.end_time,
            capacity: slot.effective_maximum(field),
            minimum_participants: slot.effective_minimum(field),
            confirmed_participants: slot.confirmed_count(),
            waitlisted_participants: slot.waitlisted_count(),
            reminder_sent: slot.reminder_sent,
            participants,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub time_slot_id: Uuid,
    pub user_id: Uuid,
    pub is_waitlisted: bool,
    pub registered_at: DateTime<Utc>,
    pub confirmed_participants: i32,
    pub capacity: i32,
    pub status: RegistrationStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancellationResponse {
    pub time_slot_id: Uuid,
    pub user_id: Uuid,
    pub promoted_user_id: Option<Uuid>,
    pub confirmed_participants: i32,
    pub capacity: i32,
    pub status: CancellationStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<T, ApiError>;

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn booking_error(e: BookingError) -> ApiError {
    match e {
        BookingError::InvalidArgument(message) => api_error(StatusCode::BAD_REQUEST, message),
        BookingError::Conflict(message) => {
            tracing::warn!("Request conflicts with current state: {}", message);
            api_error(StatusCode::CONFLICT, message)
        }
    }
}

fn not_found(what: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, format!("{} not found.", what))
}

fn no_content(deleted: bool, what: &str) -> ApiResult<StatusCode> {
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(what))
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/fields", get(list_fields).post(create_field))
        .route(
            "/api/fields/:id",
            get(get_field).put(update_field).delete(delete_field),
        )
        .route("/api/fields/:id/timeslots", get(field_time_slots))
        .route("/api/timeslots", get(list_time_slots).post(create_time_slot))
        .route(
            "/api/timeslots/:id",
            get(get_time_slot)
                .put(update_time_slot)
                .delete(delete_time_slot),
        )
        .route("/api/timeslots/:id/registrations", post(register))
        .route(
            "/api/timeslots/:id/registrations/:user_id",
            delete(cancel_registration),
        )
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/api/notifications", get(list_notifications))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

pub async fn list_fields(State(state): State<AppState>) -> Json<Vec<Field>> {
    Json(state.engine.list_fields())
}

pub async fn get_field(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Field>> {
    state
        .engine
        .get_field(id)
        .map(Json)
        .ok_or_else(|| not_found("Field"))
}

pub async fn create_field(
    State(state): State<AppState>,
    Json(request): Json<FieldRequest>,
) -> ApiResult<(StatusCode, Json<Field>)> {
    let field = state
        .engine
        .create_field(
            &request.name,
            &request.sport,
            request.capacity,
            request.minimum_participants,
        )
        .map_err(booking_error)?;
    Ok((StatusCode::CREATED, Json(field)))
}

pub async fn update_field(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<FieldRequest>,
) -> ApiResult<Json<Field>> {
    state
        .engine
        .update_field(
            id,
            &request.name,
            &request.sport,
            request.capacity,
            request.minimum_participants,
        )
        .map_err(booking_error)?
        .map(Json)
        .ok_or_else(|| not_found("Field"))
}

pub async fn delete_field(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    no_content(state.engine.delete_field(id), "Field")
}

fn sorted_summaries<'a>(
    slots: Vec<TimeSlot>,
    field_for: impl Fn(&TimeSlot) -> Option<&'a Field>,
) -> Vec<TimeSlotResponse> {
    let mut responses: Vec<_> = slots
        .iter()
        .filter_map(|slot| {
            field_for(slot).map(|field| TimeSlotResponse::from_entities(slot, field, None))
        })
        .collect();
    responses.sort_by_key(|slot| slot.start_time);
    responses
}

pub async fn field_time_slots(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<TimeSlotResponse>>> {
    let field = state.engine.get_field(id).ok_or_else(|| not_found("Field"))?;
    let slots = state.engine.list_time_slots_for_field(id);
    Ok(Json(sorted_summaries(slots, |_| Some(&field))))
}

pub async fn list_time_slots(
    State(state): State<AppState>,
    Query(query): Query<TimeSlotQuery>,
) -> Json<Vec<TimeSlotResponse>> {
    let slots = match query.field_id {
        Some(field_id) => state.engine.list_time_slots_for_field(field_id),
        None => state.engine.list_time_slots(),
    };
    let fields: HashMap<Uuid, Field> = state
        .engine
        .list_fields()
        .into_iter()
        .map(|field| (field.id, field))
        .collect();

    Json(sorted_summaries(slots, |slot| fields.get(&slot.field_id)))
}

pub async fn get_time_slot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TimeSlotResponse>> {
    let slot = state
        .engine
        .get_time_slot(id)
        .ok_or_else(|| not_found("Time slot"))?;
    let field = state
        .engine
        .get_field(slot.field_id)
        .ok_or_else(|| not_found("Field"))?;

    let user_ids: Vec<Uuid> = slot.registrations.iter().map(|r| r.user_id).collect();
    let users: HashMap<Uuid, UserProfile> = state
        .engine
        .get_users_by_ids(&user_ids)
        .into_iter()
        .map(|user| (user.id, user))
        .collect();

    let mut participants: Vec<ParticipantResponse> = slot
        .registrations
        .iter()
        .map(|registration| {
            let user = users.get(&registration.user_id);
            ParticipantResponse {
                user_id: registration.user_id,
                email: user.map(|u| u.email.clone()).unwrap_or_default(),
                full_name: user.map(|u| u.full_name.clone()).unwrap_or_default(),
                is_waitlisted: registration.is_waitlisted,
                registered_at: registration.registered_at,
            }
        })
        .collect();
    participants.sort_by_key(|participant| participant.registered_at);

    Ok(Json(TimeSlotResponse::from_entities(
        &slot,
        &field,
        Some(participants),
    )))
}

/// Re-reads the field so the summary reflects the limits the slot was
/// validated against.
fn slot_summary(state: &AppState, slot: &TimeSlot) -> ApiResult<TimeSlotResponse> {
    let field = state
        .engine
        .get_field(slot.field_id)
        .ok_or_else(|| not_found("Field"))?;
    Ok(TimeSlotResponse::from_entities(slot, &field, None))
}

pub async fn create_time_slot(
    State(state): State<AppState>,
    Json(request): Json<TimeSlotRequest>,
) -> ApiResult<(StatusCode, Json<TimeSlotResponse>)> {
    let slot = state
        .engine
        .create_time_slot(
            request.field_id,
            request.start_time,
            request.end_time,
            request.maximum_participants,
            request.minimum_participants,
        )
        .map_err(booking_error)?
        .ok_or_else(|| not_found("Field"))?;

    Ok((StatusCode::CREATED, Json(slot_summary(&state, &slot)?)))
}

pub async fn update_time_slot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TimeSlotRequest>,
) -> ApiResult<Json<TimeSlotResponse>> {
    let current = state
        .engine
        .get_time_slot(id)
        .ok_or_else(|| not_found("Time slot"))?;
    if current.field_id != request.field_id {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Changing the field of a time slot is not supported.",
        ));
    }

    let slot = state
        .engine
        .update_time_slot(
            id,
            request.start_time,
            request.end_time,
            request.maximum_participants,
            request.minimum_participants,
        )
        .map_err(booking_error)?
        .ok_or_else(|| not_found("Time slot"))?;

    Ok(Json(slot_summary(&state, &slot)?))
}

pub async fn delete_time_slot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    no_content(state.engine.delete_time_slot(id), "Time slot")
}

fn missing_field_error() -> ApiError {
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Associated field not found.",
    )
}

pub async fn register(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RegistrationRequest>,
) -> ApiResult<Json<RegistrationResponse>> {
    let result = state.engine.register(id, request.user_id);
    match result.status {
        RegistrationStatus::Confirmed | RegistrationStatus::Waitlisted => {}
        RegistrationStatus::AlreadyRegistered => {
            return Err(api_error(
                StatusCode::CONFLICT,
                "User already registered on this time slot.",
            ))
        }
        RegistrationStatus::TimeSlotNotFound => return Err(not_found("Time slot")),
        RegistrationStatus::UserNotFound => return Err(not_found("User")),
        RegistrationStatus::FieldNotFound => return Err(missing_field_error()),
    }

    let (Some(registration), Some(slot), Some(field)) =
        (result.registration, result.time_slot, result.field)
    else {
        tracing::error!("Registration result for time slot {} is incomplete", id);
        return Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Registration result is incomplete.",
        ));
    };

    Ok(Json(RegistrationResponse {
        time_slot_id: slot.id,
        user_id: registration.user_id,
        is_waitlisted: registration.is_waitlisted,
        registered_at: registration.registered_at,
        confirmed_participants: slot.confirmed_count(),
        capacity: slot.effective_maximum(&field),
        status: result.status,
    }))
}

pub async fn cancel_registration(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<CancellationResponse>> {
    let result = state.engine.cancel(id, user_id);
    match result.status {
        CancellationStatus::Cancelled => {}
        CancellationStatus::TimeSlotNotFound => return Err(not_found("Time slot")),
        CancellationStatus::UserNotFound => return Err(not_found("User")),
        CancellationStatus::RegistrationNotFound => return Err(not_found("Registration")),
        CancellationStatus::FieldNotFound => return Err(missing_field_error()),
    }

    let (Some(slot), Some(field)) = (result.time_slot, result.field) else {
        tracing::error!("Cancellation result for time slot {} is incomplete", id);
        return Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Cancellation result is incomplete.",
        ));
    };

    Ok(Json(CancellationResponse {
        time_slot_id: slot.id,
        user_id,
        promoted_user_id: result.promoted_user_id,
        confirmed_participants: slot.confirmed_count(),
        capacity: slot.effective_maximum(&field),
        status: result.status,
    }))
}

pub async fn list_users(State(state): State<AppState>) -> Json<Vec<UserProfile>> {
    Json(state.engine.list_users())
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserProfile>> {
    state
        .engine
        .get_user(id)
        .map(Json)
        .ok_or_else(|| not_found("User"))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<UserRequest>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let user = state
        .engine
        .create_user(&request.email, &request.full_name, &request.interested_sports)
        .map_err(booking_error)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UserRequest>,
) -> ApiResult<Json<UserProfile>> {
    state
        .engine
        .update_user(
            id,
            &request.email,
            &request.full_name,
            &request.interested_sports,
        )
        .map_err(booking_error)?
        .map(Json)
        .ok_or_else(|| not_found("User"))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    no_content(state.engine.delete_user(id), "User")
}

pub async fn list_notifications(State(state): State<AppState>) -> Json<Vec<EmailNotification>> {
    let mut notifications = state.notifications.notifications();
    notifications.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
    Json(notifications)
}

pub async fn health_check() -> &'static str {
    "OK"
}
