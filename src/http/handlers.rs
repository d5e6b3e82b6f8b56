//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! repository traits and the service layer for business logic.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::dto::*;
use super::error::AppError;
use super::state::AppState;
use crate::api::{
    LessonId, ParticipantId, SessionId, SpecialDayId, TeacherId, UnavailablePeriodId,
};
use crate::db::repository::{
    ExceptionRepository, LessonRepository, SessionRepository, WeeklyRuleRepository,
};
use crate::models::calendar::{SpecialDayPatch, WeeklyRulePatch};
use crate::models::lesson::{LessonPatch, Participant, SessionPatch};
use crate::models::time::{day_bounds, parse_utc_offset, DayWindow};
use crate::services;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Health check endpoint to verify the service is running and the store is
/// accessible.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Weekly rules & settings
// =============================================================================

/// POST /v1/teachers/{teacher_id}/weekly-rules
pub async fn create_rule(
    State(state): State<AppState>,
    Path(teacher_id): Path<i64>,
    Json(request): Json<CreateRuleRequest>,
) -> HandlerResult<RuleResponse> {
    let window = DayWindow::new(request.window_start, request.window_end)
        .map_err(AppError::BadRequest)?;
    let rule = crate::models::calendar::WeeklyRule::new(
        TeacherId::new(teacher_id),
        request.weekday,
        window,
        request.is_open,
    )
    .map_err(AppError::BadRequest)?;

    let stored = state.repository.create_rule(&rule).await?;
    Ok(Json(stored.into()))
}

/// GET /v1/teachers/{teacher_id}/weekly-rules
pub async fn list_rules(
    State(state): State<AppState>,
    Path(teacher_id): Path<i64>,
) -> HandlerResult<Vec<RuleResponse>> {
    let rules = state.repository.list_rules(TeacherId::new(teacher_id)).await?;
    Ok(Json(rules.into_iter().map(Into::into).collect()))
}

/// GET /v1/teachers/{teacher_id}/weekly-rules/{weekday}
pub async fn get_rule(
    State(state): State<AppState>,
    Path((teacher_id, weekday)): Path<(i64, u8)>,
) -> HandlerResult<RuleResponse> {
    let rule = state
        .repository
        .get_rule(TeacherId::new(teacher_id), weekday)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No rule for teacher {} on weekday {}",
                teacher_id, weekday
            ))
        })?;
    Ok(Json(rule.into()))
}

/// PUT /v1/teachers/{teacher_id}/weekly-rules/{weekday}
pub async fn update_rule(
    State(state): State<AppState>,
    Path((teacher_id, weekday)): Path<(i64, u8)>,
    Json(request): Json<UpdateRuleRequest>,
) -> HandlerResult<RuleResponse> {
    let patch = WeeklyRulePatch {
        window_start: request.window_start,
        window_end: request.window_end,
        is_open: request.is_open,
    };
    let updated = state
        .repository
        .update_rule(TeacherId::new(teacher_id), weekday, &patch)
        .await?;
    Ok(Json(updated.into()))
}

/// GET /v1/teachers/{teacher_id}/settings
pub async fn get_settings(
    State(state): State<AppState>,
    Path(teacher_id): Path<i64>,
) -> HandlerResult<CalendarSettings> {
    let settings = state
        .repository
        .get_settings(TeacherId::new(teacher_id))
        .await?;
    Ok(Json(settings))
}

/// PUT /v1/teachers/{teacher_id}/settings
pub async fn set_timezone(
    State(state): State<AppState>,
    Path(teacher_id): Path<i64>,
    Json(request): Json<TimezoneRequest>,
) -> HandlerResult<CalendarSettings> {
    // Reject early so the store never sees an unusable offset.
    parse_utc_offset(&request.timezone).map_err(AppError::BadRequest)?;
    let settings = state
        .repository
        .set_timezone(TeacherId::new(teacher_id), &request.timezone)
        .await?;
    Ok(Json(settings))
}

// =============================================================================
// Special days & unavailable periods
// =============================================================================

/// POST /v1/teachers/{teacher_id}/special-days
pub async fn create_special_day(
    State(state): State<AppState>,
    Path(teacher_id): Path<i64>,
    Json(request): Json<CreateSpecialDayRequest>,
) -> HandlerResult<SpecialDayResponse> {
    let window = DayWindow::new(request.window_start, request.window_end)
        .map_err(AppError::BadRequest)?;
    let day = SpecialDay {
        id: None,
        teacher_id: TeacherId::new(teacher_id),
        date: request.date,
        window,
        is_active: true,
        booked_slots: request.booked_slots,
    };
    let stored = state.repository.create_special_day(&day).await?;
    Ok(Json(stored.into()))
}

/// GET /v1/teachers/{teacher_id}/special-days?start=&end=
pub async fn list_special_days(
    State(state): State<AppState>,
    Path(teacher_id): Path<i64>,
    Query(range): Query<DateRangeQuery>,
) -> HandlerResult<Vec<SpecialDayResponse>> {
    let days = state
        .repository
        .list_special_days(TeacherId::new(teacher_id), range.start, range.end)
        .await?;
    Ok(Json(days.into_iter().map(Into::into).collect()))
}

/// PUT /v1/special-days/{special_day_id}
pub async fn update_special_day(
    State(state): State<AppState>,
    Path(special_day_id): Path<i64>,
    Json(request): Json<UpdateSpecialDayRequest>,
) -> HandlerResult<SpecialDayResponse> {
    let patch = SpecialDayPatch {
        window_start: request.window_start,
        window_end: request.window_end,
        is_active: request.is_active,
        booked_slots: request.booked_slots,
    };
    let updated = state
        .repository
        .update_special_day(SpecialDayId::new(special_day_id), &patch)
        .await?;
    Ok(Json(updated.into()))
}

/// DELETE /v1/special-days/{special_day_id}
pub async fn delete_special_day(
    State(state): State<AppState>,
    Path(special_day_id): Path<i64>,
) -> HandlerResult<DeleteResponse> {
    state
        .repository
        .delete_special_day(SpecialDayId::new(special_day_id))
        .await?;
    Ok(Json(DeleteResponse::deleted()))
}

/// POST /v1/teachers/{teacher_id}/unavailable-periods
pub async fn create_unavailable_period(
    State(state): State<AppState>,
    Path(teacher_id): Path<i64>,
    Json(request): Json<CreateUnavailableRequest>,
) -> HandlerResult<UnavailableResponse> {
    let period = UnavailablePeriod::new(
        TeacherId::new(teacher_id),
        request.start_time,
        request.end_time,
        request.reason,
    )
    .map_err(AppError::BadRequest)?;
    let stored = state.repository.create_unavailable_period(&period).await?;
    Ok(Json(stored.into()))
}

/// GET /v1/teachers/{teacher_id}/unavailable-periods?start=&end=
pub async fn list_unavailable_periods(
    State(state): State<AppState>,
    Path(teacher_id): Path<i64>,
    Query(range): Query<InstantRangeQuery>,
) -> HandlerResult<Vec<UnavailableResponse>> {
    let periods = state
        .repository
        .list_unavailable_periods(TeacherId::new(teacher_id), range.start, range.end)
        .await?;
    Ok(Json(periods.into_iter().map(Into::into).collect()))
}

/// DELETE /v1/unavailable-periods/{period_id}
pub async fn delete_unavailable_period(
    State(state): State<AppState>,
    Path(period_id): Path<i64>,
) -> HandlerResult<DeleteResponse> {
    state
        .repository
        .delete_unavailable_period(UnavailablePeriodId::new(period_id))
        .await?;
    Ok(Json(DeleteResponse::deleted()))
}

// =============================================================================
// Free slots & full schedule
// =============================================================================

/// GET /v1/teachers/{teacher_id}/free-slots?date=
pub async fn free_slots(
    State(state): State<AppState>,
    Path(teacher_id): Path<i64>,
    Query(query): Query<FreeSlotsQuery>,
) -> HandlerResult<FreeSlotsResponse> {
    let slots = services::compute_free_slots(
        state.repository.as_ref(),
        TeacherId::new(teacher_id),
        query.date,
    )
    .await?;
    Ok(Json(FreeSlotsResponse {
        teacher_id,
        date: query.date,
        slots,
    }))
}

/// POST /v1/teachers/{teacher_id}/calendar
pub async fn full_schedule(
    State(state): State<AppState>,
    Path(teacher_id): Path<i64>,
    Json(request): Json<FullScheduleRequest>,
) -> HandlerResult<TeacherCalendar> {
    let calendar = services::full_schedule(
        state.repository.as_ref(),
        state.directory.as_ref(),
        TeacherId::new(teacher_id),
        request.start,
        request.end,
    )
    .await?;
    Ok(Json(calendar))
}

// =============================================================================
// Lessons
// =============================================================================

/// POST /v1/lessons
pub async fn create_lesson(
    State(state): State<AppState>,
    Json(request): Json<CreateLessonRequest>,
) -> HandlerResult<LessonResponse> {
    let lesson = Lesson {
        id: None,
        title: request.title,
        description: request.description,
        lesson_type: request.lesson_type,
        language: request.language,
        level: request.level,
        teacher_id: TeacherId::new(request.teacher_id),
    };
    let stored = state.repository.create_lesson(&lesson).await?;
    Ok(Json(stored.into()))
}

/// GET /v1/lessons?teacher_id=
pub async fn list_lessons(
    State(state): State<AppState>,
    Query(query): Query<LessonsQuery>,
) -> HandlerResult<Vec<LessonResponse>> {
    let lessons = state
        .repository
        .list_lessons(query.teacher_id.map(TeacherId::new))
        .await?;
    Ok(Json(lessons.into_iter().map(Into::into).collect()))
}

/// GET /v1/lessons/{lesson_id}
pub async fn get_lesson(
    State(state): State<AppState>,
    Path(lesson_id): Path<i64>,
) -> HandlerResult<LessonResponse> {
    let lesson = state.repository.get_lesson(LessonId::new(lesson_id)).await?;
    Ok(Json(lesson.into()))
}

/// PUT /v1/lessons/{lesson_id}
pub async fn update_lesson(
    State(state): State<AppState>,
    Path(lesson_id): Path<i64>,
    Json(request): Json<UpdateLessonRequest>,
) -> HandlerResult<LessonResponse> {
    let patch = LessonPatch {
        title: request.title,
        description: request.description,
        lesson_type: request.lesson_type,
        language: request.language,
        level: request.level,
    };
    let updated = state
        .repository
        .update_lesson(LessonId::new(lesson_id), &patch)
        .await?;
    Ok(Json(updated.into()))
}

/// DELETE /v1/lessons/{lesson_id}
pub async fn delete_lesson(
    State(state): State<AppState>,
    Path(lesson_id): Path<i64>,
) -> HandlerResult<DeleteResponse> {
    state.repository.delete_lesson(LessonId::new(lesson_id)).await?;
    Ok(Json(DeleteResponse::deleted()))
}

// =============================================================================
// Sessions
// =============================================================================

/// POST /v1/sessions
///
/// Booking entry point; passes through the conflict guard before commit.
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> HandlerResult<SessionResponse> {
    let session = services::book_session(
        state.repository.as_ref(),
        LessonId::new(request.lesson_id),
        request.start_time,
        request.end_time,
        request.status,
    )
    .await?;
    Ok(Json(session.into()))
}

/// GET /v1/sessions/{session_id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> HandlerResult<SessionResponse> {
    let session = state
        .repository
        .get_session(SessionId::new(session_id))
        .await?;
    Ok(Json(session.into()))
}

/// POST /v1/sessions/by-teacher
pub async fn list_sessions_by_teacher(
    State(state): State<AppState>,
    Json(request): Json<TeacherSessionsRequest>,
) -> HandlerResult<Vec<SessionResponse>> {
    let teacher_id = TeacherId::new(request.teacher_id);
    let settings = state.repository.get_settings(teacher_id).await?;
    let offset = parse_utc_offset(&settings.timezone)
        .map_err(crate::db::repository::RepositoryError::validation)?;

    let from = day_bounds(request.start, offset).start;
    let to = day_bounds(request.end, offset).end;
    let sessions = state
        .repository
        .list_sessions_for_teacher(teacher_id, from, to)
        .await?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

/// PUT /v1/sessions/{session_id}
pub async fn update_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Json(request): Json<UpdateSessionRequest>,
) -> HandlerResult<SessionResponse> {
    let patch = SessionPatch {
        start_time: request.start_time,
        end_time: request.end_time,
        status: request.status,
    };
    let updated = services::reschedule_session(
        state.repository.as_ref(),
        SessionId::new(session_id),
        &patch,
    )
    .await?;
    Ok(Json(updated.into()))
}

/// DELETE /v1/sessions/{session_id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
) -> HandlerResult<DeleteResponse> {
    services::cancel_session(state.repository.as_ref(), SessionId::new(session_id), true).await?;
    Ok(Json(DeleteResponse::deleted()))
}

// =============================================================================
// Participants
// =============================================================================

/// POST /v1/participants
pub async fn add_participant(
    State(state): State<AppState>,
    Json(request): Json<EnrollmentRequest>,
) -> HandlerResult<ParticipantResponse> {
    let participant: Participant = request.into_participant().map_err(AppError::BadRequest)?;
    let stored = state.repository.add_participant(&participant).await?;
    Ok(Json(stored.into()))
}

/// GET /v1/lessons/{lesson_id}/participants
pub async fn list_participants(
    State(state): State<AppState>,
    Path(lesson_id): Path<i64>,
) -> HandlerResult<Vec<ParticipantResponse>> {
    let participants = state
        .repository
        .list_participants(LessonId::new(lesson_id))
        .await?;
    Ok(Json(participants.into_iter().map(Into::into).collect()))
}

/// PUT /v1/participants/{participant_id}?confirmed=
pub async fn set_participant_confirmation(
    State(state): State<AppState>,
    Path(participant_id): Path<i64>,
    Query(query): Query<ConfirmQuery>,
) -> HandlerResult<ParticipantResponse> {
    let updated = state
        .repository
        .set_participant_confirmed(ParticipantId::new(participant_id), query.confirmed)
        .await?;
    Ok(Json(updated.into()))
}

/// DELETE /v1/participants/{participant_id}
pub async fn remove_participant(
    State(state): State<AppState>,
    Path(participant_id): Path<i64>,
) -> HandlerResult<DeleteResponse> {
    state
        .repository
        .remove_participant(ParticipantId::new(participant_id))
        .await?;
    Ok(Json(DeleteResponse::deleted()))
}
