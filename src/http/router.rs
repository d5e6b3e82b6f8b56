//! Route table and middleware stack for the calendar API.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Build the application router: versioned API routes behind CORS,
/// compression, and request tracing.
pub fn create_router(state: AppState) -> Router {
    // Permissive CORS; the gateway in front restricts origins in production.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Weekly rules & settings
        .route(
            "/teachers/{teacher_id}/weekly-rules",
            get(handlers::list_rules).post(handlers::create_rule),
        )
        .route(
            "/teachers/{teacher_id}/weekly-rules/{weekday}",
            get(handlers::get_rule).put(handlers::update_rule),
        )
        .route(
            "/teachers/{teacher_id}/settings",
            get(handlers::get_settings).put(handlers::set_timezone),
        )
        // Special days
        .route(
            "/teachers/{teacher_id}/special-days",
            get(handlers::list_special_days).post(handlers::create_special_day),
        )
        .route(
            "/special-days/{special_day_id}",
            put(handlers::update_special_day).delete(handlers::delete_special_day),
        )
        // Unavailable periods
        .route(
            "/teachers/{teacher_id}/unavailable-periods",
            get(handlers::list_unavailable_periods).post(handlers::create_unavailable_period),
        )
        .route(
            "/unavailable-periods/{period_id}",
            axum::routing::delete(handlers::delete_unavailable_period),
        )
        // Availability views
        .route("/teachers/{teacher_id}/free-slots", get(handlers::free_slots))
        .route("/teachers/{teacher_id}/calendar", post(handlers::full_schedule))
        // Lessons
        .route("/lessons", get(handlers::list_lessons).post(handlers::create_lesson))
        .route(
            "/lessons/{lesson_id}",
            get(handlers::get_lesson)
                .put(handlers::update_lesson)
                .delete(handlers::delete_lesson),
        )
        .route(
            "/lessons/{lesson_id}/participants",
            get(handlers::list_participants),
        )
        // Sessions
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/by-teacher", post(handlers::list_sessions_by_teacher))
        .route(
            "/sessions/{session_id}",
            get(handlers::get_session)
                .put(handlers::update_session)
                .delete(handlers::delete_session),
        )
        // Participants
        .route("/participants", post(handlers::add_participant))
        .route(
            "/participants/{participant_id}",
            put(handlers::set_participant_confirmation).delete(handlers::remove_participant),
        );

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::services::directory::NullDirectory;
    use std::sync::Arc;

    #[test]
    fn test_router_builds_with_local_state() {
        let repo =
            Arc::new(LocalRepository::new()) as Arc<dyn crate::db::repository::FullRepository>;
        let state = AppState::new(repo, Arc::new(NullDirectory));
        let _router = create_router(state);
    }
}
