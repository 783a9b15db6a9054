use axum::Extension;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json};
use axum::routing::put;
use axum::{Router, middleware};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use crate::db::SubmissionExt;
use crate::dtos::{GradeSubmissionDto, Response};
use crate::error::{ErrorMessage, HttpError};
use crate::middleware::{JWTAuthMiddleware, auth, role_check};
use crate::models::UserRole;
use tracing::instrument;

pub fn submissions_handler(app_state: AppState) -> Router<AppState> {
    Router::new().route(
        "/{submission_id}/grade",
        put(grade_submission)
            .route_layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Professor])
            }))
            .route_layer(middleware::from_fn_with_state(app_state, auth)),
    )
}

/// Grade a submission and reconcile its feedback.
///
/// The status moves to passed or failed unconditionally - regrading is
/// allowed from any current state. Feedback text drives a three-way branch
/// in the data layer: empty text deletes an existing note, non-empty text
/// overwrites or inserts one.
#[instrument(skip(app_state, jwt, body), fields(username = %jwt.user.username))]
pub async fn grade_submission(
    Path(submission_id): Path<Uuid>,
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<GradeSubmissionDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid grade_submission input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    app_state
        .db_client
        .grade_submission(submission_id, body.new_status, &body.feedback)
        .await
        .map_err(|e| {
            if let sqlx::Error::RowNotFound = e {
                tracing::error!("Submission not found: {}", submission_id);
                return HttpError::not_found("Submission not found");
            }
            tracing::error!("DB error, grading submission: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = Json(Response {
        status: "success",
        message: "Submission graded successfully.".to_string(),
    });
    tracing::info!("grade_submission successful");
    Ok(response)
}
