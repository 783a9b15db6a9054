use axum::Extension;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::{Router, middleware};
use validator::Validate;

use crate::AppState;
use crate::db::CourseExt;
use crate::dtos::{
    CoursesWithStudentsResponseDto, FilterUserDto, StudentCoursesResponseDto, UpsertCourseDto,
    UpsertCourseResponseDto, UserListResponseDto,
};
use crate::error::{ErrorMessage, HttpError};
use crate::handler::assignment::course_assignments_handler;
use crate::middleware::{JWTAuthMiddleware, auth, role_check};
use crate::models::UserRole;
use tracing::instrument;

pub fn course_handler(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(get_courses)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Professor, UserRole::Student])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/",
            post(upsert_course)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(req, next, vec![UserRole::Manager, UserRole::Superadmin])
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .route(
            "/{course_id}/professors",
            get(get_professors_in_course)
                .route_layer(middleware::from_fn(|req, next| {
                    role_check(
                        req,
                        next,
                        vec![UserRole::Professor, UserRole::Manager, UserRole::Superadmin],
                    )
                }))
                .route_layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .nest(
            "/{course_id}/assignments",
            course_assignments_handler(app_state),
        )
}

/// Course overview, shaped by who is asking.
///
/// A professor gets every course they teach with the full student roster
/// attached (grouped client-side, one entry per course); a student gets the
/// flat list of courses they are enrolled in.
#[instrument(skip(app_state, jwt), fields(username = %jwt.user.username))]
pub async fn get_courses(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    match jwt.user.role {
        UserRole::Professor => {
            let courses = app_state
                .db_client
                .get_available_courses_by_professor(jwt.user.id)
                .await
                .map_err(|e| {
                    tracing::error!("DB error, getting professor courses: {}", e);
                    HttpError::server_error("Error retrieving courses with related data.")
                })?;

            let response = Json(CoursesWithStudentsResponseDto {
                status: "success".to_string(),
                data: courses,
            });
            Ok(response.into_response())
        }
        _ => {
            let courses = app_state
                .db_client
                .get_courses_by_student(jwt.user.id)
                .await
                .map_err(|e| {
                    tracing::error!("DB error, getting student courses: {}", e);
                    HttpError::server_error("Error retrieving courses with related data.")
                })?;

            let response = Json(StudentCoursesResponseDto {
                status: "success".to_string(),
                data: courses,
            });
            Ok(response.into_response())
        }
    }
}

/// Create or update a course and replace its membership wholesale.
///
/// The submitted professor/student lists are the complete desired
/// membership; on update every existing mapping row is deleted and the lists
/// reinserted. Database failures surface as one generic message, phrased by
/// create vs update.
#[instrument(skip(app_state, jwt, body), fields(username = %jwt.user.username))]
pub async fn upsert_course(
    State(app_state): State<AppState>,
    Extension(jwt): Extension<JWTAuthMiddleware>,
    Json(body): Json<UpsertCourseDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid upsert_course input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let is_update = body.id.is_some();

    let course_id = app_state
        .db_client
        .upsert_course(&body)
        .await
        .map_err(|e| {
            if let sqlx::Error::RowNotFound = e {
                tracing::error!("Course not found for update");
                return HttpError::not_found("Course not found");
            }
            tracing::error!("DB error, upserting course: {}", e);
            if is_update {
                HttpError::server_error("An error occurred while updating the course.")
            } else {
                HttpError::server_error("An error occurred while creating the course.")
            }
        })?;

    let message = if is_update {
        "Course updated successfully."
    } else {
        "Course created successfully."
    };

    let response = Json(UpsertCourseResponseDto {
        status: "success".to_string(),
        message: message.to_string(),
        id: course_id,
    });
    tracing::info!("upsert_course successful");
    Ok(response)
}

/// List the professors mapped to a course
#[instrument(skip(app_state))]
pub async fn get_professors_in_course(
    Path(course_id): Path<uuid::Uuid>,
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let professors = app_state
        .db_client
        .get_professors_in_course(course_id)
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting course professors: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    let response = UserListResponseDto {
        status: "success".to_string(),
        results: professors.len() as i64,
        users: FilterUserDto::filter_professors(&professors),
    };
    Ok(Json(response))
}
