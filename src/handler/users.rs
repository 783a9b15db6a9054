use crate::{
    AppState,
    db::UserExt,
    dtos::{FilterUserDto, Response, UserData, UserListResponseDto, UserResponseDto},
    error::{ErrorMessage, HttpError},
    middleware::{JWTAuthMiddleware, role_check},
    models::UserRole,
};
use axum::{
    Extension, Json, Router,
    extract::State,
    http::{HeaderMap, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::Cookie;
use tracing::instrument;

/// Router for account endpoints.
///
/// The auth middleware is applied to the whole nest in routes.rs; individual
/// routes add role restrictions on top.
pub fn users_handler() -> Router<AppState> {
    Router::new()
        // GET /me - the caller's own session context, any authenticated role
        .route(
            "/me",
            get(get_me).layer(middleware::from_fn(|req, next| {
                role_check(
                    req,
                    next,
                    vec![
                        UserRole::Superadmin,
                        UserRole::Manager,
                        UserRole::Professor,
                        UserRole::Student,
                    ],
                )
            })),
        )
        // GET /professors - course-form population (admin roles only)
        .route(
            "/professors",
            get(get_professors).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Manager, UserRole::Superadmin])
            })),
        )
        // GET /students - course-form population (admin roles only)
        .route(
            "/students",
            get(get_students).layer(middleware::from_fn(|req, next| {
                role_check(req, next, vec![UserRole::Manager, UserRole::Superadmin])
            })),
        )
        // POST /logout - clears the access token cookie
        .route("/logout", post(logout))
}

/// Echo the authenticated user's id, names and role
#[instrument(skip(user), fields(username = %user.user.username))]
pub async fn get_me(
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let filtered_user = FilterUserDto::filter_account(&user.user);

    let response_data = UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: filtered_user,
        },
    };
    Ok(Json(response_data))
}

/// List all professors (for assembling course membership forms)
#[instrument(skip(app_state))]
pub async fn get_professors(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let professors = app_state.db_client.get_professors().await.map_err(|e| {
        tracing::error!("DB error, getting professors: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let response = UserListResponseDto {
        status: "success".to_string(),
        results: professors.len() as i64,
        users: FilterUserDto::filter_professors(&professors),
    };
    Ok(Json(response))
}

/// List all students (for assembling course membership forms)
#[instrument(skip(app_state))]
pub async fn get_students(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, HttpError> {
    let students = app_state.db_client.get_students().await.map_err(|e| {
        tracing::error!("DB error, getting students: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let response = UserListResponseDto {
        status: "success".to_string(),
        results: students.len() as i64,
        users: FilterUserDto::filter_students(&students),
    };
    Ok(Json(response))
}

/// Log out by expiring the access token cookie
#[instrument(skip(user), fields(username = %user.user.username))]
pub async fn logout(
    Extension(user): Extension<JWTAuthMiddleware>,
) -> Result<impl IntoResponse, HttpError> {
    let access_cookie = Cookie::build(("access_token", ""))
        .path("/")
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .build();

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        access_cookie.to_string().parse().unwrap(),
    );

    let json_response = Json(Response {
        status: "success",
        message: "Logout successful".to_string(),
    });

    let mut response = json_response.into_response();
    response.headers_mut().extend(headers);
    tracing::info!("logout successful");
    Ok(response)
}
