use crate::{
    AppState,
    db::UserExt,
    dtos::{FilterUserDto, LoginUserDto, UserLoginResponseDto},
    error::{ErrorMessage, HttpError},
    utils::{password, token},
};
use axum::{
    Json, Router,
    http::{HeaderMap, header},
    response::IntoResponse,
    routing::post,
};
use axum_extra::extract::cookie::Cookie;
use axum::extract::State;
use validator::Validate;

use tracing::instrument;

/// Router for authentication endpoints.
///
/// There is no self-service registration: accounts are provisioned
/// administratively, so login is the only entry point.
pub fn auth_handler() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

/// Log in with username + password.
///
/// Credentials are checked against professors and students alike (the two
/// tables are queried together); the stored argon2 hash is verified, never
/// compared as plain text. On success a JWT is issued both in the response
/// body and as an http-only cookie, carrying the user id; the role is
/// re-read from the database on every authenticated request.
#[instrument(skip(app_state, body), fields(username = %body.username))]
pub async fn login(
    State(app_state): State<AppState>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate().map_err(|e| {
        tracing::error!("Invalid login input: {}", e);
        HttpError::bad_request(e.to_string())
    })?;

    let account = app_state
        .db_client
        .get_account(None, Some(&body.username))
        .await
        .map_err(|e| {
            tracing::error!("DB error, getting account: {}", e);
            HttpError::server_error(ErrorMessage::ServerError.to_string())
        })?;

    // same error for unknown user and wrong password
    let account = account
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::WrongCredentials.to_string()))?;

    let password_match = password::compare(&body.password, &account.password).map_err(|e| {
        tracing::error!("Password comparison error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    if !password_match {
        tracing::error!("Wrong password for {}", body.username);
        return Err(HttpError::unauthorized(
            ErrorMessage::WrongCredentials.to_string(),
        ));
    }

    let access_token = token::create_token(
        &account.id.to_string(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage * 60,
    )
    .map_err(|e| {
        tracing::error!("Token creation error: {}", e);
        HttpError::server_error(ErrorMessage::ServerError.to_string())
    })?;

    let access_cookie = Cookie::build(("access_token", access_token.clone()))
        .path("/")
        .max_age(time::Duration::minutes(app_state.env.jwt_maxage))
        .http_only(true)
        .build();

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        access_cookie.to_string().parse().unwrap(),
    );

    let json_response = Json(UserLoginResponseDto {
        status: "success".to_string(),
        access_token,
        user: FilterUserDto::filter_account(&account),
    });

    let mut response = json_response.into_response();
    response.headers_mut().extend(headers);
    tracing::info!("login successful");
    Ok(response)
}
