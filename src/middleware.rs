use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::IntoResponse,
};

use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    db::UserExt,
    error::{ErrorMessage, HttpError},
    models::{UserAccount, UserRole},
    utils::token,
};

/// Explicit per-request auth context.
///
/// Inserted into the request extensions after successful authentication;
/// handlers extract it to learn the caller's id and role. The data layer
/// never looks this up itself - whoever calls it passes the ids along.
///
/// Example usage in a handler:
/// ```
/// async fn my_handler(Extension(jwt): Extension<JWTAuthMiddleware>) {
///     // jwt.user.id, jwt.user.role
/// }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JWTAuthMiddleware {
    pub user: UserAccount,
}

/// Authentication middleware.
///
/// Extracts the JWT from the `access_token` cookie (browser clients) or the
/// `Authorization: Bearer` header (API clients), decodes it, loads the
/// account from the database (professors and students both), and attaches
/// the auth context for downstream handlers.
///
/// # Errors
/// Returns 401 Unauthorized if no token is provided, the token is invalid or
/// expired, or the account no longer exists.
pub async fn auth(
    cookie_jar: CookieJar,
    State(app_state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let cookies = cookie_jar
        .get("access_token")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|auth_value| {
                    if auth_value.starts_with("Bearer ") {
                        Some(auth_value[7..].to_owned())
                    } else {
                        None
                    }
                })
        });

    let token = cookies
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let token_details = match token::decode_token(token, app_state.env.jwt_secret.as_bytes()) {
        Ok(token_details) => token_details,
        Err(_) => {
            return Err(HttpError::unauthorized(
                ErrorMessage::InvalidToken.to_string(),
            ));
        }
    };

    let user_id = uuid::Uuid::parse_str(&token_details)
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    // the role is re-derived from the row, never trusted from the token
    let account = app_state
        .db_client
        .get_account(Some(user_id), None)
        .await
        .map_err(|_| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?;

    let account = account
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNoLongerExist.to_string()))?;

    req.extensions_mut()
        .insert(JWTAuthMiddleware { user: account });

    Ok(next.run(req).await)
}

/// Role gate applied as a route layer after `auth`.
///
/// The Query & Mutation Layer performs no authorization of its own; this is
/// the single place where the role domain
/// {student, professor, manager, superadmin} restricts what a caller may
/// invoke.
///
/// # Errors
/// Returns 401 if the auth middleware did not run, 403 if the caller's role
/// is not in `required_roles`.
pub async fn role_check(
    req: Request,
    next: Next,
    required_roles: Vec<UserRole>,
) -> Result<impl IntoResponse, HttpError> {
    let user = req
        .extensions()
        .get::<JWTAuthMiddleware>()
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string()))?;

    if !required_roles.contains(&user.user.role) {
        return Err(HttpError::new(
            ErrorMessage::PermissionDenied.to_string(),
            StatusCode::FORBIDDEN,
        ));
    }

    Ok(next.run(req).await)
}
