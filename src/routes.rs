use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    handler::{
        assignment::assignments_handler, auth::auth_handler, course::course_handler,
        submission::submissions_handler, users::users_handler,
    },
    middleware::auth,
};

pub fn create_router(app_state: AppState) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .nest(
            "/users",
            users_handler().layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .nest("/courses", course_handler(app_state.clone()))
        .nest("/assignments", assignments_handler(app_state.clone()))
        .nest("/submissions", submissions_handler(app_state.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new().nest("/api", api_route)
}
