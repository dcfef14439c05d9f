use crate::AppState;
use axum::{
    routing::{get, patch, post, put},
    Router,
};

/// Routes mounted under `/api/v1`.
///
/// The page routing guard is not applied here; every handler that needs a
/// session extracts it itself.
pub fn create_router() -> Router<AppState> {
    let auth_routes = Router::new()
        .route("/auth/login", post(crate::api::handlers::auth::login))
        .route("/auth/logout", post(crate::api::handlers::auth::logout))
        .route("/auth/refresh", post(crate::api::handlers::auth::refresh))
        .route("/auth/me", get(crate::api::handlers::auth::me));

    let admin_routes = Router::new()
        .route(
            "/settings",
            get(crate::api::handlers::settings::list_settings)
                .post(crate::api::handlers::settings::upsert_setting),
        )
        .route(
            "/settings/initialize",
            post(crate::api::handlers::settings::initialize_settings),
        )
        .route(
            "/settings/{key}",
            put(crate::api::handlers::settings::update_setting)
                .delete(crate::api::handlers::settings::delete_setting),
        )
        .route(
            "/bedrock/models",
            get(crate::api::handlers::bedrock::list_models),
        )
        .route("/users", get(crate::api::handlers::users::list_users))
        .route(
            "/users/{id}",
            patch(crate::api::handlers::users::update_user),
        );

    auth_routes.merge(admin_routes)
}
