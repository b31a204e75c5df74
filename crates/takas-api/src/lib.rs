pub mod activity;
pub mod ads;
pub mod auth;
pub mod cache;
pub mod chat;
pub mod error;
pub mod mailer;
pub mod middleware;
pub mod photos;
pub mod profile;
pub mod reports;
pub mod responses;
pub mod state;
pub mod storage;
pub mod user_cache;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower_http::services::ServeDir;

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::storage::FILES_ROUTE;

/// Every HTTP and WebSocket route of the service. Transport layers (CORS,
/// tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/verify", get(auth::verify_email))
        .route("/auth/verification/resend", post(auth::resend_verification))
        .route("/auth/password-reset", post(auth::request_password_reset))
        .route(
            "/auth/password-reset/confirm",
            post(auth::confirm_password_reset),
        )
        .route("/gateway", get(chat::gateway));

    let protected_routes = Router::new()
        .route("/ads", get(ads::list_ads).post(ads::create_ad))
        .route(
            "/ads/{ad_id}",
            get(ads::get_ad).put(ads::update_ad).delete(ads::delete_ad),
        )
        .route("/ads/{ad_id}/responses", post(responses::create_response))
        .route("/users/{user_id}/activity", get(activity::get_activity))
        .route("/reports", post(reports::create_report))
        .route(
            "/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route(
            "/profile/photo",
            post(photos::upload_photo).layer(DefaultBodyLimit::max(photos::PHOTO_BODY_LIMIT)),
        )
        .route("/chat/rooms", get(chat::list_rooms))
        .route(
            "/chat/rooms/{room_id}/messages",
            get(chat::list_messages).post(chat::send_message),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service(FILES_ROUTE, ServeDir::new(state.storage.root()))
        .with_state(state)
}
