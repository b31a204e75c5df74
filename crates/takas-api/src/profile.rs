use axum::extract::State;
use axum::{Extension, Json};
use tracing::info;

use takas_types::api::{Claims, UpdateProfileRequest};
use takas_types::models::AppUser;
use takas_types::validation::validate_profile_update;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// GET /profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<AppUser>, ApiError> {
    Ok(Json(load_user(&state, &claims).await?))
}

/// PUT /profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<AppUser>, ApiError> {
    let update = validate_profile_update(&req)?;

    let id = claims.sub.to_string();
    let updated = run_db(&state.db, move |db| {
        db.update_profile(&id, &update.name, &update.phone)
    })
    .await?;
    if !updated {
        return Err(ApiError::UserNotFound);
    }
    state.user_cache.invalidate(claims.sub).await;
    info!("User {} updated their profile", claims.sub);

    Ok(Json(load_user(&state, &claims).await?))
}

/// Reads the caller straight from the database, bypassing the user cache.
pub(crate) async fn load_user(state: &AppState, claims: &Claims) -> Result<AppUser, ApiError> {
    let id = claims.sub.to_string();
    run_db(&state.db, move |db| db.get_user_by_id(&id))
        .await?
        .map(|row| row.into_model())
        .ok_or(ApiError::UserNotFound)
}
