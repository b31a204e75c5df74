use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use takas_db::format_ts;
use takas_db::models::ResponseRow;
use takas_types::api::{Claims, CreateResponseRequest};
use takas_types::models::Ad;
use takas_types::validation::validate_response_message;

use crate::ads::load_ad;
use crate::error::ApiError;
use crate::mailer::new_response_email;
use crate::state::{AppState, run_db};

/// POST /ads/{ad_id}/responses
pub async fn create_response(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ad_id): Path<String>,
    Json(req): Json<CreateResponseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = validate_response_message(&req.message)?;

    let ad = load_ad(&state, &ad_id).await?;
    if ad.user_id == claims.sub {
        return Err(ApiError::OwnAd);
    }
    let now = Utc::now();
    if !ad.is_active_at(now) {
        return Err(ApiError::AdExpired);
    }

    let row = ResponseRow {
        id: Uuid::new_v4().to_string(),
        ad_id: ad.id.to_string(),
        responder_id: claims.sub.to_string(),
        ad_owner_id: ad.user_id.to_string(),
        message,
        created_at: format_ts(now),
    };
    let row = run_db(&state.db, move |db| {
        db.insert_response(&row)?;
        Ok(row)
    })
    .await?;
    let response = row.into_model();
    info!(
        "User {} responded to ad {} ({})",
        claims.sub, ad.id, response.id
    );

    state.activity_cache.invalidate(&ad.user_id).await;

    let notify_state = state.clone();
    let responder_id = claims.sub;
    let fallback_name = claims.name.clone();
    let text = response.message.clone();
    tokio::spawn(async move {
        let responder = notify_state.user_cache.get(responder_id).await;
        let responder_name = if responder.email.is_empty() {
            fallback_name
        } else {
            responder.name
        };
        notify_owner(&notify_state, &ad, &responder_name, &text).await;
    });

    Ok((StatusCode::CREATED, Json(response)))
}

/// Emails the ad owner about a new response. Failures are only logged.
async fn notify_owner(state: &AppState, ad: &Ad, responder_name: &str, message: &str) {
    let owner = state.user_cache.get(ad.user_id).await;
    if owner.email.is_empty() {
        warn!("Skipping response notification for ad {}: owner email unknown", ad.id);
        return;
    }

    let link = format!("{}/my-activity", state.app_url);
    let email = new_response_email(
        &owner.email,
        &owner.name,
        responder_name,
        &ad.requested,
        message,
        &link,
    );
    if let Err(e) = state.mailer.send(email).await {
        warn!("Failed to notify {} about a response to ad {}: {:#}", owner.uid, ad.id, e);
    }
}
