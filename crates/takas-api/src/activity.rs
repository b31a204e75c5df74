use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::{debug, warn};
use uuid::Uuid;

use takas_db::models::{AdRow, ResponseRow};
use takas_types::api::Claims;
use takas_types::format::time_ago_short;
use takas_types::models::{Ad, FullAdResponse, UserAdWithResponses};

use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// GET /users/{user_id}/activity: the caller's ads with every response
/// and responder.
pub async fn get_activity(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<UserAdWithResponses>>, ApiError> {
    if user_id != claims.sub {
        return Err(ApiError::Forbidden);
    }

    if let Some(mut cached) = state.activity_cache.get(&user_id).await {
        stamp_response_times(&mut cached, Utc::now());
        return Ok(Json(cached));
    }
    debug!("Activity cache miss for {}", user_id);

    let uid = user_id.to_string();
    let ads: Vec<Ad> = run_db(&state.db, move |db| db.list_ads_by_user(&uid))
        .await?
        .into_iter()
        .map(AdRow::into_model)
        .collect();

    let mut activity = join_all(ads.into_iter().map(|ad| with_responses(&state, ad))).await;
    state.activity_cache.insert(user_id, activity.clone()).await;

    stamp_response_times(&mut activity, Utc::now());
    Ok(Json(activity))
}

/// Relative times go stale while cached, so they are filled in per request.
fn stamp_response_times(activity: &mut [UserAdWithResponses], now: DateTime<Utc>) {
    for entry in activity {
        for full in &mut entry.responses {
            full.responded_text = time_ago_short(full.response.created_at, now);
        }
    }
}

/// Attaches responses to an ad. A failed fetch yields an empty list so
/// one bad ad does not fail the whole page.
async fn with_responses(state: &AppState, ad: Ad) -> UserAdWithResponses {
    let ad_id = ad.id.to_string();
    let rows = match run_db(&state.db, move |db| db.list_responses_for_ad(&ad_id)).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!("Failed to load responses for ad {}: {:#}", ad.id, e);
            Vec::new()
        }
    };

    let responses = join_all(rows.into_iter().map(ResponseRow::into_model).map(|response| async move {
        let responder_details = state.user_cache.get(response.responder_id).await;
        FullAdResponse {
            response,
            responder_details,
            responded_text: String::new(),
        }
    }))
    .await;

    UserAdWithResponses { ad, responses }
}
