use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::{debug, info};
use uuid::Uuid;

use takas_db::format_ts;
use takas_db::models::{AdInsert, AdRow};
use takas_types::api::{AdView, Claims, CreateAdRequest, UpdateAdRequest};
use takas_types::format::{time_ago, time_left};
use takas_types::models::{Ad, PublicUser};
use takas_types::validation::{
    MAX_ACTIVE_ADS, ad_lifetime, university_domain, validate_create_ad, validate_update_ad,
};

use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// GET /ads: active ads, the caller's own university first, then newest.
pub async fn list_ads(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<AdView>>, ApiError> {
    let now = Utc::now();
    let ads = match state.ads_cache.get(&()).await {
        Some(ads) => ads,
        None => {
            debug!("Ad listing cache miss");
            let rows = run_db(&state.db, move |db| db.list_active_ads(now)).await?;
            let ads: Vec<Ad> = rows.into_iter().map(AdRow::into_model).collect();
            state.ads_cache.insert((), ads.clone()).await;
            ads
        }
    };

    // Entries may have expired while cached.
    let mut ads: Vec<Ad> = ads.into_iter().filter(|ad| ad.is_active_at(now)).collect();
    sort_for_domain(&mut ads, &university_domain(&claims.email));

    let views = join_all(ads.into_iter().map(|ad| render(&state, ad, now))).await;
    Ok(Json(views))
}

/// GET /ads/{ad_id}
pub async fn get_ad(
    State(state): State<AppState>,
    Path(ad_id): Path<String>,
) -> Result<Json<AdView>, ApiError> {
    let ad = load_ad(&state, &ad_id).await?;
    Ok(Json(render(&state, ad, Utc::now()).await))
}

/// POST /ads
pub async fn create_ad(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateAdRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = validate_create_ad(&req)?;

    let now = Utc::now();
    let row = AdRow {
        id: Uuid::new_v4().to_string(),
        user_id: claims.sub.to_string(),
        university_domain: university_domain(&claims.email),
        requested: content.requested,
        offered: content.offered,
        message: content.message,
        created_at: format_ts(now),
        expires_at: format_ts(now + ad_lifetime()),
        updated_at: None,
    };

    let (outcome, row) = run_db(&state.db, move |db| {
        let outcome = db.create_ad_within_limit(&row, MAX_ACTIVE_ADS, now)?;
        Ok((outcome, row))
    })
    .await?;

    if let AdInsert::LimitReached { active } = outcome {
        info!("User {} hit the active ad limit ({} active)", claims.sub, active);
        return Err(ApiError::ActiveAdLimit);
    }

    let ad = row.into_model();
    info!("User {} posted ad {}", claims.sub, ad.id);
    state.invalidate_ads(claims.sub).await;

    Ok((StatusCode::CREATED, Json(render(&state, ad, now).await)))
}

/// PUT /ads/{ad_id}: owner only, and only while the ad is active.
pub async fn update_ad(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ad_id): Path<String>,
    Json(req): Json<UpdateAdRequest>,
) -> Result<Json<AdView>, ApiError> {
    let ad = load_ad(&state, &ad_id).await?;
    if ad.user_id != claims.sub {
        return Err(ApiError::Forbidden);
    }
    let now = Utc::now();
    if !ad.is_active_at(now) {
        return Err(ApiError::AdExpired);
    }

    let content = validate_update_ad(&req)?;
    let id = ad.id.to_string();
    run_db(&state.db, move |db| {
        db.update_ad(
            &id,
            &content.requested,
            &content.offered,
            content.message.as_deref(),
            now,
        )
    })
    .await?;
    state.invalidate_ads(claims.sub).await;

    let ad = load_ad(&state, &ad_id).await?;
    Ok(Json(render(&state, ad, now).await))
}

/// DELETE /ads/{ad_id}: owner only. Responses go with the ad.
pub async fn delete_ad(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(ad_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let ad = load_ad(&state, &ad_id).await?;
    if ad.user_id != claims.sub {
        return Err(ApiError::Forbidden);
    }

    let id = ad.id.to_string();
    run_db(&state.db, move |db| db.delete_ad(&id)).await?;
    info!("User {} deleted ad {}", claims.sub, ad.id);
    state.invalidate_ads(claims.sub).await;

    Ok(StatusCode::NO_CONTENT)
}

/// Loads an ad by its path id. Malformed ids read as missing.
pub(crate) async fn load_ad(state: &AppState, ad_id: &str) -> Result<Ad, ApiError> {
    let id: Uuid = ad_id.parse().map_err(|_| ApiError::AdNotFound)?;
    let id = id.to_string();
    run_db(&state.db, move |db| db.get_ad(&id))
        .await?
        .map(AdRow::into_model)
        .ok_or(ApiError::AdNotFound)
}

async fn render(state: &AppState, ad: Ad, now: DateTime<Utc>) -> AdView {
    let owner = state.user_cache.get(ad.user_id).await;
    AdView {
        posted_text: time_ago(ad.created_at, now),
        expires_text: time_left(ad.expires_at, now),
        owner: PublicUser::from(&owner),
        ad,
    }
}

/// Ads from `domain` first, then newest first within each group.
fn sort_for_domain(ads: &mut [Ad], domain: &str) {
    let domain = domain.to_lowercase();
    ads.sort_by(|a, b| {
        let a_own = a.university_domain.to_lowercase() == domain;
        let b_own = b.university_domain.to_lowercase() == domain;
        b_own
            .cmp(&a_own)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}
