use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use takas_db::format_ts;
use takas_db::models::ReportRow;
use takas_types::api::{Claims, CreateReportRequest};
use takas_types::validation::validate_report;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// POST /reports
pub async fn create_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateReportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_report(&req)?;
    if req.reported_user_id == claims.sub {
        return Err(ApiError::SelfReport);
    }

    let row = ReportRow {
        id: Uuid::new_v4().to_string(),
        reporter_id: claims.sub.to_string(),
        reported_user_id: req.reported_user_id.to_string(),
        ad_id: req.ad_id.map(|id| id.to_string()),
        reason: req.reason.trim().to_string(),
        created_at: format_ts(Utc::now()),
    };
    let row = run_db(&state.db, move |db| {
        db.insert_report(&row)?;
        Ok(row)
    })
    .await?;

    let report = row.into_model();
    info!(
        "User {} reported user {} for '{}'",
        claims.sub, report.reported_user_id, report.reason
    );

    Ok((StatusCode::CREATED, Json(report)))
}
