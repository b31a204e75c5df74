use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use tracing::{error, info};

use takas_types::api::{Claims, PhotoUploadResponse};

use crate::error::ApiError;
use crate::state::{AppState, run_db};
use crate::storage::sanitize_file_name;

/// 2 MB limit for profile photos.
pub const MAX_PHOTO_SIZE: usize = 2 * 1024 * 1024;

/// Body limit for the upload route: the photo plus multipart framing.
pub const PHOTO_BODY_LIMIT: usize = MAX_PHOTO_SIZE + 64 * 1024;

const PHOTO_FIELD: &str = "photo";

/// POST /profile/photo: multipart form with a single image field `photo`.
/// Stored at `profile_photos/{uid}/{millis}_{name}`.
pub async fn upload_photo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<Json<PhotoUploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }

        let file_name = sanitize_file_name(field.file_name().unwrap_or("photo"));
        let content_type = field.content_type().unwrap_or("").to_string();
        if !content_type.starts_with("image/") {
            return Err(ApiError::InvalidUpload(
                "Lütfen bir resim dosyası seçin.".into(),
            ));
        }

        let data = field.bytes().await.map_err(multipart_error)?;
        if data.is_empty() {
            return Err(ApiError::InvalidUpload("Seçilen dosya boş.".into()));
        }
        if data.len() > MAX_PHOTO_SIZE {
            return Err(ApiError::FileTooLarge);
        }

        let key = format!(
            "profile_photos/{}/{}_{}",
            claims.sub,
            Utc::now().timestamp_millis(),
            file_name
        );
        let url = state.storage.put(&key, &data).await.map_err(|e| {
            error!("Failed to store photo {}: {:#}", key, e);
            ApiError::Internal(e)
        })?;

        let id = claims.sub.to_string();
        let stored_url = url.clone();
        let updated = run_db(&state.db, move |db| db.set_profile_photo(&id, &stored_url)).await?;
        if !updated {
            return Err(ApiError::UserNotFound);
        }
        state.user_cache.invalidate(claims.sub).await;
        info!("User {} uploaded profile photo {} ({} bytes)", claims.sub, key, data.len());

        return Ok(Json(PhotoUploadResponse {
            profile_photo_url: url,
        }));
    }

    Err(ApiError::InvalidUpload(
        "İstekte fotoğraf bulunamadı.".into(),
    ))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::FileTooLarge
    } else {
        ApiError::InvalidUpload(format!("Dosya okunamadı: {}", e.body_text()))
    }
}
