use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use takas_types::api::ErrorBody;
use takas_types::validation::{MAX_ACTIVE_ADS, ValidationError};

/// Message shown for every failure without a more specific translation.
pub const GENERIC_ERROR_MESSAGE: &str = "Bir hata oluştu. Lütfen tekrar deneyin.";

/// Every failure an HTTP handler can return. Each variant maps to a stable
/// machine-readable code and a Turkish message for the user.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("email already in use")]
    EmailAlreadyInUse,

    #[error("invalid credential")]
    InvalidCredential,

    #[error("email not verified")]
    EmailNotVerified,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("user not found")]
    UserNotFound,

    #[error("missing or invalid bearer token")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("ad not found")]
    AdNotFound,

    #[error("cannot respond to own ad")]
    OwnAd,

    #[error("ad expired")]
    AdExpired,

    #[error("active ad limit reached")]
    ActiveAdLimit,

    #[error("chat room not found")]
    RoomNotFound,

    #[error("cannot report yourself")]
    SelfReport,

    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    #[error("file too large")]
    FileTooLarge,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidToken | Self::SelfReport | Self::InvalidUpload(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidCredential | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::EmailNotVerified | Self::Forbidden | Self::OwnAd => StatusCode::FORBIDDEN,
            Self::UserNotFound | Self::AdNotFound | Self::RoomNotFound => StatusCode::NOT_FOUND,
            Self::EmailAlreadyInUse | Self::AdExpired | Self::ActiveAdLimit => StatusCode::CONFLICT,
            Self::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "invalid_argument",
            Self::EmailAlreadyInUse => "email_already_in_use",
            Self::InvalidCredential => "invalid_credential",
            Self::EmailNotVerified => "email_not_verified",
            Self::InvalidToken => "invalid_token",
            Self::UserNotFound => "user_not_found",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::AdNotFound => "ad_not_found",
            Self::OwnAd => "own_ad",
            Self::AdExpired => "ad_expired",
            Self::ActiveAdLimit => "active_ad_limit",
            Self::RoomNotFound => "room_not_found",
            Self::SelfReport => "self_report",
            Self::InvalidUpload(_) => "invalid_upload",
            Self::FileTooLarge => "file_too_large",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.message.clone(),
            Self::EmailAlreadyInUse => "Bu e-posta adresi zaten kayıtlı.".into(),
            Self::InvalidCredential => "E-posta veya şifre hatalı.".into(),
            Self::EmailNotVerified => {
                "Lütfen giriş yapmadan önce e-postanızı doğrulayın. Gelen kutunuzu ve spam klasörünüzü kontrol edin.".into()
            }
            Self::InvalidToken => "Bağlantı geçersiz veya süresi dolmuş.".into(),
            Self::UserNotFound => "Bu e-posta adresi ile kayıtlı bir kullanıcı bulunamadı.".into(),
            Self::Unauthenticated => "Bu işlem için giriş yapmalısınız.".into(),
            Self::Forbidden => "Bu işlem için yetkiniz bulunmamaktadır.".into(),
            Self::AdNotFound => "İlan bulunamadı veya artık mevcut değil.".into(),
            Self::OwnAd => "Kendi ilanınıza yanıt veremezsiniz.".into(),
            Self::AdExpired => "Bu ilanın süresi dolmuş.".into(),
            Self::ActiveAdLimit => format!(
                "En fazla {MAX_ACTIVE_ADS} aktif ilanınız olabilir. Yeni bir ilan yayınlamak için mevcut ilanlarınızdan birinin süresinin dolmasını bekleyin veya silin."
            ),
            Self::RoomNotFound => "Sohbet odası bulunamadı.".into(),
            Self::SelfReport => "Kendinizi raporlayamazsınız.".into(),
            Self::InvalidUpload(msg) => msg.clone(),
            Self::FileTooLarge => "Lütfen 2MB'dan küçük bir fotoğraf seçin.".into(),
            Self::Internal(_) => GENERIC_ERROR_MESSAGE.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(e) = &self {
            error!("Internal error: {:#}", e);
        }

        let field = match &self {
            Self::Validation(e) => Some(e.field.to_string()),
            _ => None,
        };
        let body = ErrorBody {
            code: self.code().to_string(),
            message: self.user_message(),
            field,
        };

        (self.status(), Json(body)).into_response()
    }
}
