use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Ad, AppUser, PublicUser};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the chat gateway.
/// Tokens are only ever issued to users with a verified email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AppUser,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PasswordResetConfirm {
    pub token: String,
    pub new_password: String,
}

/// Generic acknowledgement carrying a user-facing message.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// -- Ads --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAdRequest {
    #[serde(default)]
    pub requested_brand: String,
    #[serde(default)]
    pub any_brand: bool,
    pub requested_quantity: String,
    pub requested_unit: String,
    pub offered: String,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAdRequest {
    pub requested: String,
    pub offered: String,
    pub message: Option<String>,
}

/// An ad as rendered in the marketplace listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdView {
    #[serde(flatten)]
    pub ad: Ad,
    pub owner: PublicUser,
    pub posted_text: String,
    pub expires_text: String,
}

// -- Responses --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateResponseRequest {
    pub message: String,
}

// -- Reports --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReportRequest {
    pub reported_user_id: Uuid,
    pub ad_id: Option<Uuid>,
    pub reason: String,
}

// -- Profile --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub full_name: String,
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PhotoUploadResponse {
    pub profile_photo_url: String,
}

// -- Chat --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendChatMessageRequest {
    pub text: String,
}

// -- Errors --

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}
