use argon2::password_hash::SaltString;
use rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use takas_db::format_ts;
use takas_db::models::{TokenPurpose, UserInsert, UserRow};
use takas_types::api::{
    Claims, LoginRequest, LoginResponse, MessageResponse, PasswordResetConfirm,
    PasswordResetRequest, SignupRequest, SignupResponse, VerifyEmailQuery,
};
use takas_types::validation::{normalize_email, validate_password, validate_signup};

use crate::error::ApiError;
use crate::mailer::{password_reset_email, verification_email};
use crate::state::{AppState, run_db};

const JWT_LIFETIME_DAYS: i64 = 30;
const VERIFY_TOKEN_HOURS: i64 = 24;
const RESET_TOKEN_HOURS: i64 = 1;

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new_user = validate_signup(&req)?;

    let email = new_user.email.clone();
    let existing = run_db(&state.db, move |db| db.get_user_by_email(&email)).await?;
    if existing.is_some() {
        return Err(ApiError::EmailAlreadyInUse);
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();
    let row = UserRow {
        id: user_id.to_string(),
        email: new_user.email.clone(),
        name: new_user.name.clone(),
        phone: new_user.phone,
        university_domain: new_user.university_domain,
        password_hash,
        profile_photo_url: None,
        email_verified: false,
        created_at: format_ts(Utc::now()),
    };
    // A concurrent signup may have claimed the email since the check above.
    if run_db(&state.db, move |db| db.create_user(&row)).await? == UserInsert::EmailTaken {
        return Err(ApiError::EmailAlreadyInUse);
    }
    info!("New user {} registered ({})", user_id, new_user.email);

    send_verification(&state, user_id, &new_user.email, &new_user.name).await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id,
            email: new_user.email,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let row = check_credentials(&state, &req).await?;
    if !row.email_verified {
        return Err(ApiError::EmailNotVerified);
    }

    let user = row.into_model();
    let token = create_token(&state.jwt_secret, user.uid, &user.email, &user.name)?;

    Ok(Json(LoginResponse { token, user }))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = consume_token(&state, &query.token, TokenPurpose::VerifyEmail).await?;

    let id = user_id.clone();
    run_db(&state.db, move |db| db.set_email_verified(&id)).await?;
    if let Ok(uid) = user_id.parse() {
        state.user_cache.invalidate(uid).await;
    }
    info!("User {} verified their email", user_id);

    Ok(Json(MessageResponse {
        message: "E-posta adresiniz doğrulandı. Artık giriş yapabilirsiniz.".into(),
    }))
}

/// Re-sends the verification link. Requires the account password so the
/// endpoint cannot be used to spam arbitrary addresses.
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let row = check_credentials(&state, &req).await?;
    if row.email_verified {
        return Ok(Json(MessageResponse {
            message: "E-posta adresiniz zaten doğrulanmış.".into(),
        }));
    }

    let user_id: Uuid = row.id.parse().map_err(anyhow::Error::from)?;
    send_verification(&state, user_id, &row.email, &row.name).await?;

    Ok(Json(MessageResponse {
        message: "E-posta adresinize bir doğrulama bağlantısı gönderildi. Lütfen e-postanızı kontrol edin ve hesabınızı doğrulayın.".into(),
    }))
}

pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = normalize_email(&req.email);
    let row = run_db(&state.db, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::UserNotFound)?;

    let token = issue_one_time_token(
        &state,
        &row.id,
        TokenPurpose::ResetPassword,
        Duration::hours(RESET_TOKEN_HOURS),
    )
    .await?;
    let link = format!("{}/reset-password?token={}", state.app_url, token);
    state
        .mailer
        .send(password_reset_email(&row.email, &row.name, &link))
        .await?;

    Ok(Json(MessageResponse {
        message: "Şifre sıfırlama bağlantısı e-posta adresinize gönderildi. Lütfen gelen kutunuzu ve spam klasörünüzü kontrol edin.".into(),
    }))
}

pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetConfirm>,
) -> Result<Json<MessageResponse>, ApiError> {
    validate_password(&req.new_password)?;
    let user_id = consume_token(&state, &req.token, TokenPurpose::ResetPassword).await?;

    let password_hash = hash_password(&req.new_password)?;
    let id = user_id.clone();
    run_db(&state.db, move |db| db.update_password(&id, &password_hash)).await?;
    info!("User {} reset their password", user_id);

    Ok(Json(MessageResponse {
        message: "Şifreniz güncellendi. Yeni şifrenizle giriş yapabilirsiniz.".into(),
    }))
}

async fn check_credentials(
    state: &AppState,
    req: &LoginRequest,
) -> Result<UserRow, ApiError> {
    let email = normalize_email(&req.email);
    let row = run_db(&state.db, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::InvalidCredential)?;

    let parsed_hash = PasswordHash::new(&row.password_hash)
        .map_err(|e| anyhow::anyhow!("Stored password hash is invalid: {}", e))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredential)?;

    Ok(row)
}

async fn send_verification(
    state: &AppState,
    user_id: Uuid,
    email: &str,
    name: &str,
) -> Result<(), ApiError> {
    let token = issue_one_time_token(
        state,
        &user_id.to_string(),
        TokenPurpose::VerifyEmail,
        Duration::hours(VERIFY_TOKEN_HOURS),
    )
    .await?;
    let link = format!("{}/verify-email?token={}", state.app_url, token);

    // The account exists either way; a failed send can be retried with
    // the resend endpoint.
    if let Err(e) = state.mailer.send(verification_email(email, name, &link)).await {
        warn!("Failed to send verification email to {}: {:#}", email, e);
    }
    Ok(())
}

/// Creates a random URL-safe token, stores its hash and returns the token.
async fn issue_one_time_token(
    state: &AppState,
    user_id: &str,
    purpose: TokenPurpose,
    lifetime: Duration,
) -> Result<String, ApiError> {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    let token = URL_SAFE_NO_PAD.encode(bytes);

    let token_hash = hash_token(&token);
    let user_id = user_id.to_string();
    let expires_at = Utc::now() + lifetime;
    run_db(&state.db, move |db| {
        db.replace_auth_token(&token_hash, &user_id, purpose, expires_at)
    })
    .await?;

    Ok(token)
}

async fn consume_token(
    state: &AppState,
    token: &str,
    purpose: TokenPurpose,
) -> Result<String, ApiError> {
    let token_hash = hash_token(token);
    run_db(&state.db, move |db| {
        db.consume_auth_token(&token_hash, purpose, Utc::now())
    })
    .await?
    .ok_or(ApiError::InvalidToken)
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn create_token(
    secret: &str,
    user_id: Uuid,
    email: &str,
    name: &str,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        name: name.to_string(),
        exp: (Utc::now() + Duration::days(JWT_LIFETIME_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
