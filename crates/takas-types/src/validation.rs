//! Form-validation rules for every user-submitted payload.
//!
//! Each check returns a [`ValidationError`] naming the offending field and a
//! Turkish message suitable for showing to the user as-is.

use std::sync::LazyLock;

use chrono::Duration;
use regex::Regex;
use thiserror::Error;

use crate::api::{
    CreateAdRequest, CreateReportRequest, SignupRequest, UpdateAdRequest, UpdateProfileRequest,
};

/// A user may have at most this many non-expired ads at once.
pub const MAX_ACTIVE_ADS: usize = 3;

/// Days an ad stays listed after creation.
pub const AD_LIFETIME_DAYS: i64 = 7;

pub const ALLOWED_EMAIL_SUFFIX: &str = ".edu.tr";

pub const ANY_BRAND_LABEL: &str = "Herhangi bir marka";

pub const AD_UNITS: &[&str] = &["Dal", "Paket", "Karton"];

pub const REPORT_REASONS: &[&str] = &[
    "Spam",
    "Abuse",
    "Misinformation",
    "Inappropriate Content",
    "Other",
];

const MIN_PASSWORD_LEN: usize = 6;
const MAX_RESPONSE_LEN: usize = 1000;
const MAX_CHAT_MESSAGE_LEN: usize = 1000;

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+90|0)?\s*?(\d{3})\s*?(\d{3})\s*?(\d{2})\s*?(\d{2})$")
        .expect("phone pattern compiles")
});

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub type Validated<T> = Result<T, ValidationError>;

pub fn ad_lifetime() -> Duration {
    Duration::days(AD_LIFETIME_DAYS)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
    min_msg: &str,
    max_msg: &str,
) -> Validated<()> {
    let len = char_len(value);
    if len < min {
        return Err(ValidationError::new(field, min_msg));
    }
    if len > max {
        return Err(ValidationError::new(field, max_msg));
    }
    Ok(())
}

/// Normalizes an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// The part of the address after the last `@`, e.g. `hacettepe.edu.tr`.
pub fn university_domain(email: &str) -> String {
    match email.rfind('@') {
        Some(idx) => email[idx + 1..].to_string(),
        None => String::new(),
    }
}

pub fn validate_email(email: &str) -> Validated<()> {
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::new("email", "Geçersiz e-posta adresi."));
    }
    if !email.ends_with(ALLOWED_EMAIL_SUFFIX) {
        return Err(ValidationError::new(
            "email",
            "Sadece .edu.tr uzantılı e-posta adresleri kabul edilmektedir.",
        ));
    }
    Ok(())
}

pub fn validate_full_name(name: &str) -> Validated<()> {
    check_length(
        "full_name",
        name,
        3,
        50,
        "Ad Soyad en az 3 karakter olmalıdır.",
        "Ad Soyad en fazla 50 karakter olabilir.",
    )
}

pub fn validate_phone(phone: &str) -> Validated<()> {
    if PHONE_RE.is_match(phone) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "phone",
            "Geçersiz Türkiye telefon numarası. Örn: 05xxxxxxxxx veya +905xxxxxxxxx",
        ))
    }
}

pub fn validate_password(password: &str) -> Validated<()> {
    if char_len(password) < MIN_PASSWORD_LEN {
        return Err(ValidationError::new(
            "password",
            "Şifre en az 6 karakter olmalıdır.",
        ));
    }
    Ok(())
}

/// A signup form that passed validation, with the email normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub university_domain: String,
}

pub fn validate_signup(req: &SignupRequest) -> Validated<NewUser> {
    let name = req.full_name.trim();
    validate_full_name(name)?;
    let email = normalize_email(&req.email);
    validate_email(&email)?;
    let phone = req.phone.trim();
    validate_phone(phone)?;
    validate_password(&req.password)?;

    Ok(NewUser {
        name: name.to_string(),
        university_domain: university_domain(&email),
        email,
        phone: phone.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpdate {
    pub name: String,
    pub phone: String,
}

pub fn validate_profile_update(req: &UpdateProfileRequest) -> Validated<ProfileUpdate> {
    let name = req.full_name.trim();
    validate_full_name(name)?;
    let phone = req.phone.trim();
    validate_phone(phone)?;
    Ok(ProfileUpdate {
        name: name.to_string(),
        phone: phone.to_string(),
    })
}

/// The user-editable content of an ad.
#[derive(Debug, Clone, PartialEq)]
pub struct AdContent {
    pub requested: String,
    pub offered: String,
    pub message: Option<String>,
}

fn check_requested(field: &'static str, value: &str) -> Validated<()> {
    check_length(
        field,
        value,
        3,
        100,
        "Lütfen en az 3 karakter girin.",
        "En fazla 100 karakter girebilirsiniz.",
    )
}

fn check_offered(value: &str) -> Validated<()> {
    check_length(
        "offered",
        value,
        3,
        200,
        "Lütfen en az 3 karakter girin.",
        "En fazla 200 karakter girebilirsiniz.",
    )
}

fn check_ad_message(message: Option<&str>) -> Validated<Option<String>> {
    let message = message.map(str::trim).filter(|m| !m.is_empty());
    if let Some(m) = message {
        if char_len(m) > 500 {
            return Err(ValidationError::new(
                "message",
                "Mesajınız en fazla 500 karakter olabilir.",
            ));
        }
    }
    Ok(message.map(str::to_string))
}

/// Validates the create form and composes `requested` as
/// `"{quantity} {unit} {brand}"`.
pub fn validate_create_ad(req: &CreateAdRequest) -> Validated<AdContent> {
    let brand = if req.any_brand {
        ANY_BRAND_LABEL
    } else {
        req.requested_brand.trim()
    };
    check_requested("requested_brand", brand)?;

    let quantity = req.requested_quantity.trim();
    if quantity.is_empty() {
        return Err(ValidationError::new("requested_quantity", "Miktar gereklidir"));
    }

    let unit = req.requested_unit.trim();
    if unit.is_empty() {
        return Err(ValidationError::new("requested_unit", "Birim seçimi gereklidir"));
    }
    if !AD_UNITS.contains(&unit) {
        return Err(ValidationError::new("requested_unit", "Geçersiz birim."));
    }

    let offered = req.offered.trim();
    check_offered(offered)?;
    let message = check_ad_message(req.message.as_deref())?;

    Ok(AdContent {
        requested: format!("{} {} {}", quantity, unit, brand),
        offered: offered.to_string(),
        message,
    })
}

pub fn validate_update_ad(req: &UpdateAdRequest) -> Validated<AdContent> {
    let requested = req.requested.trim();
    check_requested("requested", requested)?;
    let offered = req.offered.trim();
    check_offered(offered)?;
    let message = check_ad_message(req.message.as_deref())?;

    Ok(AdContent {
        requested: requested.to_string(),
        offered: offered.to_string(),
        message,
    })
}

pub fn validate_response_message(message: &str) -> Validated<String> {
    let message = message.trim();
    if message.is_empty() {
        return Err(ValidationError::new("message", "Mesajınız boş olamaz."));
    }
    if char_len(message) > MAX_RESPONSE_LEN {
        return Err(ValidationError::new(
            "message",
            "Mesajınız en fazla 1000 karakter olabilir.",
        ));
    }
    Ok(message.to_string())
}

pub fn validate_report(req: &CreateReportRequest) -> Validated<()> {
    if req.reason.trim().is_empty() {
        return Err(ValidationError::new("reason", "Rapor nedeni seçmelisiniz."));
    }
    if !REPORT_REASONS.contains(&req.reason.as_str()) {
        return Err(ValidationError::new("reason", "Geçersiz rapor nedeni."));
    }
    Ok(())
}

pub fn validate_chat_message(text: &str) -> Validated<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::new("text", "Mesaj boş olamaz."));
    }
    if char_len(text) > MAX_CHAT_MESSAGE_LEN {
        return Err(ValidationError::new(
            "text",
            "Mesaj en fazla 1000 karakter olabilir.",
        ));
    }
    Ok(text.to_string())
}
