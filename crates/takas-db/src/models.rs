//! Database row types. These map directly to SQLite rows and keep ids and
//! timestamps as stored text; `into_model` converts to the API-facing types.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use takas_types::models::{Ad, AdResponse, AppUser, ChatMessage, ChatRoom, ChatUser, Report};

fn parse_uuid(raw: &str, what: &str, row_id: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on row '{}': {}", what, raw, row_id, e);
        Uuid::default()
    })
}

fn parse_ts(raw: &str, what: &str, row_id: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}' on row '{}': {}", what, raw, row_id, e);
            DateTime::default()
        })
}

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub university_domain: String,
    pub password_hash: String,
    pub profile_photo_url: Option<String>,
    pub email_verified: bool,
    pub created_at: String,
}

impl UserRow {
    pub fn into_model(self) -> AppUser {
        AppUser {
            uid: parse_uuid(&self.id, "user id", &self.id),
            created_at: parse_ts(&self.created_at, "created_at", &self.id),
            name: self.name,
            email: self.email,
            university_domain: self.university_domain,
            phone: self.phone,
            profile_photo_url: self.profile_photo_url,
            email_verified: self.email_verified,
        }
    }
}

pub struct AdRow {
    pub id: String,
    pub user_id: String,
    pub university_domain: String,
    pub requested: String,
    pub offered: String,
    pub message: Option<String>,
    pub created_at: String,
    pub expires_at: String,
    pub updated_at: Option<String>,
}

impl AdRow {
    pub fn into_model(self) -> Ad {
        Ad {
            id: parse_uuid(&self.id, "ad id", &self.id),
            user_id: parse_uuid(&self.user_id, "user_id", &self.id),
            created_at: parse_ts(&self.created_at, "created_at", &self.id),
            expires_at: parse_ts(&self.expires_at, "expires_at", &self.id),
            updated_at: self
                .updated_at
                .as_deref()
                .map(|raw| parse_ts(raw, "updated_at", &self.id)),
            university_domain: self.university_domain,
            requested: self.requested,
            offered: self.offered,
            message: self.message,
        }
    }
}

pub struct ResponseRow {
    pub id: String,
    pub ad_id: String,
    pub responder_id: String,
    pub ad_owner_id: String,
    pub message: String,
    pub created_at: String,
}

impl ResponseRow {
    pub fn into_model(self) -> AdResponse {
        AdResponse {
            id: parse_uuid(&self.id, "response id", &self.id),
            ad_id: parse_uuid(&self.ad_id, "ad_id", &self.id),
            responder_id: parse_uuid(&self.responder_id, "responder_id", &self.id),
            ad_owner_id: parse_uuid(&self.ad_owner_id, "ad_owner_id", &self.id),
            created_at: parse_ts(&self.created_at, "created_at", &self.id),
            message: self.message,
        }
    }
}

pub struct ReportRow {
    pub id: String,
    pub reporter_id: String,
    pub reported_user_id: String,
    pub ad_id: Option<String>,
    pub reason: String,
    pub created_at: String,
}

impl ReportRow {
    pub fn into_model(self) -> Report {
        Report {
            id: parse_uuid(&self.id, "report id", &self.id),
            reporter_id: parse_uuid(&self.reporter_id, "reporter_id", &self.id),
            reported_user_id: parse_uuid(&self.reported_user_id, "reported_user_id", &self.id),
            ad_id: self
                .ad_id
                .as_deref()
                .map(|raw| parse_uuid(raw, "ad_id", &self.id)),
            created_at: parse_ts(&self.created_at, "created_at", &self.id),
            reason: self.reason,
        }
    }
}

pub struct ChatRoomRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl ChatRoomRow {
    pub fn into_model(self) -> ChatRoom {
        ChatRoom {
            id: self.id,
            name: self.name,
            description: self.description,
        }
    }
}

pub struct ChatMessageRow {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_avatar_url: Option<String>,
    pub text: String,
    pub created_at: String,
}

impl ChatMessageRow {
    pub fn into_model(self) -> ChatMessage {
        ChatMessage {
            id: parse_uuid(&self.id, "message id", &self.id),
            sender: ChatUser {
                id: parse_uuid(&self.sender_id, "sender_id", &self.id),
                name: self.sender_name,
                avatar_url: self.sender_avatar_url,
            },
            timestamp: parse_ts(&self.created_at, "created_at", &self.id),
            room_id: self.room_id,
            text: self.text,
        }
    }
}

/// Purpose of a one-time emailed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    VerifyEmail,
    ResetPassword,
}

impl TokenPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VerifyEmail => "verify_email",
            Self::ResetPassword => "reset_password",
        }
    }
}

/// Outcome of a user insert. Emails are unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInsert {
    Created,
    EmailTaken,
}

/// Outcome of an ad insert guarded by the active-ad limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdInsert {
    Created,
    LimitReached { active: usize },
}
