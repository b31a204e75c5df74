use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Application-level user profile. Distinct from the credentials row kept
/// by the database crate: the password hash never reaches this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppUser {
    pub uid: Uuid,
    pub name: String,
    pub email: String,
    pub university_domain: String,
    pub phone: String,
    pub profile_photo_url: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// The subset of a user shown next to someone else's ad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub uid: Uuid,
    pub name: String,
    pub university_domain: String,
    pub profile_photo_url: Option<String>,
}

impl From<&AppUser> for PublicUser {
    fn from(user: &AppUser) -> Self {
        Self {
            uid: user.uid,
            name: user.name.clone(),
            university_domain: user.university_domain.clone(),
            profile_photo_url: user.profile_photo_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ad {
    pub id: Uuid,
    pub user_id: Uuid,
    pub university_domain: String,
    pub requested: String,
    pub offered: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Ad {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdResponse {
    pub id: Uuid,
    pub ad_id: Uuid,
    pub responder_id: Uuid,
    pub ad_owner_id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub reported_user_id: Uuid,
    pub ad_id: Option<Uuid>,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// Sender snapshot stored with every chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub room_id: String,
    pub sender: ChatUser,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// A response enriched with the responder's profile, as shown in the inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullAdResponse {
    #[serde(flatten)]
    pub response: AdResponse,
    pub responder_details: AppUser,
    /// Rounded age of the response, e.g. `2sa önce`.
    pub responded_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAdWithResponses {
    #[serde(flatten)]
    pub ad: Ad,
    pub responses: Vec<FullAdResponse>,
}
