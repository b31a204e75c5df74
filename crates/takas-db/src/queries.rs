use crate::models::{
    AdInsert, AdRow, ChatMessageRow, ChatRoomRow, ReportRow, ResponseRow, TokenPurpose, UserInsert,
    UserRow,
};
use crate::{Database, format_ts};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str = "id, email, name, phone, university_domain, password_hash, \
                            profile_photo_url, email_verified, created_at";

const AD_COLUMNS: &str = "id, user_id, university_domain, requested, offered, message, \
                          created_at, expires_at, updated_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &UserRow) -> Result<UserInsert> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, email, name, phone, university_domain, password_hash,
                                    profile_photo_url, email_verified, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    user.id,
                    user.email,
                    user.name,
                    user.phone,
                    user.university_domain,
                    user.password_hash,
                    user.profile_photo_url,
                    user.email_verified,
                    user.created_at,
                ],
            );
            match inserted {
                Ok(_) => Ok(UserInsert::Created),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    Ok(UserInsert::EmailTaken)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_one(
                conn,
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                [email],
                map_user,
            )
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_one(
                conn,
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                [id],
                map_user,
            )
        })
    }

    pub fn set_email_verified(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("UPDATE users SET email_verified = 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn update_password(&self, id: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET password_hash = ?2 WHERE id = ?1",
                (id, password_hash),
            )?;
            Ok(())
        })
    }

    /// Returns false if no such user exists.
    pub fn update_profile(&self, id: &str, name: &str, phone: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET name = ?2, phone = ?3 WHERE id = ?1",
                (id, name, phone),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_profile_photo(&self, id: &str, url: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET profile_photo_url = ?2 WHERE id = ?1",
                (id, url),
            )?;
            Ok(changed > 0)
        })
    }

    // -- One-time tokens --

    /// Stores a token hash, replacing any earlier token of the same purpose
    /// for this user.
    pub fn replace_auth_token(
        &self,
        token_hash: &str,
        user_id: &str,
        purpose: TokenPurpose,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "DELETE FROM auth_tokens WHERE user_id = ?1 AND purpose = ?2",
                (user_id, purpose.as_str()),
            )?;
            tx.execute(
                "INSERT INTO auth_tokens (token_hash, user_id, purpose, expires_at)
                 VALUES (?1, ?2, ?3, ?4)",
                (token_hash, user_id, purpose.as_str(), format_ts(expires_at)),
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Deletes the token and returns its user id if it exists, matches the
    /// purpose and has not expired.
    pub fn consume_auth_token(
        &self,
        token_hash: &str,
        purpose: TokenPurpose,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let user_id: Option<String> = tx
                .query_row(
                    "SELECT user_id FROM auth_tokens
                     WHERE token_hash = ?1 AND purpose = ?2 AND expires_at > ?3",
                    (token_hash, purpose.as_str(), format_ts(now)),
                    |row| row.get(0),
                )
                .optional()?;
            if user_id.is_some() {
                tx.execute("DELETE FROM auth_tokens WHERE token_hash = ?1", [token_hash])?;
            }
            tx.commit()?;
            Ok(user_id)
        })
    }

    pub fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM auth_tokens WHERE expires_at <= ?1",
                [format_ts(now)],
            )?;
            Ok(n)
        })
    }

    // -- Ads --

    /// Inserts the ad unless its owner already has `max_active` active ads.
    /// The count and the insert run under the writer lock in one transaction.
    pub fn create_ad_within_limit(
        &self,
        ad: &AdRow,
        max_active: usize,
        now: DateTime<Utc>,
    ) -> Result<AdInsert> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let active = count_active(&tx, &ad.user_id, now)?;
            if active >= max_active {
                return Ok(AdInsert::LimitReached { active });
            }
            tx.execute(
                &format!("INSERT INTO ads ({AD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
                rusqlite::params![
                    ad.id,
                    ad.user_id,
                    ad.university_domain,
                    ad.requested,
                    ad.offered,
                    ad.message,
                    ad.created_at,
                    ad.expires_at,
                    ad.updated_at,
                ],
            )?;
            tx.commit()?;
            Ok(AdInsert::Created)
        })
    }

    pub fn get_ad(&self, id: &str) -> Result<Option<AdRow>> {
        self.with_conn(|conn| {
            query_one(
                conn,
                &format!("SELECT {AD_COLUMNS} FROM ads WHERE id = ?1"),
                [id],
                map_ad,
            )
        })
    }

    /// Non-expired ads, newest first.
    pub fn list_active_ads(&self, now: DateTime<Utc>) -> Result<Vec<AdRow>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                &format!(
                    "SELECT {AD_COLUMNS} FROM ads WHERE expires_at > ?1 ORDER BY created_at DESC, rowid DESC"
                ),
                [format_ts(now)],
                map_ad,
            )
        })
    }

    /// Every ad of a user, expired or not, newest first.
    pub fn list_ads_by_user(&self, user_id: &str) -> Result<Vec<AdRow>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                &format!("SELECT {AD_COLUMNS} FROM ads WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"),
                [user_id],
                map_ad,
            )
        })
    }

    pub fn update_ad(
        &self,
        id: &str,
        requested: &str,
        offered: &str,
        message: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE ads SET requested = ?2, offered = ?3, message = ?4, updated_at = ?5
                 WHERE id = ?1",
                rusqlite::params![id, requested, offered, message, format_ts(updated_at)],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_ad(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM ads WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// Removes ads that expired before `cutoff`, together with their responses.
    pub fn delete_ads_expired_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM ads WHERE expires_at < ?1", [format_ts(cutoff)])?;
            Ok(n)
        })
    }

    // -- Responses --

    pub fn insert_response(&self, response: &ResponseRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO ad_responses (id, ad_id, responder_id, ad_owner_id, message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    response.id,
                    response.ad_id,
                    response.responder_id,
                    response.ad_owner_id,
                    response.message,
                    response.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Responses to an ad, oldest first.
    pub fn list_responses_for_ad(&self, ad_id: &str) -> Result<Vec<ResponseRow>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT id, ad_id, responder_id, ad_owner_id, message, created_at
                 FROM ad_responses WHERE ad_id = ?1 ORDER BY created_at ASC, rowid ASC",
                [ad_id],
                |row| {
                    Ok(ResponseRow {
                        id: row.get(0)?,
                        ad_id: row.get(1)?,
                        responder_id: row.get(2)?,
                        ad_owner_id: row.get(3)?,
                        message: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
        })
    }

    // -- Reports --

    pub fn insert_report(&self, report: &ReportRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO reports (id, reporter_id, reported_user_id, ad_id, reason, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    report.id,
                    report.reporter_id,
                    report.reported_user_id,
                    report.ad_id,
                    report.reason,
                    report.created_at,
                ],
            )?;
            Ok(())
        })
    }

    // -- Chat --

    pub fn list_chat_rooms(&self) -> Result<Vec<ChatRoomRow>> {
        self.with_conn(|conn| {
            query_all(
                conn,
                "SELECT id, name, description FROM chat_rooms ORDER BY name ASC",
                [],
                map_room,
            )
        })
    }

    pub fn get_chat_room(&self, id: &str) -> Result<Option<ChatRoomRow>> {
        self.with_conn(|conn| {
            query_one(
                conn,
                "SELECT id, name, description FROM chat_rooms WHERE id = ?1",
                [id],
                map_room,
            )
        })
    }

    pub fn insert_chat_message(&self, message: &ChatMessageRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO chat_messages
                    (id, room_id, sender_id, sender_name, sender_avatar_url, text, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    message.id,
                    message.room_id,
                    message.sender_id,
                    message.sender_name,
                    message.sender_avatar_url,
                    message.text,
                    message.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// The latest `limit` messages of a room, returned oldest first.
    pub fn list_chat_messages(&self, room_id: &str, limit: u32) -> Result<Vec<ChatMessageRow>> {
        self.with_conn(|conn| {
            let mut rows = query_all(
                conn,
                "SELECT id, room_id, sender_id, sender_name, sender_avatar_url, text, created_at
                 FROM chat_messages
                 WHERE room_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
                rusqlite::params![room_id, limit],
                |row| {
                    Ok(ChatMessageRow {
                        id: row.get(0)?,
                        room_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        sender_name: row.get(3)?,
                        sender_avatar_url: row.get(4)?,
                        text: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                },
            )?;
            rows.reverse();
            Ok(rows)
        })
    }
}

fn count_active(conn: &Connection, user_id: &str, now: DateTime<Utc>) -> Result<usize> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM ads WHERE user_id = ?1 AND expires_at > ?2",
        (user_id, format_ts(now)),
        |row| row.get(0),
    )?;
    Ok(n as usize)
}

fn query_one<P, F, T>(conn: &Connection, sql: &str, params: P, map: F) -> Result<Option<T>>
where
    P: rusqlite::Params,
    F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let row = stmt.query_row(params, map).optional()?;
    Ok(row)
}

fn query_all<P, F, T>(conn: &Connection, sql: &str, params: P, map: F) -> Result<Vec<T>>
where
    P: rusqlite::Params,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        phone: row.get(3)?,
        university_domain: row.get(4)?,
        password_hash: row.get(5)?,
        profile_photo_url: row.get(6)?,
        email_verified: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn map_ad(row: &Row<'_>) -> rusqlite::Result<AdRow> {
    Ok(AdRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        university_domain: row.get(2)?,
        requested: row.get(3)?,
        offered: row.get(4)?,
        message: row.get(5)?,
        created_at: row.get(6)?,
        expires_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn map_room(row: &Row<'_>) -> rusqlite::Result<ChatRoomRow> {
    Ok(ChatRoomRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
