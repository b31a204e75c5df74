//! Memoised user lookups.
//!
//! Ads, responses and chat messages only carry user ids; rendering them
//! needs names, universities and photos. Lookups go through this cache so a
//! page with many ads from the same poster costs one database read. The
//! cache is unbounded and lives for the process; profile writes invalidate
//! the affected entry.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::DateTime;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};
use uuid::Uuid;

use takas_db::Database;
use takas_types::models::AppUser;

use crate::state::run_db;

pub const UNKNOWN_USER_NAME: &str = "Bilinmeyen Kullanıcı";
pub const UNKNOWN_UNIVERSITY: &str = "Bilinmeyen Üniv.";
pub const ERROR_USER_NAME: &str = "Hata Oluştu";
pub const ERROR_UNIVERSITY: &str = "Veri Çekilemedi";

pub struct UserCache {
    db: Arc<Database>,
    entries: Mutex<HashMap<Uuid, Arc<OnceCell<AppUser>>>>,
    misses: AtomicUsize,
}

impl UserCache {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            entries: Mutex::new(HashMap::new()),
            misses: AtomicUsize::new(0),
        }
    }

    /// Returns the user, loading it on first use. Concurrent callers for the
    /// same id share a single load. Never fails: a missing user yields a
    /// cached placeholder, a failed load yields an uncached one.
    pub async fn get(&self, user_id: Uuid) -> AppUser {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(user_id).or_default().clone()
        };

        let loaded = cell
            .get_or_try_init(|| async {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("User cache miss for {}", user_id);
                let id = user_id.to_string();
                let row = run_db(&self.db, move |db| db.get_user_by_id(&id)).await?;
                Ok::<_, anyhow::Error>(match row {
                    Some(row) => row.into_model(),
                    None => placeholder(user_id, UNKNOWN_USER_NAME, UNKNOWN_UNIVERSITY),
                })
            })
            .await;

        match loaded {
            Ok(user) => user.clone(),
            Err(e) => {
                warn!("Failed to load user {}: {:#}", user_id, e);
                self.forget_if_empty(user_id, &cell).await;
                placeholder(user_id, ERROR_USER_NAME, ERROR_UNIVERSITY)
            }
        }
    }

    pub async fn invalidate(&self, user_id: Uuid) {
        self.entries.lock().await.remove(&user_id);
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Number of lookups that went to the database.
    pub fn miss_count(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    async fn forget_if_empty(&self, user_id: Uuid, cell: &Arc<OnceCell<AppUser>>) {
        let mut entries = self.entries.lock().await;
        if let Some(current) = entries.get(&user_id) {
            if Arc::ptr_eq(current, cell) && !current.initialized() {
                entries.remove(&user_id);
            }
        }
    }
}

fn placeholder(user_id: Uuid, name: &str, university: &str) -> AppUser {
    AppUser {
        uid: user_id,
        name: name.to_string(),
        email: String::new(),
        university_domain: university.to_string(),
        phone: String::new(),
        profile_photo_url: None,
        email_verified: false,
        created_at: DateTime::default(),
    }
}
