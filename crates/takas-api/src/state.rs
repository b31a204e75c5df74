use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use takas_db::Database;
use takas_gateway::dispatcher::Dispatcher;
use takas_types::models::{Ad, UserAdWithResponses};

use crate::cache::TtlCache;
use crate::mailer::Mailer;
use crate::storage::PhotoStorage;
use crate::user_cache::UserCache;

/// How long the marketplace listing is served from memory.
pub const ADS_CACHE_TTL: Duration = Duration::from_secs(60);

/// How long a user's activity aggregation is served from memory.
pub const ACTIVITY_CACHE_TTL: Duration = Duration::from_secs(120);

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
    pub mailer: Arc<dyn Mailer>,
    pub storage: PhotoStorage,
    pub user_cache: UserCache,
    pub ads_cache: TtlCache<(), Vec<Ad>>,
    pub activity_cache: TtlCache<Uuid, Vec<UserAdWithResponses>>,
    /// Public base URL used in emailed links, without a trailing slash.
    pub app_url: String,
}

impl AppStateInner {
    pub fn new(
        db: Arc<Database>,
        jwt_secret: String,
        mailer: Arc<dyn Mailer>,
        storage: PhotoStorage,
        app_url: &str,
    ) -> Self {
        Self {
            user_cache: UserCache::new(db.clone()),
            db,
            jwt_secret,
            dispatcher: Dispatcher::new(),
            mailer,
            storage,
            ads_cache: TtlCache::new(ADS_CACHE_TTL),
            activity_cache: TtlCache::new(ACTIVITY_CACHE_TTL),
            app_url: app_url.trim_end_matches('/').to_string(),
        }
    }

    /// Drops every cached view that includes ads of `owner`.
    pub async fn invalidate_ads(&self, owner: Uuid) {
        self.ads_cache.clear().await;
        self.activity_cache.invalidate(&owner).await;
    }
}

/// Runs a blocking database closure on the blocking thread pool.
pub async fn run_db<F, T>(db: &Arc<Database>, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db)).await?
}
