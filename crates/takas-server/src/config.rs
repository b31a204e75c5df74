use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub storage_dir: PathBuf,
    pub app_url: String,
    pub ad_retention_days: i64,
    pub resend_api_key: Option<String>,
    pub email_from: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("TAKAS_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("TAKAS_JWT_SECRET is unset or still a placeholder. Set it in your .env file and restart.");
        }

        let port = match get("TAKAS_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("TAKAS_PORT '{raw}' is not a valid port"))?,
            None => 3000,
        };
        let ad_retention_days = match get("TAKAS_AD_RETENTION_DAYS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("TAKAS_AD_RETENTION_DAYS '{raw}' is not a number"))?,
            None => 30,
        };

        Ok(Self {
            host: get("TAKAS_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: get("TAKAS_DB_PATH")
                .unwrap_or_else(|| "takas.db".into())
                .into(),
            jwt_secret,
            storage_dir: get("TAKAS_STORAGE_DIR")
                .unwrap_or_else(|| "./storage".into())
                .into(),
            app_url: get("TAKAS_APP_URL").unwrap_or_else(|| "http://localhost:3000".into()),
            ad_retention_days,
            resend_api_key: get("RESEND_API_KEY").filter(|key| !key.is_empty()),
            email_from: get("EMAIL_FROM").unwrap_or_else(|| "noreply@example.com".into()),
        })
    }
}
