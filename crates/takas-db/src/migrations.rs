use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  TEXT PRIMARY KEY,
                email               TEXT NOT NULL UNIQUE,
                name                TEXT NOT NULL,
                phone               TEXT NOT NULL,
                university_domain   TEXT NOT NULL,
                password_hash       TEXT NOT NULL,
                profile_photo_url   TEXT,
                email_verified      INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL
            );

            CREATE TABLE ads (
                id                  TEXT PRIMARY KEY,
                user_id             TEXT NOT NULL REFERENCES users(id),
                university_domain   TEXT NOT NULL,
                requested           TEXT NOT NULL,
                offered             TEXT NOT NULL,
                message             TEXT,
                created_at          TEXT NOT NULL,
                expires_at          TEXT NOT NULL,
                updated_at          TEXT
            );

            CREATE INDEX idx_ads_expires ON ads(expires_at);
            CREATE INDEX idx_ads_user ON ads(user_id, created_at);

            CREATE TABLE ad_responses (
                id              TEXT PRIMARY KEY,
                ad_id           TEXT NOT NULL REFERENCES ads(id) ON DELETE CASCADE,
                responder_id    TEXT NOT NULL REFERENCES users(id),
                ad_owner_id     TEXT NOT NULL REFERENCES users(id),
                message         TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_responses_ad ON ad_responses(ad_id, created_at);

            CREATE TABLE reports (
                id                  TEXT PRIMARY KEY,
                reporter_id         TEXT NOT NULL REFERENCES users(id),
                reported_user_id    TEXT NOT NULL,
                ad_id               TEXT,
                reason              TEXT NOT NULL,
                created_at          TEXT NOT NULL
            );

            CREATE TABLE auth_tokens (
                token_hash  TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                purpose     TEXT NOT NULL,
                expires_at  TEXT NOT NULL
            );

            CREATE TABLE chat_rooms (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE,
                description TEXT
            );

            CREATE TABLE chat_messages (
                id                  TEXT PRIMARY KEY,
                room_id             TEXT NOT NULL REFERENCES chat_rooms(id),
                sender_id           TEXT NOT NULL,
                sender_name         TEXT NOT NULL,
                sender_avatar_url   TEXT,
                text                TEXT NOT NULL,
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_chat_messages_room ON chat_messages(room_id, created_at);

            -- Default rooms
            INSERT INTO chat_rooms (id, name, description) VALUES
                ('general', 'General', 'General chat'),
                ('random', 'Random', 'Random chat'),
                ('tech', 'Tech Talk', 'Discuss technology');

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
