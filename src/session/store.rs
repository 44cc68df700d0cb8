//! SQLite-backed session store.
//!
//! Owns [`Session`] objects for their TTL. Access tokens are encrypted at
//! rest; every other field is plaintext. Expired rows are dropped lazily on
//! read and swept by a background task.

use super::{encryption, Credential, Identity, Session};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Session store.
///
/// # Thread safety
/// The connection is wrapped in a Mutex; SQLite's serialized mode handles
/// the rest. Writes to a single session are single statements, so the
/// identity+credential swap of the bot switch is atomic.
pub struct SessionStore {
    conn: Mutex<Connection>,
    encryption_key: Vec<u8>,
}

impl SessionStore {
    /// Create or open a session store.
    ///
    /// `encryption_key` is the base64-encoded 32-byte master key used for
    /// the access tokens.
    pub fn new<P: AsRef<Path>>(db_path: P, encryption_key: &str) -> Result<Self> {
        let key_bytes = encryption::validate_key(encryption_key).context("Invalid session key")?;

        let conn = Connection::open(db_path).context("Failed to open session database")?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                nick_name TEXT,
                avatar TEXT,
                access_token TEXT NOT NULL,
                access_token_nonce TEXT NOT NULL,
                is_bot INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )
            "#,
            [],
        )
        .context("Failed to create sessions table")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at)",
            [],
        )
        .context("Failed to create index")?;

        Ok(Self {
            conn: Mutex::new(conn),
            encryption_key: key_bytes,
        })
    }

    /// Create a session for an authenticated identity.
    ///
    /// Generates an opaque id and populates every field in one insert.
    pub fn create(&self, identity: Identity, credential: Credential, ttl: Duration) -> Result<Session> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let expires_at = created_at + ttl;

        let (token_encrypted, token_nonce) =
            encryption::encrypt(&credential.access_token, &self.encryption_key)
                .context("Failed to encrypt access token")?;

        self.conn
            .lock()
            .unwrap()
            .execute(
                r#"
                INSERT INTO sessions (
                    id, email, nick_name, avatar,
                    access_token, access_token_nonce, is_bot,
                    created_at, expires_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    id,
                    identity.email,
                    identity.nick_name,
                    identity.avatar,
                    token_encrypted,
                    token_nonce,
                    credential.is_bot as i64,
                    created_at.to_rfc3339(),
                    expires_at.to_rfc3339(),
                ],
            )
            .context("Failed to insert session")?;

        Ok(Session {
            id,
            identity,
            credential,
            created_at,
            expires_at,
        })
    }

    /// Look up a session by id.
    ///
    /// Returns `None` for unknown ids and for expired rows; an expired row
    /// is deleted on the way out.
    pub fn get(&self, id: &str) -> Result<Option<Session>> {
        let conn = self.conn.lock().unwrap();

        let row = conn
            .query_row(
                r#"
                SELECT email, nick_name, avatar,
                       access_token, access_token_nonce, is_bot,
                       created_at, expires_at
                FROM sessions
                WHERE id = ?1
                "#,
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()
            .context("Failed to query session")?;

        let Some((email, nick_name, avatar, token_enc, token_nonce, is_bot, created_at, expires_at)) =
            row
        else {
            return Ok(None);
        };

        let expires_at = parse_timestamp(&expires_at)?;
        if expires_at <= Utc::now() {
            conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let access_token = encryption::decrypt(&token_enc, &token_nonce, &self.encryption_key)
            .context("Failed to decrypt access token")?;

        Ok(Some(Session {
            id: id.to_string(),
            identity: Identity {
                email,
                nick_name,
                avatar,
            },
            credential: Credential {
                access_token,
                is_bot: is_bot != 0,
            },
            created_at: parse_timestamp(&created_at)?,
            expires_at,
        }))
    }

    /// Replace a session's identity and credential as one atomic unit.
    ///
    /// Used by the bot switch: the prior identity is not restorable.
    /// Returns `false` when the session does not exist.
    pub fn replace_credential(
        &self,
        id: &str,
        identity: &Identity,
        credential: &Credential,
    ) -> Result<bool> {
        let (token_encrypted, token_nonce) =
            encryption::encrypt(&credential.access_token, &self.encryption_key)
                .context("Failed to encrypt access token")?;

        let rows = self
            .conn
            .lock()
            .unwrap()
            .execute(
                r#"
                UPDATE sessions
                SET email = ?2, nick_name = ?3, avatar = ?4,
                    access_token = ?5, access_token_nonce = ?6, is_bot = ?7
                WHERE id = ?1
                "#,
                params![
                    id,
                    identity.email,
                    identity.nick_name,
                    identity.avatar,
                    token_encrypted,
                    token_nonce,
                    credential.is_bot as i64,
                ],
            )
            .context("Failed to update session")?;

        Ok(rows > 0)
    }

    /// Destroy a session. Returns `false` when no session existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .lock()
            .unwrap()
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])
            .context("Failed to delete session")?;

        Ok(rows > 0)
    }

    /// Drop every expired session. Returns the number removed.
    pub fn purge_expired(&self) -> Result<usize> {
        let rows = self
            .conn
            .lock()
            .unwrap()
            .execute(
                "DELETE FROM sessions WHERE expires_at <= ?1",
                params![Utc::now().to_rfc3339()],
            )
            .context("Failed to purge expired sessions")?;

        Ok(rows)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .context("Failed to parse session timestamp")
}

/// Background task that periodically sweeps expired sessions.
pub async fn run_session_purge(store: Arc<SessionStore>, interval_seconds: u64) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds));

    loop {
        interval.tick().await;
        match store.purge_expired() {
            Ok(0) => {}
            Ok(n) => tracing::debug!("Session purge removed {} expired sessions", n),
            Err(e) => tracing::warn!(error = %e, "Session purge failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

    fn create_test_store() -> SessionStore {
        let key = BASE64.encode([0u8; 32]);
        SessionStore::new(":memory:", &key).expect("Failed to create test store")
    }

    fn test_identity() -> Identity {
        Identity {
            email: "ada@example.com".to_string(),
            nick_name: Some("Ada".to_string()),
            avatar: Some("https://avatars.example.com/ada.png".to_string()),
        }
    }

    fn test_credential() -> Credential {
        Credential {
            access_token: "tok-12345".to_string(),
            is_bot: false,
        }
    }

    #[test]
    fn test_create_and_get() {
        let store = create_test_store();

        let session = store
            .create(test_identity(), test_credential(), Duration::hours(8))
            .unwrap();

        let loaded = store.get(&session.id).unwrap().expect("session not found");
        assert_eq!(loaded.identity.email, "ada@example.com");
        assert_eq!(loaded.credential.access_token, "tok-12345");
        assert!(!loaded.credential.is_bot);
        assert!(loaded.is_authenticated());
    }

    #[test]
    fn test_get_unknown_id() {
        let store = create_test_store();
        assert!(store.get("no-such-session").unwrap().is_none());
    }

    #[test]
    fn test_expired_session_is_gone() {
        let store = create_test_store();

        let session = store
            .create(test_identity(), test_credential(), Duration::seconds(-1))
            .unwrap();

        assert!(store.get(&session.id).unwrap().is_none());
        // The expired row was removed, so delete now reports nothing
        assert!(!store.delete(&session.id).unwrap());
    }

    #[test]
    fn test_partial_identity_is_unauthenticated() {
        let store = create_test_store();
        let identity = Identity {
            email: "ada@example.com".to_string(),
            nick_name: None,
            avatar: None,
        };

        let session = store
            .create(identity, test_credential(), Duration::hours(8))
            .unwrap();

        let loaded = store.get(&session.id).unwrap().unwrap();
        assert!(!loaded.is_authenticated());
    }

    #[test]
    fn test_replace_credential_swaps_everything() {
        let store = create_test_store();
        let session = store
            .create(test_identity(), test_credential(), Duration::hours(8))
            .unwrap();

        let bot_identity = Identity {
            email: "bot@example.com".to_string(),
            nick_name: Some("helper-bot".to_string()),
            avatar: Some("https://avatars.example.com/bot.png".to_string()),
        };
        let bot_credential = Credential {
            access_token: "bot-token".to_string(),
            is_bot: true,
        };

        assert!(store
            .replace_credential(&session.id, &bot_identity, &bot_credential)
            .unwrap());

        let loaded = store.get(&session.id).unwrap().unwrap();
        assert_eq!(loaded.identity.email, "bot@example.com");
        assert_eq!(loaded.credential.access_token, "bot-token");
        assert!(loaded.credential.is_bot);
    }

    #[test]
    fn test_replace_credential_missing_session() {
        let store = create_test_store();
        let replaced = store
            .replace_credential("missing", &test_identity(), &test_credential())
            .unwrap();
        assert!(!replaced);
    }

    #[test]
    fn test_delete() {
        let store = create_test_store();
        let session = store
            .create(test_identity(), test_credential(), Duration::hours(8))
            .unwrap();

        assert!(store.delete(&session.id).unwrap());
        assert!(store.get(&session.id).unwrap().is_none());
        assert!(!store.delete(&session.id).unwrap());
    }

    #[test]
    fn test_purge_expired() {
        let store = create_test_store();

        store
            .create(test_identity(), test_credential(), Duration::seconds(-10))
            .unwrap();
        store
            .create(test_identity(), test_credential(), Duration::hours(1))
            .unwrap();

        assert_eq!(store.purge_expired().unwrap(), 1);
    }

    #[test]
    fn test_token_is_encrypted_at_rest() {
        let key = BASE64.encode([0u8; 32]);
        let store = SessionStore::new(":memory:", &key).unwrap();
        let session = store
            .create(test_identity(), test_credential(), Duration::hours(8))
            .unwrap();

        let stored: String = store
            .conn
            .lock()
            .unwrap()
            .query_row(
                "SELECT access_token FROM sessions WHERE id = ?1",
                params![session.id],
                |row| row.get(0),
            )
            .unwrap();

        assert_ne!(stored, "tok-12345");
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(SessionStore::new(":memory:", "short").is_err());
    }

    #[test]
    fn test_sessions_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("sessions.db");
        let key = BASE64.encode([3u8; 32]);

        let session = {
            let store = SessionStore::new(&db_path, &key).unwrap();
            store
                .create(test_identity(), test_credential(), Duration::hours(8))
                .unwrap()
        };

        let reopened = SessionStore::new(&db_path, &key).unwrap();
        let loaded = reopened.get(&session.id).unwrap().expect("session not found");
        assert_eq!(loaded.credential.access_token, "tok-12345");
    }
}
