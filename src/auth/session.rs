//! Opaque login sessions.
//!
//! The token handed to the client is 32 random bytes, hex encoded. Only its
//! SHA-256 digest is stored, so a leaked database cannot be replayed as a
//! live session.

use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::time::{interval, Duration as TickDuration};

use crate::db::{DbPool, Session};

/// Default session lifetime, matching the front-end cookie lifetime
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// How often the background sweep removes expired rows (in seconds)
const SWEEP_INTERVAL_SECS: u64 = 3600;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Unknown and expired tokens are deliberately the same case.
    #[error("session is unknown or expired")]
    Invalid,
    #[error("session storage unavailable")]
    Storage(#[source] sqlx::Error),
}

/// A freshly issued session together with the raw token. The raw token
/// exists only in this value and in the client's hands; it is never stored.
#[derive(Debug)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

/// Issues, validates, and revokes session tokens. The sole authority for
/// "who is this request acting as"; handlers never trust client-supplied
/// user ids.
#[derive(Clone)]
pub struct SessionManager {
    db: DbPool,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(db: DbPool, ttl_hours: i64) -> Self {
        Self {
            db,
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn ttl_hours(&self) -> i64 {
        self.ttl.num_hours()
    }

    pub async fn create(&self, user_id: &str) -> Result<IssuedSession, SessionError> {
        let token = generate_token();
        let now = Utc::now();
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            token_hash: hash_token(&token),
            created_at: now.to_rfc3339(),
            expires_at: (now + self.ttl).to_rfc3339(),
        };

        sqlx::query(
            "INSERT INTO sessions (id, user_id, token_hash, created_at, expires_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.token_hash)
        .bind(&session.created_at)
        .bind(&session.expires_at)
        .execute(&self.db)
        .await
        .map_err(SessionError::Storage)?;

        Ok(IssuedSession { token, session })
    }

    /// Resolve a token to its user id. Never extends the session.
    pub async fn validate(&self, token: &str) -> Result<String, SessionError> {
        let session: Option<Session> =
            sqlx::query_as("SELECT * FROM sessions WHERE token_hash = ? AND expires_at > ?")
                .bind(hash_token(token))
                .bind(Utc::now().to_rfc3339())
                .fetch_optional(&self.db)
                .await
                .map_err(SessionError::Storage)?;

        session.map(|s| s.user_id).ok_or(SessionError::Invalid)
    }

    /// Idempotent: revoking an unknown or already-revoked token succeeds.
    pub async fn invalidate(&self, token: &str) -> Result<(), SessionError> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(hash_token(token))
            .execute(&self.db)
            .await
            .map_err(SessionError::Storage)?;
        Ok(())
    }

    /// Remove rows past their expiry. Validity checks never depend on the
    /// sweep; this only keeps the table from growing without bound.
    pub async fn purge_expired(&self) -> Result<u64, SessionError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now().to_rfc3339())
            .execute(&self.db)
            .await
            .map_err(SessionError::Storage)?;
        Ok(result.rows_affected())
    }
}

fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Spawn the background task that sweeps expired sessions
pub fn spawn_session_sweeper(sessions: SessionManager) {
    tracing::info!(
        interval_secs = SWEEP_INTERVAL_SECS,
        "Starting expired-session sweeper"
    );

    tokio::spawn(async move {
        let mut tick = interval(TickDuration::from_secs(SWEEP_INTERVAL_SECS));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick.tick().await;

            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged = purged, "Swept expired sessions"),
                Err(e) => tracing::warn!("Session sweep failed: {}", e),
            }
        }
    });
}
