//! Account registration, login, and session-backed identity.

pub mod password;
pub mod session;

pub use password::PasswordError;
pub use session::{
    spawn_session_sweeper, IssuedSession, SessionError, SessionManager, DEFAULT_SESSION_TTL_HOURS,
};

use thiserror::Error;
use tracing::{error, info};

use crate::db::{DbPool, User, UserResponse};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username is already taken")]
    UsernameTaken,
    /// One value for both unknown-username and wrong-password, so callers
    /// cannot probe which usernames exist.
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("not authenticated")]
    Unauthenticated,
    #[error("password hashing failed: {0}")]
    Hashing(PasswordError),
    #[error("account storage unavailable")]
    Storage(#[source] sqlx::Error),
}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Invalid => AuthError::Unauthenticated,
            SessionError::Storage(e) => AuthError::Storage(e),
        }
    }
}

/// Orchestrates the credential store, the password hasher, and the session
/// manager. Owns a pool handle; cheap to clone into state.
#[derive(Clone)]
pub struct AuthService {
    db: DbPool,
    sessions: SessionManager,
}

impl AuthService {
    pub fn new(db: DbPool, sessions: SessionManager) -> Self {
        Self { db, sessions }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Create a patient account. The password is hashed before the insert
    /// is attempted, so the hashing cost is paid whether or not the
    /// username turns out to be taken; uniqueness itself is settled by the
    /// index, not a read-then-write check.
    pub async fn register(
        &self,
        username: &str,
        display_name: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let password_hash = password::hash_password(password).map_err(AuthError::Hashing)?;

        match User::create(&self.db, username, display_name, &password_hash, false).await {
            Ok(user) => {
                info!("Registered user {}", user.username);
                Ok(user)
            }
            Err(e) if is_unique_violation(&e) => Err(AuthError::UsernameTaken),
            Err(e) => {
                error!("Failed to store new user: {}", e);
                Err(AuthError::Storage(e))
            }
        }
    }

    /// Verify credentials and issue a session.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(IssuedSession, UserResponse), AuthError> {
        let user = User::find_by_username(&self.db, username)
            .await
            .map_err(AuthError::Storage)?;
        let Some(user) = user else {
            return Err(AuthError::InvalidCredentials);
        };

        let verified = match password::verify_password(password, &user.password_hash) {
            Ok(ok) => ok,
            Err(e) => {
                // Corrupt stored hash: log the signal, fail the login
                error!("Rejecting login for {}: {}", user.username, e);
                false
            }
        };
        if !verified {
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self.sessions.create(&user.id).await?;
        Ok((issued, UserResponse::from(user)))
    }

    /// Idempotent; logging out an already-dead session succeeds.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.invalidate(token).await?;
        Ok(())
    }

    /// Resolve a token to the public user view (no password hash).
    pub async fn current_user(&self, token: &str) -> Result<UserResponse, AuthError> {
        let user_id = self.sessions.validate(token).await?;
        let user = User::find_by_id(&self.db, &user_id)
            .await
            .map_err(AuthError::Storage)?;
        user.map(UserResponse::from)
            .ok_or(AuthError::Unauthenticated)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.to_string().contains("UNIQUE constraint failed")
}
