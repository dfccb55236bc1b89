/// Admin session management
///
/// Sessions are created on credential verification and destroyed on
/// sign-out or expiry. A session row never records whether its owner is
/// an admin; that flag is re-resolved from the users table on every
/// request by the authorization gate.
use crate::{
    config::AdminConfig,
    db::models::{Session, User},
    error::{AdminError, AdminResult},
};
use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

/// Claims carried by an access token
#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    /// User id
    sub: String,
    /// Session id
    sid: String,
    iat: i64,
    exp: i64,
}

/// Result of validating an access token
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub user_id: String,
    pub session_id: String,
}

/// Session manager service
pub struct SessionManager {
    db: SqlitePool,
    config: Arc<AdminConfig>,
}

impl SessionManager {
    pub fn new(db: SqlitePool, config: Arc<AdminConfig>) -> Self {
        Self { db, config }
    }

    /// Hash a password with Argon2id
    pub fn hash_password(password: &str) -> AdminResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AdminError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a stored hash
    pub fn verify_password(password: &str, hash: &str) -> AdminResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AdminError::Internal(format!("Invalid password hash: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Authenticate credentials and create a session
    pub async fn sign_in(&self, phone: &str, password: &str) -> AdminResult<(User, Session)> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone = ?1")
            .bind(phone)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AdminError::Authentication("Invalid credentials".to_string()))?;

        if user.is_banned {
            return Err(AdminError::Authorization("Account is banned".to_string()));
        }

        if !Self::verify_password(password, &user.password_hash)? {
            return Err(AdminError::Authentication("Invalid credentials".to_string()));
        }

        let session = self.create_session(&user.id).await?;

        Ok((user, session))
    }

    /// Create a session for a user id
    pub async fn create_session(&self, user_id: &str) -> AdminResult<Session> {
        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let expires_at = now + Duration::minutes(self.config.auth.session_ttl_minutes);

        let access_token = self.generate_access_token(user_id, &session_id, now, expires_at)?;

        sqlx::query(
            "INSERT INTO sessions (id, user_id, access_token, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&session_id)
        .bind(user_id)
        .bind(&access_token)
        .bind(now)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(Session {
            id: session_id,
            user_id: user_id.to_string(),
            access_token,
            created_at: now,
            expires_at,
        })
    }

    /// Validate an access token and return session info.
    ///
    /// Checks the JWT signature and expiry, then requires a live session
    /// row so sign-out revokes tokens before they expire.
    pub async fn validate_access_token(&self, token: &str) -> AdminResult<ValidatedSession> {
        let decoding_key = DecodingKey::from_secret(self.config.auth.jwt_secret.as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;

        let claims = decode::<AccessClaims>(token, &decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AdminError::Authentication("Session expired".to_string())
                }
                _ => AdminError::Authentication("Invalid session token".to_string()),
            })?
            .claims;

        let row = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE access_token = ?1")
            .bind(token)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AdminError::Authentication("Invalid or expired session".to_string()))?;

        if Utc::now() > row.expires_at {
            return Err(AdminError::Authentication("Session expired".to_string()));
        }

        // Token claims and session row must agree
        if claims.sub != row.user_id || claims.sid != row.id {
            return Err(AdminError::Authentication("Invalid session token".to_string()));
        }

        Ok(ValidatedSession {
            user_id: row.user_id,
            session_id: row.id,
        })
    }

    /// Delete a session (sign-out, or fail-closed drop by the gate)
    pub async fn delete_session(&self, session_id: &str) -> AdminResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(session_id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    fn generate_access_token(
        &self,
        user_id: &str,
        session_id: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AdminResult<String> {
        let claims = AccessClaims {
            sub: user_id.to_string(),
            sid: session_id.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.auth.jwt_secret.as_bytes()),
        )
        .map_err(|e| AdminError::Internal(format!("Token generation failed: {}", e)))
    }
}
