use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Months, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a user looks like to anyone but the store: no credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub username: String,
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SessionSource {
    Signup,
    Login,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub id: Uuid,
    pub user_id: Uuid,
    pub value: String,
    pub source: SessionSource,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Builds a new, not yet persisted user with a freshly salted argon2 hash.
    pub fn create(username: &str, password: &str) -> Result<Self, argon2::Error> {
        let salt: [u8; 16] = rand::thread_rng().r#gen();
        let password_hash =
            argon2::hash_encoded(password.as_bytes(), &salt, &argon2::Config::default())?;
        let now = Utc::now();
        Ok(User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn verify_password(&self, password: &str) -> Result<bool, argon2::Error> {
        argon2::verify_encoded(&self.password_hash, password.as_bytes())
    }

    pub fn as_public(&self) -> PublicUser {
        PublicUser {
            username: self.username.clone(),
            id: self.id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Issues an opaque session token valid for one calendar year.
    pub fn create_token(&self, source: SessionSource) -> Token {
        let bytes: [u8; 16] = rand::thread_rng().r#gen();
        let now = Utc::now();
        Token {
            id: Uuid::new_v4(),
            user_id: self.id,
            value: BASE64.encode(bytes),
            source,
            expires_at: now.checked_add_months(Months::new(12)),
            created_at: now,
        }
    }
}
