use crate::error::AppError;
use crate::models::{Dinner, Token, User};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS users (
        id BLOB PRIMARY KEY NOT NULL,
        username TEXT NOT NULL UNIQUE CHECK (username <> ''),
        password_hash TEXT NOT NULL,
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL
    );",
    "CREATE TABLE IF NOT EXISTS dinners (
        id BLOB PRIMARY KEY NOT NULL,
        date TIMESTAMP NOT NULL,
        location TEXT NOT NULL CHECK (location <> ''),
        host_id BLOB NOT NULL,
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL,
        FOREIGN KEY (host_id) REFERENCES users (id)
    );",
    "CREATE TABLE IF NOT EXISTS dinner_invitee_pivot (
        dinner_id BLOB NOT NULL,
        invitee_id BLOB NOT NULL,
        FOREIGN KEY (dinner_id) REFERENCES dinners (id) ON DELETE CASCADE,
        FOREIGN KEY (invitee_id) REFERENCES users (id) ON DELETE CASCADE,
        UNIQUE(dinner_id, invitee_id)
    );",
    "CREATE TABLE IF NOT EXISTS tokens (
        id BLOB PRIMARY KEY NOT NULL,
        user_id BLOB NOT NULL,
        value TEXT NOT NULL UNIQUE,
        source TEXT NOT NULL,
        expires_at TIMESTAMP,
        created_at TIMESTAMP NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
    );",
];

/// Which relations to load alongside a dinner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relations {
    pub host: bool,
    pub invitees: bool,
}

impl Relations {
    pub const ALL: Relations = Relations {
        host: true,
        invitees: true,
    };
    #[cfg(test)]
    pub const NONE: Relations = Relations {
        host: false,
        invitees: false,
    };
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), AppError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

pub async fn find_user_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<User>, AppError> {
    sqlx::query_as("SELECT id, username, password_hash, created_at, updated_at FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::from)
}

pub async fn find_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, AppError> {
    sqlx::query_as(
        "SELECT id, username, password_hash, created_at, updated_at FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .map_err(AppError::from)
}

pub async fn insert_user(pool: &SqlitePool, user: &User) -> Result<(), AppError> {
    let result = sqlx::query(
        "INSERT INTO users (id, username, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user.id)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
            format!("username {} is taken", user.username),
        )),
        Err(e) => Err(e.into()),
    }
}

pub async fn insert_token(pool: &SqlitePool, token: &Token) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO tokens (id, user_id, value, source, expires_at, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(token.id)
    .bind(token.user_id)
    .bind(&token.value)
    .bind(token.source)
    .bind(token.expires_at)
    .bind(token.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn insert_dinner(pool: &SqlitePool, dinner: &Dinner) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO dinners (id, date, location, host_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(dinner.id)
    .bind(dinner.date)
    .bind(&dinner.location)
    .bind(dinner.host_id)
    .bind(dinner.created_at)
    .bind(dinner.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_dinner_by_id(
    pool: &SqlitePool,
    id: Uuid,
    relations: Relations,
) -> Result<Option<Dinner>, AppError> {
    let dinner: Option<Dinner> = sqlx::query_as(
        "SELECT id, date, location, host_id, created_at, updated_at FROM dinners WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some(mut dinner) = dinner else {
        return Ok(None);
    };
    if relations.host {
        dinner.host = find_user_by_id(pool, dinner.host_id).await?;
    }
    if relations.invitees {
        load_invitees(pool, &mut dinner).await?;
    }
    Ok(Some(dinner))
}

/// Replaces `dinner.invitees` with the stored set, in invitation order.
pub async fn load_invitees(pool: &SqlitePool, dinner: &mut Dinner) -> Result<(), AppError> {
    let invitees: Vec<User> = sqlx::query_as(
        "SELECT u.id, u.username, u.password_hash, u.created_at, u.updated_at
         FROM dinner_invitee_pivot p
         JOIN users u ON p.invitee_id = u.id
         WHERE p.dinner_id = ?
         ORDER BY p.rowid",
    )
    .bind(dinner.id)
    .fetch_all(pool)
    .await?;
    dinner.invitees = Some(invitees);
    Ok(())
}

/// Inserts the pivot row. Returns `false` if the pair was already there.
pub async fn attach_invitee(
    pool: &SqlitePool,
    dinner: &Dinner,
    invitee: &User,
) -> Result<bool, AppError> {
    let inserted = sqlx::query(
        "INSERT INTO dinner_invitee_pivot (dinner_id, invitee_id) VALUES (?, ?)
         ON CONFLICT (dinner_id, invitee_id) DO NOTHING",
    )
    .bind(dinner.id)
    .bind(invitee.id)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(inserted == 1)
}

pub async fn save_dinner(pool: &SqlitePool, dinner: &mut Dinner) -> Result<(), AppError> {
    let updated_at = Utc::now();
    sqlx::query("UPDATE dinners SET date = ?, location = ?, updated_at = ? WHERE id = ?")
        .bind(dinner.date)
        .bind(&dinner.location)
        .bind(updated_at)
        .bind(dinner.id)
        .execute(pool)
        .await?;
    dinner.updated_at = updated_at;
    Ok(())
}
