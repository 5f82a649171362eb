#![allow(dead_code)]

use anyhow::Result;
use chrono::{Duration, Utc};
use dinners::{
    db,
    models::{Dinner, User},
    state::AppState,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use uuid::Uuid;

pub struct Fixture {
    pub state: AppState,
    pub host: User,
    pub guests: Vec<User>,
    pub dinner: Dinner,
}

pub async fn memory_pool() -> Result<SqlitePool> {
    // A single connection so every query sees the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    db::init_schema(&pool).await?;
    Ok(pool)
}

pub async fn create_user(pool: &SqlitePool, username: &str) -> Result<User> {
    let user = User::create(username, "password")?;
    db::insert_user(pool, &user).await?;
    Ok(user)
}

/// A host, two guests and one dinner with nobody invited yet.
pub async fn fixture() -> Result<Fixture> {
    let pool = memory_pool().await?;
    let host = create_user(&pool, "host").await?;
    let guests = vec![
        create_user(&pool, "alice").await?,
        create_user(&pool, "bob").await?,
    ];
    let dinner = Dinner::new(Utc::now() + Duration::days(3), "Host's kitchen", &host);
    db::insert_dinner(&pool, &dinner).await?;

    Ok(Fixture {
        state: AppState { pool },
        host,
        guests,
        dinner,
    })
}

pub async fn pivot_rows(pool: &SqlitePool, dinner_id: Uuid, user_id: Uuid) -> Result<i64> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM dinner_invitee_pivot WHERE dinner_id = ? AND invitee_id = ?",
    )
    .bind(dinner_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
