use crate::{
    db::{self, Relations},
    error::AppError,
    models::{Dinner, NewDinner, PublicDinner, PublicUser, SessionSource, Token, User},
    state::AppState,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("invalid {what} id: {raw}")))
}

async fn fetch_dinner(app_state: &AppState, raw_id: &str) -> Result<Json<PublicDinner>, AppError> {
    let dinner_id = parse_id(raw_id, "dinner")?;
    let dinner = db::find_dinner_by_id(&app_state.pool, dinner_id, Relations::ALL)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("dinner {dinner_id}")))?;
    Ok(Json(dinner.as_public()?))
}

pub async fn get_dinner(
    State(app_state): State<AppState>,
    Path(dinner_id): Path<String>,
) -> Result<Json<PublicDinner>, AppError> {
    fetch_dinner(&app_state, &dinner_id).await
}

/// `GET /dinners/new` shares a path with dinner creation; "new" is still just a bad id.
pub async fn get_dinner_new(
    State(app_state): State<AppState>,
) -> Result<Json<PublicDinner>, AppError> {
    fetch_dinner(&app_state, "new").await
}

pub async fn create_dinner(body: Bytes) -> Result<Json<PublicDinner>, AppError> {
    match serde_json::from_slice::<NewDinner>(&body) {
        Ok(new_dinner) => debug!(
            location = %new_dinner.location,
            date = %new_dinner.date,
            "dinner creation requested"
        ),
        Err(e) => debug!(error = %e, "dinner creation requested with unreadable body"),
    }
    Err(AppError::NotImplemented)
}

pub async fn invite_user(
    State(app_state): State<AppState>,
    Path((dinner_id, user_id)): Path<(String, String)>,
) -> Result<Json<PublicDinner>, AppError> {
    let dinner_id = parse_id(&dinner_id, "dinner")?;
    let invitee_id = parse_id(&user_id, "user")?;
    let pool = &app_state.pool;

    let mut dinner = db::find_dinner_by_id(pool, dinner_id, Relations::ALL)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("dinner {dinner_id}")))?;
    let invitee = db::find_user_by_id(pool, invitee_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {invitee_id}")))?;

    if dinner.is_invited(invitee.id) {
        debug!(%dinner_id, %invitee_id, "user already invited");
        return Ok(Json(dinner.as_public()?));
    }

    add_invitee(pool, &mut dinner, &invitee).await?;
    Ok(Json(dinner.as_public()?))
}

/// Attaches `invitee`, touches the dinner and reloads its invitees.
async fn add_invitee(
    pool: &SqlitePool,
    dinner: &mut Dinner,
    invitee: &User,
) -> Result<(), AppError> {
    if db::attach_invitee(pool, dinner, invitee).await? {
        db::save_dinner(pool, dinner).await?;
        info!(dinner_id = %dinner.id, invitee_id = %invitee.id, "user invited");
    } else {
        // A concurrent request attached the same pair first.
        debug!(
            dinner_id = %dinner.id,
            invitee_id = %invitee.id,
            "invite lost the race, treating as already invited"
        );
    }
    db::load_invitees(pool, dinner).await
}

#[derive(Deserialize)]
pub struct Credentials {
    username: String,
    password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub token: SessionToken,
    pub user: PublicUser,
}

impl SessionResponse {
    fn new(token: Token, user: &User) -> Self {
        SessionResponse {
            token: SessionToken {
                value: token.value,
                expires_at: token.expires_at,
            },
            user: user.as_public(),
        }
    }
}

pub async fn signup(
    State(app_state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let username = payload.username.trim();
    if username.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "username and password are required".to_string(),
        ));
    }

    let user = User::create(username, &payload.password)?;
    db::insert_user(&app_state.pool, &user).await?;
    let token = user.create_token(SessionSource::Signup);
    db::insert_token(&app_state.pool, &token).await?;

    info!(user_id = %user.id, username = %user.username, "user signed up");
    Ok((StatusCode::CREATED, Json(SessionResponse::new(token, &user))))
}

pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<Credentials>,
) -> Result<Json<SessionResponse>, AppError> {
    let user = db::find_user_by_username(&app_state.pool, payload.username.trim())
        .await?
        .ok_or(AppError::Unauthorized)?;
    if !user.verify_password(&payload.password)? {
        debug!(user_id = %user.id, "password mismatch");
        return Err(AppError::Unauthorized);
    }

    let token = user.create_token(SessionSource::Login);
    db::insert_token(&app_state.pool, &token).await?;
    Ok(Json(SessionResponse::new(token, &user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::init_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn add_invitee_after_a_competing_attach_keeps_one_row_and_skips_the_save() {
        let pool = pool().await;
        let host = User::create("host", "pw").unwrap();
        let guest = User::create("guest", "pw").unwrap();
        db::insert_user(&pool, &host).await.unwrap();
        db::insert_user(&pool, &guest).await.unwrap();
        let dinner = Dinner::new(Utc::now(), "Kitchen", &host);
        db::insert_dinner(&pool, &dinner).await.unwrap();

        // This copy was loaded before the competing request attached the guest.
        let mut stale = db::find_dinner_by_id(&pool, dinner.id, Relations::ALL)
            .await
            .unwrap()
            .unwrap();
        assert!(!stale.is_invited(guest.id));
        assert!(db::attach_invitee(&pool, &dinner, &guest).await.unwrap());
        let updated_at = stale.updated_at;

        add_invitee(&pool, &mut stale, &guest).await.unwrap();

        assert_eq!(stale.updated_at, updated_at);
        let public = stale.as_public().unwrap();
        assert_eq!(public.invitees, vec![guest.as_public()]);
        let rows: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM dinner_invitee_pivot WHERE dinner_id = ? AND invitee_id = ?",
        )
        .bind(dinner.id)
        .bind(guest.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn add_invitee_for_a_fresh_pair_touches_the_dinner() {
        let pool = pool().await;
        let host = User::create("host", "pw").unwrap();
        let guest = User::create("guest", "pw").unwrap();
        db::insert_user(&pool, &host).await.unwrap();
        db::insert_user(&pool, &guest).await.unwrap();
        let mut dinner = Dinner::new(Utc::now(), "Kitchen", &host);
        db::insert_dinner(&pool, &dinner).await.unwrap();
        let updated_at = dinner.updated_at;

        add_invitee(&pool, &mut dinner, &guest).await.unwrap();

        assert!(dinner.updated_at > updated_at);
        assert!(dinner.is_invited(guest.id));
    }
}
