use chrono::{Duration, Utc};
use dinners::{
    app,
    config::Config,
    db,
    error::AppError,
    models::{Dinner, User},
    state::AppState,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::{env, error::Error, str::FromStr};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, util::{SubscriberInitExt, TryInitError}};

fn init_tracing() -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dinners=info,tower_http=info"));
    if env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt().with_env_filter(filter).json().finish().try_init()
    } else {
        fmt().with_env_filter(filter).finish().try_init()
    }
}

async fn seed_database_if_empty(pool: &SqlitePool) -> Result<(), AppError> {
    let dinner_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM dinners")
        .fetch_one(pool)
        .await?;
    if dinner_count.0 > 0 {
        return Ok(());
    }

    info!("database is empty, seeding example data");
    let host = User::create("host", "host-password")?;
    db::insert_user(pool, &host).await?;
    for name in ["alice", "bob"] {
        let guest = User::create(name, &format!("{name}-password"))?;
        db::insert_user(pool, &guest).await?;
        info!(user_id = %guest.id, username = name, "seeded guest");
    }

    let dinner = Dinner::new(Utc::now() + Duration::days(7), "Host's place", &host);
    db::insert_dinner(pool, &dinner).await?;
    info!(dinner_id = %dinner.id, host_id = %host.id, "seeded dinner");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let config = Config::from_env()?;

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(connect_options)
        .await?;

    db::init_schema(&pool).await?;

    if config.seed_example_data {
        if let Err(e) = seed_database_if_empty(&pool).await {
            warn!(error = %e, "failed to seed example data");
        }
    }

    let app_state = AppState { pool };
    let router = app(app_state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}
