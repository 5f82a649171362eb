//! REST backend for organizing dinners and inviting users to them.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

use axum::{
    Router,
    routing::{get, post, put},
};
use state::AppState;
use tower_http::trace::TraceLayer;

pub fn app(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/dinners/new",
            get(handlers::get_dinner_new).post(handlers::create_dinner),
        )
        .route("/dinners/{dinner_id}", get(handlers::get_dinner))
        .route(
            "/dinners/{dinner_id}/invite/{user_id}",
            put(handlers::invite_user),
        )
        .route("/users/signup", post(handlers::signup))
        .route("/users/login", post(handlers::login))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
