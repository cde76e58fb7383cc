use std::sync::Arc;

mod app;
mod auth;
mod config;
mod csv_import;
mod db;
mod error;
mod state;
mod users;
mod validation;

use crate::{auth::cleanup::spawn_cleanup_task, config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "data_uploader=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);
    let db = db::connect(&config).await?;

    sqlx::migrate!("./migrations").run(&db).await?;

    let state = AppState::new(config, db);
    spawn_cleanup_task(state.cleanup.clone(), state.config.cleanup_interval_secs);

    app::serve(app::build_app(state)).await
}
