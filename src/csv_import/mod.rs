use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod parser;
pub mod repo;
pub mod repo_types;
pub mod services;
mod validation;

pub fn router() -> Router<AppState> {
    handlers::csv_routes()
}
