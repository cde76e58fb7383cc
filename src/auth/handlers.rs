use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, ChangePasswordResponse, ConfirmPasswordRequest,
            ConfirmPasswordResponse, ExpiredCleanupResponse, ForgotPasswordRequest, ForgotPasswordResponse,
            ResetPasswordRequest, ResetPasswordResponse, SignInRequest, SignOutResponse,
            SignUpRequest, VerifyResetTokenResponse,
        },
        cleanup::CleanupReport,
        extractors::AuthUser,
        repo_types::TokenStats,
    },
    error::AppResult,
    state::AppState,
    users::dto::PublicUser,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(sign_up))
        .route("/auth/signin", post(sign_in))
        .route("/auth/confirm-password", post(confirm_password))
        .route("/auth/change-password", post(change_password))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/verify-reset-token/:token", get(verify_reset_token))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/signout", post(sign_out))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

pub fn token_maintenance_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/tokens/stats", get(token_stats))
        .route("/auth/tokens/cleanup", post(cleanup_tokens))
        .route("/auth/tokens/cleanup-expired", post(cleanup_expired_tokens))
}

#[instrument(skip(state, payload))]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(mut payload): Json<SignUpRequest>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    payload.validate()?;
    let user = state.auth.sign_up(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(mut payload): Json<SignInRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.validate()?;
    Ok(Json(state.auth.sign_in(payload).await?))
}

#[instrument(skip(state, caller, payload), fields(user_id = %caller.user.id))]
pub async fn confirm_password(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(payload): Json<ConfirmPasswordRequest>,
) -> AppResult<Json<ConfirmPasswordResponse>> {
    payload.validate()?;
    Ok(Json(
        state.auth.confirm_password(caller.user.id, payload).await?,
    ))
}

#[instrument(skip(state, caller, payload), fields(user_id = %caller.user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<ChangePasswordResponse>> {
    payload.validate()?;
    Ok(Json(
        state.auth.change_password(caller.user.id, payload).await?,
    ))
}

#[instrument(skip(state, caller), fields(user_id = %caller.user.id))]
pub async fn get_me(State(state): State<AppState>, caller: AuthUser) -> AppResult<Json<PublicUser>> {
    Ok(Json(state.auth.current_user(caller.user.id).await?))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ForgotPasswordResponse>> {
    payload.validate()?;
    Ok(Json(state.auth.forgot_password(payload).await?))
}

#[instrument(skip(state, token))]
pub async fn verify_reset_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<VerifyResetTokenResponse>> {
    Ok(Json(state.auth.verify_reset_token(&token).await?))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<ResetPasswordResponse>> {
    payload.validate()?;
    Ok(Json(state.auth.reset_password(payload).await?))
}

#[instrument(skip(state, caller), fields(user_id = %caller.user.id))]
pub async fn sign_out(
    State(state): State<AppState>,
    caller: AuthUser,
) -> AppResult<Json<SignOutResponse>> {
    Ok(Json(state.auth.sign_out(&caller.token).await?))
}

#[instrument(skip(state, _caller))]
pub async fn token_stats(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> AppResult<Json<TokenStats>> {
    Ok(Json(state.cleanup.stats().await?))
}

#[instrument(skip(state, _caller))]
pub async fn cleanup_tokens(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> AppResult<Json<CleanupReport>> {
    Ok(Json(state.cleanup.run_cleanup().await?))
}

#[instrument(skip(state, _caller))]
pub async fn cleanup_expired_tokens(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> AppResult<Json<ExpiredCleanupResponse>> {
    let deleted_count = state.cleanup.cleanup_expired_only().await?;
    Ok(Json(ExpiredCleanupResponse { deleted_count }))
}
