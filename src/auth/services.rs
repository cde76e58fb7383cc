use std::sync::Arc;

use rand::{rngs::OsRng, RngCore};
use time::{Duration, OffsetDateTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::dto::{
    AuthResponse, AuthenticatedUser, ChangePasswordRequest, ChangePasswordResponse,
    ConfirmPasswordRequest, ConfirmPasswordResponse, ForgotPasswordRequest,
    ForgotPasswordResponse, ResetPasswordRequest, ResetPasswordResponse, SignInRequest,
    SignOutResponse, SignUpRequest, VerifyResetTokenResponse,
};
use crate::auth::jwt::{JwtKeys, TokenError, SESSION_TTL};
use crate::auth::notifier::ResetNotifier;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::{ResetTokenRepo, RevokedTokenRepo};
use crate::error::{AppError, AppResult};
use crate::users::dto::PublicUser;
use crate::users::repo::UserRepo;
use crate::users::repo_types::{NewUser, Role, User};

/// Lifetime of a password reset token.
pub const RESET_TOKEN_TTL: Duration = Duration::hours(1);
const RESET_TOKEN_BYTES: usize = 32;

const INVALID_CREDENTIALS: &str = "invalid credentials";
const INVALID_RESET_TOKEN: &str = "invalid or expired reset token";

/// Session tokens, password changes and the password reset lifecycle.
pub struct AuthService {
    users: Arc<dyn UserRepo>,
    reset_tokens: Arc<dyn ResetTokenRepo>,
    revoked: Arc<dyn RevokedTokenRepo>,
    keys: JwtKeys,
    notifier: Arc<dyn ResetNotifier>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        reset_tokens: Arc<dyn ResetTokenRepo>,
        revoked: Arc<dyn RevokedTokenRepo>,
        keys: JwtKeys,
        notifier: Arc<dyn ResetNotifier>,
    ) -> Self {
        Self {
            users,
            reset_tokens,
            revoked,
            keys,
            notifier,
        }
    }

    pub async fn sign_up(&self, req: SignUpRequest) -> AppResult<PublicUser> {
        if self.users.find_by_email(&req.email).await?.is_some() {
            warn!(email = %req.email, "email already registered");
            return Err(AppError::Conflict("email is already registered".into()));
        }

        let password_hash = hash_password(&req.password)?;
        let preferences = req.initial_preferences();
        // The unique index still guards the window between check and insert.
        let user = self
            .users
            .create(NewUser {
                full_name: req.full_name,
                email: req.email,
                password_hash,
                role: Role::Admin,
                preferences,
            })
            .await?;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user.into())
    }

    pub async fn sign_in(&self, req: SignInRequest) -> AppResult<AuthResponse> {
        let Some(user) = self.users.find_by_email(&req.email).await? else {
            warn!(email = %req.email, "signin unknown email");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        };

        if !verify_password(&req.password, &user.password_hash)? {
            warn!(user_id = %user.id, "signin invalid password");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        let token = self.keys.sign(&user)?;
        info!(user_id = %user.id, "user signed in");
        Ok(AuthResponse {
            token,
            user: user.into(),
        })
    }

    pub async fn confirm_password(
        &self,
        user_id: Uuid,
        req: ConfirmPasswordRequest,
    ) -> AppResult<ConfirmPasswordResponse> {
        let matches = match self.users.find_by_id(user_id).await? {
            Some(user) => verify_password(&req.password, &user.password_hash)?,
            None => false,
        };
        if !matches {
            return Err(AppError::BadRequest("incorrect password".into()));
        }
        Ok(ConfirmPasswordResponse { confirmed: true })
    }

    pub async fn change_password(
        &self,
        caller_id: Uuid,
        req: ChangePasswordRequest,
    ) -> AppResult<ChangePasswordResponse> {
        let target_id = req.user_id.unwrap_or(caller_id);
        let user = self
            .users
            .find_by_id(target_id)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".into()))?;

        if !verify_password(&req.current_password, &user.password_hash)? {
            warn!(user_id = %target_id, "change password with wrong current password");
            return Err(AppError::BadRequest("current password is incorrect".into()));
        }

        let password_hash = hash_password(&req.new_password)?;
        if !self.users.update_password(target_id, &password_hash).await? {
            return Err(AppError::NotFound("user not found".into()));
        }

        info!(user_id = %target_id, caller_id = %caller_id, "password changed");
        Ok(ChangePasswordResponse { updated: true })
    }

    pub async fn current_user(&self, user_id: Uuid) -> AppResult<PublicUser> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(PublicUser::from)
            .ok_or_else(|| AppError::NotFound("user not found".into()))
    }

    /// Replaces any reset tokens of the user with a fresh one and hands it to
    /// the notifier. The token never appears in the response.
    pub async fn forgot_password(
        &self,
        req: ForgotPasswordRequest,
    ) -> AppResult<ForgotPasswordResponse> {
        let user = self
            .users
            .find_by_email(&req.email)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".into()))?;

        let removed = self.reset_tokens.delete_by_user(user.id).await?;
        if removed > 0 {
            debug!(user_id = %user.id, removed, "previous reset tokens removed");
        }

        let token = generate_reset_token();
        let expires_at = OffsetDateTime::now_utc() + RESET_TOKEN_TTL;
        self.reset_tokens.create(user.id, &token, expires_at).await?;
        self.notifier
            .send_reset(&user.email, &token, expires_at)
            .await?;

        info!(user_id = %user.id, "password reset token issued");
        Ok(ForgotPasswordResponse {
            email: user.email,
            token_sent: true,
            expires_at,
        })
    }

    pub async fn verify_reset_token(&self, token: &str) -> AppResult<VerifyResetTokenResponse> {
        let record = self
            .reset_tokens
            .find_active(token, OffsetDateTime::now_utc())
            .await?
            .ok_or_else(|| AppError::BadRequest(INVALID_RESET_TOKEN.into()))?;
        Ok(VerifyResetTokenResponse {
            valid: true,
            user_id: record.user_id,
        })
    }

    pub async fn reset_password(
        &self,
        req: ResetPasswordRequest,
    ) -> AppResult<ResetPasswordResponse> {
        if req.new_password != req.confirm_password {
            return Err(AppError::BadRequest("passwords do not match".into()));
        }

        let record = self
            .reset_tokens
            .find_active(&req.token, OffsetDateTime::now_utc())
            .await?
            .ok_or_else(|| AppError::BadRequest(INVALID_RESET_TOKEN.into()))?;

        let password_hash = hash_password(&req.new_password)?;
        // Consume first: only one caller can win the used=false → true flip.
        // If the update below fails the token stays spent and the user has to
        // request a new one.
        if self.reset_tokens.mark_used(&req.token).await?.is_none() {
            return Err(AppError::BadRequest(INVALID_RESET_TOKEN.into()));
        }
        match self
            .users
            .update_password(record.user_id, &password_hash)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                error!(user_id = %record.user_id, "reset token consumed but user is gone");
                return Err(AppError::NotFound("user not found".into()));
            }
            Err(e) => {
                error!(user_id = %record.user_id, error = %e, "reset token consumed but password not updated");
                return Err(e.into());
            }
        }

        info!(user_id = %record.user_id, "password reset");
        Ok(ResetPasswordResponse {
            success: true,
            message: "password has been reset".into(),
        })
    }

    pub async fn sign_out(&self, raw_token: &str) -> AppResult<SignOutResponse> {
        let token = raw_token.trim();
        if token.is_empty() {
            return Err(AppError::BadRequest("no token provided".into()));
        }

        let expires_at = self.revocation_expiry(token, OffsetDateTime::now_utc());
        self.revoked.revoke(token, expires_at).await?;
        info!(%expires_at, "session token revoked");
        Ok(SignOutResponse { success: true })
    }

    /// Upper bound for how long a revoked token must stay on the denylist.
    /// Only a signature-verified `exp` is trusted, and never beyond
    /// `now + SESSION_TTL`, which no token issued here can outlive.
    fn revocation_expiry(&self, token: &str, now: OffsetDateTime) -> OffsetDateTime {
        let ceiling = now + SESSION_TTL;
        match self.keys.verify_ignoring_expiry(token) {
            Ok(claims) => OffsetDateTime::from_unix_timestamp(claims.exp as i64)
                .map(|exp| exp.min(ceiling))
                .unwrap_or(ceiling),
            Err(_) => ceiling,
        }
    }

    pub async fn is_revoked(&self, raw_token: &str) -> AppResult<bool> {
        Ok(self
            .revoked
            .is_revoked(raw_token, OffsetDateTime::now_utc())
            .await?)
    }

    /// Full check applied to every bearer token: signature and expiry, then
    /// the denylist, then the owning user.
    pub async fn validate_bearer(&self, raw_token: &str) -> AppResult<AuthenticatedUser> {
        let token = raw_token.trim();
        if token.is_empty() {
            return Err(AppError::Unauthorized("no token provided".into()));
        }

        let claims = self.keys.verify(token).map_err(|e| match e {
            TokenError::Expired => AppError::Unauthorized("token expired".into()),
            TokenError::Malformed => AppError::Unauthorized("malformed token".into()),
        })?;

        if self.is_revoked(token).await? {
            warn!(user_id = %claims.sub, "revoked token presented");
            return Err(AppError::Unauthorized("token revoked".into()));
        }

        let user: User = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("user not found".into()))?;

        Ok(AuthenticatedUser {
            id: user.id,
            email: user.email,
            role: user.role,
        })
    }
}

/// 32 bytes from the OS CSPRNG, hex encoded.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
