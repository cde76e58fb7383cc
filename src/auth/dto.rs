use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::users::dto::{PublicUser, MAX_FULL_NAME_LEN};
use crate::users::repo_types::{Preferences, Role, Theme};
use crate::validation::{is_strong_password, is_valid_email, FieldErrors};

const WEAK_PASSWORD: &str =
    "password must have at least 8 characters with a lowercase letter, an uppercase letter, a number and a symbol";

/// Request body for signup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub preferences: Option<SignUpPreferences>,
}

/// Theme arrives as a string so a bad value becomes a field error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignUpPreferences {
    pub theme: Option<String>,
}

impl SignUpRequest {
    /// Trims name and email, then checks every field.
    pub fn validate(&mut self) -> Result<(), AppError> {
        self.full_name = self.full_name.trim().to_string();
        self.email = self.email.trim().to_string();

        let mut errors = FieldErrors::new();
        if errors.require("fullName", &self.full_name, "full name is required")
            && self.full_name.chars().count() > MAX_FULL_NAME_LEN
        {
            errors.add("fullName", "full name must be at most 50 characters");
        }
        if errors.require("email", &self.email, "email is required") && !is_valid_email(&self.email)
        {
            errors.add("email", "email is not valid");
        }
        if errors.require("password", &self.password, "password is required")
            && !is_strong_password(&self.password)
        {
            errors.add("password", WEAK_PASSWORD);
        }
        if let Some(theme) = self.requested_theme() {
            if Theme::parse(theme).is_none() {
                errors.add("preferences.theme", "theme must be system, light or dark");
            }
        }
        errors.finish()
    }

    /// Preferences for the new account. Unset or unknown themes fall back to
    /// the default; `validate` has already rejected unknown ones.
    pub fn initial_preferences(&self) -> Preferences {
        let theme = self
            .requested_theme()
            .and_then(Theme::parse)
            .unwrap_or_default();
        Preferences { theme }
    }

    fn requested_theme(&self) -> Option<&str> {
        self.preferences.as_ref()?.theme.as_deref()
    }
}

/// Request body for signin.
#[derive(Debug, Clone, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

impl SignInRequest {
    pub fn validate(&mut self) -> Result<(), AppError> {
        self.email = self.email.trim().to_string();
        let mut errors = FieldErrors::new();
        errors.require("email", &self.email, "email is required");
        errors.require("password", &self.password, "password is required");
        errors.finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmPasswordRequest {
    pub password: String,
}

impl ConfirmPasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        errors.require("password", &self.password, "password is required");
        errors.finish()
    }
}

/// `user_id` targets another account; the caller is the default target.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        errors.require(
            "currentPassword",
            &self.current_password,
            "current password is required",
        );
        if errors.require("newPassword", &self.new_password, "new password is required")
            && !is_strong_password(&self.new_password)
        {
            errors.add("newPassword", WEAK_PASSWORD);
        }
        errors.finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

impl ForgotPasswordRequest {
    pub fn validate(&mut self) -> Result<(), AppError> {
        self.email = self.email.trim().to_string();
        let mut errors = FieldErrors::new();
        if errors.require("email", &self.email, "email is required") && !is_valid_email(&self.email)
        {
            errors.add("email", "email is not valid");
        }
        errors.finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl ResetPasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = FieldErrors::new();
        errors.require("token", &self.token, "token is required");
        if errors.require("newPassword", &self.new_password, "new password is required")
            && !is_strong_password(&self.new_password)
        {
            errors.add("newPassword", WEAK_PASSWORD);
        }
        errors.require(
            "confirmPassword",
            &self.confirm_password,
            "password confirmation is required",
        );
        errors.finish()
    }
}

/// Response returned after signin.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct ConfirmPasswordResponse {
    pub confirmed: bool,
}

#[derive(Debug, Serialize)]
pub struct ChangePasswordResponse {
    pub updated: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordResponse {
    pub email: String,
    pub token_sent: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResetTokenResponse {
    pub valid: bool,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SignOutResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiredCleanupResponse {
    pub deleted_count: u64,
}

/// Principal attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}
