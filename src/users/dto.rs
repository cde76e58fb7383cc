use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::users::repo_types::{Preferences, Role, Theme, User, UserChanges};
use crate::validation::{is_valid_email, FieldErrors};

pub const MAX_FULL_NAME_LEN: usize = 50;

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub preferences: Preferences,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            full_name: u.full_name,
            email: u.email,
            role: u.role,
            preferences: u.preferences,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Request body for `PATCH /users/:id`. Enum fields arrive as strings so that
/// bad values produce field errors instead of a body rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub theme: Option<String>,
}

impl UpdateUserRequest {
    pub fn into_changes(self) -> Result<UserChanges, AppError> {
        let mut errors = FieldErrors::new();

        let full_name = self.full_name.map(|n| n.trim().to_string());
        if let Some(name) = &full_name {
            if name.is_empty() {
                errors.add("fullName", "full name must not be empty");
            } else if name.chars().count() > MAX_FULL_NAME_LEN {
                errors.add("fullName", "full name must be at most 50 characters");
            }
        }

        let email = self.email.map(|e| e.trim().to_string());
        if let Some(email) = &email {
            if !is_valid_email(email) {
                errors.add("email", "email is not valid");
            }
        }

        let role = match self.role.as_deref() {
            None => None,
            Some(r) => {
                let parsed = Role::parse(r);
                if parsed.is_none() {
                    errors.add("role", "role must be admin or user");
                }
                parsed
            }
        };

        let theme = match self.theme.as_deref() {
            None => None,
            Some(t) => {
                let parsed = Theme::parse(t);
                if parsed.is_none() {
                    errors.add("theme", "theme must be system, light or dark");
                }
                parsed
            }
        };

        errors.finish()?;
        Ok(UserChanges {
            full_name,
            email,
            role,
            theme,
        })
    }
}
