use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::users::dto::{PublicUser, UpdateUserRequest};
use crate::users::repo::UserRepo;

/// Admin reads and updates over the user collection.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepo>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepo>) -> Self {
        Self { users }
    }

    pub async fn list(&self) -> AppResult<Vec<PublicUser>> {
        let users = self.users.list().await?;
        Ok(users.into_iter().map(PublicUser::from).collect())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<PublicUser> {
        self.users
            .find_by_id(id)
            .await?
            .map(PublicUser::from)
            .ok_or_else(|| AppError::NotFound("user not found".into()))
    }

    /// Exact, case-sensitive email lookup.
    pub async fn get_by_email(&self, email: &str) -> AppResult<PublicUser> {
        self.users
            .find_by_email(email)
            .await?
            .map(PublicUser::from)
            .ok_or_else(|| AppError::NotFound("user not found".into()))
    }

    pub async fn update(&self, id: Uuid, req: UpdateUserRequest) -> AppResult<PublicUser> {
        let changes = req.into_changes()?;

        if let Some(email) = &changes.email {
            if let Some(existing) = self.users.find_by_email(email).await? {
                if existing.id != id {
                    warn!(user_id = %id, "email already taken by another user");
                    return Err(AppError::Conflict("email is already registered".into()));
                }
            }
        }

        let user = self
            .users
            .update(id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("user not found".into()))?;
        info!(user_id = %user.id, "user updated");
        Ok(user.into())
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.users.delete(id).await? {
            return Err(AppError::NotFound("user not found".into()));
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}
