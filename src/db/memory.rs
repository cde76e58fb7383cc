//! In-memory repositories for service and router tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::notifier::ResetNotifier;
use crate::auth::repo::{ResetTokenRepo, RevokedTokenRepo};
use crate::auth::repo_types::{PasswordResetToken, TokenStats};
use crate::csv_import::repo::{CsvUserRepo, UploadErrorRepo};
use crate::csv_import::repo_types::{CsvUploadError, CsvUser, NewCsvUser, NewUploadError};
use crate::db::StoreError;
use crate::users::repo::UserRepo;
use crate::users::repo_types::{NewUser, User, UserChanges};

#[derive(Default)]
pub struct MemoryUserRepo {
    users: Mutex<Vec<User>>,
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::Duplicate("email".into()));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            full_name: new.full_name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            preferences: new.preferences,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool, StoreError> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().unwrap();
        if let Some(email) = &changes.email {
            if users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::Duplicate("email".into()));
            }
        }
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(full_name) = changes.full_name {
            user.full_name = full_name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(theme) = changes.theme {
            user.preferences.theme = theme;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() != before)
    }
}

#[derive(Default)]
pub struct MemoryResetTokenRepo {
    tokens: Mutex<Vec<PasswordResetToken>>,
}

impl MemoryResetTokenRepo {
    pub fn tokens_for(&self, user_id: Uuid) -> Vec<PasswordResetToken> {
        let tokens = self.tokens.lock().unwrap();
        tokens.iter().filter(|t| t.user_id == user_id).cloned().collect()
    }
}

#[async_trait]
impl ResetTokenRepo for MemoryResetTokenRepo {
    async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> Result<PasswordResetToken, StoreError> {
        let mut tokens = self.tokens.lock().unwrap();
        if tokens.iter().any(|t| t.token == token) {
            return Err(StoreError::Duplicate("token".into()));
        }
        let record = PasswordResetToken {
            id: Uuid::new_v4(),
            user_id,
            token: token.to_string(),
            expires_at,
            used: false,
            created_at: OffsetDateTime::now_utc(),
        };
        tokens.push(record.clone());
        Ok(record)
    }

    async fn find_active(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<PasswordResetToken>, StoreError> {
        let tokens = self.tokens.lock().unwrap();
        Ok(tokens
            .iter()
            .find(|t| t.token == token && t.is_active(now))
            .cloned())
    }

    async fn mark_used(&self, token: &str) -> Result<Option<PasswordResetToken>, StoreError> {
        let mut tokens = self.tokens.lock().unwrap();
        Ok(tokens
            .iter_mut()
            .find(|t| t.token == token && !t.used)
            .map(|t| {
                t.used = true;
                t.clone()
            }))
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|t| t.user_id != user_id);
        Ok((before - tokens.len()) as u64)
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|t| t.expires_at >= now);
        Ok((before - tokens.len()) as u64)
    }

    async fn delete_used_or_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|t| !t.used && t.expires_at >= now);
        Ok((before - tokens.len()) as u64)
    }

    async fn stats(&self, now: OffsetDateTime) -> Result<TokenStats, StoreError> {
        let tokens = self.tokens.lock().unwrap();
        Ok(TokenStats {
            total: tokens.len() as i64,
            active: tokens.iter().filter(|t| t.is_active(now)).count() as i64,
            used: tokens.iter().filter(|t| t.used).count() as i64,
            expired: tokens.iter().filter(|t| t.expires_at < now).count() as i64,
        })
    }
}

#[derive(Default)]
pub struct MemoryRevokedTokenRepo {
    entries: Mutex<Vec<(String, OffsetDateTime)>>,
}

impl MemoryRevokedTokenRepo {
    pub fn expiry_of(&self, token: &str) -> Option<OffsetDateTime> {
        let entries = self.entries.lock().unwrap();
        entries.iter().find(|(t, _)| t == token).map(|(_, exp)| *exp)
    }
}

#[async_trait]
impl RevokedTokenRepo for MemoryRevokedTokenRepo {
    async fn revoke(&self, token: &str, expires_at: OffsetDateTime) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.iter_mut().find(|(t, _)| t == token) {
            Some(entry) => entry.1 = expires_at,
            None => entries.push((token.to_string(), expires_at)),
        }
        Ok(())
    }

    async fn is_revoked(&self, token: &str, now: OffsetDateTime) -> Result<bool, StoreError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.iter().any(|(t, exp)| t == token && *exp > now))
    }

    async fn delete_expired(&self, now: OffsetDateTime) -> Result<u64, StoreError> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|(_, exp)| *exp >= now);
        Ok((before - entries.len()) as u64)
    }
}

/// Stores CSV rows; inserts for emails listed in `failing` are refused.
#[derive(Default)]
pub struct MemoryCsvUserRepo {
    rows: Mutex<Vec<CsvUser>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryCsvUserRepo {
    pub fn fail_on(&self, email: &str) {
        self.failing.lock().unwrap().insert(email.to_string());
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl CsvUserRepo for MemoryCsvUserRepo {
    async fn insert(&self, new: NewCsvUser) -> Result<CsvUser, StoreError> {
        if self.failing.lock().unwrap().contains(&new.email) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let row = CsvUser {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            age: new.age,
            created_at: OffsetDateTime::now_utc(),
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn list(&self) -> Result<Vec<CsvUser>, StoreError> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CsvUser>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|r| r.id == id).cloned())
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let deleted = rows.len() as u64;
        rows.clear();
        Ok(deleted)
    }
}

#[derive(Default)]
pub struct MemoryUploadErrorRepo {
    records: Mutex<Vec<CsvUploadError>>,
    unavailable: Mutex<bool>,
}

impl MemoryUploadErrorRepo {
    pub fn records(&self) -> Vec<CsvUploadError> {
        self.records.lock().unwrap().clone()
    }

    /// Makes every subsequent insert fail.
    pub fn break_inserts(&self) {
        *self.unavailable.lock().unwrap() = true;
    }
}

#[async_trait]
impl UploadErrorRepo for MemoryUploadErrorRepo {
    async fn insert(&self, new: NewUploadError) -> Result<CsvUploadError, StoreError> {
        if *self.unavailable.lock().unwrap() {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let record = CsvUploadError {
            id: Uuid::new_v4(),
            original_name: new.original_name,
            mime_type: new.mime_type,
            size: new.size,
            status: new.status,
            total_rows: new.total_rows,
            success_count: new.success_count,
            error_count: new.error_count,
            errors: new.errors,
            parse_error: new.parse_error,
            created_at: OffsetDateTime::now_utc(),
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<CsvUploadError>, StoreError> {
        let mut records = self.records();
        records.reverse();
        Ok(records)
    }
}

/// Keeps every reset token handed to it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn last_token(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        sent.last().map(|(_, token)| token.clone())
    }
}

#[async_trait]
impl ResetNotifier for RecordingNotifier {
    async fn send_reset(
        &self,
        email: &str,
        token: &str,
        _expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), token.to_string()));
        Ok(())
    }
}
