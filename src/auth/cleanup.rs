use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{error, info};

use crate::auth::repo::{ResetTokenRepo, RevokedTokenRepo};
use crate::auth::repo_types::TokenStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub deleted_count: u64,
    pub revoked_deleted: u64,
    pub stats: TokenStats,
}

/// Purges consumed and elapsed tokens from both token tables.
pub struct TokenCleanup {
    reset_tokens: Arc<dyn ResetTokenRepo>,
    revoked: Arc<dyn RevokedTokenRepo>,
}

impl TokenCleanup {
    pub fn new(reset_tokens: Arc<dyn ResetTokenRepo>, revoked: Arc<dyn RevokedTokenRepo>) -> Self {
        Self {
            reset_tokens,
            revoked,
        }
    }

    /// Removes used or expired reset tokens and expired denylist entries.
    pub async fn run_cleanup(&self) -> anyhow::Result<CleanupReport> {
        let now = OffsetDateTime::now_utc();
        let deleted_count = self.reset_tokens.delete_used_or_expired(now).await?;
        let revoked_deleted = self.revoked.delete_expired(now).await?;
        let stats = self.reset_tokens.stats(now).await?;
        Ok(CleanupReport {
            deleted_count,
            revoked_deleted,
            stats,
        })
    }

    pub async fn cleanup_expired_only(&self) -> anyhow::Result<u64> {
        Ok(self
            .reset_tokens
            .delete_expired(OffsetDateTime::now_utc())
            .await?)
    }

    pub async fn stats(&self) -> anyhow::Result<TokenStats> {
        Ok(self.reset_tokens.stats(OffsetDateTime::now_utc()).await?)
    }
}

/// Runs [`TokenCleanup::run_cleanup`] every `interval_secs` until the runtime
/// shuts down. The first pass happens immediately.
pub fn spawn_cleanup_task(cleanup: Arc<TokenCleanup>, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            match cleanup.run_cleanup().await {
                Ok(report) => info!(
                    deleted = report.deleted_count,
                    revoked_deleted = report.revoked_deleted,
                    total = report.stats.total,
                    active = report.stats.active,
                    "token cleanup finished"
                ),
                Err(e) => error!(error = %e, "token cleanup failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{MemoryResetTokenRepo, MemoryRevokedTokenRepo};
    use time::Duration as TimeDuration;
    use uuid::Uuid;

    fn setup() -> (
        TokenCleanup,
        Arc<MemoryResetTokenRepo>,
        Arc<MemoryRevokedTokenRepo>,
    ) {
        let reset = Arc::new(MemoryResetTokenRepo::default());
        let revoked = Arc::new(MemoryRevokedTokenRepo::default());
        (
            TokenCleanup::new(reset.clone(), revoked.clone()),
            reset,
            revoked,
        )
    }

    #[tokio::test]
    async fn cleanup_removes_used_and_expired_but_keeps_active() {
        let (cleanup, reset, revoked) = setup();
        let now = OffsetDateTime::now_utc();
        let user = Uuid::new_v4();
        reset.create(user, "active", now + TimeDuration::hours(1)).await.unwrap();
        reset.create(user, "expired", now - TimeDuration::minutes(5)).await.unwrap();
        reset.create(user, "used", now + TimeDuration::hours(1)).await.unwrap();
        reset.mark_used("used").await.unwrap();
        revoked.revoke("old-jwt", now - TimeDuration::seconds(1)).await.unwrap();
        revoked.revoke("live-jwt", now + TimeDuration::days(1)).await.unwrap();

        let report = cleanup.run_cleanup().await.unwrap();
        assert_eq!(report.deleted_count, 2);
        assert_eq!(report.revoked_deleted, 1);
        assert_eq!(
            report.stats,
            TokenStats {
                total: 1,
                active: 1,
                used: 0,
                expired: 0
            }
        );
        assert!(reset.find_active("active", now).await.unwrap().is_some());
        assert!(revoked.is_revoked("live-jwt", now).await.unwrap());

        let again = cleanup.run_cleanup().await.unwrap();
        assert_eq!(again.deleted_count, 0);
        assert_eq!(again.revoked_deleted, 0);
    }

    #[tokio::test]
    async fn expired_only_keeps_used_tokens() {
        let (cleanup, reset, _) = setup();
        let now = OffsetDateTime::now_utc();
        let user = Uuid::new_v4();
        reset.create(user, "expired", now - TimeDuration::minutes(1)).await.unwrap();
        reset.create(user, "used", now + TimeDuration::hours(1)).await.unwrap();
        reset.mark_used("used").await.unwrap();

        assert_eq!(cleanup.cleanup_expired_only().await.unwrap(), 1);
        let stats = cleanup.stats().await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.used, 1);
    }
}
