use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::{debug, info};

/// Delivers password reset tokens to their owner.
#[async_trait]
pub trait ResetNotifier: Send + Sync {
    async fn send_reset(
        &self,
        email: &str,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()>;
}

/// Writes the reset link to the log instead of sending mail.
#[derive(Clone)]
pub struct LogNotifier {
    frontend_url: String,
}

impl LogNotifier {
    pub fn new(frontend_url: impl Into<String>) -> Self {
        Self {
            frontend_url: frontend_url.into(),
        }
    }

    pub fn reset_link(&self, token: &str) -> String {
        format!("{}/reset-password?token={}", self.frontend_url, token)
    }
}

#[async_trait]
impl ResetNotifier for LogNotifier {
    async fn send_reset(
        &self,
        email: &str,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        info!(%email, %expires_at, "password reset requested");
        debug!(link = %self.reset_link(token), "password reset link");
        Ok(())
    }
}
