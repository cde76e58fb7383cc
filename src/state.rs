use crate::auth::cleanup::TokenCleanup;
use crate::auth::jwt::JwtKeys;
use crate::auth::notifier::{LogNotifier, ResetNotifier};
use crate::auth::repo::{PgResetTokenRepo, PgRevokedTokenRepo, ResetTokenRepo, RevokedTokenRepo};
use crate::auth::services::AuthService;
use crate::config::AppConfig;
use crate::csv_import::repo::{CsvUserRepo, PgCsvUserRepo, PgUploadErrorRepo, UploadErrorRepo};
use crate::csv_import::services::CsvImportService;
use crate::users::repo::{PgUserRepo, UserRepo};
use crate::users::services::UserService;
use sqlx::PgPool;
use std::sync::Arc;

/// Repositories a running app is built from.
pub struct Repos {
    pub users: Arc<dyn UserRepo>,
    pub reset_tokens: Arc<dyn ResetTokenRepo>,
    pub revoked: Arc<dyn RevokedTokenRepo>,
    pub csv_users: Arc<dyn CsvUserRepo>,
    pub upload_errors: Arc<dyn UploadErrorRepo>,
}

impl Repos {
    pub fn postgres(db: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepo::new(db.clone())),
            reset_tokens: Arc::new(PgResetTokenRepo::new(db.clone())),
            revoked: Arc::new(PgRevokedTokenRepo::new(db.clone())),
            csv_users: Arc::new(PgCsvUserRepo::new(db.clone())),
            upload_errors: Arc::new(PgUploadErrorRepo::new(db)),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub csv: Arc<CsvImportService>,
    pub cleanup: Arc<TokenCleanup>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, db: PgPool) -> Self {
        let notifier = Arc::new(LogNotifier::new(config.frontend_url.clone()));
        Self::from_parts(config, Repos::postgres(db), notifier)
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        repos: Repos,
        notifier: Arc<dyn ResetNotifier>,
    ) -> Self {
        let keys = JwtKeys::from_config(&config.jwt);
        let auth = AuthService::new(
            repos.users.clone(),
            repos.reset_tokens.clone(),
            repos.revoked.clone(),
            keys,
            notifier,
        );
        let cleanup = TokenCleanup::new(repos.reset_tokens, repos.revoked);

        Self {
            auth: Arc::new(auth),
            users: Arc::new(UserService::new(repos.users)),
            csv: Arc::new(CsvImportService::new(repos.csv_users, repos.upload_errors)),
            cleanup: Arc::new(cleanup),
            config,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::db::memory::{
            MemoryCsvUserRepo, MemoryResetTokenRepo, MemoryRevokedTokenRepo,
            MemoryUploadErrorRepo, MemoryUserRepo, RecordingNotifier,
        };

        let repos = Repos {
            users: Arc::new(MemoryUserRepo::default()),
            reset_tokens: Arc::new(MemoryResetTokenRepo::default()),
            revoked: Arc::new(MemoryRevokedTokenRepo::default()),
            csv_users: Arc::new(MemoryCsvUserRepo::default()),
            upload_errors: Arc::new(MemoryUploadErrorRepo::default()),
        };
        Self::from_parts(
            Arc::new(AppConfig::for_tests()),
            repos,
            Arc::new(RecordingNotifier::default()),
        )
    }
}
