/// Application context and dependency injection
///
/// Every request-scoped service hangs off this context; the resolved
/// admin identity travels by parameter (gate -> lifecycle manager ->
/// audit recorder), never through process-wide state.
use crate::{
    admin::{AuditRecorder, ReportManager, UserManager, WaitlistManager},
    config::AdminConfig,
    db,
    error::AdminResult,
    mailer::Mailer,
    rate_limit::{RateLimitConfig, RateLimiter},
    session::SessionManager,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AdminConfig>,
    pub db: SqlitePool,
    pub session_manager: Arc<SessionManager>,
    pub user_manager: Arc<UserManager>,
    pub waitlist_manager: Arc<WaitlistManager>,
    pub report_manager: Arc<ReportManager>,
    pub audit: Arc<AuditRecorder>,
    pub rate_limiter: Arc<RateLimiter>,
    pub mailer: Arc<Mailer>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: AdminConfig) -> AdminResult<Self> {
        config.validate()?;

        if !config.storage.data_directory.exists() {
            tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        }

        let pool = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        Ok(Self::with_pool(config, pool)?)
    }

    /// Wire services over an existing pool (also used by tests)
    pub fn with_pool(config: AdminConfig, pool: SqlitePool) -> AdminResult<Self> {
        let config = Arc::new(config);

        let audit = AuditRecorder::new(pool.clone());
        let session_manager = Arc::new(SessionManager::new(pool.clone(), Arc::clone(&config)));
        let user_manager = Arc::new(UserManager::new(pool.clone(), audit.clone()));
        let waitlist_manager = Arc::new(WaitlistManager::new(pool.clone(), audit.clone()));
        let report_manager = Arc::new(ReportManager::new(pool.clone(), audit.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig::default()));
        let mailer = Arc::new(Mailer::new(config.email.clone())?);

        Ok(Self {
            config,
            db: pool,
            session_manager,
            user_manager,
            waitlist_manager,
            report_manager,
            audit: Arc::new(audit),
            rate_limiter,
            mailer,
        })
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
