/// MyPeople Admin - administration service for the MyPeople social app
///
/// Hosts the admin access-control gate, the lifecycle engines for
/// waitlist entries, content reports and user trust flags, and the audit
/// trail those mutations feed.

mod admin;
mod api;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod mailer;
mod rate_limit;
mod server;
mod session;

use config::AdminConfig;
use context::AppContext;
use error::AdminResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> AdminResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mypeople_admin=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AdminConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    tracing::info!("MyPeople admin service v{}", env!("CARGO_PKG_VERSION"));

    // Start server
    server::serve(ctx).await?;

    Ok(())
}
