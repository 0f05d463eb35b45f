use mimalloc::MiMalloc;
use schooldesk::{AccountService, ConnectionScope, CredentialHasher, SqliteConnector};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &schooldesk::config::CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.database_url,
        busy_timeout_secs = cfg.busy_timeout_secs,
        begin_immediate = cfg.begin_immediate,
        loglevel = %cfg.loglevel
    );

    let scope = ConnectionScope::new(SqliteConnector::from_config(cfg)?);
    schooldesk::db::init_schema(&scope).await?;
    info!("schema ready");

    match (cfg.admin_username.as_deref(), cfg.admin_password.as_deref()) {
        (Some(username), Some(password)) => {
            let accounts = AccountService::new(scope.clone(), CredentialHasher::default());
            let id = accounts.ensure_admin(username, password).await?;
            info!(user_id = id, username, "administrator account available");
        }
        (Some(username), None) => {
            warn!(username, "admin username configured without a password; skipping");
        }
        _ => {}
    }

    Ok(())
}
