use anyhow::Context;
use tokio::{net::TcpListener, signal};

use agent_desk::{
    auth::jwt::JwtService, build_notifier, config::AppConfig, db, init_tracing, routes,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "server",
        database_url = %config.database_url,
        pool_size = config.database_max_pool_size,
        static_dir = %config.static_dir.display(),
        notifications_enabled = config.telegram.is_some(),
        "loaded configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    db::run_migrations(&pool)?;
    tracing::info!("database ready");

    let jwt = JwtService::from_config(&config)?;
    let notifier = build_notifier(&config);
    let address = config.bind_address();
    let state = AppState::new(pool, config, jwt, notifier);
    let app = routes::create_router(state);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    tracing::info!(%address, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if signal::ctrl_c().await.is_ok() {
                tracing::info!("server received shutdown signal");
            }
        })
        .await
        .context("server error")?;

    Ok(())
}
