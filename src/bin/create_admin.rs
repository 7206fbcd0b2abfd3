use std::env;

use anyhow::{anyhow, Context, Result};

use agent_desk::{
    bootstrap::{self, BootstrapOutcome},
    db, init_tracing,
};

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "database.sqlite".to_string());
    let username = env::var("ADMIN_USERNAME")
        .unwrap_or_else(|_| bootstrap::DEFAULT_ADMIN_USERNAME.to_string());
    let full_name = env::var("ADMIN_FULL_NAME")
        .unwrap_or_else(|_| bootstrap::DEFAULT_ADMIN_FULL_NAME.to_string());
    let password = env::var("ADMIN_PASSWORD").context("ADMIN_PASSWORD must be set")?;

    tracing::info!(component = "create-admin", database_url = %database_url, "preparing database");
    let pool = db::init_pool_with_size(&database_url, 1)?;
    db::run_migrations(&pool)?;

    let mut conn = pool
        .get()
        .map_err(|err| anyhow!("failed to get database connection: {err}"))?;

    match bootstrap::ensure_admin(&mut conn, &username, &password, &full_name)? {
        BootstrapOutcome::Created(admin) => {
            tracing::info!(user_id = admin.id, username = %admin.username, "administrator created");
        }
        BootstrapOutcome::AlreadyPresent(admin) => {
            tracing::info!(
                user_id = admin.id,
                username = %admin.username,
                "administrator already exists, nothing to do"
            );
        }
    }

    Ok(())
}
