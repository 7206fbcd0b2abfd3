pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod models;
pub mod notify;
pub mod routes;
pub mod schema;
pub mod state;

use std::sync::Arc;

use config::AppConfig;
use notify::{DisabledNotifier, Notifier, TelegramNotifier};

/// Picks the notification sink for the given configuration.
pub fn build_notifier(config: &AppConfig) -> Arc<dyn Notifier> {
    match config.telegram.as_ref() {
        Some(telegram) => Arc::new(TelegramNotifier::new(telegram)),
        None => Arc::new(DisabledNotifier),
    }
}

pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
