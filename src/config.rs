use std::{env, fmt, path::PathBuf};

use anyhow::{Context, Result};

use crate::db::DEFAULT_MAX_POOL_SIZE;

pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_pool_size: u32,
    pub server_host: String,
    pub server_port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub jwt_expiry_hours: i64,
    pub static_dir: PathBuf,
    pub cors_allowed_origin: Option<String>,
    pub telegram: Option<TelegramConfig>,
}

#[derive(Clone)]
pub struct TelegramConfig {
    pub api_url: String,
    pub bot_token: String,
    pub admin_chat_id: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "database.sqlite".to_string());
        let database_max_pool_size = env::var("DATABASE_MAX_POOL_SIZE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_POOL_SIZE);
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let jwt_issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| "agent-desk".to_string());
        let jwt_audience =
            env::var("JWT_AUDIENCE").unwrap_or_else(|_| "agent-desk-clients".to_string());
        let jwt_expiry_hours = env::var("JWT_EXPIRY_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .context("JWT_EXPIRY_HOURS must be an integer")?;
        let static_dir = env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("build"));
        let cors_allowed_origin = env::var("CORS_ALLOWED_ORIGIN").ok();
        let telegram = telegram_from_parts(
            env::var("TELEGRAM_BOT_TOKEN").ok(),
            env::var("TELEGRAM_ADMIN_CHAT_ID").ok(),
            env::var("TELEGRAM_API_URL").ok(),
        );

        Ok(Self {
            database_url,
            database_max_pool_size,
            server_host,
            server_port,
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            jwt_expiry_hours,
            static_dir,
            cors_allowed_origin,
            telegram,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn telegram_from_parts(
    bot_token: Option<String>,
    admin_chat_id: Option<String>,
    api_url: Option<String>,
) -> Option<TelegramConfig> {
    let bot_token = bot_token.filter(|value| !value.trim().is_empty())?;
    let admin_chat_id = admin_chat_id.filter(|value| !value.trim().is_empty())?;
    let api_url = api_url
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string());

    Some(TelegramConfig {
        api_url: api_url.trim_end_matches('/').to_string(),
        bot_token,
        admin_chat_id,
    })
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &self.database_url)
            .field("database_max_pool_size", &self.database_max_pool_size)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("jwt_expiry_hours", &self.jwt_expiry_hours)
            .field("static_dir", &self.static_dir)
            .field("cors_allowed_origin", &self.cors_allowed_origin)
            .field("telegram", &self.telegram)
            .finish()
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("api_url", &self.api_url)
            .field("bot_token", &"[REDACTED]")
            .field("admin_chat_id", &self.admin_chat_id)
            .finish()
    }
}
