//! Application configuration loaded from `config.yaml` with environment
//! variable overrides.
//!
//! The file carries the bot token, the SQLite database path, and the
//! administrator's chat id. Every value can also be supplied through the
//! environment (`BOT_TOKEN`, `DATABASE_PATH`, `ADMIN_CHAT_ID`), which takes
//! precedence over the file.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::errors::{AppError, AppResult};

/// Bot transport settings
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub token: String,
}

/// SQLite storage settings
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

/// Administrator settings
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub chat_id: i64,
}

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub database: DatabaseConfig,
    pub admin: AdminConfig,
}

impl AppConfig {
    /// Load configuration from `config.yaml` (or `config.{yml,json,toml}`)
    /// in the working directory, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("database.path", "homework.db")?
            .set_default("database.max_connections", 5i64)?
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("HOMEWORK")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("bot.token", std::env::var("BOT_TOKEN").ok())?
            .set_override_option("database.path", std::env::var("DATABASE_PATH").ok())?
            .set_override_option("admin.chat_id", std::env::var("ADMIN_CHAT_ID").ok())?;

        builder.build()?.try_deserialize()
    }

    /// Validate the loaded configuration before anything connects anywhere.
    ///
    /// Telegram bot tokens have the shape `bot_id:secret` with a numeric
    /// bot id, so malformed tokens are caught at startup instead of on the
    /// first API call.
    pub fn validate(&self) -> AppResult<()> {
        let token = self.bot.token.trim();
        if token.is_empty() {
            return Err(AppError::Config(
                "bot.token is required but not set. Put it in config.yaml or the BOT_TOKEN environment variable.".to_string()
            ));
        }

        let parts: Vec<&str> = token.split(':').collect();
        if parts.len() != 2 {
            return Err(AppError::Config(
                "bot.token format is invalid. Expected format: 'bot_id:secret'".to_string(),
            ));
        }
        if parts[0].parse::<u64>().is_err() {
            return Err(AppError::Config(
                "bot.token bot id must be numeric".to_string(),
            ));
        }
        if parts[1].len() < 20 {
            return Err(AppError::Config(
                "bot.token appears to be too short. Please verify it's a valid bot token.".to_string(),
            ));
        }

        if self.database.path.trim().is_empty() {
            return Err(AppError::Config("database.path cannot be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(AppError::Config(
                "database.max_connections cannot be 0".to_string(),
            ));
        }

        if self.admin.chat_id == 0 {
            return Err(AppError::Config(
                "admin.chat_id is required but not set. The administrator approves registrations.".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config(token: &str, admin_chat_id: i64) -> AppConfig {
        AppConfig {
            bot: BotConfig {
                token: token.to_string(),
            },
            database: DatabaseConfig {
                path: "homework.db".to_string(),
                max_connections: 5,
            },
            admin: AdminConfig {
                chat_id: admin_chat_id,
            },
        }
    }

    #[test]
    fn accepts_well_formed_config() {
        let cfg = sample_config("123456789:AAAAAAAAAAAAAAAAAAAAAAAAAAA", 42);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_token_without_colon() {
        let cfg = sample_config("not-a-token", 42);
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(format!("{}", err).starts_with("[CONFIG]"));
    }

    #[test]
    fn rejects_non_numeric_bot_id() {
        let cfg = sample_config("abc:AAAAAAAAAAAAAAAAAAAAAAAAAAA", 42);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_missing_admin_chat_id() {
        let cfg = sample_config("123456789:AAAAAAAAAAAAAAAAAAAAAAAAAAA", 0);
        assert!(cfg.validate().is_err());
    }
}
