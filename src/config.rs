//! Environment-based configuration module
//!
//! Settings are resolved in this order:
//! 1. Environment variables (highest priority)
//! 2. .env file, loaded into the environment before the first read
//! 3. Default values (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;
use std::{env, fs};

/// Application environment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// Get environment from APP_ENV variable or default to Development
    pub fn from_env() -> Self {
        match env::var("APP_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub app_name: String,
    pub version: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
    pub inventory: InventoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite:backoffice.db?mode=rwc`
    pub url: String,

    pub max_connections: u32,
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Session timeout in minutes
    pub session_timeout_mins: i64,

    /// Maximum login attempts per username inside one lockout window
    pub max_login_attempts: u32,

    /// Lockout window in minutes
    pub lockout_duration_mins: i64,

    pub min_password_length: usize,

    /// bcrypt work factor
    pub bcrypt_cost: u32,

    /// Write business actions to `activity_logs`
    pub enable_audit_log: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive (error, warn, info, debug, trace or a full EnvFilter directive)
    pub level: String,

    /// Use JSON format (true for production)
    pub json_format: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Tracked stock at or below this is reported as low
    pub low_stock_threshold: i64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::from_env();

        Self {
            environment: env,
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "Retail Back Office".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),

            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_or("PORT", 8080),
            },

            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:backoffice.db?mode=rwc".to_string()),
                max_connections: env_or("DB_MAX_CONNECTIONS", 10),
                min_connections: env_or("DB_MIN_CONNECTIONS", 2),
                connect_timeout_secs: 30,
                idle_timeout_secs: 600,
            },

            security: SecurityConfig {
                session_timeout_mins: env_or("SESSION_TIMEOUT_MINS", 480), // 8 hours
                max_login_attempts: env_or("MAX_LOGIN_ATTEMPTS", 5),
                lockout_duration_mins: 15,
                min_password_length: env_or("MIN_PASSWORD_LENGTH", 8),
                bcrypt_cost: env_or("BCRYPT_COST", bcrypt::DEFAULT_COST),
                enable_audit_log: env::var("ENABLE_AUDIT_LOG")
                    .map(|s| s != "false")
                    .unwrap_or(true),
            },

            logging: LoggingConfig {
                level: env::var("RUST_LOG").unwrap_or_else(|_| {
                    if env.is_production() {
                        "warn".to_string()
                    } else {
                        "debug".to_string()
                    }
                }),
                json_format: env.is_production(),
            },

            inventory: InventoryConfig {
                low_stock_threshold: env_or("LOW_STOCK_THRESHOLD", 5),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> Self {
        Self::default()
    }

    /// Load configuration after applying a .env file (if it exists).
    /// Variables already present in the environment win over the file.
    pub fn load_from_file(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;

        for (key, value) in parse_env_file(&content) {
            if env::var_os(&key).is_none() {
                env::set_var(key, value);
            }
        }

        Some(Self::default())
    }

    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.database.min_connections > self.database.max_connections {
            return Err(format!(
                "DB_MIN_CONNECTIONS ({}) exceeds DB_MAX_CONNECTIONS ({})",
                self.database.min_connections, self.database.max_connections
            ));
        }

        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(format!(
                "BCRYPT_COST must be between 4 and 31, got {}",
                self.security.bcrypt_cost
            ));
        }

        if self.security.session_timeout_mins <= 0 {
            return Err("SESSION_TIMEOUT_MINS must be positive".to_string());
        }

        if self.is_production() && self.security.bcrypt_cost < 10 {
            tracing::warn!(
                target: "CONFIG",
                cost = self.security.bcrypt_cost,
                "low bcrypt cost in production"
            );
        }

        Ok(())
    }
}

/// Simple .env parser (key=value format, `#` comments, optional quotes)
fn parse_env_file(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

/// Global configuration instance
static GLOBAL_CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Initialize the global configuration
pub fn init_config() -> &'static AppConfig {
    GLOBAL_CONFIG.get_or_init(|| {
        AppConfig::load_from_file(Path::new(".env")).unwrap_or_else(AppConfig::load)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_env_file_lines() {
        let parsed = parse_env_file(
            "# comment\nPORT=9000\n\nDATABASE_URL=\"sqlite::memory:\"\nAPP_NAME='Shop'\nbroken line\n",
        );

        assert_eq!(
            parsed,
            vec![
                ("PORT".to_string(), "9000".to_string()),
                ("DATABASE_URL".to_string(), "sqlite::memory:".to_string()),
                ("APP_NAME".to_string(), "Shop".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_inverted_pool_bounds() {
        let mut config = AppConfig::default();
        config.database.min_connections = 20;
        config.database.max_connections = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_bcrypt_cost() {
        let mut config = AppConfig::default();
        config.database.min_connections = 1;
        config.database.max_connections = 1;
        config.security.bcrypt_cost = 2;
        assert!(config.validate().is_err());

        config.security.bcrypt_cost = 4;
        assert!(config.validate().is_ok());
    }
}
