use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub commission: CommissionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Slot grid and booking horizon used when resolving availability.
#[derive(Debug, Deserialize, Clone)]
pub struct SchedulingConfig {
    pub slot_interval_minutes: u32,
    pub buffer_minutes: u32,
    pub booking_horizon_days: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            slot_interval_minutes: 30,
            buffer_minutes: 30,
            booking_horizon_days: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommissionConfig {
    /// Percentage applied when a provider has no rate of their own.
    pub default_rate: Decimal,
}

impl Default for CommissionConfig {
    fn default() -> Self {
        Self {
            default_rate: Decimal::new(1500, 2),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite://appointly.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("scheduling.slot_interval_minutes", 30)?
            .set_default("scheduling.buffer_minutes", 30)?
            .set_default("scheduling.booking_horizon_days", 30)?
            .set_default("commission.default_rate", "15.00")?

            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Add environment variables (with APPOINTLY__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("APPOINTLY").separator("__"))

            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "sqlite://appointly.db?mode=rwc".to_string(),
                max_connections: 10,
            },
            scheduling: SchedulingConfig::default(),
            commission: CommissionConfig::default(),
        }
    }
}
