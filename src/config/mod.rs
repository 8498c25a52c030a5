//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::util::time::DEFAULT_TICK_RATE;

/// Fastest tick rate accepted
pub const MAX_TICK_RATE: u32 = 240;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_format_json: bool,

    /// Allowed client origins for CORS; any origin when unset
    pub client_origin: Option<String>,

    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Pause between `gameOver` and `gameReset`
    pub round_reset_delay: Duration,
    /// Max inbound messages per second per connection
    pub input_rate_limit: u32,
    /// Seed for the respawn RNG; random when unset
    pub match_seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT; fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port.trim()),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };

        let tick_rate = parse_or(&lookup, "TICK_RATE", DEFAULT_TICK_RATE)?;
        if !(1..=MAX_TICK_RATE).contains(&tick_rate) {
            return Err(ConfigError::Invalid {
                var: "TICK_RATE",
                reason: format!("must be between 1 and {MAX_TICK_RATE}"),
            });
        }

        let input_rate_limit = parse_or(&lookup, "INPUT_RATE_LIMIT", 60u32)?;
        if input_rate_limit == 0 {
            return Err(ConfigError::Invalid {
                var: "INPUT_RATE_LIMIT",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress(server_addr))?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format_json: lookup("LOG_FORMAT")
                .map(|f| f.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false),

            client_origin: lookup("CLIENT_ORIGIN").filter(|o| !o.trim().is_empty()),

            tick_rate,
            round_reset_delay: Duration::from_millis(parse_or(
                &lookup,
                "ROUND_RESET_DELAY_MS",
                5000u64,
            )?),
            input_rate_limit,
            match_seed: parse_opt(&lookup, "MATCH_SEED")?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_level: "info".to_string(),
            log_format_json: false,
            client_origin: None,
            tick_rate: DEFAULT_TICK_RATE,
            round_reset_delay: Duration::from_secs(5),
            input_rate_limit: 60,
            match_seed: None,
        }
    }
}

fn parse_opt<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(lookup, var)?.unwrap_or(default))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}
