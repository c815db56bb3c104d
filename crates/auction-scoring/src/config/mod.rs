use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use crate::scoring::ScoringPolicy;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scoring: ScoringPolicy,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            scoring: load_scoring_policy()?,
        })
    }
}

/// Policy defaults with `SCORING_*` environment overrides applied.
fn load_scoring_policy() -> Result<ScoringPolicy, ConfigError> {
    let mut policy = ScoringPolicy::default();

    override_from_env("SCORING_CAPITAL_LIMIT", &mut policy.capital_limit)?;
    override_from_env("SCORING_STALE_YEAR", &mut policy.stale_delinquency_year)?;
    override_from_env("SCORING_DELTA_PENALTY", &mut policy.delta_penalty_factor)?;
    override_from_env("SCORING_BUFFER_PCT", &mut policy.cost_buffer_pct)?;
    override_from_env("SCORING_TIME_DECAY_RATE", &mut policy.time_decay_rate)?;
    override_from_env(
        "SCORING_MIN_WHOLESALE_SPREAD",
        &mut policy.min_wholesale_spread,
    )?;
    override_from_env(
        "SCORING_MIN_WHOLESALE_MARGIN",
        &mut policy.min_wholesale_margin,
    )?;

    if !(0.0..=1.0).contains(&policy.delta_penalty_factor) {
        return Err(ConfigError::InvalidPolicyValue {
            key: "SCORING_DELTA_PENALTY",
            value: policy.delta_penalty_factor.to_string(),
        });
    }

    Ok(policy)
}

fn override_from_env<T>(key: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    T: FromStr + PolicyValue,
{
    let Ok(raw) = env::var(key) else {
        return Ok(());
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(());
    }

    match trimmed.parse::<T>() {
        Ok(value) if value.is_acceptable() => {
            *target = value;
            Ok(())
        }
        _ => Err(ConfigError::InvalidPolicyValue { key, value: raw }),
    }
}

/// Numeric policy knobs must be finite and non-negative.
trait PolicyValue {
    fn is_acceptable(&self) -> bool;
}

impl PolicyValue for f64 {
    fn is_acceptable(&self) -> bool {
        self.is_finite() && *self >= 0.0
    }
}

impl PolicyValue for i32 {
    fn is_acceptable(&self) -> bool {
        *self > 0
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPolicyValue { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPolicyValue { key, value } => {
                write!(f, "{key} has invalid value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidPolicyValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
