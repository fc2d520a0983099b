use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

const DEFAULT_DUE_SOON_DAYS: i64 = 30;
const MAX_DUE_SOON_DAYS: i64 = 3_650;
const DEFAULT_ADMIN_USERNAME: &str = "admin";

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
    pub portal: PortalConfig,
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

        let due_soon_days = match env::var("PORTAL_DUE_SOON_DAYS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|days| (0..=MAX_DUE_SOON_DAYS).contains(days))
                .ok_or(ConfigError::InvalidDueSoonWindow { value: raw })?,
            Err(_) => DEFAULT_DUE_SOON_DAYS,
        };

        let seed_csv = env::var("PORTAL_SEED_CSV")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        let admin_username = env::var("PORTAL_ADMIN_USER")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            portal: PortalConfig {
                due_soon_days,
                seed_csv,
                admin_username,
            },
        })
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Compliance tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    /// Instruction records due within this many days are reported as `due_soon`.
    pub due_soon_days: i64,
    /// Employee CSV loaded into the directory at startup.
    pub seed_csv: Option<PathBuf>,
    /// Superuser login guaranteed to exist after startup.
    pub admin_username: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            due_soon_days: DEFAULT_DUE_SOON_DAYS,
            seed_csv: None,
            admin_username: DEFAULT_ADMIN_USERNAME.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDueSoonWindow { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDueSoonWindow { value } => write!(
                f,
                "PORTAL_DUE_SOON_DAYS must be between 0 and {MAX_DUE_SOON_DAYS} days \
                 (found '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidDueSoonWindow { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("PORTAL_DUE_SOON_DAYS");
        env::remove_var("PORTAL_SEED_CSV");
        env::remove_var("PORTAL_ADMIN_USER");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.portal, PortalConfig::default());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn portal_settings_are_read_from_env() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PORTAL_DUE_SOON_DAYS", "14");
        env::set_var("PORTAL_SEED_CSV", "./seed/employees.csv");
        env::set_var("PORTAL_ADMIN_USER", " root ");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.portal.due_soon_days, 14);
        assert_eq!(
            config.portal.seed_csv,
            Some(PathBuf::from("./seed/employees.csv"))
        );
        assert_eq!(config.portal.admin_username, "root");
        reset_env();
    }

    #[test]
    fn rejects_out_of_range_due_soon_window() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        for raw in ["-3", "3651", "9223372036854775807"] {
            reset_env();
            env::set_var("PORTAL_DUE_SOON_DAYS", raw);
            match AppConfig::load() {
                Err(ConfigError::InvalidDueSoonWindow { value }) => assert_eq!(value, raw),
                other => panic!("expected invalid window, got {other:?}"),
            }
        }
        reset_env();
    }
}
