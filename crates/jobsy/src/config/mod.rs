use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::ops::RangeInclusive;

use chrono::Duration;

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
    pub board: BoardSettings,
    pub storage: StorageSettings,
    pub admin: AdminBootstrap,
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

        let listing_ttl_days =
            parse_number("JOBSY_LISTING_TTL_DAYS", 30, 1..=MAX_LISTING_TTL_DAYS)?;
        let page_size = parse_number("JOBSY_PAGE_SIZE", 9, 1..=MAX_PAGE_SIZE)?;
        let signed_url_ttl_secs =
            parse_number("JOBSY_SIGNED_URL_TTL_SECS", 3600, 1..=MAX_SIGNED_URL_TTL_SECS)?;
        let session_ttl_secs =
            parse_number("JOBSY_SESSION_TTL_SECS", 86_400, 60..=MAX_SESSION_TTL_SECS)?;

        let private_cv_storage = parse_flag("JOBSY_PRIVATE_CV_STORAGE", true)?;
        let media_base_url =
            env::var("JOBSY_MEDIA_BASE_URL").unwrap_or_else(|_| "/media".to_string());
        let signing_secret =
            env::var("JOBSY_SIGNING_SECRET").unwrap_or_else(|_| "jobsy-development".to_string());

        let admin = AdminBootstrap {
            username: env::var("JOBSY_ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string()),
            email: env::var("JOBSY_ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@example.com".to_string()),
            password: env::var("JOBSY_ADMIN_PASSWORD")
                .ok()
                .filter(|value| !value.is_empty()),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            board: BoardSettings {
                listing_ttl_days,
                page_size: page_size as usize,
                similar_limit: 5,
                recent_applications: 5,
            },
            storage: StorageSettings {
                private_cv_storage,
                signed_url_ttl_secs,
                session_ttl_secs,
                media_base_url,
                signing_secret,
            },
            admin,
        })
    }
}

const MAX_LISTING_TTL_DAYS: i64 = 3650;
const MAX_PAGE_SIZE: i64 = 1000;
const MAX_SIGNED_URL_TTL_SECS: i64 = 7 * 24 * 3600;
const MAX_SESSION_TTL_SECS: i64 = 30 * 24 * 3600;

/// Integer setting that must fall inside `allowed`, so durations built from
/// it stay representable.
fn parse_number(
    key: &'static str,
    default: i64,
    allowed: RangeInclusive<i64>,
) -> Result<i64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|value| allowed.contains(value))
            .ok_or(ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

fn parse_flag(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { key }),
        },
        Err(_) => Ok(default),
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

/// Business rules for listings and employer dashboards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSettings {
    /// Days an approved listing stays live when no expiry was set.
    pub listing_ttl_days: i64,
    pub page_size: usize,
    pub similar_limit: usize,
    pub recent_applications: usize,
}

impl BoardSettings {
    pub fn listing_ttl(&self) -> Duration {
        Duration::days(self.listing_ttl_days)
    }
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            listing_ttl_days: 30,
            page_size: 9,
            similar_limit: 5,
            recent_applications: 5,
        }
    }
}

/// Blob storage and signing behaviour. The secret keys both signed media
/// URLs and session tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// CVs go to the private tier and are served through signed URLs.
    pub private_cv_storage: bool,
    pub signed_url_ttl_secs: i64,
    pub session_ttl_secs: i64,
    pub media_base_url: String,
    pub signing_secret: String,
}

impl StorageSettings {
    pub fn session_ttl(&self) -> Duration {
        Duration::seconds(self.session_ttl_secs)
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            private_cv_storage: true,
            signed_url_ttl_secs: 3600,
            session_ttl_secs: 86_400,
            media_base_url: "/media".to_string(),
            signing_secret: "jobsy-development".to_string(),
        }
    }
}

/// Credentials for the administrator account ensured at start-up.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminBootstrap {
    pub username: String,
    pub email: String,
    pub password: Option<String>,
}

impl fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    InvalidFlag { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be an integer within its allowed range")
            }
            ConfigError::InvalidFlag { key } => write!(f, "{key} must be true or false"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidFlag { .. } => None,
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
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "JOBSY_LISTING_TTL_DAYS",
            "JOBSY_PAGE_SIZE",
            "JOBSY_SIGNED_URL_TTL_SECS",
            "JOBSY_SESSION_TTL_SECS",
            "JOBSY_PRIVATE_CV_STORAGE",
            "JOBSY_MEDIA_BASE_URL",
            "JOBSY_SIGNING_SECRET",
            "JOBSY_ADMIN_USERNAME",
            "JOBSY_ADMIN_EMAIL",
            "JOBSY_ADMIN_PASSWORD",
        ] {
            env::remove_var(key);
        }
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
        assert_eq!(config.board, BoardSettings::default());
        assert_eq!(config.board.listing_ttl(), Duration::days(30));
        assert!(config.storage.private_cv_storage);
        assert_eq!(config.storage.signed_url_ttl_secs, 3600);
        assert_eq!(config.storage.session_ttl(), Duration::hours(24));
        assert_eq!(config.admin.username, "admin");
        assert!(config.admin.password.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn rejects_malformed_board_settings() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("JOBSY_LISTING_TTL_DAYS", "thirty");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber {
                key: "JOBSY_LISTING_TTL_DAYS"
            })
        ));

        reset_env();
        env::set_var("JOBSY_PRIVATE_CV_STORAGE", "maybe");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidFlag {
                key: "JOBSY_PRIVATE_CV_STORAGE"
            })
        ));
        reset_env();
    }

    #[test]
    fn durations_outside_their_bounds_are_rejected() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        for (key, value) in [
            ("JOBSY_LISTING_TTL_DAYS", "9223372036854775807"),
            ("JOBSY_LISTING_TTL_DAYS", "0"),
            ("JOBSY_SIGNED_URL_TTL_SECS", "9223372036854775807"),
            ("JOBSY_SIGNED_URL_TTL_SECS", "-5"),
            ("JOBSY_SESSION_TTL_SECS", "10"),
            ("JOBSY_PAGE_SIZE", "0"),
        ] {
            reset_env();
            env::set_var(key, value);
            match AppConfig::load() {
                Err(ConfigError::InvalidNumber { key: rejected }) => assert_eq!(rejected, key),
                other => panic!("{key}={value} gave {other:?}"),
            }
        }

        reset_env();
        env::set_var("JOBSY_LISTING_TTL_DAYS", "3650");
        env::set_var("JOBSY_SIGNED_URL_TTL_SECS", "604800");
        let config = AppConfig::load().expect("upper bounds are accepted");
        assert_eq!(config.board.listing_ttl(), Duration::days(3650));
        assert_eq!(config.storage.signed_url_ttl_secs, 604_800);
        reset_env();
    }

    #[test]
    fn admin_password_is_redacted_in_debug_output() {
        let admin = AdminBootstrap {
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password: Some("hunter2".to_string()),
        };
        let rendered = format!("{admin:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
