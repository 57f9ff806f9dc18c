//! Configuration loading and validation

use academy_api::AuthOptions;
use academy_auth::TrustPolicy;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Signing secret shipped in the defaults; refused in production
pub const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "./data/academy.db".to_string()
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_session_cookie_name")]
    pub session_cookie_name: String,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    #[serde(default = "default_verification_ttl_hours")]
    pub verification_ttl_hours: i64,
    #[serde(default = "default_reset_ttl_hours")]
    pub reset_ttl_hours: i64,
    /// `either` or `consistent`
    #[serde(default = "default_trust_policy")]
    pub trust_policy: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_hours: default_token_ttl_hours(),
            cookie_name: default_cookie_name(),
            session_cookie_name: default_session_cookie_name(),
            session_ttl_hours: default_session_ttl_hours(),
            verification_ttl_hours: default_verification_ttl_hours(),
            reset_ttl_hours: default_reset_ttl_hours(),
            trust_policy: default_trust_policy(),
        }
    }
}

fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}

fn default_token_ttl_hours() -> i64 {
    168
}

fn default_cookie_name() -> String {
    "token".to_string()
}

fn default_session_cookie_name() -> String {
    "academy.session-token".to_string()
}

fn default_session_ttl_hours() -> i64 {
    720
}

fn default_verification_ttl_hours() -> i64 {
    24
}

fn default_reset_ttl_hours() -> i64 {
    1
}

fn default_trust_policy() -> String {
    "either".to_string()
}

/// Administrator created on first start when the user table is empty
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub admin_email: Option<String>,
    #[serde(default)]
    pub admin_password: Option<String>,
    #[serde(default)]
    pub admin_first_name: Option<String>,
    #[serde(default)]
    pub admin_last_name: Option<String>,
}

impl BootstrapConfig {
    /// Email and password, when both are set
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        match (self.admin_email.as_deref(), self.admin_password.as_deref()) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Some((email, password))
            }
            _ => None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `json` or anything else for human-readable output
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Prometheus exporter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults when it
    /// does not exist
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            warn!("Config file {} not found, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        info!("Loaded configuration from {}", path);
        Ok(config)
    }

    /// Reject configurations the server must not start with
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            bail!("auth.jwt_secret must not be empty");
        }
        if self.environment.is_production() && self.auth.jwt_secret == DEFAULT_JWT_SECRET {
            bail!("auth.jwt_secret must be changed before running in production");
        }

        let ttls = [
            ("auth.token_ttl_hours", self.auth.token_ttl_hours),
            ("auth.session_ttl_hours", self.auth.session_ttl_hours),
            ("auth.verification_ttl_hours", self.auth.verification_ttl_hours),
            ("auth.reset_ttl_hours", self.auth.reset_ttl_hours),
        ];
        for (name, hours) in ttls {
            if hours <= 0 {
                bail!("{} must be positive, got {}", name, hours);
            }
        }

        if self.auth.cookie_name.trim().is_empty() || self.auth.session_cookie_name.trim().is_empty()
        {
            bail!("cookie names must not be empty");
        }
        if self.auth.cookie_name == self.auth.session_cookie_name {
            bail!("auth.cookie_name and auth.session_cookie_name must differ");
        }

        self.trust_policy()?;
        Ok(())
    }

    pub fn trust_policy(&self) -> Result<TrustPolicy> {
        self.auth
            .trust_policy
            .parse::<TrustPolicy>()
            .map_err(|e| anyhow::anyhow!("auth.trust_policy: {}", e))
    }

    /// Cookie and session options for the API layer
    pub fn auth_options(&self) -> Result<AuthOptions> {
        Ok(AuthOptions {
            cookie_name: self.auth.cookie_name.clone(),
            session_cookie_name: self.auth.session_cookie_name.clone(),
            session_ttl_hours: self.auth.session_ttl_hours,
            verification_ttl_hours: self.auth.verification_ttl_hours,
            reset_ttl_hours: self.auth.reset_ttl_hours,
            secure_cookies: self.environment.is_production(),
            trust_policy: self.trust_policy()?,
        })
    }

    /// sqlx connection string for the configured database file
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.database.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = Config::load(path.to_str().unwrap()).unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.cookie_name, "token");
        assert_eq!(config.auth.session_cookie_name, "academy.session-token");
        assert_eq!(config.auth.token_ttl_hours, 168);
        assert_eq!(config.environment, Environment::Development);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
environment = "production"

[server]
port = 8080

[auth]
jwt_secret = "a-real-secret"
trust_policy = "consistent"

[bootstrap]
admin_email = "admin@academy.local"
admin_password = "bootstrap-pass"
"#,
        );
        let config = Config::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.auth.reset_ttl_hours, 1);
        assert_eq!(
            config.bootstrap.admin_credentials(),
            Some(("admin@academy.local", "bootstrap-pass"))
        );

        config.validate().unwrap();
        let options = config.auth_options().unwrap();
        assert!(options.secure_cookies);
        assert_eq!(options.trust_policy, TrustPolicy::Consistent);
    }

    #[test]
    fn test_production_rejects_default_secret() {
        let file = write_config("environment = \"production\"\n");
        let config = Config::load(file.path().to_str().unwrap()).unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("jwt_secret"));
    }

    #[test]
    fn test_non_positive_ttl_is_rejected() {
        let mut config = Config::default();
        config.auth.session_ttl_hours = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("auth.session_ttl_hours"));
    }

    #[test]
    fn test_unknown_trust_policy_is_rejected() {
        let mut config = Config::default();
        config.auth.trust_policy = "whichever".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let file = write_config("[server\nport = ");
        assert!(Config::load(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_development_cookies_are_not_secure() {
        let options = Config::default().auth_options().unwrap();
        assert!(!options.secure_cookies);
        assert_eq!(options.trust_policy, TrustPolicy::Either);
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!(" development ".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_incomplete_bootstrap_is_ignored() {
        let bootstrap = BootstrapConfig {
            admin_email: Some("admin@academy.local".to_string()),
            ..Default::default()
        };
        assert!(bootstrap.admin_credentials().is_none());
    }
}
