/// Configuration management for the API server
///
/// Configuration comes from environment variables, with a `.env` file loaded
/// first when present.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Session signing secret. Optional at startup; without it
///   login and every gated route fail
/// - `MAIL_ENDPOINT`: Mail relay URL. Unset means mail is only logged
/// - `MAIL_API_KEY`: Bearer key for the mail relay
/// - `MAIL_FROM`: Sender address (default: no-reply@folio.local)
/// - `NOTIFY_MAX_ATTEMPTS`: Delivery attempts per notification (default: 3)
/// - `NOTIFY_RETRY_DELAY_MS`: Pause between attempts (default: 2000)
/// - `NOTIFY_MAX_IN_FLIGHT`: Concurrent deliveries (default: 32)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use folio_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use folio_shared::notify::{
    RetryPolicy, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_IN_FLIGHT, DEFAULT_RETRY_DELAY,
};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub notify: NotifyConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Session signing secret
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: Option<String>,
}

/// Outbound mail configuration
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub from: String,
}

/// Notification dispatch configuration
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub max_in_flight: usize,
}

impl NotifyConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.retry_delay)
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// Reads `key` and parses it, falling back to `default` when unset or blank
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", key, value)),
        None => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a numeric variable
    /// does not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let database_url = non_empty("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let retry_delay_ms = parse_or(
            &lookup,
            "NOTIFY_RETRY_DELAY_MS",
            DEFAULT_RETRY_DELAY.as_millis() as u64,
        )?;

        Ok(Self {
            api: ApiConfig {
                host: non_empty("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "API_PORT", 8080)?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            },
            jwt: JwtConfig {
                secret: non_empty("JWT_SECRET"),
            },
            mail: MailConfig {
                endpoint: non_empty("MAIL_ENDPOINT"),
                api_key: non_empty("MAIL_API_KEY"),
                from: non_empty("MAIL_FROM").unwrap_or_else(|| "no-reply@folio.local".to_string()),
            },
            notify: NotifyConfig {
                max_attempts: parse_or(&lookup, "NOTIFY_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
                retry_delay: Duration::from_millis(retry_delay_ms),
                max_in_flight: parse_or(&lookup, "NOTIFY_MAX_IN_FLIGHT", DEFAULT_MAX_IN_FLIGHT)?,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[(
            "DATABASE_URL",
            "postgresql://localhost/folio",
        )]))
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.database.max_connections, 10);
        assert!(config.jwt.secret.is_none());
        assert!(config.mail.endpoint.is_none());
        assert_eq!(config.notify.max_attempts, 3);
        assert_eq!(config.notify.retry_delay, Duration::from_millis(2000));
        assert_eq!(config.notify.max_in_flight, 32);
    }

    #[test]
    fn test_database_url_required() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("DATABASE_URL", "")])).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/folio"),
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "3000"),
            ("JWT_SECRET", "test-secret-key-at-least-32-bytes-long"),
            ("MAIL_ENDPOINT", "https://mail.example.com/send"),
            ("NOTIFY_MAX_ATTEMPTS", "5"),
            ("NOTIFY_RETRY_DELAY_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert!(config.jwt.secret.is_some());
        assert_eq!(config.mail.endpoint.as_deref(), Some("https://mail.example.com/send"));

        let policy = config.notify.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/folio"),
            ("API_PORT", "not-a-port"),
        ]));

        let message = result.unwrap_err().to_string();
        assert!(message.contains("API_PORT"));
    }
}
