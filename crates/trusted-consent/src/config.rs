//! Configuration for the consent server.

use std::path::PathBuf;
use std::time::Duration;

/// Server and provider defaults.
pub mod defaults {
    /// Wildcard bind address (all IPv4 and IPv6 interfaces).
    pub const HOST: &str = "::0";

    /// Listening port.
    pub const PORT: u16 = 3000;

    /// Admin endpoint of a locally running Hydra.
    pub const ADMIN_URL: &str = "http://127.0.0.1:4445";

    /// Directory served as static assets.
    pub const STATIC_DIR: &str = "public";

    /// Maximum accepted request body (matches the usual 100kb body parser limit).
    pub const MAX_BODY_BYTES: usize = 100 * 1024;
}

/// How boolean switches are read from the environment and the command line.
pub mod flags {
    use std::convert::Infallible;

    /// Values read as "off" by [`on_unless_falsey`].
    const FALSEY: [&str; 7] = ["", "0", "n", "no", "f", "false", "off"];

    /// `MOCK_TLS_TERMINATION`: on for any non-empty value.
    #[must_use]
    pub fn on_if_present(value: &str) -> bool {
        !value.is_empty()
    }

    /// `SECURE_COOKIES`: on unless empty or a falsey word.
    #[must_use]
    pub fn on_unless_falsey(value: &str) -> bool {
        !FALSEY.iter().any(|f| f.eq_ignore_ascii_case(value.trim()))
    }

    /// clap value parser for [`on_if_present`].
    pub fn parse_on_if_present(value: &str) -> Result<bool, Infallible> {
        Ok(on_if_present(value))
    }

    /// clap value parser for [`on_unless_falsey`].
    pub fn parse_on_unless_falsey(value: &str) -> Result<bool, Infallible> {
        Ok(on_unless_falsey(value))
    }
}

/// How much internal detail error pages may reveal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Environment {
    /// Error pages include the structured error detail.
    Development,
    /// Error pages only carry the message.
    #[default]
    Production,
}

impl Environment {
    /// Returns true in development mode.
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Connection settings for the provider's admin API.
#[derive(Clone)]
pub struct AdminConfig {
    /// Base URL of the admin API, without the `/admin` prefix.
    pub admin_url: String,

    /// Bearer token for the admin API (optional).
    pub api_key: Option<String>,

    /// Send `X-Forwarded-Proto: https` on every admin call.
    pub mock_tls_termination: bool,

    /// Request timeout. `None` keeps the HTTP client default.
    pub request_timeout: Option<Duration>,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("admin_url", &self.admin_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("mock_tls_termination", &self.mock_tls_termination)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// CSRF cookie settings.
#[derive(Debug, Clone)]
pub struct CsrfConfig {
    /// Name of the secret cookie.
    pub cookie_name: String,

    /// Mark the cookie `Secure`.
    pub secure: bool,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self { cookie_name: "_csrf".to_string(), secure: false }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host or address to bind.
    pub host: String,

    /// Port to bind.
    pub port: u16,

    /// Development or production error reporting.
    pub environment: Environment,

    /// Directory of static assets.
    pub static_dir: PathBuf,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Provider admin API.
    pub admin: AdminConfig,

    /// CSRF cookie.
    pub csrf: CsrfConfig,
}

impl Config {
    /// Create a configuration pointing at the given admin API.
    #[must_use]
    pub fn new(admin_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            host: defaults::HOST.to_string(),
            port: defaults::PORT,
            environment: Environment::default(),
            static_dir: PathBuf::from(defaults::STATIC_DIR),
            max_body_bytes: defaults::MAX_BODY_BYTES,
            admin: AdminConfig {
                admin_url: admin_url.into(),
                api_key,
                mock_tls_termination: false,
                request_timeout: None,
            },
            csrf: CsrfConfig::default(),
        }
    }

    /// Create a test configuration for a mock admin server.
    #[must_use]
    pub fn for_testing(admin_url: &str) -> Self {
        let mut config = Self::new(admin_url, None);
        config.host = "127.0.0.1".to_string();
        config.port = 0;
        config.environment = Environment::Development;
        config.static_dir = PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/public"));
        config.admin.request_timeout = Some(Duration::from_secs(5));
        config
    }

    /// Create configuration from environment variables.
    ///
    /// Reads the same variables as the command line, with the same rules.
    ///
    /// # Errors
    ///
    /// Returns error if environment variables are invalid.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create configuration from any variable source.
    ///
    /// # Errors
    ///
    /// Returns error if `PORT` or `APP_ENV` cannot be parsed.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let set = |name: &str| var(name).filter(|v| !v.is_empty());

        let admin_url = set("HYDRA_ADMIN_URL").unwrap_or_else(|| defaults::ADMIN_URL.to_string());
        let api_key = set("ORY_API_KEY").or_else(|| set("ORY_PAT"));

        let mut config = Self::new(admin_url, api_key);

        if let Some(host) = set("HOST") {
            config.host = host;
        }
        if let Some(port) = set("PORT") {
            config.port = port.parse().map_err(|e| anyhow::anyhow!("invalid PORT '{port}': {e}"))?;
        }
        if let Some(env) = set("APP_ENV") {
            config.environment = env.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        }
        if let Some(dir) = set("STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        config.admin.mock_tls_termination =
            var("MOCK_TLS_TERMINATION").is_some_and(|v| flags::on_if_present(&v));
        config.csrf.secure = var("SECURE_COOKIES").is_some_and(|v| flags::on_unless_falsey(&v));

        Ok(config)
    }

    /// Check if an admin API key is configured.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.admin.api_key.is_some()
    }

    /// Address string used for binding and the startup log line.
    #[must_use]
    pub fn listen_address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(defaults::ADMIN_URL, None)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "::0");
        assert_eq!(config.environment, Environment::Production);
        assert!(!config.has_api_key());
        assert_eq!(config.csrf.cookie_name, "_csrf");
    }

    #[test]
    fn test_listen_address_brackets_ipv6() {
        let mut config = Config::default();
        assert_eq!(config.listen_address(), "[::0]:3000");

        config.host = "localhost".to_string();
        config.port = 8080;
        assert_eq!(config.listen_address(), "localhost:8080");
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("development".parse::<Environment>(), Ok(Environment::Development));
        assert_eq!("PROD".parse::<Environment>(), Ok(Environment::Production));
        assert!("staging".parse::<Environment>().is_err());
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_reads_variables() {
        let config = Config::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("HYDRA_ADMIN_URL", "http://hydra:4445"),
            ("ORY_PAT", "pat-token"),
            ("APP_ENV", "development"),
            ("STATIC_DIR", "/srv/public"),
        ]))
        .unwrap();

        assert_eq!(config.listen_address(), "127.0.0.1:8080");
        assert_eq!(config.admin.admin_url, "http://hydra:4445");
        assert_eq!(config.admin.api_key.as_deref(), Some("pat-token"));
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.static_dir, PathBuf::from("/srv/public"));
    }

    #[test]
    fn test_from_lookup_defaults_when_empty() {
        let config = Config::from_lookup(lookup(&[("HOST", ""), ("ORY_API_KEY", "")])).unwrap();

        assert_eq!(config.host, "::0");
        assert_eq!(config.port, 3000);
        assert!(!config.has_api_key());
        assert!(!config.admin.mock_tls_termination);
        assert!(!config.csrf.secure);
    }

    #[test]
    fn test_api_key_preferred_over_pat() {
        let config =
            Config::from_lookup(lookup(&[("ORY_API_KEY", "api-key"), ("ORY_PAT", "pat")])).unwrap();
        assert_eq!(config.admin.api_key.as_deref(), Some("api-key"));
    }

    #[test]
    fn test_mock_tls_termination_any_value_enables() {
        for value in ["1", "true", "false", "yes"] {
            let config = Config::from_lookup(lookup(&[("MOCK_TLS_TERMINATION", value)])).unwrap();
            assert!(config.admin.mock_tls_termination, "value {value:?}");
        }

        let config = Config::from_lookup(lookup(&[("MOCK_TLS_TERMINATION", "")])).unwrap();
        assert!(!config.admin.mock_tls_termination);
    }

    #[test]
    fn test_secure_cookies_falsey_words() {
        for (value, expected) in
            [("yes", true), ("1", true), ("TRUE", true), ("no", false), ("Off", false), ("0", false)]
        {
            let config = Config::from_lookup(lookup(&[("SECURE_COOKIES", value)])).unwrap();
            assert_eq!(config.csrf.secure, expected, "value {value:?}");
        }
    }

    #[test]
    fn test_invalid_port_and_environment_rejected() {
        assert!(Config::from_lookup(lookup(&[("PORT", "http")])).is_err());
        assert!(Config::from_lookup(lookup(&[("APP_ENV", "staging")])).is_err());
    }

    #[test]
    fn test_admin_debug_hides_api_key() {
        let config = Config::new("http://hydra:4445", Some("ory_pat_secret".to_string()));
        let debug = format!("{:?}", config.admin);
        assert!(!debug.contains("ory_pat_secret"));
        assert!(debug.contains("has_api_key"));
    }
}
