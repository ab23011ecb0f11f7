//! Trusted Consent - Entry Point

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use trusted_consent::{
    config::{Config, Environment, defaults, flags},
    server::ConsentServer,
};

#[derive(Parser, Debug)]
#[command(name = "trusted-consent")]
#[command(about = "Auto-accepting consent app for trusted first-party OAuth2 clients")]
#[command(version)]
struct Cli {
    /// Host or address to bind
    #[arg(long, default_value = defaults::HOST, env = "HOST")]
    host: String,

    /// Port to bind
    #[arg(long, default_value_t = defaults::PORT, env = "PORT")]
    port: u16,

    /// Base URL of the provider's admin API
    #[arg(long, default_value = defaults::ADMIN_URL, env = "HYDRA_ADMIN_URL")]
    admin_url: String,

    /// Bearer token for the admin API
    #[arg(long, env = "ORY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Send X-Forwarded-Proto: https to the admin API
    #[arg(long, env = "MOCK_TLS_TERMINATION", value_parser = flags::parse_on_if_present)]
    mock_tls_termination: bool,

    /// Error page verbosity
    #[arg(long, value_enum, default_value_t = Environment::Production, env = "APP_ENV")]
    environment: Environment,

    /// Directory of static assets
    #[arg(long, default_value = defaults::STATIC_DIR, env = "STATIC_DIR")]
    static_dir: PathBuf,

    /// Mark the CSRF cookie Secure
    #[arg(long, env = "SECURE_COOKIES", value_parser = flags::parse_on_unless_falsey)]
    secure_cookies: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        let api_key = self.api_key.or_else(|| std::env::var("ORY_PAT").ok());

        let mut config = Config::new(self.admin_url, api_key);
        config.host = self.host;
        config.port = self.port;
        config.environment = self.environment;
        config.static_dir = self.static_dir;
        config.admin.mock_tls_termination = self.mock_tls_termination;
        config.csrf.secure = self.secure_cookies;
        config
    }
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting trusted consent server");

    let config = cli.into_config();
    tracing::info!(admin_url = %config.admin.admin_url, "Using provider admin API");

    ConsentServer::new(config)?.run().await
}
