//! Trusted Consent
//!
//! A consent app for an OAuth2/OIDC provider (Ory Hydra) that accepts every
//! consent request on behalf of a trusted first-party client. All
//! authorization-server logic stays with the provider; this server only talks
//! to its admin API.
//!
//! # Flow
//!
//! `GET /consent?consent_challenge=…` fetches the consent request, accepts it
//! with the requested scope and audience (`remember = true`,
//! `remember_for = 3600`), and answers `302 Found` with the provider's
//! `redirect_to`.
//!
//! # Example
//!
//! ```no_run
//! use trusted_consent::{config::Config, server::ConsentServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     ConsentServer::new(config)?.run().await
//! }
//! ```

pub mod client;
pub mod config;
pub mod consent;
pub mod error;
pub mod models;
pub mod server;

pub use client::HydraAdminClient;
pub use config::Config;
pub use consent::ConsentAdmin;
pub use error::{AppError, ClientError};
