//! Admin API client for the OAuth2/OIDC provider.
//!
//! Thin async HTTP client over reqwest:
//! - Optional bearer token and `X-Forwarded-Proto` default headers
//! - One round trip per call, no retries and no caching
//! - Non-2xx answers are decoded into [`ClientError::Api`]

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use url::Url;

use crate::config::AdminConfig;
use crate::consent::ConsentAdmin;
use crate::error::{ClientError, ClientResult};
use crate::models::{
    AcceptConsentRequest, ConsentChallenge, ConsentRequest, ProviderError, RedirectTo,
};

/// Path of the consent request resource.
const CONSENT_PATH: &str = "admin/oauth2/auth/requests/consent";

/// Path of the accept-consent action.
const ACCEPT_CONSENT_PATH: &str = "admin/oauth2/auth/requests/consent/accept";

/// Client for the provider's admin API.
#[derive(Clone)]
pub struct HydraAdminClient {
    /// HTTP client with default headers.
    client: Client,

    /// Admin API base URL, always ending in `/`.
    base_url: Url,

    /// Whether a bearer token is sent.
    has_api_key: bool,
}

impl HydraAdminClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the admin URL or API key is invalid, or if HTTP client
    /// initialization fails.
    pub fn new(config: &AdminConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(ref key) = config.api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        if config.mock_tls_termination {
            headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        }

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let mut base_url = Url::parse(&config.admin_url).map_err(ClientError::from)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url, has_api_key: config.api_key.is_some() })
    }

    /// Check if a bearer token is configured.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.has_api_key
    }

    /// Admin API base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch a pending consent request.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, non-2xx status or malformed body.
    pub async fn get_consent_request(
        &self,
        challenge: &ConsentChallenge,
    ) -> ClientResult<ConsentRequest> {
        let url = self.endpoint(CONSENT_PATH, challenge)?;
        self.send(Method::GET, url, None).await
    }

    /// Accept a pending consent request.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, non-2xx status or malformed body.
    pub async fn accept_consent_request(
        &self,
        challenge: &ConsentChallenge,
        body: &AcceptConsentRequest,
    ) -> ClientResult<RedirectTo> {
        let url = self.endpoint(ACCEPT_CONSENT_PATH, challenge)?;
        let body = serde_json::to_vec(body)?;
        self.send(Method::PUT, url, Some(body)).await
    }

    /// Build `{base}/{path}?consent_challenge={challenge}`.
    fn endpoint(&self, path: &str, challenge: &ConsentChallenge) -> ClientResult<Url> {
        let mut url = self.base_url.join(path)?;
        url.query_pairs_mut().append_pair("consent_challenge", challenge.as_str());
        Ok(url)
    }

    /// Send a request and decode the JSON answer.
    async fn send<T>(&self, method: Method, url: Url, body: Option<Vec<u8>>) -> ClientResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        tracing::debug!(%method, %url, "Calling admin API");

        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.header(header::CONTENT_TYPE, "application/json").body(body);
        }

        let response = request.send().await?;
        let response = Self::handle_response(response).await?;
        let bytes = response.bytes().await?;

        serde_json::from_slice(&bytes).map_err(ClientError::from)
    }

    /// Map non-success statuses to [`ClientError::Api`].
    async fn handle_response(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ProviderError>(&text).ok();

        Err(match parsed {
            Some(ProviderError { error: Some(error), error_description, .. }) => {
                ClientError::api(status.as_u16(), error, error_description)
            }
            _ => {
                let error = if text.is_empty() {
                    status.canonical_reason().unwrap_or("unknown error").to_string()
                } else {
                    text
                };
                ClientError::api(status.as_u16(), error, None)
            }
        })
    }
}

#[async_trait]
impl ConsentAdmin for HydraAdminClient {
    async fn get_consent_request(
        &self,
        challenge: &ConsentChallenge,
    ) -> ClientResult<ConsentRequest> {
        Self::get_consent_request(self, challenge).await
    }

    async fn accept_consent_request(
        &self,
        challenge: &ConsentChallenge,
        body: &AcceptConsentRequest,
    ) -> ClientResult<RedirectTo> {
        Self::accept_consent_request(self, challenge, body).await
    }
}

impl std::fmt::Debug for HydraAdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HydraAdminClient")
            .field("base_url", &self.base_url.as_str())
            .field("has_api_key", &self.has_api_key)
            .finish()
    }
}
