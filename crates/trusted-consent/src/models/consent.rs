//! Consent flow models.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of one in-progress consent transaction.
///
/// Always non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentChallenge(String);

impl ConsentChallenge {
    /// Wrap a raw query value. Missing and empty values yield `None`.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.filter(|s| !s.is_empty()).map(|s| Self(s.to_owned()))
    }

    /// The challenge as sent by the provider.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsentChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client that initiated the authorization request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuth2Client {
    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_name: Option<String>,
}

/// Consent request as returned by the admin API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsentRequest {
    /// Challenge the request was looked up with.
    #[serde(default)]
    pub challenge: String,

    /// Scopes the client asked for.
    #[serde(default)]
    pub requested_scope: Vec<String>,

    /// Audiences the client asked for.
    #[serde(default)]
    pub requested_access_token_audience: Vec<String>,

    /// The provider already holds a remembered consent for this subject and client.
    #[serde(default)]
    pub skip: bool,

    /// End-user the consent is for.
    #[serde(default)]
    pub subject: Option<String>,

    #[serde(default)]
    pub client: Option<OAuth2Client>,

    /// Original authorization URL.
    #[serde(default)]
    pub request_url: Option<String>,
}

/// Extra claims attached to issued tokens.
///
/// Never populated by this server; kept so the accept body matches the
/// provider's schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsentSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<serde_json::Value>,
}

/// Body of the accept-consent call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptConsentRequest {
    pub grant_scope: Vec<String>,

    pub grant_access_token_audience: Vec<String>,

    /// Persist the decision so later flows can skip consent.
    pub remember: bool,

    /// Lifetime of the remembered decision in seconds.
    pub remember_for: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<ConsentSession>,
}

/// Where the user agent continues after the provider handled the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectTo {
    pub redirect_to: String,
}

/// Error body returned by the admin API on non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderError {
    #[serde(default)]
    pub error: Option<String>,

    #[serde(default)]
    pub error_description: Option<String>,

    #[serde(default)]
    pub status_code: Option<u16>,
}
