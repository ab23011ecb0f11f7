//! Auto-acceptance of consent requests for trusted first-party clients.
//!
//! Both the identity provider and the relying application are operated by the
//! same party, so no consent screen is shown: every requested scope and
//! audience is granted and the decision is remembered for an hour.

use async_trait::async_trait;

use crate::error::ClientResult;
use crate::models::{AcceptConsentRequest, ConsentChallenge, ConsentRequest, RedirectTo};

/// Lifetime of a remembered consent decision, in seconds.
pub const REMEMBER_FOR_SECS: i64 = 3600;

/// The two admin calls the consent flow needs.
#[async_trait]
pub trait ConsentAdmin: Send + Sync {
    /// Fetch the consent request identified by `challenge`.
    async fn get_consent_request(
        &self,
        challenge: &ConsentChallenge,
    ) -> ClientResult<ConsentRequest>;

    /// Accept the consent request and return where to send the user agent.
    async fn accept_consent_request(
        &self,
        challenge: &ConsentChallenge,
        body: &AcceptConsentRequest,
    ) -> ClientResult<RedirectTo>;
}

/// Acceptance parameters for a fetched request.
///
/// Scope and audience pass through unfiltered; no session claims are attached.
#[must_use]
pub fn acceptance_for(request: &ConsentRequest) -> AcceptConsentRequest {
    AcceptConsentRequest {
        grant_scope: request.requested_scope.clone(),
        grant_access_token_audience: request.requested_access_token_audience.clone(),
        remember: true,
        remember_for: REMEMBER_FOR_SECS,
        session: None,
    }
}

/// Fetch the consent request, accept it, and return the redirect target.
///
/// The first failing call ends the flow; nothing is retried.
pub async fn accept_trusted_consent(
    admin: &dyn ConsentAdmin,
    challenge: &ConsentChallenge,
) -> ClientResult<RedirectTo> {
    let request = admin.get_consent_request(challenge).await?;

    tracing::debug!(
        challenge = %challenge,
        subject = request.subject.as_deref().unwrap_or_default(),
        client_id = request.client.as_ref().and_then(|c| c.client_id.as_deref()).unwrap_or_default(),
        skip = request.skip,
        scopes = ?request.requested_scope,
        "Accepting consent for trusted client"
    );

    let body = acceptance_for(&request);
    admin.accept_consent_request(challenge, &body).await
}
