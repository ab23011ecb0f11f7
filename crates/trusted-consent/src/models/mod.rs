//! Wire models for the provider's admin API.
//!
//! Field names follow the provider's snake_case JSON. Collections default to
//! empty so sparse responses still deserialize.

mod consent;

pub use consent::{
    AcceptConsentRequest, ConsentChallenge, ConsentRequest, ConsentSession, OAuth2Client,
    ProviderError, RedirectTo,
};
