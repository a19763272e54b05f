//! Shared value types: provider identity, scopes, and the token/user-info shapes
//! that flow between the token client, validator, and userinfo client.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque, binary, unique identifier for a registered provider.
///
/// Wraps a `Uuid` rather than exposing one directly so callers can't rely on
/// UUID-specific structure (version, variant) — only on equality and the
/// ability to round-trip through `Display`/`FromStr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderId(Uuid);

impl ProviderId {
    /// Generate a fresh opaque id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProviderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProviderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Requested scopes, accepted either as a list (space-joined on the wire) or
/// as a single pre-joined string (used verbatim). Both affordances from the
/// original source are preserved rather than forcing callers to always split
/// or always join.
#[derive(Debug, Clone)]
pub enum Scopes {
    List(Vec<String>),
    Joined(String),
}

impl Scopes {
    pub fn is_empty(&self) -> bool {
        match self {
            Scopes::List(v) => v.is_empty(),
            Scopes::Joined(s) => s.trim().is_empty(),
        }
    }

    /// Render as the single space-joined string the wire format expects.
    pub fn to_wire_string(&self) -> String {
        match self {
            Scopes::List(v) => v.join(" "),
            Scopes::Joined(s) => s.clone(),
        }
    }
}

impl From<Vec<String>> for Scopes {
    fn from(v: Vec<String>) -> Self {
        Scopes::List(v)
    }
}

impl From<&[&str]> for Scopes {
    fn from(v: &[&str]) -> Self {
        Scopes::List(v.iter().map(|s| s.to_string()).collect())
    }
}

impl From<String> for Scopes {
    fn from(s: String) -> Self {
        Scopes::Joined(s)
    }
}

impl From<&str> for Scopes {
    fn from(s: &str) -> Self {
        Scopes::Joined(s.to_string())
    }
}

/// Token-endpoint authentication methods this crate knows how to negotiate,
/// per §4.4's fixed preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    ClientSecretBasic,
    ClientSecretPost,
    None,
}

impl AuthMethod {
    /// Select a method from a provider's `token_endpoint_auth_methods_supported`
    /// list. Strict preference: basic > post > none; unrecognized or empty
    /// lists default to basic. Idempotent: re-selecting from a singleton list
    /// containing only the chosen method returns the same method.
    pub fn select(supported: &[String]) -> Self {
        if supported.iter().any(|m| m == "client_secret_basic") {
            AuthMethod::ClientSecretBasic
        } else if supported.iter().any(|m| m == "client_secret_post") {
            AuthMethod::ClientSecretPost
        } else if supported.iter().any(|m| m == "none") {
            AuthMethod::None
        } else {
            AuthMethod::ClientSecretBasic
        }
    }
}

/// The decoded ID token: the raw compact JWS alongside its (not yet
/// signature-verified at extraction time) claims and header.
#[derive(Debug, Clone)]
pub struct IdToken {
    pub token: String,
    pub claims: serde_json::Map<String, serde_json::Value>,
    pub header: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub token: String,
}

/// Normalized token bundle produced by `Validator::extract_token_map` and
/// consumed by `Validator::validate`, `UserInfoClient`, and the host.
#[derive(Debug, Clone, Default)]
pub struct TokenBundle {
    pub id: Option<IdToken>,
    pub access: Option<AccessToken>,
    pub refresh: Option<RefreshToken>,
    pub scope: Option<String>,
    pub token_type: Option<String>,
}

/// Polymorphic input accepted by `UserInfo`/`Introspect`/`Revoke`: a bare
/// access/refresh token string, or a full bundle to pull the access token
/// (and, for userinfo, the expected subject) out of. Normalized once at the
/// boundary via `access_token`/`expected_subject` rather than leaking variant
/// handling into each client.
#[derive(Debug, Clone)]
pub enum TokenSource {
    Bare(String),
    Bundle(TokenBundle),
}

impl TokenSource {
    pub fn access_token(&self) -> Option<&str> {
        match self {
            TokenSource::Bare(s) => Some(s.as_str()),
            TokenSource::Bundle(b) => b.access.as_ref().map(|a| a.token.as_str()),
        }
    }

    /// `sub` claim of the bundle's ID token, if any — used by `UserInfo` to
    /// default `expected_subject` when the caller passed a bundle.
    pub fn expected_subject(&self) -> Option<String> {
        match self {
            TokenSource::Bare(_) => None,
            TokenSource::Bundle(b) => b
                .id
                .as_ref()
                .and_then(|id| id.claims.get("sub"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        }
    }
}

impl From<&str> for TokenSource {
    fn from(s: &str) -> Self {
        TokenSource::Bare(s.to_string())
    }
}

impl From<String> for TokenSource {
    fn from(s: String) -> Self {
        TokenSource::Bare(s)
    }
}

impl From<TokenBundle> for TokenSource {
    fn from(b: TokenBundle) -> Self {
        TokenSource::Bundle(b)
    }
}

/// Callers identify a provider either by its opaque id or by an
/// already-fetched info snapshot (e.g. one they cached from a prior
/// `GetProviderInfo` call). `ProviderRegistry::resolve` is the single place
/// that turns either variant into a live `Arc<Provider>`.
#[derive(Debug, Clone)]
pub enum ProviderRef {
    Id(ProviderId),
    Info(Box<crate::provider::ProviderInfo>),
}

impl From<ProviderId> for ProviderRef {
    fn from(id: ProviderId) -> Self {
        ProviderRef::Id(id)
    }
}

impl From<crate::provider::ProviderInfo> for ProviderRef {
    fn from(info: crate::provider::ProviderInfo) -> Self {
        ProviderRef::Info(Box::new(info))
    }
}

/// A JSON object response, keyed by plain strings (no closed symbol
/// vocabulary — every lookup site uses a string literal anyway).
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// RFC 7662 introspection response: `active` is the only guaranteed field.
#[derive(Debug, Clone)]
pub struct IntrospectionResponse {
    pub active: bool,
    pub claims: JsonMap,
}

/// Optional nonce-check policy passed to `Validator::validate`.
#[derive(Debug, Clone)]
pub enum ExpectedNonce {
    /// Require `claims.nonce == value`.
    Exact(String),
    /// Require `claims.nonce` to be present, any value.
    Any,
    /// Do not check `nonce` at all.
    Unchecked,
}

/// Host policy for the optional `acr`/`auth_time` checks in §4.5 rule 8.
#[derive(Debug, Clone, Default)]
pub struct AuthPolicy {
    pub required_acr: Option<Vec<String>>,
    pub max_auth_age: Option<chrono::Duration>,
}
