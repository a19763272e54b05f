//! Error types for oidc-rp, one enum per failure domain.

use thiserror::Error;

/// Errors from provider registration, discovery, and JWKS bootstrap.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider id already in use")]
    IdAlreadyUsed,

    #[error("provider not found")]
    NotFound,

    #[error("provider is not ready")]
    NotReady,

    #[error("issuer already registered by another provider")]
    DuplicateIssuer,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("discovery document parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("discovery document missing required field: {0}")]
    MalformedDiscovery(String),
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Errors from the token endpoint client (exchange, refresh, introspect, revoke).
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("provider not found")]
    NotFound,

    #[error("provider is not ready")]
    NotReady,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("endpoint returned status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("response body could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("provider does not advertise this endpoint")]
    NotSupported,

    #[error("URL construction failed: {0}")]
    Url(#[from] url::ParseError),
}

pub type TokenResult<T> = std::result::Result<T, TokenError>;

/// Errors from ID token parsing and OIDC Core §3.1.3.7 validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("token is not a well-formed compact JWS")]
    Malformed,

    #[error("unexpected issuer")]
    BadIssuer,

    #[error("client_id is not in the audience")]
    BadAudience,

    #[error("signature verification failed")]
    BadSignature,

    #[error("no JWKS key matches the token's kid")]
    UnknownKey,

    #[error("signing algorithm is not supported by this provider")]
    BadAlgorithm,

    #[error("token has expired")]
    Expired,

    #[error("token's iat is too far in the future")]
    NotYetValid,

    #[error("nonce mismatch")]
    BadNonce,
}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Errors from the user-info client.
#[derive(Debug, Error)]
pub enum UserInfoError {
    #[error("provider not found")]
    NotFound,

    #[error("provider is not ready")]
    NotReady,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("endpoint returned status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("response body could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("userinfo sub did not match the expected subject")]
    BadSubject,
}

pub type UserInfoResult<T> = std::result::Result<T, UserInfoError>;

/// Errors from the provider registry's bookkeeping operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("provider id already in use")]
    IdAlreadyUsed,

    #[error("provider not found")]
    NotFound,
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
