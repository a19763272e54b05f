//! PKCE (RFC 7636) verifier/challenge pair.
//!
//! The verifier is produced by the host; this crate only transports it, but
//! offers `PkceChallenge::from_verifier` so a host that doesn't want to touch
//! SHA-256/base64url itself can hand us a verifier and get a challenge back.

use base64::Engine;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkceMethod {
    S256,
    Plain,
}

impl PkceMethod {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            PkceMethod::S256 => "S256",
            PkceMethod::Plain => "plain",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    pub fn new(verifier: impl Into<String>) -> Self {
        Self(verifier.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct PkceChallenge(String);

impl PkceChallenge {
    pub fn new(challenge: impl Into<String>) -> Self {
        Self(challenge.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the `S256` challenge from a host-supplied verifier:
    /// `base64url(sha256(verifier))`, no padding.
    pub fn from_verifier(verifier: &PkceVerifier) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_str().as_bytes());
        let digest = hasher.finalize();
        Self(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest))
    }
}

/// The PKCE parameters attached to a redirect and later to a code exchange.
#[derive(Debug, Clone)]
pub struct PkceParams {
    pub verifier: PkceVerifier,
    pub challenge: PkceChallenge,
    pub method: PkceMethod,
}

impl PkceParams {
    /// Build from a host-supplied verifier, deriving an `S256` challenge.
    pub fn from_verifier_s256(verifier: PkceVerifier) -> Self {
        let challenge = PkceChallenge::from_verifier(&verifier);
        Self {
            verifier,
            challenge,
            method: PkceMethod::S256,
        }
    }

    /// Build from an already-computed verifier/challenge pair (e.g. `plain`,
    /// where challenge == verifier, or a challenge computed by the host).
    pub fn new(verifier: PkceVerifier, challenge: PkceChallenge, method: PkceMethod) -> Self {
        Self {
            verifier,
            challenge,
            method,
        }
    }
}
