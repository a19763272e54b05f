//! Session collaborator contract consumed by `CreateRedirectForSession`.
//!
//! The library depends only on this trait, never on a concrete session
//! store: persistent session storage is an external collaborator (§1, §6).

use crate::pkce::PkceParams;
use crate::types::{ProviderRef, Scopes};

/// What a host session must expose so this crate can build an authorization
/// redirect for it. `id()` doubles as the `state` parameter, tying the
/// redirect back to whatever session storage the host already has.
pub trait Session {
    fn id(&self) -> &str;
    fn provider(&self) -> ProviderRef;
    fn scopes(&self) -> Option<Scopes>;
    fn nonce(&self) -> Option<&str>;
    fn pkce(&self) -> Option<&PkceParams>;
}
