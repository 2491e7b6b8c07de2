//! Key sources (§4.8): places a key selector asks for candidate JWKs.
//!
//! All three flavors share one trait; only the remote source can actually
//! fail or block.

mod immutable;
mod remote;

pub use immutable::{ImmutableJwkSource, ImmutableSecretSource};
pub use remote::{RemoteJwkSource, RemoteJwkSourceBuilder, ReqwestResourceRetriever, ResourceRetriever};

use crate::error::JoseResult;
use crate::jwk::{Jwk, JwkMatcher};

/// Caller-supplied, opaque context threaded from the processor down to the
/// key source. The built-in sources and selectors ignore it; it exists so a
/// caller's own `KeySource`/`KeySelector` can carry request-scoped data
/// (a tenant hint, a request ID) without changing every signature in the
/// pipeline.
#[derive(Clone, Debug, Default)]
pub struct SecurityContext {
    pub note: Option<String>,
}

/// Produces candidate JWKs for a matcher. `Ok(None)` means "could not be
/// determined right now" (only the remote source ever returns this, on fetch
/// failure); `Ok(Some(candidates))` may legitimately be empty.
pub trait KeySource: Send + Sync {
    fn get(&self, matcher: &JwkMatcher, context: &SecurityContext) -> JoseResult<Option<Vec<Jwk>>>;
}
