//! Key selectors (§4.9): derive a JWK matcher from a header, consult a
//! `KeySource`, and hand back ordered candidates. Selectors never explain a
//! non-match; they only return candidates.

use std::sync::Arc;

use crate::alg::{EncryptionMethod, JweAlgorithm, JwsAlgorithm};
use crate::error::JoseResult;
use crate::header::Header;
use crate::jwk::{Jwk, JwkMatcher};
use crate::keysource::{KeySource, SecurityContext};

/// Produces verification-key candidates for a JWS header.
pub trait JwsKeySelector: Send + Sync {
    fn select(&self, header: &Header, context: &SecurityContext) -> JoseResult<Vec<Jwk>>;
}

/// Produces decryption-key candidates for a JWE header.
pub trait JweKeySelector: Send + Sync {
    fn select(&self, header: &Header, context: &SecurityContext) -> JoseResult<Vec<Jwk>>;
}

fn matcher_for(kid: Option<&str>, key_type: Option<crate::alg::KeyType>) -> JwkMatcher {
    JwkMatcher {
        kid: kid.map(str::to_string),
        key_type,
        algorithm: None,
        key_use: None,
    }
}

/// The built-in verification-key selector: constrains candidates to a
/// single expected JWS algorithm (or, with `with_any_of`, a small family),
/// and derives its matcher from the header's `kid`.
pub struct DefaultJwsKeySelector {
    source: Arc<dyn KeySource>,
    accepted: Vec<JwsAlgorithm>,
}

impl DefaultJwsKeySelector {
    pub fn new(source: Arc<dyn KeySource>, accepted: JwsAlgorithm) -> Self {
        DefaultJwsKeySelector { source, accepted: vec![accepted] }
    }

    pub fn with_any_of(source: Arc<dyn KeySource>, accepted: Vec<JwsAlgorithm>) -> Self {
        DefaultJwsKeySelector { source, accepted }
    }
}

impl JwsKeySelector for DefaultJwsKeySelector {
    fn select(&self, header: &Header, context: &SecurityContext) -> JoseResult<Vec<Jwk>> {
        let alg = match header.jws_algorithm() {
            Some(alg) if self.accepted.contains(&alg) => alg,
            _ => return Ok(Vec::new()),
        };
        let matcher = matcher_for(header.key_id(), alg.key_type());
        match self.source.get(&matcher, context)? {
            Some(candidates) => Ok(candidates),
            None => Ok(Vec::new()),
        }
    }
}

/// The built-in decryption-key selector: parallel to
/// `DefaultJwsKeySelector`, constrained by an expected `(alg, enc)` pair.
pub struct DefaultJweKeySelector {
    source: Arc<dyn KeySource>,
    accepted_alg: JweAlgorithm,
    accepted_enc: EncryptionMethod,
}

impl DefaultJweKeySelector {
    pub fn new(source: Arc<dyn KeySource>, accepted_alg: JweAlgorithm, accepted_enc: EncryptionMethod) -> Self {
        DefaultJweKeySelector { source, accepted_alg, accepted_enc }
    }
}

impl JweKeySelector for DefaultJweKeySelector {
    fn select(&self, header: &Header, context: &SecurityContext) -> JoseResult<Vec<Jwk>> {
        let (alg, enc) = match header.jwe_algorithm() {
            Some((alg, enc)) if alg == self.accepted_alg && enc == self.accepted_enc => (alg, enc),
            _ => return Ok(Vec::new()),
        };
        let _ = enc;
        let matcher = matcher_for(header.key_id(), Some(alg.key_type()));
        match self.source.get(&matcher, context)? {
            Some(candidates) => Ok(candidates),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::CommonParams;
    use crate::jwk::JwkSet;
    use crate::keysource::ImmutableJwkSource;

    #[test]
    fn jws_selector_rejects_unaccepted_algorithm() {
        let source: Arc<dyn KeySource> = Arc::new(ImmutableJwkSource::new(JwkSet::empty()));
        let selector = DefaultJwsKeySelector::new(source, JwsAlgorithm::Es256);
        let header = Header::new_jws(JwsAlgorithm::Hs256, CommonParams::default());
        let candidates = selector.select(&header, &SecurityContext::default()).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn jws_selector_returns_candidates_for_matching_kid() {
        let jwk = Jwk::from_symmetric_secret(b"0123456789abcdef0123456789abcdef".to_vec());
        let source: Arc<dyn KeySource> = Arc::new(ImmutableJwkSource::new(JwkSet::new(vec![jwk])));
        let selector = DefaultJwsKeySelector::new(source, JwsAlgorithm::Hs256);
        let header = Header::new_jws(JwsAlgorithm::Hs256, CommonParams::default());
        let candidates = selector.select(&header, &SecurityContext::default()).unwrap();
        assert_eq!(candidates.len(), 1);
    }
}
