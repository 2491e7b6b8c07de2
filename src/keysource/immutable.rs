//! Immutable JWK set / secret sources (§4.8): never fail, never block.

use crate::error::JoseResult;
use crate::jwk::{Jwk, JwkMatcher, JwkSet};
use crate::keysource::{KeySource, SecurityContext};

/// Wraps a fixed `JwkSet`. `get` is a pure filter over it; matches are
/// returned in declaration order.
#[derive(Clone)]
pub struct ImmutableJwkSource {
    keys: JwkSet,
}

impl ImmutableJwkSource {
    pub fn new(keys: JwkSet) -> Self {
        ImmutableJwkSource { keys }
    }
}

impl KeySource for ImmutableJwkSource {
    fn get(&self, matcher: &JwkMatcher, _context: &SecurityContext) -> JoseResult<Option<Vec<Jwk>>> {
        Ok(Some(self.keys.select(matcher).into_iter().cloned().collect()))
    }
}

/// Sugar over `ImmutableJwkSource`: wraps a single symmetric key as a
/// one-element JWK set, for the common "I have one HMAC secret" case.
#[derive(Clone)]
pub struct ImmutableSecretSource {
    inner: ImmutableJwkSource,
}

impl ImmutableSecretSource {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        let jwk = Jwk::from_symmetric_secret(secret);
        ImmutableSecretSource { inner: ImmutableJwkSource::new(JwkSet::new(vec![jwk])) }
    }
}

impl KeySource for ImmutableSecretSource {
    fn get(&self, matcher: &JwkMatcher, context: &SecurityContext) -> JoseResult<Option<Vec<Jwk>>> {
        self.inner.get(matcher, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alg::KeyType;

    #[test]
    fn immutable_jwk_source_filters_by_matcher() {
        let jwk_a = Jwk::from_symmetric_secret(b"key-a-32-bytes-long-enough!!!!!!".to_vec());
        let jwk_b = Jwk::from_symmetric_secret(b"key-b-32-bytes-long-enough!!!!!!".to_vec());
        let source = ImmutableJwkSource::new(JwkSet::new(vec![jwk_a, jwk_b]));

        let all = source.get(&JwkMatcher::default(), &SecurityContext::default()).unwrap().unwrap();
        assert_eq!(all.len(), 2);

        let none = source
            .get(&JwkMatcher { key_type: Some(KeyType::Rsa), ..Default::default() }, &SecurityContext::default())
            .unwrap()
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn immutable_secret_source_exposes_single_key() {
        let source = ImmutableSecretSource::new(b"a-32-byte-long-shared-hmac-key!!".to_vec());
        let matches = source.get(&JwkMatcher::default(), &SecurityContext::default()).unwrap().unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].symmetric_bytes().unwrap(), b"a-32-byte-long-shared-hmac-key!!");
    }
}
