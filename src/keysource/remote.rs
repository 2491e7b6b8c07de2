//! Remote JWK set source (§4.8): an HTTP(S)-backed, atomically-refreshable
//! cache in front of a `ResourceRetriever`.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{Error, JoseResult};
use crate::jwk::{Jwk, JwkMatcher, JwkSet};
use crate::keysource::{KeySource, SecurityContext};

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(250);
const DEFAULT_SIZE_LIMIT_BYTES: u64 = 50 * 1024;

/// Fetches the raw bytes of a JWK set document from a URL. Abstracted out of
/// `RemoteJwkSource` so tests can substitute a fake retriever without
/// hitting the network.
pub trait ResourceRetriever: Send + Sync {
    fn fetch(&self, url: &str) -> JoseResult<Vec<u8>>;
}

/// The default retriever: a `reqwest` blocking client with connect/read
/// timeouts and a response body size limit.
pub struct ReqwestResourceRetriever {
    client: reqwest::blocking::Client,
    size_limit_bytes: u64,
}

impl ReqwestResourceRetriever {
    /// `connect_timeout`/`read_timeout` of `Duration::ZERO` mean unlimited
    /// (no timeout is set on the underlying client); `size_limit_bytes` of
    /// 0 means unlimited.
    pub fn new(connect_timeout: Duration, read_timeout: Duration, size_limit_bytes: u64) -> JoseResult<Self> {
        let mut builder = reqwest::blocking::Client::builder();
        if !connect_timeout.is_zero() {
            builder = builder.connect_timeout(connect_timeout);
        }
        if !read_timeout.is_zero() {
            builder = builder.timeout(read_timeout);
        }
        let client = builder.build().map_err(|e| Error::RemoteFetchFailed(e.to_string()))?;
        Ok(ReqwestResourceRetriever { client, size_limit_bytes })
    }
}

impl Default for ReqwestResourceRetriever {
    fn default() -> Self {
        ReqwestResourceRetriever::new(DEFAULT_TIMEOUT, DEFAULT_TIMEOUT, DEFAULT_SIZE_LIMIT_BYTES)
            .expect("default reqwest client configuration is always valid")
    }
}

impl ResourceRetriever for ReqwestResourceRetriever {
    fn fetch(&self, url: &str) -> JoseResult<Vec<u8>> {
        let response = self.client.get(url).send().map_err(|e| Error::RemoteFetchFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::RemoteFetchFailed(format!("unexpected status {}", response.status())));
        }
        let body = response.bytes().map_err(|e| Error::RemoteFetchFailed(e.to_string()))?;
        if self.size_limit_bytes != 0 && body.len() as u64 > self.size_limit_bytes {
            return Err(Error::RemoteFetchFailed(format!(
                "response body of {} bytes exceeds the {}-byte limit",
                body.len(),
                self.size_limit_bytes
            )));
        }
        Ok(body.to_vec())
    }
}

/// Consuming builder for `RemoteJwkSource`, the idiom used throughout this
/// crate for multi-option construction.
pub struct RemoteJwkSourceBuilder {
    url: String,
    connect_timeout: Duration,
    read_timeout: Duration,
    size_limit_bytes: u64,
    retriever: Option<Box<dyn ResourceRetriever>>,
}

impl RemoteJwkSourceBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        RemoteJwkSourceBuilder {
            url: url.into(),
            connect_timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_TIMEOUT,
            size_limit_bytes: DEFAULT_SIZE_LIMIT_BYTES,
            retriever: None,
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn size_limit_bytes(mut self, limit: u64) -> Self {
        self.size_limit_bytes = limit;
        self
    }

    /// Override the default `reqwest`-backed retriever, e.g. in tests.
    pub fn retriever(mut self, retriever: Box<dyn ResourceRetriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Build the source and kick off a background thread to prime its
    /// cache, per §5's "may schedule a single background task at
    /// construction" allowance.
    pub fn build(self) -> JoseResult<Arc<RemoteJwkSource>> {
        let retriever = match self.retriever {
            Some(r) => r,
            None => Box::new(ReqwestResourceRetriever::new(self.connect_timeout, self.read_timeout, self.size_limit_bytes)?),
        };
        let source = Arc::new(RemoteJwkSource {
            url: self.url,
            retriever,
            cache: RwLock::new(Arc::new(JwkSet::empty())),
        });
        let background = Arc::clone(&source);
        std::thread::spawn(move || {
            if let Err(e) = background.refresh() {
                tracing::warn!(url = %background.url, error = %e, "initial remote JWK set priming failed");
            }
        });
        Ok(source)
    }
}

/// A JWK set fetched over HTTP(S) and cached behind a single
/// atomically-replaceable reference (§5 "Cache refresh").
pub struct RemoteJwkSource {
    url: String,
    retriever: Box<dyn ResourceRetriever>,
    cache: RwLock<Arc<JwkSet>>,
}

impl RemoteJwkSource {
    pub fn builder(url: impl Into<String>) -> RemoteJwkSourceBuilder {
        RemoteJwkSourceBuilder::new(url)
    }

    fn current(&self) -> Arc<JwkSet> {
        Arc::clone(&self.cache.read().expect("remote JWK set cache lock poisoned"))
    }

    fn refresh(&self) -> JoseResult<Arc<JwkSet>> {
        let bytes = self.retriever.fetch(&self.url)?;
        let set = Arc::new(JwkSet::from_json(&bytes)?);
        *self.cache.write().expect("remote JWK set cache lock poisoned") = Arc::clone(&set);
        tracing::debug!(url = %self.url, key_count = set.len(), "remote JWK set refreshed");
        Ok(set)
    }
}

impl KeySource for RemoteJwkSource {
    fn get(&self, matcher: &JwkMatcher, _context: &SecurityContext) -> JoseResult<Option<Vec<Jwk>>> {
        let mut cached = self.current();
        if cached.is_empty() {
            cached = match self.refresh() {
                Ok(fresh) => fresh,
                Err(e) => {
                    tracing::warn!(url = %self.url, error = %e, "remote JWK set refresh failed");
                    return Ok(None);
                }
            };
        }

        let matches: Vec<Jwk> = cached.select(matcher).into_iter().cloned().collect();
        if !matches.is_empty() {
            return Ok(Some(matches));
        }

        let kid = match &matcher.kid {
            Some(kid) => kid,
            None => return Ok(Some(matches)),
        };
        if cached.find_by_kid(kid).is_some() {
            return Ok(Some(matches));
        }

        tracing::debug!(url = %self.url, kid, "kid not present in cached JWK set, refreshing");
        match self.refresh() {
            Ok(fresh) => Ok(Some(fresh.select(matcher).into_iter().cloned().collect())),
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "remote JWK set refresh failed");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedRetriever {
        responses: Mutex<Vec<JoseResult<Vec<u8>>>>,
        calls: AtomicUsize,
    }

    impl ResourceRetriever for ScriptedRetriever {
        fn fetch(&self, _url: &str) -> JoseResult<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(Error::RemoteFetchFailed("no more scripted responses".into()));
            }
            responses.remove(0)
        }
    }

    fn jwk_set_body(kid: &str) -> Vec<u8> {
        let doc = serde_json::json!({
            "keys": [{"kty": "oct", "kid": kid, "k": crate::base64url::encode(b"0123456789abcdef0123456789abcdef")}]
        });
        serde_json::to_vec(&doc).unwrap()
    }

    #[test]
    fn refreshes_on_unknown_kid_and_finds_it() {
        let retriever = ScriptedRetriever {
            responses: Mutex::new(vec![Ok(jwk_set_body("1")), Ok(jwk_set_body("2"))]),
            calls: AtomicUsize::new(0),
        };
        let source = RemoteJwkSource {
            url: "https://example.test/jwks.json".into(),
            retriever: Box::new(retriever),
            cache: RwLock::new(Arc::new(JwkSet::empty())),
        };

        let matcher = JwkMatcher { kid: Some("2".into()), ..Default::default() };
        let result = source.get(&matcher, &SecurityContext::default()).unwrap().unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].kid.as_deref(), Some("2"));

        // A second call against the now-populated, matching cache does not
        // need to refresh again.
        let result = source.get(&matcher, &SecurityContext::default()).unwrap().unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn returns_none_when_fetch_fails_on_empty_cache() {
        let retriever = ScriptedRetriever { responses: Mutex::new(Vec::new()), calls: AtomicUsize::new(0) };
        let source = RemoteJwkSource {
            url: "https://example.test/jwks.json".into(),
            retriever: Box::new(retriever),
            cache: RwLock::new(Arc::new(JwkSet::empty())),
        };
        let result = source.get(&JwkMatcher::default(), &SecurityContext::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn known_kid_failing_other_criteria_returns_empty_not_none() {
        let retriever = ScriptedRetriever { responses: Mutex::new(vec![Ok(jwk_set_body("1"))]), calls: AtomicUsize::new(0) };
        let source = RemoteJwkSource {
            url: "https://example.test/jwks.json".into(),
            retriever: Box::new(retriever),
            cache: RwLock::new(Arc::new(JwkSet::empty())),
        };
        source.refresh().unwrap();
        let matcher = JwkMatcher { kid: Some("1".into()), key_type: Some(crate::alg::KeyType::Rsa), ..Default::default() };
        let result = source.get(&matcher, &SecurityContext::default()).unwrap();
        assert_eq!(result, Some(Vec::new()));
    }
}
