//! JWT processor pipeline (§4.10): parse → verify/decrypt → claims.
//!
//! `JwtProcessor` is the single entry point most callers need; everything
//! else in this crate (codec, SPI, selectors, key sources) exists to be
//! assembled here, but all of it remains directly usable on its own.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, JoseResult};
use crate::jose_object::JoseObject;
use crate::jwe::{DefaultJweFactory, JweDecrypterFactory};
use crate::jws::{DefaultJwsFactory, JwsVerifierFactory};
use crate::jwt::claims::ClaimsSet;
use crate::jwt::verifier::{ClaimsVerifier, DefaultClaimsVerifier};
use crate::keysource::SecurityContext;
use crate::selector::{JweKeySelector, JwsKeySelector};

/// Consuming builder for `JwtProcessor`, following the pack's
/// builder-over-constructor-soup idiom.
pub struct JwtProcessorBuilder {
    jws_key_selector: Option<Arc<dyn JwsKeySelector>>,
    jwe_key_selector: Option<Arc<dyn JweKeySelector>>,
    jws_verifier_factory: Option<Arc<dyn JwsVerifierFactory>>,
    jwe_decrypter_factory: Option<Arc<dyn JweDecrypterFactory>>,
    claims_verifier: Option<Arc<dyn ClaimsVerifier>>,
    accept_unsecured: bool,
}

impl Default for JwtProcessorBuilder {
    fn default() -> Self {
        JwtProcessorBuilder {
            jws_key_selector: None,
            jwe_key_selector: None,
            jws_verifier_factory: Some(Arc::new(DefaultJwsFactory)),
            jwe_decrypter_factory: Some(Arc::new(DefaultJweFactory)),
            claims_verifier: Some(Arc::new(DefaultClaimsVerifier::default())),
            accept_unsecured: false,
        }
    }
}

impl JwtProcessorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn jws_key_selector(mut self, selector: Arc<dyn JwsKeySelector>) -> Self {
        self.jws_key_selector = Some(selector);
        self
    }

    pub fn jwe_key_selector(mut self, selector: Arc<dyn JweKeySelector>) -> Self {
        self.jwe_key_selector = Some(selector);
        self
    }

    pub fn jws_verifier_factory(mut self, factory: Arc<dyn JwsVerifierFactory>) -> Self {
        self.jws_verifier_factory = Some(factory);
        self
    }

    pub fn jwe_decrypter_factory(mut self, factory: Arc<dyn JweDecrypterFactory>) -> Self {
        self.jwe_decrypter_factory = Some(factory);
        self
    }

    /// `None` disables claims verification entirely (the default is
    /// `DefaultClaimsVerifier`).
    pub fn claims_verifier(mut self, verifier: Option<Arc<dyn ClaimsVerifier>>) -> Self {
        self.claims_verifier = verifier;
        self
    }

    /// A processor misconfigured on purpose, to exercise `NoVerifierFactory`.
    pub fn without_verifier_factory(mut self) -> Self {
        self.jws_verifier_factory = None;
        self
    }

    /// A processor misconfigured on purpose, to exercise `NoDecrypterFactory`.
    pub fn without_decrypter_factory(mut self) -> Self {
        self.jwe_decrypter_factory = None;
        self
    }

    /// Accept `alg: none` unsecured objects instead of rejecting them.
    pub fn accept_unsecured(mut self, accept: bool) -> Self {
        self.accept_unsecured = accept;
        self
    }

    pub fn build(self) -> JwtProcessor {
        JwtProcessor {
            jws_key_selector: self.jws_key_selector,
            jwe_key_selector: self.jwe_key_selector,
            jws_verifier_factory: self.jws_verifier_factory,
            jwe_decrypter_factory: self.jwe_decrypter_factory,
            claims_verifier: self.claims_verifier,
            accept_unsecured: self.accept_unsecured,
        }
    }
}

/// The default end-to-end consumer: compact string in, verified claims out.
pub struct JwtProcessor {
    jws_key_selector: Option<Arc<dyn JwsKeySelector>>,
    jwe_key_selector: Option<Arc<dyn JweKeySelector>>,
    jws_verifier_factory: Option<Arc<dyn JwsVerifierFactory>>,
    jwe_decrypter_factory: Option<Arc<dyn JweDecrypterFactory>>,
    claims_verifier: Option<Arc<dyn ClaimsVerifier>>,
    accept_unsecured: bool,
}

impl JwtProcessor {
    pub fn builder() -> JwtProcessorBuilder {
        JwtProcessorBuilder::new()
    }

    pub fn process(&self, compact: &str, context: &SecurityContext) -> JoseResult<ClaimsSet> {
        let object = JoseObject::parse(compact)?;
        self.process_object(object, context)
    }

    fn process_object(&self, object: JoseObject, context: &SecurityContext) -> JoseResult<ClaimsSet> {
        match object {
            JoseObject::Unsecured { payload, .. } => {
                if !self.accept_unsecured {
                    return Err(Error::UnsecuredRejected);
                }
                let obj = payload
                    .as_json_object()
                    .map_err(|_| Error::MalformedClaims("payload is not a JSON object".into()))?;
                let claims = ClaimsSet::parse(obj)?;
                self.run_claims_verifier(&claims)?;
                Ok(claims)
            }
            JoseObject::Jws(jws) => self.process_jws(&jws, context),
            JoseObject::Jwe(jwe) => self.process_jwe(&jwe, context),
        }
    }

    fn process_jws(&self, jws: &crate::jose_object::JwsObject, context: &SecurityContext) -> JoseResult<ClaimsSet> {
        let selector = self.jws_key_selector.as_ref().ok_or(Error::NoKeySelector)?;
        let factory = self.jws_verifier_factory.as_ref().ok_or(Error::NoVerifierFactory)?;

        let alg = jws.header().jws_algorithm().ok_or_else(|| Error::malformed("JWS object has no 'alg'"))?;
        let candidates = selector.select(jws.header(), context)?;
        if candidates.is_empty() {
            return Err(Error::NoMatchingKey);
        }

        let signing_input = jws.signing_input()?;
        let signature = jws.signature().ok_or_else(|| Error::IllegalState("JWS is unsigned".into()))?;

        let mut attempted = false;
        for jwk in &candidates {
            let verifier = match factory.create_verifier(alg, jwk)? {
                Some(v) => v,
                None => {
                    tracing::debug!(kid = ?jwk.kid, "verifier factory skipped candidate key");
                    continue;
                }
            };
            attempted = true;
            let ok = verifier.verify(jws.header(), &signing_input, signature)?;
            tracing::debug!(kid = ?jwk.kid, ok, "tried JWS candidate key");
            if ok {
                let obj = jws
                    .payload()
                    .as_json_object()
                    .map_err(|_| Error::MalformedClaims("payload is not a JSON object".into()))?;
                let claims = ClaimsSet::parse(obj)?;
                self.run_claims_verifier(&claims)?;
                return Ok(claims);
            }
        }

        if attempted {
            Err(Error::InvalidSignature)
        } else {
            Err(Error::NoSuitableVerifier)
        }
    }

    fn process_jwe(&self, jwe: &crate::jose_object::JweObject, context: &SecurityContext) -> JoseResult<ClaimsSet> {
        let selector = self.jwe_key_selector.as_ref().ok_or(Error::NoKeySelector)?;
        let factory = self.jwe_decrypter_factory.as_ref().ok_or(Error::NoDecrypterFactory)?;

        let (alg, enc) = jwe.header().jwe_algorithm().ok_or_else(|| Error::malformed("JWE object has no 'alg'/'enc'"))?;
        let candidates = selector.select(jwe.header(), context)?;
        if candidates.is_empty() {
            return Err(Error::NoMatchingKey);
        }

        let (enc_key, iv, ciphertext, tag) = jwe.segments()?;

        let mut attempted = false;
        for jwk in &candidates {
            let decrypter = match factory.create_decrypter(alg, enc, jwk)? {
                Some(d) => d,
                None => {
                    tracing::debug!(kid = ?jwk.kid, "decrypter factory skipped candidate key");
                    continue;
                }
            };
            attempted = true;
            match decrypter.decrypt(jwe.header(), enc_key, iv, ciphertext, tag) {
                Ok(plaintext) => {
                    tracing::debug!(kid = ?jwk.kid, "JWE candidate key decrypted successfully");
                    return self.after_decryption(jwe, plaintext, context);
                }
                Err(e) => {
                    tracing::debug!(kid = ?jwk.kid, error = %e, "JWE candidate key failed to decrypt");
                }
            }
        }

        if attempted {
            Err(Error::DecryptionFailed)
        } else {
            Err(Error::NoSuitableDecrypter)
        }
    }

    /// Step 8: if `cty == "JWT"` (case-insensitive), the plaintext is itself
    /// a compact JWS to recurse into; otherwise it is the claims set.
    fn after_decryption(&self, jwe: &crate::jose_object::JweObject, plaintext: Vec<u8>, context: &SecurityContext) -> JoseResult<ClaimsSet> {
        let is_nested = jwe.header().content_type().map(|cty| cty.eq_ignore_ascii_case("JWT")).unwrap_or(false);
        if !is_nested {
            let obj = crate::json::parse_object(&plaintext).map_err(|_| Error::MalformedClaims("payload is not a JSON object".into()))?;
            let claims = ClaimsSet::parse(obj)?;
            self.run_claims_verifier(&claims)?;
            return Ok(claims);
        }

        let inner = std::str::from_utf8(&plaintext).map_err(|_| Error::malformed("nested JWT payload is not valid UTF-8"))?;
        match JoseObject::parse(inner)? {
            JoseObject::Jws(inner_jws) => self.process_jws(&inner_jws, context),
            _ => Err(Error::malformed("nested 'cty: JWT' payload was not a compact JWS")),
        }
    }

    fn run_claims_verifier(&self, claims: &ClaimsSet) -> JoseResult<()> {
        if let Some(verifier) = &self.claims_verifier {
            let now = SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_secs() as i64;
            verifier.verify(claims, now)?;
        }
        Ok(())
    }
}
