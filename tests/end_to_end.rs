//! End-to-end scenarios exercised strictly through the public API: a
//! compact string in, verified claims (or a specific error) out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use jose_rs::alg::{EncryptionMethod, JweAlgorithm, JwsAlgorithm};
use jose_rs::base64url;
use jose_rs::error::Error;
use jose_rs::header::{CommonParams, JweParams};
use jose_rs::jose_object::JweObject;
use jose_rs::jwe::{DefaultJweFactory, JweEncrypterFactory};
use jose_rs::jwt::claims::ClaimsSet;
use jose_rs::jwt::verifier::{ClaimsVerifier, DefaultClaimsVerifier};
use jose_rs::keysource::{ImmutableJwkSource, ImmutableSecretSource, KeySource, RemoteJwkSourceBuilder, ResourceRetriever};
use jose_rs::selector::{DefaultJweKeySelector, DefaultJwsKeySelector, JweKeySelector, JwsKeySelector};
use jose_rs::{Header, Jwk, JwkSet, JoseObject, Jwt, JwtProcessor, SecurityContext};

fn hmac_secret() -> Vec<u8> {
    b"0123456789abcdef0123456789abcdef".to_vec()
}

fn hs256_processor(secret: &[u8]) -> JwtProcessor {
    let source: Arc<dyn KeySource> = Arc::new(ImmutableSecretSource::new(secret.to_vec()));
    let selector: Arc<dyn JwsKeySelector> = Arc::new(DefaultJwsKeySelector::new(source, JwsAlgorithm::Hs256));
    JwtProcessor::builder().jws_key_selector(selector).build()
}

/// Scenario 1: sign then verify round-trips, and flipping a byte anywhere
/// in the signature or payload segments is rejected as `InvalidSignature`.
#[test]
fn hs256_round_trip_and_forgery_resistance() {
    let secret = hmac_secret();
    let claims = ClaimsSet::builder().subject("alice").unwrap().build();
    let compact = Jwt::sign(JwsAlgorithm::Hs256, CommonParams { typ: Some("JWT".into()), ..Default::default() }, &claims, &Jwk::from_symmetric_secret(secret.clone())).unwrap();

    let processor = hs256_processor(&secret);
    let verified = processor.process(&compact, &SecurityContext::default()).unwrap();
    assert_eq!(verified.subject(), Some("alice"));

    let mut parts: Vec<String> = compact.split('.').map(str::to_string).collect();
    let mut tampered_signature = parts.clone();
    tampered_signature[2] = base64url::encode(b"not-the-real-signature");
    assert!(matches!(
        processor.process(&tampered_signature.join("."), &SecurityContext::default()),
        Err(Error::InvalidSignature)
    ));

    parts[1] = base64url::encode(br#"{"sub":"mallory"}"#);
    assert!(matches!(processor.process(&parts.join("."), &SecurityContext::default()), Err(Error::InvalidSignature)));
}

/// Scenario 2: an expired token is rejected once `exp + skew <= now`.
#[test]
fn expired_claims_are_rejected_with_default_skew() {
    let claims = ClaimsSet::builder().expiration(1000).unwrap().build();
    let verifier = DefaultClaimsVerifier::new(60);
    assert!(matches!(verifier.verify(&claims, 2000), Err(Error::Expired)));
}

/// Scenario 3: the clock-skew boundary is exact, on both sides.
#[test]
fn clock_skew_boundary_is_exact() {
    let verifier = DefaultClaimsVerifier::new(60);
    let accepted = ClaimsSet::builder().expiration(1941).unwrap().build();
    assert!(verifier.verify(&accepted, 2000).is_ok());

    let rejected = ClaimsSet::builder().expiration(1940).unwrap().build();
    assert!(matches!(verifier.verify(&rejected, 2000), Err(Error::Expired)));
}

/// Scenario 4: a single-string `aud` parses to a one-element list and
/// re-emits as the same single string, not a one-element array.
#[test]
fn single_string_audience_round_trips_as_a_string() {
    let mut obj = serde_json::Map::new();
    obj.insert("aud".into(), serde_json::Value::String("a".into()));
    let claims = ClaimsSet::parse(obj).unwrap();
    assert_eq!(claims.audience(), vec!["a".to_string()]);
    assert_eq!(claims.to_json().get("aud"), Some(&serde_json::Value::String("a".into())));
}

fn rsa_jwk_pair() -> (Jwk, Jwk) {
    let rsa = openssl::rsa::Rsa::generate(2048).unwrap();
    let mut priv_obj = serde_json::Map::new();
    priv_obj.insert("kty".into(), serde_json::Value::String("RSA".into()));
    priv_obj.insert("n".into(), serde_json::Value::String(base64url::encode(rsa.n().to_vec())));
    priv_obj.insert("e".into(), serde_json::Value::String(base64url::encode(rsa.e().to_vec())));
    priv_obj.insert("d".into(), serde_json::Value::String(base64url::encode(rsa.d().to_vec())));
    priv_obj.insert("p".into(), serde_json::Value::String(base64url::encode(rsa.p().unwrap().to_vec())));
    priv_obj.insert("q".into(), serde_json::Value::String(base64url::encode(rsa.q().unwrap().to_vec())));
    priv_obj.insert("dp".into(), serde_json::Value::String(base64url::encode(rsa.dmp1().unwrap().to_vec())));
    priv_obj.insert("dq".into(), serde_json::Value::String(base64url::encode(rsa.dmq1().unwrap().to_vec())));
    priv_obj.insert("qi".into(), serde_json::Value::String(base64url::encode(rsa.iqmp().unwrap().to_vec())));
    let private = Jwk::from_json(&priv_obj).unwrap();

    let mut pub_obj = serde_json::Map::new();
    pub_obj.insert("kty".into(), serde_json::Value::String("RSA".into()));
    pub_obj.insert("n".into(), serde_json::Value::String(base64url::encode(rsa.n().to_vec())));
    pub_obj.insert("e".into(), serde_json::Value::String(base64url::encode(rsa.e().to_vec())));
    let public = Jwk::from_json(&pub_obj).unwrap();

    (private, public)
}

/// Scenario 5: a JWE with `cty: JWT` wraps a signed JWT; the processor
/// decrypts, recurses into the nested compact JWS, and verifies that.
#[test]
fn nested_jwt_is_decrypted_then_verified() {
    let (rsa_private, rsa_public) = rsa_jwk_pair();
    let hmac_secret = hmac_secret();

    let inner_claims = ClaimsSet::builder().subject("alice").unwrap().build();
    let inner_compact = Jwt::sign(
        JwsAlgorithm::Hs256,
        CommonParams { typ: Some("JWT".into()), ..Default::default() },
        &inner_claims,
        &Jwk::from_symmetric_secret(hmac_secret.clone()),
    )
    .unwrap();

    let outer_header = Header::new_jwe(
        JweAlgorithm::Rsa1_5,
        EncryptionMethod::A128CbcHs256,
        CommonParams { cty: Some("JWT".into()), ..Default::default() },
        JweParams::default(),
    );
    let encrypter = DefaultJweFactory.create_encrypter(JweAlgorithm::Rsa1_5, EncryptionMethod::A128CbcHs256, &rsa_public).unwrap();
    let (final_header, enc_key, iv, ciphertext, tag) = encrypter.encrypt(&outer_header, inner_compact.as_bytes()).unwrap();
    let outer_compact = JoseObject::Jwe(JweObject::new_encrypted(final_header, enc_key, iv, ciphertext, tag)).serialize().unwrap();

    let jws_source: Arc<dyn KeySource> = Arc::new(ImmutableSecretSource::new(hmac_secret));
    let jws_selector: Arc<dyn JwsKeySelector> = Arc::new(DefaultJwsKeySelector::new(jws_source, JwsAlgorithm::Hs256));
    let jwe_source: Arc<dyn KeySource> = Arc::new(ImmutableJwkSource::new(JwkSet::new(vec![rsa_private])));
    let jwe_selector: Arc<dyn JweKeySelector> = Arc::new(DefaultJweKeySelector::new(jwe_source, JweAlgorithm::Rsa1_5, EncryptionMethod::A128CbcHs256));

    let processor = JwtProcessor::builder().jws_key_selector(jws_selector).jwe_key_selector(jwe_selector).build();
    let claims = processor.process(&outer_compact, &SecurityContext::default()).unwrap();
    assert_eq!(claims.subject(), Some("alice"));
}

/// Scenario 6: a plaintext (`alg: none`) token is rejected by default.
#[test]
fn unsecured_token_is_rejected_by_default() {
    let processor = hs256_processor(&hmac_secret());
    let compact = "eyJhbGciOiJub25lIn0.eyJzdWIiOiJhbGljZSJ9.";
    assert!(matches!(processor.process(compact, &SecurityContext::default()), Err(Error::UnsecuredRejected)));
}

/// Always returns the secret belonging to whichever document was just
/// requested, with the twist that only the very first fetch (across every
/// caller) ever returns the narrower one-key document; every fetch after
/// that returns both keys. This keeps the test deterministic regardless of
/// how the background priming fetch and the foreground `get()` interleave.
struct GrowingJwkSetRetriever {
    calls: AtomicUsize,
    secret: Vec<u8>,
}

impl ResourceRetriever for GrowingJwkSetRetriever {
    fn fetch(&self, _url: &str) -> jose_rs::JoseResult<Vec<u8>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let k = base64url::encode(&self.secret);
        let doc = if n == 0 {
            serde_json::json!({"keys": [{"kty": "oct", "kid": "1", "k": k}]})
        } else {
            serde_json::json!({"keys": [{"kty": "oct", "kid": "1", "k": k}, {"kty": "oct", "kid": "2", "k": k}]})
        };
        Ok(serde_json::to_vec(&doc).unwrap())
    }
}

/// Scenario 7: a `kid` not present in the cached set triggers a refresh,
/// and the refreshed set is used to answer the same `get()` call.
#[test]
fn remote_source_refreshes_to_find_an_unknown_kid() {
    let secret = hmac_secret();
    let retriever = GrowingJwkSetRetriever { calls: AtomicUsize::new(0), secret: secret.clone() };
    let remote = RemoteJwkSourceBuilder::new("https://example.test/jwks.json")
        .retriever(Box::new(retriever))
        .build()
        .unwrap();

    let selector: Arc<dyn JwsKeySelector> = Arc::new(DefaultJwsKeySelector::new(remote, JwsAlgorithm::Hs256));
    let processor = JwtProcessor::builder().jws_key_selector(selector).build();

    let claims = ClaimsSet::builder().subject("alice").unwrap().build();
    let compact = Jwt::sign(
        JwsAlgorithm::Hs256,
        CommonParams { kid: Some("2".into()), ..Default::default() },
        &claims,
        &Jwk::from_symmetric_secret(secret),
    )
    .unwrap();

    let verified = processor.process(&compact, &SecurityContext::default()).unwrap();
    assert_eq!(verified.subject(), Some("alice"));
}
