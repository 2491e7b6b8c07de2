//! JWT claims set (§4.6), default claims verifier (§4.7), and the
//! `Jwt::sign`/`Jwt::encrypt` convenience wrappers for the common case of
//! "build header + claims, produce a compact token" in one call.

pub mod claims;
pub mod verifier;

use serde_json::Value;

use crate::alg::{EncryptionMethod, JweAlgorithm, JwsAlgorithm};
use crate::error::JoseResult;
use crate::header::{CommonParams, Header, JweParams};
use crate::jose_object::{JoseObject, JweObject, JwsObject};
use crate::jwe::{DefaultJweFactory, JweEncrypterFactory};
use crate::jwk::Jwk;
use crate::jws::{DefaultJwsFactory, JwsSignerFactory};
use crate::jwt::claims::ClaimsSet;
use crate::payload::Payload;

/// Ergonomic entry points over the general state-machine API (`JwsObject`/
/// `JweObject` directly remain available for callers that need more
/// control, e.g. multi-step construction or custom factories).
pub struct Jwt;

impl Jwt {
    /// Build, sign, and serialize a JWS-protected JWT in one call.
    pub fn sign(alg: JwsAlgorithm, common: CommonParams, claims: &ClaimsSet, jwk: &Jwk) -> JoseResult<String> {
        let header = Header::new_jws(alg, common);
        let payload = Payload::from_json(&Value::Object(claims.to_json()))?;
        let jws = JwsObject::new(header, payload);
        let signing_input = jws.signing_input()?;

        let signer = DefaultJwsFactory.create_signer(alg, jwk)?;
        let signature = signer.sign(jws.header(), &signing_input)?;
        let jws = jws.with_signature(signature)?;
        JoseObject::Jws(jws).serialize()
    }

    /// Build, encrypt, and serialize a JWE-protected JWT in one call.
    pub fn encrypt(alg: JweAlgorithm, enc: EncryptionMethod, common: CommonParams, claims: &ClaimsSet, jwk: &Jwk) -> JoseResult<String> {
        let header = Header::new_jwe(alg, enc, common, JweParams::default());
        let plaintext = serde_json::to_vec(&Value::Object(claims.to_json()))?;

        let encrypter = DefaultJweFactory.create_encrypter(alg, enc, jwk)?;
        let (final_header, enc_key, iv, ciphertext, tag) = encrypter.encrypt(&header, &plaintext)?;
        let jwe = JweObject::new_encrypted(final_header, enc_key, iv, ciphertext, tag);
        JoseObject::Jwe(jwe).serialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_parse_round_trips_claims() {
        let jwk = Jwk::from_symmetric_secret(vec![0u8; 32]);
        let claims = ClaimsSet::builder().subject("alice").unwrap().expiration(9_999_999_999).unwrap().build();

        let compact = Jwt::sign(JwsAlgorithm::Hs256, CommonParams { typ: Some("JWT".into()), ..Default::default() }, &claims, &jwk).unwrap();
        assert_eq!(compact.matches('.').count(), 2);

        let parsed = JoseObject::parse(&compact).unwrap();
        match parsed {
            JoseObject::Jws(jws) => {
                let claims = ClaimsSet::parse(jws.payload().as_json_object().unwrap()).unwrap();
                assert_eq!(claims.subject(), Some("alice"));
            }
            _ => panic!("expected a JWS"),
        }
    }

    #[test]
    fn encrypt_then_parse_round_trips_claims() {
        let jwk = Jwk::from_symmetric_secret(vec![0u8; EncryptionMethod::A256Gcm.cek_len()]);
        let claims = ClaimsSet::builder().subject("alice").unwrap().build();

        let compact = Jwt::encrypt(JweAlgorithm::Dir, EncryptionMethod::A256Gcm, CommonParams { typ: Some("JWT".into()), ..Default::default() }, &claims, &jwk).unwrap();
        assert_eq!(compact.matches('.').count(), 4);
    }
}
