//! HMAC-SHA signer/verifier (HS256/384/512).

use openssl::pkey::PKey;
use openssl::sign::Signer as OsslSigner;

use super::{Signer, Verifier};
use crate::alg::JwsAlgorithm;
use crate::error::{Error, JoseResult};
use crate::header::Header;
use crate::jwk::Jwk;
use crate::util::constant_time_eq;

fn mac(alg: JwsAlgorithm, key: &[u8], data: &[u8]) -> JoseResult<Vec<u8>> {
    let digest = alg.digest().ok_or_else(|| Error::UnsupportedAlgorithm(alg.name().to_string()))?;
    let pkey = PKey::hmac(key)?;
    let mut signer = OsslSigner::new(digest, &pkey)?;
    signer.update(data)?;
    Ok(signer.sign_to_vec()?)
}

fn load_key(alg: JwsAlgorithm, jwk: &Jwk) -> JoseResult<Vec<u8>> {
    let key = jwk.symmetric_bytes()?.to_vec();
    if let Some(min_len) = alg.min_hmac_key_len() {
        if key.len() < min_len {
            return Err(Error::KeyTypeMismatch {
                alg: alg.name().to_string(),
                key_type: format!("{}-byte symmetric key (need >= {min_len})", key.len()),
            });
        }
    }
    Ok(key)
}

pub struct HmacSigner {
    alg: JwsAlgorithm,
    key: Vec<u8>,
}

impl HmacSigner {
    pub fn new(alg: JwsAlgorithm, jwk: &Jwk) -> JoseResult<Self> {
        Ok(HmacSigner { alg, key: load_key(alg, jwk)? })
    }
}

impl Signer for HmacSigner {
    fn sign(&self, _header: &Header, signing_input: &[u8]) -> JoseResult<Vec<u8>> {
        mac(self.alg, &self.key, signing_input)
    }
}

pub struct HmacVerifier {
    alg: JwsAlgorithm,
    key: Vec<u8>,
}

impl HmacVerifier {
    pub fn new(alg: JwsAlgorithm, jwk: &Jwk) -> JoseResult<Self> {
        Ok(HmacVerifier { alg, key: load_key(alg, jwk)? })
    }
}

impl Verifier for HmacVerifier {
    fn verify(&self, _header: &Header, signing_input: &[u8], signature: &[u8]) -> JoseResult<bool> {
        let expected = mac(self.alg, &self.key, signing_input)?;
        Ok(constant_time_eq(&expected, signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::CommonParams;

    fn key32() -> Jwk {
        Jwk::from_symmetric_secret(vec![0u8; 32])
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let jwk = key32();
        let signer = HmacSigner::new(JwsAlgorithm::Hs256, &jwk).unwrap();
        let header = Header::new_jws(JwsAlgorithm::Hs256, CommonParams::default());
        let sig = signer.sign(&header, b"hello").unwrap();

        let verifier = HmacVerifier::new(JwsAlgorithm::Hs256, &jwk).unwrap();
        assert!(verifier.verify(&header, b"hello", &sig).unwrap());
    }

    #[test]
    fn flipped_signature_byte_fails_verification() {
        let jwk = key32();
        let signer = HmacSigner::new(JwsAlgorithm::Hs256, &jwk).unwrap();
        let header = Header::new_jws(JwsAlgorithm::Hs256, CommonParams::default());
        let mut sig = signer.sign(&header, b"hello").unwrap();
        sig[0] ^= 0xFF;

        let verifier = HmacVerifier::new(JwsAlgorithm::Hs256, &jwk).unwrap();
        assert!(!verifier.verify(&header, b"hello", &sig).unwrap());
    }

    #[test]
    fn flipped_payload_byte_fails_verification() {
        let jwk = key32();
        let signer = HmacSigner::new(JwsAlgorithm::Hs256, &jwk).unwrap();
        let header = Header::new_jws(JwsAlgorithm::Hs256, CommonParams::default());
        let sig = signer.sign(&header, b"hello").unwrap();

        let verifier = HmacVerifier::new(JwsAlgorithm::Hs256, &jwk).unwrap();
        assert!(!verifier.verify(&header, b"hellp", &sig).unwrap());
    }

    #[test]
    fn key_shorter_than_digest_is_rejected() {
        let jwk = Jwk::from_symmetric_secret(vec![0u8; 8]);
        assert!(matches!(
            HmacSigner::new(JwsAlgorithm::Hs256, &jwk),
            Err(Error::KeyTypeMismatch { .. })
        ));
    }
}
