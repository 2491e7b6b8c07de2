//! JWS signer/verifier SPI (§4.4) and the default factory that maps a
//! header's declared algorithm and a candidate key to a primitive.

mod ecdsa;
mod hmac;
mod rsa;

use crate::alg::JwsAlgorithm;
use crate::error::{Error, JoseResult};
use crate::header::Header;
use crate::jwk::Jwk;

/// Produces a signature over the JWS signing input.
pub trait Signer: Send + Sync {
    fn sign(&self, header: &Header, signing_input: &[u8]) -> JoseResult<Vec<u8>>;
}

/// Checks a signature over the JWS signing input. Implementations MUST
/// compare in constant time and MUST NOT fail with `CryptoError` on a
/// merely-invalid signature — only on key/algorithm misuse.
pub trait Verifier: Send + Sync {
    fn verify(&self, header: &Header, signing_input: &[u8], signature: &[u8]) -> JoseResult<bool>;
}

/// Maps (alg, key) pairs to signers. Implementations must be safe for
/// concurrent invocation.
pub trait JwsSignerFactory: Send + Sync {
    fn create_signer(&self, alg: JwsAlgorithm, jwk: &Jwk) -> JoseResult<Box<dyn Signer>>;
}

/// Maps (alg, key) pairs to verifiers. Returning `Ok(None)` means "this key
/// cannot plausibly back this algorithm" (a skip, not an error); the
/// processor treats that as "try the next candidate".
pub trait JwsVerifierFactory: Send + Sync {
    fn create_verifier(&self, alg: JwsAlgorithm, jwk: &Jwk) -> JoseResult<Option<Box<dyn Verifier>>>;
}

/// The built-in factory, dispatching on the algorithm family table in
/// spec §4.4.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultJwsFactory;

impl JwsSignerFactory for DefaultJwsFactory {
    fn create_signer(&self, alg: JwsAlgorithm, jwk: &Jwk) -> JoseResult<Box<dyn Signer>> {
        if alg.is_hmac() {
            return Ok(Box::new(hmac::HmacSigner::new(alg, jwk)?));
        }
        if alg.is_rsassa_pkcs1() {
            return Ok(Box::new(rsa::RsaPkcs1Signer::new(alg, jwk)?));
        }
        if alg.is_rsassa_pss() {
            return Ok(Box::new(rsa::RsaPssSigner::new(alg, jwk)?));
        }
        if alg.is_ecdsa() {
            return Ok(Box::new(ecdsa::EcdsaSigner::new(alg, jwk)?));
        }
        Err(Error::UnsupportedAlgorithm(alg.name().to_string()))
    }
}

impl JwsVerifierFactory for DefaultJwsFactory {
    fn create_verifier(&self, alg: JwsAlgorithm, jwk: &Jwk) -> JoseResult<Option<Box<dyn Verifier>>> {
        if Some(jwk.kty) != alg.key_type() {
            // Wrong key kind for this algorithm: not a candidate, not an error.
            return Ok(None);
        }
        let verifier: Box<dyn Verifier> = if alg.is_hmac() {
            Box::new(hmac::HmacVerifier::new(alg, jwk)?)
        } else if alg.is_rsassa_pkcs1() {
            Box::new(rsa::RsaPkcs1Verifier::new(alg, jwk)?)
        } else if alg.is_rsassa_pss() {
            Box::new(rsa::RsaPssVerifier::new(alg, jwk)?)
        } else if alg.is_ecdsa() {
            Box::new(ecdsa::EcdsaVerifier::new(alg, jwk)?)
        } else {
            return Err(Error::UnsupportedAlgorithm(alg.name().to_string()));
        };
        Ok(Some(verifier))
    }
}
