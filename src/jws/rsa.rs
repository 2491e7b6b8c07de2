//! RSASSA-PKCS1-v1_5 (RS256/384/512) and RSASSA-PSS (PS256/384/512).

use openssl::pkey::{PKey, Private, Public};
use openssl::rsa::Padding;
use openssl::sign::{RsaPssSaltlen, Signer as OsslSigner, Verifier as OsslVerifier};

use super::{Signer, Verifier};
use crate::alg::JwsAlgorithm;
use crate::error::{Error, JoseResult};
use crate::header::Header;
use crate::jwk::Jwk;

fn digest(alg: JwsAlgorithm) -> JoseResult<openssl::hash::MessageDigest> {
    alg.digest().ok_or_else(|| Error::UnsupportedAlgorithm(alg.name().to_string()))
}

pub struct RsaPkcs1Signer {
    alg: JwsAlgorithm,
    key: PKey<Private>,
}

impl RsaPkcs1Signer {
    pub fn new(alg: JwsAlgorithm, jwk: &Jwk) -> JoseResult<Self> {
        Ok(RsaPkcs1Signer { alg, key: PKey::from_rsa(jwk.rsa_private_key()?)? })
    }
}

impl Signer for RsaPkcs1Signer {
    fn sign(&self, _header: &Header, signing_input: &[u8]) -> JoseResult<Vec<u8>> {
        let mut signer = OsslSigner::new(digest(self.alg)?, &self.key)?;
        signer.update(signing_input)?;
        Ok(signer.sign_to_vec()?)
    }
}

pub struct RsaPkcs1Verifier {
    alg: JwsAlgorithm,
    key: PKey<Public>,
}

impl RsaPkcs1Verifier {
    pub fn new(alg: JwsAlgorithm, jwk: &Jwk) -> JoseResult<Self> {
        Ok(RsaPkcs1Verifier { alg, key: PKey::from_rsa(jwk.rsa_public_key()?)? })
    }
}

impl Verifier for RsaPkcs1Verifier {
    fn verify(&self, _header: &Header, signing_input: &[u8], signature: &[u8]) -> JoseResult<bool> {
        let mut verifier = OsslVerifier::new(digest(self.alg)?, &self.key)?;
        verifier.update(signing_input)?;
        Ok(verifier.verify(signature).unwrap_or(false))
    }
}

pub struct RsaPssSigner {
    alg: JwsAlgorithm,
    key: PKey<Private>,
}

impl RsaPssSigner {
    pub fn new(alg: JwsAlgorithm, jwk: &Jwk) -> JoseResult<Self> {
        Ok(RsaPssSigner { alg, key: PKey::from_rsa(jwk.rsa_private_key()?)? })
    }
}

impl Signer for RsaPssSigner {
    fn sign(&self, _header: &Header, signing_input: &[u8]) -> JoseResult<Vec<u8>> {
        let d = digest(self.alg)?;
        let mut signer = OsslSigner::new(d, &self.key)?;
        signer.set_rsa_padding(Padding::PKCS1_PSS)?;
        signer.set_rsa_mgf1_md(d)?;
        signer.set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)?;
        signer.update(signing_input)?;
        Ok(signer.sign_to_vec()?)
    }
}

pub struct RsaPssVerifier {
    alg: JwsAlgorithm,
    key: PKey<Public>,
}

impl RsaPssVerifier {
    pub fn new(alg: JwsAlgorithm, jwk: &Jwk) -> JoseResult<Self> {
        Ok(RsaPssVerifier { alg, key: PKey::from_rsa(jwk.rsa_public_key()?)? })
    }
}

impl Verifier for RsaPssVerifier {
    fn verify(&self, _header: &Header, signing_input: &[u8], signature: &[u8]) -> JoseResult<bool> {
        let d = digest(self.alg)?;
        let mut verifier = OsslVerifier::new(d, &self.key)?;
        verifier.set_rsa_padding(Padding::PKCS1_PSS)?;
        verifier.set_rsa_mgf1_md(d)?;
        verifier.set_rsa_pss_saltlen(RsaPssSaltlen::DIGEST_LENGTH)?;
        verifier.update(signing_input)?;
        Ok(verifier.verify(signature).unwrap_or(false))
    }
}
