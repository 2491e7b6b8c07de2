//! ECDSA (ES256/384/512) with fixed-width r‖s signatures per RFC 7518 §3.4 —
//! no DER, no ASN.1 sequence, just the two coordinates left-zero-padded to
//! the curve's field size and concatenated.

use openssl::bn::BigNum;
use openssl::ecdsa::EcdsaSig;
use openssl::pkey::{Private, Public};

use super::{Signer, Verifier};
use crate::alg::{Curve, JwsAlgorithm};
use crate::error::{Error, JoseResult};
use crate::header::Header;
use crate::jwk::Jwk;

fn digest(alg: JwsAlgorithm) -> JoseResult<openssl::hash::MessageDigest> {
    alg.digest().ok_or_else(|| Error::UnsupportedAlgorithm(alg.name().to_string()))
}

fn curve_of(alg: JwsAlgorithm) -> JoseResult<Curve> {
    alg.curve().ok_or_else(|| Error::UnsupportedAlgorithm(alg.name().to_string()))
}

fn left_pad(bytes: &[u8], width: usize) -> Vec<u8> {
    if bytes.len() >= width {
        return bytes[bytes.len() - width..].to_vec();
    }
    let mut out = vec![0u8; width - bytes.len()];
    out.extend_from_slice(bytes);
    out
}

fn sig_to_fixed_width(sig: &EcdsaSig, width: usize) -> JoseResult<Vec<u8>> {
    let mut out = left_pad(&sig.r().to_vec(), width);
    out.extend_from_slice(&left_pad(&sig.s().to_vec(), width));
    Ok(out)
}

fn fixed_width_to_sig(bytes: &[u8], width: usize) -> JoseResult<EcdsaSig> {
    if bytes.len() != width * 2 {
        return Err(Error::malformed("ECDSA signature has unexpected length"));
    }
    let r = BigNum::from_slice(&bytes[..width])?;
    let s = BigNum::from_slice(&bytes[width..])?;
    Ok(EcdsaSig::from_private_components(r, s)?)
}

pub struct EcdsaSigner {
    alg: JwsAlgorithm,
    key: openssl::ec::EcKey<Private>,
}

impl EcdsaSigner {
    pub fn new(alg: JwsAlgorithm, jwk: &Jwk) -> JoseResult<Self> {
        Ok(EcdsaSigner { alg, key: jwk.ec_private_key()? })
    }
}

impl Signer for EcdsaSigner {
    fn sign(&self, _header: &Header, signing_input: &[u8]) -> JoseResult<Vec<u8>> {
        let hash = openssl::hash::hash(digest(self.alg)?, signing_input)?;
        let sig = EcdsaSig::sign(&hash, &self.key)?;
        sig_to_fixed_width(&sig, curve_of(self.alg)?.coordinate_size())
    }
}

pub struct EcdsaVerifier {
    alg: JwsAlgorithm,
    key: openssl::ec::EcKey<Public>,
}

impl EcdsaVerifier {
    pub fn new(alg: JwsAlgorithm, jwk: &Jwk) -> JoseResult<Self> {
        Ok(EcdsaVerifier { alg, key: jwk.ec_public_key()? })
    }
}

impl Verifier for EcdsaVerifier {
    fn verify(&self, _header: &Header, signing_input: &[u8], signature: &[u8]) -> JoseResult<bool> {
        let width = curve_of(self.alg)?.coordinate_size();
        let sig = match fixed_width_to_sig(signature, width) {
            Ok(sig) => sig,
            Err(_) => return Ok(false),
        };
        let hash = openssl::hash::hash(digest(self.alg)?, signing_input)?;
        Ok(sig.verify(&hash, &self.key).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::CommonParams;
    use openssl::ec::{EcGroup, EcKey};
    use serde_json::{Map, Value};

    fn ec_jwk_pair(curve: Curve) -> (Jwk, Jwk) {
        let group = EcGroup::from_curve_name(curve.openssl_nid()).unwrap();
        let key = EcKey::generate(&group).unwrap();

        let mut ctx = openssl::bn::BigNumContext::new().unwrap();
        let mut x = BigNum::new().unwrap();
        let mut y = BigNum::new().unwrap();
        key.public_key().affine_coordinates_gfp(&group, &mut x, &mut y, &mut ctx).unwrap();

        let width = curve.coordinate_size();
        let x_bytes = left_pad(&x.to_vec(), width);
        let y_bytes = left_pad(&y.to_vec(), width);
        let d_bytes = left_pad(&key.private_key().to_vec(), width);

        let mut priv_obj = Map::new();
        priv_obj.insert("kty".into(), Value::String("EC".into()));
        priv_obj.insert("crv".into(), Value::String(curve.to_string()));
        priv_obj.insert("x".into(), Value::String(crate::base64url::encode(x_bytes.clone())));
        priv_obj.insert("y".into(), Value::String(crate::base64url::encode(y_bytes.clone())));
        priv_obj.insert("d".into(), Value::String(crate::base64url::encode(d_bytes)));
        let private = Jwk::from_json(&priv_obj).unwrap();

        let mut pub_obj = Map::new();
        pub_obj.insert("kty".into(), Value::String("EC".into()));
        pub_obj.insert("crv".into(), Value::String(curve.to_string()));
        pub_obj.insert("x".into(), Value::String(crate::base64url::encode(x_bytes)));
        pub_obj.insert("y".into(), Value::String(crate::base64url::encode(y_bytes)));
        let public = Jwk::from_json(&pub_obj).unwrap();

        (private, public)
    }

    #[test]
    fn es256_sign_then_verify_round_trips() {
        let (priv_jwk, pub_jwk) = ec_jwk_pair(Curve::P256);
        let header = Header::new_jws(JwsAlgorithm::Es256, CommonParams::default());
        let signer = EcdsaSigner::new(JwsAlgorithm::Es256, &priv_jwk).unwrap();
        let sig = signer.sign(&header, b"payload").unwrap();
        assert_eq!(sig.len(), 64);

        let verifier = EcdsaVerifier::new(JwsAlgorithm::Es256, &pub_jwk).unwrap();
        assert!(verifier.verify(&header, b"payload", &sig).unwrap());
        assert!(!verifier.verify(&header, b"tampered", &sig).unwrap());
    }

    #[test]
    fn es384_signature_is_96_bytes() {
        let (priv_jwk, pub_jwk) = ec_jwk_pair(Curve::P384);
        let header = Header::new_jws(JwsAlgorithm::Es384, CommonParams::default());
        let signer = EcdsaSigner::new(JwsAlgorithm::Es384, &priv_jwk).unwrap();
        let sig = signer.sign(&header, b"payload").unwrap();
        assert_eq!(sig.len(), 96);

        let verifier = EcdsaVerifier::new(JwsAlgorithm::Es384, &pub_jwk).unwrap();
        assert!(verifier.verify(&header, b"payload", &sig).unwrap());
    }

    #[test]
    fn malformed_length_signature_fails_closed() {
        let (_, pub_jwk) = ec_jwk_pair(Curve::P256);
        let header = Header::new_jws(JwsAlgorithm::Es256, CommonParams::default());
        let verifier = EcdsaVerifier::new(JwsAlgorithm::Es256, &pub_jwk).unwrap();
        assert!(!verifier.verify(&header, b"payload", &[0u8; 10]).unwrap());
    }
}
