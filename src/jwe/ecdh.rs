//! ECDH-ES (RFC 7518 §4.6): P-256/384/521 ephemeral-static agreement plus
//! the Concat KDF (NIST SP 800-56A) used to turn the shared secret into a
//! key of the required length.

use openssl::derive::Deriver;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::{Hasher, MessageDigest};
use openssl::pkey::{PKey, Private, Public};

use crate::alg::Curve;
use crate::error::JoseResult;
use crate::jwk::Jwk;

/// Generate a fresh ephemeral EC key pair on `curve`.
pub fn generate_ephemeral(curve: Curve) -> JoseResult<EcKey<Private>> {
    let group = EcGroup::from_curve_name(curve.openssl_nid())?;
    Ok(EcKey::generate(&group)?)
}

pub fn ephemeral_to_jwk(curve: Curve, key: &EcKey<Private>) -> JoseResult<Jwk> {
    let mut ctx = openssl::bn::BigNumContext::new()?;
    let mut x = openssl::bn::BigNum::new()?;
    let mut y = openssl::bn::BigNum::new()?;
    let group = EcGroup::from_curve_name(curve.openssl_nid())?;
    key.public_key().affine_coordinates_gfp(&group, &mut x, &mut y, &mut ctx)?;

    let width = curve.coordinate_size();
    let mut x_bytes = vec![0u8; width];
    let x_raw = x.to_vec();
    x_bytes[width - x_raw.len()..].copy_from_slice(&x_raw);
    let mut y_bytes = vec![0u8; width];
    let y_raw = y.to_vec();
    y_bytes[width - y_raw.len()..].copy_from_slice(&y_raw);

    let mut obj = serde_json::Map::new();
    obj.insert("kty".into(), serde_json::Value::String("EC".into()));
    obj.insert("crv".into(), serde_json::Value::String(curve.to_string()));
    obj.insert("x".into(), serde_json::Value::String(crate::base64url::encode(x_bytes)));
    obj.insert("y".into(), serde_json::Value::String(crate::base64url::encode(y_bytes)));
    Jwk::from_json(&obj)
}

/// Compute the raw ECDH shared secret (the X coordinate of `priv * pub`).
pub fn shared_secret(private: &EcKey<Private>, public: &EcKey<Public>) -> JoseResult<Vec<u8>> {
    let priv_pkey = PKey::from_ec_key(private.clone())?;
    let pub_pkey = PKey::from_ec_key(public.clone())?;
    let mut deriver = Deriver::new(&priv_pkey)?;
    deriver.set_peer(&pub_pkey)?;
    Ok(deriver.derive_to_vec()?)
}

fn be_u32(v: u32) -> [u8; 4] {
    v.to_be_bytes()
}

/// NIST SP 800-56A Concat KDF with SHA-256, as mandated by RFC 7518 §4.6.2.
/// `other_info = AlgorithmID || PartyUInfo || PartyVInfo || SuppPubInfo`,
/// each length-prefixed per the RFC except `SuppPubInfo` which is the raw
/// 32-bit big-endian bit length of the desired key.
pub fn concat_kdf(shared_secret: &[u8], alg_id: &[u8], apu: &[u8], apv: &[u8], key_len: usize) -> JoseResult<Vec<u8>> {
    let mut other_info = Vec::new();
    other_info.extend_from_slice(&be_u32(alg_id.len() as u32));
    other_info.extend_from_slice(alg_id);
    other_info.extend_from_slice(&be_u32(apu.len() as u32));
    other_info.extend_from_slice(apu);
    other_info.extend_from_slice(&be_u32(apv.len() as u32));
    other_info.extend_from_slice(apv);
    other_info.extend_from_slice(&be_u32((key_len * 8) as u32));

    let digest = MessageDigest::sha256();
    let hash_len = digest.size();
    let reps = (key_len + hash_len - 1) / hash_len;

    let mut out = Vec::with_capacity(reps * hash_len);
    for counter in 1..=reps as u32 {
        let mut hasher = Hasher::new(digest)?;
        hasher.update(&be_u32(counter))?;
        hasher.update(shared_secret)?;
        hasher.update(&other_info)?;
        out.extend_from_slice(&hasher.finish()?);
    }
    out.truncate(key_len);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_kdf_is_deterministic_and_sized() {
        let a = concat_kdf(b"shared-secret-bytes", b"A256GCM", b"", b"", 32).unwrap();
        let b = concat_kdf(b"shared-secret-bytes", b"A256GCM", b"", b"", 32).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn concat_kdf_differs_by_algorithm_id() {
        let a = concat_kdf(b"shared-secret-bytes", b"A128GCM", b"", b"", 16).unwrap();
        let b = concat_kdf(b"shared-secret-bytes", b"A256GCM", b"", b"", 16).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn ecdh_shared_secret_agrees_both_ways() {
        let group = EcGroup::from_curve_name(Curve::P256.openssl_nid()).unwrap();
        let alice = EcKey::generate(&group).unwrap();
        let bob = EcKey::generate(&group).unwrap();

        let alice_priv = alice.clone();
        let bob_pub = EcKey::from_public_key(&group, bob.public_key()).unwrap();
        let bob_priv = bob.clone();
        let alice_pub = EcKey::from_public_key(&group, alice.public_key()).unwrap();

        let s1 = shared_secret(&alice_priv, &bob_pub).unwrap();
        let s2 = shared_secret(&bob_priv, &alice_pub).unwrap();
        assert_eq!(s1, s2);
    }
}
