//! JWK and JWK set value model (RFC 7517).
//!
//! A [`Jwk`] is a typed key descriptor; conversion to a platform-native
//! OpenSSL key object is capability-gated per JWK kind — asking an RSA JWK
//! for an EC key, for instance, is a [`Error::KeyTypeMismatch`], not a panic.

use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey, EcPoint};
use openssl::pkey::{Private, Public};
use openssl::rsa::Rsa;
use serde_json::{Map, Value};

use crate::alg::{Curve, KeyType};
use crate::base64url;
use crate::error::{Error, JoseResult};
use crate::json;

/// Intended use of a JWK (`use` header parameter; `key_ops` is preserved
/// verbatim in `raw` but not separately modeled here).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyUse {
    Signing,
    Encryption,
}

impl KeyUse {
    fn as_str(self) -> &'static str {
        match self {
            KeyUse::Signing => "sig",
            KeyUse::Encryption => "enc",
        }
    }

    fn parse(s: &str) -> JoseResult<Self> {
        match s {
            "sig" => Ok(KeyUse::Signing),
            "enc" => Ok(KeyUse::Encryption),
            other => Err(Error::malformed(format!("unrecognized JWK 'use': {other}"))),
        }
    }
}

/// The type-specific key material carried by a JWK.
#[derive(Clone)]
pub enum KeyMaterial {
    RsaPublic {
        n: Vec<u8>,
        e: Vec<u8>,
    },
    RsaPrivate {
        n: Vec<u8>,
        e: Vec<u8>,
        d: Vec<u8>,
        p: Option<Vec<u8>>,
        q: Option<Vec<u8>>,
        dp: Option<Vec<u8>>,
        dq: Option<Vec<u8>>,
        qi: Option<Vec<u8>>,
    },
    EcPublic {
        crv: Curve,
        x: Vec<u8>,
        y: Vec<u8>,
    },
    EcPrivate {
        crv: Curve,
        x: Vec<u8>,
        y: Vec<u8>,
        d: Vec<u8>,
    },
    OkpPublic {
        crv: String,
        x: Vec<u8>,
    },
    OkpPrivate {
        crv: String,
        x: Vec<u8>,
        d: Vec<u8>,
    },
    Symmetric {
        k: Vec<u8>,
    },
}

/// A single JSON Web Key (RFC 7517 §4).
#[derive(Clone)]
pub struct Jwk {
    pub kty: KeyType,
    pub key_use: Option<KeyUse>,
    pub algorithm: Option<String>,
    pub kid: Option<String>,
    pub material: KeyMaterial,
    /// The full source JSON object, preserved for lossless round trip of
    /// parameters (`key_ops`, `x5c`, ...) this model doesn't interpret.
    raw: Map<String, Value>,
}

impl Jwk {
    /// Parse a single JWK from a JSON object.
    pub fn from_json(obj: &Map<String, Value>) -> JoseResult<Self> {
        let kty_str = json::get_str(obj, "kty")?.ok_or_else(|| Error::malformed("JWK missing 'kty'"))?;
        let kty = match kty_str {
            "RSA" => KeyType::Rsa,
            "EC" => KeyType::Ec,
            "OKP" => KeyType::Okp,
            "oct" => KeyType::Octet,
            other => return Err(Error::UnsupportedAlgorithm(format!("JWK kty {other}"))),
        };
        let key_use = json::get_str(obj, "use")?.map(KeyUse::parse).transpose()?;
        let algorithm = json::get_str(obj, "alg")?.map(str::to_string);
        let kid = json::get_str(obj, "kid")?.map(str::to_string);

        let material = match kty {
            KeyType::Rsa => {
                let n = req_bytes(obj, "n")?;
                let e = req_bytes(obj, "e")?;
                match opt_bytes(obj, "d")? {
                    None => KeyMaterial::RsaPublic { n, e },
                    Some(d) => KeyMaterial::RsaPrivate {
                        n,
                        e,
                        d,
                        p: opt_bytes(obj, "p")?,
                        q: opt_bytes(obj, "q")?,
                        dp: opt_bytes(obj, "dp")?,
                        dq: opt_bytes(obj, "dq")?,
                        qi: opt_bytes(obj, "qi")?,
                    },
                }
            }
            KeyType::Ec => {
                let crv: Curve = json::get_str(obj, "crv")?
                    .ok_or_else(|| Error::malformed("EC JWK missing 'crv'"))?
                    .parse()?;
                let x = req_bytes(obj, "x")?;
                let y = req_bytes(obj, "y")?;
                match opt_bytes(obj, "d")? {
                    None => KeyMaterial::EcPublic { crv, x, y },
                    Some(d) => KeyMaterial::EcPrivate { crv, x, y, d },
                }
            }
            KeyType::Okp => {
                let crv = json::get_str(obj, "crv")?
                    .ok_or_else(|| Error::malformed("OKP JWK missing 'crv'"))?
                    .to_string();
                let x = req_bytes(obj, "x")?;
                match opt_bytes(obj, "d")? {
                    None => KeyMaterial::OkpPublic { crv, x },
                    Some(d) => KeyMaterial::OkpPrivate { crv, x, d },
                }
            }
            KeyType::Octet => KeyMaterial::Symmetric { k: req_bytes(obj, "k")? },
        };

        Ok(Jwk {
            kty,
            key_use,
            algorithm,
            kid,
            material,
            raw: obj.clone(),
        })
    }

    /// Wrap raw symmetric key bytes as a single-purpose JWK. Sugar for the
    /// "immutable secret source" construction path (§4.8).
    pub fn from_symmetric_secret(secret: impl Into<Vec<u8>>) -> Self {
        let k = secret.into();
        let mut raw = Map::new();
        raw.insert("kty".into(), Value::String("oct".into()));
        raw.insert("k".into(), Value::String(base64url::encode(&k)));
        Jwk {
            kty: KeyType::Octet,
            key_use: None,
            algorithm: None,
            kid: None,
            material: KeyMaterial::Symmetric { k },
            raw,
        }
    }

    /// Reconstruct the full JSON representation, preserving any parameters
    /// this model did not interpret.
    pub fn to_json(&self) -> Map<String, Value> {
        self.raw.clone()
    }

    pub fn symmetric_bytes(&self) -> JoseResult<&[u8]> {
        match &self.material {
            KeyMaterial::Symmetric { k } => Ok(k),
            other => Err(mismatch("oct", other)),
        }
    }

    pub fn rsa_public_key(&self) -> JoseResult<Rsa<Public>> {
        match &self.material {
            KeyMaterial::RsaPublic { n, e } | KeyMaterial::RsaPrivate { n, e, .. } => {
                Ok(Rsa::from_public_components(bn(n)?, bn(e)?)?)
            }
            other => Err(mismatch("RSA", other)),
        }
    }

    pub fn rsa_private_key(&self) -> JoseResult<Rsa<Private>> {
        match &self.material {
            KeyMaterial::RsaPrivate { n, e, d, p, q, dp, dq, qi } => match (p, q, dp, dq, qi) {
                (Some(p), Some(q), Some(dp), Some(dq), Some(qi)) => Ok(Rsa::from_private_components(
                    bn(n)?,
                    bn(e)?,
                    bn(d)?,
                    bn(p)?,
                    bn(q)?,
                    bn(dp)?,
                    bn(dq)?,
                    bn(qi)?,
                )?),
                _ => Err(Error::malformed(
                    "RSA private JWK missing CRT parameters (p, q, dp, dq, qi)",
                )),
            },
            other => Err(mismatch("RSA private", other)),
        }
    }

    pub fn ec_public_key(&self) -> JoseResult<EcKey<Public>> {
        match &self.material {
            KeyMaterial::EcPublic { crv, x, y } | KeyMaterial::EcPrivate { crv, x, y, .. } => {
                ec_public_from_coords(*crv, x, y)
            }
            other => Err(mismatch("EC", other)),
        }
    }

    pub fn ec_private_key(&self) -> JoseResult<EcKey<Private>> {
        match &self.material {
            KeyMaterial::EcPrivate { crv, d, .. } => {
                let group = EcGroup::from_curve_name(crv.openssl_nid())?;
                let d_bn = BigNum::from_slice(d)?;
                let pub_point = {
                    let mut ctx = openssl::bn::BigNumContext::new()?;
                    let mut point = EcPoint::new(&group)?;
                    point.mul_generator(&group, &d_bn, &mut ctx)?;
                    point
                };
                Ok(EcKey::from_private_components(&group, &d_bn, &pub_point)?)
            }
            other => Err(mismatch("EC private", other)),
        }
    }

    pub fn curve(&self) -> Option<Curve> {
        match &self.material {
            KeyMaterial::EcPublic { crv, .. } | KeyMaterial::EcPrivate { crv, .. } => Some(*crv),
            _ => None,
        }
    }
}

fn mismatch(want: &str, have: &KeyMaterial) -> Error {
    let have = match have {
        KeyMaterial::RsaPublic { .. } => "RSA public",
        KeyMaterial::RsaPrivate { .. } => "RSA private",
        KeyMaterial::EcPublic { .. } => "EC public",
        KeyMaterial::EcPrivate { .. } => "EC private",
        KeyMaterial::OkpPublic { .. } => "OKP public",
        KeyMaterial::OkpPrivate { .. } => "OKP private",
        KeyMaterial::Symmetric { .. } => "oct",
    };
    Error::KeyTypeMismatch {
        alg: want.to_string(),
        key_type: have.to_string(),
    }
}

fn bn(bytes: &[u8]) -> JoseResult<BigNum> {
    Ok(BigNum::from_slice(bytes)?)
}

fn req_bytes(obj: &Map<String, Value>, name: &str) -> JoseResult<Vec<u8>> {
    let s = json::get_str(obj, name)?.ok_or_else(|| Error::malformed(format!("JWK missing '{name}'")))?;
    base64url::decode(s)
}

fn opt_bytes(obj: &Map<String, Value>, name: &str) -> JoseResult<Option<Vec<u8>>> {
    match json::get_str(obj, name)? {
        Some(s) => Ok(Some(base64url::decode(s)?)),
        None => Ok(None),
    }
}

fn ec_public_from_coords(crv: Curve, x: &[u8], y: &[u8]) -> JoseResult<EcKey<Public>> {
    let group = EcGroup::from_curve_name(crv.openssl_nid())?;
    let mut ctx = openssl::bn::BigNumContext::new()?;
    let mut sec1 = vec![0x04u8];
    sec1.extend_from_slice(x);
    sec1.extend_from_slice(y);
    let point = EcPoint::from_bytes(&group, &sec1, &mut ctx)?;
    Ok(EcKey::from_public_key(&group, &point)?)
}

/// Criteria a JWK must satisfy to be a verification/decryption candidate.
/// Matching is conjunctive over the fields that are `Some`.
#[derive(Clone, Debug, Default)]
pub struct JwkMatcher {
    pub kid: Option<String>,
    pub key_type: Option<KeyType>,
    pub algorithm: Option<String>,
    pub key_use: Option<KeyUse>,
}

impl JwkMatcher {
    pub fn matches(&self, jwk: &Jwk) -> bool {
        if let Some(kid) = &self.kid {
            if jwk.kid.as_deref() != Some(kid.as_str()) {
                return false;
            }
        }
        if let Some(kty) = self.key_type {
            if jwk.kty != kty {
                return false;
            }
        }
        if let Some(alg) = &self.algorithm {
            if let Some(jwk_alg) = &jwk.algorithm {
                if jwk_alg != alg {
                    return false;
                }
            }
        }
        if let Some(wanted_use) = self.key_use {
            if let Some(jwk_use) = jwk.key_use {
                if jwk_use != wanted_use {
                    return false;
                }
            }
        }
        true
    }
}

/// An ordered collection of JWKs (RFC 7517 §5).
#[derive(Clone)]
pub struct JwkSet {
    keys: Vec<Jwk>,
}

impl JwkSet {
    pub fn new(keys: Vec<Jwk>) -> Self {
        JwkSet { keys }
    }

    pub fn empty() -> Self {
        JwkSet { keys: Vec::new() }
    }

    pub fn from_json(bytes: &[u8]) -> JoseResult<Self> {
        let obj = json::parse_object(bytes)?;
        let arr = match obj.get("keys") {
            Some(Value::Array(items)) => items,
            _ => return Err(Error::malformed("JWK set missing 'keys' array")),
        };
        let mut out = Vec::with_capacity(arr.len());
        for item in arr {
            let obj = item
                .as_object()
                .ok_or_else(|| Error::malformed("JWK set entry must be an object"))?;
            out.push(Jwk::from_json(obj)?);
        }
        Ok(JwkSet::new(out))
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn keys(&self) -> &[Jwk] {
        &self.keys
    }

    /// Primary lookup by `kid`.
    pub fn find_by_kid(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }

    /// Secondary lookup over (key type, algorithm, use), in declaration
    /// order.
    pub fn select(&self, matcher: &JwkMatcher) -> Vec<&Jwk> {
        self.keys.iter().filter(|k| matcher.matches(k)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn symmetric_jwk_round_trips_bytes() {
        let jwk = Jwk::from_symmetric_secret(b"super-secret-key".to_vec());
        assert_eq!(jwk.symmetric_bytes().unwrap(), b"super-secret-key");
    }

    #[test]
    fn rsa_public_mismatch_on_ec_request() {
        let jwk = Jwk::from_symmetric_secret(b"0123456789abcdef".to_vec());
        assert!(matches!(jwk.ec_public_key(), Err(Error::KeyTypeMismatch { .. })));
    }

    #[test]
    fn jwk_set_selects_by_kid() {
        let doc = json!({
            "keys": [
                {"kty": "oct", "kid": "1", "k": base64url::encode(b"key-one-32-bytes-long-enough!!!!")},
                {"kty": "oct", "kid": "2", "k": base64url::encode(b"key-two-32-bytes-long-enough!!!!")},
            ]
        });
        let set = JwkSet::from_json(serde_json::to_vec(&doc).unwrap().as_slice()).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.find_by_kid("2").is_some());
        let matched = set.select(&JwkMatcher {
            kid: Some("1".into()),
            ..Default::default()
        });
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].kid.as_deref(), Some("1"));
    }
}
