//! Algorithm identifiers: JWS signature algorithms, JWE key-management
//! algorithms, content-encryption methods, and the key types they pair with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, JoseResult};

/// IANA "implementation requirement" tag, carried alongside each algorithm
/// identifier for documentation purposes; it has no runtime effect beyond
/// what callers choose to do with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Recommended,
    Optional,
}

/// Key type family a JWK/algorithm belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "RSA")]
    Rsa,
    #[serde(rename = "EC")]
    Ec,
    #[serde(rename = "OKP")]
    Okp,
    #[serde(rename = "oct")]
    Octet,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KeyType::Rsa => "RSA",
            KeyType::Ec => "EC",
            KeyType::Okp => "OKP",
            KeyType::Octet => "oct",
        };
        write!(f, "{s}")
    }
}

/// EC curve, used by both JWS (ES*) and JWE (ECDH-ES) algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Curve {
    #[serde(rename = "P-256")]
    P256,
    #[serde(rename = "P-384")]
    P384,
    #[serde(rename = "P-521")]
    P521,
}

impl Curve {
    /// Fixed width, in bytes, of each of `r`/`s` (JWS) or `x`/`y`/`d` (JWK).
    pub fn coordinate_size(self) -> usize {
        match self {
            Curve::P256 => 32,
            Curve::P384 => 48,
            Curve::P521 => 66,
        }
    }

    pub fn openssl_nid(self) -> openssl::nid::Nid {
        match self {
            Curve::P256 => openssl::nid::Nid::X9_62_PRIME256V1,
            Curve::P384 => openssl::nid::Nid::SECP384R1,
            Curve::P521 => openssl::nid::Nid::SECP521R1,
        }
    }
}

impl FromStr for Curve {
    type Err = Error;
    fn from_str(s: &str) -> JoseResult<Self> {
        match s {
            "P-256" => Ok(Curve::P256),
            "P-384" => Ok(Curve::P384),
            "P-521" => Ok(Curve::P521),
            other => Err(Error::UnsupportedAlgorithm(format!("curve {other}"))),
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Curve::P256 => "P-256",
            Curve::P384 => "P-384",
            Curve::P521 => "P-521",
        };
        write!(f, "{s}")
    }
}

/// JWS signature algorithm (`alg` header value on a signed object), plus the
/// sentinel `none` shared with unsecured objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JwsAlgorithm {
    None,
    Hs256,
    Hs384,
    Hs512,
    Rs256,
    Rs384,
    Rs512,
    Ps256,
    Ps384,
    Ps512,
    Es256,
    Es384,
    Es512,
}

impl JwsAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            JwsAlgorithm::None => "none",
            JwsAlgorithm::Hs256 => "HS256",
            JwsAlgorithm::Hs384 => "HS384",
            JwsAlgorithm::Hs512 => "HS512",
            JwsAlgorithm::Rs256 => "RS256",
            JwsAlgorithm::Rs384 => "RS384",
            JwsAlgorithm::Rs512 => "RS512",
            JwsAlgorithm::Ps256 => "PS256",
            JwsAlgorithm::Ps384 => "PS384",
            JwsAlgorithm::Ps512 => "PS512",
            JwsAlgorithm::Es256 => "ES256",
            JwsAlgorithm::Es384 => "ES384",
            JwsAlgorithm::Es512 => "ES512",
        }
    }

    pub fn requirement(self) -> Requirement {
        use JwsAlgorithm::*;
        match self {
            None | Hs256 | Rs256 => Requirement::Required,
            Es256 => Requirement::Recommended,
            Hs384 | Hs512 | Rs384 | Rs512 | Ps256 | Ps384 | Ps512 | Es384 | Es512 => {
                Requirement::Optional
            }
        }
    }

    /// Key type expected for this algorithm's signer/verifier key.
    pub fn key_type(self) -> Option<KeyType> {
        use JwsAlgorithm::*;
        match self {
            None => Option::None,
            Hs256 | Hs384 | Hs512 => Some(KeyType::Octet),
            Rs256 | Rs384 | Rs512 | Ps256 | Ps384 | Ps512 => Some(KeyType::Rsa),
            Es256 | Es384 | Es512 => Some(KeyType::Ec),
        }
    }

    pub fn curve(self) -> Option<Curve> {
        match self {
            JwsAlgorithm::Es256 => Some(Curve::P256),
            JwsAlgorithm::Es384 => Some(Curve::P384),
            JwsAlgorithm::Es512 => Some(Curve::P521),
            _ => Option::None,
        }
    }

    /// Minimum symmetric key length, in bytes, this algorithm's HMAC
    /// requires (the underlying hash's output length).
    pub fn min_hmac_key_len(self) -> Option<usize> {
        match self {
            JwsAlgorithm::Hs256 => Some(32),
            JwsAlgorithm::Hs384 => Some(48),
            JwsAlgorithm::Hs512 => Some(64),
            _ => Option::None,
        }
    }

    pub fn is_hmac(self) -> bool {
        matches!(self, JwsAlgorithm::Hs256 | JwsAlgorithm::Hs384 | JwsAlgorithm::Hs512)
    }

    pub fn is_rsassa_pkcs1(self) -> bool {
        matches!(self, JwsAlgorithm::Rs256 | JwsAlgorithm::Rs384 | JwsAlgorithm::Rs512)
    }

    pub fn is_rsassa_pss(self) -> bool {
        matches!(self, JwsAlgorithm::Ps256 | JwsAlgorithm::Ps384 | JwsAlgorithm::Ps512)
    }

    pub fn is_ecdsa(self) -> bool {
        matches!(self, JwsAlgorithm::Es256 | JwsAlgorithm::Es384 | JwsAlgorithm::Es512)
    }

    /// The message digest this algorithm's primitive hashes with. `None`
    /// for `none` itself.
    pub fn digest(self) -> Option<openssl::hash::MessageDigest> {
        use JwsAlgorithm::*;
        use openssl::hash::MessageDigest;
        match self {
            None => Option::None,
            Hs256 | Rs256 | Ps256 | Es256 => Some(MessageDigest::sha256()),
            Hs384 | Rs384 | Ps384 | Es384 => Some(MessageDigest::sha384()),
            Hs512 | Rs512 | Ps512 | Es512 => Some(MessageDigest::sha512()),
        }
    }
}

impl FromStr for JwsAlgorithm {
    type Err = Error;
    fn from_str(s: &str) -> JoseResult<Self> {
        use JwsAlgorithm::*;
        Ok(match s {
            "none" => None,
            "HS256" => Hs256,
            "HS384" => Hs384,
            "HS512" => Hs512,
            "RS256" => Rs256,
            "RS384" => Rs384,
            "RS512" => Rs512,
            "PS256" => Ps256,
            "PS384" => Ps384,
            "PS512" => Ps512,
            "ES256" => Es256,
            "ES384" => Es384,
            "ES512" => Es512,
            other => return Err(Error::UnsupportedAlgorithm(other.to_string())),
        })
    }
}

/// JWE key-management algorithm (`alg` header value on an encrypted object).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JweAlgorithm {
    Rsa1_5,
    RsaOaep,
    RsaOaep256,
    A128Kw,
    A192Kw,
    A256Kw,
    A128GcmKw,
    A192GcmKw,
    A256GcmKw,
    Dir,
    EcdhEs,
    EcdhEsA128Kw,
    EcdhEsA192Kw,
    EcdhEsA256Kw,
    Pbes2Hs256A128Kw,
    Pbes2Hs384A192Kw,
    Pbes2Hs512A256Kw,
}

impl JweAlgorithm {
    pub fn name(self) -> &'static str {
        use JweAlgorithm::*;
        match self {
            Rsa1_5 => "RSA1_5",
            RsaOaep => "RSA-OAEP",
            RsaOaep256 => "RSA-OAEP-256",
            A128Kw => "A128KW",
            A192Kw => "A192KW",
            A256Kw => "A256KW",
            A128GcmKw => "A128GCMKW",
            A192GcmKw => "A192GCMKW",
            A256GcmKw => "A256GCMKW",
            Dir => "dir",
            EcdhEs => "ECDH-ES",
            EcdhEsA128Kw => "ECDH-ES+A128KW",
            EcdhEsA192Kw => "ECDH-ES+A192KW",
            EcdhEsA256Kw => "ECDH-ES+A256KW",
            Pbes2Hs256A128Kw => "PBES2-HS256+A128KW",
            Pbes2Hs384A192Kw => "PBES2-HS384+A192KW",
            Pbes2Hs512A256Kw => "PBES2-HS512+A256KW",
        }
    }

    pub fn key_type(self) -> KeyType {
        use JweAlgorithm::*;
        match self {
            Rsa1_5 | RsaOaep | RsaOaep256 => KeyType::Rsa,
            A128Kw | A192Kw | A256Kw | A128GcmKw | A192GcmKw | A256GcmKw | Dir => KeyType::Octet,
            EcdhEs | EcdhEsA128Kw | EcdhEsA192Kw | EcdhEsA256Kw => KeyType::Ec,
            Pbes2Hs256A128Kw | Pbes2Hs384A192Kw | Pbes2Hs512A256Kw => KeyType::Octet,
        }
    }

    pub fn is_direct(self) -> bool {
        matches!(self, JweAlgorithm::Dir)
    }

    pub fn is_ecdh(self) -> bool {
        matches!(
            self,
            JweAlgorithm::EcdhEs
                | JweAlgorithm::EcdhEsA128Kw
                | JweAlgorithm::EcdhEsA192Kw
                | JweAlgorithm::EcdhEsA256Kw
        )
    }

    /// Key-wrap width in bytes for ECDH-ES+AxxxKW and AxxxKW algorithms.
    pub fn wrap_key_len(self) -> Option<usize> {
        use JweAlgorithm::*;
        match self {
            A128Kw | A128GcmKw | EcdhEsA128Kw | Pbes2Hs256A128Kw => Some(16),
            A192Kw | A192GcmKw | EcdhEsA192Kw | Pbes2Hs384A192Kw => Some(24),
            A256Kw | A256GcmKw | EcdhEsA256Kw | Pbes2Hs512A256Kw => Some(32),
            _ => Option::None,
        }
    }
}

impl FromStr for JweAlgorithm {
    type Err = Error;
    fn from_str(s: &str) -> JoseResult<Self> {
        use JweAlgorithm::*;
        Ok(match s {
            "RSA1_5" => Rsa1_5,
            "RSA-OAEP" => RsaOaep,
            "RSA-OAEP-256" => RsaOaep256,
            "A128KW" => A128Kw,
            "A192KW" => A192Kw,
            "A256KW" => A256Kw,
            "A128GCMKW" => A128GcmKw,
            "A192GCMKW" => A192GcmKw,
            "A256GCMKW" => A256GcmKw,
            "dir" => Dir,
            "ECDH-ES" => EcdhEs,
            "ECDH-ES+A128KW" => EcdhEsA128Kw,
            "ECDH-ES+A192KW" => EcdhEsA192Kw,
            "ECDH-ES+A256KW" => EcdhEsA256Kw,
            "PBES2-HS256+A128KW" => Pbes2Hs256A128Kw,
            "PBES2-HS384+A192KW" => Pbes2Hs384A192Kw,
            "PBES2-HS512+A256KW" => Pbes2Hs512A256Kw,
            other => return Err(Error::UnsupportedAlgorithm(other.to_string())),
        })
    }
}

/// JWE content-encryption method (`enc` header value).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EncryptionMethod {
    A128CbcHs256,
    A192CbcHs384,
    A256CbcHs512,
    A128Gcm,
    A192Gcm,
    A256Gcm,
}

impl EncryptionMethod {
    pub fn name(self) -> &'static str {
        use EncryptionMethod::*;
        match self {
            A128CbcHs256 => "A128CBC-HS256",
            A192CbcHs384 => "A192CBC-HS384",
            A256CbcHs512 => "A256CBC-HS512",
            A128Gcm => "A128GCM",
            A192Gcm => "A192GCM",
            A256Gcm => "A256GCM",
        }
    }

    /// Content-encryption key length in bytes. For CBC-HMAC methods this is
    /// the combined MAC+ENC key length (RFC 7518 §5.2).
    pub fn cek_len(self) -> usize {
        use EncryptionMethod::*;
        match self {
            A128CbcHs256 => 32,
            A192CbcHs384 => 48,
            A256CbcHs512 => 64,
            A128Gcm => 16,
            A192Gcm => 24,
            A256Gcm => 32,
        }
    }

    pub fn is_gcm(self) -> bool {
        matches!(self, EncryptionMethod::A128Gcm | EncryptionMethod::A192Gcm | EncryptionMethod::A256Gcm)
    }

    pub fn iv_len(self) -> usize {
        if self.is_gcm() {
            12
        } else {
            16
        }
    }
}

impl FromStr for EncryptionMethod {
    type Err = Error;
    fn from_str(s: &str) -> JoseResult<Self> {
        use EncryptionMethod::*;
        Ok(match s {
            "A128CBC-HS256" => A128CbcHs256,
            "A192CBC-HS384" => A192CbcHs384,
            "A256CBC-HS512" => A256CbcHs512,
            "A128GCM" => A128Gcm,
            "A192GCM" => A192Gcm,
            "A256GCM" => A256Gcm,
            other => return Err(Error::UnsupportedAlgorithm(other.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jws_algorithm_round_trips_name() {
        for alg in [
            JwsAlgorithm::Hs256,
            JwsAlgorithm::Rs512,
            JwsAlgorithm::Ps384,
            JwsAlgorithm::Es512,
        ] {
            assert_eq!(JwsAlgorithm::from_str(alg.name()).unwrap(), alg);
        }
    }

    #[test]
    fn jwe_algorithm_reports_key_type() {
        assert_eq!(JweAlgorithm::A128Kw.key_type(), KeyType::Octet);
        assert_eq!(JweAlgorithm::RsaOaep256.key_type(), KeyType::Rsa);
        assert_eq!(JweAlgorithm::EcdhEs.key_type(), KeyType::Ec);
    }

    #[test]
    fn unknown_algorithm_is_unsupported() {
        assert!(matches!(
            JwsAlgorithm::from_str("HS1"),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }
}
