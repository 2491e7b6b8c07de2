//! JWE encrypter/decrypter SPI (§4.4) and the default factory that maps a
//! header's declared `alg`/`enc` pair and a candidate key to a primitive.

mod content;
mod ecdh;
mod kw;

use openssl::hash::MessageDigest;
use openssl::rand::rand_bytes;
use openssl::rsa::Padding;

use crate::alg::{Curve, EncryptionMethod, JweAlgorithm};
use crate::base64url;
use crate::error::{Error, JoseResult};
use crate::header::{Header, JweParams};
use crate::jwk::Jwk;

/// Encrypts a plaintext under a JWE header, returning the (possibly
/// parameter-amended) header alongside the four ciphertext segments.
pub trait Encrypter: Send + Sync {
    fn encrypt(&self, header: &Header, plaintext: &[u8]) -> JoseResult<(Header, Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>)>;
}

/// Decrypts the four ciphertext segments back to a plaintext. Implementations
/// MUST NOT distinguish "bad key" from "bad ciphertext" in their error: both
/// surface as `DecryptionFailed`.
pub trait Decrypter: Send + Sync {
    fn decrypt(&self, header: &Header, encrypted_key: &[u8], iv: &[u8], ciphertext: &[u8], tag: &[u8]) -> JoseResult<Vec<u8>>;
}

pub trait JweEncrypterFactory: Send + Sync {
    fn create_encrypter(&self, alg: JweAlgorithm, enc: EncryptionMethod, jwk: &Jwk) -> JoseResult<Box<dyn Encrypter>>;
}

/// Returning `Ok(None)` means "this key cannot plausibly back this
/// algorithm" — a skip, not an error.
pub trait JweDecrypterFactory: Send + Sync {
    fn create_decrypter(&self, alg: JweAlgorithm, enc: EncryptionMethod, jwk: &Jwk) -> JoseResult<Option<Box<dyn Decrypter>>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultJweFactory;

impl JweEncrypterFactory for DefaultJweFactory {
    fn create_encrypter(&self, alg: JweAlgorithm, enc: EncryptionMethod, jwk: &Jwk) -> JoseResult<Box<dyn Encrypter>> {
        Ok(Box::new(KeyManagement { alg, enc, jwk: jwk.clone() }))
    }
}

impl JweDecrypterFactory for DefaultJweFactory {
    fn create_decrypter(&self, alg: JweAlgorithm, enc: EncryptionMethod, jwk: &Jwk) -> JoseResult<Option<Box<dyn Decrypter>>> {
        if jwk.kty != alg.key_type() {
            return Ok(None);
        }
        Ok(Some(Box::new(KeyManagement { alg, enc, jwk: jwk.clone() })))
    }
}

fn pbes2_digest(alg: JweAlgorithm) -> MessageDigest {
    match alg {
        JweAlgorithm::Pbes2Hs256A128Kw => MessageDigest::sha256(),
        JweAlgorithm::Pbes2Hs384A192Kw => MessageDigest::sha384(),
        _ => MessageDigest::sha512(),
    }
}

const PBES2_ITERATIONS: u32 = 310_000;

/// One struct handles both directions for every `alg` family; the
/// factories above are what actually gate which keys are candidates.
struct KeyManagement {
    alg: JweAlgorithm,
    enc: EncryptionMethod,
    jwk: Jwk,
}

/// Header parameters a key-management step may need to fold back in.
#[derive(Default)]
struct HeaderPatch {
    epk: Option<Jwk>,
    iv: Option<Vec<u8>>,
    tag: Option<Vec<u8>>,
    p2s: Option<Vec<u8>>,
    p2c: Option<u32>,
}

impl HeaderPatch {
    fn apply(self, header: &Header) -> JoseResult<Header> {
        if self.epk.is_none() && self.iv.is_none() && self.tag.is_none() && self.p2s.is_none() && self.p2c.is_none() {
            return Ok(header.clone());
        }
        header.with_jwe_params_amended(|p: &mut JweParams| {
            if let Some(epk) = self.epk {
                p.epk = Some(epk);
            }
            if let Some(iv) = self.iv {
                p.iv = Some(base64url::encode(iv));
            }
            if let Some(tag) = self.tag {
                p.tag = Some(base64url::encode(tag));
            }
            if let Some(p2s) = self.p2s {
                p.p2s = Some(base64url::encode(p2s));
            }
            if let Some(p2c) = self.p2c {
                p.p2c = Some(p2c as i64);
            }
        })
    }
}

fn apu_apv(header: &Header) -> JoseResult<(Vec<u8>, Vec<u8>)> {
    let params = header.jwe_params().ok_or_else(|| Error::IllegalState("not a JWE header".into()))?;
    let apu = params.apu.as_deref().map(base64url::decode).transpose()?.unwrap_or_default();
    let apv = params.apv.as_deref().map(base64url::decode).transpose()?.unwrap_or_default();
    Ok((apu, apv))
}

impl KeyManagement {
    fn wrap_cek(&self) -> JoseResult<(Vec<u8>, Vec<u8>, HeaderPatch)> {
        use JweAlgorithm::*;
        match self.alg {
            Dir => {
                let cek = self.jwk.symmetric_bytes()?.to_vec();
                if cek.len() != self.enc.cek_len() {
                    return Err(Error::KeyTypeMismatch {
                        alg: self.alg.name().to_string(),
                        key_type: format!("{}-byte oct key (need {})", cek.len(), self.enc.cek_len()),
                    });
                }
                Ok((cek, Vec::new(), HeaderPatch::default()))
            }
            A128Kw | A192Kw | A256Kw => {
                let kek = self.jwk.symmetric_bytes()?;
                let mut cek = vec![0u8; self.enc.cek_len()];
                rand_bytes(&mut cek)?;
                let encrypted_key = kw::aes_kw_wrap(kek, &cek)?;
                Ok((cek, encrypted_key, HeaderPatch::default()))
            }
            A128GcmKw | A192GcmKw | A256GcmKw => {
                let kek = self.jwk.symmetric_bytes()?;
                let mut cek = vec![0u8; self.enc.cek_len()];
                rand_bytes(&mut cek)?;
                let (encrypted_key, iv, tag) = kw::aes_gcm_kw_wrap(kek, &cek)?;
                Ok((cek, encrypted_key, HeaderPatch { iv: Some(iv), tag: Some(tag), ..Default::default() }))
            }
            Rsa1_5 | RsaOaep | RsaOaep256 => {
                let (padding, digest) = rsa_padding(self.alg);
                let pubkey = self.jwk.rsa_public_key()?;
                let mut cek = vec![0u8; self.enc.cek_len()];
                rand_bytes(&mut cek)?;
                let encrypted_key = kw::rsa_wrap(padding, digest, &pubkey, &cek)?;
                Ok((cek, encrypted_key, HeaderPatch::default()))
            }
            EcdhEs => {
                let curve = self.jwk.curve().ok_or_else(|| Error::KeyTypeMismatch {
                    alg: self.alg.name().to_string(),
                    key_type: "non-EC key".into(),
                })?;
                let eph = ecdh::generate_ephemeral(curve)?;
                let peer = self.jwk.ec_public_key()?;
                let secret = ecdh::shared_secret(&eph, &peer)?;
                let cek = ecdh::concat_kdf(&secret, self.enc.name().as_bytes(), &[], &[], self.enc.cek_len())?;
                let epk = ecdh::ephemeral_to_jwk(curve, &eph)?;
                Ok((cek, Vec::new(), HeaderPatch { epk: Some(epk), ..Default::default() }))
            }
            EcdhEsA128Kw | EcdhEsA192Kw | EcdhEsA256Kw => {
                let curve = self.jwk.curve().ok_or_else(|| Error::KeyTypeMismatch {
                    alg: self.alg.name().to_string(),
                    key_type: "non-EC key".into(),
                })?;
                let wrap_len = self.alg.wrap_key_len().expect("ECDH+KW algorithms define a wrap length");
                let eph = ecdh::generate_ephemeral(curve)?;
                let peer = self.jwk.ec_public_key()?;
                let secret = ecdh::shared_secret(&eph, &peer)?;
                let kek = ecdh::concat_kdf(&secret, self.alg.name().as_bytes(), &[], &[], wrap_len)?;
                let mut cek = vec![0u8; self.enc.cek_len()];
                rand_bytes(&mut cek)?;
                let encrypted_key = kw::aes_kw_wrap(&kek, &cek)?;
                let epk = ecdh::ephemeral_to_jwk(curve, &eph)?;
                Ok((cek, encrypted_key, HeaderPatch { epk: Some(epk), ..Default::default() }))
            }
            Pbes2Hs256A128Kw | Pbes2Hs384A192Kw | Pbes2Hs512A256Kw => {
                let passphrase = self.jwk.symmetric_bytes()?;
                let wrap_len = self.alg.wrap_key_len().expect("PBES2 algorithms define a wrap length");
                let mut p2s = vec![0u8; 16];
                rand_bytes(&mut p2s)?;
                let kek = kw::pbes2_derive_kek(pbes2_digest(self.alg), wrap_len, passphrase, self.alg.name(), &p2s, PBES2_ITERATIONS)?;
                let mut cek = vec![0u8; self.enc.cek_len()];
                rand_bytes(&mut cek)?;
                let encrypted_key = kw::aes_kw_wrap(&kek, &cek)?;
                Ok((
                    cek,
                    encrypted_key,
                    HeaderPatch { p2s: Some(p2s), p2c: Some(PBES2_ITERATIONS), ..Default::default() },
                ))
            }
        }
    }

    fn unwrap_cek(&self, header: &Header, encrypted_key: &[u8]) -> JoseResult<Vec<u8>> {
        use JweAlgorithm::*;
        match self.alg {
            Dir => {
                let cek = self.jwk.symmetric_bytes()?.to_vec();
                if cek.len() != self.enc.cek_len() {
                    return Err(Error::DecryptionFailed);
                }
                Ok(cek)
            }
            A128Kw | A192Kw | A256Kw => {
                let kek = self.jwk.symmetric_bytes()?;
                kw::aes_kw_unwrap(kek, encrypted_key)
            }
            A128GcmKw | A192GcmKw | A256GcmKw => {
                let kek = self.jwk.symmetric_bytes()?;
                let params = header.jwe_params().ok_or(Error::DecryptionFailed)?;
                let iv = params.iv.as_deref().map(base64url::decode).transpose().map_err(|_| Error::DecryptionFailed)?.ok_or(Error::DecryptionFailed)?;
                let tag = params.tag.as_deref().map(base64url::decode).transpose().map_err(|_| Error::DecryptionFailed)?.ok_or(Error::DecryptionFailed)?;
                kw::aes_gcm_kw_unwrap(kek, encrypted_key, &iv, &tag)
            }
            Rsa1_5 | RsaOaep | RsaOaep256 => {
                let (padding, digest) = rsa_padding(self.alg);
                let privkey = self.jwk.rsa_private_key().map_err(|_| Error::DecryptionFailed)?;
                kw::rsa_unwrap(padding, digest, &privkey, encrypted_key)
            }
            EcdhEs => {
                let epk = header
                    .jwe_params()
                    .and_then(|p| p.epk.as_ref())
                    .ok_or(Error::DecryptionFailed)?;
                let peer = epk.ec_public_key().map_err(|_| Error::DecryptionFailed)?;
                let privkey = self.jwk.ec_private_key().map_err(|_| Error::DecryptionFailed)?;
                let secret = ecdh::shared_secret(&privkey, &peer).map_err(|_| Error::DecryptionFailed)?;
                let (apu, apv) = apu_apv(header).map_err(|_| Error::DecryptionFailed)?;
                ecdh::concat_kdf(&secret, self.enc.name().as_bytes(), &apu, &apv, self.enc.cek_len()).map_err(|_| Error::DecryptionFailed)
            }
            EcdhEsA128Kw | EcdhEsA192Kw | EcdhEsA256Kw => {
                let wrap_len = self.alg.wrap_key_len().ok_or(Error::DecryptionFailed)?;
                let epk = header
                    .jwe_params()
                    .and_then(|p| p.epk.as_ref())
                    .ok_or(Error::DecryptionFailed)?;
                let peer = epk.ec_public_key().map_err(|_| Error::DecryptionFailed)?;
                let privkey = self.jwk.ec_private_key().map_err(|_| Error::DecryptionFailed)?;
                let secret = ecdh::shared_secret(&privkey, &peer).map_err(|_| Error::DecryptionFailed)?;
                let (apu, apv) = apu_apv(header).map_err(|_| Error::DecryptionFailed)?;
                let kek = ecdh::concat_kdf(&secret, self.alg.name().as_bytes(), &apu, &apv, wrap_len).map_err(|_| Error::DecryptionFailed)?;
                kw::aes_kw_unwrap(&kek, encrypted_key)
            }
            Pbes2Hs256A128Kw | Pbes2Hs384A192Kw | Pbes2Hs512A256Kw => {
                let wrap_len = self.alg.wrap_key_len().ok_or(Error::DecryptionFailed)?;
                let params = header.jwe_params().ok_or(Error::DecryptionFailed)?;
                let p2s = params.p2s.as_deref().map(base64url::decode).transpose().map_err(|_| Error::DecryptionFailed)?.ok_or(Error::DecryptionFailed)?;
                let p2c = params.p2c.ok_or(Error::DecryptionFailed)? as u32;
                let passphrase = self.jwk.symmetric_bytes()?;
                let kek = kw::pbes2_derive_kek(pbes2_digest(self.alg), wrap_len, passphrase, self.alg.name(), &p2s, p2c)
                    .map_err(|_| Error::DecryptionFailed)?;
                kw::aes_kw_unwrap(&kek, encrypted_key)
            }
        }
    }
}

fn rsa_padding(alg: JweAlgorithm) -> (Padding, Option<MessageDigest>) {
    match alg {
        JweAlgorithm::Rsa1_5 => (Padding::PKCS1, None),
        JweAlgorithm::RsaOaep => (Padding::PKCS1_OAEP, Some(MessageDigest::sha1())),
        JweAlgorithm::RsaOaep256 => (Padding::PKCS1_OAEP, Some(MessageDigest::sha256())),
        _ => (Padding::PKCS1_OAEP, Some(MessageDigest::sha256())),
    }
}

impl Encrypter for KeyManagement {
    fn encrypt(&self, header: &Header, plaintext: &[u8]) -> JoseResult<(Header, Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>)> {
        let (cek, encrypted_key, patch) = self.wrap_cek()?;
        let amended = patch.apply(header)?;
        let aad = base64url::encode(amended.to_json_bytes()?).into_bytes();

        let (iv, ciphertext, tag) = if self.enc.is_gcm() {
            content::encrypt_gcm(self.enc, &cek, plaintext, &aad)?
        } else {
            content::encrypt_cbc_hmac(self.enc, &cek, plaintext, &aad)?
        };
        Ok((amended, encrypted_key, iv, ciphertext, tag))
    }
}

impl Decrypter for KeyManagement {
    fn decrypt(&self, header: &Header, encrypted_key: &[u8], iv: &[u8], ciphertext: &[u8], tag: &[u8]) -> JoseResult<Vec<u8>> {
        let cek = self.unwrap_cek(header, encrypted_key)?;
        let aad = base64url::encode(header.to_json_bytes().map_err(|_| Error::DecryptionFailed)?).into_bytes();
        if self.enc.is_gcm() {
            content::decrypt_gcm(self.enc, &cek, iv, ciphertext, tag, &aad)
        } else {
            content::decrypt_cbc_hmac(self.enc, &cek, iv, ciphertext, tag, &aad)
        }
    }
}
