//! Content encryption: AES-CBC + HMAC composite (RFC 7518 §5.2) and AES-GCM
//! (§5.3). Operates purely on a content-encryption key already sized to
//! `enc.cek_len()`; key management is the caller's concern.

use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::rand::rand_bytes;
use openssl::sign::Signer as OsslSigner;
use openssl::symm::{Cipher, Crypter, Mode};

use crate::alg::EncryptionMethod;
use crate::error::{Error, JoseResult};
use crate::util::constant_time_eq;

fn cbc_cipher(enc: EncryptionMethod) -> JoseResult<Cipher> {
    match enc {
        EncryptionMethod::A128CbcHs256 => Ok(Cipher::aes_128_cbc()),
        EncryptionMethod::A192CbcHs384 => Ok(Cipher::aes_192_cbc()),
        EncryptionMethod::A256CbcHs512 => Ok(Cipher::aes_256_cbc()),
        other => Err(Error::UnsupportedAlgorithm(format!("{} is not a CBC-HMAC method", other.name()))),
    }
}

fn cbc_mac_digest(enc: EncryptionMethod) -> JoseResult<MessageDigest> {
    match enc {
        EncryptionMethod::A128CbcHs256 => Ok(MessageDigest::sha256()),
        EncryptionMethod::A192CbcHs384 => Ok(MessageDigest::sha384()),
        EncryptionMethod::A256CbcHs512 => Ok(MessageDigest::sha512()),
        other => Err(Error::UnsupportedAlgorithm(format!("{} is not a CBC-HMAC method", other.name()))),
    }
}

fn al(aad: &[u8]) -> [u8; 8] {
    ((aad.len() as u64) * 8).to_be_bytes()
}

fn cbc_hmac_tag(mac_key: &[u8], digest: MessageDigest, aad: &[u8], iv: &[u8], ciphertext: &[u8], tag_len: usize) -> JoseResult<Vec<u8>> {
    let pkey = PKey::hmac(mac_key)?;
    let mut signer = OsslSigner::new(digest, &pkey)?;
    signer.update(aad)?;
    signer.update(iv)?;
    signer.update(ciphertext)?;
    signer.update(&al(aad))?;
    let full = signer.sign_to_vec()?;
    Ok(full[..tag_len].to_vec())
}

/// Encrypt `plaintext` under `cek` (already `enc.cek_len()` bytes), with
/// `aad` the ASCII bytes of the base64url-encoded protected header.
/// Returns `(iv, ciphertext, tag)`.
pub fn encrypt_cbc_hmac(enc: EncryptionMethod, cek: &[u8], plaintext: &[u8], aad: &[u8]) -> JoseResult<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    let half = cek.len() / 2;
    let (mac_key, enc_key) = cek.split_at(half);

    let mut iv = vec![0u8; 16];
    rand_bytes(&mut iv)?;

    let cipher = cbc_cipher(enc)?;
    let mut crypter = Crypter::new(cipher, Mode::Encrypt, enc_key, Some(&iv))?;
    crypter.pad(true);
    let mut out = vec![0u8; plaintext.len() + cipher.block_size()];
    let mut count = crypter.update(plaintext, &mut out)?;
    count += crypter.finalize(&mut out[count..])?;
    out.truncate(count);

    let tag = cbc_hmac_tag(mac_key, cbc_mac_digest(enc)?, aad, &iv, &out, half)?;
    Ok((iv, out, tag))
}

pub fn decrypt_cbc_hmac(enc: EncryptionMethod, cek: &[u8], iv: &[u8], ciphertext: &[u8], tag: &[u8], aad: &[u8]) -> JoseResult<Vec<u8>> {
    let half = cek.len() / 2;
    let (mac_key, enc_key) = cek.split_at(half);

    let expected_tag = cbc_hmac_tag(mac_key, cbc_mac_digest(enc)?, aad, iv, ciphertext, half)?;
    if !constant_time_eq(&expected_tag, tag) {
        return Err(Error::DecryptionFailed);
    }

    let cipher = cbc_cipher(enc)?;
    let mut crypter = Crypter::new(cipher, Mode::Decrypt, enc_key, Some(iv)).map_err(|_| Error::DecryptionFailed)?;
    crypter.pad(true);
    let mut out = vec![0u8; ciphertext.len() + cipher.block_size()];
    let mut count = crypter.update(ciphertext, &mut out).map_err(|_| Error::DecryptionFailed)?;
    count += crypter.finalize(&mut out[count..]).map_err(|_| Error::DecryptionFailed)?;
    out.truncate(count);
    Ok(out)
}

fn gcm_cipher(enc: EncryptionMethod) -> JoseResult<Cipher> {
    match enc {
        EncryptionMethod::A128Gcm => Ok(Cipher::aes_128_gcm()),
        EncryptionMethod::A192Gcm => Ok(Cipher::aes_192_gcm()),
        EncryptionMethod::A256Gcm => Ok(Cipher::aes_256_gcm()),
        other => Err(Error::UnsupportedAlgorithm(format!("{} is not a GCM method", other.name()))),
    }
}

/// Encrypt with a fresh random 96-bit IV. Returns `(iv, ciphertext, tag)`.
pub fn encrypt_gcm(enc: EncryptionMethod, cek: &[u8], plaintext: &[u8], aad: &[u8]) -> JoseResult<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    let mut iv = vec![0u8; 12];
    rand_bytes(&mut iv)?;
    let mut tag = vec![0u8; 16];
    let ciphertext = openssl::symm::encrypt_aead(gcm_cipher(enc)?, cek, Some(&iv), aad, plaintext, &mut tag)?;
    Ok((iv, ciphertext, tag))
}

pub fn decrypt_gcm(enc: EncryptionMethod, cek: &[u8], iv: &[u8], ciphertext: &[u8], tag: &[u8], aad: &[u8]) -> JoseResult<Vec<u8>> {
    openssl::symm::decrypt_aead(gcm_cipher(enc)?, cek, Some(iv), aad, ciphertext, tag).map_err(|_| Error::DecryptionFailed)
}
