//! Key-wrapping primitives: AES Key Wrap (RFC 3394), RSAES, AES-GCM key
//! wrap, and PBES2 key derivation.

use openssl::hash::MessageDigest;
use openssl::pkcs5::pbkdf2_hmac;
use openssl::pkey::{PKey, Private, Public};
use openssl::rand::rand_bytes;
use openssl::rsa::{Padding, Rsa};
use openssl::symm::{Cipher, Crypter, Mode};

use crate::error::{Error, JoseResult};

const DEFAULT_IV: [u8; 8] = [0xA6; 8];

fn ecb_cipher(kek_len: usize) -> JoseResult<Cipher> {
    match kek_len {
        16 => Ok(Cipher::aes_128_ecb()),
        24 => Ok(Cipher::aes_192_ecb()),
        32 => Ok(Cipher::aes_256_ecb()),
        other => Err(Error::malformed(format!("AES key wrap KEK must be 16/24/32 bytes, got {other}"))),
    }
}

fn ecb_block(cipher: Cipher, kek: &[u8], mode: Mode, block: &[u8; 16]) -> JoseResult<[u8; 16]> {
    let mut crypter = Crypter::new(cipher, mode, kek, None)?;
    crypter.pad(false);
    let mut out = [0u8; 32];
    let mut count = crypter.update(block, &mut out)?;
    count += crypter.finalize(&mut out[count..])?;
    debug_assert_eq!(count, 16);
    let mut result = [0u8; 16];
    result.copy_from_slice(&out[..16]);
    Ok(result)
}

/// RFC 3394 AES key wrap. `cek` must be a multiple of 8 bytes and at least
/// 16 bytes.
pub fn aes_kw_wrap(kek: &[u8], cek: &[u8]) -> JoseResult<Vec<u8>> {
    if cek.len() % 8 != 0 || cek.len() < 16 {
        return Err(Error::malformed("AES key wrap input must be a multiple of 8 bytes, >= 16"));
    }
    let cipher = ecb_cipher(kek.len())?;
    let n = cek.len() / 8;
    let mut r: Vec<[u8; 8]> = cek.chunks(8).map(|c| c.try_into().unwrap()).collect();
    let mut a = DEFAULT_IV;

    for j in 0..6u64 {
        for (i, block) in r.iter_mut().enumerate() {
            let mut input = [0u8; 16];
            input[..8].copy_from_slice(&a);
            input[8..].copy_from_slice(block);
            let output = ecb_block(cipher, kek, Mode::Encrypt, &input)?;

            let t = j * (n as u64) + (i as u64) + 1;
            a.copy_from_slice(&output[..8]);
            for (k, byte) in a.iter_mut().enumerate() {
                *byte ^= ((t >> ((7 - k) * 8)) & 0xff) as u8;
            }
            block.copy_from_slice(&output[8..]);
        }
    }

    let mut out = Vec::with_capacity(8 + cek.len());
    out.extend_from_slice(&a);
    for block in &r {
        out.extend_from_slice(block);
    }
    Ok(out)
}

pub fn aes_kw_unwrap(kek: &[u8], wrapped: &[u8]) -> JoseResult<Vec<u8>> {
    if wrapped.len() % 8 != 0 || wrapped.len() < 24 {
        return Err(Error::DecryptionFailed);
    }
    let cipher = ecb_cipher(kek.len()).map_err(|_| Error::DecryptionFailed)?;
    let n = wrapped.len() / 8 - 1;
    let mut a = [0u8; 8];
    a.copy_from_slice(&wrapped[..8]);
    let mut r: Vec<[u8; 8]> = wrapped[8..].chunks(8).map(|c| c.try_into().unwrap()).collect();

    for j in (0..6u64).rev() {
        for i in (0..n).rev() {
            let t = j * (n as u64) + (i as u64) + 1;
            let mut a_xored = a;
            for (k, byte) in a_xored.iter_mut().enumerate() {
                *byte ^= ((t >> ((7 - k) * 8)) & 0xff) as u8;
            }
            let mut input = [0u8; 16];
            input[..8].copy_from_slice(&a_xored);
            input[8..].copy_from_slice(&r[i]);
            let output = ecb_block(cipher, kek, Mode::Decrypt, &input).map_err(|_| Error::DecryptionFailed)?;
            a.copy_from_slice(&output[..8]);
            r[i].copy_from_slice(&output[8..]);
        }
    }

    if a != DEFAULT_IV {
        return Err(Error::DecryptionFailed);
    }
    let mut out = Vec::with_capacity(n * 8);
    for block in &r {
        out.extend_from_slice(block);
    }
    Ok(out)
}

pub fn rsa_wrap(padding: Padding, oaep_digest: Option<MessageDigest>, key: &Rsa<Public>, cek: &[u8]) -> JoseResult<Vec<u8>> {
    let pkey = PKey::from_rsa(key.clone())?;
    let mut encrypter = openssl::encrypt::Encrypter::new(&pkey)?;
    encrypter.set_rsa_padding(padding)?;
    if let Some(md) = oaep_digest {
        encrypter.set_rsa_oaep_md(md)?;
        encrypter.set_rsa_mgf1_md(md)?;
    }
    let len = encrypter.encrypt_len(cek)?;
    let mut out = vec![0u8; len];
    let written = encrypter.encrypt(cek, &mut out)?;
    out.truncate(written);
    Ok(out)
}

pub fn rsa_unwrap(padding: Padding, oaep_digest: Option<MessageDigest>, key: &Rsa<Private>, encrypted_key: &[u8]) -> JoseResult<Vec<u8>> {
    let pkey = PKey::from_rsa(key.clone())?;
    let mut decrypter = openssl::encrypt::Decrypter::new(&pkey).map_err(|_| Error::DecryptionFailed)?;
    decrypter.set_rsa_padding(padding).map_err(|_| Error::DecryptionFailed)?;
    if let Some(md) = oaep_digest {
        decrypter.set_rsa_oaep_md(md).map_err(|_| Error::DecryptionFailed)?;
        decrypter.set_rsa_mgf1_md(md).map_err(|_| Error::DecryptionFailed)?;
    }
    let len = decrypter.decrypt_len(encrypted_key).map_err(|_| Error::DecryptionFailed)?;
    let mut out = vec![0u8; len];
    let written = decrypter.decrypt(encrypted_key, &mut out).map_err(|_| Error::DecryptionFailed)?;
    out.truncate(written);
    Ok(out)
}

/// AES-GCM key wrap (§4.7): wraps `cek` under `kek`, returning
/// `(ciphertext, iv, tag)`; the caller folds `iv`/`tag` into the header.
pub fn aes_gcm_kw_wrap(kek: &[u8], cek: &[u8]) -> JoseResult<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    let cipher = match kek.len() {
        16 => Cipher::aes_128_gcm(),
        24 => Cipher::aes_192_gcm(),
        32 => Cipher::aes_256_gcm(),
        other => return Err(Error::malformed(format!("AES-GCM key wrap KEK must be 16/24/32 bytes, got {other}"))),
    };
    let mut iv = vec![0u8; 12];
    rand_bytes(&mut iv)?;
    let mut tag = vec![0u8; 16];
    let ciphertext = openssl::symm::encrypt_aead(cipher, kek, Some(&iv), &[], cek, &mut tag)?;
    Ok((ciphertext, iv, tag))
}

pub fn aes_gcm_kw_unwrap(kek: &[u8], ciphertext: &[u8], iv: &[u8], tag: &[u8]) -> JoseResult<Vec<u8>> {
    let cipher = match kek.len() {
        16 => Cipher::aes_128_gcm(),
        24 => Cipher::aes_192_gcm(),
        32 => Cipher::aes_256_gcm(),
        _ => return Err(Error::DecryptionFailed),
    };
    openssl::symm::decrypt_aead(cipher, kek, Some(iv), &[], ciphertext, tag).map_err(|_| Error::DecryptionFailed)
}

/// PBES2 (§4.8): derive a key-wrap KEK of `key_len` bytes from `passphrase`
/// via PBKDF2, salted with `alg_name || 0x00 || p2s`.
pub fn pbes2_derive_kek(digest: MessageDigest, key_len: usize, passphrase: &[u8], alg_name: &str, p2s: &[u8], p2c: u32) -> JoseResult<Vec<u8>> {
    let mut salt = Vec::with_capacity(alg_name.len() + 1 + p2s.len());
    salt.extend_from_slice(alg_name.as_bytes());
    salt.push(0u8);
    salt.extend_from_slice(p2s);

    let mut out = vec![0u8; key_len];
    pbkdf2_hmac(passphrase, &salt, p2c as usize, digest, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aes_kw_round_trips() {
        let kek = vec![0x11u8; 16];
        let cek = vec![0x42u8; 32];
        let wrapped = aes_kw_wrap(&kek, &cek).unwrap();
        assert_eq!(wrapped.len(), cek.len() + 8);
        let unwrapped = aes_kw_unwrap(&kek, &wrapped).unwrap();
        assert_eq!(unwrapped, cek);
    }

    #[test]
    fn aes_kw_rejects_tampered_wrapped_key() {
        let kek = vec![0x11u8; 16];
        let cek = vec![0x42u8; 16];
        let mut wrapped = aes_kw_wrap(&kek, &cek).unwrap();
        wrapped[0] ^= 0xFF;
        assert!(matches!(aes_kw_unwrap(&kek, &wrapped), Err(Error::DecryptionFailed)));
    }

    #[test]
    fn aes_gcm_kw_round_trips() {
        let kek = vec![0x22u8; 32];
        let cek = vec![0x33u8; 32];
        let (ct, iv, tag) = aes_gcm_kw_wrap(&kek, &cek).unwrap();
        let unwrapped = aes_gcm_kw_unwrap(&kek, &ct, &iv, &tag).unwrap();
        assert_eq!(unwrapped, cek);
    }

    #[test]
    fn pbes2_derivation_is_deterministic() {
        let a = pbes2_derive_kek(MessageDigest::sha256(), 16, b"correct horse", "PBES2-HS256+A128KW", b"saltsalt", 2048).unwrap();
        let b = pbes2_derive_kek(MessageDigest::sha256(), 16, b"correct horse", "PBES2-HS256+A128KW", b"saltsalt", 2048).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }
}
