//! Polymorphic JOSE object: Unsecured | JWS | JWE, each a small state
//! machine, plus the compact-serialization codec that glues them to bytes.

use crate::alg::{EncryptionMethod, JweAlgorithm};
use crate::base64url;
use crate::error::{Error, JoseResult};
use crate::header::Header;
use crate::payload::Payload;

/// Split a compact string into its raw (still base64url-encoded) segments.
/// Fails with `MalformedJose` if the segment count is not 3 or 5.
pub fn split(compact: &str) -> JoseResult<Vec<&str>> {
    let parts: Vec<&str> = compact.split('.').collect();
    if parts.len() != 3 && parts.len() != 5 {
        return Err(Error::malformed(format!(
            "compact serialization must have 3 or 5 segments, got {}",
            parts.len()
        )));
    }
    Ok(parts)
}

/// JWS state machine: `Unsigned` until `sign` is called, `Signed` after.
#[derive(Clone, Debug)]
pub enum JwsState {
    Unsigned,
    Signed { signature: Vec<u8> },
}

/// A JWS-variant JOSE object.
#[derive(Clone, Debug)]
pub struct JwsObject {
    header: Header,
    payload: Payload,
    state: JwsState,
}

impl JwsObject {
    pub fn new(header: Header, payload: Payload) -> Self {
        JwsObject { header, payload, state: JwsState::Unsigned }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn is_signed(&self) -> bool {
        matches!(self.state, JwsState::Signed { .. })
    }

    pub fn signature(&self) -> Option<&[u8]> {
        match &self.state {
            JwsState::Signed { signature } => Some(signature),
            JwsState::Unsigned => None,
        }
    }

    /// The ASCII byte sequence `b64u(header) '.' b64u(payload)`, signed or
    /// verified over.
    pub fn signing_input(&self) -> JoseResult<Vec<u8>> {
        let header_b64 = base64url::encode(self.header.to_json_bytes()?);
        let payload_b64 = base64url::encode(self.payload.as_bytes());
        Ok(format!("{header_b64}.{payload_b64}").into_bytes())
    }

    /// `Unsigned --sign--> Signed`. Fails with `IllegalState` if already
    /// signed; re-signing requires a fresh object.
    pub fn with_signature(mut self, signature: Vec<u8>) -> JoseResult<Self> {
        match self.state {
            JwsState::Unsigned => {
                self.state = JwsState::Signed { signature };
                Ok(self)
            }
            JwsState::Signed { .. } => Err(Error::IllegalState("JWS already signed".into())),
        }
    }

    /// Construct directly in the `Signed` state (used when parsing).
    pub fn new_signed(header: Header, payload: Payload, signature: Vec<u8>) -> Self {
        JwsObject { header, payload, state: JwsState::Signed { signature } }
    }

    /// `b64u(header) '.' b64u(payload) '.' b64u(signature)`. Requires
    /// `Signed`.
    pub fn serialize(&self) -> JoseResult<String> {
        let signature = self
            .signature()
            .ok_or_else(|| Error::IllegalState("cannot serialize an unsigned JWS".into()))?;
        let header_b64 = base64url::encode(self.header.to_json_bytes()?);
        let payload_b64 = base64url::encode(self.payload.as_bytes());
        let sig_b64 = base64url::encode(signature);
        Ok(format!("{header_b64}.{payload_b64}.{sig_b64}"))
    }
}

/// JWE state machine: `Unencrypted --encrypt--> Encrypted --decrypt-->
/// Decrypted`. `serialize` is available on `Encrypted` and `Decrypted`
/// (decryption never mutates the ciphertext segments).
#[derive(Clone, Debug)]
pub enum JweState {
    Unencrypted,
    Encrypted { enc_key: Vec<u8>, iv: Vec<u8>, ciphertext: Vec<u8>, tag: Vec<u8> },
    Decrypted { enc_key: Vec<u8>, iv: Vec<u8>, ciphertext: Vec<u8>, tag: Vec<u8>, plaintext: Payload },
}

/// A JWE-variant JOSE object.
#[derive(Clone, Debug)]
pub struct JweObject {
    header: Header,
    /// Only present before encryption; afterwards the plaintext lives only
    /// in `JweState::Decrypted`, reflecting that `Encrypted` does not carry
    /// the plaintext.
    pending_plaintext: Option<Payload>,
    state: JweState,
}

impl JweObject {
    pub fn new(header: Header, plaintext: Payload) -> Self {
        JweObject { header, pending_plaintext: Some(plaintext), state: JweState::Unencrypted }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn with_header(mut self, header: Header) -> Self {
        self.header = header;
        self
    }

    pub fn plaintext_to_encrypt(&self) -> JoseResult<&Payload> {
        self.pending_plaintext
            .as_ref()
            .ok_or_else(|| Error::IllegalState("JWE has already been encrypted".into()))
    }

    pub fn with_encryption(mut self, enc_key: Vec<u8>, iv: Vec<u8>, ciphertext: Vec<u8>, tag: Vec<u8>) -> JoseResult<Self> {
        match self.state {
            JweState::Unencrypted => {
                self.state = JweState::Encrypted { enc_key, iv, ciphertext, tag };
                self.pending_plaintext = None;
                Ok(self)
            }
            _ => Err(Error::IllegalState("JWE already encrypted".into())),
        }
    }

    pub fn new_encrypted(header: Header, enc_key: Vec<u8>, iv: Vec<u8>, ciphertext: Vec<u8>, tag: Vec<u8>) -> Self {
        JweObject { header, pending_plaintext: None, state: JweState::Encrypted { enc_key, iv, ciphertext, tag } }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self.state, JweState::Encrypted { .. } | JweState::Decrypted { .. })
    }

    pub fn segments(&self) -> JoseResult<(&[u8], &[u8], &[u8], &[u8])> {
        match &self.state {
            JweState::Encrypted { enc_key, iv, ciphertext, tag }
            | JweState::Decrypted { enc_key, iv, ciphertext, tag, .. } => Ok((enc_key, iv, ciphertext, tag)),
            JweState::Unencrypted => Err(Error::IllegalState("JWE has not been encrypted yet".into())),
        }
    }

    /// `Encrypted --decrypt--> Decrypted`. The ciphertext segments are not
    /// mutated; only the exposed plaintext view is added.
    pub fn with_decryption(mut self, plaintext: Payload) -> JoseResult<Self> {
        match self.state {
            JweState::Encrypted { enc_key, iv, ciphertext, tag } => {
                self.state = JweState::Decrypted { enc_key, iv, ciphertext, tag, plaintext };
                Ok(self)
            }
            JweState::Decrypted { .. } => Err(Error::IllegalState("JWE already decrypted".into())),
            JweState::Unencrypted => Err(Error::IllegalState("cannot decrypt an unencrypted JWE".into())),
        }
    }

    pub fn plaintext(&self) -> Option<&Payload> {
        match &self.state {
            JweState::Decrypted { plaintext, .. } => Some(plaintext),
            _ => None,
        }
    }

    /// `b64u(header) '.' b64u(encKey) '.' b64u(iv) '.' b64u(ciphertext) '.'
    /// b64u(tag)`. Requires `Encrypted` or `Decrypted` (re-emits the
    /// original encrypted form unchanged).
    pub fn serialize(&self) -> JoseResult<String> {
        let (enc_key, iv, ciphertext, tag) = self.segments()?;
        let header_b64 = base64url::encode(self.header.to_json_bytes()?);
        Ok(format!(
            "{header_b64}.{}.{}.{}.{}",
            base64url::encode(enc_key),
            base64url::encode(iv),
            base64url::encode(ciphertext),
            base64url::encode(tag),
        ))
    }
}

/// The polymorphic JOSE object.
#[derive(Clone, Debug)]
pub enum JoseObject {
    Unsecured { header: Header, payload: Payload },
    Jws(JwsObject),
    Jwe(JweObject),
}

impl JoseObject {
    /// `split` then classify by `alg`/`enc` and segment count (§4.2).
    pub fn parse(compact: &str) -> JoseResult<Self> {
        let parts = split(compact)?;
        let header_bytes = base64url::decode(parts[0])?;
        let header = Header::parse(crate::json::parse_object(&header_bytes)?)?;

        if header.is_unsecured() {
            if parts.len() != 3 || !parts[2].is_empty() {
                return Err(Error::malformed("unsecured object must have an empty third segment"));
            }
            let payload = Payload::from_bytes(base64url::decode(parts[1])?);
            return Ok(JoseObject::Unsecured { header, payload });
        }

        if let Some(alg) = header.jws_algorithm() {
            let _ = alg;
            if parts.len() != 3 {
                return Err(Error::malformed("JWS compact form must have 3 segments"));
            }
            let payload = Payload::from_bytes(base64url::decode(parts[1])?);
            let signature = base64url::decode(parts[2])?;
            return Ok(JoseObject::Jws(JwsObject::new_signed(header, payload, signature)));
        }

        if let Some((_alg, _enc)) = header.jwe_algorithm() {
            if parts.len() != 5 {
                return Err(Error::malformed("JWE compact form must have 5 segments"));
            }
            let enc_key = base64url::decode(parts[1])?;
            let iv = base64url::decode(parts[2])?;
            let ciphertext = base64url::decode(parts[3])?;
            let tag = base64url::decode(parts[4])?;
            return Ok(JoseObject::Jwe(JweObject::new_encrypted(header, enc_key, iv, ciphertext, tag)));
        }

        Err(Error::malformed("header shape did not match Unsecured, JWS, or JWE"))
    }

    pub fn serialize(&self) -> JoseResult<String> {
        match self {
            JoseObject::Unsecured { header, payload } => {
                let header_b64 = base64url::encode(header.to_json_bytes()?);
                let payload_b64 = base64url::encode(payload.as_bytes());
                Ok(format!("{header_b64}.{payload_b64}."))
            }
            JoseObject::Jws(jws) => jws.serialize(),
            JoseObject::Jwe(jwe) => jwe.serialize(),
        }
    }

    pub fn header(&self) -> &Header {
        match self {
            JoseObject::Unsecured { header, .. } => header,
            JoseObject::Jws(jws) => jws.header(),
            JoseObject::Jwe(jwe) => jwe.header(),
        }
    }
}

/// Construct the key-wrap length in bytes implied by a JWE alg/enc pair,
/// used by factories to size freshly generated content-encryption keys.
pub fn cek_len_for(alg: JweAlgorithm, enc: EncryptionMethod) -> usize {
    match alg.wrap_key_len() {
        Some(len) if !alg.is_direct() && !matches!(alg, JweAlgorithm::RsaOaep | JweAlgorithm::RsaOaep256 | JweAlgorithm::Rsa1_5) => len,
        _ => enc.cek_len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::CommonParams;

    #[test]
    fn unsecured_round_trips() {
        let header = Header::new_unsecured(CommonParams { typ: Some("JWT".into()), ..Default::default() });
        let payload = Payload::from_bytes(b"{\"sub\":\"alice\"}".to_vec());
        let obj = JoseObject::Unsecured { header, payload };
        let compact = obj.serialize().unwrap();
        assert!(compact.ends_with('.'));
        assert_eq!(compact.matches('.').count(), 2);
        let reparsed = JoseObject::parse(&compact).unwrap();
        assert_eq!(reparsed.serialize().unwrap(), compact);
    }

    #[test]
    fn rejects_wrong_segment_counts() {
        assert!(split("a.b").is_err());
        assert!(split("a.b.c.d").is_err());
        assert!(split("a.b.c").is_ok());
        assert!(split("a.b.c.d.e").is_ok());
    }

    #[test]
    fn unsecured_with_nonempty_third_segment_is_rejected() {
        let header = base64url::encode(br#"{"alg":"none"}"#);
        let payload = base64url::encode(br#"{"sub":"x"}"#);
        let sig = base64url::encode(b"not-empty");
        let compact = format!("{header}.{payload}.{sig}");
        assert!(matches!(JoseObject::parse(&compact), Err(Error::MalformedJose(_))));
    }

    #[test]
    fn serializing_unsigned_jws_is_illegal_state() {
        let header = Header::new_jws(crate::alg::JwsAlgorithm::Hs256, CommonParams::default());
        let jws = JwsObject::new(header, Payload::from_bytes(b"{}".to_vec()));
        assert!(matches!(jws.serialize(), Err(Error::IllegalState(_))));
    }
}
