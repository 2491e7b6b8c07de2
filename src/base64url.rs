//! RFC 4648 §5 base64url, unpadded on output, tolerant of padding on input.

use base64::alphabet;
use base64::engine::{general_purpose::NO_PAD, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use openssl::bn::BigNum;

use crate::error::{Error, JoseResult};

/// Accepts both padded and unpadded input. Internal whitespace is never
/// valid.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(base64::engine::DecodePaddingMode::Indifferent),
);

/// Encode `bytes` as unpadded base64url.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    NO_PAD_ENGINE.encode(bytes)
}

const NO_PAD_ENGINE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, NO_PAD);

/// Decode a base64url string, with or without padding. Normalizes the
/// standard `+/` alphabet to the url-safe `-_` alphabet before decoding, so
/// input using either alphabet is accepted.
///
/// Rejects inputs whose content length, modulo 4, is 1 (no valid base64
/// encoding has that remainder), and rejects embedded whitespace. An empty
/// string decodes to an empty byte sequence.
pub fn decode(s: &str) -> JoseResult<Vec<u8>> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    if s.bytes().any(|b| b.is_ascii_whitespace()) {
        return Err(Error::malformed("base64url input contains whitespace"));
    }
    let unpadded_len = s.trim_end_matches('=').len();
    if unpadded_len % 4 == 1 {
        return Err(Error::malformed("invalid base64url length"));
    }
    let normalized: String = s.chars().map(|c| match c {
        '+' => '-',
        '/' => '_',
        other => other,
    }).collect();
    URL_SAFE_LENIENT
        .decode(&normalized)
        .map_err(|e| Error::malformed(format!("invalid base64url: {e}")))
}

/// Encode an unsigned big integer as base64url, minimal big-endian
/// representation (no sign byte, no leading zero padding beyond what the
/// magnitude requires).
pub fn encode_unsigned_bigint(n: &BigNum) -> String {
    encode(n.to_vec())
}

/// Decode a base64url string to an unsigned big integer.
pub fn decode_to_unsigned_bigint(s: &str) -> JoseResult<BigNum> {
    let bytes = decode(s)?;
    BigNum::from_slice(&bytes).map_err(Error::from)
}

/// Encode an unsigned big integer as a fixed-width, left-zero-padded byte
/// string (used for ECDSA `x`/`y`/`d` coordinates and fixed-width `r`/`s`).
pub fn encode_fixed_width(bytes: &[u8], width: usize) -> String {
    if bytes.len() >= width {
        encode(&bytes[bytes.len() - width..])
    } else {
        let mut padded = vec![0u8; width - bytes.len()];
        padded.extend_from_slice(bytes);
        encode(padded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_bytes() {
        let bytes = b"hello jose\x00\x01\xff";
        let encoded = encode(bytes);
        assert!(!encoded.contains('='));
        assert_eq!(decode(&encoded).unwrap(), bytes);
    }

    #[test]
    fn empty_string_decodes_to_empty_bytes() {
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn accepts_padding_on_decode() {
        assert_eq!(decode("Zm8=").unwrap(), b"fo".to_vec());
        assert_eq!(decode("Zm8").unwrap(), b"fo".to_vec());
        assert_eq!(decode("Zm9vYg==").unwrap(), b"foob".to_vec());
        assert_eq!(decode("Zm9vYg").unwrap(), b"foob".to_vec());
    }

    #[test]
    fn accepts_standard_alphabet_alongside_url_safe() {
        assert_eq!(decode("+/8=").unwrap(), decode("-_8=").unwrap());
    }

    #[test]
    fn rejects_length_mod_4_eq_1() {
        assert!(decode("a").is_err());
        assert!(decode("abcde").is_err());
    }

    #[test]
    fn rejects_embedded_whitespace() {
        assert!(decode("Zm9v IA").is_err());
    }

    #[test]
    fn bigint_round_trip() {
        let n = BigNum::from_u32(65537).unwrap();
        let s = encode_unsigned_bigint(&n);
        let back = decode_to_unsigned_bigint(&s).unwrap();
        assert_eq!(n.to_vec(), back.to_vec());
    }
}
