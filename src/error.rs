//! The crate's single, flat error taxonomy.
//!
//! Every fallible operation in `jose-rs` returns [`JoseResult`]. Errors are
//! disjoint by construction: a given failure is classified into exactly one
//! variant, never bubbled as an opaque wrapper unless it genuinely originates
//! in an external collaborator (JSON, crypto, or HTTP).

use thiserror::Error;

/// The crate-wide result alias.
pub type JoseResult<T> = Result<T, Error>;

/// Flat error taxonomy for JOSE/JWT production and consumption.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrong segment count, bad base64url, or header not a JSON object.
    #[error("malformed JOSE object: {0}")]
    MalformedJose(String),

    /// `alg`/`enc` unknown or unimplemented.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// `crit` names a parameter not whitelisted by the caller.
    #[error("critical header parameter not supported: {0}")]
    CriticalParamUnsupported(String),

    /// Header carries a parameter outside the accepted set.
    #[error("header parameter not accepted: {0}")]
    HeaderNotAccepted(String),

    /// Key kind is wrong for the declared algorithm.
    #[error("key type mismatch: algorithm {alg} cannot use a {key_type} key")]
    KeyTypeMismatch { alg: String, key_type: String },

    /// Processor has no JWS key selector configured.
    #[error("no JWS key selector configured")]
    NoKeySelector,

    /// Processor has no JWS verifier factory configured.
    #[error("no JWS verifier factory configured")]
    NoVerifierFactory,

    /// Processor has no JWE decrypter factory configured.
    #[error("no JWE decrypter factory configured")]
    NoDecrypterFactory,

    /// The key selector produced an empty candidate list.
    #[error("no matching key found for header")]
    NoMatchingKey,

    /// No candidate key produced a verifier.
    #[error("no candidate key produced a suitable verifier")]
    NoSuitableVerifier,

    /// No candidate key produced a decrypter.
    #[error("no candidate key produced a suitable decrypter")]
    NoSuitableDecrypter,

    /// Every candidate verifier returned `false`.
    #[error("signature verification failed")]
    InvalidSignature,

    /// Every candidate decrypter failed.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Payload is not a JSON object, or a registered claim has the wrong kind.
    #[error("malformed claims set: {0}")]
    MalformedClaims(String),

    /// `exp + skew <= now`.
    #[error("token expired")]
    Expired,

    /// `nbf - skew > now`.
    #[error("token not yet valid")]
    NotYetValid,

    /// Claims verifier rejected the claims set for a caller-defined reason.
    #[error("claims rejected: {0}")]
    ClaimsRejected(String),

    /// An unsecured (`alg=none`) JOSE object was handed to a processor that
    /// rejects them by default.
    #[error("unsecured JWT rejected")]
    UnsecuredRejected,

    /// Underlying cryptographic primitive failure.
    #[error("cryptographic operation failed: {0}")]
    CryptoError(#[from] openssl::error::ErrorStack),

    /// Remote JWK set retrieval failed.
    #[error("remote JWK set fetch failed: {0}")]
    RemoteFetchFailed(String),

    /// Programmer error: an operation was attempted from an illegal state.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// JSON (de)serialization failure that isn't better classified above.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedJose(msg.into())
    }
}
