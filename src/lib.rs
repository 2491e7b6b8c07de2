//! JOSE (JWS/JWE/JWT) object model, compact serialization codec, algorithm
//! dispatch, claims handling, key sourcing, and a verification pipeline.
//!
//! The crate is organized around five layers, consumed bottom-up by most
//! callers and top-down (pipeline first) by most documentation:
//!
//! - [`alg`] — algorithm/curve/key-type identifiers.
//! - [`header`], [`payload`], [`jwk`], [`jose_object`] — the JOSE data model
//!   and its compact-serialization codec.
//! - [`jws`], [`jwe`] — the signer/verifier and encrypter/decrypter SPI,
//!   plus the built-in algorithm implementations.
//! - [`jwt`] — the claims set, the default validity-window verifier, and
//!   `Jwt::sign`/`Jwt::encrypt` convenience wrappers.
//! - [`keysource`], [`selector`], [`processor`] — where keys come from, how
//!   candidates are chosen, and the end-to-end `compact string -> claims`
//!   pipeline.

pub mod alg;
pub mod base64url;
pub mod error;
pub mod header;
pub mod jose_object;
pub mod json;
pub mod jwe;
pub mod jwk;
pub mod jws;
pub mod jwt;
pub mod keysource;
pub mod payload;
pub mod processor;
pub mod selector;
pub mod util;

pub use error::{Error, JoseResult};
pub use header::{CommonParams, Header, JweParams};
pub use jose_object::{JoseObject, JweObject, JwsObject};
pub use jwk::{Jwk, JwkMatcher, JwkSet};
pub use jwt::claims::ClaimsSet;
pub use jwt::verifier::{ClaimsVerifier, DefaultClaimsVerifier};
pub use jwt::Jwt;
pub use keysource::SecurityContext;
pub use payload::Payload;
pub use processor::{JwtProcessor, JwtProcessorBuilder};
