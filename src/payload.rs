//! The JOSE payload: a byte sequence plus lazily-computed typed views.
//!
//! The canonical representation is always the byte sequence; `as_string`/
//! `as_json`/`as_signed_jwt` are convenience conversions computed on demand,
//! mirroring the original `Payload` abstraction this spec distills from.

use serde_json::{Map, Value};

use crate::error::{Error, JoseResult};
use crate::jose_object::JoseObject;

/// A JOSE payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Payload(bytes.into())
    }

    pub fn from_json(value: &Value) -> JoseResult<Self> {
        Ok(Payload(serde_json::to_vec(value)?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Interpret the payload as UTF-8 text.
    pub fn as_string(&self) -> JoseResult<String> {
        String::from_utf8(self.0.clone()).map_err(|e| Error::malformed(format!("payload is not valid UTF-8: {e}")))
    }

    /// Interpret the payload as a JSON object.
    pub fn as_json_object(&self) -> JoseResult<Map<String, Value>> {
        match serde_json::from_slice::<Value>(&self.0)? {
            Value::Object(m) => Ok(m),
            _ => Err(Error::malformed("payload is not a JSON object")),
        }
    }

    /// Interpret the payload as a nested compact JWT (for `cty == "JWT"`
    /// payloads of an encrypted object).
    pub fn as_signed_jwt(&self) -> JoseResult<JoseObject> {
        let s = self.as_string()?;
        JoseObject::parse(&s)
    }
}
