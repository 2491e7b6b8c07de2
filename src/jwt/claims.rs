//! JWT claims set (RFC 7519 §4): registered claims plus arbitrary custom
//! claims, over a single canonical JSON object.

use serde_json::{Map, Value};

use crate::error::{Error, JoseResult};
use crate::json;

pub const ISSUER: &str = "iss";
pub const SUBJECT: &str = "sub";
pub const AUDIENCE: &str = "aud";
pub const EXPIRATION: &str = "exp";
pub const NOT_BEFORE: &str = "nbf";
pub const ISSUED_AT: &str = "iat";
pub const JWT_ID: &str = "jti";

/// A JWT claims set. The canonical representation is the JSON object;
/// typed accessors are read-only views over it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClaimsSet {
    raw: Map<String, Value>,
}

impl ClaimsSet {
    pub fn builder() -> ClaimsSetBuilder {
        ClaimsSetBuilder::default()
    }

    /// Parse from a JSON object. Fails with `MalformedClaims` if any
    /// registered claim carries the wrong JSON kind; unrecognized claims
    /// are preserved verbatim.
    pub fn parse(obj: Map<String, Value>) -> JoseResult<Self> {
        json::get_str(&obj, ISSUER).map_err(claims_err)?;
        json::get_str(&obj, SUBJECT).map_err(claims_err)?;
        json::get_str_or_str_array(&obj, AUDIENCE).map_err(claims_err)?;
        json::get_long(&obj, EXPIRATION).map_err(claims_err)?;
        json::get_long(&obj, NOT_BEFORE).map_err(claims_err)?;
        json::get_long(&obj, ISSUED_AT).map_err(claims_err)?;
        json::get_str(&obj, JWT_ID).map_err(claims_err)?;
        Ok(ClaimsSet { raw: obj })
    }

    /// Serialize to its canonical JSON object: `aud` collapses to a single
    /// string when it has exactly one element; null-valued claims are
    /// never stored so there is nothing to omit at this layer.
    pub fn to_json(&self) -> Map<String, Value> {
        self.raw.clone()
    }

    pub fn issuer(&self) -> Option<&str> {
        self.raw.get(ISSUER).and_then(Value::as_str)
    }

    pub fn subject(&self) -> Option<&str> {
        self.raw.get(SUBJECT).and_then(Value::as_str)
    }

    /// Normalized to a list regardless of whether the JSON carried a
    /// single string or an array.
    pub fn audience(&self) -> Vec<String> {
        match self.raw.get(AUDIENCE) {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
            _ => Vec::new(),
        }
    }

    pub fn expiration(&self) -> Option<i64> {
        json::get_long(&self.raw, EXPIRATION).ok().flatten()
    }

    pub fn not_before(&self) -> Option<i64> {
        json::get_long(&self.raw, NOT_BEFORE).ok().flatten()
    }

    pub fn issued_at(&self) -> Option<i64> {
        json::get_long(&self.raw, ISSUED_AT).ok().flatten()
    }

    pub fn jwt_id(&self) -> Option<&str> {
        self.raw.get(JWT_ID).and_then(Value::as_str)
    }

    /// A custom (or registered) claim by name, as raw JSON.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.raw.get(name)
    }

    pub fn get_string(&self, name: &str) -> JoseResult<Option<&str>> {
        json::get_str(&self.raw, name).map_err(claims_err)
    }

    pub fn get_long(&self, name: &str) -> JoseResult<Option<i64>> {
        json::get_long(&self.raw, name).map_err(claims_err)
    }

    pub fn get_bool(&self, name: &str) -> JoseResult<Option<bool>> {
        match self.raw.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(Error::MalformedClaims(format!("'{name}' must be a boolean"))),
        }
    }
}

fn claims_err(e: Error) -> Error {
    match e {
        Error::MalformedJose(msg) => Error::MalformedClaims(msg),
        other => other,
    }
}

/// Accumulates claims in insertion order. Setting the same claim name
/// twice is rejected rather than silently overwriting the first value.
#[derive(Clone, Debug, Default)]
pub struct ClaimsSetBuilder {
    raw: Map<String, Value>,
}

impl ClaimsSetBuilder {
    pub fn issuer(self, value: impl Into<String>) -> JoseResult<Self> {
        self.set(ISSUER, Value::String(value.into()))
    }

    pub fn subject(self, value: impl Into<String>) -> JoseResult<Self> {
        self.set(SUBJECT, Value::String(value.into()))
    }

    pub fn audience(self, values: Vec<String>) -> JoseResult<Self> {
        let value = if values.len() == 1 {
            Value::String(values.into_iter().next().expect("len checked above"))
        } else {
            Value::Array(values.into_iter().map(Value::String).collect())
        };
        self.set(AUDIENCE, value)
    }

    pub fn expiration(self, seconds: i64) -> JoseResult<Self> {
        self.set(EXPIRATION, Value::from(seconds))
    }

    pub fn not_before(self, seconds: i64) -> JoseResult<Self> {
        self.set(NOT_BEFORE, Value::from(seconds))
    }

    pub fn issued_at(self, seconds: i64) -> JoseResult<Self> {
        self.set(ISSUED_AT, Value::from(seconds))
    }

    pub fn jwt_id(self, value: impl Into<String>) -> JoseResult<Self> {
        self.set(JWT_ID, Value::String(value.into()))
    }

    /// Set an arbitrary (registered or custom) claim.
    pub fn claim(self, name: impl Into<String>, value: impl Into<Value>) -> JoseResult<Self> {
        self.set(name, value.into())
    }

    fn set(mut self, name: impl Into<String>, value: Value) -> JoseResult<Self> {
        let name = name.into();
        if self.raw.contains_key(&name) {
            return Err(Error::MalformedClaims(format!("claim '{name}' set more than once")));
        }
        self.raw.insert(name, value);
        Ok(self)
    }

    pub fn build(self) -> ClaimsSet {
        ClaimsSet { raw: self.raw }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_round_trips_registered_claims() {
        let claims = ClaimsSet::builder()
            .issuer("issuer.example")
            .unwrap()
            .subject("alice")
            .unwrap()
            .audience(vec!["api.example".into()])
            .unwrap()
            .expiration(1_700_000_600)
            .unwrap()
            .build();

        assert_eq!(claims.issuer(), Some("issuer.example"));
        assert_eq!(claims.subject(), Some("alice"));
        assert_eq!(claims.audience(), vec!["api.example".to_string()]);
        assert_eq!(claims.expiration(), Some(1_700_000_600));
    }

    #[test]
    fn audience_emits_single_string_when_one_element() {
        let claims = ClaimsSet::builder().audience(vec!["a".into()]).unwrap().build();
        assert_eq!(claims.to_json().get(AUDIENCE), Some(&Value::String("a".into())));
    }

    #[test]
    fn audience_emits_array_when_multiple_elements() {
        let claims = ClaimsSet::builder().audience(vec!["a".into(), "b".into()]).unwrap().build();
        assert!(claims.to_json().get(AUDIENCE).unwrap().is_array());
    }

    #[test]
    fn rejects_setting_the_same_claim_twice() {
        let result = ClaimsSetBuilder::default().subject("alice").unwrap().subject("bob");
        assert!(matches!(result, Err(Error::MalformedClaims(_))));
    }

    #[test]
    fn parse_accepts_single_string_audience() {
        let mut obj = Map::new();
        obj.insert(AUDIENCE.into(), Value::String("a".into()));
        let claims = ClaimsSet::parse(obj).unwrap();
        assert_eq!(claims.audience(), vec!["a".to_string()]);
    }

    #[test]
    fn parse_rejects_non_numeric_expiration() {
        let mut obj = Map::new();
        obj.insert(EXPIRATION.into(), Value::String("soon".into()));
        assert!(matches!(ClaimsSet::parse(obj), Err(Error::MalformedClaims(_))));
    }
}
