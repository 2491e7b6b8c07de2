//! Unsecured/JWS/JWE header model (RFC 7515 §4, RFC 7516 §4).
//!
//! Headers are immutable after construction and round-trip losslessly
//! through a JSON object: recognized parameters get typed accessors,
//! everything else is carried in `raw` untouched.

use std::str::FromStr;

use serde_json::{Map, Value};

use crate::alg::{EncryptionMethod, JweAlgorithm, JwsAlgorithm};
use crate::error::{Error, JoseResult};
use crate::json;
use crate::jwk::Jwk;

/// Common parameters present across all three header kinds.
#[derive(Clone, Debug, Default)]
pub struct CommonParams {
    pub typ: Option<String>,
    pub cty: Option<String>,
    pub crit: Option<Vec<String>>,
    pub kid: Option<String>,
    pub jwk: Option<Jwk>,
    pub jku: Option<String>,
    pub x5u: Option<String>,
    pub x5c: Option<Vec<String>>,
    pub x5t: Option<String>,
    pub x5t_s256: Option<String>,
}

/// JWE-only parameters.
#[derive(Clone, Debug, Default)]
pub struct JweParams {
    pub zip: Option<String>,
    pub epk: Option<Jwk>,
    pub apu: Option<String>,
    pub apv: Option<String>,
    pub p2s: Option<String>,
    pub p2c: Option<i64>,
    pub iv: Option<String>,
    pub tag: Option<String>,
}

#[derive(Clone, Debug)]
enum Kind {
    Unsecured,
    Jws(JwsAlgorithm),
    Jwe(JweAlgorithm, EncryptionMethod, JweParams),
}

/// A parsed or freshly-built JOSE header.
#[derive(Clone, Debug)]
pub struct Header {
    kind: Kind,
    common: CommonParams,
    /// The full JSON object this header was parsed from, or (for freshly
    /// built headers) the canonical object this header serializes to.
    raw: Map<String, Value>,
}

const RECOGNIZED_COMMON: &[&str] = &["alg", "typ", "cty", "crit", "kid", "jwk", "jku", "x5u", "x5c", "x5t", "x5t#S256"];
const RECOGNIZED_JWE_EXTRA: &[&str] = &["enc", "zip", "epk", "apu", "apv", "p2s", "p2c", "iv", "tag"];

impl Header {
    /// Parse a header from a JSON object. `alg`/`enc` presence determines
    /// which variant results; callers (the JOSE codec) decide whether the
    /// segment count matches the variant.
    pub fn parse(obj: Map<String, Value>) -> JoseResult<Self> {
        let alg_str = json::get_str(&obj, "alg")?.ok_or_else(|| Error::malformed("header missing 'alg'"))?;
        let common = Self::parse_common(&obj)?;

        let kind = if alg_str == "none" {
            Kind::Unsecured
        } else if let Some(enc_str) = json::get_str(&obj, "enc")? {
            let alg: JweAlgorithm = alg_str.parse()?;
            let enc: EncryptionMethod = enc_str.parse()?;
            let jwe = JweParams {
                zip: json::get_str(&obj, "zip")?.map(str::to_string),
                epk: json::get_object(&obj, "epk")?.map(Jwk::from_json).transpose()?,
                apu: json::get_str(&obj, "apu")?.map(str::to_string),
                apv: json::get_str(&obj, "apv")?.map(str::to_string),
                p2s: json::get_str(&obj, "p2s")?.map(str::to_string),
                p2c: json::get_long(&obj, "p2c")?,
                iv: json::get_str(&obj, "iv")?.map(str::to_string),
                tag: json::get_str(&obj, "tag")?.map(str::to_string),
            };
            Kind::Jwe(alg, enc, jwe)
        } else {
            Kind::Jws(alg_str.parse()?)
        };

        Ok(Header { kind, common, raw: obj })
    }

    fn parse_common(obj: &Map<String, Value>) -> JoseResult<CommonParams> {
        Ok(CommonParams {
            typ: json::get_str(obj, "typ")?.map(str::to_string),
            cty: json::get_str(obj, "cty")?.map(str::to_string),
            crit: json::get_str_array(obj, "crit")?,
            kid: json::get_str(obj, "kid")?.map(str::to_string),
            jwk: json::get_object(obj, "jwk")?.map(Jwk::from_json).transpose()?,
            jku: json::get_str(obj, "jku")?.map(str::to_string),
            x5u: json::get_str(obj, "x5u")?.map(str::to_string),
            x5c: json::get_str_array(obj, "x5c")?,
            x5t: json::get_str(obj, "x5t")?.map(str::to_string),
            x5t_s256: json::get_str(obj, "x5t#S256")?.map(str::to_string),
        })
    }

    /// Build a fresh Unsecured header.
    pub fn new_unsecured(common: CommonParams) -> Self {
        let mut raw = Map::new();
        raw.insert("alg".into(), Value::String("none".into()));
        insert_common(&mut raw, &common);
        Header { kind: Kind::Unsecured, common, raw }
    }

    /// Build a fresh JWS header.
    pub fn new_jws(alg: JwsAlgorithm, common: CommonParams) -> Self {
        let mut raw = Map::new();
        raw.insert("alg".into(), Value::String(alg.name().into()));
        insert_common(&mut raw, &common);
        Header { kind: Kind::Jws(alg), common, raw }
    }

    /// Build a fresh JWE header.
    pub fn new_jwe(alg: JweAlgorithm, enc: EncryptionMethod, common: CommonParams, jwe: JweParams) -> Self {
        let mut raw = Map::new();
        raw.insert("alg".into(), Value::String(alg.name().into()));
        raw.insert("enc".into(), Value::String(enc.name().into()));
        insert_common(&mut raw, &common);
        if let Some(z) = &jwe.zip {
            raw.insert("zip".into(), Value::String(z.clone()));
        }
        if let Some(epk) = &jwe.epk {
            raw.insert("epk".into(), Value::Object(epk.to_json()));
        }
        if let Some(v) = &jwe.apu {
            raw.insert("apu".into(), Value::String(v.clone()));
        }
        if let Some(v) = &jwe.apv {
            raw.insert("apv".into(), Value::String(v.clone()));
        }
        if let Some(v) = &jwe.p2s {
            raw.insert("p2s".into(), Value::String(v.clone()));
        }
        if let Some(v) = jwe.p2c {
            raw.insert("p2c".into(), Value::Number(v.into()));
        }
        if let Some(v) = &jwe.iv {
            raw.insert("iv".into(), Value::String(v.clone()));
        }
        if let Some(v) = &jwe.tag {
            raw.insert("tag".into(), Value::String(v.clone()));
        }
        Header { kind: Kind::Jwe(alg, enc, jwe), common, raw }
    }

    /// Return a copy of this header with `iv`/`tag`/`epk`/`p2s`/`p2c`
    /// amended (used by AESGCMKW/ECDH-ES/PBES2 encrypters, which derive
    /// these values during `encrypt` and must fold them back into the
    /// header that gets serialized).
    pub fn with_jwe_params_amended(&self, amend: impl FnOnce(&mut JweParams)) -> JoseResult<Self> {
        let (alg, enc, mut jwe) = match &self.kind {
            Kind::Jwe(alg, enc, jwe) => (*alg, *enc, jwe.clone()),
            _ => return Err(Error::IllegalState("not a JWE header".into())),
        };
        amend(&mut jwe);
        Ok(Header::new_jwe(alg, enc, self.common.clone(), jwe))
    }

    pub fn is_unsecured(&self) -> bool {
        matches!(self.kind, Kind::Unsecured)
    }

    pub fn jws_algorithm(&self) -> Option<JwsAlgorithm> {
        match self.kind {
            Kind::Jws(alg) => Some(alg),
            _ => None,
        }
    }

    pub fn jwe_algorithm(&self) -> Option<(JweAlgorithm, EncryptionMethod)> {
        match &self.kind {
            Kind::Jwe(alg, enc, _) => Some((*alg, *enc)),
            _ => None,
        }
    }

    pub fn jwe_params(&self) -> Option<&JweParams> {
        match &self.kind {
            Kind::Jwe(_, _, p) => Some(p),
            _ => None,
        }
    }

    pub fn common(&self) -> &CommonParams {
        &self.common
    }

    pub fn content_type(&self) -> Option<&str> {
        self.common.cty.as_deref()
    }

    pub fn key_id(&self) -> Option<&str> {
        self.common.kid.as_deref()
    }

    /// Serialize to its canonical JSON byte representation.
    pub fn to_json_bytes(&self) -> JoseResult<Vec<u8>> {
        Ok(serde_json::to_vec(&Value::Object(self.raw.clone()))?)
    }

    /// Access an arbitrary (recognized or custom) parameter by name.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.raw.get(name)
    }

    /// Enforce the `crit` whitelist: every name in `crit` must be in
    /// `whitelisted`, or parsing fails with `CriticalParamUnsupported`.
    pub fn check_critical(&self, whitelisted: &[&str]) -> JoseResult<()> {
        if let Some(crit) = &self.common.crit {
            for name in crit {
                if !whitelisted.contains(&name.as_str()) {
                    return Err(Error::CriticalParamUnsupported(name.clone()));
                }
            }
        }
        Ok(())
    }

    /// Enforce the accepted-parameter policy: every parameter present in
    /// the header must be either recognized for this header's kind or
    /// whitelisted via `crit`.
    pub fn check_accepted(&self, extra_accepted: &[&str]) -> JoseResult<()> {
        let mut accepted: Vec<&str> = RECOGNIZED_COMMON.to_vec();
        if matches!(self.kind, Kind::Jwe(..)) {
            accepted.extend_from_slice(RECOGNIZED_JWE_EXTRA);
        }
        accepted.extend_from_slice(extra_accepted);
        if let Some(crit) = &self.common.crit {
            for name in crit {
                accepted.push(name.as_str());
            }
            accepted.push("crit");
        }
        for key in self.raw.keys() {
            if !accepted.contains(&key.as_str()) {
                return Err(Error::HeaderNotAccepted(key.clone()));
            }
        }
        Ok(())
    }
}

fn insert_common(raw: &mut Map<String, Value>, common: &CommonParams) {
    if let Some(v) = &common.typ {
        raw.insert("typ".into(), Value::String(v.clone()));
    }
    if let Some(v) = &common.cty {
        raw.insert("cty".into(), Value::String(v.clone()));
    }
    if let Some(v) = &common.crit {
        raw.insert("crit".into(), Value::Array(v.iter().cloned().map(Value::String).collect()));
    }
    if let Some(v) = &common.kid {
        raw.insert("kid".into(), Value::String(v.clone()));
    }
    if let Some(v) = &common.jwk {
        raw.insert("jwk".into(), Value::Object(v.to_json()));
    }
    if let Some(v) = &common.jku {
        raw.insert("jku".into(), Value::String(v.clone()));
    }
    if let Some(v) = &common.x5u {
        raw.insert("x5u".into(), Value::String(v.clone()));
    }
    if let Some(v) = &common.x5c {
        raw.insert("x5c".into(), Value::Array(v.iter().cloned().map(Value::String).collect()));
    }
    if let Some(v) = &common.x5t {
        raw.insert("x5t".into(), Value::String(v.clone()));
    }
    if let Some(v) = &common.x5t_s256 {
        raw.insert("x5t#S256".into(), Value::String(v.clone()));
    }
}
