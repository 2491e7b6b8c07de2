//! Default validity-window claims verifier (§4.7): a pure function over
//! (claims, now, clock skew); the processor supplies `now`, never an
//! ambient clock read from inside the verifier.

use crate::error::{Error, JoseResult};
use crate::jwt::claims::ClaimsSet;

/// Runs after signature verification or decryption succeeds, before a
/// claims set is handed back to the caller. Implementations are free to
/// reject for any reason via `ClaimsRejected`.
pub trait ClaimsVerifier: Send + Sync {
    fn verify(&self, claims: &ClaimsSet, now: i64) -> JoseResult<()>;
}

/// `exp + skew <= now` rejects with `Expired`; `nbf - skew > now` rejects
/// with `NotYetValid`. Default skew is 60 seconds.
#[derive(Clone, Copy, Debug)]
pub struct DefaultClaimsVerifier {
    max_clock_skew: i64,
}

impl Default for DefaultClaimsVerifier {
    fn default() -> Self {
        DefaultClaimsVerifier { max_clock_skew: 60 }
    }
}

impl DefaultClaimsVerifier {
    pub fn new(max_clock_skew_seconds: i64) -> Self {
        DefaultClaimsVerifier { max_clock_skew: max_clock_skew_seconds }
    }
}

impl ClaimsVerifier for DefaultClaimsVerifier {
    fn verify(&self, claims: &ClaimsSet, now: i64) -> JoseResult<()> {
        if let Some(exp) = claims.expiration() {
            if exp + self.max_clock_skew <= now {
                return Err(Error::Expired);
            }
        }
        if let Some(nbf) = claims.not_before() {
            if nbf - self.max_clock_skew > now {
                return Err(Error::NotYetValid);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_with_exp(exp: i64) -> ClaimsSet {
        ClaimsSet::builder().expiration(exp).unwrap().build()
    }

    fn claims_with_nbf(nbf: i64) -> ClaimsSet {
        ClaimsSet::builder().not_before(nbf).unwrap().build()
    }

    #[test]
    fn expired_claim_rejects() {
        let claims = claims_with_exp(1000);
        let verifier = DefaultClaimsVerifier::new(60);
        assert!(matches!(verifier.verify(&claims, 2000), Err(Error::Expired)));
    }

    #[test]
    fn exp_plus_skew_equal_to_now_is_still_expired() {
        let claims = claims_with_exp(1940);
        let verifier = DefaultClaimsVerifier::new(60);
        assert!(matches!(verifier.verify(&claims, 2000), Err(Error::Expired)));
    }

    #[test]
    fn exp_plus_skew_one_past_now_accepts() {
        let claims = claims_with_exp(1941);
        let verifier = DefaultClaimsVerifier::new(60);
        assert!(verifier.verify(&claims, 2000).is_ok());
    }

    #[test]
    fn nbf_minus_skew_equal_to_now_accepts() {
        let claims = claims_with_nbf(2060);
        let verifier = DefaultClaimsVerifier::new(60);
        assert!(verifier.verify(&claims, 2000).is_ok());
    }

    #[test]
    fn nbf_minus_skew_one_past_now_rejects() {
        let claims = claims_with_nbf(2061);
        let verifier = DefaultClaimsVerifier::new(60);
        assert!(matches!(verifier.verify(&claims, 2000), Err(Error::NotYetValid)));
    }

    #[test]
    fn no_exp_or_nbf_accepts() {
        let claims = ClaimsSet::builder().subject("alice").unwrap().build();
        let verifier = DefaultClaimsVerifier::default();
        assert!(verifier.verify(&claims, 1_700_000_000).is_ok());
    }
}
