use rand::Rng;
use time::{Duration, OffsetDateTime};

use crate::auth::password::{hash_password, verify_password};
use crate::error::AuthError;

/// A freshly issued one-time code. `code` exists only for delivery; the store
/// keeps `hash` and `expires_at`.
#[derive(Debug)]
pub struct IssuedOtp {
    pub code: String,
    pub hash: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpError {
    /// No OTP material is stored for the record.
    Missing,
    /// The stored expiry has passed.
    Expired,
    /// The submitted code does not match the stored hash.
    Mismatch,
}

impl From<OtpError> for AuthError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::Missing => AuthError::OtpMissing,
            OtpError::Expired => AuthError::OtpExpired,
            OtpError::Mismatch => AuthError::OtpMismatch,
        }
    }
}

/// Generate a 6-digit code, hash it and time-bound it.
pub fn issue(ttl: Duration) -> anyhow::Result<IssuedOtp> {
    let code = rand::thread_rng().gen_range(100_000..=999_999).to_string();
    let hash = hash_password(&code)?;
    Ok(IssuedOtp {
        code,
        hash,
        expires_at: OffsetDateTime::now_utc() + ttl,
    })
}

/// Check a submitted code against stored material.
///
/// Hash and expiry are set and cleared together; a missing half means no OTP
/// is outstanding. Comparison is delegated to the hashing primitive, never
/// plaintext equality.
pub fn verify(
    code: &str,
    stored_hash: Option<&str>,
    stored_expiry: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> Result<(), OtpError> {
    let (hash, expiry) = match (stored_hash, stored_expiry) {
        (Some(h), Some(e)) => (h, e),
        _ => return Err(OtpError::Missing),
    };
    if now > expiry {
        return Err(OtpError::Expired);
    }
    match verify_password(code, hash) {
        Ok(true) => Ok(()),
        _ => Err(OtpError::Mismatch),
    }
}
