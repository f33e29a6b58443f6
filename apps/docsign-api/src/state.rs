//! Application state for DocSign API
//!
//! Everything lives in memory: issued codes, verified signers and received
//! signature images are lost on restart.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rand_core::{OsRng, RngCore};
use shared_types::SignatureRequestId;

use crate::error::ApiError;

/// How long an issued code stays valid unless `OTP_TTL_MINUTES` says otherwise
pub const DEFAULT_OTP_TTL_MINUTES: i64 = 30;

type SignerKey = (String, SignatureRequestId);

#[derive(Debug, Clone)]
struct IssuedOtp {
    code: String,
    signature_request_id: SignatureRequestId,
    expires_at: DateTime<Utc>,
}

pub struct AppState {
    otp_ttl: Duration,
    /// Latest code per email; sending again replaces it
    otps: Mutex<HashMap<String, IssuedOtp>>,
    verified: Mutex<HashSet<SignerKey>>,
    signatures: Mutex<HashMap<SignerKey, Vec<u8>>>,
}

impl AppState {
    pub fn new(otp_ttl: Duration) -> Self {
        Self {
            otp_ttl,
            otps: Mutex::new(HashMap::new()),
            verified: Mutex::new(HashSet::new()),
            signatures: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_env() -> Self {
        let minutes = std::env::var("OTP_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_OTP_TTL_MINUTES);
        tracing::info!("OTP codes expire after {} minutes", minutes);
        Self::new(Duration::minutes(minutes))
    }

    /// Issue a fresh six-digit code for `email`
    pub fn issue_otp(&self, email: &str, signature_request_id: SignatureRequestId) -> String {
        let code = (OsRng.next_u32() % 900_000 + 100_000).to_string();
        let issued = IssuedOtp {
            code: code.clone(),
            signature_request_id,
            expires_at: Utc::now() + self.otp_ttl,
        };
        lock(&self.otps).insert(email.to_string(), issued);
        code
    }

    /// Code currently outstanding for `email`, if any
    pub fn issued_code(&self, email: &str) -> Option<String> {
        lock(&self.otps).get(email).map(|otp| otp.code.clone())
    }

    /// Check `code` and consume it on success
    pub fn verify_otp(
        &self,
        email: &str,
        code: &str,
        signature_request_id: SignatureRequestId,
    ) -> Result<(), ApiError> {
        let mut otps = lock(&self.otps);
        let issued = otps.get(email).ok_or(ApiError::OtpNotFound)?;

        if issued.expires_at < Utc::now() {
            otps.remove(email);
            return Err(ApiError::OtpExpired);
        }
        if issued.code != code.trim() || issued.signature_request_id != signature_request_id {
            return Err(ApiError::InvalidOtp);
        }

        otps.remove(email);
        drop(otps);
        lock(&self.verified).insert((email.to_string(), signature_request_id));
        Ok(())
    }

    pub fn is_verified(&self, email: &str, signature_request_id: SignatureRequestId) -> bool {
        lock(&self.verified).contains(&(email.to_string(), signature_request_id))
    }

    pub fn store_signature(
        &self,
        email: &str,
        signature_request_id: SignatureRequestId,
        png: Vec<u8>,
    ) {
        lock(&self.signatures).insert((email.to_string(), signature_request_id), png);
    }

    pub fn signature(&self, email: &str, signature_request_id: SignatureRequestId) -> Option<Vec<u8>> {
        lock(&self.signatures)
            .get(&(email.to_string(), signature_request_id))
            .cloned()
    }
}

/// Handlers never panic while holding a lock, so a poisoned mutex still holds
/// consistent data
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_six_digits() {
        let state = AppState::new(Duration::minutes(30));
        for _ in 0..50 {
            let code = state.issue_otp("a@b.com", SignatureRequestId(1));
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_verify_consumes_code() {
        let state = AppState::new(Duration::minutes(30));
        let code = state.issue_otp("a@b.com", SignatureRequestId(1));
        state.verify_otp("a@b.com", &code, SignatureRequestId(1)).unwrap();
        assert!(state.is_verified("a@b.com", SignatureRequestId(1)));
        assert!(matches!(
            state.verify_otp("a@b.com", &code, SignatureRequestId(1)),
            Err(ApiError::OtpNotFound)
        ));
    }

    #[test]
    fn test_wrong_code_keeps_outstanding_code() {
        let state = AppState::new(Duration::minutes(30));
        let code = state.issue_otp("a@b.com", SignatureRequestId(1));
        let wrong = if code == "100000" { "100001" } else { "100000" };
        assert!(matches!(
            state.verify_otp("a@b.com", wrong, SignatureRequestId(1)),
            Err(ApiError::InvalidOtp)
        ));
        assert!(matches!(
            state.verify_otp("a@b.com", &code, SignatureRequestId(2)),
            Err(ApiError::InvalidOtp)
        ));
        assert!(state.verify_otp("a@b.com", &code, SignatureRequestId(1)).is_ok());
    }

    #[test]
    fn test_expired_code() {
        let state = AppState::new(Duration::minutes(-1));
        let code = state.issue_otp("a@b.com", SignatureRequestId(1));
        assert!(matches!(
            state.verify_otp("a@b.com", &code, SignatureRequestId(1)),
            Err(ApiError::OtpExpired)
        ));
        assert_eq!(state.issued_code("a@b.com"), None);
    }
}
