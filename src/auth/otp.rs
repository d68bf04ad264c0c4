use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use time::{Duration, OffsetDateTime};
use tokio::sync::RwLock;
use tracing::debug;

/// How long a freshly issued code stays usable.
pub const OTP_TTL: Duration = Duration::minutes(5);
/// Wrong-code submissions allowed before the record dies.
pub const OTP_ATTEMPTS: u8 = 3;
/// Extension granted on successful verification so the follow-up step
/// (register / set new password) has time to complete.
pub const VALIDATED_WINDOW: Duration = Duration::minutes(10);
/// Sweeper cadence and the slack it allows past expiry.
pub const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);
pub const SWEEP_GRACE: Duration = Duration::seconds(120);

/// Flow-specific payload carried until the OTP is consumed.
#[derive(Debug, Clone)]
pub enum OtpPurpose {
    Registration { name: String, password_hash: String },
    PasswordReset,
}

#[derive(Debug, Clone)]
pub struct OtpRecord {
    pub code: String,
    pub expires_at: OffsetDateTime,
    pub attempts_left: u8,
    pub validated: bool,
    pub purpose: OtpPurpose,
}

impl OtpRecord {
    pub fn issue(purpose: OtpPurpose) -> Self {
        Self::issue_at(purpose, OffsetDateTime::now_utc())
    }

    fn issue_at(purpose: OtpPurpose, now: OffsetDateTime) -> Self {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        Self {
            code,
            expires_at: now + OTP_TTL,
            attempts_left: OTP_ATTEMPTS,
            validated: false,
            purpose,
        }
    }

    /// Usable for the follow-up step: verified and still inside its window.
    pub fn is_validated(&self, now: OffsetDateTime) -> bool {
        self.validated && now < self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpVerification {
    Validated,
    WrongCode { attempts_left: u8 },
    AlreadyValidated,
    Expired,
}

/// Process-local challenge store keyed by email. One record per email; a
/// new issue overwrites the previous one. Not shared across instances.
#[derive(Clone, Default)]
pub struct OtpLedger {
    records: Arc<RwLock<HashMap<String, OtpRecord>>>,
}

impl OtpLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, email: &str, record: OtpRecord) {
        self.records
            .write()
            .await
            .insert(email.to_string(), record);
    }

    pub async fn get(&self, email: &str) -> Option<OtpRecord> {
        self.records.read().await.get(email).cloned()
    }

    /// Removing an absent record is a no-op.
    pub async fn remove(&self, email: &str) {
        self.records.write().await.remove(email);
    }

    pub async fn verify(&self, email: &str, code: &str) -> OtpVerification {
        self.verify_at(email, code, OffsetDateTime::now_utc()).await
    }

    async fn verify_at(&self, email: &str, code: &str, now: OffsetDateTime) -> OtpVerification {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(email) else {
            return OtpVerification::Expired;
        };

        if record.validated {
            return OtpVerification::AlreadyValidated;
        }
        if record.attempts_left == 0 || now >= record.expires_at {
            records.remove(email);
            return OtpVerification::Expired;
        }

        if record.code != code {
            record.attempts_left -= 1;
            let attempts_left = record.attempts_left;
            if attempts_left == 0 {
                records.remove(email);
            }
            return OtpVerification::WrongCode { attempts_left };
        }

        record.validated = true;
        record.expires_at = now + VALIDATED_WINDOW;
        OtpVerification::Validated
    }

    /// Safety net behind the explicit removals done by request handlers.
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let ledger = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                ledger.sweep_at(OffsetDateTime::now_utc()).await;
            }
        })
    }

    async fn sweep_at(&self, now: OffsetDateTime) {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| r.attempts_left > 0 && now < r.expires_at + SWEEP_GRACE);
        let swept = before - records.len();
        if swept > 0 {
            debug!(swept, "otp ledger sweep");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reset_record(now: OffsetDateTime) -> OtpRecord {
        OtpRecord {
            code: "123456".into(),
            expires_at: now + OTP_TTL,
            attempts_left: OTP_ATTEMPTS,
            validated: false,
            purpose: OtpPurpose::PasswordReset,
        }
    }

    #[tokio::test]
    async fn correct_code_validates_and_extends_expiry() {
        let now = OffsetDateTime::now_utc();
        let ledger = OtpLedger::new();
        ledger.add("a@x.com", reset_record(now)).await;

        assert_eq!(
            ledger.verify_at("a@x.com", "123456", now).await,
            OtpVerification::Validated
        );
        let record = ledger.get("a@x.com").await.expect("record kept");
        assert!(record.validated);
        assert_eq!(record.expires_at, now + VALIDATED_WINDOW);
        assert!(record.is_validated(now));
    }

    #[tokio::test]
    async fn wrong_code_counts_down_and_exhaustion_removes_the_record() {
        let now = OffsetDateTime::now_utc();
        let ledger = OtpLedger::new();
        ledger.add("a@x.com", reset_record(now)).await;

        assert_eq!(
            ledger.verify_at("a@x.com", "000000", now).await,
            OtpVerification::WrongCode { attempts_left: 2 }
        );
        assert_eq!(
            ledger.verify_at("a@x.com", "000000", now).await,
            OtpVerification::WrongCode { attempts_left: 1 }
        );
        assert_eq!(
            ledger.verify_at("a@x.com", "000000", now).await,
            OtpVerification::WrongCode { attempts_left: 0 }
        );
        // Exhausted record is gone; further checks read as expired
        assert!(ledger.get("a@x.com").await.is_none());
        assert_eq!(
            ledger.verify_at("a@x.com", "123456", now).await,
            OtpVerification::Expired
        );
    }

    #[tokio::test]
    async fn verifying_after_expiry_removes_the_record() {
        let now = OffsetDateTime::now_utc();
        let ledger = OtpLedger::new();
        ledger.add("a@x.com", reset_record(now)).await;

        let later = now + OTP_TTL + Duration::seconds(1);
        assert_eq!(
            ledger.verify_at("a@x.com", "123456", later).await,
            OtpVerification::Expired
        );
        assert!(ledger.get("a@x.com").await.is_none());
    }

    #[tokio::test]
    async fn already_validated_is_a_distinct_outcome() {
        let now = OffsetDateTime::now_utc();
        let ledger = OtpLedger::new();
        ledger.add("a@x.com", reset_record(now)).await;
        ledger.verify_at("a@x.com", "123456", now).await;

        assert_eq!(
            ledger.verify_at("a@x.com", "123456", now).await,
            OtpVerification::AlreadyValidated
        );
    }

    #[tokio::test]
    async fn reissue_overwrites_the_previous_record() {
        let now = OffsetDateTime::now_utc();
        let ledger = OtpLedger::new();
        let mut first = reset_record(now);
        first.attempts_left = 1;
        ledger.add("a@x.com", first).await;
        ledger.add("a@x.com", reset_record(now)).await;

        let record = ledger.get("a@x.com").await.expect("record");
        assert_eq!(record.attempts_left, OTP_ATTEMPTS);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let ledger = OtpLedger::new();
        ledger.remove("missing@x.com").await;
        ledger.remove("missing@x.com").await;
        assert!(ledger.get("missing@x.com").await.is_none());
    }

    #[tokio::test]
    async fn sweep_purges_past_grace_and_exhausted_records() {
        let now = OffsetDateTime::now_utc();
        let ledger = OtpLedger::new();

        ledger.add("fresh@x.com", reset_record(now)).await;

        let mut exhausted = reset_record(now);
        exhausted.attempts_left = 0;
        ledger.add("exhausted@x.com", exhausted).await;

        let mut old = reset_record(now);
        old.expires_at = now - SWEEP_GRACE - Duration::seconds(1);
        ledger.add("old@x.com", old).await;

        // Expired but still inside the grace window survives the sweep
        let mut graced = reset_record(now);
        graced.expires_at = now - Duration::seconds(30);
        ledger.add("graced@x.com", graced).await;

        ledger.sweep_at(now).await;

        assert!(ledger.get("fresh@x.com").await.is_some());
        assert!(ledger.get("graced@x.com").await.is_some());
        assert!(ledger.get("exhausted@x.com").await.is_none());
        assert!(ledger.get("old@x.com").await.is_none());
    }

    #[tokio::test]
    async fn issued_codes_are_six_digits() {
        let record = OtpRecord::issue(OtpPurpose::PasswordReset);
        assert_eq!(record.code.len(), 6);
        assert!(record.code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(record.attempts_left, OTP_ATTEMPTS);
        assert!(!record.validated);
    }
}
