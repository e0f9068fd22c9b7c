use dashmap::DashMap;
use rand::{rngs::OsRng, Rng};
use time::{Duration, OffsetDateTime};

/// Codes expire ten minutes after issue.
const CODE_TTL: Duration = Duration::minutes(10);

#[derive(Debug, Clone)]
struct PendingReset {
    code: String,
    user_id: i64,
    expires_at: OffsetDateTime,
}

/// Ephemeral, single-use password-reset codes keyed by normalized email.
///
/// One live entry per email: issuing again supersedes the previous code.
/// Entries expire lazily; expired entries never verify and are evicted on
/// subsequent writes. The map is sharded, so issuing for different emails
/// does not contend, while `verify_and_consume` is atomic per key (at most
/// one concurrent caller can consume a given code).
///
/// Process-local by design: codes do not survive a restart and are not shared
/// across instances. The registry is injected through `AppState` so a shared
/// backing store can replace it without touching the account services.
#[derive(Debug, Default)]
pub struct ResetCodeRegistry {
    codes: DashMap<String, PendingReset>,
}

impl ResetCodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh 6-digit code for `email`, replacing any pending one.
    /// Returns the code so the caller can mail it.
    pub fn issue(&self, email: &str, user_id: i64) -> String {
        self.issue_at(email, user_id, OffsetDateTime::now_utc())
    }

    fn issue_at(&self, email: &str, user_id: i64, now: OffsetDateTime) -> String {
        self.purge_expired(now);

        // Uniform over "000000"..="999999", leading zeros preserved.
        let code = format!("{:06}", OsRng.gen_range(0..1_000_000u32));
        self.codes.insert(
            email.to_string(),
            PendingReset {
                code: code.clone(),
                user_id,
                expires_at: now + CODE_TTL,
            },
        );
        code
    }

    /// Check `submitted` against the pending code for `email`. On success the
    /// entry is removed atomically and the associated user id returned; a
    /// second call with the same code observes `None`. Absent, mismatched and
    /// expired codes are indistinguishable to the caller.
    pub fn verify_and_consume(&self, email: &str, submitted: &str) -> Option<i64> {
        self.verify_and_consume_at(email, submitted, OffsetDateTime::now_utc())
    }

    fn verify_and_consume_at(
        &self,
        email: &str,
        submitted: &str,
        now: OffsetDateTime,
    ) -> Option<i64> {
        if let Some((_, entry)) = self
            .codes
            .remove_if(email, |_, entry| {
                entry.code == submitted && now <= entry.expires_at
            })
        {
            return Some(entry.user_id);
        }
        // Evict a stale entry if that is what blocked the match.
        self.codes.remove_if(email, |_, entry| now > entry.expires_at);
        None
    }

    /// Drop a pending code without consuming it (mail dispatch failed and the
    /// user was never told the code).
    pub fn revoke(&self, email: &str) {
        self.codes.remove(email);
    }

    fn purge_expired(&self, now: OffsetDateTime) {
        self.codes.retain(|_, entry| now <= entry.expires_at);
    }

    #[cfg(test)]
    fn pending_for(&self, email: &str) -> Option<String> {
        self.codes.get(email).map(|entry| entry.code.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_code_is_six_digits() {
        let registry = ResetCodeRegistry::new();
        let code = registry.issue("a@b.com", 1);
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn consume_succeeds_exactly_once() {
        let registry = ResetCodeRegistry::new();
        let code = registry.issue("a@b.com", 1);
        assert_eq!(registry.verify_and_consume("a@b.com", &code), Some(1));
        assert_eq!(registry.verify_and_consume("a@b.com", &code), None);
    }

    #[test]
    fn wrong_code_fails_and_leaves_entry_pending() {
        let registry = ResetCodeRegistry::new();
        let code = registry.issue("a@b.com", 7);
        assert_eq!(registry.verify_and_consume("a@b.com", "......"), None);
        // The real code still works afterwards.
        assert_eq!(registry.verify_and_consume("a@b.com", &code), Some(7));
    }

    #[test]
    fn unknown_email_fails() {
        let registry = ResetCodeRegistry::new();
        assert_eq!(registry.verify_and_consume("nobody@b.com", "123456"), None);
    }

    #[test]
    fn code_expires_after_ttl() {
        let registry = ResetCodeRegistry::new();
        let issued_at = OffsetDateTime::now_utc();
        let code = registry.issue_at("a@b.com", 1, issued_at);

        let just_before = issued_at + CODE_TTL;
        let just_after = issued_at + CODE_TTL + Duration::seconds(1);

        // Not yet expired at the boundary.
        assert_eq!(
            registry.verify_and_consume_at("a@b.com", &code, just_before),
            Some(1)
        );

        let code = registry.issue_at("a@b.com", 1, issued_at);
        assert_eq!(
            registry.verify_and_consume_at("a@b.com", &code, just_after),
            None
        );
        // The expired entry was evicted, not just rejected.
        assert!(registry.pending_for("a@b.com").is_none());
    }

    #[test]
    fn reissue_supersedes_previous_code() {
        let registry = ResetCodeRegistry::new();
        let first = registry.issue("a@b.com", 1);
        let second = registry.issue("a@b.com", 1);
        if first != second {
            assert_eq!(registry.verify_and_consume("a@b.com", &first), None);
        }
        assert_eq!(registry.verify_and_consume("a@b.com", &second), Some(1));
    }

    #[test]
    fn revoke_drops_pending_code() {
        let registry = ResetCodeRegistry::new();
        let code = registry.issue("a@b.com", 1);
        registry.revoke("a@b.com");
        assert_eq!(registry.verify_and_consume("a@b.com", &code), None);
    }

    #[test]
    fn codes_are_scoped_per_email() {
        let registry = ResetCodeRegistry::new();
        let alice = registry.issue("alice@b.com", 1);
        let bob = registry.issue("bob@b.com", 2);
        assert_eq!(registry.verify_and_consume("bob@b.com", &alice), None);
        assert_eq!(registry.verify_and_consume("alice@b.com", &alice), Some(1));
        assert_eq!(registry.verify_and_consume("bob@b.com", &bob), Some(2));
    }

    #[test]
    fn issue_purges_expired_entries_of_other_emails() {
        let registry = ResetCodeRegistry::new();
        let old = OffsetDateTime::now_utc() - Duration::hours(1);
        registry.issue_at("stale@b.com", 1, old);
        registry.issue("fresh@b.com", 2);
        assert!(registry.pending_for("stale@b.com").is_none());
    }

    #[test]
    fn only_one_concurrent_consumer_wins() {
        use std::sync::Arc;

        let registry = Arc::new(ResetCodeRegistry::new());
        let code = registry.issue("a@b.com", 42);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let code = code.clone();
                std::thread::spawn(move || registry.verify_and_consume("a@b.com", &code))
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join())
            .filter(|r| matches!(r, Ok(Some(42))))
            .count();
        assert_eq!(wins, 1);
    }
}
