// src/services/otp.rs

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rand::Rng;
use subtle::ConstantTimeEq;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
struct OtpEntry {
    code: String,
    expires_at: Instant,
}

/// Process-wide OTP store. Cloning shares the same map.
#[derive(Debug, Clone)]
pub struct OtpStore {
    entries: Arc<DashMap<String, OtpEntry>>,
    ttl: Duration,
}

impl OtpStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Generates a zero-padded 6-digit code, replacing any earlier one for `identity`.
    pub fn issue(&self, identity: &str) -> String {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
        self.entries.insert(
            identity.to_owned(),
            OtpEntry {
                code: code.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        tracing::debug!("OTP generated for: {}", identity);
        code
    }

    /// Consumes the code on a match. An expired entry is dropped and never matches.
    /// A wrong code leaves the entry in place for a retry.
    ///
    /// The whole check runs under the entry's shard lock, so two racing
    /// verifications of the same code cannot both succeed.
    pub fn verify(&self, identity: &str, code: &str) -> bool {
        let Entry::Occupied(entry) = self.entries.entry(identity.to_owned()) else {
            return false;
        };

        if Instant::now() >= entry.get().expires_at {
            entry.remove();
            return false;
        }

        if bool::from(entry.get().code.as_bytes().ct_eq(code.trim().as_bytes())) {
            entry.remove();
            return true;
        }

        false
    }

    /// Drops every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Periodically evicts expired codes. Verification stays correct without it.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let removed = store.purge_expired();
                if removed > 0 {
                    tracing::debug!("Evicted {} expired OTP entries", removed);
                }
            }
        })
    }
}
