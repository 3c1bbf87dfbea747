use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::interval;

/// Opaque client identity for unauthenticated requests: hex SHA-256 of
/// `ip|user-agent|accept-language`. No raw request data is retained.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn from_parts(ip: &str, user_agent: &str, accept_language: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}|{}|{}", ip, user_agent, accept_language));
        Fingerprint(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone)]
pub struct RateDecision {
    pub allowed: bool,
    /// Requests counted in the current window, this one included.
    pub count: u32,
    /// Time until the window ends; set only on rejection.
    pub retry_after: Option<Duration>,
}

struct ClientRecord {
    count: u32,
    window_start: Instant,
    last_seen: Instant,
}

/// Fixed-window rate limiter keyed by client fingerprint.
///
/// The window opens on a fingerprint's first contact and is never slid;
/// once it elapses the next request opens a fresh one with count 1. A
/// periodic sweeper evicts fingerprints that have been idle past the
/// staleness threshold so the table does not grow without bound.
pub struct FingerprintRateLimiter {
    limit: u32,
    window: Duration,
    stale_after: Duration,
    sweep_interval: Duration,
    clients: Mutex<HashMap<String, ClientRecord>>,
}

impl FingerprintRateLimiter {
    pub fn new(
        limit: u32,
        window: Duration,
        stale_after: Duration,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            limit,
            window,
            stale_after,
            sweep_interval,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Check and count one request for `fingerprint`.
    pub async fn admit(&self, fingerprint: &Fingerprint) -> RateDecision {
        let now = Instant::now();
        let mut clients = self.clients.lock().await;

        let record = clients
            .entry(fingerprint.as_str().to_string())
            .or_insert_with(|| ClientRecord {
                count: 0,
                window_start: now,
                last_seen: now,
            });
        record.last_seen = now;

        let elapsed = now.duration_since(record.window_start);
        if elapsed >= self.window {
            record.window_start = now;
            record.count = 1;
            return RateDecision {
                allowed: true,
                count: 1,
                retry_after: None,
            };
        }

        if record.count >= self.limit {
            let retry_after = self.window - elapsed;
            tracing::warn!(
                fingerprint = %fingerprint,
                count = record.count,
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            return RateDecision {
                allowed: false,
                count: record.count,
                retry_after: Some(retry_after),
            };
        }

        record.count += 1;
        RateDecision {
            allowed: true,
            count: record.count,
            retry_after: None,
        }
    }

    /// Evict fingerprints idle longer than the staleness threshold. Returns
    /// the number evicted.
    pub async fn sweep_stale(&self) -> usize {
        let now = Instant::now();
        let mut clients = self.clients.lock().await;
        let before = clients.len();
        clients.retain(|_, record| now.duration_since(record.last_seen) < self.stale_after);
        let evicted = before - clients.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = clients.len(), "Swept stale rate-limit records");
        }
        evicted
    }

    /// Number of fingerprints currently tracked.
    pub async fn tracked_clients(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Start the background staleness sweeper.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut sweep = interval(self.sweep_interval);
            loop {
                sweep.tick().await;
                self.sweep_stale().await;
            }
        })
    }
}
