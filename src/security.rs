/// Security primitives for the public auth surface
/// Features:
/// - Per-client rate limiting (credential stuffing / reset spam protection)
/// - Security headers (XSS, clickjacking, sniffing protection)

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use actix_web::middleware::DefaultHeaders;

use crate::configuration::RateLimitSettings;

/// Idle buckets are swept once this many clients are tracked
const PRUNE_THRESHOLD: usize = 10_000;

/// Simple token bucket rate limiter implementation
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    capacity: f64,
    refill_rate: f64, // tokens per second
}

impl TokenBucket {
    fn new(requests_per_minute: u32) -> Self {
        Self {
            tokens: requests_per_minute as f64,
            last_refill: Instant::now(),
            capacity: requests_per_minute as f64,
            refill_rate: requests_per_minute as f64 / 60.0,
        }
    }

    fn try_take_token(&mut self) -> bool {
        let now = Instant::now();
        let elapsed_secs = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed_secs * self.refill_rate).min(self.capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn is_full(&self) -> bool {
        let elapsed_secs = self.last_refill.elapsed().as_secs_f64();
        self.tokens + elapsed_secs * self.refill_rate >= self.capacity
    }
}

/// Tracks one token bucket per client key (usually the peer IP)
pub struct RateLimiter {
    requests_per_minute: u32,
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl RateLimiter {
    pub fn new(settings: &RateLimitSettings) -> Self {
        Self {
            requests_per_minute: settings.requests_per_minute.max(1),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Take one request from `client`'s budget
    pub fn check(&self, client: &str) -> Result<(), String> {
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if buckets.len() >= PRUNE_THRESHOLD {
            prune(&mut buckets);
        }

        let allowed = buckets
            .entry(client.to_string())
            .or_insert_with(|| TokenBucket::new(self.requests_per_minute))
            .try_take_token();

        if allowed {
            Ok(())
        } else {
            Err(format!(
                "max {} requests per minute",
                self.requests_per_minute
            ))
        }
    }
}

/// Drop buckets that have fully refilled; a fresh bucket is equivalent
fn prune(buckets: &mut HashMap<String, TokenBucket>) {
    buckets.retain(|_, bucket| !bucket.is_full());
}

/// Security headers for HTTP responses
pub struct SecurityHeaders;

impl SecurityHeaders {
    pub fn headers() -> Vec<(&'static str, &'static str)> {
        vec![
            ("X-Content-Type-Options", "nosniff"),
            ("X-Frame-Options", "DENY"),
            ("X-XSS-Protection", "1; mode=block"),
            ("Content-Security-Policy", "default-src 'none'; frame-ancestors 'none'"),
            ("Referrer-Policy", "no-referrer"),
            ("Cache-Control", "no-store"),
            ("Strict-Transport-Security", "max-age=31536000; includeSubDomains"),
        ]
    }

    /// The header set as an actix middleware
    pub fn middleware() -> DefaultHeaders {
        Self::headers()
            .into_iter()
            .fold(DefaultHeaders::new(), |headers, pair| headers.add(pair))
    }
}
