//! Per-client sliding-window rate limiting.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Returns `true` and records the request if `client` is under its limit.
    async fn check_and_record(&self, client: IpAddr) -> bool;
}

/// At most `max_requests` per client in any trailing `window`.
///
/// Timestamps at least `window` old are pruned on every check of that
/// client; clients with nothing left in their window are dropped by
/// [`SlidingWindowLimiter::evict_idle`].
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    clients: Mutex<HashMap<IpAddr, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub async fn check_at(&self, client: IpAddr, now: Instant) -> bool {
        let mut clients = self.clients.lock().await;
        let hits = clients.entry(client).or_default();
        prune(hits, now, self.window);
        if hits.len() >= self.max_requests {
            return false;
        }
        hits.push_back(now);
        true
    }

    /// Drops clients whose whole history has aged out. Returns how many.
    pub async fn evict_idle_at(&self, now: Instant) -> usize {
        let mut clients = self.clients.lock().await;
        let before = clients.len();
        clients.retain(|_, hits| {
            prune(hits, now, self.window);
            !hits.is_empty()
        });
        before - clients.len()
    }

    pub async fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now()).await
    }

    pub async fn tracked_clients(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Background loop: evict idle clients once per window.
    pub async fn run_eviction(self: Arc<Self>) {
        let mut tick = tokio::time::interval(self.window);
        loop {
            tick.tick().await;
            let evicted = self.evict_idle().await;
            if evicted > 0 {
                debug!(evicted, "evicted idle rate-limit clients");
            }
        }
    }
}

fn prune(hits: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = hits.front() {
        if now.saturating_duration_since(oldest) < window {
            break;
        }
        hits.pop_front();
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowLimiter {
    async fn check_and_record(&self, client: IpAddr) -> bool {
        self.check_at(client, Instant::now()).await
    }
}
