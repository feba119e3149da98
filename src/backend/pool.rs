//! Rotator/Recycler pooling.
//!
//! A `Rotator` round-robins (atomic counter) across `N` `Recycler`s. Each
//! `Recycler` holds a lock-free `ArcSwap<reqwest::Client>` and periodically
//! replaces its client with a fresh one once its jittered TTL elapses,
//! staggering eviction across slots so the backend never loses its whole
//! connection pool at once.

use arc_swap::ArcSwap;
use rand::Rng;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One pooled slot: a swappable `reqwest::Client` plus the instant it is due
/// for replacement.
pub struct Recycler {
    client: ArcSwap<reqwest::Client>,
    due_at: AtomicU64,
    ttl: Duration,
    jitter: Duration,
    build: Arc<dyn Fn() -> reqwest::Client + Send + Sync>,
    epoch: Instant,
}

impl Recycler {
    pub fn new(ttl: Duration, build: impl Fn() -> reqwest::Client + Send + Sync + 'static) -> Self {
        let jitter = ttl / 5;
        let epoch = Instant::now();
        let client = build();
        let due = Self::jittered_due(epoch, ttl, jitter);
        Recycler {
            client: ArcSwap::from_pointee(client),
            due_at: AtomicU64::new(due),
            ttl,
            jitter,
            build: Arc::new(build),
            epoch,
        }
    }

    fn jittered_due(epoch: Instant, ttl: Duration, jitter: Duration) -> u64 {
        let jitter_ms = if jitter.as_millis() == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter.as_millis() as u64)
        };
        (epoch.elapsed().as_millis() as u64) + ttl.as_millis() as u64 + jitter_ms
    }

    /// Return the current pooled client, swapping in a freshly built one first
    /// if this slot's TTL has elapsed.
    pub fn get(&self) -> Arc<reqwest::Client> {
        let now_ms = self.epoch.elapsed().as_millis() as u64;
        if now_ms >= self.due_at.load(Ordering::Relaxed) {
            let fresh = (self.build)();
            self.client.store(Arc::new(fresh));
            self.due_at.store(
                Self::jittered_due(self.epoch, self.ttl, self.jitter),
                Ordering::Relaxed,
            );
        }
        self.client.load_full()
    }
}

/// Round-robins across a fixed set of [`Recycler`] slots via an atomic counter.
pub struct Rotator {
    slots: Vec<Recycler>,
    next: AtomicUsize,
}

impl Rotator {
    pub fn new(count: usize, ttl: Duration, build: impl Fn() -> reqwest::Client + Send + Sync + Clone + 'static) -> Self {
        let slots = (0..count.max(1))
            .map(|_| Recycler::new(ttl, build.clone()))
            .collect();
        Rotator {
            slots,
            next: AtomicUsize::new(0),
        }
    }

    pub fn next_client(&self) -> Arc<reqwest::Client> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.slots.len();
        self.slots[idx].get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotator_cycles_through_slots() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let rotator = Rotator::new(3, Duration::from_secs(300), move || {
            c.fetch_add(1, Ordering::Relaxed);
            reqwest::Client::new()
        });
        for _ in 0..6 {
            let _ = rotator.next_client();
        }
        // one build per slot at construction time
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn recycler_rebuilds_after_ttl() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let recycler = Recycler::new(Duration::from_millis(1), move || {
            c.fetch_add(1, Ordering::Relaxed);
            reqwest::Client::new()
        });
        let _ = recycler.get();
        std::thread::sleep(Duration::from_millis(10));
        let _ = recycler.get();
        assert!(counter.load(Ordering::Relaxed) >= 2);
    }
}
