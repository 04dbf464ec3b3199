//! Per-client token-bucket rate limiting.
//!
//! Each client identity (normally the peer IP) gets its own `governor` direct
//! limiter, created the first time it is seen. Limiters live in one map behind
//! one lock; the lock is held only to look up and check a single entry, or for
//! one pass of the idle sweep.

use std::{
  collections::HashMap,
  fmt,
  num::NonZeroU32,
  sync::{Arc, Weak},
  time::Duration,
};

use governor::{
  Quota as BucketQuota, RateLimiter as Bucket,
  clock::{Clock, DefaultClock, Reference},
  middleware::NoOpMiddleware,
  state::{InMemoryState, NotKeyed},
};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

pub const DEFAULT_RATE_PER_SECOND: f64 = 10.0;
pub const DEFAULT_BURST: u32 = 20;

/// How often the background sweep runs.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(2 * 60);
/// Entries not seen for longer than this are evicted by the sweep.
pub const IDLE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Error, PartialEq)]
pub enum LimiterError {
  #[error("rate must be a positive number of tokens per second, got {0}")]
  InvalidRate(f64),

  #[error("burst must be at least 1")]
  ZeroBurst,
}

/// Refill rate and capacity shared by every client bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quota {
  pub per_second: f64,
  pub burst:      u32,
}

impl Default for Quota {
  fn default() -> Self {
    Self { per_second: DEFAULT_RATE_PER_SECOND, burst: DEFAULT_BURST }
  }
}

impl Quota {
  /// One token every `1 / per_second` seconds, up to `burst` banked.
  fn to_bucket_quota(self) -> Result<BucketQuota, LimiterError> {
    let invalid_rate = || LimiterError::InvalidRate(self.per_second);

    let burst = NonZeroU32::new(self.burst).ok_or(LimiterError::ZeroBurst)?;
    if !(self.per_second > 0.0) {
      return Err(invalid_rate());
    }
    let period = Duration::try_from_secs_f64(1.0 / self.per_second).map_err(|_| invalid_rate())?;
    let quota = BucketQuota::with_period(period).ok_or_else(invalid_rate)?;
    Ok(quota.allow_burst(burst))
  }
}

// ─── Limiter ─────────────────────────────────────────────────────────────────

type ClientBucket<C> = Bucket<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

struct ClientEntry<C: Clock> {
  bucket:    ClientBucket<C>,
  last_seen: C::Instant,
}

/// Rate limiter keyed by client identity.
///
/// Construct once per process and share it behind an [`Arc`]; call
/// [`RateLimiter::spawn_sweeper`] to bound memory.
pub struct RateLimiter<C: Clock = DefaultClock> {
  quota:        Quota,
  bucket_quota: BucketQuota,
  clock:        C,
  clients:      Mutex<HashMap<String, ClientEntry<C>>>,
}

impl RateLimiter {
  pub fn new(quota: Quota) -> Result<Self, LimiterError> {
    Self::with_clock(quota, DefaultClock::default())
  }
}

impl<C: Clock> RateLimiter<C> {
  /// Like [`RateLimiter::new`], reading time from `clock`. Every client
  /// bucket shares it.
  pub fn with_clock(quota: Quota, clock: C) -> Result<Self, LimiterError> {
    let bucket_quota = quota.to_bucket_quota()?;
    Ok(Self { quota, bucket_quota, clock, clients: Mutex::new(HashMap::new()) })
  }

  pub fn quota(&self) -> Quota { self.quota }

  /// Try to take one token for `client`. Returns whether the request may
  /// proceed. The client's last-seen time is updated either way.
  pub fn admit(&self, client: &str) -> bool
  where
    C: Clone,
  {
    let mut clients = self.clients.lock();
    let now = self.clock.now();
    let entry = clients
      .entry(client.to_owned())
      .or_insert_with(|| ClientEntry {
        bucket:    Bucket::direct_with_clock(self.bucket_quota, self.clock.clone()),
        last_seen: now,
      });
    entry.last_seen = entry.last_seen.max(now);
    entry.bucket.check().is_ok()
  }

  /// Number of client identities currently tracked.
  pub fn tracked_clients(&self) -> usize { self.clients.lock().len() }

  /// Drop entries idle for longer than `ttl`. Returns how many were removed.
  fn sweep(&self, ttl: Duration) -> usize {
    let mut clients = self.clients.lock();
    let now = self.clock.now();
    let before = clients.len();
    clients.retain(|_, entry| Duration::from(now.duration_since(entry.last_seen)) <= ttl);
    before - clients.len()
  }
}

impl<C> RateLimiter<C>
where
  C: Clock + Send + Sync + 'static,
{
  /// Start the periodic idle sweep ([`SWEEP_INTERVAL`], [`IDLE_TTL`]).
  ///
  /// The task holds only a weak reference and exits once the limiter is
  /// dropped.
  pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
    self.spawn_sweeper_with(SWEEP_INTERVAL, IDLE_TTL)
  }

  fn spawn_sweeper_with(self: &Arc<Self>, every: Duration, ttl: Duration) -> JoinHandle<()> {
    let weak: Weak<Self> = Arc::downgrade(self);
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(every);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      // The first tick completes immediately.
      ticker.tick().await;

      loop {
        ticker.tick().await;
        let Some(limiter) = weak.upgrade() else { break };
        let evicted = limiter.sweep(ttl);
        tracing::debug!(
          evicted,
          remaining = limiter.tracked_clients(),
          "rate limiter sweep"
        );
      }
    })
  }
}

impl<C: Clock> fmt::Debug for RateLimiter<C> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RateLimiter")
      .field("quota", &self.quota)
      .field("tracked_clients", &self.tracked_clients())
      .finish()
  }
}
