// TTL-bounded cache of the last successful speedtest sample
//
// The gateway runs its speed tests on its own (roughly daily) schedule, so
// refetching more often than that burns a login + fetch round trip without
// yielding new data.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::model::SpeedtestResult;

/// Default freshness window, matched to the gateway's daily test schedule.
pub(crate) const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy)]
struct CachedResult {
    result: SpeedtestResult,
    fetched_at: Instant,
}

/// Locked store for the last successful sample.
///
/// `get` takes a shared lock and answers only while fresh; `set` takes an
/// exclusive lock and overwrites wholesale, resetting the freshness clock.
#[derive(Debug)]
pub(crate) struct ResultCache {
    inner: RwLock<Option<CachedResult>>,
    ttl: Duration,
}

impl ResultCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(None),
            ttl,
        }
    }

    pub(crate) fn get(&self) -> Option<SpeedtestResult> {
        self.get_at(Instant::now())
    }

    fn get_at(&self, now: Instant) -> Option<SpeedtestResult> {
        let guard = self.inner.read().expect("cache lock poisoned");
        (*guard)
            .filter(|cached| now.duration_since(cached.fetched_at) < self.ttl)
            .map(|cached| cached.result)
    }

    pub(crate) fn set(&self, result: SpeedtestResult) {
        self.set_at(result, Instant::now());
    }

    fn set_at(&self, result: SpeedtestResult, now: Instant) {
        *self.inner.write().expect("cache lock poisoned") = Some(CachedResult {
            result,
            fetched_at: now,
        });
    }
}
