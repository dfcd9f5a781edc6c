//! Lookup counters

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters owned by one resolver; shared by all workers.
#[derive(Debug, Default)]
pub struct ResolverStats {
    lookups: AtomicU64,
    cache_hits: AtomicU64,
    local_hits: AtomicU64,
    local_misses: AtomicU64,
    api_calls: AtomicU64,
    api_successes: AtomicU64,
    api_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Counter {
    Lookup,
    CacheHit,
    LocalHit,
    LocalMiss,
    ApiCall,
    ApiSuccess,
    ApiFailure,
}

impl ResolverStats {
    pub(crate) fn bump(&self, counter: Counter) {
        let cell = match counter {
            Counter::Lookup => &self.lookups,
            Counter::CacheHit => &self.cache_hits,
            Counter::LocalHit => &self.local_hits,
            Counter::LocalMiss => &self.local_misses,
            Counter::ApiCall => &self.api_calls,
            Counter::ApiSuccess => &self.api_successes,
            Counter::ApiFailure => &self.api_failures,
        };
        cell.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            lookups: self.lookups.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            local_hits: self.local_hits.load(Ordering::Relaxed),
            local_misses: self.local_misses.load(Ordering::Relaxed),
            api_calls: self.api_calls.load(Ordering::Relaxed),
            api_successes: self.api_successes.load(Ordering::Relaxed),
            api_failures: self.api_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ResolverStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub lookups: u64,
    pub cache_hits: u64,
    pub local_hits: u64,
    pub local_misses: u64,
    pub api_calls: u64,
    pub api_successes: u64,
    pub api_failures: u64,
}

impl StatsSnapshot {
    /// Share of lookups answered without the network, in percent.
    #[must_use]
    pub fn hit_rate(&self) -> Option<f64> {
        if self.lookups == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = 100.0 * (self.cache_hits + self.local_hits) as f64 / self.lookups as f64;
        Some(rate)
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total lookups:     {}", self.lookups)?;
        writeln!(f, "Cache hits:        {}", self.cache_hits)?;
        writeln!(f, "Found locally:     {}", self.local_hits)?;
        writeln!(f, "Not found locally: {}", self.local_misses)?;
        writeln!(f, "API calls made:    {}", self.api_calls)?;
        writeln!(f, "API successes:     {}", self.api_successes)?;
        write!(f, "API failures:      {}", self.api_failures)?;
        if let Some(rate) = self.hit_rate() {
            write!(f, "\nHit rate:          {rate:.1}%")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_hit_rate() {
        let stats = ResolverStats::default();
        assert_eq!(stats.snapshot().hit_rate(), None);
        for counter in [Counter::Lookup, Counter::Lookup, Counter::LocalHit] {
            stats.bump(counter);
        }
        let snap = stats.snapshot();
        assert_eq!(snap.lookups, 2);
        assert_eq!(snap.hit_rate(), Some(50.0));
        assert!(snap.to_string().contains("Hit rate:          50.0%"));
    }
}
