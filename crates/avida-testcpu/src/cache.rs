//! Test result cache
//!
//! Genome tests are deterministic for a fixed tester, genome and settings,
//! so classification code that asks about the same genotype repeatedly can
//! reuse the first report.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use avida_common::{Genome, GenomeHash, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::config::TestSettings;
use crate::driver::{TestCpu, TestReport};

type CacheKey = (Uuid, GenomeHash, TestSettings);

/// Cache counters
#[derive(Debug, Default)]
pub struct CacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
}

/// Point-in-time copy of [`CacheMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Concurrent memo of test reports keyed by tester, genome and settings
#[derive(Debug, Default)]
pub struct TestResultCache {
    entries: DashMap<CacheKey, Arc<TestReport>>,
    metrics: CacheMetrics,
}

impl TestResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached report of `cpu` for `genome`, if any
    pub fn get(
        &self,
        cpu: &TestCpu,
        genome: &Genome,
        settings: &TestSettings,
    ) -> Option<Arc<TestReport>> {
        self.entries
            .get(&(cpu.tester_id(), genome.fingerprint(), *settings))
            .map(|entry| entry.value().clone())
    }

    /// Return the cached report or run the test and cache it
    ///
    /// Failed calls (precondition errors) are not cached.
    #[instrument(skip_all)]
    pub fn get_or_test(
        &self,
        cpu: &TestCpu,
        genome: &Genome,
        settings: &TestSettings,
    ) -> Result<Arc<TestReport>> {
        let key = (cpu.tester_id(), genome.fingerprint(), *settings);
        if let Some(report) = self.entries.get(&key) {
            self.metrics.hits.fetch_add(1, Ordering::Relaxed);
            debug!(genome = %key.1.short(), "Cache hit");
            return Ok(report.value().clone());
        }

        self.metrics.misses.fetch_add(1, Ordering::Relaxed);
        debug!(genome = %key.1.short(), "Cache miss");
        let report = Arc::new(cpu.test_genome(genome, settings)?);
        // A concurrent miss on the same key may have finished first; keep its report
        Ok(self.entries.entry(key).or_insert(report).value().clone())
    }

    /// Drop every cached report for `genome`
    pub fn invalidate(&self, genome: &Genome) -> usize {
        let hash = genome.fingerprint();
        let before = self.entries.len();
        self.entries.retain(|(_, h, _), _| *h != hash);
        before - self.entries.len()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.metrics.hits.load(Ordering::Relaxed),
            misses: self.metrics.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use avida_common::{Environment, ResourceDef};

    use super::*;
    use crate::config::TestCpuConfig;

    fn tester() -> TestCpu {
        let env = Environment::logic_nine().with_resource(ResourceDef::new("glucose", 100.0));
        TestCpu::new(TestCpuConfig::default(), env).unwrap()
    }

    #[test]
    fn test_second_lookup_hits() {
        let cpu = tester();
        let cache = TestResultCache::new();
        let genome: Genome = "collect 0 30\nh-copy\nif-n-copied\njump -2\ndivide\n"
            .parse()
            .unwrap();
        let settings = TestSettings::default();

        let first = cache.get_or_test(&cpu, &genome, &settings).unwrap();
        let second = cache.get_or_test(&cpu, &genome, &settings).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn test_settings_are_part_of_key() {
        let cpu = tester();
        let cache = TestResultCache::new();
        let genome: Genome = "nop\n".parse().unwrap();

        cache.get_or_test(&cpu, &genome, &TestSettings::default()).unwrap();
        cache
            .get_or_test(&cpu, &genome, &TestSettings::default().with_generations(1))
            .unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.invalidate(&genome), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_errors_not_cached() {
        let cpu = tester();
        let cache = TestResultCache::new();
        let genome = Genome::new(Vec::new());
        assert!(cache.get_or_test(&cpu, &genome, &TestSettings::default()).is_err());
        assert!(cache.get(&cpu, &genome, &TestSettings::default()).is_none());
    }

    #[test]
    fn test_testers_do_not_share_reports() {
        let rich = tester();
        let poor = TestCpu::new(
            TestCpuConfig::default(),
            Environment::logic_nine().with_resource(ResourceDef::new("glucose", 10.0)),
        )
        .unwrap();
        let cache = TestResultCache::new();
        let genome: Genome = "collect 0 30\nh-copy\nif-n-copied\njump -2\ndivide\n"
            .parse()
            .unwrap();
        let settings = TestSettings::default();

        let from_rich = cache.get_or_test(&rich, &genome, &settings).unwrap();
        let from_poor = cache.get_or_test(&poor, &genome, &settings).unwrap();
        assert_eq!(from_rich.records[0].final_resources.get(0), 70.0);
        assert_eq!(from_poor.records[0].final_resources.get(0), 0.0);
        assert_eq!(cache.stats().misses, 2);

        // A clone tests identically and reuses the entry
        let again = cache.get_or_test(&poor.clone(), &genome, &settings).unwrap();
        assert!(Arc::ptr_eq(&from_poor, &again));
        assert!(cache.get(&rich, &genome, &settings).is_some());
    }
}
