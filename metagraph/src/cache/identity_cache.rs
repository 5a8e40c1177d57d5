// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Identity cache for materialized records

use crate::backend::raw::RawRecord;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::ontology::MetaValue;
use crossbeam_utils::CachePadded;
use log::trace;
use moka::sync::Cache;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Identity of a record: the backend namespace, the record's label and the
/// backend's identity token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub namespace: String,
    pub label: String,
    pub id: String,
}

impl RecordKey {
    pub fn new(
        namespace: impl Into<String>,
        label: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            label: label.into(),
            id: id.into(),
        }
    }

    pub fn of_record(namespace: &str, record: RawRecord<'_>) -> Self {
        Self::new(namespace, record.label(), record.id())
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.label, self.id)
    }
}

#[repr(usize)]
#[derive(Copy, Clone, Debug)]
pub enum IdentityCacheMetric {
    Hits = 0,
    Misses = 1,
    Inserts = 2,
    Invalidations = 3,
}

const IDENTITY_CACHE_METRIC_COUNT: usize = 4;

#[derive(Debug)]
pub struct IdentityCacheStats {
    metrics: [CachePadded<AtomicU64>; IDENTITY_CACHE_METRIC_COUNT],
}

impl IdentityCacheStats {
    #[inline]
    pub fn inc(&self, metric: IdentityCacheMetric) {
        self.metrics[metric as usize].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn load(&self, metric: IdentityCacheMetric) -> u64 {
        self.metrics[metric as usize].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn hit_rate(&self) -> f64 {
        let hits = self.load(IdentityCacheMetric::Hits);
        let misses = self.load(IdentityCacheMetric::Misses);
        let total = hits + misses;

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

impl Clone for IdentityCacheStats {
    fn clone(&self) -> Self {
        let cloned = IdentityCacheStats::default();
        for (index, metric) in self.metrics.iter().enumerate() {
            cloned.metrics[index].store(metric.load(Ordering::Relaxed), Ordering::Relaxed);
        }
        cloned
    }
}

impl Default for IdentityCacheStats {
    fn default() -> Self {
        Self {
            metrics: std::array::from_fn(|_| CachePadded::new(AtomicU64::new(0))),
        }
    }
}

static GLOBAL_CACHE: Lazy<Arc<IdentityCache>> =
    Lazy::new(|| Arc::new(IdentityCache::from_config(&CacheConfig::default())));

/// Bounded, time-expiring map from record identity to materialized value.
///
/// Only fully resolved values are inserted. Concurrent misses on the same key
/// may both compute; the later insert wins and both callers see an equal value.
pub struct IdentityCache {
    entries: Cache<RecordKey, MetaValue>,
    stats: IdentityCacheStats,
    max_entries: u64,
    ttl: Duration,
}

impl IdentityCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let entries = Cache::builder()
            .time_to_live(ttl)
            .max_capacity(max_entries)
            .support_invalidation_closures()
            .build();

        Self {
            entries,
            stats: IdentityCacheStats::default(),
            max_entries,
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl())
    }

    /// The process-wide cache shared by materializers that are not given one
    pub fn global() -> Arc<IdentityCache> {
        GLOBAL_CACHE.clone()
    }

    pub fn get(&self, key: &RecordKey) -> Option<MetaValue> {
        match self.entries.get(key) {
            Some(value) => {
                self.stats.inc(IdentityCacheMetric::Hits);
                trace!("Identity cache hit for {}", key);
                Some(value)
            }
            None => {
                self.stats.inc(IdentityCacheMetric::Misses);
                trace!("Identity cache miss for {}", key);
                None
            }
        }
    }

    pub fn insert(&self, key: RecordKey, value: MetaValue) {
        self.entries.insert(key, value);
        self.stats.inc(IdentityCacheMetric::Inserts);
    }

    /// Return the cached value or compute, insert and return it. A failed
    /// computation leaves the cache untouched.
    pub fn get_or_try_insert<F>(&self, key: RecordKey, compute: F) -> Result<MetaValue>
    where
        F: FnOnce() -> Result<MetaValue>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Drop every entry of one backend namespace
    pub fn invalidate_namespace(&self, namespace: &str) {
        let namespace = namespace.to_string();
        if self
            .entries
            .invalidate_entries_if(move |key, _| key.namespace == namespace)
            .is_err()
        {
            self.entries.invalidate_all();
        }
        self.stats.inc(IdentityCacheMetric::Invalidations);
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
        self.stats.inc(IdentityCacheMetric::Invalidations);
    }

    /// Approximate number of live entries
    pub fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn max_entries(&self) -> u64 {
        self.max_entries
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> IdentityCacheStats {
        self.stats.clone()
    }
}
