use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type Counter = AtomicU64;

#[derive(Debug, Clone, Default)]
/// Live metrics around the publisher pool.
pub struct PoolStatistics(Arc<PoolStatisticsInner>);

impl Deref for PoolStatistics {
    type Target = PoolStatisticsInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Default)]
pub struct PoolStatisticsInner {
    /// The number of broker nodes currently in the pool.
    pub(crate) num_nodes: Counter,
    /// The number of broker nodes admitted to the pool over its lifetime.
    pub(crate) num_admitted: Counter,
    /// The number of broker nodes evicted from the pool over its lifetime.
    pub(crate) num_evicted: Counter,
    /// The number of messages successfully handed to a broker.
    pub(crate) num_published: Counter,
    /// The number of individual publish attempts which failed.
    pub(crate) num_failed_attempts: Counter,
    /// The number of candidates skipped because they were still warming up.
    pub(crate) num_skipped_warming: Counter,
}

impl PoolStatisticsInner {
    /// The number of broker nodes currently in the pool.
    pub fn num_nodes(&self) -> u64 {
        self.num_nodes.load(Ordering::Relaxed)
    }

    /// The number of broker nodes admitted to the pool over its lifetime.
    pub fn num_admitted(&self) -> u64 {
        self.num_admitted.load(Ordering::Relaxed)
    }

    /// The number of broker nodes evicted from the pool over its lifetime.
    pub fn num_evicted(&self) -> u64 {
        self.num_evicted.load(Ordering::Relaxed)
    }

    /// The number of messages successfully handed to a broker.
    pub fn num_published(&self) -> u64 {
        self.num_published.load(Ordering::Relaxed)
    }

    /// The number of individual publish attempts which failed.
    pub fn num_failed_attempts(&self) -> u64 {
        self.num_failed_attempts.load(Ordering::Relaxed)
    }

    /// The number of candidates skipped because they were still warming up.
    pub fn num_skipped_warming(&self) -> u64 {
        self.num_skipped_warming.load(Ordering::Relaxed)
    }
}
