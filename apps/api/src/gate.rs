//! Concurrency gate — bounds simultaneous outbound calls per external
//! capability and enforces a minimum inter-call spacing.
//!
//! One slot table per process, shared by every job and every candidate
//! task. `acquire` suspends the calling task cooperatively; it never
//! errors for back-pressure. Callers needing an upper wait bound wrap
//! their own timeout around it. Permits release on drop, so futures
//! abandoned by a job timeout free their slots automatically.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// The named external capabilities the gate throttles independently, so
/// that e.g. throttling the crawl path never starves the structured path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Keywords,
    Search,
    Crawl,
    Enrich,
    Evaluate,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::Keywords,
        Capability::Search,
        Capability::Crawl,
        Capability::Enrich,
        Capability::Evaluate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Keywords => "keywords",
            Capability::Search => "search",
            Capability::Crawl => "crawl",
            Capability::Enrich => "enrich",
            Capability::Evaluate => "evaluate",
        }
    }
}

/// Per-capability limit: maximum in-flight calls and minimum spacing
/// between consecutive dispatches.
#[derive(Debug, Clone, Copy)]
pub struct GateLimit {
    pub max_concurrent: usize,
    pub min_interval: Duration,
}

impl GateLimit {
    pub fn new(max_concurrent: usize, min_interval: Duration) -> Self {
        Self {
            max_concurrent,
            min_interval,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub keywords: GateLimit,
    pub search: GateLimit,
    pub crawl: GateLimit,
    pub enrich: GateLimit,
    pub evaluate: GateLimit,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            keywords: GateLimit::new(2, Duration::ZERO),
            search: GateLimit::new(4, Duration::ZERO),
            // Crawl is serialized with a politeness delay to respect
            // target-site load limits.
            crawl: GateLimit::new(1, Duration::from_secs(2)),
            enrich: GateLimit::new(3, Duration::from_millis(100)),
            evaluate: GateLimit::new(4, Duration::ZERO),
        }
    }
}

impl GateConfig {
    pub fn with_crawl_delay(mut self, delay: Duration) -> Self {
        self.crawl.min_interval = delay;
        self
    }

    fn limit_for(&self, capability: Capability) -> GateLimit {
        match capability {
            Capability::Keywords => self.keywords,
            Capability::Search => self.search,
            Capability::Crawl => self.crawl,
            Capability::Enrich => self.enrich,
            Capability::Evaluate => self.evaluate,
        }
    }
}

struct Slot {
    semaphore: Arc<Semaphore>,
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

/// A held concurrency slot. Dropping it returns the slot.
pub struct Permit {
    _permit: OwnedSemaphorePermit,
}

pub struct ConcurrencyGate {
    slots: HashMap<Capability, Slot>,
}

impl ConcurrencyGate {
    pub fn new(config: GateConfig) -> Self {
        let slots = Capability::ALL
            .into_iter()
            .map(|capability| {
                let limit = config.limit_for(capability);
                (
                    capability,
                    Slot {
                        semaphore: Arc::new(Semaphore::new(limit.max_concurrent.max(1))),
                        min_interval: limit.min_interval,
                        last_dispatch: Mutex::new(None),
                    },
                )
            })
            .collect();
        Self { slots }
    }

    /// Waits for a free slot for the named capability, then enforces the
    /// minimum spacing since the previous dispatch before returning.
    pub async fn acquire(&self, capability: Capability) -> Permit {
        let slot = &self.slots[&capability];
        let permit = slot
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("gate semaphore is never closed");
        tracing::trace!("acquired {} permit", capability.as_str());

        if !slot.min_interval.is_zero() {
            // Holding the lock through the sleep serializes dispatch
            // times, which is exactly the spacing guarantee.
            let mut last = slot.last_dispatch.lock().await;
            if let Some(previous) = *last {
                let elapsed = previous.elapsed();
                if elapsed < slot.min_interval {
                    tokio::time::sleep(slot.min_interval - elapsed).await;
                }
            }
            *last = Some(Instant::now());
        }

        Permit { _permit: permit }
    }
}
