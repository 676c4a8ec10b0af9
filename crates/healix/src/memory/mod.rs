//! Memory store: verified-fix cache plus the proposal ledger.
//!
//! Both are loaded once when the store opens and written through on every
//! mutation. Storage trouble never stops healing: an unreadable backend
//! opens empty, an unwritable one keeps the in-memory state for the rest of
//! the process. Either way the store reports itself degraded.
//!
//! Lookups only take a read lock. Commits and ledger appends are serialized
//! so concurrent workers healing the same locator cannot lose updates.

mod backend;
mod proposal;

pub use backend::{corrupt_path, CacheMap, InMemoryBackend, JsonFileBackend, MemoryBackend};
pub use proposal::{Proposal, ProposalStatus};

use crate::config::StorageConfig;
use crate::provenance::SourceLocation;
use crate::result::{HealixError, HealixResult, StorageError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::{debug, warn};

/// Persistent healing memory shared by every resolution run in a process
#[derive(Debug)]
pub struct MemoryStore {
    backend: Box<dyn MemoryBackend>,
    cache: RwLock<CacheMap>,
    ledger: Mutex<Vec<Proposal>>,
    commit_lock: Mutex<()>,
    degraded: AtomicBool,
}

impl MemoryStore {
    /// Open a store, loading cache and ledger from the backend
    pub fn open(backend: impl MemoryBackend + 'static) -> Self {
        let mut degraded = false;
        let cache = backend.load_cache().unwrap_or_else(|e| {
            warn!(error = %e, "healing cache unreadable, starting with empty memory");
            degraded = true;
            CacheMap::new()
        });
        let ledger = backend.load_ledger().unwrap_or_else(|e| {
            warn!(error = %e, "proposal ledger unreadable, starting with empty ledger");
            degraded = true;
            Vec::new()
        });
        debug!(
            entries = cache.len(),
            proposals = ledger.len(),
            "healing memory loaded"
        );
        Self {
            backend: Box::new(backend),
            cache: RwLock::new(cache),
            ledger: Mutex::new(ledger),
            commit_lock: Mutex::new(()),
            degraded: AtomicBool::new(degraded),
        }
    }

    /// Open the JSON files named by a storage config
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::open(JsonFileBackend::new(
            config.cache_file.clone(),
            config.ledger_file.clone(),
        ))
    }

    /// Process-local store with no persistence
    #[must_use]
    pub fn in_memory() -> Self {
        Self::open(InMemoryBackend::new())
    }

    /// Previously verified replacement for a signature
    #[must_use]
    pub fn lookup(&self, signature: &str) -> Option<String> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(signature)
            .cloned()
    }

    /// Record a verified replacement and flush the cache
    ///
    /// The in-memory entry is kept even when the flush fails.
    pub fn commit(&self, signature: &str, target: &str) -> Result<(), StorageError> {
        let _serial = self.commit_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = {
            let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
            cache.insert(signature.to_string(), target.to_string());
            cache.clone()
        };
        self.backend.save_cache(&snapshot).map_err(|e| {
            warn!(signature, error = %e, "healing cache flush failed, keeping fix in memory only");
            self.degraded.store(true, Ordering::Relaxed);
            e
        })
    }

    /// Drop a cache entry; returns whether one existed
    pub fn forget(&self, signature: &str) -> Result<bool, StorageError> {
        let _serial = self.commit_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (removed, snapshot) = {
            let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
            let removed = cache.remove(signature).is_some();
            (removed, cache.clone())
        };
        if removed {
            self.backend.save_cache(&snapshot).map_err(|e| {
                self.degraded.store(true, Ordering::Relaxed);
                e
            })?;
        }
        Ok(removed)
    }

    /// All cache entries, sorted by signature
    #[must_use]
    pub fn entries(&self) -> BTreeMap<String, String> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of cached fixes
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a pending proposal and flush the ledger
    ///
    /// Never deduplicates; the appended proposal is kept in memory even when
    /// the flush fails.
    pub fn record_proposal(
        &self,
        source: SourceLocation,
        original: &str,
        suggested: &str,
    ) -> Result<Proposal, StorageError> {
        let proposal = Proposal::new(source, original, suggested);
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        ledger.push(proposal.clone());
        match self.backend.save_ledger(&ledger) {
            Ok(()) => Ok(proposal),
            Err(e) => {
                warn!(original, error = %e, "proposal ledger flush failed, keeping proposal in memory only");
                self.degraded.store(true, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Every proposal in ledger order
    #[must_use]
    pub fn proposals(&self) -> Vec<Proposal> {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Proposals still awaiting review
    #[must_use]
    pub fn pending_proposals(&self) -> Vec<Proposal> {
        self.proposals()
            .into_iter()
            .filter(Proposal::is_pending)
            .collect()
    }

    /// Reviewer transition: set a proposal's status by id (or unique id prefix)
    pub fn set_proposal_status(&self, id: &str, status: ProposalStatus) -> HealixResult<Proposal> {
        let mut ledger = self.ledger.lock().unwrap_or_else(PoisonError::into_inner);
        let needle = id.trim().to_ascii_lowercase();
        let matches: Vec<usize> = ledger
            .iter()
            .enumerate()
            .filter(|(_, p)| !needle.is_empty() && p.id.to_string().starts_with(&needle))
            .map(|(i, _)| i)
            .collect();
        let [index] = matches.as_slice() else {
            return Err(HealixError::ProposalNotFound { id: id.to_string() });
        };
        ledger[*index].status = status;
        let updated = ledger[*index].clone();
        self.backend.save_ledger(&ledger)?;
        Ok(updated)
    }

    /// Whether a load or flush has failed since the store opened
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }
}
