//! # Token Cache
//!
//! Bounded, TTL-bearing cache of idempotency token → finalized invoice id.
//!
//! ## What May Be Cached
//! Only tokens of *finalized* invoices. That mapping is immutable (the
//! token invariant guarantees at most one finalized holder), so a cache hit
//! can short-circuit the guard's first lookup without risking a stale read.
//! Drafts are never cached; cancellation removes the entry.
//!
//! ## Eviction
//! ```text
//! get(token)  → entry expired?        drop it, miss
//! put(token)  → at capacity?          sweep expired entries first,
//!                                     then evict the oldest entry
//! ```
//! The cache is an explicit collaborator injected into the service, not
//! ambient process state; tests construct their own with tiny bounds.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    invoice_id: String,
    inserted_at: Instant,
}

/// Bounded TTL cache for idempotency tokens.
#[derive(Debug)]
pub struct TokenCache {
    entries: Mutex<HashMap<String, Entry>>,
    capacity: usize,
    ttl: Duration,
}

impl TokenCache {
    /// Creates a cache holding at most `capacity` entries, each valid for
    /// `ttl` after insertion.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        TokenCache {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            ttl,
        }
    }

    /// The invoice id a token maps to, if present and not expired.
    pub fn get(&self, token: &str) -> Option<String> {
        let mut entries = self.entries.lock().expect("token cache poisoned");

        match entries.get(token) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                Some(entry.invoice_id.clone())
            }
            Some(_) => {
                entries.remove(token);
                None
            }
            None => None,
        }
    }

    /// Remembers token → invoice id, evicting as needed.
    pub fn put(&self, token: &str, invoice_id: &str) {
        let mut entries = self.entries.lock().expect("token cache poisoned");

        if !entries.contains_key(token) && entries.len() >= self.capacity {
            let ttl = self.ttl;
            entries.retain(|_, e| e.inserted_at.elapsed() < ttl);

            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.inserted_at)
                    .map(|(k, _)| k.clone());
                if let Some(key) = oldest {
                    entries.remove(&key);
                }
            }
        }

        entries.insert(
            token.to_string(),
            Entry {
                invoice_id: invoice_id.to_string(),
                inserted_at: Instant::now(),
            },
        );
    }

    /// Forgets a token (used when its invoice is cancelled).
    pub fn remove(&self, token: &str) {
        self.entries
            .lock()
            .expect("token cache poisoned")
            .remove(token);
    }

    /// Number of entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("token cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TokenCache {
    /// 1024 tokens, 30 minute TTL - enough for a busy till's retry window.
    fn default() -> Self {
        TokenCache::new(1024, Duration::from_secs(30 * 60))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
