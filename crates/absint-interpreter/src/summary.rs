use std::sync::atomic::{AtomicUsize, Ordering};

use absint_ir::Method;
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;

use crate::AbstractDomain;

/// Net effect of one method for one entry state.
///
/// Sound for every call entering the method with a state at most `entry`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Summary<D> {
    pub method: Method,
    pub entry: D,
    pub exit: D,
}

impl<D: AbstractDomain> Summary<D> {
    pub fn new(method: Method, entry: D, exit: D) -> Self {
        Self {
            method,
            entry,
            exit,
        }
    }

    /// Conservative stand-in for a summary still being computed.
    pub fn placeholder(method: Method, entry: D) -> Self {
        Self::new(method, entry, D::bottom())
    }

    /// Summary of a method that leaves the state untouched.
    pub fn identity(method: Method, entry: D) -> Self {
        let exit = entry.clone();
        Self::new(method, entry, exit)
    }

    /// Whether this summary may answer a call entering with `entry`.
    pub fn subsumes(&self, entry: &D) -> bool {
        entry.is_subseteq(&self.entry)
    }

    /// Post-call state for a caller that entered with `caller_pre`.
    pub fn apply(&self, caller_pre: &D) -> D {
        debug_assert!(
            self.subsumes(caller_pre),
            "summary applied outside its entry state"
        );
        self.exit.clone()
    }

    /// Compose the caller's pre-call state with the callee exit.
    pub fn apply_with(&self, caller_pre: &D, compose: impl FnOnce(&D, &D) -> D) -> D {
        compose(caller_pre, &self.exit)
    }
}

/// Computed summaries of one method, one per distinct entry state.
#[derive(Debug, Clone)]
pub struct MethodSummaries<D> {
    entries: Vec<Summary<D>>,
}

impl<D> Default for MethodSummaries<D> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<D> MethodSummaries<D> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Summary<D>> {
        self.entries.iter()
    }
}

impl<D: AbstractDomain> MethodSummaries<D> {
    /// Find the tightest entry whose entry state subsumes `query`.
    ///
    /// "Tightest" means: among all matching entries, the one whose entry
    /// is subsumed by every other match seen so far.
    pub fn find_best_match(&self, query: &D) -> Option<&Summary<D>> {
        let mut best: Option<&Summary<D>> = None;
        for entry in self.entries.iter().filter(|s| s.subsumes(query)) {
            best = Some(match best {
                Some(current) if !entry.entry.is_subseteq(&current.entry) => current,
                _ => entry,
            });
        }
        best
    }

    fn insert(&mut self, summary: Summary<D>) -> (Summary<D>, bool) {
        if let Some(existing) = self.entries.iter().find(|s| s.entry == summary.entry) {
            return (existing.clone(), false);
        }
        self.entries.push(summary.clone());
        (summary, true)
    }
}

/// Counters of a [`SummaryCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub lookups: usize,
    pub hits: usize,
    pub misses: usize,
    /// Distinct summaries stored.
    pub computed: usize,
}

/// Append-only summary cache shared by concurrent top-level analyses.
///
/// Reads and insert-if-absent are safe from any thread. Entries are never
/// replaced; an insert for an entry state already present returns the
/// stored summary.
pub struct SummaryCache<D> {
    methods: DashMap<Method, MethodSummaries<D>, FxBuildHasher>,
    lookups: AtomicUsize,
    hits: AtomicUsize,
    misses: AtomicUsize,
    computed: AtomicUsize,
}

impl<D> Default for SummaryCache<D> {
    fn default() -> Self {
        Self {
            methods: DashMap::with_hasher(FxBuildHasher),
            lookups: AtomicUsize::new(0),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            computed: AtomicUsize::new(0),
        }
    }
}

impl<D> std::fmt::Debug for SummaryCache<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryCache")
            .field("methods", &self.methods.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl<D> SummaryCache<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored summaries across all methods.
    pub fn len(&self) -> usize {
        self.methods.iter().map(|entry| entry.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            lookups: self.lookups.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computed: self.computed.load(Ordering::Relaxed),
        }
    }
}

impl<D: AbstractDomain> SummaryCache<D> {
    /// Best cached summary of `method` covering `entry`.
    pub fn lookup(&self, method: Method, entry: &D) -> Option<Summary<D>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let found = self
            .methods
            .get(&method)
            .and_then(|summaries| summaries.find_best_match(entry).cloned());
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store `summary` unless an entry with the same entry state exists.
    /// Returns the stored summary either way.
    pub fn insert_if_absent(&self, summary: Summary<D>) -> Summary<D> {
        let (stored, inserted) = self
            .methods
            .entry(summary.method)
            .or_default()
            .insert(summary);
        if inserted {
            self.computed.fetch_add(1, Ordering::Relaxed);
        }
        stored
    }

    /// Snapshot of every summary stored for `method`.
    pub fn summaries(&self, method: Method) -> Vec<Summary<D>> {
        self.methods
            .get(&method)
            .map(|summaries| summaries.iter().cloned().collect())
            .unwrap_or_default()
    }
}
