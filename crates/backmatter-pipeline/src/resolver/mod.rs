//! Entity resolution against the PMB database
//!
//! # Architecture
//!
//! A lookup tries, in order:
//!
//! 1. the built-in record of the central subject (`pmb2121`, persons only)
//! 2. the process-wide [`RecordCache`]
//! 3. the [`LocalIndex`] over the PMB list files
//! 4. the PMB API, through a [`RecordFetcher`] (skipped when offline)
//!
//! Records from steps 3 and 4 are cached. The outcome is a typed
//! [`Resolution`]; failures are rendered into the letter by
//! [`populate_back`] instead of aborting the document.

mod cache;
mod fetch;
mod fixed;
mod index;
mod stats;

pub use cache::{RecordCache, DEFAULT_CACHE_CAPACITY};
pub use fetch::{FetchError, HttpFetcher, RecordFetcher, DEFAULT_API_BASE, DEFAULT_TIMEOUT};
pub use index::{find_record, scan_ids, LocalIndex};
pub use stats::{ResolverStats, StatsSnapshot};

use backmatter_core::{
    normalize_pmb_id, pmb_number, EntityKind, NodeId, TeiDocument, CENTRAL_SUBJECT_ID,
};
use serde::{Deserialize, Serialize};
use stats::Counter;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Where a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    Fixed,
    Local,
    Remote,
}

/// A resolved PMB entity. The fragment's root is the entity element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    pub id: String,
    pub kind: EntityKind,
    pub source: RecordSource,
    pub fragment: TeiDocument,
}

/// Outcome of one lookup.
#[derive(Debug, Clone)]
pub enum Resolution {
    Found(Arc<EntityRecord>),
    /// Not available locally and the resolver is offline.
    NotFoundLocal,
    FetchFailed(FetchError),
}

impl Resolution {
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Resolver settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub lists_dir: PathBuf,
    pub api_base: String,
    pub timeout: Duration,
    pub cache_capacity: usize,
    pub offline: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            lists_dir: PathBuf::from("python-temp"),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            offline: false,
        }
    }
}

/// Shared resolver. Safe to use from many worker threads.
pub struct Resolver {
    index: LocalIndex,
    cache: Mutex<RecordCache>,
    fetcher: Option<Box<dyn RecordFetcher>>,
    stats: ResolverStats,
}

impl Resolver {
    #[must_use]
    pub fn new(
        index: LocalIndex,
        cache_capacity: usize,
        fetcher: Option<Box<dyn RecordFetcher>>,
    ) -> Self {
        Self {
            index,
            cache: Mutex::new(RecordCache::new(cache_capacity)),
            fetcher,
            stats: ResolverStats::default(),
        }
    }

    /// Index the list files and set up the HTTP fetcher unless offline.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: &ResolverConfig) -> Result<Self, FetchError> {
        let index = LocalIndex::build(&config.lists_dir);
        let fetcher: Option<Box<dyn RecordFetcher>> = if config.offline {
            None
        } else {
            Some(Box::new(HttpFetcher::new(&config.api_base, config.timeout)?))
        };
        Ok(Self::new(index, config.cache_capacity, fetcher))
    }

    #[must_use]
    pub fn index(&self) -> &LocalIndex {
        &self.index
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.fetcher.is_none()
    }

    fn cache(&self) -> MutexGuard<'_, RecordCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve a reference to an entity of `kind`.
    pub fn resolve(&self, raw_id: &str, kind: EntityKind) -> Resolution {
        let Some(id) = normalize_pmb_id(raw_id) else {
            return Resolution::NotFoundLocal;
        };

        if kind == EntityKind::Person && id == CENTRAL_SUBJECT_ID {
            if let Some(record) = fixed::central_subject() {
                return Resolution::Found(record);
            }
        }

        self.stats.bump(Counter::Lookup);
        log::debug!("Looking up {id} ({kind})");

        if let Some(record) = self.cache().get(&id) {
            self.stats.bump(Counter::CacheHit);
            return Resolution::Found(record);
        }

        if let Some(record) = self.load_local(&id) {
            self.stats.bump(Counter::LocalHit);
            self.cache().insert(id, Arc::clone(&record));
            return Resolution::Found(record);
        }
        self.stats.bump(Counter::LocalMiss);

        let Some(fetcher) = self.fetcher.as_deref() else {
            log::debug!("{id} not available locally (offline)");
            return Resolution::NotFoundLocal;
        };

        self.stats.bump(Counter::ApiCall);
        let fetched = fetcher
            .fetch(kind, pmb_number(&id))
            .and_then(|body| fetch::record_from_response(&body, kind, &id));
        match fetched {
            Ok(record) => {
                self.stats.bump(Counter::ApiSuccess);
                let record = Arc::new(record);
                self.cache().insert(id, Arc::clone(&record));
                Resolution::Found(record)
            }
            Err(e) => {
                self.stats.bump(Counter::ApiFailure);
                log::warn!("PMB API lookup failed for {id}: {e}");
                Resolution::FetchFailed(e)
            }
        }
    }

    fn load_local(&self, id: &str) -> Option<Arc<EntityRecord>> {
        match self.index.load(id) {
            Ok(Some((kind, fragment))) => Some(Arc::new(EntityRecord {
                id: id.to_string(),
                kind,
                source: RecordSource::Local,
                fragment,
            })),
            Ok(None) => None,
            Err(e) => {
                log::warn!("Failed to load {id} from local lists: {e}");
                None
            }
        }
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("indexed", &self.index.len())
            .field("cached", &self.cache().len())
            .field("offline", &self.is_offline())
            .finish_non_exhaustive()
    }
}

/// Counts of one populate or augment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulateReport {
    pub entries: usize,
    pub resolved: usize,
    pub unresolved: usize,
}

impl PopulateReport {
    pub(crate) fn record(&mut self, found: bool) {
        self.entries += 1;
        if found {
            self.resolved += 1;
        } else {
            self.unresolved += 1;
        }
    }
}

/// Fill every placeholder entry of `back` with the data of its record.
pub fn populate_back(doc: &mut TeiDocument, back: NodeId, resolver: &Resolver) -> PopulateReport {
    let mut report = PopulateReport::default();

    for kind in EntityKind::ALL {
        let Some(list) = doc.first_child_named(back, kind.list_element()) else {
            continue;
        };
        let entries: Vec<NodeId> = doc.children_named(list, kind.entry_element()).collect();

        for entry in entries {
            let Some(id) = doc.attr(entry, "xml:id").and_then(normalize_pmb_id) else {
                continue;
            };
            let ana = doc
                .attr(entry, "ana")
                .filter(|a| !a.is_empty())
                .map(str::to_string);

            let resolution = resolver.resolve(&id, kind);

            doc.clear_element(entry);
            doc.set_attr(entry, "xml:id", &id);
            if let Some(ana) = ana {
                doc.set_attr(entry, "ana", &ana);
            }
            report.record(merge_resolution(doc, entry, &id, kind, &resolution));
        }
    }

    log::debug!(
        "Populated {} entries ({} unresolved)",
        report.entries,
        report.unresolved
    );
    report
}

/// Copy a resolution into `entry`: the record's child nodes, or an error
/// marker. Returns whether a record was found.
pub(crate) fn merge_resolution(
    doc: &mut TeiDocument,
    entry: NodeId,
    id: &str,
    kind: EntityKind,
    resolution: &Resolution,
) -> bool {
    let reason = match resolution {
        Resolution::Found(record) => {
            doc.import_children(entry, &record.fragment, record.fragment.root());
            return true;
        }
        Resolution::NotFoundLocal => None,
        Resolution::FetchFailed(e) => e.marker_reason(),
    };

    let number = pmb_number(id);
    let text = match reason {
        Some(reason) => format!("{number} - {reason}"),
        None => number.to_string(),
    };
    let error = doc.append_element(entry, "error");
    doc.set_attr(error, "type", kind.entry_element());
    doc.append_text(error, &text);
    false
}
