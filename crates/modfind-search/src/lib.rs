//! The modfind query planner: hedged package search, symbol search,
//! result grouping and approximate counting.

pub mod excluded;
pub mod grouping;
pub mod symbol;

mod counts;
mod planner;
mod searchers;

pub use excluded::ExcludedPrefixes;
pub use searchers::{DeepSearcher, PopularSearcher, RawSearchResult, Searcher, SearcherResponse};

use chrono::{DateTime, Utc};
use modfind_store::Store;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Options accepted by [`Planner::search`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub offset: usize,
    pub max_results: usize,
    /// Upper clamp applied to the approximate total estimate.
    pub max_result_count: u64,
    pub search_symbols: bool,
    pub symbol_filter: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            max_results: 10,
            max_result_count: 100_000,
            search_symbols: false,
            symbol_filter: None,
        }
    }
}

/// One search hit. Package hits may chain further packages from the same
/// module under `same_module` and record losing majors of the same
/// series in `other_major`; symbol hits carry `symbol`.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub package_path: String,
    pub module_path: String,
    pub version: String,
    /// Package name; for symbol results, the defining package's name.
    pub name: String,
    pub synopsis: String,
    pub license_types: Vec<String>,
    pub commit_time: DateTime<Utc>,
    pub imported_by_count: i64,
    pub score: f64,
    pub same_module: Vec<SearchResult>,
    /// Other major versions of this module series: module path → major.
    pub other_major: BTreeMap<String, i32>,
    pub symbol: Option<SymbolInfo>,
}

impl SearchResult {
    pub(crate) fn empty(package_path: String) -> Self {
        Self {
            package_path,
            module_path: String::new(),
            version: String::new(),
            name: String::new(),
            synopsis: String::new(),
            license_types: Vec::new(),
            commit_time: DateTime::<Utc>::UNIX_EPOCH,
            imported_by_count: 0,
            score: 0.0,
            same_module: Vec::new(),
            other_major: BTreeMap::new(),
            symbol: None,
        }
    }
}

/// Matched-symbol details attached to symbol-search results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub name: String,
    pub goos: String,
    pub goarch: String,
}

/// A full search response.
#[derive(Debug, Clone)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    /// Window-function total when the deep searcher won, otherwise the
    /// raw number of returned rows (see the HLL estimator for the
    /// dashboard-grade approximation).
    pub num_results: u64,
    /// Which searcher produced the page.
    pub source: &'static str,
}

/// The query planner. Owns the searcher set and the excluded-prefix
/// snapshot; cheap to share behind an `Arc`.
pub struct Planner {
    store: Arc<Store>,
    searchers: Vec<Arc<dyn Searcher>>,
    excluded: Arc<ExcludedPrefixes>,
    bypass_license_check: bool,
}

impl Planner {
    pub fn new(store: Arc<Store>) -> Self {
        Self::with_searchers(
            store,
            vec![
                Arc::new(PopularSearcher) as Arc<dyn Searcher>,
                Arc::new(DeepSearcher),
            ],
        )
    }

    /// Builds a planner with an explicit searcher set. Tests use this to
    /// fix which strategy wins the race.
    pub fn with_searchers(store: Arc<Store>, searchers: Vec<Arc<dyn Searcher>>) -> Self {
        Self {
            store,
            searchers,
            excluded: Arc::new(ExcludedPrefixes::new()),
            bypass_license_check: false,
        }
    }

    /// Serves synopses of non-redistributable packages too. Off by
    /// default.
    pub fn with_license_bypass(mut self, bypass: bool) -> Self {
        self.bypass_license_check = bypass;
        self
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn excluded_prefixes(&self) -> &Arc<ExcludedPrefixes> {
        &self.excluded
    }
}
