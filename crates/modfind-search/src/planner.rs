//! The search entry point: hedged execution, enrichment, exclusion
//! filtering and grouping.

use crate::grouping::group_results;
use crate::searchers::{RawSearchResult, SearcherResponse};
use crate::{Planner, SearchOptions, SearchResponse, SearchResult};
use modfind_store::{Result, StoreError};
use sqlx::Row;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Deadline for one search call end to end.
const SEARCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Over-fetch factors: grouping collapses rows, so the planner requests
/// more than a page and retries wider if collapsing starved the page.
const OVERFETCH: usize = 3;
const RETRY_OVERFETCH: usize = 5;

impl Planner {
    /// Ranked search over packages, or symbols when
    /// `opts.search_symbols` is set.
    pub async fn search(&self, query: &str, opts: &SearchOptions) -> Result<SearchResponse> {
        tokio::time::timeout(SEARCH_TIMEOUT, self.search_inner(query, opts))
            .await
            .map_err(|_| StoreError::Cancelled)?
    }

    async fn search_inner(&self, query: &str, opts: &SearchOptions) -> Result<SearchResponse> {
        if opts.search_symbols {
            return self.search_symbols(query, opts).await;
        }

        let mut limit = OVERFETCH * opts.max_results.max(1);
        loop {
            let response = self
                .hedged_search(query, limit as u64, opts.offset as u64)
                .await?;
            let raw_len = response.results.len();
            let num_results = match response.results.first().and_then(|r| r.total) {
                Some(total) => total.max(0) as u64,
                None => raw_len as u64,
            };

            let enriched = self.enrich(response.results).await?;
            let snapshot = self.excluded_prefixes().snapshot();
            let kept: Vec<SearchResult> = enriched
                .into_iter()
                .filter(|r| !is_excluded(&snapshot, &r.package_path))
                .collect();
            let grouped = group_results(kept, opts.max_results);

            // Grouping may have collapsed the page away; if the raw page
            // was full there may be more material one fetch deeper.
            let starved = grouped.len() < opts.max_results && raw_len == limit;
            if starved && limit < RETRY_OVERFETCH * opts.max_results.max(1) {
                debug!(query, limit, grouped = grouped.len(), "regrouping starved page");
                limit = RETRY_OVERFETCH * opts.max_results.max(1);
                continue;
            }

            return Ok(SearchResponse {
                results: grouped,
                num_results,
                source: response.source,
            });
        }
    }

    /// Races every searcher under one cancel scope. The first completed
    /// response decides the call, success or error; the rest are
    /// aborted. An error is not worth waiting out: it usually signals
    /// store overload, and the sibling shares the store.
    async fn hedged_search(
        &self,
        query: &str,
        limit: u64,
        offset: u64,
    ) -> Result<SearcherResponse> {
        let mut set = JoinSet::new();
        for searcher in &self.searchers {
            let searcher = Arc::clone(searcher);
            let store = Arc::clone(&self.store);
            let query = query.to_string();
            set.spawn(async move {
                let response = searcher.search(&store, &query, limit, offset).await;
                if let Err(err) = &response {
                    warn!(searcher = searcher.name(), error = %err, "searcher failed");
                }
                response
            });
        }

        let first = set
            .join_next()
            .await
            .ok_or_else(|| StoreError::Internal("no searchers configured".into()))?;
        set.abort_all();
        match first {
            Ok(result) => result,
            Err(join_err) => Err(StoreError::Internal(format!(
                "searcher task failed: {join_err}"
            ))),
        }
    }

    /// Fills in name, synopsis and license metadata for a raw result
    /// page with one query keyed by (path, version, module path)
    /// triples. Non-redistributable results keep their synopsis empty
    /// unless the license bypass is on.
    async fn enrich(&self, raw: Vec<RawSearchResult>) -> Result<Vec<SearchResult>> {
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        let paths: Vec<String> = raw.iter().map(|r| r.package_path.clone()).collect();
        let versions: Vec<String> = raw.iter().map(|r| r.version.clone()).collect();
        let modules: Vec<String> = raw.iter().map(|r| r.module_path.clone()).collect();

        struct Meta {
            name: String,
            synopsis: String,
            license_types: Vec<String>,
            redistributable: bool,
        }
        let mut metas: HashMap<(String, String, String), Meta> = HashMap::new();

        let rows = sqlx::query(
            "SELECT p.path AS package_path, m.module_path, m.version, u.name, \
                    u.license_types, \
                    (u.redistributable AND m.redistributable) AS redistributable, \
                    COALESCE(d.synopsis, '') AS synopsis \
             FROM units u \
             JOIN paths p ON p.id = u.path_id \
             JOIN modules m ON m.id = u.module_id \
             LEFT JOIN LATERAL ( \
                 SELECT dd.synopsis FROM documentation dd WHERE dd.unit_id = u.id \
                 ORDER BY CASE dd.goos WHEN 'all' THEN 0 WHEN 'linux' THEN 1 \
                          WHEN 'windows' THEN 2 WHEN 'darwin' THEN 3 WHEN 'js' THEN 4 \
                          ELSE 5 END \
                 LIMIT 1 \
             ) d ON TRUE \
             WHERE (p.path, m.module_path, m.version) IN \
                   (SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[]))",
        )
        .bind(&paths)
        .bind(&modules)
        .bind(&versions)
        .fetch_all(self.store.db().pool())
        .await
        .map_err(StoreError::from)?;
        for row in rows {
            let license_types: Option<Vec<String>> = row.try_get("license_types")?;
            let mut license_types = license_types.unwrap_or_default();
            license_types.sort();
            license_types.dedup();
            metas.insert(
                (
                    row.try_get("package_path")?,
                    row.try_get("module_path")?,
                    row.try_get("version")?,
                ),
                Meta {
                    name: row.try_get("name")?,
                    synopsis: row.try_get("synopsis")?,
                    license_types,
                    redistributable: row.try_get("redistributable")?,
                },
            );
        }

        let mut out = Vec::with_capacity(raw.len());
        for r in raw {
            let mut result = SearchResult::empty(r.package_path.clone());
            result.module_path = r.module_path.clone();
            result.version = r.version.clone();
            result.commit_time = r.commit_time;
            result.imported_by_count = r.imported_by_count;
            result.score = r.score;
            if let Some(meta) = metas.remove(&(r.package_path, r.module_path, r.version)) {
                result.name = meta.name;
                result.license_types = meta.license_types;
                if meta.redistributable || self.bypass_license_check {
                    result.synopsis = meta.synopsis;
                }
            }
            out.push(result);
        }
        Ok(out)
    }
}

/// Whether a package path starts with any excluded prefix. The snapshot
/// is sorted, but the set is small; a linear scan reads better than a
/// binary search over prefix ranges.
fn is_excluded(prefixes: &[String], package_path: &str) -> bool {
    prefixes
        .iter()
        .any(|prefix| package_path.starts_with(prefix.as_str()))
}
