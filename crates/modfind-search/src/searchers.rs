//! The package searcher set.
//!
//! Two strategies answer the same question with different cost shapes:
//! `popular` walks packages by descending imported-by count and can stop
//! early for selective queries over popular packages; `deep` runs the
//! full-text scan and carries an exact windowed total. The planner races
//! them and keeps whichever finishes first.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use modfind_store::{Result, SqlValue, Store};
use sqlx::Row;

/// Penalty factors baked into the score expression. These must match the
/// SQL on both search paths or cached rankings drift.
pub const NON_REDISTRIBUTABLE_PENALTY: f64 = 0.5;
pub const NO_GO_MOD_PENALTY: f64 = 0.8;

/// A single row produced by a package searcher, before enrichment.
#[derive(Debug, Clone)]
pub struct RawSearchResult {
    pub package_path: String,
    pub version: String,
    pub module_path: String,
    pub commit_time: DateTime<Utc>,
    pub imported_by_count: i64,
    pub score: f64,
    /// Exact total across the whole result set, when the strategy can
    /// compute one.
    pub total: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct SearcherResponse {
    pub source: &'static str,
    pub results: Vec<RawSearchResult>,
}

/// A package-search strategy. One method, shared signature; the planner
/// treats the set as a dispatch table.
#[async_trait]
pub trait Searcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(
        &self,
        store: &Store,
        query: &str,
        limit: u64,
        offset: u64,
    ) -> Result<SearcherResponse>;
}

/// Stored-procedure scan in descending imported-by order with early
/// exit. Returns no reliable total.
pub struct PopularSearcher;

#[async_trait]
impl Searcher for PopularSearcher {
    fn name(&self) -> &'static str {
        "popular"
    }

    async fn search(
        &self,
        store: &Store,
        query: &str,
        limit: u64,
        offset: u64,
    ) -> Result<SearcherResponse> {
        let mut results = Vec::new();
        store
            .db()
            .run_query(
                "SELECT package_path, version, module_path, commit_time, \
                        imported_by_count, score \
                 FROM popular_search($1, $2, $3, $4, $5)",
                vec![
                    SqlValue::Text(query.to_string()),
                    SqlValue::Int4(limit as i32),
                    SqlValue::Int4(offset as i32),
                    SqlValue::Float8(NON_REDISTRIBUTABLE_PENALTY),
                    SqlValue::Float8(NO_GO_MOD_PENALTY),
                ],
                |row| {
                    results.push(RawSearchResult {
                        package_path: row.try_get("package_path")?,
                        version: row.try_get("version")?,
                        module_path: row.try_get("module_path")?,
                        commit_time: row.try_get("commit_time")?,
                        imported_by_count: row.try_get("imported_by_count")?,
                        score: row.try_get("score")?,
                        total: None,
                    });
                    Ok(())
                },
            )
            .await?;
        Ok(SearcherResponse {
            source: "popular",
            results,
        })
    }
}

/// Full-text scan ordered by score, with `COUNT(*) OVER()` totals.
pub struct DeepSearcher;

#[async_trait]
impl Searcher for DeepSearcher {
    fn name(&self) -> &'static str {
        "deep"
    }

    async fn search(
        &self,
        store: &Store,
        query: &str,
        limit: u64,
        offset: u64,
    ) -> Result<SearcherResponse> {
        let mut results = Vec::new();
        store
            .db()
            .run_query(
                "SELECT r.package_path, r.version, r.module_path, r.commit_time, \
                        r.imported_by_count, r.score, COUNT(*) OVER() AS total \
                 FROM ( \
                     SELECT d.package_path, d.version, d.module_path, d.commit_time, \
                            d.imported_by_count, \
                            ts_rank('{0.1, 0.2, 1.0, 1.0}', d.tsv_search_tokens, \
                                    websearch_to_tsquery('simple', $1)) * \
                            ln(exp(1.0) + d.imported_by_count) * \
                            CASE WHEN d.redistributable THEN 1.0 ELSE $4 END * \
                            CASE WHEN d.has_go_mod IS NULL OR d.has_go_mod THEN 1.0 \
                                 ELSE $5 END AS score \
                     FROM search_documents d \
                     WHERE d.tsv_search_tokens @@ websearch_to_tsquery('simple', $1) \
                 ) r \
                 WHERE r.score > 0.1 \
                 ORDER BY r.score DESC, r.commit_time DESC, r.package_path ASC \
                 LIMIT $2 OFFSET $3",
                vec![
                    SqlValue::Text(query.to_string()),
                    SqlValue::Int8(limit as i64),
                    SqlValue::Int8(offset as i64),
                    SqlValue::Float8(NON_REDISTRIBUTABLE_PENALTY),
                    SqlValue::Float8(NO_GO_MOD_PENALTY),
                ],
                |row| {
                    results.push(RawSearchResult {
                        package_path: row.try_get("package_path")?,
                        version: row.try_get("version")?,
                        module_path: row.try_get("module_path")?,
                        commit_time: row.try_get("commit_time")?,
                        imported_by_count: row.try_get("imported_by_count")?,
                        score: row.try_get("score")?,
                        total: Some(row.try_get("total")?),
                    });
                    Ok(())
                },
            )
            .await?;
        Ok(SearcherResponse {
            source: "deep",
            results,
        })
    }
}
