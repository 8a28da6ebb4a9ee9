//! Symbol search: query-shape classification fans out into one or more
//! SQL strategies over `symbol_search_documents`.

use crate::{Planner, SearchOptions, SearchResponse, SearchResult, SymbolInfo};
use modfind_core::symbolquery::{SymbolQuery, expand_multi_word};
use modfind_store::{Result, SqlValue, StoreError};
use sqlx::Row;
use std::collections::HashSet;
use tracing::debug;

impl Planner {
    pub(crate) async fn search_symbols(
        &self,
        query: &str,
        opts: &SearchOptions,
    ) -> Result<SearchResponse> {
        let query = query.trim();
        // Fetch enough rows to cover the requested page after merging.
        let fetch_limit = (opts.offset + opts.max_results).max(1) as i64;

        let mut merged = match SymbolQuery::parse(query) {
            SymbolQuery::Unsupported => Vec::new(),
            SymbolQuery::NoDot => self.symbol_or_path_query(query, fetch_limit).await?,
            SymbolQuery::OneDot => {
                // Ambiguous: `pkg.Symbol` and `Type.Method` are both
                // plausible readings, so both run in parallel.
                let (pkg, sym) = split_once_dot(query)?;
                let (by_symbol, by_package) = tokio::join!(
                    self.symbol_or_path_query(query, fetch_limit),
                    self.package_dot_symbol_query(&pkg, &sym, fetch_limit),
                );
                let mut all = by_symbol?;
                all.extend(by_package?);
                all
            }
            SymbolQuery::TwoDots => {
                // Always `package.Type.Member`.
                let (pkg, sym) = split_once_dot(query)?;
                self.package_dot_symbol_query(&pkg, &sym, fetch_limit)
                    .await?
            }
            SymbolQuery::MultiWord => {
                let candidates = expand_multi_word(query, opts.symbol_filter.as_deref());
                if candidates.is_empty() {
                    debug!(query, "multi-word symbol query too ambiguous");
                }
                let mut all = Vec::new();
                for candidate in candidates {
                    all.extend(
                        self.symbol_with_path_tokens_query(
                            &candidate.symbol,
                            &candidate.path_tokens,
                            fetch_limit,
                        )
                        .await?,
                    );
                }
                all
            }
        };

        // De-duplicate across strategies by (package path, symbol name).
        let mut seen: HashSet<(String, String)> = HashSet::new();
        merged.retain(|r| {
            let symbol_name = r.symbol.as_ref().map(|s| s.name.clone()).unwrap_or_default();
            seen.insert((r.package_path.clone(), symbol_name))
        });

        merged.sort_by(|a, b| {
            b.imported_by_count
                .cmp(&a.imported_by_count)
                .then_with(|| a.package_path.cmp(&b.package_path))
                .then_with(|| {
                    let sa = a.symbol.as_ref().map(|s| s.name.as_str()).unwrap_or("");
                    let sb = b.symbol.as_ref().map(|s| s.name.as_str()).unwrap_or("");
                    sa.cmp(sb)
                })
        });

        let num_results = merged.len() as u64;
        let results: Vec<SearchResult> = merged
            .into_iter()
            .skip(opts.offset)
            .take(opts.max_results)
            .collect();
        Ok(SearchResponse {
            results,
            num_results,
            source: "symbol",
        })
    }

    /// Matches the query as a symbol name or as path tokens.
    async fn symbol_or_path_query(&self, query: &str, limit: i64) -> Result<Vec<SearchResult>> {
        self.run_symbol_query(
            "SELECT package_path, package_name, symbol_name, goos, goarch, imported_by_count \
             FROM symbol_search_documents \
             WHERE lower(symbol_name) = lower($1) \
                OR tsv_path_tokens @@ websearch_to_tsquery('simple', $1) \
             ORDER BY imported_by_count DESC, package_path ASC, symbol_name ASC \
             LIMIT $2",
            vec![SqlValue::Text(query.to_string()), SqlValue::Int8(limit)],
        )
        .await
    }

    /// Matches `package.symbol`: the first component names the package
    /// (by name or terminal path segment), the rest the symbol.
    async fn package_dot_symbol_query(
        &self,
        package: &str,
        symbol: &str,
        limit: i64,
    ) -> Result<Vec<SearchResult>> {
        self.run_symbol_query(
            "SELECT package_path, package_name, symbol_name, goos, goarch, imported_by_count \
             FROM symbol_search_documents \
             WHERE (lower(package_name) = lower($1) \
                    OR lower(package_path) = lower($1) \
                    OR lower(package_path) LIKE '%/' || lower($1)) \
               AND lower(symbol_name) = lower($2) \
             ORDER BY imported_by_count DESC, package_path ASC, symbol_name ASC \
             LIMIT $3",
            vec![
                SqlValue::Text(package.to_string()),
                SqlValue::Text(symbol.to_string()),
                SqlValue::Int8(limit),
            ],
        )
        .await
    }

    /// Matches one multi-word reading: an exact symbol constrained by a
    /// path-token tsquery built from the remaining words.
    async fn symbol_with_path_tokens_query(
        &self,
        symbol: &str,
        path_tokens: &str,
        limit: i64,
    ) -> Result<Vec<SearchResult>> {
        self.run_symbol_query(
            "SELECT package_path, package_name, symbol_name, goos, goarch, imported_by_count \
             FROM symbol_search_documents \
             WHERE lower(symbol_name) = lower($1) \
               AND tsv_path_tokens @@ to_tsquery('simple', $2) \
             ORDER BY imported_by_count DESC, package_path ASC, symbol_name ASC \
             LIMIT $3",
            vec![
                SqlValue::Text(symbol.to_string()),
                SqlValue::Text(path_tokens.to_string()),
                SqlValue::Int8(limit),
            ],
        )
        .await
    }

    async fn run_symbol_query(
        &self,
        sql: &str,
        args: Vec<SqlValue>,
    ) -> Result<Vec<SearchResult>> {
        let mut results = Vec::new();
        self.store()
            .db()
            .run_query(sql, args, |row| {
                let mut result = SearchResult::empty(row.try_get("package_path")?);
                result.name = row.try_get("package_name")?;
                result.imported_by_count = row.try_get("imported_by_count")?;
                result.symbol = Some(SymbolInfo {
                    name: row.try_get("symbol_name")?,
                    goos: row.try_get("goos")?,
                    goarch: row.try_get("goarch")?,
                });
                results.push(result);
                Ok(())
            })
            .await?;
        Ok(results)
    }
}

fn split_once_dot(query: &str) -> Result<(String, String)> {
    query
        .split_once('.')
        .map(|(package, symbol)| (package.to_string(), symbol.to_string()))
        .ok_or_else(|| StoreError::InvalidArgument(format!("expected a dotted query: {query}")))
}
