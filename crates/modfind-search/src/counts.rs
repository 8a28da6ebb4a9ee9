//! Approximate result counting for dashboards.

use crate::Planner;
use crate::searchers::{NO_GO_MOD_PENALTY, NON_REDISTRIBUTABLE_PENALTY};
use modfind_core::hll;
use modfind_store::{Result, SqlValue};
use sqlx::Row;

impl Planner {
    /// Estimates how many documents match `query`, using the stored
    /// HyperLogLog assignments: one query collects the per-register
    /// maximum leading-zero count over matching documents, the estimator
    /// does the rest. Clamped to `max_result_count`.
    pub async fn estimated_result_count(
        &self,
        query: &str,
        max_result_count: u64,
    ) -> Result<u64> {
        let mut register_maxes = vec![0i16; hll::REGISTER_COUNT];
        self.store()
            .db()
            .run_query(
                "SELECT r.hll_register, MAX(r.hll_leading_zeros) AS max_zeros \
                 FROM ( \
                     SELECT d.hll_register, d.hll_leading_zeros, \
                            ts_rank('{0.1, 0.2, 1.0, 1.0}', d.tsv_search_tokens, \
                                    websearch_to_tsquery('simple', $1)) * \
                            ln(exp(1.0) + d.imported_by_count) * \
                            CASE WHEN d.redistributable THEN 1.0 ELSE $2 END * \
                            CASE WHEN d.has_go_mod IS NULL OR d.has_go_mod THEN 1.0 \
                                 ELSE $3 END AS score \
                     FROM search_documents d \
                     WHERE d.tsv_search_tokens @@ websearch_to_tsquery('simple', $1) \
                 ) r \
                 WHERE r.score > 0.1 \
                 GROUP BY r.hll_register",
                vec![
                    SqlValue::Text(query.to_string()),
                    SqlValue::Float8(NON_REDISTRIBUTABLE_PENALTY),
                    SqlValue::Float8(NO_GO_MOD_PENALTY),
                ],
                |row| {
                    let register: i16 = row.try_get("hll_register")?;
                    let max_zeros: i16 = row.try_get("max_zeros")?;
                    if let Some(slot) = register_maxes.get_mut(register as usize) {
                        *slot = max_zeros;
                    }
                    Ok(())
                },
            )
            .await?;
        Ok(hll::estimate_count(&register_maxes).min(max_result_count))
    }
}
