//! Latest-version bookkeeping and module version states.
//!
//! Latest info is read on every latest-resolution, so it sits behind a
//! process-wide read-mostly cache that refreshes on write.

use crate::Store;
use crate::db::SqlValue;
use crate::error::Result;
use modfind_core::{LatestModuleVersions, version};
use sqlx::Row;

impl Store {
    /// The latest-version info for a module path, if recorded. Served
    /// from the in-process cache when possible.
    pub async fn get_latest_module_versions(
        &self,
        module_path: &str,
    ) -> Result<Option<LatestModuleVersions>> {
        if let Some(cached) = self.latest_cache.get(module_path) {
            return Ok(Some(cached.clone()));
        }
        let Some(row) = self
            .db
            .query_opt(
                "SELECT module_path, raw_version, cooked_version, good_version, go_mod \
                 FROM latest_module_versions WHERE module_path = $1",
                vec![SqlValue::Text(module_path.to_string())],
            )
            .await?
        else {
            return Ok(None);
        };
        let latest = LatestModuleVersions {
            module_path: row.try_get("module_path")?,
            raw_version: row.try_get("raw_version")?,
            cooked_version: row.try_get("cooked_version")?,
            good_version: row.try_get("good_version")?,
            go_mod: row.try_get("go_mod")?,
        };
        self.latest_cache
            .insert(module_path.to_string(), latest.clone());
        Ok(Some(latest))
    }

    /// Writes latest-version info and refreshes the cache.
    pub async fn upsert_latest_module_versions(
        &self,
        latest: &LatestModuleVersions,
    ) -> Result<()> {
        self.db
            .execute(
                "INSERT INTO latest_module_versions \
                     (module_path, raw_version, cooked_version, good_version, go_mod) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (module_path) DO UPDATE SET \
                     raw_version = excluded.raw_version, \
                     cooked_version = excluded.cooked_version, \
                     good_version = excluded.good_version, \
                     go_mod = excluded.go_mod, \
                     updated_at = CURRENT_TIMESTAMP",
                vec![
                    SqlValue::Text(latest.module_path.clone()),
                    SqlValue::Text(latest.raw_version.clone()),
                    SqlValue::Text(latest.cooked_version.clone()),
                    SqlValue::Text(latest.good_version.clone()),
                    SqlValue::NullableText(latest.go_mod.clone()),
                ],
            )
            .await
            .map_err(|e| e.in_context("upsert latest module versions"))?;
        self.latest_cache
            .insert(latest.module_path.clone(), latest.clone());
        Ok(())
    }

    /// Records the fetch outcome for a module version. The sort version
    /// is stored so status queries can compare versions lexically.
    pub async fn upsert_module_version_state(
        &self,
        module_path: &str,
        module_version: &str,
        status: i32,
        error: Option<&str>,
    ) -> Result<()> {
        self.db
            .execute(
                "INSERT INTO module_version_states \
                     (module_path, version, sort_version, status, error) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (module_path, version) DO UPDATE SET \
                     sort_version = excluded.sort_version, \
                     status = excluded.status, \
                     error = excluded.error, \
                     last_processed_at = CURRENT_TIMESTAMP",
                vec![
                    SqlValue::Text(module_path.to_string()),
                    SqlValue::Text(module_version.to_string()),
                    SqlValue::Text(version::for_sorting(module_version)),
                    SqlValue::Int4(status),
                    SqlValue::NullableText(error.map(str::to_string)),
                ],
            )
            .await
            .map_err(|e| e.in_context("upsert module version state"))?;
        Ok(())
    }
}
