//! Excluded-prefix storage. The query planner keeps a refreshed
//! in-process snapshot; this is only the persistence side.

use crate::Store;
use crate::db::SqlValue;
use crate::error::Result;
use sqlx::Row;

impl Store {
    /// All excluded path prefixes, sorted.
    pub async fn get_excluded_prefixes(&self) -> Result<Vec<String>> {
        let mut prefixes = Vec::new();
        self.db
            .run_query(
                "SELECT prefix FROM excluded_prefixes ORDER BY prefix",
                vec![],
                |row| {
                    prefixes.push(row.try_get("prefix")?);
                    Ok(())
                },
            )
            .await?;
        Ok(prefixes)
    }

    pub async fn insert_excluded_prefix(&self, prefix: &str, reason: &str) -> Result<()> {
        self.db
            .execute(
                "INSERT INTO excluded_prefixes (prefix, reason) VALUES ($1, $2) \
                 ON CONFLICT (prefix) DO UPDATE SET reason = excluded.reason",
                vec![
                    SqlValue::Text(prefix.to_string()),
                    SqlValue::Text(reason.to_string()),
                ],
            )
            .await?;
        Ok(())
    }
}
