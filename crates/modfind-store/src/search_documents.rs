//! Projection of packages into `search_documents` and
//! `symbol_search_documents`.

use crate::Store;
use crate::db::SqlValue;
use crate::error::Result;
use modfind_core::{generate_path_tokens, hll, paths, search_sections};
use sqlx::Row;
use tracing::debug;

/// Inputs for one package's search-document upsert; everything else is
/// drawn from the normalised tables inside the statement itself.
#[derive(Debug, Clone)]
pub struct SearchDocumentArgs {
    pub package_path: String,
    pub module_path: String,
    pub version: String,
    pub synopsis: String,
    pub readme_path: Option<String>,
    pub readme_contents: Option<String>,
}

impl Store {
    /// Upserts the one `search_documents` row for a package path.
    ///
    /// Skips silently for internal packages and when a longer module
    /// path already owns the package. On conflict every field refreshes
    /// except `version_updated_at` (which only advances when the stored
    /// version changes) and the HLL columns (pure functions of the
    /// path, written once).
    pub async fn upsert_search_document(&self, args: SearchDocumentArgs) -> Result<()> {
        if paths::has_internal_segment(&args.package_path) {
            debug!(package_path = %args.package_path, "not indexing internal package");
            return Ok(());
        }
        let dominated = self
            .db
            .query_opt(
                "SELECT 1 FROM search_documents \
                 WHERE package_path = $1 AND module_path LIKE $2 || '/%'",
                vec![
                    SqlValue::Text(args.package_path.clone()),
                    SqlValue::Text(args.module_path.clone()),
                ],
            )
            .await?;
        if dominated.is_some() {
            debug!(
                package_path = %args.package_path,
                module_path = %args.module_path,
                "not indexing: a longer module path owns this package"
            );
            return Ok(());
        }

        let tokens = generate_path_tokens(&args.package_path).join(" ");
        let sections = search_sections(
            &args.synopsis,
            args.readme_path.as_deref().unwrap_or(""),
            args.readme_contents.as_deref().unwrap_or(""),
        );
        let (register, leading_zeros) = hll::assign(&args.package_path);

        self.db
            .execute(
                "INSERT INTO search_documents ( \
                     package_path, package_path_id, module_path, version, name, synopsis, \
                     license_types, redistributable, has_go_mod, commit_time, unit_id, \
                     tsv_search_tokens, hll_register, hll_leading_zeros) \
                 SELECT p.path, p.id, m.module_path, m.version, u.name, $4, \
                        u.license_types, (u.redistributable AND m.redistributable), \
                        m.has_go_mod, m.commit_time, u.id, \
                        setweight(to_tsvector('simple', $5), 'A') || \
                        setweight(to_tsvector('simple', u.name || ' ' || $6), 'B') || \
                        setweight(to_tsvector('simple', $7), 'C') || \
                        setweight(to_tsvector('simple', $8), 'D'), \
                        $9, $10 \
                 FROM units u \
                 JOIN modules m ON m.id = u.module_id \
                 JOIN paths p ON p.id = u.path_id \
                 WHERE p.path = $1 AND m.module_path = $2 AND m.version = $3 \
                   AND u.name != '' AND u.name != 'main' \
                   AND EXISTS (SELECT 1 FROM documentation d WHERE d.unit_id = u.id) \
                 LIMIT 1 \
                 ON CONFLICT (package_path) DO UPDATE SET \
                     package_path_id = excluded.package_path_id, \
                     module_path = excluded.module_path, \
                     version = excluded.version, \
                     name = excluded.name, \
                     synopsis = excluded.synopsis, \
                     license_types = excluded.license_types, \
                     redistributable = excluded.redistributable, \
                     has_go_mod = excluded.has_go_mod, \
                     commit_time = excluded.commit_time, \
                     unit_id = excluded.unit_id, \
                     tsv_search_tokens = excluded.tsv_search_tokens, \
                     version_updated_at = CASE \
                         WHEN search_documents.version = excluded.version \
                         THEN search_documents.version_updated_at \
                         ELSE CURRENT_TIMESTAMP END",
                vec![
                    SqlValue::Text(args.package_path),
                    SqlValue::Text(args.module_path),
                    SqlValue::Text(args.version),
                    SqlValue::Text(args.synopsis),
                    SqlValue::Text(tokens),
                    SqlValue::Text(sections.b),
                    SqlValue::Text(sections.c),
                    SqlValue::Text(sections.d),
                    SqlValue::Int2(register),
                    SqlValue::Int2(leading_zeros),
                ],
            )
            .await
            .map_err(|e| e.in_context("upsert search document"))?;
        Ok(())
    }

    /// Upserts one `symbol_search_documents` row per (package, symbol)
    /// of the given module version.
    ///
    /// Only redistributable, non-command packages contribute. When a
    /// symbol appears in several build contexts, the row keeps the
    /// highest-priority one (all > linux > windows > darwin > js).
    pub async fn upsert_symbol_search_documents(
        &self,
        module_path: &str,
        version: &str,
    ) -> Result<()> {
        let mut package_paths: Vec<String> = Vec::new();
        let rows = sqlx::query(
            "SELECT p.path FROM units u \
             JOIN modules m ON m.id = u.module_id \
             JOIN paths p ON p.id = u.path_id \
             WHERE m.module_path = $1 AND m.version = $2 \
               AND u.name != '' AND u.name != 'main' \
               AND u.redistributable AND m.redistributable \
             ORDER BY p.path",
        )
        .bind(module_path)
        .bind(version)
        .fetch_all(self.db.pool())
        .await?;
        for row in rows {
            package_paths.push(row.try_get("path")?);
        }

        for package_path in package_paths {
            let tokens = generate_path_tokens(&package_path).join(" ");
            self.db
                .execute(
                    "INSERT INTO symbol_search_documents ( \
                         package_path_id, symbol_name_id, unit_id, package_symbol_id, \
                         goos, goarch, package_name, package_path, symbol_name, \
                         imported_by_count, tsv_path_tokens) \
                     SELECT DISTINCT ON (ps.symbol_name_id) \
                            u.path_id, ps.symbol_name_id, u.id, ps.id, d.goos, d.goarch, \
                            u.name, p.path, sn.name, COALESCE(sd.imported_by_count, 0), \
                            to_tsvector('simple', $4) \
                     FROM units u \
                     JOIN modules m ON m.id = u.module_id \
                     JOIN paths p ON p.id = u.path_id \
                     JOIN documentation d ON d.unit_id = u.id \
                     JOIN documentation_symbols ds ON ds.documentation_id = d.id \
                     JOIN package_symbols ps ON ps.id = ds.package_symbol_id \
                     JOIN symbol_names sn ON sn.id = ps.symbol_name_id \
                     LEFT JOIN search_documents sd ON sd.package_path_id = u.path_id \
                     WHERE m.module_path = $1 AND m.version = $2 AND p.path = $3 \
                     ORDER BY ps.symbol_name_id, \
                              CASE d.goos WHEN 'all' THEN 0 WHEN 'linux' THEN 1 \
                                   WHEN 'windows' THEN 2 WHEN 'darwin' THEN 3 \
                                   WHEN 'js' THEN 4 ELSE 5 END \
                     ON CONFLICT (package_path_id, symbol_name_id) DO UPDATE SET \
                         unit_id = excluded.unit_id, \
                         package_symbol_id = excluded.package_symbol_id, \
                         goos = excluded.goos, \
                         goarch = excluded.goarch, \
                         package_name = excluded.package_name, \
                         package_path = excluded.package_path, \
                         symbol_name = excluded.symbol_name, \
                         imported_by_count = excluded.imported_by_count, \
                         tsv_path_tokens = excluded.tsv_path_tokens",
                    vec![
                        SqlValue::Text(module_path.to_string()),
                        SqlValue::Text(version.to_string()),
                        SqlValue::Text(package_path),
                        SqlValue::Text(tokens),
                    ],
                )
                .await
                .map_err(|e| e.in_context("upsert symbol search documents"))?;
        }
        Ok(())
    }
}
