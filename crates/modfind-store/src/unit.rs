//! Unit resolution: picking the best owning module-version for a path.

use crate::Store;
use crate::db::SqlValue;
use crate::error::{Result, StoreError};
use chrono::{DateTime, Utc};
use modfind_core::types::{LATEST, MASTER};
use modfind_core::{
    BuildContext, Documentation, FieldSet, LatestModuleVersions, LicenseMeta, PackageMeta, Readme,
    Unit, UnitMeta, paths, version,
};
use sqlx::Row;

/// Candidate ordering shared by every resolver query: compatible before
/// `+incompatible`, releases before prereleases before everything else,
/// then highest version; module paths compare lexicographically so the
/// descending tie-break prefers the longer (deeper) module path.
const CANDIDATE_ORDER: &str = "ORDER BY m.incompatible ASC, \
     CASE m.version_type WHEN 'release' THEN 0 WHEN 'prerelease' THEN 1 ELSE 2 END ASC, \
     m.sort_version DESC, \
     m.module_path DESC";

/// One row of the versions listing for a path.
#[derive(Debug, Clone)]
pub struct ModuleVersionInfo {
    pub module_path: String,
    pub version: String,
    pub commit_time: DateTime<Utc>,
    pub is_redistributable: bool,
    pub has_go_mod: Option<bool>,
    pub version_type: String,
}

/// A latest-version candidate before cache-driven filtering.
#[derive(Debug, Clone)]
struct LatestCandidate {
    module_path: String,
    version: String,
    incompatible: bool,
}

impl Store {
    /// Resolves `(path, module?, version?)` to the single best owning
    /// module-version. Empty strings mean "unknown module path" and
    /// "latest version"; the `master` sentinel resolves through
    /// `version_map`.
    pub async fn get_unit_meta(
        &self,
        path: &str,
        requested_module_path: &str,
        requested_version: &str,
    ) -> Result<UnitMeta> {
        let mut sql = String::from(
            "SELECT p.path, u.name, u.redistributable AS unit_redistributable, \
                    u.license_types, u.license_paths, \
                    m.module_path, m.version, m.commit_time, \
                    m.redistributable AS module_redistributable, m.has_go_mod \
             FROM paths p \
             JOIN units u ON u.path_id = p.id \
             JOIN modules m ON m.id = u.module_id",
        );
        let mut args = vec![SqlValue::Text(path.to_string())];
        let mut conds = vec!["p.path = $1".to_string()];

        if requested_version == MASTER {
            sql.push_str(
                " JOIN version_map vm ON vm.module_path = m.module_path \
                  AND vm.resolved_version = m.version",
            );
            conds.push("vm.requested_version = 'master'".to_string());
        }
        if !requested_module_path.is_empty() {
            args.push(SqlValue::Text(requested_module_path.to_string()));
            conds.push(format!("m.module_path = ${}", args.len()));
        }
        if !requested_version.is_empty()
            && requested_version != LATEST
            && requested_version != MASTER
        {
            args.push(SqlValue::Text(requested_version.to_string()));
            conds.push(format!("m.version = ${}", args.len()));
        }

        sql.push_str(" WHERE ");
        sql.push_str(&conds.join(" AND "));
        sql.push(' ');
        sql.push_str(CANDIDATE_ORDER);
        sql.push_str(" LIMIT 1");

        let row = self
            .db
            .query_opt(&sql, args)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("unit {path}")))?;

        let license_types: Option<Vec<String>> = row.try_get("license_types")?;
        let license_paths: Option<Vec<String>> = row.try_get("license_paths")?;
        Ok(UnitMeta {
            path: row.try_get("path")?,
            name: row.try_get("name")?,
            is_redistributable: row.try_get("unit_redistributable")?,
            licenses: zip_license_metadata(
                license_types.unwrap_or_default(),
                license_paths.unwrap_or_default(),
            ),
            module_path: row.try_get("module_path")?,
            version: row.try_get("version")?,
            commit_time: row.try_get("commit_time")?,
            module_redistributable: row.try_get("module_redistributable")?,
            has_go_mod: row.try_get::<Option<bool>, _>("has_go_mod")?.unwrap_or(false),
        })
    }

    /// The latest version serving `full_path`, honoring the cached
    /// latest-version info: incompatible candidates are dropped when the
    /// cooked latest is compatible and a go.mod exists, and retracted
    /// versions are skipped unless nothing else remains.
    pub async fn get_latest_unit_version(
        &self,
        full_path: &str,
        requested_module_path: Option<&str>,
    ) -> Result<String> {
        let mut sql = String::from(
            "SELECT m.module_path, m.version, m.incompatible \
             FROM paths p \
             JOIN units u ON u.path_id = p.id \
             JOIN modules m ON m.id = u.module_id \
             WHERE p.path = $1",
        );
        let mut args = vec![SqlValue::Text(full_path.to_string())];
        if let Some(module_path) = requested_module_path {
            args.push(SqlValue::Text(module_path.to_string()));
            sql.push_str(&format!(" AND m.module_path = ${}", args.len()));
        }
        sql.push(' ');
        sql.push_str(CANDIDATE_ORDER);

        let mut candidates = Vec::new();
        self.db
            .run_query(&sql, args, |row| {
                candidates.push(LatestCandidate {
                    module_path: row.try_get("module_path")?,
                    version: row.try_get("version")?,
                    incompatible: row.try_get("incompatible")?,
                });
                Ok(())
            })
            .await?;
        let Some(first) = candidates.first() else {
            return Err(StoreError::NotFound(format!("no versions for {full_path}")));
        };

        let module_path = requested_module_path
            .map(str::to_string)
            .unwrap_or_else(|| first.module_path.clone());
        candidates.retain(|c| c.module_path == module_path);
        let latest = self.get_latest_module_versions(&module_path).await?;

        pick_latest(&candidates, latest.as_ref())
            .map(|c| c.version.clone())
            .ok_or_else(|| StoreError::NotFound(format!("no versions for {full_path}")))
    }

    /// Hydrates a unit from its resolved meta, honoring the field mask.
    /// Documentation is limited to the best (or requested) build
    /// context.
    pub async fn get_unit(
        &self,
        meta: &UnitMeta,
        fields: FieldSet,
        build_context: Option<&BuildContext>,
    ) -> Result<Unit> {
        let row = self
            .db
            .query_row(
                "SELECT u.id AS unit_id, m.id AS module_id \
                 FROM paths p \
                 JOIN units u ON u.path_id = p.id \
                 JOIN modules m ON m.id = u.module_id \
                 WHERE p.path = $1 AND m.module_path = $2 AND m.version = $3",
                vec![
                    SqlValue::Text(meta.path.clone()),
                    SqlValue::Text(meta.module_path.clone()),
                    SqlValue::Text(meta.version.clone()),
                ],
            )
            .await
            .map_err(|e| e.in_context("get unit"))?;
        let unit_id: i64 = row.try_get("unit_id")?;
        let module_id: i64 = row.try_get("module_id")?;

        let mut unit = Unit {
            path: meta.path.clone(),
            module_path: meta.module_path.clone(),
            v1_path: paths::v1_path(&meta.path, &meta.module_path),
            name: meta.name.clone(),
            is_redistributable: meta.is_redistributable,
            licenses: meta.licenses.clone(),
            ..Unit::default()
        };

        if fields.contains(FieldSet::README) {
            if let Some(row) = self
                .db
                .query_opt(
                    "SELECT file_path, contents FROM readmes WHERE unit_id = $1",
                    vec![SqlValue::Int8(unit_id)],
                )
                .await?
            {
                unit.readme = Some(Readme {
                    file_path: row.try_get("file_path")?,
                    contents: row.try_get("contents")?,
                });
            }
        }

        if fields.contains(FieldSet::DOCUMENTATION) {
            let mut sql = String::from(
                "SELECT goos, goarch, synopsis, source FROM documentation WHERE unit_id = $1",
            );
            let mut args = vec![SqlValue::Int8(unit_id)];
            if let Some(ctx) = build_context {
                args.push(SqlValue::Text(ctx.goos.clone()));
                args.push(SqlValue::Text(ctx.goarch.clone()));
                sql.push_str(" AND goos = $2 AND goarch = $3");
            }
            sql.push_str(
                " ORDER BY CASE goos WHEN 'all' THEN 0 WHEN 'linux' THEN 1 \
                  WHEN 'windows' THEN 2 WHEN 'darwin' THEN 3 WHEN 'js' THEN 4 ELSE 5 END \
                  LIMIT 1",
            );
            if let Some(row) = self.db.query_opt(&sql, args).await? {
                unit.documentation = vec![Documentation {
                    goos: row.try_get("goos")?,
                    goarch: row.try_get("goarch")?,
                    synopsis: row.try_get("synopsis")?,
                    source: row.try_get("source")?,
                    api: Vec::new(),
                }];
            }
        }

        if fields.contains(FieldSet::IMPORTS) {
            self.db
                .run_query(
                    "SELECT to_path FROM imports WHERE unit_id = $1 ORDER BY to_path",
                    vec![SqlValue::Int8(unit_id)],
                    |row| {
                        unit.imports.push(row.try_get("to_path")?);
                        Ok(())
                    },
                )
                .await?;
        }

        if fields.contains(FieldSet::SUBDIRECTORIES) {
            self.db
                .run_query(
                    "SELECT path, name, synopsis, redistributable, license_types, license_paths \
                     FROM packages \
                     WHERE module_id = $1 AND (path = $2 OR path LIKE $2 || '/%') \
                     ORDER BY path",
                    vec![SqlValue::Int8(module_id), SqlValue::Text(meta.path.clone())],
                    |row| {
                        let types: Option<Vec<String>> = row.try_get("license_types")?;
                        let files: Option<Vec<String>> = row.try_get("license_paths")?;
                        unit.subdirectories.push(PackageMeta {
                            path: row.try_get("path")?,
                            name: row.try_get("name")?,
                            synopsis: row.try_get("synopsis")?,
                            is_redistributable: row.try_get("redistributable")?,
                            licenses: zip_license_metadata(
                                types.unwrap_or_default(),
                                files.unwrap_or_default(),
                            ),
                        });
                        Ok(())
                    },
                )
                .await?;
        }

        Ok(unit)
    }

    /// Versions known for a path: all tagged releases and prereleases
    /// when any exist, otherwise at most ten pseudo-versions.
    pub async fn get_versions_for_path(&self, path: &str) -> Result<Vec<ModuleVersionInfo>> {
        let mut tagged = Vec::new();
        let mut pseudo = Vec::new();
        self.db
            .run_query(
                "SELECT m.module_path, m.version, m.commit_time, m.redistributable, \
                        m.has_go_mod, m.version_type \
                 FROM paths p \
                 JOIN units u ON u.path_id = p.id \
                 JOIN modules m ON m.id = u.module_id \
                 WHERE p.path = $1 \
                 ORDER BY m.sort_version DESC, m.module_path DESC",
                vec![SqlValue::Text(path.to_string())],
                |row| {
                    let info = ModuleVersionInfo {
                        module_path: row.try_get("module_path")?,
                        version: row.try_get("version")?,
                        commit_time: row.try_get("commit_time")?,
                        is_redistributable: row.try_get("redistributable")?,
                        has_go_mod: row.try_get("has_go_mod")?,
                        version_type: row.try_get("version_type")?,
                    };
                    if info.version_type == "release" || info.version_type == "prerelease" {
                        tagged.push(info);
                    } else {
                        pseudo.push(info);
                    }
                    Ok(())
                },
            )
            .await?;
        if tagged.is_empty() {
            pseudo.truncate(10);
            return Ok(pseudo);
        }
        Ok(tagged)
    }

    /// The module path carrying the highest major version of a series.
    pub async fn get_latest_major_version(&self, series_path: &str) -> Result<String> {
        let mut module_paths = Vec::new();
        self.db
            .run_query(
                "SELECT DISTINCT module_path FROM modules WHERE series_path = $1",
                vec![SqlValue::Text(series_path.to_string())],
                |row| {
                    module_paths.push(row.try_get::<String, _>("module_path")?);
                    Ok(())
                },
            )
            .await?;
        module_paths
            .into_iter()
            .max_by_key(|p| {
                (
                    version::split_major_suffix(p).map_or(1, |(_, major)| major),
                    p.clone(),
                )
            })
            .ok_or_else(|| StoreError::NotFound(format!("series {series_path}")))
    }
}

/// Rebuilds license metadata from the parallel arrays on a row, grouping
/// repeated file paths back into one entry.
fn zip_license_metadata(types: Vec<String>, file_paths: Vec<String>) -> Vec<LicenseMeta> {
    let mut out: Vec<LicenseMeta> = Vec::new();
    for (t, file_path) in types.into_iter().zip(file_paths) {
        match out.iter_mut().find(|m| m.file_path == file_path) {
            Some(meta) => meta.types.push(t),
            None => out.push(LicenseMeta {
                types: vec![t],
                file_path,
            }),
        }
    }
    out
}

/// Applies the latest-cache constraints to an ordered candidate list.
fn pick_latest<'c>(
    candidates: &'c [LatestCandidate],
    latest: Option<&LatestModuleVersions>,
) -> Option<&'c LatestCandidate> {
    let Some(latest) = latest else {
        return candidates.first();
    };
    let filter_incompatible = latest.latest_is_compatible() && latest.latest_has_go_mod();
    let eligible: Vec<&LatestCandidate> = candidates
        .iter()
        .filter(|c| !(filter_incompatible && c.incompatible))
        .collect();
    let non_retracted: Vec<&LatestCandidate> = eligible
        .iter()
        .copied()
        .filter(|c| !latest.is_retracted(&c.version))
        .collect();
    // When every candidate is retracted, the latest is still served.
    non_retracted
        .first()
        .copied()
        .or_else(|| eligible.first().copied())
}
