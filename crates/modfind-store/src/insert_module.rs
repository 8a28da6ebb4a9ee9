//! Module ingestion: validation, scrubbing and the single-transaction
//! write into the normalised tables, followed by the search projections.

use crate::db::{Isolation, SqlValue, bulk_insert};
use crate::error::{Result, StoreError};
use crate::search_documents::SearchDocumentArgs;
use crate::Store;
use modfind_core::{paths, version, LatestModuleVersions, Module, Symbol, Unit};
use sqlx::{Postgres, Row, Transaction};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, info};

/// Deadline for a whole module write, projections included.
const UPSERT_TIMEOUT: Duration = Duration::from_secs(300);

/// Derived module-row columns computed once up front.
struct Derived {
    series_path: String,
    incompatible: bool,
    version_type: &'static str,
    sort_version: String,
}

/// Per-package data the projections need after the transaction commits.
struct PackageProjection {
    path: String,
    synopsis: String,
    readme_path: Option<String>,
    readme_contents: Option<String>,
}

impl Store {
    /// Validates and writes a module, its units, licenses and imports,
    /// then refreshes the search projections for its packages.
    ///
    /// The write is atomic: any pre-existing `(module_path, version)`
    /// row is deleted (cascading to child rows) and re-inserted in one
    /// transaction, so re-ingesting a version is idempotent. Rows are
    /// bulk-inserted sorted by `(path, file_path)` to fix lock order
    /// across concurrent ingestions.
    pub async fn insert_module(
        &self,
        module: &Module,
        latest: Option<&LatestModuleVersions>,
    ) -> Result<i64> {
        tokio::time::timeout(UPSERT_TIMEOUT, self.insert_module_inner(module, latest))
            .await
            .map_err(|_| StoreError::Cancelled)?
    }

    async fn insert_module_inner(
        &self,
        module: &Module,
        latest: Option<&LatestModuleVersions>,
    ) -> Result<i64> {
        validate_module(module)?;

        let mut m = module.clone();
        scrub_module(&mut m);
        sort_module(&mut m);

        if let Some(latest) = latest {
            self.upsert_latest_module_versions(latest).await?;
        }

        let derived = Derived {
            series_path: m.series_path(),
            incompatible: version::is_incompatible(&m.version),
            version_type: version::VersionType::of(&m.version).as_str(),
            sort_version: version::for_sorting(&m.version),
        };
        let projections = collect_projections(&m);
        let module_path = m.module_path.clone();
        let module_version = m.version.clone();
        let sort_version = derived.sort_version.clone();

        let module_id = self
            .db
            .transact(Isolation::ReadCommitted, move |tx| {
                Box::pin(async move { write_module(tx, &m, &derived).await })
            })
            .await
            .map_err(|e| e.in_context("insert module"))?;

        info!(
            module_path = %module_path,
            version = %module_version,
            module_id,
            "inserted module"
        );

        // A strictly-newer version of this path may already be known to
        // live at an alternative of a canonical module path; its search
        // presence would only shadow the canonical one.
        if self
            .has_newer_alternative(&module_path, &sort_version)
            .await?
        {
            info!(
                module_path = %module_path,
                version = %module_version,
                "skipping search projection: newer alternative-path version recorded"
            );
            return Ok(module_id);
        }

        for projection in projections {
            self.upsert_search_document(SearchDocumentArgs {
                package_path: projection.path,
                module_path: module_path.clone(),
                version: module_version.clone(),
                synopsis: projection.synopsis,
                readme_path: projection.readme_path,
                readme_contents: projection.readme_contents,
            })
            .await?;
        }
        self.upsert_symbol_search_documents(&module_path, &module_version)
            .await?;
        Ok(module_id)
    }

    async fn has_newer_alternative(&self, module_path: &str, sort_version: &str) -> Result<bool> {
        let row = self
            .db
            .query_opt(
                "SELECT 1 FROM module_version_states \
                 WHERE module_path = $1 AND status = $2 AND sort_version > $3 LIMIT 1",
                vec![
                    SqlValue::Text(module_path.to_string()),
                    SqlValue::Int4(self.alternative_status),
                    SqlValue::Text(sort_version.to_string()),
                ],
            )
            .await?;
        Ok(row.is_some())
    }
}

fn validate_module(module: &Module) -> Result<()> {
    let invalid = |message: String| {
        StoreError::InvalidArgument(format!(
            "module {}@{}: {message}",
            module.module_path, module.version
        ))
    };

    paths::check_module_path(&module.module_path)
        .map_err(|e| StoreError::InvalidArgument(e.to_string()))?;
    if module.module_path != modfind_core::types::STDLIB_MODULE_PATH
        && !version::is_valid(&module.version)
    {
        return Err(invalid("version is not canonical semver".into()));
    }
    if module.commit_time.timestamp() == 0 {
        return Err(invalid("commit time is zero-valued".into()));
    }
    if module.units.is_empty() {
        return Err(invalid("no units".into()));
    }
    for unit in &module.units {
        if let Some(readme) = &unit.readme {
            // TEXT columns cannot hold NUL; String already guarantees
            // well-formed UTF-8.
            if readme.contents.contains('\u{0}') {
                return Err(invalid(format!("readme for {} contains NUL", unit.path)));
            }
        }
        if unit.is_package() {
            if unit.documentation.is_empty() {
                return Err(invalid(format!("package {} has no documentation", unit.path)));
            }
            for doc in &unit.documentation {
                if doc.source.is_empty() {
                    return Err(invalid(format!(
                        "package {} is missing documentation source for {}/{}",
                        unit.path, doc.goos, doc.goarch
                    )));
                }
            }
        }
    }
    for license in &module.licenses {
        if std::str::from_utf8(&license.contents).is_err() {
            return Err(invalid(format!(
                "license {} contains invalid UTF-8",
                license.file_path
            )));
        }
    }
    Ok(())
}

/// Clears content that must not be served. License types and file paths
/// are retained; only contents are gated.
fn scrub_module(m: &mut Module) {
    for unit in &mut m.units {
        if !unit.is_redistributable {
            for doc in &mut unit.documentation {
                doc.synopsis.clear();
            }
        }
    }
    if !m.is_redistributable {
        for unit in &mut m.units {
            unit.readme = None;
        }
    }
}

/// Fixes row order for every bulk insert in the transaction.
fn sort_module(m: &mut Module) {
    m.units.sort_by(|a, b| a.path.cmp(&b.path));
    m.licenses.sort_by(|a, b| a.file_path.cmp(&b.file_path));
    for unit in &mut m.units {
        unit.documentation
            .sort_by(|a, b| (&a.goos, &a.goarch).cmp(&(&b.goos, &b.goarch)));
        unit.imports.sort();
        unit.imports.dedup();
    }
}

fn collect_projections(m: &Module) -> Vec<PackageProjection> {
    m.units
        .iter()
        .filter(|u| u.is_package() && !u.is_command() && !paths::has_internal_segment(&u.path))
        .map(|u| PackageProjection {
            path: u.path.clone(),
            synopsis: best_synopsis(u),
            readme_path: u.readme.as_ref().map(|r| r.file_path.clone()),
            readme_contents: u.readme.as_ref().map(|r| r.contents.clone()),
        })
        .collect()
}

/// The synopsis of the highest-priority build context.
fn best_synopsis(unit: &Unit) -> String {
    unit.documentation
        .iter()
        .min_by_key(|d| d.build_context().priority())
        .map(|d| d.synopsis.clone())
        .unwrap_or_default()
}

async fn write_module(
    tx: &mut Transaction<'static, Postgres>,
    m: &Module,
    derived: &Derived,
) -> Result<i64> {
    // Delete-then-insert keeps re-ingestion idempotent; child rows go
    // with the module via ON DELETE CASCADE.
    sqlx::query("DELETE FROM modules WHERE module_path = $1 AND version = $2")
        .bind(&m.module_path)
        .bind(&m.version)
        .execute(&mut **tx)
        .await?;

    let module_id = insert_module_row(tx, m, derived).await?;
    let path_ids = insert_paths(tx, m).await?;
    let unit_ids = insert_units(tx, module_id, m, &path_ids).await?;
    insert_readmes(tx, m, &unit_ids).await?;
    insert_documentation(tx, m, &unit_ids).await?;
    insert_symbols(tx, m, &path_ids, &unit_ids).await?;
    insert_packages(tx, module_id, m).await?;
    insert_licenses(tx, module_id, m).await?;
    insert_imports(tx, m, &unit_ids).await?;
    maybe_rewrite_imports_unique(tx, m).await?;
    Ok(module_id)
}

async fn insert_module_row(
    tx: &mut Transaction<'static, Postgres>,
    m: &Module,
    derived: &Derived,
) -> Result<i64> {
    let row = sqlx::query(
        "INSERT INTO modules (module_path, version, commit_time, series_path, incompatible, \
         version_type, sort_version, source_info, redistributable, has_go_mod, retracted) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING id",
    )
    .bind(&m.module_path)
    .bind(&m.version)
    .bind(m.commit_time)
    .bind(&derived.series_path)
    .bind(derived.incompatible)
    .bind(derived.version_type)
    .bind(&derived.sort_version)
    .bind(&m.source_info)
    .bind(m.is_redistributable)
    .bind(m.has_go_mod)
    .bind(m.retracted)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.try_get("id")?)
}

async fn insert_paths(
    tx: &mut Transaction<'static, Postgres>,
    m: &Module,
) -> Result<HashMap<String, i64>> {
    let mut wanted: BTreeSet<String> = BTreeSet::new();
    wanted.insert(m.module_path.clone());
    for unit in &m.units {
        wanted.insert(unit.path.clone());
        if !unit.v1_path.is_empty() {
            wanted.insert(unit.v1_path.clone());
        }
    }
    let rows: Vec<Vec<SqlValue>> = wanted
        .iter()
        .map(|p| vec![SqlValue::Text(p.clone())])
        .collect();
    bulk_insert(&mut **tx, "paths", &["path"], rows, "ON CONFLICT DO NOTHING").await?;

    let wanted: Vec<String> = wanted.into_iter().collect();
    let fetched = sqlx::query("SELECT id, path FROM paths WHERE path = ANY($1)")
        .bind(&wanted)
        .fetch_all(&mut **tx)
        .await?;
    let mut ids = HashMap::with_capacity(fetched.len());
    for row in fetched {
        ids.insert(row.try_get::<String, _>("path")?, row.try_get::<i64, _>("id")?);
    }
    Ok(ids)
}

fn path_id(path_ids: &HashMap<String, i64>, path: &str) -> Result<i64> {
    path_ids
        .get(path)
        .copied()
        .ok_or_else(|| StoreError::Conflict(format!("path {path} vanished during insert")))
}

/// Flattens per-license type lists into the parallel arrays stored on
/// units and packages.
fn license_arrays(unit: &Unit) -> (Vec<String>, Vec<String>) {
    let mut types = Vec::new();
    let mut file_paths = Vec::new();
    for meta in &unit.licenses {
        for t in &meta.types {
            types.push(t.clone());
            file_paths.push(meta.file_path.clone());
        }
    }
    (types, file_paths)
}

async fn insert_units(
    tx: &mut Transaction<'static, Postgres>,
    module_id: i64,
    m: &Module,
    path_ids: &HashMap<String, i64>,
) -> Result<HashMap<String, i64>> {
    let mut rows = Vec::with_capacity(m.units.len());
    for unit in &m.units {
        let (types, files) = license_arrays(unit);
        let v1path_id = if unit.v1_path.is_empty() {
            SqlValue::NullableInt8(None)
        } else {
            SqlValue::NullableInt8(Some(path_id(path_ids, &unit.v1_path)?))
        };
        rows.push(vec![
            SqlValue::Int8(path_id(path_ids, &unit.path)?),
            SqlValue::Int8(module_id),
            v1path_id,
            SqlValue::Text(unit.name.clone()),
            SqlValue::Bool(unit.is_redistributable),
            SqlValue::TextArray(types),
            SqlValue::TextArray(files),
        ]);
    }
    bulk_insert(
        &mut **tx,
        "units",
        &[
            "path_id",
            "module_id",
            "v1path_id",
            "name",
            "redistributable",
            "license_types",
            "license_paths",
        ],
        rows,
        "ON CONFLICT DO NOTHING",
    )
    .await?;

    let fetched = sqlx::query(
        "SELECT u.id, p.path FROM units u JOIN paths p ON p.id = u.path_id WHERE u.module_id = $1",
    )
    .bind(module_id)
    .fetch_all(&mut **tx)
    .await?;
    let mut ids = HashMap::with_capacity(fetched.len());
    for row in fetched {
        ids.insert(row.try_get::<String, _>("path")?, row.try_get::<i64, _>("id")?);
    }
    Ok(ids)
}

fn unit_id(unit_ids: &HashMap<String, i64>, path: &str) -> Result<i64> {
    unit_ids
        .get(path)
        .copied()
        .ok_or_else(|| StoreError::Conflict(format!("unit {path} vanished during insert")))
}

async fn insert_readmes(
    tx: &mut Transaction<'static, Postgres>,
    m: &Module,
    unit_ids: &HashMap<String, i64>,
) -> Result<()> {
    let mut rows = Vec::new();
    for unit in &m.units {
        if let Some(readme) = &unit.readme {
            rows.push(vec![
                SqlValue::Int8(unit_id(unit_ids, &unit.path)?),
                SqlValue::Text(readme.file_path.clone()),
                SqlValue::Text(readme.contents.clone()),
            ]);
        }
    }
    bulk_insert(
        &mut **tx,
        "readmes",
        &["unit_id", "file_path", "contents"],
        rows,
        "ON CONFLICT DO NOTHING",
    )
    .await?;
    Ok(())
}

async fn insert_documentation(
    tx: &mut Transaction<'static, Postgres>,
    m: &Module,
    unit_ids: &HashMap<String, i64>,
) -> Result<()> {
    let mut rows = Vec::new();
    for unit in &m.units {
        for doc in &unit.documentation {
            rows.push(vec![
                SqlValue::Int8(unit_id(unit_ids, &unit.path)?),
                SqlValue::Text(doc.goos.clone()),
                SqlValue::Text(doc.goarch.clone()),
                SqlValue::Text(doc.synopsis.clone()),
                SqlValue::Bytea(doc.source.clone()),
            ]);
        }
    }
    bulk_insert(
        &mut **tx,
        "documentation",
        &["unit_id", "goos", "goarch", "synopsis", "source"],
        rows,
        "ON CONFLICT DO NOTHING",
    )
    .await?;
    Ok(())
}

/// Flattens a symbol tree into (name, parent) entries. A child lands
/// twice: once under its bare member name and once under the qualified
/// `Parent.Member` form, so both query shapes can hit it.
fn flatten_symbols<'s>(
    symbols: &'s [Symbol],
    parent: Option<&'s str>,
    out: &mut Vec<(String, Option<&'s str>, &'s Symbol)>,
) {
    for symbol in symbols {
        out.push((symbol.name.clone(), parent, symbol));
        if let Some(parent) = parent {
            out.push((format!("{parent}.{}", symbol.name), Some(parent), symbol));
        }
        flatten_symbols(&symbol.children, Some(symbol.name.as_str()), out);
    }
}

async fn insert_symbols(
    tx: &mut Transaction<'static, Postgres>,
    m: &Module,
    path_ids: &HashMap<String, i64>,
    unit_ids: &HashMap<String, i64>,
) -> Result<()> {
    // Collect every distinct symbol name in the module.
    let mut names: BTreeSet<String> = BTreeSet::new();
    for unit in &m.units {
        for doc in &unit.documentation {
            let mut flat = Vec::new();
            flatten_symbols(&doc.api, None, &mut flat);
            for (name, parent, _) in flat {
                names.insert(name);
                if let Some(parent) = parent {
                    names.insert(parent.to_string());
                }
            }
        }
    }
    if names.is_empty() {
        return Ok(());
    }

    let name_rows: Vec<Vec<SqlValue>> = names
        .iter()
        .map(|n| vec![SqlValue::Text(n.clone())])
        .collect();
    bulk_insert(
        &mut **tx,
        "symbol_names",
        &["name"],
        name_rows,
        "ON CONFLICT DO NOTHING",
    )
    .await?;

    let wanted: Vec<String> = names.iter().cloned().collect();
    let fetched = sqlx::query("SELECT id, name FROM symbol_names WHERE name = ANY($1)")
        .bind(&wanted)
        .fetch_all(&mut **tx)
        .await?;
    let mut name_ids: HashMap<String, i64> = HashMap::with_capacity(fetched.len());
    for row in fetched {
        name_ids.insert(row.try_get::<String, _>("name")?, row.try_get::<i64, _>("id")?);
    }
    let name_id = |name: &str| -> Result<i64> {
        name_ids
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::Conflict(format!("symbol name {name} vanished")))
    };

    let module_path_id = path_id(path_ids, &m.module_path)?;

    // package_symbols, deduped per (package, symbol name).
    let mut package_symbol_rows: BTreeMap<(i64, i64), Vec<SqlValue>> = BTreeMap::new();
    for unit in &m.units {
        if !unit.is_package() {
            continue;
        }
        let pkg_path_id = path_id(path_ids, &unit.path)?;
        for doc in &unit.documentation {
            let mut flat = Vec::new();
            flatten_symbols(&doc.api, None, &mut flat);
            for (name, parent, symbol) in flat {
                let sym_name_id = name_id(&name)?;
                let parent_id = match parent {
                    Some(p) => SqlValue::NullableInt8(Some(name_id(p)?)),
                    None => SqlValue::NullableInt8(None),
                };
                package_symbol_rows
                    .entry((pkg_path_id, sym_name_id))
                    .or_insert_with(|| {
                        vec![
                            SqlValue::Int8(pkg_path_id),
                            SqlValue::Int8(module_path_id),
                            SqlValue::Int8(sym_name_id),
                            parent_id,
                            SqlValue::Text(symbol.kind.as_str().to_string()),
                            SqlValue::Text(symbol.synopsis.clone()),
                        ]
                    });
            }
        }
    }
    bulk_insert(
        &mut **tx,
        "package_symbols",
        &[
            "package_path_id",
            "module_path_id",
            "symbol_name_id",
            "parent_symbol_name_id",
            "kind",
            "synopsis",
        ],
        package_symbol_rows.into_values().collect(),
        "ON CONFLICT DO NOTHING",
    )
    .await?;

    let fetched = sqlx::query(
        "SELECT id, package_path_id, symbol_name_id FROM package_symbols \
         WHERE module_path_id = $1",
    )
    .bind(module_path_id)
    .fetch_all(&mut **tx)
    .await?;
    let mut package_symbol_ids: HashMap<(i64, i64), i64> = HashMap::with_capacity(fetched.len());
    for row in fetched {
        package_symbol_ids.insert(
            (
                row.try_get::<i64, _>("package_path_id")?,
                row.try_get::<i64, _>("symbol_name_id")?,
            ),
            row.try_get::<i64, _>("id")?,
        );
    }

    // documentation ids for this module's units.
    let ids: Vec<i64> = m
        .units
        .iter()
        .map(|u| unit_id(unit_ids, &u.path))
        .collect::<Result<_>>()?;
    let fetched = sqlx::query(
        "SELECT id, unit_id, goos, goarch FROM documentation WHERE unit_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(&mut **tx)
    .await?;
    let mut doc_ids: HashMap<(i64, String, String), i64> = HashMap::with_capacity(fetched.len());
    for row in fetched {
        doc_ids.insert(
            (
                row.try_get::<i64, _>("unit_id")?,
                row.try_get::<String, _>("goos")?,
                row.try_get::<String, _>("goarch")?,
            ),
            row.try_get::<i64, _>("id")?,
        );
    }

    let mut doc_symbol_rows: BTreeSet<(i64, i64)> = BTreeSet::new();
    for unit in &m.units {
        if !unit.is_package() {
            continue;
        }
        let pkg_path_id = path_id(path_ids, &unit.path)?;
        let uid = unit_id(unit_ids, &unit.path)?;
        for doc in &unit.documentation {
            let Some(&doc_id) = doc_ids.get(&(uid, doc.goos.clone(), doc.goarch.clone())) else {
                continue;
            };
            let mut flat = Vec::new();
            flatten_symbols(&doc.api, None, &mut flat);
            for (name, _, _) in flat {
                if let Some(&ps_id) = package_symbol_ids.get(&(pkg_path_id, name_id(&name)?)) {
                    doc_symbol_rows.insert((doc_id, ps_id));
                }
            }
        }
    }
    bulk_insert(
        &mut **tx,
        "documentation_symbols",
        &["documentation_id", "package_symbol_id"],
        doc_symbol_rows
            .into_iter()
            .map(|(doc_id, ps_id)| vec![SqlValue::Int8(doc_id), SqlValue::Int8(ps_id)])
            .collect(),
        "ON CONFLICT DO NOTHING",
    )
    .await?;
    Ok(())
}

async fn insert_packages(
    tx: &mut Transaction<'static, Postgres>,
    module_id: i64,
    m: &Module,
) -> Result<()> {
    let mut rows = Vec::new();
    for unit in &m.units {
        if !unit.is_package() {
            continue;
        }
        let (types, files) = license_arrays(unit);
        rows.push(vec![
            SqlValue::Text(unit.path.clone()),
            SqlValue::Int8(module_id),
            SqlValue::Text(unit.name.clone()),
            SqlValue::Text(best_synopsis(unit)),
            SqlValue::Text(unit.v1_path.clone()),
            SqlValue::Bool(unit.is_redistributable),
            SqlValue::TextArray(types),
            SqlValue::TextArray(files),
        ]);
    }
    bulk_insert(
        &mut **tx,
        "packages",
        &[
            "path",
            "module_id",
            "name",
            "synopsis",
            "v1_path",
            "redistributable",
            "license_types",
            "license_paths",
        ],
        rows,
        "ON CONFLICT DO NOTHING",
    )
    .await?;
    Ok(())
}

async fn insert_licenses(
    tx: &mut Transaction<'static, Postgres>,
    module_id: i64,
    m: &Module,
) -> Result<()> {
    let rows: Vec<Vec<SqlValue>> = m
        .licenses
        .iter()
        .map(|license| {
            vec![
                SqlValue::Int8(module_id),
                SqlValue::Text(license.file_path.clone()),
                SqlValue::TextArray(license.types.clone()),
                SqlValue::Bytea(license.contents.clone()),
                SqlValue::Jsonb(license.coverage.clone()),
            ]
        })
        .collect();
    bulk_insert(
        &mut **tx,
        "licenses",
        &["module_id", "file_path", "types", "contents", "coverage"],
        rows,
        "ON CONFLICT DO NOTHING",
    )
    .await?;
    Ok(())
}

async fn insert_imports(
    tx: &mut Transaction<'static, Postgres>,
    m: &Module,
    unit_ids: &HashMap<String, i64>,
) -> Result<()> {
    let mut rows = Vec::new();
    for unit in &m.units {
        if !unit.is_package() {
            continue;
        }
        let uid = unit_id(unit_ids, &unit.path)?;
        for to_path in &unit.imports {
            rows.push(vec![SqlValue::Int8(uid), SqlValue::Text(to_path.clone())]);
        }
    }
    bulk_insert(
        &mut **tx,
        "imports",
        &["unit_id", "to_path"],
        rows,
        "ON CONFLICT DO NOTHING",
    )
    .await?;
    Ok(())
}

/// Rewrites `imports_unique` for this module path, but only when the
/// version being inserted is the path's latest. The delete and the
/// re-insert happen in the surrounding transaction.
async fn maybe_rewrite_imports_unique(
    tx: &mut Transaction<'static, Postgres>,
    m: &Module,
) -> Result<()> {
    let row = sqlx::query(
        "SELECT version FROM modules WHERE module_path = $1 \
         ORDER BY incompatible ASC, \
                  CASE version_type WHEN 'release' THEN 0 WHEN 'prerelease' THEN 1 ELSE 2 END ASC, \
                  sort_version DESC \
         LIMIT 1",
    )
    .bind(&m.module_path)
    .fetch_one(&mut **tx)
    .await?;
    let latest: String = row.try_get("version")?;
    if latest != m.version {
        debug!(
            module_path = %m.module_path,
            version = %m.version,
            latest = %latest,
            "not latest; leaving imports_unique untouched"
        );
        return Ok(());
    }

    sqlx::query("DELETE FROM imports_unique WHERE from_module_path = $1")
        .bind(&m.module_path)
        .execute(&mut **tx)
        .await?;

    let mut rows = Vec::new();
    for unit in &m.units {
        if !unit.is_package() {
            continue;
        }
        for to_path in &unit.imports {
            rows.push(vec![
                SqlValue::Text(unit.path.clone()),
                SqlValue::Text(m.module_path.clone()),
                SqlValue::Text(to_path.clone()),
            ]);
        }
    }
    bulk_insert(
        &mut **tx,
        "imports_unique",
        &["from_path", "from_module_path", "to_path"],
        rows,
        "ON CONFLICT DO NOTHING",
    )
    .await?;
    Ok(())
}
