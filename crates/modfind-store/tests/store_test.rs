//! Database-backed integration tests.
//!
//! These need a live Postgres and are ignored by default. Run them with:
//!
//! ```sh
//! MODFIND_TEST_DATABASE_URL=postgres://localhost/modfind_test \
//!     cargo test -p modfind-store -- --ignored --test-threads=1
//! ```
//!
//! Each test truncates the schema, so single-threaded execution is
//! required.

use chrono::{TimeZone, Utc};
use modfind_core::{
    Documentation, FieldSet, LatestModuleVersions, License, Module, Readme, Symbol, SymbolKind,
    Unit, VersionMapEntry,
};
use modfind_store::{Db, Store, StoreError};
use sqlx::Row;
use sqlx::postgres::PgPoolOptions;

async fn test_store() -> Store {
    let url = std::env::var("MODFIND_TEST_DATABASE_URL")
        .expect("MODFIND_TEST_DATABASE_URL must be set for integration tests");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect to test database");
    let db = Db::new(pool);
    db.migrate().await.expect("run migrations");
    sqlx::query(
        "TRUNCATE paths, modules, symbol_names, imports_unique, search_documents, \
         symbol_search_documents, version_map, latest_module_versions, \
         module_version_states, excluded_prefixes, experiments, \
         alternative_module_paths, package_symbols CASCADE",
    )
    .execute(db.pool())
    .await
    .expect("truncate test schema");
    Store::new(db)
}

fn package(module_path: &str, path: &str, name: &str) -> Unit {
    Unit {
        path: path.to_string(),
        module_path: module_path.to_string(),
        v1_path: path.to_string(),
        name: name.to_string(),
        is_redistributable: true,
        licenses: vec![],
        readme: None,
        documentation: vec![Documentation {
            goos: "linux".into(),
            goarch: "amd64".into(),
            synopsis: format!("Package {name} provides test fixtures."),
            source: vec![1, 2, 3],
            api: vec![],
        }],
        imports: vec![],
        subdirectories: vec![],
    }
}

fn module(module_path: &str, version: &str, packages: &[(&str, &str)]) -> Module {
    Module {
        module_path: module_path.to_string(),
        version: version.to_string(),
        commit_time: Utc.with_ymd_and_hms(2024, 4, 1, 12, 0, 0).unwrap(),
        source_info: None,
        is_redistributable: true,
        has_go_mod: true,
        retracted: false,
        units: packages
            .iter()
            .map(|(path, name)| package(module_path, path, name))
            .collect(),
        licenses: vec![License {
            file_path: "LICENSE".into(),
            types: vec!["MIT".into()],
            contents: b"MIT License".to_vec(),
            coverage: serde_json::Value::Null,
        }],
    }
}

async fn search_document_row(store: &Store, package_path: &str) -> Option<(String, String)> {
    sqlx::query(
        "SELECT module_path, version FROM search_documents WHERE package_path = $1",
    )
    .bind(package_path)
    .fetch_optional(store.db().pool())
    .await
    .unwrap()
    .map(|row| {
        (
            row.try_get::<String, _>("module_path").unwrap(),
            row.try_get::<String, _>("version").unwrap(),
        )
    })
}

#[tokio::test]
#[ignore]
async fn test_insert_module_projects_search_documents() {
    let store = test_store().await;
    let m = module("m.com", "v1.0.0", &[("m.com", "m"), ("m.com/a", "a"), ("m.com/a/c", "c")]);
    store.insert_module(&m, None).await.unwrap();

    for path in ["m.com", "m.com/a", "m.com/a/c"] {
        let row = search_document_row(&store, path).await;
        assert_eq!(row, Some(("m.com".to_string(), "v1.0.0".to_string())), "{path}");
    }
}

#[tokio::test]
#[ignore]
async fn test_insert_module_is_idempotent() {
    let store = test_store().await;
    let m = module("m.com", "v1.0.0", &[("m.com/a", "a")]);
    store.insert_module(&m, None).await.unwrap();

    let before: i64 = sqlx::query("SELECT COUNT(*) AS n FROM units")
        .fetch_one(store.db().pool())
        .await
        .unwrap()
        .try_get("n")
        .unwrap();

    store.insert_module(&m, None).await.unwrap();

    let after: i64 = sqlx::query("SELECT COUNT(*) AS n FROM units")
        .fetch_one(store.db().pool())
        .await
        .unwrap()
        .try_get("n")
        .unwrap();
    assert_eq!(before, after);

    let modules: i64 = sqlx::query(
        "SELECT COUNT(*) AS n FROM modules WHERE module_path = 'm.com' AND version = 'v1.0.0'",
    )
    .fetch_one(store.db().pool())
    .await
    .unwrap()
    .try_get("n")
    .unwrap();
    assert_eq!(modules, 1);
}

#[tokio::test]
#[ignore]
async fn test_hll_columns_survive_reingestion() {
    let store = test_store().await;
    let m = module("m.com", "v1.0.0", &[("m.com/a", "a")]);
    store.insert_module(&m, None).await.unwrap();

    let read_hll = || async {
        let row = sqlx::query(
            "SELECT hll_register, hll_leading_zeros FROM search_documents \
             WHERE package_path = 'm.com/a'",
        )
        .fetch_one(store.db().pool())
        .await
        .unwrap();
        (
            row.try_get::<i16, _>("hll_register").unwrap(),
            row.try_get::<i16, _>("hll_leading_zeros").unwrap(),
        )
    };
    let before = read_hll().await;

    let m2 = module("m.com", "v1.1.0", &[("m.com/a", "a")]);
    store.insert_module(&m2, None).await.unwrap();
    assert_eq!(before, read_hll().await);

    let (_, version) = search_document_row(&store, "m.com/a").await.unwrap();
    assert_eq!(version, "v1.1.0");
}

#[tokio::test]
#[ignore]
async fn test_longer_module_path_wins() {
    let store = test_store().await;
    store
        .insert_module(
            &module("m.com", "v1.1.0", &[("m.com/a/b", "b")]),
            None,
        )
        .await
        .unwrap();
    store
        .insert_module(
            &module("m.com/a", "v1.1.0", &[("m.com/a/b", "b")]),
            None,
        )
        .await
        .unwrap();

    let meta = store.get_unit_meta("m.com/a/b", "", "").await.unwrap();
    assert_eq!(meta.module_path, "m.com/a");

    // The search projection prefers the longer module path as well; the
    // shorter module cannot reclaim the row.
    store
        .insert_module(
            &module("m.com", "v1.2.0", &[("m.com/a/b", "b")]),
            None,
        )
        .await
        .unwrap();
    let (module_path, _) = search_document_row(&store, "m.com/a/b").await.unwrap();
    assert_eq!(module_path, "m.com/a");
}

#[tokio::test]
#[ignore]
async fn test_resolver_master_and_latest() {
    let store = test_store().await;
    store
        .insert_module(&module("m.com", "v1.0.0", &[("m.com", "m")]), None)
        .await
        .unwrap();
    store
        .insert_module(&module("m.com", "v1.2.0-pre", &[("m.com", "m")]), None)
        .await
        .unwrap();
    store
        .upsert_version_map(&VersionMapEntry {
            module_path: "m.com".into(),
            requested_version: "master".into(),
            resolved_version: Some("v1.2.0-pre".into()),
            status: 200,
            error: None,
            sort_version: None,
        })
        .await
        .unwrap();

    let master = store.get_unit_meta("m.com", "", "master").await.unwrap();
    assert_eq!(master.version, "v1.2.0-pre");

    // The release is preferred over the newer prerelease.
    let latest = store.get_unit_meta("m.com", "", "latest").await.unwrap();
    assert_eq!(latest.version, "v1.0.0");

    // Repeated calls with no intervening writes are stable.
    let again = store.get_unit_meta("m.com", "", "latest").await.unwrap();
    assert_eq!(again.version, latest.version);
}

#[tokio::test]
#[ignore]
async fn test_incompatible_filtered_by_latest_info() {
    let store = test_store().await;
    let mut incompatible = module("m.com", "v2.0.0+incompatible", &[("m.com/a", "a")]);
    incompatible.has_go_mod = false;
    store.insert_module(&incompatible, None).await.unwrap();
    store
        .insert_module(&module("m.com", "v1.2.0", &[("m.com/a", "a")]), None)
        .await
        .unwrap();
    store
        .upsert_latest_module_versions(&LatestModuleVersions {
            module_path: "m.com".into(),
            raw_version: "v1.2.0".into(),
            cooked_version: "v1.2.0".into(),
            good_version: "v1.2.0".into(),
            go_mod: Some("module m.com\n".into()),
        })
        .await
        .unwrap();

    let latest = store
        .get_latest_unit_version("m.com/a", Some("m.com"))
        .await
        .unwrap();
    assert_eq!(latest, "v1.2.0");
}

#[tokio::test]
#[ignore]
async fn test_get_unit_field_mask() {
    let store = test_store().await;
    let mut m = module("m.com", "v1.0.0", &[("m.com", "m"), ("m.com/a", "a")]);
    m.units[0].readme = Some(Readme {
        file_path: "README.md".into(),
        contents: "A test module. It exists for tests.".into(),
    });
    m.units[1].imports = vec!["fmt".into(), "net/http".into()];
    store.insert_module(&m, None).await.unwrap();

    let meta = store.get_unit_meta("m.com", "", "").await.unwrap();
    let unit = store
        .get_unit(&meta, FieldSet::README | FieldSet::SUBDIRECTORIES, None)
        .await
        .unwrap();
    assert!(unit.readme.is_some());
    assert_eq!(unit.subdirectories.len(), 2);
    assert!(unit.imports.is_empty());

    let meta_a = store.get_unit_meta("m.com/a", "", "").await.unwrap();
    let unit_a = store
        .get_unit(&meta_a, FieldSet::ALL, None)
        .await
        .unwrap();
    assert_eq!(unit_a.imports, vec!["fmt".to_string(), "net/http".to_string()]);
    assert_eq!(unit_a.documentation.len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_versions_for_path_prefers_tagged() {
    let store = test_store().await;
    store
        .insert_module(&module("m.com", "v1.0.0", &[("m.com/a", "a")]), None)
        .await
        .unwrap();
    store
        .insert_module(
            &module(
                "m.com",
                "v1.0.1-0.20240401120000-abcdefabcdef",
                &[("m.com/a", "a")],
            ),
            None,
        )
        .await
        .unwrap();

    let versions = store.get_versions_for_path("m.com/a").await.unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].version, "v1.0.0");
}

#[tokio::test]
#[ignore]
async fn test_imported_by_recompute() {
    let store = test_store().await;
    store
        .insert_module(&module("m.com", "v1.0.0", &[("m.com/a", "a")]), None)
        .await
        .unwrap();
    let mut importer = module("x.com", "v1.0.0", &[("x.com/b", "b")]);
    importer.units[0].imports = vec!["m.com/a".into(), "fmt".into()];
    store.insert_module(&importer, None).await.unwrap();

    let updated = store
        .update_search_documents_imported_by_count()
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let row = sqlx::query(
        "SELECT imported_by_count FROM search_documents WHERE package_path = 'm.com/a'",
    )
    .fetch_one(store.db().pool())
    .await
    .unwrap();
    assert_eq!(row.try_get::<i64, _>("imported_by_count").unwrap(), 1);

    // A second sweep with no changes touches nothing.
    let updated = store
        .update_search_documents_imported_by_count()
        .await
        .unwrap();
    assert_eq!(updated, 0);
}

#[tokio::test]
#[ignore]
async fn test_imports_unique_follows_latest() {
    let store = test_store().await;
    let mut v1 = module("m.com", "v1.0.0", &[("m.com/a", "a")]);
    v1.units[0].imports = vec!["old.com/dep".into()];
    store.insert_module(&v1, None).await.unwrap();

    let mut v2 = module("m.com", "v1.1.0", &[("m.com/a", "a")]);
    v2.units[0].imports = vec!["new.com/dep".into()];
    store.insert_module(&v2, None).await.unwrap();

    let rows = sqlx::query("SELECT to_path FROM imports_unique WHERE from_module_path = 'm.com'")
        .fetch_all(store.db().pool())
        .await
        .unwrap();
    let to_paths: Vec<String> = rows
        .iter()
        .map(|r| r.try_get::<String, _>("to_path").unwrap())
        .collect();
    assert_eq!(to_paths, vec!["new.com/dep".to_string()]);
}

#[tokio::test]
#[ignore]
async fn test_alternative_path_suppresses_projection() {
    let store = test_store().await;
    store
        .upsert_module_version_state("m.com", "v2.0.0", 491, None)
        .await
        .unwrap();

    store
        .insert_module(&module("m.com", "v1.0.0", &[("m.com/a", "a")]), None)
        .await
        .unwrap();
    assert!(search_document_row(&store, "m.com/a").await.is_none());
}

#[tokio::test]
#[ignore]
async fn test_symbol_documents_projected() {
    let store = test_store().await;
    let mut m = module("foo.com/foo", "v1.0.0", &[("foo.com/foo", "foo")]);
    m.units[0].documentation[0].api = vec![Symbol {
        name: "Type".into(),
        kind: SymbolKind::Type,
        synopsis: "type Type struct{}".into(),
        children: vec![Symbol {
            name: "Method".into(),
            kind: SymbolKind::Method,
            synopsis: "func (Type) Method()".into(),
            children: vec![],
        }],
    }];
    store.insert_module(&m, None).await.unwrap();

    let rows = sqlx::query(
        "SELECT symbol_name FROM symbol_search_documents ORDER BY symbol_name",
    )
    .fetch_all(store.db().pool())
    .await
    .unwrap();
    let names: Vec<String> = rows
        .iter()
        .map(|r| r.try_get::<String, _>("symbol_name").unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "Method".to_string(),
            "Type".to_string(),
            "Type.Method".to_string()
        ]
    );
}

#[tokio::test]
#[ignore]
async fn test_internal_packages_not_projected() {
    let store = test_store().await;
    store
        .insert_module(
            &module("m.com", "v1.0.0", &[("m.com/internal/x", "x"), ("m.com/a", "a")]),
            None,
        )
        .await
        .unwrap();
    assert!(search_document_row(&store, "m.com/internal/x").await.is_none());
    assert!(search_document_row(&store, "m.com/a").await.is_some());
}

#[tokio::test]
#[ignore]
async fn test_invalid_module_rejected_without_write() {
    let store = test_store().await;
    let mut m = module("m.com", "v1.0.0", &[("m.com/a", "a")]);
    m.units[0].documentation[0].source.clear();
    let err = store.insert_module(&m, None).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));

    let modules: i64 = sqlx::query("SELECT COUNT(*) AS n FROM modules")
        .fetch_one(store.db().pool())
        .await
        .unwrap()
        .try_get("n")
        .unwrap();
    assert_eq!(modules, 0);
}

#[tokio::test]
#[ignore]
async fn test_version_map_roundtrip() {
    let store = test_store().await;
    let entry = VersionMapEntry {
        module_path: "m.com".into(),
        requested_version: "master".into(),
        resolved_version: Some("v1.2.3".into()),
        status: 200,
        error: None,
        sort_version: None,
    };
    store.upsert_version_map(&entry).await.unwrap();
    let got = store.get_version_map("m.com", "master").await.unwrap();
    assert_eq!(got.resolved_version.as_deref(), Some("v1.2.3"));
    assert!(got.sort_version.is_some());
}

#[tokio::test]
#[ignore]
async fn test_excluded_prefixes_roundtrip() {
    let store = test_store().await;
    store.insert_excluded_prefix("bad.com/", "spam").await.unwrap();
    store.insert_excluded_prefix("abuse.io/", "abuse").await.unwrap();
    let got = store.get_excluded_prefixes().await.unwrap();
    assert_eq!(got, vec!["abuse.io/".to_string(), "bad.com/".to_string()]);
}

#[tokio::test]
#[ignore]
async fn test_latest_major_version() {
    let store = test_store().await;
    store
        .insert_module(&module("m.com", "v1.0.0", &[("m.com/a", "a")]), None)
        .await
        .unwrap();
    store
        .insert_module(&module("m.com/v2", "v2.0.0", &[("m.com/v2/a", "a")]), None)
        .await
        .unwrap();
    let got = store.get_latest_major_version("m.com").await.unwrap();
    assert_eq!(got, "m.com/v2");
}
