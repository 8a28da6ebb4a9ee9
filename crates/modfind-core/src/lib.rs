//! Domain types and pure logic for the modfind indexing core.
//!
//! This crate holds everything that does not touch the database: the
//! module/unit data model produced by the fetch pipeline, Go-flavoured
//! semver handling (pseudo-versions, `+incompatible`, sortable encodings),
//! module path checks, the text preprocessors feeding the weighted
//! full-text vector, symbol-query classification, and the HyperLogLog
//! primitives used for approximate result counting.

pub mod error;
pub mod hll;
pub mod paths;
pub mod sections;
pub mod symbolquery;
pub mod tokens;
pub mod types;
pub mod version;

pub use error::{CoreError, Result};
pub use sections::{MAX_SECTION_WORDS, SearchSections, search_sections};
pub use symbolquery::{SymbolCandidate, SymbolQuery, expand_multi_word};
pub use tokens::generate_path_tokens;
pub use types::{
    BuildContext, Documentation, FieldSet, LatestModuleVersions, License, LicenseMeta, Module,
    PackageMeta, Readme, Symbol, SymbolKind, Unit, UnitMeta, VersionMapEntry,
};
pub use version::VersionType;
