//! The module/unit data model shared by ingestion and query paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel version meaning "the best released version of this path".
pub const LATEST: &str = "latest";

/// Sentinel version resolved through the `version_map` table.
pub const MASTER: &str = "master";

/// Module path of the standard library pseudo-module.
pub const STDLIB_MODULE_PATH: &str = "std";

/// A (GOOS, GOARCH) pair a documentation variant was produced for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildContext {
    pub goos: String,
    pub goarch: String,
}

impl BuildContext {
    /// Fixed selection order when a package has documentation for several
    /// build contexts: all > linux > windows > darwin > js > other.
    pub const PRIORITY: [(&'static str, &'static str); 5] = [
        ("all", "all"),
        ("linux", "amd64"),
        ("windows", "amd64"),
        ("darwin", "amd64"),
        ("js", "wasm"),
    ];

    pub fn new(goos: impl Into<String>, goarch: impl Into<String>) -> Self {
        Self {
            goos: goos.into(),
            goarch: goarch.into(),
        }
    }

    /// Rank in the fixed GOOS priority order; unknown contexts sort last.
    pub fn priority(&self) -> usize {
        Self::PRIORITY
            .iter()
            .position(|(goos, _)| *goos == self.goos)
            .unwrap_or(Self::PRIORITY.len())
    }
}

/// A versioned module as produced by the fetch/ETL pipeline.
///
/// Modules are immutable once ingested: a new version is a new record and
/// re-ingesting the same version is a delete-then-insert.
#[derive(Debug, Clone)]
pub struct Module {
    pub module_path: String,
    pub version: String,
    pub commit_time: DateTime<Utc>,
    /// Opaque provenance blob recorded as-is.
    pub source_info: Option<serde_json::Value>,
    pub is_redistributable: bool,
    pub has_go_mod: bool,
    pub retracted: bool,
    pub units: Vec<Unit>,
    pub licenses: Vec<License>,
}

impl Module {
    /// The module path with any `/vN` suffix stripped; identifies the
    /// "same library" across major versions.
    pub fn series_path(&self) -> String {
        crate::version::series_path(&self.module_path)
    }
}

/// A node in the module's path tree; a package when `name` is non-empty,
/// otherwise a plain directory.
#[derive(Debug, Clone, Default)]
pub struct Unit {
    pub path: String,
    pub module_path: String,
    pub v1_path: String,
    pub name: String,
    pub is_redistributable: bool,
    pub licenses: Vec<LicenseMeta>,
    pub readme: Option<Readme>,
    pub documentation: Vec<Documentation>,
    pub imports: Vec<String>,
    pub subdirectories: Vec<PackageMeta>,
}

impl Unit {
    /// Whether this unit is a buildable package rather than a directory.
    pub fn is_package(&self) -> bool {
        !self.name.is_empty()
    }

    /// Command packages are installed, not imported; they never appear in
    /// search projections.
    pub fn is_command(&self) -> bool {
        self.name == "main"
    }
}

#[derive(Debug, Clone, Default)]
pub struct Readme {
    pub file_path: String,
    pub contents: String,
}

/// One rendered documentation variant of a package.
#[derive(Debug, Clone, Default)]
pub struct Documentation {
    pub goos: String,
    pub goarch: String,
    pub synopsis: String,
    /// Encoded documentation AST; required non-empty for every package.
    pub source: Vec<u8>,
    /// Exported API of the package in this build context.
    pub api: Vec<Symbol>,
}

impl Documentation {
    pub fn build_context(&self) -> BuildContext {
        BuildContext::new(self.goos.clone(), self.goarch.clone())
    }
}

/// An exported identifier together with its children (methods, fields).
///
/// Children carry their bare member names; ingestion derives the
/// qualified `Type.Member` forms so symbol search can answer both
/// `package.Member` and `package.Type.Member` queries.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub synopsis: String,
    pub children: Vec<Symbol>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Constant,
    Variable,
    Function,
    Type,
    Method,
    Field,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Constant => "Constant",
            Self::Variable => "Variable",
            Self::Function => "Function",
            Self::Type => "Type",
            Self::Method => "Method",
            Self::Field => "Field",
        }
    }
}

/// A license file found in the module zip.
#[derive(Debug, Clone)]
pub struct License {
    pub file_path: String,
    pub types: Vec<String>,
    pub contents: Vec<u8>,
    pub coverage: serde_json::Value,
}

/// License metadata kept even for non-redistributable content; only
/// contents are gated by the license policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseMeta {
    pub types: Vec<String>,
    pub file_path: String,
}

/// Lightweight package listing used for subdirectory tables.
#[derive(Debug, Clone)]
pub struct PackageMeta {
    pub path: String,
    pub name: String,
    pub synopsis: String,
    pub is_redistributable: bool,
    pub licenses: Vec<LicenseMeta>,
}

/// The resolved owner of a path: which module-version serves it.
#[derive(Debug, Clone)]
pub struct UnitMeta {
    pub path: String,
    pub name: String,
    pub is_redistributable: bool,
    pub licenses: Vec<LicenseMeta>,
    pub module_path: String,
    pub version: String,
    pub commit_time: DateTime<Utc>,
    pub module_redistributable: bool,
    pub has_go_mod: bool,
}

/// Cached resolution of a client-supplied version string to a stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMapEntry {
    pub module_path: String,
    pub requested_version: String,
    pub resolved_version: Option<String>,
    pub status: i32,
    pub error: Option<String>,
    pub sort_version: Option<String>,
}

/// Per-module-path latest-version bookkeeping.
///
/// `raw` is the highest version seen, `cooked` additionally honors
/// retractions, `good` is the latest version that fully processed. The
/// go.mod text of the raw latest carries the retraction directives.
#[derive(Debug, Clone, Default)]
pub struct LatestModuleVersions {
    pub module_path: String,
    pub raw_version: String,
    pub cooked_version: String,
    pub good_version: String,
    pub go_mod: Option<String>,
}

impl LatestModuleVersions {
    /// Whether the cooked latest is a compatible (non-`+incompatible`)
    /// version. When true, incompatible candidates are filtered out of
    /// latest-version resolution.
    pub fn latest_is_compatible(&self) -> bool {
        !self.cooked_version.is_empty() && !crate::version::is_incompatible(&self.cooked_version)
    }

    /// Whether the latest raw version declares a go.mod file. Modules
    /// without one may still serve `+incompatible` versions.
    pub fn latest_has_go_mod(&self) -> bool {
        self.go_mod.is_some()
    }

    /// Version ranges retracted by the go.mod of the raw latest.
    pub fn retractions(&self) -> Vec<(String, String)> {
        self.go_mod.as_deref().map_or_else(Vec::new, parse_retractions)
    }

    /// Whether `version` falls in a retracted range.
    pub fn is_retracted(&self, version: &str) -> bool {
        self.retractions().iter().any(|(lo, hi)| {
            crate::version::compare(version, lo) != std::cmp::Ordering::Less
                && crate::version::compare(version, hi) != std::cmp::Ordering::Greater
        })
    }
}

/// Parses `retract` directives out of go.mod text.
///
/// Handles single versions, `[lo, hi]` intervals, and parenthesized
/// blocks. Comments after the directive are ignored.
fn parse_retractions(go_mod: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut in_block = false;
    for line in go_mod.lines() {
        let line = line.split("//").next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        if in_block {
            if line == ")" {
                in_block = false;
            } else {
                push_retraction(line, &mut out);
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("retract") {
            let rest = rest.trim();
            if rest == "(" {
                in_block = true;
            } else {
                push_retraction(rest, &mut out);
            }
        }
    }
    out
}

fn push_retraction(spec: &str, out: &mut Vec<(String, String)>) {
    let spec = spec.trim();
    if let Some(interval) = spec.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        let mut parts = interval.splitn(2, ',');
        if let (Some(lo), Some(hi)) = (parts.next(), parts.next()) {
            out.push((lo.trim().to_string(), hi.trim().to_string()));
        }
    } else if !spec.is_empty() {
        out.push((spec.to_string(), spec.to_string()));
    }
}

/// Field mask controlling how much of a unit `get_unit` hydrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSet(pub u32);

impl FieldSet {
    pub const README: Self = Self(1);
    pub const DOCUMENTATION: Self = Self(1 << 1);
    pub const IMPORTS: Self = Self(1 << 2);
    pub const SUBDIRECTORIES: Self = Self(1 << 3);
    pub const ALL: Self = Self(u32::MAX);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for FieldSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}
