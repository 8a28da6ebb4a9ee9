//! Module and package path checks.

use crate::error::{CoreError, Result};
use crate::types::STDLIB_MODULE_PATH;

/// Maximum allowed module path length to prevent pathological inputs.
const MAX_MODULE_PATH_LENGTH: usize = 500;

/// Validates a module path for length and basic syntax.
///
/// The stdlib pseudo-module path is exempt from the hostname shape check.
///
/// # Errors
///
/// Returns `InvalidModulePath` if the path is empty, too long, contains
/// whitespace/control/backslash characters, contains empty or relative
/// (`.`/`..`) segments, or its first segment is not a dotted hostname.
pub fn check_module_path(path: &str) -> Result<()> {
    if path == STDLIB_MODULE_PATH {
        return Ok(());
    }
    let invalid = |message: &str| CoreError::InvalidModulePath {
        path: path.to_string(),
        message: message.to_string(),
    };

    if path.is_empty() {
        return Err(invalid("module path is empty"));
    }
    if path.len() > MAX_MODULE_PATH_LENGTH {
        return Err(invalid("module path exceeds maximum length"));
    }
    if path
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || c == '\\')
    {
        return Err(invalid("module path contains invalid characters"));
    }
    for segment in path.split('/') {
        if segment.is_empty() {
            return Err(invalid("module path contains an empty segment"));
        }
        if segment == "." || segment == ".." {
            return Err(invalid("module path contains a relative segment"));
        }
    }
    let first = path.split('/').next().unwrap_or("");
    if !first.contains('.') {
        return Err(invalid("module path must start with a hostname"));
    }
    Ok(())
}

/// Whether a package path belongs to the standard library. Stdlib import
/// paths are the only ones whose first segment has no dot.
pub fn is_stdlib_path(path: &str) -> bool {
    let first = path.split('/').next().unwrap_or("");
    !first.is_empty() && !first.contains('.')
}

/// Whether any path segment is `internal`; such packages are importable
/// only within their subtree and are kept out of search.
pub fn has_internal_segment(path: &str) -> bool {
    path.split('/').any(|segment| segment == "internal")
}

/// Whether `module_path` contains `path` (equal, or a proper prefix at a
/// segment boundary).
pub fn module_contains(module_path: &str, path: &str) -> bool {
    module_path == STDLIB_MODULE_PATH
        || path == module_path
        || path
            .strip_prefix(module_path)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// The package path relative to its module; empty for the module root.
pub fn path_suffix<'a>(path: &'a str, module_path: &str) -> &'a str {
    if path == module_path || module_path == STDLIB_MODULE_PATH {
        return if module_path == STDLIB_MODULE_PATH {
            path
        } else {
            ""
        };
    }
    path.strip_prefix(module_path)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
}

/// The v1 form of a package path: the module's series path plus the
/// package suffix. Identifies "the same package" across major versions.
pub fn v1_path(path: &str, module_path: &str) -> String {
    let series = crate::version::series_path(module_path);
    let suffix = path_suffix(path, module_path);
    if module_path == STDLIB_MODULE_PATH || suffix.is_empty() {
        return if module_path == STDLIB_MODULE_PATH {
            path.to_string()
        } else {
            series
        };
    }
    format!("{series}/{suffix}")
}
