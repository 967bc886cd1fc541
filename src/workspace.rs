//! Workspace metadata export.
//!
//! Writes the registry as a gita workspace file: one CSV row per module of
//! the form `url,name,path,type,flags,ref`. The checkout path is the module
//! name and the ref is the pinned commit, or the tracked branch when the
//! module has no commit.

use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::registry::{Registry, DEFAULT_BRANCH};

/// One row of a gita workspace file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceEntry {
    pub url: String,
    pub name: String,
    pub path: String,
    pub git_ref: String,
}

impl WorkspaceEntry {
    fn record(&self) -> [&str; 6] {
        [
            self.url.as_str(),
            self.name.as_str(),
            self.path.as_str(),
            "",
            "",
            self.git_ref.as_str(),
        ]
    }
}

/// Build workspace rows in registry order.
///
/// A module listed in several groups yields one row. Every module must have
/// an origin URL.
pub fn workspace_entries(registry: &Registry) -> Result<Vec<WorkspaceEntry>> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for module in registry.modules() {
        let Some(url) = module.origin.as_deref() else {
            return Err(Error::schema(format!(
                "module '{}': repo must not be empty",
                module.name
            )));
        };
        if !seen.insert(module.name.as_str()) {
            debug!("Module {} already exported, skipping duplicate", module.name);
            continue;
        }
        let git_ref = module
            .commit_hash()
            .unwrap_or_else(|| module.branch_or(DEFAULT_BRANCH));
        entries.push(WorkspaceEntry {
            url: url.to_string(),
            name: module.name.clone(),
            path: module.name.clone(),
            git_ref: git_ref.to_string(),
        });
    }
    Ok(entries)
}

/// Write entries as headerless CSV.
pub fn write_entries<W: Write>(writer: W, entries: &[WorkspaceEntry]) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    for entry in entries {
        csv.write_record(entry.record())?;
    }
    csv.flush()?;
    Ok(())
}

/// Export `registry` to a gita workspace file at `path`.
pub fn export<P: AsRef<Path>>(registry: &Registry, path: P) -> Result<usize> {
    let entries = workspace_entries(registry)?;
    let file = std::fs::File::create(path)?;
    write_entries(file, &entries)?;
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    const SAMPLE: &str = r#"{
    "modules": {
        "target_sw": {
            "score_baselibs": {
                "repo": "https://github.com/eclipse-score/baselibs.git",
                "hash": "a1b2c3d4e5f6a7b8c9d0a1b2c3d4e5f6a7b8c9d0"
            },
            "score_logging": {
                "repo": "https://github.com/eclipse-score/logging.git",
                "branch": "release"
            }
        },
        "tooling": {
            "score_baselibs": {
                "repo": "https://github.com/eclipse-score/baselibs.git",
                "hash": "a1b2c3d4e5f6a7b8c9d0a1b2c3d4e5f6a7b8c9d0"
            },
            "score_docs": {
                "repo": "https://github.com/eclipse-score/docs.git"
            }
        }
    },
    "timestamp": "2026-01-01T00:00:00Z"
}"#;

    #[test]
    fn test_export_rows() {
        let registry = registry::parse(SAMPLE).unwrap();
        let entries = workspace_entries(&registry).unwrap();
        let mut buffer = Vec::new();
        write_entries(&mut buffer, &entries).unwrap();

        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "https://github.com/eclipse-score/baselibs.git,score_baselibs,score_baselibs,,,a1b2c3d4e5f6a7b8c9d0a1b2c3d4e5f6a7b8c9d0\n\
             https://github.com/eclipse-score/logging.git,score_logging,score_logging,,,release\n\
             https://github.com/eclipse-score/docs.git,score_docs,score_docs,,,main\n"
        );
    }

    #[test]
    fn test_module_without_origin_is_an_error() {
        let registry = registry::parse(
            r#"{"modules": {"tooling": {"score_tooling": {"version": "1.0.0"}}}}"#,
        )
        .unwrap();
        let err = workspace_entries(&registry).unwrap_err();
        assert!(err.to_string().contains("score_tooling"));
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".gita-workspace.csv");
        let registry = registry::parse(SAMPLE).unwrap();
        assert_eq!(export(&registry, &path).unwrap(), 3);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
    }
}
