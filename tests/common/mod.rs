//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_registry(registries::SAMPLE);
//!     fixture.command().arg("workspace").assert().success();
//! }
//! ```

use std::path::{Path, PathBuf};

use assert_fs::prelude::*;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::registries;
    pub use super::TestFixture;
}

/// Registry documents used across the E2E tests.
#[allow(dead_code)]
pub mod registries {
    /// Two groups: a software group with a version-pinned and a
    /// commit-pinned module, and a tooling group sharing one module.
    pub const SAMPLE: &str = r#"{
    "modules": {
        "target_sw": {
            "score_baselibs": {
                "repo": "https://github.com/eclipse-score/baselibs.git",
                "version": "0.1.3",
                "metadata": {
                    "code_root_path": "//score/...",
                    "langs": ["cpp", "rust"]
                }
            },
            "score_communication": {
                "repo": "https://github.com/eclipse-score/communication.git",
                "hash": "56448a5589a5f7d3921b873e8127b824a8c1ca95",
                "branch": "develop",
                "metadata": {
                    "code_root_path": "//score/mw/com/...",
                    "langs": ["cpp"]
                }
            }
        },
        "tooling": {
            "score_tooling": {
                "repo": "https://github.com/eclipse-score/tooling.git",
                "hash": "a1b2c3d4e5f60718293a4b5c6d7e8f9012345678"
            },
            "score_frozen": {
                "repo": "https://github.com/eclipse-score/frozen.git",
                "hash": "1111111",
                "pin_version": true
            }
        }
    },
    "timestamp": "2026-01-01T00:00:00+00:00"
}
"#;

    /// A registry without any module.
    pub const EMPTY: &str = r#"{"modules": {}}"#;

    /// A trailing comma after the last module.
    pub const TRAILING_COMMA: &str = r#"{
    "modules": {
        "g": {
            "m": {"version": "1.0"},
        }
    }
}
"#;
}

/// A temporary directory holding a registry and any other files a test needs.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Registry file name inside the fixture.
    pub const REGISTRY: &'static str = "known_good.json";

    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `known_good.json` with the given content.
    pub fn with_registry(self, content: &str) -> Self {
        self.with_file(Self::REGISTRY, content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Add an executable shell script, e.g. a fake `gh`.
    #[allow(dead_code)]
    pub fn with_script(self, path: &str, body: &str) -> Self {
        let fixture = self.with_file(path, &format!("#!/bin/sh\n{}\n", body));
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let script = fixture.path().join(path);
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
                .expect("Failed to mark script executable");
        }
        fixture
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the registry file.
    pub fn registry_path(&self) -> PathBuf {
        self.temp_dir.path().join(Self::REGISTRY)
    }

    /// Read a file from the fixture.
    #[allow(dead_code)]
    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.path().join(path)).expect("Failed to read file")
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command configured to run in this fixture's directory.
    ///
    /// `KNOWN_GOOD` and `GITHUB_TOKEN` are cleared so the host environment
    /// cannot leak into a test.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("known-good");
        cmd.current_dir(self.path())
            .env_remove("KNOWN_GOOD")
            .env_remove("GITHUB_TOKEN")
            .env("NO_COLOR", "1");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_with_registry() {
        let fixture = TestFixture::new().with_registry(registries::SAMPLE);
        assert!(fixture.registry_path().exists());
    }

    #[test]
    fn test_sample_registry_is_valid_json() {
        serde_json::from_str::<serde_json::Value>(registries::SAMPLE)
            .expect("SAMPLE should be valid JSON");
    }

    #[test]
    fn test_trailing_comma_is_invalid_json() {
        assert!(serde_json::from_str::<serde_json::Value>(registries::TRAILING_COMMA).is_err());
    }
}
