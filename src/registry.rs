//! # Registry Model
//!
//! This module defines the known-good registry: the set of external modules a
//! multi-module build depends on, each pinned either to a commit or to a
//! released version. The registry is stored as a JSON document of the shape
//!
//! ```json
//! {
//!     "modules": {
//!         "<group>": {
//!             "<module>": { "repo": "...", "hash": "..." }
//!         }
//!     },
//!     "timestamp": "2026-01-01T00:00:00Z"
//! }
//! ```
//!
//! ## Key Components
//!
//! - **[`Module`]**: one external dependency. Its commit and version pins are
//!   private so that setting one always clears the other.
//! - **[`Metadata`]**: build and test descriptors used by the coverage
//!   generator and the quality runner.
//! - **[`ModuleGroup`] / [`Registry`]**: the two-tier ordered container. Both
//!   tiers reject duplicate keys at insertion and iterate in insertion order.
//!
//! ## Parsing
//!
//! [`parse`] distinguishes two failure classes. JSON syntax faults become
//! [`Error::Parse`] with the exact line and column; a well-formed document
//! with the wrong shape becomes [`Error::Schema`]. Module records that carry
//! neither an origin nor a version are logged and dropped.
//!
//! [`serialize`] is stable: the same registry always produces byte-identical
//! output, so generated diffs stay minimal under version control.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;

use log::warn;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::origin::OwnerRepo;

/// Branch tracked by modules that do not name one.
pub const DEFAULT_BRANCH: &str = "main";

/// Query root used when a module does not declare its own code root.
pub const DEFAULT_CODE_ROOT_PATH: &str = "//score/...";

const UNEXPECTED_VALUE_HINT: &str = "Possible causes: trailing comma, missing value, or extra comma.";

/// Per-module build and test descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    /// Bazel package pattern below the module's repository root.
    pub code_root_path: String,
    /// Extra flags appended to the unit-test invocation.
    pub extra_test_config: Vec<String>,
    /// Target patterns excluded from tests and coverage queries.
    pub exclude_test_targets: Vec<String>,
    /// Implementation languages of the module.
    #[serde(rename = "langs")]
    pub languages: BTreeSet<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            code_root_path: DEFAULT_CODE_ROOT_PATH.to_string(),
            extra_test_config: Vec::new(),
            exclude_test_targets: Vec::new(),
            languages: ["cpp", "rust"].iter().map(|l| l.to_string()).collect(),
        }
    }
}

impl Metadata {
    /// Whether the module is implemented (at least partly) in `language`.
    pub fn has_language(&self, language: &str) -> bool {
        self.languages.contains(language)
    }
}

/// The authoritative pin of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pin<'a> {
    /// Pinned to a released version of the module.
    Version(&'a str),
    /// Pinned to a commit of the origin repository.
    Commit(&'a str),
    /// Neither pin is set (origin-only module).
    Unpinned,
}

/// One external dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    /// HTTPS URL of the repository the module is fetched from.
    pub origin: Option<String>,
    commit_hash: Option<String>,
    version: Option<String>,
    /// Branch to track; `None` means the caller's default branch.
    pub branch: Option<String>,
    /// When set, "update to latest" never touches this module.
    pub pin_version: bool,
    /// Patch labels applied in order on top of the fetched sources.
    pub patches: Vec<String>,
    pub metadata: Metadata,
}

impl Module {
    /// Create an unpinned module fetched from `origin`.
    pub fn new(name: impl Into<String>, origin: impl Into<String>) -> Self {
        let mut module = Self::bare(name.into());
        module.origin = Some(origin.into());
        module
    }

    /// Create a module fetched from `origin` at `commit_hash`.
    pub fn with_commit(
        name: impl Into<String>,
        origin: impl Into<String>,
        commit_hash: impl Into<String>,
    ) -> Self {
        let mut module = Self::new(name, origin);
        module.commit_hash = Some(commit_hash.into());
        module
    }

    /// Create a module pinned to a released `version`.
    pub fn with_version(name: impl Into<String>, version: impl Into<String>) -> Self {
        let mut module = Self::bare(name.into());
        module.version = Some(version.into());
        module
    }

    fn bare(name: String) -> Self {
        Self {
            name,
            origin: None,
            commit_hash: None,
            version: None,
            branch: None,
            pin_version: false,
            patches: Vec::new(),
            metadata: Metadata::default(),
        }
    }

    pub fn commit_hash(&self) -> Option<&str> {
        self.commit_hash.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Pin the module to a commit. Clears any version pin.
    pub fn set_commit(&mut self, commit_hash: impl Into<String>) {
        self.commit_hash = Some(commit_hash.into());
        self.version = None;
    }

    /// Pin the module to a released version. Clears any commit pin.
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = Some(version.into());
        self.commit_hash = None;
    }

    /// The pin that build descriptors must honour.
    pub fn pin(&self) -> Pin<'_> {
        match (&self.version, &self.commit_hash) {
            (Some(version), _) => Pin::Version(version),
            (None, Some(hash)) => Pin::Commit(hash),
            (None, None) => Pin::Unpinned,
        }
    }

    /// The branch to track, falling back to `default` when none is recorded.
    pub fn branch_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self.branch.as_deref() {
            Some(branch) if !branch.is_empty() => branch,
            _ => default,
        }
    }

    /// The `<owner>/<repo>` of the module's origin.
    pub fn owner_repo(&self) -> Result<OwnerRepo> {
        match self.origin.as_deref() {
            Some(origin) => OwnerRepo::parse(origin),
            None => Err(Error::MalformedOrigin {
                url: String::new(),
                message: format!("module '{}' has no origin URL", self.name),
            }),
        }
    }

    fn from_record(name: &str, record: ModuleRecord) -> Option<Self> {
        let origin = non_empty(record.repo);
        let version = non_empty(record.version);
        let mut commit_hash = non_empty(record.hash);

        if origin.is_none() && version.is_none() {
            warn!("Skipping module {} with missing repo", name);
            return None;
        }
        if version.is_some() && commit_hash.is_some() {
            warn!(
                "Module {} declares both a version and a commit; keeping version {}",
                name,
                version.as_deref().unwrap_or_default()
            );
            commit_hash = None;
        }

        Some(Self {
            name: name.to_string(),
            origin,
            commit_hash,
            version,
            branch: non_empty(record.branch),
            pin_version: record.pin_version,
            patches: record.patches,
            metadata: record.metadata.unwrap_or_default(),
        })
    }

    fn to_record(&self) -> ModuleRecord {
        ModuleRecord {
            repo: non_empty(self.origin.clone()),
            hash: non_empty(self.commit_hash.clone()),
            version: non_empty(self.version.clone()),
            patches: self.patches.clone(),
            branch: self
                .branch
                .clone()
                .filter(|branch| branch != DEFAULT_BRANCH),
            pin_version: self.pin_version,
            metadata: Some(self.metadata.clone()).filter(|m| *m != Metadata::default()),
        }
    }
}

impl Serialize for Module {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_record().serialize(serializer)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Wire form of a module entry.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ModuleRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repo: Option<String>,
    #[serde(default, alias = "commit", skip_serializing_if = "Option::is_none")]
    hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    patches: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pin_version: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata>,
}

/// An ordered set of modules keyed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleGroup {
    name: String,
    modules: Vec<Module>,
}

impl ModuleGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modules: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a module, rejecting a name already present in this group.
    pub fn insert(&mut self, module: Module) -> Result<()> {
        if self.get(&module.name).is_some() {
            return Err(Error::schema(format!(
                "duplicate module '{}' in group '{}'",
                module.name, self.name
            )));
        }
        self.modules.push(module);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.modules.iter_mut().find(|m| m.name == name)
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Module> {
        self.modules.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Serialize for ModuleGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.modules.len()))?;
        for module in &self.modules {
            map.serialize_entry(&module.name, module)?;
        }
        map.end()
    }
}

/// The full known-good state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    groups: Vec<ModuleGroup>,
    timestamp: String,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a group, rejecting a name already present.
    pub fn add_group(&mut self, group: ModuleGroup) -> Result<()> {
        if self.group(group.name()).is_some() {
            return Err(Error::schema(format!("duplicate group '{}'", group.name())));
        }
        self.groups.push(group);
        Ok(())
    }

    pub fn group(&self, name: &str) -> Option<&ModuleGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn group_mut(&mut self, name: &str) -> Option<&mut ModuleGroup> {
        self.groups.iter_mut().find(|g| g.name == name)
    }

    pub fn groups(&self) -> &[ModuleGroup] {
        &self.groups
    }

    pub fn groups_mut(&mut self) -> impl Iterator<Item = &mut ModuleGroup> {
        self.groups.iter_mut()
    }

    /// Every module of every group, in insertion order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.groups.iter().flat_map(|g| g.modules.iter())
    }

    /// Sorted, de-duplicated names of all modules.
    pub fn module_names(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self.modules().map(|m| m.name.as_str()).collect();
        names.into_iter().collect()
    }

    /// `true` when no group holds any module.
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(ModuleGroup::is_empty)
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Set the timestamp to the current UTC time.
    pub fn touch(&mut self) {
        self.timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    }

    /// Refresh the timestamp and return the serialized registry.
    pub fn refreshed_json(&mut self) -> Result<String> {
        self.touch();
        serialize(self)
    }

    /// Refresh the timestamp and write the registry to `path`.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let output = self.refreshed_json()?;
        fs::write(path, output)?;
        Ok(())
    }

    /// Like [`Registry::save`], but a dry run prints the document between
    /// markers instead of touching `path`.
    pub fn write<P: AsRef<Path>>(&mut self, path: P, dry_run: bool) -> Result<()> {
        if !dry_run {
            return self.save(path);
        }
        let output = self.refreshed_json()?;
        print!("{}", dry_run_listing(path.as_ref(), &output));
        Ok(())
    }
}

fn dry_run_listing(path: &Path, json: &str) -> String {
    format!(
        "\nDry run: would write to {}\n\n\
         ---- BEGIN UPDATED JSON ----\n\
         {}\
         ---- END UPDATED JSON ----\n",
        path.display(),
        json
    )
}

impl Serialize for Registry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        struct Groups<'a>(&'a [ModuleGroup]);

        impl Serialize for Groups<'_> {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for group in self.0 {
                    map.serialize_entry(&group.name, group)?;
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("modules", &Groups(&self.groups))?;
        map.serialize_entry("timestamp", &self.timestamp)?;
        map.end()
    }
}

/// Object entries in document order, rejecting duplicate keys.
struct Entries<T>(Vec<(String, T)>);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Entries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = Entries<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object with unique keys")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut entries: Vec<(String, T)> = Vec::new();
                while let Some(key) = map.next_key::<String>()? {
                    if entries.iter().any(|(existing, _)| *existing == key) {
                        return Err(de::Error::custom(format!("duplicate key '{}'", key)));
                    }
                    let value = map.next_value()?;
                    entries.push((key, value));
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

#[derive(Deserialize)]
struct Document {
    modules: Entries<Entries<ModuleRecord>>,
    #[serde(default)]
    timestamp: String,
}

/// Parses registry JSON text into a [`Registry`].
pub fn parse(text: &str) -> Result<Registry> {
    let value: Value = serde_json::from_str(text).map_err(|e| syntax_error(text, e))?;
    check_shape(&value)?;

    let document: Document =
        serde_json::from_str(text).map_err(|e| Error::schema(e.to_string()))?;

    let mut registry = Registry {
        groups: Vec::with_capacity(document.modules.0.len()),
        timestamp: document.timestamp,
    };
    for (group_name, records) in document.modules.0 {
        let mut group = ModuleGroup::new(group_name);
        for (module_name, record) in records.0 {
            if let Some(module) = Module::from_record(&module_name, record) {
                group.insert(module)?;
            }
        }
        registry.add_group(group)?;
    }
    Ok(registry)
}

/// Parses a registry from a file path.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Registry> {
    let content = fs::read_to_string(path)?;
    parse(&content)
}

/// Serializes a registry as 4-space indented JSON with a trailing newline.
pub fn serialize(registry: &Registry) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    registry.serialize(&mut serializer)?;
    let mut output = String::from_utf8_lossy(&buffer).into_owned();
    output.push('\n');
    Ok(output)
}

fn syntax_error(text: &str, error: serde_json::Error) -> Error {
    if !(error.is_syntax() || error.is_eof()) {
        return Error::Json(error);
    }
    let line = error.line();
    let column = error.column();
    let full = error.to_string();
    let suffix = format!(" at line {} column {}", line, column);
    let message = full.strip_suffix(&suffix).unwrap_or(&full).to_string();
    let hint = (message.starts_with("expected value") || message.starts_with("trailing comma"))
        .then(|| UNEXPECTED_VALUE_HINT.to_string());
    let source_line = text
        .lines()
        .nth(line.saturating_sub(1))
        .unwrap_or_default()
        .to_string();

    Error::Parse {
        line,
        column,
        source_line,
        message,
        hint,
    }
}

fn check_shape(value: &Value) -> Result<()> {
    let root = value
        .as_object()
        .ok_or_else(|| Error::schema("expected a JSON object at the top level"))?;
    let groups = root
        .get("modules")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::schema("expected object with 'modules' dict"))?;
    if let Some(timestamp) = root.get("timestamp") {
        if !timestamp.is_string() {
            return Err(Error::schema("'timestamp' must be a string"));
        }
    }
    for (group_name, modules) in groups {
        let modules = modules.as_object().ok_or_else(|| {
            Error::schema(format!(
                "group '{}' must be an object mapping module names to module records",
                group_name
            ))
        })?;
        for (module_name, record) in modules {
            if !record.is_object() {
                return Err(Error::schema(format!(
                    "module '{}' in group '{}' must be an object",
                    module_name, group_name
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLE: &str = r#"{
    "modules": {
        "target_sw": {
            "score_baselibs": {
                "repo": "https://github.com/eclipse-score/baselibs.git",
                "hash": "a1b2c3d4e5f6a7b8c9d0a1b2c3d4e5f6a7b8c9d0",
                "patches": [
                    "//patches/baselibs:001.patch"
                ]
            },
            "score_logging": {
                "repo": "https://github.com/eclipse-score/logging.git",
                "commit": "1234567",
                "branch": "release",
                "metadata": {
                    "langs": ["rust"],
                    "exclude_test_targets": ["//score/mw/log/legacy:all"]
                }
            }
        },
        "tooling": {
            "score_tooling": {
                "version": "1.2.0"
            }
        }
    },
    "timestamp": "2026-01-01T00:00:00Z"
}
"#;

    #[test]
    fn test_parse_sample_registry() {
        let registry = parse(SAMPLE).unwrap();
        assert_eq!(registry.groups().len(), 2);
        assert_eq!(registry.timestamp(), "2026-01-01T00:00:00Z");

        let sw = registry.group("target_sw").unwrap();
        let names: Vec<&str> = sw.modules().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["score_baselibs", "score_logging"]);

        let baselibs = sw.get("score_baselibs").unwrap();
        assert_eq!(baselibs.patches, vec!["//patches/baselibs:001.patch"]);
        assert_eq!(baselibs.metadata, Metadata::default());

        let logging = sw.get("score_logging").unwrap();
        assert_eq!(logging.pin(), Pin::Commit("1234567"));
        assert_eq!(logging.branch_or(DEFAULT_BRANCH), "release");
        assert!(logging.metadata.has_language("rust"));
        assert!(!logging.metadata.has_language("cpp"));
        assert_eq!(logging.metadata.code_root_path, DEFAULT_CODE_ROOT_PATH);

        let tooling = registry.group("tooling").unwrap().get("score_tooling").unwrap();
        assert_eq!(tooling.pin(), Pin::Version("1.2.0"));
        assert!(tooling.origin.is_none());
    }

    #[test]
    fn test_parse_drops_module_without_origin_or_version() {
        let text = r#"{"modules": {"g": {"broken": {"hash": "abc1234"}, "ok": {"version": "1.0"}}}}"#;
        let registry = parse(text).unwrap();
        let group = registry.group("g").unwrap();
        assert_eq!(group.len(), 1);
        assert!(group.get("broken").is_none());
    }

    #[test]
    fn test_parse_version_wins_over_hash() {
        let text = r#"{"modules": {"g": {"m": {"repo": "https://github.com/o/m.git", "hash": "abc1234", "version": "2.0.0"}}}}"#;
        let registry = parse(text).unwrap();
        let module = registry.group("g").unwrap().get("m").unwrap();
        assert_eq!(module.version(), Some("2.0.0"));
        assert_eq!(module.commit_hash(), None);
    }

    #[test]
    fn test_parse_empty_hash_is_unpinned() {
        let text = r#"{"modules": {"g": {"m": {"repo": "https://github.com/o/m.git", "hash": ""}}}}"#;
        let registry = parse(text).unwrap();
        assert_eq!(registry.group("g").unwrap().get("m").unwrap().pin(), Pin::Unpinned);
    }

    #[test]
    fn test_parse_trailing_comma_reports_position_and_hint() {
        let text = "{\n    \"modules\": {\n        \"g\": {\n            \"m\": {\"version\": \"1.0\"},\n        }\n    }\n}\n";
        let err = parse(text).unwrap_err();
        match &err {
            Error::Parse {
                line,
                column,
                source_line,
                message,
                hint,
            } => {
                assert_eq!(*line, 5);
                assert_eq!(source_line, "        }");
                assert_eq!(source_line.chars().nth(column - 1), Some('}'));
                assert!(message.contains("trailing comma"));
                assert!(hint.as_deref().unwrap().contains("trailing comma"));
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
        let display = err.to_string();
        assert!(display.starts_with("Invalid JSON at line 5, column "));
        assert!(display.contains("\n        }\n        ^\n"));
    }

    #[test]
    fn test_parse_missing_value_has_hint() {
        let err = parse("{\"modules\": }").unwrap_err();
        assert!(matches!(err, Error::Parse { hint: Some(_), .. }));
    }

    #[test]
    fn test_parse_other_syntax_error_has_no_hint() {
        let err = parse("{\"modules\" {}}").unwrap_err();
        assert!(matches!(err, Error::Parse { hint: None, line: 1, .. }));
    }

    #[test]
    fn test_schema_errors_name_the_expectation() {
        let cases = [
            ("[]", "top level"),
            ("{}", "'modules'"),
            ("{\"modules\": []}", "'modules'"),
            ("{\"modules\": {\"g\": []}}", "group 'g'"),
            ("{\"modules\": {\"g\": {\"m\": 1}}}", "module 'm' in group 'g'"),
            ("{\"modules\": {}, \"timestamp\": 5}", "'timestamp'"),
        ];
        for (text, expected) in cases {
            match parse(text) {
                Err(Error::Schema { message }) => assert!(
                    message.contains(expected),
                    "{:?} should mention {:?}, got {:?}",
                    text,
                    expected,
                    message
                ),
                other => panic!("Expected schema error for {:?}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_schema_error_for_wrong_field_type() {
        let text = r#"{"modules": {"g": {"m": {"version": "1.0", "pin_version": "yes"}}}}"#;
        let err = parse(text).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        let text = r#"{"modules": {"g": {"m": {"version": "1"}, "m": {"version": "2"}}}}"#;
        let err = parse(text).unwrap_err();
        match err {
            Error::Schema { message } => assert!(message.contains("duplicate key 'm'")),
            other => panic!("Expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_group_insert_rejects_duplicates() {
        let mut group = ModuleGroup::new("g");
        group.insert(Module::with_version("m", "1.0")).unwrap();
        let err = group.insert(Module::with_version("m", "2.0")).unwrap_err();
        assert!(err.to_string().contains("duplicate module 'm' in group 'g'"));

        let mut registry = Registry::new();
        registry.add_group(group.clone()).unwrap();
        assert!(registry.add_group(ModuleGroup::new("g")).is_err());
    }

    #[test]
    fn test_same_module_name_allowed_across_groups() {
        let text = r#"{"modules": {"a": {"m": {"version": "1"}}, "b": {"m": {"version": "2"}}}}"#;
        let registry = parse(text).unwrap();
        assert_eq!(registry.modules().count(), 2);
        assert_eq!(registry.module_names(), vec!["m"]);
    }

    #[test]
    fn test_setting_a_pin_clears_the_other() {
        let mut module = Module::with_commit("m", "https://github.com/o/m.git", "abc1234");
        module.set_version("1.0.0");
        assert_eq!(module.commit_hash(), None);
        assert_eq!(module.pin(), Pin::Version("1.0.0"));
        module.set_commit("def5678");
        assert_eq!(module.version(), None);
        assert_eq!(module.pin(), Pin::Commit("def5678"));
    }

    #[test]
    fn test_owner_repo_without_origin_fails() {
        let module = Module::with_version("m", "1.0");
        assert!(matches!(
            module.owner_repo(),
            Err(Error::MalformedOrigin { .. })
        ));
    }

    #[test]
    fn test_serialize_omits_defaults_and_keeps_order() {
        let mut group = ModuleGroup::new("g");
        group
            .insert(Module::with_commit("zeta", "https://github.com/o/zeta.git", "abc1234"))
            .unwrap();
        let mut alpha = Module::with_version("alpha", "1.0.0");
        alpha.branch = Some(DEFAULT_BRANCH.to_string());
        alpha.pin_version = true;
        group.insert(alpha).unwrap();
        let mut registry = Registry::new();
        registry.add_group(group).unwrap();

        let expected = r#"{
    "modules": {
        "g": {
            "zeta": {
                "repo": "https://github.com/o/zeta.git",
                "hash": "abc1234"
            },
            "alpha": {
                "version": "1.0.0",
                "pin_version": true
            }
        }
    },
    "timestamp": ""
}
"#;
        assert_eq!(serialize(&registry).unwrap(), expected);
    }

    #[test]
    fn test_round_trip_sample_is_stable() {
        let first = serialize(&parse(SAMPLE).unwrap()).unwrap();
        let second = serialize(&parse(&first).unwrap()).unwrap();
        assert_eq!(first, second);
        // `commit` is normalised to `hash` on write
        assert!(first.contains("\"hash\": \"1234567\""));
        assert!(!first.contains("\"commit\""));
    }

    #[test]
    fn test_save_refreshes_timestamp() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("known_good.json");
        let mut registry = parse(SAMPLE).unwrap();
        registry.save(&path).unwrap();

        assert_ne!(registry.timestamp(), "2026-01-01T00:00:00Z");
        let ts = registry.timestamp();
        assert_eq!(ts.len(), "2026-01-01T00:00:00Z".len());
        assert!(ts.ends_with('Z'));

        let reloaded = from_file(&path).unwrap();
        assert_eq!(reloaded.timestamp(), registry.timestamp());
    }

    #[test]
    fn test_write_dry_run_leaves_file_alone() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("known_good.json");
        let mut registry = parse(SAMPLE).unwrap();
        registry.write(&path, true).unwrap();
        assert!(!path.exists());

        registry.write(&path, false).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_dry_run_listing_names_target_before_markers() {
        let listing = dry_run_listing(Path::new("out/known_good.json"), "{}\n");
        assert_eq!(
            listing,
            "\nDry run: would write to out/known_good.json\n\n\
             ---- BEGIN UPDATED JSON ----\n\
             {}\n\
             ---- END UPDATED JSON ----\n"
        );
    }

    #[test]
    fn test_from_file_nonexistent() {
        assert!(matches!(
            from_file("nonexistent_known_good.json"),
            Err(Error::Io(_))
        ));
    }

    const NAME_POOL: [&str; 6] = [
        "score_baselibs",
        "score_logging",
        "score_lola",
        "score_tooling",
        "libfoo",
        "libbar",
    ];

    fn arb_metadata() -> impl Strategy<Value = Metadata> {
        (
            prop::option::of("//[a-z]{1,6}/\\.\\.\\."),
            prop::collection::vec("--[a-z]{1,6}=[a-z0-9]{1,4}", 0..3),
            prop::collection::vec("//[a-z]{1,6}:[a-z]{1,6}", 0..3),
            prop::collection::vec(prop::sample::select(vec!["rust", "cpp", "python"]), 0..4),
        )
            .prop_map(|(root, extra, exclude, langs)| Metadata {
                code_root_path: root.unwrap_or_else(|| DEFAULT_CODE_ROOT_PATH.to_string()),
                extra_test_config: extra,
                exclude_test_targets: exclude,
                languages: langs.into_iter().map(str::to_string).collect(),
            })
    }

    fn arb_module() -> impl Strategy<Value = Module> {
        (
            prop::sample::select(NAME_POOL.to_vec()),
            any::<bool>(),
            prop::option::of("[a-f0-9]{7,40}"),
            prop::option::of("[0-9]\\.[0-9]\\.[0-9]"),
            prop::option::of("(develop|release/[0-9]\\.x)"),
            prop::collection::vec("//patches:[a-z]{1,6}\\.patch", 0..3),
            any::<bool>(),
            prop::option::of(arb_metadata()),
        )
            .prop_map(
                |(name, with_origin, hash, version, branch, patches, pin_version, metadata)| {
                    let mut module = match version {
                        // a module without origin must carry a version to survive parsing
                        Some(version) if !with_origin => Module::with_version(name, version),
                        Some(version) => {
                            let mut module =
                                Module::new(name, format!("https://github.com/org/{}.git", name));
                            module.set_version(version);
                            module
                        }
                        None => {
                            let mut module =
                                Module::new(name, format!("https://github.com/org/{}.git", name));
                            if let Some(hash) = hash {
                                module.set_commit(hash);
                            }
                            module
                        }
                    };
                    module.branch = branch;
                    module.patches = patches;
                    module.pin_version = pin_version;
                    if let Some(metadata) = metadata {
                        module.metadata = metadata;
                    }
                    module
                },
            )
    }

    fn arb_registry() -> impl Strategy<Value = Registry> {
        prop::collection::vec(prop::collection::vec(arb_module(), 0..5), 1..=3).prop_map(|groups| {
            let mut registry = Registry::new();
            for (index, modules) in groups.into_iter().enumerate() {
                let mut seen = BTreeSet::new();
                let mut group = ModuleGroup::new(format!("group_{}", index));
                for module in modules.into_iter().filter(|m| seen.insert(m.name.clone())) {
                    group
                        .insert(module)
                        .expect("names are unique within the group");
                }
                registry
                    .add_group(group)
                    .expect("group names are unique");
            }
            registry
        })
    }

    proptest! {
        /// Property: serialize(parse(serialize(R))) == serialize(R)
        #[test]
        fn serialize_parse_round_trip(registry in arb_registry()) {
            let first = serialize(&registry).unwrap();
            let reparsed = parse(&first).unwrap();
            prop_assert_eq!(reparsed.groups(), registry.groups());
            let second = serialize(&reparsed).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn shared_names_survive_in_every_group(registry in arb_registry()) {
            let reparsed = parse(&serialize(&registry).unwrap()).unwrap();
            for group in registry.groups() {
                let copy = reparsed.group(group.name()).unwrap();
                for module in group.modules() {
                    prop_assert_eq!(copy.get(&module.name), Some(module));
                }
            }
        }
    }
}
