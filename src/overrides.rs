//! # Override Engine
//!
//! Applies pin updates to a [`Registry`] in place.
//!
//! ## Key Components
//!
//! - **[`OverrideSpec`]**: a literal pin from the command line, either
//!   `name@hash` or `name@origin@hash`. Specs are validated up front by
//!   [`parse_override_specs`] so a bad entry never leaves the registry
//!   half-updated.
//! - **[`apply_overrides`]**: applies validated specs and returns how many
//!   modules actually changed. Unknown module names are warnings.
//! - **[`apply_latest`]**: moves every eligible module to the head of its
//!   branch as reported by a [`CommitResolver`].
//! - **[`RepoOverrides`]**: origin-to-commit replacements consumed by the
//!   descriptor generator.
//!
//! Setting a commit always clears a version pin, so the exclusivity invariant
//! of [`Module`] holds after every operation here.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use log::{debug, info, warn};
use regex::Regex;

use crate::error::{Error, Result};
use crate::registry::{Module, Registry, DEFAULT_BRANCH};
use crate::resolver::CommitResolver;

static COMMIT_HASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-fA-F0-9]{7,40}$").expect("valid regex"));
static ORIGIN_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://[a-zA-Z0-9.-]+/[a-zA-Z0-9._/-]+\.git$").expect("valid regex")
});
static REPO_OVERRIDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://[a-zA-Z0-9.-]+/[a-zA-Z0-9._/-]+\.git@[a-fA-F0-9]{7,40}$")
        .expect("valid regex")
});

/// Returns `true` for a 7 to 40 character hexadecimal commit hash.
pub fn is_commit_hash(value: &str) -> bool {
    COMMIT_HASH.is_match(value)
}

/// Abbreviate a commit hash for display.
pub fn short_hash(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

/// A validated `--module-override` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideSpec {
    pub module: String,
    /// Replacement origin, only present in the three-part form.
    pub origin: Option<String>,
    pub commit_hash: String,
}

impl FromStr for OverrideSpec {
    type Err = Error;

    fn from_str(entry: &str) -> Result<Self> {
        let parts: Vec<&str> = entry.split('@').collect();
        let (module, origin, commit_hash) = match parts.as_slice() {
            [module, hash] => (*module, None, *hash),
            [module, origin, hash] => (*module, Some(*origin), *hash),
            _ => {
                return Err(Error::usage(format!(
                    "Invalid override spec: {}\n\
                     Supported formats:\n  \
                     1. module_name@commit_hash\n  \
                     2. module_name@repo_url@commit_hash\n",
                    entry
                )))
            }
        };

        if !is_commit_hash(commit_hash) {
            return Err(Error::usage(format!(
                "Invalid commit hash in '{}': {}\nExpected 7-40 hex characters",
                entry, commit_hash
            )));
        }
        if let Some(origin) = origin {
            if !ORIGIN_URL.is_match(origin) {
                return Err(Error::usage(format!(
                    "Invalid repo URL in '{}': {}\nExpected format: https://github.com/org/repo.git",
                    entry, origin
                )));
            }
        }

        Ok(Self {
            module: module.to_string(),
            origin: origin.map(str::to_string),
            commit_hash: commit_hash.to_string(),
        })
    }
}

impl fmt::Display for OverrideSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Some(origin) => write!(f, "{}@{}@{}", self.module, origin, self.commit_hash),
            None => write!(f, "{}@{}", self.module, self.commit_hash),
        }
    }
}

/// Parse every entry, failing on the first invalid one.
pub fn parse_override_specs<S: AsRef<str>>(entries: &[S]) -> Result<Vec<OverrideSpec>> {
    entries.iter().map(|entry| entry.as_ref().parse()).collect()
}

/// Apply validated override specs and return the number of modules changed.
///
/// A module name that appears in several groups is updated in each of them.
/// The registry timestamp is refreshed even when nothing changed.
pub fn apply_overrides(registry: &mut Registry, specs: &[OverrideSpec]) -> usize {
    let mut applied = 0;

    for spec in specs {
        info!("Override registered: {}", spec);
        let mut found = false;

        for group in registry.groups_mut() {
            if let Some(module) = group.get_mut(&spec.module) {
                found = true;
                if apply_spec(module, spec) {
                    applied += 1;
                }
            }
        }

        if !found {
            warn!(
                "Module '{}' not found in known_good.json\nAvailable modules: {}",
                spec.module,
                registry.module_names().join(", ")
            );
        }
    }

    if applied == 0 {
        warn!("No overrides were applied to any modules");
    } else {
        info!("Successfully applied {} override(s)", applied);
    }
    registry.touch();
    applied
}

fn apply_spec(module: &mut Module, spec: &OverrideSpec) -> bool {
    let previous = describe_pin(module);
    let commit_changed =
        module.commit_hash() != Some(spec.commit_hash.as_str()) || module.version().is_some();
    let origin_changed = spec
        .origin
        .as_deref()
        .is_some_and(|origin| module.origin.as_deref() != Some(origin));

    if !commit_changed && !origin_changed {
        info!(
            "Module '{}' already at specified commit {}, no change needed",
            module.name, spec.commit_hash
        );
        return false;
    }

    if commit_changed {
        module.set_commit(spec.commit_hash.clone());
    }
    match &spec.origin {
        Some(origin) => {
            module.origin = Some(origin.clone());
            info!(
                "Applied override to {}: {} -> {} (repo: {})",
                module.name, previous, spec.commit_hash, origin
            );
        }
        None => info!(
            "Applied override to {}: {} -> {}",
            module.name, previous, spec.commit_hash
        ),
    }
    true
}

fn describe_pin(module: &Module) -> String {
    module
        .version()
        .or(module.commit_hash())
        .unwrap_or("(none)")
        .to_string()
}

/// Origin-to-commit replacements applied while rendering descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoOverrides {
    commits: BTreeMap<String, String>,
}

impl RepoOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `<origin>@<commit>` entries. A later entry for the same origin
    /// replaces an earlier one.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self> {
        let mut overrides = Self::new();
        for entry in entries {
            let entry = entry.as_ref();
            let split = entry.split_once('@').filter(|_| REPO_OVERRIDE.is_match(entry));
            let Some((origin, commit)) = split else {
                return Err(Error::usage(format!(
                    "Invalid --repo-override format: {}\n\
                     Expected format: https://github.com/org/repo.git@<commit_sha>",
                    entry
                )));
            };
            overrides.insert(origin, commit);
        }
        Ok(overrides)
    }

    pub fn insert(&mut self, origin: impl Into<String>, commit: impl Into<String>) {
        self.commits.insert(origin.into(), commit.into());
    }

    /// The replacement commit for `origin`, if any.
    pub fn commit_for(&self, origin: &str) -> Option<&str> {
        self.commits.get(origin).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}

/// Settings for [`apply_latest`].
#[derive(Debug, Clone)]
pub struct LatestOptions {
    /// Branch used for modules that do not record one.
    pub default_branch: String,
    /// Stop at the first failed lookup.
    pub fail_fast: bool,
}

impl Default for LatestOptions {
    fn default() -> Self {
        Self {
            default_branch: DEFAULT_BRANCH.to_string(),
            fail_fast: false,
        }
    }
}

/// Why a module was not looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Pinned,
    NoOrigin,
}

/// What happened to one module during [`apply_latest`].
#[derive(Debug)]
pub enum LatestOutcome {
    Updated {
        previous: String,
        commit: String,
        branch: String,
    },
    Unchanged {
        commit: String,
    },
    Skipped(SkipReason),
    Failed(Error),
}

/// One line of the [`LatestReport`].
#[derive(Debug)]
pub struct LatestEntry {
    pub module: String,
    pub outcome: LatestOutcome,
}

impl fmt::Display for LatestEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            LatestOutcome::Updated {
                previous,
                commit,
                branch,
            } => write!(
                f,
                "{}: {} -> {} (branch {})",
                self.module,
                short_hash(previous),
                short_hash(commit),
                branch
            ),
            LatestOutcome::Unchanged { commit } => {
                write!(f, "{}: {} (no update)", self.module, short_hash(commit))
            }
            LatestOutcome::Skipped(SkipReason::Pinned) => {
                write!(f, "{}: pinned, skipping", self.module)
            }
            LatestOutcome::Skipped(SkipReason::NoOrigin) => {
                write!(f, "{}: no repo URL, skipping", self.module)
            }
            LatestOutcome::Failed(error) => write!(f, "ERROR {}: {}", self.module, error),
        }
    }
}

/// Per-module results of [`apply_latest`], in registry order.
#[derive(Debug, Default)]
pub struct LatestReport {
    pub entries: Vec<LatestEntry>,
}

impl LatestReport {
    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, LatestOutcome::Updated { .. }))
    }

    pub fn failures(&self) -> usize {
        self.count(|o| matches!(o, LatestOutcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, LatestOutcome::Skipped(_)))
    }

    fn count(&self, predicate: impl Fn(&LatestOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| predicate(&e.outcome)).count()
    }
}

/// Move every eligible module to the latest commit of its branch.
///
/// Modules with `pin_version` set or without an origin are skipped without
/// a lookup. Lookup failures are recorded per module; with `fail_fast` the
/// run stops after the first one. An error that is not scoped to a module
/// always stops the run.
pub fn apply_latest(
    registry: &mut Registry,
    resolver: &dyn CommitResolver,
    options: &LatestOptions,
) -> LatestReport {
    let mut report = LatestReport::default();
    debug!("Resolving latest commits with the {} backend", resolver.name());

    'groups: for group in registry.groups_mut() {
        for module in group.iter_mut() {
            let outcome = update_to_latest(module, resolver, &options.default_branch);
            let stop = match &outcome {
                LatestOutcome::Failed(error) => {
                    warn!("Failed to update {}: {}", module.name, error);
                    options.fail_fast || !error.is_per_module()
                }
                _ => false,
            };
            report.entries.push(LatestEntry {
                module: module.name.clone(),
                outcome,
            });
            if stop {
                break 'groups;
            }
        }
    }
    report
}

fn update_to_latest(
    module: &mut Module,
    resolver: &dyn CommitResolver,
    default_branch: &str,
) -> LatestOutcome {
    if module.pin_version {
        return LatestOutcome::Skipped(SkipReason::Pinned);
    }
    if module.origin.is_none() {
        return LatestOutcome::Skipped(SkipReason::NoOrigin);
    }

    let owner_repo = match module.owner_repo() {
        Ok(owner_repo) => owner_repo,
        Err(error) => return LatestOutcome::Failed(error),
    };
    let branch = module.branch_or(default_branch).to_string();
    let latest = match resolver.latest_commit(&owner_repo, &branch) {
        Ok(latest) => latest,
        Err(error) => return LatestOutcome::Failed(error),
    };

    if module.commit_hash() == Some(latest.as_str()) && module.version().is_none() {
        return LatestOutcome::Unchanged { commit: latest };
    }
    let previous = describe_pin(module);
    module.set_commit(latest.clone());
    LatestOutcome::Updated {
        previous,
        commit: latest,
        branch,
    }
}
