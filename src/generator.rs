//! # Descriptor Generator
//!
//! Renders a [`Registry`] into Bazel module descriptors.
//!
//! ## Key Components
//!
//! - **[`render_dependencies`]**: one `bazel_dep` block per module of a group,
//!   followed by a `single_version_override`, `git_override` or
//!   `local_path_override` depending on the module's pin and the requested
//!   [`OverrideKind`].
//! - **[`render_coverage`]**: one `<lang>_coverage_report` block per module
//!   implemented in the target language.
//! - **[`plan_artifacts`] / [`write_artifacts`]**: map a whole registry onto
//!   output files: `score_modules_<group>.MODULE.bazel` per group and a
//!   coverage `BUILD` file for the software groups.
//!
//! Rendering is pure and deterministic. Blocks follow registry order and the
//! same registry always renders to byte-identical text.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{Error, Result};
use crate::overrides::{is_commit_hash, RepoOverrides};
use crate::registry::{Module, Pin, Registry};

/// File name prefix of the per-group dependency descriptors.
pub const MODULE_FILE_PREFIX: &str = "score_modules";

/// File name of the coverage descriptor.
pub const COVERAGE_FILE_NAME: &str = "BUILD";

/// Group names containing this marker hold software modules with coverage.
pub const DEFAULT_SOFTWARE_MARKER: &str = "target_sw";

/// Language whose coverage reports are generated by default.
pub const DEFAULT_COVERAGE_LANGUAGE: &str = "rust";

const COVERAGE_BAZEL_CONFIGS: [&str; 2] = ["linux-x86_64", "ferrocene-coverage"];

/// How commit-pinned modules are overridden in dependency descriptors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverrideKind {
    /// Fetch each module from its origin at the pinned commit.
    #[default]
    Git,
    /// Point each module at a checkout named after it.
    LocalPath,
}

impl OverrideKind {
    pub fn label(self) -> &'static str {
        match self {
            OverrideKind::Git => "git",
            OverrideKind::LocalPath => "local_path",
        }
    }
}

/// Bazel rule that identifies test targets of `language`.
pub fn test_rule(language: &str) -> String {
    match language {
        "cpp" => "cc_test".to_string(),
        other => format!("{}_test", other),
    }
}

/// Output file name for the dependency descriptor of `group`.
pub fn module_file_name(group: &str) -> String {
    format!("{}_{}.MODULE.bazel", MODULE_FILE_PREFIX, group)
}

/// Whether `group` holds software modules that get coverage reports.
pub fn is_software_group(group: &str, marker: &str) -> bool {
    group.contains(marker)
}

fn header(timestamp: &str) -> String {
    let mut header = String::new();
    if timestamp.is_empty() {
        header.push_str("# Generated from known_good.json\n");
    } else {
        let _ = writeln!(header, "# Generated from known_good.json at {}", timestamp);
    }
    header.push_str("# Do not edit manually - regenerate with `known-good generate`\n\n");
    header
}

fn patches_lines(patches: &[String]) -> String {
    if patches.is_empty() {
        return String::new();
    }
    let mut lines = String::from("    patches = [\n");
    for patch in patches {
        let _ = writeln!(lines, "        \"{}\",", patch);
    }
    lines.push_str("    ],\n    patch_strip = 1,\n");
    lines
}

fn versioned_block(module: &Module, version: &str) -> String {
    format!(
        "bazel_dep(name = \"{name}\")\n\
         single_version_override(\n    \
         module_name = \"{name}\",\n    \
         version = \"{version}\",\n\
         {patches})\n",
        name = module.name,
        version = version,
        patches = patches_lines(&module.patches),
    )
}

fn git_block(module: &Module, overrides: &RepoOverrides) -> Option<String> {
    let origin = module.origin.as_deref();
    let commit = origin
        .and_then(|origin| overrides.commit_for(origin))
        .or(module.commit_hash());

    let (Some(origin), Some(commit)) = (origin, commit) else {
        warn!(
            "Skipping module {} with missing repo or commit: repo={}, commit={}",
            module.name,
            origin.unwrap_or("None"),
            commit.unwrap_or("None")
        );
        return None;
    };
    if !is_commit_hash(commit) {
        warn!(
            "Skipping module {} with invalid commit hash: {}",
            module.name, commit
        );
        return None;
    }

    Some(format!(
        "bazel_dep(name = \"{name}\")\n\
         git_override(\n    \
         module_name = \"{name}\",\n    \
         remote = \"{origin}\",\n    \
         commit = \"{commit}\",\n\
         {patches})\n",
        name = module.name,
        origin = origin,
        commit = commit,
        patches = patches_lines(&module.patches),
    ))
}

fn local_path_block(module: &Module) -> String {
    format!(
        "bazel_dep(name = \"{name}\")\n\
         local_path_override(\n    \
         module_name = \"{name}\",\n    \
         path = \"{name}\",\n\
         )\n",
        name = module.name,
    )
}

/// Render the dependency descriptor for one group.
///
/// Modules that cannot be pinned are skipped with a warning. A group with no
/// renderable module fails with [`Error::EmptyOutput`].
pub fn render_dependencies(
    group: &str,
    modules: &[Module],
    overrides: &RepoOverrides,
    kind: OverrideKind,
    timestamp: &str,
) -> Result<String> {
    let blocks: Vec<String> = match kind {
        OverrideKind::Git => modules
            .iter()
            .filter_map(|module| match module.pin() {
                Pin::Version(version) => Some(versioned_block(module, version)),
                Pin::Commit(_) | Pin::Unpinned => git_block(module, overrides),
            })
            .collect(),
        OverrideKind::LocalPath => modules.iter().map(local_path_block).collect(),
    };

    if blocks.is_empty() {
        return Err(Error::EmptyOutput {
            artifact: format!("{}_override blocks", kind.label()),
            group: group.to_string(),
        });
    }

    let mut content = header(timestamp);
    if kind == OverrideKind::LocalPath {
        content.push_str(
            "# Note: This file uses local_path overrides. Ensure that local paths are set up correctly.\n\n",
        );
    }
    content.push_str(&blocks.join("\n"));
    Ok(content)
}

fn coverage_block(module: &Module, language: &str) -> String {
    let exclusions: String = module
        .metadata
        .exclude_test_targets
        .iter()
        .map(|target| format!(" -@{}{}", module.name, target))
        .collect();
    let configs: String = COVERAGE_BAZEL_CONFIGS
        .iter()
        .map(|config| format!("        \"{}\",\n", config))
        .collect();

    format!(
        "{language}_coverage_report(\n    \
         name = \"{language}_coverage_{name}\",\n    \
         bazel_configs = [\n\
         {configs}    \
         ],\n    \
         query = 'kind(\"{rule}\", @{name}{root}){exclusions}',\n    \
         visibility = [\"//visibility:public\"],\n\
         )\n",
        language = language,
        name = module.name,
        configs = configs,
        rule = test_rule(language),
        root = module.metadata.code_root_path,
        exclusions = exclusions,
    )
}

/// Render the coverage descriptor for the modules implemented in `language`.
///
/// `label` names the source of `modules` in the [`Error::EmptyOutput`]
/// raised when none of them qualifies.
pub fn render_coverage<'a>(
    label: &str,
    modules: impl IntoIterator<Item = &'a Module>,
    language: &str,
    timestamp: &str,
) -> Result<String> {
    let blocks: Vec<String> = modules
        .into_iter()
        .filter(|module| module.metadata.has_language(language))
        .map(|module| coverage_block(module, language))
        .collect();

    if blocks.is_empty() {
        return Err(Error::EmptyOutput {
            artifact: format!("{}_coverage_report blocks", language),
            group: label.to_string(),
        });
    }

    let mut content = header(timestamp);
    let _ = writeln!(
        content,
        "load(\"@score_tooling//:defs.bzl\", \"{}_coverage_report\")\n",
        language
    );
    content.push_str(&blocks.join("\n"));
    Ok(content)
}

/// Settings for [`plan_artifacts`].
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub output_dir_modules: PathBuf,
    pub output_dir_coverage: PathBuf,
    pub overrides: RepoOverrides,
    pub kind: OverrideKind,
    pub software_marker: String,
    pub coverage_language: String,
}

impl GenerateOptions {
    pub fn new(output_dir_modules: impl Into<PathBuf>, output_dir_coverage: impl Into<PathBuf>) -> Self {
        Self {
            output_dir_modules: output_dir_modules.into(),
            output_dir_coverage: output_dir_coverage.into(),
            overrides: RepoOverrides::default(),
            kind: OverrideKind::default(),
            software_marker: DEFAULT_SOFTWARE_MARKER.to_string(),
            coverage_language: DEFAULT_COVERAGE_LANGUAGE.to_string(),
        }
    }
}

/// A rendered descriptor and where it belongs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub content: String,
    /// Name of the group (or groups) the artifact was rendered from.
    pub source: String,
    pub module_count: usize,
}

/// Render every descriptor for `registry` without touching the disk.
///
/// Empty groups are skipped with a warning. The software groups share a
/// single coverage file; when none of their modules is implemented in the
/// coverage language the plan fails with [`Error::EmptyOutput`].
pub fn plan_artifacts(registry: &Registry, options: &GenerateOptions) -> Result<Vec<Artifact>> {
    let mut artifacts = Vec::new();
    let mut software_groups = Vec::new();

    for group in registry.groups() {
        if group.is_empty() {
            warn!("Skipping empty group: {}", group.name());
            continue;
        }
        let content = render_dependencies(
            group.name(),
            group.modules(),
            &options.overrides,
            options.kind,
            registry.timestamp(),
        )?;
        artifacts.push(Artifact {
            path: options.output_dir_modules.join(module_file_name(group.name())),
            content,
            source: group.name().to_string(),
            module_count: group.len(),
        });
        if is_software_group(group.name(), &options.software_marker) {
            software_groups.push(group);
        }
    }

    if software_groups.is_empty() {
        return Ok(artifacts);
    }

    let label = software_groups
        .iter()
        .map(|g| g.name())
        .collect::<Vec<_>>()
        .join(", ");
    let modules = software_groups.iter().flat_map(|g| g.modules());
    let content = render_coverage(&label, modules, &options.coverage_language, registry.timestamp())?;
    artifacts.push(Artifact {
        path: options.output_dir_coverage.join(COVERAGE_FILE_NAME),
        content,
        source: label,
        module_count: software_groups
            .iter()
            .flat_map(|g| g.modules())
            .filter(|m| m.metadata.has_language(&options.coverage_language))
            .count(),
    });
    Ok(artifacts)
}

/// Write artifacts to disk, creating parent directories as needed.
pub fn write_artifacts(artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        if let Some(parent) = artifact.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&artifact.path, &artifact.content)?;
        info!("Wrote {}", artifact.path.display());
        written.push(artifact.path.clone());
    }
    Ok(written)
}

/// Whether `path` is the coverage descriptor of a plan.
pub fn is_coverage_artifact(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == COVERAGE_FILE_NAME)
}
