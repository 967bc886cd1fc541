//! # Remote Resolver
//!
//! Looks up the latest commit on a branch of a module's origin repository.
//!
//! Two interchangeable backends implement [`CommitResolver`]:
//!
//! - **[`GhCliResolver`]** shells out to the GitHub CLI
//!   (`gh api repos/<owner>/<repo>/branches/<branch> --jq .commit.sha`) with a
//!   short timeout. Authentication is whatever `gh` is logged in with.
//! - **[`ApiResolver`]** talks to the REST API directly and sends the bearer
//!   token from `GITHUB_TOKEN` when one is set.
//!
//! [`select_resolver`] picks a backend once at startup: the CLI when it is on
//! `PATH` and not disabled, else the API when a token is configured, else a
//! configuration error before any lookup is attempted.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::origin::OwnerRepo;
use crate::process::ProcessRunner;

/// Program name of the GitHub CLI.
pub const GH_PROGRAM: &str = "gh";

/// Base URL of the hosted REST API.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Upper bound on a single CLI lookup.
pub const CLI_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding the API bearer token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Resolves the head commit of a branch.
pub trait CommitResolver {
    /// Short backend name used in log output.
    fn name(&self) -> &'static str;

    /// Returns the full commit hash at the head of `branch`.
    fn latest_commit(&self, owner_repo: &OwnerRepo, branch: &str) -> Result<String>;
}

fn resolution_error(owner_repo: &OwnerRepo, branch: &str, message: impl Into<String>) -> Error {
    Error::Resolution {
        target: format!("{}:{}", owner_repo, branch),
        message: message.into(),
    }
}

/// Backend that delegates to the `gh` command-line tool.
#[derive(Debug, Clone)]
pub struct GhCliResolver {
    program: PathBuf,
    timeout: Duration,
}

impl GhCliResolver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: CLI_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl CommitResolver for GhCliResolver {
    fn name(&self) -> &'static str {
        "gh-cli"
    }

    fn latest_commit(&self, owner_repo: &OwnerRepo, branch: &str) -> Result<String> {
        let output = ProcessRunner::new(self.program.to_string_lossy())
            .args([
                "api".to_string(),
                format!("repos/{}/branches/{}", owner_repo, branch),
                "--jq".to_string(),
                ".commit.sha".to_string(),
            ])
            .echo(false)
            .timeout(self.timeout)
            .run()
            .map_err(|e| resolution_error(owner_repo, branch, e.to_string()))?;

        if !output.success() {
            let stderr = output.stderr.trim();
            let message = if stderr.is_empty() {
                format!("gh api failed with exit code {}", output.exit_code)
            } else {
                format!("gh api failed: {}", stderr)
            };
            return Err(resolution_error(owner_repo, branch, message));
        }

        let sha = output.stdout.trim();
        if sha.is_empty() {
            return Err(resolution_error(owner_repo, branch, "Empty sha returned by gh"));
        }
        Ok(sha.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct BranchResponse {
    commit: CommitResponse,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    message: String,
}

/// Backend that calls the REST API over HTTPS.
#[derive(Debug, Clone)]
pub struct ApiResolver {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiResolver {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        // only the CLI backend is bounded by a timeout
        let client = Client::builder()
            .user_agent(concat!("known-good/", env!("CARGO_PKG_VERSION")))
            .timeout(None)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }
}

impl CommitResolver for ApiResolver {
    fn name(&self) -> &'static str {
        "api"
    }

    fn latest_commit(&self, owner_repo: &OwnerRepo, branch: &str) -> Result<String> {
        let url = format!(
            "{}/repos/{}/{}/branches/{}",
            self.base_url, owner_repo.owner, owner_repo.repo, branch
        );
        debug!("GET {}", url);

        let mut request = self
            .client
            .get(&url)
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|e| resolution_error(owner_repo, branch, e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ApiErrorResponse>()
                .map(|body| body.message)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown error").to_string());
            return Err(resolution_error(
                owner_repo,
                branch,
                format!("API error {}: {}", status.as_u16(), detail),
            ));
        }

        let body: BranchResponse = response
            .json()
            .map_err(|e| resolution_error(owner_repo, branch, e.to_string()))?;
        if body.commit.sha.is_empty() {
            return Err(resolution_error(owner_repo, branch, "Empty sha returned by API"));
        }
        Ok(body.commit.sha)
    }
}

/// Backend selection and connection settings.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Use the CLI backend when it is installed.
    pub prefer_cli: bool,
    pub cli_program: String,
    pub cli_timeout: Duration,
    pub api_url: String,
    pub token: Option<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            prefer_cli: true,
            cli_program: GH_PROGRAM.to_string(),
            cli_timeout: CLI_TIMEOUT,
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
        }
    }
}

impl ResolverConfig {
    /// Default settings with the token taken from `GITHUB_TOKEN`.
    pub fn from_env() -> Self {
        Self {
            token: env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty()),
            ..Self::default()
        }
    }
}

/// Choose the resolver backend for this run.
pub fn select_resolver(config: &ResolverConfig) -> Result<Box<dyn CommitResolver>> {
    let installed = find_program(&config.cli_program);

    match installed {
        Some(path) if config.prefer_cli => {
            info!("Using '{}' CLI at {}", config.cli_program, path.display());
            return Ok(Box::new(
                GhCliResolver::new(path).with_timeout(config.cli_timeout),
            ));
        }
        Some(_) => info!(
            "--no-gh specified; ignoring installed '{}' CLI",
            config.cli_program
        ),
        None if config.prefer_cli => info!(
            "'{}' CLI not found; using direct API",
            config.cli_program
        ),
        None => {}
    }

    match &config.token {
        Some(token) => Ok(Box::new(ApiResolver::new(
            config.api_url.clone(),
            Some(token.clone()),
        )?)),
        None => Err(Error::Configuration {
            message: format!(
                "Neither the '{}' CLI nor a {} for the API backend is available",
                config.cli_program, TOKEN_ENV
            ),
        }),
    }
}

/// Locate an executable by name on `PATH`, or verify an explicit path.
pub fn find_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|full| is_executable(full))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
