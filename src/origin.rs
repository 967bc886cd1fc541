//! Origin URL handling.
//!
//! Modules record the HTTPS URL of the repository they are fetched from. The
//! remote resolver needs the `<owner>/<repo>` pair, which is only defined for
//! hosting URLs of the shape `https://<host>/<owner>/<repo>[.git]`.

use std::fmt;

use url::Url;

use crate::error::{Error, Result};

/// The `<owner>/<repo>` identifier extracted from a hosting URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRepo {
    pub host: String,
    pub owner: String,
    pub repo: String,
}

impl OwnerRepo {
    /// Parse an origin URL into its owner/repo pair.
    ///
    /// Extra path segments after the repository are ignored; a trailing
    /// `.git` suffix is stripped from the repository name.
    pub fn parse(origin: &str) -> Result<Self> {
        let malformed = |message: &str| Error::MalformedOrigin {
            url: origin.to_string(),
            message: message.to_string(),
        };

        let url = Url::parse(origin).map_err(|e| malformed(&e.to_string()))?;
        if url.scheme() != "https" {
            return Err(malformed("expected an https:// URL"));
        }
        let host = match url.host_str() {
            Some(host) if host.contains('.') => host.to_string(),
            _ => return Err(malformed("not a recognized hosting URL")),
        };

        let path = url.path().trim_start_matches('/');
        let mut segments = path.splitn(3, '/');
        let owner = segments.next().unwrap_or_default();
        let repo = segments.next().unwrap_or_default();
        let repo = repo.strip_suffix(".git").unwrap_or(repo);
        if owner.is_empty() || repo.is_empty() {
            return Err(malformed("expected https://<host>/<owner>/<repo>[.git]"));
        }

        Ok(Self {
            host,
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

impl fmt::Display for OwnerRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
