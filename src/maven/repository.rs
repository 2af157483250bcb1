use std::collections::HashSet;
use std::path::{Path, PathBuf};

use hyper::Uri;

use crate::maven::error::ResolutionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryPolicy {
    AlwaysUpdate,
    NeverUpdate,
}

impl RepositoryPolicy {
    /// Unknown tokens are accepted but carry no meaning.
    pub fn parse(token: &str) -> Option<RepositoryPolicy> {
        match token {
            "always-update" => Some(RepositoryPolicy::AlwaysUpdate),
            "never-update" => Some(RepositoryPolicy::NeverUpdate),
            _ => None,
        }
    }

    pub fn parse_list(tokens: &str) -> HashSet<RepositoryPolicy> {
        tokens
            .split(',')
            .filter_map(|token| RepositoryPolicy::parse(token.trim()))
            .collect()
    }
}

/// A filesystem directory in standard repository layout, doubling as the
/// download cache for the whole resolution session.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    name: String,
    directory: PathBuf,
    url: String,
    policies: HashSet<RepositoryPolicy>,
}

impl LocalRepository {
    pub fn new(
        name: impl Into<String>,
        directory: impl Into<PathBuf>,
        policies: HashSet<RepositoryPolicy>,
    ) -> LocalRepository {
        let directory = directory.into();
        let directory = std::path::absolute(&directory).unwrap_or(directory);
        let url = format!("file://{}/", directory.display());
        LocalRepository {
            name: name.into(),
            directory,
            url,
            policies,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn policies(&self) -> &HashSet<RepositoryPolicy> {
        &self.policies
    }
}

/// A repository reachable over `file`, `http` or `https`.
#[derive(Debug, Clone)]
pub struct RemoteRepository {
    name: String,
    base_url: String, // with trailing '/'
    policies: HashSet<RepositoryPolicy>,
}

impl RemoteRepository {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        policies: HashSet<RepositoryPolicy>,
    ) -> Result<RemoteRepository, ResolutionError> {
        let name = name.into();
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let supported = base_url.starts_with("file://")
            || base_url.starts_with("http://")
            || base_url.starts_with("https://");
        // check that http(s) base URLs are valid before the first request
        let parseable =
            base_url.starts_with("file://") || Uri::try_from(base_url.as_str()).is_ok();
        if !supported || !parseable {
            return Err(ResolutionError::InvalidRepositoryUrl {
                name,
                url: base_url,
            });
        }

        Ok(RemoteRepository {
            name,
            base_url,
            policies,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }

    pub fn policies(&self) -> &HashSet<RepositoryPolicy> {
        &self.policies
    }
}

/// Local vs. remote is a capability distinction, not a hierarchy.
#[derive(Debug, Clone)]
pub enum Repository {
    Local(LocalRepository),
    Remote(RemoteRepository),
}

impl Repository {
    pub fn name(&self) -> &str {
        match self {
            Repository::Local(local) => local.name(),
            Repository::Remote(remote) => remote.name(),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Repository::Local(local) => local.url(),
            Repository::Remote(remote) => remote.url(),
        }
    }

    pub fn policies(&self) -> &HashSet<RepositoryPolicy> {
        match self {
            Repository::Local(local) => local.policies(),
            Repository::Remote(remote) => remote.policies(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Repository::Remote(_))
    }

    /// Metadata-based refresh applies when `always-update` is set and not
    /// vetoed by `never-update`.
    pub fn wants_update(&self) -> bool {
        let policies = self.policies();
        policies.contains(&RepositoryPolicy::AlwaysUpdate)
            && !policies.contains(&RepositoryPolicy::NeverUpdate)
    }
}
