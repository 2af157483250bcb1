use std::collections::HashSet;
use std::io::Read;
use std::path::PathBuf;

use crate::maven::error::ResolutionError;
use crate::maven::repository::{LocalRepository, RemoteRepository, RepositoryPolicy};
use crate::util::element_path::{walk_document, ElementHandler, ElementPath};

const PATH_LOCAL: [&str; 2] = ["resolver", "local"];
const PATH_REMOTE_REPOSITORY: [&str; 3] = ["resolver", "remote", "repository"];

const DEFAULT_LOCAL_NAME: &str = "local";

/// Resolver configuration: exactly one local repository and an ordered list
/// of remote repositories.
///
/// ```xml
/// <resolver>
///     <local><name>local</name><url>file:///var/cache/repo</url></local>
///     <remote>
///         <repository>
///             <name>central</name>
///             <url>https://repo1.maven.org/maven2</url>
///             <policies>always-update</policies>
///         </repository>
///     </remote>
/// </resolver>
/// ```
#[derive(Debug)]
pub struct ResolverConfig {
    pub local: LocalRepository,
    pub remotes: Vec<RemoteRepository>,
}

pub fn parse_resolver_config<R: Read>(input: R) -> Result<ResolverConfig, ResolutionError> {
    let mut handler = ConfigHandler::default();
    walk_document(input, &mut handler).map_err(into_config_error)?;

    let local = LocalRepository::new(
        handler
            .local_name
            .unwrap_or_else(|| DEFAULT_LOCAL_NAME.to_string()),
        handler
            .local_url
            .as_deref()
            .map(local_directory)
            .transpose()?
            .unwrap_or_else(|| PathBuf::from(".")),
        handler
            .local_policies
            .as_deref()
            .map(RepositoryPolicy::parse_list)
            .unwrap_or_default(),
    );

    Ok(ResolverConfig {
        local,
        remotes: handler.remotes,
    })
}

fn local_directory(url: &str) -> Result<PathBuf, ResolutionError> {
    match url.strip_prefix("file://") {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Err(ResolutionError::Configuration(format!(
            "local repository url must be a file url, got '{}'",
            url
        ))),
    }
}

fn into_config_error(error: anyhow::Error) -> ResolutionError {
    match error.downcast::<ResolutionError>() {
        Ok(resolution_error) => resolution_error,
        Err(other) => ResolutionError::Configuration(format!("{:#}", other)),
    }
}

#[derive(Default)]
struct ConfigHandler {
    local_name: Option<String>,
    local_url: Option<String>,
    local_policies: Option<String>,
    remote_name: Option<String>,
    remote_url: Option<String>,
    remote_policies: Option<String>,
    remotes: Vec<RemoteRepository>,
}

impl ElementHandler for ConfigHandler {
    fn text(&mut self, path: &ElementPath, text: &str) -> anyhow::Result<()> {
        if path.parent_matches(&PATH_LOCAL) {
            match path.current() {
                Some("name") => self.local_name = Some(text.to_string()),
                Some("url") => self.local_url = Some(text.to_string()),
                Some("policies") => self.local_policies = Some(text.to_string()),
                _ => {}
            }
        } else if path.parent_matches(&PATH_REMOTE_REPOSITORY) {
            match path.current() {
                Some("name") => self.remote_name = Some(text.to_string()),
                Some("url") => self.remote_url = Some(text.to_string()),
                Some("policies") => self.remote_policies = Some(text.to_string()),
                _ => {}
            }
        }
        Ok(())
    }

    fn end_element(&mut self, path: &ElementPath) -> anyhow::Result<()> {
        if path.matches(&PATH_REMOTE_REPOSITORY) {
            let name = self
                .remote_name
                .take()
                .ok_or_else(|| missing("name"))?;
            let url = self.remote_url.take().ok_or_else(|| missing("url"))?;
            let policies = self
                .remote_policies
                .take()
                .as_deref()
                .map(RepositoryPolicy::parse_list)
                .unwrap_or_else(HashSet::new);
            self.remotes
                .push(RemoteRepository::new(name, url, policies).map_err(anyhow::Error::new)?);
        }
        Ok(())
    }
}

fn missing(field: &str) -> anyhow::Error {
    anyhow::Error::new(ResolutionError::Configuration(format!(
        "remote repository is missing <{}>",
        field
    )))
}
