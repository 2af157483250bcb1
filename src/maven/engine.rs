use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_recursion::async_recursion;
use chrono::NaiveDateTime;
use tracing::{trace, warn};

use crate::maven::coordinates::{Coordinate, ResolvedArtifact, ResolvedCoordinate};
use crate::maven::error::ResolutionError;
use crate::maven::metadata_xml::parse_versioning_metadata;
use crate::maven::paths::{self, METADATA_FILE_NAME};
use crate::maven::pom_xml::parse_project_descriptor;
use crate::maven::repository::{LocalRepository, RemoteRepository, Repository};
use crate::maven::scope::DependencyScope;
use crate::maven::transport::Transport;

/// The core resolution algorithm: turns unresolved coordinates into resolved
/// ones against the repository chain, materializes their files into the local
/// repository and walks the transitive closure depth-first.
///
/// All state lives in the configuration and on the local disk; the engine
/// itself holds no resolution state between calls.
pub struct ResolutionEngine {
    local: Repository,
    remotes: Vec<Repository>,
    destination: PathBuf,
    transport: Transport,
}

impl ResolutionEngine {
    pub fn new(
        local: LocalRepository,
        remotes: Vec<RemoteRepository>,
    ) -> Result<ResolutionEngine, ResolutionError> {
        // fallback iteration scans repositories by name, so names must be
        // unique across the whole session
        let mut names = HashSet::new();
        names.insert(local.name().to_string());
        for remote in &remotes {
            if !names.insert(remote.name().to_string()) {
                return Err(ResolutionError::DuplicateRepositoryName(
                    remote.name().to_string(),
                ));
            }
        }

        let destination = local.directory().to_path_buf();
        Ok(ResolutionEngine {
            local: Repository::Local(local),
            remotes: remotes.into_iter().map(Repository::Remote).collect(),
            destination,
            transport: Transport::new(),
        })
    }

    pub fn local(&self) -> &Repository {
        &self.local
    }

    pub fn remotes(&self) -> &[Repository] {
        &self.remotes
    }

    /// Tries to resolve `coordinate` against a single repository.
    ///
    /// `Ok(None)` means this repository cannot serve the coordinate and the
    /// caller should move on to the next one.
    pub async fn resolve_at(
        &self,
        repository: &Repository,
        coordinate: &Coordinate,
    ) -> Result<Option<ResolvedCoordinate>, ResolutionError> {
        let mut from_metadata = None;
        if repository.wants_update() {
            if !repository.is_remote() {
                // an always-update local repository refuses to serve
                // descriptors, forcing a refresh through the remotes
                return Ok(None);
            }
            if let Some(metadata_file) = self
                .transport
                .fetch(
                    repository,
                    coordinate,
                    &self.destination,
                    METADATA_FILE_NAME,
                    METADATA_FILE_NAME,
                )
                .await?
            {
                let metadata = parse_versioning_metadata(&read_file(&metadata_file).await?[..])
                    .map_err(|e| escalate_parse_error(coordinate, e))?;
                let actual_version = metadata
                    .actual_version()
                    .map_err(|e| escalate_parse_error(coordinate, e))?;
                let updated_time = metadata
                    .last_updated()
                    .map_err(|e| escalate_parse_error(coordinate, e))?;
                from_metadata = Some((actual_version, updated_time));
            }
        }

        // without metadata the declared version is the actual one; the
        // minimum sentinel makes metadata-backed resolutions win
        // reconciliation over this one
        let (actual_version, updated_time) =
            from_metadata.unwrap_or_else(|| (coordinate.version.clone(), NaiveDateTime::MIN));

        let descriptor_file = self
            .transport
            .fetch(
                repository,
                coordinate,
                &self.destination,
                &paths::descriptor_file_name(coordinate, &actual_version),
                &paths::descriptor_file_name(coordinate, &coordinate.version),
            )
            .await?;
        let Some(descriptor_file) = descriptor_file else {
            return Ok(None);
        };

        let descriptor = parse_project_descriptor(&read_file(&descriptor_file).await?[..])
            .map_err(|e| escalate_parse_error(coordinate, e))?;

        trace!(
            "resolved '{}' as version {} against '{}'",
            coordinate,
            actual_version,
            repository.name()
        );
        Ok(Some(ResolvedCoordinate {
            coordinate: coordinate.clone(),
            actual_version,
            updated_time,
            source_repository: repository.clone(),
            dependencies: descriptor.dependencies,
        }))
    }

    /// Resolves against the chain: local repository first, then the remotes
    /// in declaration order, stopping at the first success.
    pub async fn resolve_coordinate(
        &self,
        coordinate: &Coordinate,
    ) -> Result<ResolvedCoordinate, ResolutionError> {
        for repository in std::iter::once(&self.local).chain(self.remotes.iter()) {
            match self.resolve_at(repository, coordinate).await {
                Ok(Some(resolved)) => return Ok(resolved),
                Ok(None) => {}
                Err(e) if e.is_transport_failure() => {
                    warn!(
                        "repository '{}' failed while resolving '{}': {}",
                        repository.name(),
                        coordinate,
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Err(ResolutionError::unresolvable(coordinate, None))
    }

    /// Resolves the full scope-filtered closure of one root coordinate.
    pub async fn resolve_closure(
        &self,
        coordinate: Coordinate,
        scope_filter: &HashSet<DependencyScope>,
    ) -> Result<Vec<ResolvedArtifact>, ResolutionError> {
        let mut seen = HashSet::new();
        let mut artifacts = Vec::new();
        self.resolve_into(coordinate, scope_filter, &mut seen, &mut artifacts)
            .await?;
        Ok(artifacts)
    }

    #[async_recursion]
    async fn resolve_into(
        &self,
        coordinate: Coordinate,
        scope_filter: &HashSet<DependencyScope>,
        seen: &mut HashSet<Coordinate>,
        artifacts: &mut Vec<ResolvedArtifact>,
    ) -> Result<(), ResolutionError> {
        // guards against dependency cycles and repeated subtrees
        if !seen.insert(coordinate.clone()) {
            return Ok(());
        }

        let resolved = self.resolve_coordinate(&coordinate).await?;
        let artifact = self.materialize(resolved).await?;
        let dependencies = artifact.dependencies.clone();
        artifacts.push(artifact);

        for dependency in dependencies {
            if scope_filter.contains(&dependency.scope) {
                self.resolve_into(dependency, scope_filter, seen, artifacts)
                    .await?;
            }
        }
        Ok(())
    }

    /// Produces the artifact file for a resolved coordinate: local repository
    /// first (the cache check), then the repository that served the
    /// descriptor, then the remaining remotes starting just after that
    /// repository's position.
    async fn materialize(
        &self,
        resolved: ResolvedCoordinate,
    ) -> Result<ResolvedArtifact, ResolutionError> {
        if let Some(file) = self.try_download(&self.local, &resolved).await? {
            return Ok(into_artifact(&resolved, self.local.name(), file));
        }
        if let Some(file) = self.try_download(&resolved.source_repository, &resolved).await? {
            return Ok(into_artifact(
                &resolved,
                resolved.source_repository.name(),
                file,
            ));
        }

        let source_name = resolved.source_repository.name().to_string();
        let start = self
            .remotes
            .iter()
            .position(|repository| repository.name() == source_name)
            .map(|index| index + 1)
            .unwrap_or(0);
        for repository in &self.remotes[start..] {
            if repository.name() == source_name {
                continue;
            }
            // this repository may serve a different actual version, so the
            // descriptor is resolved again before the file is fetched
            let candidate = match self.resolve_at(repository, &resolved.coordinate).await {
                Ok(Some(candidate)) => candidate,
                Ok(None) => continue,
                Err(e) if e.is_transport_failure() => {
                    warn!(
                        "repository '{}' failed while re-resolving '{}': {}",
                        repository.name(),
                        resolved.coordinate,
                        e
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };
            if let Some(file) = self.try_download(repository, &candidate).await? {
                return Ok(into_artifact(&candidate, repository.name(), file));
            }
        }

        Err(ResolutionError::UnresolvableArtifact {
            coordinate: resolved.coordinate,
        })
    }

    async fn try_download(
        &self,
        repository: &Repository,
        resolved: &ResolvedCoordinate,
    ) -> Result<Option<PathBuf>, ResolutionError> {
        let result = self
            .transport
            .fetch(
                repository,
                &resolved.coordinate,
                &self.destination,
                &paths::artifact_file_name(&resolved.coordinate, &resolved.actual_version),
                &paths::artifact_file_name(&resolved.coordinate, &resolved.coordinate.version),
            )
            .await;
        match result {
            Ok(found) => Ok(found),
            Err(e) if e.is_transport_failure() => {
                warn!(
                    "repository '{}' failed to serve '{}': {}",
                    repository.name(),
                    resolved.coordinate,
                    e
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn into_artifact(
    resolved: &ResolvedCoordinate,
    repository_name: &str,
    file: PathBuf,
) -> ResolvedArtifact {
    ResolvedArtifact {
        coordinate: resolved.coordinate.clone(),
        actual_version: resolved.actual_version.clone(),
        updated_time: resolved.updated_time,
        repository: repository_name.to_string(),
        dependencies: resolved.dependencies.clone(),
        file,
    }
}

async fn read_file(file: &Path) -> Result<Vec<u8>, ResolutionError> {
    tokio::fs::read(file)
        .await
        .map_err(|e| ResolutionError::download_failed(file.display().to_string(), e.into()))
}

/// Malformed descriptors are never retried; they escalate as an unresolvable
/// dependency. `NotASnapshot` keeps its own identity - it indicates a
/// configuration error, not a broken descriptor.
fn escalate_parse_error(coordinate: &Coordinate, error: ResolutionError) -> ResolutionError {
    match error {
        ResolutionError::NotASnapshot(_) => error,
        other => ResolutionError::unresolvable(coordinate, Some(anyhow::Error::new(other))),
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_duplicate_repository_names_rejected() {
        let local = LocalRepository::new("local", ".", HashSet::new());
        let remotes = vec![
            RemoteRepository::new("central", "https://a.example.org", HashSet::new()).unwrap(),
            RemoteRepository::new("central", "https://b.example.org", HashSet::new()).unwrap(),
        ];
        assert!(matches!(
            ResolutionEngine::new(local, remotes),
            Err(ResolutionError::DuplicateRepositoryName(_))
        ));
    }

    #[test]
    fn test_remote_clashing_with_local_name_rejected() {
        let local = LocalRepository::new("cache", ".", HashSet::new());
        let remotes =
            vec![RemoteRepository::new("cache", "https://a.example.org", HashSet::new()).unwrap()];
        assert!(matches!(
            ResolutionEngine::new(local, remotes),
            Err(ResolutionError::DuplicateRepositoryName(_))
        ));
    }
}
