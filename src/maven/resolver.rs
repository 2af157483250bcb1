use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::maven::config_xml::{parse_resolver_config, ResolverConfig};
use crate::maven::coordinates::{Coordinate, ResolvedArtifact};
use crate::maven::engine::ResolutionEngine;
use crate::maven::error::ResolutionError;
use crate::maven::repository::{LocalRepository, RemoteRepository};
use crate::maven::scope::DependencyScope;

/// Public entry point: accepts coordinate specifications, drives the engine
/// once per requested root and reconciles the merged result set.
///
/// Resolving the same coordinate set twice is idempotent - everything the
/// first run materialized is served from the local repository afterwards.
pub struct MavenResolver {
    engine: ResolutionEngine,
}

impl MavenResolver {
    pub fn new(
        local: LocalRepository,
        remotes: Vec<RemoteRepository>,
    ) -> Result<MavenResolver, ResolutionError> {
        Ok(MavenResolver {
            engine: ResolutionEngine::new(local, remotes)?,
        })
    }

    pub fn from_config(config: ResolverConfig) -> Result<MavenResolver, ResolutionError> {
        MavenResolver::new(config.local, config.remotes)
    }

    pub fn from_config_file(path: &Path) -> Result<MavenResolver, ResolutionError> {
        let file = File::open(path).map_err(|e| {
            ResolutionError::Configuration(format!("cannot open '{}': {}", path.display(), e))
        })?;
        MavenResolver::from_config(parse_resolver_config(BufReader::new(file))?)
    }

    /// Resolves the scope-filtered closure of every requested coordinate.
    ///
    /// An empty `scopes` slice selects the default resolving scopes
    /// {compile, runtime}. The result is in discovery order, reconciled to at
    /// most one artifact per identity-without-version across all roots.
    pub async fn resolve(
        &self,
        dependencies: Vec<Coordinate>,
        scopes: &[DependencyScope],
    ) -> Result<Vec<ResolvedArtifact>, ResolutionError> {
        if dependencies.is_empty() {
            return Ok(Vec::new());
        }
        let scope_filter: HashSet<DependencyScope> = if scopes.is_empty() {
            DependencyScope::default_resolving_scopes()
        } else {
            scopes.iter().copied().collect()
        };

        let mut collected = Vec::new();
        for coordinate in dependencies {
            collected.extend(self.engine.resolve_closure(coordinate, &scope_filter).await?);
        }
        Ok(reconcile(collected))
    }

    /// Convenience entry taking colon-delimited dependency ids.
    pub async fn resolve_ids(
        &self,
        ids: &[&str],
        scopes: &[DependencyScope],
    ) -> Result<Vec<ResolvedArtifact>, ResolutionError> {
        let dependencies = ids
            .iter()
            .map(|id| Coordinate::parse(id))
            .collect::<Result<Vec<_>, _>>()?;
        self.resolve(dependencies, scopes).await
    }
}

/// One pass over the complete result set: among artifacts sharing
/// `group:artifact:classifier:extension`, the most recently updated one wins;
/// on equal timestamps the artifact seen first stays. Discovery order is
/// preserved.
fn reconcile(artifacts: Vec<ResolvedArtifact>) -> Vec<ResolvedArtifact> {
    let mut reconciled: Vec<ResolvedArtifact> = Vec::with_capacity(artifacts.len());
    let mut index_by_id: HashMap<String, usize> = HashMap::new();
    for artifact in artifacts {
        let id = artifact.reconciliation_id();
        if let Some(&index) = index_by_id.get(&id) {
            if artifact.updated_time > reconciled[index].updated_time {
                reconciled[index] = artifact;
            }
        } else {
            index_by_id.insert(id, reconciled.len());
            reconciled.push(artifact);
        }
    }
    reconciled
}
