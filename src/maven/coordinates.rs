use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use chrono::NaiveDateTime;

use crate::maven::error::ResolutionError;
use crate::maven::repository::Repository;
use crate::maven::scope::DependencyScope;

pub const DEFAULT_EXTENSION: &str = "jar";

const ID_DELIMITER: char = ':';

/// Identity of a dependency request.
///
/// Equality and hashing are structural over the five identity fields; `scope`
/// is deliberately excluded so identity sets deduplicate across scopes.
#[derive(Debug, Clone)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub extension: String,
    pub classifier: String,
    pub version: String,
    pub scope: DependencyScope,
}

impl Coordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        extension: Option<String>,
        classifier: Option<String>,
        version: impl Into<String>,
        scope: DependencyScope,
    ) -> Coordinate {
        Coordinate {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            extension: extension.unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
            classifier: classifier.unwrap_or_default(),
            version: version.into(),
            scope,
        }
    }

    /// Parses `groupId:artifactId[:extension[:classifier]]:version`.
    pub fn parse(id: &str) -> Result<Coordinate, ResolutionError> {
        Coordinate::parse_with_scope(id, DependencyScope::DEFAULT)
    }

    pub fn parse_with_scope(id: &str, scope: DependencyScope) -> Result<Coordinate, ResolutionError> {
        let parts: Vec<&str> = id.split(ID_DELIMITER).collect();
        let (group_id, artifact_id, extension, classifier, version) = match parts.as_slice() {
            [g, a, v] => (*g, *a, None, None, *v),
            [g, a, e, v] => (*g, *a, Some(e.to_string()), None, *v),
            [g, a, e, c, v] => (*g, *a, Some(e.to_string()), Some(c.to_string()), *v),
            _ => return Err(ResolutionError::InvalidCoordinate(id.to_string())),
        };
        if group_id.is_empty() || artifact_id.is_empty() || version.is_empty() {
            return Err(ResolutionError::InvalidCoordinate(id.to_string()));
        }
        Ok(Coordinate::new(
            group_id,
            artifact_id,
            extension,
            classifier,
            version,
            scope,
        ))
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Coordinate) -> bool {
        self.group_id == other.group_id
            && self.artifact_id == other.artifact_id
            && self.extension == other.extension
            && self.classifier == other.classifier
            && self.version == other.version
    }
}

impl Eq for Coordinate {}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group_id.hash(state);
        self.artifact_id.hash(state);
        self.extension.hash(state);
        self.classifier.hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.extension)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}

/// A coordinate a repository has agreed to serve: the version to actually
/// fetch has been determined and the descriptor's own dependency list is
/// attached. Engine functions return `Option<ResolvedCoordinate>`, `None`
/// meaning "this repository cannot serve it".
#[derive(Debug, Clone)]
pub struct ResolvedCoordinate {
    pub coordinate: Coordinate,
    pub actual_version: String,
    pub updated_time: NaiveDateTime,
    pub source_repository: Repository,
    pub dependencies: Vec<Coordinate>,
}

/// The terminal product of resolution: a coordinate materialized on disk.
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    pub coordinate: Coordinate,
    pub actual_version: String,
    pub updated_time: NaiveDateTime,
    /// Name of the repository that served the bytes.
    pub repository: String,
    pub dependencies: Vec<Coordinate>,
    pub file: PathBuf,
}

impl ResolvedArtifact {
    /// Reconciliation key: identity without the version, so at most one file
    /// per artifact identity survives the final result set.
    pub fn reconciliation_id(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.coordinate.group_id,
            self.coordinate.artifact_id,
            self.coordinate.classifier,
            self.coordinate.extension,
        )
    }
}
