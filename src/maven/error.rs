use thiserror::Error;

use crate::maven::coordinates::Coordinate;

/// Everything that can go wrong during a resolution run.
///
/// Absence of a file at a single repository is never an error - it is reported
/// as `Ok(None)` by the transport and drives fallback iteration. Only chain
/// exhaustion, malformed descriptors and invalid caller input surface here.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("invalid dependency scope '{0}'")]
    InvalidScope(String),

    #[error("invalid dependency coordinate '{0}'")]
    InvalidCoordinate(String),

    #[error("'{0}' is not a snapshot version")]
    NotASnapshot(String),

    #[error("malformed descriptor: {0}")]
    MalformedDescriptor(String),

    #[error("invalid url '{url}' for repository '{name}'")]
    InvalidRepositoryUrl { name: String, url: String },

    #[error("duplicate repository name '{0}'")]
    DuplicateRepositoryName(String),

    #[error("cannot load resolver configuration: {0}")]
    Configuration(String),

    #[error("failed to download '{location}'")]
    DownloadFailed {
        location: String,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("cannot resolve dependency '{coordinate}'")]
    UnresolvableDependency {
        coordinate: Coordinate,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("cannot acquire artifact for '{coordinate}'")]
    UnresolvableArtifact { coordinate: Coordinate },
}

impl ResolutionError {
    pub fn download_failed(location: impl Into<String>, cause: anyhow::Error) -> ResolutionError {
        ResolutionError::DownloadFailed {
            location: location.into(),
            cause: cause.into(),
        }
    }

    pub fn unresolvable(coordinate: &Coordinate, cause: Option<anyhow::Error>) -> ResolutionError {
        ResolutionError::UnresolvableDependency {
            coordinate: coordinate.clone(),
            cause: cause.map(Into::into),
        }
    }

    /// Repository-local transport failures are converted by the engine into
    /// "try the next repository"; everything else aborts the resolution.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, ResolutionError::DownloadFailed { .. })
    }
}
