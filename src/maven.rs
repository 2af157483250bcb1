pub mod config_xml;
pub mod coordinates;
pub mod engine;
pub mod error;
pub mod metadata_xml;
pub mod paths;
pub mod pom_xml;
pub mod repository;
pub mod resolver;
pub mod scope;
pub mod transport;

pub use self::coordinates::{Coordinate, ResolvedArtifact, ResolvedCoordinate};
pub use self::error::ResolutionError;
pub use self::repository::{LocalRepository, RemoteRepository, Repository, RepositoryPolicy};
pub use self::resolver::MavenResolver;
pub use self::scope::DependencyScope;
