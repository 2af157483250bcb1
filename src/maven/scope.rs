use std::collections::HashSet;
use std::fmt;

use crate::maven::error::ResolutionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyScope {
    Compile,
    Provided,
    System,
    Runtime,
    Test,
}

impl DependencyScope {
    pub const DEFAULT: DependencyScope = DependencyScope::Compile;

    const ALL: [DependencyScope; 5] = [
        DependencyScope::Compile,
        DependencyScope::Provided,
        DependencyScope::System,
        DependencyScope::Runtime,
        DependencyScope::Test,
    ];

    pub fn actual_name(&self) -> &'static str {
        match self {
            DependencyScope::Compile => "compile",
            DependencyScope::Provided => "provided",
            DependencyScope::System => "system",
            DependencyScope::Runtime => "runtime",
            DependencyScope::Test => "test",
        }
    }

    pub fn parse(actual_name: &str) -> Result<DependencyScope, ResolutionError> {
        DependencyScope::ALL
            .iter()
            .copied()
            .find(|scope| scope.actual_name() == actual_name)
            .ok_or_else(|| ResolutionError::InvalidScope(actual_name.to_string()))
    }

    /// The scopes resolved when the caller does not supply an explicit filter.
    pub fn default_resolving_scopes() -> HashSet<DependencyScope> {
        [DependencyScope::Compile, DependencyScope::Runtime]
            .into_iter()
            .collect()
    }
}

impl fmt::Display for DependencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.actual_name())
    }
}
