use std::collections::HashMap;
use std::io::Read;

use lazy_static::lazy_static;
use regex::Regex;

use crate::maven::coordinates::Coordinate;
use crate::maven::error::ResolutionError;
use crate::maven::scope::DependencyScope;
use crate::util::element_path::{walk_document, ElementHandler, ElementPath};

lazy_static! {
    // a version string that is a property reference in its entirety
    static ref PROPERTY_REGEX: Regex = Regex::new(r"^\$\{([^}]+)\}$").unwrap();
}

const PATH_PROPERTIES: [&str; 2] = ["project", "properties"];
const PATH_DEPENDENCY: [&str; 3] = ["project", "dependencies", "dependency"];

/// The slice of a project descriptor this engine cares about: the property
/// map and the direct dependency list.
#[derive(Debug)]
pub struct ProjectDescriptor {
    pub properties: HashMap<String, String>,
    pub dependencies: Vec<Coordinate>,
}

pub fn parse_project_descriptor<R: Read>(input: R) -> Result<ProjectDescriptor, ResolutionError> {
    let mut handler = ProjectDescriptorHandler::default();
    walk_document(input, &mut handler).map_err(into_descriptor_error)?;

    let ProjectDescriptorHandler {
        properties,
        mut dependencies,
        ..
    } = handler;

    // Single non-partial-match substitution rule: only a version that is
    // exactly `${name}` is rewritten; mixed text stays literal, and so does
    // a reference to a property the descriptor never defines.
    for dependency in &mut dependencies {
        let substituted = PROPERTY_REGEX
            .captures(&dependency.version)
            .and_then(|captures| properties.get(&captures[1]))
            .cloned();
        if let Some(version) = substituted {
            dependency.version = version;
        }
    }

    Ok(ProjectDescriptor {
        properties,
        dependencies,
    })
}

fn into_descriptor_error(error: anyhow::Error) -> ResolutionError {
    match error.downcast::<ResolutionError>() {
        Ok(resolution_error) => resolution_error,
        Err(other) => ResolutionError::MalformedDescriptor(format!("{:#}", other)),
    }
}

#[derive(Default)]
struct ProjectDescriptorHandler {
    properties: HashMap<String, String>,
    dependencies: Vec<Coordinate>,
    group_id: Option<String>,
    artifact_id: Option<String>,
    extension: Option<String>,
    classifier: Option<String>,
    version: Option<String>,
    scope: Option<String>,
}

impl ElementHandler for ProjectDescriptorHandler {
    fn text(&mut self, path: &ElementPath, text: &str) -> anyhow::Result<()> {
        if path.parent_matches(&PATH_PROPERTIES) {
            if let Some(name) = path.current() {
                self.properties.insert(name.to_string(), text.to_string());
            }
        } else if path.parent_matches(&PATH_DEPENDENCY) {
            let value = Some(text.to_string());
            match path.current() {
                Some("groupId") => self.group_id = value,
                Some("artifactId") => self.artifact_id = value,
                Some("extension") => self.extension = value,
                Some("classifier") => self.classifier = value,
                Some("version") => self.version = value,
                Some("scope") => self.scope = value,
                _ => {}
            }
        }
        Ok(())
    }

    fn end_element(&mut self, path: &ElementPath) -> anyhow::Result<()> {
        if path.matches(&PATH_DEPENDENCY) {
            let group_id = self
                .group_id
                .take()
                .ok_or_else(|| missing_field("groupId"))?;
            let artifact_id = self
                .artifact_id
                .take()
                .ok_or_else(|| missing_field("artifactId"))?;
            let version = self.version.take().ok_or_else(|| missing_field("version"))?;
            let scope = match self.scope.take() {
                Some(name) => DependencyScope::parse(&name)?,
                None => DependencyScope::DEFAULT,
            };
            self.dependencies.push(Coordinate::new(
                group_id,
                artifact_id,
                self.extension.take(),
                self.classifier.take(),
                version,
                scope,
            ));
        }
        Ok(())
    }
}

fn missing_field(field: &str) -> anyhow::Error {
    anyhow::Error::new(ResolutionError::MalformedDescriptor(format!(
        "dependency entry is missing <{}>",
        field
    )))
}
