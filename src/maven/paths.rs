use crate::maven::coordinates::Coordinate;

pub const DESCRIPTOR_EXTENSION: &str = "pom";
pub const METADATA_FILE_NAME: &str = "maven-metadata.xml";

/// Directory of a coordinate inside a repository in standard layout:
/// `group/artifact/version/` with group dots replaced by slashes. The
/// declared version names the directory even for snapshots; only file names
/// carry the timestamped actual version.
pub fn parent_path(coordinate: &Coordinate) -> String {
    format!(
        "{}/{}/{}/",
        coordinate.group_id.replace('.', "/"),
        coordinate.artifact_id,
        coordinate.version,
    )
}

/// `artifact-version[-classifier].extension`
pub fn artifact_file_name(coordinate: &Coordinate, version: &str) -> String {
    file_name(
        &coordinate.artifact_id,
        version,
        &coordinate.classifier,
        &coordinate.extension,
    )
}

/// The project descriptor sitting next to the artifact.
pub fn descriptor_file_name(coordinate: &Coordinate, version: &str) -> String {
    file_name(
        &coordinate.artifact_id,
        version,
        &coordinate.classifier,
        DESCRIPTOR_EXTENSION,
    )
}

fn file_name(artifact_id: &str, version: &str, classifier: &str, extension: &str) -> String {
    let mut name = format!("{}-{}", artifact_id, version);
    if !classifier.is_empty() {
        name.push('-');
        name.push_str(classifier);
    }
    name.push('.');
    name.push_str(extension);
    name
}

#[cfg(test)]
mod test {
    use rstest::*;

    use super::*;
    use crate::maven::coordinates::Coordinate;

    #[rstest]
    #[case::plain("org.apache.commons:commons-text:1.0", "org/apache/commons/commons-text/1.0/")]
    #[case::single_segment_group("junit:junit:4.13", "junit/junit/4.13/")]
    #[case::snapshot("g:a:1.0-SNAPSHOT", "g/a/1.0-SNAPSHOT/")]
    fn test_parent_path(#[case] id: &str, #[case] expected: &str) {
        let coordinate = Coordinate::parse(id).unwrap();
        assert_eq!(parent_path(&coordinate), expected);
    }

    #[rstest]
    #[case::plain("g:a:1.0", "1.0", "a-1.0.jar")]
    #[case::classifier("g:a:jar:sources:1.0", "1.0", "a-1.0-sources.jar")]
    #[case::actual_version("g:a:1.0-SNAPSHOT", "1.0-20240101120000-3", "a-1.0-20240101120000-3.jar")]
    #[case::extension("g:a:zip:1.0", "1.0", "a-1.0.zip")]
    fn test_artifact_file_name(#[case] id: &str, #[case] version: &str, #[case] expected: &str) {
        let coordinate = Coordinate::parse(id).unwrap();
        assert_eq!(artifact_file_name(&coordinate, version), expected);
    }

    #[test]
    fn test_descriptor_file_name_keeps_classifier() {
        let coordinate = Coordinate::parse("g:a:jar:sources:1.0").unwrap();
        assert_eq!(descriptor_file_name(&coordinate, "1.0"), "a-1.0-sources.pom");
    }
}
