use std::io::Read;

use chrono::NaiveDateTime;

use crate::maven::error::ResolutionError;
use crate::util::element_path::{walk_document, ElementHandler, ElementPath};

const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";
const LAST_UPDATED_FORMAT: &str = "%Y%m%d%H%M%S";

const PATH_VERSION: [&str; 2] = ["metadata", "version"];
const PATH_LAST_UPDATED: [&str; 3] = ["metadata", "versioning", "lastUpdated"];
const PATH_SNAPSHOT_TIMESTAMP: [&str; 4] = ["metadata", "versioning", "snapshot", "timestamp"];
const PATH_SNAPSHOT_BUILD_NUMBER: [&str; 4] = ["metadata", "versioning", "snapshot", "buildNumber"];

/// The slice of `maven-metadata.xml` that maps a snapshot's declared version
/// to its actual, timestamped one.
#[derive(Debug, Default)]
pub struct VersioningMetadata {
    version: Option<String>,
    last_updated: Option<NaiveDateTime>,
    snapshot_timestamp: Option<String>,
    snapshot_build_number: Option<String>,
}

impl VersioningMetadata {
    pub fn last_updated(&self) -> Result<NaiveDateTime, ResolutionError> {
        self.last_updated.ok_or_else(|| {
            ResolutionError::MalformedDescriptor("metadata is missing lastUpdated".to_string())
        })
    }

    /// `base-timestamp-buildNumber`, where the declared version must end in
    /// `-SNAPSHOT` (case-insensitively) for the mapping to make sense.
    pub fn actual_version(&self) -> Result<String, ResolutionError> {
        let version = self.require("version", &self.version)?;
        let timestamp = self.require("snapshot timestamp", &self.snapshot_timestamp)?;
        let build_number = self.require("snapshot buildNumber", &self.snapshot_build_number)?;

        if !version.to_uppercase().ends_with(SNAPSHOT_SUFFIX) {
            return Err(ResolutionError::NotASnapshot(version.to_string()));
        }
        let base = &version[..version.len() - SNAPSHOT_SUFFIX.len()];
        Ok(format!("{}-{}-{}", base, timestamp, build_number))
    }

    fn require<'a>(
        &self,
        what: &str,
        field: &'a Option<String>,
    ) -> Result<&'a str, ResolutionError> {
        field.as_deref().ok_or_else(|| {
            ResolutionError::MalformedDescriptor(format!("metadata is missing {}", what))
        })
    }
}

pub fn parse_versioning_metadata<R: Read>(input: R) -> Result<VersioningMetadata, ResolutionError> {
    let mut handler = MetadataHandler {
        metadata: VersioningMetadata::default(),
    };
    walk_document(input, &mut handler).map_err(|error| {
        ResolutionError::MalformedDescriptor(format!("{:#}", error))
    })?;
    Ok(handler.metadata)
}

struct MetadataHandler {
    metadata: VersioningMetadata,
}

impl ElementHandler for MetadataHandler {
    fn text(&mut self, path: &ElementPath, text: &str) -> anyhow::Result<()> {
        if path.matches(&PATH_VERSION) {
            self.metadata.version = Some(text.to_string());
        } else if path.matches(&PATH_LAST_UPDATED) {
            let parsed = NaiveDateTime::parse_from_str(text, LAST_UPDATED_FORMAT)
                .map_err(|e| anyhow::anyhow!("invalid lastUpdated '{}': {}", text, e))?;
            self.metadata.last_updated = Some(parsed);
        } else if path.matches(&PATH_SNAPSHOT_TIMESTAMP) {
            self.metadata.snapshot_timestamp = Some(text.to_string());
        } else if path.matches(&PATH_SNAPSHOT_BUILD_NUMBER) {
            self.metadata.snapshot_build_number = Some(text.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use chrono::{NaiveDate, NaiveDateTime};
    use rstest::*;

    use super::*;

    const METADATA: &str = r#"<metadata>
        <groupId>g</groupId>
        <artifactId>a</artifactId>
        <version>1.0-SNAPSHOT</version>
        <versioning>
            <lastUpdated>20240101120000</lastUpdated>
            <snapshot>
                <timestamp>20240101120000</timestamp>
                <buildNumber>3</buildNumber>
            </snapshot>
        </versioning>
    </metadata>"#;

    fn timestamp(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_actual_version() {
        let metadata = parse_versioning_metadata(METADATA.as_bytes()).unwrap();
        assert_eq!(metadata.actual_version().unwrap(), "1.0-20240101120000-3");
        assert_eq!(
            metadata.last_updated().unwrap(),
            timestamp(2024, 1, 1, 12, 0, 0)
        );
    }

    #[rstest]
    #[case::lowercase("1.0-snapshot")]
    #[case::mixed_case("1.0-SnapShot")]
    fn test_actual_version_case_insensitive_suffix(#[case] version: &str) {
        let xml = METADATA.replace("1.0-SNAPSHOT", version);
        let metadata = parse_versioning_metadata(xml.as_bytes()).unwrap();
        assert_eq!(metadata.actual_version().unwrap(), "1.0-20240101120000-3");
    }

    #[rstest]
    #[case::release("1.0")]
    #[case::suffix_mid_string("1.0-SNAPSHOT-rc1")]
    fn test_actual_version_not_a_snapshot(#[case] version: &str) {
        let xml = METADATA.replace("1.0-SNAPSHOT", version);
        let metadata = parse_versioning_metadata(xml.as_bytes()).unwrap();
        assert!(matches!(
            metadata.actual_version(),
            Err(ResolutionError::NotASnapshot(_))
        ));
    }

    #[test]
    fn test_missing_snapshot_fields() {
        let xml = r#"<metadata>
            <version>1.0-SNAPSHOT</version>
            <versioning><lastUpdated>20240101120000</lastUpdated></versioning>
        </metadata>"#;
        let metadata = parse_versioning_metadata(xml.as_bytes()).unwrap();
        assert!(matches!(
            metadata.actual_version(),
            Err(ResolutionError::MalformedDescriptor(_))
        ));
    }

    #[test]
    fn test_missing_last_updated() {
        let metadata = parse_versioning_metadata("<metadata/>".as_bytes()).unwrap();
        assert!(matches!(
            metadata.last_updated(),
            Err(ResolutionError::MalformedDescriptor(_))
        ));
    }

    #[rstest]
    #[case::not_a_timestamp("yesterday")]
    #[case::too_short("202401")]
    fn test_invalid_last_updated(#[case] value: &str) {
        let xml = METADATA.replace("20240101120000</lastUpdated>", &format!("{}</lastUpdated>", value));
        assert!(matches!(
            parse_versioning_metadata(xml.as_bytes()),
            Err(ResolutionError::MalformedDescriptor(_))
        ));
    }
}
