use std::path::{Path, PathBuf};
use std::pin::Pin;

use bytes::Bytes;
use futures::StreamExt;
use futures_core::Stream;
use hex::FromHex;
use hyper::client::HttpConnector;
use hyper::header::{CONTENT_LENGTH, USER_AGENT};
use hyper::{Body, Client, HeaderMap, Request, StatusCode, Uri};
use hyper_tls::HttpsConnector;
use tokio::fs::{create_dir_all, remove_file, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{info, trace, warn};

use crate::maven::coordinates::Coordinate;
use crate::maven::error::ResolutionError;
use crate::maven::paths;
use crate::maven::repository::Repository;
use crate::util::validating_http_body::{
    BodyValidator, Md5BodyValidator, Sha1BodyValidator, ValidatingHttpBody,
};

const MAX_ATTEMPTS: usize = 5;

/// Downloads smaller than this are considered corrupt rather than plausible
/// artifacts or descriptors.
const MIN_PLAUSIBLE_SIZE: u64 = 100;

// Maven Central returns a 403 for requests without a user agent
const DOWNLOAD_USER_AGENT: &str = concat!("artifetch/", env!("CARGO_PKG_VERSION"));

type ByteStream = Pin<Box<dyn Stream<Item = anyhow::Result<Bytes>> + Send>>;

/// Fetches repository sub-paths into local destination files, with existence
/// probing, retry and size/integrity validation.
///
/// Instances cache HTTP connections internally, so keeping one alive for a
/// whole resolution session has performance benefits.
pub struct Transport {
    client: Client<HttpsConnector<HttpConnector>>,
}

impl Transport {
    pub fn new() -> Transport {
        Transport {
            client: Client::builder().build::<_, Body>(HttpsConnector::new()),
        }
    }

    /// Fetches one file of `coordinate` from `repository` into the standard
    /// layout below `destination_dir`.
    ///
    /// The probe file name builds the source location, the materialize file
    /// name the destination - they differ only between the actual and the
    /// declared version of snapshot coordinates.
    ///
    /// `Ok(None)` means the repository does not have the file; callers treat
    /// that as "try the next repository", never as a failure.
    pub async fn fetch(
        &self,
        repository: &Repository,
        coordinate: &Coordinate,
        destination_dir: &Path,
        probe_file_name: &str,
        materialize_file_name: &str,
    ) -> Result<Option<PathBuf>, ResolutionError> {
        let parent_path = paths::parent_path(coordinate);
        let location = format!("{}{}{}", repository.url(), parent_path, probe_file_name);

        if !self.probe(&location).await? {
            trace!("'{}' not present", location);
            return Ok(None);
        }

        let destination = destination_dir
            .join(&parent_path)
            .join(materialize_file_name);

        // a file source that already is the destination needs no copy
        if let Some(source_path) = local_file_path(&location) {
            if is_same_file_target(&source_path, &destination) {
                return Ok(Some(destination));
            }
        }

        if let Some(parent) = destination.parent() {
            create_dir_all(parent)
                .await
                .map_err(|e| ResolutionError::download_failed(&location, e.into()))?;
        }

        info!("downloading '{}'", location);
        let mut last_cause = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.transfer(&location, &destination).await {
                Ok(()) => return Ok(Some(destination)),
                Err(cause) => {
                    warn!(
                        "download of '{}' failed (attempt {}/{}): {:#}",
                        location, attempt, MAX_ATTEMPTS, cause
                    );
                    let _ = remove_file(&destination).await;
                    last_cause = Some(cause);
                }
            }
        }

        // no partial file may survive retry exhaustion
        let _ = remove_file(&destination).await;
        Err(ResolutionError::download_failed(
            &location,
            last_cause.unwrap_or_else(|| anyhow::Error::msg("retries exhausted")),
        ))
    }

    async fn probe(&self, location: &str) -> Result<bool, ResolutionError> {
        if let Some(path) = local_file_path(location) {
            return Ok(tokio::fs::try_exists(&path).await.unwrap_or(false));
        }

        let request = get_request(location)
            .map_err(|e| ResolutionError::download_failed(location, e))?;
        trace!("probing {:?}", location);
        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| ResolutionError::download_failed(location, e.into()))?;
        Ok(response.status() == StatusCode::OK)
    }

    /// One download attempt: stream the source to the destination file and
    /// apply length and integrity checks.
    async fn transfer(&self, location: &str, destination: &Path) -> anyhow::Result<()> {
        let (mut stream, expected_length): (ByteStream, Option<u64>) =
            if let Some(source_path) = local_file_path(location) {
                let file = tokio::fs::File::open(&source_path).await?;
                let stream = ReaderStream::new(file).map(|chunk| chunk.map_err(anyhow::Error::from));
                (Box::pin(stream), None)
            } else {
                let response = self.client.request(get_request(location)?).await?;
                if response.status() != StatusCode::OK {
                    anyhow::bail!("unexpected HTTP status {}", response.status());
                }
                let expected_length = content_length(response.headers());
                let validators = checksum_validators(response.headers());
                let stream = ValidatingHttpBody::new(response.into_body(), validators);
                (Box::pin(stream), expected_length)
            };

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(destination)
            .await?;

        let mut total: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            total += chunk.len() as u64;
        }
        file.flush().await?;

        if let Some(expected) = expected_length {
            if total != expected {
                anyhow::bail!("incomplete download: expected {} bytes, got {}", expected, total);
            }
        }
        if total < MIN_PLAUSIBLE_SIZE {
            anyhow::bail!("downloaded file too small to be valid ({} bytes)", total);
        }
        Ok(())
    }
}

impl Default for Transport {
    fn default() -> Transport {
        Transport::new()
    }
}

fn get_request(location: &str) -> anyhow::Result<Request<Body>> {
    Ok(Request::builder()
        .method("GET")
        .uri(Uri::try_from(location)?)
        .header(USER_AGENT, DOWNLOAD_USER_AGENT)
        .body(Body::empty())?)
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
}

/// Harvests digests some repository servers announce in response headers.
/// Values that do not decode as the expected digest width are ignored.
fn checksum_validators(headers: &HeaderMap) -> Vec<Box<dyn BodyValidator>> {
    let mut validators: Vec<Box<dyn BodyValidator>> = Vec::new();

    let sha1_string = headers
        .get("x-checksum-sha1")
        .or_else(|| headers.get("x-goog-meta-checksum-sha1"))
        .or_else(|| headers.get("etag"))
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            // etags come double-quoted
            if value.len() == 42 {
                &value[1..41]
            } else {
                value
            }
        });
    if let Some(sha1) = sha1_string {
        match <[u8; 20]>::from_hex(sha1) {
            Ok(expected) => validators.push(Box::new(Sha1BodyValidator::new(expected))),
            Err(_) => trace!("ignoring undecodable sha1 header value {:?}", sha1),
        }
    }

    let md5_string = headers
        .get("x-checksum-md5")
        .or_else(|| headers.get("x-goog-meta-checksum-md5"))
        .and_then(|value| value.to_str().ok());
    if let Some(md5) = md5_string {
        match <[u8; 16]>::from_hex(md5) {
            Ok(expected) => validators.push(Box::new(Md5BodyValidator::new(expected))),
            Err(_) => trace!("ignoring undecodable md5 header value {:?}", md5),
        }
    }

    validators
}

fn local_file_path(location: &str) -> Option<PathBuf> {
    location.strip_prefix("file://").map(PathBuf::from)
}

fn is_same_file_target(source: &Path, destination: &Path) -> bool {
    match (std::path::absolute(source), std::path::absolute(destination)) {
        (Ok(source), Ok(destination)) => source == destination,
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;
    use crate::maven::repository::{LocalRepository, RemoteRepository};

    fn remote_repo(dir: &Path) -> Repository {
        Repository::Remote(
            RemoteRepository::new(
                "file-remote",
                format!("file://{}", dir.display()),
                HashSet::new(),
            )
            .unwrap(),
        )
    }

    fn coordinate() -> Coordinate {
        Coordinate::parse("org.example:ok:1.0").unwrap()
    }

    fn seed_remote(dir: &Path, file_name: &str, size: usize) -> PathBuf {
        let parent = dir.join("org/example/ok/1.0");
        std::fs::create_dir_all(&parent).unwrap();
        let file = parent.join(file_name);
        std::fs::write(&file, vec![b'x'; size]).unwrap();
        file
    }

    #[tokio::test]
    async fn test_fetch_materializes_file() {
        let remote_dir = tempfile::tempdir().unwrap();
        let local_dir = tempfile::tempdir().unwrap();
        seed_remote(remote_dir.path(), "ok-1.0.jar", 256);

        let transport = Transport::new();
        let fetched = transport
            .fetch(
                &remote_repo(remote_dir.path()),
                &coordinate(),
                local_dir.path(),
                "ok-1.0.jar",
                "ok-1.0.jar",
            )
            .await
            .unwrap()
            .expect("file should be served");

        assert_eq!(
            fetched,
            local_dir.path().join("org/example/ok/1.0/ok-1.0.jar")
        );
        assert_eq!(std::fs::metadata(&fetched).unwrap().len(), 256);
    }

    #[tokio::test]
    async fn test_fetch_absent_is_not_an_error() {
        let remote_dir = tempfile::tempdir().unwrap();
        let local_dir = tempfile::tempdir().unwrap();

        let transport = Transport::new();
        let fetched = transport
            .fetch(
                &remote_repo(remote_dir.path()),
                &coordinate(),
                local_dir.path(),
                "ok-1.0.jar",
                "ok-1.0.jar",
            )
            .await
            .unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_fetch_same_path_is_idempotent() {
        let local_dir = tempfile::tempdir().unwrap();
        let existing = seed_remote(local_dir.path(), "ok-1.0.jar", 4); // below the floor on purpose

        let local = Repository::Local(LocalRepository::new(
            "local",
            local_dir.path(),
            HashSet::new(),
        ));
        let transport = Transport::new();
        let fetched = transport
            .fetch(
                &local,
                &coordinate(),
                local_dir.path(),
                "ok-1.0.jar",
                "ok-1.0.jar",
            )
            .await
            .unwrap()
            .expect("cache hit");

        // no copy happened, the tiny file is untouched and accepted
        assert_eq!(std::path::absolute(&fetched).unwrap(), std::path::absolute(&existing).unwrap());
        assert_eq!(std::fs::metadata(&fetched).unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_fetch_rejects_implausibly_small_files() {
        let remote_dir = tempfile::tempdir().unwrap();
        let local_dir = tempfile::tempdir().unwrap();
        seed_remote(remote_dir.path(), "ok-1.0.jar", 10);

        let transport = Transport::new();
        let result = transport
            .fetch(
                &remote_repo(remote_dir.path()),
                &coordinate(),
                local_dir.path(),
                "ok-1.0.jar",
                "ok-1.0.jar",
            )
            .await;

        assert!(matches!(
            result,
            Err(ResolutionError::DownloadFailed { .. })
        ));
        // no partial file left behind
        assert!(!local_dir
            .path()
            .join("org/example/ok/1.0/ok-1.0.jar")
            .exists());
    }

    #[test]
    fn test_checksum_validators_skip_undecodable_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("etag", "\"not-a-sha1-hash\"".parse().unwrap());
        headers.insert("x-checksum-md5", "zzzz".parse().unwrap());
        assert!(checksum_validators(&headers).is_empty());

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-checksum-sha1",
            "da39a3ee5e6b4b0d3255bfef95601890afd80709".parse().unwrap(),
        );
        headers.insert(
            "x-checksum-md5",
            "d41d8cd98f00b204e9800998ecf8427e".parse().unwrap(),
        );
        assert_eq!(checksum_validators(&headers).len(), 2);
    }
}
