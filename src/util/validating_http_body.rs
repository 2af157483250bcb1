use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::{ready, Stream};
use hyper::Body;
use pin_project_lite::pin_project;
use sha1::{Digest, Sha1};
use tracing::trace;

/// Wraps an HTTP body so it can be consumed chunk by chunk without
/// materializing it, while still performing validation that needs the entire
/// body (digest checks announced in response headers).
///
/// Contract: once a chunk with an error was returned, the stream stops
/// polling upstream and keeps returning an error.
pin_project! {
    pub struct ValidatingHttpBody {
        #[pin]
        http_body: Body,
        validators: Vec<Box<dyn BodyValidator>>,
        is_failed: bool,
    }
}

impl ValidatingHttpBody {
    pub fn new(http_body: Body, validators: Vec<Box<dyn BodyValidator>>) -> ValidatingHttpBody {
        ValidatingHttpBody {
            http_body,
            validators,
            is_failed: false,
        }
    }
}

impl Stream for ValidatingHttpBody {
    type Item = anyhow::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.is_failed {
            return Poll::Ready(Some(Err(anyhow::Error::msg("polling from failed stream"))));
        }

        let this = self.project();
        let inner = ready!(this.http_body.poll_next(cx));
        match inner {
            Some(Ok(data)) => {
                for validator in this.validators.iter_mut() {
                    validator.add_data(&data);
                }
                Poll::Ready(Some(Ok(data)))
            }
            None => {
                // wrapped body fully drained - finalize validation
                for validator in this.validators.iter() {
                    if let Err(e) = validator.validate() {
                        *this.is_failed = true;
                        return Poll::Ready(Some(Err(e)));
                    }
                }
                Poll::Ready(None)
            }
            Some(Err(e)) => {
                *this.is_failed = true;
                Poll::Ready(Some(Err(e.into())))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.http_body.size_hint()
    }
}

pub trait BodyValidator: Send {
    fn add_data(&mut self, data: &Bytes);
    fn validate(&self) -> anyhow::Result<()>;
}

pub struct Sha1BodyValidator {
    hasher: Sha1,
    expected_hash: [u8; 20],
}

impl Sha1BodyValidator {
    pub fn new(expected_hash: [u8; 20]) -> Sha1BodyValidator {
        Sha1BodyValidator {
            hasher: Default::default(),
            expected_hash,
        }
    }
}

impl BodyValidator for Sha1BodyValidator {
    fn add_data(&mut self, data: &Bytes) {
        self.hasher.update(data);
    }

    fn validate(&self) -> anyhow::Result<()> {
        trace!("validating SHA1 hash");
        let hash: [u8; 20] = self.hasher.clone().finalize().into();
        if hash == self.expected_hash {
            Ok(())
        } else {
            Err(anyhow::Error::msg(format!(
                "SHA1 mismatch: expected {}, got {}",
                hex::encode(self.expected_hash),
                hex::encode(hash),
            )))
        }
    }
}

pub struct Md5BodyValidator {
    context: md5::Context,
    expected_hash: [u8; 16],
}

impl Md5BodyValidator {
    pub fn new(expected_hash: [u8; 16]) -> Md5BodyValidator {
        Md5BodyValidator {
            context: md5::Context::new(),
            expected_hash,
        }
    }
}

impl BodyValidator for Md5BodyValidator {
    fn add_data(&mut self, data: &Bytes) {
        self.context.consume(data);
    }

    fn validate(&self) -> anyhow::Result<()> {
        trace!("validating MD5 hash");
        let hash: [u8; 16] = self.context.clone().compute().into();
        if hash == self.expected_hash {
            Ok(())
        } else {
            Err(anyhow::Error::msg(format!(
                "MD5 mismatch: expected {}, got {}",
                hex::encode(self.expected_hash),
                hex::encode(hash),
            )))
        }
    }
}

#[cfg(test)]
mod test {
    use futures::StreamExt;
    use sha1::{Digest, Sha1};

    use super::*;

    fn sha1_of(data: &[u8]) -> [u8; 20] {
        let mut hasher = Sha1::new();
        hasher.update(data);
        hasher.finalize().into()
    }

    #[tokio::test]
    async fn test_matching_sha1_passes() {
        let payload = b"some artifact bytes";
        let body = Body::from(payload.as_slice());
        let mut stream = ValidatingHttpBody::new(
            body,
            vec![Box::new(Sha1BodyValidator::new(sha1_of(payload)))],
        );

        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, payload);
    }

    #[tokio::test]
    async fn test_mismatching_sha1_fails_at_end() {
        let body = Body::from("some artifact bytes");
        let mut stream =
            ValidatingHttpBody::new(body, vec![Box::new(Sha1BodyValidator::new([0u8; 20]))]);

        let first = stream.next().await.unwrap();
        assert!(first.is_ok());
        let last = stream.next().await.unwrap();
        assert!(last.is_err());
    }

    #[tokio::test]
    async fn test_mismatching_md5_fails_at_end() {
        let body = Body::from("some artifact bytes");
        let mut stream =
            ValidatingHttpBody::new(body, vec![Box::new(Md5BodyValidator::new([0u8; 16]))]);

        let mut failed = false;
        while let Some(chunk) = stream.next().await {
            if chunk.is_err() {
                failed = true;
                break;
            }
        }
        assert!(failed);
    }

    #[tokio::test]
    async fn test_no_validators_passes_everything_through() {
        let body = Body::from("unchecked");
        let mut stream = ValidatingHttpBody::new(body, Vec::new());
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(&chunk[..], b"unchecked");
        assert!(stream.next().await.is_none());
    }
}
