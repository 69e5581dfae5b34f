// MinIO Rust Library for Amazon S3 Compatible Cloud Storage
// Copyright 2025 MinIO, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Commits a fully uploaded session with CompleteMultipartUpload

use super::planner::UploadPlan;
use super::retry::RetryPolicy;
use super::session::UploadSession;
use crate::s3::error::{Operation, TransportError, UploadErrorKind};
use crate::s3::gateway::{
    CompleteMultipartUploadRequest, CompletedPart, HeadObjectOutput, HeadObjectRequest,
    TransportGateway,
};
use crate::s3::utils::{multipart_etag, trim_etag};

/// A committed object as reported by the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    pub location: Option<String>,
    pub etag: String,
    pub version_id: Option<String>,
    /// Composite checksum reported by CompleteMultipartUpload. Not known for
    /// reconciled commits.
    pub checksum: Option<String>,
    /// The commit was confirmed by an existence check rather than by a
    /// CompleteMultipartUpload response.
    pub reconciled: bool,
}

/// What the target key held before the multipart upload was created.
///
/// An existence check only proves a commit when the object it finds differs
/// from this one: a key that already held the same bytes carries the same
/// ETag before and after.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PriorObject {
    #[default]
    Absent,
    Present(HeadObjectOutput),
    /// The lookup failed. No commit can be confirmed by an existence check.
    Unknown,
}

impl PriorObject {
    pub async fn lookup(gateway: &dyn TransportGateway, bucket: &str, key: &str) -> Self {
        let request = HeadObjectRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
        };
        match gateway.head_object(request).await {
            Ok(Some(head)) => PriorObject::Present(head),
            Ok(None) => PriorObject::Absent,
            Err(e) => {
                log::warn!("lookup of existing object {bucket}/{key} failed: {e}");
                PriorObject::Unknown
            }
        }
    }

    /// Returns `true` if `head` cannot be the object that was there before.
    fn is_replaced_by(&self, head: &HeadObjectOutput) -> bool {
        match self {
            PriorObject::Absent => true,
            PriorObject::Unknown => false,
            PriorObject::Present(prior) => {
                trim_etag(&prior.etag) != trim_etag(&head.etag)
                    || prior.version_id != head.version_id
            }
        }
    }
}

/// Builds the ordered part list of `session` and commits it.
///
/// Transient failures are retried within `policy`. Before each retry the
/// object is looked up: if it carries the ETag the parts produce and is not
/// the `prior` object, an earlier attempt committed and its lost response is
/// not retried.
pub async fn complete(
    gateway: &dyn TransportGateway,
    session: &UploadSession,
    plan: &UploadPlan,
    prior: &PriorObject,
    policy: &RetryPolicy,
) -> Result<Commit, UploadErrorKind> {
    let completed = session.completed_parts();
    let missing: Vec<u16> = plan
        .parts()
        .iter()
        .map(|p| p.part_number)
        .filter(|n| !completed.contains_key(n))
        .collect();
    if !missing.is_empty() {
        return Err(UploadErrorKind::IncompleteUpload { missing });
    }

    // BTreeMap iteration is ascending by part number.
    let parts: Vec<CompletedPart> = completed
        .values()
        .map(|p| CompletedPart {
            part_number: p.part_number,
            etag: p.etag.clone(),
            checksum: p.checksum.clone(),
        })
        .collect();
    let expected_etag = completed
        .values()
        .map(|p| p.content_md5.as_deref())
        .collect::<Option<Vec<&str>>>()
        .and_then(multipart_etag);

    let request = CompleteMultipartUploadRequest {
        bucket: session.bucket().to_string(),
        key: session.key().to_string(),
        upload_id: session.upload_id().to_string(),
        parts,
    };

    let mut attempts = 0;
    let mut saw_ambiguous = false;
    loop {
        attempts += 1;
        let error = match gateway.complete_multipart_upload(request.clone()).await {
            Ok(out) => {
                return Ok(Commit {
                    location: out.location,
                    etag: out.etag,
                    version_id: out.version_id,
                    checksum: out.checksum,
                    reconciled: false,
                });
            }
            Err(e) => e,
        };

        if error.is_no_such_upload() && attempts > 1 {
            // An earlier attempt whose response was lost may have committed.
            return match confirm(gateway, session, prior, expected_etag.as_deref()).await {
                Some(head) => Ok(reconciled(head)),
                None => Err(UploadErrorKind::AmbiguousCompletion {
                    attempts,
                    source: error,
                }),
            };
        }
        if !error.is_retryable() {
            return Err(UploadErrorKind::PermanentTransport {
                operation: Operation::CompleteMultipartUpload,
                source: error,
            });
        }

        saw_ambiguous |= error.is_ambiguous();
        if let Some(head) = confirm(gateway, session, prior, expected_etag.as_deref()).await {
            return Ok(reconciled(head));
        }
        if !policy.allows_another(attempts) {
            return Err(exhausted(attempts, saw_ambiguous, error));
        }

        let delay = policy.backoff(attempts);
        log::debug!(
            "CompleteMultipartUpload of {} attempt {attempts} failed ({error}); retrying in {delay:?}",
            session.upload_id()
        );
        tokio::time::sleep(delay).await;
    }
}

fn reconciled(head: HeadObjectOutput) -> Commit {
    Commit {
        location: None,
        etag: head.etag,
        version_id: head.version_id,
        checksum: None,
        reconciled: true,
    }
}

fn exhausted(attempts: u32, saw_ambiguous: bool, source: TransportError) -> UploadErrorKind {
    if saw_ambiguous {
        UploadErrorKind::AmbiguousCompletion { attempts, source }
    } else {
        UploadErrorKind::TransientTransport {
            operation: Operation::CompleteMultipartUpload,
            attempts,
            source,
        }
    }
}

/// Looks the object up and returns it if it carries `expected_etag` and is
/// not the `prior` object.
async fn confirm(
    gateway: &dyn TransportGateway,
    session: &UploadSession,
    prior: &PriorObject,
    expected_etag: Option<&str>,
) -> Option<HeadObjectOutput> {
    let expected = expected_etag?;
    let request = HeadObjectRequest {
        bucket: session.bucket().to_string(),
        key: session.key().to_string(),
    };
    match gateway.head_object(request).await {
        Ok(Some(head))
            if trim_etag(&head.etag) == trim_etag(expected) && prior.is_replaced_by(&head) =>
        {
            log::info!(
                "upload {} confirmed committed by existence check",
                session.upload_id()
            );
            Some(head)
        }
        Ok(_) => None,
        Err(e) => {
            log::warn!("existence check for {}/{} failed: {e}", session.bucket(), session.key());
            None
        }
    }
}
