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

use super::{
    AbortMultipartUploadRequest, CompleteMultipartUploadOutput, CompleteMultipartUploadRequest,
    CreateMultipartUploadOutput, CreateMultipartUploadRequest, HeadObjectOutput,
    HeadObjectRequest, ListPartsRequest, PartInfo, TransportGateway, UploadPartOutput,
    UploadPartRequest,
};
use crate::s3::error::TransportError;
use crate::s3::multipart::MIN_PART_SIZE;
use crate::s3::utils::{ChecksumAlgorithm, composite_checksum, compute_checksum, md5sum_hash};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::{DashMap, DashSet};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Object committed to a [`MemoryGateway`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Bytes,
    pub etag: String,
    pub version_id: Option<String>,
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
    /// Composite checksum, for uploads created with a checksum algorithm.
    pub checksum: Option<String>,
}

#[derive(Clone, Debug)]
struct StoredPart {
    etag: String,
    digest: md5::Digest,
    checksum: Option<String>,
    data: Bytes,
}

#[derive(Clone, Debug)]
struct PendingUpload {
    bucket: String,
    key: String,
    content_type: Option<String>,
    metadata: HashMap<String, String>,
    checksum_algorithm: Option<ChecksumAlgorithm>,
    parts: BTreeMap<u16, StoredPart>,
}

/// In-process gateway with S3 multipart semantics.
///
/// Verifies Content-MD5 and additional part checksums, enforces ascending part order and the minimum size of
/// non-final parts on completion, assigns multipart ETags and answers
/// `NoSuchBucket`/`NoSuchUpload` like the service does.
///
/// ```
/// use minio_mpu::s3::gateway::MemoryGateway;
///
/// let gateway = MemoryGateway::new();
/// gateway.create_bucket("my-bucket");
/// assert!(gateway.get_object("my-bucket", "missing").is_none());
/// ```
#[derive(Debug)]
pub struct MemoryGateway {
    buckets: DashSet<String>,
    objects: DashMap<(String, String), StoredObject>,
    uploads: DashMap<String, PendingUpload>,
    min_part_size: u64,
    versioned: bool,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self {
            buckets: DashSet::new(),
            objects: DashMap::new(),
            uploads: DashMap::new(),
            min_part_size: MIN_PART_SIZE,
            versioned: false,
        }
    }

    /// Overrides the minimum size of non-final parts checked on completion.
    pub fn with_min_part_size(mut self, min_part_size: u64) -> Self {
        self.min_part_size = min_part_size;
        self
    }

    /// Assigns a version id to every committed object.
    pub fn with_versioning(mut self) -> Self {
        self.versioned = true;
        self
    }

    pub fn create_bucket(&self, bucket: impl Into<String>) {
        self.buckets.insert(bucket.into());
    }

    pub fn get_object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.value().clone())
    }

    /// Ids of uploads that were created but neither completed nor aborted.
    pub fn list_uploads(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.uploads.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Stores `data` under `key` as if uploaded with a single PutObject,
    /// replacing any existing object.
    pub fn put_object(&self, bucket: &str, key: &str, data: impl Into<Bytes>) -> StoredObject {
        let data = data.into();
        let object = StoredObject {
            etag: format!("\"{:x}\"", md5::compute(&data)),
            data,
            version_id: self.versioned.then(|| Uuid::new_v4().to_string()),
            content_type: None,
            metadata: HashMap::new(),
            checksum: None,
        };
        self.objects
            .insert((bucket.to_string(), key.to_string()), object.clone());
        object
    }

    /// Part numbers stored for an in-progress upload.
    pub fn part_numbers(&self, upload_id: &str) -> Option<Vec<u16>> {
        self.uploads
            .get(upload_id)
            .map(|u| u.parts.keys().copied().collect())
    }

    fn check_bucket(&self, bucket: &str) -> Result<(), TransportError> {
        if self.buckets.contains(bucket) {
            Ok(())
        } else {
            Err(s3_error(404, "NoSuchBucket", "The specified bucket does not exist"))
        }
    }
}

fn s3_error(status: u16, code: &str, message: &str) -> TransportError {
    TransportError::from_status(status, Some(code), message)
        .with_request_id(Uuid::new_v4().simple().to_string())
}

fn no_such_upload() -> TransportError {
    s3_error(
        404,
        "NoSuchUpload",
        "The specified multipart upload does not exist",
    )
}

#[async_trait]
impl TransportGateway for MemoryGateway {
    async fn create_multipart_upload(
        &self,
        request: CreateMultipartUploadRequest,
    ) -> Result<CreateMultipartUploadOutput, TransportError> {
        self.check_bucket(&request.bucket)?;
        let upload_id = Uuid::new_v4().to_string();
        self.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                bucket: request.bucket.clone(),
                key: request.key.clone(),
                content_type: request.content_type,
                metadata: request.metadata,
                checksum_algorithm: request.checksum_algorithm,
                parts: BTreeMap::new(),
            },
        );
        log::debug!(
            "memory gateway: created upload {upload_id} for {}/{}",
            request.bucket,
            request.key
        );
        Ok(CreateMultipartUploadOutput {
            bucket: request.bucket,
            key: request.key,
            upload_id,
        })
    }

    async fn upload_part(
        &self,
        request: UploadPartRequest,
    ) -> Result<UploadPartOutput, TransportError> {
        self.check_bucket(&request.bucket)?;
        if request.part_number == 0 || request.part_number > 10_000 {
            return Err(s3_error(
                400,
                "InvalidArgument",
                "Part number must be an integer between 1 and 10000, inclusive",
            ));
        }

        let digest = md5::compute(&request.body);
        if let Some(content_md5) = &request.content_md5 {
            if *content_md5 != md5sum_hash(&request.body) {
                return Err(s3_error(
                    400,
                    "BadDigest",
                    "The Content-MD5 you specified did not match what we received",
                ));
            }
        }

        let mut upload = match self.uploads.get_mut(&request.upload_id) {
            Some(u) if u.bucket == request.bucket && u.key == request.key => u,
            _ => return Err(no_such_upload()),
        };

        let checksum = match (upload.checksum_algorithm, &request.checksum) {
            (Some(expected), Some((algorithm, _))) if expected != *algorithm => {
                return Err(s3_error(
                    400,
                    "InvalidRequest",
                    &format!(
                        "Checksum Type mismatch occurred, expected checksum Type: {}, actual checksum Type: {}",
                        expected.as_str().to_lowercase(),
                        algorithm.as_str().to_lowercase()
                    ),
                ));
            }
            (Some(expected), None) => {
                return Err(s3_error(
                    400,
                    "InvalidRequest",
                    &format!(
                        "The upload was created using a {} checksum. The complete request must include the checksum for each part.",
                        expected.as_str().to_lowercase()
                    ),
                ));
            }
            (_, Some((algorithm, value))) => {
                if *value != compute_checksum(*algorithm, &request.body) {
                    return Err(s3_error(
                        400,
                        "BadDigest",
                        &format!(
                            "The {} you specified did not match the calculated checksum.",
                            algorithm.as_str()
                        ),
                    ));
                }
                Some(value.clone())
            }
            (None, None) => None,
        };

        let etag = format!("\"{digest:x}\"");
        upload.parts.insert(
            request.part_number,
            StoredPart {
                etag: etag.clone(),
                digest,
                checksum,
                data: request.body,
            },
        );
        Ok(UploadPartOutput { etag })
    }

    async fn complete_multipart_upload(
        &self,
        request: CompleteMultipartUploadRequest,
    ) -> Result<CompleteMultipartUploadOutput, TransportError> {
        self.check_bucket(&request.bucket)?;
        if request.parts.is_empty() {
            return Err(s3_error(
                400,
                "MalformedXML",
                "You must specify at least one part",
            ));
        }
        if request
            .parts
            .windows(2)
            .any(|w| w[0].part_number >= w[1].part_number)
        {
            return Err(s3_error(
                400,
                "InvalidPartOrder",
                "The list of parts was not in ascending order",
            ));
        }

        let (_, upload) = match self.uploads.remove(&request.upload_id) {
            Some((id, u)) if u.bucket == request.bucket && u.key == request.key => (id, u),
            Some((id, u)) => {
                self.uploads.insert(id, u);
                return Err(no_such_upload());
            }
            None => return Err(no_such_upload()),
        };

        let mut data = BytesMut::new();
        let mut digests = Vec::with_capacity(request.parts.len() * 16);
        let last = request.parts.len() - 1;
        let mut rejected = None;
        for (i, part) in request.parts.iter().enumerate() {
            let stored = match upload.parts.get(&part.part_number) {
                Some(p)
                    if p.etag.trim_matches('"') == part.etag.trim_matches('"')
                        && (upload.checksum_algorithm.is_none()
                            || p.checksum == part.checksum) =>
                {
                    p
                }
                _ => {
                    rejected = Some(s3_error(
                        400,
                        "InvalidPart",
                        "One or more of the specified parts could not be found",
                    ));
                    break;
                }
            };
            if i < last && (stored.data.len() as u64) < self.min_part_size {
                rejected = Some(s3_error(
                    400,
                    "EntityTooSmall",
                    "Your proposed upload is smaller than the minimum allowed object size",
                ));
                break;
            }
            data.extend_from_slice(&stored.data);
            digests.extend_from_slice(stored.digest.as_slice());
        }
        if let Some(err) = rejected {
            // The upload stays open, as on the service.
            self.uploads.insert(request.upload_id, upload);
            return Err(err);
        }

        let etag = format!(
            "\"{:x}-{}\"",
            md5::compute(&digests),
            request.parts.len()
        );
        let checksum = upload.checksum_algorithm.and_then(|algorithm| {
            composite_checksum(
                algorithm,
                request
                    .parts
                    .iter()
                    .filter_map(|p| upload.parts.get(&p.part_number))
                    .filter_map(|p| p.checksum.as_deref()),
            )
        });
        let version_id = self.versioned.then(|| Uuid::new_v4().to_string());
        self.objects.insert(
            (request.bucket.clone(), request.key.clone()),
            StoredObject {
                data: data.freeze(),
                etag: etag.clone(),
                version_id: version_id.clone(),
                content_type: upload.content_type,
                metadata: upload.metadata,
                checksum: checksum.clone(),
            },
        );
        log::debug!(
            "memory gateway: completed upload {} as {}/{} ({etag})",
            request.upload_id,
            request.bucket,
            request.key
        );

        Ok(CompleteMultipartUploadOutput {
            location: Some(format!("/{}/{}", request.bucket, request.key)),
            bucket: request.bucket,
            key: request.key,
            etag,
            version_id,
            checksum,
        })
    }

    async fn abort_multipart_upload(
        &self,
        request: AbortMultipartUploadRequest,
    ) -> Result<(), TransportError> {
        self.check_bucket(&request.bucket)?;
        match self.uploads.remove(&request.upload_id) {
            Some(_) => Ok(()),
            None => Err(no_such_upload()),
        }
    }

    async fn list_parts(
        &self,
        request: ListPartsRequest,
    ) -> Result<Vec<PartInfo>, TransportError> {
        self.check_bucket(&request.bucket)?;
        match self.uploads.get(&request.upload_id) {
            Some(u) if u.bucket == request.bucket && u.key == request.key => Ok(u
                .parts
                .iter()
                .map(|(n, p)| PartInfo {
                    part_number: *n,
                    etag: p.etag.clone(),
                    size: p.data.len() as u64,
                    checksum: p.checksum.clone(),
                })
                .collect()),
            _ => Err(no_such_upload()),
        }
    }

    async fn head_object(
        &self,
        request: HeadObjectRequest,
    ) -> Result<Option<HeadObjectOutput>, TransportError> {
        self.check_bucket(&request.bucket)?;
        Ok(self.get_object(&request.bucket, &request.key).map(|o| HeadObjectOutput {
            etag: o.etag,
            content_length: o.data.len() as u64,
            version_id: o.version_id,
        }))
    }
}
