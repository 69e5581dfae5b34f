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

//! Boundary to the service that stores parts and objects.
//!
//! The orchestrator never speaks HTTP itself. Signing, connection handling and
//! wire encoding live behind [`TransportGateway`]; this crate ships the
//! in-process [`MemoryGateway`] implementation.

mod memory;

pub use memory::{MemoryGateway, StoredObject};

use crate::s3::error::TransportError;
use crate::s3::utils::{ChecksumAlgorithm, ChecksumLocation};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateMultipartUploadRequest {
    pub bucket: String,
    pub key: String,
    pub content_type: Option<String>,
    /// User metadata, sent as `x-amz-meta-*` headers.
    pub metadata: HashMap<String, String>,
    pub storage_class: Option<String>,
    /// Additional checksum algorithm every part of this upload carries.
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateMultipartUploadOutput {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadPartRequest {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
    pub part_number: u16,
    pub body: Bytes,
    /// Base64 encoded MD5 of `body`.
    pub content_md5: Option<String>,
    /// Algorithm and base64 encoded value of the additional checksum of `body`.
    pub checksum: Option<(ChecksumAlgorithm, String)>,
    /// Whether the checksum goes in a header or an aws-chunked trailer.
    pub checksum_location: ChecksumLocation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadPartOutput {
    pub etag: String,
}

/// Part number and ETag pair sent with CompleteMultipartUpload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedPart {
    pub part_number: u16,
    pub etag: String,
    /// Additional checksum of the part, required when the upload was created
    /// with a checksum algorithm.
    pub checksum: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompleteMultipartUploadRequest {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
    /// Parts in ascending part-number order.
    pub parts: Vec<CompletedPart>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompleteMultipartUploadOutput {
    pub location: Option<String>,
    pub bucket: String,
    pub key: String,
    pub etag: String,
    pub version_id: Option<String>,
    /// Composite checksum of the object, if the upload used one.
    pub checksum: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbortMultipartUploadRequest {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListPartsRequest {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
}

/// A part already stored for an open multipart upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartInfo {
    pub part_number: u16,
    pub etag: String,
    pub size: u64,
    /// Additional checksum stored with the part, if any.
    pub checksum: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadObjectRequest {
    pub bucket: String,
    pub key: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadObjectOutput {
    pub etag: String,
    pub content_length: u64,
    pub version_id: Option<String>,
}

/// Executes multipart operations against an S3-compatible service.
///
/// Implementations must be safe to call from many tasks at once. Every method
/// fails with a [`TransportError`] whose kind tells the orchestrator whether
/// the call may be retried.
#[async_trait]
pub trait TransportGateway: fmt::Debug + Send + Sync {
    async fn create_multipart_upload(
        &self,
        request: CreateMultipartUploadRequest,
    ) -> Result<CreateMultipartUploadOutput, TransportError>;

    async fn upload_part(
        &self,
        request: UploadPartRequest,
    ) -> Result<UploadPartOutput, TransportError>;

    async fn complete_multipart_upload(
        &self,
        request: CompleteMultipartUploadRequest,
    ) -> Result<CompleteMultipartUploadOutput, TransportError>;

    async fn abort_multipart_upload(
        &self,
        request: AbortMultipartUploadRequest,
    ) -> Result<(), TransportError>;

    /// Lists the parts stored so far for an open upload, in ascending
    /// part-number order.
    async fn list_parts(&self, request: ListPartsRequest)
    -> Result<Vec<PartInfo>, TransportError>;

    /// Existence check. Returns `Ok(None)` when the object does not exist.
    async fn head_object(
        &self,
        request: HeadObjectRequest,
    ) -> Result<Option<HeadObjectOutput>, TransportError>;
}
