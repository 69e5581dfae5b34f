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

use crate::s3::Uploader;
use crate::s3::error::TransportError;
use crate::s3::gateway::AbortMultipartUploadRequest;
use crate::s3::multipart::coordinator::abort_upload;
use typed_builder::TypedBuilder;

/// Argument builder for aborting a multipart upload by id.
///
/// Transient failures are retried with the uploader's default retry policy.
/// An upload that no longer exists counts as aborted.
#[derive(Clone, Debug, TypedBuilder)]
pub struct AbortMultipartUpload {
    #[builder(!default)]
    uploader: Uploader,
    #[builder(!default, setter(into))]
    bucket: String,
    #[builder(!default, setter(into))]
    key: String,
    #[builder(!default, setter(into))]
    upload_id: String,
}

/// Builder type for [`AbortMultipartUpload`] as returned by
/// [`Uploader::abort_multipart_upload()`](crate::s3::Uploader::abort_multipart_upload).
pub type AbortMultipartUploadBldr =
    AbortMultipartUploadBuilder<((Uploader,), (String,), (String,), (String,))>;

impl AbortMultipartUpload {
    pub async fn send(self) -> Result<(), TransportError> {
        let request = AbortMultipartUploadRequest {
            bucket: self.bucket,
            key: self.key,
            upload_id: self.upload_id,
        };
        abort_upload(
            self.uploader.gateway().as_ref(),
            &self.uploader.default_options().retry_policy,
            request,
        )
        .await
    }
}
