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

use super::Uploader;
use crate::s3::builders::{AbortMultipartUpload, AbortMultipartUploadBldr};

impl Uploader {
    /// Creates an [`AbortMultipartUpload`] request builder, for cleaning up an
    /// upload id reported by a failed upload whose own abort did not succeed.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use minio_mpu::s3::Uploader;
    /// use minio_mpu::s3::gateway::MemoryGateway;
    /// use std::sync::Arc;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let uploader = Uploader::builder(Arc::new(MemoryGateway::new())).build();
    ///     let err = uploader
    ///         .upload_object("bucket-name", "object-name", vec![0_u8; 6 * 1024 * 1024])
    ///         .build()
    ///         .send()
    ///         .await
    ///         .unwrap_err();
    ///     if let (Some(upload_id), Some(_)) = (err.upload_id(), err.abort_error()) {
    ///         uploader
    ///             .abort_multipart_upload("bucket-name", "object-name", upload_id)
    ///             .build()
    ///             .send()
    ///             .await
    ///             .unwrap();
    ///     }
    /// }
    /// ```
    pub fn abort_multipart_upload<S1: Into<String>, S2: Into<String>, S3: Into<String>>(
        &self,
        bucket: S1,
        key: S2,
        upload_id: S3,
    ) -> AbortMultipartUploadBldr {
        AbortMultipartUpload::builder()
            .uploader(self.clone())
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
    }
}
