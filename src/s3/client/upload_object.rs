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
use crate::s3::builders::{UploadObject, UploadObjectBldr};
use crate::s3::object_content::ObjectContent;

impl Uploader {
    /// Creates an [`UploadObject`] request builder that uploads `content` as a
    /// multipart upload.
    ///
    /// To execute the request, call [`UploadObject::send()`], which returns a
    /// [`FinalObjectInfo`](crate::s3::types::FinalObjectInfo) or an
    /// [`UploadError`](crate::s3::error::UploadError).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use minio_mpu::s3::Uploader;
    /// use minio_mpu::s3::gateway::MemoryGateway;
    /// use minio_mpu::s3::options::UploadOptions;
    /// use std::sync::Arc;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let gateway = Arc::new(MemoryGateway::new());
    ///     gateway.create_bucket("bucket-name");
    ///     let uploader = Uploader::builder(gateway).build();
    ///
    ///     let info = uploader
    ///         .upload_object("bucket-name", "object-name", vec![1_u8; 20 * 1024 * 1024])
    ///         .options(UploadOptions::default().concurrency(2))
    ///         .content_type("application/octet-stream")
    ///         .build()
    ///         .send()
    ///         .await
    ///         .unwrap();
    ///     println!("uploaded '{}' in {} parts", info.key, info.part_count());
    /// }
    /// ```
    pub fn upload_object<S1: Into<String>, S2: Into<String>, C: Into<ObjectContent>>(
        &self,
        bucket: S1,
        key: S2,
        content: C,
    ) -> UploadObjectBldr {
        UploadObject::builder()
            .uploader(self.clone())
            .bucket(bucket)
            .key(key)
            .content(content)
    }
}
