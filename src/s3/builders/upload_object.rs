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

//! Builder for a complete multipart upload of one object

use crate::s3::Uploader;
use crate::s3::error::{UploadError, UploadErrorKind};
use crate::s3::gateway::CreateMultipartUploadRequest;
use crate::s3::multipart::UploadControl;
use crate::s3::object_content::ObjectContent;
use crate::s3::options::UploadOptions;
use crate::s3::types::{FinalObjectInfo, ResumeToken};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use typed_builder::TypedBuilder;

/// Argument builder for uploading an object with the multipart protocol.
///
/// Created by [`Uploader::upload_object()`]. Runs CreateMultipartUpload, the
/// UploadPart calls and CompleteMultipartUpload, or AbortMultipartUpload when
/// the upload cannot be finished.
///
/// A paused upload fails with [`UploadErrorKind::Paused`]; pass the token from
/// [`UploadError::resume_token()`] to [`resume`](UploadObjectBuilder::resume)
/// together with the same content to finish it.
#[derive(TypedBuilder)]
pub struct UploadObject {
    #[builder(!default)]
    uploader: Uploader,
    #[builder(!default, setter(into))]
    bucket: String,
    #[builder(!default, setter(into))]
    key: String,
    #[builder(!default, setter(into))]
    content: ObjectContent,

    /// Options for this upload; the uploader's defaults when unset.
    #[builder(default, setter(into, strip_option))]
    options: Option<UploadOptions>,
    /// User metadata stored with the object.
    #[builder(default)]
    metadata: HashMap<String, String>,
    #[builder(default, setter(into, strip_option))]
    content_type: Option<String>,
    #[builder(default, setter(into, strip_option))]
    storage_class: Option<String>,
    /// Cancelling this token stops the upload and aborts it.
    #[builder(default, setter(into, strip_option))]
    cancellation: Option<CancellationToken>,
    /// Cancelling this token stops the upload without aborting it.
    #[builder(default, setter(into, strip_option))]
    pause: Option<CancellationToken>,
    /// Continue a paused upload instead of creating a new one.
    #[builder(default, setter(strip_option))]
    resume: Option<ResumeToken>,
}

/// Builder type for [`UploadObject`] as returned by [`Uploader::upload_object()`].
pub type UploadObjectBldr = UploadObjectBuilder<(
    (Uploader,),
    (String,),
    (String,),
    (ObjectContent,),
    (),
    (),
    (),
    (),
    (),
    (),
    (),
)>;

impl UploadObject {
    pub async fn send(self) -> Result<FinalObjectInfo, UploadError> {
        let coordinator = self.uploader.coordinator(self.options);
        let source = self.content.into_data_source().await.map_err(|e| {
            UploadError::new(
                &self.bucket,
                &self.key,
                UploadErrorKind::Content {
                    source: Arc::new(e),
                },
            )
        })?;

        let request = CreateMultipartUploadRequest {
            bucket: self.bucket,
            key: self.key,
            content_type: self.content_type,
            metadata: self.metadata,
            storage_class: self.storage_class,
            checksum_algorithm: None,
        };
        let control = UploadControl {
            cancel: self.cancellation.unwrap_or_default(),
            pause: self.pause,
            resume: self.resume,
        };
        coordinator.execute(request, source, control).await
    }
}
