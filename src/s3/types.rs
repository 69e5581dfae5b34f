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

//! Core value types shared by the planner, coordinator and assembler

use crate::s3::error::PartError;
use crate::s3::multipart::session::UploadSession;
use crate::s3::utils::ChecksumAlgorithm;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Lifecycle state of a multipart upload session.
///
/// ```text
/// Created -> Uploading -> Completing -> Done
///                 |            |
///                 +-> Aborting <-+ -> Failed
///
/// Created, Uploading -> Paused
/// ```
///
/// `Paused` ends this run of the session without aborting; the upload stays
/// open on the service and a new session may continue it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UploadState {
    Created,
    Uploading,
    Completing,
    Aborting,
    Done,
    Failed,
    Paused,
}

impl UploadState {
    /// Returns `true` if `next` is a legal successor of this state.
    pub fn can_transition_to(self, next: UploadState) -> bool {
        use UploadState::*;
        matches!(
            (self, next),
            (Created, Uploading)
                | (Created, Aborting)
                | (Uploading, Completing)
                | (Uploading, Aborting)
                | (Completing, Done)
                | (Completing, Aborting)
                | (Aborting, Failed)
                | (Created, Paused)
                | (Uploading, Paused)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            UploadState::Done | UploadState::Failed | UploadState::Paused
        )
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadState::Created => write!(f, "Created"),
            UploadState::Uploading => write!(f, "Uploading"),
            UploadState::Completing => write!(f, "Completing"),
            UploadState::Aborting => write!(f, "Aborting"),
            UploadState::Done => write!(f, "Done"),
            UploadState::Failed => write!(f, "Failed"),
            UploadState::Paused => write!(f, "Paused"),
        }
    }
}

/// A planned part: its 1-based part number and the half-open byte range it covers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PartSpec {
    pub part_number: u16,
    pub range: Range<u64>,
}

impl PartSpec {
    pub fn len(&self) -> u64 {
        self.range.end - self.range.start
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// Contains part number and etag of an uploaded part
pub struct PartResult {
    pub part_number: u16,
    pub etag: String,
    pub size: u64,
    /// Base64 encoded MD5 sent as Content-MD5, if enabled.
    pub content_md5: Option<String>,
    /// Base64 encoded additional checksum sent with the part, if configured.
    pub checksum: Option<String>,
}

/// A part that failed permanently or ran out of retries.
#[derive(Clone, Debug)]
pub struct PartFailure {
    pub part_number: u16,
    pub attempts: u32,
    pub error: PartError,
}

/// Result of a committed multipart upload.
#[derive(Clone, Debug)]
pub struct FinalObjectInfo {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
    pub location: Option<String>,
    pub etag: String,
    pub version_id: Option<String>,
    pub object_size: u64,
    /// `true` when the commit was confirmed by an existence check after an
    /// ambiguous CompleteMultipartUpload response.
    pub reconciled: bool,
    /// Composite checksum of the object, when a checksum algorithm was used.
    pub checksum: Option<String>,
    pub session: UploadSession,
}

impl FinalObjectInfo {
    /// Number of retries spent on the given part.
    pub fn retry_count(&self, part_number: u16) -> u32 {
        self.session.retry_count(part_number)
    }

    pub fn part_count(&self) -> usize {
        self.session.completed_parts().len()
    }
}

/// Everything needed to continue a paused upload in a later call.
///
/// Serializable so it can outlive the process that paused the upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeToken {
    pub bucket: String,
    pub key: String,
    pub upload_id: String,
    pub part_size: u64,
    pub total_num_parts: u16,
    pub num_parts_completed: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
}
