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

//! Per-upload configuration

use crate::s3::error::ValidationErr;
use crate::s3::utils::{ChecksumAlgorithm, ChecksumLocation, duration_ms};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use crate::s3::multipart::retry::RetryPolicy;

/// Default part size hint (8 MiB).
pub const DEFAULT_PART_SIZE: u64 = 8 * 1024 * 1024;

/// Default number of parts uploaded at the same time.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Options controlling a single multipart upload.
///
/// All fields have defaults, so a partial JSON or TOML document is enough:
///
/// ```
/// use minio_mpu::s3::options::UploadOptions;
/// use std::time::Duration;
///
/// let opts: UploadOptions = serde_json::from_str(r#"{"concurrency": 8, "part_timeout": 30000}"#).unwrap();
/// assert_eq!(opts.concurrency, 8);
/// assert_eq!(opts.part_timeout, Some(Duration::from_secs(30)));
/// assert_eq!(opts.retry_policy.max_attempts, 3);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadOptions {
    /// Requested part size in bytes. Clamped to [5 MiB, 5 GiB] and raised when
    /// the object would otherwise need more than 10,000 parts.
    pub part_size: u64,

    /// Maximum number of `UploadPart` calls in flight.
    pub concurrency: usize,

    pub retry_policy: RetryPolicy,

    /// Deadline for a single `UploadPart` attempt, in milliseconds when serialized.
    #[serde(with = "duration_ms::option")]
    pub part_timeout: Option<Duration>,

    /// Deadline for the whole upload, in milliseconds when serialized.
    #[serde(with = "duration_ms::option")]
    pub session_timeout: Option<Duration>,

    /// Attach a Content-MD5 header to every part.
    pub content_md5: bool,

    /// Additional checksum computed for every part and declared when the
    /// upload is created, e.g. `"CRC32C"` in JSON.
    pub checksum_algorithm: Option<ChecksumAlgorithm>,

    /// Where the part checksum is sent.
    pub checksum_location: ChecksumLocation,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            retry_policy: RetryPolicy::default(),
            part_timeout: None,
            session_timeout: None,
            content_md5: true,
            checksum_algorithm: None,
            checksum_location: ChecksumLocation::Header,
        }
    }
}

impl UploadOptions {
    pub fn part_size(mut self, part_size: u64) -> Self {
        self.part_size = part_size;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn part_timeout(mut self, timeout: Duration) -> Self {
        self.part_timeout = Some(timeout);
        self
    }

    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = Some(timeout);
        self
    }

    pub fn content_md5(mut self, enabled: bool) -> Self {
        self.content_md5 = enabled;
        self
    }

    pub fn checksum_algorithm(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.checksum_algorithm = Some(algorithm);
        self
    }

    pub fn checksum_location(mut self, location: ChecksumLocation) -> Self {
        self.checksum_location = location;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationErr> {
        if self.concurrency == 0 {
            return Err(ValidationErr::InvalidConcurrency(self.concurrency));
        }
        self.retry_policy.validate()
    }
}
