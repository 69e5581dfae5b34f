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

use crate::scripted_gateway::ScriptedGateway;
use crate::utils::rand_bucket_name;
use minio_mpu::s3::gateway::MemoryGateway;
use minio_mpu::s3::multipart::MIN_PART_SIZE;
use minio_mpu::s3::options::{RetryPolicy, UploadOptions};
use minio_mpu::s3::{Uploader, UploaderBuilder};
use std::sync::Arc;
use std::time::Duration;

/// An uploader wired to a [`ScriptedGateway`] holding one random bucket.
#[derive(Clone)]
pub struct TestContext {
    pub gateway: Arc<ScriptedGateway>,
    pub uploader: Uploader,
    pub bucket: String,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_options(test_options())
    }

    pub fn with_options(options: UploadOptions) -> Self {
        Self::with_memory(MemoryGateway::new(), options)
    }

    pub fn with_memory(memory: MemoryGateway, options: UploadOptions) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let bucket = rand_bucket_name();
        memory.create_bucket(&bucket);
        let gateway = Arc::new(ScriptedGateway::new(memory));
        let uploader = Uploader::builder(gateway.clone())
            .default_options(options)
            .build();
        log::debug!("test context using bucket {bucket}");
        Self {
            gateway,
            uploader,
            bucket,
        }
    }

    /// Builder over the same gateway, for tests that register hooks.
    pub fn uploader_builder(&self) -> UploaderBuilder {
        Uploader::builder(self.gateway.clone())
            .default_options(self.uploader.default_options().clone())
    }

    pub fn memory(&self) -> &MemoryGateway {
        self.gateway.memory()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Three attempts with millisecond backoff.
pub fn fast_retry_policy() -> RetryPolicy {
    RetryPolicy::default()
        .max_attempts(3)
        .base_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(10))
}

/// Minimum-size parts, concurrency 4 and [`fast_retry_policy`].
pub fn test_options() -> UploadOptions {
    UploadOptions::default()
        .part_size(MIN_PART_SIZE)
        .concurrency(4)
        .retry_policy(fast_retry_policy())
}
