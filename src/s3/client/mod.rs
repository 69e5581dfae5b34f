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

//! Upload client: the entry point for multipart uploads

use crate::s3::gateway::TransportGateway;
use crate::s3::multipart::UploadCoordinator;
use crate::s3::options::UploadOptions;
use std::sync::Arc;

pub use crate::s3::client::hooks::{UploadContext, UploadHooks};

mod abort_multipart_upload;
pub mod hooks;
mod upload_object;

/// Builder for [`Uploader`].
#[derive(Debug)]
pub struct UploaderBuilder {
    gateway: Arc<dyn TransportGateway>,
    hooks: Vec<Arc<dyn UploadHooks>>,
    options: UploadOptions,
}

impl UploaderBuilder {
    pub fn new(gateway: Arc<dyn TransportGateway>) -> Self {
        Self {
            gateway,
            hooks: Vec::new(),
            options: UploadOptions::default(),
        }
    }

    /// Add a lifecycle hook. Hooks are called one after another in the order
    /// they were added.
    pub fn hook(mut self, hook: Arc<dyn UploadHooks>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Options used by uploads that do not set their own.
    ///
    /// # Example
    ///
    /// ```
    /// use minio_mpu::s3::Uploader;
    /// use minio_mpu::s3::gateway::MemoryGateway;
    /// use minio_mpu::s3::options::UploadOptions;
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// let uploader = Uploader::builder(Arc::new(MemoryGateway::new()))
    ///     .default_options(
    ///         UploadOptions::default()
    ///             .concurrency(8)
    ///             .part_timeout(Duration::from_secs(60)),
    ///     )
    ///     .build();
    /// assert_eq!(uploader.default_options().concurrency, 8);
    /// ```
    pub fn default_options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Uploader {
        Uploader {
            shared: Arc::new(SharedUploaderItems {
                gateway: self.gateway,
                hooks: self.hooks,
                default_options: self.options,
            }),
        }
    }
}

#[derive(Debug)]
pub(crate) struct SharedUploaderItems {
    gateway: Arc<dyn TransportGateway>,
    hooks: Vec<Arc<dyn UploadHooks>>,
    default_options: UploadOptions,
}

/// Uploads objects through a [`TransportGateway`] using the multipart
/// protocol. Cheap to clone; clones share the gateway and hooks.
#[derive(Clone, Debug)]
pub struct Uploader {
    pub(crate) shared: Arc<SharedUploaderItems>,
}

impl Uploader {
    pub fn builder(gateway: Arc<dyn TransportGateway>) -> UploaderBuilder {
        UploaderBuilder::new(gateway)
    }

    pub fn gateway(&self) -> &Arc<dyn TransportGateway> {
        &self.shared.gateway
    }

    pub fn default_options(&self) -> &UploadOptions {
        &self.shared.default_options
    }

    pub(crate) fn coordinator(&self, options: Option<UploadOptions>) -> UploadCoordinator {
        UploadCoordinator::new(
            self.shared.gateway.clone(),
            self.shared.hooks.clone(),
            options.unwrap_or_else(|| self.shared.default_options.clone()),
        )
    }
}
