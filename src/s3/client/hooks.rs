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

use crate::s3::error::PartError;
use crate::s3::types::{PartFailure, PartResult, UploadState};
use std::fmt::Debug;
use std::time::Duration;

/// Identifies the upload an event belongs to.
#[derive(Clone, Copy, Debug)]
pub struct UploadContext<'a> {
    pub bucket: &'a str,
    pub key: &'a str,
    pub upload_id: &'a str,
}

/// Observer of upload lifecycle events, registered with
/// [`UploaderBuilder::hook`](crate::s3::UploaderBuilder::hook).
///
/// Hooks are called from the coordinator, one event at a time and in order.
/// All methods have empty default implementations.
#[async_trait::async_trait]
pub trait UploadHooks: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    async fn on_state_change(&self, _ctx: UploadContext<'_>, _from: UploadState, _to: UploadState) {}

    async fn on_part_complete(&self, _ctx: UploadContext<'_>, _part: &PartResult) {}

    /// Called when a part is scheduled for another attempt after `delay`.
    async fn on_part_retry(
        &self,
        _ctx: UploadContext<'_>,
        _part_number: u16,
        _attempt: u32,
        _error: &PartError,
        _delay: Duration,
    ) {
    }

    async fn on_part_failed(&self, _ctx: UploadContext<'_>, _failure: &PartFailure) {}
}
