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

use async_trait::async_trait;
use minio_mpu::s3::client::{UploadContext, UploadHooks};
use minio_mpu::s3::error::PartError;
use minio_mpu::s3::types::{PartFailure, PartResult, UploadState};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    State(UploadState, UploadState),
    PartComplete(u16),
    PartRetry { part_number: u16, attempt: u32 },
    PartFailed(u16),
}

/// Hook that records every event it sees.
#[derive(Debug, Default)]
pub struct RecordingHooks {
    events: Mutex<Vec<Event>>,
}

impl RecordingHooks {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Target states of all recorded transitions, in order.
    pub fn states(&self) -> Vec<UploadState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::State(_, to) => Some(to),
                _ => None,
            })
            .collect()
    }

    /// Part numbers in the order their uploads completed.
    pub fn completed_parts(&self) -> Vec<u16> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::PartComplete(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl UploadHooks for RecordingHooks {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn on_state_change(&self, _ctx: UploadContext<'_>, from: UploadState, to: UploadState) {
        self.push(Event::State(from, to));
    }

    async fn on_part_complete(&self, _ctx: UploadContext<'_>, part: &PartResult) {
        self.push(Event::PartComplete(part.part_number));
    }

    async fn on_part_retry(
        &self,
        _ctx: UploadContext<'_>,
        part_number: u16,
        attempt: u32,
        _error: &PartError,
        _delay: Duration,
    ) {
        self.push(Event::PartRetry {
            part_number,
            attempt,
        });
    }

    async fn on_part_failed(&self, _ctx: UploadContext<'_>, failure: &PartFailure) {
        self.push(Event::PartFailed(failure.part_number));
    }
}
