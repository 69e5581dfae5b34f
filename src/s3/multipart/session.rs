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

use crate::s3::error::UploadErrorKind;
use crate::s3::types::{PartFailure, PartResult, UploadState};
use std::collections::{BTreeMap, BTreeSet};

/// Mutable state of one multipart upload.
///
/// Only the coordinator mutates a session. Callers receive a snapshot once
/// the session reached a terminal state.
#[derive(Clone, Debug)]
pub struct UploadSession {
    upload_id: String,
    bucket: String,
    key: String,
    state: UploadState,
    history: Vec<UploadState>,
    completed: BTreeMap<u16, PartResult>,
    in_flight: BTreeSet<u16>,
    failed: BTreeMap<u16, PartFailure>,
    retries: BTreeMap<u16, u32>,
    resumed: BTreeSet<u16>,
}

impl UploadSession {
    pub(crate) fn new(upload_id: String, bucket: &str, key: &str) -> Self {
        Self {
            upload_id,
            bucket: bucket.to_string(),
            key: key.to_string(),
            state: UploadState::Created,
            history: vec![UploadState::Created],
            completed: BTreeMap::new(),
            in_flight: BTreeSet::new(),
            failed: BTreeMap::new(),
            retries: BTreeMap::new(),
            resumed: BTreeSet::new(),
        }
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    /// States visited so far, starting with [`UploadState::Created`].
    pub fn history(&self) -> &[UploadState] {
        &self.history
    }

    /// Successfully uploaded parts keyed by part number.
    pub fn completed_parts(&self) -> &BTreeMap<u16, PartResult> {
        &self.completed
    }

    pub fn in_flight(&self) -> impl Iterator<Item = u16> + '_ {
        self.in_flight.iter().copied()
    }

    pub fn failed_parts(&self) -> impl Iterator<Item = &PartFailure> {
        self.failed.values()
    }

    /// Number of retries (attempts beyond the first) spent on a part.
    pub fn retry_count(&self, part_number: u16) -> u32 {
        self.retries.get(&part_number).copied().unwrap_or(0)
    }

    /// Parts taken over from an earlier run of a paused upload.
    pub fn resumed_parts(&self) -> impl Iterator<Item = u16> + '_ {
        self.resumed.iter().copied()
    }

    pub(crate) fn transition(&mut self, next: UploadState) -> Result<(), UploadErrorKind> {
        if !self.state.can_transition_to(next) {
            return Err(UploadErrorKind::IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        log::debug!(
            "upload {} of {}/{}: {} -> {}",
            self.upload_id,
            self.bucket,
            self.key,
            self.state,
            next
        );
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    pub(crate) fn mark_in_flight(&mut self, part_number: u16) {
        self.in_flight.insert(part_number);
    }

    pub(crate) fn record_success(&mut self, result: PartResult) {
        self.in_flight.remove(&result.part_number);
        self.completed.insert(result.part_number, result);
    }

    /// Records a part stored by an earlier run of this upload.
    pub(crate) fn record_resumed(&mut self, result: PartResult) {
        self.resumed.insert(result.part_number);
        self.completed.insert(result.part_number, result);
    }

    pub(crate) fn record_retry(&mut self, part_number: u16) {
        self.in_flight.remove(&part_number);
        *self.retries.entry(part_number).or_insert(0) += 1;
    }

    /// Drops a part from the in-flight set without recording an outcome.
    pub(crate) fn release(&mut self, part_number: u16) {
        self.in_flight.remove(&part_number);
    }

    pub(crate) fn record_failure(&mut self, failure: PartFailure) {
        self.in_flight.remove(&failure.part_number);
        self.failed.insert(failure.part_number, failure);
    }

    /// Returns `true` if any part failed for good.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}
