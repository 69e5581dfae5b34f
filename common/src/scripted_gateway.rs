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

//! Gateway wrapper that injects failures and records every call.

use async_trait::async_trait;
use minio_mpu::s3::error::TransportError;
use minio_mpu::s3::utils::{ChecksumAlgorithm, ChecksumLocation};
use minio_mpu::s3::gateway::{
    AbortMultipartUploadRequest, CompleteMultipartUploadOutput, CompleteMultipartUploadRequest,
    CreateMultipartUploadOutput, CreateMultipartUploadRequest, HeadObjectOutput,
    HeadObjectRequest, ListPartsRequest, MemoryGateway, PartInfo, TransportGateway,
    UploadPartOutput, UploadPartRequest,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A gateway call as seen by [`ScriptedGateway`], recorded on entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    CreateMultipartUpload,
    UploadPart(u16),
    /// Part numbers in the order they were sent.
    CompleteMultipartUpload(Vec<u16>),
    AbortMultipartUpload(String),
    ListParts(String),
    HeadObject,
}

#[derive(Debug, Default)]
struct Script {
    create_failures: VecDeque<TransportError>,
    part_failures: HashMap<u16, VecDeque<TransportError>>,
    part_delays: HashMap<u16, VecDeque<Duration>>,
    complete_failures: VecDeque<TransportError>,
    lost_complete_responses: VecDeque<TransportError>,
    abort_failures: VecDeque<TransportError>,
    cancel_after_parts: Option<(usize, CancellationToken)>,
    parts_uploaded: usize,
    parts_started_after_cancel: usize,
}

/// [`MemoryGateway`] with scripted failures.
///
/// Failures are queued per operation and consumed one call at a time, after
/// which calls reach the wrapped gateway.
#[derive(Debug)]
pub struct ScriptedGateway {
    inner: MemoryGateway,
    script: Mutex<Script>,
    calls: Mutex<Vec<Call>>,
    part_checksums: Mutex<Vec<(u16, Option<ChecksumAlgorithm>, ChecksumLocation)>>,
    active_parts: AtomicUsize,
    max_active_parts: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new(inner: MemoryGateway) -> Self {
        Self {
            inner,
            script: Mutex::new(Script::default()),
            calls: Mutex::new(Vec::new()),
            part_checksums: Mutex::new(Vec::new()),
            active_parts: AtomicUsize::new(0),
            max_active_parts: AtomicUsize::new(0),
        }
    }

    pub fn memory(&self) -> &MemoryGateway {
        &self.inner
    }

    pub fn fail_create(&self, times: usize, err: TransportError) {
        let mut script = self.script.lock().unwrap();
        script
            .create_failures
            .extend(std::iter::repeat_n(err, times));
    }

    pub fn fail_part(&self, part_number: u16, times: usize, err: TransportError) {
        let mut script = self.script.lock().unwrap();
        script
            .part_failures
            .entry(part_number)
            .or_default()
            .extend(std::iter::repeat_n(err, times));
    }

    /// Delays the next UploadPart call of `part_number` by `delay`.
    pub fn delay_part(&self, part_number: u16, delay: Duration) {
        let mut script = self.script.lock().unwrap();
        script
            .part_delays
            .entry(part_number)
            .or_default()
            .push_back(delay);
    }

    pub fn fail_complete(&self, times: usize, err: TransportError) {
        let mut script = self.script.lock().unwrap();
        script
            .complete_failures
            .extend(std::iter::repeat_n(err, times));
    }

    /// Commits the next CompleteMultipartUpload on the wrapped gateway but
    /// answers with `err`, as if the response was lost.
    pub fn lose_complete_response(&self, err: TransportError) {
        let mut script = self.script.lock().unwrap();
        script.lost_complete_responses.push_back(err);
    }

    pub fn fail_abort(&self, times: usize, err: TransportError) {
        let mut script = self.script.lock().unwrap();
        script
            .abort_failures
            .extend(std::iter::repeat_n(err, times));
    }

    /// Cancels `token` once `parts` UploadPart calls have succeeded. Works for
    /// pause tokens too.
    pub fn cancel_after_parts(&self, parts: usize, token: CancellationToken) {
        let mut script = self.script.lock().unwrap();
        script.cancel_after_parts = Some((parts, token));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn create_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::CreateMultipartUpload))
    }

    /// UploadPart calls for any part.
    pub fn upload_part_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::UploadPart(_)))
    }

    /// UploadPart calls for `part_number`.
    pub fn part_calls(&self, part_number: u16) -> usize {
        self.count(|c| *c == Call::UploadPart(part_number))
    }

    pub fn complete_calls(&self) -> Vec<Vec<u16>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CompleteMultipartUpload(parts) => Some(parts),
                _ => None,
            })
            .collect()
    }

    pub fn abort_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::AbortMultipartUpload(_)))
    }

    pub fn head_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::HeadObject))
    }

    /// Checksum algorithm and location of every UploadPart call, in call order.
    pub fn part_checksums(&self) -> Vec<(u16, Option<ChecksumAlgorithm>, ChecksumLocation)> {
        self.part_checksums.lock().unwrap().clone()
    }

    pub fn list_parts_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::ListParts(_)))
    }

    /// UploadPart calls that arrived after the token given to
    /// [`cancel_after_parts`](Self::cancel_after_parts) fired.
    pub fn parts_started_after_cancel(&self) -> usize {
        self.script.lock().unwrap().parts_started_after_cancel
    }

    /// Highest number of UploadPart calls that were running at once.
    pub fn max_concurrent_parts(&self) -> usize {
        self.max_active_parts.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        log::trace!("scripted gateway: {call:?}");
        self.calls.lock().unwrap().push(call);
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }
}

/// Counts a running call until dropped, including when the caller's timeout
/// drops the call future.
struct ActiveCall<'a> {
    counter: &'a AtomicUsize,
    count: usize,
}

impl<'a> ActiveCall<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Self { counter, count }
    }
}

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransportGateway for ScriptedGateway {
    async fn create_multipart_upload(
        &self,
        request: CreateMultipartUploadRequest,
    ) -> Result<CreateMultipartUploadOutput, TransportError> {
        self.record(Call::CreateMultipartUpload);
        let injected = self.script.lock().unwrap().create_failures.pop_front();
        if let Some(err) = injected {
            return Err(err);
        }
        self.inner.create_multipart_upload(request).await
    }

    async fn upload_part(
        &self,
        request: UploadPartRequest,
    ) -> Result<UploadPartOutput, TransportError> {
        let part_number = request.part_number;
        self.record(Call::UploadPart(part_number));
        self.part_checksums.lock().unwrap().push((
            part_number,
            request.checksum.as_ref().map(|(algorithm, _)| *algorithm),
            request.checksum_location,
        ));

        let active = ActiveCall::enter(&self.active_parts);
        self.max_active_parts.fetch_max(active.count, Ordering::SeqCst);
        let (delay, injected) = {
            let mut script = self.script.lock().unwrap();
            if matches!(&script.cancel_after_parts, Some((_, token)) if token.is_cancelled()) {
                script.parts_started_after_cancel += 1;
            }
            let delay = script
                .part_delays
                .get_mut(&part_number)
                .and_then(VecDeque::pop_front);
            let injected = script
                .part_failures
                .get_mut(&part_number)
                .and_then(VecDeque::pop_front);
            (delay, injected)
        };
        // Keeps the call visible as running for a moment so overlapping
        // calls can be observed.
        tokio::time::sleep(delay.unwrap_or(Duration::from_millis(2))).await;
        drop(active);

        if let Some(err) = injected {
            return Err(err);
        }
        let output = self.inner.upload_part(request).await?;

        let mut script = self.script.lock().unwrap();
        script.parts_uploaded += 1;
        if let Some((after, token)) = &script.cancel_after_parts {
            if script.parts_uploaded >= *after {
                token.cancel();
            }
        }
        Ok(output)
    }

    async fn complete_multipart_upload(
        &self,
        request: CompleteMultipartUploadRequest,
    ) -> Result<CompleteMultipartUploadOutput, TransportError> {
        self.record(Call::CompleteMultipartUpload(
            request.parts.iter().map(|p| p.part_number).collect(),
        ));
        let (injected, lost) = {
            let mut script = self.script.lock().unwrap();
            match script.complete_failures.pop_front() {
                Some(err) => (Some(err), None),
                None => (None, script.lost_complete_responses.pop_front()),
            }
        };
        if let Some(err) = injected {
            return Err(err);
        }
        let output = self.inner.complete_multipart_upload(request).await?;
        match lost {
            Some(err) => Err(err),
            None => Ok(output),
        }
    }

    async fn abort_multipart_upload(
        &self,
        request: AbortMultipartUploadRequest,
    ) -> Result<(), TransportError> {
        self.record(Call::AbortMultipartUpload(request.upload_id.clone()));
        let injected = self.script.lock().unwrap().abort_failures.pop_front();
        if let Some(err) = injected {
            return Err(err);
        }
        self.inner.abort_multipart_upload(request).await
    }

    async fn list_parts(
        &self,
        request: ListPartsRequest,
    ) -> Result<Vec<PartInfo>, TransportError> {
        self.record(Call::ListParts(request.upload_id.clone()));
        self.inner.list_parts(request).await
    }

    async fn head_object(
        &self,
        request: HeadObjectRequest,
    ) -> Result<Option<HeadObjectOutput>, TransportError> {
        self.record(Call::HeadObject);
        self.inner.head_object(request).await
    }
}
