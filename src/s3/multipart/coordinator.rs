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

//! Drives one upload through its lifecycle.
//!
//! The coordinator creates the multipart upload, keeps at most `concurrency`
//! part attempts running on a [`JoinSet`], retries transient failures with
//! backoff and hands the finished session to the assembler. Attempt tasks
//! only report outcomes; the coordinator is the only code that touches the
//! [`UploadSession`]. Any failure after the upload id is known ends with an
//! AbortMultipartUpload. A pause ends the run without aborting and hands back
//! a [`ResumeToken`].

use super::assembler::{self, Commit, PriorObject};
use super::planner::{self, UploadPlan};
use super::retry::{RetryFailure, RetryPolicy, sleep_unless_cancelled, with_retry};
use super::session::UploadSession;
use crate::s3::client::hooks::{UploadContext, UploadHooks};
use crate::s3::data_source::DataSource;
use crate::s3::error::{
    Operation, PartError, TransportError, UploadError, UploadErrorKind, ValidationErr,
};
use crate::s3::gateway::{
    AbortMultipartUploadRequest, CreateMultipartUploadRequest, ListPartsRequest,
    TransportGateway, UploadPartRequest,
};
use crate::s3::options::UploadOptions;
use crate::s3::types::{
    FinalObjectInfo, PartFailure, PartResult, PartSpec, ResumeToken, UploadState,
};
use crate::s3::utils::{
    ChecksumAlgorithm, ChecksumLocation, check_bucket_name, check_object_name, compute_checksum,
    md5_hex, md5sum_hash, trim_etag,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

/// Runs multipart uploads against one gateway with fixed options.
#[derive(Clone, Debug)]
pub struct UploadCoordinator {
    gateway: Arc<dyn TransportGateway>,
    hooks: Vec<Arc<dyn UploadHooks>>,
    options: UploadOptions,
}

/// Caller supplied signals and state for one upload.
#[derive(Clone, Debug, Default)]
pub struct UploadControl {
    /// Stops the upload and aborts it.
    pub cancel: CancellationToken,
    /// Stops the upload and leaves it open for a later resume.
    pub pause: Option<CancellationToken>,
    /// Continues the upload a previous pause returned instead of creating a
    /// new one.
    pub resume: Option<ResumeToken>,
}

/// A part waiting to be attempted.
#[derive(Debug)]
struct PendingPart {
    spec: PartSpec,
    attempt: u32,
    delay: Duration,
}

/// What an attempt task reports back.
struct AttemptReport {
    part: PendingPart,
    result: Result<PartResult, PartError>,
}

/// Everything an attempt task needs, shared by all tasks of one upload.
#[derive(Debug)]
struct PartContext {
    gateway: Arc<dyn TransportGateway>,
    source: Arc<dyn DataSource>,
    bucket: String,
    key: String,
    upload_id: String,
    read_gate: Option<Mutex<()>>,
    content_md5: bool,
    checksum_algorithm: Option<ChecksumAlgorithm>,
    checksum_location: ChecksumLocation,
    part_timeout: Option<Duration>,
    cancel: CancellationToken,
    pause: Option<CancellationToken>,
}

impl PartContext {
    fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled() || self.pause.as_ref().is_some_and(|p| p.is_cancelled())
    }
}

/// Why an upload stopped before it was committed.
enum Halt {
    /// Abort the upload and report this cause.
    Fail(UploadErrorKind),
    /// Leave the upload open.
    Pause,
}

impl From<UploadErrorKind> for Halt {
    fn from(kind: UploadErrorKind) -> Self {
        Halt::Fail(kind)
    }
}

/// Folds cancellation, pause and the session deadline into one token that
/// stops the upload.
struct StopSignal {
    token: CancellationToken,
    cancel: CancellationToken,
    pause: Option<CancellationToken>,
    expired: Arc<AtomicBool>,
    timeout: Option<Duration>,
    watchers: Vec<JoinHandle<()>>,
}

impl StopSignal {
    fn start(control: &UploadControl, timeout: Option<Duration>) -> Self {
        let token = control.cancel.child_token();
        let expired = Arc::new(AtomicBool::new(false));
        let mut watchers = Vec::new();

        if let Some(t) = timeout {
            let token = token.clone();
            let expired = expired.clone();
            watchers.push(tokio::spawn(async move {
                tokio::time::sleep(t).await;
                expired.store(true, Ordering::SeqCst);
                token.cancel();
            }));
        }
        if let Some(pause) = &control.pause {
            if pause.is_cancelled() {
                token.cancel();
            } else {
                let pause = pause.clone();
                let token = token.clone();
                watchers.push(tokio::spawn(async move {
                    pause.cancelled().await;
                    token.cancel();
                }));
            }
        }

        Self {
            token,
            cancel: control.cancel.clone(),
            pause: control.pause.clone(),
            expired,
            timeout,
            watchers,
        }
    }

    /// The pause token is checked directly; its watcher task may not have
    /// cancelled `token` yet.
    fn is_stopped(&self) -> bool {
        self.token.is_cancelled() || self.pause.as_ref().is_some_and(|p| p.is_cancelled())
    }

    /// Cause of a stop. Cancellation wins over the deadline, which wins over
    /// a pause.
    fn halt(&self) -> Halt {
        if self.cancel.is_cancelled() {
            return Halt::Fail(UploadErrorKind::Cancelled);
        }
        if let Some(timeout) = self.timeout {
            if self.expired.load(Ordering::SeqCst) {
                return Halt::Fail(UploadErrorKind::SessionTimeout { timeout });
            }
        }
        match &self.pause {
            Some(pause) if pause.is_cancelled() => Halt::Pause,
            _ => Halt::Fail(UploadErrorKind::Cancelled),
        }
    }
}

impl Drop for StopSignal {
    fn drop(&mut self) {
        for handle in self.watchers.drain(..) {
            handle.abort();
        }
    }
}

impl UploadCoordinator {
    pub fn new(
        gateway: Arc<dyn TransportGateway>,
        hooks: Vec<Arc<dyn UploadHooks>>,
        options: UploadOptions,
    ) -> Self {
        Self {
            gateway,
            hooks,
            options,
        }
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Uploads `source` as `request.key` in `request.bucket`.
    ///
    /// Validation and planning errors are returned before any gateway call.
    /// Cancelling `control.cancel` stops dispatching new parts; parts in
    /// flight finish and the upload is aborted. Firing `control.pause` stops
    /// the same way but leaves the upload open and returns
    /// [`UploadErrorKind::Paused`] with a resume token.
    pub async fn execute(
        &self,
        mut request: CreateMultipartUploadRequest,
        source: Arc<dyn DataSource>,
        control: UploadControl,
    ) -> Result<FinalObjectInfo, UploadError> {
        let bucket = request.bucket.clone();
        let key = request.key.clone();
        let fail = |kind: UploadErrorKind| UploadError::new(&bucket, &key, kind);

        check_bucket_name(&bucket, false).map_err(|e| fail(e.into()))?;
        check_object_name(&key).map_err(|e| fail(e.into()))?;
        self.options.validate().map_err(|e| fail(e.into()))?;
        let plan = match &control.resume {
            Some(token) => self.resume_plan(token, &bucket, &key, source.size()),
            None => planner::plan(source.size(), self.options.part_size),
        }
        .map_err(|e| fail(e.into()))?;

        let signal = StopSignal::start(&control, self.options.session_timeout);
        if signal.is_stopped() {
            return Err(match signal.halt() {
                Halt::Fail(kind) => fail(kind),
                Halt::Pause => fail(UploadErrorKind::Paused {
                    resume: control.resume.clone(),
                }),
            });
        }

        log::info!(
            "uploading {} bytes to {bucket}/{key} in {} parts of {} bytes",
            plan.object_size(),
            plan.part_count(),
            plan.part_size()
        );

        // Taken before the upload exists so a lost completion response is
        // never confirmed by an older object with the same content.
        let prior = if self.options.content_md5 {
            PriorObject::lookup(self.gateway.as_ref(), &bucket, &key).await
        } else {
            PriorObject::Unknown
        };

        let upload_id = match &control.resume {
            Some(token) => {
                log::info!("resuming upload {} of {bucket}/{key}", token.upload_id);
                token.upload_id.clone()
            }
            None => {
                request.checksum_algorithm = self.options.checksum_algorithm;
                let policy = &self.options.retry_policy;
                let created =
                    with_retry(policy, Operation::CreateMultipartUpload, Some(&signal.token), || {
                        self.gateway.create_multipart_upload(request.clone())
                    })
                    .await;
                match created {
                    Ok((out, _)) => out.upload_id,
                    Err(failure) => {
                        return Err(
                            match halt_for(Operation::CreateMultipartUpload, failure, &signal) {
                                Halt::Fail(kind) => fail(kind),
                                Halt::Pause => fail(UploadErrorKind::Paused { resume: None }),
                            },
                        );
                    }
                }
            }
        };

        let mut session = UploadSession::new(upload_id, &bucket, &key);
        let resuming = control.resume.is_some();
        let outcome = self
            .drive(&mut session, &plan, source, &prior, resuming, &signal)
            .await;
        match outcome {
            Ok(commit) => {
                if commit.reconciled {
                    self.release_reconciled(&session).await;
                }
                let info = FinalObjectInfo {
                    bucket: session.bucket().to_string(),
                    key: session.key().to_string(),
                    upload_id: session.upload_id().to_string(),
                    location: commit.location,
                    etag: commit.etag,
                    version_id: commit.version_id,
                    object_size: plan.object_size(),
                    reconciled: commit.reconciled,
                    checksum: commit.checksum,
                    session,
                };
                log::info!(
                    "uploaded {}/{} (upload_id: {}, etag: {})",
                    info.bucket,
                    info.key,
                    info.upload_id,
                    info.etag
                );
                Ok(info)
            }
            Err(Halt::Pause) => {
                if let Err(e) = self.transition(&mut session, UploadState::Paused).await {
                    log::error!("{e}");
                }
                let resume = self.resume_token(&session, &plan);
                log::info!(
                    "paused upload {} of {bucket}/{key} with {} of {} parts stored",
                    resume.upload_id,
                    resume.num_parts_completed,
                    resume.total_num_parts
                );
                Err(fail(UploadErrorKind::Paused {
                    resume: Some(resume),
                })
                .with_session(session))
            }
            Err(Halt::Fail(kind)) => {
                let abort_error = self.abort(&mut session).await;
                Err(fail(kind)
                    .with_session(session)
                    .with_abort_error(abort_error))
            }
        }
    }

    /// Moves a created session to Done, or returns why it stopped, leaving
    /// the session ready for Aborting or Paused.
    async fn drive(
        &self,
        session: &mut UploadSession,
        plan: &UploadPlan,
        source: Arc<dyn DataSource>,
        prior: &PriorObject,
        resuming: bool,
        signal: &StopSignal,
    ) -> Result<Commit, Halt> {
        if signal.is_stopped() {
            return Err(signal.halt());
        }
        if resuming {
            self.take_over_parts(session, plan, source.as_ref(), signal)
                .await?;
        }
        self.transition(session, UploadState::Uploading).await?;

        if let Some(halt) = self.upload_parts(session, plan, source, signal).await {
            return Err(halt);
        }

        self.transition(session, UploadState::Completing).await?;
        let commit = assembler::complete(
            self.gateway.as_ref(),
            session,
            plan,
            prior,
            &self.options.retry_policy,
        )
        .await?;
        self.transition(session, UploadState::Done).await?;
        Ok(commit)
    }

    /// Plans a resumed upload with the part size of the paused one.
    fn resume_plan(
        &self,
        token: &ResumeToken,
        bucket: &str,
        key: &str,
        object_size: u64,
    ) -> Result<UploadPlan, ValidationErr> {
        if token.bucket != bucket || token.key != key {
            return Err(ValidationErr::ResumeMismatch(format!(
                "token is for {}/{}",
                token.bucket, token.key
            )));
        }
        if token.checksum_algorithm != self.options.checksum_algorithm {
            return Err(ValidationErr::ResumeMismatch(format!(
                "upload was created with checksum algorithm {:?}",
                token.checksum_algorithm.map(|a| a.as_str())
            )));
        }
        let plan = planner::plan(object_size, token.part_size)?;
        if plan.part_size() != token.part_size || plan.part_count() != token.total_num_parts {
            return Err(ValidationErr::ResumeMismatch(format!(
                "{object_size} bytes do not split into {} parts of {} bytes",
                token.total_num_parts, token.part_size
            )));
        }
        Ok(plan)
    }

    /// Lists the parts an earlier run stored and records those whose data
    /// still matches the source. Parts that differ are uploaded again.
    async fn take_over_parts(
        &self,
        session: &mut UploadSession,
        plan: &UploadPlan,
        source: &dyn DataSource,
        signal: &StopSignal,
    ) -> Result<(), Halt> {
        let request = ListPartsRequest {
            bucket: session.bucket().to_string(),
            key: session.key().to_string(),
            upload_id: session.upload_id().to_string(),
        };
        let listed = with_retry(
            &self.options.retry_policy,
            Operation::ListParts,
            Some(&signal.token),
            || self.gateway.list_parts(request.clone()),
        )
        .await;
        let listed = match listed {
            Ok((parts, _)) => parts,
            Err(failure) => return Err(halt_for(Operation::ListParts, failure, signal)),
        };

        for info in listed {
            if signal.is_stopped() {
                return Err(signal.halt());
            }
            let Some(spec) = plan.part(info.part_number) else {
                log::warn!(
                    "upload {} has unplanned part {}, ignoring it",
                    session.upload_id(),
                    info.part_number
                );
                continue;
            };
            if info.size != spec.len() {
                log::info!(
                    "stored part {} of {} has {} bytes, expected {}; uploading it again",
                    info.part_number,
                    session.upload_id(),
                    info.size,
                    spec.len()
                );
                continue;
            }

            let body = source.read_range(spec.range.clone()).await.map_err(|e| {
                UploadErrorKind::DataSource {
                    part_number: info.part_number,
                    source: Arc::new(e),
                }
            })?;
            let unchanged = match self.options.checksum_algorithm {
                Some(algorithm) => {
                    info.checksum.as_deref() == Some(compute_checksum(algorithm, &body).as_str())
                }
                None => trim_etag(&info.etag) == md5_hex(&body),
            };
            if !unchanged {
                log::info!(
                    "stored part {} of {} does not match the source; uploading it again",
                    info.part_number,
                    session.upload_id()
                );
                continue;
            }

            session.record_resumed(PartResult {
                part_number: info.part_number,
                etag: info.etag,
                size: info.size,
                content_md5: self.options.content_md5.then(|| md5sum_hash(&body)),
                checksum: info.checksum,
            });
        }
        log::debug!(
            "upload {} resumes with {} of {} parts stored",
            session.upload_id(),
            session.completed_parts().len(),
            plan.part_count()
        );
        Ok(())
    }

    /// Uploads every planned part the session does not hold yet. Returns the
    /// reason to stop if the upload cannot go on to completion.
    async fn upload_parts(
        &self,
        session: &mut UploadSession,
        plan: &UploadPlan,
        source: Arc<dyn DataSource>,
        signal: &StopSignal,
    ) -> Option<Halt> {
        let ctx = Arc::new(PartContext {
            gateway: self.gateway.clone(),
            read_gate: (!source.supports_concurrent_reads()).then(|| Mutex::new(())),
            source,
            bucket: session.bucket().to_string(),
            key: session.key().to_string(),
            upload_id: session.upload_id().to_string(),
            content_md5: self.options.content_md5,
            checksum_algorithm: self.options.checksum_algorithm,
            checksum_location: self.options.checksum_location,
            part_timeout: self.options.part_timeout,
            cancel: signal.token.clone(),
            pause: signal.pause.clone(),
        });
        let policy = &self.options.retry_policy;

        let mut queue: VecDeque<PendingPart> = plan
            .parts()
            .iter()
            .filter(|spec| !session.completed_parts().contains_key(&spec.part_number))
            .map(|spec| PendingPart {
                spec: spec.clone(),
                attempt: 1,
                delay: Duration::ZERO,
            })
            .collect();
        let mut tasks: JoinSet<AttemptReport> = JoinSet::new();
        let mut stop: Option<Halt> = None;

        loop {
            while stop.is_none() && tasks.len() < self.options.concurrency {
                if signal.is_stopped() {
                    stop = Some(signal.halt());
                    break;
                }
                let Some(part) = queue.pop_front() else {
                    break;
                };
                session.mark_in_flight(part.spec.part_number);
                tasks.spawn(attempt_part(ctx.clone(), part));
            }

            if tasks.is_empty() {
                break;
            }

            let joined = tokio::select! {
                joined = tasks.join_next() => joined,
                _ = signal.token.cancelled(), if stop.is_none() => {
                    log::info!("upload {} stopping, waiting for parts in flight", session.upload_id());
                    stop = Some(signal.halt());
                    continue;
                }
            };
            let report = match joined {
                Some(Ok(report)) => report,
                Some(Err(e)) if e.is_panic() => {
                    log::error!(
                        "part task of upload {} panicked, aborting the upload",
                        session.upload_id()
                    );
                    tasks.shutdown().await;
                    self.abort(session).await;
                    std::panic::resume_unwind(e.into_panic());
                }
                Some(Err(e)) => {
                    log::warn!("part task of upload {} ended: {e}", session.upload_id());
                    continue;
                }
                None => break,
            };

            let ctx_ref = UploadContext {
                bucket: &ctx.bucket,
                key: &ctx.key,
                upload_id: &ctx.upload_id,
            };
            let AttemptReport { part, result } = report;
            let part_number = part.spec.part_number;
            match result {
                Ok(result) => {
                    log::debug!(
                        "part {part_number} of {} uploaded (etag: {})",
                        ctx.upload_id,
                        result.etag
                    );
                    for hook in &self.hooks {
                        hook.on_part_complete(ctx_ref, &result).await;
                    }
                    session.record_success(result);
                }
                Err(PartError::Cancelled) => session.release(part_number),
                Err(error) if error.is_retryable() && matches!(stop, Some(Halt::Pause)) => {
                    // Uploaded again after resume.
                    session.release(part_number);
                }
                Err(error)
                    if error.is_retryable()
                        && stop.is_none()
                        && policy.allows_another(part.attempt) =>
                {
                    let delay = policy.backoff(part.attempt);
                    log::debug!(
                        "part {part_number} of {} attempt {} failed ({error}); retrying in {delay:?}",
                        ctx.upload_id,
                        part.attempt
                    );
                    for hook in &self.hooks {
                        hook.on_part_retry(ctx_ref, part_number, part.attempt + 1, &error, delay)
                            .await;
                    }
                    session.record_retry(part_number);
                    queue.push_back(PendingPart {
                        spec: part.spec,
                        attempt: part.attempt + 1,
                        delay,
                    });
                }
                Err(error) => {
                    log::warn!(
                        "part {part_number} of {} failed after {} attempts: {error}",
                        ctx.upload_id,
                        part.attempt
                    );
                    if !matches!(stop, Some(Halt::Fail(_))) {
                        stop = Some(Halt::Fail(part_failure_kind(
                            part_number,
                            part.attempt,
                            &error,
                        )));
                    }
                    let failure = PartFailure {
                        part_number,
                        attempts: part.attempt,
                        error,
                    };
                    for hook in &self.hooks {
                        hook.on_part_failed(ctx_ref, &failure).await;
                    }
                    session.record_failure(failure);
                }
            }
        }

        if stop.is_none() && signal.is_stopped() {
            stop = Some(signal.halt());
        }
        stop
    }

    fn resume_token(&self, session: &UploadSession, plan: &UploadPlan) -> ResumeToken {
        ResumeToken {
            bucket: session.bucket().to_string(),
            key: session.key().to_string(),
            upload_id: session.upload_id().to_string(),
            part_size: plan.part_size(),
            total_num_parts: plan.part_count(),
            num_parts_completed: session.completed_parts().len() as u16,
            checksum_algorithm: self.options.checksum_algorithm,
        }
    }

    /// Makes sure an upload confirmed by an existence check is not left open.
    /// Normally the upload is already gone and the abort is a no-op.
    async fn release_reconciled(&self, session: &UploadSession) {
        let request = AbortMultipartUploadRequest {
            bucket: session.bucket().to_string(),
            key: session.key().to_string(),
            upload_id: session.upload_id().to_string(),
        };
        let released =
            abort_upload(self.gateway.as_ref(), &self.options.retry_policy, request).await;
        if let Err(e) = released {
            log::warn!(
                "cleanup of reconciled upload {} of {}/{} failed: {e}",
                session.upload_id(),
                session.bucket(),
                session.key()
            );
        }
    }

    /// Aborts the upload, retrying transient failures, and leaves the session
    /// in Failed. Returns the abort error, if any.
    async fn abort(&self, session: &mut UploadSession) -> Option<TransportError> {
        if let Err(e) = self.transition(session, UploadState::Aborting).await {
            log::error!("{e}");
        }

        let request = AbortMultipartUploadRequest {
            bucket: session.bucket().to_string(),
            key: session.key().to_string(),
            upload_id: session.upload_id().to_string(),
        };
        let abort_error = abort_upload(
            self.gateway.as_ref(),
            &self.options.retry_policy,
            request,
        )
        .await
        .err();
        if let Some(error) = &abort_error {
            log::warn!(
                "aborting upload {} of {}/{} failed, it may need manual cleanup: {error}",
                session.upload_id(),
                session.bucket(),
                session.key()
            );
        }

        if let Err(e) = self.transition(session, UploadState::Failed).await {
            log::error!("{e}");
        }
        abort_error
    }

    async fn transition(
        &self,
        session: &mut UploadSession,
        next: UploadState,
    ) -> Result<(), UploadErrorKind> {
        let from = session.state();
        session.transition(next)?;
        let ctx = UploadContext {
            bucket: session.bucket(),
            key: session.key(),
            upload_id: session.upload_id(),
        };
        for hook in &self.hooks {
            hook.on_state_change(ctx, from, next).await;
        }
        Ok(())
    }
}

/// Sends AbortMultipartUpload, retrying transient failures. An upload that
/// no longer exists counts as aborted.
pub(crate) async fn abort_upload(
    gateway: &dyn TransportGateway,
    policy: &RetryPolicy,
    request: AbortMultipartUploadRequest,
) -> Result<(), TransportError> {
    let result = with_retry(policy, Operation::AbortMultipartUpload, None, || {
        gateway.abort_multipart_upload(request.clone())
    })
    .await;
    match result {
        Ok(_) => Ok(()),
        Err(RetryFailure::Permanent { error, .. }) if error.is_no_such_upload() => {
            log::debug!("upload {} was already gone", request.upload_id);
            Ok(())
        }
        Err(RetryFailure::Permanent { error, .. } | RetryFailure::Exhausted { error, .. }) => {
            Err(error)
        }
        // Not reachable without a cancellation token.
        Err(RetryFailure::Cancelled) => Ok(()),
    }
}

/// Maps a failed retried call to the reason the upload stops.
fn halt_for(operation: Operation, failure: RetryFailure, signal: &StopSignal) -> Halt {
    match failure {
        RetryFailure::Permanent { error, .. } => Halt::Fail(UploadErrorKind::PermanentTransport {
            operation,
            source: error,
        }),
        RetryFailure::Exhausted { error, attempts } => {
            Halt::Fail(UploadErrorKind::TransientTransport {
                operation,
                attempts,
                source: error,
            })
        }
        RetryFailure::Cancelled => signal.halt(),
    }
}

fn part_failure_kind(part_number: u16, attempts: u32, error: &PartError) -> UploadErrorKind {
    match error {
        PartError::Transport(e) if e.is_retryable() => UploadErrorKind::TransientTransport {
            operation: Operation::UploadPart(part_number),
            attempts,
            source: e.clone(),
        },
        PartError::Transport(e) => UploadErrorKind::PermanentTransport {
            operation: Operation::UploadPart(part_number),
            source: e.clone(),
        },
        PartError::Read(e) => UploadErrorKind::DataSource {
            part_number,
            source: e.clone(),
        },
        PartError::Cancelled => UploadErrorKind::Cancelled,
    }
}

/// One attempt at one part: backoff, read, digest, UploadPart.
async fn attempt_part(ctx: Arc<PartContext>, part: PendingPart) -> AttemptReport {
    let result = upload_one(&ctx, &part).await;
    AttemptReport { part, result }
}

async fn upload_one(ctx: &PartContext, part: &PendingPart) -> Result<PartResult, PartError> {
    if !part.delay.is_zero() && !sleep_unless_cancelled(part.delay, Some(&ctx.cancel)).await {
        return Err(PartError::Cancelled);
    }

    let body = {
        let _guard = match &ctx.read_gate {
            Some(gate) => Some(gate.lock().await),
            None => None,
        };
        // The gate may have been held for a long time by other parts.
        if ctx.is_stopped() {
            return Err(PartError::Cancelled);
        }
        ctx.source
            .read_range(part.spec.range.clone())
            .await
            .map_err(|e| PartError::Read(Arc::new(e)))?
    };
    let content_md5 = ctx.content_md5.then(|| md5sum_hash(&body));
    let checksum = ctx
        .checksum_algorithm
        .map(|algorithm| (algorithm, compute_checksum(algorithm, &body)));
    let size = body.len() as u64;

    if ctx.is_stopped() {
        return Err(PartError::Cancelled);
    }

    let request = UploadPartRequest {
        bucket: ctx.bucket.clone(),
        key: ctx.key.clone(),
        upload_id: ctx.upload_id.clone(),
        part_number: part.spec.part_number,
        body,
        content_md5: content_md5.clone(),
        checksum: checksum.clone(),
        checksum_location: ctx.checksum_location,
    };
    let call = ctx.gateway.upload_part(request);
    let output = match ctx.part_timeout {
        Some(timeout) => match tokio::time::timeout(timeout, call).await {
            Ok(res) => res?,
            Err(_) => {
                return Err(PartError::Transport(TransportError::timeout(format!(
                    "UploadPart of part {} did not finish within {timeout:?}",
                    part.spec.part_number
                ))));
            }
        },
        None => call.await?,
    };

    Ok(PartResult {
        part_number: part.spec.part_number,
        etag: output.etag,
        size,
        content_md5,
        checksum: checksum.map(|(_, value)| value),
    })
}
