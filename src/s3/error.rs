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

//! Error definitions for multipart upload operations

use crate::s3::multipart::session::UploadSession;
use crate::s3::types::{PartFailure, ResumeToken, UploadState};
use http::StatusCode;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while validating arguments or planning an upload. No network
/// call has been made when one of these is returned.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationErr {
    #[error(
        "object size {object_size} cannot be uploaded in parts; empty objects need a single PutObject"
    )]
    InvalidSize { object_size: u64 },

    #[error(
        "object size {object_size} needs more than {max_parts} parts even with {max_part_size} byte parts"
    )]
    TooManyParts {
        object_size: u64,
        max_parts: u16,
        max_part_size: u64,
    },

    #[error("invalid bucket name: {0}")]
    InvalidBucketName(String),

    #[error("invalid object name: {0}")]
    InvalidObjectName(String),

    #[error("concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    #[error("retry budget must allow at least one attempt")]
    InvalidRetryBudget,

    #[error("invalid checksum algorithm: {0}")]
    InvalidChecksumAlgorithm(String),

    #[error("resume token does not match this upload: {0}")]
    ResumeMismatch(String),
}

/// Broad classification of a failed gateway call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The call did not finish in time.
    Timeout,
    /// The connection failed or was reset.
    Connection,
    /// The service asked the caller to slow down.
    Throttled,
    /// The service failed with a 5xx status.
    Server,
    /// The request was rejected (4xx other than throttling).
    Client,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Timeout => write!(f, "timeout"),
            TransportErrorKind::Connection => write!(f, "connection"),
            TransportErrorKind::Throttled => write!(f, "throttled"),
            TransportErrorKind::Server => write!(f, "server"),
            TransportErrorKind::Client => write!(f, "client"),
        }
    }
}

/// Error returned by a [`TransportGateway`](crate::s3::gateway::TransportGateway) call.
///
/// Carries the same information as an S3 service exception: the HTTP status,
/// the S3 error code, a message and the request id. A missing status means no
/// response was received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
    pub request_id: Option<String>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            code: None,
            message: message.into(),
            request_id: None,
        }
    }

    /// The call timed out before a response arrived.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    /// The connection was lost before a response arrived.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connection, message)
    }

    /// Builds an error from a service response, classifying it by status and
    /// S3 error code.
    pub fn from_status(status: u16, code: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind: classify(status, code),
            status: Some(status),
            code: code.map(str::to_string),
            message: message.into(),
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Returns `true` if the same request may succeed when sent again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind, TransportErrorKind::Client)
    }

    /// Returns `true` if no response was received, so the request may or may
    /// not have taken effect on the service.
    pub fn is_ambiguous(&self) -> bool {
        self.status.is_none()
            && matches!(
                self.kind,
                TransportErrorKind::Timeout | TransportErrorKind::Connection
            )
    }

    /// Returns `true` for the `NoSuchUpload` error code.
    pub fn is_no_such_upload(&self) -> bool {
        self.code.as_deref() == Some("NoSuchUpload")
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error", self.kind)?;
        if let Some(status) = self.status {
            write!(f, " (status {status}")?;
            if let Some(code) = &self.code {
                write!(f, ", code {code}")?;
            }
            write!(f, ")")?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(request_id) = &self.request_id {
            write!(f, "; request_id: {request_id}")?;
        }
        Ok(())
    }
}

impl std::error::Error for TransportError {}

fn classify(status: u16, code: Option<&str>) -> TransportErrorKind {
    match code {
        Some("SlowDown" | "Throttling" | "ThrottlingException" | "RequestLimitExceeded") => {
            return TransportErrorKind::Throttled;
        }
        Some("RequestTimeout") => return TransportErrorKind::Timeout,
        Some("InternalError" | "ServiceUnavailable") => return TransportErrorKind::Server,
        _ => {}
    }

    match StatusCode::from_u16(status) {
        Ok(StatusCode::TOO_MANY_REQUESTS) | Ok(StatusCode::SERVICE_UNAVAILABLE) => {
            TransportErrorKind::Throttled
        }
        Ok(StatusCode::REQUEST_TIMEOUT) => TransportErrorKind::Timeout,
        Ok(s) if s.is_server_error() => TransportErrorKind::Server,
        Ok(_) => TransportErrorKind::Client,
        Err(_) => TransportErrorKind::Server,
    }
}

/// Failure of a single part attempt as reported by a worker.
#[derive(Clone, Debug, Error)]
pub enum PartError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("reading part data failed: {0}")]
    Read(Arc<std::io::Error>),

    #[error("part upload was cancelled")]
    Cancelled,
}

impl PartError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PartError::Transport(e) => e.is_retryable(),
            PartError::Read(_) | PartError::Cancelled => false,
        }
    }
}

/// Gateway operation that produced a transport failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    CreateMultipartUpload,
    UploadPart(u16),
    CompleteMultipartUpload,
    AbortMultipartUpload,
    HeadObject,
    ListParts,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateMultipartUpload => write!(f, "CreateMultipartUpload"),
            Operation::UploadPart(n) => write!(f, "UploadPart (part {n})"),
            Operation::CompleteMultipartUpload => write!(f, "CompleteMultipartUpload"),
            Operation::AbortMultipartUpload => write!(f, "AbortMultipartUpload"),
            Operation::HeadObject => write!(f, "HeadObject"),
            Operation::ListParts => write!(f, "ListParts"),
        }
    }
}

/// Primary cause of a failed upload.
#[derive(Debug, Error)]
pub enum UploadErrorKind {
    #[error(transparent)]
    Validation(#[from] ValidationErr),

    #[error("{operation} failed after {attempts} attempts")]
    TransientTransport {
        operation: Operation,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("{operation} was rejected")]
    PermanentTransport {
        operation: Operation,
        #[source]
        source: TransportError,
    },

    #[error("reading data for part {part_number} failed")]
    DataSource {
        part_number: u16,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("object content could not be opened")]
    Content {
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("upload is missing parts {missing:?}")]
    IncompleteUpload { missing: Vec<u16> },

    #[error("completion could not be confirmed after {attempts} attempts")]
    AmbiguousCompletion {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("upload was cancelled")]
    Cancelled,

    /// The upload was paused. The multipart upload is left open on the
    /// service and can be continued with the resume token. No token is
    /// returned when the pause arrived before the upload was created.
    #[error("upload was paused")]
    Paused { resume: Option<ResumeToken> },

    #[error("upload exceeded the session timeout of {timeout:?}")]
    SessionTimeout { timeout: Duration },

    #[error("illegal session transition {from} -> {to}")]
    IllegalTransition { from: UploadState, to: UploadState },
}

impl UploadErrorKind {
    /// Returns the transport error at the root of this failure, if any.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            UploadErrorKind::TransientTransport { source, .. }
            | UploadErrorKind::PermanentTransport { source, .. }
            | UploadErrorKind::AmbiguousCompletion { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Terminal failure of [`UploadObject::send()`](crate::s3::builders::UploadObject::send).
///
/// Carries the upload id for manual cleanup or audit, the failing parts, the
/// primary cause and, when the abort attempt itself failed, the abort error as
/// a secondary warning. The abort error never replaces the primary cause.
#[derive(Debug)]
pub struct UploadError {
    bucket: String,
    key: String,
    upload_id: Option<String>,
    kind: UploadErrorKind,
    failed_parts: Vec<PartFailure>,
    abort_error: Option<TransportError>,
    session: Option<Box<UploadSession>>,
}

impl UploadError {
    pub(crate) fn new(bucket: &str, key: &str, kind: impl Into<UploadErrorKind>) -> Self {
        Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: None,
            kind: kind.into(),
            failed_parts: Vec::new(),
            abort_error: None,
            session: None,
        }
    }

    pub(crate) fn with_session(mut self, session: UploadSession) -> Self {
        self.upload_id = Some(session.upload_id().to_string());
        self.failed_parts = session.failed_parts().cloned().collect();
        self.session = Some(Box::new(session));
        self
    }

    pub(crate) fn with_abort_error(mut self, abort_error: Option<TransportError>) -> Self {
        self.abort_error = abort_error;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Upload id of the multipart upload, if one was created.
    pub fn upload_id(&self) -> Option<&str> {
        self.upload_id.as_deref()
    }

    pub fn kind(&self) -> &UploadErrorKind {
        &self.kind
    }

    /// Parts that failed permanently or ran out of retries.
    pub fn failed_parts(&self) -> &[PartFailure] {
        &self.failed_parts
    }

    /// Error returned by the abort attempt, if it failed.
    pub fn abort_error(&self) -> Option<&TransportError> {
        self.abort_error.as_ref()
    }

    /// Terminal session snapshot, if the upload got as far as creating one.
    pub fn session(&self) -> Option<&UploadSession> {
        self.session.as_deref()
    }

    pub fn is_permanent_transport(&self) -> bool {
        matches!(self.kind, UploadErrorKind::PermanentTransport { .. })
    }

    pub fn is_transient_transport(&self) -> bool {
        matches!(self.kind, UploadErrorKind::TransientTransport { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.kind, UploadErrorKind::Paused { .. })
    }

    /// Token to continue a paused upload with, if the upload was paused after
    /// it had been created.
    pub fn resume_token(&self) -> Option<&ResumeToken> {
        match &self.kind {
            UploadErrorKind::Paused { resume } => resume.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = if self.is_paused() { "paused" } else { "failed" };
        write!(f, "upload of '{}/{}' {outcome}", self.bucket, self.key)?;
        if let Some(upload_id) = &self.upload_id {
            write!(f, " (upload_id: {upload_id})")?;
        }
        write!(f, ": {}", self.kind)?;
        if let Some(source) = self.kind.transport_error() {
            write!(f, ": {source}")?;
        }
        if let Some(e) = &self.abort_error {
            write!(f, "; abort also failed: {e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for UploadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
