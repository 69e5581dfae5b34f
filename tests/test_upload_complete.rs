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

use minio_mpu::s3::error::{Operation, TransportError, UploadErrorKind};
use minio_mpu::s3::gateway::MemoryGateway;
use minio_mpu::s3::multipart::MIN_PART_SIZE;
use minio_mpu_common::hooks::RecordingHooks;
use minio_mpu_common::rand_src::rand_bytes;
use minio_mpu_common::test_context::{TestContext, test_options};
use minio_mpu_common::utils::rand_object_name;
use std::sync::Arc;
use std::time::Duration;

const PART: usize = MIN_PART_SIZE as usize;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parts_are_completed_in_ascending_order() {
    let ctx = TestContext::new();
    let hooks = Arc::new(RecordingHooks::default());
    let uploader = ctx.uploader_builder().hook(hooks.clone()).build();
    let object_name = rand_object_name();
    let data = rand_bytes(3 * PART + 100, 31);
    ctx.gateway.delay_part(1, Duration::from_secs(1));
    ctx.gateway.delay_part(2, Duration::from_millis(250));

    uploader
        .upload_object(&ctx.bucket, &object_name, data.clone())
        .build()
        .send()
        .await
        .unwrap();

    let finished = hooks.completed_parts();
    assert_eq!(finished.len(), 4);
    assert_eq!(finished.last(), Some(&1));
    assert_eq!(ctx.gateway.complete_calls(), vec![vec![1, 2, 3, 4]]);

    let stored = ctx.memory().get_object(&ctx.bucket, &object_name).unwrap();
    assert_eq!(stored.data, data);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lost_complete_response_is_reconciled() {
    let ctx = TestContext::new();
    let object_name = rand_object_name();
    ctx.gateway
        .lose_complete_response(TransportError::connection("connection closed before response"));

    let info = ctx
        .uploader
        .upload_object(&ctx.bucket, &object_name, rand_bytes(PART + 1, 32))
        .build()
        .send()
        .await
        .unwrap();

    assert!(info.reconciled);
    assert_eq!(ctx.gateway.complete_calls().len(), 1);
    // One lookup before the upload is created, one to confirm the commit.
    assert_eq!(ctx.gateway.head_calls(), 2);
    // The confirmed upload is released; it is already gone.
    assert_eq!(ctx.gateway.abort_calls(), 1);
    assert!(ctx.memory().list_uploads().is_empty());
    let stored = ctx.memory().get_object(&ctx.bucket, &object_name).unwrap();
    assert_eq!(stored.etag, info.etag);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn existing_object_with_same_content_is_not_a_commit() {
    let ctx = TestContext::new();
    let object_name = rand_object_name();
    let data = rand_bytes(PART + 1, 36);
    let first = ctx
        .uploader
        .upload_object(&ctx.bucket, &object_name, data.clone())
        .build()
        .send()
        .await
        .unwrap();

    // The second upload never commits, yet the key already carries the
    // multipart ETag its parts produce.
    ctx.gateway
        .fail_complete(3, TransportError::timeout("no response within 30s"));
    let err = ctx
        .uploader
        .upload_object(&ctx.bucket, &object_name, data)
        .build()
        .send()
        .await
        .unwrap_err();

    assert!(matches!(
        err.kind(),
        UploadErrorKind::AmbiguousCompletion { attempts: 3, .. }
    ));
    assert_eq!(ctx.gateway.abort_calls(), 1);
    assert!(ctx.memory().list_uploads().is_empty());
    let stored = ctx.memory().get_object(&ctx.bucket, &object_name).unwrap();
    assert_eq!(stored.etag, first.etag);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn new_version_with_same_content_is_reconciled() {
    let ctx = TestContext::with_memory(MemoryGateway::new().with_versioning(), test_options());
    let object_name = rand_object_name();
    let data = rand_bytes(PART + 1, 37);
    let first = ctx
        .uploader
        .upload_object(&ctx.bucket, &object_name, data.clone())
        .build()
        .send()
        .await
        .unwrap();

    ctx.gateway
        .lose_complete_response(TransportError::timeout("no response within 30s"));
    let second = ctx
        .uploader
        .upload_object(&ctx.bucket, &object_name, data)
        .build()
        .send()
        .await
        .unwrap();

    assert!(second.reconciled);
    assert_eq!(second.etag, first.etag);
    assert_ne!(second.version_id, first.version_id);
    assert!(ctx.memory().list_uploads().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn transient_complete_failure_is_retried() {
    let ctx = TestContext::new();
    ctx.gateway.fail_complete(
        1,
        TransportError::from_status(503, Some("ServiceUnavailable"), "Please retry."),
    );

    let info = ctx
        .uploader
        .upload_object(&ctx.bucket, rand_object_name(), rand_bytes(PART + 1, 33))
        .build()
        .send()
        .await
        .unwrap();

    assert!(!info.reconciled);
    assert_eq!(ctx.gateway.complete_calls().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unconfirmed_completion_is_ambiguous() {
    let ctx = TestContext::new();
    let object_name = rand_object_name();
    ctx.gateway
        .fail_complete(3, TransportError::timeout("no response within 30s"));

    let err = ctx
        .uploader
        .upload_object(&ctx.bucket, &object_name, rand_bytes(PART + 1, 34))
        .build()
        .send()
        .await
        .unwrap_err();

    assert!(matches!(
        err.kind(),
        UploadErrorKind::AmbiguousCompletion { attempts: 3, .. }
    ));
    assert_eq!(ctx.gateway.complete_calls().len(), 3);
    assert_eq!(ctx.gateway.abort_calls(), 1);
    assert!(ctx.memory().get_object(&ctx.bucket, &object_name).is_none());
    assert!(ctx.memory().list_uploads().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rejected_completion_aborts() {
    let ctx = TestContext::new();
    ctx.gateway.fail_complete(
        1,
        TransportError::from_status(
            400,
            Some("InvalidPart"),
            "One or more of the specified parts could not be found.",
        ),
    );

    let err = ctx
        .uploader
        .upload_object(&ctx.bucket, rand_object_name(), rand_bytes(PART + 1, 35))
        .build()
        .send()
        .await
        .unwrap_err();

    assert!(matches!(
        err.kind(),
        UploadErrorKind::PermanentTransport {
            operation: Operation::CompleteMultipartUpload,
            ..
        }
    ));
    assert_eq!(ctx.gateway.complete_calls().len(), 1);
    assert_eq!(ctx.gateway.abort_calls(), 1);
}
