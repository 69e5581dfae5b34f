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
use minio_mpu::s3::multipart::MIN_PART_SIZE;
use minio_mpu::s3::types::UploadState;
use minio_mpu_common::hooks::{Event, RecordingHooks};
use minio_mpu_common::rand_src::rand_bytes;
use minio_mpu_common::test_context::TestContext;
use minio_mpu_common::utils::rand_object_name;
use std::sync::Arc;

const PART: usize = MIN_PART_SIZE as usize;

fn slow_down() -> TransportError {
    TransportError::from_status(503, Some("SlowDown"), "Please reduce your request rate.")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn part_recovers_after_transient_failures() {
    let ctx = TestContext::new();
    let hooks = Arc::new(RecordingHooks::default());
    let uploader = ctx.uploader_builder().hook(hooks.clone()).build();
    let object_name = rand_object_name();
    let data = rand_bytes(3 * PART + 10, 11);
    ctx.gateway.fail_part(3, 2, slow_down());

    let info = uploader
        .upload_object(&ctx.bucket, &object_name, data.clone())
        .build()
        .send()
        .await
        .unwrap();

    assert_eq!(info.retry_count(3), 2);
    assert_eq!(info.retry_count(1), 0);
    assert_eq!(ctx.gateway.part_calls(3), 3);
    assert_eq!(ctx.gateway.part_calls(1), 1);
    assert_eq!(ctx.gateway.abort_calls(), 0);

    let retries: Vec<Event> = hooks
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::PartRetry { .. }))
        .collect();
    assert_eq!(
        retries,
        vec![
            Event::PartRetry {
                part_number: 3,
                attempt: 2
            },
            Event::PartRetry {
                part_number: 3,
                attempt: 3
            },
        ]
    );

    let stored = ctx.memory().get_object(&ctx.bucket, &object_name).unwrap();
    assert_eq!(stored.data, data);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn part_exhausts_retry_budget() {
    let ctx = TestContext::new();
    let hooks = Arc::new(RecordingHooks::default());
    let uploader = ctx.uploader_builder().hook(hooks.clone()).build();
    ctx.gateway
        .fail_part(2, 3, TransportError::connection("connection reset by peer"));

    let err = uploader
        .upload_object(&ctx.bucket, rand_object_name(), rand_bytes(2 * PART + 1, 12))
        .build()
        .send()
        .await
        .unwrap_err();

    match err.kind() {
        UploadErrorKind::TransientTransport {
            operation,
            attempts,
            source,
        } => {
            assert_eq!(*operation, Operation::UploadPart(2));
            assert_eq!(*attempts, 3);
            assert!(source.is_ambiguous());
        }
        kind => panic!("unexpected error kind {kind:?}"),
    }
    assert!(err.is_transient_transport());
    assert_eq!(err.failed_parts().len(), 1);
    assert_eq!(err.failed_parts()[0].part_number, 2);
    assert_eq!(err.failed_parts()[0].attempts, 3);
    assert!(err.upload_id().is_some());
    assert!(err.abort_error().is_none());

    assert_eq!(ctx.gateway.part_calls(2), 3);
    assert_eq!(ctx.gateway.abort_calls(), 1);
    assert!(ctx.gateway.complete_calls().is_empty());
    assert!(ctx.memory().list_uploads().is_empty());

    let session = err.session().unwrap();
    assert_eq!(session.state(), UploadState::Failed);
    assert_eq!(session.retry_count(2), 2);
    assert!(hooks.events().contains(&Event::PartFailed(2)));
    assert_eq!(
        hooks.states(),
        vec![
            UploadState::Uploading,
            UploadState::Aborting,
            UploadState::Failed
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn create_is_retried() {
    let ctx = TestContext::new();
    ctx.gateway.fail_create(2, slow_down());

    let info = ctx
        .uploader
        .upload_object(&ctx.bucket, rand_object_name(), "data")
        .build()
        .send()
        .await
        .unwrap();

    assert_eq!(ctx.gateway.create_calls(), 3);
    assert_eq!(info.part_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn create_exhausts_retry_budget() {
    let ctx = TestContext::new();
    ctx.gateway.fail_create(3, slow_down());

    let err = ctx
        .uploader
        .upload_object(&ctx.bucket, rand_object_name(), "data")
        .build()
        .send()
        .await
        .unwrap_err();

    assert!(matches!(
        err.kind(),
        UploadErrorKind::TransientTransport {
            operation: Operation::CreateMultipartUpload,
            attempts: 3,
            ..
        }
    ));
    assert!(err.upload_id().is_none());
    assert_eq!(ctx.gateway.create_calls(), 3);
    assert_eq!(ctx.gateway.abort_calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn bad_digest_is_not_retried() {
    let ctx = TestContext::new();
    ctx.gateway.fail_part(
        1,
        1,
        TransportError::from_status(
            400,
            Some("BadDigest"),
            "The Content-MD5 you specified did not match what we received.",
        ),
    );

    let err = ctx
        .uploader
        .upload_object(&ctx.bucket, rand_object_name(), "data")
        .build()
        .send()
        .await
        .unwrap_err();

    assert!(err.is_permanent_transport());
    assert_eq!(ctx.gateway.part_calls(1), 1);
    assert_eq!(ctx.gateway.abort_calls(), 1);
}
