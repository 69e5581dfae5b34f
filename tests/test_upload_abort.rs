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

use minio_mpu::s3::data_source::DataSource;
use minio_mpu::s3::error::{Operation, TransportError, UploadErrorKind};
use minio_mpu::s3::multipart::MIN_PART_SIZE;
use minio_mpu::s3::types::UploadState;
use minio_mpu_common::counting_source::CountingSource;
use minio_mpu_common::rand_src::rand_bytes;
use minio_mpu_common::scripted_gateway::Call;
use minio_mpu_common::test_context::TestContext;
use minio_mpu_common::utils::rand_object_name;
use std::sync::Arc;

const PART: usize = MIN_PART_SIZE as usize;

fn access_denied() -> TransportError {
    TransportError::from_status(403, Some("AccessDenied"), "Access Denied.")
        .with_request_id("17C6C1E5A2D6F2B1")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn permanent_part_failure_aborts() {
    let ctx = TestContext::new();
    ctx.gateway.fail_part(2, 1, access_denied());

    let err = ctx
        .uploader
        .upload_object(&ctx.bucket, rand_object_name(), rand_bytes(3 * PART, 21))
        .build()
        .send()
        .await
        .unwrap_err();

    match err.kind() {
        UploadErrorKind::PermanentTransport { operation, source } => {
            assert_eq!(*operation, Operation::UploadPart(2));
            assert_eq!(source.status, Some(403));
            assert_eq!(source.request_id.as_deref(), Some("17C6C1E5A2D6F2B1"));
        }
        kind => panic!("unexpected error kind {kind:?}"),
    }
    let upload_id = err.upload_id().unwrap().to_string();
    assert_eq!(ctx.gateway.part_calls(2), 1);
    assert!(ctx.gateway.complete_calls().is_empty());
    assert_eq!(ctx.gateway.abort_calls(), 1);
    assert!(
        ctx.gateway
            .calls()
            .contains(&Call::AbortMultipartUpload(upload_id))
    );
    assert!(ctx.memory().list_uploads().is_empty());
    assert_eq!(err.session().unwrap().state(), UploadState::Failed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_abort_keeps_primary_cause() {
    let ctx = TestContext::new();
    let object_name = rand_object_name();
    ctx.gateway.fail_part(1, 1, access_denied());
    ctx.gateway.fail_abort(
        3,
        TransportError::from_status(500, Some("InternalError"), "We encountered an internal error."),
    );

    let err = ctx
        .uploader
        .upload_object(&ctx.bucket, &object_name, "data")
        .build()
        .send()
        .await
        .unwrap_err();

    assert!(err.is_permanent_transport());
    assert_eq!(
        err.kind().transport_error().unwrap().code.as_deref(),
        Some("AccessDenied")
    );
    let abort_error = err.abort_error().unwrap();
    assert_eq!(abort_error.status, Some(500));
    assert_eq!(ctx.gateway.abort_calls(), 3);

    // The upload is still open and can be cleaned up by id.
    let upload_id = err.upload_id().unwrap();
    assert_eq!(ctx.memory().list_uploads(), vec![upload_id.to_string()]);
    ctx.uploader
        .abort_multipart_upload(&ctx.bucket, &object_name, upload_id)
        .build()
        .send()
        .await
        .unwrap();
    assert!(ctx.memory().list_uploads().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn abort_of_missing_upload_succeeds() {
    let ctx = TestContext::new();
    ctx.gateway.fail_part(1, 1, access_denied());
    ctx.gateway.fail_abort(
        1,
        TransportError::from_status(404, Some("NoSuchUpload"), "The specified upload does not exist."),
    );

    let err = ctx
        .uploader
        .upload_object(&ctx.bucket, rand_object_name(), "data")
        .build()
        .send()
        .await
        .unwrap_err();

    assert!(err.is_permanent_transport());
    assert!(err.abort_error().is_none());
    assert_eq!(ctx.gateway.abort_calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn abort_unknown_upload_id() {
    let ctx = TestContext::new();

    ctx.uploader
        .abort_multipart_upload(&ctx.bucket, rand_object_name(), "unknown-upload-id")
        .build()
        .send()
        .await
        .unwrap();

    assert_eq!(ctx.gateway.abort_calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn abort_in_unknown_bucket_fails() {
    let ctx = TestContext::new();

    let err = ctx
        .uploader
        .abort_multipart_upload("no-such-bucket", rand_object_name(), "upload-id")
        .build()
        .send()
        .await
        .unwrap_err();

    assert_eq!(err.code.as_deref(), Some("NoSuchBucket"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn panicking_part_aborts_before_unwinding() {
    let ctx = TestContext::new();
    let source: Arc<dyn DataSource> = Arc::new(
        CountingSource::new(rand_bytes(2 * PART + 1, 24), true).panic_at(PART as u64 + 1),
    );

    let uploader = ctx.uploader.clone();
    let bucket = ctx.bucket.clone();
    let upload = tokio::spawn(async move {
        uploader
            .upload_object(bucket, rand_object_name(), source)
            .build()
            .send()
            .await
    });
    let err = upload.await.unwrap_err();

    assert!(err.is_panic());
    assert_eq!(ctx.gateway.create_calls(), 1);
    assert!(ctx.gateway.complete_calls().is_empty());
    assert_eq!(ctx.gateway.abort_calls(), 1);
    assert!(ctx.memory().list_uploads().is_empty());
}
