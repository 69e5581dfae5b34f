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

use bytes::Bytes;
use minio_mpu::s3::error::{Operation, UploadError, UploadErrorKind, ValidationErr};
use minio_mpu::s3::multipart::MIN_PART_SIZE;
use minio_mpu::s3::types::{ResumeToken, UploadState};
use minio_mpu::s3::utils::ChecksumAlgorithm;
use minio_mpu_common::rand_src::rand_bytes;
use minio_mpu_common::test_context::{TestContext, test_options};
use minio_mpu_common::utils::rand_object_name;
use tokio_util::sync::CancellationToken;

const PART: usize = MIN_PART_SIZE as usize;

/// Uploads `data` one part at a time and pauses once two parts are stored.
async fn paused_upload(ctx: &TestContext, object_name: &str, data: Bytes) -> UploadError {
    let pause = CancellationToken::new();
    ctx.gateway.cancel_after_parts(2, pause.clone());
    ctx.uploader
        .upload_object(&ctx.bucket, object_name, data)
        .pause(pause)
        .build()
        .send()
        .await
        .unwrap_err()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pause_leaves_upload_open() {
    let ctx = TestContext::with_options(test_options().concurrency(1));
    let object_name = rand_object_name();

    let err = paused_upload(&ctx, &object_name, rand_bytes(4 * PART + 1, 61)).await;

    assert!(err.is_paused());
    let token = err.resume_token().unwrap();
    assert_eq!(token.bucket, ctx.bucket);
    assert_eq!(token.key, object_name);
    assert_eq!(Some(token.upload_id.as_str()), err.upload_id());
    assert_eq!(token.part_size, MIN_PART_SIZE);
    assert_eq!(token.total_num_parts, 5);
    assert_eq!(token.num_parts_completed, 2);
    assert_eq!(token.checksum_algorithm, None);

    assert_eq!(ctx.gateway.upload_part_calls(), 2);
    assert_eq!(ctx.gateway.abort_calls(), 0);
    assert!(ctx.gateway.complete_calls().is_empty());
    assert_eq!(ctx.memory().list_uploads(), vec![token.upload_id.clone()]);
    assert_eq!(ctx.memory().part_numbers(&token.upload_id), Some(vec![1, 2]));

    let session = err.session().unwrap();
    assert_eq!(
        session.history(),
        &[UploadState::Created, UploadState::Uploading, UploadState::Paused]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resume_uploads_only_missing_parts() {
    let ctx = TestContext::with_options(test_options().concurrency(1));
    let object_name = rand_object_name();
    let data = rand_bytes(4 * PART + 1, 62);
    let token = paused_upload(&ctx, &object_name, data.clone())
        .await
        .resume_token()
        .cloned()
        .unwrap();

    let info = ctx
        .uploader
        .upload_object(&ctx.bucket, &object_name, data.clone())
        .resume(token.clone())
        .build()
        .send()
        .await
        .unwrap();

    assert_eq!(info.upload_id, token.upload_id);
    assert_eq!(info.part_count(), 5);
    assert_eq!(
        info.session.resumed_parts().collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(ctx.gateway.create_calls(), 1);
    assert_eq!(ctx.gateway.list_parts_calls(), 1);
    for part_number in 1..=5 {
        assert_eq!(ctx.gateway.part_calls(part_number), 1);
    }
    assert_eq!(ctx.gateway.complete_calls(), vec![vec![1, 2, 3, 4, 5]]);

    let stored = ctx.memory().get_object(&ctx.bucket, &object_name).unwrap();
    assert_eq!(stored.data, data);
    assert_eq!(stored.etag, info.etag);
    assert!(ctx.memory().list_uploads().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resume_uploads_changed_parts_again() {
    let ctx = TestContext::with_options(test_options().concurrency(1));
    let object_name = rand_object_name();
    let token = paused_upload(&ctx, &object_name, rand_bytes(2 * PART + 1, 63))
        .await
        .resume_token()
        .cloned()
        .unwrap();

    // Same size, different first part.
    let mut changed = rand_bytes(2 * PART + 1, 63).to_vec();
    changed[..PART].copy_from_slice(&rand_bytes(PART, 64));
    let changed = Bytes::from(changed);

    let info = ctx
        .uploader
        .upload_object(&ctx.bucket, &object_name, changed.clone())
        .resume(token)
        .build()
        .send()
        .await
        .unwrap();

    assert_eq!(info.session.resumed_parts().collect::<Vec<_>>(), vec![2]);
    assert_eq!(ctx.gateway.part_calls(1), 2);
    assert_eq!(ctx.gateway.part_calls(2), 1);
    let stored = ctx.memory().get_object(&ctx.bucket, &object_name).unwrap();
    assert_eq!(stored.data, changed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resume_verifies_part_checksums() {
    let ctx = TestContext::with_options(
        test_options()
            .concurrency(1)
            .checksum_algorithm(ChecksumAlgorithm::CRC32C),
    );
    let object_name = rand_object_name();
    let data = rand_bytes(3 * PART + 1, 65);
    let token = paused_upload(&ctx, &object_name, data.clone())
        .await
        .resume_token()
        .cloned()
        .unwrap();
    assert_eq!(token.checksum_algorithm, Some(ChecksumAlgorithm::CRC32C));

    let info = ctx
        .uploader
        .upload_object(&ctx.bucket, &object_name, data.clone())
        .resume(token)
        .build()
        .send()
        .await
        .unwrap();

    assert_eq!(info.session.resumed_parts().collect::<Vec<_>>(), vec![1, 2]);
    assert!(info.checksum.as_deref().is_some_and(|c| c.ends_with("-4")));
    let stored = ctx.memory().get_object(&ctx.bucket, &object_name).unwrap();
    assert_eq!(stored.data, data);
    assert_eq!(stored.checksum, info.checksum);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resume_token_must_match_the_upload() {
    let ctx = TestContext::with_options(test_options().concurrency(1));
    let object_name = rand_object_name();
    let data = rand_bytes(2 * PART + 1, 66);
    let token = paused_upload(&ctx, &object_name, data.clone())
        .await
        .resume_token()
        .cloned()
        .unwrap();
    let calls = ctx.gateway.calls().len();

    let other_key = ctx
        .uploader
        .upload_object(&ctx.bucket, rand_object_name(), data)
        .resume(token.clone())
        .build()
        .send()
        .await
        .unwrap_err();
    let other_size = ctx
        .uploader
        .upload_object(&ctx.bucket, &object_name, rand_bytes(4 * PART, 66))
        .resume(token.clone())
        .build()
        .send()
        .await
        .unwrap_err();

    for err in [other_key, other_size] {
        assert!(matches!(
            err.kind(),
            UploadErrorKind::Validation(ValidationErr::ResumeMismatch(_))
        ));
    }
    assert_eq!(ctx.gateway.calls().len(), calls);
    assert_eq!(ctx.memory().list_uploads(), vec![token.upload_id]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn resume_of_aborted_upload_fails() {
    let ctx = TestContext::with_options(test_options().concurrency(1));
    let object_name = rand_object_name();
    let data = rand_bytes(2 * PART + 1, 67);
    let token: ResumeToken = paused_upload(&ctx, &object_name, data.clone())
        .await
        .resume_token()
        .cloned()
        .unwrap();
    ctx.uploader
        .abort_multipart_upload(&ctx.bucket, &object_name, &token.upload_id)
        .build()
        .send()
        .await
        .unwrap();

    let err = ctx
        .uploader
        .upload_object(&ctx.bucket, &object_name, data)
        .resume(token)
        .build()
        .send()
        .await
        .unwrap_err();

    match err.kind() {
        UploadErrorKind::PermanentTransport { operation, source } => {
            assert_eq!(*operation, Operation::ListParts);
            assert!(source.is_no_such_upload());
        }
        kind => panic!("unexpected error kind {kind:?}"),
    }
    assert!(ctx.memory().get_object(&ctx.bucket, &object_name).is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pause_before_start_returns_no_token() {
    let ctx = TestContext::new();
    let pause = CancellationToken::new();
    pause.cancel();

    let err = ctx
        .uploader
        .upload_object(&ctx.bucket, rand_object_name(), "data")
        .pause(pause)
        .build()
        .send()
        .await
        .unwrap_err();

    assert!(err.is_paused());
    assert!(err.resume_token().is_none());
    assert!(err.upload_id().is_none());
    assert!(ctx.gateway.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_wins_over_pause() {
    let ctx = TestContext::with_options(test_options().concurrency(1));
    let pause = CancellationToken::new();
    let cancel = CancellationToken::new();
    pause.cancel();
    cancel.cancel();

    let err = ctx
        .uploader
        .upload_object(&ctx.bucket, rand_object_name(), rand_bytes(PART + 1, 68))
        .pause(pause)
        .cancellation(cancel)
        .build()
        .send()
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), UploadErrorKind::Cancelled));
}
