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
use minio_mpu::s3::data_source::DataSource;
use minio_mpu::s3::error::{TransportErrorKind, UploadErrorKind};
use minio_mpu::s3::multipart::MIN_PART_SIZE;
use minio_mpu::s3::object_content::ObjectContent;
use minio_mpu::s3::options::UploadOptions;
use minio_mpu::s3::utils::{
    ChecksumAlgorithm, ChecksumLocation, composite_checksum, compute_checksum,
};
use minio_mpu_common::counting_source::CountingSource;
use minio_mpu_common::rand_src::rand_bytes;
use minio_mpu_common::test_context::{TestContext, test_options};
use minio_mpu_common::utils::rand_object_name;
use std::sync::Arc;
use std::time::Duration;

const PART: usize = MIN_PART_SIZE as usize;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrency_is_bounded() {
    let ctx = TestContext::with_options(test_options().concurrency(2));
    for n in 1..=5 {
        ctx.gateway.delay_part(n, Duration::from_millis(50));
    }

    ctx.uploader
        .upload_object(&ctx.bucket, rand_object_name(), rand_bytes(5 * PART, 51))
        .build()
        .send()
        .await
        .unwrap();

    assert_eq!(ctx.gateway.upload_part_calls(), 5);
    assert!(ctx.gateway.max_concurrent_parts() <= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn per_upload_options_override_defaults() {
    let ctx = TestContext::new();
    for n in 1..=3 {
        ctx.gateway.delay_part(n, Duration::from_millis(50));
    }

    ctx.uploader
        .upload_object(&ctx.bucket, rand_object_name(), rand_bytes(3 * PART, 52))
        .options(test_options().concurrency(1))
        .build()
        .send()
        .await
        .unwrap();

    assert_eq!(ctx.gateway.max_concurrent_parts(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn sequential_source_is_read_one_part_at_a_time() {
    let ctx = TestContext::new();
    let object_name = rand_object_name();
    let data = rand_bytes(4 * PART + 3, 53);
    let counted = Arc::new(CountingSource::new(data.clone(), false));
    let source: Arc<dyn DataSource> = counted.clone();

    ctx.uploader
        .upload_object(&ctx.bucket, &object_name, source)
        .build()
        .send()
        .await
        .unwrap();

    assert_eq!(counted.reads(), 5);
    assert_eq!(counted.max_concurrent_reads(), 1);
    let stored = ctx.memory().get_object(&ctx.bucket, &object_name).unwrap();
    assert_eq!(stored.data, data);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn read_failure_fails_the_part() {
    let ctx = TestContext::new();
    let counted = Arc::new(
        CountingSource::new(rand_bytes(2 * PART + 1, 54), true).fail_at(PART as u64 + 1),
    );
    let source: Arc<dyn DataSource> = counted.clone();

    let err = ctx
        .uploader
        .upload_object(&ctx.bucket, rand_object_name(), source)
        .build()
        .send()
        .await
        .unwrap_err();

    assert!(matches!(
        err.kind(),
        UploadErrorKind::DataSource { part_number: 2, .. }
    ));
    assert_eq!(ctx.gateway.part_calls(2), 0);
    assert!(ctx.gateway.complete_calls().is_empty());
    assert_eq!(ctx.gateway.abort_calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn part_timeout_triggers_retry() {
    let ctx = TestContext::with_options(test_options().part_timeout(Duration::from_secs(2)));
    let object_name = rand_object_name();
    ctx.gateway.delay_part(2, Duration::from_secs(10));

    let info = ctx
        .uploader
        .upload_object(&ctx.bucket, &object_name, rand_bytes(2 * PART, 55))
        .build()
        .send()
        .await
        .unwrap();

    assert_eq!(info.retry_count(2), 1);
    assert_eq!(ctx.gateway.part_calls(2), 2);
    assert!(ctx.memory().get_object(&ctx.bucket, &object_name).is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn part_timeout_exhausted() {
    let ctx = TestContext::with_options(test_options().part_timeout(Duration::from_millis(200)));
    for _ in 0..3 {
        ctx.gateway.delay_part(1, Duration::from_secs(2));
    }

    let err = ctx
        .uploader
        .upload_object(&ctx.bucket, rand_object_name(), "data")
        .build()
        .send()
        .await
        .unwrap_err();

    let source = err.kind().transport_error().unwrap();
    assert_eq!(source.kind, TransportErrorKind::Timeout);
    assert!(err.is_transient_transport());
    assert_eq!(ctx.gateway.part_calls(1), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn content_md5_can_be_disabled() {
    let ctx = TestContext::with_options(test_options().content_md5(false));

    let info = ctx
        .uploader
        .upload_object(&ctx.bucket, rand_object_name(), Bytes::from_static(b"no digest"))
        .build()
        .send()
        .await
        .unwrap();

    assert!(
        info.session
            .completed_parts()
            .values()
            .all(|p| p.content_md5.is_none())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn options_from_json() {
    let options: UploadOptions = serde_json::from_str(
        r#"{
            "part_size": 5242880,
            "concurrency": 3,
            "session_timeout": 60000,
            "retry_policy": {"max_attempts": 2, "base_delay": 1, "max_delay": 5}
        }"#,
    )
    .unwrap();
    assert_eq!(options.concurrency, 3);
    assert_eq!(options.session_timeout, Some(Duration::from_secs(60)));
    assert_eq!(options.retry_policy.max_attempts, 2);
    assert!(options.content_md5);

    let ctx = TestContext::with_options(options);
    let info = ctx
        .uploader
        .upload_object(
            &ctx.bucket,
            rand_object_name(),
            ObjectContent::from(rand_bytes(PART + 1, 56)),
        )
        .build()
        .send()
        .await
        .unwrap();
    assert_eq!(info.part_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn checksum_is_sent_with_every_part() {
    let ctx = TestContext::with_options(
        test_options().checksum_algorithm(ChecksumAlgorithm::SHA256),
    );
    let object_name = rand_object_name();
    let data = rand_bytes(2 * PART + 1, 57);

    let info = ctx
        .uploader
        .upload_object(&ctx.bucket, &object_name, data.clone())
        .build()
        .send()
        .await
        .unwrap();

    let part_checksums: Vec<String> = data
        .chunks(PART)
        .map(|chunk| compute_checksum(ChecksumAlgorithm::SHA256, chunk))
        .collect();
    let expected = composite_checksum(
        ChecksumAlgorithm::SHA256,
        part_checksums.iter().map(String::as_str),
    );
    assert!(expected.is_some());
    assert_eq!(info.checksum, expected);
    for (part_number, part) in info.session.completed_parts() {
        assert_eq!(
            part.checksum.as_ref(),
            Some(&part_checksums[*part_number as usize - 1])
        );
    }
    assert!(
        ctx.gateway
            .part_checksums()
            .iter()
            .all(|(_, algorithm, location)| *algorithm == Some(ChecksumAlgorithm::SHA256)
                && *location == ChecksumLocation::Header)
    );
    let stored = ctx.memory().get_object(&ctx.bucket, &object_name).unwrap();
    assert_eq!(stored.checksum, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn checksum_in_trailer() {
    let ctx = TestContext::with_options(
        test_options()
            .checksum_algorithm(ChecksumAlgorithm::CRC64NVME)
            .checksum_location(ChecksumLocation::Trailer)
            .content_md5(false),
    );

    let info = ctx
        .uploader
        .upload_object(&ctx.bucket, rand_object_name(), rand_bytes(PART + 1, 58))
        .build()
        .send()
        .await
        .unwrap();

    assert!(info.checksum.as_deref().is_some_and(|c| c.ends_with("-2")));
    assert_eq!(ctx.gateway.part_checksums().len(), 2);
    assert!(
        ctx.gateway
            .part_checksums()
            .iter()
            .all(|(_, algorithm, location)| *algorithm == Some(ChecksumAlgorithm::CRC64NVME)
                && *location == ChecksumLocation::Trailer)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn no_checksum_by_default() {
    let ctx = TestContext::new();

    let info = ctx
        .uploader
        .upload_object(&ctx.bucket, rand_object_name(), rand_bytes(PART + 1, 59))
        .build()
        .send()
        .await
        .unwrap();

    assert!(info.checksum.is_none());
    assert!(
        ctx.gateway
            .part_checksums()
            .iter()
            .all(|(_, algorithm, _)| algorithm.is_none())
    );
}
