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

//! Uploads a local file through an in-memory gateway and reports each part.
//!
//! ```bash
//! RUST_LOG=info cargo run --example upload_file -- my-bucket my-object ./large.bin --concurrency 8
//! ```

use clap::Parser;
use minio_mpu::s3::Uploader;
use minio_mpu::s3::client::{UploadContext, UploadHooks};
use minio_mpu::s3::data_source::{DataSource, FileSource};
use minio_mpu::s3::error::PartError;
use minio_mpu::s3::gateway::MemoryGateway;
use minio_mpu::s3::options::{RetryPolicy, UploadOptions};
use minio_mpu::s3::types::{PartResult, UploadState};
use minio_mpu::s3::utils::ChecksumAlgorithm;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Upload a file as a multipart upload.
#[derive(Parser)]
struct Cli {
    /// Bucket to upload the file to (created in the in-memory store).
    bucket: String,
    /// Object key to upload the file to.
    object: String,
    /// File to upload.
    file: PathBuf,
    /// Part size hint in MiB.
    #[arg(long, default_value_t = 8)]
    part_size_mib: u64,
    #[arg(long, default_value_t = 4)]
    concurrency: usize,
    /// Attempts per request, including the first.
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,
    /// Give up on the whole upload after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Additional part checksum: CRC32, CRC32C, CRC64NVME, SHA1 or SHA256.
    #[arg(long)]
    checksum: Option<ChecksumAlgorithm>,
}

/// Prints progress for every part.
#[derive(Debug)]
struct ProgressHook {
    total_bytes: u64,
}

#[async_trait::async_trait]
impl UploadHooks for ProgressHook {
    fn name(&self) -> &'static str {
        "progress"
    }

    async fn on_state_change(&self, ctx: UploadContext<'_>, from: UploadState, to: UploadState) {
        println!("{} [{}]: {from} -> {to}", ctx.key, ctx.upload_id);
    }

    async fn on_part_complete(&self, _ctx: UploadContext<'_>, part: &PartResult) {
        println!(
            "  part {:>5}  {:>10} bytes of {}  {}",
            part.part_number, part.size, self.total_bytes, part.etag
        );
    }

    async fn on_part_retry(
        &self,
        _ctx: UploadContext<'_>,
        part_number: u16,
        attempt: u32,
        error: &PartError,
        delay: Duration,
    ) {
        println!("  part {part_number:>5}  attempt {attempt} in {delay:?} after: {error}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init(); // Note: set environment variable RUST_LOG="INFO" to log info and higher
    let args = Cli::parse();

    let gateway = Arc::new(MemoryGateway::new());
    gateway.create_bucket(&args.bucket);

    let source = FileSource::open(&args.file).await?;
    let total_bytes = source.size();

    let mut options = UploadOptions::default()
        .part_size(args.part_size_mib * 1024 * 1024)
        .concurrency(args.concurrency)
        .retry_policy(RetryPolicy::default().max_attempts(args.max_attempts));
    if let Some(secs) = args.timeout_secs {
        options = options.session_timeout(Duration::from_secs(secs));
    }
    if let Some(algorithm) = args.checksum {
        options = options.checksum_algorithm(algorithm);
    }

    let uploader = Uploader::builder(gateway.clone())
        .hook(Arc::new(ProgressHook { total_bytes }))
        .default_options(options)
        .build();

    // Ctrl-C cancels the upload; parts in flight finish and the upload is aborted.
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let source: Arc<dyn DataSource> = Arc::new(source);
    let info = uploader
        .upload_object(&args.bucket, &args.object, source)
        .cancellation(cancel)
        .build()
        .send()
        .await?;

    log::info!(
        "file '{}' is successfully uploaded as object '{}' to bucket '{}' ({} parts, etag {}).",
        args.file.display(),
        info.key,
        info.bucket,
        info.part_count(),
        info.etag
    );
    if let Some(checksum) = &info.checksum {
        log::info!("composite checksum: {checksum}");
    }
    Ok(())
}
