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

//! # MinIO Multipart Upload Orchestrator (`minio-mpu`)
//!
//! This crate uploads large objects to MinIO and Amazon S3-compatible object
//! storage using the multipart upload protocol. An object is split into parts,
//! the parts are uploaded with bounded concurrency and per-part retries, and the
//! upload is either committed with an ordered part list or aborted so that no
//! upload is ever left silently open.
//!
//! The network side is reached through the [`s3::gateway::TransportGateway`]
//! trait. The crate ships an in-process [`s3::gateway::MemoryGateway`] that
//! follows S3 multipart semantics and is used for tests and local development.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use minio_mpu::s3::Uploader;
//! use minio_mpu::s3::gateway::MemoryGateway;
//!
//! #[tokio::main]
//! async fn main() {
//!     let gateway = Arc::new(MemoryGateway::new());
//!     gateway.create_bucket("my-bucket");
//!     let uploader = Uploader::builder(gateway).build();
//!
//!     let data = vec![0_u8; 12 * 1024 * 1024];
//!     let info = uploader
//!         .upload_object("my-bucket", "my-object", data)
//!         .build()
//!         .send()
//!         .await
//!         .expect("upload failed");
//!
//!     println!("uploaded {} with etag {}", info.key, info.etag);
//! }
//! ```
//!
//! ## Design
//! - [`s3::multipart::planner`] splits an object into at most 10,000 parts
//! - [`s3::multipart::coordinator`] owns the upload session state machine and the worker pool
//! - [`s3::multipart::assembler`] commits the ordered part list and reconciles ambiguous commits
//! - Failures surface as a single [`s3::error::UploadError`] carrying the upload id and cause chain
//! - A pause leaves the upload open and returns a [`s3::types::ResumeToken`]; a later
//!   upload with that token skips the parts already stored
//! - Parts can carry an additional CRC32, CRC32C, CRC64NVME, SHA1 or SHA256 checksum

#![allow(clippy::result_large_err)]
pub mod s3;

#[cfg(test)]
#[macro_use]
extern crate quickcheck;
