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

use async_trait::async_trait;
use bytes::Bytes;
use minio_mpu::s3::data_source::DataSource;
use std::io;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory source that records how many reads overlapped in time.
#[derive(Debug)]
pub struct CountingSource {
    data: Bytes,
    concurrent_reads: bool,
    read_delay: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
    reads: AtomicUsize,
    fail_at: Option<u64>,
    panic_at: Option<u64>,
}

impl CountingSource {
    pub fn new(data: Bytes, concurrent_reads: bool) -> Self {
        Self {
            data,
            concurrent_reads,
            read_delay: Duration::from_millis(5),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            fail_at: None,
            panic_at: None,
        }
    }

    /// Fails every read whose range contains `offset`.
    pub fn fail_at(mut self, offset: u64) -> Self {
        self.fail_at = Some(offset);
        self
    }

    /// Panics in every read whose range contains `offset`.
    pub fn panic_at(mut self, offset: u64) -> Self {
        self.panic_at = Some(offset);
        self
    }

    pub fn max_concurrent_reads(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for CountingSource {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn supports_concurrent_reads(&self) -> bool {
        self.concurrent_reads
    }

    async fn read_range(&self, range: Range<u64>) -> io::Result<Bytes> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        tokio::time::sleep(self.read_delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if let Some(offset) = self.panic_at {
            if range.contains(&offset) {
                panic!("source corrupted at offset {offset}");
            }
        }
        if let Some(offset) = self.fail_at {
            if range.contains(&offset) {
                return Err(io::Error::other("disk read error"));
            }
        }
        Ok(self.data.slice(range.start as usize..range.end as usize))
    }
}
