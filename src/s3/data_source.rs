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

//! Random-access sources of object data

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::io::{self, SeekFrom};
use std::ops::Range;
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tokio::sync::Mutex;

type IoResult<T> = core::result::Result<T, io::Error>;

/// Object data that parts can be read from by byte range.
///
/// A part may be read more than once when its upload is retried, so every
/// read must return the same bytes for the same range.
#[async_trait]
pub trait DataSource: fmt::Debug + Send + Sync {
    /// Total size in bytes.
    fn size(&self) -> u64;

    /// Returns `false` if reads must not overlap in time, e.g. because they
    /// share one file cursor.
    fn supports_concurrent_reads(&self) -> bool {
        true
    }

    /// Reads exactly the bytes in `range`.
    async fn read_range(&self, range: Range<u64>) -> IoResult<Bytes>;
}

fn check_range(range: &Range<u64>, size: u64) -> IoResult<()> {
    if range.start > range.end || range.end > size {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("range {range:?} is outside of source of {size} bytes"),
        ));
    }
    Ok(())
}

#[async_trait]
impl DataSource for Bytes {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    async fn read_range(&self, range: Range<u64>) -> IoResult<Bytes> {
        check_range(&range, self.size())?;
        Ok(self.slice(range.start as usize..range.end as usize))
    }
}

/// A file on the local filesystem. Every read opens its own handle, so ranges
/// can be read concurrently.
#[derive(Clone, Debug)]
pub struct FileSource {
    path: PathBuf,
    size: u64,
}

impl FileSource {
    pub async fn open(path: impl Into<PathBuf>) -> IoResult<Self> {
        let path = path.into();
        let size = tokio::fs::metadata(&path).await?.len();
        Ok(Self { path, size })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl DataSource for FileSource {
    fn size(&self) -> u64 {
        self.size
    }

    async fn read_range(&self, range: Range<u64>) -> IoResult<Bytes> {
        check_range(&range, self.size)?;
        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(range.start)).await?;
        let mut buf = vec![0_u8; (range.end - range.start) as usize];
        file.read_exact(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}

/// A seekable reader shared by all parts. Reads are serialized.
pub struct ReaderSource<R> {
    inner: Mutex<R>,
    size: u64,
}

impl<R> ReaderSource<R> {
    pub fn new(reader: R, size: u64) -> Self {
        Self {
            inner: Mutex::new(reader),
            size,
        }
    }
}

impl<R> fmt::Debug for ReaderSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderSource")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<R> DataSource for ReaderSource<R>
where
    R: AsyncRead + AsyncSeek + Unpin + Send,
{
    fn size(&self) -> u64 {
        self.size
    }

    fn supports_concurrent_reads(&self) -> bool {
        false
    }

    async fn read_range(&self, range: Range<u64>) -> IoResult<Bytes> {
        check_range(&range, self.size)?;
        let mut reader = self.inner.lock().await;
        reader.seek(SeekFrom::Start(range.start)).await?;
        let mut buf = vec![0_u8; (range.end - range.start) as usize];
        reader.read_exact(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}
