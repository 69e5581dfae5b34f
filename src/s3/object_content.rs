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

use crate::s3::data_source::{DataSource, FileSource, ReaderSource};
use bytes::{Bytes, BytesMut};
use futures_util::stream::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncSeek};

type IoResult<T> = core::result::Result<T, std::io::Error>;

/// Object content to be uploaded.
///
/// Can be constructed from in-memory bytes, a file path, a seekable reader, a
/// stream of `Bytes` or any [`DataSource`].
pub struct ObjectContent(ObjectContentInner);

enum ObjectContentInner {
    Bytes(Bytes),
    FilePath(PathBuf),
    Source(Arc<dyn DataSource>),
    Stream(Pin<Box<dyn Stream<Item = IoResult<Bytes>> + Send>>),
}

impl From<Bytes> for ObjectContent {
    fn from(value: Bytes) -> Self {
        ObjectContent(ObjectContentInner::Bytes(value))
    }
}

impl From<String> for ObjectContent {
    fn from(value: String) -> Self {
        ObjectContent(ObjectContentInner::Bytes(Bytes::from(value)))
    }
}

impl From<Vec<u8>> for ObjectContent {
    fn from(value: Vec<u8>) -> Self {
        ObjectContent(ObjectContentInner::Bytes(Bytes::from(value)))
    }
}

impl From<&'static [u8]> for ObjectContent {
    fn from(value: &'static [u8]) -> Self {
        ObjectContent(ObjectContentInner::Bytes(Bytes::from(value)))
    }
}

impl From<&'static str> for ObjectContent {
    fn from(value: &'static str) -> Self {
        ObjectContent(ObjectContentInner::Bytes(Bytes::from(value)))
    }
}

impl From<&Path> for ObjectContent {
    fn from(value: &Path) -> Self {
        ObjectContent(ObjectContentInner::FilePath(value.to_path_buf()))
    }
}

impl From<PathBuf> for ObjectContent {
    fn from(value: PathBuf) -> Self {
        ObjectContent(ObjectContentInner::FilePath(value))
    }
}

impl From<Arc<dyn DataSource>> for ObjectContent {
    fn from(value: Arc<dyn DataSource>) -> Self {
        ObjectContent(ObjectContentInner::Source(value))
    }
}

impl ObjectContent {
    /// Content read from a seekable reader of `size` bytes. Parts are read
    /// one at a time.
    pub fn from_reader<R>(reader: R, size: u64) -> Self
    where
        R: AsyncRead + AsyncSeek + Unpin + Send + 'static,
    {
        ObjectContent(ObjectContentInner::Source(Arc::new(ReaderSource::new(
            reader, size,
        ))))
    }

    /// Content from a stream of `Bytes`. A stream cannot be re-read for
    /// retries, so it is buffered in memory first.
    pub fn new_from_stream(r: impl Stream<Item = IoResult<Bytes>> + Send + 'static) -> Self {
        ObjectContent(ObjectContentInner::Stream(Box::pin(r)))
    }

    /// Resolves the content into a random-access [`DataSource`].
    pub async fn into_data_source(self) -> IoResult<Arc<dyn DataSource>> {
        match self.0 {
            ObjectContentInner::Bytes(b) => Ok(Arc::new(b)),
            ObjectContentInner::FilePath(path) => Ok(Arc::new(FileSource::open(path).await?)),
            ObjectContentInner::Source(src) => Ok(src),
            ObjectContentInner::Stream(mut r) => {
                let mut buf = BytesMut::new();
                while let Some(bytes) = r.next().await {
                    buf.extend_from_slice(&bytes?);
                }
                Ok(Arc::new(buf.freeze()))
            }
        }
    }
}
