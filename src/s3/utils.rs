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

//! Various utility and helper functions

use base64::engine::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use crc_fast::{CrcAlgorithm, Digest as CrcFastDigest};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::s3::error::ValidationErr;

/// Maximum length of an object key in bytes.
pub const MAX_OBJECT_NAME_LEN: usize = 1024;

/// Encodes data using base64 algorithm
pub fn b64encode<T: AsRef<[u8]>>(input: T) -> String {
    BASE64.encode(input)
}

/// Decodes base64 data, returning `None` on malformed input.
pub fn b64decode<T: AsRef<[u8]>>(input: T) -> Option<Vec<u8>> {
    BASE64.decode(input).ok()
}

/// Gets base64 encoded MD5 hash of given data, as used by the Content-MD5 header
pub fn md5sum_hash(data: &[u8]) -> String {
    b64encode(md5::compute(data).as_slice())
}

/// Computes the ETag S3 assigns to a completed multipart object: the hex MD5
/// of the concatenated binary part digests, followed by `-<part count>`, in
/// double quotes.
///
/// `part_md5s` are the base64 Content-MD5 values of the parts in part-number
/// order. Returns `None` if any digest is malformed.
pub fn multipart_etag<'a, I>(part_md5s: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut concatenated = Vec::new();
    let mut count = 0_usize;
    for md5 in part_md5s {
        let raw = b64decode(md5)?;
        if raw.len() != 16 {
            return None;
        }
        concatenated.extend_from_slice(&raw);
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(format!("\"{:x}-{count}\"", md5::compute(&concatenated)))
}

/// Strips surrounding double quotes so ETags can be compared regardless of
/// how a gateway reports them.
pub fn trim_etag(etag: &str) -> &str {
    etag.trim_matches('"')
}

/// Lowercase hex MD5 of given data, the form S3 uses for the ETag of a part.
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Additional checksum algorithms S3 accepts for object and part uploads.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChecksumAlgorithm {
    CRC32,
    CRC32C,
    CRC64NVME,
    SHA1,
    SHA256,
}

impl ChecksumAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::CRC32 => "CRC32",
            ChecksumAlgorithm::CRC32C => "CRC32C",
            ChecksumAlgorithm::CRC64NVME => "CRC64NVME",
            ChecksumAlgorithm::SHA1 => "SHA1",
            ChecksumAlgorithm::SHA256 => "SHA256",
        }
    }

    /// Name of the `x-amz-checksum-*` header carrying this checksum.
    pub fn header_name(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::CRC32 => "x-amz-checksum-crc32",
            ChecksumAlgorithm::CRC32C => "x-amz-checksum-crc32c",
            ChecksumAlgorithm::CRC64NVME => "x-amz-checksum-crc64nvme",
            ChecksumAlgorithm::SHA1 => "x-amz-checksum-sha1",
            ChecksumAlgorithm::SHA256 => "x-amz-checksum-sha256",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = ValidationErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CRC32" => Ok(ChecksumAlgorithm::CRC32),
            "CRC32C" => Ok(ChecksumAlgorithm::CRC32C),
            "CRC64NVME" => Ok(ChecksumAlgorithm::CRC64NVME),
            "SHA1" => Ok(ChecksumAlgorithm::SHA1),
            "SHA256" => Ok(ChecksumAlgorithm::SHA256),
            _ => Err(ValidationErr::InvalidChecksumAlgorithm(s.to_string())),
        }
    }
}

/// Where a part checksum travels: in a request header, or in an aws-chunked
/// trailer after the body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumLocation {
    #[default]
    Header,
    Trailer,
}

fn crc_checksum(algorithm: CrcAlgorithm, data: &[u8]) -> u64 {
    let mut digest = CrcFastDigest::new(algorithm);
    digest.update(data);
    digest.finalize()
}

/// Base64 encoded CRC32 of given data.
pub fn crc32_checksum(data: &[u8]) -> String {
    b64encode((crc_checksum(CrcAlgorithm::Crc32IsoHdlc, data) as u32).to_be_bytes())
}

/// Base64 encoded CRC32C of given data.
pub fn crc32c(data: &[u8]) -> String {
    b64encode((crc_checksum(CrcAlgorithm::Crc32Iscsi, data) as u32).to_be_bytes())
}

/// Base64 encoded CRC64/NVME of given data.
pub fn crc64nvme_checksum(data: &[u8]) -> String {
    b64encode(crc_checksum(CrcAlgorithm::Crc64Nvme, data).to_be_bytes())
}

/// Base64 encoded SHA1 of given data.
pub fn sha1_hash(data: &[u8]) -> String {
    b64encode(Sha1::digest(data))
}

/// Base64 encoded SHA256 of given data.
pub fn sha256_checksum(data: &[u8]) -> String {
    b64encode(Sha256::digest(data))
}

/// Computes the base64 encoded checksum of `data` with `algorithm`.
pub fn compute_checksum(algorithm: ChecksumAlgorithm, data: &[u8]) -> String {
    match algorithm {
        ChecksumAlgorithm::CRC32 => crc32_checksum(data),
        ChecksumAlgorithm::CRC32C => crc32c(data),
        ChecksumAlgorithm::CRC64NVME => crc64nvme_checksum(data),
        ChecksumAlgorithm::SHA1 => sha1_hash(data),
        ChecksumAlgorithm::SHA256 => sha256_checksum(data),
    }
}

/// Computes the composite checksum of a multipart object: the checksum of
/// the concatenated binary part checksums, followed by `-<part count>`.
///
/// Returns `None` if there are no parts or a part checksum is not base64.
pub fn composite_checksum<'a, I>(algorithm: ChecksumAlgorithm, part_checksums: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut concatenated = Vec::new();
    let mut count = 0_usize;
    for checksum in part_checksums {
        concatenated.extend_from_slice(&b64decode(checksum)?);
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(format!(
        "{}-{count}",
        compute_checksum(algorithm, &concatenated)
    ))
}

/// Validates given bucket name
pub fn check_bucket_name(bucket_name: &str, strict: bool) -> Result<(), ValidationErr> {
    if bucket_name.trim().is_empty() {
        return Err(ValidationErr::InvalidBucketName(String::from(
            "bucket name cannot be empty",
        )));
    }

    if bucket_name.len() < 3 {
        return Err(ValidationErr::InvalidBucketName(String::from(
            "bucket name cannot be less than 3 characters",
        )));
    }

    if bucket_name.len() > 63 {
        return Err(ValidationErr::InvalidBucketName(String::from(
            "bucket name cannot be greater than 63 characters",
        )));
    }

    lazy_static! {
        static ref IPV4_REGEX: Regex = Regex::new(r"^((25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9][0-9]|[0-9])\.){3}(25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9][0-9]|[0-9])$").unwrap();
        static ref VALID_BUCKET_NAME_REGEX: Regex =
            Regex::new("^[A-Za-z0-9][A-Za-z0-9\\.\\-_:]{1,61}[A-Za-z0-9]$").unwrap();
        static ref VALID_BUCKET_NAME_STRICT_REGEX: Regex =
            Regex::new("^[a-z0-9][a-z0-9\\.\\-]{1,61}[a-z0-9]$").unwrap();
    }

    if IPV4_REGEX.is_match(bucket_name) {
        return Err(ValidationErr::InvalidBucketName(String::from(
            "bucket name cannot be an IP address",
        )));
    }

    if bucket_name.contains("..") || bucket_name.contains(".-") || bucket_name.contains("-.") {
        return Err(ValidationErr::InvalidBucketName(String::from(
            "bucket name contains invalid successive characters '..', '.-' or '-.'",
        )));
    }

    if strict {
        if !VALID_BUCKET_NAME_STRICT_REGEX.is_match(bucket_name) {
            return Err(ValidationErr::InvalidBucketName(String::from(
                "bucket name does not follow S3 standards strictly",
            )));
        }
    } else if !VALID_BUCKET_NAME_REGEX.is_match(bucket_name) {
        return Err(ValidationErr::InvalidBucketName(String::from(
            "bucket name does not follow S3 standards",
        )));
    }

    Ok(())
}

/// Validates given object name
pub fn check_object_name(object_name: &str) -> Result<(), ValidationErr> {
    if object_name.is_empty() {
        return Err(ValidationErr::InvalidObjectName(String::from(
            "object name cannot be empty",
        )));
    }
    if object_name.len() > MAX_OBJECT_NAME_LEN {
        return Err(ValidationErr::InvalidObjectName(format!(
            "object name cannot be longer than {MAX_OBJECT_NAME_LEN} bytes"
        )));
    }
    Ok(())
}

/// Serde helpers for durations stored as whole milliseconds.
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }

    /// Same as the parent module, for `Option<Duration>` fields.
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
        }
    }
}
