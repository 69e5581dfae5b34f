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

//! Splits an object into numbered, contiguous parts

use crate::s3::error::ValidationErr;
use crate::s3::types::PartSpec;

pub const MIN_PART_SIZE: u64 = 5_242_880; // 5 MiB
pub const MAX_PART_SIZE: u64 = 5_368_709_120; // 5 GiB
pub const MAX_MULTIPART_COUNT: u16 = 10_000;

/// Immutable description of how an object is split into parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadPlan {
    object_size: u64,
    part_size: u64,
    parts: Vec<PartSpec>,
}

impl UploadPlan {
    pub fn object_size(&self) -> u64 {
        self.object_size
    }

    /// Effective part size; every part but the last has exactly this length.
    pub fn part_size(&self) -> u64 {
        self.part_size
    }

    /// Parts in ascending part-number order.
    pub fn parts(&self) -> &[PartSpec] {
        &self.parts
    }

    pub fn part_count(&self) -> u16 {
        self.parts.len() as u16
    }

    /// Looks up a part by its 1-based part number.
    pub fn part(&self, part_number: u16) -> Option<&PartSpec> {
        if part_number == 0 {
            return None;
        }
        self.parts.get(part_number as usize - 1)
    }
}

/// Computes part boundaries for an object of `total_size` bytes.
///
/// `part_size_hint` is clamped to [`MIN_PART_SIZE`, `MAX_PART_SIZE`]. If the
/// clamped size would need more than [`MAX_MULTIPART_COUNT`] parts, the part
/// size is raised to the smallest value that fits. Objects smaller than one
/// part are uploaded as a single, short part.
///
/// ```
/// use minio_mpu::s3::multipart::plan;
///
/// let plan = plan(12 * 1024 * 1024, 5 * 1024 * 1024).unwrap();
/// assert_eq!(plan.part_count(), 3);
/// assert_eq!(plan.parts()[2].range, 10_485_760..12_582_912);
/// ```
pub fn plan(total_size: u64, part_size_hint: u64) -> Result<UploadPlan, ValidationErr> {
    if total_size == 0 {
        return Err(ValidationErr::InvalidSize {
            object_size: total_size,
        });
    }

    let max_total = MAX_PART_SIZE * MAX_MULTIPART_COUNT as u64;
    if total_size > max_total {
        return Err(ValidationErr::TooManyParts {
            object_size: total_size,
            max_parts: MAX_MULTIPART_COUNT,
            max_part_size: MAX_PART_SIZE,
        });
    }

    let mut part_size = part_size_hint.clamp(MIN_PART_SIZE, MAX_PART_SIZE);
    if total_size.div_ceil(part_size) > MAX_MULTIPART_COUNT as u64 {
        part_size = total_size.div_ceil(MAX_MULTIPART_COUNT as u64);
    }

    let part_count = total_size.div_ceil(part_size);
    let mut parts = Vec::with_capacity(part_count as usize);
    let mut start = 0_u64;
    let mut part_number = 1_u16;
    while start < total_size {
        let end = (start + part_size).min(total_size);
        parts.push(PartSpec {
            part_number,
            range: start..end,
        });
        start = end;
        part_number += 1;
    }

    Ok(UploadPlan {
        object_size: total_size,
        part_size,
        parts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;
    const GIB: u64 = 1024 * MIB;
    const TIB: u64 = 1024 * GIB;

    fn check_coverage(plan: &UploadPlan) -> bool {
        let parts = plan.parts();
        if parts.is_empty() || parts.len() > MAX_MULTIPART_COUNT as usize {
            return false;
        }
        let mut expected_start = 0;
        for (i, p) in parts.iter().enumerate() {
            if p.part_number as usize != i + 1 || p.range.start != expected_start || p.is_empty() {
                return false;
            }
            if i + 1 < parts.len() && p.len() != plan.part_size() {
                return false;
            }
            expected_start = p.range.end;
        }
        expected_start == plan.object_size()
    }

    #[test]
    fn test_empty_object_is_rejected() {
        assert_eq!(
            plan(0, 8 * MIB),
            Err(ValidationErr::InvalidSize { object_size: 0 })
        );
    }

    #[test]
    fn test_too_many_parts() {
        let err = plan(50 * TIB + 1, 5 * GIB).unwrap_err();
        assert!(matches!(err, ValidationErr::TooManyParts { max_parts: 10_000, .. }));
    }

    #[test]
    fn test_hint_is_clamped() {
        let p = plan(100 * MIB, 1).unwrap();
        assert_eq!(p.part_size(), MIN_PART_SIZE);
        assert_eq!(p.part_count(), 20);

        let p = plan(6 * GIB, 10 * GIB).unwrap();
        assert_eq!(p.part_size(), MAX_PART_SIZE);
        assert_eq!(p.part_count(), 2);
    }

    #[test]
    fn test_small_object_is_one_short_part() {
        let p = plan(1, 8 * MIB).unwrap();
        assert_eq!(p.part_count(), 1);
        assert_eq!(p.parts()[0].range, 0..1);
    }

    #[test]
    fn test_part_size_raised_to_fit_part_limit() {
        let total = 100 * GIB;
        let p = plan(total, 5 * MIB).unwrap();
        assert_eq!(p.part_size(), total.div_ceil(10_000));
        assert!(p.part_count() <= MAX_MULTIPART_COUNT);
        assert!(check_coverage(&p));
    }

    #[test]
    fn test_largest_object() {
        let p = plan(MAX_PART_SIZE * 10_000, 5 * MIB).unwrap();
        assert_eq!(p.part_count(), 10_000);
        assert_eq!(p.part_size(), MAX_PART_SIZE);
    }

    #[test]
    fn test_part_lookup() {
        let p = plan(12 * MIB, 5 * MIB).unwrap();
        assert!(p.part(0).is_none());
        assert_eq!(p.part(2).map(|s| s.range.clone()), Some(5 * MIB..10 * MIB));
        assert!(p.part(4).is_none());
    }

    quickcheck! {
        fn prop_plan_covers_object(total: u64, hint: u64) -> bool {
            let total = total % (MAX_PART_SIZE * MAX_MULTIPART_COUNT as u64) + 1;
            match plan(total, hint) {
                Ok(p) => check_coverage(&p),
                Err(_) => false,
            }
        }

        fn prop_plan_is_deterministic(total: u32, hint: u32) -> bool {
            let total = total as u64 + 1;
            plan(total, hint as u64) == plan(total, hint as u64)
        }
    }
}
