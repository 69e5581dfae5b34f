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

//! Planning, coordination and completion of multipart uploads

pub mod assembler;
pub mod coordinator;
pub mod planner;
pub mod retry;
pub mod session;

pub use assembler::{Commit, PriorObject, complete};
pub use coordinator::{UploadControl, UploadCoordinator};
pub use planner::{MAX_MULTIPART_COUNT, MAX_PART_SIZE, MIN_PART_SIZE, UploadPlan, plan};
pub use retry::RetryPolicy;
pub use session::UploadSession;
