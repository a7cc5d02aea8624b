// Copyright 2025 eraflo
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

//! Errors surfaced by the frame pipeline.

use lumen_core::renderer::{ResourceError, ShaderError};
use thiserror::Error;

/// A failure that stops the current frame.
///
/// Recoverable conditions such as a missing material never reach this type;
/// they fall back and log instead.
#[derive(Debug, Error)]
pub enum LaneError {
    /// A program could not be compiled or linked.
    #[error("shader program unavailable: {0}")]
    Shader(#[from] ShaderError),
    /// A device resource could not be created or written.
    #[error("GPU resource failure: {0}")]
    Resource(#[from] ResourceError),
    /// The worker pool could not be started.
    #[error("failed to build the worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
