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

//! Defines the error types surfaced by the graphics device and program linking.

use crate::renderer::device::BufferId;
use std::fmt;

/// An error related to the creation or update of a GPU resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// The device refused to allocate a buffer.
    BufferCreation {
        /// The label of the buffer, if one was given.
        label: String,
        /// Backend-specific detail.
        reason: String,
    },
    /// A write would run past the end of a buffer.
    OutOfBounds {
        /// The buffer being written.
        buffer: BufferId,
        /// Byte offset of the write.
        offset: u64,
        /// Length of the write in bytes.
        len: u64,
        /// Size of the buffer in bytes.
        size: u64,
    },
    /// A handle did not refer to a live resource.
    InvalidHandle(String),
    /// Program linking failed; carries the device's info log.
    LinkFailed {
        /// The device's info log for the failed link.
        info_log: String,
    },
    /// Any other backend failure.
    Backend(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::BufferCreation { label, reason } => {
                write!(f, "Failed to create buffer '{label}': {reason}")
            }
            ResourceError::OutOfBounds {
                buffer,
                offset,
                len,
                size,
            } => write!(
                f,
                "Write of {len} bytes at offset {offset} exceeds buffer {buffer:?} of {size} bytes"
            ),
            ResourceError::InvalidHandle(what) => write!(f, "Invalid resource handle: {what}"),
            ResourceError::LinkFailed { info_log } => write!(f, "Program link failed: {info_log}"),
            ResourceError::Backend(details) => write!(f, "Graphics backend error: {details}"),
        }
    }
}

impl std::error::Error for ResourceError {}

/// An error related to compiling shaders or linking them into a program.
#[derive(Debug)]
pub enum ShaderError {
    /// A shader stage failed to compile.
    CompilationFailed {
        /// The shader's name.
        name: String,
        /// The underlying device error.
        source: ResourceError,
    },
    /// The pair of stages failed to link.
    LinkFailed {
        /// Name of the vertex shader.
        vertex: String,
        /// Name of the fragment shader.
        fragment: String,
        /// The device's info log.
        info_log: String,
    },
    /// Any other device failure while building the program.
    Resource(ResourceError),
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::CompilationFailed { name, source } => {
                write!(f, "Shader '{name}' failed to compile: {source}")
            }
            ShaderError::LinkFailed {
                vertex,
                fragment,
                info_log,
            } => write!(
                f,
                "Linking failed.\nVertex shader: {vertex}\nFragment shader: {fragment}\n{info_log}"
            ),
            ShaderError::Resource(e) => write!(f, "Resource error while building program: {e}"),
        }
    }
}

impl std::error::Error for ShaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShaderError::CompilationFailed { source, .. } => Some(source),
            ShaderError::Resource(e) => Some(e),
            ShaderError::LinkFailed { .. } => None,
        }
    }
}

impl From<ResourceError> for ShaderError {
    fn from(err: ResourceError) -> Self {
        ShaderError::Resource(err)
    }
}
