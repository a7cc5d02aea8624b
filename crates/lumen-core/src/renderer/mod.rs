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

//! Contracts and plain data shared by every stage of the frame pipeline.

pub mod camera;
pub mod device;
pub mod error;
pub mod limits;
pub mod settings;
pub mod shader;
pub mod state;
pub mod stats;

pub use self::camera::{Camera, Projection};
pub use self::device::{
    BufferDescriptor, BufferId, GraphicsDevice, ProgramHandle, ShaderHandle, TextureId,
    TextureTarget, UniformLocation, VertexArrayId,
};
pub use self::error::{ResourceError, ShaderError};
pub use self::settings::RenderPipelineSettings;
pub use self::shader::{ArrayUniform, Shader, ShaderPair, ShaderStage, Uniform, UniformValue};
pub use self::state::{BlendFunction, CullMode, DrawType, RenderState};
pub use self::stats::RenderStats;
