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

//! The narrow graphics device contract the frame pipeline drives.
//!
//! The trait mirrors an immediate-mode, GL-style API: the pipeline binds
//! state and issues draws one job at a time. All methods take `&self`; a
//! backend serializes access internally.

use super::error::ResourceError;
use super::shader::{ShaderStage, UniformValue};
use super::state::{BlendFunction, CullMode, DrawType};
use std::borrow::Cow;
use std::fmt::Debug;

/// Handle to a GPU buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferId(pub u32);

/// Handle to a compiled shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShaderHandle(pub u32);

/// Handle to a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProgramHandle(pub u32);

/// Handle to a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureId(pub u32);

/// Handle to uploaded vertex/index data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VertexArrayId(pub u32);

/// Location of a uniform inside a linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

/// The kind of texture bound to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    /// A 2D texture.
    Texture2D,
    /// A cube map.
    CubeMap,
    /// A layered 2D texture (shadow atlas).
    Texture2DArray,
}

/// Describes a uniform buffer to create.
#[derive(Debug, Clone)]
pub struct BufferDescriptor {
    /// Debug label.
    pub label: Option<Cow<'static, str>>,
    /// Size in bytes.
    pub size: u64,
}

/// A device able to receive the pipeline's uploads, state changes and draws.
pub trait GraphicsDevice: Send + Sync + Debug {
    /// Creates a uniform buffer of `desc.size` zeroed bytes.
    fn create_buffer(&self, desc: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Writes `data` into `buffer` starting at `offset`.
    fn write_buffer(&self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Binds `buffer` to the uniform binding point `slot`.
    fn bind_buffer_base(&self, slot: u32, buffer: BufferId);

    /// Compiles one shader stage.
    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, ResourceError>;

    /// Links two stages. On failure the error carries the device's info log.
    fn link_program(
        &self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, ResourceError>;

    /// Releases a linked program.
    fn delete_program(&self, program: ProgramHandle);

    /// Makes `program` current.
    fn use_program(&self, program: ProgramHandle);

    /// Looks up a uniform by name. `None` if the program does not declare it.
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Looks up a uniform block by name. `None` if the program does not declare it.
    fn uniform_block_index(&self, program: ProgramHandle, name: &str) -> Option<u32>;

    /// Associates a uniform block of `program` with a buffer binding point.
    fn bind_uniform_block(&self, program: ProgramHandle, block_index: u32, slot: u32);

    /// Sets a scalar, vector or matrix uniform on the current program.
    fn set_uniform(&self, location: UniformLocation, value: &UniformValue);

    /// Sets an `int[]` uniform starting at `location`.
    fn set_uniform_i32_array(&self, location: UniformLocation, values: &[i32]);

    /// Sets a `vec4[]` uniform starting at `location`.
    fn set_uniform_vec4_array(&self, location: UniformLocation, values: &[[f32; 4]]);

    /// Binds `texture` to texture unit `slot`.
    fn bind_texture(&self, slot: u32, target: TextureTarget, texture: TextureId);

    /// Applies face culling.
    fn set_cull_mode(&self, mode: CullMode);

    /// Applies a blend function.
    fn set_blend_function(&self, blend: BlendFunction);

    /// Sets the rasterized line width.
    fn set_line_width(&self, width: f32);

    /// Uploads vertex and index data and returns its vertex array.
    fn upload_mesh(&self, vertex_count: u32, index_count: u32) -> Result<VertexArrayId, ResourceError>;

    /// Draws `index_count` indices from `vertex_array`.
    fn draw_indexed(&self, vertex_array: VertexArrayId, draw_type: DrawType, index_count: u32);

    /// Draws `vertex_count` vertices from `vertex_array` without an index buffer.
    fn draw_arrays(&self, vertex_array: VertexArrayId, draw_type: DrawType, vertex_count: u32);
}
