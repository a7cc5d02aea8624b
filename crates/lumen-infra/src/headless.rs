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

//! A graphics device that executes nothing and records everything.
//!
//! Buffers are kept in memory so uploads can be inspected. Shader sources
//! are scanned for identifiers to decide which uniforms and blocks a linked
//! program declares, and a source containing `#error` fails to link.

use ahash::AHashMap;
use lumen_core::renderer::{
    BlendFunction, BufferDescriptor, BufferId, CullMode, DrawType, GraphicsDevice, ProgramHandle,
    ResourceError, ShaderHandle, ShaderStage, TextureId, TextureTarget, UniformLocation,
    UniformValue, VertexArrayId,
};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One call made against the device, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    /// A uniform buffer was allocated.
    CreateBuffer { buffer: BufferId, size: u64 },
    /// Bytes were written into a buffer.
    WriteBuffer { buffer: BufferId, offset: u64, len: usize },
    /// A buffer was bound to a uniform block slot.
    BindBufferBase { slot: u32, buffer: BufferId },
    /// A shader stage was compiled.
    CompileShader { shader: ShaderHandle, stage: ShaderStage },
    /// A program was linked.
    LinkProgram { program: ProgramHandle },
    /// A program was deleted.
    DeleteProgram { program: ProgramHandle },
    /// A program became current.
    UseProgram { program: ProgramHandle },
    /// A uniform location was looked up by name.
    QueryUniform { program: ProgramHandle, name: String },
    /// A program's uniform block was bound to a slot.
    BindUniformBlock { program: ProgramHandle, block_index: u32, slot: u32 },
    /// A scalar, vector or matrix uniform was set.
    SetUniform { location: UniformLocation, value: UniformValue },
    /// An `int` array uniform was set.
    SetUniformI32Array { location: UniformLocation, values: Vec<i32> },
    /// A `vec4` array uniform was set.
    SetUniformVec4Array { location: UniformLocation, values: Vec<[f32; 4]> },
    /// A texture was bound to a slot.
    BindTexture { slot: u32, target: TextureTarget, texture: TextureId },
    /// Face culling changed.
    SetCullMode(CullMode),
    /// The blend function changed.
    SetBlendFunction(BlendFunction),
    /// The line width changed.
    SetLineWidth(f32),
    /// Mesh data was uploaded.
    UploadMesh { vertex_array: VertexArrayId },
    /// An indexed draw.
    DrawIndexed { vertex_array: VertexArrayId, draw_type: DrawType, count: u32 },
    /// A non-indexed draw.
    DrawArrays { vertex_array: VertexArrayId, draw_type: DrawType, count: u32 },
}

#[derive(Debug, Default)]
struct LinkedProgram {
    sources: Vec<String>,
    locations: AHashMap<String, UniformLocation>,
    blocks: AHashMap<String, u32>,
}

#[derive(Debug, Default)]
struct DeviceState {
    next_handle: u32,
    buffers: AHashMap<BufferId, Vec<u8>>,
    shaders: AHashMap<ShaderHandle, String>,
    programs: AHashMap<ProgramHandle, LinkedProgram>,
    commands: Vec<DeviceCommand>,
}

impl DeviceState {
    fn next_handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// A recording, GPU-less implementation of [`GraphicsDevice`].
#[derive(Debug, Default)]
pub struct HeadlessGraphicsDevice {
    state: Mutex<DeviceState>,
}

impl HeadlessGraphicsDevice {
    /// Creates a device with no resources.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every command recorded since creation or the last [`clear_commands`](Self::clear_commands).
    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.state().commands.clone()
    }

    /// Forgets recorded commands. Resources are kept.
    pub fn clear_commands(&self) {
        self.state().commands.clear();
    }

    /// Number of recorded commands matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&DeviceCommand) -> bool) -> usize {
        self.state().commands.iter().filter(|c| predicate(c)).count()
    }

    /// Number of indexed and non-indexed draws recorded.
    pub fn draw_calls(&self) -> usize {
        self.count(|c| {
            matches!(
                c,
                DeviceCommand::DrawIndexed { .. } | DeviceCommand::DrawArrays { .. }
            )
        })
    }

    /// Current contents of `buffer`.
    pub fn buffer_contents(&self, buffer: BufferId) -> Option<Vec<u8>> {
        self.state().buffers.get(&buffer).cloned()
    }

    /// Number of programs alive on the device.
    pub fn live_programs(&self) -> usize {
        self.state().programs.len()
    }

    fn record(&self, command: DeviceCommand) {
        self.state().commands.push(command);
    }
}

/// Returns `true` if `identifier` occurs in `source` as a whole word.
fn declares(source: &str, identifier: &str) -> bool {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_';
    source.match_indices(identifier).any(|(start, _)| {
        let before = source[..start].chars().next_back();
        let after = source[start + identifier.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

/// Strips an `[index]` suffix.
fn base_name(name: &str) -> &str {
    name.split('[').next().unwrap_or(name)
}

impl GraphicsDevice for HeadlessGraphicsDevice {
    fn create_buffer(&self, desc: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let mut state = self.state();
        let buffer = BufferId(state.next_handle());
        state.buffers.insert(buffer, vec![0; desc.size as usize]);
        state.commands.push(DeviceCommand::CreateBuffer {
            buffer,
            size: desc.size,
        });
        log::trace!(
            "Created buffer {:?} '{}' ({} bytes)",
            buffer,
            desc.label.as_deref().unwrap_or("unnamed"),
            desc.size
        );
        Ok(buffer)
    }

    fn write_buffer(&self, buffer: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut state = self.state();
        let contents = state
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| ResourceError::InvalidHandle(format!("{buffer:?}")))?;

        let size = contents.len() as u64;
        let end = offset + data.len() as u64;
        if end > size {
            return Err(ResourceError::OutOfBounds {
                buffer,
                offset,
                len: data.len() as u64,
                size,
            });
        }
        contents[offset as usize..end as usize].copy_from_slice(data);
        state.commands.push(DeviceCommand::WriteBuffer {
            buffer,
            offset,
            len: data.len(),
        });
        Ok(())
    }

    fn bind_buffer_base(&self, slot: u32, buffer: BufferId) {
        self.record(DeviceCommand::BindBufferBase { slot, buffer });
    }

    fn compile_shader(&self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, ResourceError> {
        let mut state = self.state();
        let shader = ShaderHandle(state.next_handle());
        state.shaders.insert(shader, source.to_string());
        state.commands.push(DeviceCommand::CompileShader { shader, stage });
        Ok(shader)
    }

    fn link_program(
        &self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, ResourceError> {
        let mut state = self.state();
        let mut sources = Vec::with_capacity(2);
        for shader in [vertex, fragment] {
            let source = state
                .shaders
                .get(&shader)
                .cloned()
                .ok_or_else(|| ResourceError::InvalidHandle(format!("{shader:?}")))?;
            sources.push(source);
        }

        if let Some(line) = sources
            .iter()
            .flat_map(|s| s.lines())
            .find(|line| line.trim_start().starts_with("#error"))
        {
            return Err(ResourceError::LinkFailed {
                info_log: line.trim().to_string(),
            });
        }

        let program = ProgramHandle(state.next_handle());
        state.programs.insert(
            program,
            LinkedProgram {
                sources,
                ..Default::default()
            },
        );
        state.commands.push(DeviceCommand::LinkProgram { program });
        Ok(program)
    }

    fn delete_program(&self, program: ProgramHandle) {
        let mut state = self.state();
        state.programs.remove(&program);
        state.commands.push(DeviceCommand::DeleteProgram { program });
    }

    fn use_program(&self, program: ProgramHandle) {
        self.record(DeviceCommand::UseProgram { program });
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let mut state = self.state();
        state.commands.push(DeviceCommand::QueryUniform {
            program,
            name: name.to_string(),
        });

        let next = state.next_handle() as i32;
        let linked = state.programs.get_mut(&program)?;
        if let Some(location) = linked.locations.get(name) {
            return Some(*location);
        }

        let declared = linked
            .sources
            .iter()
            .any(|source| declares(source, base_name(name)));
        if !declared {
            return None;
        }

        let location = UniformLocation(next);
        linked.locations.insert(name.to_string(), location);
        Some(location)
    }

    fn uniform_block_index(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        let mut state = self.state();
        let linked = state.programs.get_mut(&program)?;
        if let Some(index) = linked.blocks.get(name) {
            return Some(*index);
        }
        if !linked.sources.iter().any(|source| declares(source, name)) {
            return None;
        }
        let index = linked.blocks.len() as u32;
        linked.blocks.insert(name.to_string(), index);
        Some(index)
    }

    fn bind_uniform_block(&self, program: ProgramHandle, block_index: u32, slot: u32) {
        self.record(DeviceCommand::BindUniformBlock {
            program,
            block_index,
            slot,
        });
    }

    fn set_uniform(&self, location: UniformLocation, value: &UniformValue) {
        self.record(DeviceCommand::SetUniform {
            location,
            value: *value,
        });
    }

    fn set_uniform_i32_array(&self, location: UniformLocation, values: &[i32]) {
        self.record(DeviceCommand::SetUniformI32Array {
            location,
            values: values.to_vec(),
        });
    }

    fn set_uniform_vec4_array(&self, location: UniformLocation, values: &[[f32; 4]]) {
        self.record(DeviceCommand::SetUniformVec4Array {
            location,
            values: values.to_vec(),
        });
    }

    fn bind_texture(&self, slot: u32, target: TextureTarget, texture: TextureId) {
        self.record(DeviceCommand::BindTexture {
            slot,
            target,
            texture,
        });
    }

    fn set_cull_mode(&self, mode: CullMode) {
        self.record(DeviceCommand::SetCullMode(mode));
    }

    fn set_blend_function(&self, blend: BlendFunction) {
        self.record(DeviceCommand::SetBlendFunction(blend));
    }

    fn set_line_width(&self, width: f32) {
        self.record(DeviceCommand::SetLineWidth(width));
    }

    fn upload_mesh(&self, _vertex_count: u32, _index_count: u32) -> Result<VertexArrayId, ResourceError> {
        let mut state = self.state();
        let vertex_array = VertexArrayId(state.next_handle());
        state
            .commands
            .push(DeviceCommand::UploadMesh { vertex_array });
        Ok(vertex_array)
    }

    fn draw_indexed(&self, vertex_array: VertexArrayId, draw_type: DrawType, index_count: u32) {
        self.record(DeviceCommand::DrawIndexed {
            vertex_array,
            draw_type,
            count: index_count,
        });
    }

    fn draw_arrays(&self, vertex_array: VertexArrayId, draw_type: DrawType, vertex_count: u32) {
        self.record(DeviceCommand::DrawArrays {
            vertex_array,
            draw_type,
            count: vertex_count,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = "uniform mat4 model;\nuniform int activePointLightIndexes[24];";
    const FRAGMENT: &str = "layout(std140) uniform CameraData { mat4 view; };\nuniform sampler2D s_texture0;";

    fn linked(device: &HeadlessGraphicsDevice, fragment: &str) -> Result<ProgramHandle, ResourceError> {
        let vs = device.compile_shader(ShaderStage::Vertex, VERTEX)?;
        let fs = device.compile_shader(ShaderStage::Fragment, fragment)?;
        device.link_program(vs, fs)
    }

    #[test]
    fn whole_word_matching() {
        assert!(declares("uniform mat4 model;", "model"));
        assert!(!declares("uniform mat4 modelView;", "model"));
        assert!(!declares("uniform mat4 inverseModel;", "Model"));
    }

    #[test]
    fn declared_uniforms_resolve_and_others_do_not() {
        let device = HeadlessGraphicsDevice::new();
        let program = linked(&device, FRAGMENT).unwrap();

        let model = device.uniform_location(program, "model");
        assert!(model.is_some());
        assert_eq!(device.uniform_location(program, "model"), model);
        assert!(device.uniform_location(program, "activePointLightIndexes[0]").is_some());
        assert!(device.uniform_location(program, "s_texture0").is_some());
        assert!(device.uniform_location(program, "s_texture1").is_none());
        assert!(device.uniform_block_index(program, "CameraData").is_some());
        assert!(device.uniform_block_index(program, "PointLightCache").is_none());
    }

    #[test]
    fn error_directive_fails_link_with_log() {
        let device = HeadlessGraphicsDevice::new();
        let err = linked(&device, "#error missing output").unwrap_err();
        assert_eq!(
            err,
            ResourceError::LinkFailed {
                info_log: "#error missing output".to_string()
            }
        );
        assert_eq!(device.live_programs(), 0);
    }

    #[test]
    fn writes_are_bounds_checked() {
        let device = HeadlessGraphicsDevice::new();
        let buffer = device
            .create_buffer(&BufferDescriptor {
                label: None,
                size: 8,
            })
            .unwrap();
        device.write_buffer(buffer, 4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(device.buffer_contents(buffer).unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
        assert!(matches!(
            device.write_buffer(buffer, 6, &[0; 4]),
            Err(ResourceError::OutOfBounds { .. })
        ));
    }
}
