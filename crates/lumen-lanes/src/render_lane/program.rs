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

//! Linked programs and the cache that memoizes them per shader pair.

use ahash::AHashMap;
use lumen_core::renderer::limits::{binding, TEXTURE_SLOT_COUNT};
use lumen_core::renderer::{
    GraphicsDevice, ProgramHandle, ResourceError, Shader, ShaderError, ShaderPair, Uniform,
    UniformLocation, UniformValue,
};
use lumen_core::ObjectId;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Named uniform blocks and the binding points they are attached to.
pub const UNIFORM_BLOCK_BINDINGS: [(&str, u32); 6] = [
    ("CameraData", binding::CAMERA),
    ("GraphicConstatsData", binding::GRAPHICS_CONSTANTS),
    ("DirectionalLightBuffer", binding::DIRECTIONAL_LIGHT),
    ("DirectionalLightPVMBuffer", binding::DIRECTIONAL_LIGHT_PVM),
    ("PointLightCache", binding::POINT_LIGHT_CACHE),
    ("SpotLightCache", binding::SPOT_LIGHT_CACHE),
];

#[derive(Debug, Clone, Copy)]
struct CustomUniform {
    location: Option<UniformLocation>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A linked program with its uniform locations resolved.
///
/// Built-in locations are resolved at link time; a uniform the program does
/// not declare is recorded as absent so it is never queried again.
#[derive(Debug)]
pub struct GpuProgram {
    handle: ProgramHandle,
    key: [ObjectId; 2],
    uniforms: AHashMap<Uniform, Option<UniformLocation>>,
    array_uniforms: AHashMap<Uniform, Option<UniformLocation>>,
    custom_uniforms: Mutex<AHashMap<String, CustomUniform>>,
    material_stamp: Mutex<Option<(ObjectId, u32)>>,
}

impl GpuProgram {
    /// The device program.
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    /// Ids of the vertex and fragment shaders it was linked from.
    pub fn key(&self) -> [ObjectId; 2] {
        self.key
    }

    /// Location of a built-in uniform, `None` when the program lacks it.
    pub fn location(&self, uniform: Uniform) -> Option<UniformLocation> {
        self.uniforms.get(&uniform).copied().flatten()
    }

    /// Base location of a built-in array uniform.
    pub fn array_location(&self, uniform: Uniform) -> Option<UniformLocation> {
        self.array_uniforms.get(&uniform).copied().flatten()
    }

    /// Returns `true` if either stage reads `uniform`, plain or as an array.
    pub fn uses(&self, uniform: Uniform) -> bool {
        self.location(uniform).is_some() || self.array_location(uniform).is_some()
    }

    /// Feeds a built-in uniform. Does nothing if the program lacks it.
    pub fn set(&self, device: &dyn GraphicsDevice, uniform: Uniform, value: UniformValue) {
        if let Some(location) = self.location(uniform) {
            device.set_uniform(location, &value);
        }
    }

    /// Feeds a built-in `int[]` uniform.
    pub fn set_i32_array(&self, device: &dyn GraphicsDevice, uniform: Uniform, values: &[i32]) {
        if let Some(location) = self.array_location(uniform) {
            device.set_uniform_i32_array(location, values);
        }
    }

    /// Feeds a built-in `vec4[]` uniform.
    pub fn set_vec4_array(&self, device: &dyn GraphicsDevice, uniform: Uniform, values: &[[f32; 4]]) {
        if let Some(location) = self.array_location(uniform) {
            device.set_uniform_vec4_array(location, values);
        }
    }

    /// Records that the material `(id, version)` is about to be uploaded.
    ///
    /// Returns `false` when the program already holds exactly that material,
    /// in which case the upload can be skipped.
    pub fn claim_material(&self, id: ObjectId, version: u32) -> bool {
        let mut stamp = lock(&self.material_stamp);
        if *stamp == Some((id, version)) {
            return false;
        }
        *stamp = Some((id, version));
        true
    }

    /// Sets a uniform by name.
    ///
    /// The location is looked up on first use. A name the program does not
    /// declare is reported once and skipped on every later call.
    pub fn update_custom_uniform(&self, device: &dyn GraphicsDevice, name: &str, value: &UniformValue) {
        let mut customs = lock(&self.custom_uniforms);
        let custom = match customs.get(name) {
            Some(custom) => *custom,
            None => {
                let location = device.uniform_location(self.handle, name);
                if location.is_none() {
                    log::warn!("Uniform: \"{name}\" does not exist in program!");
                }
                let custom = CustomUniform { location };
                customs.insert(name.to_string(), custom);
                custom
            }
        };

        if let Some(location) = custom.location {
            device.set_uniform(location, value);
        }
    }
}

/// Memoizes one [`GpuProgram`] per (vertex, fragment) shader pair.
///
/// Also tracks which program is bound on the device, so rebinding the
/// current program is free.
#[derive(Debug, Default)]
pub struct ProgramCache {
    programs: AHashMap<[ObjectId; 2], Arc<GpuProgram>>,
    bound: Option<ProgramHandle>,
}

impl ProgramCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of linked programs.
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Returns `true` when no program is linked.
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// The cached program for `key`, if already linked.
    pub fn get(&self, key: &[ObjectId; 2]) -> Option<Arc<GpuProgram>> {
        self.programs.get(key).cloned()
    }

    /// Returns the program for `shaders`, linking it on first request.
    ///
    /// A failed link is logged and not cached; the next request retries.
    pub fn create_program(
        &mut self,
        device: &dyn GraphicsDevice,
        shaders: &ShaderPair,
    ) -> Result<Arc<GpuProgram>, ShaderError> {
        let key = shaders.key();
        if let Some(program) = self.programs.get(&key) {
            return Ok(Arc::clone(program));
        }

        let program = match self.link(device, shaders) {
            Ok(program) => Arc::new(program),
            Err(error) => {
                log::error!("{error}");
                return Err(error);
            }
        };

        log::debug!(
            "Linked program {:?} from '{}' and '{}'",
            program.handle,
            shaders.vertex.name(),
            shaders.fragment.name()
        );
        self.programs.insert(key, Arc::clone(&program));
        Ok(program)
    }

    /// The program currently bound on the device, as far as the cache knows.
    pub fn bound(&self) -> Option<ProgramHandle> {
        self.bound
    }

    /// Makes `program` current on the device. Returns `true` if it switched.
    pub fn bind(&mut self, device: &dyn GraphicsDevice, program: &GpuProgram) -> bool {
        if self.bound == Some(program.handle) {
            return false;
        }
        device.use_program(program.handle);
        self.bound = Some(program.handle);
        true
    }

    /// Deletes every cached program. The next request for any pair relinks.
    pub fn flush_programs(&mut self, device: &dyn GraphicsDevice) {
        log::debug!("Flushing {} cached programs", self.programs.len());
        for (_, program) in self.programs.drain() {
            device.delete_program(program.handle);
        }
        self.bound = None;
    }

    fn link(&mut self, device: &dyn GraphicsDevice, shaders: &ShaderPair) -> Result<GpuProgram, ShaderError> {
        let vertex = shaders.vertex.compile(device)?;
        let fragment = shaders.fragment.compile(device)?;

        let handle = device
            .link_program(vertex, fragment)
            .map_err(|error| match error {
                ResourceError::LinkFailed { info_log } => ShaderError::LinkFailed {
                    vertex: shaders.vertex.name().to_string(),
                    fragment: shaders.fragment.name().to_string(),
                    info_log,
                },
                other => ShaderError::Resource(other),
            })?;

        device.use_program(handle);
        self.bound = Some(handle);

        for slot in 0..TEXTURE_SLOT_COUNT {
            if let Some(location) = device.uniform_location(handle, &format!("s_texture{slot}")) {
                device.set_uniform(location, &UniformValue::Int(slot as i32));
            }
        }

        for (block, slot) in UNIFORM_BLOCK_BINDINGS {
            if let Some(index) = device.uniform_block_index(handle, block) {
                device.bind_uniform_block(handle, index, slot);
            }
        }

        let stages: [&Shader; 2] = [&shaders.vertex, &shaders.fragment];
        let mut uniforms = AHashMap::new();
        let mut array_uniforms = AHashMap::new();
        for shader in stages {
            for &uniform in shader.uniforms() {
                uniforms
                    .entry(uniform)
                    .or_insert_with(|| device.uniform_location(handle, uniform.name()));
            }
            for array in shader.array_uniforms() {
                array_uniforms
                    .entry(array.uniform)
                    .or_insert_with(|| device.uniform_location(handle, &array.uniform.element_name(0)));
            }
        }

        Ok(GpuProgram {
            handle,
            key: shaders.key(),
            uniforms,
            array_uniforms,
            custom_uniforms: Mutex::new(AHashMap::new()),
            material_stamp: Mutex::new(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::renderer::{ArrayUniform, ShaderStage};
    use lumen_infra::{DeviceCommand, HeadlessGraphicsDevice};

    const VERTEX: &str = "uniform mat4 model;\nuniform mat4 inverseModel;\nlayout(std140) uniform CameraData { mat4 view; };\nvoid main() {}";
    const FRAGMENT: &str = "uniform sampler2D s_texture0;\nuniform sampler2D s_texture9;\nuniform vec4 materialCache[4];\nuniform float gloss;\nvoid main() {}";

    fn pair(fragment_source: &str) -> ShaderPair {
        ShaderPair::new(
            Arc::new(
                Shader::new("mesh.vert", ShaderStage::Vertex, VERTEX)
                    .with_uniforms([Uniform::Model, Uniform::InverseModel, Uniform::NumBones]),
            ),
            Arc::new(
                Shader::new("mesh.frag", ShaderStage::Fragment, fragment_source)
                    .with_uniforms([Uniform::Model])
                    .with_array_uniforms([ArrayUniform {
                        uniform: Uniform::MaterialCache,
                        size: 4,
                    }]),
            ),
        )
    }

    #[test]
    fn same_pair_returns_the_same_program() {
        let device = HeadlessGraphicsDevice::new();
        let mut cache = ProgramCache::new();
        let shaders = pair(FRAGMENT);

        let first = cache.create_program(&device, &shaders).unwrap();
        let second = cache.create_program(&device, &shaders).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            device.count(|c| matches!(c, DeviceCommand::LinkProgram { .. })),
            1
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn link_resolves_locations_once_and_records_absent_ones() {
        let device = HeadlessGraphicsDevice::new();
        let mut cache = ProgramCache::new();
        let program = cache.create_program(&device, &pair(FRAGMENT)).unwrap();

        assert!(program.location(Uniform::Model).is_some());
        assert!(program.location(Uniform::InverseModel).is_some());
        assert!(program.location(Uniform::NumBones).is_none());
        assert!(program.array_location(Uniform::MaterialCache).is_some());
        assert!(program.uses(Uniform::MaterialCache));

        let model_queries = device.count(|c| {
            matches!(c, DeviceCommand::QueryUniform { name, .. } if name == "model")
        });
        assert_eq!(model_queries, 1);
        let bones_queries = device.count(|c| {
            matches!(c, DeviceCommand::QueryUniform { name, .. } if name == "numBones")
        });
        assert_eq!(bones_queries, 1);
    }

    #[test]
    fn samplers_and_blocks_are_bound_at_link() {
        let device = HeadlessGraphicsDevice::new();
        let mut cache = ProgramCache::new();
        let program = cache.create_program(&device, &pair(FRAGMENT)).unwrap();

        let commands = device.commands();
        assert!(commands.iter().any(|c| matches!(
            c,
            DeviceCommand::BindUniformBlock { program: p, slot, .. }
                if *p == program.handle() && *slot == binding::CAMERA
        )));
        let sampler_writes: Vec<i32> = commands
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::SetUniform {
                    value: UniformValue::Int(slot),
                    ..
                } => Some(*slot),
                _ => None,
            })
            .collect();
        assert_eq!(sampler_writes, vec![0, 9]);
    }

    #[test]
    fn failed_link_is_not_cached() {
        let device = HeadlessGraphicsDevice::new();
        let mut cache = ProgramCache::new();
        let broken = pair("#error missing semicolon\nvoid main() {}");

        let error = cache.create_program(&device, &broken).unwrap_err();
        assert!(matches!(error, ShaderError::LinkFailed { .. }));
        assert!(error.to_string().contains("mesh.frag"));
        assert!(cache.is_empty());

        assert!(cache.create_program(&device, &broken).is_err());
        assert_eq!(
            device.count(|c| matches!(c, DeviceCommand::LinkProgram { .. })),
            0
        );
        assert_eq!(
            device.count(|c| matches!(c, DeviceCommand::CompileShader { .. })),
            2
        );
    }

    #[test]
    fn flush_deletes_and_forces_relink() {
        let device = HeadlessGraphicsDevice::new();
        let mut cache = ProgramCache::new();
        let shaders = pair(FRAGMENT);
        let first = cache.create_program(&device, &shaders).unwrap();

        cache.flush_programs(&device);
        assert!(cache.is_empty());
        assert_eq!(device.live_programs(), 0);

        let second = cache.create_program(&device, &shaders).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_ne!(first.handle(), second.handle());
    }

    #[test]
    fn bind_switches_only_on_change() {
        let device = HeadlessGraphicsDevice::new();
        let mut cache = ProgramCache::new();
        let a = cache.create_program(&device, &pair(FRAGMENT)).unwrap();
        let b = cache.create_program(&device, &pair(FRAGMENT)).unwrap();

        // Linking `b` left it bound.
        assert!(!cache.bind(&device, &b));
        assert!(cache.bind(&device, &a));
        assert!(!cache.bind(&device, &a));
        assert!(cache.bind(&device, &b));
    }

    #[test]
    fn material_claim_skips_repeats() {
        let device = HeadlessGraphicsDevice::new();
        let mut cache = ProgramCache::new();
        let program = cache.create_program(&device, &pair(FRAGMENT)).unwrap();

        assert!(program.claim_material(ObjectId(7), 1));
        assert!(!program.claim_material(ObjectId(7), 1));
        assert!(program.claim_material(ObjectId(7), 2));
        assert!(program.claim_material(ObjectId(8), 2));
    }

    #[test]
    fn missing_custom_uniform_is_queried_once() {
        let device = HeadlessGraphicsDevice::new();
        let mut cache = ProgramCache::new();
        let program = cache.create_program(&device, &pair(FRAGMENT)).unwrap();
        device.clear_commands();

        for _ in 0..3 {
            program.update_custom_uniform(&device, "gloss", &UniformValue::Float(0.5));
            program.update_custom_uniform(&device, "sheen", &UniformValue::Float(1.0));
        }

        let queries = device.count(|c| matches!(c, DeviceCommand::QueryUniform { .. }));
        assert_eq!(queries, 2);
        let writes = device.count(|c| matches!(c, DeviceCommand::SetUniform { .. }));
        assert_eq!(writes, 3);
    }
}
