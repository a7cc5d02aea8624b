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

//! Submits a frame's render jobs to the device.
//!
//! The renderer owns every piece of GPU state that outlives a job: the
//! program cache, the light caches, the camera and constants buffers, and a
//! shadow of the fixed-function state last applied, so that each job only
//! touches what differs from the previous one.

use super::{
    pre_sort_lights, FrameContext, GpuProgram, JobInputs, JobSorter, LaneError, ProgramCache,
    RenderData, RenderJob, RenderJobBuilder, RenderJobClassifier, Technique,
};
use bytemuck::{Pod, Zeroable};
use lumen_core::math::{Mat4, Vec4};
use lumen_core::renderer::limits::{
    binding, texture_slot, MAX_CASCADE_COUNT, MAX_DIRECTIONAL_LIGHTS_PER_OBJECT,
    MAX_POINT_LIGHTS_PER_OBJECT, MAX_SPOT_LIGHTS_PER_OBJECT,
};
use lumen_core::renderer::{
    BlendFunction, BufferDescriptor, BufferId, Camera, CullMode, GraphicsDevice,
    RenderPipelineSettings, RenderState, RenderStats, ResourceError, ShaderPair, TextureId,
    TextureTarget, Uniform, UniformValue, VertexArrayId,
};
use lumen_core::ObjectId;
use lumen_data::light::{DirectionalLightTable, PointLightCache, SpotLightCache};
use lumen_data::scene::{Mesh, SubMesh};
use lumen_data::{LightType, Material, SceneData};
use std::borrow::Cow;
use std::mem::size_of;
use std::sync::Arc;

/// Per-draw scalars uploaded as `vec4 drawCommand[2]`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct DrawCommand {
    /// Intensity of the assigned environment probe.
    pub ibl_intensity: f32,
    /// `1.0` when an environment probe is bound.
    pub ibl_in_use: f32,
    /// `1.0` when an ambient-occlusion texture is bound.
    pub ambient_occlusion_in_use: f32,
    _pad0: f32,
    /// Entries of `activePointLightIndexes` in use.
    pub active_point_light_count: f32,
    /// Entries of `activeSpotLightIndexes` in use.
    pub active_spot_light_count: f32,
    /// Directional lights affecting the draw.
    pub directional_light_count: f32,
    _pad1: f32,
}

impl DrawCommand {
    /// The command as the two `vec4`s the shader declares.
    pub fn as_vec4s(&self) -> [[f32; 4]; 2] {
        bytemuck::cast(*self)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct CameraBlock {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    view_projection: [[f32; 4]; 4],
    position: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
struct GraphicConstants {
    directional_light_count: u32,
    cascade_count: u32,
    point_light_capacity: u32,
    spot_light_capacity: u32,
}

/// Frame-wide textures sampled by every job when present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameTextures {
    /// Split-sum lookup table for image-based lighting.
    pub brdf_lut: Option<TextureId>,
    /// Screen-space ambient occlusion.
    pub ambient_occlusion: Option<TextureId>,
    /// Layered shadow map atlas.
    pub shadow_atlas: Option<TextureId>,
}

#[derive(Debug, Clone, Copy, Default)]
struct AppliedState {
    cull_mode: Option<CullMode>,
    blend_function: Option<BlendFunction>,
    line_width: Option<f32>,
}

/// Runs the frame pipeline and issues one draw per job.
#[derive(Debug)]
pub struct FrameRenderer {
    programs: ProgramCache,
    point_lights: PointLightCache,
    spot_lights: SpotLightCache,
    directional_lights: DirectionalLightTable,
    camera_buffer: Option<BufferId>,
    constants_buffer: Option<BufferId>,
    camera_stamp: Option<(ObjectId, u32)>,
    constants: Option<GraphicConstants>,
    applied: AppliedState,
    textures: FrameTextures,
    forward_shaders: ShaderPair,
    gbuffer_shaders: ShaderPair,
    stats: RenderStats,
}

impl FrameRenderer {
    /// Creates a renderer drawing forward jobs with `forward_shaders` and
    /// deferred jobs with `gbuffer_shaders`, unless a material brings its own.
    pub fn new(
        settings: &RenderPipelineSettings,
        forward_shaders: ShaderPair,
        gbuffer_shaders: ShaderPair,
    ) -> Self {
        Self {
            programs: ProgramCache::new(),
            point_lights: PointLightCache::point(settings.point_light_cache_capacity),
            spot_lights: SpotLightCache::spot(settings.spot_light_cache_capacity),
            directional_lights: DirectionalLightTable::new(),
            camera_buffer: None,
            constants_buffer: None,
            camera_stamp: None,
            constants: None,
            applied: AppliedState::default(),
            textures: FrameTextures::default(),
            forward_shaders,
            gbuffer_shaders,
            stats: RenderStats::default(),
        }
    }

    /// Creates and binds the renderer's buffers. Idempotent.
    pub fn init(&mut self, device: &dyn GraphicsDevice) -> Result<(), LaneError> {
        self.point_lights.init(device)?;
        self.spot_lights.init(device)?;
        self.directional_lights.init(device)?;

        if self.camera_buffer.is_none() {
            let buffer = device.create_buffer(&BufferDescriptor {
                label: Some(Cow::Borrowed("camera data")),
                size: size_of::<CameraBlock>() as u64,
            })?;
            device.bind_buffer_base(binding::CAMERA, buffer);
            self.camera_buffer = Some(buffer);
        }
        if self.constants_buffer.is_none() {
            let buffer = device.create_buffer(&BufferDescriptor {
                label: Some(Cow::Borrowed("graphic constants")),
                size: size_of::<GraphicConstants>() as u64,
            })?;
            device.bind_buffer_base(binding::GRAPHICS_CONSTANTS, buffer);
            self.constants_buffer = Some(buffer);
        }
        Ok(())
    }

    /// Counters of the last rendered frame.
    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Frame-wide textures bound to every job.
    pub fn textures(&self) -> &FrameTextures {
        &self.textures
    }

    /// Mutable access to the frame-wide textures.
    pub fn textures_mut(&mut self) -> &mut FrameTextures {
        &mut self.textures
    }

    /// Programs linked so far.
    pub fn programs(&self) -> &ProgramCache {
        &self.programs
    }

    /// The point light cache.
    pub fn point_lights(&self) -> &PointLightCache {
        &self.point_lights
    }

    /// The spot light cache.
    pub fn spot_lights(&self) -> &SpotLightCache {
        &self.spot_lights
    }

    /// The directional light table.
    pub fn directional_lights(&self) -> &DirectionalLightTable {
        &self.directional_lights
    }

    /// Drops every linked program, e.g. after the shaders' owner was unloaded.
    pub fn flush_programs(&mut self, device: &dyn GraphicsDevice) {
        self.programs.flush_programs(device);
    }

    /// Renders `scene` as seen from `camera`.
    ///
    /// Builds, classifies and sorts the frame's jobs, then draws the
    /// partitions in technique order: deferred opaque, deferred
    /// alpha-masked, forward opaque, forward alpha-masked, translucent.
    /// Returns the jobs as drawn.
    pub fn render_frame(
        &mut self,
        ctx: &FrameContext,
        scene: &mut SceneData,
        camera: &Camera,
        device: &dyn GraphicsDevice,
    ) -> Result<RenderData, LaneError> {
        self.stats.begin_frame();
        self.init(device)?;
        self.upload_camera(device, camera)?;

        scene.refresh_light_cache_items();
        scene.refresh_material_cache_items();

        let mut lights = scene.light_ids();
        let directional_count = pre_sort_lights(scene, &mut lights);
        let directional = lights[..directional_count]
            .iter()
            .filter_map(|id| scene.light(*id));
        if self.directional_lights.map(device, directional)? {
            self.stats.light_cache_uploads += 1;
        }
        self.upload_constants(device)?;

        let entities = scene.entity_ids();
        let environments = scene.environment_ids();
        let jobs = RenderJobBuilder::new().run(
            ctx,
            scene,
            device,
            &entities,
            JobInputs {
                lights: &lights,
                directional_count,
                environments: &environments,
            },
        )?;

        let mut data = RenderJobClassifier::new().run(scene, jobs, ctx.settings.forward_only);
        let sorter = JobSorter::new();
        let translucent = data.translucent_range();
        sorter.sort_by_distance_to_camera(&mut data.jobs[translucent], camera);
        sorter.sort_by_material(&mut data);
        self.stats.render_jobs = data.len() as u32;

        let partitions: Vec<_> = data.partitions().collect();
        for (technique, range) in partitions {
            for job in &data.jobs[range] {
                self.render_job(ctx, scene, device, job, technique)?;
            }
        }

        log::trace!(
            "Frame {}: {} jobs, {} draw calls, {} program switches, {} state changes",
            self.stats.frame_number,
            self.stats.render_jobs,
            self.stats.draw_calls,
            self.stats.program_switches,
            self.stats.state_changes
        );
        Ok(data)
    }

    /// Draws one job. [`init`](Self::init) must have run.
    ///
    /// The engine pair for `technique` is used unless the job's material has its own.
    /// A job whose mesh or material was removed is skipped.
    pub fn render_job(
        &mut self,
        ctx: &FrameContext,
        scene: &mut SceneData,
        device: &dyn GraphicsDevice,
        job: &RenderJob,
        technique: Technique,
    ) -> Result<(), LaneError> {
        if let Some(mesh) = scene.mesh_mut(job.mesh) {
            mesh.init(device)?;
        }
        if let Some(material) = scene.material_mut(job.material) {
            material.update_cache_item();
        }

        let scene: &SceneData = scene;
        let (Some(mesh), Some(material)) = (scene.mesh(job.mesh), scene.material(job.material))
        else {
            log::debug!("Skipping job of {:?}: mesh or material is gone", job.entity);
            return Ok(());
        };
        let Some((submesh, vertex_array)) = mesh
            .submeshes
            .get(job.submesh)
            .and_then(|submesh| Some((submesh, submesh.vertex_array()?)))
        else {
            log::debug!("Skipping job of {:?}: submesh {} is gone", job.entity, job.submesh);
            return Ok(());
        };

        let engine_shaders = if technique.is_deferred() {
            &self.gbuffer_shaders
        } else {
            &self.forward_shaders
        };
        let shaders = material.shaders().unwrap_or(engine_shaders);
        let program = bind_program(&mut self.programs, &mut self.stats, device, shaders)?;

        self.set_skinning(device, &program, mesh, job);
        set_transforms(device, &program, &job.world_transform);
        self.set_material(device, &program, material);

        let mut command = self.set_data_textures(device, &program, scene, job);
        self.set_lights(device, &program, scene, job, &mut command)?;
        program.set_vec4_array(device, Uniform::DrawCommand, &command.as_vec4s());

        for (name, value) in material.custom_uniforms() {
            program.update_custom_uniform(device, name, value);
        }

        let mut state = *material.render_state();
        if job.requires_cull_flip {
            state.cull_mode = state.cull_mode.flipped();
        }
        self.apply_render_state(ctx, device, &state);
        self.draw(device, submesh, vertex_array, &state);
        Ok(())
    }

    /// Returns the program for `shaders`, linking on first use, and makes it current.
    pub fn bind_program(
        &mut self,
        device: &dyn GraphicsDevice,
        shaders: &ShaderPair,
    ) -> Result<Arc<GpuProgram>, LaneError> {
        bind_program(&mut self.programs, &mut self.stats, device, shaders)
    }

    fn upload_camera(
        &mut self,
        device: &dyn GraphicsDevice,
        camera: &Camera,
    ) -> Result<(), LaneError> {
        let stamp = (camera.id, camera.version);
        if self.camera_stamp == Some(stamp) {
            return Ok(());
        }
        let buffer = self
            .camera_buffer
            .ok_or_else(|| ResourceError::InvalidHandle("camera buffer used before init".into()))?;

        let view = camera.view_matrix();
        let projection = camera.projection_matrix();
        let block = CameraBlock {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            view_projection: (projection * view).to_cols_array_2d(),
            position: camera.position.extend(1.0).to_array(),
        };
        device.write_buffer(buffer, 0, bytemuck::bytes_of(&block))?;

        self.camera_stamp = Some(stamp);
        self.stats.camera_uploads += 1;
        Ok(())
    }

    fn upload_constants(&mut self, device: &dyn GraphicsDevice) -> Result<(), LaneError> {
        let constants = GraphicConstants {
            directional_light_count: self.directional_lights.count() as u32,
            cascade_count: MAX_CASCADE_COUNT as u32,
            point_light_capacity: self.point_lights.cache().item_capacity() as u32,
            spot_light_capacity: self.spot_lights.cache().item_capacity() as u32,
        };
        if self.constants == Some(constants) {
            return Ok(());
        }
        let buffer = self.constants_buffer.ok_or_else(|| {
            ResourceError::InvalidHandle("graphic constants buffer used before init".into())
        })?;
        device.write_buffer(buffer, 0, bytemuck::bytes_of(&constants))?;
        self.constants = Some(constants);
        Ok(())
    }

    fn set_skinning(
        &self,
        device: &dyn GraphicsDevice,
        program: &GpuProgram,
        mesh: &Mesh,
        job: &RenderJob,
    ) {
        use UniformValue::{Bool, Float, UInt};

        let Some(skeleton) = mesh.skeleton else {
            program.set(device, Uniform::IsSkinned, Bool(false));
            return;
        };
        program.set(device, Uniform::IsSkinned, Bool(true));
        program.set(device, Uniform::NumBones, UInt(skeleton.bone_count));

        let animation = job.animation.unwrap_or_default();
        let animation_texture = animation
            .current
            .map_or(skeleton.bind_pose_texture, |current| current.animation_texture);
        device.bind_texture(texture_slot::ANIMATION, TextureTarget::Texture2D, animation_texture);

        program.set(device, Uniform::IsAnimated, Bool(animation.current.is_some()));
        if let Some(current) = animation.current {
            program.set(device, Uniform::KeyFrame1, UInt(current.key_frame_1));
            program.set(device, Uniform::KeyFrame2, UInt(current.key_frame_2));
            program.set(device, Uniform::KeyFrameIntTime, Float(current.interpolation_time));
            program.set(device, Uniform::KeyFrameCount, UInt(current.key_frame_count));
        }

        program.set(device, Uniform::BlendAnimation, Bool(animation.blend.is_some()));
        if let Some(blend) = animation.blend {
            let texture = blend.animation_texture;
            device.bind_texture(texture_slot::BLEND_ANIMATION, TextureTarget::Texture2D, texture);
            program.set(device, Uniform::BlendFactor, Float(animation.blend_factor));
            program.set(device, Uniform::BlendKeyFrame1, UInt(blend.key_frame_1));
            program.set(device, Uniform::BlendKeyFrame2, UInt(blend.key_frame_2));
            program.set(device, Uniform::BlendKeyFrameIntTime, Float(blend.interpolation_time));
            program.set(device, Uniform::BlendKeyFrameCount, UInt(blend.key_frame_count));
        }
    }

    fn set_material(
        &mut self,
        device: &dyn GraphicsDevice,
        program: &GpuProgram,
        material: &Material,
    ) {
        let textures = material.textures();
        let bindings = [
            (texture_slot::DIFFUSE, textures.diffuse),
            (texture_slot::EMISSIVE, textures.emissive),
            (texture_slot::METALLIC_ROUGHNESS, textures.metallic_roughness),
            (texture_slot::NORMAL, textures.normal),
        ];
        for (slot, texture) in bindings {
            if let Some(texture) = texture {
                device.bind_texture(slot, TextureTarget::Texture2D, texture);
            }
        }
        if let Some(cube_map) = textures.cube_map {
            device.bind_texture(texture_slot::CUBE_MAP, TextureTarget::CubeMap, cube_map);
        }
        let normal_map = UniformValue::Bool(textures.normal.is_some());
        program.set(device, Uniform::NormalMapInUse, normal_map);

        let item = material.cache_item();
        if program.uses(Uniform::MaterialCache) && program.claim_material(item.id, item.version()) {
            program.set_vec4_array(device, Uniform::MaterialCache, &item.data.as_vec4s());
            self.stats.material_uploads += 1;
        }
    }

    fn set_data_textures(
        &self,
        device: &dyn GraphicsDevice,
        program: &GpuProgram,
        scene: &SceneData,
        job: &RenderJob,
    ) -> DrawCommand {
        let mut command = DrawCommand::default();

        if let Some(probe) = job.environment.and_then(|id| scene.environment(id)) {
            let cube = TextureTarget::CubeMap;
            device.bind_texture(texture_slot::IBL_DIFFUSE, cube, probe.irradiance);
            device.bind_texture(texture_slot::IBL_SPECULAR, cube, probe.specular);
            if let Some(lut) = self.textures.brdf_lut {
                device.bind_texture(texture_slot::BRDF_LUT, TextureTarget::Texture2D, lut);
            }
            command.ibl_in_use = 1.0;
            command.ibl_intensity = probe.intensity;
            let rotation = UniformValue::Mat4(Mat4::from_quat(probe.rotation));
            program.set(device, Uniform::IblRotation, rotation);
        }

        if let Some(ao) = self.textures.ambient_occlusion {
            device.bind_texture(texture_slot::AMBIENT_OCCLUSION, TextureTarget::Texture2D, ao);
            command.ambient_occlusion_in_use = 1.0;
        }
        if let Some(atlas) = self.textures.shadow_atlas {
            let target = TextureTarget::Texture2DArray;
            device.bind_texture(texture_slot::SHADOW_ATLAS, target, atlas);
        }
        command
    }

    fn set_lights(
        &mut self,
        device: &dyn GraphicsDevice,
        program: &GpuProgram,
        scene: &SceneData,
        job: &RenderJob,
        command: &mut DrawCommand,
    ) -> Result<(), LaneError> {
        let mut directional = 0usize;
        let mut point_ids = Vec::new();
        let mut spot_ids = Vec::new();

        for light in job.lights.iter().filter_map(|id| scene.light(*id)) {
            match light.light_type() {
                LightType::Directional => directional += 1,
                LightType::Point => point_ids.extend(self.point_lights.add_light(light)),
                LightType::Spot => spot_ids.extend(self.spot_lights.add_light(light)),
            }
        }

        if self.point_lights.map(device)? {
            self.stats.light_cache_uploads += 1;
        }
        if self.spot_lights.map(device)? {
            self.stats.light_cache_uploads += 1;
        }

        let to_indices =
            |slots: Vec<u32>| -> Vec<i32> { slots.into_iter().map(|slot| slot as i32).collect() };
        let point_slots =
            to_indices(self.point_lights.look_up(&point_ids, MAX_POINT_LIGHTS_PER_OBJECT));
        let spot_slots = to_indices(self.spot_lights.look_up(&spot_ids, MAX_SPOT_LIGHTS_PER_OBJECT));

        if !point_slots.is_empty() {
            program.set_i32_array(device, Uniform::ActivePointLightIndexes, &point_slots);
        }
        if !spot_slots.is_empty() {
            program.set_i32_array(device, Uniform::ActiveSpotLightIndexes, &spot_slots);
        }

        command.active_point_light_count = point_slots.len() as f32;
        command.active_spot_light_count = spot_slots.len() as f32;
        command.directional_light_count = directional
            .min(self.directional_lights.count())
            .min(MAX_DIRECTIONAL_LIGHTS_PER_OBJECT) as f32;
        Ok(())
    }

    fn apply_render_state(
        &mut self,
        ctx: &FrameContext,
        device: &dyn GraphicsDevice,
        state: &RenderState,
    ) {
        if self.applied.cull_mode != Some(state.cull_mode) {
            device.set_cull_mode(state.cull_mode);
            self.applied.cull_mode = Some(state.cull_mode);
            self.stats.state_changes += 1;
        }

        let blend = ctx.settings.override_blend_state.unwrap_or(state.blend_function);
        if self.applied.blend_function != Some(blend) {
            device.set_blend_function(blend);
            self.applied.blend_function = Some(blend);
            self.stats.state_changes += 1;
        }

        if self.applied.line_width != Some(state.line_width) {
            device.set_line_width(state.line_width);
            self.applied.line_width = Some(state.line_width);
            self.stats.state_changes += 1;
        }
    }

    fn draw(
        &mut self,
        device: &dyn GraphicsDevice,
        submesh: &SubMesh,
        vertex_array: VertexArrayId,
        state: &RenderState,
    ) {
        if submesh.index_count != 0 {
            device.draw_indexed(vertex_array, state.draw_type, submesh.index_count);
        } else {
            device.draw_arrays(vertex_array, state.draw_type, submesh.vertex_count);
        }
        self.stats.draw_calls += 1;
    }
}

fn bind_program(
    programs: &mut ProgramCache,
    stats: &mut RenderStats,
    device: &dyn GraphicsDevice,
    shaders: &ShaderPair,
) -> Result<Arc<GpuProgram>, LaneError> {
    let previous = programs.bound();
    let program = programs.create_program(device, shaders)?;
    programs.bind(device, &program);
    if previous != Some(program.handle()) {
        stats.program_switches += 1;
    }
    Ok(program)
}

fn set_transforms(device: &dyn GraphicsDevice, program: &GpuProgram, model: &Mat4) {
    let inverse = model.inverse();
    let mut without_translate = *model;
    without_translate.w_axis = Vec4::W;

    program.set(device, Uniform::Model, UniformValue::Mat4(*model));
    program.set(device, Uniform::InverseModel, UniformValue::Mat4(inverse));
    let inverse_transpose = UniformValue::Mat4(inverse.transpose());
    program.set(device, Uniform::InverseTransposeModel, inverse_transpose);
    let without_translate = UniformValue::Mat4(without_translate);
    program.set(device, Uniform::ModelWithoutTranslate, without_translate);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draw_command_packs_into_two_vec4s() {
        let command = DrawCommand {
            ibl_intensity: 0.5,
            ibl_in_use: 1.0,
            active_point_light_count: 3.0,
            directional_light_count: 1.0,
            ..Default::default()
        };
        assert_eq!(
            command.as_vec4s(),
            [[0.5, 1.0, 0.0, 0.0], [3.0, 0.0, 1.0, 0.0]]
        );
    }

    #[test]
    fn gpu_blocks_have_std140_sizes() {
        assert_eq!(size_of::<CameraBlock>(), 208);
        assert_eq!(size_of::<GraphicConstants>(), 16);
        assert_eq!(size_of::<DrawCommand>(), 32);
    }
}
