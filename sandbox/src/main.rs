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

// Lumen sandbox
// Renders a procedural scene headlessly and logs per-frame statistics.

use std::sync::Arc;

use anyhow::{Context, Result};
use lumen_core::math::{Aabb, Mat4, Quat, Vec3};
use lumen_core::renderer::{
    ArrayUniform, BlendFunction, Camera, Projection, RenderPipelineSettings, Shader, ShaderPair,
    ShaderStage, TextureId, Uniform, UniformValue,
};
use lumen_data::scene::{Entity, EnvironmentProbe, Mesh, SubMesh};
use lumen_data::{Light, Material, SceneData};
use lumen_infra::HeadlessGraphicsDevice;
use lumen_lanes::{is_outlier, position_stdev, FrameContext, FrameRenderer};

const FRAME_COUNT: u32 = 8;
const GRID: usize = 48;

const MESH_VERTEX: &str = "\
layout(std140) uniform CameraData { mat4 view; mat4 projection; mat4 viewProjection; vec4 position; };
uniform mat4 model;
uniform mat4 inverseTransposeModel;
uniform bool isSkinned;
void main() {}";

const MESH_FRAGMENT: &str = "\
layout(std140) uniform GraphicConstatsData { uint counts[4]; };
layout(std140) uniform DirectionalLightBuffer { vec4 directional[96]; };
layout(std140) uniform PointLightCache { vec4 points[256]; };
layout(std140) uniform SpotLightCache { vec4 spots[256]; };
uniform vec4 materialCache[4];
uniform vec4 drawCommand[2];
uniform int activePointLightIndexes[24];
uniform int activeSpotLightIndexes[24];
uniform mat4 iblRotation;
uniform sampler2D s_texture0;
uniform samplerCube s_texture7;
void main() {}";

fn engine_shaders(name: &str) -> ShaderPair {
    let vertex = Shader::new(format!("{name}.vert"), ShaderStage::Vertex, MESH_VERTEX)
        .with_uniforms([Uniform::Model, Uniform::InverseTransposeModel, Uniform::IsSkinned]);
    let arrays = [
        (Uniform::MaterialCache, 4),
        (Uniform::DrawCommand, 2),
        (Uniform::ActivePointLightIndexes, 24),
        (Uniform::ActiveSpotLightIndexes, 24),
    ];
    let fragment = Shader::new(format!("{name}.frag"), ShaderStage::Fragment, MESH_FRAGMENT)
        .with_uniforms([Uniform::IblRotation])
        .with_array_uniforms(arrays.map(|(uniform, size)| ArrayUniform { uniform, size }));
    ShaderPair::new(Arc::new(vertex), Arc::new(fragment))
}

fn load_settings() -> Result<RenderPipelineSettings> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(RenderPipelineSettings::default());
    };
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read settings from {path}"))?;
    let settings = RenderPipelineSettings::from_ron_str(&text)
        .with_context(|| format!("failed to parse settings in {path}"))?;
    log::info!("Loaded pipeline settings from {path}");
    Ok(settings)
}

fn build_scene() -> SceneData {
    let mut scene = SceneData::new();

    let crate_mesh = scene.add_mesh(Mesh::new("crate", vec![SubMesh::new(24, 36)]));
    let lamp_post = scene.add_mesh(Mesh::new(
        "lamp post",
        vec![SubMesh::new(64, 192), SubMesh::new(32, 96)],
    ));

    let mut stone = Material::new("stone");
    stone.set_roughness(0.9);
    let stone = scene.add_material(stone);

    let mut hedge = Material::new("hedge");
    hedge.set_blend_state(BlendFunction::AlphaMask);
    let hedge = scene.add_material(hedge);

    let mut glass = Material::new("glass");
    glass.set_color(Vec3::new(0.6, 0.8, 1.0));
    glass.set_alpha(0.35);
    let glass = scene.add_material(glass);

    let mut water = Material::new("water");
    water.set_shaders(Some(engine_shaders("water")));
    water.set_custom_uniform("waveHeight", UniformValue::Float(0.2));
    let water = scene.add_material(water);

    let bounds = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.5));
    for i in 0..GRID * GRID {
        let (x, z) = ((i % GRID) as f32 * 2.0, (i / GRID) as f32 * 2.0);
        let (mesh, material) = match i % 11 {
            0 => (lamp_post, stone),
            1 | 2 => (crate_mesh, hedge),
            3 => (crate_mesh, glass),
            4 => (crate_mesh, water),
            _ => (crate_mesh, stone),
        };
        let mut transform = Mat4::from_translation(Vec3::new(x, 0.0, z));
        if i % 17 == 0 {
            transform *= Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0));
        }
        let submeshes = scene.mesh(mesh).map_or(1, Mesh::submesh_count);
        scene.add_entity(
            Entity::new(format!("prop {i}"))
                .with_mesh(mesh, i % 3 != 0)
                .with_materials(vec![material; submeshes])
                .with_transform(transform, bounds),
        );
    }

    // A far-flung entity for the outlier report.
    scene.add_entity(
        Entity::new("lost crate")
            .with_mesh(crate_mesh, true)
            .with_transform(Mat4::from_translation(Vec3::splat(5_000.0)), bounds),
    );

    scene.add_light(Light::directional(Vec3::new(-0.3, -1.0, -0.2)));
    for i in 0..40 {
        let at = Vec3::new((i % 8) as f32 * 12.0, 3.0, (i / 8) as f32 * 18.0);
        scene.add_light(Light::point(at, 6.0));
    }
    for i in 0..6 {
        let at = Vec3::new(i as f32 * 16.0, 8.0, 48.0);
        scene.add_light(Light::spot(at, Vec3::NEG_Y, 12.0, 0.8, 0.6));
    }

    let extent = GRID as f32 * 2.0;
    scene.add_environment(EnvironmentProbe::new(
        Aabb::from_min_max(Vec3::splat(-10.0), Vec3::new(extent + 10.0, 20.0, extent + 10.0)),
        TextureId(9_001),
        TextureId(9_002),
    ));
    let mut courtyard = EnvironmentProbe::new(
        Aabb::from_min_max(Vec3::new(20.0, -1.0, 20.0), Vec3::new(40.0, 10.0, 40.0)),
        TextureId(9_003),
        TextureId(9_004),
    );
    courtyard.rotation = Quat::from_rotation_y(0.7);
    scene.add_environment(courtyard);

    scene
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let settings = load_settings()?;
    let ctx = FrameContext::with_settings(settings.clone())?;
    let device = HeadlessGraphicsDevice::new();
    let mut scene = build_scene();
    let mut renderer = FrameRenderer::new(
        &settings,
        engine_shaders("forward"),
        engine_shaders("gbuffer"),
    );
    renderer.init(&device)?;
    renderer.textures_mut().brdf_lut = Some(TextureId(9_100));

    let center = Vec3::new(GRID as f32, 0.0, GRID as f32);
    let mut camera = Camera::look_at(
        center + Vec3::new(0.0, 30.0, 80.0),
        center,
        Vec3::Y,
        Projection::Perspective {
            fov_y: 60f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 500.0,
        },
    );

    for frame in 0..FRAME_COUNT {
        if frame % 2 == 1 {
            let orbit = Quat::from_rotation_y(0.15);
            let eye = center + orbit * (camera.position - center);
            let moved = Camera::look_at(eye, center, Vec3::Y, camera.projection);
            camera.position = moved.position;
            camera.orientation = moved.orientation;
            camera.version += 1;
        }

        let data = renderer.render_frame(&ctx, &mut scene, &camera, &device)?;
        let stats = renderer.stats();
        log::info!(
            "Frame {}: {} jobs, {} draws, {} program switches, {} state changes, \
             {} material uploads, {} light cache uploads, {} camera uploads",
            stats.frame_number,
            stats.render_jobs,
            stats.draw_calls,
            stats.program_switches,
            stats.state_changes,
            stats.material_uploads,
            stats.light_cache_uploads,
            stats.camera_uploads,
        );

        if frame == 0 {
            for (technique, range) in data.partitions() {
                log::info!("  {technique:?}: {} jobs", range.len());
            }
            let (mean, stdev) = position_stdev(&data.jobs);
            let outliers = data
                .jobs
                .iter()
                .filter(|job| is_outlier(job.world_transform.w_axis.truncate(), mean, stdev, 3.0))
                .count();
            log::info!("  {outliers} jobs lie beyond 3 sigma of {mean:?}");
        }
    }

    log::info!(
        "Rendered {FRAME_COUNT} frames with {} linked programs",
        renderer.programs().len()
    );
    Ok(())
}
