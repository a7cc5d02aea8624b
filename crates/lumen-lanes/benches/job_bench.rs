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

use criterion::{criterion_group, criterion_main, Criterion};
use lumen_core::math::{Aabb, Mat4, Vec3};
use lumen_core::renderer::RenderPipelineSettings;
use lumen_data::scene::{Entity, Mesh, SubMesh};
use lumen_data::{Light, Material, SceneData};
use lumen_infra::HeadlessGraphicsDevice;
use lumen_lanes::{
    pre_sort_lights, FrameContext, JobInputs, JobSorter, RenderJobBuilder, RenderJobClassifier,
};
use std::hint::black_box;

fn crowded_scene() -> SceneData {
    let mut scene = SceneData::new();
    let rock = scene.add_mesh(Mesh::new("rock", vec![SubMesh::new(24, 36)]));
    let tree = scene.add_mesh(Mesh::new(
        "tree",
        vec![SubMesh::new(120, 300), SubMesh::new(400, 900)],
    ));
    let mut glass = Material::new("glass");
    glass.set_alpha(0.5);
    let glass = scene.add_material(glass);

    let bounds = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.5));
    for i in 0..5_000 {
        let at = Vec3::new((i % 100) as f32, 0.0, (i / 100) as f32);
        let mut entity = Entity::new(format!("prop {i}"))
            .with_mesh(if i % 3 == 0 { tree } else { rock }, true)
            .with_transform(Mat4::from_translation(at), bounds);
        if i % 10 == 0 {
            entity = entity.with_materials(vec![glass]);
        }
        scene.add_entity(entity);
    }

    scene.add_light(Light::directional(Vec3::NEG_Y));
    for i in 0..64 {
        let at = Vec3::new((i % 8) as f32 * 12.0, 2.0, (i / 8) as f32 * 6.0);
        scene.add_light(Light::point(at, 4.0));
    }
    scene.refresh_light_cache_items();
    scene
}

fn bench_job_construction(c: &mut Criterion) {
    let device = HeadlessGraphicsDevice::new();
    let mut scene = crowded_scene();
    let mut lights = scene.light_ids();
    let directional_count = pre_sort_lights(&scene, &mut lights);
    let entities = scene.entity_ids();
    let inputs = JobInputs {
        lights: &lights,
        directional_count,
        environments: &[],
    };

    let sequential = FrameContext::default().with_parallel_threshold(usize::MAX);
    let parallel = FrameContext::new(RenderPipelineSettings::default()).with_parallel_threshold(0);
    let builder = RenderJobBuilder::new();

    let mut group = c.benchmark_group("Render Jobs");

    group.bench_function("Build 5000 entities (sequential)", |b| {
        b.iter(|| black_box(builder.run(&sequential, &mut scene, &device, &entities, inputs)));
    });

    group.bench_function("Build 5000 entities (parallel)", |b| {
        b.iter(|| black_box(builder.run(&parallel, &mut scene, &device, &entities, inputs)));
    });

    group.bench_function("Classify and sort", |b| {
        let jobs = builder
            .run(&sequential, &mut scene, &device, &entities, inputs)
            .unwrap_or_default();
        let classifier = RenderJobClassifier::new();
        let sorter = JobSorter::new();
        b.iter(|| {
            let mut data = classifier.run(&scene, jobs.clone(), false);
            sorter.sort_by_material(&mut data);
            black_box(data.boundaries())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_job_construction);
criterion_main!(benches);
