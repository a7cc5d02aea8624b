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

//! Per-job selection of lights and environment probe.

use super::RenderJob;
use lumen_core::math::IntersectResult;
use lumen_core::renderer::limits::MAX_LIGHTS_PER_OBJECT;
use lumen_data::{EnvironmentId, LightId, LightKind, LightType, SceneData};

/// Moves directional lights to the front of `lights`, keeping relative order.
///
/// Returns the number of directional lights. Ids that no longer resolve sort
/// after the directional prefix.
pub fn pre_sort_lights(scene: &SceneData, lights: &mut [LightId]) -> usize {
    let is_directional = |id: &LightId| {
        scene
            .light(*id)
            .is_some_and(|light| light.light_type() == LightType::Directional)
    };
    let count = lights.iter().filter(|id| is_directional(id)).count();
    lights.sort_by_key(|id| !is_directional(id));
    count
}

/// Attaches the lights that can influence a job.
///
/// Directional lights come first and are attached unconditionally. Point and
/// spot lights follow in array order when their volume touches the job's
/// bounds. Assignment is first-fit: once [`MAX_LIGHTS_PER_OBJECT`] lights are
/// attached the scan stops, with no preference for nearer lights.
#[derive(Debug, Default, Clone, Copy)]
pub struct LightAssigner;

impl LightAssigner {
    /// Creates the assigner.
    pub fn new() -> Self {
        Self
    }

    /// Fills `job.lights` from `lights`, whose first `directional_count`
    /// entries must be the directional lights.
    pub fn run(
        &self,
        job: &mut RenderJob,
        scene: &SceneData,
        lights: &[LightId],
        directional_count: usize,
    ) {
        debug_assert!(directional_count <= lights.len());
        let (directional, local) = lights.split_at(directional_count.min(lights.len()));

        job.lights.clear();
        job.lights
            .extend(directional.iter().take(MAX_LIGHTS_PER_OBJECT).copied());

        if local.is_empty() {
            return;
        }

        for id in local {
            if job.lights.len() >= MAX_LIGHTS_PER_OBJECT {
                break;
            }
            let Some(light) = scene.light(*id) else {
                continue;
            };

            let touches = match light.kind() {
                LightKind::Spot { .. } => {
                    light.frustum().intersect_aabb(&job.bounding_box) != IntersectResult::Outside
                }
                LightKind::Point { .. } => light.bounding_sphere().intersects_aabb(&job.bounding_box),
                // Past the prefix the caller did not pre-sort; ignore.
                LightKind::Directional { .. } => false,
            };
            if touches {
                job.lights.push(*id);
            }
        }
    }
}

/// Picks the environment probe that lights a job.
///
/// Among illuminating probes whose bounds intersect the job's, the one with
/// the smallest volume wins. On equal volume the first one found is kept.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvironmentAssigner;

impl EnvironmentAssigner {
    /// Creates the assigner.
    pub fn new() -> Self {
        Self
    }

    /// Sets `job.environment`, or clears it when no probe applies.
    pub fn run(&self, job: &mut RenderJob, scene: &SceneData, environments: &[EnvironmentId]) {
        let mut best: Option<(EnvironmentId, f32)> = None;

        for id in environments {
            let Some(probe) = scene.environment(*id) else {
                continue;
            };
            if !probe.illuminate || !probe.bounding_box.intersects(&job.bounding_box) {
                continue;
            }

            let volume = probe.bounding_box.volume();
            if best.map_or(true, |(_, smallest)| smallest > volume) {
                best = Some((*id, volume));
            }
        }

        job.environment = best.map(|(id, _)| id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::math::{Aabb, Vec3};
    use lumen_core::renderer::TextureId;
    use lumen_data::scene::EnvironmentProbe;
    use lumen_data::Light;

    fn job_at(center: Vec3) -> RenderJob {
        RenderJob {
            bounding_box: Aabb::from_center_half_extents(center, Vec3::splat(0.5)),
            ..Default::default()
        }
    }

    #[test]
    fn pre_sort_moves_directional_lights_first_stably() {
        let mut scene = SceneData::new();
        let p0 = scene.add_light(Light::point(Vec3::ZERO, 1.0));
        let d0 = scene.add_light(Light::directional(Vec3::NEG_Y));
        let s0 = scene.add_light(Light::spot(Vec3::ZERO, Vec3::NEG_Z, 4.0, 0.5, 0.4));
        let d1 = scene.add_light(Light::directional(Vec3::X));

        let mut lights = vec![p0, d0, s0, d1];
        assert_eq!(pre_sort_lights(&scene, &mut lights), 2);
        assert_eq!(lights, vec![d0, d1, p0, s0]);
    }

    #[test]
    fn directional_lights_precede_local_lights() {
        let mut scene = SceneData::new();
        let sun = scene.add_light(Light::directional(Vec3::NEG_Y));
        let near = scene.add_light(Light::point(Vec3::new(1.0, 0.0, 0.0), 2.0));
        let far = scene.add_light(Light::point(Vec3::new(50.0, 0.0, 0.0), 2.0));
        let spot = scene.add_light(Light::spot(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::NEG_Z,
            10.0,
            0.6,
            0.5,
        ));

        let mut job = job_at(Vec3::ZERO);
        LightAssigner::new().run(&mut job, &scene, &[sun, near, far, spot], 1);
        assert_eq!(job.lights, vec![sun, near, spot]);
    }

    #[test]
    fn assignment_is_capped() {
        let mut scene = SceneData::new();
        let mut lights = vec![scene.add_light(Light::directional(Vec3::NEG_Y))];
        for _ in 0..MAX_LIGHTS_PER_OBJECT + 10 {
            lights.push(scene.add_light(Light::point(Vec3::ZERO, 5.0)));
        }

        let mut job = job_at(Vec3::ZERO);
        LightAssigner::new().run(&mut job, &scene, &lights, 1);
        assert_eq!(job.lights.len(), MAX_LIGHTS_PER_OBJECT);
        assert_eq!(job.lights[0], lights[0]);
        // First fit: the earliest point lights are the ones kept.
        assert_eq!(job.lights[1..], lights[1..MAX_LIGHTS_PER_OBJECT]);
    }

    #[test]
    fn smallest_intersecting_probe_wins() {
        let mut scene = SceneData::new();
        let maps = (TextureId(1), TextureId(2));
        // Volumes 10 and 2, both covering the origin.
        let large = scene.add_environment(EnvironmentProbe::new(
            Aabb::from_min_max(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.5, 1.0, 1.0)),
            maps.0,
            maps.1,
        ));
        let small = scene.add_environment(EnvironmentProbe::new(
            Aabb::from_min_max(Vec3::new(-0.5, -1.0, -1.0), Vec3::new(0.0, 1.0, 1.0)),
            maps.0,
            maps.1,
        ));
        assert!((scene.environment(large).unwrap().bounding_box.volume() - 10.0).abs() < 1e-5);
        assert!((scene.environment(small).unwrap().bounding_box.volume() - 2.0).abs() < 1e-5);

        let mut job = job_at(Vec3::ZERO);
        EnvironmentAssigner::new().run(&mut job, &scene, &[large, small]);
        assert_eq!(job.environment, Some(small));
    }

    #[test]
    fn non_illuminating_and_distant_probes_are_skipped() {
        let mut scene = SceneData::new();
        let mut dark = EnvironmentProbe::new(
            Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.6)),
            TextureId(1),
            TextureId(2),
        );
        dark.illuminate = false;
        let dark = scene.add_environment(dark);
        let distant = scene.add_environment(EnvironmentProbe::new(
            Aabb::from_center_half_extents(Vec3::splat(100.0), Vec3::ONE),
            TextureId(1),
            TextureId(2),
        ));

        let mut job = job_at(Vec3::ZERO);
        job.environment = Some(distant);
        EnvironmentAssigner::new().run(&mut job, &scene, &[dark, distant]);
        assert_eq!(job.environment, None);
    }

    #[test]
    fn equal_volumes_keep_the_first_probe() {
        let mut scene = SceneData::new();
        let bounds = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE);
        let first = scene.add_environment(EnvironmentProbe::new(bounds, TextureId(1), TextureId(2)));
        let second = scene.add_environment(EnvironmentProbe::new(bounds, TextureId(3), TextureId(4)));

        let mut job = job_at(Vec3::ZERO);
        EnvironmentAssigner::new().run(&mut job, &scene, &[first, second]);
        assert_eq!(job.environment, Some(first));
    }
}
