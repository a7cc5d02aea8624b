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

//! Orders jobs within a partition.

use super::{RenderData, RenderJob};
use lumen_core::renderer::Camera;

/// Reorders jobs inside partitions.
#[derive(Debug, Default, Clone, Copy)]
pub struct JobSorter;

impl JobSorter {
    /// Creates the sorter.
    pub fn new() -> Self {
        Self
    }

    /// Sorts `jobs` back to front as seen from `camera`.
    ///
    /// Perspective cameras order by descending squared distance from the
    /// camera to each bounding-box center. Orthographic cameras order by
    /// ascending view-space z of the center; the camera looks down -z, so
    /// this is also back to front.
    pub fn sort_by_distance_to_camera(&self, jobs: &mut [RenderJob], camera: &Camera) {
        if camera.is_orthographic() {
            let view = camera.view_matrix();
            jobs.sort_by(|a, b| {
                let za = view.transform_point3(a.bounding_box.center()).z;
                let zb = view.transform_point3(b.bounding_box.center()).z;
                za.total_cmp(&zb)
            });
        } else {
            let eye = camera.position;
            jobs.sort_by(|a, b| {
                let da = (a.bounding_box.center() - eye).length_squared();
                let db = (b.bounding_box.center() - eye).length_squared();
                db.total_cmp(&da)
            });
        }
    }

    /// Groups jobs by material inside every non-translucent partition.
    ///
    /// The translucent range is left untouched so its distance order holds.
    pub fn sort_by_material(&self, data: &mut RenderData) {
        let ranges = [
            data.deferred_opaque_range(),
            data.deferred_alpha_masked_range(),
            Some(data.forward_opaque_range()),
            Some(data.forward_alpha_masked_range()),
        ];
        for range in ranges.into_iter().flatten() {
            data.jobs[range].sort_by_key(|job| job.material);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_lane::RenderJobClassifier;
    use lumen_core::math::{Aabb, Vec3};
    use lumen_core::renderer::{BlendFunction, Projection};
    use lumen_data::{Material, SceneData};

    fn job_at(center: Vec3) -> RenderJob {
        RenderJob {
            bounding_box: Aabb::from_center_half_extents(center, Vec3::splat(0.25)),
            ..Default::default()
        }
    }

    fn scattered_jobs() -> Vec<RenderJob> {
        [
            Vec3::new(0.0, 0.0, -3.0),
            Vec3::new(4.0, 1.0, -20.0),
            Vec3::new(-2.0, 0.0, -8.0),
            Vec3::new(1.0, -3.0, -1.0),
            Vec3::new(0.0, 5.0, -12.0),
        ]
        .into_iter()
        .map(job_at)
        .collect()
    }

    #[test]
    fn perspective_sort_is_back_to_front() {
        let camera = Camera::look_at(
            Vec3::ZERO,
            Vec3::NEG_Z,
            Vec3::Y,
            Projection::Perspective {
                fov_y: 1.0,
                aspect: 1.0,
                near: 0.1,
                far: 100.0,
            },
        );
        let mut jobs = scattered_jobs();
        JobSorter::new().sort_by_distance_to_camera(&mut jobs, &camera);

        let distances: Vec<f32> = jobs
            .iter()
            .map(|job| (job.bounding_box.center() - camera.position).length_squared())
            .collect();
        assert!(distances.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn orthographic_sort_is_by_view_depth() {
        let camera = Camera::look_at(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::ZERO,
            Vec3::Y,
            Projection::Orthographic {
                half_width: 10.0,
                half_height: 10.0,
                near: 0.1,
                far: 100.0,
            },
        );
        let mut jobs = scattered_jobs();
        JobSorter::new().sort_by_distance_to_camera(&mut jobs, &camera);

        let view = camera.view_matrix();
        let depths: Vec<f32> = jobs
            .iter()
            .map(|job| view.transform_point3(job.bounding_box.center()).z)
            .collect();
        assert!(depths.windows(2).all(|pair| pair[0] <= pair[1]));
        // Farthest first.
        assert_eq!(jobs[0].bounding_box.center(), Vec3::new(4.0, 1.0, -20.0));
    }

    #[test]
    fn material_sort_skips_translucent_range() {
        let mut scene = SceneData::new();
        let a = scene.add_material(Material::new("a"));
        let b = scene.add_material(Material::new("b"));
        let mut glass_a = Material::new("glass a");
        glass_a.set_blend_state(BlendFunction::OneToOne);
        let glass_a = scene.add_material(glass_a);
        let mut glass_b = Material::new("glass b");
        glass_b.set_blend_state(BlendFunction::OneToOne);
        let glass_b = scene.add_material(glass_b);

        // Insertion order makes b > a and glass_b > glass_a.
        let jobs: Vec<RenderJob> = [b, glass_b, a, glass_a, b, a]
            .into_iter()
            .map(|material| RenderJob {
                material,
                ..Default::default()
            })
            .collect();
        let mut data = RenderJobClassifier::new().run(&scene, jobs, false);
        JobSorter::new().sort_by_material(&mut data);

        let opaque: Vec<_> = data.jobs[data.deferred_opaque_range().unwrap()]
            .iter()
            .map(|job| job.material)
            .collect();
        assert_eq!(opaque, vec![a, a, b, b]);

        let translucent: Vec<_> = data.jobs[data.translucent_range()]
            .iter()
            .map(|job| job.material)
            .collect();
        assert_eq!(translucent, vec![glass_b, glass_a]);
    }
}
