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

//! Partitions a frame's jobs into technique ranges.

use super::job::DeferredBounds;
use super::{RenderData, RenderJob};
use lumen_data::{Material, SceneData};

/// Stable in-place partition. Elements satisfying `predicate` move to the
/// front in their original relative order; returns how many there are.
pub fn stable_partition<T>(items: &mut [T], mut predicate: impl FnMut(&T) -> bool) -> usize {
    let count = items.iter().filter(|item| predicate(item)).count();
    items.sort_by_key(|item| !predicate(item));
    count
}

/// Splits jobs into deferred opaque, deferred alpha-masked, forward opaque,
/// forward alpha-masked and forward translucent ranges.
///
/// Each partition only reorders inside the range the previous one produced,
/// so the ranges nest. Custom shader materials never go deferred.
#[derive(Debug, Default, Clone, Copy)]
pub struct RenderJobClassifier;

impl RenderJobClassifier {
    /// Creates the classifier.
    pub fn new() -> Self {
        Self
    }

    /// Partitions `jobs` into a new [`RenderData`].
    ///
    /// With `forward_only` the deferred ranges are absent and every job is
    /// drawn forward.
    pub fn run(&self, scene: &SceneData, jobs: Vec<RenderJob>, forward_only: bool) -> RenderData {
        let mut data = RenderData::new(jobs);
        self.classify(scene, &mut data, forward_only);
        data
    }

    /// Re-partitions `data` in place.
    pub fn classify(&self, scene: &SceneData, data: &mut RenderData, forward_only: bool) {
        let material = |job: &RenderJob| scene.material(job.material);
        let translucent = |job: &RenderJob| material(job).is_some_and(Material::is_translucent);
        let alpha_masked = |job: &RenderJob| material(job).is_some_and(Material::is_alpha_masked);
        let shader = |job: &RenderJob| material(job).is_some_and(Material::is_shader_material);

        let jobs = data.jobs.as_mut_slice();
        let len = jobs.len();

        let forward_start = if forward_only {
            data.deferred = None;
            0
        } else {
            let forward_start = stable_partition(jobs, |job| !shader(job) && !translucent(job));
            let alpha_masked_start = stable_partition(&mut jobs[..forward_start], |job| !alpha_masked(job));
            data.deferred = Some(DeferredBounds {
                opaque_start: 0,
                alpha_masked_start,
            });
            forward_start
        };

        let translucent_start =
            forward_start + stable_partition(&mut jobs[forward_start..], |job| !translucent(job));
        let forward_alpha_masked_start = forward_start
            + stable_partition(&mut jobs[forward_start..translucent_start], |job| {
                !alpha_masked(job)
            });

        data.forward_opaque_start = forward_start;
        data.forward_alpha_masked_start = forward_alpha_masked_start;
        data.forward_translucent_start = translucent_start;

        assert!(
            data.partitions_are_consistent(),
            "render data partitions are inconsistent: {:?} for {len} jobs",
            data.boundaries()
        );
        log::trace!("Classified {len} jobs into partitions {:?}", data.boundaries());
    }
}
