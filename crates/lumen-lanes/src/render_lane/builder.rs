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

//! Converts entities into a flat array of per-submesh render jobs.

use super::{EnvironmentAssigner, FrameContext, LaneError, LightAssigner, RenderJob};
use lumen_core::renderer::GraphicsDevice;
use lumen_data::scene::Entity;
use lumen_data::{EntityId, EnvironmentId, LightId, MaterialId, SceneData};
use rayon::prelude::*;

/// Lights and probes the builder assigns to each job.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobInputs<'a> {
    /// Pre-sorted lights, directional first. See [`pre_sort_lights`](super::pre_sort_lights).
    pub lights: &'a [LightId],
    /// Length of the directional prefix of `lights`.
    pub directional_count: usize,
    /// Environment probes considered for each job.
    pub environments: &'a [EnvironmentId],
}

struct Drawable<'s> {
    id: EntityId,
    entity: &'s Entity,
    submesh_count: usize,
}

/// Builds one [`RenderJob`] per submesh of every drawable entity.
///
/// The destination index of every job is fixed by a prefix sum over submesh
/// counts before any job is written. Each entity then owns a disjoint slice
/// of the output, so filling can fork across the worker pool without locks.
#[derive(Debug, Default, Clone, Copy)]
pub struct RenderJobBuilder {
    lights: LightAssigner,
    environments: EnvironmentAssigner,
}

impl RenderJobBuilder {
    /// Creates the builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds jobs for `entities`.
    ///
    /// Entities are kept when they are visible (or visibility is ignored by
    /// `ctx.settings`) and carry a mesh. Meshes are uploaded on first use.
    /// Output order follows `entities` and submesh order, whether the work
    /// ran in parallel or not.
    pub fn run(
        &self,
        ctx: &FrameContext,
        scene: &mut SceneData,
        device: &dyn GraphicsDevice,
        entities: &[EntityId],
        inputs: JobInputs<'_>,
    ) -> Result<Vec<RenderJob>, LaneError> {
        let ignore_visibility = ctx.settings.ignore_visibility;

        // Mesh uploads mutate the scene, so they happen before the fork.
        let mut kept: Vec<(EntityId, lumen_data::MeshId)> = Vec::with_capacity(entities.len());
        for &id in entities {
            let Some(entity) = scene.entity(id) else {
                continue;
            };
            let Some(component) = entity.mesh else {
                continue;
            };
            if !(entity.visible || ignore_visibility) {
                continue;
            }
            if let Some(mesh) = scene.mesh_mut(component.mesh) {
                mesh.init(device)?;
                kept.push((id, component.mesh));
            }
        }

        let scene: &SceneData = scene;
        let mut offsets = Vec::with_capacity(kept.len() + 1);
        let mut total = 0usize;
        let drawables: Vec<Drawable<'_>> = kept
            .iter()
            .filter_map(|&(id, mesh)| {
                let entity = scene.entity(id)?;
                let submesh_count = scene.mesh(mesh)?.submesh_count();
                offsets.push(total);
                total += submesh_count;
                Some(Drawable {
                    id,
                    entity,
                    submesh_count,
                })
            })
            .collect();
        offsets.push(total);

        let mut jobs = vec![RenderJob::default(); total];
        let mut slices: Vec<&mut [RenderJob]> = Vec::with_capacity(drawables.len());
        let mut rest = jobs.as_mut_slice();
        for window in offsets.windows(2) {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(window[1] - window[0]);
            slices.push(head);
            rest = tail;
        }
        assert!(rest.is_empty(), "prefix sum does not cover the job array");

        let fill = |(drawable, slots): (&Drawable<'_>, &mut [RenderJob])| {
            self.fill_entity_jobs(scene, drawable, slots, inputs);
        };

        if ctx.should_fork(drawables.len()) {
            ctx.install(|| {
                drawables
                    .par_iter()
                    .zip(slices.into_par_iter())
                    .for_each(fill)
            });
        } else {
            drawables.iter().zip(slices).for_each(fill);
        }

        log::trace!(
            "Built {} render jobs from {} of {} entities",
            jobs.len(),
            drawables.len(),
            entities.len()
        );
        Ok(jobs)
    }

    fn fill_entity_jobs(
        &self,
        scene: &SceneData,
        drawable: &Drawable<'_>,
        slots: &mut [RenderJob],
        inputs: JobInputs<'_>,
    ) {
        let entity = drawable.entity;
        let Some(component) = entity.mesh else {
            return;
        };
        let Some(mesh) = scene.mesh(component.mesh) else {
            return;
        };
        assert_eq!(
            mesh.submesh_count(),
            drawable.submesh_count,
            "submesh count of '{}' changed during job construction",
            entity.name
        );
        let requires_cull_flip = entity.requires_cull_flip();

        for (index, (submesh, job)) in mesh.submeshes.iter().zip(slots.iter_mut()).enumerate() {
            *job = RenderJob {
                entity: drawable.id,
                mesh: component.mesh,
                submesh: index,
                material: self.pick_material(scene, entity, index, submesh.material),
                world_transform: entity.world_transform,
                bounding_box: entity.bounding_box,
                cast_shadow: component.cast_shadow,
                requires_cull_flip,
                animation: entity.animation,
                lights: Vec::new(),
                environment: None,
            };
            self.lights
                .run(job, scene, inputs.lights, inputs.directional_count);
            self.environments.run(job, scene, inputs.environments);
        }
    }

    fn pick_material(
        &self,
        scene: &SceneData,
        entity: &Entity,
        submesh: usize,
        mesh_default: Option<MaterialId>,
    ) -> MaterialId {
        let valid = |id: &MaterialId| scene.material(*id).is_some();

        entity
            .materials
            .as_ref()
            .and_then(|materials| materials.get(submesh))
            .copied()
            .filter(valid)
            .or_else(|| mesh_default.filter(valid))
            .unwrap_or_else(|| {
                log::warn!(
                    "Entity '{}' has no material for submesh {submesh}, using the default material",
                    entity.name
                );
                scene.default_material()
            })
    }
}
