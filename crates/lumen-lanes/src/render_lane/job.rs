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

//! Defines `RenderJob`, the unit of drawing, and `RenderData`, the frame's
//! partitioned job array.

use lumen_core::math::{Aabb, Mat4};
use lumen_data::scene::AnimationSnapshot;
use lumen_data::{EntityId, EnvironmentId, LightId, MaterialId, MeshId};
use std::ops::Range;

/// One draw: a submesh of an entity with the material, lights and
/// environment that shade it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderJob {
    /// The entity the job was built from.
    pub entity: EntityId,
    /// Mesh the submesh belongs to.
    pub mesh: MeshId,
    /// Index of the submesh within `mesh`.
    pub submesh: usize,
    /// Material the submesh is drawn with.
    pub material: MaterialId,
    /// The entity's world transform.
    pub world_transform: Mat4,
    /// World-space bounds used for culling, light and probe assignment.
    pub bounding_box: Aabb,
    /// Whether the job is drawn into shadow maps.
    pub cast_shadow: bool,
    /// The transform mirrors geometry; front and back faces swap.
    pub requires_cull_flip: bool,
    /// Animation state at the time the job was built.
    pub animation: Option<AnimationSnapshot>,
    /// Directional lights first, then point and spot lights in scene order.
    pub lights: Vec<LightId>,
    /// Best-fitting environment probe.
    pub environment: Option<EnvironmentId>,
}

/// The rendering technique a partition is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Technique {
    /// Opaque geometry written to the G-buffer.
    DeferredOpaque,
    /// Alpha-tested geometry written to the G-buffer.
    DeferredAlphaMasked,
    /// Opaque geometry shaded forward.
    ForwardOpaque,
    /// Alpha-tested geometry shaded forward.
    ForwardAlphaMasked,
    /// Blended geometry, drawn last and back to front.
    ForwardTranslucent,
}

impl Technique {
    /// Returns `true` for the G-buffer techniques.
    pub fn is_deferred(self) -> bool {
        matches!(self, Technique::DeferredOpaque | Technique::DeferredAlphaMasked)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeferredBounds {
    pub(crate) opaque_start: usize,
    pub(crate) alpha_masked_start: usize,
}

/// A frame's jobs, partitioned in place into contiguous technique ranges.
///
/// In order: deferred opaque, deferred alpha-masked, forward opaque,
/// forward alpha-masked, forward translucent. When the deferred pipeline is
/// disabled the deferred ranges are absent rather than empty.
#[derive(Debug, Clone, Default)]
pub struct RenderData {
    /// All jobs of the frame.
    pub jobs: Vec<RenderJob>,
    pub(crate) deferred: Option<DeferredBounds>,
    pub(crate) forward_opaque_start: usize,
    pub(crate) forward_alpha_masked_start: usize,
    pub(crate) forward_translucent_start: usize,
}

impl RenderData {
    /// Wraps unclassified jobs. Every job starts in the forward opaque range.
    pub fn new(jobs: Vec<RenderJob>) -> Self {
        let len = jobs.len();
        Self {
            jobs,
            deferred: None,
            forward_opaque_start: 0,
            forward_alpha_masked_start: len,
            forward_translucent_start: len,
        }
    }

    /// Total number of jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Returns `true` when there are no jobs.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Returns `false` when the deferred pipeline was disabled at classification.
    pub fn has_deferred(&self) -> bool {
        self.deferred.is_some()
    }

    /// Deferred opaque jobs. `None` when rendering forward only.
    pub fn deferred_opaque_range(&self) -> Option<Range<usize>> {
        self.deferred
            .map(|bounds| bounds.opaque_start..bounds.alpha_masked_start)
    }

    /// Deferred alpha-masked jobs. `None` when rendering forward only.
    pub fn deferred_alpha_masked_range(&self) -> Option<Range<usize>> {
        self.deferred
            .map(|bounds| bounds.alpha_masked_start..self.forward_opaque_start)
    }

    /// Forward opaque jobs.
    pub fn forward_opaque_range(&self) -> Range<usize> {
        self.forward_opaque_start..self.forward_alpha_masked_start
    }

    /// Forward alpha-masked jobs.
    pub fn forward_alpha_masked_range(&self) -> Range<usize> {
        self.forward_alpha_masked_start..self.forward_translucent_start
    }

    /// Translucent jobs, always the tail of `jobs`.
    pub fn translucent_range(&self) -> Range<usize> {
        self.forward_translucent_start..self.jobs.len()
    }

    /// The range of `technique`, `None` for deferred techniques when disabled.
    pub fn range(&self, technique: Technique) -> Option<Range<usize>> {
        match technique {
            Technique::DeferredOpaque => self.deferred_opaque_range(),
            Technique::DeferredAlphaMasked => self.deferred_alpha_masked_range(),
            Technique::ForwardOpaque => Some(self.forward_opaque_range()),
            Technique::ForwardAlphaMasked => Some(self.forward_alpha_masked_range()),
            Technique::ForwardTranslucent => Some(self.translucent_range()),
        }
    }

    /// The present partitions in the order they must be drawn.
    pub fn partitions(&self) -> impl Iterator<Item = (Technique, Range<usize>)> + '_ {
        [
            Technique::DeferredOpaque,
            Technique::DeferredAlphaMasked,
            Technique::ForwardOpaque,
            Technique::ForwardAlphaMasked,
            Technique::ForwardTranslucent,
        ]
        .into_iter()
        .filter_map(|technique| self.range(technique).map(|range| (technique, range)))
    }

    /// Jobs of `technique`; empty when the partition is absent.
    pub fn jobs_of(&self, technique: Technique) -> &[RenderJob] {
        self.range(technique)
            .map_or(&[][..], |range| &self.jobs[range])
    }

    /// Partition boundaries in order, ending with the job count.
    ///
    /// Deferred boundaries are omitted when the deferred pipeline is disabled.
    pub fn boundaries(&self) -> Vec<usize> {
        let mut boundaries = Vec::with_capacity(6);
        if let Some(bounds) = self.deferred {
            boundaries.push(bounds.opaque_start);
            boundaries.push(bounds.alpha_masked_start);
        }
        boundaries.extend([
            self.forward_opaque_start,
            self.forward_alpha_masked_start,
            self.forward_translucent_start,
            self.jobs.len(),
        ]);
        boundaries
    }

    /// Returns `true` when boundaries are non-decreasing and end at the job count.
    pub fn partitions_are_consistent(&self) -> bool {
        let boundaries = self.boundaries();
        boundaries.windows(2).all(|pair| pair[0] <= pair[1])
            && boundaries.first() == Some(&0)
            && boundaries.last() == Some(&self.jobs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_data_is_all_forward_opaque() {
        let data = RenderData::new(vec![RenderJob::default(); 3]);
        assert!(!data.has_deferred());
        assert_eq!(data.forward_opaque_range(), 0..3);
        assert!(data.translucent_range().is_empty());
        assert!(data.partitions_are_consistent());
        assert_eq!(data.partitions().count(), 3);
        assert!(data.jobs_of(Technique::DeferredOpaque).is_empty());
    }

    #[test]
    fn deferred_bounds_produce_five_partitions_in_order() {
        let mut data = RenderData::new(vec![RenderJob::default(); 6]);
        data.deferred = Some(DeferredBounds {
            opaque_start: 0,
            alpha_masked_start: 2,
        });
        data.forward_opaque_start = 3;
        data.forward_alpha_masked_start = 4;
        data.forward_translucent_start = 5;

        let partitions: Vec<_> = data.partitions().collect();
        assert_eq!(
            partitions,
            vec![
                (Technique::DeferredOpaque, 0..2),
                (Technique::DeferredAlphaMasked, 2..3),
                (Technique::ForwardOpaque, 3..4),
                (Technique::ForwardAlphaMasked, 4..5),
                (Technique::ForwardTranslucent, 5..6),
            ]
        );
        assert_eq!(data.boundaries(), vec![0, 2, 3, 4, 5, 6]);
        assert!(data.partitions_are_consistent());

        data.forward_alpha_masked_start = 2;
        assert!(!data.partitions_are_consistent());
    }
}
