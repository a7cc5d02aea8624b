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

//! Scene lights and the payloads they mirror on the GPU.

mod buffers;
mod data;

pub use buffers::{DirectionalLightTable, LightCacheBuffer, PointLightCache, SpotLightCache};
pub use data::{DirectionalLightData, LightCommonData, PointLightData, SpotLightData};

use crate::cache::CacheItem;
use bytemuck::Pod;
use lumen_core::math::{BoundingSphere, Frustum, Mat4, Vec2, Vec3};
use lumen_core::renderer::limits::{MAX_CASCADE_COUNT, SHADOW_BIAS_MULTIPLIER};
use lumen_core::ObjectId;

/// Discriminant of [`LightKind`], for cheap branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightType {
    /// A directional light.
    Directional,
    /// A point light.
    Point,
    /// A spot light.
    Spot,
}

/// Per-kind light parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Infinitely distant light affecting every object.
    Directional {
        /// Direction the light travels.
        direction: Vec3,
        /// Shadow projection-view matrix of each cascade.
        cascade_projection_views: [Mat4; MAX_CASCADE_COUNT],
    },
    /// Omnidirectional light with a spherical influence volume.
    Point {
        /// Influence radius.
        radius: f32,
    },
    /// Cone light.
    Spot {
        /// Cone axis.
        direction: Vec3,
        /// Cone length.
        radius: f32,
        /// Outer cone angle in radians.
        outer_angle: f32,
        /// Inner cone angle in radians.
        inner_angle: f32,
    },
}

impl LightKind {
    /// The discriminant of this kind.
    pub fn light_type(&self) -> LightType {
        match self {
            LightKind::Directional { .. } => LightType::Directional,
            LightKind::Point { .. } => LightType::Point,
            LightKind::Spot { .. } => LightType::Spot,
        }
    }
}

/// Parameters common to every light kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightCommon {
    /// Linear RGB color.
    pub color: Vec3,
    /// Scale applied to `color`.
    pub intensity: f32,
    /// World-space position. Ignored by directional lights.
    pub position: Vec3,
    /// Whether the light renders a shadow map.
    pub cast_shadow: bool,
    /// User-facing bias, scaled by [`SHADOW_BIAS_MULTIPLIER`] on upload.
    pub shadow_bias: f32,
    /// Light bleeding reduction of variance shadows.
    pub bleeding_reduction: f32,
    /// Filter radius of percentage-closer filtering.
    pub pcf_radius: f32,
    /// Sample count of percentage-closer filtering.
    pub pcf_samples: u32,
    /// Shadow map edge length in texels.
    pub shadow_resolution: f32,
    /// Origin of the shadow map in the atlas.
    pub shadow_atlas_coord: Vec2,
    /// Atlas layer holding the shadow map.
    pub shadow_atlas_layer: i32,
}

impl Default for LightCommon {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            intensity: 1.0,
            position: Vec3::ZERO,
            cast_shadow: false,
            shadow_bias: 0.1,
            bleeding_reduction: 0.1,
            pcf_radius: 1.0,
            pcf_samples: 32,
            shadow_resolution: 1024.0,
            shadow_atlas_coord: Vec2::ZERO,
            shadow_atlas_layer: 0,
        }
    }
}

/// Packed payload of a light, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightData {
    /// Directional light payload.
    Directional(DirectionalLightData),
    /// Point light payload.
    Point(PointLightData),
    /// Spot light payload.
    Spot(SpotLightData),
}

/// A light in the scene.
///
/// Influence volumes are recomputed on every change so readers on worker
/// threads always see bounds that match the parameters.
#[derive(Debug, Clone)]
pub struct Light {
    common: LightCommon,
    kind: LightKind,
    bounding_sphere: BoundingSphere,
    spot_projection_view: Mat4,
    frustum: Frustum,
    cache_item: CacheItem<LightData>,
}

impl Light {
    /// Creates a light of the given kind with default common parameters.
    pub fn new(kind: LightKind) -> Self {
        let mut light = Self {
            common: LightCommon::default(),
            kind,
            bounding_sphere: BoundingSphere::new(Vec3::ZERO, 0.0),
            spot_projection_view: Mat4::IDENTITY,
            frustum: Frustum::from_matrix(&Mat4::IDENTITY),
            cache_item: CacheItem::new(
                ObjectId::NULL,
                LightData::Point(PointLightData::default()),
            ),
        };
        light.refresh_bounds();
        light
    }

    /// A directional light travelling along `direction`.
    pub fn directional(direction: Vec3) -> Self {
        Self::new(LightKind::Directional {
            direction: direction.normalize_or_zero(),
            cascade_projection_views: [Mat4::IDENTITY; MAX_CASCADE_COUNT],
        })
    }

    /// A point light at `position`.
    pub fn point(position: Vec3, radius: f32) -> Self {
        let mut light = Self::new(LightKind::Point { radius });
        light.set_position(position);
        light
    }

    /// A spot light at `position` pointing along `direction`.
    pub fn spot(
        position: Vec3,
        direction: Vec3,
        radius: f32,
        outer_angle: f32,
        inner_angle: f32,
    ) -> Self {
        let mut light = Self::new(LightKind::Spot {
            direction: direction.normalize_or_zero(),
            radius,
            outer_angle,
            inner_angle,
        });
        light.set_position(position);
        light
    }

    /// Persistent id. Null until the light is added to a scene.
    pub fn id(&self) -> ObjectId {
        self.cache_item.id
    }

    pub(crate) fn set_id(&mut self, id: ObjectId) {
        self.cache_item.id = id;
        self.cache_item.invalidate();
    }

    /// The discriminant of the light's kind.
    pub fn light_type(&self) -> LightType {
        self.kind.light_type()
    }

    /// Parameters shared by every kind.
    pub fn common(&self) -> &LightCommon {
        &self.common
    }

    /// Kind-specific parameters.
    pub fn kind(&self) -> &LightKind {
        &self.kind
    }

    /// Influence sphere. Meaningful for point lights.
    pub fn bounding_sphere(&self) -> &BoundingSphere {
        &self.bounding_sphere
    }

    /// Influence frustum. Meaningful for spot lights.
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Cascade matrices of a directional light.
    pub fn cascade_projection_views(&self) -> Option<&[Mat4; MAX_CASCADE_COUNT]> {
        match &self.kind {
            LightKind::Directional {
                cascade_projection_views,
                ..
            } => Some(cascade_projection_views),
            _ => None,
        }
    }

    /// Edits the light's parameters, then invalidates the cache item and
    /// recomputes influence bounds.
    ///
    /// The kind itself may be edited but not switched to another variant.
    pub fn modify(&mut self, edit: impl FnOnce(&mut LightCommon, &mut LightKind)) {
        let before = self.kind.light_type();
        edit(&mut self.common, &mut self.kind);
        debug_assert_eq!(before, self.kind.light_type(), "light kind changed in place");
        self.refresh_bounds();
        self.cache_item.invalidate();
    }

    /// Moves the light.
    pub fn set_position(&mut self, position: Vec3) {
        self.modify(|common, _| common.position = position);
    }

    /// Sets the intensity.
    pub fn set_intensity(&mut self, intensity: f32) {
        self.modify(|common, _| common.intensity = intensity);
    }

    /// Sets the color.
    pub fn set_color(&mut self, color: Vec3) {
        self.modify(|common, _| common.color = color);
    }

    /// The packed payload and its version.
    pub fn cache_item(&self) -> &CacheItem<LightData> {
        &self.cache_item
    }

    /// Re-packs the payload if any parameter changed since the last call.
    /// Returns `true` when the version was bumped.
    pub fn update_cache_item(&mut self) -> bool {
        if self.cache_item.is_valid() {
            return false;
        }
        self.cache_item.data = self.pack();
        self.cache_item.validate();
        true
    }

    /// The payload typed for one of the kind-specific caches.
    pub fn typed_cache_item<T: LightPayload>(&self) -> Option<CacheItem<T>> {
        T::from_data(&self.cache_item.data).map(|data| self.cache_item.with_data(data))
    }

    fn refresh_bounds(&mut self) {
        match self.kind {
            LightKind::Point { radius } => {
                self.bounding_sphere = BoundingSphere::new(self.common.position, radius);
            }
            LightKind::Spot {
                direction,
                radius,
                outer_angle,
                ..
            } => {
                let up = if direction.cross(Vec3::Y).length_squared() < 1e-6 {
                    Vec3::X
                } else {
                    Vec3::Y
                };
                let eye = self.common.position;
                let view = Mat4::look_at_rh(eye, eye + direction, up);
                let fov = outer_angle.clamp(1e-3, std::f32::consts::PI - 1e-3);
                let projection = Mat4::perspective_rh_gl(fov, 1.0, 0.01, radius.max(0.02));
                self.spot_projection_view = projection * view;
                self.frustum = Frustum::from_matrix(&self.spot_projection_view);
                self.bounding_sphere = BoundingSphere::new(self.common.position, radius);
            }
            LightKind::Directional { .. } => {}
        }
    }

    fn pack(&self) -> LightData {
        let c = &self.common;
        let common = LightCommonData {
            color: c.color.to_array(),
            intensity: c.intensity,
            position: c.position.to_array(),
            cast_shadow: i32::from(c.cast_shadow),
            shadow_bias: c.shadow_bias * SHADOW_BIAS_MULTIPLIER,
            bleeding_reduction: c.bleeding_reduction,
            pcf_radius: c.pcf_radius,
            pcf_samples: c.pcf_samples as i32,
            shadow_atlas_coord: c.shadow_atlas_coord.to_array(),
            shadow_resolution: c.shadow_resolution,
            shadow_atlas_layer: c.shadow_atlas_layer,
        };

        match self.kind {
            LightKind::Directional { direction, .. } => {
                LightData::Directional(DirectionalLightData {
                    common,
                    direction: direction.to_array(),
                    ..Default::default()
                })
            }
            LightKind::Point { radius } => LightData::Point(PointLightData {
                common,
                radius,
                ..Default::default()
            }),
            LightKind::Spot {
                direction,
                radius,
                outer_angle,
                inner_angle,
            } => LightData::Spot(SpotLightData {
                common,
                direction: direction.to_array(),
                radius,
                outer_angle,
                inner_angle,
                projection_view: self.spot_projection_view.to_cols_array_2d(),
                ..Default::default()
            }),
        }
    }
}

/// A payload stored by one of the kind-specific light caches.
pub trait LightPayload: Pod {
    /// The light kind this payload belongs to.
    const LIGHT_TYPE: LightType;

    /// Extracts the payload if `data` is of this kind.
    fn from_data(data: &LightData) -> Option<Self>;
}

impl LightPayload for DirectionalLightData {
    const LIGHT_TYPE: LightType = LightType::Directional;

    fn from_data(data: &LightData) -> Option<Self> {
        match data {
            LightData::Directional(d) => Some(*d),
            _ => None,
        }
    }
}

impl LightPayload for PointLightData {
    const LIGHT_TYPE: LightType = LightType::Point;

    fn from_data(data: &LightData) -> Option<Self> {
        match data {
            LightData::Point(d) => Some(*d),
            _ => None,
        }
    }
}

impl LightPayload for SpotLightData {
    const LIGHT_TYPE: LightType = LightType::Spot;

    fn from_data(data: &LightData) -> Option<Self> {
        match data {
            LightData::Spot(d) => Some(*d),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lumen_core::math::{Aabb, IntersectResult};

    #[test]
    fn update_packs_once_per_change() {
        let mut light = Light::point(Vec3::new(1.0, 2.0, 3.0), 5.0);
        assert!(light.update_cache_item());
        let version = light.cache_item().version();
        assert!(!light.update_cache_item());

        light.set_intensity(4.0);
        assert!(!light.cache_item().is_valid());
        assert!(light.update_cache_item());
        assert_eq!(light.cache_item().version(), version + 1);

        let point: CacheItem<PointLightData> = light.typed_cache_item().unwrap();
        assert_eq!(point.data.radius, 5.0);
        assert_eq!(point.data.common.intensity, 4.0);
        assert_eq!(point.data.common.position, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn typed_item_rejects_other_kinds() {
        let mut light = Light::directional(Vec3::NEG_Y);
        light.update_cache_item();
        assert!(light.typed_cache_item::<PointLightData>().is_none());
        assert!(light.typed_cache_item::<DirectionalLightData>().is_some());
    }

    #[test]
    fn shadow_bias_is_scaled_on_upload() {
        let mut light = Light::point(Vec3::ZERO, 1.0);
        light.modify(|common, _| common.shadow_bias = 2.0);
        light.update_cache_item();
        let point: CacheItem<PointLightData> = light.typed_cache_item().unwrap();
        assert_relative_eq!(point.data.common.shadow_bias, 2.0 * SHADOW_BIAS_MULTIPLIER);
    }

    #[test]
    fn point_bounds_follow_position() {
        let mut light = Light::point(Vec3::ZERO, 2.0);
        light.set_position(Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(light.bounding_sphere().center, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(light.bounding_sphere().radius, 2.0);
    }

    #[test]
    fn spot_frustum_covers_its_cone() {
        let light = Light::spot(Vec3::ZERO, Vec3::NEG_Z, 10.0, 0.8, 0.6);
        let ahead = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, -5.0), Vec3::splat(0.5));
        let behind = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, 5.0), Vec3::splat(0.5));
        let beyond = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, -20.0), Vec3::splat(0.5));

        assert_ne!(light.frustum().intersect_aabb(&ahead), IntersectResult::Outside);
        assert_eq!(light.frustum().intersect_aabb(&behind), IntersectResult::Outside);
        assert_eq!(light.frustum().intersect_aabb(&beyond), IntersectResult::Outside);
    }
}
