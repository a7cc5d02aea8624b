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

//! Bounding volumes and the overlap tests used to decide which lights and
//! environment probes influence a draw.

use glam::{Mat4, Vec3, Vec4};

/// The outcome of testing one volume against another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntersectResult {
    /// The volumes do not overlap.
    Outside,
    /// The tested volume lies entirely within the other.
    Inside,
    /// The volumes partially overlap.
    Intersect,
}

/// An axis-aligned bounding box defined by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// The corner with the smallest coordinates.
    pub min: Vec3,
    /// The corner with the largest coordinates.
    pub max: Vec3,
}

impl Aabb {
    /// An inverted box that contains nothing. Merging any box into it yields that box.
    pub const INVALID: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    /// Creates a box from two corners, reordering components so `min <= max`.
    pub fn from_min_max(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a box centered on `center` extending `half_extents` along each axis.
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        let half_extents = half_extents.abs();
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Returns `true` if `min <= max` on every axis.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// The center point of the box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half the size of the box along each axis.
    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// The full size of the box along each axis.
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// The enclosed volume. An invalid box has zero volume.
    pub fn volume(&self) -> f32 {
        if !self.is_valid() {
            return 0.0;
        }
        let size = self.size();
        size.x * size.y * size.z
    }

    /// Returns `true` if `point` lies inside or on the surface of the box.
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Tests this box against `other`.
    ///
    /// Returns [`IntersectResult::Inside`] when `self` is fully contained by
    /// `other`, [`IntersectResult::Intersect`] on partial overlap (touching
    /// faces count as overlap), and [`IntersectResult::Outside`] otherwise.
    pub fn intersect(&self, other: &Aabb) -> IntersectResult {
        let separated = self.max.cmplt(other.min).any() || self.min.cmpgt(other.max).any();
        if separated {
            return IntersectResult::Outside;
        }

        if other.contains_point(self.min) && other.contains_point(self.max) {
            IntersectResult::Inside
        } else {
            IntersectResult::Intersect
        }
    }

    /// Returns `true` unless the boxes are separated on some axis.
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.intersect(other) != IntersectResult::Outside
    }

    /// Returns the smallest box enclosing both `self` and `other`.
    pub fn merge(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Transforms the box by `matrix` and returns the axis-aligned box enclosing the result.
    ///
    /// Uses the per-axis min/max accumulation over the matrix columns, which is
    /// exact for affine transforms and avoids transforming all eight corners.
    pub fn transform(&self, matrix: &Mat4) -> Self {
        if !self.is_valid() {
            return *self;
        }

        let translation = matrix.w_axis.truncate();
        let mut min = translation;
        let mut max = translation;

        for (axis, column) in [matrix.x_axis, matrix.y_axis, matrix.z_axis]
            .into_iter()
            .enumerate()
        {
            let column = column.truncate();
            let a = column * self.min[axis];
            let b = column * self.max[axis];
            min += a.min(b);
            max += a.max(b);
        }

        Self { min, max }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::INVALID
    }
}

/// A sphere used as the influence volume of a point light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// World-space center.
    pub center: Vec3,
    /// Radius, never negative.
    pub radius: f32,
}

impl BoundingSphere {
    /// Creates a sphere. A negative radius is treated as its absolute value.
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius: radius.abs(),
        }
    }

    /// Returns `true` if the sphere touches or overlaps `aabb`.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let closest = self.center.clamp(aabb.min, aabb.max);
        closest.distance_squared(self.center) <= self.radius * self.radius
    }
}

/// A plane in Hessian normal form: `dot(normal, p) + d = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal pointing toward the positive half-space.
    pub normal: Vec3,
    /// Signed distance term.
    pub d: f32,
}

impl Plane {
    /// Builds a plane from packed `(a, b, c, d)` coefficients, normalizing them.
    pub fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = coefficients.truncate();
        let length = normal.length();
        if length <= f32::EPSILON {
            return Self {
                normal: Vec3::ZERO,
                d: coefficients.w,
            };
        }
        Self {
            normal: normal / length,
            d: coefficients.w / length,
        }
    }

    /// Signed distance from `point` to the plane. Positive on the normal side.
    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }
}

/// A view volume bounded by six inward-facing planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extracts the planes of a combined projection-view matrix.
    ///
    /// Assumes OpenGL clip conventions (`-w <= z <= w`), which is what
    /// `Mat4::perspective_rh_gl` and `Mat4::orthographic_rh_gl` produce.
    pub fn from_matrix(projection_view: &Mat4) -> Self {
        let r0 = projection_view.row(0);
        let r1 = projection_view.row(1);
        let r2 = projection_view.row(2);
        let r3 = projection_view.row(3);

        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                Plane::from_coefficients(r3 + r2),
                Plane::from_coefficients(r3 - r2),
            ],
        }
    }

    /// Tests `aabb` against the frustum using the positive/negative vertex method.
    pub fn intersect_aabb(&self, aabb: &Aabb) -> IntersectResult {
        let mut result = IntersectResult::Inside;

        for plane in &self.planes {
            let positive = Vec3::select(plane.normal.cmpge(Vec3::ZERO), aabb.max, aabb.min);
            if plane.signed_distance(positive) < 0.0 {
                return IntersectResult::Outside;
            }

            let negative = Vec3::select(plane.normal.cmpge(Vec3::ZERO), aabb.min, aabb.max);
            if plane.signed_distance(negative) < 0.0 {
                result = IntersectResult::Intersect;
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box_at(center: Vec3) -> Aabb {
        Aabb::from_center_half_extents(center, Vec3::splat(0.5))
    }

    #[test]
    fn from_min_max_reorders_corners() {
        let aabb = Aabb::from_min_max(Vec3::new(1.0, -1.0, 3.0), Vec3::new(-1.0, 2.0, 0.0));
        assert_eq!(aabb.min, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 3.0));
        assert!(aabb.is_valid());
    }

    #[test]
    fn invalid_box_has_no_volume() {
        assert!(!Aabb::INVALID.is_valid());
        assert_eq!(Aabb::INVALID.volume(), 0.0);
        assert_eq!(Aabb::default(), Aabb::INVALID);
    }

    #[test]
    fn volume_of_scaled_box() {
        let aabb = Aabb::from_min_max(Vec3::ZERO, Vec3::new(2.0, 3.0, 4.0));
        assert_relative_eq!(aabb.volume(), 24.0);
    }

    #[test]
    fn box_box_classification() {
        let big = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(10.0));
        let small = unit_box_at(Vec3::ZERO);
        let straddling = unit_box_at(Vec3::new(10.0, 0.0, 0.0));
        let far = unit_box_at(Vec3::new(50.0, 0.0, 0.0));

        assert_eq!(small.intersect(&big), IntersectResult::Inside);
        assert_eq!(straddling.intersect(&big), IntersectResult::Intersect);
        assert_eq!(far.intersect(&big), IntersectResult::Outside);
        assert!(!far.intersects(&big));
    }

    #[test]
    fn touching_faces_count_as_overlap() {
        let a = Aabb::from_min_max(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::from_min_max(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        assert!(a.intersects(&b));
    }

    #[test]
    fn transform_translates_and_scales() {
        let aabb = Aabb::from_min_max(Vec3::splat(-1.0), Vec3::splat(1.0));
        let matrix = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 1.0, 1.0),
            glam::Quat::IDENTITY,
            Vec3::new(5.0, 0.0, 0.0),
        );
        let out = aabb.transform(&matrix);
        assert_relative_eq!(out.min, Vec3::new(3.0, -1.0, -1.0));
        assert_relative_eq!(out.max, Vec3::new(7.0, 1.0, 1.0));
    }

    #[test]
    fn transform_rotation_grows_box() {
        let aabb = Aabb::from_min_max(Vec3::splat(-1.0), Vec3::splat(1.0));
        let matrix = Mat4::from_rotation_y(std::f32::consts::FRAC_PI_4);
        let out = aabb.transform(&matrix);
        let expected = std::f32::consts::SQRT_2;
        assert_relative_eq!(out.max.x, expected, epsilon = 1e-5);
        assert_relative_eq!(out.max.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn sphere_box_overlap() {
        let aabb = unit_box_at(Vec3::ZERO);
        assert!(BoundingSphere::new(Vec3::new(1.0, 0.0, 0.0), 0.6).intersects_aabb(&aabb));
        assert!(!BoundingSphere::new(Vec3::new(3.0, 0.0, 0.0), 1.0).intersects_aabb(&aabb));
        assert!(BoundingSphere::new(Vec3::ZERO, 0.1).intersects_aabb(&aabb));
    }

    #[test]
    fn frustum_classifies_boxes() {
        let projection = Mat4::perspective_rh_gl(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let frustum = Frustum::from_matrix(&(projection * view));

        let ahead = unit_box_at(Vec3::new(0.0, 0.0, -10.0));
        let behind = unit_box_at(Vec3::new(0.0, 0.0, 10.0));
        let on_near_plane = unit_box_at(Vec3::new(0.0, 0.0, 0.0));

        assert_eq!(frustum.intersect_aabb(&ahead), IntersectResult::Inside);
        assert_eq!(frustum.intersect_aabb(&behind), IntersectResult::Outside);
        assert_eq!(
            frustum.intersect_aabb(&on_near_plane),
            IntersectResult::Intersect
        );
    }
}
