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

//! A camera snapshot: enough to sort jobs and fill the camera buffer.

use crate::id::ObjectId;
use crate::math::Frustum;
use glam::{Mat4, Quat, Vec3};

/// Lens model of a camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective projection with a vertical field of view in radians.
    Perspective {
        /// Vertical field of view in radians.
        fov_y: f32,
        /// Width over height.
        aspect: f32,
        /// Near clip distance.
        near: f32,
        /// Far clip distance.
        far: f32,
    },
    /// Orthographic projection bounded by a view-space box.
    Orthographic {
        /// Half the view width.
        half_width: f32,
        /// Half the view height.
        half_height: f32,
        /// Near clip distance.
        near: f32,
        /// Far clip distance.
        far: f32,
    },
}

/// World-space camera pose plus projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Identity used to skip redundant camera buffer uploads.
    pub id: ObjectId,
    /// Bumped whenever the pose or lens changes.
    pub version: u32,
    /// World-space position.
    pub position: Vec3,
    /// World-space orientation. The camera looks down its local -Z.
    pub orientation: Quat,
    /// Lens.
    pub projection: Projection,
}

impl Camera {
    /// Creates a camera at `position` looking at `target`.
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3, projection: Projection) -> Self {
        let view = Mat4::look_at_rh(position, target, up);
        let (_, rotation, _) = view.inverse().to_scale_rotation_translation();
        Self {
            id: ObjectId::unique(),
            version: 0,
            position,
            orientation: rotation,
            projection,
        }
    }

    /// Returns `true` for orthographic lenses.
    #[inline]
    pub fn is_orthographic(&self) -> bool {
        matches!(self.projection, Projection::Orthographic { .. })
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    /// World-to-view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position).inverse()
    }

    /// View-to-clip matrix (OpenGL clip conventions).
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh_gl(fov_y, aspect, near, far),
            Projection::Orthographic {
                half_width,
                half_height,
                near,
                far,
            } => Mat4::orthographic_rh_gl(
                -half_width,
                half_width,
                -half_height,
                half_height,
                near,
                far,
            ),
        }
    }

    /// The camera's view volume in world space.
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(&(self.projection_matrix() * self.view_matrix()))
    }
}
