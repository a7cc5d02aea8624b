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

//! GPU layouts of the light payloads.
//!
//! Field order and explicit padding follow std140 so the structs can be
//! copied into uniform buffers byte for byte.

use bytemuck::{Pod, Zeroable};

/// Fields shared by every light kind. 64 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct LightCommonData {
    /// Linear RGB color.
    pub color: [f32; 3],
    /// Scalar intensity.
    pub intensity: f32,
    /// World-space position.
    pub position: [f32; 3],
    /// 1 when the light renders into the shadow atlas.
    pub cast_shadow: i32,
    /// Depth bias, already scaled for the shader.
    pub shadow_bias: f32,
    /// Light-bleeding reduction for variance shadow maps.
    pub bleeding_reduction: f32,
    /// PCF kernel radius.
    pub pcf_radius: f32,
    /// PCF sample count.
    pub pcf_samples: i32,
    /// Top-left of the light's region in the shadow atlas, in texels.
    pub shadow_atlas_coord: [f32; 2],
    /// Edge length of the light's shadow map region.
    pub shadow_resolution: f32,
    /// Layer of the shadow atlas holding the region.
    pub shadow_atlas_layer: i32,
}

/// Directional light payload. 80 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct DirectionalLightData {
    /// Fields shared by every light.
    pub common: LightCommonData,
    /// World-space direction the light travels.
    pub direction: [f32; 3],
    /// Padding to a 16-byte boundary.
    pub _pad0: f32,
}

/// Point light payload. 80 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct PointLightData {
    /// Fields shared by every light.
    pub common: LightCommonData,
    /// Influence radius.
    pub radius: f32,
    /// Padding.
    pub _pad0: f32,
    /// Padding.
    pub _pad1: f32,
    /// Padding.
    pub _pad2: f32,
}

/// Spot light payload. 160 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct SpotLightData {
    /// Fields shared by every light.
    pub common: LightCommonData,
    /// World-space direction of the cone axis.
    pub direction: [f32; 3],
    /// Cone length.
    pub radius: f32,
    /// Outer cone angle in radians.
    pub outer_angle: f32,
    /// Inner cone angle in radians.
    pub inner_angle: f32,
    /// Padding.
    pub _pad0: f32,
    /// Padding.
    pub _pad1: f32,
    /// Shadow projection-view matrix, column major.
    pub projection_view: [[f32; 4]; 4],
}

const _: () = assert!(std::mem::size_of::<LightCommonData>() == 64);
const _: () = assert!(std::mem::size_of::<DirectionalLightData>() == 80);
const _: () = assert!(std::mem::size_of::<PointLightData>() == 80);
const _: () = assert!(std::mem::size_of::<SpotLightData>() == 160);

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    #[test]
    fn vec3_fields_start_on_16_byte_boundaries() {
        assert_eq!(offset_of!(LightCommonData, position), 16);
        assert_eq!(offset_of!(LightCommonData, shadow_bias), 32);
        assert_eq!(offset_of!(LightCommonData, shadow_atlas_coord), 48);
        assert_eq!(offset_of!(SpotLightData, direction), 64);
        assert_eq!(offset_of!(SpotLightData, projection_view), 96);
    }
}
