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

//! Fixed per-object caps, cache sizes and GPU binding slots.
//!
//! Every value here is mirrored by a constant in shader source. Changing one
//! without the matching shader update corrupts light and material lookups.

/// Upper bound on lights of any kind attached to a single render job.
pub const MAX_LIGHTS_PER_OBJECT: usize = 128;

/// Number of shadow cascades stored per directional light.
pub const MAX_CASCADE_COUNT: usize = 4;

/// Capacity of the always-resident directional light table.
pub const DIRECTIONAL_LIGHT_CACHE_ITEM_COUNT: usize = 12;
/// Directional lights a single draw may read.
pub const MAX_DIRECTIONAL_LIGHTS_PER_OBJECT: usize = 8;

/// Default capacity, in items, of the point light eviction cache.
pub const POINT_LIGHT_CACHE_ITEM_COUNT: usize = 32;
/// Point lights a single draw may read.
pub const MAX_POINT_LIGHTS_PER_OBJECT: usize = 24;

/// Default capacity, in items, of the spot light eviction cache.
pub const SPOT_LIGHT_CACHE_ITEM_COUNT: usize = 32;
/// Spot lights a single draw may read.
pub const MAX_SPOT_LIGHTS_PER_OBJECT: usize = 24;

/// Number of sampler slots bound by name (`s_texture0` .. `s_texture31`) at link time.
pub const TEXTURE_SLOT_COUNT: u32 = 32;

/// Scale applied to user-facing shadow bias before upload.
pub const SHADOW_BIAS_MULTIPLIER: f32 = 0.0001;

/// Uniform buffer binding points.
pub mod binding {
    /// Camera matrices and position.
    pub const CAMERA: u32 = 3;
    /// Frame-wide graphics constants.
    pub const GRAPHICS_CONSTANTS: u32 = 4;
    /// Directional light table.
    pub const DIRECTIONAL_LIGHT: u32 = 7;
    /// Point light eviction cache.
    pub const POINT_LIGHT_CACHE: u32 = 8;
    /// Spot light eviction cache.
    pub const SPOT_LIGHT_CACHE: u32 = 9;
    /// Shadow projection-view matrices of the directional light table.
    pub const DIRECTIONAL_LIGHT_PVM: u32 = 10;
}

/// Texture units used by the frame renderer.
pub mod texture_slot {
    /// Material diffuse texture.
    pub const DIFFUSE: u32 = 0;
    /// Material emissive texture.
    pub const EMISSIVE: u32 = 1;
    /// Material metallic-roughness texture.
    pub const METALLIC_ROUGHNESS: u32 = 2;
    /// Animation data of the animation being blended into.
    pub const BLEND_ANIMATION: u32 = 2;
    /// Animation data of the current animation, or the bind pose.
    pub const ANIMATION: u32 = 3;
    /// Screen-space ambient occlusion.
    pub const AMBIENT_OCCLUSION: u32 = 5;
    /// Material cube map.
    pub const CUBE_MAP: u32 = 6;
    /// Irradiance map of the assigned environment probe.
    pub const IBL_DIFFUSE: u32 = 7;
    /// Shadow atlas.
    pub const SHADOW_ATLAS: u32 = 8;
    /// Material normal map.
    pub const NORMAL: u32 = 9;
    /// Pre-filtered specular map of the assigned environment probe.
    pub const IBL_SPECULAR: u32 = 15;
    /// BRDF integration lookup table.
    pub const BRDF_LUT: u32 = 16;
}
