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

//! Surface materials and their GPU-visible scalar block.

use crate::cache::CacheItem;
use bytemuck::{Pod, Zeroable};
use lumen_core::math::Vec3;
use lumen_core::renderer::{
    BlendFunction, CullMode, DrawType, RenderState, ShaderPair, TextureId, UniformValue,
};
use lumen_core::ObjectId;

/// Per-material scalars uploaded as `vec4 materialCache[4]`.
///
/// Flags are stored as `0.0` / `1.0` and read back with `> 0.5`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct MaterialData {
    /// RGB color, alpha.
    pub color_alpha: [f32; 4],
    /// RGB emissive color, alpha-mask threshold.
    pub emissive_threshold: [f32; 4],
    /// Metallic, roughness, alpha-mask enabled, diffuse texture in use.
    pub metallic_roughness: [f32; 4],
    /// Emissive, normal and metallic-roughness textures in use.
    pub texture_flags: [f32; 4],
}

const _: () = assert!(std::mem::size_of::<MaterialData>() == 64);

#[inline]
fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

impl MaterialData {
    /// Alpha testing is on.
    pub fn use_alpha_mask(&self) -> bool {
        self.metallic_roughness[2] > 0.5
    }

    /// The diffuse texture is sampled.
    pub fn diffuse_texture_in_use(&self) -> bool {
        self.metallic_roughness[3] > 0.5
    }

    /// The emissive texture is sampled.
    pub fn emissive_texture_in_use(&self) -> bool {
        self.texture_flags[0] > 0.5
    }

    /// The normal map is sampled.
    pub fn normal_texture_in_use(&self) -> bool {
        self.texture_flags[1] > 0.5
    }

    /// The metallic-roughness texture is sampled.
    pub fn metallic_roughness_texture_in_use(&self) -> bool {
        self.texture_flags[2] > 0.5
    }

    /// The block as the four `vec4`s the shader declares.
    pub fn as_vec4s(&self) -> [[f32; 4]; 4] {
        [
            self.color_alpha,
            self.emissive_threshold,
            self.metallic_roughness,
            self.texture_flags,
        ]
    }
}

/// Textures a material may sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterialTextures {
    /// Base color texture.
    pub diffuse: Option<TextureId>,
    /// Emissive texture.
    pub emissive: Option<TextureId>,
    /// Packed metallic and roughness texture.
    pub metallic_roughness: Option<TextureId>,
    /// Tangent-space normal map.
    pub normal: Option<TextureId>,
    /// Environment cube map for reflective materials.
    pub cube_map: Option<TextureId>,
}

/// A surface description: scalars, textures, render state and an optional
/// custom shader pair.
///
/// Every setter invalidates the cache item. The payload is re-packed lazily
/// by [`update_cache_item`](Self::update_cache_item) before the next draw.
#[derive(Debug, Clone)]
pub struct Material {
    name: String,
    color: Vec3,
    alpha: f32,
    emissive_color: Vec3,
    metallic: f32,
    roughness: f32,
    alpha_mask_threshold: f32,
    textures: MaterialTextures,
    render_state: RenderState,
    shaders: Option<ShaderPair>,
    custom_uniforms: Vec<(String, UniformValue)>,
    cache_item: CacheItem<MaterialData>,
}

impl Material {
    /// An opaque white material using the engine shaders.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: Vec3::ONE,
            alpha: 1.0,
            emissive_color: Vec3::ZERO,
            metallic: 0.2,
            roughness: 0.5,
            alpha_mask_threshold: 0.5,
            textures: MaterialTextures::default(),
            render_state: RenderState::default(),
            shaders: None,
            custom_uniforms: Vec::new(),
            cache_item: CacheItem::new(ObjectId::NULL, MaterialData::default()),
        }
    }

    /// Persistent id. Null until the material is added to a scene.
    pub fn id(&self) -> ObjectId {
        self.cache_item.id
    }

    pub(crate) fn set_id(&mut self, id: ObjectId) {
        self.cache_item.id = id;
        self.cache_item.invalidate();
    }

    /// Name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Base color.
    pub fn color(&self) -> Vec3 {
        self.color
    }

    /// Opacity in `[0, 1]`.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Textures the material samples.
    pub fn textures(&self) -> &MaterialTextures {
        &self.textures
    }

    /// Pipeline state applied when the material is drawn.
    pub fn render_state(&self) -> &RenderState {
        &self.render_state
    }

    /// The custom shader pair, if the material brings its own.
    pub fn shaders(&self) -> Option<&ShaderPair> {
        self.shaders.as_ref()
    }

    /// Sets the base color.
    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
        self.cache_item.invalidate();
    }

    /// Sets opacity, clamped to `[0, 1]`.
    ///
    /// A value below `0.999` switches an opaque material to alpha blending.
    /// Alpha-masked materials keep their blend function.
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
        if self.alpha < 0.999 && self.render_state.blend_function != BlendFunction::AlphaMask {
            self.render_state.blend_function = BlendFunction::SrcAlphaOneMinusSrcAlpha;
        }
        self.cache_item.invalidate();
    }

    /// Sets the blend function. Clearing it to `None` also restores full opacity.
    pub fn set_blend_state(&mut self, blend: BlendFunction) {
        self.render_state.blend_function = blend;
        if blend == BlendFunction::None {
            self.alpha = 1.0;
        }
        self.cache_item.invalidate();
    }

    /// Sets the emissive color.
    pub fn set_emissive_color(&mut self, color: Vec3) {
        self.emissive_color = color;
        self.cache_item.invalidate();
    }

    /// Sets metalness.
    pub fn set_metallic(&mut self, metallic: f32) {
        self.metallic = metallic;
        self.cache_item.invalidate();
    }

    /// Sets roughness.
    pub fn set_roughness(&mut self, roughness: f32) {
        self.roughness = roughness;
        self.cache_item.invalidate();
    }

    /// Sets the alpha-mask cutoff.
    pub fn set_alpha_mask_threshold(&mut self, threshold: f32) {
        self.alpha_mask_threshold = threshold;
        self.cache_item.invalidate();
    }

    /// Replaces every texture.
    pub fn set_textures(&mut self, textures: MaterialTextures) {
        self.textures = textures;
        self.cache_item.invalidate();
    }

    /// Sets face culling. Does not touch the cached payload.
    pub fn set_cull_mode(&mut self, mode: CullMode) {
        self.render_state.cull_mode = mode;
    }

    /// Sets the primitive type.
    pub fn set_draw_type(&mut self, draw_type: DrawType) {
        self.render_state.draw_type = draw_type;
    }

    /// Sets the rasterized line width.
    pub fn set_line_width(&mut self, width: f32) {
        self.render_state.line_width = width;
    }

    /// Assigns a custom shader pair, making this a shader material.
    pub fn set_shaders(&mut self, shaders: Option<ShaderPair>) {
        self.shaders = shaders;
    }

    /// Sets a uniform fed to the material's program on every draw.
    ///
    /// Setting an existing name replaces its value.
    pub fn set_custom_uniform(&mut self, name: impl Into<String>, value: UniformValue) {
        let name = name.into();
        match self.custom_uniforms.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.custom_uniforms.push((name, value)),
        }
    }

    /// Custom uniforms in insertion order.
    pub fn custom_uniforms(&self) -> &[(String, UniformValue)] {
        &self.custom_uniforms
    }

    /// Blends with what is behind it and must be drawn back to front.
    pub fn is_translucent(&self) -> bool {
        self.render_state.blend_function.is_translucent()
    }

    /// Discards fragments below the alpha-mask threshold.
    pub fn is_alpha_masked(&self) -> bool {
        self.render_state.blend_function == BlendFunction::AlphaMask
    }

    /// Brings its own shaders instead of the engine's.
    pub fn is_shader_material(&self) -> bool {
        self.shaders.is_some()
    }

    /// The packed payload and its version.
    pub fn cache_item(&self) -> &CacheItem<MaterialData> {
        &self.cache_item
    }

    /// Re-packs the payload if anything changed. Returns `true` when the version was bumped.
    pub fn update_cache_item(&mut self) -> bool {
        if self.cache_item.is_valid() {
            return false;
        }

        let textures = &self.textures;
        self.cache_item.data = MaterialData {
            color_alpha: self.color.extend(self.alpha).to_array(),
            emissive_threshold: self.emissive_color.extend(self.alpha_mask_threshold).to_array(),
            metallic_roughness: [
                self.metallic,
                self.roughness,
                flag(self.is_alpha_masked()),
                flag(textures.diffuse.is_some()),
            ],
            texture_flags: [
                flag(textures.emissive.is_some()),
                flag(textures.normal.is_some()),
                flag(textures.metallic_roughness.is_some()),
                0.0,
            ],
        };
        self.cache_item.validate();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowering_alpha_promotes_to_alpha_blending() {
        let mut material = Material::new("glass");
        assert_eq!(material.render_state().blend_function, BlendFunction::None);

        material.set_alpha(0.4);
        assert_eq!(
            material.render_state().blend_function,
            BlendFunction::SrcAlphaOneMinusSrcAlpha
        );
        assert!(material.is_translucent());

        // Restoring alpha alone keeps blending; clearing the blend state restores opacity.
        material.set_alpha(1.0);
        assert!(material.is_translucent());
        material.set_blend_state(BlendFunction::None);
        assert!(!material.is_translucent());
        assert_eq!(material.alpha(), 1.0);
    }

    #[test]
    fn alpha_masked_material_keeps_its_blend() {
        let mut material = Material::new("foliage");
        material.set_blend_state(BlendFunction::AlphaMask);
        material.set_alpha(0.2);
        assert!(material.is_alpha_masked());
        assert!(!material.is_translucent());
    }

    #[test]
    fn alpha_is_clamped() {
        let mut material = Material::new("m");
        material.set_alpha(3.0);
        assert_eq!(material.alpha(), 1.0);
        material.set_alpha(-1.0);
        assert_eq!(material.alpha(), 0.0);
    }

    #[test]
    fn cache_item_encodes_flags() {
        let mut material = Material::new("brick");
        material.set_textures(MaterialTextures {
            diffuse: Some(TextureId(1)),
            normal: Some(TextureId(2)),
            ..Default::default()
        });
        assert!(material.update_cache_item());
        assert!(!material.update_cache_item());

        let data = material.cache_item().data;
        assert!(data.diffuse_texture_in_use());
        assert!(data.normal_texture_in_use());
        assert!(!data.emissive_texture_in_use());
        assert!(!data.metallic_roughness_texture_in_use());
        assert!(!data.use_alpha_mask());
        assert_eq!(data.color_alpha, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn custom_uniform_is_replaced_by_name() {
        let mut material = Material::new("water");
        material.set_custom_uniform("waveHeight", UniformValue::Float(0.5));
        material.set_custom_uniform("tint", UniformValue::Vec3(Vec3::X));
        material.set_custom_uniform("waveHeight", UniformValue::Float(2.0));

        assert_eq!(material.custom_uniforms().len(), 2);
        assert_eq!(material.custom_uniforms()[0].1, UniformValue::Float(2.0));
    }

    #[test]
    fn setters_bump_version_on_next_update() {
        let mut material = Material::new("m");
        material.update_cache_item();
        let version = material.cache_item().version();

        material.set_roughness(0.9);
        material.update_cache_item();
        assert_eq!(material.cache_item().version(), version + 1);
        assert_eq!(material.cache_item().data.metallic_roughness[1], 0.9);
    }
}
