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

//! Shader stages and the built-in uniforms they may declare.

use super::device::{GraphicsDevice, ShaderHandle};
use super::error::ShaderError;
use crate::id::ObjectId;
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
use std::sync::{Arc, OnceLock};

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Runs once per vertex.
    Vertex,
    /// Runs once per fragment.
    Fragment,
}

/// Uniforms the frame renderer knows how to feed.
///
/// A shader lists the ones it reads; their locations are resolved once when
/// the program is linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uniform {
    /// Object-to-world transform.
    Model,
    /// Object-to-world transform with the translation removed.
    ModelWithoutTranslate,
    /// Inverse of `Model`.
    InverseModel,
    /// Normal matrix.
    InverseTransposeModel,
    /// Rotation applied to environment map lookups.
    IblRotation,
    /// Cache slots of the job's point lights.
    ActivePointLightIndexes,
    /// Cache slots of the job's spot lights.
    ActiveSpotLightIndexes,
    /// Whether the material samples a normal map.
    NormalMapInUse,
    /// The packed material payload.
    MaterialCache,
    /// Per-draw lighting scalars and light counts.
    DrawCommand,
    /// Whether the mesh has a skeleton.
    IsSkinned,
    /// Bone count of the skeleton.
    NumBones,
    /// First key frame of the playing animation.
    KeyFrame1,
    /// Second key frame of the playing animation.
    KeyFrame2,
    /// Interpolation factor between the two key frames.
    KeyFrameIntTime,
    /// Key frame count of the playing animation.
    KeyFrameCount,
    /// Whether an animation is playing.
    IsAnimated,
    /// Whether a second animation is blended in.
    BlendAnimation,
    /// Weight of the blended animation.
    BlendFactor,
    /// First key frame of the blended animation.
    BlendKeyFrame1,
    /// Second key frame of the blended animation.
    BlendKeyFrame2,
    /// Interpolation factor of the blended animation.
    BlendKeyFrameIntTime,
    /// Key frame count of the blended animation.
    BlendKeyFrameCount,
}

impl Uniform {
    /// The identifier used in shader source.
    pub fn name(self) -> &'static str {
        match self {
            Uniform::Model => "model",
            Uniform::ModelWithoutTranslate => "modelWithoutTranslate",
            Uniform::InverseModel => "inverseModel",
            Uniform::InverseTransposeModel => "inverseTransposeModel",
            Uniform::IblRotation => "iblRotation",
            Uniform::ActivePointLightIndexes => "activePointLightIndexes",
            Uniform::ActiveSpotLightIndexes => "activeSpotLightIndexes",
            Uniform::NormalMapInUse => "normalMapInUse",
            Uniform::MaterialCache => "materialCache",
            Uniform::DrawCommand => "drawCommand",
            Uniform::IsSkinned => "isSkinned",
            Uniform::NumBones => "numBones",
            Uniform::KeyFrame1 => "keyFrame1",
            Uniform::KeyFrame2 => "keyFrame2",
            Uniform::KeyFrameIntTime => "keyFrameIntepolationTime",
            Uniform::KeyFrameCount => "keyFrameCount",
            Uniform::IsAnimated => "isAnimated",
            Uniform::BlendAnimation => "blendAnimation",
            Uniform::BlendFactor => "blendFactor",
            Uniform::BlendKeyFrame1 => "blendKeyFrame1",
            Uniform::BlendKeyFrame2 => "blendKeyFrame2",
            Uniform::BlendKeyFrameIntTime => "blendKeyFrameIntepolationTime",
            Uniform::BlendKeyFrameCount => "blendKeyFrameCount",
        }
    }

    /// The identifier of element `index` when the uniform is declared as an array.
    pub fn element_name(self, index: usize) -> String {
        format!("{}[{index}]", self.name())
    }
}

/// A built-in uniform declared as an array of `size` elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayUniform {
    /// Which uniform.
    pub uniform: Uniform,
    /// Declared element count.
    pub size: usize,
}

/// A value assignable to a uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// A `bool` uniform.
    Bool(bool),
    /// A `float` uniform.
    Float(f32),
    /// An `int` uniform.
    Int(i32),
    /// A `uint` uniform.
    UInt(u32),
    /// A `vec2` uniform.
    Vec2(Vec2),
    /// A `vec3` uniform.
    Vec3(Vec3),
    /// A `vec4` uniform.
    Vec4(Vec4),
    /// A `mat3` uniform.
    Mat3(Mat3),
    /// A `mat4` uniform.
    Mat4(Mat4),
}

/// One shader stage: source plus the built-in uniforms it reads.
///
/// The stage is compiled lazily, the first time a program needs it.
#[derive(Debug)]
pub struct Shader {
    id: ObjectId,
    name: String,
    stage: ShaderStage,
    source: String,
    uniforms: Vec<Uniform>,
    array_uniforms: Vec<ArrayUniform>,
    handle: OnceLock<ShaderHandle>,
}

impl Shader {
    /// Creates an uncompiled shader with a fresh id.
    pub fn new(name: impl Into<String>, stage: ShaderStage, source: impl Into<String>) -> Self {
        Self {
            id: ObjectId::unique(),
            name: name.into(),
            stage,
            source: source.into(),
            uniforms: Vec::new(),
            array_uniforms: Vec::new(),
            handle: OnceLock::new(),
        }
    }

    /// Declares the scalar built-in uniforms this stage reads.
    pub fn with_uniforms(mut self, uniforms: impl IntoIterator<Item = Uniform>) -> Self {
        self.uniforms.extend(uniforms);
        self
    }

    /// Declares the array built-in uniforms this stage reads.
    pub fn with_array_uniforms(mut self, uniforms: impl IntoIterator<Item = ArrayUniform>) -> Self {
        self.array_uniforms.extend(uniforms);
        self
    }

    /// Identity used to key linked programs.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Name used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stage this shader compiles to.
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Scalar built-in uniforms this stage reads.
    pub fn uniforms(&self) -> &[Uniform] {
        &self.uniforms
    }

    /// Array built-in uniforms this stage reads.
    pub fn array_uniforms(&self) -> &[ArrayUniform] {
        &self.array_uniforms
    }

    /// Returns the compiled handle, compiling on first use.
    pub fn compile(&self, device: &dyn GraphicsDevice) -> Result<ShaderHandle, ShaderError> {
        if let Some(handle) = self.handle.get() {
            return Ok(*handle);
        }

        let handle = device
            .compile_shader(self.stage, &self.source)
            .map_err(|source| ShaderError::CompilationFailed {
                name: self.name.clone(),
                source,
            })?;
        Ok(*self.handle.get_or_init(|| handle))
    }
}

/// The two stages a program is linked from.
#[derive(Debug, Clone)]
pub struct ShaderPair {
    /// Vertex stage.
    pub vertex: Arc<Shader>,
    /// Fragment stage.
    pub fragment: Arc<Shader>,
}

impl ShaderPair {
    /// Pairs a vertex and a fragment stage.
    pub fn new(vertex: Arc<Shader>, fragment: Arc<Shader>) -> Self {
        Self { vertex, fragment }
    }

    /// Identity of the pair, used as the program cache key.
    pub fn key(&self) -> [ObjectId; 2] {
        [self.vertex.id(), self.fragment.id()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_element_names() {
        assert_eq!(
            Uniform::ActivePointLightIndexes.element_name(0),
            "activePointLightIndexes[0]"
        );
        assert_eq!(Uniform::DrawCommand.element_name(1), "drawCommand[1]");
    }

    #[test]
    fn shaders_get_distinct_ids() {
        let a = Shader::new("a.vert", ShaderStage::Vertex, "");
        let b = Shader::new("a.vert", ShaderStage::Vertex, "");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn builder_records_declared_uniforms() {
        let shader = Shader::new("lit.frag", ShaderStage::Fragment, "")
            .with_uniforms([Uniform::NormalMapInUse])
            .with_array_uniforms([ArrayUniform {
                uniform: Uniform::MaterialCache,
                size: 4,
            }]);
        assert_eq!(shader.uniforms(), &[Uniform::NormalMapInUse]);
        assert_eq!(shader.array_uniforms()[0].size, 4);
    }
}
