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

//! Fixed-function state a material asks for when it is drawn.

use serde::{Deserialize, Serialize};

/// How fragment output is combined with the existing color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendFunction {
    /// Blending disabled. Fully opaque.
    #[default]
    None,
    /// Classic alpha blending: `src * a + dst * (1 - a)`.
    SrcAlphaOneMinusSrcAlpha,
    /// Additive blending: `src + dst`.
    OneToOne,
    /// No blending; fragments below the material's threshold are discarded.
    AlphaMask,
}

impl BlendFunction {
    /// Returns `true` for the functions that require back-to-front ordering.
    #[inline]
    pub fn is_translucent(self) -> bool {
        matches!(
            self,
            BlendFunction::SrcAlphaOneMinusSrcAlpha | BlendFunction::OneToOne
        )
    }
}

/// Which faces are culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CullMode {
    /// Cull back faces.
    #[default]
    Back,
    /// Cull front faces.
    Front,
    /// Culling disabled.
    TwoSided,
}

impl CullMode {
    /// Swaps front and back culling. Used for transforms that mirror geometry.
    pub fn flipped(self) -> Self {
        match self {
            CullMode::Back => CullMode::Front,
            CullMode::Front => CullMode::Back,
            CullMode::TwoSided => CullMode::TwoSided,
        }
    }
}

/// Primitive assembly mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DrawType {
    /// Isolated points.
    Point,
    /// Independent line segments.
    Line,
    /// Connected line segments.
    LineStrip,
    /// A line strip closed back to its first vertex.
    LineLoop,
    /// Independent triangles.
    #[default]
    Triangle,
}

/// The subset of pipeline state a material controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderState {
    /// Face culling.
    pub cull_mode: CullMode,
    /// Blending.
    pub blend_function: BlendFunction,
    /// Primitive type.
    pub draw_type: DrawType,
    /// Rasterized line width for line primitives.
    pub line_width: f32,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            blend_function: BlendFunction::None,
            draw_type: DrawType::Triangle,
            line_width: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_swaps_front_and_back_only() {
        assert_eq!(CullMode::Back.flipped(), CullMode::Front);
        assert_eq!(CullMode::Front.flipped(), CullMode::Back);
        assert_eq!(CullMode::TwoSided.flipped(), CullMode::TwoSided);
    }

    #[test]
    fn translucent_blend_functions() {
        assert!(BlendFunction::SrcAlphaOneMinusSrcAlpha.is_translucent());
        assert!(BlendFunction::OneToOne.is_translucent());
        assert!(!BlendFunction::AlphaMask.is_translucent());
        assert!(!BlendFunction::None.is_translucent());
    }
}
