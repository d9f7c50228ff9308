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

//! Shader stages, reflected program interfaces and uniform uploads.

/// A programmable stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// The vertex stage.
    Vertex,
    /// The fragment stage.
    Fragment,
}

/// The value family of a uniform, as seen by set calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    /// Floats and float vectors.
    Float,
    /// Integers and integer vectors.
    Int,
    /// Square float matrices.
    Matrix,
    /// Texture samplers.
    Sampler,
}

impl UniformType {
    /// A readable name, used in error messages.
    pub fn describe(self) -> &'static str {
        match self {
            UniformType::Float => "float",
            UniformType::Int => "int",
            UniformType::Matrix => "matrix",
            UniformType::Sampler => "texture",
        }
    }
}

/// The GLSL type of an active uniform as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlslType {
    /// `float`.
    Float,
    /// `vec2`.
    Vec2,
    /// `vec3`.
    Vec3,
    /// `vec4`.
    Vec4,
    /// `int` or `bool`.
    Int,
    /// `ivec2`.
    IVec2,
    /// `ivec3`.
    IVec3,
    /// `ivec4`.
    IVec4,
    /// `mat2`.
    Mat2,
    /// `mat3`.
    Mat3,
    /// `mat4`.
    Mat4,
    /// `sampler2D`.
    Sampler2D,
    /// `sampler3D`.
    Sampler3D,
    /// `samplerCube`.
    SamplerCube,
    /// `sampler2DArray`.
    Sampler2DArray,
    /// Anything the core cannot bind; carries the raw device enum.
    Other(u32),
}

impl GlslType {
    /// Classifies the type, or `None` when it cannot be bound.
    pub fn uniform_type(self) -> Option<UniformType> {
        match self {
            GlslType::Float | GlslType::Vec2 | GlslType::Vec3 | GlslType::Vec4 => {
                Some(UniformType::Float)
            }
            GlslType::Int | GlslType::IVec2 | GlslType::IVec3 | GlslType::IVec4 => {
                Some(UniformType::Int)
            }
            GlslType::Mat2 | GlslType::Mat3 | GlslType::Mat4 => Some(UniformType::Matrix),
            GlslType::Sampler2D
            | GlslType::Sampler3D
            | GlslType::SamplerCube
            | GlslType::Sampler2DArray => Some(UniformType::Sampler),
            GlslType::Other(_) => None,
        }
    }

    /// Component count; the column count for matrices, 1 for samplers.
    pub fn components(self) -> u8 {
        match self {
            GlslType::Vec2 | GlslType::IVec2 | GlslType::Mat2 => 2,
            GlslType::Vec3 | GlslType::IVec3 | GlslType::Mat3 => 3,
            GlslType::Vec4 | GlslType::IVec4 | GlslType::Mat4 => 4,
            _ => 1,
        }
    }
}

/// An active uniform reported by program reflection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUniform {
    /// The reported name; arrays may carry a `[0]` suffix.
    pub name: String,
    /// The GLSL type.
    pub glsl_type: GlslType,
    /// Array length; 1 for non-arrays.
    pub array_size: u32,
}

/// An active vertex input reported by program reflection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAttribute {
    /// The input name.
    pub name: String,
    /// The bound attribute location.
    pub location: u32,
}

/// Values uploaded to one uniform location.
///
/// The element count is implied by the slice length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformUpload<'a> {
    /// Float vectors with `components` lanes each.
    Float {
        /// Lanes per element, 1 to 4.
        components: u8,
        /// Packed values.
        values: &'a [f32],
    },
    /// Integer vectors with `components` lanes each. Also used for sampler slots.
    Int {
        /// Lanes per element, 1 to 4.
        components: u8,
        /// Packed values.
        values: &'a [i32],
    },
    /// Column-major square matrices.
    Matrix {
        /// Rows (and columns) per matrix, 2 to 4.
        dimension: u8,
        /// Packed values.
        values: &'a [f32],
    },
}

/// Fixed attribute locations shared by every program.
pub mod attributes {
    /// Vertex position.
    pub const POSITION: (&str, u32) = ("emberPosition", 0);
    /// Vertex normal.
    pub const NORMAL: (&str, u32) = ("emberNormal", 1);
    /// Texture coordinates.
    pub const TEX_COORD: (&str, u32) = ("emberTexCoord", 2);
    /// Per-vertex color.
    pub const VERTEX_COLOR: (&str, u32) = ("emberVertexColor", 3);
    /// Tangent.
    pub const TANGENT: (&str, u32) = ("emberTangent", 4);
    /// Bone indices.
    pub const BONES: (&str, u32) = ("emberBones", 5);
    /// Bone weights.
    pub const BONE_WEIGHTS: (&str, u32) = ("emberBoneWeights", 6);

    /// Every fixed location, in location order.
    pub const ALL: [(&str, u32); 7] = [
        POSITION,
        NORMAL,
        TEX_COORD,
        VERTEX_COLOR,
        TANGENT,
        BONES,
        BONE_WEIGHTS,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(GlslType::Vec3.uniform_type(), Some(UniformType::Float));
        assert_eq!(GlslType::IVec2.uniform_type(), Some(UniformType::Int));
        assert_eq!(GlslType::Mat3.uniform_type(), Some(UniformType::Matrix));
        assert_eq!(GlslType::SamplerCube.uniform_type(), Some(UniformType::Sampler));
        assert_eq!(GlslType::Other(0x8B5E).uniform_type(), None);
    }

    #[test]
    fn test_components() {
        assert_eq!(GlslType::Float.components(), 1);
        assert_eq!(GlslType::IVec3.components(), 3);
        assert_eq!(GlslType::Mat4.components(), 4);
        assert_eq!(GlslType::Sampler2D.components(), 1);
    }

    #[test]
    fn test_fixed_locations_are_dense() {
        for (i, (_, location)) in attributes::ALL.iter().enumerate() {
            assert_eq!(*location as usize, i);
        }
    }
}
