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

//! Vertex layouts, draw modes and index formats for meshes.

use crate::renderer::error::ConfigError;
use std::collections::HashSet;

/// The scalar type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// 32-bit float.
    Float,
    /// Unsigned byte, normalized to [0, 1] when read.
    Byte,
    /// 32-bit unsigned integer, read as an integer.
    Int,
}

impl AttributeType {
    /// Size of one component in bytes.
    #[inline]
    pub fn component_size(self) -> u32 {
        match self {
            AttributeType::Byte => 1,
            AttributeType::Float | AttributeType::Int => 4,
        }
    }
}

/// One named attribute of a vertex layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    /// The attribute name, matched against shader inputs.
    pub name: String,
    /// The scalar type.
    pub attribute_type: AttributeType,
    /// Number of components, 1 to 4.
    pub components: u8,
    /// Byte offset inside a vertex.
    pub offset: u32,
}

impl VertexAttribute {
    /// Size of the attribute in bytes.
    #[inline]
    pub fn size(&self) -> u32 {
        self.attribute_type.component_size() * u32::from(self.components)
    }
}

/// An interleaved vertex layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexFormat {
    /// Attributes in declaration order.
    pub attributes: Vec<VertexAttribute>,
    /// Bytes per vertex.
    pub stride: u32,
}

impl VertexFormat {
    /// Creates an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an attribute after the existing ones.
    pub fn with(mut self, name: &str, attribute_type: AttributeType, components: u8) -> Self {
        let attribute = VertexAttribute {
            name: name.to_string(),
            attribute_type,
            components,
            offset: self.stride,
        };
        self.stride += attribute.size();
        self.attributes.push(attribute);
        self
    }

    /// The layout used by most meshes: position, normal and texture coordinates.
    pub fn standard() -> Self {
        Self::new()
            .with("emberPosition", AttributeType::Float, 3)
            .with("emberNormal", AttributeType::Float, 3)
            .with("emberTexCoord", AttributeType::Float, 2)
    }

    /// Finds an attribute by name, returning its index.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    /// Checks that the layout is non-empty, names are unique and component counts are 1 to 4.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attributes.is_empty() || self.stride == 0 {
            return Err(ConfigError::InvalidUsage(
                "vertex format declares no attributes".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for attribute in &self.attributes {
            if !(1..=4).contains(&attribute.components) {
                return Err(ConfigError::InvalidAttributeComponents {
                    name: attribute.name.clone(),
                    components: attribute.components,
                });
            }
            if !seen.insert(attribute.name.as_str()) {
                return Err(ConfigError::DuplicateAttribute(attribute.name.clone()));
            }
        }
        Ok(())
    }
}

/// How the device reads an attribute from its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributePointer {
    /// Number of components.
    pub components: u8,
    /// The scalar type.
    pub attribute_type: AttributeType,
    /// Bytes between consecutive vertices.
    pub stride: u32,
    /// Byte offset of the first element.
    pub offset: u32,
}

/// Primitive topology of a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrawMode {
    /// Individual points.
    Points,
    /// Independent line segments.
    Lines,
    /// A connected polyline.
    LineStrip,
    /// A closed polyline.
    LineLoop,
    /// A triangle strip.
    TriangleStrip,
    /// Independent triangles.
    #[default]
    Triangles,
    /// A triangle fan.
    TriangleFan,
}

/// How often mesh vertices change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MeshUsage {
    /// Written once.
    Static,
    /// Rewritten occasionally; partial uploads of the dirty range.
    #[default]
    Dynamic,
    /// Rewritten every frame; the whole store is re-uploaded.
    Stream,
}

/// The width of mesh indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// 16-bit unsigned indices.
    Uint16,
    /// 32-bit unsigned indices.
    Uint32,
}

impl IndexFormat {
    /// Size of one index in bytes.
    #[inline]
    pub fn size(self) -> u32 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}
