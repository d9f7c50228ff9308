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

//! Uniform blocks: a list of uniforms packed into one buffer.

use crate::arena::{BufferHandle, ShaderBlockHandle};
use crate::context::GraphicsContext;
use ember_core::renderer::{
    BufferDescriptor, BufferUsage, ConfigError, GlslType, GpuDevice, ResourceError, UniformType,
};

/// Size of one padded vector slot.
const SLOT: u64 = 16;

/// A uniform declared in a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockUniform {
    /// The uniform name.
    pub name: String,
    /// The GLSL type of one element.
    pub glsl_type: GlslType,
    /// Number of array elements; 1 for a plain uniform.
    pub count: u32,
}

impl BlockUniform {
    /// Declares a uniform.
    pub fn new(name: &str, glsl_type: GlslType, count: u32) -> Self {
        Self {
            name: name.to_string(),
            glsl_type,
            count: count.max(1),
        }
    }
}

/// A packed uniform: its declaration plus its place in the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockField {
    /// The declaration.
    pub uniform: BlockUniform,
    /// Byte offset from the start of the block.
    pub offset: u64,
    /// Bytes reserved for the uniform.
    pub size: u64,
}

impl BlockField {
    fn is_matrix(&self) -> bool {
        self.uniform.glsl_type.uniform_type() == Some(UniformType::Matrix)
    }

    /// Scalars in one element.
    fn element_scalars(&self) -> usize {
        let components = usize::from(self.uniform.glsl_type.components());
        if self.is_matrix() {
            components * components
        } else {
            components
        }
    }

    /// Byte distance between consecutive elements.
    fn element_stride(&self) -> u64 {
        if self.is_matrix() {
            self.element_scalars() as u64 * 4
        } else {
            SLOT
        }
    }
}

/// Computes byte offsets for an ordered list of uniforms.
///
/// Matrices take `components² × 4` bytes per element. Scalars and vectors
/// take one 16-byte slot per element, arrays included. Uniforms follow each
/// other without further alignment.
///
/// ## Returns
/// The packed fields and the total size in bytes.
pub fn pack(uniforms: &[BlockUniform]) -> (Vec<BlockField>, u64) {
    let mut offset = 0;
    let fields = uniforms
        .iter()
        .map(|uniform| {
            let count = u64::from(uniform.count.max(1));
            let size = if uniform.glsl_type.uniform_type() == Some(UniformType::Matrix) {
                let components = u64::from(uniform.glsl_type.components());
                components * components * 4 * count
            } else {
                SLOT * count
            };
            let field = BlockField {
                uniform: uniform.clone(),
                offset,
                size,
            };
            offset += size;
            field
        })
        .collect();
    (fields, offset)
}

/// Values written into a block uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlockValue<'a> {
    /// Float, vector or matrix data.
    Floats(&'a [f32]),
    /// Integer data.
    Ints(&'a [i32]),
}

impl BlockValue<'_> {
    fn len(&self) -> usize {
        match self {
            BlockValue::Floats(v) => v.len(),
            BlockValue::Ints(v) => v.len(),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            BlockValue::Floats(_) => "float",
            BlockValue::Ints(_) => "int",
        }
    }

    /// Bytes of scalars `start..start + count`.
    fn scalar_bytes(&self, start: usize, count: usize) -> &[u8] {
        match self {
            BlockValue::Floats(v) => bytemuck::cast_slice(&v[start..start + count]),
            BlockValue::Ints(v) => bytemuck::cast_slice(&v[start..start + count]),
        }
    }
}

/// A uniform block backed by a buffer.
#[derive(Debug)]
pub struct ShaderBlock {
    pub(crate) buffer: BufferHandle,
    pub(crate) fields: Vec<BlockField>,
    pub(crate) size: u64,
}

impl ShaderBlock {
    /// The backing buffer.
    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    /// The packed fields, in declaration order.
    pub fn fields(&self) -> &[BlockField] {
        &self.fields
    }

    /// Total packed size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Looks up a field by uniform name.
    pub fn field(&self, name: &str) -> Option<&BlockField> {
        self.fields.iter().find(|f| f.uniform.name == name)
    }
}

impl<D: GpuDevice> GraphicsContext<D> {
    /// Creates a block and a buffer sized to its packed layout.
    ///
    /// ## Errors
    /// * `ConfigError::InvalidUsage` - If `uniforms` is empty.
    pub fn create_shader_block(
        &mut self,
        uniforms: Vec<BlockUniform>,
    ) -> Result<ShaderBlockHandle, ResourceError> {
        let (fields, size) = pack(&uniforms);
        let buffer = self.create_buffer(&BufferDescriptor {
            label: Some("shader block".into()),
            size,
            usage: BufferUsage::UNIFORM | BufferUsage::UPLOAD,
        })?;
        let handle = self.blocks.insert(ShaderBlock {
            buffer,
            fields,
            size,
        });
        log::debug!(
            "Created shader block {handle:?} ({} uniform(s), {size} bytes)",
            uniforms.len()
        );
        Ok(handle)
    }

    /// Resolves a block handle.
    pub fn shader_block(&self, handle: ShaderBlockHandle) -> Result<&ShaderBlock, ResourceError> {
        self.blocks.get(handle)
    }

    /// Writes a uniform of a block into its buffer.
    ///
    /// Array elements of scalars and vectors land in consecutive 16-byte
    /// slots. The write reaches the device before the next draw that reads
    /// the block.
    ///
    /// ## Errors
    /// * `ConfigError::UnknownBlockUniform` - If the block has no uniform `name`.
    /// * `ConfigError::UniformTypeMismatch` - If the value family does not match the type.
    /// * `ConfigError::UniformCapacityExceeded` - If more scalars are given than fit.
    pub fn write_block(
        &mut self,
        handle: ShaderBlockHandle,
        name: &str,
        value: BlockValue,
    ) -> Result<(), ResourceError> {
        let block = self.blocks.get(handle)?;
        let field = block
            .field(name)
            .ok_or_else(|| ConfigError::UnknownBlockUniform(name.to_string()))?
            .clone();
        let buffer = block.buffer;

        let uniform_type = field.uniform.glsl_type.uniform_type();
        let ints = uniform_type == Some(UniformType::Int);
        if ints != matches!(value, BlockValue::Ints(_)) {
            return Err(ConfigError::UniformTypeMismatch {
                name: name.to_string(),
                expected: uniform_type.map_or("unknown", |t| t.describe()),
                actual: value.describe(),
            }
            .into());
        }
        let per_element = field.element_scalars();
        let capacity = per_element * field.uniform.count as usize;
        if value.len() > capacity {
            return Err(ConfigError::UniformCapacityExceeded {
                name: name.to_string(),
                capacity,
                provided: value.len(),
            }
            .into());
        }

        let stride = field.element_stride();
        let bytes = self.map_buffer(buffer, field.offset, field.size)?;
        let mut written = 0;
        let mut element = 0u64;
        while written < value.len() {
            let count = per_element.min(value.len() - written);
            let src = value.scalar_bytes(written, count);
            let start = (element * stride) as usize;
            bytes[start..start + src.len()].copy_from_slice(src);
            written += count;
            element += 1;
        }
        Ok(())
    }

    /// Byte offset of a block uniform.
    pub fn block_offset(
        &self,
        handle: ShaderBlockHandle,
        name: &str,
    ) -> Result<u64, ResourceError> {
        let block = self.blocks.get(handle)?;
        let field = block
            .field(name)
            .ok_or_else(|| ConfigError::UnknownBlockUniform(name.to_string()))?;
        Ok(field.offset)
    }

    /// Packed size of a block in bytes.
    pub fn block_size(&self, handle: ShaderBlockHandle) -> Result<u64, ResourceError> {
        Ok(self.blocks.get(handle)?.size)
    }

    /// Drops a reference to a block, destroying it and its buffer when none remain.
    pub fn destroy_shader_block(&mut self, handle: ShaderBlockHandle) -> Result<(), ResourceError> {
        if let Some(block) = self.blocks.release(handle)? {
            self.destroy_buffer(block.buffer)?;
            log::debug!("Destroyed shader block {handle:?}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets(uniforms: &[BlockUniform]) -> Vec<(u64, u64)> {
        pack(uniforms).0.iter().map(|f| (f.offset, f.size)).collect()
    }

    #[test]
    fn test_scalars_and_vectors_take_one_slot() {
        let uniforms = [
            BlockUniform::new("a", GlslType::Float, 1),
            BlockUniform::new("b", GlslType::Vec3, 1),
            BlockUniform::new("c", GlslType::IVec2, 1),
        ];
        assert_eq!(offsets(&uniforms), vec![(0, 16), (16, 16), (32, 16)]);
        assert_eq!(pack(&uniforms).1, 48);
    }

    #[test]
    fn test_arrays_pad_every_element() {
        let uniforms = [
            BlockUniform::new("weights", GlslType::Float, 4),
            BlockUniform::new("tint", GlslType::Vec4, 1),
        ];
        assert_eq!(offsets(&uniforms), vec![(0, 64), (64, 16)]);
    }

    #[test]
    fn test_matrices_use_squared_components() {
        let uniforms = [
            BlockUniform::new("model", GlslType::Mat4, 1),
            BlockUniform::new("normals", GlslType::Mat3, 2),
            BlockUniform::new("uv", GlslType::Mat2, 1),
            BlockUniform::new("tail", GlslType::Float, 1),
        ];
        assert_eq!(
            offsets(&uniforms),
            vec![(0, 64), (64, 72), (136, 16), (152, 16)]
        );
        assert_eq!(pack(&uniforms).1, 168);
    }

    #[test]
    fn test_empty_block_has_zero_size() {
        assert_eq!(pack(&[]), (Vec::new(), 0));
    }

    #[test]
    fn test_zero_count_is_treated_as_one() {
        let uniform = BlockUniform::new("x", GlslType::Vec2, 0);
        assert_eq!(uniform.count, 1);
    }
}
