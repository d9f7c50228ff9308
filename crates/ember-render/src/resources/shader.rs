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

//! Shaders: linked programs with reflected, client-side cached uniforms.

use crate::arena::{ShaderBlockHandle, ShaderHandle, TextureHandle};
use crate::context::GraphicsContext;
use crate::sync::SyncResource;
use ember_core::renderer::api::shader::attributes;
use ember_core::renderer::{
    ConfigError, GlslType, GpuAccess, GpuDevice, ProgramId, ResourceError, ShaderError,
    ShaderStage, UniformLocation, UniformType, UniformUpload,
};
use std::collections::HashMap;

/// The cached value of a uniform.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    /// Float, vector and matrix uniforms.
    Floats(Vec<f32>),
    /// Integer uniforms.
    Ints(Vec<i32>),
    /// Sampler uniforms; `None` samples the default white texture.
    Textures(Vec<Option<TextureHandle>>),
}

/// Values handed to [`GraphicsContext::set_uniform`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformData<'a> {
    /// Values for a float or vector uniform.
    Floats(&'a [f32]),
    /// Values for an integer uniform.
    Ints(&'a [i32]),
    /// Column-major values for a matrix uniform.
    Matrices(&'a [f32]),
    /// Textures for a sampler uniform.
    Textures(&'a [Option<TextureHandle>]),
}

impl UniformData<'_> {
    fn uniform_type(&self) -> UniformType {
        match self {
            UniformData::Floats(_) => UniformType::Float,
            UniformData::Ints(_) => UniformType::Int,
            UniformData::Matrices(_) => UniformType::Matrix,
            UniformData::Textures(_) => UniformType::Sampler,
        }
    }

    fn len(&self) -> usize {
        match self {
            UniformData::Floats(v) | UniformData::Matrices(v) => v.len(),
            UniformData::Ints(v) => v.len(),
            UniformData::Textures(v) => v.len(),
        }
    }
}

/// A reflected uniform of a program.
#[derive(Debug, Clone)]
pub struct Uniform {
    pub(crate) name: String,
    pub(crate) glsl_type: GlslType,
    pub(crate) uniform_type: UniformType,
    pub(crate) components: u8,
    pub(crate) count: u32,
    pub(crate) location: UniformLocation,
    pub(crate) base_slot: u32,
    pub(crate) dirty: bool,
    pub(crate) value: UniformValue,
}

impl Uniform {
    /// The name, without an array subscript.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared GLSL type.
    pub fn glsl_type(&self) -> GlslType {
        self.glsl_type
    }

    /// The value family.
    pub fn uniform_type(&self) -> UniformType {
        self.uniform_type
    }

    /// Components per vector, or rows and columns of a matrix.
    pub fn components(&self) -> u8 {
        self.components
    }

    /// Number of array elements.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// First texture slot of a sampler uniform.
    pub fn base_slot(&self) -> u32 {
        self.base_slot
    }

    /// Returns `true` when the cached value has not been uploaded yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The cached value.
    pub fn value(&self) -> &UniformValue {
        &self.value
    }

    /// Scalars in one element.
    pub fn element_scalars(&self) -> usize {
        let components = usize::from(self.components);
        match self.uniform_type {
            UniformType::Matrix => components * components,
            UniformType::Sampler => 1,
            _ => components,
        }
    }

    /// Maximum number of scalars (or textures) the uniform holds.
    pub fn capacity(&self) -> usize {
        self.element_scalars() * self.count as usize
    }
}

/// A uniform block slot of a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSlot {
    /// The block name.
    pub name: String,
    /// The block index in the program.
    pub index: u32,
    /// The uniform buffer binding point.
    pub binding: u32,
    /// The block currently bound to it.
    pub source: Option<ShaderBlockHandle>,
}

/// A linked program.
#[derive(Debug)]
pub struct Shader {
    pub(crate) program: ProgramId,
    pub(crate) uniforms: Vec<Uniform>,
    pub(crate) lookup: HashMap<String, usize>,
    pub(crate) blocks: Vec<BlockSlot>,
    pub(crate) attributes: HashMap<String, u32>,
}

impl Shader {
    pub(crate) fn new(
        program: ProgramId,
        uniforms: Vec<Uniform>,
        blocks: Vec<BlockSlot>,
        attributes: HashMap<String, u32>,
    ) -> Self {
        let lookup = uniforms
            .iter()
            .enumerate()
            .map(|(i, u)| (u.name.clone(), i))
            .collect();
        Self {
            program,
            uniforms,
            lookup,
            blocks,
            attributes,
        }
    }

    /// The device program.
    pub fn program(&self) -> ProgramId {
        self.program
    }

    /// Looks up a uniform.
    pub fn uniform(&self, name: &str) -> Option<&Uniform> {
        self.lookup.get(name).map(|&i| &self.uniforms[i])
    }

    /// Returns `true` when the program declares an active uniform `name`.
    pub fn has_uniform(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    /// Every active uniform.
    pub fn uniforms(&self) -> &[Uniform] {
        &self.uniforms
    }

    /// Every uniform block slot.
    pub fn blocks(&self) -> &[BlockSlot] {
        &self.blocks
    }

    /// Location of a vertex input.
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }

    /// Updates the cached value of a uniform.
    ///
    /// Unknown names are ignored. When the uniform is clean and the bytes
    /// match the cache, nothing changes; otherwise the value is stored and
    /// the uniform becomes dirty.
    ///
    /// ## Returns
    /// `true` when the cached value changed.
    ///
    /// ## Errors
    /// * `ConfigError::UniformTypeMismatch` - If the value family does not match.
    /// * `ConfigError::UniformCapacityExceeded` - If more values are given than fit.
    pub fn set(&mut self, name: &str, data: UniformData) -> Result<bool, ConfigError> {
        let Some(&index) = self.lookup.get(name) else {
            log::trace!("Ignoring unknown uniform '{name}'");
            return Ok(false);
        };
        let uniform = &mut self.uniforms[index];

        if data.uniform_type() != uniform.uniform_type {
            return Err(ConfigError::UniformTypeMismatch {
                name: uniform.name.clone(),
                expected: uniform.uniform_type.describe(),
                actual: data.uniform_type().describe(),
            });
        }
        let capacity = uniform.capacity();
        if data.len() > capacity {
            return Err(ConfigError::UniformCapacityExceeded {
                name: uniform.name.clone(),
                capacity,
                provided: data.len(),
            });
        }

        let dirty = uniform.dirty;
        let changed = match (&mut uniform.value, data) {
            (UniformValue::Floats(cache), UniformData::Floats(v) | UniformData::Matrices(v)) => {
                store(cache, v, dirty, |a, b| a.to_bits() == b.to_bits())
            }
            (UniformValue::Ints(cache), UniformData::Ints(v)) => {
                store(cache, v, dirty, |a, b| a == b)
            }
            (UniformValue::Textures(cache), UniformData::Textures(v)) => {
                store(cache, v, dirty, |a, b| a == b)
            }
            _ => false,
        };
        if changed {
            uniform.dirty = true;
        }
        Ok(changed)
    }
}

/// Copies `values` over the front of `cache` unless a clean cache already holds them.
fn store<T: Copy>(
    cache: &mut [T],
    values: &[T],
    dirty: bool,
    same: impl Fn(&T, &T) -> bool,
) -> bool {
    let target = &mut cache[..values.len()];
    if !dirty && target.iter().zip(values).all(|(a, b)| same(a, b)) {
        return false;
    }
    target.copy_from_slice(values);
    true
}

/// Strips an array subscript: `lights[0]` becomes `lights`.
fn base_name(name: &str) -> &str {
    name.split('[').next().unwrap_or(name)
}

impl<D: GpuDevice> GraphicsContext<D> {
    /// Compiles and links a program, then reflects its interface.
    ///
    /// Vertex inputs are bound to the built-in attribute locations. Sampler
    /// uniforms receive consecutive texture slots, fixed for the lifetime of
    /// the shader. Uniform block `i` is assigned binding point `i + 1`.
    ///
    /// ## Errors
    /// * `ShaderError::CompilationError` / `ShaderError::LinkError` - With the driver log.
    /// * `ShaderError::UnsupportedUniformType` - For uniforms of unknown types.
    /// * `ConfigError::SlotOutOfRange` - If samplers need more texture slots than configured.
    pub fn create_shader(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ShaderHandle, ResourceError> {
        let vertex = self
            .device
            .compile_shader(ShaderStage::Vertex, vertex_source)
            .inspect_err(|e| log::warn!("{e}"))?;
        let fragment = match self
            .device
            .compile_shader(ShaderStage::Fragment, fragment_source)
        {
            Ok(fragment) => fragment,
            Err(e) => {
                log::warn!("{e}");
                self.device.destroy_shader_module(vertex);
                return Err(e.into());
            }
        };
        let program = self
            .device
            .link_program(vertex, fragment, &attributes::ALL)
            .inspect_err(|e| log::warn!("{e}"))?;

        match self.reflect(program) {
            Ok(shader) => {
                let uniform_count = shader.uniforms.len();
                let block_count = shader.blocks.len();
                let handle = self.shaders.insert(shader);
                log::debug!(
                    "Created shader {handle:?} ({program:?}, {uniform_count} uniform(s), {block_count} block(s))"
                );
                Ok(handle)
            }
            Err(e) => {
                self.state.forget_program(program);
                self.device.destroy_program(program);
                Err(e)
            }
        }
    }

    fn reflect(&mut self, program: ProgramId) -> Result<Shader, ResourceError> {
        self.state.use_program(&mut self.device, Some(program));

        let (_, color) = attributes::VERTEX_COLOR;
        let (_, bones) = attributes::BONES;
        let (_, weights) = attributes::BONE_WEIGHTS;
        self.device.attribute_default(color, [1.0, 1.0, 1.0, 1.0]);
        self.device.attribute_default(bones, [0.0; 4]);
        self.device.attribute_default(weights, [1.0, 0.0, 0.0, 0.0]);

        let max_slots = self.config.max_texture_slots;
        let mut next_slot = 0u32;
        let mut uniforms = Vec::new();
        for active in self.device.active_uniforms(program) {
            let name = base_name(&active.name).to_string();
            let Some(uniform_type) = active.glsl_type.uniform_type() else {
                let err = ShaderError::UnsupportedUniformType { name };
                log::warn!("{err}");
                return Err(err.into());
            };
            let Some(location) = self.device.uniform_location(program, &name) else {
                continue;
            };
            let count = active.array_size.max(1);
            let components = active.glsl_type.components();

            let mut uniform = Uniform {
                name,
                glsl_type: active.glsl_type,
                uniform_type,
                components,
                count,
                location,
                base_slot: 0,
                dirty: false,
                value: UniformValue::Floats(Vec::new()),
            };
            let per_element = uniform.element_scalars();

            uniform.value = match uniform_type {
                UniformType::Sampler => {
                    if next_slot + count > max_slots {
                        return Err(ConfigError::SlotOutOfRange {
                            slot: next_slot + count - 1,
                            max: max_slots,
                        }
                        .into());
                    }
                    uniform.base_slot = next_slot;
                    let slots: Vec<i32> =
                        (next_slot..next_slot + count).map(|s| s as i32).collect();
                    self.device.upload_uniform(
                        location,
                        UniformUpload::Int {
                            components: 1,
                            values: &slots,
                        },
                    );
                    next_slot += count;
                    UniformValue::Textures(vec![None; count as usize])
                }
                UniformType::Int => {
                    let mut values = vec![0; per_element * count as usize];
                    for (j, chunk) in values.chunks_mut(per_element).enumerate() {
                        let element = self.element_location(program, &uniform, j, location);
                        self.device.read_uniform_i32(program, element, chunk);
                    }
                    UniformValue::Ints(values)
                }
                UniformType::Float | UniformType::Matrix => {
                    let mut values = vec![0.0; per_element * count as usize];
                    for (j, chunk) in values.chunks_mut(per_element).enumerate() {
                        let element = self.element_location(program, &uniform, j, location);
                        self.device.read_uniform_f32(program, element, chunk);
                    }
                    UniformValue::Floats(values)
                }
            };
            uniforms.push(uniform);
        }

        let blocks = self
            .device
            .active_uniform_blocks(program)
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let (index, binding) = (i as u32, i as u32 + 1);
                self.device.uniform_block_binding(program, index, binding);
                BlockSlot {
                    name,
                    index,
                    binding,
                    source: None,
                }
            })
            .collect();

        let attributes = self
            .device
            .active_attributes(program)
            .into_iter()
            .map(|a| (a.name, a.location))
            .collect();

        Ok(Shader::new(program, uniforms, blocks, attributes))
    }

    /// Location of element `index` of an array uniform.
    fn element_location(
        &mut self,
        program: ProgramId,
        uniform: &Uniform,
        index: usize,
        base: UniformLocation,
    ) -> UniformLocation {
        if uniform.count <= 1 {
            return base;
        }
        self.device
            .uniform_location(program, &format!("{}[{index}]", uniform.name))
            .unwrap_or(base)
    }

    /// Resolves a shader handle.
    pub fn shader(&self, handle: ShaderHandle) -> Result<&Shader, ResourceError> {
        self.shaders.get(handle)
    }

    /// Sets the cached value of a uniform; see [`Shader::set`].
    ///
    /// The value reaches the device on the next draw with the shader. A
    /// sampler uniform keeps a reference to each texture it holds, so a
    /// texture destroyed by its owner stays alive until the shader lets go.
    pub fn set_uniform(
        &mut self,
        handle: ShaderHandle,
        name: &str,
        data: UniformData,
    ) -> Result<(), ResourceError> {
        let UniformData::Textures(textures) = data else {
            self.shaders.get_mut(handle)?.set(name, data)?;
            return Ok(());
        };

        let shader = self.shaders.get(handle)?;
        let previous: Vec<TextureHandle> = match shader.uniform(name).map(Uniform::value) {
            Some(UniformValue::Textures(cache)) => cache
                .iter()
                .take(textures.len())
                .flatten()
                .copied()
                .collect(),
            _ => Vec::new(),
        };

        let mut retained = Vec::with_capacity(textures.len());
        for &texture in textures.iter().flatten() {
            if let Err(e) = self.textures.retain(texture) {
                self.release_textures(&retained)?;
                return Err(e);
            }
            retained.push(texture);
        }

        match self.shaders.get_mut(handle)?.set(name, data) {
            Ok(true) => self.release_textures(&previous),
            Ok(false) => self.release_textures(&retained),
            Err(e) => {
                self.release_textures(&retained)?;
                Err(e.into())
            }
        }
    }

    fn release_textures(&mut self, textures: &[TextureHandle]) -> Result<(), ResourceError> {
        for &texture in textures {
            self.destroy_texture(texture)?;
        }
        Ok(())
    }

    /// Binds a block to a uniform block of a shader, or unbinds it with `None`.
    ///
    /// The shader keeps a reference to the bound block.
    ///
    /// ## Errors
    /// * `ConfigError::UnknownBlock` - If the program declares no block `name`.
    pub fn bind_block(
        &mut self,
        handle: ShaderHandle,
        name: &str,
        block: Option<ShaderBlockHandle>,
    ) -> Result<(), ResourceError> {
        let shader = self.shaders.get(handle)?;
        let index = shader
            .blocks
            .iter()
            .position(|b| b.name == name)
            .ok_or_else(|| ConfigError::UnknownBlock(name.to_string()))?;
        let previous = shader.blocks[index].source;
        if previous == block {
            return Ok(());
        }
        if let Some(block) = block {
            self.blocks.retain(block)?;
        }
        self.shaders.get_mut(handle)?.blocks[index].source = block;
        if let Some(previous) = previous {
            self.destroy_shader_block(previous)?;
        }
        Ok(())
    }

    /// Drops a reference to a shader, destroying it when none remain.
    pub fn destroy_shader(&mut self, handle: ShaderHandle) -> Result<(), ResourceError> {
        let Some(shader) = self.shaders.release(handle)? else {
            return Ok(());
        };
        self.state.forget_program(shader.program);
        self.device.destroy_program(shader.program);
        for block in shader.blocks.iter().filter_map(|b| b.source) {
            self.destroy_shader_block(block)?;
        }
        for uniform in &shader.uniforms {
            if let UniformValue::Textures(textures) = &uniform.value {
                for &texture in textures.iter().flatten() {
                    self.destroy_texture(texture)?;
                }
            }
        }
        log::debug!("Destroyed shader {handle:?}");
        Ok(())
    }

    /// Makes a shader current and uploads its pending state.
    ///
    /// Dirty uniforms are uploaded and marked clean. Every sampler slot is
    /// rebound, since other shaders share the texture slots. Every block
    /// buffer is flushed and bound to its binding point.
    pub(crate) fn flush_shader(&mut self, handle: ShaderHandle) -> Result<(), ResourceError> {
        let shader = self.shaders.get_mut(handle)?;
        let program = shader.program;
        self.state.use_program(&mut self.device, Some(program));

        let mut samplers = Vec::new();
        for uniform in &mut shader.uniforms {
            if let UniformValue::Textures(textures) = &uniform.value {
                for (i, texture) in textures.iter().enumerate() {
                    samplers.push((uniform.base_slot + i as u32, *texture));
                }
                uniform.dirty = false;
                continue;
            }
            if !uniform.dirty {
                continue;
            }
            uniform.dirty = false;
            let upload = match (&uniform.value, uniform.uniform_type) {
                (UniformValue::Floats(values), UniformType::Matrix) => UniformUpload::Matrix {
                    dimension: uniform.components,
                    values,
                },
                (UniformValue::Floats(values), _) => UniformUpload::Float {
                    components: uniform.components,
                    values,
                },
                (UniformValue::Ints(values), _) => UniformUpload::Int {
                    components: uniform.components,
                    values,
                },
                (UniformValue::Textures(_), _) => continue,
            };
            self.device.upload_uniform(uniform.location, upload);
        }
        let blocks: Vec<(u32, Option<ShaderBlockHandle>)> =
            shader.blocks.iter().map(|b| (b.binding, b.source)).collect();

        for (slot, texture) in samplers {
            let texture = texture.filter(|t| self.textures.contains(*t));
            if let Some(texture) = texture {
                self.track(SyncResource::Texture(texture), GpuAccess::SAMPLED_READ);
            }
            self.bind_texture_slot(slot, texture)?;
        }

        for (binding, block) in blocks {
            let buffer = match block {
                Some(block) => {
                    let buffer = self.blocks.get(block)?.buffer;
                    self.unmap_buffer(buffer)?;
                    self.track(SyncResource::Buffer(buffer), GpuAccess::UNIFORM_READ);
                    Some(self.buffers.get(buffer)?.id)
                }
                None => None,
            };
            self.state
                .bind_uniform_buffer(&mut self.device, binding, buffer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(name: &str, glsl_type: GlslType, count: u32, value: UniformValue) -> Uniform {
        Uniform {
            name: name.to_string(),
            glsl_type,
            uniform_type: glsl_type.uniform_type().unwrap(),
            components: glsl_type.components(),
            count,
            location: UniformLocation(0),
            base_slot: 0,
            dirty: false,
            value,
        }
    }

    fn shader() -> Shader {
        Shader::new(
            ProgramId(1),
            vec![
                uniform("x", GlslType::Float, 1, UniformValue::Floats(vec![0.0])),
                uniform("tint", GlslType::Vec4, 2, UniformValue::Floats(vec![0.0; 8])),
                uniform("model", GlslType::Mat4, 1, UniformValue::Floats(vec![0.0; 16])),
                uniform("mode", GlslType::Int, 1, UniformValue::Ints(vec![0])),
                uniform("image", GlslType::Sampler2D, 1, UniformValue::Textures(vec![None])),
            ],
            Vec::new(),
            HashMap::new(),
        )
    }

    #[test]
    fn test_set_then_get() {
        let mut shader = shader();
        let tint = [1.0, 0.5, 0.25, 1.0, 0.0, 0.0, 0.0, 1.0];
        assert_eq!(shader.set("tint", UniformData::Floats(&tint)), Ok(true));
        let uniform = shader.uniform("tint").unwrap();
        assert_eq!(uniform.value(), &UniformValue::Floats(tint.to_vec()));
        assert!(uniform.is_dirty());
    }

    #[test]
    fn test_identical_set_on_clean_uniform_is_skipped() {
        let mut shader = shader();
        assert_eq!(shader.set("x", UniformData::Floats(&[0.0])), Ok(false));
        assert!(!shader.uniform("x").unwrap().is_dirty());
    }

    #[test]
    fn test_bitwise_comparison_distinguishes_negative_zero() {
        let mut shader = shader();
        assert_eq!(shader.set("x", UniformData::Floats(&[-0.0])), Ok(true));
    }

    #[test]
    fn test_over_capacity_fails_without_mutation() {
        let mut shader = shader();
        let err = shader.set("x", UniformData::Floats(&[1.0, 2.0])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UniformCapacityExceeded {
                name: "x".to_string(),
                capacity: 1,
                provided: 2,
            }
        );
        let uniform = shader.uniform("x").unwrap();
        assert_eq!(uniform.value(), &UniformValue::Floats(vec![0.0]));
        assert!(!uniform.is_dirty());
    }

    #[test]
    fn test_type_mismatch() {
        let mut shader = shader();
        assert!(matches!(
            shader.set("mode", UniformData::Floats(&[1.0])),
            Err(ConfigError::UniformTypeMismatch { expected: "int", .. })
        ));
        assert!(matches!(
            shader.set("model", UniformData::Floats(&[1.0; 16])),
            Err(ConfigError::UniformTypeMismatch { expected: "matrix", .. })
        ));
        assert!(shader.set("model", UniformData::Matrices(&[1.0; 16])).is_ok());
    }

    #[test]
    fn test_unknown_uniform_is_ignored() {
        let mut shader = shader();
        assert_eq!(shader.set("missing", UniformData::Ints(&[3])), Ok(false));
    }

    #[test]
    fn test_partial_set_updates_prefix() {
        let mut shader = shader();
        shader.set("tint", UniformData::Floats(&[1.0, 1.0])).unwrap();
        let UniformValue::Floats(values) = shader.uniform("tint").unwrap().value() else {
            panic!("float uniform");
        };
        assert_eq!(&values[..3], &[1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("emberViews[0]"), "emberViews");
        assert_eq!(base_name("emberModel"), "emberModel");
    }
}
