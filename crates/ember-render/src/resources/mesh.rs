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

//! Meshes: vertex storage, indices and per-attribute stream sources.

use super::{next_po2, DirtyRange};
use crate::arena::{MeshHandle, ShaderHandle, TextureHandle};
use crate::context::GraphicsContext;
use crate::draw::{DrawCommand, Material};
use ember_core::math::Mat4;
use ember_core::renderer::{
    AttributePointer, BufferId, BufferTarget, BufferUsageHint, ConfigError, DrawMode, GpuDevice,
    IndexFormat, MeshUsage, ResourceError, VertexArrayId, VertexFormat,
};
use std::collections::HashMap;

/// Number of attribute slots a vertex array exposes.
pub const MAX_ATTRIBUTES: usize = 16;

/// Index data handed to [`GraphicsContext::set_indices`].
#[derive(Debug, Clone, Copy)]
pub enum IndexData<'a> {
    /// 16-bit indices.
    U16(&'a [u16]),
    /// 32-bit indices.
    U32(&'a [u32]),
}

impl<'a> IndexData<'a> {
    fn format(&self) -> IndexFormat {
        match self {
            IndexData::U16(_) => IndexFormat::Uint16,
            IndexData::U32(_) => IndexFormat::Uint32,
        }
    }

    fn len(&self) -> usize {
        match *self {
            IndexData::U16(d) => d.len(),
            IndexData::U32(d) => d.len(),
        }
    }

    fn bytes(&self) -> &'a [u8] {
        match *self {
            IndexData::U16(d) => bytemuck::cast_slice(d),
            IndexData::U32(d) => bytemuck::cast_slice(d),
        }
    }
}

/// Where a mesh attribute reads its data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshAttachment {
    /// The mesh providing the data; `None` for the mesh's own storage.
    pub source: Option<MeshHandle>,
    /// Index of the attribute in the source's vertex format.
    pub attribute_index: usize,
    /// Instancing divisor; 0 advances per vertex.
    pub divisor: u32,
    /// Disabled attributes read the slot's default value.
    pub enabled: bool,
}

/// The effective state of one vertex array slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlotBinding {
    pub(crate) buffer: BufferId,
    pub(crate) pointer: AttributePointer,
    pub(crate) divisor: u32,
    pub(crate) enabled: bool,
}

/// A drawable mesh.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vao: VertexArrayId,
    pub(crate) vbo: BufferId,
    pub(crate) ibo: BufferId,
    pub(crate) format: VertexFormat,
    pub(crate) usage: MeshUsage,
    pub(crate) mode: DrawMode,
    pub(crate) vertex_count: u32,
    pub(crate) vertices: Vec<u8>,
    pub(crate) dirty: DirtyRange,
    pub(crate) index_format: IndexFormat,
    pub(crate) index_count: u32,
    pub(crate) indices: Vec<u8>,
    pub(crate) indices_dirty: bool,
    pub(crate) range: Option<(u32, u32)>,
    pub(crate) attachments: Vec<(String, MeshAttachment)>,
    /// Number of meshes sourcing an attribute from this one.
    pub(crate) attached_by: u32,
    pub(crate) layout: [Option<SlotBinding>; MAX_ATTRIBUTES],
    pub(crate) pose: Vec<Mat4>,
    pub(crate) material: Option<Material>,
}

impl Mesh {
    /// Number of vertices the store holds.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// The vertex format.
    pub fn format(&self) -> &VertexFormat {
        &self.format
    }

    /// The CPU mirror of the vertex store.
    pub fn vertices(&self) -> &[u8] {
        &self.vertices
    }

    /// The primitive type.
    pub fn draw_mode(&self) -> DrawMode {
        self.mode
    }

    /// The storage usage.
    pub fn usage(&self) -> MeshUsage {
        self.usage
    }

    /// Number of indices; 0 when the mesh draws without indices.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Format of the index data.
    pub fn index_format(&self) -> IndexFormat {
        self.index_format
    }

    /// Returns `true` when draws use the index buffer.
    pub fn is_indexed(&self) -> bool {
        self.index_count > 0
    }

    /// The `(start, count)` draw range, or `None` to draw everything.
    pub fn draw_range(&self) -> Option<(u32, u32)> {
        self.range
    }

    /// The bone matrices uploaded as the skinning pose.
    pub fn pose(&self) -> &[Mat4] {
        &self.pose
    }

    /// The material drawn with the mesh when a draw names none.
    pub fn material(&self) -> Option<&Material> {
        self.material.as_ref()
    }

    /// Looks up where an attribute reads from.
    pub fn attachment(&self, name: &str) -> Option<&MeshAttachment> {
        self.attachments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
    }

    /// Names of every attribute, own and attached.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attachments.iter().map(|(n, _)| n.as_str())
    }

    /// Returns `true` while another mesh sources an attribute from this one.
    pub fn is_attachment_source(&self) -> bool {
        self.attached_by > 0
    }

    /// Number of elements a full draw covers.
    pub(crate) fn element_limit(&self) -> u32 {
        if self.is_indexed() {
            self.index_count
        } else {
            self.vertex_count
        }
    }

    fn stride(&self) -> u64 {
        u64::from(self.format.stride)
    }

    /// The slot binding for an attribute of this mesh's own format.
    fn own_binding(&self, attachment: &MeshAttachment) -> Option<SlotBinding> {
        let attribute = self.format.attributes.get(attachment.attribute_index)?;
        Some(SlotBinding {
            buffer: self.vbo,
            pointer: AttributePointer {
                components: attribute.components,
                attribute_type: attribute.attribute_type,
                stride: self.format.stride,
                offset: attribute.offset,
            },
            divisor: attachment.divisor,
            enabled: attachment.enabled,
        })
    }
}

fn usage_hint(usage: MeshUsage) -> BufferUsageHint {
    match usage {
        MeshUsage::Static => BufferUsageHint::Static,
        MeshUsage::Dynamic => BufferUsageHint::Dynamic,
        MeshUsage::Stream => BufferUsageHint::Stream,
    }
}

impl<D: GpuDevice> GraphicsContext<D> {
    /// Creates a mesh with zeroed vertex storage.
    ///
    /// Every attribute of `format` starts sourced from the mesh itself.
    ///
    /// ## Errors
    /// * `ConfigError` - If the format is invalid or `vertex_count` is zero.
    pub fn create_mesh(
        &mut self,
        vertex_count: u32,
        format: VertexFormat,
        mode: DrawMode,
        usage: MeshUsage,
    ) -> Result<MeshHandle, ResourceError> {
        format.validate()?;
        if vertex_count == 0 {
            return Err(ConfigError::InvalidUsage("mesh has no vertices".to_string()).into());
        }

        let vao = self.device.create_vertex_array()?;
        let vbo = match self.device.create_buffer() {
            Ok(id) => id,
            Err(e) => {
                self.device.destroy_vertex_array(vao);
                return Err(e);
            }
        };
        let ibo = match self.device.create_buffer() {
            Ok(id) => id,
            Err(e) => {
                self.device.destroy_vertex_array(vao);
                self.device.destroy_buffer(vbo);
                return Err(e);
            }
        };

        let size = u64::from(vertex_count) * u64::from(format.stride);
        self.state.bind_vertex_array(&mut self.device, Some(vao));
        self.state.bind_vertex_buffer(&mut self.device, Some(vbo));
        if let Err(e) = self
            .device
            .buffer_data(BufferTarget::Array, size, None, usage_hint(usage))
        {
            self.state.forget_vertex_array(vao);
            self.state.forget_buffer(vbo);
            self.device.destroy_vertex_array(vao);
            self.device.destroy_buffer(vbo);
            self.device.destroy_buffer(ibo);
            return Err(e);
        }

        let attachments = format
            .attributes
            .iter()
            .enumerate()
            .map(|(i, attribute)| {
                (
                    attribute.name.clone(),
                    MeshAttachment {
                        source: None,
                        attribute_index: i,
                        divisor: 0,
                        enabled: true,
                    },
                )
            })
            .collect();

        let handle = self.meshes.insert(Mesh {
            vao,
            vbo,
            ibo,
            format,
            usage,
            mode,
            vertex_count,
            vertices: vec![0; size as usize],
            dirty: DirtyRange::default(),
            index_format: IndexFormat::Uint16,
            index_count: 0,
            indices: Vec::new(),
            indices_dirty: false,
            range: None,
            attachments,
            attached_by: 0,
            layout: [None; MAX_ATTRIBUTES],
            pose: Vec::new(),
            material: None,
        });
        log::debug!("Created mesh {handle:?} ({vertex_count} vertices, {size} bytes)");
        Ok(handle)
    }

    /// Resolves a mesh handle.
    pub fn mesh(&self, handle: MeshHandle) -> Result<&Mesh, ResourceError> {
        self.meshes.get(handle)
    }

    /// Maps `count` vertices starting at `start` for writing.
    ///
    /// The range is uploaded on the next bind.
    pub fn map_vertices(
        &mut self,
        handle: MeshHandle,
        start: u32,
        count: u32,
    ) -> Result<&mut [u8], ResourceError> {
        let mesh = self.meshes.get_mut(handle)?;
        let end = u64::from(start) + u64::from(count);
        if end > u64::from(mesh.vertex_count) {
            return Err(ConfigError::RangeOutOfBounds {
                offset: u64::from(start) * mesh.stride(),
                size: u64::from(count) * mesh.stride(),
                limit: mesh.vertices.len() as u64,
            }
            .into());
        }
        mesh.dirty.include(u64::from(start), end);
        let stride = mesh.stride() as usize;
        Ok(&mut mesh.vertices[start as usize * stride..end as usize * stride])
    }

    /// Grows the vertex store to hold at least `count` vertices.
    ///
    /// Shrinking is a no-op. Growth rounds up to the next power of two and
    /// keeps the existing vertex bytes.
    pub fn resize_mesh(&mut self, handle: MeshHandle, count: u32) -> Result<(), ResourceError> {
        let mesh = self.meshes.get_mut(handle)?;
        if count <= mesh.vertex_count {
            return Ok(());
        }
        let capacity = next_po2(u64::from(count));
        let size = capacity * mesh.stride();
        mesh.vertices.resize(size as usize, 0);
        mesh.vertex_count = capacity as u32;
        let (vao, vbo, hint) = (mesh.vao, mesh.vbo, usage_hint(mesh.usage));

        self.state.bind_vertex_array(&mut self.device, Some(vao));
        self.state.bind_vertex_buffer(&mut self.device, Some(vbo));
        let mesh = self.meshes.get_mut(handle)?;
        self.device
            .buffer_data(BufferTarget::Array, size, Some(&mesh.vertices), hint)?;
        mesh.dirty = DirtyRange::default();
        log::debug!("Resized mesh {handle:?} to {capacity} vertices");
        Ok(())
    }

    /// Replaces the index data. An empty slice turns indexing off.
    ///
    /// The index store grows to the next power of two in bytes; the data is
    /// uploaded on the next bind. A draw range that no longer fits is reset.
    pub fn set_indices(
        &mut self,
        handle: MeshHandle,
        data: IndexData,
    ) -> Result<(), ResourceError> {
        let mesh = self.meshes.get_mut(handle)?;
        let bytes = data.bytes();
        let size = bytes.len() as u64;
        let grow = size > mesh.indices.len() as u64;
        let (vao, ibo, hint) = (mesh.vao, mesh.ibo, usage_hint(mesh.usage));

        if grow {
            let capacity = next_po2(size);
            self.state.bind_vertex_array(&mut self.device, Some(vao));
            self.state.bind_index_buffer(&mut self.device, Some(ibo));
            self.device
                .buffer_data(BufferTarget::ElementArray, capacity, None, hint)?;
        }

        let mesh = self.meshes.get_mut(handle)?;
        if grow {
            mesh.indices.resize(next_po2(size) as usize, 0);
        }
        mesh.indices[..bytes.len()].copy_from_slice(bytes);
        mesh.index_format = data.format();
        mesh.index_count = data.len() as u32;
        mesh.indices_dirty = mesh.index_count > 0;
        if let Some((start, count)) = mesh.range {
            if start + count > mesh.element_limit() {
                mesh.range = None;
            }
        }
        Ok(())
    }

    /// Restricts draws to `count` elements starting at `start`.
    ///
    /// Elements are indices for indexed meshes and vertices otherwise. A
    /// `count` of 0 draws everything.
    ///
    /// ## Errors
    /// * `ConfigError::DrawRangeOutOfBounds` - If the range reaches past the last element.
    pub fn set_draw_range(
        &mut self,
        handle: MeshHandle,
        start: u32,
        count: u32,
    ) -> Result<(), ResourceError> {
        let mesh = self.meshes.get_mut(handle)?;
        if count == 0 {
            mesh.range = None;
            return Ok(());
        }
        let limit = mesh.element_limit();
        if u64::from(start) + u64::from(count) > u64::from(limit) {
            return Err(ConfigError::DrawRangeOutOfBounds {
                start,
                count,
                limit,
            }
            .into());
        }
        mesh.range = Some((start, count));
        Ok(())
    }

    /// Changes the primitive type.
    pub fn set_draw_mode(
        &mut self,
        handle: MeshHandle,
        mode: DrawMode,
    ) -> Result<(), ResourceError> {
        self.meshes.get_mut(handle)?.mode = mode;
        Ok(())
    }

    /// Sets the bone matrices uploaded as `emberPose`.
    pub fn set_pose(&mut self, handle: MeshHandle, pose: Vec<Mat4>) -> Result<(), ResourceError> {
        self.meshes.get_mut(handle)?.pose = pose;
        Ok(())
    }

    /// Gives a mesh its own material, or removes it with `None`.
    ///
    /// The mesh keeps a reference to every texture of its material until the
    /// material is replaced or the mesh is destroyed.
    pub fn set_mesh_material(
        &mut self,
        handle: MeshHandle,
        material: Option<Material>,
    ) -> Result<(), ResourceError> {
        self.meshes.get(handle)?;
        let incoming: Vec<TextureHandle> = material.iter().flat_map(Material::textures).collect();
        for (i, &texture) in incoming.iter().enumerate() {
            if let Err(e) = self.textures.retain(texture) {
                for &retained in &incoming[..i] {
                    self.destroy_texture(retained)?;
                }
                return Err(e);
            }
        }
        let previous = std::mem::replace(&mut self.meshes.get_mut(handle)?.material, material);
        for texture in previous.iter().flat_map(Material::textures) {
            self.destroy_texture(texture)?;
        }
        Ok(())
    }

    /// A draw of `handle` with `shader`, carrying the mesh's own material
    /// when it has one.
    pub fn mesh_command(
        &self,
        handle: MeshHandle,
        shader: ShaderHandle,
    ) -> Result<DrawCommand, ResourceError> {
        let mut command = DrawCommand::new(handle, shader);
        if let Some(material) = &self.meshes.get(handle)?.material {
            command.material = *material;
        }
        Ok(command)
    }

    /// Enables or disables an attribute; disabled attributes read their default value.
    pub fn set_attribute_enabled(
        &mut self,
        handle: MeshHandle,
        name: &str,
        enabled: bool,
    ) -> Result<(), ResourceError> {
        let mesh = self.meshes.get_mut(handle)?;
        let (_, attachment) = mesh
            .attachments
            .iter_mut()
            .find(|(n, _)| n == name)
            .ok_or_else(|| ConfigError::AttributeNotFound(name.to_string()))?;
        attachment.enabled = enabled;
        Ok(())
    }

    /// Sources the attribute `name` of `mesh` from `source`'s vertex data.
    ///
    /// `source` stays alive until the attribute is detached or `mesh` is destroyed.
    ///
    /// ## Errors
    /// * `ConfigError::AttachmentCycle` - If `source` is `mesh`.
    /// * `ConfigError::AttachToAttachment` - If `mesh` is itself an attachment source.
    /// * `ConfigError::AttributeNotFound` - If `source` has no attribute `name`.
    /// * `ConfigError::DuplicateAttribute` - If `mesh` already has an attribute `name`.
    pub fn attach_attribute(
        &mut self,
        mesh: MeshHandle,
        source: MeshHandle,
        name: &str,
        divisor: u32,
    ) -> Result<(), ResourceError> {
        if mesh == source {
            return Err(ConfigError::AttachmentCycle(name.to_string()).into());
        }
        let target = self.meshes.get(mesh)?;
        if target.attached_by > 0 {
            return Err(ConfigError::AttachToAttachment.into());
        }
        if target.attachment(name).is_some() {
            return Err(ConfigError::DuplicateAttribute(name.to_string()).into());
        }
        let attribute_index = self
            .meshes
            .get(source)?
            .format
            .find(name)
            .ok_or_else(|| ConfigError::AttributeNotFound(name.to_string()))?;

        self.meshes.retain(source)?;
        self.meshes.get_mut(source)?.attached_by += 1;
        self.meshes.get_mut(mesh)?.attachments.push((
            name.to_string(),
            MeshAttachment {
                source: Some(source),
                attribute_index,
                divisor,
                enabled: true,
            },
        ));
        log::debug!("Attached '{name}' of {source:?} to {mesh:?} (divisor {divisor})");
        Ok(())
    }

    /// Removes an attached attribute and releases its source.
    ///
    /// ## Errors
    /// * `ConfigError::AttributeNotFound` - If `mesh` has no attribute `name`.
    /// * `ConfigError::DetachOwnAttribute` - If the attribute is the mesh's own.
    pub fn detach_attribute(&mut self, mesh: MeshHandle, name: &str) -> Result<(), ResourceError> {
        let target = self.meshes.get_mut(mesh)?;
        let index = target
            .attachments
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| ConfigError::AttributeNotFound(name.to_string()))?;
        let Some(source) = target.attachments[index].1.source else {
            return Err(ConfigError::DetachOwnAttribute(name.to_string()).into());
        };
        target.attachments.remove(index);
        self.release_attachment_source(source)
    }

    fn release_attachment_source(&mut self, source: MeshHandle) -> Result<(), ResourceError> {
        if let Ok(mesh) = self.meshes.get_mut(source) {
            mesh.attached_by = mesh.attached_by.saturating_sub(1);
        }
        self.destroy_mesh(source)
    }

    /// Drops a reference to a mesh, destroying it when none remain.
    ///
    /// Destroying a mesh releases every mesh it sources attributes from.
    pub fn destroy_mesh(&mut self, handle: MeshHandle) -> Result<(), ResourceError> {
        let Some(mesh) = self.meshes.release(handle)? else {
            return Ok(());
        };
        self.state.forget_vertex_array(mesh.vao);
        self.state.forget_buffer(mesh.vbo);
        self.state.forget_buffer(mesh.ibo);
        self.device.destroy_vertex_array(mesh.vao);
        self.device.destroy_buffer(mesh.vbo);
        self.device.destroy_buffer(mesh.ibo);
        log::debug!("Destroyed mesh {handle:?}");

        for source in mesh.attachments.iter().filter_map(|(_, a)| a.source) {
            self.release_attachment_source(source)?;
        }
        for texture in mesh.material.iter().flat_map(Material::textures) {
            self.destroy_texture(texture)?;
        }
        Ok(())
    }

    /// Uploads pending vertex writes of a mesh.
    fn flush_vertices(&mut self, handle: MeshHandle) -> Result<(), ResourceError> {
        let mesh = self.meshes.get_mut(handle)?;
        let Some(range) = mesh.dirty.take() else {
            return Ok(());
        };
        self.state.bind_vertex_buffer(&mut self.device, Some(mesh.vbo));
        if mesh.usage == MeshUsage::Stream {
            self.device.buffer_data(
                BufferTarget::Array,
                mesh.vertices.len() as u64,
                Some(&mesh.vertices),
                BufferUsageHint::Stream,
            )?;
        } else {
            let stride = mesh.stride();
            let (start, end) = (range.start * stride, range.end * stride);
            self.device.buffer_sub_data(
                BufferTarget::Array,
                start,
                &mesh.vertices[start as usize..end as usize],
            );
        }
        Ok(())
    }

    /// Binds a mesh for drawing with a program whose inputs are at `locations`.
    ///
    /// Pending vertex and index data is uploaded first, including that of
    /// attachment sources. Only slots whose source, pointer, divisor or
    /// enabled flag changed since the previous bind reach the device.
    pub(crate) fn bind_mesh(
        &mut self,
        handle: MeshHandle,
        locations: &HashMap<String, u32>,
    ) -> Result<(), ResourceError> {
        let mesh = self.meshes.get(handle)?;
        let vao = mesh.vao;
        let wanted: Vec<(usize, MeshAttachment)> = mesh
            .attachments
            .iter()
            .filter_map(|(name, attachment)| {
                let location = *locations.get(name)? as usize;
                (location < MAX_ATTRIBUTES).then_some((location, *attachment))
            })
            .collect();

        self.state.bind_vertex_array(&mut self.device, Some(vao));
        self.flush_vertices(handle)?;

        let mesh = self.meshes.get_mut(handle)?;
        if mesh.is_indexed() {
            self.state.bind_index_buffer(&mut self.device, Some(mesh.ibo));
            if mesh.indices_dirty {
                let size = (mesh.index_count * mesh.index_format.size()) as usize;
                self.device
                    .buffer_sub_data(BufferTarget::ElementArray, 0, &mesh.indices[..size]);
                mesh.indices_dirty = false;
            }
        }

        let mut layout: [Option<SlotBinding>; MAX_ATTRIBUTES] = [None; MAX_ATTRIBUTES];
        for (location, attachment) in wanted {
            let binding = match attachment.source {
                None => self.meshes.get(handle)?.own_binding(&attachment),
                Some(source) => {
                    self.flush_vertices(source)?;
                    self.meshes.get(source)?.own_binding(&attachment)
                }
            };
            layout[location] = binding;
        }

        // The stored layout mirrors what the device holds: a disabled slot
        // keeps the pointer and divisor it last received.
        let previous = self.meshes.get(handle)?.layout;
        let mut applied = previous;
        for (location, (old, new)) in previous.iter().zip(layout.iter()).enumerate() {
            let location_u32 = location as u32;
            let was_enabled = old.is_some_and(|b| b.enabled);
            let is_enabled = new.is_some_and(|b| b.enabled);
            if was_enabled != is_enabled {
                self.device.set_attribute_enabled(location_u32, is_enabled);
            }
            let Some(new) = new.filter(|b| b.enabled) else {
                if let Some(slot) = applied[location].as_mut() {
                    slot.enabled = false;
                }
                continue;
            };
            let old_divisor = old.map_or(0, |b| b.divisor);
            if old_divisor != new.divisor {
                self.device.attribute_divisor(location_u32, new.divisor);
            }
            let same_source =
                old.is_some_and(|b| b.buffer == new.buffer && b.pointer == new.pointer);
            if !same_source {
                self.state.bind_vertex_buffer(&mut self.device, Some(new.buffer));
                self.device.attribute_pointer(location_u32, new.pointer);
            }
            applied[location] = Some(new);
        }
        self.meshes.get_mut(handle)?.layout = applied;
        Ok(())
    }
}
