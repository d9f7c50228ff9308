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

//! [`HeadlessDevice`]: a [`GpuDevice`] that records instead of rendering.
//!
//! It keeps just enough simulated state (texture sizes, framebuffer
//! attachments, clear colors, program reflection and uniform storage) for the
//! render core to run its full validation and caching logic without a GPU.

use super::journal::{DeviceCall, Journal};
use super::reflection::{self, DeclaredInterface};
use ember_core::math::Extent3D;
use ember_core::renderer::*;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct FramebufferState {
    attachments: HashMap<Attachment, (u32, u32)>,
    clear: [f32; 4],
}

#[derive(Debug, Clone, Copy)]
struct LocationInfo {
    index: u32,
    array_size: u32,
}

#[derive(Debug, Default)]
struct ProgramState {
    uniforms: Vec<ActiveUniform>,
    blocks: Vec<String>,
    attributes: Vec<ActiveAttribute>,
    locations: HashMap<String, UniformLocation>,
}

/// A recording device with simulated state.
#[derive(Debug)]
pub struct HeadlessDevice {
    journal: Journal,
    features: DeviceFeatures,
    limits: GraphicsLimits,
    fail_allocations: bool,
    next_id: u32,
    next_location: u32,
    active_slot: u32,
    bound_textures: HashMap<u32, TextureId>,
    texture_sizes: HashMap<TextureId, Extent3D>,
    renderbuffer_sizes: HashMap<RenderbufferId, (u32, u32)>,
    framebuffers: HashMap<FramebufferId, FramebufferState>,
    default_clear: [f32; 4],
    draw_framebuffer: Option<FramebufferId>,
    read_framebuffer: Option<FramebufferId>,
    modules: HashMap<ShaderModuleId, DeclaredInterface>,
    programs: HashMap<ProgramId, ProgramState>,
    current_program: Option<ProgramId>,
    location_info: HashMap<UniformLocation, LocationInfo>,
    float_values: HashMap<UniformLocation, Vec<f32>>,
    int_values: HashMap<UniformLocation, Vec<i32>>,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    /// Creates a device reporting every feature except single-pass stereo.
    pub fn new() -> Self {
        Self::with_features(DeviceFeatures {
            single_pass_stereo: false,
            compressed_textures: true,
            anisotropic_filtering: true,
            memory_barriers: true,
        })
    }

    /// Creates a device reporting the given features.
    pub fn with_features(features: DeviceFeatures) -> Self {
        Self {
            journal: Journal::default(),
            features,
            limits: GraphicsLimits {
                point_sizes: [1.0, 64.0],
                texture_size: 4096,
                texture_msaa: 8,
                texture_anisotropy: 16.0,
            },
            fail_allocations: false,
            next_id: 1,
            next_location: 0,
            active_slot: 0,
            bound_textures: HashMap::new(),
            texture_sizes: HashMap::new(),
            renderbuffer_sizes: HashMap::new(),
            framebuffers: HashMap::new(),
            default_clear: [0.0; 4],
            draw_framebuffer: None,
            read_framebuffer: None,
            modules: HashMap::new(),
            programs: HashMap::new(),
            current_program: None,
            location_info: HashMap::new(),
            float_values: HashMap::new(),
            int_values: HashMap::new(),
        }
    }

    /// A shared handle to the recorded calls.
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Makes every following allocation fail with `OutOfMemory`.
    pub fn set_fail_allocations(&mut self, fail: bool) {
        self.fail_allocations = fail;
    }

    /// The size recorded for a texture by its storage allocation.
    pub fn texture_size(&self, id: TextureId) -> Option<Extent3D> {
        self.texture_sizes.get(&id).copied()
    }

    /// Number of live framebuffer objects.
    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    fn allocate(&mut self, what: &str) -> Result<u32, ResourceError> {
        if self.fail_allocations {
            return Err(ResourceError::OutOfMemory(format!(
                "headless device refused to allocate a {what}"
            )));
        }
        let id = self.next_id;
        self.next_id += 1;
        Ok(id)
    }

    fn draw_clear_mut(&mut self) -> &mut [f32; 4] {
        match self.draw_framebuffer.and_then(|id| self.framebuffers.get_mut(&id)) {
            Some(fb) => &mut fb.clear,
            None => &mut self.default_clear,
        }
    }

    fn read_clear(&self) -> [f32; 4] {
        self.read_framebuffer
            .and_then(|id| self.framebuffers.get(&id))
            .map_or(self.default_clear, |fb| fb.clear)
    }

    fn attach(&mut self, attachment: Attachment, size: Option<(u32, u32)>) {
        let Some(fb) = self
            .draw_framebuffer
            .and_then(|id| self.framebuffers.get_mut(&id))
        else {
            log::warn!("Headless: attachment issued with no framebuffer bound");
            return;
        };
        match size {
            Some(size) => {
                fb.attachments.insert(attachment, size);
            }
            None => {
                fb.attachments.remove(&attachment);
            }
        }
    }

    /// Splits `values` into per-element chunks and stores them starting at `location`.
    fn store<T: Copy>(
        location_info: &HashMap<UniformLocation, LocationInfo>,
        storage: &mut HashMap<UniformLocation, Vec<T>>,
        location: UniformLocation,
        element: usize,
        values: &[T],
    ) {
        let Some(info) = location_info.get(&location) else {
            return;
        };
        let remaining = (info.array_size - info.index) as usize;
        for (offset, chunk) in values.chunks(element.max(1)).take(remaining).enumerate() {
            let target = UniformLocation(location.0 + offset as u32);
            storage.insert(target, chunk.to_vec());
        }
    }
}

impl GpuDevice for HeadlessDevice {
    fn features(&self) -> DeviceFeatures {
        self.features
    }

    fn limits(&self) -> GraphicsLimits {
        self.limits
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        self.journal
            .record(DeviceCall::SetCapability(capability, enabled));
    }

    fn set_unpack_alignment(&mut self, alignment: u32) {
        self.journal.record(DeviceCall::UnpackAlignment(alignment));
    }

    // --- Buffers ---

    fn create_buffer(&mut self) -> Result<BufferId, ResourceError> {
        let id = BufferId(self.allocate("buffer")?);
        self.journal.record(DeviceCall::CreateBuffer(id));
        Ok(id)
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        self.journal.record(DeviceCall::DestroyBuffer(id));
    }

    fn bind_buffer(&mut self, target: BufferTarget, id: Option<BufferId>) {
        self.journal.record(DeviceCall::BindBuffer(target, id));
    }

    fn bind_buffer_base(&mut self, target: BufferTarget, slot: u32, id: Option<BufferId>) {
        self.journal
            .record(DeviceCall::BindBufferBase(target, slot, id));
    }

    fn buffer_data(
        &mut self,
        target: BufferTarget,
        size: u64,
        data: Option<&[u8]>,
        hint: BufferUsageHint,
    ) -> Result<(), ResourceError> {
        if self.fail_allocations {
            return Err(ResourceError::OutOfMemory(format!(
                "headless device refused {size} bytes of buffer storage"
            )));
        }
        self.journal.record(DeviceCall::BufferData {
            target,
            size,
            initialized: data.is_some(),
            hint,
        });
        Ok(())
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: u64, data: &[u8]) {
        self.journal.record(DeviceCall::BufferSubData {
            target,
            offset,
            len: data.len(),
        });
    }

    fn memory_barrier(&mut self, before: GpuAccess, after: GpuAccess) {
        self.journal.record(DeviceCall::MemoryBarrier(before, after));
    }

    // --- Vertex arrays ---

    fn create_vertex_array(&mut self) -> Result<VertexArrayId, ResourceError> {
        let id = VertexArrayId(self.allocate("vertex array")?);
        self.journal.record(DeviceCall::CreateVertexArray(id));
        Ok(id)
    }

    fn destroy_vertex_array(&mut self, id: VertexArrayId) {
        self.journal.record(DeviceCall::DestroyVertexArray(id));
    }

    fn bind_vertex_array(&mut self, id: Option<VertexArrayId>) {
        self.journal.record(DeviceCall::BindVertexArray(id));
    }

    fn set_attribute_enabled(&mut self, location: u32, enabled: bool) {
        self.journal
            .record(DeviceCall::SetAttributeEnabled(location, enabled));
    }

    fn attribute_pointer(&mut self, location: u32, pointer: AttributePointer) {
        self.journal
            .record(DeviceCall::AttributePointer(location, pointer));
    }

    fn attribute_divisor(&mut self, location: u32, divisor: u32) {
        self.journal
            .record(DeviceCall::AttributeDivisor(location, divisor));
    }

    fn attribute_default(&mut self, location: u32, value: [f32; 4]) {
        self.journal
            .record(DeviceCall::AttributeDefault(location, value));
    }

    // --- Textures ---

    fn create_texture(&mut self) -> Result<TextureId, ResourceError> {
        let id = TextureId(self.allocate("texture")?);
        self.journal.record(DeviceCall::CreateTexture(id));
        Ok(id)
    }

    fn create_texture_view(
        &mut self,
        source: TextureId,
        texture_type: TextureType,
        format: TextureFormat,
        _srgb: bool,
        range: TextureSubrange,
    ) -> Result<TextureId, ResourceError> {
        let view = TextureId(self.allocate("texture view")?);
        if let Some(size) = self.texture_sizes.get(&source) {
            let level = size.mip_level(range.base_mipmap, texture_type.has_depth());
            let size = if texture_type.has_depth() {
                level
            } else {
                Extent3D::new(level.width, level.height, range.layer_count)
            };
            self.texture_sizes.insert(view, size);
        }
        self.journal.record(DeviceCall::CreateTextureView {
            view,
            source,
            texture_type,
            format,
            range,
        });
        Ok(view)
    }

    fn destroy_texture(&mut self, id: TextureId) {
        self.texture_sizes.remove(&id);
        self.bound_textures.retain(|_, bound| *bound != id);
        self.journal.record(DeviceCall::DestroyTexture(id));
    }

    fn bind_texture(&mut self, slot: u32, texture_type: TextureType, id: Option<TextureId>) {
        self.active_slot = slot;
        match id {
            Some(id) => {
                self.bound_textures.insert(slot, id);
            }
            None => {
                self.bound_textures.remove(&slot);
            }
        }
        self.journal
            .record(DeviceCall::BindTexture(slot, texture_type, id));
    }

    fn texture_storage(
        &mut self,
        texture_type: TextureType,
        levels: u32,
        format: TextureFormat,
        srgb: bool,
        size: Extent3D,
    ) -> Result<(), ResourceError> {
        if self.fail_allocations {
            return Err(ResourceError::OutOfMemory(
                "headless device refused texture storage".to_string(),
            ));
        }
        let Some(&id) = self.bound_textures.get(&self.active_slot) else {
            return Err(ResourceError::BackendError(
                "texture storage requested with no texture bound".to_string(),
            ));
        };
        self.texture_sizes.insert(id, size);
        self.journal.record(DeviceCall::TextureStorage {
            texture_type,
            levels,
            format,
            srgb,
            size,
        });
        Ok(())
    }

    fn texture_sub_image(
        &mut self,
        _texture_type: TextureType,
        region: TextureRegion,
        _format: TextureFormat,
        data: &[u8],
    ) {
        self.journal.record(DeviceCall::TextureSubImage {
            region,
            len: data.len(),
        });
    }

    fn compressed_texture_image(
        &mut self,
        _texture_type: TextureType,
        region: TextureRegion,
        _format: TextureFormat,
        _srgb: bool,
        data: &[u8],
    ) {
        self.journal.record(DeviceCall::CompressedTextureImage {
            region,
            len: data.len(),
        });
    }

    fn generate_mipmaps(&mut self, texture_type: TextureType) {
        self.journal.record(DeviceCall::GenerateMipmaps(texture_type));
    }

    fn texture_filter(
        &mut self,
        _texture_type: TextureType,
        filter: TextureFilter,
        mipmapped: bool,
    ) {
        self.journal
            .record(DeviceCall::TextureFilter(filter, mipmapped));
    }

    fn texture_wrap(&mut self, _texture_type: TextureType, wrap: TextureWrap) {
        self.journal.record(DeviceCall::TextureWrap(wrap));
    }

    // --- Framebuffers ---

    fn create_framebuffer(&mut self) -> Result<FramebufferId, ResourceError> {
        let id = FramebufferId(self.allocate("framebuffer")?);
        self.framebuffers.insert(id, FramebufferState::default());
        self.journal.record(DeviceCall::CreateFramebuffer(id));
        Ok(id)
    }

    fn destroy_framebuffer(&mut self, id: FramebufferId) {
        self.framebuffers.remove(&id);
        if self.draw_framebuffer == Some(id) {
            self.draw_framebuffer = None;
        }
        if self.read_framebuffer == Some(id) {
            self.read_framebuffer = None;
        }
        self.journal.record(DeviceCall::DestroyFramebuffer(id));
    }

    fn bind_framebuffer(&mut self, target: FramebufferTarget, id: Option<FramebufferId>) {
        match target {
            FramebufferTarget::Both => {
                self.draw_framebuffer = id;
                self.read_framebuffer = id;
            }
            FramebufferTarget::Draw => self.draw_framebuffer = id,
            FramebufferTarget::Read => self.read_framebuffer = id,
        }
        self.journal.record(DeviceCall::BindFramebuffer(target, id));
    }

    fn framebuffer_texture(
        &mut self,
        attachment: Attachment,
        texture: Option<TextureId>,
        level: u32,
    ) {
        let size = texture.map(|id| {
            let extent = self
                .texture_sizes
                .get(&id)
                .copied()
                .unwrap_or_default()
                .mip_level(level, false);
            (extent.width, extent.height)
        });
        self.attach(attachment, size);
        self.journal
            .record(DeviceCall::FramebufferTexture(attachment, texture, level));
    }

    fn framebuffer_texture_layer(
        &mut self,
        attachment: Attachment,
        texture_type: TextureType,
        texture: Option<TextureId>,
        level: u32,
        layer: u32,
    ) {
        let size = texture.map(|id| {
            let extent = self
                .texture_sizes
                .get(&id)
                .copied()
                .unwrap_or_default()
                .mip_level(level, texture_type.has_depth());
            (extent.width, extent.height)
        });
        self.attach(attachment, size);
        self.journal.record(DeviceCall::FramebufferTextureLayer(
            attachment, texture, level, layer,
        ));
    }

    fn create_renderbuffer(
        &mut self,
        format: TextureFormat,
        _srgb: bool,
        samples: u32,
        width: u32,
        height: u32,
    ) -> Result<RenderbufferId, ResourceError> {
        let id = RenderbufferId(self.allocate("renderbuffer")?);
        self.renderbuffer_sizes.insert(id, (width, height));
        self.journal.record(DeviceCall::CreateRenderbuffer {
            id,
            format,
            samples,
            width,
            height,
        });
        Ok(id)
    }

    fn destroy_renderbuffer(&mut self, id: RenderbufferId) {
        self.renderbuffer_sizes.remove(&id);
        self.journal.record(DeviceCall::DestroyRenderbuffer(id));
    }

    fn framebuffer_renderbuffer(&mut self, attachment: Attachment, id: RenderbufferId) {
        let size = self.renderbuffer_sizes.get(&id).copied();
        self.attach(attachment, size);
        self.journal
            .record(DeviceCall::FramebufferRenderbuffer(attachment, id));
    }

    fn draw_buffers(&mut self, count: u32) {
        self.journal.record(DeviceCall::DrawBuffers(count));
    }

    fn framebuffer_status(&mut self) -> FramebufferStatus {
        let status = match self.draw_framebuffer.and_then(|id| self.framebuffers.get(&id)) {
            None => FramebufferStatus::Complete,
            Some(fb) => {
                let mut sizes = fb.attachments.values();
                match sizes.next() {
                    None => FramebufferStatus::MissingAttachment,
                    Some(first) if sizes.all(|size| size == first) => FramebufferStatus::Complete,
                    Some(_) => FramebufferStatus::IncompleteDimensions,
                }
            }
        };
        self.journal.record(DeviceCall::FramebufferStatus(status));
        status
    }

    fn blit_framebuffer(&mut self, width: u32, height: u32) {
        let color = self.read_clear();
        *self.draw_clear_mut() = color;
        self.journal.record(DeviceCall::BlitFramebuffer(width, height));
    }

    fn clear_color(&mut self, draw_buffer: u32, color: [f32; 4]) {
        if draw_buffer == 0 {
            *self.draw_clear_mut() = color;
        }
        self.journal.record(DeviceCall::ClearColor(draw_buffer, color));
    }

    fn clear_depth(&mut self, depth: f32) {
        self.journal.record(DeviceCall::ClearDepth(depth));
    }

    fn clear_stencil(&mut self, value: i32) {
        self.journal.record(DeviceCall::ClearStencil(value));
    }

    fn read_pixels(&mut self, x: u32, y: u32, width: u32, height: u32, out: &mut [u8]) {
        let color = self.read_clear();
        let texel = color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        let texels = (width as usize * height as usize).min(out.len() / 4);
        for chunk in out.chunks_exact_mut(4).take(texels) {
            chunk.copy_from_slice(&texel);
        }
        self.journal
            .record(DeviceCall::ReadPixels(x, y, width, height));
    }

    // --- Programs ---

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<ShaderModuleId, ShaderError> {
        self.journal.record(DeviceCall::CompileShader(stage));
        if let Some((line, text)) = source
            .lines()
            .enumerate()
            .find(|(_, text)| text.trim_start().starts_with("#error"))
        {
            let message = text.trim_start().trim_start_matches("#error").trim();
            return Err(ShaderError::CompilationError {
                stage,
                log: format!("0:{}: error: {message}", line + 1),
            });
        }
        let id = ShaderModuleId(self.allocate("shader module").map_err(|e| {
            ShaderError::CompilationError {
                stage,
                log: e.to_string(),
            }
        })?);
        let declared = reflection::scan(source, stage == ShaderStage::Vertex);
        self.modules.insert(id, declared);
        Ok(id)
    }

    fn link_program(
        &mut self,
        vertex: ShaderModuleId,
        fragment: ShaderModuleId,
        attributes: &[(&str, u32)],
    ) -> Result<ProgramId, ShaderError> {
        let (Some(mut interface), Some(fragment_interface)) =
            (self.modules.remove(&vertex), self.modules.remove(&fragment))
        else {
            return Err(ShaderError::LinkError {
                log: "attached stage was never compiled".to_string(),
            });
        };
        interface.merge(fragment_interface);

        let id = ProgramId(self.allocate("program").map_err(|e| ShaderError::LinkError {
            log: e.to_string(),
        })?);
        let mut program = ProgramState {
            blocks: interface.blocks,
            ..Default::default()
        };

        for declared in interface.uniforms {
            let base = UniformLocation(self.next_location);
            self.next_location += declared.array_size;
            for index in 0..declared.array_size {
                let location = UniformLocation(base.0 + index);
                self.location_info.insert(
                    location,
                    LocationInfo {
                        index,
                        array_size: declared.array_size,
                    },
                );
                self.journal.name_location(location, declared.name.clone());
                program
                    .locations
                    .insert(format!("{}[{index}]", declared.name), location);
            }
            program.locations.insert(declared.name.clone(), base);
            let name = if declared.array_size > 1 {
                format!("{}[0]", declared.name)
            } else {
                declared.name
            };
            program.uniforms.push(ActiveUniform {
                name,
                glsl_type: declared.glsl_type,
                array_size: declared.array_size,
            });
        }

        let mut used: Vec<u32> = Vec::new();
        for input in &interface.inputs {
            if let Some(&(_, location)) = attributes.iter().find(|(name, _)| name == input) {
                used.push(location);
            }
        }
        for input in interface.inputs {
            let location = match attributes.iter().find(|(name, _)| *name == input) {
                Some(&(_, location)) => location,
                None => {
                    let free = (0..).find(|l| !used.contains(l)).unwrap_or_default();
                    used.push(free);
                    free
                }
            };
            program.attributes.push(ActiveAttribute {
                name: input,
                location,
            });
        }

        self.programs.insert(id, program);
        self.journal.record(DeviceCall::LinkProgram(id));
        Ok(id)
    }

    fn destroy_shader_module(&mut self, id: ShaderModuleId) {
        self.modules.remove(&id);
        self.journal.record(DeviceCall::DestroyShaderModule(id));
    }

    fn destroy_program(&mut self, id: ProgramId) {
        if let Some(program) = self.programs.remove(&id) {
            for location in program.locations.values() {
                self.location_info.remove(location);
                self.float_values.remove(location);
                self.int_values.remove(location);
            }
        }
        if self.current_program == Some(id) {
            self.current_program = None;
        }
        self.journal.record(DeviceCall::DestroyProgram(id));
    }

    fn use_program(&mut self, id: Option<ProgramId>) {
        self.current_program = id;
        self.journal.record(DeviceCall::UseProgram(id));
    }

    fn active_uniforms(&mut self, program: ProgramId) -> Vec<ActiveUniform> {
        self.programs
            .get(&program)
            .map(|p| p.uniforms.clone())
            .unwrap_or_default()
    }

    fn active_uniform_blocks(&mut self, program: ProgramId) -> Vec<String> {
        self.programs
            .get(&program)
            .map(|p| p.blocks.clone())
            .unwrap_or_default()
    }

    fn active_attributes(&mut self, program: ProgramId) -> Vec<ActiveAttribute> {
        self.programs
            .get(&program)
            .map(|p| p.attributes.clone())
            .unwrap_or_default()
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        self.programs.get(&program)?.locations.get(name).copied()
    }

    fn read_uniform_f32(
        &mut self,
        _program: ProgramId,
        location: UniformLocation,
        out: &mut [f32],
    ) {
        if let Some(values) = self.float_values.get(&location) {
            let n = values.len().min(out.len());
            out[..n].copy_from_slice(&values[..n]);
        } else if let Some(values) = self.int_values.get(&location) {
            for (dst, src) in out.iter_mut().zip(values) {
                *dst = *src as f32;
            }
        } else {
            out.fill(0.0);
        }
    }

    fn read_uniform_i32(
        &mut self,
        _program: ProgramId,
        location: UniformLocation,
        out: &mut [i32],
    ) {
        if let Some(values) = self.int_values.get(&location) {
            let n = values.len().min(out.len());
            out[..n].copy_from_slice(&values[..n]);
        } else {
            out.fill(0);
        }
    }

    fn upload_uniform(&mut self, location: UniformLocation, upload: UniformUpload<'_>) {
        match upload {
            UniformUpload::Float { components, values } => Self::store(
                &self.location_info,
                &mut self.float_values,
                location,
                components as usize,
                values,
            ),
            UniformUpload::Int { components, values } => Self::store(
                &self.location_info,
                &mut self.int_values,
                location,
                components as usize,
                values,
            ),
            UniformUpload::Matrix { dimension, values } => Self::store(
                &self.location_info,
                &mut self.float_values,
                location,
                dimension as usize * dimension as usize,
                values,
            ),
        }
        self.journal
            .record(DeviceCall::UploadUniform(location, upload.into()));
    }

    fn uniform_block_binding(&mut self, program: ProgramId, block_index: u32, binding: u32) {
        self.journal
            .record(DeviceCall::UniformBlockBinding(program, block_index, binding));
    }

    // --- Pipeline state ---

    fn blend_state(&mut self, state: BlendState) {
        self.journal.record(DeviceCall::BlendState(state));
    }

    fn depth_function(&mut self, mode: CompareMode) {
        self.journal.record(DeviceCall::DepthFunction(mode));
    }

    fn depth_write(&mut self, enabled: bool) {
        self.journal.record(DeviceCall::DepthWrite(enabled));
    }

    fn line_width(&mut self, width: f32) {
        self.journal.record(DeviceCall::LineWidth(width));
    }

    fn stencil_function(&mut self, mode: CompareMode, reference: i32, mask: u32) {
        self.journal
            .record(DeviceCall::StencilFunction(mode, reference, mask));
    }

    fn stencil_operation(&mut self, fail: StencilOp, depth_fail: StencilOp, pass: StencilOp) {
        self.journal
            .record(DeviceCall::StencilOperation(fail, depth_fail, pass));
    }

    fn front_face(&mut self, winding: Winding) {
        self.journal.record(DeviceCall::FrontFace(winding));
    }

    fn polygon_mode(&mut self, mode: PolygonMode) {
        self.journal.record(DeviceCall::PolygonMode(mode));
    }

    fn color_mask(&mut self, enabled: bool) {
        self.journal.record(DeviceCall::ColorMask(enabled));
    }

    fn viewport(&mut self, viewport: Viewport) {
        self.journal.record(DeviceCall::Viewport(viewport));
    }

    fn viewport_array(&mut self, viewports: [Viewport; 2]) {
        self.journal.record(DeviceCall::ViewportArray(viewports));
    }

    // --- Draws ---

    fn draw_arrays(&mut self, mode: DrawMode, first: u32, count: u32) {
        self.journal.record(DeviceCall::DrawArrays {
            mode,
            first,
            count,
            instances: None,
        });
    }

    fn draw_arrays_instanced(&mut self, mode: DrawMode, first: u32, count: u32, instances: u32) {
        self.journal.record(DeviceCall::DrawArrays {
            mode,
            first,
            count,
            instances: Some(instances),
        });
    }

    fn draw_elements(&mut self, mode: DrawMode, count: u32, format: IndexFormat, offset: u64) {
        self.journal.record(DeviceCall::DrawElements {
            mode,
            count,
            format,
            offset,
            instances: None,
        });
    }

    fn draw_elements_instanced(
        &mut self,
        mode: DrawMode,
        count: u32,
        format: IndexFormat,
        offset: u64,
        instances: u32,
    ) {
        self.journal.record(DeviceCall::DrawElements {
            mode,
            count,
            format,
            offset,
            instances: Some(instances),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = "#version 330\n\
        in vec3 emberPosition;\n\
        in vec2 uv;\n\
        uniform mat4 emberTransforms[2];\n\
        uniform vec4 emberColor;\n\
        void main() {}\n";
    const FRAGMENT: &str = "#version 330\n\
        uniform vec4 emberColor;\n\
        uniform sampler2D emberDiffuseTexture;\n\
        void main() {}\n";

    fn link(device: &mut HeadlessDevice) -> ProgramId {
        let vs = device.compile_shader(ShaderStage::Vertex, VERTEX).unwrap();
        let fs = device.compile_shader(ShaderStage::Fragment, FRAGMENT).unwrap();
        device
            .link_program(vs, fs, &[("emberPosition", 0)])
            .unwrap()
    }

    #[test]
    fn test_compile_error_reports_line() {
        let mut device = HeadlessDevice::new();
        let err = device
            .compile_shader(ShaderStage::Fragment, "void main() {}\n#error broken\n")
            .unwrap_err();
        match err {
            ShaderError::CompilationError { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(log, "0:2: error: broken");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_reflection_merges_stages() {
        let mut device = HeadlessDevice::new();
        let program = link(&mut device);

        let uniforms = device.active_uniforms(program);
        let names: Vec<_> = uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["emberTransforms[0]", "emberColor", "emberDiffuseTexture"]);
        assert_eq!(uniforms[0].array_size, 2);

        let attributes = device.active_attributes(program);
        assert_eq!(attributes[0].location, 0);
        assert_eq!(attributes[1].name, "uv");
        assert_eq!(attributes[1].location, 1);
    }

    #[test]
    fn test_uniform_array_upload_spans_elements() {
        let mut device = HeadlessDevice::new();
        let program = link(&mut device);
        let base = device.uniform_location(program, "emberTransforms").unwrap();
        let second = device
            .uniform_location(program, "emberTransforms[1]")
            .unwrap();

        let mut values = [0.0f32; 32];
        values[16] = 7.0;
        device.upload_uniform(
            base,
            UniformUpload::Matrix {
                dimension: 4,
                values: &values,
            },
        );

        let mut out = [0.0f32; 16];
        device.read_uniform_f32(program, second, &mut out);
        assert_eq!(out[0], 7.0);
        assert_eq!(device.journal().uploads_to("emberTransforms").len(), 1);
    }

    #[test]
    fn test_framebuffer_status_tracks_attachment_sizes() {
        let mut device = HeadlessDevice::new();
        let fb = device.create_framebuffer().unwrap();
        device.bind_framebuffer(FramebufferTarget::Both, Some(fb));
        assert_eq!(device.framebuffer_status(), FramebufferStatus::MissingAttachment);

        let a = device
            .create_renderbuffer(TextureFormat::Rgba8, false, 0, 64, 64)
            .unwrap();
        let b = device
            .create_renderbuffer(TextureFormat::Depth24, false, 0, 128, 128)
            .unwrap();
        device.framebuffer_renderbuffer(Attachment::Color(0), a);
        assert_eq!(device.framebuffer_status(), FramebufferStatus::Complete);
        device.framebuffer_renderbuffer(Attachment::Depth, b);
        assert_eq!(
            device.framebuffer_status(),
            FramebufferStatus::IncompleteDimensions
        );
    }

    #[test]
    fn test_read_pixels_returns_clear_color() {
        let mut device = HeadlessDevice::new();
        device.clear_color(0, [1.0, 0.0, 0.0, 1.0]);
        let mut out = [0u8; 8];
        device.read_pixels(0, 0, 2, 1, &mut out);
        assert_eq!(out, [255, 0, 0, 255, 255, 0, 0, 255]);
    }

    #[test]
    fn test_failed_allocation() {
        let mut device = HeadlessDevice::new();
        device.set_fail_allocations(true);
        assert!(matches!(
            device.create_buffer(),
            Err(ResourceError::OutOfMemory(_))
        ));
    }
}
