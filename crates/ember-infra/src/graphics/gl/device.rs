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

//! [`GlowDevice`]: the OpenGL implementation of [`GpuDevice`].

use super::conversions::{self, IntoGl};
use ember_core::math::Extent3D;
use ember_core::platform::window::WindowSurface;
use ember_core::renderer::*;
use glow::{CompressedPixelUnpackData, HasContext, PixelPackData, PixelUnpackData};
use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;

/// `glTextureView`, which glow does not wrap.
type TextureViewFn = unsafe extern "system" fn(u32, u32, u32, u32, u32, u32, u32, u32);

/// An OpenGL 3.3+ device.
///
/// Core ids are plain integers mapped to `glow` objects, so the render core
/// never sees a backend type. Every GL call happens on the thread that owns
/// the current context.
pub struct GlowDevice {
    gl: glow::Context,
    features: DeviceFeatures,
    limits: GraphicsLimits,
    next_id: u32,
    buffers: HashMap<BufferId, glow::Buffer>,
    vertex_arrays: HashMap<VertexArrayId, glow::VertexArray>,
    textures: HashMap<TextureId, glow::Texture>,
    framebuffers: HashMap<FramebufferId, glow::Framebuffer>,
    renderbuffers: HashMap<RenderbufferId, glow::Renderbuffer>,
    shaders: HashMap<ShaderModuleId, glow::Shader>,
    programs: HashMap<ProgramId, glow::Program>,
    locations: HashMap<UniformLocation, glow::UniformLocation>,
    location_ids: HashMap<(ProgramId, String), UniformLocation>,
    texture_view: Option<TextureViewFn>,
}

impl fmt::Debug for GlowDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlowDevice")
            .field("features", &self.features)
            .field("limits", &self.limits)
            .field("buffers", &self.buffers.len())
            .field("textures", &self.textures.len())
            .field("programs", &self.programs.len())
            .finish()
    }
}

impl GlowDevice {
    /// Loads GL entry points through the surface's current context.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InitializationFailed`] when the context is
    /// older than OpenGL 3.3.
    pub fn from_surface(surface: &dyn WindowSurface) -> Result<Self, RenderError> {
        // SAFETY: the surface guarantees its GL context is current on this thread.
        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|name| {
                surface.get_proc_address(name.to_str().unwrap_or_default())
            })
        };
        let mut device = Self::from_context(gl)?;

        let version = device.gl.version();
        let has_views = (!version.is_embedded && (version.major, version.minor) >= (4, 3))
            || device.gl.supported_extensions().contains("GL_ARB_texture_view");
        let address = surface.get_proc_address("glTextureView");
        if has_views && !address.is_null() {
            // SAFETY: a non-null glTextureView entry point has the signature of `TextureViewFn`.
            device.texture_view =
                Some(unsafe { std::mem::transmute::<*const c_void, TextureViewFn>(address) });
        }
        log::debug!("GlowDevice: texture views {}", device.texture_view.is_some());
        Ok(device)
    }

    /// Wraps an already loaded context.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InitializationFailed`] when the context is
    /// older than OpenGL 3.3.
    pub fn from_context(gl: glow::Context) -> Result<Self, RenderError> {
        let version = gl.version();
        if !version.is_embedded && (version.major, version.minor) < (3, 3) {
            return Err(RenderError::InitializationFailed(format!(
                "OpenGL 3.3 is required, found {}.{}",
                version.major, version.minor
            )));
        }
        // SAFETY: read-only queries on a current context.
        let (vendor, renderer) = unsafe {
            (
                gl.get_parameter_string(glow::VENDOR),
                gl.get_parameter_string(glow::RENDERER),
            )
        };
        log::info!(
            "GlowDevice: {} on {} (OpenGL {}.{})",
            renderer,
            vendor,
            version.major,
            version.minor
        );

        let features = Self::query_features(&gl);
        let limits = Self::query_limits(&gl, &features);
        log::info!("GlowDevice: {features:?}");
        log::debug!("GlowDevice: {limits:?}");

        Ok(Self {
            gl,
            features,
            limits,
            next_id: 1,
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            renderbuffers: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            locations: HashMap::new(),
            location_ids: HashMap::new(),
            texture_view: None,
        })
    }

    fn query_features(gl: &glow::Context) -> DeviceFeatures {
        let version = gl.version();
        let at_least = |major: u32, minor: u32| {
            !version.is_embedded && (version.major, version.minor) >= (major, minor)
        };
        let extensions = gl.supported_extensions();
        let has = |name: &str| extensions.contains(name);

        let viewport_array = at_least(4, 1) || has("GL_ARB_viewport_array");
        let layer_index = has("GL_AMD_vertex_shader_viewport_index")
            || has("GL_ARB_shader_viewport_layer_array")
            || has("GL_NV_viewport_array2");

        DeviceFeatures {
            single_pass_stereo: viewport_array && layer_index,
            compressed_textures: has("GL_EXT_texture_compression_s3tc"),
            anisotropic_filtering: at_least(4, 6)
                || has("GL_EXT_texture_filter_anisotropic")
                || has("GL_ARB_texture_filter_anisotropic"),
            memory_barriers: at_least(4, 2) || has("GL_ARB_shader_image_load_store"),
        }
    }

    fn query_limits(gl: &glow::Context, features: &DeviceFeatures) -> GraphicsLimits {
        // SAFETY: read-only queries on a current context.
        unsafe {
            let mut point_sizes = [1.0f32; 2];
            gl.get_parameter_f32_slice(glow::POINT_SIZE_RANGE, &mut point_sizes);
            let texture_anisotropy = if features.anisotropic_filtering {
                gl.get_parameter_f32(glow::MAX_TEXTURE_MAX_ANISOTROPY_EXT)
            } else {
                1.0
            };
            GraphicsLimits {
                point_sizes,
                texture_size: gl.get_parameter_i32(glow::MAX_TEXTURE_SIZE).max(0) as u32,
                texture_msaa: gl.get_parameter_i32(glow::MAX_SAMPLES).max(1) as u32,
                texture_anisotropy,
            }
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Maps a pending GL error to a resource error.
    fn check_allocation(&self, what: &str) -> Result<(), ResourceError> {
        // SAFETY: error query on a current context.
        match unsafe { self.gl.get_error() } {
            glow::NO_ERROR => Ok(()),
            glow::OUT_OF_MEMORY => Err(ResourceError::OutOfMemory(what.to_string())),
            code => Err(ResourceError::BackendError(format!(
                "{what} failed with GL error 0x{code:04X}"
            ))),
        }
    }

    fn cube_face(layer: u32) -> u32 {
        glow::TEXTURE_CUBE_MAP_POSITIVE_X + layer
    }
}

impl GpuDevice for GlowDevice {
    fn features(&self) -> DeviceFeatures {
        self.features
    }

    fn limits(&self) -> GraphicsLimits {
        self.limits
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        let cap = capability.into_gl();
        // SAFETY: plain state change on a current context.
        unsafe {
            if enabled {
                self.gl.enable(cap);
            } else {
                self.gl.disable(cap);
            }
        }
    }

    fn set_unpack_alignment(&mut self, alignment: u32) {
        // SAFETY: plain state change on a current context.
        unsafe { self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, alignment as i32) };
    }

    // --- Buffers ---

    fn create_buffer(&mut self) -> Result<BufferId, ResourceError> {
        // SAFETY: plain object creation on a current context.
        let buffer = unsafe { self.gl.create_buffer() }.map_err(ResourceError::BackendError)?;
        let id = BufferId(self.next_id());
        self.buffers.insert(id, buffer);
        Ok(id)
    }

    fn destroy_buffer(&mut self, id: BufferId) {
        if let Some(buffer) = self.buffers.remove(&id) {
            // SAFETY: the object was created by this context and leaves the map here.
            unsafe { self.gl.delete_buffer(buffer) };
        }
    }

    fn bind_buffer(&mut self, target: BufferTarget, id: Option<BufferId>) {
        let buffer = id.and_then(|id| self.buffers.get(&id).copied());
        // SAFETY: the name, if any, is owned by this device and the context is current.
        unsafe { self.gl.bind_buffer(target.into_gl(), buffer) };
    }

    fn bind_buffer_base(&mut self, target: BufferTarget, slot: u32, id: Option<BufferId>) {
        let buffer = id.and_then(|id| self.buffers.get(&id).copied());
        // SAFETY: the name, if any, is owned by this device and the context is current.
        unsafe { self.gl.bind_buffer_base(target.into_gl(), slot, buffer) };
    }

    fn buffer_data(
        &mut self,
        target: BufferTarget,
        size: u64,
        data: Option<&[u8]>,
        hint: BufferUsageHint,
    ) -> Result<(), ResourceError> {
        // SAFETY: the byte slice is borrowed for the whole call and bounds the upload.
        unsafe {
            match data {
                Some(data) => self
                    .gl
                    .buffer_data_u8_slice(target.into_gl(), data, hint.into_gl()),
                None => self
                    .gl
                    .buffer_data_size(target.into_gl(), size as i32, hint.into_gl()),
            }
        }
        self.check_allocation("buffer storage")
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: u64, data: &[u8]) {
        // SAFETY: the byte slice is borrowed for the whole call and bounds the upload.
        unsafe {
            self.gl
                .buffer_sub_data_u8_slice(target.into_gl(), offset as i32, data)
        };
    }

    fn memory_barrier(&mut self, _before: GpuAccess, after: GpuAccess) {
        let bits: u32 = after.into_gl();
        if bits != 0 {
            // SAFETY: plain state change on a current context.
            unsafe { self.gl.memory_barrier(bits) };
        }
    }

    // --- Vertex arrays ---

    fn create_vertex_array(&mut self) -> Result<VertexArrayId, ResourceError> {
        // SAFETY: plain object creation on a current context.
        let vao = unsafe { self.gl.create_vertex_array() }.map_err(ResourceError::BackendError)?;
        let id = VertexArrayId(self.next_id());
        self.vertex_arrays.insert(id, vao);
        Ok(id)
    }

    fn destroy_vertex_array(&mut self, id: VertexArrayId) {
        if let Some(vao) = self.vertex_arrays.remove(&id) {
            // SAFETY: the object was created by this context and leaves the map here.
            unsafe { self.gl.delete_vertex_array(vao) };
        }
    }

    fn bind_vertex_array(&mut self, id: Option<VertexArrayId>) {
        let vao = id.and_then(|id| self.vertex_arrays.get(&id).copied());
        // SAFETY: the name, if any, is owned by this device and the context is current.
        unsafe { self.gl.bind_vertex_array(vao) };
    }

    fn set_attribute_enabled(&mut self, location: u32, enabled: bool) {
        // SAFETY: state change on the bound vertex array of a current context.
        unsafe {
            if enabled {
                self.gl.enable_vertex_attrib_array(location);
            } else {
                self.gl.disable_vertex_attrib_array(location);
            }
        }
    }

    fn attribute_pointer(&mut self, location: u32, pointer: AttributePointer) {
        let size = pointer.components as i32;
        let stride = pointer.stride as i32;
        let offset = pointer.offset as i32;
        let data_type = pointer.attribute_type.into_gl();
        // SAFETY: state change on the bound vertex array; offsets address the bound buffer.
        unsafe {
            match pointer.attribute_type {
                AttributeType::Int => self
                    .gl
                    .vertex_attrib_pointer_i32(location, size, data_type, stride, offset),
                AttributeType::Byte => self
                    .gl
                    .vertex_attrib_pointer_f32(location, size, data_type, true, stride, offset),
                AttributeType::Float => self
                    .gl
                    .vertex_attrib_pointer_f32(location, size, data_type, false, stride, offset),
            }
        }
    }

    fn attribute_divisor(&mut self, location: u32, divisor: u32) {
        // SAFETY: state change on the bound vertex array of a current context.
        unsafe { self.gl.vertex_attrib_divisor(location, divisor) };
    }

    fn attribute_default(&mut self, location: u32, value: [f32; 4]) {
        let [x, y, z, w] = value;
        // SAFETY: plain state change on a current context.
        unsafe { self.gl.vertex_attrib_4_f32(location, x, y, z, w) };
    }

    // --- Textures ---

    fn create_texture(&mut self) -> Result<TextureId, ResourceError> {
        // SAFETY: plain object creation on a current context.
        let texture = unsafe { self.gl.create_texture() }.map_err(ResourceError::BackendError)?;
        let id = TextureId(self.next_id());
        self.textures.insert(id, texture);
        Ok(id)
    }

    fn create_texture_view(
        &mut self,
        source: TextureId,
        texture_type: TextureType,
        format: TextureFormat,
        srgb: bool,
        range: TextureSubrange,
    ) -> Result<TextureId, ResourceError> {
        let Some(texture_view) = self.texture_view else {
            return Err(ConfigError::IncompatibleView(
                "the device cannot create texture views".to_string(),
            )
            .into());
        };
        let source = self.textures.get(&source).copied().ok_or_else(|| {
            ResourceError::BackendError(format!("texture view of unknown texture {source:?}"))
        })?;
        // SAFETY: plain object creation on a current context.
        let view = unsafe { self.gl.create_texture() }.map_err(ResourceError::BackendError)?;
        // SAFETY: `view` is a fresh name that was never bound and `source` has
        // immutable storage, which glTextureView requires.
        unsafe {
            texture_view(
                view.0.get(),
                texture_type.into_gl(),
                source.0.get(),
                conversions::internal_format(format, srgb),
                range.base_mipmap,
                range.mipmap_count,
                range.base_layer,
                range.layer_count,
            );
        }
        if let Err(e) = self.check_allocation("texture view") {
            // SAFETY: the name was created above and is not referenced elsewhere.
            unsafe { self.gl.delete_texture(view) };
            return Err(e);
        }
        let id = TextureId(self.next_id());
        self.textures.insert(id, view);
        Ok(id)
    }

    fn destroy_texture(&mut self, id: TextureId) {
        if let Some(texture) = self.textures.remove(&id) {
            // SAFETY: the object was created by this context and leaves the map here.
            unsafe { self.gl.delete_texture(texture) };
        }
    }

    fn bind_texture(&mut self, slot: u32, texture_type: TextureType, id: Option<TextureId>) {
        let texture = id.and_then(|id| self.textures.get(&id).copied());
        // SAFETY: plain state change on a current context.
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + slot);
            self.gl.bind_texture(texture_type.into_gl(), texture);
        }
    }

    fn texture_storage(
        &mut self,
        texture_type: TextureType,
        levels: u32,
        format: TextureFormat,
        srgb: bool,
        size: Extent3D,
    ) -> Result<(), ResourceError> {
        let target = texture_type.into_gl();
        let internal = conversions::internal_format(format, srgb);
        let (w, h, d) = (
            size.width as i32,
            size.height as i32,
            size.depth_or_array_layers as i32,
        );
        // SAFETY: allocates storage for the texture bound by the caller; no data is read.
        unsafe {
            match texture_type {
                TextureType::D2 | TextureType::Cube => {
                    self.gl
                        .tex_storage_2d(target, levels as i32, internal, w, h)
                }
                TextureType::Array | TextureType::Volume => {
                    self.gl
                        .tex_storage_3d(target, levels as i32, internal, w, h, d)
                }
            }
        }
        self.check_allocation("texture storage")
    }

    fn texture_sub_image(
        &mut self,
        texture_type: TextureType,
        region: TextureRegion,
        format: TextureFormat,
        data: &[u8],
    ) {
        let (pixel_format, pixel_type) = conversions::pixel_transfer(format);
        let level = region.mip_level as i32;
        let (x, y, z) = (
            region.origin.x as i32,
            region.origin.y as i32,
            region.origin.z as i32,
        );
        let (w, h, d) = (
            region.extent.width as i32,
            region.extent.height as i32,
            region.extent.depth_or_array_layers.max(1) as i32,
        );
        // SAFETY: the byte slice is borrowed for the whole call and bounds the upload.
        unsafe {
            match texture_type {
                TextureType::D2 => self.gl.tex_sub_image_2d(
                    glow::TEXTURE_2D,
                    level,
                    x,
                    y,
                    w,
                    h,
                    pixel_format,
                    pixel_type,
                    PixelUnpackData::Slice(Some(data)),
                ),
                TextureType::Cube => {
                    let face_size = format.image_size(region.extent.width, region.extent.height);
                    for (i, face) in data.chunks(face_size.max(1)).take(d as usize).enumerate() {
                        self.gl.tex_sub_image_2d(
                            Self::cube_face(region.origin.z + i as u32),
                            level,
                            x,
                            y,
                            w,
                            h,
                            pixel_format,
                            pixel_type,
                            PixelUnpackData::Slice(Some(face)),
                        );
                    }
                }
                TextureType::Array | TextureType::Volume => self.gl.tex_sub_image_3d(
                    texture_type.into_gl(),
                    level,
                    x,
                    y,
                    z,
                    w,
                    h,
                    d,
                    pixel_format,
                    pixel_type,
                    PixelUnpackData::Slice(Some(data)),
                ),
            }
        }
    }

    fn compressed_texture_image(
        &mut self,
        texture_type: TextureType,
        region: TextureRegion,
        format: TextureFormat,
        srgb: bool,
        data: &[u8],
    ) {
        let internal = conversions::internal_format(format, srgb);
        let level = region.mip_level as i32;
        let (w, h) = (region.extent.width as i32, region.extent.height as i32);
        // SAFETY: the byte slice is borrowed for the whole call and bounds the upload.
        unsafe {
            match texture_type {
                TextureType::D2 | TextureType::Cube => {
                    let target = if texture_type == TextureType::Cube {
                        Self::cube_face(region.origin.z)
                    } else {
                        glow::TEXTURE_2D
                    };
                    self.gl.compressed_tex_sub_image_2d(
                        target,
                        level,
                        region.origin.x as i32,
                        region.origin.y as i32,
                        w,
                        h,
                        internal,
                        CompressedPixelUnpackData::Slice(data),
                    );
                }
                TextureType::Array | TextureType::Volume => self.gl.compressed_tex_sub_image_3d(
                    texture_type.into_gl(),
                    level,
                    region.origin.x as i32,
                    region.origin.y as i32,
                    region.origin.z as i32,
                    w,
                    h,
                    region.extent.depth_or_array_layers.max(1) as i32,
                    internal,
                    CompressedPixelUnpackData::Slice(data),
                ),
            }
        }
    }

    fn generate_mipmaps(&mut self, texture_type: TextureType) {
        // SAFETY: plain state change on a current context.
        unsafe { self.gl.generate_mipmap(texture_type.into_gl()) };
    }

    fn texture_filter(
        &mut self,
        texture_type: TextureType,
        filter: TextureFilter,
        mipmapped: bool,
    ) {
        let target = texture_type.into_gl();
        let (min, mag) = conversions::filter_pair(filter.mode, mipmapped);
        // SAFETY: parameter change on the texture bound by the caller.
        unsafe {
            self.gl
                .tex_parameter_i32(target, glow::TEXTURE_MIN_FILTER, min as i32);
            self.gl
                .tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, mag as i32);
            if self.features.anisotropic_filtering {
                let anisotropy = if filter.mode == FilterMode::Anisotropic {
                    filter.anisotropy.clamp(1.0, self.limits.texture_anisotropy)
                } else {
                    1.0
                };
                self.gl
                    .tex_parameter_f32(target, glow::TEXTURE_MAX_ANISOTROPY_EXT, anisotropy);
            }
        }
    }

    fn texture_wrap(&mut self, texture_type: TextureType, wrap: TextureWrap) {
        let target = texture_type.into_gl();
        // SAFETY: parameter change on the texture bound by the caller.
        unsafe {
            self.gl
                .tex_parameter_i32(target, glow::TEXTURE_WRAP_S, wrap.s.into_gl());
            self.gl
                .tex_parameter_i32(target, glow::TEXTURE_WRAP_T, wrap.t.into_gl());
            if texture_type.has_depth() || texture_type == TextureType::Cube {
                self.gl
                    .tex_parameter_i32(target, glow::TEXTURE_WRAP_R, wrap.r.into_gl());
            }
        }
    }

    // --- Framebuffers ---

    fn create_framebuffer(&mut self) -> Result<FramebufferId, ResourceError> {
        // SAFETY: plain object creation on a current context.
        let framebuffer =
            unsafe { self.gl.create_framebuffer() }.map_err(ResourceError::BackendError)?;
        let id = FramebufferId(self.next_id());
        self.framebuffers.insert(id, framebuffer);
        Ok(id)
    }

    fn destroy_framebuffer(&mut self, id: FramebufferId) {
        if let Some(framebuffer) = self.framebuffers.remove(&id) {
            // SAFETY: the object was created by this context and leaves the map here.
            unsafe { self.gl.delete_framebuffer(framebuffer) };
        }
    }

    fn bind_framebuffer(&mut self, target: FramebufferTarget, id: Option<FramebufferId>) {
        let framebuffer = id.and_then(|id| self.framebuffers.get(&id).copied());
        // SAFETY: the name, if any, is owned by this device and the context is current.
        unsafe { self.gl.bind_framebuffer(target.into_gl(), framebuffer) };
    }

    fn framebuffer_texture(
        &mut self,
        attachment: Attachment,
        texture: Option<TextureId>,
        level: u32,
    ) {
        let texture = texture.and_then(|id| self.textures.get(&id).copied());
        // SAFETY: attached names are owned by this device and the framebuffer is bound.
        unsafe {
            self.gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                attachment.into_gl(),
                glow::TEXTURE_2D,
                texture,
                level as i32,
            )
        };
    }

    fn framebuffer_texture_layer(
        &mut self,
        attachment: Attachment,
        texture_type: TextureType,
        texture: Option<TextureId>,
        level: u32,
        layer: u32,
    ) {
        let texture = texture.and_then(|id| self.textures.get(&id).copied());
        // SAFETY: attached names are owned by this device and the framebuffer is bound.
        unsafe {
            match texture_type {
                TextureType::D2 => self.gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    attachment.into_gl(),
                    glow::TEXTURE_2D,
                    texture,
                    level as i32,
                ),
                TextureType::Cube => self.gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    attachment.into_gl(),
                    Self::cube_face(layer),
                    texture,
                    level as i32,
                ),
                TextureType::Array | TextureType::Volume => self.gl.framebuffer_texture_layer(
                    glow::FRAMEBUFFER,
                    attachment.into_gl(),
                    texture,
                    level as i32,
                    layer as i32,
                ),
            }
        }
    }

    fn create_renderbuffer(
        &mut self,
        format: TextureFormat,
        srgb: bool,
        samples: u32,
        width: u32,
        height: u32,
    ) -> Result<RenderbufferId, ResourceError> {
        let internal = conversions::internal_format(format, srgb);
        // SAFETY: plain object creation on a current context.
        let renderbuffer =
            unsafe { self.gl.create_renderbuffer() }.map_err(ResourceError::BackendError)?;
        // SAFETY: the name, if any, is owned by this device and the context is current.
        unsafe {
            self.gl
                .bind_renderbuffer(glow::RENDERBUFFER, Some(renderbuffer));
            if samples > 0 {
                self.gl.renderbuffer_storage_multisample(
                    glow::RENDERBUFFER,
                    samples as i32,
                    internal,
                    width as i32,
                    height as i32,
                );
            } else {
                self.gl.renderbuffer_storage(
                    glow::RENDERBUFFER,
                    internal,
                    width as i32,
                    height as i32,
                );
            }
            self.gl.bind_renderbuffer(glow::RENDERBUFFER, None);
        }
        if let Err(e) = self.check_allocation("renderbuffer storage") {
            // SAFETY: the object was created by this context and leaves the map here.
            unsafe { self.gl.delete_renderbuffer(renderbuffer) };
            return Err(e);
        }
        let id = RenderbufferId(self.next_id());
        self.renderbuffers.insert(id, renderbuffer);
        Ok(id)
    }

    fn destroy_renderbuffer(&mut self, id: RenderbufferId) {
        if let Some(renderbuffer) = self.renderbuffers.remove(&id) {
            // SAFETY: the object was created by this context and leaves the map here.
            unsafe { self.gl.delete_renderbuffer(renderbuffer) };
        }
    }

    fn framebuffer_renderbuffer(&mut self, attachment: Attachment, id: RenderbufferId) {
        let renderbuffer = self.renderbuffers.get(&id).copied();
        // SAFETY: attached names are owned by this device and the framebuffer is bound.
        unsafe {
            self.gl.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                attachment.into_gl(),
                glow::RENDERBUFFER,
                renderbuffer,
            )
        };
    }

    fn draw_buffers(&mut self, count: u32) {
        let buffers: Vec<u32> = (0..count).map(|i| glow::COLOR_ATTACHMENT0 + i).collect();
        // SAFETY: plain state change on a current context.
        unsafe { self.gl.draw_buffers(&buffers) };
    }

    fn framebuffer_status(&mut self) -> FramebufferStatus {
        // SAFETY: read-only query on a current context.
        let status = unsafe { self.gl.check_framebuffer_status(glow::FRAMEBUFFER) };
        conversions::framebuffer_status(status)
    }

    fn blit_framebuffer(&mut self, width: u32, height: u32) {
        let (w, h) = (width as i32, height as i32);
        // SAFETY: plain state change on a current context.
        unsafe {
            self.gl.blit_framebuffer(
                0,
                0,
                w,
                h,
                0,
                0,
                w,
                h,
                glow::COLOR_BUFFER_BIT,
                glow::LINEAR,
            )
        };
    }

    fn clear_color(&mut self, draw_buffer: u32, color: [f32; 4]) {
        // SAFETY: plain state change on a current context.
        unsafe { self.gl.clear_buffer_f32_slice(glow::COLOR, draw_buffer, &color) };
    }

    fn clear_depth(&mut self, depth: f32) {
        // SAFETY: plain state change on a current context.
        unsafe { self.gl.clear_buffer_f32_slice(glow::DEPTH, 0, &[depth]) };
    }

    fn clear_stencil(&mut self, value: i32) {
        // SAFETY: plain state change on a current context.
        unsafe { self.gl.clear_buffer_i32_slice(glow::STENCIL, 0, &[value]) };
    }

    fn read_pixels(&mut self, x: u32, y: u32, width: u32, height: u32, out: &mut [u8]) {
        // SAFETY: `out` is a live slice sized by the caller for the rectangle.
        unsafe {
            self.gl.read_pixels(
                x as i32,
                y as i32,
                width as i32,
                height as i32,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                PixelPackData::Slice(Some(out)),
            )
        };
    }

    // --- Programs ---

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<ShaderModuleId, ShaderError> {
        // SAFETY: shader objects are created and released on a current context.
        unsafe {
            let shader = self
                .gl
                .create_shader(stage.into_gl())
                .map_err(|log| ShaderError::CompilationError { stage, log })?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(ShaderError::CompilationError { stage, log });
            }
            let id = ShaderModuleId(self.next_id());
            self.shaders.insert(id, shader);
            Ok(id)
        }
    }

    fn link_program(
        &mut self,
        vertex: ShaderModuleId,
        fragment: ShaderModuleId,
        attributes: &[(&str, u32)],
    ) -> Result<ProgramId, ShaderError> {
        let stages = (self.shaders.remove(&vertex), self.shaders.remove(&fragment));
        let (Some(vert), Some(frag)) = stages else {
            return Err(ShaderError::LinkError {
                log: "attached stage was never compiled".to_string(),
            });
        };
        // SAFETY: shader objects are created and released on a current context.
        unsafe {
            let program = self
                .gl
                .create_program()
                .map_err(|log| ShaderError::LinkError { log })?;
            self.gl.attach_shader(program, vert);
            self.gl.attach_shader(program, frag);
            for (name, location) in attributes {
                self.gl.bind_attrib_location(program, *location, name);
            }
            self.gl.link_program(program);
            let linked = self.gl.get_program_link_status(program);
            self.gl.detach_shader(program, vert);
            self.gl.detach_shader(program, frag);
            self.gl.delete_shader(vert);
            self.gl.delete_shader(frag);
            if !linked {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(ShaderError::LinkError { log });
            }
            let id = ProgramId(self.next_id());
            self.programs.insert(id, program);
            Ok(id)
        }
    }

    fn destroy_shader_module(&mut self, id: ShaderModuleId) {
        if let Some(shader) = self.shaders.remove(&id) {
            // SAFETY: the shader object was created by this context.
            unsafe { self.gl.delete_shader(shader) };
        }
    }

    fn destroy_program(&mut self, id: ProgramId) {
        if let Some(program) = self.programs.remove(&id) {
            let stale: Vec<_> = self
                .location_ids
                .iter()
                .filter(|((owner, _), _)| *owner == id)
                .map(|(key, location)| (key.clone(), *location))
                .collect();
            for (key, location) in stale {
                self.location_ids.remove(&key);
                self.locations.remove(&location);
            }
            // SAFETY: the object was created by this context and leaves the map here.
            unsafe { self.gl.delete_program(program) };
        }
    }

    fn use_program(&mut self, id: Option<ProgramId>) {
        let program = id.and_then(|id| self.programs.get(&id).copied());
        // SAFETY: the name, if any, is owned by this device and the context is current.
        unsafe { self.gl.use_program(program) };
    }

    fn active_uniforms(&mut self, program: ProgramId) -> Vec<ActiveUniform> {
        let Some(&native) = self.programs.get(&program) else {
            return Vec::new();
        };
        // SAFETY: read-only query on a current context.
        unsafe {
            let count = self.gl.get_active_uniforms(native);
            let indices: Vec<u32> = (0..count).collect();
            let block_indices =
                self.gl
                    .get_active_uniforms_parameter(native, &indices, glow::UNIFORM_BLOCK_INDEX);
            indices
                .iter()
                .zip(block_indices)
                .filter(|(_, block)| *block < 0)
                .filter_map(|(&index, _)| self.gl.get_active_uniform(native, index))
                .map(|uniform| ActiveUniform {
                    name: uniform.name,
                    glsl_type: conversions::glsl_type(uniform.utype),
                    array_size: uniform.size.max(1) as u32,
                })
                .collect()
        }
    }

    fn active_uniform_blocks(&mut self, program: ProgramId) -> Vec<String> {
        let Some(&native) = self.programs.get(&program) else {
            return Vec::new();
        };
        // SAFETY: read-only query on a current context.
        unsafe {
            let count = self
                .gl
                .get_program_parameter_i32(native, glow::ACTIVE_UNIFORM_BLOCKS)
                .max(0) as u32;
            (0..count)
                .map(|index| self.gl.get_active_uniform_block_name(native, index))
                .collect()
        }
    }

    fn active_attributes(&mut self, program: ProgramId) -> Vec<ActiveAttribute> {
        let Some(&native) = self.programs.get(&program) else {
            return Vec::new();
        };
        // SAFETY: read-only query on a current context.
        unsafe {
            let count = self.gl.get_active_attributes(native);
            (0..count)
                .filter_map(|index| self.gl.get_active_attribute(native, index))
                .filter_map(|attribute| {
                    let location = self.gl.get_attrib_location(native, &attribute.name)?;
                    Some(ActiveAttribute {
                        name: attribute.name,
                        location,
                    })
                })
                .collect()
        }
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let key = (program, name.to_string());
        if let Some(location) = self.location_ids.get(&key) {
            return Some(*location);
        }
        let native = *self.programs.get(&program)?;
        // SAFETY: read-only query on a current context.
        let location = unsafe { self.gl.get_uniform_location(native, name) }?;
        let id = UniformLocation(self.next_id());
        self.locations.insert(id, location);
        self.location_ids.insert(key, id);
        Some(id)
    }

    fn read_uniform_f32(&mut self, program: ProgramId, location: UniformLocation, out: &mut [f32]) {
        if let (Some(&native), Some(location)) =
            (self.programs.get(&program), self.locations.get(&location))
        {
            // SAFETY: read-only query on a current context.
            unsafe { self.gl.get_uniform_f32(native, location, out) };
        }
    }

    fn read_uniform_i32(&mut self, program: ProgramId, location: UniformLocation, out: &mut [i32]) {
        if let (Some(&native), Some(location)) =
            (self.programs.get(&program), self.locations.get(&location))
        {
            // SAFETY: read-only query on a current context.
            unsafe { self.gl.get_uniform_i32(native, location, out) };
        }
    }

    fn upload_uniform(&mut self, location: UniformLocation, upload: UniformUpload<'_>) {
        let Some(location) = self.locations.get(&location) else {
            log::warn!("GlowDevice: upload to unknown uniform location {location:?}");
            return;
        };
        let location = Some(location);
        // SAFETY: the location belongs to the bound program of this context.
        unsafe {
            match upload {
                UniformUpload::Float { components, values } => match components {
                    1 => self.gl.uniform_1_f32_slice(location, values),
                    2 => self.gl.uniform_2_f32_slice(location, values),
                    3 => self.gl.uniform_3_f32_slice(location, values),
                    _ => self.gl.uniform_4_f32_slice(location, values),
                },
                UniformUpload::Int { components, values } => match components {
                    1 => self.gl.uniform_1_i32_slice(location, values),
                    2 => self.gl.uniform_2_i32_slice(location, values),
                    3 => self.gl.uniform_3_i32_slice(location, values),
                    _ => self.gl.uniform_4_i32_slice(location, values),
                },
                UniformUpload::Matrix { dimension, values } => match dimension {
                    2 => self.gl.uniform_matrix_2_f32_slice(location, false, values),
                    3 => self.gl.uniform_matrix_3_f32_slice(location, false, values),
                    _ => self.gl.uniform_matrix_4_f32_slice(location, false, values),
                },
            }
        }
    }

    fn uniform_block_binding(&mut self, program: ProgramId, block_index: u32, binding: u32) {
        if let Some(&native) = self.programs.get(&program) {
            // SAFETY: the program was created by this context.
            unsafe { self.gl.uniform_block_binding(native, block_index, binding) };
        }
    }

    // --- Pipeline state ---

    fn blend_state(&mut self, state: BlendState) {
        let equation = state.equation.into_gl();
        // SAFETY: plain state change on a current context.
        unsafe {
            self.gl.blend_equation_separate(equation, equation);
            self.gl.blend_func_separate(
                state.src_rgb.into_gl(),
                state.dst_rgb.into_gl(),
                state.src_alpha.into_gl(),
                state.dst_alpha.into_gl(),
            );
        }
    }

    fn depth_function(&mut self, mode: CompareMode) {
        // SAFETY: plain state change on a current context.
        unsafe { self.gl.depth_func(mode.into_gl()) };
    }

    fn depth_write(&mut self, enabled: bool) {
        // SAFETY: plain state change on a current context.
        unsafe { self.gl.depth_mask(enabled) };
    }

    fn line_width(&mut self, width: f32) {
        // SAFETY: plain state change on a current context.
        unsafe { self.gl.line_width(width) };
    }

    fn stencil_function(&mut self, mode: CompareMode, reference: i32, mask: u32) {
        // SAFETY: plain state change on a current context.
        unsafe { self.gl.stencil_func(mode.into_gl(), reference, mask) };
    }

    fn stencil_operation(&mut self, fail: StencilOp, depth_fail: StencilOp, pass: StencilOp) {
        // SAFETY: plain state change on a current context.
        unsafe {
            self.gl
                .stencil_op(fail.into_gl(), depth_fail.into_gl(), pass.into_gl())
        };
    }

    fn front_face(&mut self, winding: Winding) {
        // SAFETY: plain state change on a current context.
        unsafe { self.gl.front_face(winding.into_gl()) };
    }

    fn polygon_mode(&mut self, mode: PolygonMode) {
        // SAFETY: plain state change on a current context.
        unsafe { self.gl.polygon_mode(glow::FRONT_AND_BACK, mode.into_gl()) };
    }

    fn color_mask(&mut self, enabled: bool) {
        // SAFETY: plain state change on a current context.
        unsafe { self.gl.color_mask(enabled, enabled, enabled, enabled) };
    }

    fn viewport(&mut self, viewport: Viewport) {
        // SAFETY: plain state change on a current context.
        unsafe {
            self.gl.viewport(
                viewport.x as i32,
                viewport.y as i32,
                viewport.width as i32,
                viewport.height as i32,
            )
        };
    }

    fn viewport_array(&mut self, viewports: [Viewport; 2]) {
        let values = [viewports[0].to_array(), viewports[1].to_array()];
        // SAFETY: plain state change on a current context.
        unsafe { self.gl.viewport_f32_slice(0, 2, &values) };
    }

    // --- Draws ---

    fn draw_arrays(&mut self, mode: DrawMode, first: u32, count: u32) {
        // SAFETY: the context checked ranges against the bound buffers before drawing.
        unsafe {
            self.gl
                .draw_arrays(mode.into_gl(), first as i32, count as i32)
        };
    }

    fn draw_arrays_instanced(&mut self, mode: DrawMode, first: u32, count: u32, instances: u32) {
        // SAFETY: the context checked ranges against the bound buffers before drawing.
        unsafe {
            self.gl.draw_arrays_instanced(
                mode.into_gl(),
                first as i32,
                count as i32,
                instances as i32,
            )
        };
    }

    fn draw_elements(&mut self, mode: DrawMode, count: u32, format: IndexFormat, offset: u64) {
        // SAFETY: the context checked ranges against the bound buffers before drawing.
        unsafe {
            self.gl
                .draw_elements(mode.into_gl(), count as i32, format.into_gl(), offset as i32)
        };
    }

    fn draw_elements_instanced(
        &mut self,
        mode: DrawMode,
        count: u32,
        format: IndexFormat,
        offset: u64,
        instances: u32,
    ) {
        // SAFETY: the context checked ranges against the bound buffers before drawing.
        unsafe {
            self.gl.draw_elements_instanced(
                mode.into_gl(),
                count as i32,
                format.into_gl(),
                offset as i32,
                instances as i32,
            )
        };
    }
}
