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

//! The low-level device contract implemented by every graphics backend.

use crate::math::Extent3D;
use crate::renderer::api::*;
use crate::renderer::error::{ResourceError, ShaderError};
use std::fmt::Debug;

/// A GL-shaped graphics device.
///
/// The trait is deliberately fine grained: every method maps to one
/// hardware state change or object operation. Deciding *whether* a call is
/// needed belongs to the state cache in `ember-render`; a device only
/// decides *how* to perform it. All calls happen on the rendering thread.
///
/// Binding methods take `Option<Id>`, where `None` binds the zero object.
pub trait GpuDevice: Debug + 'static {
    // --- Capabilities ---

    /// Returns the optional features this device supports.
    fn features(&self) -> DeviceFeatures;

    /// Returns the hardware limits of this device.
    fn limits(&self) -> GraphicsLimits;

    // --- Global state ---

    /// Switches a global capability on or off.
    fn set_capability(&mut self, capability: Capability, enabled: bool);

    /// Sets the row alignment used when reading pixel uploads.
    fn set_unpack_alignment(&mut self, alignment: u32);

    // --- Buffers ---

    /// Creates a new, unallocated buffer object.
    /// ## Returns
    /// The id of the buffer.
    /// ## Errors
    /// * `ResourceError::OutOfMemory` - If the device cannot create more objects.
    fn create_buffer(&mut self) -> Result<BufferId, ResourceError>;

    /// Deletes a buffer object.
    fn destroy_buffer(&mut self, id: BufferId);

    /// Binds a buffer to a target.
    fn bind_buffer(&mut self, target: BufferTarget, id: Option<BufferId>);

    /// Binds a buffer to an indexed slot of a target (uniform block slots).
    fn bind_buffer_base(&mut self, target: BufferTarget, slot: u32, id: Option<BufferId>);

    /// (Re)allocates the storage of the buffer bound to `target`.
    /// ## Arguments
    /// * `target` - The binding point whose buffer is allocated.
    /// * `size` - The new size in bytes.
    /// * `data` - Initial contents, or `None` to leave the storage undefined.
    /// * `hint` - How often the contents are expected to change.
    /// ## Errors
    /// * `ResourceError::OutOfMemory` - If the allocation fails.
    fn buffer_data(
        &mut self,
        target: BufferTarget,
        size: u64,
        data: Option<&[u8]>,
        hint: BufferUsageHint,
    ) -> Result<(), ResourceError>;

    /// Overwrites a byte range of the buffer bound to `target`.
    fn buffer_sub_data(&mut self, target: BufferTarget, offset: u64, data: &[u8]);

    /// Makes every access in `before` visible to accesses in `after`.
    fn memory_barrier(&mut self, before: GpuAccess, after: GpuAccess);

    // --- Vertex arrays ---

    /// Creates a vertex array object.
    /// ## Errors
    /// * `ResourceError::OutOfMemory` - If the device cannot create more objects.
    fn create_vertex_array(&mut self) -> Result<VertexArrayId, ResourceError>;

    /// Deletes a vertex array object.
    fn destroy_vertex_array(&mut self, id: VertexArrayId);

    /// Binds a vertex array object.
    fn bind_vertex_array(&mut self, id: Option<VertexArrayId>);

    /// Enables or disables an attribute slot of the bound vertex array.
    fn set_attribute_enabled(&mut self, location: u32, enabled: bool);

    /// Points an attribute slot at the buffer bound to [`BufferTarget::Array`].
    fn attribute_pointer(&mut self, location: u32, pointer: AttributePointer);

    /// Sets the instancing divisor of an attribute slot.
    fn attribute_divisor(&mut self, location: u32, divisor: u32);

    /// Sets the value a disabled attribute slot reads.
    fn attribute_default(&mut self, location: u32, value: [f32; 4]);

    // --- Textures ---

    /// Creates a texture object.
    /// ## Errors
    /// * `ResourceError::OutOfMemory` - If the device cannot create more objects.
    fn create_texture(&mut self) -> Result<TextureId, ResourceError>;

    /// Creates a texture that aliases part of `source`'s storage.
    ///
    /// Offsets in `range` are relative to `source`, which may itself be a view.
    ///
    /// ## Errors
    /// * `ConfigError::IncompatibleView` - If the device cannot alias storage.
    fn create_texture_view(
        &mut self,
        source: TextureId,
        texture_type: TextureType,
        format: TextureFormat,
        srgb: bool,
        range: TextureSubrange,
    ) -> Result<TextureId, ResourceError>;

    /// Deletes a texture object.
    fn destroy_texture(&mut self, id: TextureId);

    /// Makes `slot` active and binds a texture of `texture_type` to it.
    fn bind_texture(&mut self, slot: u32, texture_type: TextureType, id: Option<TextureId>);

    /// Allocates immutable storage for the texture bound to the active slot.
    /// ## Arguments
    /// * `texture_type` - The texture's dimensionality.
    /// * `levels` - Number of mip levels.
    /// * `format` - The pixel format.
    /// * `srgb` - Use the sRGB variant of `format` when one exists.
    /// * `size` - Extent of level zero.
    /// ## Errors
    /// * `ResourceError::OutOfMemory` - If the allocation fails.
    fn texture_storage(
        &mut self,
        texture_type: TextureType,
        levels: u32,
        format: TextureFormat,
        srgb: bool,
        size: Extent3D,
    ) -> Result<(), ResourceError>;

    /// Uploads uncompressed texels into a region of the bound texture.
    fn texture_sub_image(
        &mut self,
        texture_type: TextureType,
        region: TextureRegion,
        format: TextureFormat,
        data: &[u8],
    );

    /// Uploads one compressed level of the bound texture.
    fn compressed_texture_image(
        &mut self,
        texture_type: TextureType,
        region: TextureRegion,
        format: TextureFormat,
        srgb: bool,
        data: &[u8],
    );

    /// Regenerates the mip chain of the bound texture from level zero.
    fn generate_mipmaps(&mut self, texture_type: TextureType);

    /// Applies a filter to the bound texture.
    fn texture_filter(&mut self, texture_type: TextureType, filter: TextureFilter, mipmapped: bool);

    /// Applies wrap modes to the bound texture.
    fn texture_wrap(&mut self, texture_type: TextureType, wrap: TextureWrap);

    // --- Framebuffers ---

    /// Creates a framebuffer object.
    /// ## Errors
    /// * `ResourceError::OutOfMemory` - If the device cannot create more objects.
    fn create_framebuffer(&mut self) -> Result<FramebufferId, ResourceError>;

    /// Deletes a framebuffer object.
    fn destroy_framebuffer(&mut self, id: FramebufferId);

    /// Binds a framebuffer; `None` binds the window's default framebuffer.
    fn bind_framebuffer(&mut self, target: FramebufferTarget, id: Option<FramebufferId>);

    /// Attaches level `level` of a 2D texture to the bound framebuffer.
    fn framebuffer_texture(
        &mut self,
        attachment: Attachment,
        texture: Option<TextureId>,
        level: u32,
    );

    /// Attaches one layer of level `level` of a texture to the bound framebuffer.
    ///
    /// Cube layers select a face; 2D textures ignore `layer`.
    fn framebuffer_texture_layer(
        &mut self,
        attachment: Attachment,
        texture_type: TextureType,
        texture: Option<TextureId>,
        level: u32,
        layer: u32,
    );

    /// Creates a renderbuffer with storage.
    /// ## Arguments
    /// * `format` - The pixel format.
    /// * `srgb` - Use the sRGB variant of `format` when one exists.
    /// * `samples` - Samples per pixel; 0 for a single-sampled buffer.
    /// * `width`, `height` - The size in pixels.
    /// ## Errors
    /// * `ResourceError::OutOfMemory` - If the allocation fails.
    fn create_renderbuffer(
        &mut self,
        format: TextureFormat,
        srgb: bool,
        samples: u32,
        width: u32,
        height: u32,
    ) -> Result<RenderbufferId, ResourceError>;

    /// Deletes a renderbuffer.
    fn destroy_renderbuffer(&mut self, id: RenderbufferId);

    /// Attaches a renderbuffer to the bound framebuffer.
    fn framebuffer_renderbuffer(&mut self, attachment: Attachment, id: RenderbufferId);

    /// Enables the first `count` color attachments as draw buffers.
    fn draw_buffers(&mut self, count: u32);

    /// Checks the completeness of the bound framebuffer.
    fn framebuffer_status(&mut self) -> FramebufferStatus;

    /// Copies color from the read framebuffer to the draw framebuffer with linear filtering.
    fn blit_framebuffer(&mut self, width: u32, height: u32);

    /// Clears one draw buffer of the bound framebuffer to a color.
    fn clear_color(&mut self, draw_buffer: u32, color: [f32; 4]);

    /// Clears the depth buffer of the bound framebuffer.
    fn clear_depth(&mut self, depth: f32);

    /// Clears the stencil buffer of the bound framebuffer.
    fn clear_stencil(&mut self, value: i32);

    /// Reads a region of the bound framebuffer into `out` as RGBA8 rows.
    fn read_pixels(&mut self, x: u32, y: u32, width: u32, height: u32, out: &mut [u8]);

    // --- Programs ---

    /// Compiles one stage.
    /// ## Errors
    /// * `ShaderError::CompilationError` - With the driver log when compilation fails.
    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<ShaderModuleId, ShaderError>;

    /// Links two stages into a program and consumes them.
    /// ## Arguments
    /// * `vertex`, `fragment` - Compiled stages.
    /// * `attributes` - Fixed `(name, location)` bindings applied before linking.
    /// ## Errors
    /// * `ShaderError::LinkError` - With the driver log when linking fails.
    fn link_program(
        &mut self,
        vertex: ShaderModuleId,
        fragment: ShaderModuleId,
        attributes: &[(&str, u32)],
    ) -> Result<ProgramId, ShaderError>;

    /// Deletes a program.
    fn destroy_program(&mut self, id: ProgramId);

    /// Deletes a compiled stage that will not be linked.
    fn destroy_shader_module(&mut self, id: ShaderModuleId);

    /// Makes a program current.
    fn use_program(&mut self, id: Option<ProgramId>);

    /// Lists the active uniforms of a program.
    fn active_uniforms(&mut self, program: ProgramId) -> Vec<ActiveUniform>;

    /// Lists the active uniform blocks of a program, in block-index order.
    fn active_uniform_blocks(&mut self, program: ProgramId) -> Vec<String>;

    /// Lists the active vertex inputs of a program.
    fn active_attributes(&mut self, program: ProgramId) -> Vec<ActiveAttribute>;

    /// Looks up a uniform location by name (`name` or `name[i]`).
    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Option<UniformLocation>;

    /// Reads the current float value(s) of a uniform into `out`.
    fn read_uniform_f32(&mut self, program: ProgramId, location: UniformLocation, out: &mut [f32]);

    /// Reads the current integer value(s) of a uniform into `out`.
    fn read_uniform_i32(&mut self, program: ProgramId, location: UniformLocation, out: &mut [i32]);

    /// Uploads values to a uniform of the current program.
    fn upload_uniform(&mut self, location: UniformLocation, upload: UniformUpload<'_>);

    /// Assigns a binding slot to a uniform block.
    fn uniform_block_binding(&mut self, program: ProgramId, block_index: u32, binding: u32);

    // --- Pipeline state ---

    /// Sets the blend equation and factors.
    fn blend_state(&mut self, state: BlendState);

    /// Sets the depth comparison; [`CompareMode::None`] maps to "always".
    fn depth_function(&mut self, mode: CompareMode);

    /// Enables or disables depth writes.
    fn depth_write(&mut self, enabled: bool);

    /// Sets the rasterized line width.
    fn line_width(&mut self, width: f32);

    /// Sets the stencil comparison, reference and read mask.
    fn stencil_function(&mut self, mode: CompareMode, reference: i32, mask: u32);

    /// Sets the stencil operations for fail, depth-fail and pass.
    fn stencil_operation(&mut self, fail: StencilOp, depth_fail: StencilOp, pass: StencilOp);

    /// Sets which winding faces front.
    fn front_face(&mut self, winding: Winding);

    /// Sets the rasterization mode for front and back faces.
    fn polygon_mode(&mut self, mode: PolygonMode);

    /// Enables or disables writes to every color channel.
    fn color_mask(&mut self, enabled: bool);

    /// Sets the single viewport.
    fn viewport(&mut self, viewport: Viewport);

    /// Sets viewports 0 and 1 for single-pass stereo.
    fn viewport_array(&mut self, viewports: [Viewport; 2]);

    // --- Draws ---

    /// Draws `count` vertices starting at `first`.
    fn draw_arrays(&mut self, mode: DrawMode, first: u32, count: u32);

    /// Draws `count` vertices `instances` times.
    fn draw_arrays_instanced(&mut self, mode: DrawMode, first: u32, count: u32, instances: u32);

    /// Draws `count` indices read at byte `offset` of the bound index buffer.
    fn draw_elements(&mut self, mode: DrawMode, count: u32, format: IndexFormat, offset: u64);

    /// Draws `count` indices `instances` times.
    fn draw_elements_instanced(
        &mut self,
        mode: DrawMode,
        count: u32,
        format: IndexFormat,
        offset: u64,
        instances: u32,
    );
}
