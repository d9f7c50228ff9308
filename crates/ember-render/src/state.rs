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

//! Memoization of hardware state.
//!
//! The [`StateCache`] records the last value applied for every binding and
//! pipeline toggle. Each setter compares first and only calls the device on
//! an actual change, so the number of device calls equals the number of
//! distinct consecutive values rather than the number of requests.

use crate::arena::{CanvasHandle, TextureHandle};
use ember_core::renderer::{
    BlendAlphaMode, BlendMode, BlendState, BufferId, BufferTarget, Capability, CompareMode,
    ConfigError, FramebufferId, FramebufferTarget, GpuDevice, GraphicsStats, PipelineState,
    PolygonMode, ProgramId, StencilAction, StencilOp, TextureId, TextureType, VertexArrayId,
    Viewport, Winding,
};

/// A texture bound to a sampler slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding {
    /// The resource bound.
    pub handle: TextureHandle,
    /// Its device texture.
    pub id: TextureId,
    /// Its dimensionality, which selects the bind target.
    pub texture_type: TextureType,
}

/// The last-applied hardware state of one context.
#[derive(Debug)]
pub struct StateCache {
    // --- Bindings ---
    program: Option<ProgramId>,
    vertex_array: Option<VertexArrayId>,
    vertex_buffer: Option<BufferId>,
    index_buffer: Option<BufferId>,
    uniform_buffers: Vec<Option<BufferId>>,
    textures: Vec<Option<TextureBinding>>,
    framebuffer: Option<FramebufferId>,
    viewport: Option<Viewport>,
    viewport_array: Option<[Viewport; 2]>,
    canvases: Vec<CanvasHandle>,

    // --- Pipeline toggles ---
    blend: Option<(BlendMode, BlendAlphaMode)>,
    culling: bool,
    depth_enabled: bool,
    depth_test: CompareMode,
    depth_write: bool,
    line_width: f32,
    stencil_enabled: bool,
    stencil: Option<(CompareMode, i32)>,
    stencil_writing: bool,
    winding: Winding,
    wireframe: bool,

    stats: GraphicsStats,
}

impl StateCache {
    /// Creates a cache describing a freshly initialized device.
    ///
    /// The blend mode starts unknown so that the first draw always applies it.
    pub fn new(texture_slots: u32, uniform_buffer_slots: u32) -> Self {
        Self {
            program: None,
            vertex_array: None,
            vertex_buffer: None,
            index_buffer: None,
            uniform_buffers: vec![None; uniform_buffer_slots as usize],
            textures: vec![None; texture_slots as usize],
            framebuffer: None,
            viewport: None,
            viewport_array: None,
            canvases: Vec::new(),
            blend: None,
            culling: false,
            depth_enabled: false,
            depth_test: CompareMode::Less,
            depth_write: true,
            line_width: 1.0,
            stencil_enabled: false,
            stencil: Some((CompareMode::None, 0)),
            stencil_writing: false,
            winding: Winding::CounterClockwise,
            wireframe: false,
            stats: GraphicsStats::default(),
        }
    }

    // --- Statistics ---

    /// Counters accumulated since the last reset.
    pub fn stats(&self) -> GraphicsStats {
        self.stats
    }

    /// Returns the counters and starts a new frame.
    pub fn reset_stats(&mut self) -> GraphicsStats {
        std::mem::take(&mut self.stats)
    }

    pub(crate) fn count_draw(&mut self) {
        self.stats.draw_calls += 1;
    }

    pub(crate) fn count_barrier(&mut self) {
        self.stats.barriers += 1;
    }

    fn changed(&mut self) {
        self.stats.state_changes += 1;
    }

    // --- Bindings ---

    /// Makes a program current. Counts as a shader switch.
    pub fn use_program<D: GpuDevice>(&mut self, device: &mut D, program: Option<ProgramId>) {
        if self.program != program {
            device.use_program(program);
            self.program = program;
            self.stats.shader_switches += 1;
        }
    }

    /// The current program.
    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    /// Binds a vertex array.
    ///
    /// The index buffer binding lives inside the vertex array, so switching
    /// arrays makes the recorded index buffer unknown.
    pub fn bind_vertex_array<D: GpuDevice>(&mut self, device: &mut D, id: Option<VertexArrayId>) {
        if self.vertex_array != id {
            device.bind_vertex_array(id);
            self.vertex_array = id;
            self.index_buffer = None;
            self.changed();
        }
    }

    /// Binds a buffer to the vertex attribute target.
    pub fn bind_vertex_buffer<D: GpuDevice>(&mut self, device: &mut D, id: Option<BufferId>) {
        if self.vertex_buffer != id {
            device.bind_buffer(BufferTarget::Array, id);
            self.vertex_buffer = id;
            self.changed();
        }
    }

    /// Binds a buffer to the index target of the current vertex array.
    pub fn bind_index_buffer<D: GpuDevice>(&mut self, device: &mut D, id: Option<BufferId>) {
        if self.index_buffer != id {
            device.bind_buffer(BufferTarget::ElementArray, id);
            self.index_buffer = id;
            self.changed();
        }
    }

    /// Binds a buffer to a uniform block slot.
    pub fn bind_uniform_buffer<D: GpuDevice>(
        &mut self,
        device: &mut D,
        slot: u32,
        id: Option<BufferId>,
    ) -> Result<(), ConfigError> {
        let max = self.uniform_buffers.len() as u32;
        let current = self
            .uniform_buffers
            .get_mut(slot as usize)
            .ok_or(ConfigError::SlotOutOfRange { slot, max })?;
        if *current != id {
            device.bind_buffer_base(BufferTarget::Uniform, slot, id);
            *current = id;
            self.changed();
        }
        Ok(())
    }

    /// Binds a texture to a sampler slot.
    ///
    /// Returns `true` when the device was called.
    pub fn bind_texture<D: GpuDevice>(
        &mut self,
        device: &mut D,
        slot: u32,
        binding: Option<TextureBinding>,
    ) -> Result<bool, ConfigError> {
        let max = self.textures.len() as u32;
        let current = self
            .textures
            .get_mut(slot as usize)
            .ok_or(ConfigError::SlotOutOfRange { slot, max })?;
        if *current == binding {
            return Ok(false);
        }
        let texture_type = binding
            .or(*current)
            .map_or(TextureType::D2, |b| b.texture_type);
        device.bind_texture(slot, texture_type, binding.map(|b| b.id));
        *current = binding;
        self.changed();
        Ok(true)
    }

    /// The texture recorded for a slot.
    pub fn texture(&self, slot: u32) -> Option<TextureBinding> {
        self.textures.get(slot as usize).copied().flatten()
    }

    /// Forgets what a slot holds, so the next bind always reaches the device.
    pub fn dirty_texture(&mut self, slot: u32) {
        if let Some(current) = self.textures.get_mut(slot as usize) {
            *current = None;
        }
    }

    /// Binds a framebuffer for both reading and drawing.
    pub fn bind_framebuffer<D: GpuDevice>(&mut self, device: &mut D, id: Option<FramebufferId>) {
        if self.framebuffer != id {
            device.bind_framebuffer(FramebufferTarget::Both, id);
            self.framebuffer = id;
            self.changed();
        }
    }

    /// The current framebuffer.
    pub fn framebuffer(&self) -> Option<FramebufferId> {
        self.framebuffer
    }

    /// Sets the single viewport.
    pub fn set_viewport<D: GpuDevice>(&mut self, device: &mut D, viewport: Viewport) {
        if self.viewport != Some(viewport) {
            device.viewport(viewport);
            self.viewport = Some(viewport);
            self.viewport_array = None;
            self.changed();
        }
    }

    /// Sets both stereo viewports.
    pub fn set_viewport_array<D: GpuDevice>(&mut self, device: &mut D, viewports: [Viewport; 2]) {
        if self.viewport_array != Some(viewports) {
            device.viewport_array(viewports);
            self.viewport_array = Some(viewports);
            self.viewport = None;
            self.changed();
        }
    }

    /// The canvases the current framebuffer renders into.
    pub fn canvases(&self) -> &[CanvasHandle] {
        &self.canvases
    }

    pub(crate) fn set_canvases(&mut self, canvases: Vec<CanvasHandle>) {
        self.canvases = canvases;
    }

    // --- Forgetting destroyed objects ---
    //
    // Deleting a bound object reverts its binding point to zero.

    pub(crate) fn forget_texture(&mut self, handle: TextureHandle) {
        for slot in &mut self.textures {
            if slot.is_some_and(|b| b.handle == handle) {
                *slot = None;
            }
        }
    }

    pub(crate) fn forget_buffer(&mut self, id: BufferId) {
        if self.vertex_buffer == Some(id) {
            self.vertex_buffer = None;
        }
        if self.index_buffer == Some(id) {
            self.index_buffer = None;
        }
        for slot in &mut self.uniform_buffers {
            if *slot == Some(id) {
                *slot = None;
            }
        }
    }

    pub(crate) fn forget_vertex_array(&mut self, id: VertexArrayId) {
        if self.vertex_array == Some(id) {
            self.vertex_array = None;
            self.index_buffer = None;
        }
    }

    pub(crate) fn forget_program(&mut self, id: ProgramId) {
        if self.program == Some(id) {
            self.program = None;
        }
    }

    pub(crate) fn forget_framebuffer(&mut self, id: FramebufferId) {
        if self.framebuffer == Some(id) {
            self.framebuffer = None;
        }
    }

    pub(crate) fn forget_canvas(&mut self, handle: CanvasHandle) {
        if self.canvases.contains(&handle) {
            self.canvases.clear();
        }
    }

    // --- Pipeline toggles ---

    /// Diffs every pipeline toggle against the recorded state and applies the changes.
    pub fn apply_pipeline<D: GpuDevice>(&mut self, device: &mut D, state: &PipelineState) {
        let blend = (state.blend_mode, state.blend_alpha_mode);
        if self.blend != Some(blend) {
            device.blend_state(BlendState::from_modes(blend.0, blend.1));
            self.blend = Some(blend);
            self.changed();
        }

        if self.culling != state.culling {
            device.set_capability(Capability::CullFace, state.culling);
            self.culling = state.culling;
            self.changed();
        }

        self.apply_depth_test(device, state.depth_test);
        if !self.stencil_writing {
            self.set_depth_write(device, state.depth_write);
        }

        if self.line_width != state.line_width {
            device.line_width(state.line_width);
            self.line_width = state.line_width;
            self.changed();
        }

        if !self.stencil_writing {
            self.apply_stencil_test(device, state.stencil_mode, state.stencil_value);
        }

        if self.winding != state.winding {
            device.front_face(state.winding);
            self.winding = state.winding;
            self.changed();
        }

        if self.wireframe != state.wireframe {
            let mode = if state.wireframe {
                PolygonMode::Line
            } else {
                PolygonMode::Fill
            };
            device.polygon_mode(mode);
            self.wireframe = state.wireframe;
            self.changed();
        }
    }

    fn apply_depth_test<D: GpuDevice>(&mut self, device: &mut D, mode: CompareMode) {
        if mode == CompareMode::None {
            if self.depth_enabled {
                device.set_capability(Capability::DepthTest, false);
                self.depth_enabled = false;
                self.changed();
            }
            return;
        }
        if !self.depth_enabled {
            device.set_capability(Capability::DepthTest, true);
            self.depth_enabled = true;
            self.changed();
        }
        if self.depth_test != mode {
            device.depth_function(mode);
            self.depth_test = mode;
            self.changed();
        }
    }

    fn apply_stencil_test<D: GpuDevice>(&mut self, device: &mut D, mode: CompareMode, value: i32) {
        if self.stencil == Some((mode, value)) {
            return;
        }
        self.stencil = Some((mode, value));
        if mode == CompareMode::None {
            if self.stencil_enabled {
                device.set_capability(Capability::StencilTest, false);
                self.stencil_enabled = false;
                self.changed();
            }
            return;
        }
        if !self.stencil_enabled {
            device.set_capability(Capability::StencilTest, true);
            self.stencil_enabled = true;
            self.changed();
        }
        device.stencil_function(mode.inverted(), value, 0xff);
        device.stencil_operation(StencilOp::Keep, StencilOp::Keep, StencilOp::Keep);
        self.changed();
    }

    /// Enables or disables depth writes.
    pub fn set_depth_write<D: GpuDevice>(&mut self, device: &mut D, enabled: bool) {
        if self.depth_write != enabled {
            device.depth_write(enabled);
            self.depth_write = enabled;
            self.changed();
        }
    }

    /// Returns `true` while a stencil write is in progress.
    pub fn is_writing_stencil(&self) -> bool {
        self.stencil_writing
    }

    /// Switches the pipeline into stencil-writing mode.
    ///
    /// Color and depth writes are disabled and every fragment stores
    /// `action` into the stencil buffer.
    pub fn begin_stencil_write<D: GpuDevice>(
        &mut self,
        device: &mut D,
        action: StencilAction,
        value: i32,
    ) {
        self.stencil_writing = true;
        self.set_depth_write(device, false);
        device.color_mask(false);
        if !self.stencil_enabled {
            device.set_capability(Capability::StencilTest, true);
            self.stencil_enabled = true;
        }
        device.stencil_function(CompareMode::None, value, 0xff);
        device.stencil_operation(StencilOp::Keep, StencilOp::Keep, action.into());
        self.changed();
    }

    /// Leaves stencil-writing mode; the next draw reapplies its stencil test.
    pub fn end_stencil_write<D: GpuDevice>(&mut self, device: &mut D) {
        device.color_mask(true);
        self.stencil_writing = false;
        self.stencil = None;
        self.changed();
    }
}
