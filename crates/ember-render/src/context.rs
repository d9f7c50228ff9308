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

//! The graphics context: owner of every resource and of the render state.

use crate::arena::{
    BufferHandle, CanvasHandle, MeshHandle, Pool, ShaderBlockHandle, ShaderHandle, TextureHandle,
};
use crate::resources::buffer::Buffer;
use crate::resources::canvas::Canvas;
use crate::resources::mesh::Mesh;
use crate::resources::shader::Shader;
use crate::resources::shader_block::ShaderBlock;
use crate::resources::texture::Texture;
use crate::state::StateCache;
use crate::sync::{SyncResource, SyncTracker};
use ember_core::renderer::{
    Capability, DeviceFeatures, FramebufferId, GpuAccess, GpuDevice, GraphicsConfig,
    GraphicsLimits, GraphicsStats, PolygonMode, RenderError, Winding,
};

/// A single rendering context bound to one device.
///
/// All resources are created, used and destroyed through the context. It is
/// driven from one thread; embedding it in a multi-threaded host requires
/// the host to serialize every call.
#[derive(Debug)]
pub struct GraphicsContext<D: GpuDevice> {
    pub(crate) device: D,
    pub(crate) config: GraphicsConfig,
    pub(crate) features: DeviceFeatures,
    pub(crate) limits: GraphicsLimits,
    pub(crate) state: StateCache,
    pub(crate) sync: SyncTracker,

    pub(crate) buffers: Pool<BufferHandle, Buffer>,
    pub(crate) textures: Pool<TextureHandle, Texture>,
    pub(crate) meshes: Pool<MeshHandle, Mesh>,
    pub(crate) shaders: Pool<ShaderHandle, Shader>,
    pub(crate) blocks: Pool<ShaderBlockHandle, ShaderBlock>,
    pub(crate) canvases: Pool<CanvasHandle, Canvas>,

    /// 1x1 white texture bound in place of missing samplers, created on first use.
    pub(crate) default_texture: Option<TextureHandle>,
    /// Canvas whose framebuffer holds extra color targets, with the
    /// attached textures; each holds a reference.
    pub(crate) attached_targets: Option<(CanvasHandle, Vec<TextureHandle>)>,
    /// Framebuffer texture readback attaches to, created on first use.
    pub(crate) readback_framebuffer: Option<FramebufferId>,
}

impl<D: GpuDevice> GraphicsContext<D> {
    /// Creates a context and resets the device to the known default state.
    ///
    /// ## Arguments
    /// * `device` - The device every operation is issued to.
    /// * `config` - Context configuration.
    ///
    /// ## Errors
    /// * `RenderError::InitializationFailed` - If the configuration is unusable.
    pub fn new(mut device: D, config: GraphicsConfig) -> Result<Self, RenderError> {
        if config.max_texture_slots == 0 || config.max_canvases == 0 {
            return Err(RenderError::InitializationFailed(
                "at least one texture slot and one canvas are required".to_string(),
            ));
        }

        let features = device.features();
        let limits = device.limits();
        log::info!(
            "Initializing graphics context (gamma correct: {}, single-pass stereo: {}, max texture size: {})",
            config.gamma_correct,
            features.single_pass_stereo,
            limits.texture_size
        );

        device.set_capability(Capability::Blend, true);
        device.set_capability(Capability::CullFace, false);
        device.set_capability(Capability::DepthTest, false);
        device.set_capability(Capability::StencilTest, false);
        device.set_capability(Capability::ProgramPointSize, true);
        device.set_capability(Capability::FramebufferSrgb, config.gamma_correct);
        device.depth_write(true);
        device.line_width(1.0);
        device.front_face(Winding::CounterClockwise);
        device.polygon_mode(PolygonMode::Fill);
        device.set_unpack_alignment(1);

        let state = StateCache::new(config.max_texture_slots, config.max_uniform_buffers);

        Ok(Self {
            device,
            config,
            features,
            limits,
            state,
            sync: SyncTracker::new(),
            buffers: Pool::new("buffer"),
            textures: Pool::new("texture"),
            meshes: Pool::new("mesh"),
            shaders: Pool::new("shader"),
            blocks: Pool::new("shader block"),
            canvases: Pool::new("canvas"),
            default_texture: None,
            attached_targets: None,
            readback_framebuffer: None,
        })
    }

    // --- Accessors ---

    /// The device this context drives.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Mutable access to the device, for collaborators that issue their own calls.
    ///
    /// Calls made this way bypass the state cache; follow them with
    /// [`GraphicsContext::dirty_texture_slot`] where they touch texture slots.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// The configuration the context was created with.
    pub fn config(&self) -> &GraphicsConfig {
        &self.config
    }

    /// The optional features the device reported.
    pub fn features(&self) -> DeviceFeatures {
        self.features
    }

    /// The hardware limits the device reported.
    pub fn limits(&self) -> GraphicsLimits {
        self.limits
    }

    /// The state cache.
    pub fn state(&self) -> &StateCache {
        &self.state
    }

    /// The synchronization tracker.
    pub fn sync(&self) -> &SyncTracker {
        &self.sync
    }

    /// The statistics of the frame in progress.
    pub fn stats(&self) -> GraphicsStats {
        self.state.stats()
    }

    // --- Frame boundary ---

    /// Ends the frame, returning its statistics and resetting the counters.
    pub fn present(&mut self) -> GraphicsStats {
        let stats = self.state.reset_stats();
        log::trace!("Frame presented: {stats:?}");
        stats
    }

    /// Forgets the cached binding of a texture slot.
    ///
    /// Used after a collaborator (a headset compositor) changed the slot
    /// behind the cache's back.
    pub fn dirty_texture_slot(&mut self, slot: u32) {
        self.state.dirty_texture(slot);
    }

    /// Records an access and issues the barrier it requires, if any.
    pub(crate) fn track(&mut self, resource: SyncResource, access: GpuAccess) {
        if let Some(barrier) = self.sync.access(resource, access) {
            if self.features.memory_barriers {
                self.device.memory_barrier(barrier.before, barrier.after);
            }
            self.state.count_barrier();
        }
    }
}

impl<D: GpuDevice> Drop for GraphicsContext<D> {
    fn drop(&mut self) {
        let (meshes, shaders, canvases) = (
            self.meshes.drain(),
            self.shaders.drain(),
            self.canvases.drain(),
        );
        for mesh in meshes {
            self.device.destroy_vertex_array(mesh.vao);
            self.device.destroy_buffer(mesh.vbo);
            self.device.destroy_buffer(mesh.ibo);
        }
        for shader in shaders {
            self.device.destroy_program(shader.program);
        }
        for canvas in canvases {
            canvas.destroy_attachments(&mut self.device);
        }
        self.blocks.drain();
        for buffer in self.buffers.drain() {
            self.device.destroy_buffer(buffer.id);
        }
        for texture in self.textures.drain() {
            self.device.destroy_texture(texture.id);
        }
        if let Some(framebuffer) = self.readback_framebuffer.take() {
            self.device.destroy_framebuffer(framebuffer);
        }
        self.default_texture = None;
        log::info!("Graphics context shut down");
    }
}
