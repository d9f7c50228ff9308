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

//! Canvases: off-screen render targets.

use crate::arena::{CanvasHandle, TextureHandle};
use crate::context::GraphicsContext;
use crate::sync::SyncResource;
use ember_core::math::Extent3D;
use ember_core::renderer::{
    Attachment, CanvasFlags, ConfigError, FramebufferId, FramebufferStatus, FramebufferTarget,
    GpuAccess, GpuDevice, MipmapCount, RenderbufferId, ResourceError, TextureDescriptor,
    TextureFormat, TextureType, TextureUsage,
};

/// A texture bundled with the framebuffers that render into it.
///
/// Multisampled canvases render into a renderbuffer and copy into the
/// texture on [`GraphicsContext::resolve_canvas`].
#[derive(Debug)]
pub struct Canvas {
    pub(crate) texture: TextureHandle,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) flags: CanvasFlags,
    pub(crate) framebuffer: FramebufferId,
    pub(crate) resolve_framebuffer: Option<FramebufferId>,
    pub(crate) msaa_buffer: Option<RenderbufferId>,
    pub(crate) depth_buffer: Option<RenderbufferId>,
}

impl Canvas {
    /// The color texture.
    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    /// Width and height in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// The flags the canvas was created with, with MSAA clamped to the device limit.
    pub fn flags(&self) -> CanvasFlags {
        self.flags
    }

    /// The framebuffer draws go to.
    pub fn framebuffer(&self) -> FramebufferId {
        self.framebuffer
    }

    /// The framebuffer holding the resolved texture, or the draw framebuffer
    /// when the canvas is not multisampled.
    pub(crate) fn read_framebuffer(&self) -> FramebufferId {
        self.resolve_framebuffer.unwrap_or(self.framebuffer)
    }

    /// Deletes the framebuffers and renderbuffers. The texture is released separately.
    pub(crate) fn destroy_attachments<D: GpuDevice>(&self, device: &mut D) {
        device.destroy_framebuffer(self.framebuffer);
        if let Some(resolve) = self.resolve_framebuffer {
            device.destroy_framebuffer(resolve);
        }
        if let Some(msaa) = self.msaa_buffer {
            device.destroy_renderbuffer(msaa);
        }
        if let Some(depth) = self.depth_buffer {
            device.destroy_renderbuffer(depth);
        }
    }
}

/// Device objects of a canvas under construction, torn down if a step fails.
#[derive(Debug, Default)]
struct Attachments {
    framebuffer: Option<FramebufferId>,
    resolve_framebuffer: Option<FramebufferId>,
    msaa_buffer: Option<RenderbufferId>,
    depth_buffer: Option<RenderbufferId>,
}

impl<D: GpuDevice> GraphicsContext<D> {
    /// Creates a canvas.
    ///
    /// The new canvas is cleared to transparent black, depth 1 and stencil 0.
    ///
    /// ## Errors
    /// * `ConfigError::UnsupportedCanvasFormat` - For compressed and depth formats.
    /// * `ConfigError::IncompleteFramebuffer` - If the device rejects the attachments.
    pub fn create_canvas(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
        flags: CanvasFlags,
    ) -> Result<CanvasHandle, ResourceError> {
        if !format.is_color_renderable() {
            return Err(ConfigError::UnsupportedCanvasFormat(format).into());
        }
        let mut flags = flags;
        flags.msaa = flags.msaa.min(self.limits.texture_msaa);

        let descriptor = TextureDescriptor {
            label: Some("canvas".into()),
            texture_type: TextureType::D2,
            format,
            size: Extent3D::d2(width, height),
            mipmaps: if flags.mipmaps {
                MipmapCount::Auto
            } else {
                MipmapCount::Count(1)
            },
            samples: 1,
            usage: TextureUsage::RENDER | TextureUsage::SAMPLE,
            srgb: self.config.gamma_correct,
        };
        let texture = self.create_texture(&descriptor, &[])?;

        let mut attachments = Attachments::default();
        match self.build_attachments(texture, width, height, format, flags, &mut attachments) {
            Ok(framebuffer) => {
                let handle = self.canvases.insert(Canvas {
                    texture,
                    width,
                    height,
                    flags,
                    framebuffer,
                    resolve_framebuffer: attachments.resolve_framebuffer,
                    msaa_buffer: attachments.msaa_buffer,
                    depth_buffer: attachments.depth_buffer,
                });
                log::debug!("Created canvas {handle:?} ({width}x{height}, {format:?}, {flags:?})");
                Ok(handle)
            }
            Err(e) => {
                for framebuffer in [attachments.framebuffer, attachments.resolve_framebuffer]
                    .into_iter()
                    .flatten()
                {
                    self.state.forget_framebuffer(framebuffer);
                    self.device.destroy_framebuffer(framebuffer);
                }
                for renderbuffer in [attachments.msaa_buffer, attachments.depth_buffer]
                    .into_iter()
                    .flatten()
                {
                    self.device.destroy_renderbuffer(renderbuffer);
                }
                self.destroy_texture(texture)?;
                Err(e)
            }
        }
    }

    fn build_attachments(
        &mut self,
        texture: TextureHandle,
        width: u32,
        height: u32,
        format: TextureFormat,
        flags: CanvasFlags,
        out: &mut Attachments,
    ) -> Result<FramebufferId, ResourceError> {
        let texture_id = self.textures.get(texture)?.id;
        let srgb = self.config.gamma_correct;

        let framebuffer = self.device.create_framebuffer()?;
        out.framebuffer = Some(framebuffer);
        self.state.bind_framebuffer(&mut self.device, Some(framebuffer));

        if flags.msaa > 0 {
            let buffer = self
                .device
                .create_renderbuffer(format, srgb, flags.msaa, width, height)?;
            out.msaa_buffer = Some(buffer);
            self.device
                .framebuffer_renderbuffer(Attachment::Color(0), buffer);
        } else {
            self.device
                .framebuffer_texture(Attachment::Color(0), Some(texture_id), 0);
        }

        if flags.depth || flags.stencil {
            let (depth_format, attachment) = if flags.stencil {
                (TextureFormat::Depth24Stencil8, Attachment::DepthStencil)
            } else {
                (TextureFormat::Depth24, Attachment::Depth)
            };
            let buffer = self
                .device
                .create_renderbuffer(depth_format, false, flags.msaa, width, height)?;
            out.depth_buffer = Some(buffer);
            self.device.framebuffer_renderbuffer(attachment, buffer);
        }

        if flags.msaa > 0 {
            let resolve = self.device.create_framebuffer()?;
            out.resolve_framebuffer = Some(resolve);
            self.state.bind_framebuffer(&mut self.device, Some(resolve));
            self.device
                .framebuffer_texture(Attachment::Color(0), Some(texture_id), 0);
            self.state.bind_framebuffer(&mut self.device, Some(framebuffer));
        }

        self.check_framebuffer()?;

        self.device.clear_color(0, [0.0; 4]);
        if flags.depth || flags.stencil {
            self.state.set_depth_write(&mut self.device, true);
            self.device.clear_depth(1.0);
        }
        if flags.stencil {
            self.device.clear_stencil(0);
        }
        Ok(framebuffer)
    }

    /// Checks the bound framebuffer, mapping failures to configuration errors.
    pub(crate) fn check_framebuffer(&mut self) -> Result<(), ConfigError> {
        match self.device.framebuffer_status() {
            FramebufferStatus::Complete => Ok(()),
            status => {
                log::warn!("Framebuffer is incomplete: {status:?}");
                Err(ConfigError::IncompleteFramebuffer(format!("{status:?}")))
            }
        }
    }

    /// Resolves a canvas so its texture can be sampled.
    ///
    /// Multisampled content is copied into the texture and the mip chain is
    /// regenerated when the canvas was created with mipmaps. Call it after
    /// the last draw into the canvas and before reading its texture.
    pub fn resolve_canvas(&mut self, handle: CanvasHandle) -> Result<(), ResourceError> {
        let canvas = self.canvases.get(handle)?;
        let (texture, flags) = (canvas.texture, canvas.flags);
        let (width, height) = (canvas.width, canvas.height);

        if let Some(resolve) = canvas.resolve_framebuffer {
            let framebuffer = canvas.framebuffer;
            self.device
                .bind_framebuffer(FramebufferTarget::Read, Some(framebuffer));
            self.device
                .bind_framebuffer(FramebufferTarget::Draw, Some(resolve));
            self.device.blit_framebuffer(width, height);
            let current = self.state.framebuffer();
            self.device.bind_framebuffer(FramebufferTarget::Both, current);
        }

        if flags.mipmaps {
            self.bind_texture_slot(0, Some(texture))?;
            self.device.generate_mipmaps(TextureType::D2);
        }
        Ok(())
    }

    /// Reads the canvas back as tightly packed RGBA8 rows.
    pub fn canvas_pixels(&mut self, handle: CanvasHandle) -> Result<Vec<u8>, ResourceError> {
        let canvas = self.canvases.get(handle)?;
        let (texture, framebuffer) = (canvas.texture, canvas.read_framebuffer());
        let (width, height) = (canvas.width, canvas.height);

        self.track(SyncResource::Texture(texture), GpuAccess::DOWNLOAD_READ);
        self.state.bind_framebuffer(&mut self.device, Some(framebuffer));
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        self.device.read_pixels(0, 0, width, height, &mut pixels);
        Ok(pixels)
    }

    /// Resolves a canvas handle.
    pub fn canvas(&self, handle: CanvasHandle) -> Result<&Canvas, ResourceError> {
        self.canvases.get(handle)
    }

    /// The color texture of a canvas.
    pub fn canvas_texture(&self, handle: CanvasHandle) -> Result<TextureHandle, ResourceError> {
        Ok(self.canvases.get(handle)?.texture)
    }

    /// Drops a reference to a canvas, destroying it when none remain.
    ///
    /// The color texture survives while other references to it exist.
    pub fn destroy_canvas(&mut self, handle: CanvasHandle) -> Result<(), ResourceError> {
        let Some(canvas) = self.canvases.release(handle)? else {
            return Ok(());
        };
        self.state.forget_canvas(handle);
        self.state.forget_framebuffer(canvas.framebuffer);
        if let Some(resolve) = canvas.resolve_framebuffer {
            self.state.forget_framebuffer(resolve);
        }
        canvas.destroy_attachments(&mut self.device);
        self.destroy_texture(canvas.texture)?;
        log::debug!("Destroyed canvas {handle:?}");
        Ok(())
    }
}
