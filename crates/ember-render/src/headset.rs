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

//! Rendering for a headset compositor.
//!
//! Both eyes are drawn side by side into one canvas, which is then handed
//! to the driver half by half.

use crate::arena::CanvasHandle;
use crate::context::GraphicsContext;
use crate::draw::Camera;
use ember_core::math::{Mat4, Vec3};
use ember_core::renderer::{
    CanvasFlags, Eye, GpuDevice, HeadsetDriver, ResourceError, TextureFormat, Viewport,
};

/// Texture bounds submitted for each eye, as `[u_min, v_min, u_max, v_max]`.
const EYE_BOUNDS: [[f32; 4]; 2] = [[0.0, 0.0, 0.5, 1.0], [0.5, 0.0, 1.0, 1.0]];

/// Owns the stereo canvas a headset is rendered into.
#[derive(Debug, Default)]
pub struct HeadsetRenderer {
    canvas: Option<CanvasHandle>,
}

/// Builds the stereo camera for the driver's current pose.
fn stereo_camera<H: HeadsetDriver>(
    driver: &H,
    canvas: CanvasHandle,
    width: u32,
    height: u32,
) -> Camera {
    let (near, far) = driver.clip_distance();
    let origin = Mat4::from_translation(Vec3::new(0.0, driver.offset(), 0.0));
    let head = driver.head_pose();

    let (w, h) = (width as f32, height as f32);
    let mut camera = Camera {
        stereo: true,
        canvas: Some(canvas),
        viewports: [Viewport::new(0.0, 0.0, w, h), Viewport::new(w, 0.0, w, h)],
        ..Camera::default()
    };
    for eye in Eye::BOTH {
        let i = eye.index();
        camera.projections[i] = driver.projection(eye, near, far);
        camera.views[i] = (origin * head * driver.eye_to_head(eye)).inverse();
    }
    camera
}

impl HeadsetRenderer {
    /// Creates a renderer; the canvas is allocated on the first frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stereo canvas, once created.
    pub fn canvas(&self) -> Option<CanvasHandle> {
        self.canvas
    }

    /// Renders one frame for the headset.
    ///
    /// `callback` is invoked exactly once with a stereo camera targeting the
    /// side-by-side canvas. The canvas is then resolved and each half is
    /// submitted to the driver.
    ///
    /// ## Arguments
    /// * `context` - The context to render with.
    /// * `driver` - The headset runtime.
    /// * `callback` - Records the frame's draws.
    pub fn render_to<D, H, F>(
        &mut self,
        context: &mut GraphicsContext<D>,
        driver: &mut H,
        callback: F,
    ) -> Result<(), ResourceError>
    where
        D: GpuDevice,
        H: HeadsetDriver,
        F: FnOnce(&mut GraphicsContext<D>, &Camera) -> Result<(), ResourceError>,
    {
        let (width, height) = driver.recommended_size();
        let canvas = match self.canvas {
            Some(canvas) => canvas,
            None => {
                let flags = CanvasFlags {
                    depth: true,
                    stencil: true,
                    msaa: context.config().msaa,
                    mipmaps: false,
                };
                let canvas = context.create_canvas(width * 2, height, TextureFormat::Rgba8, flags)?;
                log::info!("Created {}x{height} headset canvas", width * 2);
                self.canvas = Some(canvas);
                canvas
            }
        };

        let camera = stereo_camera(driver, canvas, width, height);
        callback(context, &camera)?;
        context.resolve_canvas(canvas)?;

        let texture = context.canvas_texture(canvas)?;
        let id = context.texture(texture)?.id();
        for eye in Eye::BOTH {
            driver.submit(eye, id, EYE_BOUNDS[eye.index()]);
        }
        // The compositor binds its own texture to slot 0.
        context.dirty_texture_slot(0);
        Ok(())
    }

    /// Destroys the stereo canvas.
    pub fn release<D: GpuDevice>(
        &mut self,
        context: &mut GraphicsContext<D>,
    ) -> Result<(), ResourceError> {
        match self.canvas.take() {
            Some(canvas) => context.destroy_canvas(canvas),
            None => Ok(()),
        }
    }
}
