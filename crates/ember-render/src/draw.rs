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

//! Draw commands and their execution.
//!
//! A [`DrawCommand`] bundles everything one draw needs. Executing it binds
//! the program, diffs the pipeline toggles, uploads the built-in uniforms,
//! binds the target canvases and the mesh, then issues one draw call, or
//! two for stereo on devices without single-pass stereo.

use crate::arena::{CanvasHandle, MeshHandle, ShaderHandle, TextureHandle};
use crate::context::GraphicsContext;
use crate::resources::shader::{Uniform, UniformData};
use crate::sync::SyncResource;
use ember_core::math::{Color, Mat3, Mat4, EPSILON};
use ember_core::renderer::{
    Attachment, ConfigError, GpuAccess, GpuDevice, PipelineState, ResourceError, StencilAction,
    Viewport,
};

/// Scalar material properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialScalar {
    /// `emberMetalness`.
    Metalness,
    /// `emberRoughness`.
    Roughness,
}

impl MaterialScalar {
    /// Every scalar property.
    pub const ALL: [Self; 2] = [Self::Metalness, Self::Roughness];

    /// The uniform the property is uploaded to.
    pub fn uniform_name(self) -> &'static str {
        match self {
            Self::Metalness => "emberMetalness",
            Self::Roughness => "emberRoughness",
        }
    }
}

/// Color material properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialColor {
    /// `emberDiffuseColor`.
    Diffuse,
    /// `emberEmissiveColor`.
    Emissive,
}

impl MaterialColor {
    /// Every color property.
    pub const ALL: [Self; 2] = [Self::Diffuse, Self::Emissive];

    /// The uniform the property is uploaded to.
    pub fn uniform_name(self) -> &'static str {
        match self {
            Self::Diffuse => "emberDiffuseColor",
            Self::Emissive => "emberEmissiveColor",
        }
    }
}

/// Texture material properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialTexture {
    /// `emberDiffuseTexture`.
    Diffuse,
    /// `emberEmissiveTexture`.
    Emissive,
    /// `emberMetalnessTexture`.
    Metalness,
    /// `emberRoughnessTexture`.
    Roughness,
    /// `emberOcclusionTexture`.
    Occlusion,
    /// `emberNormalTexture`.
    Normal,
    /// `emberEnvironmentTexture`.
    Environment,
}

impl MaterialTexture {
    /// Every texture property.
    pub const ALL: [Self; 7] = [
        Self::Diffuse,
        Self::Emissive,
        Self::Metalness,
        Self::Roughness,
        Self::Occlusion,
        Self::Normal,
        Self::Environment,
    ];

    /// The uniform the property is uploaded to.
    pub fn uniform_name(self) -> &'static str {
        match self {
            Self::Diffuse => "emberDiffuseTexture",
            Self::Emissive => "emberEmissiveTexture",
            Self::Metalness => "emberMetalnessTexture",
            Self::Roughness => "emberRoughnessTexture",
            Self::Occlusion => "emberOcclusionTexture",
            Self::Normal => "emberNormalTexture",
            Self::Environment => "emberEnvironmentTexture",
        }
    }
}

/// Named values uploaded by uniform-name convention on every draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    scalars: [f32; 2],
    colors: [Color; 2],
    textures: [Option<TextureHandle>; 7],
    /// Transform applied to texture coordinates (`emberMaterialTransform`).
    pub transform: Mat3,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            scalars: [1.0, 1.0],
            colors: [Color::WHITE, Color::BLACK],
            textures: [None; 7],
            transform: Mat3::IDENTITY,
        }
    }
}

impl Material {
    /// Returns a scalar property.
    pub fn scalar(&self, scalar: MaterialScalar) -> f32 {
        self.scalars[scalar as usize]
    }

    /// Sets a scalar property.
    pub fn set_scalar(&mut self, scalar: MaterialScalar, value: f32) {
        self.scalars[scalar as usize] = value;
    }

    /// Returns a color property.
    pub fn color(&self, color: MaterialColor) -> Color {
        self.colors[color as usize]
    }

    /// Sets a color property.
    pub fn set_color(&mut self, color: MaterialColor, value: Color) {
        self.colors[color as usize] = value;
    }

    /// Returns a texture property; `None` samples the default white texture.
    pub fn texture(&self, texture: MaterialTexture) -> Option<TextureHandle> {
        self.textures[texture as usize]
    }

    /// Sets a texture property.
    pub fn set_texture(&mut self, texture: MaterialTexture, value: Option<TextureHandle>) {
        self.textures[texture as usize] = value;
    }

    /// Every texture the material references.
    pub fn textures(&self) -> impl Iterator<Item = TextureHandle> + '_ {
        self.textures.iter().flatten().copied()
    }
}

/// Where and from where a draw is seen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Render both views.
    pub stereo: bool,
    /// Target canvas; `None` renders to the default framebuffer.
    pub canvas: Option<CanvasHandle>,
    /// Per-view viewports.
    pub viewports: [Viewport; 2],
    /// Per-view view matrices.
    pub views: [Mat4; 2],
    /// Per-view projection matrices.
    pub projections: [Mat4; 2],
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            stereo: false,
            canvas: None,
            viewports: [Viewport::default(); 2],
            views: [Mat4::IDENTITY; 2],
            projections: [Mat4::IDENTITY; 2],
        }
    }
}

impl Camera {
    /// A single-view camera rendering into `viewport`.
    pub fn mono(viewport: Viewport, view: Mat4, projection: Mat4) -> Self {
        Self {
            stereo: false,
            canvas: None,
            viewports: [viewport; 2],
            views: [view; 2],
            projections: [projection; 2],
        }
    }
}

/// The fixed-function part of a draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    /// Toggles diffed by the state cache.
    pub state: PipelineState,
    /// Point size, clamped to the device range.
    pub point_size: f32,
    /// Tint color (`emberColor`).
    pub color: Color,
    /// Canvases drawn to at once; overrides the camera canvas and disables stereo.
    pub canvases: Vec<CanvasHandle>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            state: PipelineState::default(),
            point_size: 1.0,
            color: Color::WHITE,
            canvases: Vec::new(),
        }
    }
}

/// A fully populated draw.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCommand {
    /// The mesh to draw.
    pub mesh: MeshHandle,
    /// The program to draw with.
    pub shader: ShaderHandle,
    /// Material values.
    pub material: Material,
    /// Fixed-function state and targets.
    pub pipeline: Pipeline,
    /// Views and target canvas.
    pub camera: Camera,
    /// Model transform (`emberModel`).
    pub transform: Mat4,
    /// Instance count; values above 1 use instanced draws.
    pub instances: u32,
}

impl DrawCommand {
    /// A single-instance draw with default material, pipeline and camera.
    pub fn new(mesh: MeshHandle, shader: ShaderHandle) -> Self {
        Self {
            mesh,
            shader,
            material: Material::default(),
            pipeline: Pipeline::default(),
            camera: Camera::default(),
            transform: Mat4::IDENTITY,
            instances: 1,
        }
    }
}

/// Inverse-transpose of the upper 3x3 of `model_view`, or identity when it is singular.
fn normal_matrix(model_view: Mat4) -> Mat3 {
    if model_view.determinant().abs() < EPSILON {
        return Mat3::IDENTITY;
    }
    Mat3::from_mat4(model_view.inverse().transpose())
}

fn concat<const N: usize>(matrices: [[f32; N]; 2]) -> Vec<f32> {
    matrices.concat()
}

impl<D: GpuDevice> GraphicsContext<D> {
    /// Executes a draw command.
    ///
    /// ## Errors
    /// * `ConfigError::TooManyCanvases` - If more canvases are targeted than configured.
    /// * `ConfigError::CanvasDimensionMismatch` - If the target canvases differ in size.
    /// * `ConfigError::IncompleteFramebuffer` - If the target framebuffer fails its check.
    /// * `ResourceError::InvalidHandle` - If any referenced resource was destroyed.
    pub fn draw(&mut self, command: &DrawCommand) -> Result<(), ResourceError> {
        let pipeline = &command.pipeline;
        let camera = &command.camera;

        let canvases: Vec<CanvasHandle> = if pipeline.canvases.is_empty() {
            camera.canvas.into_iter().collect()
        } else {
            pipeline.canvases.clone()
        };
        if canvases.len() > self.config.max_canvases {
            return Err(ConfigError::TooManyCanvases {
                max: self.config.max_canvases,
                requested: canvases.len(),
            }
            .into());
        }

        let program = self.shaders.get(command.shader)?.program;
        self.meshes.get(command.mesh)?;
        self.state.use_program(&mut self.device, Some(program));
        self.state.apply_pipeline(&mut self.device, &pipeline.state);

        self.upload_transforms(command)?;
        self.upload_draw_values(command)?;
        self.bind_canvases(&canvases)?;

        let attributes = self.shaders.get(command.shader)?.attributes.clone();
        self.bind_mesh(command.mesh, &attributes)?;

        let stereo = pipeline.canvases.is_empty() && camera.stereo;
        let single_pass = stereo && self.features.single_pass_stereo;
        let draw_count = if stereo && !single_pass { 2 } else { 1 };
        let target_size = match pipeline.canvases.first() {
            Some(&canvas) => Some(self.canvases.get(canvas)?.size()),
            None => None,
        };

        for i in 0..draw_count {
            if let Some((width, height)) = target_size {
                self.state
                    .set_viewport(&mut self.device, Viewport::full(width, height));
            } else if single_pass {
                self.state
                    .set_viewport_array(&mut self.device, camera.viewports);
            } else {
                self.state.set_viewport(&mut self.device, camera.viewports[i]);
            }

            let eye = if single_pass { -1 } else { i as i32 };
            self.set_uniform(command.shader, "emberEye", UniformData::Ints(&[eye]))?;
            self.flush_shader(command.shader)?;
            self.issue_draw(command.mesh, command.instances)?;
        }
        Ok(())
    }

    fn upload_transforms(&mut self, command: &DrawCommand) -> Result<(), ResourceError> {
        let camera = &command.camera;
        let model = command.transform;
        let model_views = camera.views.map(|view| view * model);

        let shader = self.shaders.get_mut(command.shader)?;
        shader.set("emberModel", UniformData::Matrices(&model.to_cols_array()))?;
        shader.set(
            "emberViews",
            UniformData::Matrices(&concat(camera.views.map(|m| m.to_cols_array()))),
        )?;
        shader.set(
            "emberProjections",
            UniformData::Matrices(&concat(camera.projections.map(|m| m.to_cols_array()))),
        )?;
        shader.set(
            "emberTransforms",
            UniformData::Matrices(&concat(model_views.map(|m| m.to_cols_array()))),
        )?;
        if shader.has_uniform("emberNormalMatrices") {
            let normals = model_views.map(|m| normal_matrix(m).to_cols_array());
            shader.set("emberNormalMatrices", UniformData::Matrices(&concat(normals)))?;
        }

        let pose: Vec<f32> = match self.meshes.get(command.mesh)?.pose() {
            [] => Mat4::IDENTITY.to_cols_array().to_vec(),
            bones => bones.iter().flat_map(|m| m.to_cols_array()).collect(),
        };
        let shader = self.shaders.get_mut(command.shader)?;
        let capacity = shader.uniform("emberPose").map_or(0, Uniform::capacity);
        if capacity > 0 {
            shader.set("emberPose", UniformData::Matrices(&pose[..pose.len().min(capacity)]))?;
        }
        Ok(())
    }

    fn upload_draw_values(&mut self, command: &DrawCommand) -> Result<(), ResourceError> {
        let gamma = self.config.gamma_correct;
        let [min_point, max_point] = self.limits.point_sizes;
        let point_size = command.pipeline.point_size.clamp(min_point, max_point.max(min_point));
        let material = &command.material;

        let shader = self.shaders.get_mut(command.shader)?;
        shader.set("emberPointSize", UniformData::Floats(&[point_size]))?;
        shader.set(
            "emberColor",
            UniformData::Floats(&command.pipeline.color.corrected(gamma).to_array()),
        )?;
        for scalar in MaterialScalar::ALL {
            shader.set(scalar.uniform_name(), UniformData::Floats(&[material.scalar(scalar)]))?;
        }
        for color in MaterialColor::ALL {
            let value = material.color(color).corrected(gamma).to_array();
            shader.set(color.uniform_name(), UniformData::Floats(&value))?;
        }
        shader.set(
            "emberMaterialTransform",
            UniformData::Matrices(&material.transform.to_cols_array()),
        )?;

        // Sampler uniforms go through the context so the shader holds a
        // reference to each material texture.
        for slot in MaterialTexture::ALL {
            let texture = material.texture(slot).filter(|t| self.textures.contains(*t));
            self.set_uniform(command.shader, slot.uniform_name(), UniformData::Textures(&[texture]))?;
        }
        Ok(())
    }

    fn issue_draw(&mut self, mesh: MeshHandle, instances: u32) -> Result<(), ResourceError> {
        let mesh = self.meshes.get(mesh)?;
        let mode = mesh.draw_mode();
        let (start, count) = mesh.draw_range().unwrap_or((0, mesh.element_limit()));

        if mesh.is_indexed() {
            let format = mesh.index_format();
            let offset = u64::from(start) * u64::from(format.size());
            if instances > 1 {
                self.device
                    .draw_elements_instanced(mode, count, format, offset, instances);
            } else {
                self.device.draw_elements(mode, count, format, offset);
            }
        } else if instances > 1 {
            self.device
                .draw_arrays_instanced(mode, start, count, instances);
        } else {
            self.device.draw_arrays(mode, start, count);
        }
        self.state.count_draw();
        Ok(())
    }

    // --- Targets ---

    /// Makes `canvases` the current render targets; an empty list targets
    /// the default framebuffer.
    ///
    /// Every call records a color target write on each canvas texture.
    /// Changing the target set resolves the previous first canvas. The
    /// first canvas's framebuffer receives the textures of the others as
    /// extra color attachments, which stay referenced while attached.
    pub(crate) fn bind_canvases(&mut self, canvases: &[CanvasHandle]) -> Result<(), ResourceError> {
        let mut expected = None;
        for &handle in canvases {
            let size = self.canvases.get(handle)?.size();
            match expected {
                None => expected = Some(size),
                Some(expected) if expected != size => {
                    return Err(ConfigError::CanvasDimensionMismatch {
                        expected,
                        actual: size,
                    }
                    .into());
                }
                Some(_) => {}
            }
        }

        let previous = self.state.canvases().to_vec();
        if previous == canvases {
            let framebuffer = match canvases.first() {
                Some(&first) => Some(self.canvases.get(first)?.framebuffer),
                None => None,
            };
            self.state.bind_framebuffer(&mut self.device, framebuffer);
        } else {
            self.retarget(&previous, canvases)?;
        }

        for &handle in canvases {
            let texture = self.canvases.get(handle)?.texture;
            self.track(SyncResource::Texture(texture), GpuAccess::COLOR_TARGET_WRITE);
        }
        Ok(())
    }

    fn retarget(
        &mut self,
        previous: &[CanvasHandle],
        canvases: &[CanvasHandle],
    ) -> Result<(), ResourceError> {
        if let Some(&first) = previous.first().filter(|c| self.canvases.contains(**c)) {
            self.resolve_canvas(first)?;
        }
        if let Some((owner, targets)) = self.attached_targets.take() {
            if self.canvases.contains(owner) {
                let framebuffer = self.canvases.get(owner)?.framebuffer;
                self.state.bind_framebuffer(&mut self.device, Some(framebuffer));
                for i in 1..=targets.len() {
                    self.device
                        .framebuffer_texture(Attachment::Color(i as u32), None, 0);
                }
                self.device.draw_buffers(1);
            }
            for texture in targets {
                self.destroy_texture(texture)?;
            }
        }

        let Some(&first) = canvases.first() else {
            self.state.bind_framebuffer(&mut self.device, None);
            self.state.set_canvases(Vec::new());
            return Ok(());
        };

        let framebuffer = self.canvases.get(first)?.framebuffer;
        self.state.bind_framebuffer(&mut self.device, Some(framebuffer));
        self.state.set_canvases(canvases.to_vec());
        if canvases.len() > 1 {
            let mut targets = Vec::with_capacity(canvases.len() - 1);
            for (i, &handle) in canvases.iter().enumerate().skip(1) {
                let texture = self.canvases.get(handle)?.texture;
                let id = self.textures.get(texture)?.id();
                self.textures.retain(texture)?;
                targets.push(texture);
                self.device
                    .framebuffer_texture(Attachment::Color(i as u32), Some(id), 0);
            }
            self.attached_targets = Some((first, targets));
            self.device.draw_buffers(canvases.len() as u32);
            self.check_framebuffer()?;
        }
        Ok(())
    }

    /// Clears the given canvases, or the default framebuffer when empty.
    ///
    /// `None` leaves a plane untouched. Depth writes are enabled before a
    /// depth clear, since a disabled depth mask would discard it.
    pub fn clear(
        &mut self,
        canvases: &[CanvasHandle],
        color: Option<Color>,
        depth: Option<f32>,
        stencil: Option<i32>,
    ) -> Result<(), ResourceError> {
        if canvases.len() > self.config.max_canvases {
            return Err(ConfigError::TooManyCanvases {
                max: self.config.max_canvases,
                requested: canvases.len(),
            }
            .into());
        }
        self.bind_canvases(canvases)?;

        if let Some(color) = color {
            let value = color.corrected(self.config.gamma_correct).to_array();
            for buffer in 0..canvases.len().max(1) {
                self.device.clear_color(buffer as u32, value);
            }
        }
        if let Some(depth) = depth {
            self.state.set_depth_write(&mut self.device, true);
            self.device.clear_depth(depth);
        }
        if let Some(stencil) = stencil {
            self.device.clear_stencil(stencil);
        }

        if let Some(&first) = canvases.first() {
            self.resolve_canvas(first)?;
        }
        Ok(())
    }

    // --- Stencil ---

    /// Runs `callback` with draws writing `action` into the stencil buffer.
    ///
    /// Color and depth writes are off for the duration. Afterwards the next
    /// draw reapplies its own stencil test. The callback's result is
    /// returned once the previous state is restored.
    pub fn write_stencil<F>(
        &mut self,
        action: StencilAction,
        value: i32,
        callback: F,
    ) -> Result<(), ResourceError>
    where
        F: FnOnce(&mut Self) -> Result<(), ResourceError>,
    {
        self.state
            .begin_stencil_write(&mut self.device, action, value);
        let result = callback(self);
        self.state.end_stencil_write(&mut self.device);
        result
    }
}
