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

use ember_core::renderer::*;

/// A local extension trait to convert core types into GL enums.
/// This avoids Rust's orphan rules while keeping an idiomatic `.into_gl()` syntax.
pub trait IntoGl<T> {
    /// Consumes self and converts it into a GL-compatible value.
    fn into_gl(self) -> T;
}

// --- Textures ---

impl IntoGl<u32> for TextureType {
    fn into_gl(self) -> u32 {
        match self {
            TextureType::D2 => glow::TEXTURE_2D,
            TextureType::Cube => glow::TEXTURE_CUBE_MAP,
            TextureType::Array => glow::TEXTURE_2D_ARRAY,
            TextureType::Volume => glow::TEXTURE_3D,
        }
    }
}

/// The sized internal format of a texture format.
pub fn internal_format(format: TextureFormat, srgb: bool) -> u32 {
    let srgb = srgb && format.has_srgb_variant();
    match format {
        TextureFormat::Rgb8 if srgb => glow::SRGB8,
        TextureFormat::Rgb8 => glow::RGB8,
        TextureFormat::Rgba8 if srgb => glow::SRGB8_ALPHA8,
        TextureFormat::Rgba8 => glow::RGBA8,
        TextureFormat::Rgba4 => glow::RGBA4,
        TextureFormat::Rgba16Float => glow::RGBA16F,
        TextureFormat::Rgba32Float => glow::RGBA32F,
        TextureFormat::R16Float => glow::R16F,
        TextureFormat::R32Float => glow::R32F,
        TextureFormat::Rgb565 => glow::RGB565,
        TextureFormat::Rgb5A1 => glow::RGB5_A1,
        TextureFormat::Rgb10A2 => glow::RGB10_A2,
        TextureFormat::Rg11B10Float => glow::R11F_G11F_B10F,
        TextureFormat::Depth16 => glow::DEPTH_COMPONENT16,
        TextureFormat::Depth24 => glow::DEPTH_COMPONENT24,
        TextureFormat::Depth24Stencil8 => glow::DEPTH24_STENCIL8,
        TextureFormat::Depth32Float => glow::DEPTH_COMPONENT32F,
        TextureFormat::Dxt1 if srgb => glow::COMPRESSED_SRGB_S3TC_DXT1_EXT,
        TextureFormat::Dxt1 => glow::COMPRESSED_RGB_S3TC_DXT1_EXT,
        TextureFormat::Dxt3 if srgb => glow::COMPRESSED_SRGB_ALPHA_S3TC_DXT3_EXT,
        TextureFormat::Dxt3 => glow::COMPRESSED_RGBA_S3TC_DXT3_EXT,
        TextureFormat::Dxt5 if srgb => glow::COMPRESSED_SRGB_ALPHA_S3TC_DXT5_EXT,
        TextureFormat::Dxt5 => glow::COMPRESSED_RGBA_S3TC_DXT5_EXT,
    }
}

/// The client `(format, type)` pair used to upload texels of a format.
pub fn pixel_transfer(format: TextureFormat) -> (u32, u32) {
    match format {
        TextureFormat::Rgb8 => (glow::RGB, glow::UNSIGNED_BYTE),
        TextureFormat::Rgba8 => (glow::RGBA, glow::UNSIGNED_BYTE),
        TextureFormat::Rgba4 => (glow::RGBA, glow::UNSIGNED_SHORT_4_4_4_4),
        TextureFormat::Rgba16Float => (glow::RGBA, glow::HALF_FLOAT),
        TextureFormat::Rgba32Float => (glow::RGBA, glow::FLOAT),
        TextureFormat::R16Float => (glow::RED, glow::HALF_FLOAT),
        TextureFormat::R32Float => (glow::RED, glow::FLOAT),
        TextureFormat::Rgb565 => (glow::RGB, glow::UNSIGNED_SHORT_5_6_5),
        TextureFormat::Rgb5A1 => (glow::RGBA, glow::UNSIGNED_SHORT_5_5_5_1),
        TextureFormat::Rgb10A2 => (glow::RGBA, glow::UNSIGNED_INT_2_10_10_10_REV),
        TextureFormat::Rg11B10Float => (glow::RGB, glow::UNSIGNED_INT_10F_11F_11F_REV),
        TextureFormat::Depth16 => (glow::DEPTH_COMPONENT, glow::UNSIGNED_SHORT),
        TextureFormat::Depth24 => (glow::DEPTH_COMPONENT, glow::UNSIGNED_INT),
        TextureFormat::Depth24Stencil8 => (glow::DEPTH_STENCIL, glow::UNSIGNED_INT_24_8),
        TextureFormat::Depth32Float => (glow::DEPTH_COMPONENT, glow::FLOAT),
        // Compressed formats never go through the uncompressed path.
        TextureFormat::Dxt1 | TextureFormat::Dxt3 | TextureFormat::Dxt5 => {
            (glow::RGBA, glow::UNSIGNED_BYTE)
        }
    }
}

impl IntoGl<i32> for WrapMode {
    fn into_gl(self) -> i32 {
        (match self {
            WrapMode::Clamp => glow::CLAMP_TO_EDGE,
            WrapMode::Repeat => glow::REPEAT,
            WrapMode::MirroredRepeat => glow::MIRRORED_REPEAT,
        }) as i32
    }
}

/// The `(min, mag)` filters for a filter mode.
pub fn filter_pair(mode: FilterMode, mipmapped: bool) -> (u32, u32) {
    match mode {
        FilterMode::Nearest if mipmapped => (glow::NEAREST_MIPMAP_NEAREST, glow::NEAREST),
        FilterMode::Nearest => (glow::NEAREST, glow::NEAREST),
        FilterMode::Bilinear if mipmapped => (glow::LINEAR_MIPMAP_NEAREST, glow::LINEAR),
        FilterMode::Bilinear => (glow::LINEAR, glow::LINEAR),
        FilterMode::Trilinear | FilterMode::Anisotropic if mipmapped => {
            (glow::LINEAR_MIPMAP_LINEAR, glow::LINEAR)
        }
        FilterMode::Trilinear | FilterMode::Anisotropic => (glow::LINEAR, glow::LINEAR),
    }
}

// --- Buffers and vertices ---

impl IntoGl<u32> for BufferTarget {
    fn into_gl(self) -> u32 {
        match self {
            BufferTarget::Array => glow::ARRAY_BUFFER,
            BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
            BufferTarget::Uniform => glow::UNIFORM_BUFFER,
        }
    }
}

impl IntoGl<u32> for BufferUsageHint {
    fn into_gl(self) -> u32 {
        match self {
            BufferUsageHint::Static => glow::STATIC_DRAW,
            BufferUsageHint::Dynamic => glow::DYNAMIC_DRAW,
            BufferUsageHint::Stream => glow::STREAM_DRAW,
        }
    }
}

impl IntoGl<u32> for AttributeType {
    fn into_gl(self) -> u32 {
        match self {
            AttributeType::Float => glow::FLOAT,
            AttributeType::Byte => glow::UNSIGNED_BYTE,
            AttributeType::Int => glow::UNSIGNED_INT,
        }
    }
}

impl IntoGl<u32> for IndexFormat {
    fn into_gl(self) -> u32 {
        match self {
            IndexFormat::Uint16 => glow::UNSIGNED_SHORT,
            IndexFormat::Uint32 => glow::UNSIGNED_INT,
        }
    }
}

impl IntoGl<u32> for DrawMode {
    fn into_gl(self) -> u32 {
        match self {
            DrawMode::Points => glow::POINTS,
            DrawMode::Lines => glow::LINES,
            DrawMode::LineStrip => glow::LINE_STRIP,
            DrawMode::LineLoop => glow::LINE_LOOP,
            DrawMode::TriangleStrip => glow::TRIANGLE_STRIP,
            DrawMode::Triangles => glow::TRIANGLES,
            DrawMode::TriangleFan => glow::TRIANGLE_FAN,
        }
    }
}

impl IntoGl<u32> for GpuAccess {
    /// The barrier bits that make writes visible to the accesses in `self`.
    fn into_gl(self) -> u32 {
        let mut bits = 0;
        if self.contains(GpuAccess::VERTEX_READ) {
            bits |= glow::VERTEX_ATTRIB_ARRAY_BARRIER_BIT;
        }
        if self.contains(GpuAccess::INDEX_READ) {
            bits |= glow::ELEMENT_ARRAY_BARRIER_BIT;
        }
        if self.contains(GpuAccess::UNIFORM_READ) {
            bits |= glow::UNIFORM_BARRIER_BIT;
        }
        if self.contains(GpuAccess::INDIRECT_READ) {
            bits |= glow::COMMAND_BARRIER_BIT;
        }
        if self.contains(GpuAccess::SAMPLED_READ) {
            bits |= glow::TEXTURE_FETCH_BARRIER_BIT;
        }
        if self.intersects(GpuAccess::STORAGE_READ | GpuAccess::COMPUTE_STORAGE_WRITE) {
            bits |= glow::SHADER_STORAGE_BARRIER_BIT | glow::SHADER_IMAGE_ACCESS_BARRIER_BIT;
        }
        if self.intersects(GpuAccess::DOWNLOAD_READ | GpuAccess::UPLOAD_WRITE) {
            bits |= glow::BUFFER_UPDATE_BARRIER_BIT
                | glow::TEXTURE_UPDATE_BARRIER_BIT
                | glow::PIXEL_BUFFER_BARRIER_BIT;
        }
        if self.intersects(GpuAccess::COLOR_TARGET_WRITE | GpuAccess::DEPTH_TARGET_WRITE) {
            bits |= glow::FRAMEBUFFER_BARRIER_BIT;
        }
        bits
    }
}

// --- Framebuffers ---

impl IntoGl<u32> for Attachment {
    fn into_gl(self) -> u32 {
        match self {
            Attachment::Color(index) => glow::COLOR_ATTACHMENT0 + index,
            Attachment::Depth => glow::DEPTH_ATTACHMENT,
            Attachment::DepthStencil => glow::DEPTH_STENCIL_ATTACHMENT,
        }
    }
}

impl IntoGl<u32> for FramebufferTarget {
    fn into_gl(self) -> u32 {
        match self {
            FramebufferTarget::Both => glow::FRAMEBUFFER,
            FramebufferTarget::Read => glow::READ_FRAMEBUFFER,
            FramebufferTarget::Draw => glow::DRAW_FRAMEBUFFER,
        }
    }
}

/// Maps a `glCheckFramebufferStatus` result.
pub fn framebuffer_status(status: u32) -> FramebufferStatus {
    match status {
        glow::FRAMEBUFFER_COMPLETE => FramebufferStatus::Complete,
        glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => FramebufferStatus::IncompleteAttachment,
        glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => FramebufferStatus::MissingAttachment,
        glow::FRAMEBUFFER_INCOMPLETE_DIMENSIONS => FramebufferStatus::IncompleteDimensions,
        glow::FRAMEBUFFER_UNSUPPORTED => FramebufferStatus::Unsupported,
        other => FramebufferStatus::Other(other),
    }
}

// --- Programs ---

impl IntoGl<u32> for ShaderStage {
    fn into_gl(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        }
    }
}

/// Maps a reflected GL uniform type.
pub fn glsl_type(gl_type: u32) -> GlslType {
    match gl_type {
        glow::FLOAT => GlslType::Float,
        glow::FLOAT_VEC2 => GlslType::Vec2,
        glow::FLOAT_VEC3 => GlslType::Vec3,
        glow::FLOAT_VEC4 => GlslType::Vec4,
        glow::INT | glow::BOOL => GlslType::Int,
        glow::INT_VEC2 | glow::BOOL_VEC2 => GlslType::IVec2,
        glow::INT_VEC3 | glow::BOOL_VEC3 => GlslType::IVec3,
        glow::INT_VEC4 | glow::BOOL_VEC4 => GlslType::IVec4,
        glow::FLOAT_MAT2 => GlslType::Mat2,
        glow::FLOAT_MAT3 => GlslType::Mat3,
        glow::FLOAT_MAT4 => GlslType::Mat4,
        glow::SAMPLER_2D | glow::SAMPLER_2D_SHADOW => GlslType::Sampler2D,
        glow::SAMPLER_3D => GlslType::Sampler3D,
        glow::SAMPLER_CUBE => GlslType::SamplerCube,
        glow::SAMPLER_2D_ARRAY => GlslType::Sampler2DArray,
        other => GlslType::Other(other),
    }
}

// --- Pipeline state ---

impl IntoGl<u32> for BlendEquation {
    fn into_gl(self) -> u32 {
        match self {
            BlendEquation::Add => glow::FUNC_ADD,
            BlendEquation::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
            BlendEquation::Min => glow::MIN,
            BlendEquation::Max => glow::MAX,
        }
    }
}

impl IntoGl<u32> for BlendFactor {
    fn into_gl(self) -> u32 {
        match self {
            BlendFactor::Zero => glow::ZERO,
            BlendFactor::One => glow::ONE,
            BlendFactor::SrcAlpha => glow::SRC_ALPHA,
            BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
            BlendFactor::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
            BlendFactor::DstColor => glow::DST_COLOR,
        }
    }
}

impl IntoGl<u32> for CompareMode {
    fn into_gl(self) -> u32 {
        match self {
            CompareMode::None => glow::ALWAYS,
            CompareMode::Equal => glow::EQUAL,
            CompareMode::NotEqual => glow::NOTEQUAL,
            CompareMode::Less => glow::LESS,
            CompareMode::LessEqual => glow::LEQUAL,
            CompareMode::Greater => glow::GREATER,
            CompareMode::GreaterEqual => glow::GEQUAL,
        }
    }
}

impl IntoGl<u32> for StencilOp {
    fn into_gl(self) -> u32 {
        match self {
            StencilOp::Keep => glow::KEEP,
            StencilOp::Replace => glow::REPLACE,
            StencilOp::Increment => glow::INCR,
            StencilOp::Decrement => glow::DECR,
            StencilOp::IncrementWrap => glow::INCR_WRAP,
            StencilOp::DecrementWrap => glow::DECR_WRAP,
            StencilOp::Invert => glow::INVERT,
        }
    }
}

impl IntoGl<u32> for Winding {
    fn into_gl(self) -> u32 {
        match self {
            Winding::Clockwise => glow::CW,
            Winding::CounterClockwise => glow::CCW,
        }
    }
}

impl IntoGl<u32> for PolygonMode {
    fn into_gl(self) -> u32 {
        match self {
            PolygonMode::Fill => glow::FILL,
            PolygonMode::Line => glow::LINE,
        }
    }
}

impl IntoGl<u32> for Capability {
    fn into_gl(self) -> u32 {
        match self {
            Capability::Blend => glow::BLEND,
            Capability::CullFace => glow::CULL_FACE,
            Capability::DepthTest => glow::DEPTH_TEST,
            Capability::StencilTest => glow::STENCIL_TEST,
            Capability::FramebufferSrgb => glow::FRAMEBUFFER_SRGB,
            Capability::ProgramPointSize => glow::PROGRAM_POINT_SIZE,
        }
    }
}
