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

//! Backend-agnostic GPU API types.
//!
//! Organized into several logical sub-modules:
//!
//! - **[`handles`]**: Opaque ids of device-side objects.
//! - **[`access`]**: Access categories used by the synchronization tracker.
//! - **[`buffer`]**, **[`texture`]**, **[`vertex`]**, **[`canvas`]**: Resource descriptors.
//! - **[`pipeline`]**: Pipeline toggles and their hardware translations.
//! - **[`shader`]**: Shader stages, reflected uniforms and uniform uploads.
//! - **[`stats`]**, **[`settings`]**: Diagnostics, limits and configuration.

pub mod access;
pub mod buffer;
pub mod canvas;
pub mod handles;
pub mod pipeline;
pub mod settings;
pub mod shader;
pub mod stats;
pub mod texture;
pub mod vertex;

pub use self::access::GpuAccess;
pub use self::buffer::{BufferDescriptor, BufferTarget, BufferUsage, BufferUsageHint};
pub use self::canvas::{Attachment, CanvasFlags, FramebufferStatus, FramebufferTarget};
pub use self::handles::*;
pub use self::pipeline::{
    BlendAlphaMode, BlendEquation, BlendFactor, BlendMode, BlendState, Capability, CompareMode,
    PipelineState, PolygonMode, StencilAction, StencilOp, Viewport, Winding,
};
pub use self::settings::GraphicsConfig;
pub use self::shader::{
    ActiveAttribute, ActiveUniform, GlslType, ShaderStage, UniformType, UniformUpload,
};
pub use self::stats::{DeviceFeatures, GraphicsLimits, GraphicsStats};
pub use self::texture::{
    CompressedMip, FilterMode, Image, ImagePixels, MipmapCount, TextureDescriptor, TextureFilter,
    TextureFormat, TextureRegion, TextureSubrange, TextureType, TextureUsage,
    TextureViewDescriptor, TextureWrap, WrapMode,
};
pub use self::vertex::{
    AttributePointer, AttributeType, DrawMode, IndexFormat, MeshUsage, VertexAttribute,
    VertexFormat,
};
