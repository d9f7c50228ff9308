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

//! Defines the hierarchy of error types for the GPU core.
//!
//! Two families reach callers: configuration errors (the caller described
//! something invalid) and device errors (the driver refused a shader). Both
//! abort the current operation; nothing here is retryable.

use crate::renderer::api::shader::ShaderStage;
use crate::renderer::api::texture::TextureFormat;
use std::fmt;

/// A caller supplied an invalid descriptor or argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A buffer or texture was described with an empty usage set or a zero size.
    InvalidUsage(String),
    /// A cube texture was created with a layer count other than six.
    CubeLayerCount {
        /// The number of layers that was provided.
        layers: u32,
    },
    /// A cube texture was created with non-square faces.
    CubeNotSquare {
        /// The face width.
        width: u32,
        /// The face height.
        height: u32,
    },
    /// A 2D texture was created with more than one layer.
    LayerCountMismatch {
        /// The number of layers the texture type requires.
        expected: u32,
        /// The number of layers that was provided.
        actual: u32,
    },
    /// An explicit mipmap count exceeds what the extent allows, or is zero.
    InvalidMipmapCount {
        /// The requested count.
        requested: u32,
        /// The largest count the extent allows.
        max: u32,
    },
    /// A pixel operation targeted a mip level the texture does not have.
    MipmapOutOfRange {
        /// The targeted level.
        level: u32,
        /// The number of levels the texture has.
        count: u32,
    },
    /// A pixel region or slice lies outside the targeted texture level.
    RegionOutOfBounds(String),
    /// Compressed pixel data can only replace the whole texture at level zero.
    CompressedPartialReplace,
    /// The format cannot be used as a canvas color target.
    UnsupportedCanvasFormat(TextureFormat),
    /// A texture view does not fit its source texture.
    IncompatibleView(String),
    /// A texture view was used where owned storage is required.
    ViewNotWritable,
    /// Pixels of the format cannot be read back through a framebuffer.
    UnreadableFormat(TextureFormat),
    /// A uniform set call used the wrong value family for the declared type.
    UniformTypeMismatch {
        /// The uniform name.
        name: String,
        /// The declared type, as a readable word.
        expected: &'static str,
        /// The type of the supplied values.
        actual: &'static str,
    },
    /// More elements were supplied than the uniform can hold.
    UniformCapacityExceeded {
        /// The uniform name.
        name: String,
        /// The declared capacity in elements.
        capacity: usize,
        /// The number of elements supplied.
        provided: usize,
    },
    /// A shader block does not declare the named uniform.
    UnknownBlockUniform(String),
    /// A shader does not declare the named uniform block.
    UnknownBlock(String),
    /// A draw range reaches past the vertex or index count.
    DrawRangeOutOfBounds {
        /// First vertex or index of the range.
        start: u32,
        /// Number of vertices or indices in the range.
        count: u32,
        /// The number of vertices or indices available.
        limit: u32,
    },
    /// A byte range reaches past the end of a buffer or vertex store.
    RangeOutOfBounds {
        /// Start of the range.
        offset: u64,
        /// Length of the range.
        size: u64,
        /// Size of the storage.
        limit: u64,
    },
    /// A mesh attribute name is unknown.
    AttributeNotFound(String),
    /// A mesh already has an attribute with this name.
    DuplicateAttribute(String),
    /// A mesh that is an attachment source cannot receive attachments itself.
    AttachToAttachment,
    /// Attaching the attribute would make a mesh source its own data.
    AttachmentCycle(String),
    /// The named attribute is sourced from the mesh itself and cannot be detached.
    DetachOwnAttribute(String),
    /// A vertex format declared an attribute with 0 or more than 4 components.
    InvalidAttributeComponents {
        /// The attribute name.
        name: String,
        /// The declared component count.
        components: u8,
    },
    /// Simultaneously bound canvases do not share dimensions.
    CanvasDimensionMismatch {
        /// The size of the first canvas.
        expected: (u32, u32),
        /// The size of the offending canvas.
        actual: (u32, u32),
    },
    /// More canvases were bound at once than the context allows.
    TooManyCanvases {
        /// The configured maximum.
        max: usize,
        /// The number requested.
        requested: usize,
    },
    /// A framebuffer failed its completeness check.
    IncompleteFramebuffer(String),
    /// A texture or uniform buffer slot is outside the configured range.
    SlotOutOfRange {
        /// The requested slot.
        slot: u32,
        /// The number of slots available.
        max: u32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidUsage(msg) => write!(f, "Invalid resource usage: {msg}"),
            ConfigError::CubeLayerCount { layers } => {
                write!(f, "6 images are required for a cube texture, got {layers}")
            }
            ConfigError::CubeNotSquare { width, height } => {
                write!(f, "Cube texture images must be square, got {width}x{height}")
            }
            ConfigError::LayerCountMismatch { expected, actual } => {
                write!(f, "Expected {expected} texture layer(s), got {actual}")
            }
            ConfigError::InvalidMipmapCount { requested, max } => {
                write!(f, "Invalid mipmap count {requested}, expected 1 to {max}")
            }
            ConfigError::MipmapOutOfRange { level, count } => {
                write!(f, "Invalid mipmap level {level} for a texture with {count} level(s)")
            }
            ConfigError::RegionOutOfBounds(msg) => {
                write!(f, "Pixel region out of bounds: {msg}")
            }
            ConfigError::CompressedPartialReplace => write!(
                f,
                "Compressed textures can only be replaced entirely at mipmap level 0"
            ),
            ConfigError::UnsupportedCanvasFormat(format) => {
                write!(f, "Format {format:?} cannot be used as a canvas format")
            }
            ConfigError::IncompatibleView(msg) => write!(f, "Incompatible texture view: {msg}"),
            ConfigError::ViewNotWritable => write!(f, "Texture views cannot be written"),
            ConfigError::UnreadableFormat(format) => {
                write!(f, "Pixels of format {format:?} cannot be read back")
            }
            ConfigError::UniformTypeMismatch {
                name,
                expected,
                actual,
            } => write!(
                f,
                "Unable to send {actual}s to uniform '{name}' (declared as {expected})"
            ),
            ConfigError::UniformCapacityExceeded {
                name,
                capacity,
                provided,
            } => write!(
                f,
                "Expected at most {capacity} element(s) for uniform '{name}', got {provided}"
            ),
            ConfigError::UnknownBlockUniform(name) => {
                write!(f, "Shader block has no uniform named '{name}'")
            }
            ConfigError::UnknownBlock(name) => {
                write!(f, "Shader has no uniform block named '{name}'")
            }
            ConfigError::DrawRangeOutOfBounds {
                start,
                count,
                limit,
            } => write!(
                f,
                "Invalid draw range {start}..{} for a mesh with {limit} element(s)",
                u64::from(*start) + u64::from(*count)
            ),
            ConfigError::RangeOutOfBounds {
                offset,
                size,
                limit,
            } => write!(
                f,
                "Range {offset}..{} exceeds storage of {limit} byte(s)",
                offset.saturating_add(*size)
            ),
            ConfigError::AttributeNotFound(name) => {
                write!(f, "No attribute named '{name}' exists")
            }
            ConfigError::DuplicateAttribute(name) => {
                write!(f, "Mesh already has an attribute named '{name}'")
            }
            ConfigError::AttachToAttachment => write!(
                f,
                "Attempted to attach to a mesh which is an attachment itself"
            ),
            ConfigError::AttachmentCycle(name) => {
                write!(f, "Attaching attribute '{name}' would create a cycle")
            }
            ConfigError::DetachOwnAttribute(name) => {
                write!(f, "Attribute '{name}' belongs to the mesh and cannot be detached")
            }
            ConfigError::InvalidAttributeComponents { name, components } => write!(
                f,
                "Attribute '{name}' has {components} component(s), expected 1 to 4"
            ),
            ConfigError::CanvasDimensionMismatch { expected, actual } => write!(
                f,
                "All multicanvas canvases must have the same dimensions ({}x{} vs {}x{})",
                expected.0, expected.1, actual.0, actual.1
            ),
            ConfigError::TooManyCanvases { max, requested } => {
                write!(f, "At most {max} canvases can be bound, got {requested}")
            }
            ConfigError::IncompleteFramebuffer(status) => {
                write!(f, "Unable to bind framebuffer: {status}")
            }
            ConfigError::SlotOutOfRange { slot, max } => {
                write!(f, "Slot {slot} is out of range (max {max})")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// The driver rejected a shader program.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderError {
    /// A stage failed to compile.
    CompilationError {
        /// The stage that failed.
        stage: ShaderStage,
        /// The compiler log provided by the driver.
        log: String,
    },
    /// The program failed to link.
    LinkError {
        /// The linker log provided by the driver.
        log: String,
    },
    /// An active uniform uses a type the core cannot bind.
    UnsupportedUniformType {
        /// The uniform name.
        name: String,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::CompilationError { stage, log } => {
                write!(f, "Could not compile {stage:?} shader: {log}")
            }
            ShaderError::LinkError { log } => write!(f, "Could not link shader: {log}"),
            ShaderError::UnsupportedUniformType { name } => {
                write!(f, "Uniform '{name}' has an unsupported type")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation or use of a GPU resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// The caller described something invalid.
    Config(ConfigError),
    /// A shader-specific device error occurred.
    Shader(ShaderError),
    /// A handle refers to a resource that was already destroyed.
    InvalidHandle(&'static str),
    /// The device could not allocate the resource.
    OutOfMemory(String),
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Config(err) => write!(f, "Configuration error: {err}"),
            ResourceError::Shader(err) => write!(f, "Shader resource error: {err}"),
            ResourceError::InvalidHandle(kind) => write!(f, "Invalid {kind} handle."),
            ResourceError::OutOfMemory(msg) => write!(f, "Out of GPU memory: {msg}"),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Config(err) => Some(err),
            ResourceError::Shader(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for ResourceError {
    fn from(err: ConfigError) -> Self {
        ResourceError::Config(err)
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

/// A high-level error raised while bringing up or running a graphics context.
#[derive(Debug)]
pub enum RenderError {
    /// A failure occurred during the initialization of the graphics backend.
    InitializationFailed(String),
    /// An error occurred while managing a GPU resource.
    ResourceError(ResourceError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InitializationFailed(msg) => {
                write!(f, "Failed to initialize graphics backend: {msg}")
            }
            RenderError::ResourceError(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

impl From<ConfigError> for RenderError {
    fn from(err: ConfigError) -> Self {
        RenderError::ResourceError(err.into())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::CubeLayerCount { layers: 5 };
        assert_eq!(
            format!("{err}"),
            "6 images are required for a cube texture, got 5"
        );

        let err = ConfigError::UniformCapacityExceeded {
            name: "x".to_string(),
            capacity: 1,
            provided: 3,
        };
        assert_eq!(
            format!("{err}"),
            "Expected at most 1 element(s) for uniform 'x', got 3"
        );
    }

    #[test]
    fn canvas_mismatch_mentions_dimensions() {
        let err = ConfigError::CanvasDimensionMismatch {
            expected: (64, 64),
            actual: (128, 128),
        };
        let text = format!("{err}");
        assert!(text.contains("same dimensions"));
        assert!(text.contains("64x64 vs 128x128"));
    }

    #[test]
    fn resource_error_display_wrapping_shader_error() {
        let shader_err = ShaderError::LinkError {
            log: "missing main".to_string(),
        };
        let res_err: ResourceError = shader_err.into();
        assert_eq!(
            format!("{res_err}"),
            "Shader resource error: Could not link shader: missing main"
        );
        assert!(res_err.source().is_some());
    }

    #[test]
    fn render_error_display_wrapping_config_error() {
        let render_err: RenderError = ConfigError::AttachToAttachment.into();
        assert_eq!(
            format!("{render_err}"),
            "Graphics resource operation failed: Configuration error: Attempted to attach to a mesh which is an attachment itself"
        );
        assert!(render_err.source().is_some());
        assert!(render_err.source().unwrap().source().is_some());
    }
}
