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

//! Defines data structures related to GPU texture resources.

use crate::math::{Extent3D, Origin3D};
use crate::renderer::error::ConfigError;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// The dimensionality of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureType {
    /// A single 2D image.
    #[default]
    D2,
    /// Six square 2D faces.
    Cube,
    /// A stack of 2D layers.
    Array,
    /// A 3D volume.
    Volume,
}

impl TextureType {
    /// Returns `true` when the third axis is a real depth that shrinks per mip.
    #[inline]
    pub fn has_depth(self) -> bool {
        matches!(self, TextureType::Volume)
    }

    /// Returns `true` when a view of this type can alias a texture of type `source`.
    ///
    /// Layered sources (arrays and cubes) can be viewed as a single 2D layer,
    /// an array or a cube; 2D and volume textures only as themselves.
    pub fn can_view(self, source: TextureType) -> bool {
        match source {
            TextureType::Array | TextureType::Cube => self != TextureType::Volume,
            other => self == other,
        }
    }
}

/// The pixel format of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// 8-bit RGB.
    Rgb8,
    /// 8-bit RGBA.
    #[default]
    Rgba8,
    /// 4-bit RGBA.
    Rgba4,
    /// 16-bit float RGBA.
    Rgba16Float,
    /// 32-bit float RGBA.
    Rgba32Float,
    /// 16-bit float red.
    R16Float,
    /// 32-bit float red.
    R32Float,
    /// Packed 5/6/5 RGB.
    Rgb565,
    /// Packed 5/5/5/1 RGBA.
    Rgb5A1,
    /// Packed 10/10/10/2 RGBA.
    Rgb10A2,
    /// Packed 11/11/10 float RGB.
    Rg11B10Float,
    /// 16-bit depth.
    Depth16,
    /// 24-bit depth.
    Depth24,
    /// 24-bit depth with 8-bit stencil.
    Depth24Stencil8,
    /// 32-bit float depth.
    Depth32Float,
    /// BC1 block compression.
    Dxt1,
    /// BC2 block compression.
    Dxt3,
    /// BC3 block compression.
    Dxt5,
}

impl TextureFormat {
    /// Returns `true` for block-compressed formats.
    #[inline]
    pub fn is_compressed(self) -> bool {
        matches!(self, Self::Dxt1 | Self::Dxt3 | Self::Dxt5)
    }

    /// Returns `true` for depth and depth/stencil formats.
    #[inline]
    pub fn is_depth(self) -> bool {
        matches!(
            self,
            Self::Depth16 | Self::Depth24 | Self::Depth24Stencil8 | Self::Depth32Float
        )
    }

    /// Returns `true` when the format has an sRGB internal counterpart.
    #[inline]
    pub fn has_srgb_variant(self) -> bool {
        matches!(
            self,
            Self::Rgb8 | Self::Rgba8 | Self::Dxt1 | Self::Dxt3 | Self::Dxt5
        )
    }

    /// Returns `true` when the format can be a canvas color target.
    #[inline]
    pub fn is_color_renderable(self) -> bool {
        !self.is_compressed() && !self.is_depth()
    }

    /// Bytes per texel for uncompressed formats, bytes per 4x4 block otherwise.
    pub fn block_size(self) -> u32 {
        match self {
            Self::Rgb8 => 3,
            Self::Rgba8 | Self::Rgb10A2 | Self::Rg11B10Float | Self::R32Float => 4,
            Self::Rgba4 | Self::Rgb565 | Self::Rgb5A1 | Self::R16Float => 2,
            Self::Rgba16Float => 8,
            Self::Rgba32Float => 16,
            Self::Depth16 => 2,
            Self::Depth24 | Self::Depth24Stencil8 | Self::Depth32Float => 4,
            Self::Dxt1 => 8,
            Self::Dxt3 | Self::Dxt5 => 16,
        }
    }

    /// Returns the byte size of a `width` x `height` image in this format.
    pub fn image_size(self, width: u32, height: u32) -> usize {
        let (w, h) = if self.is_compressed() {
            (width.div_ceil(4), height.div_ceil(4))
        } else {
            (width, height)
        };
        w as usize * h as usize * self.block_size() as usize
    }
}

bitflags! {
    /// A set of flags describing the allowed usages of a texture.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextureUsage: u32 {
        /// The texture can be sampled from a shader.
        const SAMPLE = 1 << 0;
        /// The texture can be rendered to through a canvas.
        const RENDER = 1 << 1;
        /// The texture can be bound as compute storage.
        const COMPUTE = 1 << 2;
        /// The texture can receive CPU pixel uploads.
        const UPLOAD = 1 << 3;
        /// The texture can be read back to the CPU.
        const DOWNLOAD = 1 << 4;
    }
}

/// How many mip levels a texture gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MipmapCount {
    /// A full chain down to 1x1: `floor(log2(max dimension)) + 1` levels.
    #[default]
    Auto,
    /// An explicit number of levels.
    Count(u32),
}

/// Returns the length of a full mip chain for `size`.
///
/// The third axis only participates for volume textures.
pub fn full_mipmap_count(size: Extent3D, texture_type: TextureType) -> u32 {
    let mut max = size.width.max(size.height);
    if texture_type.has_depth() {
        max = max.max(size.depth_or_array_layers);
    }
    if max == 0 {
        return 1;
    }
    32 - max.leading_zeros()
}

/// A descriptor used to create a texture.
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    /// An optional debug label for the texture.
    pub label: Option<Cow<'a, str>>,
    /// The dimensionality of the texture.
    pub texture_type: TextureType,
    /// The pixel format.
    pub format: TextureFormat,
    /// Width, height and depth or layer count.
    pub size: Extent3D,
    /// The requested mip chain.
    pub mipmaps: MipmapCount,
    /// Samples per texel; 1 for regular textures.
    pub samples: u32,
    /// Allowed usages.
    pub usage: TextureUsage,
    /// Whether color data is stored in sRGB space.
    pub srgb: bool,
}

impl Default for TextureDescriptor<'_> {
    fn default() -> Self {
        Self {
            label: None,
            texture_type: TextureType::D2,
            format: TextureFormat::Rgba8,
            size: Extent3D::d2(1, 1),
            mipmaps: MipmapCount::Auto,
            samples: 1,
            usage: TextureUsage::SAMPLE | TextureUsage::UPLOAD,
            srgb: true,
        }
    }
}

impl TextureDescriptor<'_> {
    /// Checks the type-specific constraints and returns the resolved mip count.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the extent is empty, a cube does not
    /// have six square layers, a 2D texture has more than one layer, the
    /// usage set is empty, or an explicit mip count is out of range.
    pub fn validate(&self) -> Result<u32, ConfigError> {
        if self.size.is_empty() {
            return Err(ConfigError::InvalidUsage(format!(
                "texture extent {}x{}x{} is empty",
                self.size.width, self.size.height, self.size.depth_or_array_layers
            )));
        }
        if self.usage.is_empty() {
            return Err(ConfigError::InvalidUsage(
                "texture usage set is empty".to_string(),
            ));
        }
        if self.samples == 0 {
            return Err(ConfigError::InvalidUsage(
                "texture sample count is zero".to_string(),
            ));
        }
        match self.texture_type {
            TextureType::Cube => {
                if self.size.depth_or_array_layers != 6 {
                    return Err(ConfigError::CubeLayerCount {
                        layers: self.size.depth_or_array_layers,
                    });
                }
                if self.size.width != self.size.height {
                    return Err(ConfigError::CubeNotSquare {
                        width: self.size.width,
                        height: self.size.height,
                    });
                }
            }
            TextureType::D2 if self.size.depth_or_array_layers != 1 => {
                return Err(ConfigError::LayerCountMismatch {
                    expected: 1,
                    actual: self.size.depth_or_array_layers,
                });
            }
            _ => {}
        }

        let max = full_mipmap_count(self.size, self.texture_type);
        match self.mipmaps {
            MipmapCount::Auto => Ok(max),
            MipmapCount::Count(n) if n >= 1 && n <= max => Ok(n),
            MipmapCount::Count(n) => Err(ConfigError::InvalidMipmapCount { requested: n, max }),
        }
    }
}

/// Layers and mip levels of a source texture aliased by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureSubrange {
    /// First layer covered.
    pub base_layer: u32,
    /// Number of layers covered.
    pub layer_count: u32,
    /// First mip level covered.
    pub base_mipmap: u32,
    /// Number of mip levels covered.
    pub mipmap_count: u32,
}

/// A descriptor used to create a view into an existing texture.
#[derive(Debug, Clone, Default)]
pub struct TextureViewDescriptor<'a> {
    /// An optional debug label for the view.
    pub label: Option<Cow<'a, str>>,
    /// The view's dimensionality; it must be compatible with the source's.
    pub texture_type: TextureType,
    /// First layer of the source covered by the view.
    pub layer_index: u32,
    /// Number of layers covered by the view.
    pub layer_count: u32,
    /// First mip level of the source covered by the view.
    pub mipmap_index: u32,
    /// Number of mip levels covered by the view.
    pub mipmap_count: u32,
}

/// The minification filter family of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Nearest texel, nearest mip.
    Nearest,
    /// Linear within a level, nearest mip.
    Bilinear,
    /// Linear within and between levels.
    #[default]
    Trilinear,
    /// Trilinear with anisotropic sampling.
    Anisotropic,
}

/// A texture's filter: mode plus anisotropy level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureFilter {
    /// The filter family.
    pub mode: FilterMode,
    /// Maximum anisotropy; only meaningful for [`FilterMode::Anisotropic`].
    pub anisotropy: f32,
}

impl Default for TextureFilter {
    fn default() -> Self {
        Self {
            mode: FilterMode::Trilinear,
            anisotropy: 1.0,
        }
    }
}

/// How texture coordinates outside [0, 1] are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WrapMode {
    /// Clamp to the edge texel.
    Clamp,
    /// Tile.
    #[default]
    Repeat,
    /// Tile with mirroring.
    MirroredRepeat,
}

/// Wrap modes per texture axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureWrap {
    /// The horizontal axis.
    pub s: WrapMode,
    /// The vertical axis.
    pub t: WrapMode,
    /// The depth axis. Only applied to cube and volume textures.
    pub r: WrapMode,
}

impl TextureWrap {
    /// Uses the same mode on every axis.
    pub const fn uniform(mode: WrapMode) -> Self {
        Self {
            s: mode,
            t: mode,
            r: mode,
        }
    }

    /// The default wrap for a texture type: clamp for cubes, repeat otherwise.
    pub fn default_for(texture_type: TextureType) -> Self {
        match texture_type {
            TextureType::Cube => Self::uniform(WrapMode::Clamp),
            _ => Self::uniform(WrapMode::Repeat),
        }
    }
}

/// A region of one mip level targeted by a pixel upload or readback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRegion {
    /// Corner of the region; `z` is the slice or layer.
    pub origin: Origin3D,
    /// Width and height of the region; depth is the number of slices.
    pub extent: Extent3D,
    /// The mip level.
    pub mip_level: u32,
}

/// One pre-compressed mip level.
#[derive(Debug, Clone, Copy)]
pub struct CompressedMip<'a> {
    /// Width of the level in texels.
    pub width: u32,
    /// Height of the level in texels.
    pub height: u32,
    /// Compressed block data.
    pub data: &'a [u8],
}

/// The payload of an [`Image`].
#[derive(Debug, Clone, Default)]
pub enum ImagePixels<'a> {
    /// No data; storage is allocated but left undefined.
    #[default]
    Empty,
    /// Tightly packed uncompressed texels.
    Raw(&'a [u8]),
    /// A compressed mip chain, level zero first.
    Compressed(Vec<CompressedMip<'a>>),
}

/// A CPU-side image used as texture input.
#[derive(Debug, Clone)]
pub struct Image<'a> {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// The pixel format of the data.
    pub format: TextureFormat,
    /// The pixel payload.
    pub pixels: ImagePixels<'a>,
}

impl<'a> Image<'a> {
    /// Wraps tightly packed uncompressed texels.
    pub fn raw(width: u32, height: u32, format: TextureFormat, data: &'a [u8]) -> Self {
        Self {
            width,
            height,
            format,
            pixels: ImagePixels::Raw(data),
        }
    }

    /// Describes an image without data.
    pub fn empty(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            pixels: ImagePixels::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(texture_type: TextureType, size: Extent3D) -> TextureDescriptor<'static> {
        TextureDescriptor {
            texture_type,
            size,
            ..Default::default()
        }
    }

    #[test]
    fn test_auto_mipmaps_for_4x4_is_three() {
        let desc = descriptor(TextureType::D2, Extent3D::d2(4, 4));
        assert_eq!(desc.validate(), Ok(3));
    }

    #[test]
    fn test_auto_mipmaps_use_largest_dimension() {
        assert_eq!(
            full_mipmap_count(Extent3D::d2(5, 300), TextureType::D2),
            9
        );
        assert_eq!(
            full_mipmap_count(Extent3D::new(2, 2, 16), TextureType::Volume),
            5
        );
        assert_eq!(
            full_mipmap_count(Extent3D::new(2, 2, 16), TextureType::Array),
            2
        );
    }

    #[test]
    fn test_layered_sources_accept_layer_views() {
        assert!(TextureType::D2.can_view(TextureType::Array));
        assert!(TextureType::D2.can_view(TextureType::Cube));
        assert!(TextureType::Cube.can_view(TextureType::Array));
        assert!(TextureType::Array.can_view(TextureType::Cube));
        assert!(!TextureType::Array.can_view(TextureType::D2));
        assert!(!TextureType::D2.can_view(TextureType::Volume));
        assert!(!TextureType::Volume.can_view(TextureType::Array));
    }

    #[test]
    fn test_cube_requires_six_layers() {
        let desc = descriptor(TextureType::Cube, Extent3D::new(16, 16, 5));
        assert_eq!(desc.validate(), Err(ConfigError::CubeLayerCount { layers: 5 }));
    }

    #[test]
    fn test_cube_requires_square_faces() {
        let desc = descriptor(TextureType::Cube, Extent3D::new(16, 8, 6));
        assert!(matches!(
            desc.validate(),
            Err(ConfigError::CubeNotSquare { width: 16, height: 8 })
        ));
    }

    #[test]
    fn test_2d_requires_single_layer() {
        let desc = descriptor(TextureType::D2, Extent3D::new(4, 4, 2));
        assert!(matches!(
            desc.validate(),
            Err(ConfigError::LayerCountMismatch { .. })
        ));
    }

    #[test]
    fn test_explicit_mipmap_count_bounds() {
        let mut desc = descriptor(TextureType::D2, Extent3D::d2(8, 8));
        desc.mipmaps = MipmapCount::Count(1);
        assert_eq!(desc.validate(), Ok(1));
        desc.mipmaps = MipmapCount::Count(5);
        assert_eq!(
            desc.validate(),
            Err(ConfigError::InvalidMipmapCount { requested: 5, max: 4 })
        );
    }

    #[test]
    fn test_compressed_image_size_rounds_to_blocks() {
        assert_eq!(TextureFormat::Dxt1.image_size(4, 4), 8);
        assert_eq!(TextureFormat::Dxt5.image_size(5, 4), 32);
        assert_eq!(TextureFormat::Rgba8.image_size(2, 3), 24);
    }

    #[test]
    fn test_default_wrap_per_type() {
        assert_eq!(
            TextureWrap::default_for(TextureType::Cube),
            TextureWrap::uniform(WrapMode::Clamp)
        );
        assert_eq!(
            TextureWrap::default_for(TextureType::Volume).s,
            WrapMode::Repeat
        );
    }
}
