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

//! Textures and texture views.

use crate::arena::TextureHandle;
use crate::context::GraphicsContext;
use crate::state::TextureBinding;
use crate::sync::SyncResource;
use ember_core::math::{Extent3D, Origin3D};
use ember_core::renderer::{
    Attachment, ConfigError, FilterMode, FramebufferTarget, GpuAccess, GpuDevice, Image, ImagePixels, MipmapCount,
    ResourceError, TextureDescriptor, TextureFilter, TextureFormat, TextureId, TextureRegion,
    TextureSubrange, TextureType, TextureUsage, TextureViewDescriptor, TextureWrap,
};

/// A GPU texture, or a view into the storage of another texture.
#[derive(Debug)]
pub struct Texture {
    pub(crate) id: TextureId,
    pub(crate) label: Option<String>,
    pub(crate) texture_type: TextureType,
    pub(crate) format: TextureFormat,
    pub(crate) size: Extent3D,
    pub(crate) mipmaps: u32,
    pub(crate) samples: u32,
    pub(crate) usage: TextureUsage,
    pub(crate) srgb: bool,
    pub(crate) filter: TextureFilter,
    pub(crate) wrap: TextureWrap,
    /// Set for views; the view holds a reference on its source.
    pub(crate) source: Option<TextureHandle>,
    pub(crate) base_layer: u32,
    pub(crate) base_mipmap: u32,
}

impl Texture {
    /// The device id. A view has its own id aliasing its source's storage.
    pub fn id(&self) -> TextureId {
        self.id
    }

    /// The debug label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The texture type.
    pub fn texture_type(&self) -> TextureType {
        self.texture_type
    }

    /// The pixel format.
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// The extent of mip level zero.
    pub fn size(&self) -> Extent3D {
        self.size
    }

    /// The extent of a mip level.
    pub fn mip_size(&self, level: u32) -> Extent3D {
        self.size
            .mip_level(level, self.texture_type.has_depth())
    }

    /// Number of mip levels.
    pub fn mipmap_count(&self) -> u32 {
        self.mipmaps
    }

    /// Samples per pixel.
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// The usage set.
    pub fn usage(&self) -> TextureUsage {
        self.usage
    }

    /// Whether the texture stores sRGB-encoded color.
    pub fn srgb(&self) -> bool {
        self.srgb
    }

    /// The current filter.
    pub fn filter(&self) -> TextureFilter {
        self.filter
    }

    /// The current wrap modes.
    pub fn wrap(&self) -> TextureWrap {
        self.wrap
    }

    /// The texture a view was created from.
    pub fn source(&self) -> Option<TextureHandle> {
        self.source
    }

    /// Returns `true` for views.
    pub fn is_view(&self) -> bool {
        self.source.is_some()
    }

    /// First layer and first mip level of the source covered by a view.
    pub fn view_base(&self) -> (u32, u32) {
        (self.base_layer, self.base_mipmap)
    }

    pub(crate) fn binding(&self, handle: TextureHandle) -> TextureBinding {
        TextureBinding {
            handle,
            id: self.id,
            texture_type: self.texture_type,
        }
    }

    /// Checks that a pixel replacement fits this texture and returns the region it covers.
    pub(crate) fn replace_region(
        &self,
        image: &Image,
        x: u32,
        y: u32,
        slice: u32,
        mipmap: u32,
    ) -> Result<TextureRegion, ConfigError> {
        if self.is_view() {
            return Err(ConfigError::ViewNotWritable);
        }
        if mipmap >= self.mipmaps {
            return Err(ConfigError::MipmapOutOfRange {
                level: mipmap,
                count: self.mipmaps,
            });
        }
        let extent = self.mip_size(mipmap);
        let fits_x = x.checked_add(image.width).is_some_and(|e| e <= extent.width);
        let fits_y = y.checked_add(image.height).is_some_and(|e| e <= extent.height);
        if !fits_x || !fits_y {
            return Err(ConfigError::RegionOutOfBounds(format!(
                "{}x{} at ({x}, {y}) exceeds mip {mipmap} of size {}x{}",
                image.width, image.height, extent.width, extent.height
            )));
        }
        if slice >= extent.depth_or_array_layers {
            return Err(ConfigError::RegionOutOfBounds(format!(
                "slice {slice} exceeds {} layer(s)",
                extent.depth_or_array_layers
            )));
        }
        let compressed_pixels = matches!(image.pixels, ImagePixels::Compressed(_));
        if compressed_pixels != self.format.is_compressed() {
            return Err(ConfigError::InvalidUsage(format!(
                "image data does not match texture format {:?}",
                self.format
            )));
        }
        if compressed_pixels
            && (x != 0
                || y != 0
                || mipmap != 0
                || image.width != self.size.width
                || image.height != self.size.height)
        {
            return Err(ConfigError::CompressedPartialReplace);
        }
        if let ImagePixels::Raw(data) = image.pixels {
            let expected = self.format.image_size(image.width, image.height);
            if data.len() < expected {
                return Err(ConfigError::RegionOutOfBounds(format!(
                    "expected {expected} byte(s) of pixel data, got {}",
                    data.len()
                )));
            }
        }
        Ok(TextureRegion {
            origin: Origin3D::new(x, y, slice),
            extent: Extent3D::d2(image.width, image.height),
            mip_level: mipmap,
        })
    }

    /// Checks that a readback region lies inside one layer of one mip level.
    pub(crate) fn check_read_region(&self, region: &TextureRegion) -> Result<(), ConfigError> {
        if !self.format.is_color_renderable() {
            return Err(ConfigError::UnreadableFormat(self.format));
        }
        let level = region.mip_level;
        if level >= self.mipmaps {
            return Err(ConfigError::MipmapOutOfRange {
                level,
                count: self.mipmaps,
            });
        }
        let extent = self.mip_size(level);
        let (origin, size) = (region.origin, region.extent);
        let fits_x = origin.x.checked_add(size.width).is_some_and(|e| e <= extent.width);
        let fits_y = origin.y.checked_add(size.height).is_some_and(|e| e <= extent.height);
        if !fits_x || !fits_y {
            return Err(ConfigError::RegionOutOfBounds(format!(
                "{}x{} at ({}, {}) exceeds mip {level} of size {}x{}",
                size.width, size.height, origin.x, origin.y, extent.width, extent.height
            )));
        }
        if origin.z >= extent.depth_or_array_layers {
            return Err(ConfigError::RegionOutOfBounds(format!(
                "layer {} exceeds {} layer(s)",
                origin.z, extent.depth_or_array_layers
            )));
        }
        Ok(())
    }
}

/// Checks a view descriptor against its source and fills in "rest of" counts.
fn resolve_view(
    source: &Texture,
    descriptor: &TextureViewDescriptor,
) -> Result<(u32, u32), ConfigError> {
    if !descriptor.texture_type.can_view(source.texture_type) {
        return Err(ConfigError::IncompatibleView(format!(
            "a {:?} view cannot alias a {:?} texture",
            descriptor.texture_type, source.texture_type
        )));
    }
    let layers = if source.texture_type.has_depth() {
        1
    } else {
        source.size.depth_or_array_layers
    };
    let layer_count = match (descriptor.layer_count, descriptor.texture_type) {
        (0, TextureType::D2) => 1,
        (0, _) => layers.saturating_sub(descriptor.layer_index),
        (n, _) => n,
    };
    if descriptor.texture_type == TextureType::D2 && layer_count != 1 {
        return Err(ConfigError::IncompatibleView(format!(
            "a 2D view covers one layer, not {layer_count}"
        )));
    }
    let mipmap_count = match descriptor.mipmap_count {
        0 => source.mipmaps.saturating_sub(descriptor.mipmap_index),
        n => n,
    };
    if layer_count == 0 || descriptor.layer_index + layer_count > layers {
        return Err(ConfigError::IncompatibleView(format!(
            "layers {}..{} exceed the source's {layers}",
            descriptor.layer_index,
            descriptor.layer_index + layer_count
        )));
    }
    if mipmap_count == 0 || descriptor.mipmap_index + mipmap_count > source.mipmaps {
        return Err(ConfigError::IncompatibleView(format!(
            "mip levels {}..{} exceed the source's {}",
            descriptor.mipmap_index,
            descriptor.mipmap_index + mipmap_count,
            source.mipmaps
        )));
    }
    if descriptor.texture_type == TextureType::Cube && layer_count != 6 {
        return Err(ConfigError::CubeLayerCount {
            layers: layer_count,
        });
    }
    if descriptor.texture_type == TextureType::Cube && source.size.width != source.size.height {
        return Err(ConfigError::CubeNotSquare {
            width: source.size.width,
            height: source.size.height,
        });
    }
    Ok((layer_count, mipmap_count))
}

impl<D: GpuDevice> GraphicsContext<D> {
    /// Creates a texture and uploads its initial slices.
    ///
    /// ## Arguments
    /// * `descriptor` - Type, format, extent, mip count and usage.
    /// * `slices` - Images for layers `0..slices.len()` at mip level zero.
    ///   Empty images leave their layer undefined.
    ///
    /// ## Errors
    /// * `ConfigError` - If the descriptor or a slice is invalid.
    /// * `ResourceError::OutOfMemory` - If the device cannot allocate the storage.
    pub fn create_texture(
        &mut self,
        descriptor: &TextureDescriptor,
        slices: &[Image],
    ) -> Result<TextureHandle, ResourceError> {
        let mipmaps = descriptor.validate()?;
        let layers = descriptor.size.depth_or_array_layers;
        if slices.len() as u32 > layers {
            return Err(ConfigError::LayerCountMismatch {
                expected: layers,
                actual: slices.len() as u32,
            }
            .into());
        }
        if descriptor.format.is_compressed() && !self.features.compressed_textures {
            return Err(ConfigError::InvalidUsage(format!(
                "compressed format {:?} is not supported by this device",
                descriptor.format
            ))
            .into());
        }
        let max = self.limits.texture_size;
        if descriptor.size.width > max || descriptor.size.height > max {
            return Err(ConfigError::InvalidUsage(format!(
                "texture size {}x{} exceeds the device limit of {max}",
                descriptor.size.width, descriptor.size.height
            ))
            .into());
        }

        let id = self.device.create_texture()?;
        let filter = self.clamp_filter(self.config.default_filter);
        let wrap = TextureWrap::default_for(descriptor.texture_type);
        let handle = self.textures.insert(Texture {
            id,
            label: descriptor.label.as_ref().map(|l| l.to_string()),
            texture_type: descriptor.texture_type,
            format: descriptor.format,
            size: descriptor.size,
            mipmaps,
            samples: descriptor.samples,
            usage: descriptor.usage,
            srgb: descriptor.srgb,
            filter,
            wrap,
            source: None,
            base_layer: 0,
            base_mipmap: 0,
        });

        if let Err(e) = self.initialize_texture(handle, slices) {
            self.destroy_texture(handle)?;
            return Err(e);
        }

        log::debug!(
            "Created texture '{}' ({:?}, {:?} {:?} {}x{}x{}, {mipmaps} mip(s))",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            descriptor.texture_type,
            descriptor.format,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.size.depth_or_array_layers
        );
        Ok(handle)
    }

    fn initialize_texture(
        &mut self,
        handle: TextureHandle,
        slices: &[Image],
    ) -> Result<(), ResourceError> {
        self.bind_texture_slot(0, Some(handle))?;
        let texture = self.textures.get(handle)?;
        let (texture_type, format, srgb, size) =
            (texture.texture_type, texture.format, texture.srgb, texture.size);
        let (mipmaps, filter, wrap) = (texture.mipmaps, texture.filter, texture.wrap);

        // Compressed levels are specified one by one as they are uploaded.
        if !format.is_compressed() {
            self.device
                .texture_storage(texture_type, mipmaps, format, srgb, size)?;
        }
        self.device.texture_filter(texture_type, filter, mipmaps > 1);
        self.device.texture_wrap(texture_type, wrap);

        for (slice, image) in slices.iter().enumerate() {
            if !matches!(image.pixels, ImagePixels::Empty) {
                self.replace_pixels(handle, image, 0, 0, slice as u32, 0)?;
            }
        }
        Ok(())
    }

    /// Resolves a texture handle.
    pub fn texture(&self, handle: TextureHandle) -> Result<&Texture, ResourceError> {
        self.textures.get(handle)
    }

    /// Overwrites a region of one slice and mip level.
    ///
    /// Compressed images must replace the whole texture at level zero; their
    /// own mip chain is uploaded along with it. Uncompressed replacements
    /// regenerate the mip chain when the texture has more than one level.
    ///
    /// ## Errors
    /// * `ConfigError::ViewNotWritable` - If `handle` is a view.
    /// * `ConfigError::MipmapOutOfRange` - If `mipmap` does not exist.
    /// * `ConfigError::RegionOutOfBounds` - If the region does not fit the level.
    /// * `ConfigError::CompressedPartialReplace` - For partial compressed uploads.
    pub fn replace_pixels(
        &mut self,
        handle: TextureHandle,
        image: &Image,
        x: u32,
        y: u32,
        slice: u32,
        mipmap: u32,
    ) -> Result<(), ResourceError> {
        let texture = self.textures.get(handle)?;
        let region = texture.replace_region(image, x, y, slice, mipmap)?;
        let (texture_type, format, srgb, mipmaps) =
            (texture.texture_type, texture.format, texture.srgb, texture.mipmaps);

        self.track(SyncResource::Texture(handle), GpuAccess::UPLOAD_WRITE);
        self.bind_texture_slot(0, Some(handle))?;

        match &image.pixels {
            ImagePixels::Empty => {}
            ImagePixels::Compressed(levels) => {
                for (level, mip) in levels.iter().take(mipmaps as usize).enumerate() {
                    let region = TextureRegion {
                        origin: Origin3D::new(0, 0, slice),
                        extent: Extent3D::d2(mip.width, mip.height),
                        mip_level: level as u32,
                    };
                    self.device
                        .compressed_texture_image(texture_type, region, format, srgb, mip.data);
                }
            }
            ImagePixels::Raw(data) => {
                self.device
                    .texture_sub_image(texture_type, region, format, data);
                if mipmaps > 1 {
                    self.device.generate_mipmaps(texture_type);
                }
            }
        }
        Ok(())
    }

    /// Reads a region of one layer and mip level back as tightly packed RGBA8 rows.
    ///
    /// `region.origin.z` selects the layer (the cube face, or the depth slice
    /// of a volume). The texture is attached to a scratch framebuffer for the
    /// read; the bound framebuffer is restored afterwards.
    ///
    /// ## Errors
    /// * `ConfigError::UnreadableFormat` - For compressed and depth formats.
    /// * `ConfigError::MipmapOutOfRange` - If the level does not exist.
    /// * `ConfigError::RegionOutOfBounds` - If the region or layer does not fit the level.
    /// * `ConfigError::IncompleteFramebuffer` - If the device cannot attach the layer.
    pub fn texture_pixels(
        &mut self,
        handle: TextureHandle,
        region: TextureRegion,
    ) -> Result<Vec<u8>, ResourceError> {
        let texture = self.textures.get(handle)?;
        texture.check_read_region(&region)?;
        let (id, texture_type) = (texture.id, texture.texture_type);

        self.track(SyncResource::Texture(handle), GpuAccess::DOWNLOAD_READ);
        let framebuffer = match self.readback_framebuffer {
            Some(framebuffer) => framebuffer,
            None => {
                let framebuffer = self.device.create_framebuffer()?;
                self.readback_framebuffer = Some(framebuffer);
                framebuffer
            }
        };
        self.device
            .bind_framebuffer(FramebufferTarget::Both, Some(framebuffer));
        self.device.framebuffer_texture_layer(
            Attachment::Color(0),
            texture_type,
            Some(id),
            region.mip_level,
            region.origin.z,
        );

        let (width, height) = (region.extent.width, region.extent.height);
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        let status = self.check_framebuffer();
        if status.is_ok() {
            self.device
                .read_pixels(region.origin.x, region.origin.y, width, height, &mut pixels);
        }
        self.device
            .framebuffer_texture_layer(Attachment::Color(0), texture_type, None, 0, 0);
        let current = self.state.framebuffer();
        self.device.bind_framebuffer(FramebufferTarget::Both, current);
        status?;
        Ok(pixels)
    }

    /// Changes the filter of a texture.
    ///
    /// Anisotropy is clamped to the device limit.
    pub fn set_texture_filter(
        &mut self,
        handle: TextureHandle,
        filter: TextureFilter,
    ) -> Result<(), ResourceError> {
        let filter = self.clamp_filter(filter);
        let texture = self.textures.get_mut(handle)?;
        texture.filter = filter;
        let (texture_type, mipmapped) = (texture.texture_type, texture.mipmaps > 1);
        self.bind_texture_slot(0, Some(handle))?;
        self.device.texture_filter(texture_type, filter, mipmapped);
        Ok(())
    }

    /// Changes the wrap modes of a texture.
    pub fn set_texture_wrap(
        &mut self,
        handle: TextureHandle,
        wrap: TextureWrap,
    ) -> Result<(), ResourceError> {
        let texture = self.textures.get_mut(handle)?;
        texture.wrap = wrap;
        let texture_type = texture.texture_type;
        self.bind_texture_slot(0, Some(handle))?;
        self.device.texture_wrap(texture_type, wrap);
        Ok(())
    }

    /// Creates a view onto a subset of a texture's layers and mip levels.
    ///
    /// The view aliases its source's storage through its own device texture
    /// and keeps the source alive until the view is destroyed. Layered
    /// sources can be viewed as one 2D layer, an array or a cube.
    ///
    /// ## Errors
    /// * `ConfigError::IncompatibleView` - If the types are incompatible, a range falls
    ///   outside the source, or the device cannot alias storage.
    /// * `ConfigError::CubeLayerCount` - If a cube view does not cover six layers.
    pub fn create_texture_view(
        &mut self,
        source: TextureHandle,
        descriptor: &TextureViewDescriptor,
    ) -> Result<TextureHandle, ResourceError> {
        let parent = self.textures.get(source)?;
        let (layer_count, mipmap_count) = resolve_view(parent, descriptor)?;
        let range = TextureSubrange {
            base_layer: descriptor.layer_index,
            layer_count,
            base_mipmap: descriptor.mipmap_index,
            mipmap_count,
        };
        let id = self.device.create_texture_view(
            parent.id,
            descriptor.texture_type,
            parent.format,
            parent.srgb,
            range,
        )?;

        let size = parent.mip_size(descriptor.mipmap_index);
        let view = Texture {
            id,
            label: descriptor.label.as_ref().map(|l| l.to_string()),
            texture_type: descriptor.texture_type,
            format: parent.format,
            size: if parent.texture_type.has_depth() {
                size
            } else {
                Extent3D::new(size.width, size.height, layer_count)
            },
            mipmaps: mipmap_count,
            samples: parent.samples,
            usage: parent.usage,
            srgb: parent.srgb,
            filter: parent.filter,
            wrap: parent.wrap,
            source: Some(source),
            base_layer: parent.base_layer + descriptor.layer_index,
            base_mipmap: parent.base_mipmap + descriptor.mipmap_index,
        };

        self.textures.retain(source)?;
        let handle = self.textures.insert(view);
        log::debug!("Created texture view {handle:?} of {source:?} ({range:?})");
        Ok(handle)
    }

    /// Drops a reference to a texture.
    ///
    /// The storage is deleted once neither the caller nor any view, canvas
    /// or shader holds a reference. Destroying a view releases its source.
    pub fn destroy_texture(&mut self, handle: TextureHandle) -> Result<(), ResourceError> {
        let Some(texture) = self.textures.release(handle)? else {
            return Ok(());
        };
        self.state.forget_texture(handle);
        self.sync.forget(SyncResource::Texture(handle));
        if self.default_texture == Some(handle) {
            self.default_texture = None;
        }
        self.device.destroy_texture(texture.id);
        log::debug!("Destroyed texture {:?}", texture.id);
        if let Some(source) = texture.source {
            self.destroy_texture(source)?;
        }
        Ok(())
    }

    /// Increments the reference count of a texture.
    pub fn retain_texture(&mut self, handle: TextureHandle) -> Result<(), ResourceError> {
        self.textures.retain(handle)
    }

    /// Binds a texture (or the default white texture) to a slot through the state cache.
    pub(crate) fn bind_texture_slot(
        &mut self,
        slot: u32,
        handle: Option<TextureHandle>,
    ) -> Result<(), ResourceError> {
        let handle = match handle {
            Some(handle) => handle,
            None => self.default_texture()?,
        };
        let binding = self.textures.get(handle)?.binding(handle);
        self.state
            .bind_texture(&mut self.device, slot, Some(binding))?;
        Ok(())
    }

    /// Returns the 1x1 white texture bound for samplers without a texture.
    pub(crate) fn default_texture(&mut self) -> Result<TextureHandle, ResourceError> {
        if let Some(handle) = self.default_texture {
            return Ok(handle);
        }
        let white = [0xff_u8; 4];
        let descriptor = TextureDescriptor {
            label: Some("default".into()),
            mipmaps: MipmapCount::Count(1),
            srgb: false,
            ..Default::default()
        };
        let image = Image::raw(1, 1, TextureFormat::Rgba8, &white);
        let handle = self.create_texture(&descriptor, std::slice::from_ref(&image))?;
        self.default_texture = Some(handle);
        Ok(handle)
    }

    fn clamp_filter(&self, filter: TextureFilter) -> TextureFilter {
        let mut filter = filter;
        filter.anisotropy = filter
            .anisotropy
            .clamp(1.0, self.limits.texture_anisotropy.max(1.0));
        if filter.mode == FilterMode::Anisotropic && !self.features.anisotropic_filtering {
            filter.mode = FilterMode::Trilinear;
        }
        filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::renderer::CompressedMip;

    fn texture(texture_type: TextureType, format: TextureFormat, size: Extent3D) -> Texture {
        Texture {
            id: TextureId(1),
            label: None,
            texture_type,
            format,
            size,
            mipmaps: ember_core::renderer::api::texture::full_mipmap_count(size, texture_type),
            samples: 1,
            usage: TextureUsage::SAMPLE,
            srgb: false,
            filter: TextureFilter::default(),
            wrap: TextureWrap::default_for(texture_type),
            source: None,
            base_layer: 0,
            base_mipmap: 0,
        }
    }

    #[test]
    fn test_region_must_fit_mip_level() {
        let t = texture(TextureType::D2, TextureFormat::Rgba8, Extent3D::d2(8, 8));
        let pixels = [0u8; 16];
        let image = Image::raw(2, 2, TextureFormat::Rgba8, &pixels);
        assert!(t.replace_region(&image, 6, 6, 0, 0).is_ok());
        assert!(matches!(
            t.replace_region(&image, 3, 0, 0, 2),
            Err(ConfigError::RegionOutOfBounds(_))
        ));
        assert_eq!(
            t.replace_region(&image, 0, 0, 0, 4),
            Err(ConfigError::MipmapOutOfRange { level: 4, count: 4 })
        );
    }

    #[test]
    fn test_slice_must_exist() {
        let t = texture(TextureType::Cube, TextureFormat::Rgba8, Extent3D::new(4, 4, 6));
        let pixels = [0u8; 64];
        let image = Image::raw(4, 4, TextureFormat::Rgba8, &pixels);
        assert!(t.replace_region(&image, 0, 0, 5, 0).is_ok());
        assert!(t.replace_region(&image, 0, 0, 6, 0).is_err());
    }

    #[test]
    fn test_compressed_replace_must_cover_level_zero() {
        let t = texture(TextureType::D2, TextureFormat::Dxt1, Extent3D::d2(8, 8));
        let block = [0u8; 32];
        let partial = Image {
            width: 4,
            height: 4,
            format: TextureFormat::Dxt1,
            pixels: ImagePixels::Compressed(vec![CompressedMip {
                width: 4,
                height: 4,
                data: &block,
            }]),
        };
        assert_eq!(
            t.replace_region(&partial, 0, 0, 0, 0),
            Err(ConfigError::CompressedPartialReplace)
        );
        let full = Image {
            width: 8,
            height: 8,
            ..partial
        };
        assert!(t.replace_region(&full, 0, 0, 0, 0).is_ok());
    }

    #[test]
    fn test_short_pixel_data_is_rejected() {
        let t = texture(TextureType::D2, TextureFormat::Rgba8, Extent3D::d2(4, 4));
        let pixels = [0u8; 8];
        let image = Image::raw(2, 2, TextureFormat::Rgba8, &pixels);
        assert!(matches!(
            t.replace_region(&image, 0, 0, 0, 0),
            Err(ConfigError::RegionOutOfBounds(_))
        ));
    }

    #[test]
    fn test_view_ranges_default_to_the_rest() {
        let source = texture(TextureType::Array, TextureFormat::Rgba8, Extent3D::new(8, 8, 4));
        let descriptor = TextureViewDescriptor {
            texture_type: TextureType::Array,
            layer_index: 1,
            mipmap_index: 2,
            ..Default::default()
        };
        assert_eq!(resolve_view(&source, &descriptor), Ok((3, 2)));
    }

    #[test]
    fn test_read_region_must_fit_layer_and_level() {
        let t = texture(TextureType::Array, TextureFormat::Rgba8, Extent3D::new(8, 8, 4));
        let region = |z: u32, mip_level: u32, width: u32| TextureRegion {
            origin: Origin3D::new(0, 0, z),
            extent: Extent3D::d2(width, 1),
            mip_level,
        };
        assert_eq!(t.check_read_region(&region(3, 1, 4)), Ok(()));
        assert!(matches!(
            t.check_read_region(&region(4, 0, 1)),
            Err(ConfigError::RegionOutOfBounds(_))
        ));
        assert!(matches!(
            t.check_read_region(&region(0, 1, 5)),
            Err(ConfigError::RegionOutOfBounds(_))
        ));
        assert_eq!(
            t.check_read_region(&region(0, 4, 1)),
            Err(ConfigError::MipmapOutOfRange { level: 4, count: 4 })
        );
        let depth = texture(TextureType::D2, TextureFormat::Depth24, Extent3D::d2(4, 4));
        assert_eq!(
            depth.check_read_region(&region(0, 0, 1)),
            Err(ConfigError::UnreadableFormat(TextureFormat::Depth24))
        );
    }

    #[test]
    fn test_layer_of_array_can_be_viewed_as_2d() {
        let source = texture(TextureType::Array, TextureFormat::Rgba8, Extent3D::new(8, 8, 4));
        let layer = TextureViewDescriptor {
            texture_type: TextureType::D2,
            layer_index: 2,
            ..Default::default()
        };
        assert_eq!(resolve_view(&source, &layer), Ok((1, 4)));
        let two_layers = TextureViewDescriptor {
            layer_count: 2,
            ..layer
        };
        assert!(matches!(
            resolve_view(&source, &two_layers),
            Err(ConfigError::IncompatibleView(_))
        ));
    }

    #[test]
    fn test_view_must_have_compatible_type_and_fit() {
        let source = texture(TextureType::Array, TextureFormat::Rgba8, Extent3D::new(8, 8, 4));
        let volume = TextureViewDescriptor {
            texture_type: TextureType::Volume,
            ..Default::default()
        };
        assert!(matches!(
            resolve_view(&source, &volume),
            Err(ConfigError::IncompatibleView(_))
        ));
        let too_many = TextureViewDescriptor {
            texture_type: TextureType::Array,
            layer_index: 2,
            layer_count: 3,
            ..Default::default()
        };
        assert!(resolve_view(&source, &too_many).is_err());
        let cube = TextureViewDescriptor {
            texture_type: TextureType::Cube,
            ..Default::default()
        };
        assert_eq!(
            resolve_view(&source, &cube),
            Err(ConfigError::CubeLayerCount { layers: 4 })
        );
    }
}
