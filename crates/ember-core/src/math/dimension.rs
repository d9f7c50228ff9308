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

//! Integer extents and origins for textures, canvases and pixel regions.

/// A three-dimensional extent: width, height and depth (or layer count).
///
/// Cube textures store their six faces as layers, array textures their
/// slices, volume textures their depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3D {
    /// The width in texels.
    pub width: u32,
    /// The height in texels.
    pub height: u32,
    /// The depth or number of array layers.
    pub depth_or_array_layers: u32,
}

impl Extent3D {
    /// Creates a new extent.
    #[inline]
    pub const fn new(width: u32, height: u32, depth_or_array_layers: u32) -> Self {
        Self {
            width,
            height,
            depth_or_array_layers,
        }
    }

    /// Creates a single-layer 2D extent.
    #[inline]
    pub const fn d2(width: u32, height: u32) -> Self {
        Self::new(width, height, 1)
    }

    /// Returns `true` when any axis is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth_or_array_layers == 0
    }

    /// Returns the extent of a mip level.
    ///
    /// Width and height halve per level and never drop below one. The third
    /// axis only shrinks when it is a real depth (`shrink_depth`); layer
    /// counts stay constant across levels.
    pub fn mip_level(&self, level: u32, shrink_depth: bool) -> Self {
        let shrink = |v: u32| (v >> level.min(31)).max(1);
        Self {
            width: shrink(self.width),
            height: shrink(self.height),
            depth_or_array_layers: if shrink_depth {
                shrink(self.depth_or_array_layers)
            } else {
                self.depth_or_array_layers
            },
        }
    }
}

/// A three-dimensional origin, representing an (x, y, z) offset.
///
/// For layered textures `z` selects the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Origin3D {
    /// The x-coordinate of the origin.
    pub x: u32,
    /// The y-coordinate of the origin.
    pub y: u32,
    /// The z-coordinate or array layer of the origin.
    pub z: u32,
}

impl Origin3D {
    /// Creates a new origin.
    #[inline]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
}
