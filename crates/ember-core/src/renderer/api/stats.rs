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

//! Per-frame diagnostics, device limits and device features.

/// Counters accumulated during a frame and reset at present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphicsStats {
    /// Number of program switches issued.
    pub shader_switches: u32,
    /// Number of draw calls issued.
    pub draw_calls: u32,
    /// Number of other state changes that reached the device.
    pub state_changes: u32,
    /// Number of memory barriers issued.
    pub barriers: u32,
}

/// Hardware limits queried once at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphicsLimits {
    /// Smallest and largest point size.
    pub point_sizes: [f32; 2],
    /// Largest texture dimension.
    pub texture_size: u32,
    /// Largest MSAA sample count.
    pub texture_msaa: u32,
    /// Largest anisotropy level.
    pub texture_anisotropy: f32,
}

impl Default for GraphicsLimits {
    fn default() -> Self {
        Self {
            point_sizes: [1.0, 1.0],
            texture_size: 2048,
            texture_msaa: 1,
            texture_anisotropy: 1.0,
        }
    }
}

/// Optional capabilities of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceFeatures {
    /// Both eyes can be drawn in one call through a viewport array.
    pub single_pass_stereo: bool,
    /// DXT block-compressed textures are supported.
    pub compressed_textures: bool,
    /// Anisotropic filtering is supported.
    pub anisotropic_filtering: bool,
    /// Memory barriers between access sets are supported.
    pub memory_barriers: bool,
}
