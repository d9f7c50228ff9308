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

//! Access categories tracked per resource by the synchronization tracker.

use bitflags::bitflags;

bitflags! {
    /// The kinds of GPU access a resource can have pending.
    ///
    /// Each flag is one tracking category. Categories listed in
    /// [`GpuAccess::WRITES`] are hazards with respect to every other access.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GpuAccess: u32 {
        /// Read as a vertex stream.
        const VERTEX_READ = 1 << 0;
        /// Read as an index stream.
        const INDEX_READ = 1 << 1;
        /// Read as a uniform block.
        const UNIFORM_READ = 1 << 2;
        /// Read as indirect draw arguments.
        const INDIRECT_READ = 1 << 3;
        /// Sampled from a shader.
        const SAMPLED_READ = 1 << 4;
        /// Read as compute storage.
        const STORAGE_READ = 1 << 5;
        /// Read back to the CPU.
        const DOWNLOAD_READ = 1 << 6;
        /// Written as a color render target.
        const COLOR_TARGET_WRITE = 1 << 7;
        /// Written as a depth/stencil render target.
        const DEPTH_TARGET_WRITE = 1 << 8;
        /// Written as compute storage.
        const COMPUTE_STORAGE_WRITE = 1 << 9;
        /// Written from the CPU.
        const UPLOAD_WRITE = 1 << 10;
    }
}

impl GpuAccess {
    /// The number of tracking categories.
    pub const CATEGORY_COUNT: usize = 11;

    /// Every category that writes.
    pub const WRITES: Self = Self::COLOR_TARGET_WRITE
        .union(Self::DEPTH_TARGET_WRITE)
        .union(Self::COMPUTE_STORAGE_WRITE)
        .union(Self::UPLOAD_WRITE);

    /// Render target writes. Rasterization orders them, so one following
    /// another on the same target needs no barrier.
    pub const TARGET_WRITES: Self = Self::COLOR_TARGET_WRITE.union(Self::DEPTH_TARGET_WRITE);

    /// Returns `true` when any write category is present.
    #[inline]
    pub fn has_write(self) -> bool {
        self.intersects(Self::WRITES)
    }

    /// Returns `true` when only render target writes are present.
    #[inline]
    pub fn is_target_write(self) -> bool {
        !self.is_empty() && Self::TARGET_WRITES.contains(self)
    }

    /// Returns the tracking-list index of a single-category flag.
    #[inline]
    pub fn category_index(self) -> usize {
        self.bits().trailing_zeros() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_mask() {
        assert!(GpuAccess::UPLOAD_WRITE.has_write());
        assert!((GpuAccess::SAMPLED_READ | GpuAccess::DEPTH_TARGET_WRITE).has_write());
        assert!(!(GpuAccess::VERTEX_READ | GpuAccess::DOWNLOAD_READ).has_write());
    }

    #[test]
    fn test_target_writes() {
        assert!(GpuAccess::COLOR_TARGET_WRITE.is_target_write());
        assert!(GpuAccess::TARGET_WRITES.is_target_write());
        assert!(!(GpuAccess::COLOR_TARGET_WRITE | GpuAccess::SAMPLED_READ).is_target_write());
        assert!(!GpuAccess::empty().is_target_write());
    }

    #[test]
    fn test_category_indices_cover_all_flags() {
        let indices: Vec<usize> = GpuAccess::all().iter().map(|a| a.category_index()).collect();
        assert_eq!(indices.len(), GpuAccess::CATEGORY_COUNT);
        assert_eq!(indices.last().copied(), Some(GpuAccess::CATEGORY_COUNT - 1));
    }
}
