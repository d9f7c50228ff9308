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

//! Resource objects and the context operations that manage them.
//!
//! Each sub-module defines one resource type together with the
//! `GraphicsContext` methods that create, mutate and destroy it.

pub mod buffer;
pub mod canvas;
pub mod mesh;
pub mod shader;
pub mod shader_block;
pub mod texture;

pub use self::buffer::Buffer;
pub use self::canvas::Canvas;
pub use self::mesh::{IndexData, Mesh, MeshAttachment};
pub use self::shader::{Shader, Uniform, UniformData, UniformValue};
pub use self::shader_block::{pack, BlockField, BlockUniform, BlockValue, ShaderBlock};
pub use self::texture::Texture;

use std::ops::Range;

/// A half-open range of modified elements awaiting upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DirtyRange {
    range: Option<Range<u64>>,
}

impl DirtyRange {
    /// Widens the range to cover `start..end`.
    pub(crate) fn include(&mut self, start: u64, end: u64) {
        if start >= end {
            return;
        }
        self.range = Some(match self.range.take() {
            Some(r) => r.start.min(start)..r.end.max(end),
            None => start..end,
        });
    }

    /// Takes the pending range, leaving the tracker clean.
    pub(crate) fn take(&mut self) -> Option<Range<u64>> {
        self.range.take()
    }
}

/// Rounds up to the next power of two; zero stays zero.
pub(crate) fn next_po2(value: u64) -> u64 {
    if value == 0 {
        0
    } else {
        value.next_power_of_two()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirty_range_widens() {
        let mut dirty = DirtyRange::default();
        dirty.include(4, 8);
        dirty.include(2, 5);
        dirty.include(10, 12);
        assert_eq!(dirty.take(), Some(2..12));
        assert_eq!(dirty.take(), None);
    }

    #[test]
    fn test_empty_include_is_ignored() {
        let mut dirty = DirtyRange::default();
        dirty.include(3, 3);
        assert_eq!(dirty.take(), None);
    }

    #[test]
    fn test_next_po2() {
        assert_eq!(next_po2(0), 0);
        assert_eq!(next_po2(1), 1);
        assert_eq!(next_po2(5), 8);
        assert_eq!(next_po2(64), 64);
    }
}
