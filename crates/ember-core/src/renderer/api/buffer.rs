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

//! Defines data structures related to GPU buffer resources.

use bitflags::bitflags;
use std::borrow::Cow;

bitflags! {
    /// A set of flags describing the allowed usages of a buffer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferUsage: u32 {
        /// The buffer can be bound as a vertex buffer.
        const VERTEX = 1 << 0;
        /// The buffer can be bound as an index buffer.
        const INDEX = 1 << 1;
        /// The buffer can be bound as a uniform buffer.
        const UNIFORM = 1 << 2;
        /// The buffer can be bound as compute storage.
        const COMPUTE = 1 << 3;
        /// The buffer can hold indirect draw arguments.
        const INDIRECT = 1 << 4;
        /// The buffer can be mapped for CPU writes.
        const UPLOAD = 1 << 5;
        /// The buffer can be read back to the CPU.
        const DOWNLOAD = 1 << 6;
    }
}

/// A descriptor used to create a buffer.
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// An optional debug label for the buffer.
    pub label: Option<Cow<'a, str>>,
    /// The total size of the buffer in bytes.
    pub size: u64,
    /// A bitmask of [`BufferUsage`] flags describing how the buffer will be used.
    pub usage: BufferUsage,
}

impl BufferDescriptor<'_> {
    /// Returns the binding point best suited to this buffer's usage.
    pub fn target(&self) -> BufferTarget {
        if self.usage.contains(BufferUsage::UNIFORM) {
            BufferTarget::Uniform
        } else {
            BufferTarget::Array
        }
    }

    /// Returns the allocation hint matching this buffer's usage.
    pub fn hint(&self) -> BufferUsageHint {
        if self.usage.contains(BufferUsage::UPLOAD) {
            BufferUsageHint::Dynamic
        } else {
            BufferUsageHint::Static
        }
    }
}

/// The binding point a buffer is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data.
    Array,
    /// Index data. Bound as part of the current vertex array.
    ElementArray,
    /// Uniform block data.
    Uniform,
}

/// How often buffer contents are expected to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferUsageHint {
    /// Written once, drawn many times.
    #[default]
    Static,
    /// Rewritten occasionally.
    Dynamic,
    /// Rewritten every frame.
    Stream,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_buffers_use_uniform_target() {
        let desc = BufferDescriptor {
            label: Some("block".into()),
            size: 64,
            usage: BufferUsage::UNIFORM | BufferUsage::UPLOAD,
        };
        assert_eq!(desc.target(), BufferTarget::Uniform);
        assert_eq!(desc.hint(), BufferUsageHint::Dynamic);
    }

    #[test]
    fn test_vertex_buffers_use_array_target() {
        let desc = BufferDescriptor {
            label: None,
            size: 16,
            usage: BufferUsage::VERTEX,
        };
        assert_eq!(desc.target(), BufferTarget::Array);
        assert_eq!(desc.hint(), BufferUsageHint::Static);
    }
}
