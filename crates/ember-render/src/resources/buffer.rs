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

//! Buffers: a device buffer with a CPU mirror for mapped writes.

use super::DirtyRange;
use crate::arena::BufferHandle;
use crate::context::GraphicsContext;
use crate::sync::SyncResource;
use ember_core::renderer::{
    BufferDescriptor, BufferId, BufferTarget, BufferUsage, BufferUsageHint, ConfigError,
    GpuAccess, GpuDevice, ResourceError,
};

/// A GPU buffer.
///
/// Writes go through [`GraphicsContext::map_buffer`] into the CPU mirror and
/// reach the device on [`GraphicsContext::unmap_buffer`] (or before the next
/// draw that reads the buffer).
#[derive(Debug)]
pub struct Buffer {
    pub(crate) id: BufferId,
    pub(crate) label: Option<String>,
    pub(crate) usage: BufferUsage,
    pub(crate) target: BufferTarget,
    pub(crate) hint: BufferUsageHint,
    pub(crate) data: Vec<u8>,
    pub(crate) dirty: DirtyRange,
}

impl Buffer {
    /// The device id.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// The size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// The usage the buffer was created with.
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// The debug label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The CPU-side contents.
    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    fn check_range(&self, offset: u64, size: u64) -> Result<(), ConfigError> {
        match offset.checked_add(size) {
            Some(end) if end <= self.size() => Ok(()),
            _ => Err(ConfigError::RangeOutOfBounds {
                offset,
                size,
                limit: self.size(),
            }),
        }
    }
}

impl<D: GpuDevice> GraphicsContext<D> {
    /// Creates a buffer.
    ///
    /// ## Errors
    /// * `ConfigError::InvalidUsage` - If the size is zero or the usage set is empty.
    /// * `ResourceError::OutOfMemory` - If the device cannot allocate it.
    pub fn create_buffer(
        &mut self,
        descriptor: &BufferDescriptor,
    ) -> Result<BufferHandle, ResourceError> {
        if descriptor.size == 0 {
            return Err(ConfigError::InvalidUsage("buffer size is zero".to_string()).into());
        }
        if descriptor.usage.is_empty() {
            return Err(ConfigError::InvalidUsage("buffer usage set is empty".to_string()).into());
        }

        let id = self.device.create_buffer()?;
        let target = descriptor.target();
        let hint = descriptor.hint();
        self.bind_buffer_target(target, id);
        if let Err(e) = self.device.buffer_data(target, descriptor.size, None, hint) {
            self.state.forget_buffer(id);
            self.device.destroy_buffer(id);
            return Err(e);
        }

        let handle = self.buffers.insert(Buffer {
            id,
            label: descriptor.label.as_ref().map(|l| l.to_string()),
            usage: descriptor.usage,
            target,
            hint,
            data: vec![0; descriptor.size as usize],
            dirty: DirtyRange::default(),
        });
        log::debug!(
            "Created buffer '{}' ({:?}, {} bytes)",
            descriptor.label.as_deref().unwrap_or_default(),
            id,
            descriptor.size
        );
        Ok(handle)
    }

    /// Resolves a buffer handle.
    pub fn buffer(&self, handle: BufferHandle) -> Result<&Buffer, ResourceError> {
        self.buffers.get(handle)
    }

    /// Maps a byte range of a buffer for writing.
    ///
    /// The write is tracked as an upload; a barrier is issued first when the
    /// GPU still has pending access to the buffer.
    ///
    /// ## Errors
    /// * `ConfigError::RangeOutOfBounds` - If the range reaches past the end.
    pub fn map_buffer(
        &mut self,
        handle: BufferHandle,
        offset: u64,
        size: u64,
    ) -> Result<&mut [u8], ResourceError> {
        self.buffers.get(handle)?.check_range(offset, size)?;
        self.track(SyncResource::Buffer(handle), GpuAccess::UPLOAD_WRITE);

        let buffer = self.buffers.get_mut(handle)?;
        buffer.dirty.include(offset, offset + size);
        Ok(&mut buffer.data[offset as usize..(offset + size) as usize])
    }

    /// Uploads whatever was written since the buffer was mapped.
    pub fn unmap_buffer(&mut self, handle: BufferHandle) -> Result<(), ResourceError> {
        let buffer = self.buffers.get_mut(handle)?;
        let Some(range) = buffer.dirty.take() else {
            return Ok(());
        };
        let (id, target) = (buffer.id, buffer.target);
        match target {
            BufferTarget::Array => self.state.bind_vertex_buffer(&mut self.device, Some(id)),
            _ => self.device.bind_buffer(target, Some(id)),
        }
        let bytes = &buffer.data[range.start as usize..range.end as usize];
        self.device.buffer_sub_data(target, range.start, bytes);
        Ok(())
    }

    /// Drops a reference to a buffer, destroying it when none remain.
    pub fn destroy_buffer(&mut self, handle: BufferHandle) -> Result<(), ResourceError> {
        if let Some(buffer) = self.buffers.release(handle)? {
            self.sync.forget(SyncResource::Buffer(handle));
            self.state.forget_buffer(buffer.id);
            self.device.destroy_buffer(buffer.id);
            log::debug!("Destroyed buffer {:?}", buffer.id);
        }
        Ok(())
    }

    fn bind_buffer_target(&mut self, target: BufferTarget, id: BufferId) {
        match target {
            BufferTarget::Array => self.state.bind_vertex_buffer(&mut self.device, Some(id)),
            _ => self.device.bind_buffer(target, Some(id)),
        }
    }
}
