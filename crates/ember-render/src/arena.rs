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

//! Generation-checked, reference-counted resource storage.
//!
//! Every resource lives in a [`Pool`] keyed by a typed slotmap handle. A
//! handle whose slot was freed (and possibly reused) fails to resolve
//! instead of aliasing a new resource. Shared ownership between resources
//! (a view retaining its source, a mesh retaining an attachment source) is
//! expressed with [`Pool::retain`]/[`Pool::release`]; the value leaves the
//! pool when its count reaches zero.

use ember_core::renderer::ResourceError;
use slotmap::{new_key_type, Key, SlotMap};

new_key_type! {
    /// A handle to a [`Buffer`](crate::resources::buffer::Buffer).
    pub struct BufferHandle;
    /// A handle to a [`Texture`](crate::resources::texture::Texture).
    pub struct TextureHandle;
    /// A handle to a [`Mesh`](crate::resources::mesh::Mesh).
    pub struct MeshHandle;
    /// A handle to a [`Shader`](crate::resources::shader::Shader).
    pub struct ShaderHandle;
    /// A handle to a [`ShaderBlock`](crate::resources::shader_block::ShaderBlock).
    pub struct ShaderBlockHandle;
    /// A handle to a [`Canvas`](crate::resources::canvas::Canvas).
    pub struct CanvasHandle;
}

#[derive(Debug)]
struct Entry<T> {
    refs: u32,
    value: T,
}

/// A typed arena of reference-counted resources.
#[derive(Debug)]
pub struct Pool<K: Key, T> {
    kind: &'static str,
    slots: SlotMap<K, Entry<T>>,
}

impl<K: Key, T> Pool<K, T> {
    /// Creates an empty pool; `kind` names the resource in error messages.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            slots: SlotMap::with_key(),
        }
    }

    /// Stores a value with a reference count of one.
    pub fn insert(&mut self, value: T) -> K {
        self.slots.insert(Entry { refs: 1, value })
    }

    /// Resolves a handle.
    pub fn get(&self, key: K) -> Result<&T, ResourceError> {
        self.slots
            .get(key)
            .map(|e| &e.value)
            .ok_or(ResourceError::InvalidHandle(self.kind))
    }

    /// Resolves a handle mutably.
    pub fn get_mut(&mut self, key: K) -> Result<&mut T, ResourceError> {
        let kind = self.kind;
        self.slots
            .get_mut(key)
            .map(|e| &mut e.value)
            .ok_or(ResourceError::InvalidHandle(kind))
    }

    /// Returns `true` while the handle resolves.
    pub fn contains(&self, key: K) -> bool {
        self.slots.contains_key(key)
    }

    /// Adds a reference.
    pub fn retain(&mut self, key: K) -> Result<(), ResourceError> {
        let kind = self.kind;
        let entry = self
            .slots
            .get_mut(key)
            .ok_or(ResourceError::InvalidHandle(kind))?;
        entry.refs += 1;
        Ok(())
    }

    /// Drops a reference.
    ///
    /// Returns the value once the last reference is gone; the caller then
    /// owns its teardown. Returns `Ok(None)` while references remain.
    pub fn release(&mut self, key: K) -> Result<Option<T>, ResourceError> {
        let kind = self.kind;
        let entry = self
            .slots
            .get_mut(key)
            .ok_or(ResourceError::InvalidHandle(kind))?;
        entry.refs -= 1;
        if entry.refs > 0 {
            return Ok(None);
        }
        Ok(self.slots.remove(key).map(|e| e.value))
    }

    /// Returns the current reference count.
    pub fn ref_count(&self, key: K) -> Option<u32> {
        self.slots.get(key).map(|e| e.refs)
    }

    /// Number of live resources.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` when the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Handles of every live resource.
    pub fn keys(&self) -> Vec<K> {
        self.slots.keys().collect()
    }

    /// Iterates over live resources.
    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> {
        self.slots.iter().map(|(k, e)| (k, &e.value))
    }

    /// Removes every resource regardless of its count.
    pub fn drain(&mut self) -> Vec<T> {
        self.slots.drain().map(|(_, e)| e.value).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_returns_value_at_zero() {
        let mut pool: Pool<TextureHandle, &str> = Pool::new("texture");
        let h = pool.insert("a");
        pool.retain(h).unwrap();
        assert_eq!(pool.ref_count(h), Some(2));
        assert_eq!(pool.release(h).unwrap(), None);
        assert_eq!(pool.release(h).unwrap(), Some("a"));
        assert!(!pool.contains(h));
    }

    #[test]
    fn test_stale_handle_does_not_alias_reused_slot() {
        let mut pool: Pool<MeshHandle, u32> = Pool::new("mesh");
        let old = pool.insert(1);
        pool.release(old).unwrap();
        let new = pool.insert(2);
        assert_ne!(old, new);
        assert_eq!(pool.get(old), Err(ResourceError::InvalidHandle("mesh")));
        assert_eq!(pool.get(new), Ok(&2));
    }

    #[test]
    fn test_drain_empties_pool() {
        let mut pool: Pool<BufferHandle, u32> = Pool::new("buffer");
        pool.insert(1);
        pool.insert(2);
        let mut values = pool.drain();
        values.sort();
        assert_eq!(values, vec![1, 2]);
        assert!(pool.is_empty());
    }
}
