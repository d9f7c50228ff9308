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

//! Coalesced hazard tracking between GPU accesses.
//!
//! Each resource carries the set of access categories it has pending since
//! the last barrier that covered them. A new access only needs a barrier
//! when something is pending and either side writes, except that render
//! target writes following render target writes are ordered by the
//! rasterizer and pass freely. Barriers are global,
//! so once one fires, every resource tracked under any category of the
//! covered set drops those bits: their hazards were resolved by the same
//! barrier.

use crate::arena::{BufferHandle, TextureHandle};
use ember_core::renderer::GpuAccess;
use std::collections::HashMap;

/// A resource whose accesses are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncResource {
    /// A buffer.
    Buffer(BufferHandle),
    /// A texture (views track their own handle).
    Texture(TextureHandle),
}

/// A barrier the device must issue before the new access proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Barrier {
    /// The pending accesses that must complete.
    pub before: GpuAccess,
    /// The access about to start.
    pub after: GpuAccess,
}

/// Per-resource pending-access bookkeeping.
#[derive(Debug)]
pub struct SyncTracker {
    pending: HashMap<SyncResource, GpuAccess>,
    tracked: Vec<Vec<SyncResource>>,
}

impl Default for SyncTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncTracker {
    /// Creates a tracker with nothing pending.
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
            tracked: vec![Vec::new(); GpuAccess::CATEGORY_COUNT],
        }
    }

    /// Returns the accesses pending on a resource.
    pub fn pending(&self, resource: SyncResource) -> GpuAccess {
        self.pending.get(&resource).copied().unwrap_or_default()
    }

    /// Records `access` on `resource` and returns the barrier it requires, if any.
    pub fn access(&mut self, resource: SyncResource, access: GpuAccess) -> Option<Barrier> {
        let before = self.pending(resource);
        let mut barrier = None;

        let ordered = (before | access).is_target_write();
        if !before.is_empty() && !ordered && (before.has_write() || access.has_write()) {
            for category in before.iter() {
                let list = std::mem::take(&mut self.tracked[category.category_index()]);
                for other in list {
                    if let Some(mask) = self.pending.get_mut(&other) {
                        mask.remove(category);
                    }
                }
            }
            self.pending.retain(|_, mask| !mask.is_empty());
            log::trace!("barrier {before:?} -> {access:?} for {resource:?}");
            barrier = Some(Barrier {
                before,
                after: access,
            });
        }

        let current = self.pending.entry(resource).or_default();
        let added = access.difference(*current);
        *current |= access;
        for category in added.iter() {
            self.tracked[category.category_index()].push(resource);
        }

        barrier
    }

    /// Forgets a destroyed resource.
    pub fn forget(&mut self, resource: SyncResource) {
        if self.pending.remove(&resource).is_some() {
            for list in &mut self.tracked {
                list.retain(|r| *r != resource);
            }
        }
    }

    /// Number of resources with pending accesses.
    pub fn tracked_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn buffers(n: usize) -> Vec<SyncResource> {
        let mut map: SlotMap<BufferHandle, ()> = SlotMap::with_key();
        (0..n).map(|_| SyncResource::Buffer(map.insert(()))).collect()
    }

    #[test]
    fn test_first_access_needs_no_barrier() {
        let r = buffers(1)[0];
        let mut sync = SyncTracker::new();
        assert_eq!(sync.access(r, GpuAccess::UPLOAD_WRITE), None);
        assert_eq!(sync.pending(r), GpuAccess::UPLOAD_WRITE);
    }

    #[test]
    fn test_read_after_read_needs_no_barrier() {
        let r = buffers(1)[0];
        let mut sync = SyncTracker::new();
        assert_eq!(sync.access(r, GpuAccess::VERTEX_READ), None);
        assert_eq!(sync.access(r, GpuAccess::UNIFORM_READ), None);
        assert_eq!(sync.access(r, GpuAccess::VERTEX_READ), None);
        assert_eq!(
            sync.pending(r),
            GpuAccess::VERTEX_READ | GpuAccess::UNIFORM_READ
        );
    }

    #[test]
    fn test_write_after_read_needs_exactly_one_barrier() {
        let r = buffers(1)[0];
        let mut sync = SyncTracker::new();
        sync.access(r, GpuAccess::UNIFORM_READ);
        let barrier = sync.access(r, GpuAccess::UPLOAD_WRITE);
        assert_eq!(
            barrier,
            Some(Barrier {
                before: GpuAccess::UNIFORM_READ,
                after: GpuAccess::UPLOAD_WRITE,
            })
        );
        assert_eq!(sync.pending(r), GpuAccess::UPLOAD_WRITE);
    }

    #[test]
    fn test_read_after_write_needs_barrier() {
        let r = buffers(1)[0];
        let mut sync = SyncTracker::new();
        sync.access(r, GpuAccess::UPLOAD_WRITE);
        assert!(sync.access(r, GpuAccess::UNIFORM_READ).is_some());
        // The read is now the only pending access; another read is free.
        assert!(sync.access(r, GpuAccess::UNIFORM_READ).is_none());
    }

    #[test]
    fn test_barrier_clears_resources_sharing_a_category() {
        let r = buffers(3);
        let mut sync = SyncTracker::new();
        sync.access(r[0], GpuAccess::UPLOAD_WRITE);
        sync.access(r[1], GpuAccess::UPLOAD_WRITE);
        sync.access(r[2], GpuAccess::VERTEX_READ);

        assert!(sync.access(r[0], GpuAccess::UNIFORM_READ).is_some());

        // r[1] shared UPLOAD_WRITE with the barrier and is covered by it.
        assert_eq!(sync.pending(r[1]), GpuAccess::empty());
        assert!(sync.access(r[1], GpuAccess::UNIFORM_READ).is_none());
        // r[2] shared nothing and keeps its pending read.
        assert_eq!(sync.pending(r[2]), GpuAccess::VERTEX_READ);
    }

    #[test]
    fn test_unrelated_resource_still_barriers_on_its_own_hazard() {
        let r = buffers(2);
        let mut sync = SyncTracker::new();
        sync.access(r[0], GpuAccess::UPLOAD_WRITE);
        sync.access(r[1], GpuAccess::COLOR_TARGET_WRITE);

        assert!(sync.access(r[0], GpuAccess::SAMPLED_READ).is_some());
        assert!(sync.access(r[1], GpuAccess::SAMPLED_READ).is_some());
    }

    #[test]
    fn test_repeated_target_writes_need_no_barrier() {
        let r = buffers(1)[0];
        let mut sync = SyncTracker::new();
        sync.access(r, GpuAccess::COLOR_TARGET_WRITE);
        assert_eq!(sync.access(r, GpuAccess::COLOR_TARGET_WRITE), None);
        assert!(sync.access(r, GpuAccess::DOWNLOAD_READ).is_some());
        // Writing again after the read is a new hazard.
        assert!(sync.access(r, GpuAccess::COLOR_TARGET_WRITE).is_some());
    }

    #[test]
    fn test_forget_drops_pending_state() {
        let r = buffers(1)[0];
        let mut sync = SyncTracker::new();
        sync.access(r, GpuAccess::UPLOAD_WRITE);
        sync.forget(r);
        assert_eq!(sync.tracked_count(), 0);
        assert_eq!(sync.access(r, GpuAccess::UPLOAD_WRITE), None);
    }
}
