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

//! The contract of a VR headset driver, as seen by the renderer.

use crate::math::Mat4;
use crate::renderer::api::handles::TextureId;

/// One of the two eyes of a headset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    /// The left eye; view index 0.
    Left,
    /// The right eye; view index 1.
    Right,
}

impl Eye {
    /// Both eyes, in view-index order.
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    /// The view index of this eye.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }
}

/// Pose and compositor data supplied by a headset runtime.
///
/// Tracking, input and the runtime protocol stay behind this trait; the
/// renderer only pulls matrices and pushes the finished eye texture.
pub trait HeadsetDriver {
    /// The recommended render size of one eye, in pixels.
    fn recommended_size(&self) -> (u32, u32);

    /// Near and far clip distances.
    fn clip_distance(&self) -> (f32, f32);

    /// Vertical offset applied to the tracking origin, in meters.
    fn offset(&self) -> f32;

    /// The head pose in tracking space for the current frame.
    fn head_pose(&self) -> Mat4;

    /// The transform from an eye to the head.
    fn eye_to_head(&self, eye: Eye) -> Mat4;

    /// The projection matrix of an eye.
    fn projection(&self, eye: Eye, near: f32, far: f32) -> Mat4;

    /// Hands a finished eye image to the compositor.
    ///
    /// `bounds` is `[u_min, v_min, u_max, v_max]` inside `texture`.
    fn submit(&mut self, eye: Eye, texture: TextureId, bounds: [f32; 4]);
}
