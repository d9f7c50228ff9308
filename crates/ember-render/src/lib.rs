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

//! # Ember Render
//!
//! The GPU resource core: a [`GraphicsContext`] owns every buffer, texture,
//! mesh, shader, shader block and canvas behind generation-checked handles,
//! memoizes hardware state in a [`StateCache`], tracks access hazards in a
//! [`SyncTracker`] and realizes [`DrawCommand`]s against a [`GpuDevice`].
//!
//! [`GpuDevice`]: ember_core::renderer::GpuDevice

#![warn(missing_docs)]

pub mod arena;
pub mod context;
pub mod draw;
pub mod headset;
pub mod resources;
pub mod state;
pub mod sync;

pub use self::arena::{
    BufferHandle, CanvasHandle, MeshHandle, ShaderBlockHandle, ShaderHandle, TextureHandle,
};
pub use self::context::GraphicsContext;
pub use self::draw::{
    Camera, DrawCommand, Material, MaterialColor, MaterialScalar, MaterialTexture, Pipeline,
};
pub use self::headset::HeadsetRenderer;
pub use self::state::StateCache;
pub use self::sync::{Barrier, SyncResource, SyncTracker};
