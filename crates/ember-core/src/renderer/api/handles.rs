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

//! Opaque ids of device-side objects.
//!
//! These ids are handed out by a [`GpuDevice`](crate::renderer::GpuDevice)
//! and only mean something to the device that created them. Binding
//! operations take `Option<Id>`; `None` unbinds (the "zero object").

macro_rules! device_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);
    };
}

device_id!(
    /// A device buffer object.
    BufferId
);
device_id!(
    /// A device texture object.
    TextureId
);
device_id!(
    /// A device framebuffer object.
    FramebufferId
);
device_id!(
    /// A device renderbuffer object.
    RenderbufferId
);
device_id!(
    /// A device vertex array object.
    VertexArrayId
);
device_id!(
    /// A compiled shader stage, consumed by program linking.
    ShaderModuleId
);
device_id!(
    /// A linked shader program.
    ProgramId
);
device_id!(
    /// The location of a uniform inside a linked program.
    UniformLocation
);
