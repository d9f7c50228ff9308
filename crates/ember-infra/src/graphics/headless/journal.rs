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

//! The call journal of a [`HeadlessDevice`](super::HeadlessDevice).
//!
//! Every state-changing device call is appended here so tests can assert on
//! exactly what reached the "hardware". The journal is shared: keep a clone
//! before moving the device into a context.

use ember_core::math::Extent3D;
use ember_core::renderer::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// An owned copy of a uniform upload.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedUpload {
    /// Float vectors.
    Float {
        /// Lanes per element.
        components: u8,
        /// Uploaded values.
        values: Vec<f32>,
    },
    /// Integer vectors or sampler slots.
    Int {
        /// Lanes per element.
        components: u8,
        /// Uploaded values.
        values: Vec<i32>,
    },
    /// Square matrices.
    Matrix {
        /// Rows per matrix.
        dimension: u8,
        /// Uploaded values.
        values: Vec<f32>,
    },
}

impl From<UniformUpload<'_>> for RecordedUpload {
    fn from(upload: UniformUpload<'_>) -> Self {
        match upload {
            UniformUpload::Float { components, values } => RecordedUpload::Float {
                components,
                values: values.to_vec(),
            },
            UniformUpload::Int { components, values } => RecordedUpload::Int {
                components,
                values: values.to_vec(),
            },
            UniformUpload::Matrix { dimension, values } => RecordedUpload::Matrix {
                dimension,
                values: values.to_vec(),
            },
        }
    }
}

/// One recorded device call.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    SetCapability(Capability, bool),
    UnpackAlignment(u32),
    CreateBuffer(BufferId),
    DestroyBuffer(BufferId),
    BindBuffer(BufferTarget, Option<BufferId>),
    BindBufferBase(BufferTarget, u32, Option<BufferId>),
    BufferData {
        target: BufferTarget,
        size: u64,
        initialized: bool,
        hint: BufferUsageHint,
    },
    BufferSubData {
        target: BufferTarget,
        offset: u64,
        len: usize,
    },
    MemoryBarrier(GpuAccess, GpuAccess),
    CreateVertexArray(VertexArrayId),
    DestroyVertexArray(VertexArrayId),
    BindVertexArray(Option<VertexArrayId>),
    SetAttributeEnabled(u32, bool),
    AttributePointer(u32, AttributePointer),
    AttributeDivisor(u32, u32),
    AttributeDefault(u32, [f32; 4]),
    CreateTexture(TextureId),
    CreateTextureView {
        view: TextureId,
        source: TextureId,
        texture_type: TextureType,
        format: TextureFormat,
        range: TextureSubrange,
    },
    DestroyTexture(TextureId),
    BindTexture(u32, TextureType, Option<TextureId>),
    TextureStorage {
        texture_type: TextureType,
        levels: u32,
        format: TextureFormat,
        srgb: bool,
        size: Extent3D,
    },
    TextureSubImage {
        region: TextureRegion,
        len: usize,
    },
    CompressedTextureImage {
        region: TextureRegion,
        len: usize,
    },
    GenerateMipmaps(TextureType),
    TextureFilter(TextureFilter, bool),
    TextureWrap(TextureWrap),
    CreateFramebuffer(FramebufferId),
    DestroyFramebuffer(FramebufferId),
    BindFramebuffer(FramebufferTarget, Option<FramebufferId>),
    FramebufferTexture(Attachment, Option<TextureId>, u32),
    FramebufferTextureLayer(Attachment, Option<TextureId>, u32, u32),
    CreateRenderbuffer {
        id: RenderbufferId,
        format: TextureFormat,
        samples: u32,
        width: u32,
        height: u32,
    },
    DestroyRenderbuffer(RenderbufferId),
    FramebufferRenderbuffer(Attachment, RenderbufferId),
    DrawBuffers(u32),
    FramebufferStatus(FramebufferStatus),
    BlitFramebuffer(u32, u32),
    ClearColor(u32, [f32; 4]),
    ClearDepth(f32),
    ClearStencil(i32),
    ReadPixels(u32, u32, u32, u32),
    CompileShader(ShaderStage),
    LinkProgram(ProgramId),
    DestroyProgram(ProgramId),
    DestroyShaderModule(ShaderModuleId),
    UseProgram(Option<ProgramId>),
    UploadUniform(UniformLocation, RecordedUpload),
    UniformBlockBinding(ProgramId, u32, u32),
    BlendState(BlendState),
    DepthFunction(CompareMode),
    DepthWrite(bool),
    LineWidth(f32),
    StencilFunction(CompareMode, i32, u32),
    StencilOperation(StencilOp, StencilOp, StencilOp),
    FrontFace(Winding),
    PolygonMode(PolygonMode),
    ColorMask(bool),
    Viewport(Viewport),
    ViewportArray([Viewport; 2]),
    DrawArrays {
        mode: DrawMode,
        first: u32,
        count: u32,
        instances: Option<u32>,
    },
    DrawElements {
        mode: DrawMode,
        count: u32,
        format: IndexFormat,
        offset: u64,
        instances: Option<u32>,
    },
}

impl DeviceCall {
    /// Returns `true` for the four draw entry points.
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            DeviceCall::DrawArrays { .. } | DeviceCall::DrawElements { .. }
        )
    }
}

#[derive(Debug, Default)]
struct JournalState {
    calls: Vec<DeviceCall>,
    uniform_names: HashMap<UniformLocation, String>,
}

/// A shared handle to the calls recorded by a headless device.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    inner: Rc<RefCell<JournalState>>,
}

impl Journal {
    pub(crate) fn record(&self, call: DeviceCall) {
        self.inner.borrow_mut().calls.push(call);
    }

    pub(crate) fn name_location(&self, location: UniformLocation, name: String) {
        self.inner.borrow_mut().uniform_names.insert(location, name);
    }

    /// A snapshot of every call recorded so far.
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.inner.borrow().calls.clone()
    }

    /// Returns and forgets the recorded calls.
    pub fn take(&self) -> Vec<DeviceCall> {
        std::mem::take(&mut self.inner.borrow_mut().calls)
    }

    /// Forgets the recorded calls.
    pub fn clear(&self) {
        self.inner.borrow_mut().calls.clear();
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.inner.borrow().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Number of recorded draw calls.
    pub fn draw_count(&self) -> usize {
        self.count(DeviceCall::is_draw)
    }

    /// The uniform (array base name) a location belongs to.
    pub fn uniform_name(&self, location: UniformLocation) -> Option<String> {
        self.inner.borrow().uniform_names.get(&location).cloned()
    }

    /// The uploads recorded for a uniform, by name.
    pub fn uploads_to(&self, name: &str) -> Vec<RecordedUpload> {
        let state = self.inner.borrow();
        state
            .calls
            .iter()
            .filter_map(|call| match call {
                DeviceCall::UploadUniform(location, upload)
                    if state.uniform_names.get(location).map(String::as_str) == Some(name) =>
                {
                    Some(upload.clone())
                }
                _ => None,
            })
            .collect()
    }
}
