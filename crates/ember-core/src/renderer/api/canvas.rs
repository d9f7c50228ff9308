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

//! Framebuffer attachments, canvas flags and completeness status.

/// Creation options of a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasFlags {
    /// Attach a depth renderbuffer.
    pub depth: bool,
    /// Attach a stencil buffer alongside depth.
    pub stencil: bool,
    /// Samples per pixel; 0 disables multisampling.
    pub msaa: u32,
    /// Give the color texture a full mip chain, regenerated on resolve.
    pub mipmaps: bool,
}

impl Default for CanvasFlags {
    fn default() -> Self {
        Self {
            depth: true,
            stencil: false,
            msaa: 0,
            mipmaps: false,
        }
    }
}

/// A framebuffer attachment point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attachment {
    /// A color attachment by index.
    Color(u32),
    /// The depth attachment.
    Depth,
    /// The combined depth/stencil attachment.
    DepthStencil,
}

/// Which framebuffer binding point an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferTarget {
    /// Both read and draw.
    Both,
    /// The read framebuffer, source of blits and readbacks.
    Read,
    /// The draw framebuffer.
    Draw,
}

/// The result of a framebuffer completeness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramebufferStatus {
    /// Ready to render.
    Complete,
    /// Attachments differ in size.
    IncompleteDimensions,
    /// An attachment is unusable.
    IncompleteAttachment,
    /// No attachment at all.
    MissingAttachment,
    /// The combination of formats is not supported.
    Unsupported,
    /// Any other device-reported status.
    Other(u32),
}

impl FramebufferStatus {
    /// Returns `true` for [`FramebufferStatus::Complete`].
    #[inline]
    pub fn is_complete(self) -> bool {
        matches!(self, FramebufferStatus::Complete)
    }
}
