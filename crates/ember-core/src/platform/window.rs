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

//! The window surface contract consumed by graphics backends.

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::c_void;

/// Called with the new framebuffer size (width, height) in pixels.
pub type ResizeCallback = Box<dyn FnMut(u32, u32) + 'static>;

/// Called when the platform asks the application to quit.
pub type QuitCallback = Box<dyn FnMut() + 'static>;

/// A trait that abstracts the window a graphics context renders into.
///
/// Any windowing backend (winit, SDL2, GLFW, etc.) can implement it. The
/// window itself, its event pump and its creation are owned by the platform
/// layer; the graphics core only consumes what is listed here.
pub trait WindowSurface: HasWindowHandle + HasDisplayHandle {
    /// Returns the size of the default framebuffer in physical pixels.
    fn framebuffer_size(&self) -> (u32, u32);

    /// Registers the callback invoked when the framebuffer is resized.
    fn set_resize_callback(&mut self, callback: ResizeCallback);

    /// Registers the callback invoked on a quit request.
    fn set_quit_callback(&mut self, callback: QuitCallback);

    /// Looks up a GL entry point for the context current on this surface.
    ///
    /// Returns a null pointer when the symbol is unknown.
    fn get_proc_address(&self, name: &str) -> *const c_void;
}
