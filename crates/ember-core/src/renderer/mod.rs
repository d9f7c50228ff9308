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

//! Provides the backend-agnostic contracts of the Ember GPU core.
//!
//! This module defines the "common language" for every GPU operation: the
//! descriptor and enum types in [`api`], the error hierarchy in [`error`],
//! and the [`GpuDevice`] trait that concrete backends in `ember-infra`
//! implement. The algorithmic layer in `ember-render` is written purely
//! against these contracts.

pub mod api;
pub mod error;
pub mod traits;

// Re-export the most important traits and types for easier use.
pub use self::api::*;
pub use self::error::{ConfigError, RenderError, ResourceError, ShaderError};
pub use self::traits::{Eye, GpuDevice, HeadsetDriver};
