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

//! Configuration of a graphics context.

use crate::renderer::api::texture::TextureFilter;
use crate::renderer::error::RenderError;
use serde::{Deserialize, Serialize};

/// Settings applied when a graphics context is created.
///
/// Every field has a default, so a partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    /// Render in linear space with sRGB framebuffers and gamma-corrected colors.
    pub gamma_correct: bool,
    /// Extra device validation and logging.
    pub debug: bool,
    /// MSAA samples for headset canvases.
    pub msaa: u32,
    /// The filter given to new textures.
    pub default_filter: TextureFilter,
    /// Number of texture slots managed by the state cache.
    pub max_texture_slots: u32,
    /// Number of uniform buffer slots managed by the state cache.
    pub max_uniform_buffers: u32,
    /// Most canvases bound at once.
    pub max_canvases: usize,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            gamma_correct: true,
            debug: false,
            msaa: 4,
            default_filter: TextureFilter::default(),
            max_texture_slots: 16,
            max_uniform_buffers: 32,
            max_canvases: 4,
        }
    }
}

impl GraphicsConfig {
    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InitializationFailed`] on malformed input.
    pub fn from_json(text: &str) -> Result<Self, RenderError> {
        serde_json::from_str(text)
            .map_err(|e| RenderError::InitializationFailed(format!("invalid graphics config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::texture::FilterMode;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = GraphicsConfig::from_json(r#"{ "gamma_correct": false, "msaa": 2 }"#)
            .expect("valid config");
        assert!(!config.gamma_correct);
        assert_eq!(config.msaa, 2);
        assert_eq!(config.max_texture_slots, 16);
        assert_eq!(config.default_filter.mode, FilterMode::Trilinear);
    }

    #[test]
    fn test_nested_filter() {
        let config = GraphicsConfig::from_json(
            r#"{ "default_filter": { "mode": "anisotropic", "anisotropy": 8.0 } }"#,
        )
        .expect("valid config");
        assert_eq!(config.default_filter.mode, FilterMode::Anisotropic);
        assert_eq!(config.default_filter.anisotropy, 8.0);
    }

    #[test]
    fn test_malformed_json_is_an_initialization_error() {
        let err = GraphicsConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, RenderError::InitializationFailed(_)));
    }
}
