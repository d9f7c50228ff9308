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

//! Shared fixtures for the integration tests: a context over a recording
//! headless device, a shader declaring the built-in uniforms, and a mesh.

#![allow(dead_code)]

use ember_core::renderer::{
    DeviceFeatures, DrawMode, GraphicsConfig, MeshUsage, VertexFormat, Viewport,
};
use ember_infra::graphics::headless::Journal;
use ember_infra::logging::{init_logging, LoggingConfig};
use ember_infra::HeadlessDevice;
use ember_render::{GraphicsContext, MeshHandle, ShaderHandle};

pub const VERTEX: &str = r#"
#version 330
in vec3 emberPosition;
in vec3 emberNormal;
in vec2 emberTexCoord;
uniform mat4 emberModel;
uniform mat4 emberViews[2];
uniform mat4 emberProjections[2];
uniform mat4 emberTransforms[2];
uniform int emberEye;
uniform float x;
void main() {}
"#;

pub const FRAGMENT: &str = r#"
#version 330
uniform vec4 emberColor;
uniform sampler2D emberDiffuseTexture;
layout(std140) uniform Lights {
    vec4 tint;
};
void main() {}
"#;

pub const LEFT: Viewport = Viewport::new(0.0, 0.0, 32.0, 16.0);
pub const RIGHT: Viewport = Viewport::new(32.0, 0.0, 32.0, 16.0);

fn quiet_logging() {
    init_logging(LoggingConfig {
        env_filter: Some("warn".to_string()),
        ..LoggingConfig::default()
    });
}

/// A context over a headless device with its default features.
pub fn context() -> (GraphicsContext<HeadlessDevice>, Journal) {
    quiet_logging();
    let device = HeadlessDevice::new();
    let journal = device.journal();
    let context = GraphicsContext::new(device, GraphicsConfig::default())
        .expect("context creation should succeed");
    (context, journal)
}

/// A context over a headless device reporting `features`.
pub fn context_with(features: DeviceFeatures) -> (GraphicsContext<HeadlessDevice>, Journal) {
    quiet_logging();
    let device = HeadlessDevice::with_features(features);
    let journal = device.journal();
    let context = GraphicsContext::new(device, GraphicsConfig::default())
        .expect("context creation should succeed");
    (context, journal)
}

/// The fixture shader.
pub fn shader(context: &mut GraphicsContext<HeadlessDevice>) -> ShaderHandle {
    context
        .create_shader(VERTEX, FRAGMENT)
        .expect("fixture shader should link")
}

/// A three-vertex triangle in the standard layout.
pub fn triangle(context: &mut GraphicsContext<HeadlessDevice>) -> MeshHandle {
    context
        .create_mesh(3, VertexFormat::standard(), DrawMode::Triangles, MeshUsage::Static)
        .expect("fixture mesh should be created")
}
