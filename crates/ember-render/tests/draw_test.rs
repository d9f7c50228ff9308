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

//! Integration tests for draw execution: uniforms, stereo, stencil writes,
//! uniform blocks and clears.

mod common;

use common::{LEFT, RIGHT};
use ember_core::math::{Color, Extent3D};
use ember_core::renderer::{
    BufferTarget, CanvasFlags, Capability, CompareMode, ConfigError, DeviceFeatures, DrawMode,
    GlslType, GpuAccess, IndexFormat, ResourceError, ShaderError, ShaderStage, StencilAction,
    StencilOp, TextureDescriptor, TextureFormat, TextureType,
};
use ember_infra::graphics::headless::{DeviceCall, RecordedUpload};
use ember_render::resources::{BlockUniform, BlockValue, IndexData, UniformData, UniformValue};
use ember_render::{Camera, DrawCommand, Material, MaterialTexture, SyncResource};

// ─────────────────────────────────────────────────────────────────────────────
// Uniforms
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_identical_uniform_set_is_not_uploaded_again() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let command = DrawCommand::new(mesh, shader);
    context.set_uniform(shader, "x", UniformData::Floats(&[1.0]))?;
    context.draw(&command)?;

    // --- 2. ACT ---
    context.set_uniform(shader, "x", UniformData::Floats(&[1.0]))?;
    let dirty = context.shader(shader)?.uniform("x").unwrap().is_dirty();
    context.draw(&command)?;

    // --- 3. ASSERT ---
    assert!(!dirty, "an identical value must not mark the uniform dirty");
    assert_eq!(
        journal.uploads_to("x"),
        vec![RecordedUpload::Float {
            components: 1,
            values: vec![1.0],
        }]
    );
    Ok(())
}

#[test]
fn test_uniform_set_then_get() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, _journal) = common::context();
    let shader = common::shader(&mut context);

    // --- 2. ACT ---
    context.set_uniform(shader, "x", UniformData::Floats(&[0.5]))?;

    // --- 3. ASSERT ---
    let uniform = context.shader(shader)?.uniform("x").unwrap();
    assert_eq!(uniform.value(), &UniformValue::Floats(vec![0.5]));
    assert!(uniform.is_dirty());
    Ok(())
}

#[test]
fn test_over_capacity_set_leaves_cache_untouched() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, _journal) = common::context();
    let shader = common::shader(&mut context);
    context.set_uniform(shader, "x", UniformData::Floats(&[0.25]))?;

    // --- 2. ACT ---
    let result = context.set_uniform(shader, "x", UniformData::Floats(&[1.0, 2.0]));

    // --- 3. ASSERT ---
    assert_eq!(
        result.unwrap_err(),
        ResourceError::Config(ConfigError::UniformCapacityExceeded {
            name: "x".to_string(),
            capacity: 1,
            provided: 2,
        })
    );
    let uniform = context.shader(shader)?.uniform("x").unwrap();
    assert_eq!(uniform.value(), &UniformValue::Floats(vec![0.25]));
    Ok(())
}

#[test]
fn test_uniform_type_mismatch_is_rejected() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, _journal) = common::context();
    let shader = common::shader(&mut context);

    // --- 2. ACT ---
    let result = context.set_uniform(shader, "emberEye", UniformData::Floats(&[1.0]));

    // --- 3. ASSERT ---
    assert!(matches!(
        result,
        Err(ResourceError::Config(ConfigError::UniformTypeMismatch {
            expected: "int",
            actual: "float",
            ..
        }))
    ));
    Ok(())
}

#[test]
fn test_undeclared_uniform_is_ignored() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, _journal) = common::context();
    let shader = common::shader(&mut context);

    // --- 2. ACT ---
    let result = context.set_uniform(shader, "emberRoughness", UniformData::Floats(&[0.3]));

    // --- 3. ASSERT ---
    assert!(result.is_ok());
    assert!(!context.shader(shader)?.has_uniform("emberRoughness"));
    Ok(())
}

#[test]
fn test_sampler_slots_are_bound_at_creation() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();

    // --- 2. ACT ---
    let shader = common::shader(&mut context);

    // --- 3. ASSERT ---
    let sampler = context.shader(shader)?.uniform("emberDiffuseTexture").unwrap();
    assert_eq!(sampler.base_slot(), 0);
    assert_eq!(
        journal.uploads_to("emberDiffuseTexture"),
        vec![RecordedUpload::Int {
            components: 1,
            values: vec![0],
        }]
    );
    Ok(())
}

#[test]
fn test_material_texture_is_bound_to_its_sampler_slot() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let texture = context.create_texture(
        &TextureDescriptor {
            size: Extent3D::d2(2, 2),
            ..Default::default()
        },
        &[],
    )?;
    let id = context.texture(texture)?.id();
    let mut command = DrawCommand::new(mesh, shader);
    context.draw(&command)?;
    journal.clear();

    // --- 2. ACT ---
    command
        .material
        .set_texture(MaterialTexture::Diffuse, Some(texture));
    context.draw(&command)?;

    // --- 3. ASSERT ---
    assert!(journal
        .calls()
        .contains(&DeviceCall::BindTexture(0, TextureType::D2, Some(id))));
    assert_eq!(
        context.sync().pending(SyncResource::Texture(texture)),
        GpuAccess::SAMPLED_READ
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Texture references
// ─────────────────────────────────────────────────────────────────────────────

fn small_texture(
    context: &mut ember_render::GraphicsContext<ember_infra::HeadlessDevice>,
) -> anyhow::Result<ember_render::TextureHandle> {
    Ok(context.create_texture(
        &TextureDescriptor {
            size: Extent3D::d2(2, 2),
            ..Default::default()
        },
        &[],
    )?)
}

#[test]
fn test_sampled_texture_outlives_its_owner() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let texture = small_texture(&mut context)?;
    let id = context.texture(texture)?.id();
    let mut command = DrawCommand::new(mesh, shader);
    command
        .material
        .set_texture(MaterialTexture::Diffuse, Some(texture));
    context.draw(&command)?;

    // --- 2. ACT ---
    context.destroy_texture(texture)?;
    context.draw(&command)?;

    // --- 3. ASSERT ---
    assert!(context.texture(texture).is_ok(), "the sampler still holds it");
    assert_eq!(journal.count(|c| *c == DeviceCall::DestroyTexture(id)), 0);
    assert_eq!(
        context.shader(shader)?.uniform("emberDiffuseTexture").map(|u| u.value().clone()),
        Some(UniformValue::Textures(vec![Some(texture)]))
    );
    Ok(())
}

#[test]
fn test_replacing_sampled_texture_releases_it() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let texture = small_texture(&mut context)?;
    let id = context.texture(texture)?.id();
    let mut command = DrawCommand::new(mesh, shader);
    command
        .material
        .set_texture(MaterialTexture::Diffuse, Some(texture));
    context.draw(&command)?;
    context.destroy_texture(texture)?;

    // --- 2. ACT ---
    command.material.set_texture(MaterialTexture::Diffuse, None);
    context.draw(&command)?;

    // --- 3. ASSERT ---
    assert!(context.texture(texture).is_err());
    assert_eq!(journal.count(|c| *c == DeviceCall::DestroyTexture(id)), 1);
    Ok(())
}

#[test]
fn test_destroying_shader_releases_sampled_textures() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, _journal) = common::context();
    let shader = common::shader(&mut context);
    let texture = small_texture(&mut context)?;
    context.set_uniform(
        shader,
        MaterialTexture::Diffuse.uniform_name(),
        UniformData::Textures(&[Some(texture)]),
    )?;
    context.destroy_texture(texture)?;
    let alive_while_referenced = context.texture(texture).is_ok();

    // --- 2. ACT ---
    context.destroy_shader(shader)?;

    // --- 3. ASSERT ---
    assert!(alive_while_referenced);
    assert!(context.texture(texture).is_err());
    Ok(())
}

#[test]
fn test_mesh_material_is_drawn_and_keeps_textures() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let texture = small_texture(&mut context)?;
    let id = context.texture(texture)?.id();
    let mut material = Material::default();
    material.set_texture(MaterialTexture::Diffuse, Some(texture));
    context.set_mesh_material(mesh, Some(material))?;
    context.destroy_texture(texture)?;

    // --- 2. ACT ---
    let command = context.mesh_command(mesh, shader)?;
    context.draw(&command)?;
    let bound = journal
        .calls()
        .contains(&DeviceCall::BindTexture(0, TextureType::D2, Some(id)));
    let held_by_mesh = context.mesh(mesh)?.material() == Some(&material);
    context.destroy_mesh(mesh)?;
    let other = common::triangle(&mut context);
    context.draw(&DrawCommand::new(other, shader))?;

    // --- 3. ASSERT ---
    assert!(bound, "the mesh material reaches the sampler");
    assert!(held_by_mesh);
    assert!(context.texture(texture).is_err());
    assert_eq!(journal.count(|c| *c == DeviceCall::DestroyTexture(id)), 1);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Synchronization
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_readback_after_each_draw_into_canvas_is_fenced() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, _journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let canvas = context.create_canvas(8, 8, TextureFormat::Rgba8, CanvasFlags::default())?;
    let mut command = DrawCommand::new(mesh, shader);
    command.pipeline.canvases = vec![canvas];
    context.draw(&command)?;
    let first = context.stats().barriers;

    // --- 2. ACT ---
    context.draw(&command)?;
    let repeated = context.stats().barriers;
    context.canvas_pixels(canvas)?;
    let read = context.stats().barriers;
    context.draw(&command)?;
    context.canvas_pixels(canvas)?;
    let reread = context.stats().barriers;

    // --- 3. ASSERT ---
    assert_eq!(repeated, first, "consecutive target writes are ordered");
    assert_eq!(read, first + 1, "read after write");
    assert_eq!(reread, read + 2, "write after read, then read after write");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Shader creation failures
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_compile_error_carries_driver_log() {
    // --- 1. ARRANGE ---
    let (mut context, _journal) = common::context();

    // --- 2. ACT ---
    let result = context.create_shader("#error missing main\n", common::FRAGMENT);

    // --- 3. ASSERT ---
    match result {
        Err(ResourceError::Shader(ShaderError::CompilationError { stage, log })) => {
            assert_eq!(stage, ShaderStage::Vertex);
            assert!(log.contains("missing main"));
        }
        other => panic!("expected a compilation error, got {other:?}"),
    }
}

#[test]
fn test_fragment_compile_error_deletes_vertex_stage() {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();

    // --- 2. ACT ---
    let result = context.create_shader(common::VERTEX, "#error broken fragment\n");

    // --- 3. ASSERT ---
    assert!(matches!(
        result,
        Err(ResourceError::Shader(ShaderError::CompilationError {
            stage: ShaderStage::Fragment,
            ..
        }))
    ));
    assert_eq!(
        journal.count(|c| matches!(c, DeviceCall::DestroyShaderModule(_))),
        1
    );
    assert_eq!(journal.count(|c| matches!(c, DeviceCall::LinkProgram(_))), 0);
}

#[test]
fn test_unsupported_uniform_type_destroys_program() {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let fragment = "uniform sampler2DShadow shadow;\nvoid main() {}\n";

    // --- 2. ACT ---
    let result = context.create_shader(common::VERTEX, fragment);

    // --- 3. ASSERT ---
    assert_eq!(
        result.unwrap_err(),
        ResourceError::Shader(ShaderError::UnsupportedUniformType {
            name: "shadow".to_string()
        })
    );
    assert_eq!(
        journal.count(|c| matches!(c, DeviceCall::DestroyProgram(_))),
        1
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Draw calls
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_stereo_without_single_pass_draws_twice() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let mut command = DrawCommand::new(mesh, shader);
    command.camera = Camera {
        stereo: true,
        viewports: [LEFT, RIGHT],
        ..Camera::default()
    };
    journal.clear();

    // --- 2. ACT ---
    context.draw(&command)?;

    // --- 3. ASSERT ---
    let calls = journal.calls();
    assert_eq!(journal.draw_count(), 2);
    assert!(calls.contains(&DeviceCall::Viewport(LEFT)));
    assert!(calls.contains(&DeviceCall::Viewport(RIGHT)));
    assert_eq!(
        journal.uploads_to("emberEye").last(),
        Some(&RecordedUpload::Int {
            components: 1,
            values: vec![1],
        })
    );
    Ok(())
}

#[test]
fn test_stereo_with_single_pass_draws_once() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context_with(DeviceFeatures {
        single_pass_stereo: true,
        compressed_textures: true,
        anisotropic_filtering: true,
        memory_barriers: true,
    });
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let mut command = DrawCommand::new(mesh, shader);
    command.camera = Camera {
        stereo: true,
        viewports: [LEFT, RIGHT],
        ..Camera::default()
    };
    journal.clear();

    // --- 2. ACT ---
    context.draw(&command)?;

    // --- 3. ASSERT ---
    assert_eq!(journal.draw_count(), 1);
    assert!(journal
        .calls()
        .contains(&DeviceCall::ViewportArray([LEFT, RIGHT])));
    assert_eq!(
        journal.uploads_to("emberEye"),
        vec![RecordedUpload::Int {
            components: 1,
            values: vec![-1],
        }]
    );
    Ok(())
}

#[test]
fn test_indexed_instanced_draw_uses_range() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    context.set_indices(mesh, IndexData::U16(&[0, 1, 2, 2, 1, 0]))?;
    context.set_draw_range(mesh, 3, 3)?;
    let mut command = DrawCommand::new(mesh, shader);
    command.instances = 4;
    journal.clear();

    // --- 2. ACT ---
    context.draw(&command)?;

    // --- 3. ASSERT ---
    assert_eq!(
        journal.calls().into_iter().filter(DeviceCall::is_draw).collect::<Vec<_>>(),
        vec![DeviceCall::DrawElements {
            mode: DrawMode::Triangles,
            count: 3,
            format: IndexFormat::Uint16,
            offset: 6,
            instances: Some(4),
        }]
    );
    Ok(())
}

#[test]
fn test_too_many_canvases_is_rejected() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, _journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let mut command = DrawCommand::new(mesh, shader);
    for _ in 0..5 {
        let canvas =
            context.create_canvas(8, 8, TextureFormat::Rgba8, CanvasFlags::default())?;
        command.pipeline.canvases.push(canvas);
    }

    // --- 2. ACT ---
    let result = context.draw(&command);

    // --- 3. ASSERT ---
    assert_eq!(
        result.unwrap_err(),
        ResourceError::Config(ConfigError::TooManyCanvases {
            max: 4,
            requested: 5,
        })
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Stencil writes
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_stencil_write_wraps_callback_draws() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let command = DrawCommand::new(mesh, shader);
    journal.clear();

    // --- 2. ACT ---
    let mut invoked = 0;
    context.write_stencil(StencilAction::Replace, 1, |ctx| {
        invoked += 1;
        ctx.draw(&command)
    })?;

    // --- 3. ASSERT ---
    let calls = journal.calls();
    let position = |call: &DeviceCall| calls.iter().position(|c| c == call);
    let mask_off = position(&DeviceCall::ColorMask(false)).expect("color writes disabled");
    let mask_on = position(&DeviceCall::ColorMask(true)).expect("color writes restored");
    let draw = calls.iter().position(DeviceCall::is_draw).expect("callback drew");
    assert_eq!(invoked, 1);
    assert!(mask_off < draw && draw < mask_on);
    assert!(calls.contains(&DeviceCall::StencilFunction(CompareMode::None, 1, 0xff)));
    assert!(calls.contains(&DeviceCall::StencilOperation(
        StencilOp::Keep,
        StencilOp::Keep,
        StencilOp::Replace
    )));
    assert!(!context.state().is_writing_stencil());
    Ok(())
}

#[test]
fn test_draw_after_stencil_write_reapplies_stencil_test() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let command = DrawCommand::new(mesh, shader);
    context.write_stencil(StencilAction::Increment, 0, |ctx| ctx.draw(&command))?;
    journal.clear();

    // --- 2. ACT ---
    context.draw(&command)?;

    // --- 3. ASSERT ---
    assert!(journal
        .calls()
        .contains(&DeviceCall::SetCapability(Capability::StencilTest, false)));
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Uniform blocks
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_bound_block_is_flushed_and_bound_before_draw() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let block = context.create_shader_block(vec![BlockUniform::new("tint", GlslType::Vec4, 1)])?;
    context.bind_block(shader, "Lights", Some(block))?;
    context.write_block(block, "tint", BlockValue::Floats(&[1.0, 0.0, 0.0, 1.0]))?;
    let buffer = context.shader_block(block)?.buffer();
    let id = context.buffer(buffer)?.id();
    journal.clear();

    // --- 2. ACT ---
    context.draw(&DrawCommand::new(mesh, shader))?;

    // --- 3. ASSERT ---
    let calls = journal.calls();
    assert!(calls.contains(&DeviceCall::BufferSubData {
        target: BufferTarget::Uniform,
        offset: 0,
        len: 16,
    }));
    assert!(calls.contains(&DeviceCall::BindBufferBase(BufferTarget::Uniform, 1, Some(id))));
    assert_eq!(
        context.sync().pending(SyncResource::Buffer(buffer)),
        GpuAccess::UNIFORM_READ
    );
    Ok(())
}

#[test]
fn test_shader_keeps_bound_block_alive() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, _journal) = common::context();
    let shader = common::shader(&mut context);
    let block = context.create_shader_block(vec![BlockUniform::new("tint", GlslType::Vec4, 1)])?;
    context.bind_block(shader, "Lights", Some(block))?;

    // --- 2. ACT ---
    context.destroy_shader_block(block)?;
    let alive_while_bound = context.shader_block(block).is_ok();
    context.destroy_shader(shader)?;

    // --- 3. ASSERT ---
    assert!(alive_while_bound);
    assert!(context.shader_block(block).is_err());
    Ok(())
}

#[test]
fn test_binding_unknown_block_is_rejected() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, _journal) = common::context();
    let shader = common::shader(&mut context);

    // --- 2. ACT ---
    let result = context.bind_block(shader, "Missing", None);

    // --- 3. ASSERT ---
    assert_eq!(
        result.unwrap_err(),
        ResourceError::Config(ConfigError::UnknownBlock("Missing".to_string()))
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Clears
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_clear_default_framebuffer() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    journal.clear();

    // --- 2. ACT ---
    context.clear(&[], Some(Color::BLACK), Some(1.0), Some(0))?;

    // --- 3. ASSERT ---
    let calls = journal.calls();
    assert!(calls.contains(&DeviceCall::ClearColor(0, [0.0, 0.0, 0.0, 1.0])));
    assert!(calls.contains(&DeviceCall::ClearDepth(1.0)));
    assert!(calls.contains(&DeviceCall::ClearStencil(0)));
    Ok(())
}

#[test]
fn test_clear_after_depthless_pipeline_restores_depth_write() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let mut command = DrawCommand::new(mesh, shader);
    command.pipeline.state.depth_write = false;
    context.draw(&command)?;
    journal.clear();

    // --- 2. ACT ---
    context.clear(&[], None, Some(1.0), None)?;

    // --- 3. ASSERT ---
    assert_eq!(
        journal.calls(),
        vec![DeviceCall::DepthWrite(true), DeviceCall::ClearDepth(1.0)]
    );
    Ok(())
}
