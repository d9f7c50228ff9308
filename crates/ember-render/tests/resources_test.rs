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

//! Integration tests for textures, views, meshes and canvases.

mod common;

use ember_core::math::{Extent3D, Origin3D};
use ember_core::renderer::{
    AttributePointer, AttributeType, CanvasFlags, ConfigError, DrawMode, FramebufferTarget,
    GpuAccess, MeshUsage, ResourceError, TextureDescriptor, TextureFormat, TextureRegion,
    TextureSubrange, TextureType, TextureViewDescriptor, VertexFormat,
};
use ember_infra::graphics::headless::DeviceCall;
use ember_render::{DrawCommand, SyncResource};

// ─────────────────────────────────────────────────────────────────────────────
// Textures
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_auto_mipmaps_cover_full_chain() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, _journal) = common::context();
    let descriptor = TextureDescriptor {
        size: Extent3D::d2(4, 4),
        ..Default::default()
    };

    // --- 2. ACT ---
    let texture = context.create_texture(&descriptor, &[])?;

    // --- 3. ASSERT ---
    assert_eq!(context.texture(texture)?.mipmap_count(), 3);
    Ok(())
}

#[test]
fn test_cube_with_five_layers_is_rejected() {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let descriptor = TextureDescriptor {
        texture_type: TextureType::Cube,
        size: Extent3D::new(4, 4, 5),
        ..Default::default()
    };
    journal.clear();

    // --- 2. ACT ---
    let result = context.create_texture(&descriptor, &[]);

    // --- 3. ASSERT ---
    assert_eq!(
        result.unwrap_err(),
        ResourceError::Config(ConfigError::CubeLayerCount { layers: 5 })
    );
    let created = journal.count(|c| matches!(c, DeviceCall::CreateTexture(_)));
    assert_eq!(created, 0, "nothing is allocated for an invalid descriptor");
}

#[test]
fn test_texture_region_is_read_from_one_layer_and_level() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let texture = context.create_texture(
        &TextureDescriptor {
            texture_type: TextureType::Array,
            size: Extent3D::new(8, 8, 3),
            ..Default::default()
        },
        &[],
    )?;
    let id = context.texture(texture)?.id();
    journal.clear();

    // --- 2. ACT ---
    let pixels = context.texture_pixels(
        texture,
        TextureRegion {
            origin: Origin3D::new(1, 2, 2),
            extent: Extent3D::d2(2, 3),
            mip_level: 1,
        },
    )?;

    // --- 3. ASSERT ---
    assert_eq!(pixels.len(), 2 * 3 * 4);
    let calls = journal.calls();
    assert!(calls.contains(&DeviceCall::FramebufferTextureLayer(
        ember_core::renderer::Attachment::Color(0),
        Some(id),
        1,
        2
    )));
    assert!(calls.contains(&DeviceCall::ReadPixels(1, 2, 2, 3)));
    assert_eq!(
        calls.last(),
        Some(&DeviceCall::BindFramebuffer(FramebufferTarget::Both, None))
    );
    assert_eq!(
        context.sync().pending(SyncResource::Texture(texture)),
        GpuAccess::DOWNLOAD_READ
    );
    Ok(())
}

#[test]
fn test_texture_readback_rejects_missing_layer() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let texture = context.create_texture(
        &TextureDescriptor {
            size: Extent3D::d2(4, 4),
            ..Default::default()
        },
        &[],
    )?;
    journal.clear();

    // --- 2. ACT ---
    let result = context.texture_pixels(
        texture,
        TextureRegion {
            origin: Origin3D::new(0, 0, 1),
            extent: Extent3D::d2(4, 4),
            mip_level: 0,
        },
    );

    // --- 3. ASSERT ---
    assert!(matches!(
        result,
        Err(ResourceError::Config(ConfigError::RegionOutOfBounds(_)))
    ));
    assert_eq!(journal.count(|c| matches!(c, DeviceCall::ReadPixels(..))), 0);
    Ok(())
}

#[test]
fn test_destroying_view_keeps_source() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, _journal) = common::context();
    let source = context.create_texture(
        &TextureDescriptor {
            size: Extent3D::d2(8, 8),
            ..Default::default()
        },
        &[],
    )?;
    let view = context.create_texture_view(
        source,
        &TextureViewDescriptor {
            mipmap_index: 1,
            ..Default::default()
        },
    )?;

    // --- 2. ACT ---
    context.destroy_texture(view)?;

    // --- 3. ASSERT ---
    assert!(context.texture(view).is_err());
    assert_eq!(context.texture(source)?.size(), Extent3D::d2(8, 8));
    Ok(())
}

#[test]
fn test_view_keeps_source_storage_alive() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let source = context.create_texture(
        &TextureDescriptor {
            size: Extent3D::d2(8, 8),
            ..Default::default()
        },
        &[],
    )?;
    let view = context.create_texture_view(source, &TextureViewDescriptor::default())?;
    let id = context.texture(source)?.id();

    // --- 2. ACT ---
    context.destroy_texture(source)?;
    let destroyed_early = journal.count(|c| *c == DeviceCall::DestroyTexture(id));
    context.destroy_texture(view)?;

    // --- 3. ASSERT ---
    assert_eq!(destroyed_early, 0, "the view still references the storage");
    assert_eq!(journal.count(|c| *c == DeviceCall::DestroyTexture(id)), 1);
    assert!(context.texture(source).is_err());
    Ok(())
}

#[test]
fn test_view_passes_its_subrange_to_the_device() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let source = context.create_texture(
        &TextureDescriptor {
            texture_type: TextureType::Array,
            size: Extent3D::new(8, 8, 4),
            ..Default::default()
        },
        &[],
    )?;
    let (source_id, format) = {
        let texture = context.texture(source)?;
        (texture.id(), texture.format())
    };

    // --- 2. ACT ---
    let view = context.create_texture_view(
        source,
        &TextureViewDescriptor {
            texture_type: TextureType::D2,
            layer_index: 2,
            mipmap_index: 1,
            mipmap_count: 2,
            ..Default::default()
        },
    )?;

    // --- 3. ASSERT ---
    let view_id = context.texture(view)?.id();
    assert_ne!(view_id, source_id, "a view has its own device texture");
    assert!(journal.calls().contains(&DeviceCall::CreateTextureView {
        view: view_id,
        source: source_id,
        texture_type: TextureType::D2,
        format,
        range: TextureSubrange {
            base_layer: 2,
            layer_count: 1,
            base_mipmap: 1,
            mipmap_count: 2,
        },
    }));
    assert_eq!(context.texture(view)?.size(), Extent3D::new(4, 4, 1));
    assert_eq!(context.texture(view)?.view_base(), (2, 1));
    Ok(())
}

#[test]
fn test_view_type_must_be_compatible_with_source() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, _journal) = common::context();
    let source = context.create_texture(
        &TextureDescriptor {
            size: Extent3D::d2(8, 8),
            ..Default::default()
        },
        &[],
    )?;

    // --- 2. ACT ---
    let result = context.create_texture_view(
        source,
        &TextureViewDescriptor {
            texture_type: TextureType::Array,
            ..Default::default()
        },
    );

    // --- 3. ASSERT ---
    assert!(matches!(
        result,
        Err(ResourceError::Config(ConfigError::IncompatibleView(_)))
    ));
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Meshes
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_resize_within_capacity_is_noop() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let mesh = common::triangle(&mut context);
    journal.clear();

    // --- 2. ACT ---
    context.resize_mesh(mesh, 2)?;
    context.resize_mesh(mesh, 3)?;

    // --- 3. ASSERT ---
    let allocations = journal.count(|c| matches!(c, DeviceCall::BufferData { .. }));
    assert_eq!(allocations, 0);
    assert_eq!(context.mesh(mesh)?.vertex_count(), 3);
    Ok(())
}

#[test]
fn test_resize_grows_to_power_of_two_and_keeps_data() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let mesh = common::triangle(&mut context);
    let stride = VertexFormat::standard().stride as usize;
    context.map_vertices(mesh, 0, 3)?.fill(0xab);
    journal.clear();

    // --- 2. ACT ---
    context.resize_mesh(mesh, 5)?;

    // --- 3. ASSERT ---
    let mesh = context.mesh(mesh)?;
    assert_eq!(mesh.vertex_count(), 8);
    assert_eq!(mesh.vertices().len(), 8 * stride);
    assert!(mesh.vertices()[..3 * stride].iter().all(|b| *b == 0xab));
    assert!(mesh.vertices()[3 * stride..].iter().all(|b| *b == 0));
    assert!(journal.calls().iter().any(|c| matches!(
        c,
        DeviceCall::BufferData { size, initialized: true, .. } if *size == 8 * stride as u64
    )));
    Ok(())
}

#[test]
fn test_draw_range_is_validated_against_vertices() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, _journal) = common::context();
    let mesh = common::triangle(&mut context);

    // --- 2. ACT ---
    let result = context.set_draw_range(mesh, 2, 4);

    // --- 3. ASSERT ---
    assert!(matches!(
        result,
        Err(ResourceError::Config(ConfigError::DrawRangeOutOfBounds { .. }))
    ));
    assert_eq!(context.mesh(mesh)?.draw_range(), None);
    Ok(())
}

#[test]
fn test_attaching_to_an_attachment_source_is_rejected() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, _journal) = common::context();
    let instanced = common::triangle(&mut context);
    let offsets = context.create_mesh(
        4,
        VertexFormat::new().with("offset", AttributeType::Float, 3),
        DrawMode::Points,
        MeshUsage::Dynamic,
    )?;
    context.attach_attribute(instanced, offsets, "offset", 1)?;

    // --- 2. ACT ---
    let result = context.attach_attribute(offsets, instanced, "emberNormal", 0);

    // --- 3. ASSERT ---
    assert!(matches!(
        result,
        Err(ResourceError::Config(ConfigError::AttachToAttachment))
    ));
    assert!(context.mesh(offsets)?.is_attachment_source());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Mesh binding
// ─────────────────────────────────────────────────────────────────────────────

const OFFSET_VERTEX: &str = r#"
#version 330
in vec3 emberPosition;
in vec3 offset;
void main() {}
"#;

fn is_binding_call(call: &DeviceCall) -> bool {
    matches!(
        call,
        DeviceCall::SetAttributeEnabled(..)
            | DeviceCall::AttributePointer(..)
            | DeviceCall::AttributeDivisor(..)
    )
}

#[test]
fn test_unchanged_layout_is_not_reissued() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let command = DrawCommand::new(mesh, shader);
    context.draw(&command)?;
    let first_draw = journal.count(is_binding_call);
    journal.clear();

    // --- 2. ACT ---
    context.draw(&command)?;

    // --- 3. ASSERT ---
    assert!(first_draw > 0, "the first draw enables and points every slot");
    assert_eq!(journal.count(is_binding_call), 0);
    Ok(())
}

#[test]
fn test_reenabled_slot_receives_its_new_pointer() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let reads_a = context.create_shader(
        "#version 330\nin vec3 a;\nvoid main() {}\n",
        common::FRAGMENT,
    )?;
    let reads_b = context.create_shader(
        "#version 330\nin vec3 b;\nvoid main() {}\n",
        common::FRAGMENT,
    )?;
    let mesh = context.create_mesh(
        3,
        VertexFormat::new()
            .with("a", AttributeType::Float, 3)
            .with("b", AttributeType::Float, 3),
        DrawMode::Triangles,
        MeshUsage::Static,
    )?;
    context.draw(&DrawCommand::new(mesh, reads_a))?;
    context.set_attribute_enabled(mesh, "b", false)?;
    context.draw(&DrawCommand::new(mesh, reads_b))?;
    context.set_attribute_enabled(mesh, "b", true)?;
    journal.clear();

    // --- 2. ACT ---
    context.draw(&DrawCommand::new(mesh, reads_b))?;

    // --- 3. ASSERT ---
    let calls = journal.calls();
    assert!(calls.contains(&DeviceCall::SetAttributeEnabled(0, true)));
    assert!(calls.contains(&DeviceCall::AttributePointer(
        0,
        AttributePointer {
            components: 3,
            attribute_type: AttributeType::Float,
            stride: 24,
            offset: 12,
        }
    )));
    Ok(())
}

#[test]
fn test_attached_attribute_divisor_reaches_device() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let shader = context.create_shader(OFFSET_VERTEX, common::FRAGMENT)?;
    let location = context
        .shader(shader)?
        .attribute_location("offset")
        .ok_or_else(|| anyhow::anyhow!("offset should be an active input"))?;
    let mesh = common::triangle(&mut context);
    let offsets = context.create_mesh(
        4,
        VertexFormat::new().with("offset", AttributeType::Float, 3),
        DrawMode::Points,
        MeshUsage::Dynamic,
    )?;
    context.attach_attribute(mesh, offsets, "offset", 1)?;
    journal.clear();

    // --- 2. ACT ---
    context.draw(&DrawCommand::new(mesh, shader))?;

    // --- 3. ASSERT ---
    assert!(journal
        .calls()
        .contains(&DeviceCall::AttributeDivisor(location, 1)));
    Ok(())
}

#[test]
fn test_destroying_mesh_releases_attachment_source() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, _journal) = common::context();
    let mesh = common::triangle(&mut context);
    let offsets = context.create_mesh(
        4,
        VertexFormat::new().with("offset", AttributeType::Float, 3),
        DrawMode::Points,
        MeshUsage::Dynamic,
    )?;
    context.attach_attribute(mesh, offsets, "offset", 1)?;
    context.destroy_mesh(offsets)?;
    let alive_while_attached = context.mesh(offsets).is_ok();

    // --- 2. ACT ---
    context.destroy_mesh(mesh)?;

    // --- 3. ASSERT ---
    assert!(alive_while_attached);
    assert!(context.mesh(offsets).is_err());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Canvases
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_multi_canvas_dimension_mismatch_is_rejected() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let small = context.create_canvas(64, 64, TextureFormat::Rgba8, CanvasFlags::default())?;
    let large = context.create_canvas(128, 128, TextureFormat::Rgba8, CanvasFlags::default())?;
    let mut command = DrawCommand::new(mesh, shader);
    command.pipeline.canvases = vec![small, large];
    journal.clear();

    // --- 2. ACT ---
    let result = context.draw(&command);

    // --- 3. ASSERT ---
    assert_eq!(
        result.unwrap_err(),
        ResourceError::Config(ConfigError::CanvasDimensionMismatch {
            expected: (64, 64),
            actual: (128, 128),
        })
    );
    assert_eq!(journal.draw_count(), 0);
    Ok(())
}

#[test]
fn test_multi_canvas_attaches_extra_color_targets() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let first = context.create_canvas(32, 32, TextureFormat::Rgba8, CanvasFlags::default())?;
    let second = context.create_canvas(32, 32, TextureFormat::Rgba8, CanvasFlags::default())?;
    let second_id = context.texture(context.canvas_texture(second)?)?.id();
    let mut command = DrawCommand::new(mesh, shader);
    command.pipeline.canvases = vec![first, second];
    journal.clear();

    // --- 2. ACT ---
    context.draw(&command)?;

    // --- 3. ASSERT ---
    let calls = journal.calls();
    assert!(calls.contains(&DeviceCall::FramebufferTexture(
        ember_core::renderer::Attachment::Color(1),
        Some(second_id),
        0
    )));
    assert!(calls.contains(&DeviceCall::DrawBuffers(2)));
    assert!(calls.contains(&DeviceCall::Viewport(ember_core::renderer::Viewport::full(32, 32))));
    assert_eq!(context.state().canvases(), &[first, second]);
    Ok(())
}

#[test]
fn test_attached_canvas_texture_outlives_its_canvas() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let first = context.create_canvas(32, 32, TextureFormat::Rgba8, CanvasFlags::default())?;
    let second = context.create_canvas(32, 32, TextureFormat::Rgba8, CanvasFlags::default())?;
    let texture = context.canvas_texture(second)?;
    let mut command = DrawCommand::new(mesh, shader);
    command.pipeline.canvases = vec![first, second];
    context.draw(&command)?;
    context.destroy_canvas(second)?;
    let alive_while_attached = context.texture(texture).is_ok();
    journal.clear();

    // --- 2. ACT ---
    command.pipeline.canvases = vec![first];
    context.draw(&command)?;

    // --- 3. ASSERT ---
    assert!(alive_while_attached);
    let calls = journal.calls();
    assert!(calls.contains(&DeviceCall::FramebufferTexture(
        ember_core::renderer::Attachment::Color(1),
        None,
        0
    )));
    assert!(calls.contains(&DeviceCall::DrawBuffers(1)));
    assert!(context.texture(texture).is_err());
    Ok(())
}

#[test]
fn test_depth_formats_cannot_back_a_canvas() {
    // --- 1. ARRANGE ---
    let (mut context, _journal) = common::context();

    // --- 2. ACT ---
    let result = context.create_canvas(16, 16, TextureFormat::Depth24, CanvasFlags::default());

    // --- 3. ASSERT ---
    assert_eq!(
        result.unwrap_err(),
        ResourceError::Config(ConfigError::UnsupportedCanvasFormat(TextureFormat::Depth24))
    );
}

#[test]
fn test_msaa_canvas_resolves_by_blit() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let flags = CanvasFlags {
        msaa: 4,
        ..CanvasFlags::default()
    };
    let canvas = context.create_canvas(48, 24, TextureFormat::Rgba8, flags)?;
    journal.clear();

    // --- 2. ACT ---
    context.resolve_canvas(canvas)?;

    // --- 3. ASSERT ---
    assert!(journal.calls().contains(&DeviceCall::BlitFramebuffer(48, 24)));
    Ok(())
}
