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

//! Integration tests for state memoization and hazard tracking.

mod common;

use ember_core::renderer::{BlendMode, BufferDescriptor, BufferUsage, GpuAccess, PipelineState};
use ember_infra::graphics::headless::DeviceCall;
use ember_render::{DrawCommand, SyncResource};

// ─────────────────────────────────────────────────────────────────────────────
// State cache
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_repeated_pipeline_reaches_device_once() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let command = DrawCommand::new(mesh, shader);
    journal.clear();

    // --- 2. ACT ---
    context.draw(&command)?;
    context.draw(&command)?;

    // --- 3. ASSERT ---
    let blends = journal.count(|c| matches!(c, DeviceCall::BlendState(_)));
    assert_eq!(blends, 1, "the same blend mode must only be applied once");
    let switches = journal.count(|c| matches!(c, DeviceCall::UseProgram(_)));
    assert_eq!(switches, 0, "the program was already current after creation");
    assert_eq!(journal.draw_count(), 2);
    Ok(())
}

#[test]
fn test_changed_toggle_is_applied_once_per_change() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    let mut command = DrawCommand::new(mesh, shader);
    context.draw(&command)?;
    journal.clear();

    // --- 2. ACT ---
    command.pipeline.state = PipelineState {
        blend_mode: BlendMode::Add,
        culling: true,
        ..PipelineState::default()
    };
    context.draw(&command)?;
    context.draw(&command)?;

    // --- 3. ASSERT ---
    assert_eq!(journal.count(|c| matches!(c, DeviceCall::BlendState(_))), 1);
    let culls = journal.count(|c| {
        matches!(
            c,
            DeviceCall::SetCapability(ember_core::renderer::Capability::CullFace, true)
        )
    });
    assert_eq!(culls, 1);
    Ok(())
}

#[test]
fn test_present_resets_frame_statistics() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, _journal) = common::context();
    let shader = common::shader(&mut context);
    let mesh = common::triangle(&mut context);
    context.draw(&DrawCommand::new(mesh, shader))?;

    // --- 2. ACT ---
    let frame = context.present();

    // --- 3. ASSERT ---
    assert_eq!(frame.draw_calls, 1);
    assert_eq!(context.stats().draw_calls, 0);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Synchronization
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_write_after_write_issues_one_barrier() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let buffer = context.create_buffer(&BufferDescriptor {
        label: Some("scratch".into()),
        size: 64,
        usage: BufferUsage::VERTEX | BufferUsage::UPLOAD,
    })?;
    journal.clear();

    // --- 2. ACT ---
    context.map_buffer(buffer, 0, 16)?.fill(1);
    let after_first = journal.count(|c| matches!(c, DeviceCall::MemoryBarrier(..)));
    context.map_buffer(buffer, 16, 16)?.fill(2);

    // --- 3. ASSERT ---
    assert_eq!(after_first, 0, "the first access has nothing to wait for");
    assert_eq!(
        journal.calls().last(),
        Some(&DeviceCall::MemoryBarrier(
            GpuAccess::UPLOAD_WRITE,
            GpuAccess::UPLOAD_WRITE
        ))
    );
    assert_eq!(context.stats().barriers, 1);
    assert_eq!(
        context.sync().pending(SyncResource::Buffer(buffer)),
        GpuAccess::UPLOAD_WRITE
    );
    Ok(())
}

#[test]
fn test_unmap_uploads_only_written_range() -> anyhow::Result<()> {
    // --- 1. ARRANGE ---
    let (mut context, journal) = common::context();
    let buffer = context.create_buffer(&BufferDescriptor {
        label: None,
        size: 256,
        usage: BufferUsage::VERTEX | BufferUsage::UPLOAD,
    })?;
    context.map_buffer(buffer, 32, 8)?.copy_from_slice(&[9; 8]);
    context.map_buffer(buffer, 64, 8)?.copy_from_slice(&[7; 8]);
    journal.clear();

    // --- 2. ACT ---
    context.unmap_buffer(buffer)?;
    context.unmap_buffer(buffer)?;

    // --- 3. ASSERT ---
    let uploads: Vec<DeviceCall> = journal
        .calls()
        .into_iter()
        .filter(|c| matches!(c, DeviceCall::BufferSubData { .. }))
        .collect();
    assert_eq!(uploads.len(), 1, "a clean buffer has nothing to upload");
    assert!(matches!(
        uploads[0],
        DeviceCall::BufferSubData {
            offset: 32,
            len: 40,
            ..
        }
    ));
    assert_eq!(&context.buffer(buffer)?.contents()[64..72], &[7; 8]);
    Ok(())
}
