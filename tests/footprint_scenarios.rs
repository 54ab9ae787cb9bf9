//! Integration coverage for the concrete scenarios and cross-cutting
//! invariants of `spec.md` §8, driven end-to-end through the public
//! `Recorder`/`LivenessMachine` API exactly as a downstream framework would.

use ash::vk;
use ash::vk::Handle;
use vk_footprint::behavior::SubcommandIndex;
use vk_footprint::config::Config;
use vk_footprint::liveness::LivenessMachine;
use vk_footprint::recorder::Recorder;
use vk_footprint::registry::object::{AttachmentDescription, SubpassDescription};
use vk_footprint::registry::descriptor_set::DescriptorContents;
use vk_footprint::trace::{DescriptorSetBind, DescriptorWrite, SubmitDescriptor, TraceCommand, VertexBufferBinding};
use vk_footprint::variable::{RawHandle, Variable};

fn buf(v: u64) -> RawHandle {
    RawHandle::of(vk::Buffer::from_raw(v))
}
fn img(v: u64) -> RawHandle {
    RawHandle::of(vk::Image::from_raw(v))
}
fn view(v: u64) -> RawHandle {
    RawHandle::of(vk::ImageView::from_raw(v))
}
fn mem(v: u64) -> RawHandle {
    RawHandle::of(vk::DeviceMemory::from_raw(v))
}
fn rp(v: u64) -> RawHandle {
    RawHandle::of(vk::RenderPass::from_raw(v))
}
fn fb_handle(v: u64) -> RawHandle {
    RawHandle::of(vk::Framebuffer::from_raw(v))
}
fn cb(v: u64) -> RawHandle {
    RawHandle::of(vk::CommandBuffer::from_raw(v))
}
fn queue(v: u64) -> RawHandle {
    RawHandle::of(vk::Queue::from_raw(v))
}
fn pipeline(v: u64) -> RawHandle {
    RawHandle::of(vk::Pipeline::from_raw(v))
}
fn descriptor_set(v: u64) -> RawHandle {
    RawHandle::of(vk::DescriptorSet::from_raw(v))
}

/// Drive every pending subcommand of `submit_id` to completion, in order.
fn drain_submit(rec: &mut Recorder, count: u32) {
    for i in 0..count {
        rec.post_subcommand(&[0, 0, i]).expect("roll-out ordering");
    }
}

/// Scenario 1 (`spec.md` §8): an unused buffer fill is dead; its
/// create/bind/destroy survive regardless (destroys are always alive).
#[test]
fn unused_buffer_fill_is_dead_but_lifetime_survives() {
    let mut rec = Recorder::new(Config::default());
    let b = buf(1);
    let m = mem(1);
    let c = cb(1);

    rec.build_footprint(0, &TraceCommand::CreateBuffer { buffer: b, size: 1024 });
    rec.build_footprint(1, &TraceCommand::AllocateMemory { memory: m });
    rec.build_footprint(2, &TraceCommand::BindBufferMemory { buffer: b, memory: m, memory_offset: 0 });
    rec.build_footprint(3, &TraceCommand::AllocateCommandBuffers { command_buffers: vec![c] });
    rec.build_footprint(4, &TraceCommand::BeginCommandBuffer { command_buffer: c });
    let fill_cmd_id = 5;
    rec.build_footprint(fill_cmd_id, &TraceCommand::CmdFillBuffer { command_buffer: c, buffer: b, offset: 0, size: 1024 });
    rec.build_footprint(6, &TraceCommand::EndCommandBuffer { command_buffer: c });

    let submit_id = 7;
    rec.build_footprint(
        submit_id,
        &TraceCommand::QueueSubmit {
            submit: SubmitDescriptor {
                queue: queue(1),
                wait_semaphores: vec![],
                signal_semaphores: vec![],
                signal_fence: None,
                command_buffers: vec![vec![c]],
                observations: vec![],
            },
        },
    );
    drain_submit(&mut rec, 1);

    rec.build_footprint(8, &TraceCommand::DestroyBuffer { buffer: b });

    let footprint = &rec.footprint;
    let mut lm = LivenessMachine::new();
    let alive = lm.run_full(footprint);

    // The create (index 0) and the destroy (last pushed) must be alive.
    assert!(alive[0], "create must survive");
    assert!(alive[alive.len() - 1], "destroy must always be alive");

    // No behavior produced directly from the fill's own subcommand index is
    // kept: nothing ever reads the buffer's backing after the fill writes it.
    let fill_kept = footprint
        .iter()
        .any(|(id, behavior)| matches!(behavior.index, Some(SubcommandIndex::Primary { command, .. }) if command == 0) && alive[id.index()]);
    assert!(!fill_kept, "unread fill must be dead");
}

/// Scenario 3 (`spec.md` §8): a standalone clear that fully covers an image
/// is dead when a render pass's load-op CLEAR fully rewrites it afterwards.
#[test]
fn redundant_clear_before_full_reclear_is_dead() {
    let mut rec = Recorder::new(Config::default());
    let image = img(1);
    let iv = view(1);
    let render_pass = rp(1);
    let framebuffer = fb_handle(1);
    let c = cb(1);

    rec.build_footprint(
        0,
        &TraceCommand::CreateImage {
            image,
            image_type: vk::ImageType::TYPE_2D,
            array_layers: 1,
            mip_levels: 1,
            extent: vk::Extent3D { width: 64, height: 64, depth: 1 },
        },
    );
    rec.build_footprint(
        1,
        &TraceCommand::CreateImageView {
            view: iv,
            image,
            view_type: vk::ImageViewType::TYPE_2D,
            base_array_layer: 0,
            layer_count: 1,
            width: 64,
            height: 64,
        },
    );
    rec.build_footprint(
        2,
        &TraceCommand::CreateRenderPass {
            render_pass,
            attachments: vec![AttachmentDescription {
                load_op: vk::AttachmentLoadOp::CLEAR,
                store_op: vk::AttachmentStoreOp::STORE,
                stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
                stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            }],
            subpasses: vec![SubpassDescription { color: vec![0], resolve: vec![], input: vec![], depth_stencil: None }],
        },
    );
    rec.build_footprint(
        3,
        &TraceCommand::CreateFramebuffer { framebuffer, attachments: vec![iv], width: 64, height: 64, layers: 1 },
    );
    rec.build_footprint(4, &TraceCommand::AllocateCommandBuffers { command_buffers: vec![c] });
    rec.build_footprint(5, &TraceCommand::BeginCommandBuffer { command_buffer: c });

    let clear_cmd_id = 6;
    rec.build_footprint(
        clear_cmd_id,
        &TraceCommand::CmdClearColorImage { command_buffer: c, image, ranges: vec![], image_layers: 1, mip_levels: 1 },
    );
    rec.build_footprint(
        7,
        &TraceCommand::CmdBeginRenderPass { command_buffer: c, render_pass, framebuffer },
    );
    rec.build_footprint(8, &TraceCommand::CmdBindPipeline { command_buffer: c, pipeline: pipeline(1) });
    rec.build_footprint(9, &TraceCommand::CmdDraw { command_buffer: c });
    rec.build_footprint(10, &TraceCommand::CmdEndRenderPass { command_buffer: c });
    rec.build_footprint(11, &TraceCommand::EndCommandBuffer { command_buffer: c });

    let submit_id = 12;
    rec.build_footprint(
        submit_id,
        &TraceCommand::QueueSubmit {
            submit: SubmitDescriptor {
                queue: queue(1),
                wait_semaphores: vec![],
                signal_semaphores: vec![],
                signal_fence: None,
                command_buffers: vec![vec![c]],
                observations: vec![],
            },
        },
    );
    drain_submit(&mut rec, 5);

    let footprint = &rec.footprint;
    let mut lm = LivenessMachine::new();
    lm.record_last_framebuffer_data(13, vec![Variable::Handle(image)]);
    let alive = lm.framebuffer_request(footprint, 13);

    let clear_kept = footprint
        .iter()
        .any(|(id, behavior)| matches!(behavior.index, Some(SubcommandIndex::Primary { command, .. }) if command == 0) && alive[id.index()]);
    assert!(!clear_kept, "a standalone clear fully rewritten by the render pass's load op must be dead");
}

/// Every `VkDestroy*`/`VkFree*` handler produces a behavior with `alive =
/// true`, regardless of whether its write is read downstream (`spec.md` §8).
#[test]
fn destruction_preservation_holds_with_no_downstream_reads() {
    let mut rec = Recorder::new(Config::default());
    let b = buf(9);
    rec.build_footprint(0, &TraceCommand::CreateBuffer { buffer: b, size: 16 });
    rec.build_footprint(1, &TraceCommand::DestroyBuffer { buffer: b });

    let mut lm = LivenessMachine::new();
    let alive = lm.run_full(&rec.footprint);
    assert!(alive[1], "destroy must be alive even with nothing reading it afterward");
}

/// A `beginRenderPass`/`endRenderPass` pair is kept together: if a
/// descendant use keeps `begin` alive, `end`'s forward-paired definition
/// resurrects it too (`spec.md` §3, §4.4).
#[test]
fn render_pass_begin_end_pairing_is_resurrected_together() {
    let mut rec = Recorder::new(Config::default());
    let image = img(2);
    let iv = view(2);
    let render_pass = rp(2);
    let framebuffer = fb_handle(2);
    let c = cb(2);

    rec.build_footprint(
        0,
        &TraceCommand::CreateImage {
            image,
            image_type: vk::ImageType::TYPE_2D,
            array_layers: 1,
            mip_levels: 1,
            extent: vk::Extent3D { width: 32, height: 32, depth: 1 },
        },
    );
    rec.build_footprint(
        1,
        &TraceCommand::CreateImageView {
            view: iv,
            image,
            view_type: vk::ImageViewType::TYPE_2D,
            base_array_layer: 0,
            layer_count: 1,
            width: 32,
            height: 32,
        },
    );
    rec.build_footprint(
        2,
        &TraceCommand::CreateRenderPass {
            render_pass,
            attachments: vec![AttachmentDescription {
                load_op: vk::AttachmentLoadOp::CLEAR,
                store_op: vk::AttachmentStoreOp::STORE,
                stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
                stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            }],
            subpasses: vec![SubpassDescription { color: vec![0], resolve: vec![], input: vec![], depth_stencil: None }],
        },
    );
    rec.build_footprint(
        3,
        &TraceCommand::CreateFramebuffer { framebuffer, attachments: vec![iv], width: 32, height: 32, layers: 1 },
    );
    rec.build_footprint(4, &TraceCommand::AllocateCommandBuffers { command_buffers: vec![c] });
    rec.build_footprint(5, &TraceCommand::BeginCommandBuffer { command_buffer: c });
    rec.build_footprint(6, &TraceCommand::CmdBeginRenderPass { command_buffer: c, render_pass, framebuffer });
    rec.build_footprint(7, &TraceCommand::CmdEndRenderPass { command_buffer: c });
    rec.build_footprint(8, &TraceCommand::EndCommandBuffer { command_buffer: c });

    let submit_id = 9;
    rec.build_footprint(
        submit_id,
        &TraceCommand::QueueSubmit {
            submit: SubmitDescriptor {
                queue: queue(2),
                wait_semaphores: vec![],
                signal_semaphores: vec![],
                signal_fence: None,
                command_buffers: vec![vec![c]],
                observations: vec![],
            },
        },
    );
    drain_submit(&mut rec, 2);

    let footprint = &rec.footprint;
    let mut lm = LivenessMachine::new();
    // Seed liveness from the attachment image alone: this forces the
    // `endRenderPass` store-op write to be read, which must in turn
    // resurrect `beginRenderPass` through the forward-paired label.
    lm.record_last_framebuffer_data(10, vec![Variable::Handle(image)]);
    let alive = lm.framebuffer_request(footprint, 10);

    let begin_kept = footprint
        .iter()
        .any(|(id, behavior)| matches!(behavior.index, Some(SubcommandIndex::Primary { command, .. }) if command == 0) && alive[id.index()]);
    let end_kept = footprint
        .iter()
        .any(|(id, behavior)| matches!(behavior.index, Some(SubcommandIndex::Primary { command, .. }) if command == 1) && alive[id.index()]);
    assert!(end_kept, "endRenderPass's store-op write must be kept (it's what the seed reads)");
    assert!(begin_kept, "beginRenderPass must be resurrected alongside its paired end");
}

/// Scenario 2 (`spec.md` §8): a single draw into a freshly cleared,
/// fully-covered framebuffer keeps the whole recording chain alive. The
/// draw binds a storage-image descriptor over the same attachment, so its
/// descriptor expansion (`spec.md` §4.5) gives it a modify of its own —
/// without some write of its own a draw has nothing for liveness to chain
/// through, per `IsAlive`'s literal "any write intersects the live set"
/// definition (`spec.md` §4.6).
#[test]
fn single_draw_into_framebuffer_keeps_the_whole_chain_alive() {
    let mut rec = Recorder::new(Config::default());
    let image = img(3);
    let iv = view(3);
    let render_pass = rp(3);
    let framebuffer = fb_handle(3);
    let vbuf = buf(3);
    let vmem = mem(3);
    let set = descriptor_set(3);
    let c = cb(3);

    rec.build_footprint(
        0,
        &TraceCommand::CreateImage {
            image,
            image_type: vk::ImageType::TYPE_2D,
            array_layers: 1,
            mip_levels: 1,
            extent: vk::Extent3D { width: 16, height: 16, depth: 1 },
        },
    );
    rec.build_footprint(
        1,
        &TraceCommand::CreateImageView {
            view: iv,
            image,
            view_type: vk::ImageViewType::TYPE_2D,
            base_array_layer: 0,
            layer_count: 1,
            width: 16,
            height: 16,
        },
    );
    rec.build_footprint(
        2,
        &TraceCommand::CreateRenderPass {
            render_pass,
            attachments: vec![AttachmentDescription {
                load_op: vk::AttachmentLoadOp::CLEAR,
                store_op: vk::AttachmentStoreOp::STORE,
                stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
                stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            }],
            subpasses: vec![SubpassDescription { color: vec![0], resolve: vec![], input: vec![], depth_stencil: None }],
        },
    );
    rec.build_footprint(
        3,
        &TraceCommand::CreateFramebuffer { framebuffer, attachments: vec![iv], width: 16, height: 16, layers: 1 },
    );
    rec.build_footprint(4, &TraceCommand::CreateBuffer { buffer: vbuf, size: 64 });
    rec.build_footprint(5, &TraceCommand::AllocateMemory { memory: vmem });
    rec.build_footprint(6, &TraceCommand::BindBufferMemory { buffer: vbuf, memory: vmem, memory_offset: 0 });

    let mut binding_counts = std::collections::HashMap::new();
    binding_counts.insert(0u32, 1u32);
    rec.build_footprint(7, &TraceCommand::AllocateDescriptorSets { sets: vec![set], binding_counts: vec![binding_counts] });
    rec.build_footprint(
        8,
        &TraceCommand::UpdateDescriptorSets {
            writes: vec![DescriptorWrite { set, binding: 0, array_index: 0, contents: vec![DescriptorContents::StorageImage(image)] }],
        },
    );

    rec.build_footprint(9, &TraceCommand::AllocateCommandBuffers { command_buffers: vec![c] });
    rec.build_footprint(10, &TraceCommand::BeginCommandBuffer { command_buffer: c });
    rec.build_footprint(11, &TraceCommand::CmdBeginRenderPass { command_buffer: c, render_pass, framebuffer });
    rec.build_footprint(12, &TraceCommand::CmdBindPipeline { command_buffer: c, pipeline: pipeline(3) });
    rec.build_footprint(
        13,
        &TraceCommand::CmdBindVertexBuffers { command_buffer: c, first_binding: 0, buffers: vec![VertexBufferBinding { buffer: vbuf, offset: 0, size: 64 }] },
    );
    rec.build_footprint(
        14,
        &TraceCommand::CmdBindDescriptorSets { command_buffer: c, first_set: 0, sets: vec![DescriptorSetBind { set, set_index: 0 }], dynamic_offsets: vec![] },
    );
    rec.build_footprint(15, &TraceCommand::CmdDraw { command_buffer: c });
    rec.build_footprint(16, &TraceCommand::CmdEndRenderPass { command_buffer: c });
    rec.build_footprint(17, &TraceCommand::EndCommandBuffer { command_buffer: c });

    let submit_id = 18;
    rec.build_footprint(
        submit_id,
        &TraceCommand::QueueSubmit {
            submit: SubmitDescriptor {
                queue: queue(3),
                wait_semaphores: vec![],
                signal_semaphores: vec![],
                signal_fence: None,
                command_buffers: vec![vec![c]],
                observations: vec![],
            },
        },
    );
    drain_submit(&mut rec, 6);

    let footprint = &rec.footprint;
    let mut lm = LivenessMachine::new();
    lm.record_last_framebuffer_data(19, vec![Variable::Handle(image)]);
    let alive = lm.framebuffer_request(footprint, 19);

    let kept = |command: u32| {
        footprint
            .iter()
            .any(|(id, behavior)| matches!(behavior.index, Some(SubcommandIndex::Primary { command: c, .. }) if c == command) && alive[id.index()])
    };
    assert!(kept(0), "beginRenderPass must be kept (its load-op write is what the seed reads)");
    assert!(kept(1), "bindPipeline must be kept: draw reads the pipeline label it writes");
    assert!(kept(4), "draw must be kept: its storage-image modify chains to the seeded attachment");
    assert!(kept(5), "endRenderPass must be kept (it's what the seed reads directly)");
    // `VkCmdBindVertexBuffers` (command 2) and `VkCmdBindDescriptorSets`
    // (command 3) install their state only into the execute-time
    // command-buffer state, per their handler contracts (`spec.md` §4.2c,
    // §4.5) — neither appends a write of its own to the footprint, so
    // neither is ever itself "kept"; what's alive is the `Binding`/
    // `BoundSet` variable the draw reads, not the bind commands' behaviors.
}

/// Scenario 4 (`spec.md` §8): same recording as scenario 2 but
/// storeOp=DONT_CARE. With `fullImageData=true`, `endSubpass` emits a
/// store-attachment `write` that would otherwise sever the chain back to
/// the draw — but the draw's storage-image descriptor write is also
/// accumulated into the subpass's modified-descriptor list, which
/// `endSubpass` always re-modifies regardless of store op. The modify's
/// read half is processed after the write's def half on that same
/// behavior, so the attachment data comes back live and the draw survives
/// a framebuffer request exactly as it would under STORE.
#[test]
fn store_op_dont_care_does_not_kill_a_descriptor_modified_draw() {
    let mut rec = Recorder::new(Config::default());
    let image = img(4);
    let iv = view(4);
    let render_pass = rp(4);
    let framebuffer = fb_handle(4);
    let vbuf = buf(4);
    let vmem = mem(4);
    let set = descriptor_set(4);
    let c = cb(4);

    rec.build_footprint(
        0,
        &TraceCommand::CreateImage {
            image,
            image_type: vk::ImageType::TYPE_2D,
            array_layers: 1,
            mip_levels: 1,
            extent: vk::Extent3D { width: 16, height: 16, depth: 1 },
        },
    );
    rec.build_footprint(
        1,
        &TraceCommand::CreateImageView {
            view: iv,
            image,
            view_type: vk::ImageViewType::TYPE_2D,
            base_array_layer: 0,
            layer_count: 1,
            width: 16,
            height: 16,
        },
    );
    rec.build_footprint(
        2,
        &TraceCommand::CreateRenderPass {
            render_pass,
            attachments: vec![AttachmentDescription {
                load_op: vk::AttachmentLoadOp::CLEAR,
                store_op: vk::AttachmentStoreOp::DONT_CARE,
                stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
                stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            }],
            subpasses: vec![SubpassDescription { color: vec![0], resolve: vec![], input: vec![], depth_stencil: None }],
        },
    );
    rec.build_footprint(
        3,
        &TraceCommand::CreateFramebuffer { framebuffer, attachments: vec![iv], width: 16, height: 16, layers: 1 },
    );
    rec.build_footprint(4, &TraceCommand::CreateBuffer { buffer: vbuf, size: 64 });
    rec.build_footprint(5, &TraceCommand::AllocateMemory { memory: vmem });
    rec.build_footprint(6, &TraceCommand::BindBufferMemory { buffer: vbuf, memory: vmem, memory_offset: 0 });

    let mut binding_counts = std::collections::HashMap::new();
    binding_counts.insert(0u32, 1u32);
    rec.build_footprint(7, &TraceCommand::AllocateDescriptorSets { sets: vec![set], binding_counts: vec![binding_counts] });
    rec.build_footprint(
        8,
        &TraceCommand::UpdateDescriptorSets {
            writes: vec![DescriptorWrite { set, binding: 0, array_index: 0, contents: vec![DescriptorContents::StorageImage(image)] }],
        },
    );

    rec.build_footprint(9, &TraceCommand::AllocateCommandBuffers { command_buffers: vec![c] });
    rec.build_footprint(10, &TraceCommand::BeginCommandBuffer { command_buffer: c });
    rec.build_footprint(11, &TraceCommand::CmdBeginRenderPass { command_buffer: c, render_pass, framebuffer });
    rec.build_footprint(12, &TraceCommand::CmdBindPipeline { command_buffer: c, pipeline: pipeline(4) });
    rec.build_footprint(
        13,
        &TraceCommand::CmdBindVertexBuffers { command_buffer: c, first_binding: 0, buffers: vec![VertexBufferBinding { buffer: vbuf, offset: 0, size: 64 }] },
    );
    rec.build_footprint(
        14,
        &TraceCommand::CmdBindDescriptorSets { command_buffer: c, first_set: 0, sets: vec![DescriptorSetBind { set, set_index: 0 }], dynamic_offsets: vec![] },
    );
    rec.build_footprint(15, &TraceCommand::CmdDraw { command_buffer: c });
    rec.build_footprint(16, &TraceCommand::CmdEndRenderPass { command_buffer: c });
    rec.build_footprint(17, &TraceCommand::EndCommandBuffer { command_buffer: c });

    let submit_id = 18;
    rec.build_footprint(
        submit_id,
        &TraceCommand::QueueSubmit {
            submit: SubmitDescriptor {
                queue: queue(4),
                wait_semaphores: vec![],
                signal_semaphores: vec![],
                signal_fence: None,
                command_buffers: vec![vec![c]],
                observations: vec![],
            },
        },
    );
    drain_submit(&mut rec, 6);

    let footprint = &rec.footprint;
    let mut lm = LivenessMachine::new();
    lm.record_last_framebuffer_data(19, vec![Variable::Handle(image)]);
    let alive = lm.framebuffer_request(footprint, 19);

    let kept = |command: u32| {
        footprint
            .iter()
            .any(|(id, behavior)| matches!(behavior.index, Some(SubcommandIndex::Primary { command: c, .. }) if c == command) && alive[id.index()])
    };
    assert!(kept(4), "draw must stay kept under DONT_CARE: its descriptor modify is re-modified at endSubpass regardless of store op");
    assert!(kept(5), "endRenderPass must be kept (it's what the seed reads directly)");
}
