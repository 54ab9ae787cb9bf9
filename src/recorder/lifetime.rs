//! Object lifetime handlers (`spec.md` §4.2a): `VkCreate*`/`VkAllocate*`
//! write the new handle; `VkDestroy*`/`VkFree*` read the handle, remove the
//! wrapper, and always mark their behavior alive.

use std::collections::HashMap;

use ash::vk;

use crate::command_buffer::CommandBuffer;
use crate::recorder::{DiagnosticKind, Recorder};
use crate::registry::object::{self, Buffer, DeviceMemory, Framebuffer, Image, QueryPool, RenderPass, Swapchain};
use crate::variable::{Label, RawHandle, Variable};

fn create_handle(rec: &mut Recorder, cmd_id: u64, handle: RawHandle) {
    let id = rec.trace_behavior(cmd_id);
    rec.footprint.write(id, [Variable::Handle(handle)]);
}

fn destroy_handle(rec: &mut Recorder, cmd_id: u64, handle: RawHandle) {
    let id = rec.trace_behavior(cmd_id);
    rec.footprint.read(id, [Variable::Handle(handle)]);
    rec.footprint.get_mut(id).alive = true;
}

pub fn create_buffer(rec: &mut Recorder, cmd_id: u64, buffer: RawHandle, size: u64) {
    create_handle(rec, cmd_id, buffer);
    rec.registry.buffers.insert(buffer, Buffer { size, bindings: Default::default() });
}

pub fn destroy_buffer(rec: &mut Recorder, cmd_id: u64, buffer: RawHandle) {
    destroy_handle(rec, cmd_id, buffer);
    rec.registry.buffers.remove(&buffer);
}

pub fn create_image(rec: &mut Recorder, cmd_id: u64, image: RawHandle, image_type: vk::ImageType, array_layers: u32, mip_levels: u32, extent: vk::Extent3D) {
    create_handle(rec, cmd_id, image);
    let layout_label = rec.registry.fresh_label();
    rec.registry.images.insert(
        image,
        Image {
            layout_label,
            bindings: Default::default(),
            sparse: Default::default(),
            image_type,
            array_layers,
            mip_levels,
            extent,
        },
    );
}

pub fn destroy_image(rec: &mut Recorder, cmd_id: u64, image: RawHandle) {
    destroy_handle(rec, cmd_id, image);
    rec.registry.images.remove(&image);
}

pub fn create_image_view(rec: &mut Recorder, cmd_id: u64, view: RawHandle, image: RawHandle, view_type: vk::ImageViewType, base_array_layer: u32, layer_count: u32, width: u32, height: u32) {
    create_handle(rec, cmd_id, view);
    rec.registry.image_views.insert(
        view,
        object::ImageView {
            image,
            view_type,
            base_array_layer,
            layer_count,
            width,
            height,
        },
    );
}

pub fn destroy_image_view(rec: &mut Recorder, cmd_id: u64, view: RawHandle) {
    destroy_handle(rec, cmd_id, view);
    rec.registry.image_views.remove(&view);
}

pub fn allocate_memory(rec: &mut Recorder, cmd_id: u64, memory: RawHandle) {
    create_handle(rec, cmd_id, memory);
    rec.registry.device_memories.insert(memory, DeviceMemory::default());
}

pub fn free_memory(rec: &mut Recorder, cmd_id: u64, memory: RawHandle) {
    destroy_handle(rec, cmd_id, memory);
    rec.registry.device_memories.remove(&memory);
}

/// Memory-requirement queries modify their subject handle (`spec.md` §4.2a:
/// "cached data depends on them").
pub fn get_buffer_memory_requirements(rec: &mut Recorder, cmd_id: u64, buffer: RawHandle) {
    let id = rec.trace_behavior(cmd_id);
    rec.footprint.modify(id, [Variable::Handle(buffer)]);
}

pub fn get_image_memory_requirements(rec: &mut Recorder, cmd_id: u64, image: RawHandle) {
    let id = rec.trace_behavior(cmd_id);
    rec.footprint.modify(id, [Variable::Handle(image)]);
}

pub fn create_render_pass(rec: &mut Recorder, cmd_id: u64, rp: RawHandle, attachments: Vec<object::AttachmentDescription>, subpasses: Vec<object::SubpassDescription>) {
    create_handle(rec, cmd_id, rp);
    rec.registry.render_passes.insert(rp, RenderPass { attachments, subpasses });
}

pub fn destroy_render_pass(rec: &mut Recorder, cmd_id: u64, rp: RawHandle) {
    destroy_handle(rec, cmd_id, rp);
    rec.registry.render_passes.remove(&rp);
}

pub fn create_framebuffer(rec: &mut Recorder, cmd_id: u64, fb: RawHandle, attachments: Vec<RawHandle>, width: u32, height: u32, layers: u32) {
    create_handle(rec, cmd_id, fb);
    rec.registry.framebuffers.insert(fb, Framebuffer { attachments, width, height, layers });
}

pub fn destroy_framebuffer(rec: &mut Recorder, cmd_id: u64, fb: RawHandle) {
    destroy_handle(rec, cmd_id, fb);
    rec.registry.framebuffers.remove(&fb);
}

pub fn allocate_descriptor_sets(rec: &mut Recorder, cmd_id: u64, sets: &[RawHandle], binding_counts: &[HashMap<u32, u32>]) {
    for (set, counts) in sets.iter().zip(binding_counts.iter()) {
        create_handle(rec, cmd_id, *set);
        let mut ds = crate::registry::descriptor_set::DescriptorSet::new();
        for (&binding, &count) in counts {
            ds.declare_binding(binding, count);
        }
        rec.registry.descriptor_sets.insert(*set, ds);
    }
}

pub fn free_descriptor_sets(rec: &mut Recorder, cmd_id: u64, sets: &[RawHandle]) {
    for set in sets {
        destroy_handle(rec, cmd_id, *set);
        rec.registry.descriptor_sets.remove(set);
    }
}

pub fn create_sync_object(rec: &mut Recorder, cmd_id: u64, handle: RawHandle, select: impl Fn(&mut crate::registry::Registry) -> &mut HashMap<RawHandle, Label>) {
    create_handle(rec, cmd_id, handle);
    let label = rec.registry.fresh_label();
    select(&mut rec.registry).insert(handle, label);
}

pub fn destroy_sync_object(rec: &mut Recorder, cmd_id: u64, handle: RawHandle, select: impl Fn(&mut crate::registry::Registry) -> &mut HashMap<RawHandle, Label>) {
    destroy_handle(rec, cmd_id, handle);
    select(&mut rec.registry).remove(&handle);
}

pub fn create_query_pool(rec: &mut Recorder, cmd_id: u64, pool: RawHandle, query_count: u32) {
    create_handle(rec, cmd_id, pool);
    let mut qp = QueryPool::default();
    for _ in 0..query_count {
        qp.reset_labels.push(rec.registry.fresh_label());
        qp.begin_labels.push(rec.registry.fresh_label());
        qp.end_labels.push(rec.registry.fresh_label());
        qp.result_labels.push(rec.registry.fresh_label());
    }
    rec.registry.query_pools.insert(pool, qp);
}

pub fn destroy_query_pool(rec: &mut Recorder, cmd_id: u64, pool: RawHandle) {
    destroy_handle(rec, cmd_id, pool);
    rec.registry.query_pools.remove(&pool);
}

pub fn create_command_pool(rec: &mut Recorder, cmd_id: u64, pool: RawHandle) {
    create_handle(rec, cmd_id, pool);
    rec.registry.command_pools.insert(pool, ());
}

pub fn allocate_command_buffers(rec: &mut Recorder, cmd_id: u64, command_buffers: &[RawHandle]) {
    for cb in command_buffers {
        create_handle(rec, cmd_id, *cb);
        rec.registry.command_buffers.insert(*cb, CommandBuffer::default());
    }
}

pub fn free_command_buffers(rec: &mut Recorder, cmd_id: u64, command_buffers: &[RawHandle]) {
    for cb in command_buffers {
        destroy_handle(rec, cmd_id, *cb);
        rec.registry.command_buffers.remove(cb);
    }
}

pub fn create_swapchain(rec: &mut Recorder, cmd_id: u64, swapchain: RawHandle, images: Vec<RawHandle>) {
    create_handle(rec, cmd_id, swapchain);
    let n = images.len();
    let acquire_labels = (0..n).map(|_| rec.registry.fresh_label()).collect();
    let present_labels = (0..n).map(|_| rec.registry.fresh_label()).collect();
    rec.registry.swapchains.insert(swapchain, Swapchain { images, acquire_labels, present_labels });
}

pub fn destroy_swapchain(rec: &mut Recorder, cmd_id: u64, swapchain: RawHandle) {
    destroy_handle(rec, cmd_id, swapchain);
    rec.registry.swapchains.remove(&swapchain);
}

pub fn acquire_next_image(rec: &mut Recorder, cmd_id: u64, swapchain: RawHandle, image_index: u32) {
    let id = rec.trace_behavior(cmd_id);
    let Some(sc) = rec.registry.swapchains.get(&swapchain) else {
        rec.diagnose(cmd_id, DiagnosticKind::UnknownHandle, format!("acquire on unknown swapchain {swapchain:?}"));
        return;
    };
    let Some(&label) = sc.acquire_labels.get(image_index as usize) else {
        return;
    };
    rec.footprint.write(id, [Variable::Label(label)]);
}

pub fn queue_present(rec: &mut Recorder, cmd_id: u64, swapchain: RawHandle, image_index: u32) {
    let id = rec.trace_behavior(cmd_id);
    let Some(sc) = rec.registry.swapchains.get(&swapchain) else {
        rec.diagnose(cmd_id, DiagnosticKind::UnknownHandle, format!("present on unknown swapchain {swapchain:?}"));
        return;
    };
    let Some(&label) = sc.present_labels.get(image_index as usize) else {
        return;
    };
    rec.footprint.write(id, [Variable::Label(label)]);
}

pub fn begin_command_buffer(rec: &mut Recorder, cmd_id: u64, cb: RawHandle) {
    let label = rec.registry.fresh_label();
    let id = rec.trace_behavior(cmd_id);
    rec.footprint.write(id, [Variable::Label(label)]);
    if let Some(buf) = rec.registry.command_buffers.get_mut(&cb) {
        buf.begin_label = Some(label);
        buf.recording.clear();
    }
}

pub fn end_command_buffer(rec: &mut Recorder, cmd_id: u64, cb: RawHandle) {
    let id = rec.trace_behavior(cmd_id);
    if let Some(begin_label) = rec.registry.command_buffers.get(&cb).and_then(|b| b.begin_label) {
        rec.footprint.read(id, [Variable::Label(begin_label)]);
    }
}
