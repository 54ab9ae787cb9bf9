//! Descriptor mutation (`VkUpdateDescriptorSets`/`VkCopyDescriptorSets`),
//! descriptor-set binding, and the draw/dispatch family (`spec.md` §4.2c,
//! §4.5): always reading the pipeline/dynamic-state/subpass/vertex-index
//! state and expanding every bound descriptor set.

use std::rc::Rc;

use crate::command_buffer::{CommandBufferCommand, DeferredClosure, RollOutCtx};
use crate::recorder::{DiagnosticKind, Recorder};
use crate::registry::descriptor_set::DescriptorContents;
use crate::trace::{DescriptorCopy, DescriptorSetBind, DescriptorWrite};
use crate::variable::{RawHandle, Variable};

/// `VkUpdateDescriptorSets` (`spec.md` §4.5): a host-side, non-deferred
/// effect — no command buffer is involved, so this writes directly instead
/// of going through a recorded closure, the same treatment `VkBindBufferMemory`
/// gets in `memory.rs`.
pub fn update_descriptor_sets(rec: &mut Recorder, cmd_id: u64, writes: &[DescriptorWrite]) {
    let id = rec.trace_behavior(cmd_id);
    for w in writes {
        rec.footprint.read(id, [Variable::Handle(w.set)]);
        let Some(set) = rec.registry.descriptor_sets.get_mut(&w.set) else {
            continue;
        };
        let ids = set.write_descriptors(w.binding, w.array_index, &w.contents);
        rec.footprint.write(id, ids.into_iter().map(Variable::Descriptor));
    }
}

/// `VkCopyDescriptorSets` (`spec.md` §4.5): collect the source slots'
/// contents first (read-only), then write them into the destination set.
/// Kept as two sequential, non-overlapping registry borrows rather than one
/// method taking both sets at once, so a set can be copied onto itself.
pub fn copy_descriptor_sets(rec: &mut Recorder, cmd_id: u64, copies: &[DescriptorCopy]) {
    let id = rec.trace_behavior(cmd_id);
    for c in copies {
        rec.footprint.read(id, [Variable::Handle(c.src_set)]);
        let Some(src) = rec.registry.descriptor_sets.get(&c.src_set) else {
            continue;
        };
        let collected = src.collect_range(c.src_binding, c.src_array_index, c.count);
        for (src_id, _) in &collected {
            if let Some(src_id) = src_id {
                rec.footprint.read(id, [Variable::Descriptor(*src_id)]);
            }
        }
        rec.footprint.read(id, [Variable::Handle(c.dst_set)]);
        let Some(dst) = rec.registry.descriptor_sets.get_mut(&c.dst_set) else {
            continue;
        };
        let contents: Vec<DescriptorContents> = collected.into_iter().map(|(_, contents)| contents).collect();
        let written = dst.write_descriptors(c.dst_binding, c.dst_array_index, &contents);
        rec.footprint.write(id, written.into_iter().map(Variable::Descriptor));
    }
}

/// `vkCmdBindDescriptorSets` (`spec.md` §4.2c, §4.5): at execute time,
/// materialize a fresh bound-descriptor-set variable per slot, capturing
/// that set's share of the flat `dynamic_offsets` array (split across the
/// sets being bound by each set's own dynamic-descriptor count, in bind
/// order, matching real Vulkan's `pDynamicOffsets` consumption).
pub fn bind_descriptor_sets(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, first_set: u32, sets: Vec<DescriptorSetBind>, dynamic_offsets: Vec<u32>) {
    let Some(identity) = rec.begin_cb_command(cmd_id, cb) else { return };
    let closure: DeferredClosure = Rc::new(move |ctx: &mut RollOutCtx| {
        let end = first_set as usize + sets.len();
        if ctx.state.bound_sets.len() < end {
            ctx.state.bound_sets.resize(end, None);
        }
        let mut cursor = 0usize;
        for (i, bind) in sets.iter().enumerate() {
            ctx.footprint.read(ctx.behavior, [Variable::Handle(bind.set)]);
            let dynamic_count = ctx.registry.descriptor_sets.get(&bind.set).map(|s| s.dynamic_descriptor_count() as usize).unwrap_or(0);
            let take = dynamic_count.min(dynamic_offsets.len().saturating_sub(cursor));
            let offsets = dynamic_offsets[cursor..cursor + take].to_vec();
            cursor += take;
            let bound_id = ctx.registry.fresh_label();
            ctx.footprint.write(ctx.behavior, [Variable::BoundSet(bound_id)]);
            ctx.state.bound_sets[first_set as usize + i] = Some((bind.set, offsets, bound_id));
        }
    });
    rec.push_cb_command(cb, CommandBufferCommand::new(identity, closure));
}

/// The reads every draw/dispatch command always performs, regardless of
/// indirection (`spec.md` §4.2c): pipeline, dynamic state, active subpass
/// cursor, and every bound vertex/index buffer's backing data.
fn base_reads(ctx: &mut RollOutCtx) {
    if let Some(label) = ctx.state.pipeline_label {
        ctx.footprint.read(ctx.behavior, [Variable::Label(label)]);
    }
    if let Some(label) = ctx.state.dynamic_state_label {
        ctx.footprint.read(ctx.behavior, [Variable::Label(label)]);
    }
    if let Some(rp) = &ctx.state.render_pass {
        ctx.footprint.read(ctx.behavior, [Variable::Subpass(rp.cursor_id)]);
    }
    for &(buffer, binding) in ctx.state.vertex_bindings.iter().flatten() {
        if let Some(v) = ctx.registry.buffers.get(&buffer).and_then(|b| b.bindings.get(binding)).map(|b| b.backing.as_variable()) {
            ctx.footprint.read(ctx.behavior, [v]);
        }
    }
    if let Some((buffer, binding)) = ctx.state.index_binding {
        if let Some(v) = ctx.registry.buffers.get(&buffer).and_then(|b| b.bindings.get(binding)).map(|b| b.backing.as_variable()) {
            ctx.footprint.read(ctx.behavior, [v]);
        }
    }
}

/// Expand every bound descriptor set's every declared descriptor
/// (`spec.md` §4.5): per-type read/modify policy, dynamic-offset
/// consumption with a per-set running cursor, and accumulation of
/// storage-image/storage-buffer writes into the active subpass (§4.4).
fn expand_descriptor_sets(ctx: &mut RollOutCtx) {
    let bound = ctx.state.bound_sets.clone();
    let command = ctx.index.submit_id();
    for (set_handle, dynamic_offsets, bound_id) in bound.into_iter().flatten() {
        ctx.footprint.read(ctx.behavior, [Variable::BoundSet(bound_id)]);
        let entries = match ctx.registry.descriptor_sets.get_mut(&set_handle) {
            Some(set) => set.iter_all(),
            None => continue,
        };
        let mut offset_cursor = 0usize;
        'slots: for (binding, array_index, descriptor_id, contents) in entries {
            let descriptor = Variable::Descriptor(descriptor_id);
            match contents {
                DescriptorContents::Empty => {}
                DescriptorContents::Sampler(sampler) => {
                    ctx.footprint.read(ctx.behavior, [descriptor, Variable::Handle(sampler)]);
                }
                DescriptorContents::SampledImage(image) | DescriptorContents::InputAttachment(image) => {
                    ctx.footprint.read(ctx.behavior, [descriptor]);
                    for v in ctx.registry.image_data_vars(image, false) {
                        ctx.footprint.read(ctx.behavior, [v]);
                    }
                }
                DescriptorContents::CombinedImageSampler { sampler, image } => {
                    ctx.footprint.read(ctx.behavior, [descriptor, Variable::Handle(sampler)]);
                    for v in ctx.registry.image_data_vars(image, false) {
                        ctx.footprint.read(ctx.behavior, [v]);
                    }
                }
                DescriptorContents::StorageImage(image) => {
                    ctx.footprint.modify(ctx.behavior, [descriptor]);
                    for v in ctx.registry.image_data_vars(image, false) {
                        ctx.footprint.modify(ctx.behavior, [v]);
                        if let Some(rp) = ctx.state.render_pass.as_mut() {
                            crate::render_pass::accumulate_modified_descriptor(rp, v);
                        }
                    }
                }
                DescriptorContents::UniformBuffer { buffer, offset, range } => {
                    ctx.footprint.read(ctx.behavior, [descriptor]);
                    for v in ctx.registry.buffer_data_vars(buffer, offset, range) {
                        ctx.footprint.read(ctx.behavior, [v]);
                    }
                }
                DescriptorContents::UniformTexelBuffer(view) => {
                    ctx.footprint.read(ctx.behavior, [descriptor]);
                    if let Some(bv) = ctx.registry.buffer_views.get(&view).copied() {
                        for v in ctx.registry.buffer_data_vars(bv.buffer, bv.offset, bv.range) {
                            ctx.footprint.read(ctx.behavior, [v]);
                        }
                    }
                }
                DescriptorContents::StorageBuffer { buffer, offset, range } => {
                    ctx.footprint.modify(ctx.behavior, [descriptor]);
                    for v in ctx.registry.buffer_data_vars(buffer, offset, range) {
                        ctx.footprint.modify(ctx.behavior, [v]);
                        if let Some(rp) = ctx.state.render_pass.as_mut() {
                            crate::render_pass::accumulate_modified_descriptor(rp, v);
                        }
                    }
                }
                DescriptorContents::StorageTexelBuffer(view) => {
                    ctx.footprint.modify(ctx.behavior, [descriptor]);
                    if let Some(bv) = ctx.registry.buffer_views.get(&view).copied() {
                        for v in ctx.registry.buffer_data_vars(bv.buffer, bv.offset, bv.range) {
                            ctx.footprint.modify(ctx.behavior, [v]);
                            if let Some(rp) = ctx.state.render_pass.as_mut() {
                                crate::render_pass::accumulate_modified_descriptor(rp, v);
                            }
                        }
                    }
                }
                DescriptorContents::DynamicUniformBuffer { buffer, offset, range } => {
                    let Some(extra) = dynamic_offsets.get(offset_cursor) else {
                        ctx.diagnose(command, DiagnosticKind::DynamicOffsetExhausted, format!("dynamic offsets exhausted at binding {binding} index {array_index}"));
                        break 'slots;
                    };
                    offset_cursor += 1;
                    ctx.footprint.read(ctx.behavior, [descriptor]);
                    for v in ctx.registry.buffer_data_vars(buffer, offset + *extra as u64, range) {
                        ctx.footprint.read(ctx.behavior, [v]);
                    }
                }
                DescriptorContents::DynamicStorageBuffer { buffer, offset, range } => {
                    let Some(extra) = dynamic_offsets.get(offset_cursor) else {
                        ctx.diagnose(command, DiagnosticKind::DynamicOffsetExhausted, format!("dynamic offsets exhausted at binding {binding} index {array_index}"));
                        break 'slots;
                    };
                    offset_cursor += 1;
                    ctx.footprint.modify(ctx.behavior, [descriptor]);
                    for v in ctx.registry.buffer_data_vars(buffer, offset + *extra as u64, range) {
                        ctx.footprint.modify(ctx.behavior, [v]);
                        if let Some(rp) = ctx.state.render_pass.as_mut() {
                            crate::render_pass::accumulate_modified_descriptor(rp, v);
                        }
                    }
                }
            }
        }
    }
}

/// Shared tail for all six draw/dispatch commands: base reads, the
/// indirect-args buffer region (if any), then descriptor expansion.
fn emit(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, indirect: Option<(RawHandle, u64, u64)>) {
    let Some(identity) = rec.begin_cb_command(cmd_id, cb) else { return };
    let closure: DeferredClosure = Rc::new(move |ctx: &mut RollOutCtx| {
        base_reads(ctx);
        if let Some((buffer, offset, size)) = indirect {
            for v in ctx.registry.buffer_data_vars(buffer, offset, size) {
                ctx.footprint.read(ctx.behavior, [v]);
            }
        }
        expand_descriptor_sets(ctx);
    });
    rec.push_cb_command(cb, CommandBufferCommand::new(identity, closure));
}

pub fn draw(rec: &mut Recorder, cmd_id: u64, cb: RawHandle) {
    emit(rec, cmd_id, cb, None);
}

pub fn draw_indexed(rec: &mut Recorder, cmd_id: u64, cb: RawHandle) {
    emit(rec, cmd_id, cb, None);
}

pub fn draw_indirect(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, buffer: RawHandle, offset: u64, draw_count: u32, stride: u32) {
    emit(rec, cmd_id, cb, Some((buffer, offset, draw_count as u64 * stride as u64)));
}

pub fn draw_indexed_indirect(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, buffer: RawHandle, offset: u64, draw_count: u32, stride: u32) {
    emit(rec, cmd_id, cb, Some((buffer, offset, draw_count as u64 * stride as u64)));
}

pub fn dispatch(rec: &mut Recorder, cmd_id: u64, cb: RawHandle) {
    emit(rec, cmd_id, cb, None);
}

/// `VkDispatchIndirectCommand` is three `u32`s (x, y, z group counts).
pub fn dispatch_indirect(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, buffer: RawHandle, offset: u64) {
    emit(rec, cmd_id, cb, Some((buffer, offset, 12)));
}

#[cfg(test)]
mod tests {
    use ash::vk;
    use ash::vk::Handle;

    use super::*;
    use crate::behavior::SubcommandIndex;
    use crate::command_buffer::CommandBufferState;
    use crate::recorder::Recorder;
    use crate::registry::descriptor_set::DescriptorSet;

    fn buf(v: u64) -> RawHandle {
        RawHandle::of(vk::Buffer::from_raw(v))
    }

    fn set(v: u64) -> RawHandle {
        RawHandle::of(vk::DescriptorSet::from_raw(v))
    }

    #[test]
    fn update_descriptor_sets_writes_one_descriptor_variable() {
        let mut rec = Recorder::new(crate::config::Config::default());
        let s = set(1);
        let mut ds = DescriptorSet::new();
        ds.declare_binding(0, 1);
        rec.registry.descriptor_sets.insert(s, ds);
        let writes = vec![DescriptorWrite {
            set: s,
            binding: 0,
            array_index: 0,
            contents: vec![DescriptorContents::Sampler(RawHandle::of(vk::Sampler::from_raw(1)))],
        }];
        update_descriptor_sets(&mut rec, 1, &writes);
        let (_, behavior) = rec.footprint.iter().next().unwrap();
        assert_eq!(behavior.writes.len(), 1);
    }

    #[test]
    fn dynamic_offset_exhaustion_diagnoses_and_stops() {
        let mut rec = Recorder::new(crate::config::Config::default());
        let s = set(2);
        let mut ds = DescriptorSet::new();
        ds.declare_binding(0, 2);
        ds.write_descriptors(
            0,
            0,
            &[
                DescriptorContents::DynamicStorageBuffer { buffer: buf(1), offset: 0, range: 16 },
                DescriptorContents::DynamicStorageBuffer { buffer: buf(1), offset: 16, range: 16 },
            ],
        );
        rec.registry.buffers.insert(buf(1), Default::default());
        rec.registry.descriptor_sets.insert(s, ds);

        let mut footprint = crate::behavior::Footprint::new();
        let id = footprint.push(SubcommandIndex::Command(5));
        let mut state = CommandBufferState::default();
        state.bound_sets = vec![Some((s, vec![7], 1))];
        let mut diagnostics = Vec::new();
        let mut ctx = RollOutCtx {
            footprint: &mut footprint,
            registry: &mut rec.registry,
            state: &mut state,
            index: SubcommandIndex::Command(5),
            behavior: id,
            diagnostics: &mut diagnostics,
        };
        expand_descriptor_sets(&mut ctx);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::DynamicOffsetExhausted);
    }
}
