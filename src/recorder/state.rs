//! Dynamic state, pipeline/vertex/index binds, debug markers, render-pass
//! command dispatch, and execute-commands recording (`spec.md` §4.2c).

use std::rc::Rc;

use crate::command_buffer::{CommandBufferCommand, DeferredClosure, RollOutCtx};
use crate::recorder::Recorder;
use crate::trace::VertexBufferBinding;
use crate::variable::{BindingId, RawHandle, Variable};

/// Create a sub-binding over `[offset, offset+size)` of whatever top-level
/// binding on `buffer` already covers it (installed by an earlier
/// `VkBindBufferMemory`), preserving backing identity. Run at roll-out time,
/// against the registry state current at execution, like every other
/// deferred command handler.
fn bound_range(ctx: &mut RollOutCtx, buffer: RawHandle, offset: u64, size: u64) -> Option<BindingId> {
    let buf = ctx.registry.buffers.get_mut(&buffer)?;
    let parent = buf.bindings.query(offset, size).next()?.id;
    buf.bindings.sub_binding(parent, offset, size).ok()
}

pub fn set_dynamic_state(rec: &mut Recorder, cmd_id: u64, cb: RawHandle) {
    let Some(identity) = rec.begin_cb_command(cmd_id, cb) else { return };
    let closure: DeferredClosure = Rc::new(move |ctx: &mut RollOutCtx| match ctx.state.dynamic_state_label {
        Some(label) => ctx.footprint.modify(ctx.behavior, [Variable::Label(label)]),
        None => {
            let label = ctx.registry.fresh_label();
            ctx.state.dynamic_state_label = Some(label);
            ctx.footprint.write(ctx.behavior, [Variable::Label(label)]);
        }
    });
    rec.push_cb_command(cb, CommandBufferCommand::new(identity, closure));
}

pub fn bind_pipeline(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, pipeline: RawHandle) {
    let Some(identity) = rec.begin_cb_command(cmd_id, cb) else { return };
    let closure: DeferredClosure = Rc::new(move |ctx: &mut RollOutCtx| {
        ctx.footprint.read(ctx.behavior, [Variable::Handle(pipeline)]);
        let label = ctx.registry.fresh_label();
        ctx.state.pipeline_label = Some(label);
        ctx.footprint.write(ctx.behavior, [Variable::Label(label)]);
    });
    rec.push_cb_command(cb, CommandBufferCommand::new(identity, closure));
}

/// Index/vertex buffer bind: sub-binding lists captured at record time,
/// installed into the command-buffer state's slots at execute time.
pub fn bind_vertex_buffers(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, first_binding: u32, buffers: Vec<VertexBufferBinding>) {
    let Some(identity) = rec.begin_cb_command(cmd_id, cb) else { return };
    let closure: DeferredClosure = Rc::new(move |ctx: &mut RollOutCtx| {
        let ids: Vec<Option<(RawHandle, BindingId)>> = buffers.iter().map(|vb| bound_range(ctx, vb.buffer, vb.offset, vb.size).map(|id| (vb.buffer, id))).collect();
        let end = first_binding as usize + ids.len();
        if ctx.state.vertex_bindings.len() < end {
            ctx.state.vertex_bindings.resize(end, None);
        }
        for (i, id) in ids.into_iter().enumerate() {
            ctx.state.vertex_bindings[first_binding as usize + i] = id;
        }
    });
    rec.push_cb_command(cb, CommandBufferCommand::new(identity, closure));
}

pub fn bind_index_buffer(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, buffer: RawHandle, offset: u64, size: u64) {
    let Some(identity) = rec.begin_cb_command(cmd_id, cb) else { return };
    let closure: DeferredClosure = Rc::new(move |ctx: &mut RollOutCtx| {
        ctx.state.index_binding = bound_range(ctx, buffer, offset, size).map(|id| (buffer, id));
    });
    rec.push_cb_command(cb, CommandBufferCommand::new(identity, closure));
}

/// Debug marker commands always survive as long as their command buffer is
/// retained: a no-op closure whose behavior is force-kept alive.
pub fn debug_marker(rec: &mut Recorder, cmd_id: u64, cb: RawHandle) {
    let Some(identity) = rec.begin_cb_command(cmd_id, cb) else { return };
    let closure: DeferredClosure = Rc::new(move |ctx: &mut RollOutCtx| {
        ctx.footprint.get_mut(ctx.behavior).alive = true;
    });
    rec.push_cb_command(cb, CommandBufferCommand::new(identity, closure));
}

pub fn begin_render_pass(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, rp: RawHandle, fb: RawHandle) {
    let Some(identity) = rec.begin_cb_command(cmd_id, cb) else { return };
    let paired_label = rec.registry.fresh_label();
    let cursor_id = rec.registry.fresh_label();
    let closure: DeferredClosure = Rc::new(move |ctx: &mut RollOutCtx| {
        ctx.state.render_pass = crate::render_pass::begin(ctx, rp, fb, paired_label, cursor_id);
    });
    rec.push_cb_command(cb, CommandBufferCommand::new(identity, closure));
}

pub fn next_subpass(rec: &mut Recorder, cmd_id: u64, cb: RawHandle) {
    let Some(identity) = rec.begin_cb_command(cmd_id, cb) else { return };
    let closure: DeferredClosure = Rc::new(move |ctx: &mut RollOutCtx| {
        if let Some(mut state) = ctx.state.render_pass.take() {
            crate::render_pass::next_subpass(ctx, &mut state);
            ctx.state.render_pass = Some(state);
        }
    });
    rec.push_cb_command(cb, CommandBufferCommand::new(identity, closure));
}

pub fn end_render_pass(rec: &mut Recorder, cmd_id: u64, cb: RawHandle) {
    let Some(identity) = rec.begin_cb_command(cmd_id, cb) else { return };
    let closure: DeferredClosure = Rc::new(move |ctx: &mut RollOutCtx| {
        if let Some(mut state) = ctx.state.render_pass.take() {
            crate::render_pass::end(ctx, &mut state);
        }
    });
    rec.push_cb_command(cb, CommandBufferCommand::new(identity, closure));
}

/// `vkCmdExecuteCommands`: a node pointing at the captured secondary
/// command-buffer handles, with a no-op closure — the roll-out driver itself
/// enumerates into the secondary level (`spec.md` §4.2c, §4.3).
pub fn execute_commands(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, secondaries: Vec<RawHandle>) {
    let Some(identity) = rec.begin_cb_command(cmd_id, cb) else { return };
    rec.push_cb_command(cb, CommandBufferCommand::execute_commands(identity, secondaries));
}
