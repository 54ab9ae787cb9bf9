//! `vkCmdPipelineBarrier` (`spec.md` §4.2c): a global memory barrier touches
//! every live buffer and image; otherwise only the enumerated buffer/image
//! barriers touch their own data. One behavior is emitted per touched data
//! variable, each additionally reading any caller-attached extra reads
//! (e.g. waited events for `VkCmdWaitEvents`, folded into this same handler
//! since it shares the same touch policy).

use std::rc::Rc;

use crate::command_buffer::{CommandBufferCommand, DeferredClosure, RollOutCtx};
use crate::recorder::Recorder;
use crate::variable::{RawHandle, Variable};

pub fn pipeline_barrier(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, global: bool, buffers: Vec<RawHandle>, images: Vec<RawHandle>, extra_reads: Vec<RawHandle>) {
    let Some(identity) = rec.begin_cb_command(cmd_id, cb) else { return };
    let closure: DeferredClosure = Rc::new(move |ctx: &mut RollOutCtx| {
        let touched_buffers: Vec<RawHandle> = if global { ctx.registry.buffers.keys().copied().collect() } else { buffers.clone() };
        let touched_images: Vec<RawHandle> = if global { ctx.registry.images.keys().copied().collect() } else { images.clone() };
        let base_reads = ctx.footprint.get(ctx.behavior).reads.clone();

        for buffer in touched_buffers {
            let Some(buf) = ctx.registry.buffers.get(&buffer) else { continue };
            let size = buf.size;
            for v in ctx.registry.buffer_data_vars(buffer, 0, size) {
                let id = ctx.footprint.push(ctx.index);
                ctx.footprint.read(id, base_reads.iter().copied());
                ctx.footprint.modify(id, [v]);
                for &extra in &extra_reads {
                    ctx.footprint.read(id, [Variable::Handle(extra)]);
                }
            }
        }
        for image in touched_images {
            for v in ctx.registry.image_data_vars(image, true) {
                let id = ctx.footprint.push(ctx.index);
                ctx.footprint.read(id, base_reads.iter().copied());
                ctx.footprint.modify(id, [v]);
                for &extra in &extra_reads {
                    ctx.footprint.read(id, [Variable::Handle(extra)]);
                }
            }
        }
    });
    rec.push_cb_command(cb, CommandBufferCommand::new(identity, closure));
}
