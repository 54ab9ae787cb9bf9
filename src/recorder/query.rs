//! Query pool commands (`spec.md` §4.2c): reset writes the reset label;
//! begin reads reset, writes begin; end reads begin, writes end+result;
//! copy-query-results reads the result labels; write-timestamp reads reset,
//! writes result.

use std::rc::Rc;

use crate::command_buffer::{CommandBufferCommand, DeferredClosure, RollOutCtx};
use crate::recorder::Recorder;
use crate::variable::{RawHandle, Variable};

fn record(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, closure: impl Fn(&mut RollOutCtx) + 'static) {
    let Some(identity) = rec.begin_cb_command(cmd_id, cb) else { return };
    let closure: DeferredClosure = Rc::new(closure);
    rec.push_cb_command(cb, CommandBufferCommand::new(identity, closure));
}

pub fn reset_query_pool(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, pool: RawHandle, query: u32) {
    record(rec, cmd_id, cb, move |ctx| {
        let Some(p) = ctx.registry.query_pools.get(&pool) else { return };
        if let Some(&label) = p.reset_labels.get(query as usize) {
            ctx.footprint.write(ctx.behavior, [Variable::Label(label)]);
        }
    });
}

pub fn begin_query(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, pool: RawHandle, query: u32) {
    record(rec, cmd_id, cb, move |ctx| {
        let Some(p) = ctx.registry.query_pools.get(&pool) else { return };
        if let Some(&reset) = p.reset_labels.get(query as usize) {
            ctx.footprint.read(ctx.behavior, [Variable::Label(reset)]);
        }
        if let Some(&begin) = p.begin_labels.get(query as usize) {
            ctx.footprint.write(ctx.behavior, [Variable::Label(begin)]);
        }
    });
}

pub fn end_query(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, pool: RawHandle, query: u32) {
    record(rec, cmd_id, cb, move |ctx| {
        let Some(p) = ctx.registry.query_pools.get(&pool) else { return };
        if let Some(&begin) = p.begin_labels.get(query as usize) {
            ctx.footprint.read(ctx.behavior, [Variable::Label(begin)]);
        }
        if let Some(&end) = p.end_labels.get(query as usize) {
            ctx.footprint.write(ctx.behavior, [Variable::Label(end)]);
        }
        if let Some(&result) = p.result_labels.get(query as usize) {
            ctx.footprint.write(ctx.behavior, [Variable::Label(result)]);
        }
    });
}

pub fn copy_query_pool_results(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, pool: RawHandle, queries: Vec<u32>) {
    record(rec, cmd_id, cb, move |ctx| {
        let Some(p) = ctx.registry.query_pools.get(&pool) else { return };
        for &query in &queries {
            if let Some(&result) = p.result_labels.get(query as usize) {
                ctx.footprint.read(ctx.behavior, [Variable::Label(result)]);
            }
        }
    });
}

pub fn write_timestamp(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, pool: RawHandle, query: u32) {
    record(rec, cmd_id, cb, move |ctx| {
        let Some(p) = ctx.registry.query_pools.get(&pool) else { return };
        if let Some(&reset) = p.reset_labels.get(query as usize) {
            ctx.footprint.read(ctx.behavior, [Variable::Label(reset)]);
        }
        if let Some(&result) = p.result_labels.get(query as usize) {
            ctx.footprint.write(ctx.behavior, [Variable::Label(result)]);
        }
    });
}
