//! Submission registration and Roll-Out Executed (`spec.md` §4.2d, §4.3).
//!
//! `VkQueueSubmit` itself only registers bookkeeping — it does not emit the
//! command-buffer commands' behaviors. Those are produced lazily, one at a
//! time, as the framework reports executed subcommand indices back through
//! `PostSubcommand`.

use std::collections::VecDeque;

use crate::behavior::SubcommandIndex;
use crate::command_buffer::{PendingCommand, RollOutCtx};
use crate::error::{Error, Result};
use crate::recorder::{memory::promote_coherent, Recorder};
use crate::registry::object::SubmitInfo;
use crate::trace::SubmitDescriptor;
use crate::variable::Variable;

/// `VkQueueSubmit` (`spec.md` §4.2d): collect every primary command-buffer
/// command across all submit-infos, expanding execute-commands nodes into
/// their secondaries, into one pending queue; then run the coherent-memory
/// write-back over the submit's observations.
pub fn register(rec: &mut Recorder, cmd_id: u64, submit: &SubmitDescriptor) {
    let begin_label = rec.registry.fresh_label();
    let done_label = rec.registry.fresh_label();

    let mut pending = VecDeque::new();
    for (submit_info_idx, cb_list) in submit.command_buffers.iter().enumerate() {
        for (cb_idx, &cb) in cb_list.iter().enumerate() {
            let Some(buf) = rec.registry.command_buffers.get(&cb) else {
                continue;
            };
            let recording = buf.recording.clone();
            for (cmd_idx, node) in recording.iter().enumerate() {
                let index = SubcommandIndex::Primary {
                    submit: cmd_id,
                    submit_info: submit_info_idx as u32,
                    command_buffer: cb_idx as u32,
                    command: cmd_idx as u32,
                };
                pending.push_back(PendingCommand {
                    index,
                    identity: node.identity,
                    parent_identity: None,
                    closure: node.closure.clone(),
                });
                if node.is_execute_commands {
                    for (sec_cb_idx, &sec_cb) in node.secondary_command_buffers.iter().enumerate() {
                        let Some(sec_buf) = rec.registry.command_buffers.get(&sec_cb) else {
                            continue;
                        };
                        for (sec_cmd_idx, sec_node) in sec_buf.recording.iter().enumerate() {
                            let sec_index = SubcommandIndex::Secondary {
                                submit: cmd_id,
                                submit_info: submit_info_idx as u32,
                                command_buffer: cb_idx as u32,
                                command: cmd_idx as u32,
                                secondary_cb: sec_cb_idx as u32,
                                secondary_command: sec_cmd_idx as u32,
                            };
                            pending.push_back(PendingCommand {
                                index: sec_index,
                                identity: sec_node.identity,
                                parent_identity: Some(node.identity),
                                closure: sec_node.closure.clone(),
                            });
                        }
                    }
                }
            }
        }
    }

    rec.registry.submits.insert(
        cmd_id,
        SubmitInfo {
            queue: submit.queue,
            begin_label,
            done_label,
            wait_semaphores: submit.wait_semaphores.clone(),
            signal_semaphores: submit.signal_semaphores.clone(),
            signal_fence: submit.signal_fence,
            pending,
            began: false,
        },
    );

    let id = rec.trace_behavior(cmd_id);
    for obs in &submit.observations {
        let coherent = rec.registry.device_memories.get(&obs.memory).and_then(|m| m.mapped).map(|m| m.coherent).unwrap_or(false);
        if coherent {
            promote_coherent(rec, id, obs.memory, obs.offset, obs.size);
        }
    }
}

/// `PostSubcommand` (`spec.md` §4.3): roll out one executed subcommand index.
/// `trailing` is the framework-reported index with the submit id stripped —
/// length 3 for a primary command, length 5 for one reached through a
/// secondary command buffer.
pub fn post_subcommand(rec: &mut Recorder, submit_id: u64, trailing: &[u32]) -> Result<()> {
    let actual = match trailing.len() {
        3 => SubcommandIndex::Primary {
            submit: submit_id,
            submit_info: trailing[0],
            command_buffer: trailing[1],
            command: trailing[2],
        },
        5 => SubcommandIndex::Secondary {
            submit: submit_id,
            submit_info: trailing[0],
            command_buffer: trailing[1],
            command: trailing[2],
            secondary_cb: trailing[3],
            secondary_command: trailing[4],
        },
        n => return Err(Error::InvalidSubcommandIndexLength(n + 1)),
    };

    // Step 1: first-time "start" behavior — wait-semaphore signal labels.
    {
        let submit = rec.registry.submits.get_mut(&submit_id).ok_or(Error::UnknownSubmit(submit_id))?;
        if !submit.began {
            submit.began = true;
            let wait_semaphores = submit.wait_semaphores.clone();
            let start_id = rec.footprint.push(SubcommandIndex::Command(submit_id));
            for sem in wait_semaphores {
                if let Some(&label) = rec.registry.semaphores.get(&sem) {
                    rec.footprint.modify(start_id, [Variable::Label(label)]);
                }
            }
        }
    }

    // Step 2: pop the front pending command, checking ordering.
    let submit = rec.registry.submits.get_mut(&submit_id).ok_or(Error::UnknownSubmit(submit_id))?;
    let pending = submit.pending.pop_front().ok_or(Error::RollOutOrderingMismatch { expected: actual, actual })?;
    if pending.index != actual {
        return Err(Error::RollOutOrderingMismatch { expected: pending.index, actual });
    }

    let queue = submit.queue;
    let begin_label = submit.begin_label;
    let done_label = submit.done_label;
    let queue_emptied = submit.pending.is_empty();
    let signal_semaphores = submit.signal_semaphores.clone();
    let signal_fence = submit.signal_fence;

    // Step 3: locate/advance the per-queue execution state.
    let mut qs = rec.registry.queue_states.remove(&queue).unwrap_or_default();
    qs.advance(&actual);

    // Step 4: invoke the command's deferred closure.
    let id = rec.footprint.push(actual);
    if rec.config.debug_trace {
        log::trace!("rolling out subcommand {actual:?} for submit {submit_id}");
    }
    rec.footprint.read(id, [Variable::Label(pending.identity), Variable::Label(begin_label)]);
    if let Some(parent) = pending.parent_identity {
        rec.footprint.read(id, [Variable::Label(parent)]);
    }
    {
        let state = qs.active_state();
        let mut ctx = RollOutCtx {
            footprint: &mut rec.footprint,
            registry: &mut rec.registry,
            state,
            index: actual,
            behavior: id,
            diagnostics: &mut rec.diagnostics,
        };
        (pending.closure)(&mut ctx);
    }
    rec.registry.queue_states.insert(queue, qs);

    // Step 5: "done" behavior once the pending queue empties.
    if queue_emptied {
        let done_id = rec.footprint.push(SubcommandIndex::Command(submit_id));
        rec.footprint.read(done_id, [Variable::Label(begin_label)]);
        rec.footprint.write(done_id, [Variable::Label(done_label)]);
        for sem in signal_semaphores {
            if let Some(&label) = rec.registry.semaphores.get(&sem) {
                rec.footprint.write(done_id, [Variable::Label(label)]);
            }
        }
        if let Some(fence) = signal_fence {
            if let Some(&label) = rec.registry.fences.get(&fence) {
                rec.footprint.write(done_id, [Variable::Label(label)]);
            }
        }
    }

    Ok(())
}
