//! The command-buffer command node and its deferred behavior closure
//! (`spec.md` §4.2c), plus the per-command-buffer execution state a queue
//! rolls commands out against.

use crate::behavior::{BehaviorId, Footprint, SubcommandIndex};
use crate::registry::Registry;
use crate::render_pass::RenderPassState;
use crate::variable::{BindingId, BoundSetId, Label, RawHandle};

/// Everything a command's deferred closure needs to do its work: append
/// reads/writes/modifies to the behavior the roll-out driver already created
/// (with the base reads of §4.3 step 4 applied), mutate the queue's running
/// execution state, and consult the registry.
pub struct RollOutCtx<'a> {
    pub footprint: &'a mut Footprint,
    pub registry: &'a mut Registry,
    pub state: &'a mut CommandBufferState,
    pub index: SubcommandIndex,
    pub behavior: BehaviorId,
    pub diagnostics: &'a mut Vec<crate::recorder::Diagnostic>,
}

impl<'a> RollOutCtx<'a> {
    /// Record a recovered, non-fatal problem hit while rolling out this
    /// subcommand (`spec.md` §7).
    pub fn diagnose(&mut self, command: u64, kind: crate::recorder::DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        log::warn!("command {command}: {message}");
        self.diagnostics.push(crate::recorder::Diagnostic { command, kind, message });
    }
}

/// A recorded command's deferred behavior closure. Captures by value
/// whatever it needs at submission time (pipeline handles, bound-data
/// slices, attachment descriptors, ...) — the recorder handler that creates
/// it owns that capture. Shared via `Rc` (not drained) so the same
/// recording can be rolled out by more than one submit without requiring
/// the command buffer to be re-recorded in between, and so secondary
/// command buffers survive being referenced by several `vkCmdExecuteCommands`
/// calls.
pub type DeferredClosure = std::rc::Rc<dyn Fn(&mut RollOutCtx)>;

/// One node in a command buffer's recording list.
#[derive(Clone)]
pub struct CommandBufferCommand {
    /// Freshly minted at record time; the roll-out behavior reads it,
    /// chaining back to the record-time behavior that read the
    /// command-buffer handle and its begin-label (`spec.md` §4.2c, §4.3).
    pub identity: Label,
    pub is_execute_commands: bool,
    pub secondary_command_buffers: Vec<RawHandle>,
    pub closure: DeferredClosure,
}

impl CommandBufferCommand {
    pub fn new(identity: Label, closure: DeferredClosure) -> Self {
        Self {
            identity,
            is_execute_commands: false,
            secondary_command_buffers: Vec::new(),
            closure,
        }
    }

    pub fn execute_commands(identity: Label, secondaries: Vec<RawHandle>) -> Self {
        Self {
            identity,
            is_execute_commands: true,
            secondary_command_buffers: secondaries,
            closure: std::rc::Rc::new(|_| {}),
        }
    }
}

/// One entry in a [`crate::registry::object::SubmitInfo`]'s pending queue:
/// the subcommand index the framework will report back via `PostSubcommand`,
/// paired with the closure that rolls it out.
#[derive(Clone)]
pub struct PendingCommand {
    pub index: SubcommandIndex,
    pub identity: Label,
    /// For a secondary command reached through `vkCmdExecuteCommands`, the
    /// identity of the execute-commands node that referenced it.
    pub parent_identity: Option<Label>,
    pub closure: DeferredClosure,
}

/// A recorded command buffer: its begin/end forward-paired label and the
/// ordered list of deferred commands appended between them.
#[derive(Default)]
pub struct CommandBuffer {
    pub begin_label: Option<Label>,
    pub recording: Vec<CommandBufferCommand>,
}

/// The running execution-time state of one command-buffer level (primary or
/// secondary) inside a [`crate::queue_state::QueueState`]: bound pipeline,
/// dynamic state, vertex/index bindings, descriptor bindings, and the
/// current render pass, if any.
#[derive(Default)]
pub struct CommandBufferState {
    pub pipeline_label: Option<Label>,
    pub dynamic_state_label: Option<Label>,
    pub vertex_bindings: Vec<Option<(RawHandle, BindingId)>>,
    pub index_binding: Option<(RawHandle, BindingId)>,
    /// Bound descriptor sets by set index, each a captured
    /// (descriptor-set handle, dynamic-offset vector, bound-set variable id).
    pub bound_sets: Vec<Option<(RawHandle, Vec<u32>, BoundSetId)>>,
    pub render_pass: Option<RenderPassState>,
}
