//! Per-queue Queue Execution State (`spec.md` §2, §4.3): the running
//! context a queue's roll-out advances through as executed subcommand
//! indices arrive.

use crate::behavior::SubcommandIndex;
use crate::command_buffer::CommandBufferState;

/// The running context for one `VkQueue`: which submit it is currently
/// rolling out, and the primary/secondary command-buffer execution state
/// that state advances through.
#[derive(Default)]
pub struct QueueState {
    pub current_submit: Option<u64>,
    pub primary: CommandBufferState,
    pub secondary: Option<CommandBufferState>,
    last_primary_cb: Option<u32>,
    last_secondary: Option<(u32, u32)>,
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the cursor for a newly rolled-out subcommand index. Rotates
    /// (resets) the primary state when the primary command-buffer slot
    /// changes, and creates/rotates secondary state for length-6 indices,
    /// per `spec.md` §4.3 step 3.
    pub fn advance(&mut self, index: &SubcommandIndex) {
        match *index {
            SubcommandIndex::Command(_) => {}
            SubcommandIndex::Primary {
                submit, command_buffer, ..
            } => {
                self.current_submit = Some(submit);
                if self.last_primary_cb != Some(command_buffer) {
                    self.primary = CommandBufferState::default();
                    self.last_primary_cb = Some(command_buffer);
                }
                self.secondary = None;
                self.last_secondary = None;
            }
            SubcommandIndex::Secondary {
                submit,
                command_buffer,
                secondary_cb,
                ..
            } => {
                self.current_submit = Some(submit);
                if self.last_primary_cb != Some(command_buffer) {
                    self.primary = CommandBufferState::default();
                    self.last_primary_cb = Some(command_buffer);
                }
                if self.last_secondary != Some((command_buffer, secondary_cb)) || self.secondary.is_none() {
                    self.secondary = Some(CommandBufferState::default());
                    self.last_secondary = Some((command_buffer, secondary_cb));
                }
            }
        }
    }

    /// The command-buffer state the currently rolling-out command should
    /// mutate: secondary state if one is active, else primary.
    pub fn active_state(&mut self) -> &mut CommandBufferState {
        if let Some(secondary) = self.secondary.as_mut() {
            secondary
        } else {
            &mut self.primary
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitioning_primary_to_secondary_creates_fresh_secondary_state() {
        let mut qs = QueueState::new();
        qs.advance(&SubcommandIndex::Primary {
            submit: 0,
            submit_info: 0,
            command_buffer: 0,
            command: 0,
        });
        qs.active_state().pipeline_label = Some(42);
        qs.advance(&SubcommandIndex::Secondary {
            submit: 0,
            submit_info: 0,
            command_buffer: 0,
            command: 0,
            secondary_cb: 0,
            secondary_command: 0,
        });
        assert!(qs.active_state().pipeline_label.is_none());
    }

    #[test]
    fn rotating_primary_command_buffer_resets_state() {
        let mut qs = QueueState::new();
        qs.advance(&SubcommandIndex::Primary {
            submit: 0,
            submit_info: 0,
            command_buffer: 0,
            command: 0,
        });
        qs.active_state().pipeline_label = Some(1);
        qs.advance(&SubcommandIndex::Primary {
            submit: 0,
            submit_info: 0,
            command_buffer: 1,
            command: 0,
        });
        assert!(qs.active_state().pipeline_label.is_none());
    }
}
