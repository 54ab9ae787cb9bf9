//! Vulkan command-stream footprint builder and dead-code eliminator.
//!
//! Consumes a linear trace of Vulkan API calls (`BuildFootprint`) and
//! produces an append-only [`behavior::Footprint`] of def/use behaviors
//! (`spec.md` §4.1). A separate [`liveness::LivenessMachine`] pass walks the
//! footprint backwards to decide which recorded behaviors are dead — ones
//! whose writes are never subsequently read and whose `alive` flag is unset
//! — so a caller can strip dead command-buffer commands from a captured
//! trace before replaying it.
//!
//! - [`recorder`] dispatches each trace command (`trace::TraceCommand`) to a
//!   handler that mutates the [`registry::Registry`] and appends behaviors.
//! - [`submit`] implements deferred submission: `VkQueueSubmit` only
//!   registers bookkeeping; behaviors for command-buffer commands are
//!   produced lazily as the framework reports executed subcommand indices.
//! - [`render_pass`] carries the render-pass/subpass load/store policy.
//! - [`liveness`] is the backward dead-code analysis over a finished
//!   footprint.

pub mod behavior;
pub mod command_buffer;
pub mod config;
pub mod error;
pub mod liveness;
pub mod queue_state;
pub mod recorder;
pub mod registry;
pub mod render_pass;
pub mod submit;
pub mod trace;
pub mod variable;
