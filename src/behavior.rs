//! [`Behavior`] and [`Footprint`] — `spec.md` §4.1.
//!
//! A behavior is a record of reads/writes/modifies over def/use variables,
//! tagged with the originating command index and an "alive" override. The
//! footprint is the append-only sequence of behaviors that the liveness
//! machine later walks in reverse.

use std::collections::HashMap;

use crate::variable::{Label, Variable};

/// The originating subcommand index of a behavior. Length is 1 for a
/// behavior produced directly at record time (object lifetime, memory
/// mapping — anything that doesn't wait for a queue submit to execute), 4
/// for a primary command buffer command rolled out from a submit, and 6 for
/// a secondary command buffer command reached through `vkCmdExecuteCommands`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubcommandIndex {
    /// A behavior recorded directly against a trace command id, not through
    /// a queue submission roll-out.
    Command(u64),
    /// A primary command buffer command, rolled out from submit `submit`.
    Primary {
        submit: u64,
        submit_info: u32,
        command_buffer: u32,
        command: u32,
    },
    /// A secondary command buffer command, reached through the primary
    /// command at the same `submit`/`submit_info`/`command_buffer`/`command`.
    Secondary {
        submit: u64,
        submit_info: u32,
        command_buffer: u32,
        command: u32,
        secondary_cb: u32,
        secondary_command: u32,
    },
}

impl SubcommandIndex {
    /// 1, 4, or 6 — the number of integers that make up this index, per
    /// `spec.md` §8's invariant on every emitted behavior.
    pub fn len(&self) -> usize {
        match self {
            SubcommandIndex::Command(_) => 1,
            SubcommandIndex::Primary { .. } => 4,
            SubcommandIndex::Secondary { .. } => 6,
        }
    }

    /// The leading component: the submit-id this behavior belongs to (or the
    /// trace command id itself, for a length-1 index).
    pub fn submit_id(&self) -> u64 {
        match self {
            SubcommandIndex::Command(c) => *c,
            SubcommandIndex::Primary {
                submit, ..
            }
            | SubcommandIndex::Secondary {
                submit, ..
            } => *submit,
        }
    }
}

/// A record of reads/writes/modifies over def/use variables, tagged with the
/// originating command index and an `alive` override.
///
/// `modify` is kept as its own list rather than folded into `reads`/`writes`
/// — it denotes a single read-then-write of the *same* variable, and the
/// liveness machine treats it as one atomic read-modify-write unit (a write
/// that does not sever the chain to whatever wrote the value before it; see
/// `spec.md` §4.6 and DESIGN.md).
#[derive(Debug, Clone, Default)]
pub struct Behavior {
    pub index: Option<SubcommandIndex>,
    pub reads: Vec<Variable>,
    pub writes: Vec<Variable>,
    pub modifies: Vec<Variable>,
    /// When set, the liveness machine always keeps this behavior regardless
    /// of whether its writes are needed downstream (destruction handlers,
    /// debug markers, coherent-memory observations).
    pub alive: bool,
}

impl Behavior {
    /// All variables this behavior requires to have been produced earlier:
    /// its plain reads, plus the read half of every modify.
    pub fn effective_reads(&self) -> impl Iterator<Item = &Variable> {
        self.reads.iter().chain(self.modifies.iter())
    }

    /// All variables this behavior produces: its plain writes, plus the
    /// write half of every modify.
    pub fn effective_writes(&self) -> impl Iterator<Item = &Variable> {
        self.writes.iter().chain(self.modifies.iter())
    }
}

/// Opaque identity of a behavior inside a [`Footprint`]'s arena. Stable for
/// the lifetime of the footprint (append-only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BehaviorId(usize);

impl BehaviorId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The append-only ordered sequence of behaviors produced from a trace, plus
/// the bookkeeping the forward-paired-label variant needs while recording.
#[derive(Debug, Default)]
pub struct Footprint {
    behaviors: Vec<Behavior>,
    /// Pending readers of each forward-paired label, accumulated at record
    /// time (append-only between a label's definition events, per
    /// `spec.md` §3's invariant).
    forward_paired_readers: HashMap<Label, Vec<BehaviorId>>,
}

impl Footprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new, empty behavior and return its id.
    pub fn push(&mut self, index: SubcommandIndex) -> BehaviorId {
        let id = BehaviorId(self.behaviors.len());
        self.behaviors.push(Behavior {
            index: Some(index),
            ..Default::default()
        });
        id
    }

    pub fn get(&self, id: BehaviorId) -> &Behavior {
        &self.behaviors[id.0]
    }

    pub fn get_mut(&mut self, id: BehaviorId) -> &mut Behavior {
        &mut self.behaviors[id.0]
    }

    pub fn set_alive(&mut self, id: BehaviorId) {
        self.behaviors[id.0].alive = true;
    }

    /// Record reads on a behavior. Per `spec.md` §4.1: the null handle is a
    /// no-op, and reading a [`Variable::ForwardPaired`] label appends this
    /// behavior to the label's pending-readers list.
    pub fn read(&mut self, id: BehaviorId, vars: impl IntoIterator<Item = Variable>) {
        for v in vars {
            if v.is_null() {
                continue;
            }
            if let Variable::ForwardPaired(label) = v {
                self.forward_paired_readers.entry(label).or_default().push(id);
            }
            #[cfg(feature = "log-objects")]
            log::trace!("behavior {:?} reads {:?}", id, v);
            self.behaviors[id.0].reads.push(v);
        }
    }

    pub fn write(&mut self, id: BehaviorId, vars: impl IntoIterator<Item = Variable>) {
        for v in vars {
            if v.is_null() {
                continue;
            }
            #[cfg(feature = "log-objects")]
            log::trace!("behavior {:?} writes {:?}", id, v);
            self.behaviors[id.0].writes.push(v);
        }
    }

    pub fn modify(&mut self, id: BehaviorId, vars: impl IntoIterator<Item = Variable>) {
        for v in vars {
            if v.is_null() {
                continue;
            }
            #[cfg(feature = "log-objects")]
            log::trace!("behavior {:?} modifies {:?}", id, v);
            self.behaviors[id.0].modifies.push(v);
        }
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }

    /// All behavior ids currently registered as readers of `label`.
    pub fn forward_paired_readers(&self, label: Label) -> &[BehaviorId] {
        self.forward_paired_readers.get(&label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate over `(id, behavior)` pairs in recorded (forward) order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (BehaviorId, &Behavior)> {
        self.behaviors.iter().enumerate().map(|(i, b)| (BehaviorId(i), b))
    }
}

#[cfg(test)]
mod tests {
    use ash::vk;

    use super::*;
    use crate::variable::RawHandle;

    #[test]
    fn null_handle_reads_and_writes_are_dropped() {
        let mut fp = Footprint::new();
        let id = fp.push(SubcommandIndex::Command(0));
        let null = Variable::Handle(RawHandle::of(vk::Buffer::null()));
        fp.read(id, [null]);
        fp.write(id, [null]);
        assert!(fp.get(id).reads.is_empty());
        assert!(fp.get(id).writes.is_empty());
    }

    #[test]
    fn forward_paired_label_accumulates_readers() {
        let mut fp = Footprint::new();
        let a = fp.push(SubcommandIndex::Command(0));
        let b = fp.push(SubcommandIndex::Command(1));
        fp.read(a, [Variable::ForwardPaired(7)]);
        fp.read(b, [Variable::ForwardPaired(7)]);
        assert_eq!(fp.forward_paired_readers(7), &[a, b]);
    }

    #[test]
    fn subcommand_index_length_matches_variant() {
        assert_eq!(SubcommandIndex::Command(0).len(), 1);
        assert_eq!(
            SubcommandIndex::Primary {
                submit: 0,
                submit_info: 0,
                command_buffer: 0,
                command: 0,
            }
            .len(),
            4
        );
        assert_eq!(
            SubcommandIndex::Secondary {
                submit: 0,
                submit_info: 0,
                command_buffer: 0,
                command: 0,
                secondary_cb: 0,
                secondary_command: 0,
            }
            .len(),
            6
        );
    }
}
