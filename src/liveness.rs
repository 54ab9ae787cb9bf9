//! The Liveness Machine (`spec.md` §4.6): back-propagation over a built
//! [`Footprint`], in reverse, deciding which behaviors must be kept.

use std::collections::{HashMap, HashSet};

use crate::behavior::{BehaviorId, Footprint};
use crate::variable::{BindingId, BoundSetId, DescriptorId, Label, RawHandle, SubpassCursorId, Variable};

/// A per-device-memory list of currently-live byte intervals, merged on
/// `use` and subtracted on `def` (`spec.md` §3, §4.6).
#[derive(Debug, Default, Clone)]
struct IntervalList {
    intervals: Vec<(u64, u64)>,
}

impl IntervalList {
    fn intersects(&self, offset: u64, end: u64) -> bool {
        self.intervals.iter().any(|&(s, e)| s < end && offset < e)
    }

    fn union(&mut self, offset: u64, end: u64) {
        let mut merged = (offset, end);
        self.intervals.retain(|&(s, e)| {
            if s < merged.1 && merged.0 < e {
                merged.0 = merged.0.min(s);
                merged.1 = merged.1.max(e);
                false
            } else {
                true
            }
        });
        self.intervals.push(merged);
        self.intervals.sort_by_key(|&(s, _)| s);
    }

    fn subtract(&mut self, offset: u64, end: u64) {
        let mut result = Vec::with_capacity(self.intervals.len());
        for &(s, e) in &self.intervals {
            if e <= offset || end <= s {
                result.push((s, e));
                continue;
            }
            if s < offset {
                result.push((s, offset));
            }
            if end < e {
                result.push((end, e));
            }
        }
        self.intervals = result;
    }
}

/// Per-variant live sets, plus the auxiliary command-id → last-bound
/// framebuffer-data map the `FramebufferRequest` hook seeds from.
#[derive(Default)]
pub struct LivenessMachine {
    handles: HashSet<RawHandle>,
    labels: HashSet<Label>,
    memory: HashMap<RawHandle, IntervalList>,
    bindings: HashSet<BindingId>,
    descriptors: HashSet<DescriptorId>,
    bound_sets: HashSet<BoundSetId>,
    subpasses: HashSet<SubpassCursorId>,
    last_framebuffer_data: HashMap<u64, Vec<Variable>>,
}

impl LivenessMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets all live sets and bookkeeping without touching the footprint
    /// itself, so one machine can be reused across repeated
    /// `FramebufferRequest` queries against the same footprint. Leaves
    /// `last_framebuffer_data` untouched: it accumulates across calls to
    /// [`Self::record_last_framebuffer_data`] and must survive the reset at
    /// the start of every `framebuffer_request`.
    pub fn clear(&mut self) {
        self.handles.clear();
        self.labels.clear();
        self.memory.clear();
        self.bindings.clear();
        self.descriptors.clear();
        self.bound_sets.clear();
        self.subpasses.clear();
    }

    /// Record that, as of trace command `cmd_id`, these are the data
    /// variables backing the currently-bound framebuffer's attachments —
    /// the seed a later `framebuffer_request` for this command id starts
    /// from.
    pub fn record_last_framebuffer_data(&mut self, cmd_id: u64, vars: Vec<Variable>) {
        self.last_framebuffer_data.insert(cmd_id, vars);
    }

    fn is_var_live(&self, v: &Variable) -> bool {
        match v {
            Variable::Handle(h) => self.handles.contains(h),
            Variable::Label(l) => self.labels.contains(l),
            Variable::Memory(span) => self.memory.get(&span.memory).map(|list| list.intersects(span.offset, span.end())).unwrap_or(false),
            Variable::Binding(b) => self.bindings.contains(b),
            Variable::Descriptor(d) => self.descriptors.contains(d),
            Variable::BoundSet(s) => self.bound_sets.contains(s),
            Variable::Subpass(s) => self.subpasses.contains(s),
            // Forward-paired labels never participate in ordinary liveness
            // intersection: their def side effect is handled specially in
            // `def_var`, and their use side effect was already consumed at
            // record time into the footprint's pending-readers map.
            Variable::ForwardPaired(_) => false,
        }
    }

    /// `IsAlive(behavior)`: true iff any of its writes (or modifies)
    /// intersects the current live set.
    pub fn is_alive(&self, footprint: &Footprint, id: BehaviorId) -> bool {
        footprint.get(id).effective_writes().any(|v| self.is_var_live(v))
    }

    fn use_var(&mut self, v: &Variable) {
        match *v {
            Variable::Handle(h) => {
                self.handles.insert(h);
            }
            Variable::Label(l) => {
                self.labels.insert(l);
            }
            Variable::Memory(span) => {
                self.memory.entry(span.memory).or_default().union(span.offset, span.end());
                self.handles.insert(span.memory);
            }
            Variable::Binding(b) => {
                self.bindings.insert(b);
            }
            Variable::Descriptor(d) => {
                self.descriptors.insert(d);
            }
            Variable::BoundSet(s) => {
                self.bound_sets.insert(s);
            }
            Variable::Subpass(s) => {
                self.subpasses.insert(s);
            }
            Variable::ForwardPaired(_) => {}
        }
    }

    /// `def(v)`: returns any behavior ids forced alive as a side effect
    /// (only non-empty for [`Variable::ForwardPaired`]).
    fn def_var(&mut self, footprint: &Footprint, v: &Variable) -> Vec<BehaviorId> {
        match *v {
            Variable::Handle(h) => {
                self.handles.remove(&h);
                Vec::new()
            }
            Variable::Label(l) => {
                self.labels.remove(&l);
                Vec::new()
            }
            Variable::Memory(span) => {
                if let Some(list) = self.memory.get_mut(&span.memory) {
                    list.subtract(span.offset, span.end());
                }
                Vec::new()
            }
            Variable::Binding(b) => {
                self.bindings.remove(&b);
                Vec::new()
            }
            Variable::Descriptor(d) => {
                self.descriptors.remove(&d);
                Vec::new()
            }
            Variable::BoundSet(s) => {
                self.bound_sets.remove(&s);
                Vec::new()
            }
            Variable::Subpass(s) => {
                self.subpasses.remove(&s);
                Vec::new()
            }
            Variable::ForwardPaired(label) => footprint.forward_paired_readers(label).to_vec(),
        }
    }

    /// `RecordBehaviorEffects(behavior)`: processes writes first (defining),
    /// then reads (using). Returns the behavior itself plus any behaviors
    /// forced alive by forward-paired-label resurrection.
    pub fn record_effects(&mut self, footprint: &Footprint, id: BehaviorId) -> Vec<BehaviorId> {
        let behavior = footprint.get(id);
        let writes: Vec<Variable> = behavior.effective_writes().copied().collect();
        let reads: Vec<Variable> = behavior.effective_reads().copied().collect();

        let mut extras = vec![id];
        for w in &writes {
            extras.extend(self.def_var(footprint, w));
        }
        for r in &reads {
            self.use_var(r);
        }
        extras
    }

    /// Full backward walk over the whole footprint: returns, per behavior
    /// (in footprint order), whether it must be kept.
    pub fn run_full(&mut self, footprint: &Footprint) -> Vec<bool> {
        self.clear();
        self.run(footprint, HashSet::new())
    }

    /// `FramebufferRequest(cmd-id)`: seed the live set from the recorded
    /// last-bound-framebuffer data for `cmd_id`, then back-propagate over
    /// the whole footprint from that point (a full walk is still required
    /// because any earlier command may be the one that produced the
    /// requested data; the seed only changes *what's alive on entry*, not
    /// how far back the walk searches).
    pub fn framebuffer_request(&mut self, footprint: &Footprint, cmd_id: u64) -> Vec<bool> {
        self.clear();
        let seed = self.last_framebuffer_data.get(&cmd_id).cloned().unwrap_or_default();
        for v in &seed {
            self.use_var(v);
        }
        self.run(footprint, HashSet::new())
    }

    fn run(&mut self, footprint: &Footprint, mut forced: HashSet<BehaviorId>) -> Vec<bool> {
        let mut alive = vec![false; footprint.len()];
        for (id, behavior) in footprint.iter().rev() {
            let keep = behavior.alive || forced.contains(&id) || self.is_alive(footprint, id);
            if keep {
                alive[id.index()] = true;
                for extra in self.record_effects(footprint, id) {
                    forced.insert(extra);
                }
            }
        }
        alive
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;

    use super::*;
    use crate::behavior::SubcommandIndex;
    use crate::variable::{MemorySpan, RawHandle};
    use ash::vk;

    fn h(v: u64) -> RawHandle {
        RawHandle::of(vk::Buffer::from_raw(v))
    }

    #[test]
    fn round_trip_use_then_def_leaves_not_live() {
        let mut lm = LivenessMachine::new();
        let mut fp = Footprint::new();
        let id = fp.push(SubcommandIndex::Command(0));
        lm.use_var(&Variable::Handle(h(1)));
        assert!(lm.is_var_live(&Variable::Handle(h(1))));
        lm.def_var(&fp, &Variable::Handle(h(1)));
        assert!(!lm.is_var_live(&Variable::Handle(h(1))));
        let _ = id;
    }

    #[test]
    fn def_then_use_is_live() {
        let mut lm = LivenessMachine::new();
        let fp = Footprint::new();
        lm.def_var(&fp, &Variable::Handle(h(2)));
        lm.use_var(&Variable::Handle(h(2)));
        assert!(lm.is_var_live(&Variable::Handle(h(2))));
    }

    #[test]
    fn idempotent_use() {
        let mut lm = LivenessMachine::new();
        lm.use_var(&Variable::Handle(h(3)));
        lm.use_var(&Variable::Handle(h(3)));
        assert!(lm.is_var_live(&Variable::Handle(h(3))));
    }

    #[test]
    fn memory_span_liveness_is_byte_interval_based() {
        let mut lm = LivenessMachine::new();
        let mem = h(9);
        let whole = MemorySpan::new(mem, 0, 1024);
        lm.use_var(&Variable::Memory(whole));
        assert!(lm.handles.contains(&mem));
        let fp = Footprint::new();
        lm.def_var(&fp, &Variable::Memory(MemorySpan::new(mem, 0, 512)));
        assert!(!lm.is_var_live(&Variable::Memory(MemorySpan::new(mem, 0, 512))));
        assert!(lm.is_var_live(&Variable::Memory(MemorySpan::new(mem, 512, 512))));
    }

    #[test]
    fn forward_paired_def_resurrects_readers() {
        let mut fp = Footprint::new();
        let begin = fp.push(SubcommandIndex::Command(0));
        let end = fp.push(SubcommandIndex::Command(1));
        fp.read(begin, [Variable::ForwardPaired(5)]);
        fp.write(end, [Variable::ForwardPaired(5)]);
        // Make `end` alive through an unrelated write that's read downstream.
        fp.write(end, [Variable::Handle(h(1))]);
        let read_tail = fp.push(SubcommandIndex::Command(2));
        fp.read(read_tail, [Variable::Handle(h(1))]);
        fp.set_alive(read_tail); // stands in for the externally observed read root

        let mut lm = LivenessMachine::new();
        let alive = lm.run_full(&fp);
        assert!(alive[begin.index()], "begin must be resurrected when end is defined");
        assert!(alive[end.index()]);
    }
}
