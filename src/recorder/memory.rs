//! Device-memory mapping, coherent sync, and resource-binding handlers
//! (`spec.md` §4.2b, §4.7).

use crate::recorder::{DiagnosticKind, Recorder};
use crate::registry::binding::Backing;
use crate::registry::object::MappedRange;
use crate::trace::MemoryRange;
use crate::variable::{MemorySpan, RawHandle, Variable};

pub fn bind_buffer_memory(rec: &mut Recorder, cmd_id: u64, buffer: RawHandle, memory: RawHandle, memory_offset: u64) {
    let id = rec.trace_behavior(cmd_id);
    let Some(buf) = rec.registry.buffers.get(&buffer) else {
        rec.diagnose(cmd_id, DiagnosticKind::UnknownHandle, format!("bind memory on unknown buffer {buffer:?}"));
        return;
    };
    let size = buf.size;
    let span = MemorySpan::new(memory, memory_offset, size);
    // The buffer's handle itself is modified (read-then-write), per our
    // resolution of the binding/destruction chaining judgment call (see
    // DESIGN.md): this is what keeps "create, bind, destroy" alive together
    // even when nothing reads the buffer's contents.
    rec.footprint.modify(id, [Variable::Handle(buffer)]);
    rec.footprint.write(id, [Variable::Memory(span)]);
    match rec.registry.buffers.get_mut(&buffer) {
        Some(buf) => {
            let _ = buf.bindings.add(buffer, 0, size, Backing::Memory(span));
        }
        None => unreachable!(),
    }
}

pub fn bind_image_memory(rec: &mut Recorder, cmd_id: u64, image: RawHandle, memory: RawHandle, memory_offset: u64, size: u64) {
    let id = rec.trace_behavior(cmd_id);
    if !rec.registry.images.contains_key(&image) {
        rec.diagnose(cmd_id, DiagnosticKind::UnknownHandle, format!("bind memory on unknown image {image:?}"));
        return;
    }
    let span = MemorySpan::new(memory, memory_offset, size);
    rec.footprint.modify(id, [Variable::Handle(image)]);
    rec.footprint.write(id, [Variable::Memory(span)]);
    if let Some(img) = rec.registry.images.get_mut(&image) {
        let _ = img.bindings.add(image, 0, size, Backing::Memory(span));
    }
}

pub fn map_memory(rec: &mut Recorder, cmd_id: u64, memory: RawHandle, offset: u64, size: u64, coherent: bool) {
    let id = rec.trace_behavior(cmd_id);
    rec.footprint.modify(id, [Variable::Handle(memory)]);
    if let Some(mem) = rec.registry.device_memories.get_mut(&memory) {
        mem.mapped = Some(MappedRange { offset, size, coherent });
    }
}

pub fn unmap_memory(rec: &mut Recorder, cmd_id: u64, memory: RawHandle) {
    let id = rec.trace_behavior(cmd_id);
    if let Some(mem) = rec.registry.device_memories.get(&memory) {
        if let Some(range) = mem.mapped {
            if range.coherent {
                promote_coherent(rec, id, memory, range.offset, range.size);
            }
        }
    }
    if let Some(mem) = rec.registry.device_memories.get_mut(&memory) {
        mem.mapped = None;
    }
    rec.footprint.modify(id, [Variable::Handle(memory)]);
}

pub fn flush_mapped_memory_ranges(rec: &mut Recorder, cmd_id: u64, ranges: &[MemoryRange]) {
    let id = rec.trace_behavior(cmd_id);
    for r in ranges {
        let coherent = rec.registry.device_memories.get(&r.memory).and_then(|m| m.mapped).map(|m| m.coherent).unwrap_or(false);
        if coherent {
            promote_coherent(rec, id, r.memory, r.offset, r.size);
        } else {
            rec.footprint.write(id, [Variable::Memory(MemorySpan::new(r.memory, r.offset, r.size))]);
        }
    }
}

pub fn invalidate_mapped_memory_ranges(rec: &mut Recorder, cmd_id: u64, ranges: &[MemoryRange]) {
    let id = rec.trace_behavior(cmd_id);
    for r in ranges {
        rec.footprint.read(id, [Variable::Memory(MemorySpan::new(r.memory, r.offset, r.size))]);
    }
}

/// The Coherent Memory Tracker (`spec.md` §4.7): any observation overlapping
/// a mapped coherent range forces the carrying behavior alive and promotes
/// the overlap into a write of the underlying memory span.
pub fn promote_coherent(rec: &mut Recorder, behavior: crate::behavior::BehaviorId, memory: RawHandle, offset: u64, size: u64) {
    rec.footprint.get_mut(behavior).alive = true;
    rec.footprint.write(behavior, [Variable::Memory(MemorySpan::new(memory, offset, size))]);
}
