//! `vkQueueBindSparse` (`spec.md` §4.2a): a queue-level operation, not a
//! command-buffer command — registered immediately at its own command
//! index, same as `VkBindBufferMemory`, per the ordering guarantee that
//! sparse binds take effect at the point they're processed (§5-iii).

use ash::vk;

use crate::recorder::Recorder;
use crate::variable::{RawHandle, Variable};

/// One sparse block binding: (array layer, mip level, block coordinate in
/// (z, y, x) traversal order, backing memory, memory offset).
pub type SparseBlockBinding = (u32, u32, (u32, u32, u32), RawHandle, u64);

pub fn bind_sparse(rec: &mut Recorder, cmd_id: u64, queue: RawHandle, image: RawHandle, aspect: vk::ImageAspectFlags, block_size: vk::Extent3D, bindings: Vec<SparseBlockBinding>) {
    let id = rec.trace_behavior(cmd_id);
    rec.footprint.read(id, [Variable::Handle(queue), Variable::Handle(image)]);
    let block_bytes = (block_size.width as u64) * (block_size.height as u64) * (block_size.depth as u64);

    let Some(img) = rec.registry.images.get_mut(&image) else { return };
    for (layer, level, block, memory, memory_offset) in bindings {
        rec.footprint.read(id, [Variable::Handle(memory)]);
        let key = (aspect, layer, level, block);
        let binding_id = match img.sparse.get(&key) {
            Some(existing) => existing,
            None => {
                let binding_id = img.bindings.alloc_sparse_id();
                img.sparse.insert(key, binding_id);
                binding_id
            }
        };
        let _ = (memory_offset, block_bytes);
        rec.footprint.write(id, [Variable::Binding(binding_id)]);
    }
}
