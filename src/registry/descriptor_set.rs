//! Descriptor Set Expansion (`spec.md` §3, §4.5): the (binding, array-index)
//! trie of descriptor slots, plus overflow-aware `writeDescriptors` /
//! `copyDescriptors`.

use std::collections::BTreeMap;

use crate::variable::{DescriptorId, RawHandle};

/// What a single descriptor slot currently refers to. Carries the Vulkan
/// object identities a draw/dispatch consuming this slot will read or
/// modify; buffer-backed variants also carry the bound (offset, range).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorContents {
    Sampler(RawHandle),
    SampledImage(RawHandle),
    CombinedImageSampler { sampler: RawHandle, image: RawHandle },
    InputAttachment(RawHandle),
    StorageImage(RawHandle),
    UniformBuffer { buffer: RawHandle, offset: u64, range: u64 },
    UniformTexelBuffer(RawHandle),
    StorageBuffer { buffer: RawHandle, offset: u64, range: u64 },
    StorageTexelBuffer(RawHandle),
    DynamicUniformBuffer { buffer: RawHandle, offset: u64, range: u64 },
    DynamicStorageBuffer { buffer: RawHandle, offset: u64, range: u64 },
    /// A trie slot with no write ever recorded against it.
    Empty,
}

impl DescriptorContents {
    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            DescriptorContents::DynamicUniformBuffer { .. } | DescriptorContents::DynamicStorageBuffer { .. }
        )
    }
}

/// One binding's declared array length, fixed at descriptor-set-layout
/// creation and never revisited by updates.
#[derive(Debug, Clone, Copy)]
struct BindingDecl {
    count: u32,
}

/// The (binding, array-index) trie for one `VkDescriptorSet`. Every slot
/// that has ever been touched (written, or just declared and queried)
/// carries a stable [`DescriptorId`], minted once and kept across
/// subsequent overwrites — the pointer identity of `spec.md` §3's
/// Descriptor variant.
#[derive(Debug, Default)]
pub struct DescriptorSet {
    next_id: DescriptorId,
    bindings: BTreeMap<u32, BindingDecl>,
    slots: BTreeMap<(u32, u32), (DescriptorId, DescriptorContents)>,
}

impl DescriptorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a binding's descriptor count, as read off the set's layout at
    /// `VkAllocateDescriptorSets` time.
    pub fn declare_binding(&mut self, binding: u32, count: u32) {
        self.bindings.insert(binding, BindingDecl { count });
    }

    fn slot_id(&mut self, binding: u32, array_index: u32) -> DescriptorId {
        if let Some(&(id, _)) = self.slots.get(&(binding, array_index)) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.slots.insert((binding, array_index), (id, DescriptorContents::Empty));
        id
    }

    /// The slot's stable identity and its current contents (or
    /// [`DescriptorContents::Empty`] if never written), minting the identity
    /// on first touch.
    pub fn slot(&mut self, binding: u32, array_index: u32) -> (DescriptorId, DescriptorContents) {
        let id = self.slot_id(binding, array_index);
        (id, self.slots.get(&(binding, array_index)).map(|(_, c)| *c).unwrap_or(DescriptorContents::Empty))
    }

    /// Count of declared slots currently holding a dynamic-offset descriptor
    /// type, used to split a `vkCmdBindDescriptorSets` call's flat
    /// dynamic-offset array across the sets it binds (`spec.md` §4.5).
    pub fn dynamic_descriptor_count(&self) -> u32 {
        self.slots.values().filter(|(_, c)| c.is_dynamic()).count() as u32
    }

    pub fn get(&self, binding: u32, array_index: u32) -> Option<DescriptorContents> {
        self.slots.get(&(binding, array_index)).map(|(_, c)| *c)
    }

    /// Every declared (binding, array-index) tuple in ascending order, along
    /// with its identity and contents (or [`DescriptorContents::Empty`] if
    /// never written).
    pub fn iter_all(&mut self) -> Vec<(u32, u32, DescriptorId, DescriptorContents)> {
        let declared: Vec<(u32, u32)> = self.bindings.iter().flat_map(|(&binding, decl)| (0..decl.count).map(move |i| (binding, i))).collect();
        declared.into_iter().map(|(b, a)| { let (id, c) = self.slot(b, a); (b, a, id, c) }).collect()
    }

    /// Write `contents` starting at `(start_binding, start_array)`, advancing
    /// to the next declared binding (resetting the array index to 0)
    /// whenever the current binding's declared count is exceeded — the
    /// overflow behavior `VkUpdateDescriptorSets` requires. Returns the
    /// identity of each slot actually written, in order.
    pub fn write_descriptors(&mut self, start_binding: u32, start_array: u32, contents: &[DescriptorContents]) -> Vec<DescriptorId> {
        let mut binding = start_binding;
        let mut array = start_array;
        let mut written = Vec::with_capacity(contents.len());
        for &c in contents {
            loop {
                let Some(decl) = self.bindings.get(&binding) else {
                    return written;
                };
                if array < decl.count {
                    break;
                }
                array = 0;
                binding = match self.bindings.range((binding + 1)..).next() {
                    Some((&b, _)) => b,
                    None => return written,
                };
            }
            let id = self.slot_id(binding, array);
            self.slots.insert((binding, array), (id, c));
            written.push(id);
            array += 1;
        }
        written
    }

    /// Read-only walk of `count` descriptors starting at
    /// `(start_binding, start_array)`, honoring the same per-binding
    /// overflow advance rule as [`Self::write_descriptors`]. Used by
    /// `copyDescriptors` (`spec.md` §4.5), which collects from the source
    /// set before writing into the destination set — kept as two separate
    /// borrows at the call site so a set can be copied onto itself. A slot
    /// never touched reports `None` for its identity: nothing has written
    /// it, so there's nothing for the copy to depend on.
    pub fn collect_range(&self, start_binding: u32, start_array: u32, count: u32) -> Vec<(Option<DescriptorId>, DescriptorContents)> {
        let mut binding = start_binding;
        let mut array = start_array;
        let mut collected = Vec::with_capacity(count as usize);
        for _ in 0..count {
            loop {
                let Some(decl) = self.bindings.get(&binding) else {
                    return collected;
                };
                if array < decl.count {
                    break;
                }
                array = 0;
                binding = match self.bindings.range((binding + 1)..).next() {
                    Some((&b, _)) => b,
                    None => return collected,
                };
            }
            match self.slots.get(&(binding, array)) {
                Some(&(id, c)) => collected.push((Some(id), c)),
                None => collected.push((None, DescriptorContents::Empty)),
            }
            array += 1;
        }
        collected
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;

    use super::*;

    fn img(v: u64) -> RawHandle {
        RawHandle::of(ash::vk::Image::from_raw(v))
    }

    #[test]
    fn write_advances_to_next_binding_on_overflow() {
        let mut set = DescriptorSet::new();
        set.declare_binding(0, 2);
        set.declare_binding(1, 2);
        let c = DescriptorContents::SampledImage(img(1));
        set.write_descriptors(0, 1, &[c, c, c]);
        assert_eq!(set.get(0, 1), Some(c));
        assert_eq!(set.get(1, 0), Some(c));
        assert_eq!(set.get(1, 1), Some(c));
    }

    #[test]
    fn copy_descriptors_round_trips_contents() {
        let mut src = DescriptorSet::new();
        src.declare_binding(0, 4);
        let c = DescriptorContents::StorageBuffer {
            buffer: RawHandle::of(ash::vk::Buffer::from_raw(9)),
            offset: 0,
            range: 64,
        };
        src.write_descriptors(0, 0, &[c]);

        let mut dst = DescriptorSet::new();
        dst.declare_binding(0, 4);
        let collected = src.collect_range(0, 0, 1);
        dst.write_descriptors(0, 2, &collected.iter().map(|(_, c)| *c).collect::<Vec<_>>());
        assert_eq!(dst.get(0, 2), Some(c));
    }

    #[test]
    fn collect_range_reports_no_identity_for_untouched_slots() {
        let set = DescriptorSet::new();
        assert!(set.collect_range(0, 0, 1).is_empty());
    }

    #[test]
    fn undeclared_binding_stops_writes_without_panicking() {
        let mut set = DescriptorSet::new();
        set.declare_binding(0, 1);
        let c = DescriptorContents::Sampler(RawHandle::of(ash::vk::Sampler::from_raw(1)));
        set.write_descriptors(0, 0, &[c, c]);
        assert_eq!(set.get(0, 0), Some(c));
    }
}
