//! Resource Binding + binding-list algebra (`spec.md` §3, §4.2).

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::variable::{BindingId, Label, MemorySpan, RawHandle, Variable};

/// What a [`ResourceBinding`] is backed by: either a byte range of device
/// memory, or (for swapchain-owned image memory, which has no
/// `VkDeviceMemory` the trace ever sees) a synthetic label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backing {
    Memory(MemorySpan),
    Label(Label),
}

impl Backing {
    pub fn as_variable(&self) -> Variable {
        match self {
            Backing::Memory(span) => Variable::Memory(*span),
            Backing::Label(l) => Variable::Label(*l),
        }
    }
}

/// A bound region of a buffer or opaque image region: owned pointer-identity
/// standing over either a memory span or a synthetic label.
#[derive(Debug, Clone, Copy)]
pub struct ResourceBinding {
    pub id: BindingId,
    /// Offset/size in *resource* coordinates, not memory coordinates.
    pub offset: u64,
    pub size: u64,
    pub backing: Backing,
}

impl ResourceBinding {
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    fn intersects_range(&self, offset: u64, size: u64) -> bool {
        self.offset < offset + size && offset < self.end()
    }
}

/// An offset-ordered, non-overlapping list of [`ResourceBinding`]s over a
/// single owning buffer/image, plus the id allocator for bindings created
/// against it.
#[derive(Debug, Default)]
pub struct BindingList {
    next_id: BindingId,
    bindings: Vec<ResourceBinding>,
}

impl BindingList {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&mut self) -> BindingId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add a binding at `[offset, offset+size)`. Errors if it overlaps an
    /// existing binding (`spec.md` §4.2: "addition validates against
    /// overlap").
    pub fn add(&mut self, owner: RawHandle, offset: u64, size: u64, backing: Backing) -> Result<BindingId> {
        if self.bindings.iter().any(|b| b.intersects_range(offset, size)) {
            return Err(Error::OverlappingBinding(owner, offset));
        }
        let id = self.alloc_id();
        let pos = self.bindings.partition_point(|b| b.offset < offset);
        self.bindings.insert(
            pos,
            ResourceBinding {
                id,
                offset,
                size,
                backing,
            },
        );
        Ok(id)
    }

    /// All bindings intersecting `[offset, offset+size)`, in offset order.
    pub fn query(&self, offset: u64, size: u64) -> impl Iterator<Item = &ResourceBinding> {
        self.bindings.iter().filter(move |b| b.intersects_range(offset, size))
    }

    pub fn get(&self, id: BindingId) -> Option<&ResourceBinding> {
        self.bindings.iter().find(|b| b.id == id)
    }

    /// Mint a fresh identity for a sparse image block without adding a
    /// queryable [`ResourceBinding`] entry — sparse blocks are looked up
    /// through [`SparseBlockMap`], not this list's offset-ordered query.
    pub fn alloc_sparse_id(&mut self) -> BindingId {
        self.alloc_id()
    }

    /// Create a sub-binding over `[offset, offset+size)` of an existing
    /// binding. When the parent is memory-backed, the sub-binding's span is
    /// shifted and narrowed, preserving backing-data identity; a
    /// label-backed parent requires the sub-range to cover it exactly
    /// (`spec.md` §3: "shrinking produces a new sub-binding ... otherwise
    /// requires exact whole-binding coverage").
    pub fn sub_binding(&mut self, parent: BindingId, offset: u64, size: u64) -> Result<BindingId> {
        let parent_binding = *self.get(parent).ok_or(Error::PartialLabelBackedBinding)?;
        let rel_offset = offset.saturating_sub(parent_binding.offset);
        let backing = match parent_binding.backing {
            Backing::Memory(span) => Backing::Memory(MemorySpan::new(span.memory, span.offset + rel_offset, size)),
            Backing::Label(l) => {
                if offset != parent_binding.offset || size != parent_binding.size {
                    return Err(Error::PartialLabelBackedBinding);
                }
                Backing::Label(l)
            }
        };
        let id = self.alloc_id();
        let pos = self.bindings.partition_point(|b| b.offset < offset);
        self.bindings.insert(
            pos,
            ResourceBinding {
                id,
                offset,
                size,
                backing,
            },
        );
        Ok(id)
    }
}

/// A sparse image block's identity: (aspect, layer, level, block-index).
pub type SparseBlockKey = (ash::vk::ImageAspectFlags, u32, u32, (u32, u32, u32));

/// Flat hashmap replacement for the source's four-level nested map, per
/// `spec.md` §9's design note on sparse image blocks.
#[derive(Debug, Default)]
pub struct SparseBlockMap {
    blocks: HashMap<SparseBlockKey, BindingId>,
}

impl SparseBlockMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: SparseBlockKey, binding: BindingId) {
        self.blocks.insert(key, binding);
    }

    pub fn get(&self, key: &SparseBlockKey) -> Option<BindingId> {
        self.blocks.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SparseBlockKey, &BindingId)> {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;

    use super::*;

    fn mem(v: u64) -> RawHandle {
        RawHandle::of(ash::vk::DeviceMemory::from_raw(v))
    }

    #[test]
    fn overlapping_binding_is_rejected() {
        let owner = RawHandle::of(ash::vk::Buffer::from_raw(1));
        let mut list = BindingList::new();
        let span = MemorySpan::new(mem(1), 0, 1024);
        list.add(owner, 0, 512, Backing::Memory(span)).unwrap();
        let err = list.add(owner, 256, 512, Backing::Memory(span)).unwrap_err();
        assert!(matches!(err, Error::OverlappingBinding(_, 256)));
    }

    #[test]
    fn query_returns_intersecting_bindings_in_order() {
        let owner = RawHandle::of(ash::vk::Buffer::from_raw(1));
        let mut list = BindingList::new();
        let span = MemorySpan::new(mem(1), 0, 4096);
        list.add(owner, 0, 256, Backing::Memory(span)).unwrap();
        list.add(owner, 512, 256, Backing::Memory(span)).unwrap();
        let hits: Vec<_> = list.query(200, 400).collect();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].offset, 0);
        assert_eq!(hits[1].offset, 512);
    }

    #[test]
    fn sub_binding_of_memory_backed_parent_shifts_span() {
        let owner = RawHandle::of(ash::vk::Buffer::from_raw(1));
        let mut list = BindingList::new();
        let span = MemorySpan::new(mem(1), 100, 1024);
        let parent = list.add(owner, 0, 1024, Backing::Memory(span)).unwrap();
        let sub = list.sub_binding(parent, 64, 64).unwrap();
        match list.get(sub).unwrap().backing {
            Backing::Memory(s) => assert_eq!(s.offset, 164),
            _ => panic!("expected memory backing"),
        }
    }

    #[test]
    fn sub_binding_of_label_backed_parent_requires_exact_coverage() {
        let owner = RawHandle::of(ash::vk::Image::from_raw(1));
        let mut list = BindingList::new();
        let parent = list.add(owner, 0, 1024, Backing::Label(7)).unwrap();
        assert!(list.sub_binding(parent, 64, 64).is_err());
        assert!(list.sub_binding(parent, 0, 1024).is_ok());
    }
}
