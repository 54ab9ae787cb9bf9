//! The def/use variable model: the tagged union of trackable units over which
//! the liveness algebra operates.
//!
//! See `spec.md` §3. Every [`Variable`] variant has its own read/write
//! contract; [`crate::liveness::LivenessMachine`] is the only place that
//! interprets them.

use ash::vk;

/// A freshly minted 64-bit identity used as a generic synchronization token
/// (fence/event/semaphore signal state, command-buffer begin/end, dynamic
/// state, query reset/begin/end/result, swapchain slot acquire/present, ...).
pub type Label = u64;

/// Identity of a [`crate::registry::binding::ResourceBinding`] inside the
/// registry's binding arena.
pub type BindingId = u64;

/// Identity of a single descriptor slot's contents inside a descriptor set's
/// (binding, array-index) trie.
pub type DescriptorId = u64;

/// Identity of one `vkCmdBindDescriptorSets` capture (descriptor set paired
/// with its dynamic-offset vector).
pub type BoundSetId = u64;

/// Identity of a render pass's current-subpass cursor.
pub type SubpassCursorId = u64;

/// A Vulkan handle disambiguated by its object type.
///
/// `spec.md` describes the Opaque Handle variant as "a 64-bit Vulkan handle
/// treated as globally unique across its type" — read literally, two
/// handles of different `VkObjectType`s that happen to carry the same 64-bit
/// value are not the same variable. Different driver implementations do use
/// independent handle namespaces per object type, so disambiguating by type
/// is required to honor uniqueness. See DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawHandle {
    pub ty: vk::ObjectType,
    pub value: u64,
}

impl Default for RawHandle {
    /// The null handle, typed as `VkBuffer` — only meaningful as a
    /// placeholder inside a `#[derive(Default)]` wrapper struct field that
    /// always gets overwritten before use.
    fn default() -> Self {
        Self {
            ty: vk::ObjectType::BUFFER,
            value: 0,
        }
    }
}

impl RawHandle {
    /// Build a [`RawHandle`] from any concrete Vulkan handle type.
    pub fn of<H: vk::Handle>(handle: H) -> Self {
        Self {
            ty: H::TYPE,
            value: handle.as_raw(),
        }
    }

    /// `VK_NULL_HANDLE`. Reads and writes of the null handle are no-ops that
    /// report failure, per `spec.md` §3.
    pub fn is_null(&self) -> bool {
        self.value == 0
    }
}

/// A byte range within a single `VkDeviceMemory` allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemorySpan {
    pub memory: RawHandle,
    pub offset: u64,
    pub size: u64,
}

impl MemorySpan {
    pub fn new(memory: RawHandle, offset: u64, size: u64) -> Self {
        Self {
            memory,
            offset,
            size,
        }
    }

    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// Byte-interval intersection against another span of the *same* memory.
    pub fn intersects(&self, other: &MemorySpan) -> bool {
        self.memory == other.memory && self.offset < other.end() && other.offset < self.end()
    }
}

/// The closed tagged union of trackable dependency units (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    /// A 64-bit Vulkan handle, globally unique within its object type.
    Handle(RawHandle),
    /// An identity-only synchronization token.
    Label(Label),
    /// A byte range within a device memory allocation.
    Memory(MemorySpan),
    /// A bound region of a buffer or opaque image region.
    Binding(BindingId),
    /// A single descriptor slot's contents.
    Descriptor(DescriptorId),
    /// A captured descriptor-set-plus-dynamic-offsets binding.
    BoundSet(BoundSetId),
    /// A render pass's current-subpass cursor.
    Subpass(SubpassCursorId),
    /// A label whose readers are resurrected when the label is later
    /// defined; models begin/end command pairing (`spec.md` §3, §9).
    ForwardPaired(Label),
}

impl Variable {
    /// True for the null handle — reads/writes of it are no-ops.
    pub fn is_null(&self) -> bool {
        matches!(self, Variable::Handle(h) if h.is_null())
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;

    use super::*;

    #[test]
    fn raw_handle_disambiguates_by_object_type() {
        let buf = RawHandle::of(vk::Buffer::from_raw(42));
        let img = RawHandle::of(vk::Image::from_raw(42));
        assert_ne!(buf, img);
        assert_eq!(buf.value, img.value);
    }

    #[test]
    fn null_handle_is_null() {
        let null = RawHandle::of(vk::Buffer::null());
        assert!(null.is_null());
        assert!(Variable::Handle(null).is_null());
    }

    #[test]
    fn memory_span_intersection_is_byte_interval_based() {
        let mem = RawHandle::of(vk::DeviceMemory::from_raw(1));
        let a = MemorySpan::new(mem, 0, 16);
        let b = MemorySpan::new(mem, 15, 16);
        let c = MemorySpan::new(mem, 16, 16);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
