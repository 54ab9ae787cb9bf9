//! The Resource Registry (`spec.md` §4.2): mappings from handle to wrapper
//! object for every Vulkan object kind the recorder tracks, plus the label
//! allocator and the live queue-submit/queue-execution-state tables.

pub mod binding;
pub mod descriptor_set;
pub mod object;

use std::collections::HashMap;

use ash::vk;

use crate::command_buffer::CommandBuffer;
use crate::queue_state::QueueState;
use crate::variable::{Label, RawHandle};
use object::{Buffer, BufferView, DescriptorSetLayoutInfo, DeviceMemory, Framebuffer, Image, ImageView, QueryPool, RenderPass, SubmitInfo, Swapchain};

/// Every live Vulkan object the recorder knows about, keyed by its raw
/// handle, plus the non-handle-keyed bookkeeping the recorder needs
/// (label allocator, per-submit and per-queue state).
#[derive(Default)]
pub struct Registry {
    pub instances: HashMap<RawHandle, ()>,
    pub devices: HashMap<RawHandle, ()>,
    pub queues: HashMap<RawHandle, ()>,
    pub command_pools: HashMap<RawHandle, ()>,
    pub device_memories: HashMap<RawHandle, DeviceMemory>,
    pub buffers: HashMap<RawHandle, Buffer>,
    pub buffer_views: HashMap<RawHandle, BufferView>,
    pub images: HashMap<RawHandle, Image>,
    pub image_views: HashMap<RawHandle, ImageView>,
    pub descriptor_sets: HashMap<RawHandle, descriptor_set::DescriptorSet>,
    pub descriptor_set_layouts: HashMap<RawHandle, DescriptorSetLayoutInfo>,
    pub fences: HashMap<RawHandle, Label>,
    pub events: HashMap<RawHandle, Label>,
    pub semaphores: HashMap<RawHandle, Label>,
    pub query_pools: HashMap<RawHandle, QueryPool>,
    pub swapchains: HashMap<RawHandle, Swapchain>,
    pub framebuffers: HashMap<RawHandle, Framebuffer>,
    pub render_passes: HashMap<RawHandle, RenderPass>,
    pub command_buffers: HashMap<RawHandle, CommandBuffer>,

    pub queue_states: HashMap<RawHandle, QueueState>,
    /// Registered submits, keyed by submit id (the submit's own command id
    /// in the trace — the leading component of its rolled-out subcommand
    /// indices).
    pub submits: HashMap<u64, SubmitInfo>,

    next_label: Label,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh [`Label`] identity. Scoped to this registry instance
    /// rather than process-global, per `spec.md` §9's design note, and reset
    /// by [`crate::liveness::LivenessMachine::clear`]'s counterpart on the
    /// recorder side (`Recorder::new`).
    pub fn fresh_label(&mut self) -> Label {
        self.next_label += 1;
        self.next_label
    }

    pub fn image_view_data(&self, handle: RawHandle) -> Option<(&ImageView, &Image)> {
        let view = self.image_views.get(&handle)?;
        let image = self.images.get(&view.image)?;
        Some((view, image))
    }

    /// True if any mapped range of `memory` overlapping `[offset, offset+size)`
    /// is host-coherent (`spec.md` §4.7).
    pub fn coherent_mapped_ranges(&self) -> impl Iterator<Item = (RawHandle, object::MappedRange)> + '_ {
        self.device_memories.iter().filter_map(|(h, m)| m.mapped.filter(|r| r.coherent).map(|r| (*h, r)))
    }

    /// `getImageData`/`getImageLayoutAndData` (`spec.md` §4.2): the
    /// aggregated backing def/use variables for an image — its handle,
    /// optionally its layout label, every opaque binding's backing, and
    /// every sparse block's backing.
    pub fn image_data_vars(&self, image: RawHandle, include_layout: bool) -> Vec<crate::variable::Variable> {
        let mut vars = vec![crate::variable::Variable::Handle(image)];
        if let Some(img) = self.images.get(&image) {
            if include_layout {
                vars.push(crate::variable::Variable::Label(img.layout_label));
            }
            for binding in img.bindings.query(0, u64::MAX) {
                vars.push(binding.backing.as_variable());
            }
            for (_, binding_id) in img.sparse.iter() {
                vars.push(crate::variable::Variable::Binding(*binding_id));
            }
        }
        vars
    }

    /// `getBufferData` (`spec.md` §4.2): intersect the buffer's binding list
    /// with `[offset, offset+size)` and return the intersecting
    /// sub-bindings' backing variables.
    pub fn buffer_data_vars(&self, buffer: RawHandle, offset: u64, size: u64) -> Vec<crate::variable::Variable> {
        match self.buffers.get(&buffer) {
            Some(buf) => buf.bindings.query(offset, size).map(|b| b.backing.as_variable()).collect(),
            None => Vec::new(),
        }
    }
}

/// The Vulkan object type a given handle map tracks; used only for
/// diagnostics (`spec.md` §7 identity errors name the handle's kind).
pub fn object_type_name(ty: vk::ObjectType) -> &'static str {
    match ty {
        vk::ObjectType::BUFFER => "VkBuffer",
        vk::ObjectType::IMAGE => "VkImage",
        vk::ObjectType::DEVICE_MEMORY => "VkDeviceMemory",
        vk::ObjectType::DESCRIPTOR_SET => "VkDescriptorSet",
        vk::ObjectType::COMMAND_BUFFER => "VkCommandBuffer",
        vk::ObjectType::RENDER_PASS => "VkRenderPass",
        vk::ObjectType::FRAMEBUFFER => "VkFramebuffer",
        _ => "VkObject",
    }
}
