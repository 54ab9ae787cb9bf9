//! Owned wrapper state for every Vulkan object kind the registry tracks
//! (`spec.md` §4.2): the data each `VkCreate*`/`VkAllocate*` installs and
//! each `VkDestroy*`/`VkFree*` removes.

use std::collections::HashMap;

use ash::vk;

use crate::registry::binding::{BindingList, SparseBlockMap};
use crate::variable::{Label, RawHandle};

/// A mapped range of a [`DeviceMemory`], tracked so `VkUnmapMemory` and the
/// coherent tracker know what to flush/deregister.
#[derive(Debug, Clone, Copy)]
pub struct MappedRange {
    pub offset: u64,
    pub size: u64,
    pub coherent: bool,
}

#[derive(Debug, Default)]
pub struct DeviceMemory {
    pub mapped: Option<MappedRange>,
}

/// A buffer's opaque binding list, keyed by byte offset within the buffer.
#[derive(Debug, Default)]
pub struct Buffer {
    pub size: u64,
    pub bindings: BindingList,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct BufferView {
    pub buffer: RawHandle,
    pub offset: u64,
    pub range: u64,
}

/// An image's layout label, its opaque (non-sparse) binding list, and its
/// sparse per-block binding map.
#[derive(Debug)]
pub struct Image {
    pub layout_label: Label,
    pub bindings: BindingList,
    pub sparse: SparseBlockMap,
    pub image_type: vk::ImageType,
    pub array_layers: u32,
    pub mip_levels: u32,
    pub extent: vk::Extent3D,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageView {
    pub image: RawHandle,
    pub view_type: vk::ImageViewType,
    pub base_array_layer: u32,
    pub layer_count: u32,
    pub width: u32,
    pub height: u32,
}

impl ImageView {
    /// The `fullImageData` test of `spec.md` §4.4: whether this view covers
    /// its underlying image in whole.
    pub fn is_full_image_data(&self, image: &Image) -> bool {
        let layer_count = if self.layer_count == vk::REMAINING_ARRAY_LAYERS {
            image.array_layers - self.base_array_layer
        } else {
            self.layer_count
        };
        matches!(self.view_type, vk::ImageViewType::TYPE_2D | vk::ImageViewType::TYPE_2D_ARRAY)
            && self.base_array_layer == 0
            && layer_count == image.array_layers
            && self.width == image.extent.width
            && self.height == image.extent.height
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AttachmentDescription {
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub stencil_load_op: vk::AttachmentLoadOp,
    pub stencil_store_op: vk::AttachmentStoreOp,
}

#[derive(Debug, Clone, Default)]
pub struct SubpassDescription {
    pub color: Vec<u32>,
    pub resolve: Vec<u32>,
    pub input: Vec<u32>,
    pub depth_stencil: Option<u32>,
}

#[derive(Debug, Default)]
pub struct RenderPass {
    pub attachments: Vec<AttachmentDescription>,
    pub subpasses: Vec<SubpassDescription>,
}

#[derive(Debug, Default)]
pub struct Framebuffer {
    pub attachments: Vec<RawHandle>,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
}

#[derive(Debug, Default)]
pub struct Swapchain {
    pub images: Vec<RawHandle>,
    pub acquire_labels: Vec<Label>,
    pub present_labels: Vec<Label>,
}

#[derive(Debug, Default)]
pub struct QueryPool {
    pub reset_labels: Vec<Label>,
    pub begin_labels: Vec<Label>,
    pub end_labels: Vec<Label>,
    pub result_labels: Vec<Label>,
}

/// A `VkQueueSubmit`'s bookkeeping, surviving from registration through
/// roll-out (`spec.md` §4.2d, §4.3).
pub struct SubmitInfo {
    pub queue: RawHandle,
    pub begin_label: Label,
    pub done_label: Label,
    pub wait_semaphores: Vec<RawHandle>,
    pub signal_semaphores: Vec<RawHandle>,
    pub signal_fence: Option<RawHandle>,
    /// The full 4- or 6-deep subcommand indices this submit will roll out,
    /// along with their deferred closures, popped from the front as the
    /// framework reports executed indices.
    pub pending: std::collections::VecDeque<crate::command_buffer::PendingCommand>,
    pub began: bool,
}

#[derive(Debug, Default)]
pub struct DescriptorSetLayoutInfo {
    pub binding_counts: HashMap<u32, u32>,
}
