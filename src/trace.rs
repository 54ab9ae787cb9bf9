//! `TraceCommand` — the typed command-argument schema flowing through the
//! `cmd` parameter of `BuildFootprint` (`spec.md` §6). Trace parsing and
//! deserialization are out of scope (§1); this type is the boundary the
//! (external) deserializer is expected to produce.

use ash::vk;

use crate::recorder::sparse::SparseBlockBinding;
use crate::registry::descriptor_set::DescriptorContents;
use crate::variable::RawHandle;

#[derive(Debug, Clone, Copy)]
pub struct BufferImageRegion {
    pub buffer_offset: u64,
    pub buffer_size: u64,
    pub image: RawHandle,
    pub subresource: SubresourceLayers,
    pub image_offset: vk::Offset3D,
    pub image_extent: vk::Extent3D,
}

#[derive(Debug, Clone, Copy)]
pub struct SubresourceLayers {
    pub aspect_mask: vk::ImageAspectFlags,
    pub mip_level: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageCopyRegion {
    pub src_subresource: SubresourceLayers,
    pub src_offset: vk::Offset3D,
    pub dst_subresource: SubresourceLayers,
    pub dst_offset: vk::Offset3D,
    pub extent: vk::Extent3D,
}

#[derive(Debug, Clone, Copy)]
pub struct BlitRegion {
    pub src_subresource: SubresourceLayers,
    pub src_offsets: [vk::Offset3D; 2],
    pub dst_subresource: SubresourceLayers,
    pub dst_offsets: [vk::Offset3D; 2],
}

#[derive(Debug, Clone, Copy)]
pub struct BufferCopyRegion {
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct SubresourceRange {
    pub aspect_mask: vk::ImageAspectFlags,
    pub base_mip_level: u32,
    pub level_count: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct VertexBufferBinding {
    pub buffer: RawHandle,
    pub offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct DescriptorSetBind {
    pub set: RawHandle,
    pub set_index: u32,
}

#[derive(Debug, Clone)]
pub struct MemoryRange {
    pub memory: RawHandle,
    pub offset: u64,
    pub size: u64,
}

/// One `pDescriptorWrites` entry of `VkUpdateDescriptorSets`: the contents to
/// install starting at `(binding, array_index)`, honoring overflow advance.
#[derive(Debug, Clone)]
pub struct DescriptorWrite {
    pub set: RawHandle,
    pub binding: u32,
    pub array_index: u32,
    pub contents: Vec<DescriptorContents>,
}

/// One `pDescriptorCopies` entry of `VkCopyDescriptorSets`.
#[derive(Debug, Clone, Copy)]
pub struct DescriptorCopy {
    pub src_set: RawHandle,
    pub src_binding: u32,
    pub src_array_index: u32,
    pub dst_set: RawHandle,
    pub dst_binding: u32,
    pub dst_array_index: u32,
    pub count: u32,
}

#[derive(Debug, Clone)]
pub struct SubmitDescriptor {
    pub queue: RawHandle,
    pub wait_semaphores: Vec<RawHandle>,
    pub signal_semaphores: Vec<RawHandle>,
    pub signal_fence: Option<RawHandle>,
    pub command_buffers: Vec<Vec<RawHandle>>,
    pub observations: Vec<MemoryRange>,
}

/// The closed set of trace commands this core's recorder dispatches on.
/// Each variant carries exactly the arguments the corresponding handler
/// (`spec.md` §4.2) needs.
#[derive(Debug, Clone)]
pub enum TraceCommand {
    // --- object lifetime ---
    CreateBuffer { buffer: RawHandle, size: u64 },
    DestroyBuffer { buffer: RawHandle },
    CreateImage { image: RawHandle, image_type: vk::ImageType, array_layers: u32, mip_levels: u32, extent: vk::Extent3D },
    DestroyImage { image: RawHandle },
    CreateImageView { view: RawHandle, image: RawHandle, view_type: vk::ImageViewType, base_array_layer: u32, layer_count: u32, width: u32, height: u32 },
    DestroyImageView { view: RawHandle },
    AllocateMemory { memory: RawHandle },
    FreeMemory { memory: RawHandle },
    BindBufferMemory { buffer: RawHandle, memory: RawHandle, memory_offset: u64 },
    BindImageMemoryOpaque { image: RawHandle, memory: RawHandle, memory_offset: u64, size: u64 },
    GetBufferMemoryRequirements { buffer: RawHandle },
    GetImageMemoryRequirements { image: RawHandle },
    CreateRenderPass { render_pass: RawHandle, attachments: Vec<crate::registry::object::AttachmentDescription>, subpasses: Vec<crate::registry::object::SubpassDescription> },
    DestroyRenderPass { render_pass: RawHandle },
    CreateFramebuffer { framebuffer: RawHandle, attachments: Vec<RawHandle>, width: u32, height: u32, layers: u32 },
    DestroyFramebuffer { framebuffer: RawHandle },
    AllocateDescriptorSets { sets: Vec<RawHandle>, binding_counts: Vec<std::collections::HashMap<u32, u32>> },
    FreeDescriptorSets { sets: Vec<RawHandle> },
    UpdateDescriptorSets { writes: Vec<DescriptorWrite> },
    CopyDescriptorSets { copies: Vec<DescriptorCopy> },
    CreateFence { fence: RawHandle },
    DestroyFence { fence: RawHandle },
    CreateEvent { event: RawHandle },
    DestroyEvent { event: RawHandle },
    CreateSemaphore { semaphore: RawHandle },
    DestroySemaphore { semaphore: RawHandle },
    CreateQueryPool { pool: RawHandle, query_count: u32 },
    DestroyQueryPool { pool: RawHandle },
    CreateCommandPool { pool: RawHandle },
    AllocateCommandBuffers { command_buffers: Vec<RawHandle> },
    FreeCommandBuffers { command_buffers: Vec<RawHandle> },
    CreateSwapchain { swapchain: RawHandle, images: Vec<RawHandle> },
    DestroySwapchain { swapchain: RawHandle },
    AcquireNextImage { swapchain: RawHandle, image_index: u32 },
    QueuePresent { swapchain: RawHandle, image_index: u32 },

    // --- device-memory mapping & coherent sync ---
    MapMemory { memory: RawHandle, offset: u64, size: u64, coherent: bool },
    UnmapMemory { memory: RawHandle },
    FlushMappedMemoryRanges { ranges: Vec<MemoryRange> },
    InvalidateMappedMemoryRanges { ranges: Vec<MemoryRange> },

    // --- command-buffer recording ---
    BeginCommandBuffer { command_buffer: RawHandle },
    EndCommandBuffer { command_buffer: RawHandle },
    CmdCopyBuffer { command_buffer: RawHandle, src: RawHandle, dst: RawHandle, regions: Vec<BufferCopyRegion> },
    CmdCopyImage { command_buffer: RawHandle, src: RawHandle, dst: RawHandle, regions: Vec<ImageCopyRegion>, dst_image_layers: u32, dst_extent: vk::Extent3D },
    CmdCopyBufferToImage { command_buffer: RawHandle, src: RawHandle, dst: RawHandle, regions: Vec<BufferImageRegion>, dst_image_layers: u32, dst_extent: vk::Extent3D },
    CmdCopyImageToBuffer { command_buffer: RawHandle, src: RawHandle, dst: RawHandle, regions: Vec<BufferImageRegion> },
    CmdBlitImage { command_buffer: RawHandle, src: RawHandle, dst: RawHandle, regions: Vec<BlitRegion>, dst_image_layers: u32, dst_extent: vk::Extent3D },
    CmdResolveImage { command_buffer: RawHandle, src: RawHandle, dst: RawHandle, regions: Vec<ImageCopyRegion>, dst_image_layers: u32, dst_extent: vk::Extent3D },
    CmdClearColorImage { command_buffer: RawHandle, image: RawHandle, ranges: Vec<SubresourceRange>, image_layers: u32, mip_levels: u32 },
    CmdClearDepthStencilImage { command_buffer: RawHandle, image: RawHandle, ranges: Vec<SubresourceRange>, image_layers: u32, mip_levels: u32 },
    CmdFillBuffer { command_buffer: RawHandle, buffer: RawHandle, offset: u64, size: u64 },
    CmdUpdateBuffer { command_buffer: RawHandle, buffer: RawHandle, offset: u64, size: u64 },
    CmdPipelineBarrier {
        command_buffer: RawHandle,
        global: bool,
        buffers: Vec<RawHandle>,
        images: Vec<RawHandle>,
        extra_reads: Vec<RawHandle>,
    },
    CmdSetDynamicState { command_buffer: RawHandle },
    CmdBindPipeline { command_buffer: RawHandle, pipeline: RawHandle },
    CmdBindVertexBuffers { command_buffer: RawHandle, first_binding: u32, buffers: Vec<VertexBufferBinding> },
    CmdBindIndexBuffer { command_buffer: RawHandle, buffer: RawHandle, offset: u64, size: u64 },
    CmdBindDescriptorSets { command_buffer: RawHandle, first_set: u32, sets: Vec<DescriptorSetBind>, dynamic_offsets: Vec<u32> },
    CmdDraw { command_buffer: RawHandle },
    CmdDrawIndexed { command_buffer: RawHandle },
    CmdDrawIndirect { command_buffer: RawHandle, buffer: RawHandle, offset: u64, draw_count: u32, stride: u32 },
    CmdDrawIndexedIndirect { command_buffer: RawHandle, buffer: RawHandle, offset: u64, draw_count: u32, stride: u32 },
    CmdDispatch { command_buffer: RawHandle },
    CmdDispatchIndirect { command_buffer: RawHandle, buffer: RawHandle, offset: u64 },
    CmdResetQueryPool { command_buffer: RawHandle, pool: RawHandle, query: u32 },
    CmdBeginQuery { command_buffer: RawHandle, pool: RawHandle, query: u32 },
    CmdEndQuery { command_buffer: RawHandle, pool: RawHandle, query: u32 },
    CmdCopyQueryPoolResults { command_buffer: RawHandle, pool: RawHandle, queries: Vec<u32> },
    CmdWriteTimestamp { command_buffer: RawHandle, pool: RawHandle, query: u32 },
    CmdDebugMarker { command_buffer: RawHandle },
    CmdBeginRenderPass { command_buffer: RawHandle, render_pass: RawHandle, framebuffer: RawHandle },
    CmdNextSubpass { command_buffer: RawHandle },
    CmdEndRenderPass { command_buffer: RawHandle },
    CmdExecuteCommands { command_buffer: RawHandle, secondaries: Vec<RawHandle> },
    CmdBindSparse { queue: RawHandle, image: RawHandle, aspect: vk::ImageAspectFlags, block_size: vk::Extent3D, bindings: Vec<SparseBlockBinding> },

    // --- submission ---
    QueueSubmit { submit: SubmitDescriptor },
}
