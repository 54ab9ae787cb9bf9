//! The Recorder (`spec.md` §4.2): dispatches each trace command to a
//! handler, mutating the [`Registry`] and appending [`crate::behavior::Behavior`]s
//! (directly, or as deferred closures on a command buffer) to the
//! [`Footprint`].

pub mod barrier;
pub mod copy;
pub mod draw;
pub mod lifetime;
pub mod memory;
pub mod query;
pub mod sparse;
pub mod state;

use crate::behavior::{BehaviorId, Footprint, SubcommandIndex};
use crate::command_buffer::CommandBufferCommand;
use crate::config::Config;
use crate::registry::Registry;
use crate::trace::TraceCommand;
use crate::variable::{Label, RawHandle, Variable};

/// A recovered, non-fatal problem encountered while processing a single
/// trace command (`spec.md` §7's Identity/Resource-shape/Sparse-granularity
/// error kinds). Collected rather than propagated.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub command: u64,
    pub kind: DiagnosticKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    UnknownHandle,
    NullHandle,
    UnknownDescriptor,
    SparseGranularity,
    ResourceShape,
    DynamicOffsetExhausted,
}

/// The core driver: owns the registry and the footprint being built, and
/// dispatches `BuildFootprint` calls (`spec.md` §6).
pub struct Recorder {
    pub registry: Registry,
    pub footprint: Footprint,
    pub config: Config,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) current_submit: Option<u64>,
}

impl Recorder {
    pub fn new(config: Config) -> Self {
        Self {
            registry: Registry::new(),
            footprint: Footprint::new(),
            config,
            diagnostics: Vec::new(),
            current_submit: None,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub(crate) fn diagnose(&mut self, command: u64, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        log::warn!("command {command}: {message}");
        self.diagnostics.push(Diagnostic { command, kind, message });
    }

    pub(crate) fn trace_behavior(&mut self, cmd_id: u64) -> BehaviorId {
        if self.config.debug_trace {
            log::trace!("recording behavior for command {cmd_id}");
        }
        self.footprint.push(SubcommandIndex::Command(cmd_id))
    }

    /// Begin recording a `VkCmd*` command against `cb`: mints the command's
    /// identity label, emits the record-time behavior that reads the
    /// command-buffer handle and its begin-label and writes the identity,
    /// and returns the identity for the deferred closure to be chained
    /// through at roll-out (`spec.md` §4.2c).
    pub(crate) fn begin_cb_command(&mut self, cmd_id: u64, cb: RawHandle) -> Option<Label> {
        let begin_label = self.registry.command_buffers.get(&cb)?.begin_label?;
        let identity = self.registry.fresh_label();
        let id = self.trace_behavior(cmd_id);
        self.footprint.write(id, [Variable::Label(identity)]);
        self.footprint.read(id, [Variable::Handle(cb), Variable::Label(begin_label)]);
        Some(identity)
    }

    pub(crate) fn push_cb_command(&mut self, cb: RawHandle, command: CommandBufferCommand) {
        if let Some(buf) = self.registry.command_buffers.get_mut(&cb) {
            buf.recording.push(command);
        }
    }

    /// `BuildFootprint(globalState, footprint, cmdId, cmd)` (`spec.md` §6).
    pub fn build_footprint(&mut self, cmd_id: u64, cmd: &TraceCommand) {
        use TraceCommand::*;
        match cmd {
            CreateBuffer { buffer, size } => lifetime::create_buffer(self, cmd_id, *buffer, *size),
            DestroyBuffer { buffer } => lifetime::destroy_buffer(self, cmd_id, *buffer),
            CreateImage {
                image,
                image_type,
                array_layers,
                mip_levels,
                extent,
            } => lifetime::create_image(self, cmd_id, *image, *image_type, *array_layers, *mip_levels, *extent),
            DestroyImage { image } => lifetime::destroy_image(self, cmd_id, *image),
            CreateImageView {
                view,
                image,
                view_type,
                base_array_layer,
                layer_count,
                width,
                height,
            } => lifetime::create_image_view(self, cmd_id, *view, *image, *view_type, *base_array_layer, *layer_count, *width, *height),
            DestroyImageView { view } => lifetime::destroy_image_view(self, cmd_id, *view),
            AllocateMemory { memory } => lifetime::allocate_memory(self, cmd_id, *memory),
            FreeMemory { memory } => lifetime::free_memory(self, cmd_id, *memory),
            BindBufferMemory { buffer, memory, memory_offset } => memory::bind_buffer_memory(self, cmd_id, *buffer, *memory, *memory_offset),
            BindImageMemoryOpaque { image, memory, memory_offset, size } => memory::bind_image_memory(self, cmd_id, *image, *memory, *memory_offset, *size),
            GetBufferMemoryRequirements { buffer } => lifetime::get_buffer_memory_requirements(self, cmd_id, *buffer),
            GetImageMemoryRequirements { image } => lifetime::get_image_memory_requirements(self, cmd_id, *image),
            CreateRenderPass {
                render_pass,
                attachments,
                subpasses,
            } => lifetime::create_render_pass(self, cmd_id, *render_pass, attachments.clone(), subpasses.clone()),
            DestroyRenderPass { render_pass } => lifetime::destroy_render_pass(self, cmd_id, *render_pass),
            CreateFramebuffer {
                framebuffer,
                attachments,
                width,
                height,
                layers,
            } => lifetime::create_framebuffer(self, cmd_id, *framebuffer, attachments.clone(), *width, *height, *layers),
            DestroyFramebuffer { framebuffer } => lifetime::destroy_framebuffer(self, cmd_id, *framebuffer),
            AllocateDescriptorSets { sets, binding_counts } => lifetime::allocate_descriptor_sets(self, cmd_id, sets, binding_counts),
            FreeDescriptorSets { sets } => lifetime::free_descriptor_sets(self, cmd_id, sets),
            UpdateDescriptorSets { writes } => draw::update_descriptor_sets(self, cmd_id, writes),
            CopyDescriptorSets { copies } => draw::copy_descriptor_sets(self, cmd_id, copies),
            CreateFence { fence } => lifetime::create_sync_object(self, cmd_id, *fence, |r| &mut r.fences),
            DestroyFence { fence } => lifetime::destroy_sync_object(self, cmd_id, *fence, |r| &mut r.fences),
            CreateEvent { event } => lifetime::create_sync_object(self, cmd_id, *event, |r| &mut r.events),
            DestroyEvent { event } => lifetime::destroy_sync_object(self, cmd_id, *event, |r| &mut r.events),
            CreateSemaphore { semaphore } => lifetime::create_sync_object(self, cmd_id, *semaphore, |r| &mut r.semaphores),
            DestroySemaphore { semaphore } => lifetime::destroy_sync_object(self, cmd_id, *semaphore, |r| &mut r.semaphores),
            CreateQueryPool { pool, query_count } => lifetime::create_query_pool(self, cmd_id, *pool, *query_count),
            DestroyQueryPool { pool } => lifetime::destroy_query_pool(self, cmd_id, *pool),
            CreateCommandPool { pool } => lifetime::create_command_pool(self, cmd_id, *pool),
            AllocateCommandBuffers { command_buffers } => lifetime::allocate_command_buffers(self, cmd_id, command_buffers),
            FreeCommandBuffers { command_buffers } => lifetime::free_command_buffers(self, cmd_id, command_buffers),
            CreateSwapchain { swapchain, images } => lifetime::create_swapchain(self, cmd_id, *swapchain, images.clone()),
            DestroySwapchain { swapchain } => lifetime::destroy_swapchain(self, cmd_id, *swapchain),
            AcquireNextImage { swapchain, image_index } => lifetime::acquire_next_image(self, cmd_id, *swapchain, *image_index),
            QueuePresent { swapchain, image_index } => lifetime::queue_present(self, cmd_id, *swapchain, *image_index),

            MapMemory { memory, offset, size, coherent } => memory::map_memory(self, cmd_id, *memory, *offset, *size, *coherent),
            UnmapMemory { memory } => memory::unmap_memory(self, cmd_id, *memory),
            FlushMappedMemoryRanges { ranges } => memory::flush_mapped_memory_ranges(self, cmd_id, ranges),
            InvalidateMappedMemoryRanges { ranges } => memory::invalidate_mapped_memory_ranges(self, cmd_id, ranges),

            BeginCommandBuffer { command_buffer } => lifetime::begin_command_buffer(self, cmd_id, *command_buffer),
            EndCommandBuffer { command_buffer } => lifetime::end_command_buffer(self, cmd_id, *command_buffer),

            CmdCopyBuffer { command_buffer, src, dst, regions } => copy::copy_buffer(self, cmd_id, *command_buffer, *src, *dst, regions.clone()),
            CmdCopyImage {
                command_buffer,
                src,
                dst,
                regions,
                dst_image_layers,
                dst_extent,
            } => copy::copy_image(self, cmd_id, *command_buffer, *src, *dst, regions.clone(), *dst_image_layers, *dst_extent),
            CmdCopyBufferToImage {
                command_buffer,
                src,
                dst,
                regions,
                dst_image_layers,
                dst_extent,
            } => copy::copy_buffer_to_image(self, cmd_id, *command_buffer, *src, *dst, regions.clone(), *dst_image_layers, *dst_extent),
            CmdCopyImageToBuffer { command_buffer, src, dst, regions } => copy::copy_image_to_buffer(self, cmd_id, *command_buffer, *src, *dst, regions.clone()),
            CmdBlitImage {
                command_buffer,
                src,
                dst,
                regions,
                dst_image_layers,
                dst_extent,
            } => copy::blit_image(self, cmd_id, *command_buffer, *src, *dst, regions.clone(), *dst_image_layers, *dst_extent),
            CmdResolveImage {
                command_buffer,
                src,
                dst,
                regions,
                dst_image_layers,
                dst_extent,
            } => copy::resolve_image(self, cmd_id, *command_buffer, *src, *dst, regions.clone(), *dst_image_layers, *dst_extent),
            CmdClearColorImage {
                command_buffer,
                image,
                ranges,
                image_layers,
                mip_levels,
            } => copy::clear_color_image(self, cmd_id, *command_buffer, *image, ranges.clone(), *image_layers, *mip_levels),
            CmdClearDepthStencilImage {
                command_buffer,
                image,
                ranges,
                image_layers,
                mip_levels,
            } => copy::clear_depth_stencil_image(self, cmd_id, *command_buffer, *image, ranges.clone(), *image_layers, *mip_levels),
            CmdFillBuffer { command_buffer, buffer, offset, size } => copy::fill_buffer(self, cmd_id, *command_buffer, *buffer, *offset, *size),
            CmdUpdateBuffer { command_buffer, buffer, offset, size } => copy::update_buffer(self, cmd_id, *command_buffer, *buffer, *offset, *size),

            CmdPipelineBarrier {
                command_buffer,
                global,
                buffers,
                images,
                extra_reads,
            } => barrier::pipeline_barrier(self, cmd_id, *command_buffer, *global, buffers.clone(), images.clone(), extra_reads.clone()),

            CmdSetDynamicState { command_buffer } => state::set_dynamic_state(self, cmd_id, *command_buffer),
            CmdBindPipeline { command_buffer, pipeline } => state::bind_pipeline(self, cmd_id, *command_buffer, *pipeline),
            CmdBindVertexBuffers {
                command_buffer,
                first_binding,
                buffers,
            } => state::bind_vertex_buffers(self, cmd_id, *command_buffer, *first_binding, buffers.clone()),
            CmdBindIndexBuffer { command_buffer, buffer, offset, size } => state::bind_index_buffer(self, cmd_id, *command_buffer, *buffer, *offset, *size),
            CmdBindDescriptorSets {
                command_buffer,
                first_set,
                sets,
                dynamic_offsets,
            } => draw::bind_descriptor_sets(self, cmd_id, *command_buffer, *first_set, sets.clone(), dynamic_offsets.clone()),

            CmdDraw { command_buffer } => draw::draw(self, cmd_id, *command_buffer),
            CmdDrawIndexed { command_buffer } => draw::draw_indexed(self, cmd_id, *command_buffer),
            CmdDrawIndirect {
                command_buffer,
                buffer,
                offset,
                draw_count,
                stride,
            } => draw::draw_indirect(self, cmd_id, *command_buffer, *buffer, *offset, *draw_count, *stride),
            CmdDrawIndexedIndirect {
                command_buffer,
                buffer,
                offset,
                draw_count,
                stride,
            } => draw::draw_indexed_indirect(self, cmd_id, *command_buffer, *buffer, *offset, *draw_count, *stride),
            CmdDispatch { command_buffer } => draw::dispatch(self, cmd_id, *command_buffer),
            CmdDispatchIndirect { command_buffer, buffer, offset } => draw::dispatch_indirect(self, cmd_id, *command_buffer, *buffer, *offset),

            CmdResetQueryPool { command_buffer, pool, query } => query::reset_query_pool(self, cmd_id, *command_buffer, *pool, *query),
            CmdBeginQuery { command_buffer, pool, query } => query::begin_query(self, cmd_id, *command_buffer, *pool, *query),
            CmdEndQuery { command_buffer, pool, query } => query::end_query(self, cmd_id, *command_buffer, *pool, *query),
            CmdCopyQueryPoolResults { command_buffer, pool, queries } => query::copy_query_pool_results(self, cmd_id, *command_buffer, *pool, queries.clone()),
            CmdWriteTimestamp { command_buffer, pool, query } => query::write_timestamp(self, cmd_id, *command_buffer, *pool, *query),

            CmdDebugMarker { command_buffer } => state::debug_marker(self, cmd_id, *command_buffer),

            CmdBeginRenderPass {
                command_buffer,
                render_pass,
                framebuffer,
            } => state::begin_render_pass(self, cmd_id, *command_buffer, *render_pass, *framebuffer),
            CmdNextSubpass { command_buffer } => state::next_subpass(self, cmd_id, *command_buffer),
            CmdEndRenderPass { command_buffer } => state::end_render_pass(self, cmd_id, *command_buffer),
            CmdExecuteCommands { command_buffer, secondaries } => state::execute_commands(self, cmd_id, *command_buffer, secondaries.clone()),

            CmdBindSparse {
                queue,
                image,
                aspect,
                block_size,
                bindings,
            } => sparse::bind_sparse(self, cmd_id, *queue, *image, *aspect, *block_size, bindings.clone()),

            QueueSubmit { submit } => {
                self.current_submit = Some(cmd_id);
                crate::submit::register(self, cmd_id, submit);
            }
        }
    }

    /// `PostSubcommand(opaqueSubcommandRef)` (`spec.md` §6): the framework
    /// reports the trailing 3- or 5-deep index of one executed subcommand
    /// inside the currently-processed submit.
    pub fn post_subcommand(&mut self, trailing: &[u32]) -> crate::error::Result<()> {
        let submit_id = self.current_submit.ok_or(crate::error::Error::UnknownSubmit(0))?;
        crate::submit::post_subcommand(self, submit_id, trailing)
    }
}
