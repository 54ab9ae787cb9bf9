//! The Render-Pass/Subpass Engine (`spec.md` §4.4) — attachment
//! load-op/store-op/resolve semantics realized as behaviors at subpass
//! begin, next, and end.

use ash::vk;

use crate::command_buffer::RollOutCtx;
use crate::registry::object::{AttachmentDescription, Framebuffer, RenderPass};
use crate::variable::{Label, RawHandle, SubpassCursorId, Variable};

/// Per-attachment bundle computed once at `beginRenderPass`: layout label,
/// the image's backing data variables, its description, and whether its
/// view covers the whole underlying image.
#[derive(Debug, Clone)]
pub struct SubpassAttachmentInfo {
    pub layout_label: Label,
    pub data: Vec<Variable>,
    pub description: AttachmentDescription,
    pub full_image_data: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SubpassInfo {
    pub color: Vec<u32>,
    pub resolve: Vec<u32>,
    pub input: Vec<u32>,
    pub depth_stencil: Option<u32>,
    pub load_attachments: Vec<u32>,
    pub store_attachments: Vec<u32>,
    pub modified_descriptor_data: Vec<Variable>,
}

/// Live state for one in-progress render pass instance.
#[derive(Clone)]
pub struct RenderPassState {
    pub framebuffer: RawHandle,
    pub attachments: Vec<SubpassAttachmentInfo>,
    pub subpasses: Vec<SubpassInfo>,
    pub cursor_id: SubpassCursorId,
    pub current_subpass: usize,
    /// Begin/end forward-paired label (`spec.md` §3).
    pub paired_label: Label,
}

/// `beginRenderPass(rp, fb)` — classify every subpass's attachment
/// references, compute each attachment's `fullImageData` flag, and track
/// each attachment's load/store subpasses.
pub fn begin(ctx: &mut RollOutCtx, rp_handle: RawHandle, fb_handle: RawHandle, paired_label: Label, cursor_id: SubpassCursorId) -> Option<RenderPassState> {
    ctx.footprint.read(ctx.behavior, [Variable::Handle(rp_handle), Variable::Handle(fb_handle)]);
    // Register as a pending reader of the begin/end pairing label; `end()`
    // defines it, resurrecting this behavior (`spec.md` §3, §4.4).
    ctx.footprint.read(ctx.behavior, [Variable::ForwardPaired(paired_label)]);

    let rp: RenderPass = clone_render_pass(ctx.registry.render_passes.get(&rp_handle)?);
    let fb: Framebuffer = clone_framebuffer(ctx.registry.framebuffers.get(&fb_handle)?);

    let attachments: Vec<SubpassAttachmentInfo> = rp
        .attachments
        .iter()
        .enumerate()
        .map(|(i, desc)| {
            let view_handle = fb.attachments.get(i).copied().unwrap_or(RawHandle { ty: vk::ObjectType::IMAGE_VIEW, value: 0 });
            let full = ctx
                .registry
                .image_view_data(view_handle)
                .map(|(view, image)| view.is_full_image_data(image) && view.width == fb.width && view.height == fb.height && view.layer_count >= fb.layers)
                .unwrap_or(false);
            let image = ctx.registry.image_views.get(&view_handle).map(|v| v.image).unwrap_or(RawHandle { ty: vk::ObjectType::IMAGE, value: 0 });
            SubpassAttachmentInfo {
                layout_label: ctx.registry.images.get(&image).map(|i| i.layout_label).unwrap_or(0),
                data: ctx.registry.image_data_vars(image, false),
                description: *desc,
                full_image_data: full,
            }
        })
        .collect();

    let mut subpasses: Vec<SubpassInfo> = rp
        .subpasses
        .iter()
        .map(|s| SubpassInfo {
            color: s.color.clone(),
            resolve: s.resolve.clone(),
            input: s.input.clone(),
            depth_stencil: s.depth_stencil,
            load_attachments: Vec::new(),
            store_attachments: Vec::new(),
            modified_descriptor_data: Vec::new(),
        })
        .collect();

    let mut first_use: Vec<Option<usize>> = vec![None; attachments.len()];
    let mut last_use: Vec<Option<usize>> = vec![None; attachments.len()];
    for (i, sp) in subpasses.iter().enumerate() {
        let refs = sp.color.iter().chain(sp.resolve.iter()).chain(sp.input.iter()).copied().chain(sp.depth_stencil);
        for a in refs {
            let a = a as usize;
            first_use[a].get_or_insert(i);
            last_use[a] = Some(i);
        }
    }
    for (a, first) in first_use.iter().enumerate() {
        if let Some(first) = first {
            subpasses[*first].load_attachments.push(a as u32);
        }
    }
    for (a, last) in last_use.iter().enumerate() {
        if let Some(last) = last {
            subpasses[*last].store_attachments.push(a as u32);
        }
    }

    let mut state = RenderPassState {
        framebuffer: fb_handle,
        attachments,
        subpasses,
        cursor_id,
        current_subpass: 0,
        paired_label,
    };
    start_subpass(ctx, &mut state);
    Some(state)
}

fn clone_render_pass(rp: &RenderPass) -> RenderPass {
    RenderPass {
        attachments: rp.attachments.clone(),
        subpasses: rp.subpasses.clone(),
    }
}

fn clone_framebuffer(fb: &Framebuffer) -> Framebuffer {
    Framebuffer {
        attachments: fb.attachments.clone(),
        width: fb.width,
        height: fb.height,
        layers: fb.layers,
    }
}

/// `startSubpass` — write the subpass cursor, then for each load attachment
/// apply the load policy of `spec.md` §4.4.
pub fn start_subpass(ctx: &mut RollOutCtx, state: &mut RenderPassState) {
    ctx.footprint.write(ctx.behavior, [Variable::Subpass(state.cursor_id)]);
    let sp = state.subpasses[state.current_subpass].clone();
    for &a in &sp.load_attachments {
        let att = &state.attachments[a as usize];
        ctx.footprint.modify(ctx.behavior, [Variable::Label(att.layout_label)]);

        let is_depth_stencil = sp.depth_stencil == Some(a);
        if is_depth_stencil {
            let depth_load = att.description.load_op;
            let stencil_load = att.description.stencil_load_op;
            if depth_load != vk::AttachmentLoadOp::LOAD && stencil_load != vk::AttachmentLoadOp::LOAD {
                if att.full_image_data {
                    ctx.footprint.write(ctx.behavior, att.data.iter().copied());
                } else {
                    ctx.footprint.modify(ctx.behavior, att.data.iter().copied());
                }
            } else if depth_load == vk::AttachmentLoadOp::LOAD && stencil_load == vk::AttachmentLoadOp::LOAD {
                ctx.footprint.read(ctx.behavior, att.data.iter().copied());
            } else {
                ctx.footprint.modify(ctx.behavior, att.data.iter().copied());
            }
        } else if att.description.load_op == vk::AttachmentLoadOp::LOAD {
            ctx.footprint.read(ctx.behavior, att.data.iter().copied());
        } else if att.full_image_data {
            ctx.footprint.write(ctx.behavior, att.data.iter().copied());
        } else {
            ctx.footprint.modify(ctx.behavior, att.data.iter().copied());
        }
    }
}

/// `nextSubpass` — end the current subpass, advance the cursor, start the
/// next one.
pub fn next_subpass(ctx: &mut RollOutCtx, state: &mut RenderPassState) {
    end_subpass(ctx, state);
    state.current_subpass += 1;
    start_subpass(ctx, state);
}

/// `endSubpass` — emit one "subpass output" behavior per store attachment
/// (plus a layout behavior for color attachments), and one more per
/// accumulated modified-descriptor data variable not already covered by an
/// attachment, per the store policy of `spec.md` §4.4. An attachment whose
/// data was also touched by a descriptor write this subpass gets that write
/// re-modified onto its own behavior, so a `DONT_CARE` store doesn't sever
/// the chain back to the draw that produced it. Every emitted behavior also
/// reads the subpass cursor.
pub fn end_subpass(ctx: &mut RollOutCtx, state: &mut RenderPassState) {
    let sp = state.subpasses[state.current_subpass].clone();
    let base_reads = ctx.footprint.get(ctx.behavior).reads.clone();
    let mut covered_by_attachment = Vec::new();
    for &a in &sp.store_attachments {
        let att = state.attachments[a as usize].clone();
        let is_depth_stencil = sp.depth_stencil == Some(a);
        let is_resolve = sp.resolve.contains(&a);

        let data_id = ctx.footprint.push(ctx.index);
        ctx.footprint.read(data_id, base_reads.iter().copied());
        ctx.footprint.read(data_id, [Variable::Subpass(state.cursor_id)]);
        if is_resolve {
            if let Some(color_idx) = sp.color.get(sp.resolve.iter().position(|&r| r == a).unwrap_or(usize::MAX)) {
                ctx.footprint.read(data_id, state.attachments[*color_idx as usize].data.iter().copied());
            }
        }

        let data = att.data.clone();
        if is_depth_stencil {
            let depth_store = att.description.store_op;
            let stencil_store = att.description.stencil_store_op;
            if depth_store == vk::AttachmentStoreOp::STORE || stencil_store == vk::AttachmentStoreOp::STORE {
                ctx.footprint.modify(data_id, data.iter().copied());
            } else if att.full_image_data {
                ctx.footprint.write(data_id, data.iter().copied());
            } else {
                ctx.footprint.modify(data_id, data.iter().copied());
            }
        } else {
            if att.description.store_op == vk::AttachmentStoreOp::STORE {
                ctx.footprint.modify(data_id, data.iter().copied());
            } else if att.full_image_data {
                ctx.footprint.write(data_id, data.iter().copied());
            } else {
                ctx.footprint.modify(data_id, data.iter().copied());
            }
            let layout_id = ctx.footprint.push(ctx.index);
            ctx.footprint.read(layout_id, base_reads.iter().copied());
            ctx.footprint.read(layout_id, [Variable::Subpass(state.cursor_id)]);
            ctx.footprint.modify(layout_id, [Variable::Label(att.layout_label)]);
        }

        // A descriptor write to this same attachment's data during the
        // subpass re-modifies it on this behavior regardless of store op,
        // so a DONT_CARE write above doesn't sever the chain back to it.
        for v in &data {
            if sp.modified_descriptor_data.contains(v) {
                ctx.footprint.modify(data_id, [*v]);
                covered_by_attachment.push(*v);
            }
        }
    }
    for data in &sp.modified_descriptor_data {
        if covered_by_attachment.contains(data) {
            continue;
        }
        let id = ctx.footprint.push(ctx.index);
        ctx.footprint.read(id, base_reads.iter().copied());
        ctx.footprint.read(id, [Variable::Subpass(state.cursor_id)]);
        ctx.footprint.modify(id, [*data]);
    }
}

/// `endRenderPass` — run `endSubpass` for the final subpass, then define the
/// begin/end forward-paired label.
pub fn end(ctx: &mut RollOutCtx, state: &mut RenderPassState) {
    end_subpass(ctx, state);
    ctx.footprint.write(ctx.behavior, [Variable::ForwardPaired(state.paired_label)]);
}

/// Accumulate a storage-image or storage-buffer descriptor write from a draw
/// or dispatch into the current subpass's modified-descriptor list, if a
/// render pass is active.
pub fn accumulate_modified_descriptor(state: &mut RenderPassState, data: Variable) {
    state.subpasses[state.current_subpass].modified_descriptor_data.push(data);
}
