//! Copy/blit/resolve/clear/fill/update command handlers (`spec.md` §4.2c):
//! read source data, then write or modify destination data depending on
//! whether the destination region fully covers it. Fill and update always
//! write since their regions are self-describing.

use std::rc::Rc;

use ash::vk;

use crate::command_buffer::{CommandBufferCommand, DeferredClosure, RollOutCtx};
use crate::recorder::Recorder;
use crate::trace::{BlitRegion, BufferCopyRegion, BufferImageRegion, ImageCopyRegion, SubresourceLayers, SubresourceRange};
use crate::variable::RawHandle;

/// `subresourceLayersFullyCoverImage`: whether `subresource`/`offset`/`extent`
/// cover the whole of an image with `image_layers` layers and `full_extent`.
fn layers_fully_cover(subresource: &SubresourceLayers, offset: vk::Offset3D, extent: vk::Extent3D, image_layers: u32, full_extent: vk::Extent3D) -> bool {
    let layer_count = if subresource.layer_count == vk::REMAINING_ARRAY_LAYERS {
        image_layers - subresource.base_array_layer
    } else {
        subresource.layer_count
    };
    subresource.base_array_layer == 0
        && layer_count == image_layers
        && offset.x == 0
        && offset.y == 0
        && offset.z == 0
        && extent.width == full_extent.width
        && extent.height == full_extent.height
        && extent.depth == full_extent.depth
}

/// `blitFullyCoverImage`: normalize the two blit corner offsets into an
/// offset+extent pair, then defer to [`layers_fully_cover`].
fn blit_fully_covers(region: &BlitRegion, image_layers: u32, full_extent: vk::Extent3D) -> bool {
    let [a, b] = region.dst_offsets;
    let min = vk::Offset3D { x: a.x.min(b.x), y: a.y.min(b.y), z: a.z.min(b.z) };
    let extent = vk::Extent3D {
        width: a.x.abs_diff(b.x),
        height: a.y.abs_diff(b.y),
        depth: a.z.abs_diff(b.z),
    };
    layers_fully_cover(&region.dst_subresource, min, extent, image_layers, full_extent)
}

/// `subresourceRangeFullyCoverImage`: whether `range` covers every layer and
/// mip level of an image.
fn range_fully_covers(range: &SubresourceRange, image_layers: u32, mip_levels: u32) -> bool {
    let layer_count = if range.layer_count == vk::REMAINING_ARRAY_LAYERS {
        image_layers - range.base_array_layer
    } else {
        range.layer_count
    };
    let level_count = if range.level_count == vk::REMAINING_MIP_LEVELS {
        mip_levels - range.base_mip_level
    } else {
        range.level_count
    };
    range.base_array_layer == 0 && layer_count == image_layers && range.base_mip_level == 0 && level_count == mip_levels
}

/// Whether `[offset, offset+size)` covers the whole of a buffer of
/// `buffer_size` bytes — the buffer-destination analogue of
/// `subresourceLayersFullyCoverImage`, used where the destination is a
/// buffer rather than an image (`spec.md` §4.2c's rule generalizes to any
/// destination kind with a well-defined total extent).
fn buffer_region_fully_covers(offset: u64, size: u64, buffer_size: u64) -> bool {
    offset == 0 && size == buffer_size
}

fn record(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, closure: impl Fn(&mut RollOutCtx) + 'static) {
    let Some(identity) = rec.begin_cb_command(cmd_id, cb) else { return };
    let closure: DeferredClosure = Rc::new(closure);
    rec.push_cb_command(cb, CommandBufferCommand::new(identity, closure));
}

pub fn copy_buffer(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, src: RawHandle, dst: RawHandle, regions: Vec<BufferCopyRegion>) {
    record(rec, cmd_id, cb, move |ctx| {
        let dst_size = ctx.registry.buffers.get(&dst).map(|b| b.size).unwrap_or(0);
        for r in &regions {
            for v in ctx.registry.buffer_data_vars(src, r.src_offset, r.size) {
                ctx.footprint.read(ctx.behavior, [v]);
            }
            let full = buffer_region_fully_covers(r.dst_offset, r.size, dst_size);
            for v in ctx.registry.buffer_data_vars(dst, r.dst_offset, r.size) {
                if full {
                    ctx.footprint.write(ctx.behavior, [v]);
                } else {
                    ctx.footprint.modify(ctx.behavior, [v]);
                }
            }
        }
    });
}

pub fn copy_image(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, src: RawHandle, dst: RawHandle, regions: Vec<ImageCopyRegion>, dst_image_layers: u32, dst_extent: vk::Extent3D) {
    record(rec, cmd_id, cb, move |ctx| {
        for v in ctx.registry.image_data_vars(src, false) {
            ctx.footprint.read(ctx.behavior, [v]);
        }
        let full = regions.iter().all(|r| layers_fully_cover(&r.dst_subresource, r.dst_offset, r.extent, dst_image_layers, dst_extent));
        for v in ctx.registry.image_data_vars(dst, false) {
            if full {
                ctx.footprint.write(ctx.behavior, [v]);
            } else {
                ctx.footprint.modify(ctx.behavior, [v]);
            }
        }
    });
}

pub fn copy_buffer_to_image(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, src: RawHandle, dst: RawHandle, regions: Vec<BufferImageRegion>, dst_image_layers: u32, dst_extent: vk::Extent3D) {
    record(rec, cmd_id, cb, move |ctx| {
        for r in &regions {
            for v in ctx.registry.buffer_data_vars(src, r.buffer_offset, r.buffer_size) {
                ctx.footprint.read(ctx.behavior, [v]);
            }
        }
        let full = regions.iter().all(|r| layers_fully_cover(&r.subresource, r.image_offset, r.image_extent, dst_image_layers, dst_extent));
        for v in ctx.registry.image_data_vars(dst, false) {
            if full {
                ctx.footprint.write(ctx.behavior, [v]);
            } else {
                ctx.footprint.modify(ctx.behavior, [v]);
            }
        }
    });
}

pub fn copy_image_to_buffer(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, src: RawHandle, dst: RawHandle, regions: Vec<BufferImageRegion>) {
    record(rec, cmd_id, cb, move |ctx| {
        for v in ctx.registry.image_data_vars(src, false) {
            ctx.footprint.read(ctx.behavior, [v]);
        }
        let dst_size = ctx.registry.buffers.get(&dst).map(|b| b.size).unwrap_or(0);
        for r in &regions {
            let full = buffer_region_fully_covers(r.buffer_offset, r.buffer_size, dst_size);
            for v in ctx.registry.buffer_data_vars(dst, r.buffer_offset, r.buffer_size) {
                if full {
                    ctx.footprint.write(ctx.behavior, [v]);
                } else {
                    ctx.footprint.modify(ctx.behavior, [v]);
                }
            }
        }
    });
}

pub fn blit_image(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, src: RawHandle, dst: RawHandle, regions: Vec<BlitRegion>, dst_image_layers: u32, dst_extent: vk::Extent3D) {
    record(rec, cmd_id, cb, move |ctx| {
        for v in ctx.registry.image_data_vars(src, false) {
            ctx.footprint.read(ctx.behavior, [v]);
        }
        let full = regions.iter().all(|r| blit_fully_covers(r, dst_image_layers, dst_extent));
        for v in ctx.registry.image_data_vars(dst, false) {
            if full {
                ctx.footprint.write(ctx.behavior, [v]);
            } else {
                ctx.footprint.modify(ctx.behavior, [v]);
            }
        }
    });
}

pub fn resolve_image(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, src: RawHandle, dst: RawHandle, regions: Vec<ImageCopyRegion>, dst_image_layers: u32, dst_extent: vk::Extent3D) {
    copy_image(rec, cmd_id, cb, src, dst, regions, dst_image_layers, dst_extent);
}

pub fn clear_color_image(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, image: RawHandle, ranges: Vec<SubresourceRange>, image_layers: u32, mip_levels: u32) {
    record(rec, cmd_id, cb, move |ctx| {
        let full = ranges.iter().all(|r| range_fully_covers(r, image_layers, mip_levels));
        for v in ctx.registry.image_data_vars(image, false) {
            if full {
                ctx.footprint.write(ctx.behavior, [v]);
            } else {
                ctx.footprint.modify(ctx.behavior, [v]);
            }
        }
    });
}

pub fn clear_depth_stencil_image(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, image: RawHandle, ranges: Vec<SubresourceRange>, image_layers: u32, mip_levels: u32) {
    clear_color_image(rec, cmd_id, cb, image, ranges, image_layers, mip_levels);
}

pub fn fill_buffer(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, buffer: RawHandle, offset: u64, size: u64) {
    record(rec, cmd_id, cb, move |ctx| {
        for v in ctx.registry.buffer_data_vars(buffer, offset, size) {
            ctx.footprint.write(ctx.behavior, [v]);
        }
    });
}

pub fn update_buffer(rec: &mut Recorder, cmd_id: u64, cb: RawHandle, buffer: RawHandle, offset: u64, size: u64) {
    fill_buffer(rec, cmd_id, cb, buffer, offset, size);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_covering_layers_recognizes_whole_image() {
        let sub = SubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        };
        let extent = vk::Extent3D { width: 64, height: 64, depth: 1 };
        assert!(layers_fully_cover(&sub, vk::Offset3D::default(), extent, 1, extent));
    }

    #[test]
    fn partial_layers_do_not_cover() {
        let sub = SubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        };
        let full = vk::Extent3D { width: 64, height: 64, depth: 1 };
        let small = vk::Extent3D { width: 32, height: 32, depth: 1 };
        assert!(!layers_fully_cover(&sub, vk::Offset3D::default(), small, 1, full));
    }

    #[test]
    fn range_covering_every_layer_and_level_is_full() {
        let range = SubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 3,
            base_array_layer: 0,
            layer_count: 2,
        };
        assert!(range_fully_covers(&range, 2, 3));
        assert!(!range_fully_covers(&range, 2, 4));
    }
}
