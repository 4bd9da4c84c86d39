//! Execute rules: the only place bitmaps are created or mutated.

use rasterflow_core::{BitmapId, CodecKind, ErrorKind, FlowError, NodeId};
use rasterflow_graph::{EdgeKind, Graph, NodeParams};
use rasterflow_render::{self as render, CopyRect, RenderOptions};

use crate::def::OpContext;
use crate::dims::decoder_frame_info;

fn result_of_inbound(
    g: &Graph,
    node: NodeId,
    kind: EdgeKind,
) -> Result<BitmapId, FlowError> {
    let edge = g.first_inbound_of_kind(node, kind).ok_or_else(|| {
        FlowError::new(
            ErrorKind::InvalidGraph,
            format!("node {node} has no inbound {kind:?} edge"),
        )
    })?;
    let producer = g.edge(edge).from;
    g.node(producer).result.ok_or_else(|| {
        FlowError::new(
            ErrorKind::InvalidInternalState,
            format!("node {producer} executed without producing a result bitmap"),
        )
    })
}

fn mismatched_params(g: &Graph, node: NodeId) -> FlowError {
    FlowError::new(
        ErrorKind::InvalidInternalState,
        format!(
            "node {node} ({}) carries mismatched parameters",
            g.node(node).kind
        ),
    )
}

pub fn create_canvas(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
) -> Result<(), FlowError> {
    let NodeParams::CreateCanvas {
        format,
        width,
        height,
    } = *g.node_params(node)
    else {
        return Err(mismatched_params(g, node));
    };
    let bitmap = ctx.pool.create(width, height, format, false)?;
    g.node_mut(node).result = Some(bitmap);
    Ok(())
}

pub fn flip_vertical(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
) -> Result<(), FlowError> {
    let bitmap = result_of_inbound(g, node, EdgeKind::Input)?;
    render::flip_vertical(&mut ctx.pool.view_mut(bitmap)?);
    g.node_mut(node).result = Some(bitmap);
    Ok(())
}

pub fn flip_horizontal(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
) -> Result<(), FlowError> {
    let bitmap = result_of_inbound(g, node, EdgeKind::Input)?;
    render::flip_horizontal(&mut ctx.pool.view_mut(bitmap)?);
    g.node_mut(node).result = Some(bitmap);
    Ok(())
}

pub fn crop_alias(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
) -> Result<(), FlowError> {
    let NodeParams::Crop { x1, y1, x2, y2 } = *g.node_params(node) else {
        return Err(mismatched_params(g, node));
    };
    let input = result_of_inbound(g, node, EdgeKind::Input)?;
    // Header-only window; lifetime bounded by the input's buffer, which
    // the pool keeps alive for the rest of the job.
    let window = ctx.pool.create_window(input, x1, y1, x2, y2)?;
    g.node_mut(node).result = Some(window);
    Ok(())
}

pub fn copy_rect(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
) -> Result<(), FlowError> {
    let NodeParams::CopyRect(rect) = *g.node_params(node) else {
        return Err(mismatched_params(g, node));
    };
    let input = result_of_inbound(g, node, EdgeKind::Input)?;
    let canvas = result_of_inbound(g, node, EdgeKind::Canvas)?;
    {
        let (src, mut dst) = ctx.pool.read_write_pair(input, canvas)?;
        render::copy_rect(
            &src,
            &mut dst,
            CopyRect {
                from_x: rect.from_x,
                from_y: rect.from_y,
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
            },
        )?;
    }
    let alpha = ctx.pool.get(input)?.alpha_meaningful;
    ctx.pool.get_mut(canvas)?.alpha_meaningful = alpha;
    g.node_mut(node).result = Some(canvas);
    Ok(())
}

pub fn render_to_canvas_1d(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
) -> Result<(), FlowError> {
    let NodeParams::Render1D(params) = *g.node_params(node) else {
        return Err(mismatched_params(g, node));
    };
    let input = result_of_inbound(g, node, EdgeKind::Input)?;
    let canvas = result_of_inbound(g, node, EdgeKind::Canvas)?;
    {
        let (src, mut dst) = ctx.pool.read_write_pair(input, canvas)?;
        render::render_to_canvas_1d(
            &src,
            &mut dst,
            &RenderOptions {
                scale_to_width: params.scale_to_width,
                transpose_on_write: params.transpose_on_write,
                canvas_x: params.canvas_x,
                canvas_y: params.canvas_y,
                filter: params.filter,
                floatspace: params.floatspace,
                sharpen_percent_goal: params.sharpen_percent_goal,
                compositing: params.compositing,
                matte_color: params.matte_color,
            },
            ctx.cancel,
        )?;
    }
    let alpha = ctx.pool.get(input)?.alpha_meaningful;
    ctx.pool.get_mut(canvas)?.alpha_meaningful = alpha;
    g.node_mut(node).result = Some(canvas);
    Ok(())
}

pub fn bitmap_pointer(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
) -> Result<(), FlowError> {
    let NodeParams::BitmapRef { slot } = *g.node_params(node) else {
        return Err(mismatched_params(g, node));
    };
    if g.inbound_count_of_kind(node, EdgeKind::Input) == 1 {
        // Sink: publish the predecessor's result through the slot.
        let bitmap = result_of_inbound(g, node, EdgeKind::Input)?;
        ctx.bitmap_refs.set(slot, bitmap)?;
        g.node_mut(node).result = Some(bitmap);
    } else {
        // Source: the slot must already be populated.
        let bitmap = ctx.bitmap_refs.get(slot)?.ok_or_else(|| {
            FlowError::new(
                ErrorKind::InvalidGraph,
                format!("bitmap pointer node {node} reads empty reference slot {slot}"),
            )
        })?;
        g.node_mut(node).result = Some(bitmap);
    }
    Ok(())
}

pub fn decode(ctx: &mut OpContext<'_>, g: &mut Graph, node: NodeId) -> Result<(), FlowError> {
    let info = decoder_frame_info(ctx, g, node)?;
    let bitmap = ctx
        .pool
        .create(info.width, info.height, info.format, info.alpha_meaningful)?;

    let NodeParams::Codec(codec) = *g.node_params(node) else {
        return Err(mismatched_params(g, node));
    };
    let slot = codec.slot.ok_or_else(|| {
        FlowError::new(
            ErrorKind::InvalidInternalState,
            format!("decoder node {node} executed before binding a codec"),
        )
    })?;
    let decoder = ctx.codecs.decoder_mut(slot)?;
    let mut frame = ctx.pool.view_mut(bitmap)?;
    decoder.read_frame(&*ctx.io, &mut frame)?;
    g.node_mut(node).result = Some(bitmap);
    Ok(())
}

pub fn encode(ctx: &mut OpContext<'_>, g: &mut Graph, node: NodeId) -> Result<(), FlowError> {
    let bitmap = result_of_inbound(g, node, EdgeKind::Input)?;

    let params_id = g.node(node).params;
    let NodeParams::Codec(mut codec) = *g.params(params_id) else {
        return Err(mismatched_params(g, node));
    };
    let slot = match codec.slot {
        Some(slot) => slot,
        None => {
            let kind = codec.kind.unwrap_or(CodecKind::RawBitmap);
            let encoder = ctx.registry.create_encoder(kind, codec.io_id)?;
            let slot = ctx.codecs.add_encoder(encoder);
            codec.slot = Some(slot);
            *g.params_mut(params_id) = NodeParams::Codec(codec);
            slot
        }
    };
    let encoder = ctx.codecs.encoder_mut(slot)?;
    let frame = ctx.pool.view(bitmap)?;
    encoder.write_frame(ctx.io, &frame)?;
    // Encoding passes the input bitmap through.
    g.node_mut(node).result = Some(bitmap);
    Ok(())
}
