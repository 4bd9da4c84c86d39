//! Dimension rules: how each node type annotates its outbound edges.

use rasterflow_codecs::FrameInfo;
use rasterflow_core::{EdgeId, ErrorKind, FlowError, NodeId, PixelFormat};
use rasterflow_graph::{EdgeDims, EdgeKind, Graph, NodeParams};

use crate::def::OpContext;

fn edge_dims_of(g: &Graph, node: NodeId, kind: EdgeKind) -> Result<EdgeDims, FlowError> {
    let edge = g.first_inbound_of_kind(node, kind).ok_or_else(|| {
        FlowError::new(
            ErrorKind::InvalidGraph,
            format!("node {node} has no inbound {kind:?} edge"),
        )
    })?;
    g.edge(edge).dims().copied().ok_or_else(|| {
        FlowError::new(
            ErrorKind::InvalidInternalState,
            format!("inbound edge {edge} of node {node} lacks dimensions"),
        )
    })
}

fn input_dims(g: &Graph, node: NodeId) -> Result<EdgeDims, FlowError> {
    edge_dims_of(g, node, EdgeKind::Input)
}

pub fn scale(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    outbound_edge: EdgeId,
    _force_estimate: bool,
) -> Result<(), FlowError> {
    let NodeParams::Size { width, height } = *g.node_params(node) else {
        return Err(bad_params(g, node));
    };
    let input = input_dims(g, node)?;
    g.annotate_edge(
        outbound_edge,
        EdgeDims {
            width,
            height,
            format: input.format,
            alpha_meaningful: input.alpha_meaningful,
        },
    )
}

pub fn mimic_input(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    outbound_edge: EdgeId,
    _force_estimate: bool,
) -> Result<(), FlowError> {
    let input = input_dims(g, node)?;
    g.annotate_edge(outbound_edge, input)
}

pub fn transpose(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    outbound_edge: EdgeId,
    _force_estimate: bool,
) -> Result<(), FlowError> {
    let input = input_dims(g, node)?;
    g.annotate_edge(
        outbound_edge,
        EdgeDims {
            width: input.height,
            height: input.width,
            ..input
        },
    )
}

pub fn crop(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    outbound_edge: EdgeId,
    _force_estimate: bool,
) -> Result<(), FlowError> {
    let NodeParams::Crop { x1, y1, x2, y2 } = *g.node_params(node) else {
        return Err(bad_params(g, node));
    };
    let input = input_dims(g, node)?;
    if x1 >= x2 || y1 >= y2 {
        return Err(FlowError::new(
            ErrorKind::InvalidArgument,
            format!("crop rectangle ({x1},{y1})-({x2},{y2}) is empty"),
        ));
    }
    if x2 > input.width || y2 > input.height {
        return Err(FlowError::new(
            ErrorKind::InvalidArgument,
            format!(
                "crop rectangle ({x1},{y1})-({x2},{y2}) exceeds {}x{} input",
                input.width, input.height
            ),
        ));
    }
    g.annotate_edge(
        outbound_edge,
        EdgeDims {
            width: x2 - x1,
            height: y2 - y1,
            ..input
        },
    )
}

pub fn canvas(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    outbound_edge: EdgeId,
    _force_estimate: bool,
) -> Result<(), FlowError> {
    let NodeParams::CreateCanvas {
        format,
        width,
        height,
    } = *g.node_params(node)
    else {
        return Err(bad_params(g, node));
    };
    g.annotate_edge(
        outbound_edge,
        EdgeDims {
            width,
            height,
            format,
            alpha_meaningful: false,
        },
    )
}

pub fn render1d(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    outbound_edge: EdgeId,
    _force_estimate: bool,
) -> Result<(), FlowError> {
    let NodeParams::Render1D(params) = *g.node_params(node) else {
        return Err(bad_params(g, node));
    };
    let input = input_dims(g, node)?;
    let (width, height) = if params.transpose_on_write {
        (input.height, params.scale_to_width)
    } else {
        (params.scale_to_width, input.height)
    };
    g.annotate_edge(
        outbound_edge,
        EdgeDims {
            width,
            height,
            format: PixelFormat::Bgra32,
            alpha_meaningful: true,
        },
    )
}

pub fn render_to_canvas_1d(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    outbound_edge: EdgeId,
    _force_estimate: bool,
) -> Result<(), FlowError> {
    let canvas = edge_dims_of(g, node, EdgeKind::Canvas)?;
    g.annotate_edge(
        outbound_edge,
        EdgeDims {
            width: canvas.width,
            height: canvas.height,
            format: PixelFormat::Bgra32,
            alpha_meaningful: true,
        },
    )
}

pub fn copy_rect(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    outbound_edge: EdgeId,
    _force_estimate: bool,
) -> Result<(), FlowError> {
    // Output mirrors the canvas, not the input.
    let canvas = edge_dims_of(g, node, EdgeKind::Canvas)?;
    g.annotate_edge(outbound_edge, canvas)
}

pub fn decoder(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    outbound_edge: EdgeId,
    _force_estimate: bool,
) -> Result<(), FlowError> {
    let info = decoder_frame_info(ctx, g, node)?;
    g.annotate_edge(
        outbound_edge,
        EdgeDims {
            width: info.width,
            height: info.height,
            format: info.format,
            alpha_meaningful: info.alpha_meaningful,
        },
    )
}

pub fn bitmap_pointer(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    outbound_edge: EdgeId,
    _force_estimate: bool,
) -> Result<(), FlowError> {
    let NodeParams::BitmapRef { slot } = *g.node_params(node) else {
        return Err(bad_params(g, node));
    };
    // Acting as a source requires the slot to be populated already.
    let bitmap = ctx.bitmap_refs.get(slot)?.ok_or_else(|| {
        FlowError::new(
            ErrorKind::InvalidGraph,
            format!("bitmap pointer node {node} reads empty reference slot {slot}"),
        )
    })?;
    let bm = ctx.pool.get(bitmap)?;
    g.annotate_edge(
        outbound_edge,
        EdgeDims {
            width: bm.width(),
            height: bm.height(),
            format: bm.format(),
            alpha_meaningful: bm.alpha_meaningful,
        },
    )
}

/// Resolve (binding lazily if needed) the codec instance of a decoder
/// node and ask it for frame info.
pub fn decoder_frame_info(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
) -> Result<FrameInfo, FlowError> {
    let params_id = g.node(node).params;
    let NodeParams::Codec(mut codec) = *g.params(params_id) else {
        return Err(bad_params(g, node));
    };
    let slot = match codec.slot {
        Some(slot) => slot,
        None => {
            let decoder = match codec.kind {
                Some(kind) => ctx.registry.create_decoder(kind, codec.io_id)?,
                None => {
                    let bytes = ctx.io.input_bytes(codec.io_id)?;
                    ctx.registry.decoder_for_bytes(bytes, codec.io_id)?
                }
            };
            let slot = ctx.codecs.add_decoder(decoder);
            codec.slot = Some(slot);
            *g.params_mut(params_id) = NodeParams::Codec(codec);
            slot
        }
    };
    ctx.codecs.decoder_mut(slot)?.frame_info(ctx.io)
}

fn bad_params(g: &Graph, node: NodeId) -> FlowError {
    FlowError::new(
        ErrorKind::InvalidInternalState,
        format!(
            "node {node} ({}) carries mismatched parameters",
            g.node(node).kind
        ),
    )
}
