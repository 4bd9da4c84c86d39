//! Flatten rules: lowering high-level and optimizable nodes.

use rasterflow_core::{EdgeId, ErrorKind, Filter, FlowError, NodeId};
use rasterflow_graph::{build, EdgeDims, EdgeKind, Graph, NodeParams, NodeState, NodeType};

use crate::def::{OpContext, Replacement};
use crate::state::update_state;

fn input_edge_dims(g: &Graph, input_edge: Option<EdgeId>, node: NodeId) -> Result<EdgeDims, FlowError> {
    let edge = input_edge.ok_or_else(|| {
        FlowError::new(
            ErrorKind::InvalidGraph,
            format!("node {node} cannot flatten without an input edge"),
        )
    })?;
    g.edge(edge).dims().copied().ok_or_else(|| {
        FlowError::new(
            ErrorKind::InvalidInternalState,
            format!("node {node} flattened before its input edge had dimensions"),
        )
    })
}

/// Whether `producer` feeds any live node besides `excluding`.
///
/// Decides clone-vs-mutate: a mutating primitive may only steal its input
/// when no other consumer will read it.
fn node_has_other_dependents(g: &Graph, producer: NodeId, excluding: NodeId) -> bool {
    g.outbound_edges(producer)
        .iter()
        .any(|&e| g.edge(e).to != excluding)
}

/// Scale(w,h) → two transposed 1-D resampling passes.
pub fn scale(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    _input_edge: Option<EdgeId>,
) -> Result<Replacement, FlowError> {
    let NodeParams::Size { width, height } = *g.node_params(node) else {
        return Err(FlowError::new(
            ErrorKind::InvalidInternalState,
            format!("scale node {node} carries mismatched parameters"),
        ));
    };
    let filter = Filter::Robidoux;
    let first = build::add_render1d(g, None, width, true, filter)?;
    let last = build::add_render1d(g, Some(first), height, true, filter)?;
    Ok(Replacement::Chain { first, last })
}

/// Rotate90 → Transpose, Flip_V.
pub fn rotate_90(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    _node: NodeId,
    _input_edge: Option<EdgeId>,
) -> Result<Replacement, FlowError> {
    let first = build::add_generic(g, None, NodeType::Transpose)?;
    let last = build::add_generic(g, Some(first), NodeType::FlipVertical)?;
    Ok(Replacement::Chain { first, last })
}

/// Rotate180 → Flip_V, Flip_H.
pub fn rotate_180(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    _node: NodeId,
    _input_edge: Option<EdgeId>,
) -> Result<Replacement, FlowError> {
    let first = build::add_generic(g, None, NodeType::FlipVertical)?;
    let last = build::add_generic(g, Some(first), NodeType::FlipHorizontal)?;
    Ok(Replacement::Chain { first, last })
}

/// Rotate270 → Flip_V, Transpose.
pub fn rotate_270(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    _node: NodeId,
    _input_edge: Option<EdgeId>,
) -> Result<Replacement, FlowError> {
    let first = build::add_generic(g, None, NodeType::FlipVertical)?;
    let last = build::add_generic(g, Some(first), NodeType::Transpose)?;
    Ok(Replacement::Chain { first, last })
}

/// Clone → Create_Canvas + full-frame CopyRectToCanvas.
pub fn clone(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    input_edge: Option<EdgeId>,
) -> Result<Replacement, FlowError> {
    let input = input_edge_dims(g, input_edge, node)?;
    let canvas = build::add_create_canvas(g, input.format, input.width, input.height)?;
    let copy = build::add_copy_rect(
        g,
        None,
        rasterflow_graph::CopyRectParams {
            from_x: 0,
            from_y: 0,
            x: 0,
            y: 0,
            width: input.width,
            height: input.height,
        },
    )?;
    g.create_edge(canvas, copy, EdgeKind::Canvas)?;
    Ok(Replacement::Chain {
        first: copy,
        last: copy,
    })
}

/// Decoder lowers in place: the node is retyped primitive.
pub fn decoder(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    _input_edge: Option<EdgeId>,
) -> Result<Replacement, FlowError> {
    g.node_mut(node).kind = NodeType::PrimitiveDecoder;
    Ok(Replacement::InPlace)
}

/// Encoder lowers in place: the node is retyped primitive.
pub fn encoder(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    _input_edge: Option<EdgeId>,
) -> Result<Replacement, FlowError> {
    g.node_mut(node).kind = NodeType::PrimitiveEncoder;
    Ok(Replacement::InPlace)
}

/// Flip/crop shared shape: clone the input when it has other consumers,
/// then append the mutating primitive.
fn clone_then_mutate(
    g: &mut Graph,
    node: NodeId,
    input_edge: Option<EdgeId>,
    kind: NodeType,
    params: NodeParams,
) -> Result<Replacement, FlowError> {
    let edge = input_edge.ok_or_else(|| {
        FlowError::new(
            ErrorKind::InvalidGraph,
            format!("node {node} cannot flatten without an input edge"),
        )
    })?;
    let producer = g.edge(edge).from;
    if node_has_other_dependents(g, producer, node) {
        let clone = build::add_generic(g, None, NodeType::Clone)?;
        let mutate = build::add_node(g, Some(clone), kind, params)?;
        Ok(Replacement::Chain {
            first: clone,
            last: mutate,
        })
    } else {
        let mutate = build::add_node(g, None, kind, params)?;
        Ok(Replacement::Chain {
            first: mutate,
            last: mutate,
        })
    }
}

/// Flip_V → [Clone →] Flip_Vertical_Mutate.
pub fn flip_vertical(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    input_edge: Option<EdgeId>,
) -> Result<Replacement, FlowError> {
    clone_then_mutate(
        g,
        node,
        input_edge,
        NodeType::FlipVerticalMutate,
        NodeParams::None,
    )
}

/// Flip_H → [Clone →] Flip_Horizontal_Mutate.
pub fn flip_horizontal(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    input_edge: Option<EdgeId>,
) -> Result<Replacement, FlowError> {
    clone_then_mutate(
        g,
        node,
        input_edge,
        NodeType::FlipHorizontalMutate,
        NodeParams::None,
    )
}

/// Crop → [Clone →] Crop_Mutate_Alias.
pub fn crop(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    input_edge: Option<EdgeId>,
) -> Result<Replacement, FlowError> {
    let params = *g.node_params(node);
    if !matches!(params, NodeParams::Crop { .. }) {
        return Err(FlowError::new(
            ErrorKind::InvalidInternalState,
            format!("crop node {node} carries mismatched parameters"),
        ));
    }
    clone_then_mutate(g, node, input_edge, NodeType::CropMutateAlias, params)
}

/// Transpose → Create_Canvas(h×w) + transposed RenderToCanvas1D.
///
/// Catmull-Rom has zero crossings at whole pixels, so an identity-width
/// pass through it moves pixels without resampling them.
pub fn transpose(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    input_edge: Option<EdgeId>,
) -> Result<Replacement, FlowError> {
    let input = input_edge_dims(g, input_edge, node)?;
    let canvas = build::add_create_canvas(g, input.format, input.height, input.width)?;
    let render = build::add_render_to_canvas_1d(g, None, input.width, true, Filter::CatmullRom)?;
    g.create_edge(canvas, render, EdgeKind::Canvas)?;
    Ok(Replacement::Chain {
        first: render,
        last: render,
    })
}

/// Render1D → Create_Canvas + RenderToCanvas1D carrying the same pass
/// parameters. The canvas is pre-marked optimized so execution can start
/// in the current pass.
pub fn render1d(
    _ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    input_edge: Option<EdgeId>,
) -> Result<Replacement, FlowError> {
    let NodeParams::Render1D(params) = *g.node_params(node) else {
        return Err(FlowError::new(
            ErrorKind::InvalidInternalState,
            format!("render1d node {node} carries mismatched parameters"),
        ));
    };
    let input = input_edge_dims(g, input_edge, node)?;
    let (canvas_w, canvas_h) = if params.transpose_on_write {
        (input.height, params.scale_to_width)
    } else {
        (params.scale_to_width, input.height)
    };
    let canvas = build::add_create_canvas(g, input.format, canvas_w, canvas_h)?;
    g.node_mut(canvas).state.insert(NodeState::OPTIMIZED);
    update_state(g, canvas)?;

    let render = g.create_node(NodeType::RenderToCanvas1D, NodeParams::Render1D(params))?;
    g.create_edge(canvas, render, EdgeKind::Canvas)?;
    Ok(Replacement::Chain {
        first: render,
        last: render,
    })
}
