//! The node definition table and its dispatch layer.

use rasterflow_bitmap::BitmapPool;
use rasterflow_codecs::{CodecRegistry, CodecSlots, IoRegistry};
use rasterflow_core::{BitmapId, CancelToken, EdgeId, ErrorKind, FlowError, NodeId};
use rasterflow_graph::{EdgeKind, Graph, NodeType};

use crate::state::update_state;
use crate::{dims, exec, flatten, stringify};

/// Job-owned table of external bitmap references.
///
/// `BitmapPointer` nodes read and write these slots: an occupied slot is a
/// pixel source, an empty one is filled when the node's input executes.
#[derive(Debug, Default)]
pub struct BitmapRefs {
    slots: Vec<Option<BitmapId>>,
}

impl BitmapRefs {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slot, optionally pre-filled with a source bitmap.
    pub fn add(&mut self, initial: Option<BitmapId>) -> u32 {
        self.slots.push(initial);
        self.slots.len() as u32 - 1
    }

    /// The bitmap currently referenced by `slot`.
    pub fn get(&self, slot: u32) -> Result<Option<BitmapId>, FlowError> {
        self.slots.get(slot as usize).copied().ok_or_else(|| {
            FlowError::new(
                ErrorKind::InvalidInternalState,
                format!("bitmap reference slot {slot} does not exist"),
            )
        })
    }

    /// Point `slot` at `bitmap`.
    pub fn set(&mut self, slot: u32, bitmap: BitmapId) -> Result<(), FlowError> {
        match self.slots.get_mut(slot as usize) {
            Some(entry) => {
                *entry = Some(bitmap);
                Ok(())
            }
            None => Err(FlowError::new(
                ErrorKind::InvalidInternalState,
                format!("bitmap reference slot {slot} does not exist"),
            )),
        }
    }
}

/// Everything a node behavior may touch besides the graph itself.
///
/// Built fresh by the engine for each pass; all members are job-owned.
pub struct OpContext<'a> {
    /// Bitmap storage.
    pub pool: &'a mut BitmapPool,
    /// I/O buffers.
    pub io: &'a mut IoRegistry,
    /// Bound codec instances.
    pub codecs: &'a mut CodecSlots,
    /// Codec factories for lazy binding.
    pub registry: &'a CodecRegistry,
    /// External bitmap reference slots.
    pub bitmap_refs: &'a mut BitmapRefs,
    /// Cancellation flag, observed by long-running kernels.
    pub cancel: &'a CancelToken,
}

/// Dimension rule: annotate `outbound_edge` from `node`'s inputs/params.
pub type DimFn = fn(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    outbound_edge: EdgeId,
    force_estimate: bool,
) -> Result<(), FlowError>;

/// Execute rule: produce or mutate `node`'s result bitmap.
pub type ExecFn =
    fn(ctx: &mut OpContext<'_>, g: &mut Graph, node: NodeId) -> Result<(), FlowError>;

/// Simple-flatten rule: return the replacement chain for `node`.
pub type SimpleFlattenFn = fn(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    input_edge: Option<EdgeId>,
) -> Result<Replacement, FlowError>;

/// Complex-flatten rule: rewrite the graph around `node` directly.
pub type ComplexFlattenFn =
    fn(ctx: &mut OpContext<'_>, g: &mut Graph, node: NodeId) -> Result<(), FlowError>;

/// Stringify rule: short human-readable node label.
pub type StringifyFn = fn(g: &Graph, node: NodeId) -> String;

/// What a simple flatten produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Replacement {
    /// The node was rewritten in place (retyped); no splicing needed.
    InPlace,
    /// A replacement chain: inbound edges splice into `first`, outbound
    /// edges splice out of `last`, and the original node is deleted.
    Chain {
        /// Head of the replacement chain.
        first: NodeId,
        /// Tail of the replacement chain.
        last: NodeId,
    },
}

/// A flatten slot: most rules are simple chains; rules that produce
/// non-linear subgraphs mutate the graph themselves.
#[derive(Clone, Copy)]
pub enum FlattenRule {
    /// Chain-producing rule; the dispatcher splices and deletes.
    Simple(SimpleFlattenFn),
    /// Graph-mutating rule; the dispatcher only invokes it.
    Complex(ComplexFlattenFn),
}

/// Declared behavior of one node type.
pub struct NodeDef {
    /// Required count of inbound `input` edges; -1 means any.
    pub input_count: i32,
    /// Required count of inbound `canvas` edges; -1 means any.
    pub canvas_count: i32,
    /// Dimension rule, if the type can produce output dimensions.
    pub populate_dimensions: Option<DimFn>,
    /// Lowering applied before the optimizer.
    pub pre_optimize_flatten: Option<FlattenRule>,
    /// Lowering applied after the optimizer.
    pub post_optimize_flatten: Option<FlattenRule>,
    /// Execution, for primitives only.
    pub execute: Option<ExecFn>,
    /// Custom label renderer; `None` uses "name [state]".
    pub stringify: Option<StringifyFn>,
}

const NO_DEF: NodeDef = NodeDef {
    input_count: 0,
    canvas_count: 0,
    populate_dimensions: None,
    pre_optimize_flatten: None,
    post_optimize_flatten: None,
    execute: None,
    stringify: None,
};

const SCALE: NodeDef = NodeDef {
    input_count: 1,
    canvas_count: 0,
    populate_dimensions: Some(dims::scale),
    pre_optimize_flatten: Some(FlattenRule::Simple(flatten::scale)),
    stringify: Some(stringify::scale),
    ..NO_DEF
};

const ROTATE_90: NodeDef = NodeDef {
    input_count: 1,
    canvas_count: 0,
    populate_dimensions: Some(dims::transpose),
    pre_optimize_flatten: Some(FlattenRule::Simple(flatten::rotate_90)),
    ..NO_DEF
};

const ROTATE_180: NodeDef = NodeDef {
    input_count: 1,
    canvas_count: 0,
    populate_dimensions: Some(dims::mimic_input),
    pre_optimize_flatten: Some(FlattenRule::Simple(flatten::rotate_180)),
    ..NO_DEF
};

const ROTATE_270: NodeDef = NodeDef {
    input_count: 1,
    canvas_count: 0,
    populate_dimensions: Some(dims::transpose),
    pre_optimize_flatten: Some(FlattenRule::Simple(flatten::rotate_270)),
    ..NO_DEF
};

const CLONE: NodeDef = NodeDef {
    input_count: 1,
    canvas_count: 0,
    populate_dimensions: Some(dims::mimic_input),
    pre_optimize_flatten: Some(FlattenRule::Simple(flatten::clone)),
    ..NO_DEF
};

const DECODER: NodeDef = NodeDef {
    input_count: 0,
    canvas_count: 0,
    populate_dimensions: Some(dims::decoder),
    pre_optimize_flatten: Some(FlattenRule::Simple(flatten::decoder)),
    stringify: Some(stringify::codec),
    ..NO_DEF
};

const ENCODER: NodeDef = NodeDef {
    input_count: 1,
    canvas_count: 0,
    pre_optimize_flatten: Some(FlattenRule::Simple(flatten::encoder)),
    stringify: Some(stringify::codec),
    ..NO_DEF
};

const RESOURCE_PLACEHOLDER: NodeDef = NodeDef {
    input_count: -1,
    canvas_count: 0,
    stringify: Some(stringify::placeholder),
    // Placeholders are not flattened; the resource binder swaps them out
    // before the execution loop starts.
    ..NO_DEF
};

const FLIP_VERTICAL: NodeDef = NodeDef {
    input_count: 1,
    canvas_count: 0,
    populate_dimensions: Some(dims::mimic_input),
    post_optimize_flatten: Some(FlattenRule::Simple(flatten::flip_vertical)),
    ..NO_DEF
};

const FLIP_HORIZONTAL: NodeDef = NodeDef {
    input_count: 1,
    canvas_count: 0,
    populate_dimensions: Some(dims::mimic_input),
    post_optimize_flatten: Some(FlattenRule::Simple(flatten::flip_horizontal)),
    ..NO_DEF
};

const TRANSPOSE: NodeDef = NodeDef {
    input_count: 1,
    canvas_count: 0,
    populate_dimensions: Some(dims::transpose),
    post_optimize_flatten: Some(FlattenRule::Simple(flatten::transpose)),
    ..NO_DEF
};

const CROP: NodeDef = NodeDef {
    input_count: 1,
    canvas_count: 0,
    populate_dimensions: Some(dims::crop),
    post_optimize_flatten: Some(FlattenRule::Simple(flatten::crop)),
    ..NO_DEF
};

const RENDER_1D: NodeDef = NodeDef {
    input_count: 1,
    canvas_count: 0,
    populate_dimensions: Some(dims::render1d),
    post_optimize_flatten: Some(FlattenRule::Simple(flatten::render1d)),
    stringify: Some(stringify::render1d),
    ..NO_DEF
};

const CREATE_CANVAS: NodeDef = NodeDef {
    input_count: 0,
    canvas_count: 0,
    populate_dimensions: Some(dims::canvas),
    execute: Some(exec::create_canvas),
    stringify: Some(stringify::canvas),
    ..NO_DEF
};

const FLIP_VERTICAL_MUTATE: NodeDef = NodeDef {
    input_count: 1,
    canvas_count: 0,
    populate_dimensions: Some(dims::mimic_input),
    execute: Some(exec::flip_vertical),
    ..NO_DEF
};

const FLIP_HORIZONTAL_MUTATE: NodeDef = NodeDef {
    input_count: 1,
    canvas_count: 0,
    populate_dimensions: Some(dims::mimic_input),
    execute: Some(exec::flip_horizontal),
    ..NO_DEF
};

const CROP_MUTATE_ALIAS: NodeDef = NodeDef {
    input_count: 1,
    canvas_count: 0,
    populate_dimensions: Some(dims::crop),
    execute: Some(exec::crop_alias),
    ..NO_DEF
};

const COPY_RECT_TO_CANVAS: NodeDef = NodeDef {
    input_count: 1,
    canvas_count: 1,
    populate_dimensions: Some(dims::copy_rect),
    execute: Some(exec::copy_rect),
    ..NO_DEF
};

const RENDER_TO_CANVAS_1D: NodeDef = NodeDef {
    input_count: 1,
    canvas_count: 1,
    populate_dimensions: Some(dims::render_to_canvas_1d),
    execute: Some(exec::render_to_canvas_1d),
    stringify: Some(stringify::render1d),
    ..NO_DEF
};

const PRIMITIVE_DECODER: NodeDef = NodeDef {
    input_count: 0,
    canvas_count: 0,
    populate_dimensions: Some(dims::decoder),
    execute: Some(exec::decode),
    stringify: Some(stringify::codec),
    ..NO_DEF
};

const PRIMITIVE_ENCODER: NodeDef = NodeDef {
    input_count: 1,
    canvas_count: 0,
    execute: Some(exec::encode),
    stringify: Some(stringify::codec),
    ..NO_DEF
};

const BITMAP_POINTER: NodeDef = NodeDef {
    input_count: -1,
    canvas_count: 0,
    populate_dimensions: Some(dims::bitmap_pointer),
    execute: Some(exec::bitmap_pointer),
    stringify: Some(stringify::bitmap_pointer),
    ..NO_DEF
};

/// The definition for a node type.
pub fn def_for(kind: NodeType) -> &'static NodeDef {
    match kind {
        NodeType::Null => &NO_DEF,
        NodeType::FlipVerticalMutate => &FLIP_VERTICAL_MUTATE,
        NodeType::FlipHorizontalMutate => &FLIP_HORIZONTAL_MUTATE,
        NodeType::CropMutateAlias => &CROP_MUTATE_ALIAS,
        NodeType::CopyRectToCanvas => &COPY_RECT_TO_CANVAS,
        NodeType::CreateCanvas => &CREATE_CANVAS,
        NodeType::RenderToCanvas1D => &RENDER_TO_CANVAS_1D,
        NodeType::PrimitiveDecoder => &PRIMITIVE_DECODER,
        NodeType::PrimitiveEncoder => &PRIMITIVE_ENCODER,
        NodeType::BitmapPointer => &BITMAP_POINTER,
        NodeType::FlipVertical => &FLIP_VERTICAL,
        NodeType::FlipHorizontal => &FLIP_HORIZONTAL,
        NodeType::Transpose => &TRANSPOSE,
        NodeType::Crop => &CROP,
        NodeType::Render1D => &RENDER_1D,
        NodeType::Scale => &SCALE,
        NodeType::Rotate90 => &ROTATE_90,
        NodeType::Rotate180 => &ROTATE_180,
        NodeType::Rotate270 => &ROTATE_270,
        NodeType::Clone => &CLONE,
        NodeType::Decoder => &DECODER,
        NodeType::Encoder => &ENCODER,
        NodeType::ResourcePlaceholder => &RESOURCE_PLACEHOLDER,
    }
}

/// Check `node`'s live inbound edges against its declared arity.
pub fn validate_inputs(g: &Graph, node: NodeId) -> Result<(), FlowError> {
    let def = def_for(g.node(node).kind);
    let inputs = g.inbound_count_of_kind(node, EdgeKind::Input) as i32;
    let canvases = g.inbound_count_of_kind(node, EdgeKind::Canvas) as i32;
    if def.input_count > -1 && def.input_count != inputs {
        return Err(FlowError::new(
            ErrorKind::InvalidGraph,
            format!(
                "node {node} ({}) requires {} input edge(s), has {inputs}",
                g.node(node).kind,
                def.input_count
            ),
        ));
    }
    if def.canvas_count > -1 && def.canvas_count != canvases {
        return Err(FlowError::new(
            ErrorKind::InvalidGraph,
            format!(
                "node {node} ({}) requires {} canvas edge(s), has {canvases}",
                g.node(node).kind,
                def.canvas_count
            ),
        ));
    }
    Ok(())
}

/// Run `node`'s dimension rule against one of its outbound edges.
pub fn populate_dimensions_to_edge(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    outbound_edge: EdgeId,
    force_estimate: bool,
) -> Result<(), FlowError> {
    validate_inputs(g, node)?;
    let kind = g.node(node).kind;
    match def_for(kind).populate_dimensions {
        Some(rule) => rule(ctx, g, node, outbound_edge, force_estimate),
        None => Err(FlowError::new(
            ErrorKind::Unsupported,
            format!("node type {kind} has no dimension rule"),
        )),
    }
}

fn flatten_generic(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
    post_optimize: bool,
) -> Result<(), FlowError> {
    validate_inputs(g, node)?;
    let kind = g.node(node).kind;
    let def = def_for(kind);
    let rule = if post_optimize {
        def.post_optimize_flatten
    } else {
        def.pre_optimize_flatten
    };
    let rule = rule.ok_or_else(|| {
        FlowError::new(
            ErrorKind::Unsupported,
            format!(
                "node type {kind} has no {} flatten rule",
                if post_optimize { "post-optimize" } else { "pre-optimize" }
            ),
        )
    })?;
    match rule {
        FlattenRule::Complex(complex) => complex(ctx, g, node),
        FlattenRule::Simple(simple) => {
            let input_edge = g.first_inbound_of_kind(node, EdgeKind::Input);
            match simple(ctx, g, node, input_edge)? {
                Replacement::InPlace => Ok(()),
                Replacement::Chain { first, last } => {
                    g.duplicate_edges_to_another_node(node, first, true, false)?;
                    g.duplicate_edges_to_another_node(node, last, false, true)?;
                    g.delete_node(node)
                }
            }
        }
    }
}

/// Lower `node` via its pre-optimize flatten rule.
pub fn pre_optimize_flatten(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
) -> Result<(), FlowError> {
    flatten_generic(ctx, g, node, false)
}

/// Lower `node` via its post-optimize flatten rule.
pub fn post_optimize_flatten(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
) -> Result<(), FlowError> {
    flatten_generic(ctx, g, node, true)
}

/// Execute `node` and mark it executed.
///
/// Only primitives carry an execute rule; dispatching anything else is an
/// integrity violation, not a user error.
pub fn execute_node(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    node: NodeId,
) -> Result<(), FlowError> {
    validate_inputs(g, node)?;
    let kind = g.node(node).kind;
    let rule = def_for(kind).execute.ok_or_else(|| {
        FlowError::new(
            ErrorKind::InvalidInternalState,
            format!("execute dispatched on non-primitive node type {kind}"),
        )
    })?;
    rule(ctx, g, node)?;
    g.node_mut(node)
        .state
        .insert(rasterflow_graph::NodeState::EXECUTED);
    update_state(g, node)
}

/// Render a short label for `node` ("scale 200x100 [1/63]" style).
pub fn node_stringify(g: &Graph, node: NodeId) -> String {
    let kind = g.node(node).kind;
    match def_for(kind).stringify {
        Some(rule) => rule(g, node),
        None => format!("{kind} [{}]", g.node(node).state),
    }
}
