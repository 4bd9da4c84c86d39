//! Convenience constructors for common node shapes.
//!
//! Each helper appends one node and, when a predecessor is given, links it
//! with an `input` edge. The JSON layer, the flattener, and tests all
//! build graphs through these.

use rasterflow_core::{CodecKind, ErrorKind, Filter, FlowError, IoId, NodeId, PixelFormat,
    PlaceholderId};

use crate::graph::{EdgeKind, Graph};
use crate::node::NodeType;
use crate::params::{CodecParams, CopyRectParams, NodeParams, Render1DParams};

/// Append a node of `kind` with `params`, linked from `prev` if given.
pub fn add_node(
    g: &mut Graph,
    prev: Option<NodeId>,
    kind: NodeType,
    params: NodeParams,
) -> Result<NodeId, FlowError> {
    let id = g.create_node(kind, params)?;
    if let Some(p) = prev {
        g.create_edge(p, id, EdgeKind::Input)?;
    }
    Ok(id)
}

/// A `Scale` node targeting `width × height`.
pub fn add_scale(
    g: &mut Graph,
    prev: Option<NodeId>,
    width: u32,
    height: u32,
) -> Result<NodeId, FlowError> {
    if width == 0 || height == 0 {
        return Err(FlowError::new(
            ErrorKind::InvalidArgument,
            format!("scale target must be nonzero, got {width}x{height}"),
        ));
    }
    add_node(g, prev, NodeType::Scale, NodeParams::Size { width, height })
}

/// A `Crop` node extracting `[x1, x2) × [y1, y2)`.
pub fn add_crop(
    g: &mut Graph,
    prev: Option<NodeId>,
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
) -> Result<NodeId, FlowError> {
    add_node(g, prev, NodeType::Crop, NodeParams::Crop { x1, y1, x2, y2 })
}

/// A primitive crop-alias node with the same rectangle convention.
pub fn add_primitive_crop(
    g: &mut Graph,
    prev: Option<NodeId>,
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
) -> Result<NodeId, FlowError> {
    add_node(
        g,
        prev,
        NodeType::CropMutateAlias,
        NodeParams::Crop { x1, y1, x2, y2 },
    )
}

/// A parameterless node (flips, transpose, rotates, clone).
pub fn add_generic(
    g: &mut Graph,
    prev: Option<NodeId>,
    kind: NodeType,
) -> Result<NodeId, FlowError> {
    add_node(g, prev, kind, NodeParams::None)
}

/// A `Create_Canvas` node. Canvases have no inputs.
pub fn add_create_canvas(
    g: &mut Graph,
    format: PixelFormat,
    width: u32,
    height: u32,
) -> Result<NodeId, FlowError> {
    add_node(
        g,
        None,
        NodeType::CreateCanvas,
        NodeParams::CreateCanvas {
            format,
            width,
            height,
        },
    )
}

/// An optimizable `Render1D` node.
pub fn add_render1d(
    g: &mut Graph,
    prev: Option<NodeId>,
    scale_to_width: u32,
    transpose_on_write: bool,
    filter: Filter,
) -> Result<NodeId, FlowError> {
    add_node(
        g,
        prev,
        NodeType::Render1D,
        NodeParams::Render1D(Render1DParams::new(
            scale_to_width,
            transpose_on_write,
            filter,
        )),
    )
}

/// A primitive `RenderToCanvas1D` node (expects a canvas edge).
pub fn add_render_to_canvas_1d(
    g: &mut Graph,
    prev: Option<NodeId>,
    scale_to_width: u32,
    transpose_on_write: bool,
    filter: Filter,
) -> Result<NodeId, FlowError> {
    add_node(
        g,
        prev,
        NodeType::RenderToCanvas1D,
        NodeParams::Render1D(Render1DParams::new(
            scale_to_width,
            transpose_on_write,
            filter,
        )),
    )
}

/// A primitive full-frame `CopyRectToCanvas` node.
pub fn add_copy_rect(
    g: &mut Graph,
    prev: Option<NodeId>,
    params: CopyRectParams,
) -> Result<NodeId, FlowError> {
    add_node(g, prev, NodeType::CopyRectToCanvas, NodeParams::CopyRect(params))
}

/// A `Resource_Placeholder` node carrying `index`.
pub fn add_placeholder(
    g: &mut Graph,
    prev: Option<NodeId>,
    index: PlaceholderId,
) -> Result<NodeId, FlowError> {
    add_node(
        g,
        prev,
        NodeType::ResourcePlaceholder,
        NodeParams::Placeholder { index },
    )
}

/// A high-level `Decoder` node reading `io_id`; codec detected lazily.
pub fn add_decoder(g: &mut Graph, io_id: IoId) -> Result<NodeId, FlowError> {
    add_node(
        g,
        None,
        NodeType::Decoder,
        NodeParams::Codec(CodecParams {
            io_id,
            kind: None,
            slot: None,
        }),
    )
}

/// A high-level `Encoder` node writing `io_id` in `kind` format.
pub fn add_encoder(
    g: &mut Graph,
    prev: Option<NodeId>,
    io_id: IoId,
    kind: CodecKind,
) -> Result<NodeId, FlowError> {
    add_node(
        g,
        prev,
        NodeType::Encoder,
        NodeParams::Codec(CodecParams {
            io_id,
            kind: Some(kind),
            slot: None,
        }),
    )
}

/// A `BitmapPointer` source/sink over the job's reference table.
pub fn add_bitmap_pointer(
    g: &mut Graph,
    prev: Option<NodeId>,
    slot: u32,
) -> Result<NodeId, FlowError> {
    add_node(g, prev, NodeType::BitmapPointer, NodeParams::BitmapRef { slot })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chained_helpers_link_with_input_edges() {
        let mut g = Graph::new();
        let d = add_decoder(&mut g, IoId(0)).unwrap();
        let s = add_scale(&mut g, Some(d), 25, 12).unwrap();
        let e = add_encoder(&mut g, Some(s), IoId(1), CodecKind::RawBitmap).unwrap();

        assert_eq!(g.live_nodes().count(), 3);
        assert_eq!(g.edge(g.inbound_edges(s)[0]).from, d);
        assert_eq!(g.edge(g.inbound_edges(e)[0]).from, s);
        g.validate().unwrap();
    }

    #[test]
    fn zero_scale_target_is_invalid() {
        let mut g = Graph::new();
        let err = add_scale(&mut g, None, 0, 10).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn canvas_nodes_have_no_inputs() {
        let mut g = Graph::new();
        let c = add_create_canvas(&mut g, PixelFormat::Bgra32, 4, 4).unwrap();
        assert!(g.inbound_edges(c).is_empty());
    }
}
