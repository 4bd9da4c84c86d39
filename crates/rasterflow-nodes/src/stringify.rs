//! Custom node labels for dot output and debug logging.

use rasterflow_core::NodeId;
use rasterflow_graph::{Graph, NodeParams, NodeType};

pub fn scale(g: &Graph, node: NodeId) -> String {
    match *g.node_params(node) {
        NodeParams::Size { width, height } => {
            format!("scale {width}x{height} [{}]", g.node(node).state)
        }
        _ => fallback(g, node),
    }
}

pub fn canvas(g: &Graph, node: NodeId) -> String {
    match *g.node_params(node) {
        NodeParams::CreateCanvas {
            format,
            width,
            height,
        } => format!("canvas {width}x{height} {format} [{}]", g.node(node).state),
        _ => fallback(g, node),
    }
}

pub fn render1d(g: &Graph, node: NodeId) -> String {
    match *g.node_params(node) {
        NodeParams::Render1D(p) => format!(
            "render1d x{} {}{} {} [{}]",
            p.scale_to_width,
            if p.transpose_on_write { "transpose " } else { "" },
            p.filter,
            p.floatspace,
            g.node(node).state
        ),
        _ => fallback(g, node),
    }
}

pub fn placeholder(g: &Graph, node: NodeId) -> String {
    match *g.node_params(node) {
        NodeParams::Placeholder { index } => format!("placeholder #{index}"),
        _ => fallback(g, node),
    }
}

pub fn codec(g: &Graph, node: NodeId) -> String {
    let verb = match g.node(node).kind {
        NodeType::Decoder | NodeType::PrimitiveDecoder => "decode",
        _ => "encode",
    };
    match *g.node_params(node) {
        NodeParams::Codec(p) => match p.kind {
            Some(kind) => format!("{verb} {kind} [{}]", g.node(node).state),
            None => format!("{verb} [{}]", g.node(node).state),
        },
        _ => fallback(g, node),
    }
}

pub fn bitmap_pointer(g: &Graph, node: NodeId) -> String {
    format!("* bitmap [{}]", g.node(node).state)
}

fn fallback(g: &Graph, node: NodeId) -> String {
    format!("{} [{}]", g.node(node).kind, g.node(node).state)
}
