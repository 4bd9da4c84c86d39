//! Graphviz dot rendering for recorded graph versions.

use std::io::{self, Write};

use rasterflow_core::NodeId;

use crate::graph::{EdgeKind, Graph};

/// Write `g` as a `digraph` to `out`.
///
/// `node_label` supplies the per-node text (the nodes crate's stringifier,
/// usually). Canvas edges render dashed; annotated edges carry their
/// propagated dimensions as labels.
pub fn write_dot<W: Write>(
    g: &Graph,
    out: &mut W,
    node_label: impl Fn(&Graph, NodeId) -> String,
) -> io::Result<()> {
    writeln!(out, "digraph g {{")?;
    writeln!(out, "  rankdir=LR;")?;
    writeln!(out, "  node [shape=box, fontsize=10];")?;
    for id in g.live_nodes() {
        let label = node_label(g, id).replace('"', "'");
        writeln!(out, "  n{id} [label=\"{label}\"];")?;
    }
    for e in g.live_edges() {
        let edge = g.edge(e);
        let mut attrs = String::new();
        if let Some(dims) = edge.dims() {
            attrs.push_str(&format!("label=\"{}x{}\"", dims.width, dims.height));
        }
        if edge.kind == EdgeKind::Canvas {
            if !attrs.is_empty() {
                attrs.push_str(", ");
            }
            attrs.push_str("style=dashed");
        }
        if attrs.is_empty() {
            writeln!(out, "  n{} -> n{};", edge.from, edge.to)?;
        } else {
            writeln!(out, "  n{} -> n{} [{attrs}];", edge.from, edge.to)?;
        }
    }
    writeln!(out, "}}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeDims;
    use crate::node::NodeType;
    use crate::params::NodeParams;
    use rasterflow_core::PixelFormat;

    #[test]
    fn renders_nodes_edges_and_annotations() {
        let mut g = Graph::new();
        let a = g.create_node(NodeType::Decoder, NodeParams::None).unwrap();
        let b = g.create_node(NodeType::Encoder, NodeParams::None).unwrap();
        let e = g.create_edge(a, b, EdgeKind::Input).unwrap();
        g.annotate_edge(
            e,
            EdgeDims {
                width: 100,
                height: 50,
                format: PixelFormat::Bgra32,
                alpha_meaningful: true,
            },
        )
        .unwrap();

        let mut buf = Vec::new();
        write_dot(&g, &mut buf, |g, n| g.node(n).kind.name().to_string()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("digraph g {"));
        assert!(text.contains("n0 [label=\"decode\"]"));
        assert!(text.contains("n0 -> n1 [label=\"100x50\"];"));
    }

    #[test]
    fn canvas_edges_render_dashed() {
        let mut g = Graph::new();
        let c = g
            .create_node(
                NodeType::CreateCanvas,
                NodeParams::CreateCanvas {
                    format: PixelFormat::Bgra32,
                    width: 2,
                    height: 2,
                },
            )
            .unwrap();
        let r = g
            .create_node(NodeType::RenderToCanvas1D, NodeParams::None)
            .unwrap();
        g.create_edge(c, r, EdgeKind::Canvas).unwrap();

        let mut buf = Vec::new();
        write_dot(&g, &mut buf, |_, _| "x".to_string()).unwrap();
        assert!(String::from_utf8(buf).unwrap().contains("style=dashed"));
    }
}
