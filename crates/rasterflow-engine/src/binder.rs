//! Resource binding: placeholder nodes become concrete I/O nodes.
//!
//! Runs once, before the first pass. Each job resource is matched against
//! `Resource_Placeholder` nodes by placeholder index; matches are replaced
//! by a decoder, encoder, or bitmap-pointer node re-using the
//! placeholder's edges. A placeholder left over afterwards means the graph
//! and the supplied resources disagree.

use rasterflow_codecs::IoDirection;
use rasterflow_core::{CodecKind, ErrorKind, FlowError, NodeId, PlaceholderId};
use rasterflow_graph::{build, CodecParams, Graph, NodeParams, NodeType};

use crate::job::{JobResource, ResourceKind};
use crate::recording::{self, RecordingState};

/// First live placeholder node, optionally filtered by index.
fn find_placeholder(g: &Graph, index: Option<PlaceholderId>) -> Option<NodeId> {
    g.live_nodes().find(|&n| {
        if g.node(n).kind != NodeType::ResourcePlaceholder {
            return false;
        }
        match (index, g.node_params(n)) {
            (None, _) => true,
            (Some(want), NodeParams::Placeholder { index }) => *index == want,
            _ => false,
        }
    })
}

fn create_node_for_resource(
    g: &mut Graph,
    resource: &JobResource,
) -> Result<NodeId, FlowError> {
    match resource.kind {
        ResourceKind::Bitmap { slot } => build::add_bitmap_pointer(g, None, slot),
        ResourceKind::Buffer { io_id, codec } => match resource.direction {
            IoDirection::In => build::add_node(
                g,
                None,
                NodeType::Decoder,
                NodeParams::Codec(CodecParams {
                    io_id,
                    kind: codec,
                    slot: None,
                }),
            ),
            IoDirection::Out => build::add_node(
                g,
                None,
                NodeType::Encoder,
                NodeParams::Codec(CodecParams {
                    io_id,
                    kind: Some(codec.unwrap_or(CodecKind::RawBitmap)),
                    slot: None,
                }),
            ),
        },
    }
}

/// Replace every matching placeholder with its resource's concrete node.
pub fn insert_resources(
    g: &mut Graph,
    resources: &[JobResource],
    rec: &mut RecordingState,
) -> Result<(), FlowError> {
    for resource in resources {
        let mut matches = 0u32;
        while let Some(placeholder) = find_placeholder(g, Some(resource.placeholder_id)) {
            let replacement = create_node_for_resource(g, resource)?;
            g.duplicate_edges_to_another_node(placeholder, replacement, true, true)?;
            g.delete_node(placeholder)?;
            matches += 1;
            recording::notify_graph_changed(rec, g)?;
        }
        if matches == 0 {
            log::warn!(
                "resource for placeholder {} matched no graph nodes",
                resource.placeholder_id
            );
        }
    }
    if find_placeholder(g, None).is_some() {
        return Err(FlowError::new(
            ErrorKind::GraphCouldNotBeCompleted,
            "graph still contains resource placeholders after binding",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rasterflow_core::IoId;
    use rasterflow_graph::EdgeKind;

    fn resource(placeholder: i32, direction: IoDirection, io_id: i32) -> JobResource {
        JobResource {
            placeholder_id: PlaceholderId(placeholder),
            direction,
            kind: ResourceKind::Buffer {
                io_id: IoId(io_id),
                codec: None,
            },
        }
    }

    #[test]
    fn placeholders_become_decoder_and_encoder_nodes() {
        let mut g = Graph::new();
        let src = build::add_placeholder(&mut g, None, PlaceholderId(0)).unwrap();
        let scale = build::add_scale(&mut g, Some(src), 4, 4).unwrap();
        let sink = build::add_placeholder(&mut g, Some(scale), PlaceholderId(1)).unwrap();

        let mut rec = RecordingState::new(0);
        insert_resources(
            &mut g,
            &[
                resource(0, IoDirection::In, 10),
                resource(1, IoDirection::Out, 11),
            ],
            &mut rec,
        )
        .unwrap();

        // Both placeholders gone; decoder feeds scale, scale feeds encoder.
        assert!(find_placeholder(&g, None).is_none());
        let decoder = g
            .live_nodes()
            .find(|&n| g.node(n).kind == NodeType::Decoder)
            .unwrap();
        let encoder = g
            .live_nodes()
            .find(|&n| g.node(n).kind == NodeType::Encoder)
            .unwrap();
        assert_eq!(g.edge(g.inbound_edges(scale)[0]).from, decoder);
        assert_eq!(g.edge(g.inbound_edges(encoder)[0]).from, scale);
        assert!(matches!(
            g.node_params(encoder),
            NodeParams::Codec(CodecParams {
                kind: Some(CodecKind::RawBitmap),
                ..
            })
        ));
        // The tombstoned placeholders left no live edges behind.
        for e in g.live_edges() {
            assert_ne!(g.edge(e).from, src);
            assert_ne!(g.edge(e).to, sink);
        }
        g.validate().unwrap();
    }

    #[test]
    fn leftover_placeholder_fails_binding() {
        let mut g = Graph::new();
        build::add_placeholder(&mut g, None, PlaceholderId(7)).unwrap();

        let mut rec = RecordingState::new(0);
        let err = insert_resources(&mut g, &[], &mut rec).unwrap_err();
        assert_eq!(err.kind, ErrorKind::GraphCouldNotBeCompleted);
    }

    #[test]
    fn one_resource_binds_every_matching_placeholder() {
        let mut g = Graph::new();
        let a = build::add_placeholder(&mut g, None, PlaceholderId(0)).unwrap();
        let b = build::add_placeholder(&mut g, None, PlaceholderId(0)).unwrap();
        // Two separate consumers.
        build::add_scale(&mut g, Some(a), 2, 2).unwrap();
        build::add_scale(&mut g, Some(b), 3, 3).unwrap();

        let mut rec = RecordingState::new(0);
        insert_resources(&mut g, &[resource(0, IoDirection::In, 10)], &mut rec).unwrap();

        let decoders = g
            .live_nodes()
            .filter(|&n| g.node(n).kind == NodeType::Decoder)
            .count();
        assert_eq!(decoders, 2);
        assert!(g
            .live_edges()
            .all(|e| g.edge(e).kind == EdgeKind::Input));
    }
}
