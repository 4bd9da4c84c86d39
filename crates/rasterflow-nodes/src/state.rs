//! The per-node progress state machine.
//!
//! State is recomputed from graph facts on every call, never trusted
//! across structural edits. The sticky inputs are the `Optimized` and
//! `Executed` bits (set by the optimizer and executor respectively);
//! everything else derives from edges and the type tag. Detected
//! impossibilities (an executed node losing its dimensions, a high-level
//! node carrying executor bits) are integrity violations.

use rasterflow_core::{ErrorKind, FlowError, NodeId};
use rasterflow_graph::{Graph, NodeState};

/// Whether every live inbound edge of `node` carries dimensions.
pub fn input_edges_have_dimensions(g: &Graph, node: NodeId) -> bool {
    g.inbound_edges(node).iter().all(|&e| g.edge(e).has_dims())
}

fn all_inputs_executed(g: &Graph, node: NodeId) -> bool {
    g.inbound_edges(node)
        .iter()
        .all(|&e| g.node(g.edge(e).from).state.contains(NodeState::EXECUTED))
}

/// Whether every live node in `g` has executed.
pub fn graph_fully_executed(g: &Graph) -> bool {
    g.live_nodes()
        .all(|n| g.node(n).state.contains(NodeState::EXECUTED))
}

fn integrity(node: NodeId, what: &str) -> FlowError {
    FlowError::new(
        ErrorKind::InvalidInternalState,
        format!("node {node}: {what}"),
    )
}

/// Recompute `node`'s progress bitmask from graph facts.
///
/// Rules, cumulative:
/// 1. Without input dimensions nothing higher holds (but a node may keep
///    its sticky optimizer bit; rewrites can leave fresh edges behind an
///    already-optimized node). An executed node in this situation is an
///    integrity violation.
/// 2. Non-optimizable types never rise above `InputDimensionsKnown`.
/// 3. A non-primitive cannot be `Executed`.
/// 4. `InputsExecuted` requires every inbound producer to be `Executed`.
/// 5. `Executed` requires `InputsExecuted` and `PostOptimizeFlattened`.
pub fn update_state(g: &mut Graph, node: NodeId) -> Result<(), FlowError> {
    let kind = g.node(node).kind;
    let prior = g.node(node).state;
    let dims_known = input_edges_have_dimensions(g, node);
    let optimization_allowed = kind.optimization_allowed();
    let optimized = prior.contains(NodeState::OPTIMIZED);
    let is_primitive = kind.is_primitive();
    let executed = prior.contains(NodeState::EXECUTED);

    let mut state = NodeState::BLANK;

    if dims_known {
        state.insert(NodeState::INPUT_DIMENSIONS_KNOWN);
    } else if executed {
        return Err(integrity(node, "executed but input dimensions are missing"));
    }

    if !optimization_allowed {
        if optimized || executed {
            return Err(integrity(node, "high-level node carries optimizer or executor bits"));
        }
        g.node_mut(node).state = state;
        return Ok(());
    }
    // Everything below 512 has, by definition, survived pre-flattening.
    state.insert(NodeState::PRE_OPTIMIZE_FLATTENED);

    if !optimized {
        if executed {
            return Err(integrity(node, "executed without being optimized"));
        }
        g.node_mut(node).state = state;
        return Ok(());
    }
    state.insert(NodeState::OPTIMIZED);

    if !is_primitive {
        if executed {
            return Err(integrity(node, "non-primitive node is marked executed"));
        }
        g.node_mut(node).state = state;
        return Ok(());
    }
    // Primitives have, by definition, survived post-flattening.
    state.insert(NodeState::POST_OPTIMIZE_FLATTENED);

    if !all_inputs_executed(g, node) {
        if executed {
            return Err(integrity(node, "executed before its inputs"));
        }
        g.node_mut(node).state = state;
        return Ok(());
    }
    state.insert(NodeState::INPUTS_EXECUTED);

    if executed {
        state.insert(NodeState::EXECUTED);
    }
    g.node_mut(node).state = state;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rasterflow_core::PixelFormat;
    use rasterflow_graph::{build, EdgeDims, EdgeKind, NodeType};

    fn annotate(g: &mut Graph, edge: rasterflow_core::EdgeId) {
        g.annotate_edge(
            edge,
            EdgeDims {
                width: 4,
                height: 4,
                format: PixelFormat::Bgra32,
                alpha_meaningful: true,
            },
        )
        .unwrap();
    }

    #[test]
    fn blank_high_level_node_reaches_only_dimensions_known() {
        let mut g = Graph::new();
        let src = build::add_generic(&mut g, None, NodeType::Clone).unwrap();
        let scale = build::add_scale(&mut g, Some(src), 2, 2).unwrap();
        let e = g.first_inbound_of_kind(scale, EdgeKind::Input).unwrap();
        annotate(&mut g, e);

        update_state(&mut g, scale).unwrap();
        assert_eq!(g.node(scale).state, NodeState::READY_FOR_PRE_OPTIMIZE_FLATTEN);
    }

    #[test]
    fn missing_dimensions_clears_higher_bits() {
        let mut g = Graph::new();
        let src = build::add_generic(&mut g, None, NodeType::Clone).unwrap();
        let flip = build::add_generic(&mut g, Some(src), NodeType::FlipVertical).unwrap();

        // Pretend the optimizer ran, then recompute with no dims.
        g.node_mut(flip).state.insert(NodeState::OPTIMIZED);
        update_state(&mut g, flip).unwrap();
        // Sticky Optimized survives, dims bit does not appear.
        assert!(g.node(flip).state.contains(NodeState::OPTIMIZED));
        assert!(!g
            .node(flip)
            .state
            .contains(NodeState::INPUT_DIMENSIONS_KNOWN));
    }

    #[test]
    fn executed_node_without_dimensions_is_integrity_violation() {
        let mut g = Graph::new();
        let src = build::add_generic(&mut g, None, NodeType::Clone).unwrap();
        let flip =
            build::add_generic(&mut g, Some(src), NodeType::FlipVerticalMutate).unwrap();
        g.node_mut(flip).state.insert(NodeState::EXECUTED);

        let err = update_state(&mut g, flip).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInternalState);
    }

    #[test]
    fn high_level_node_with_executor_bits_is_integrity_violation() {
        let mut g = Graph::new();
        let scale = build::add_scale(&mut g, None, 2, 2).unwrap();
        // No input edge: structurally wrong too, but the state machine
        // catches the bit violation first.
        g.node_mut(scale).state.insert(NodeState::OPTIMIZED);
        let err = update_state(&mut g, scale).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInternalState);
    }

    #[test]
    fn optimizable_node_stops_at_ready_for_optimize() {
        let mut g = Graph::new();
        let src = build::add_generic(&mut g, None, NodeType::Clone).unwrap();
        let flip = build::add_generic(&mut g, Some(src), NodeType::FlipVertical).unwrap();
        let e = g.first_inbound_of_kind(flip, EdgeKind::Input).unwrap();
        annotate(&mut g, e);

        update_state(&mut g, flip).unwrap();
        assert_eq!(g.node(flip).state, NodeState::READY_FOR_OPTIMIZE);
    }

    #[test]
    fn optimized_optimizable_node_is_ready_for_post_flatten() {
        let mut g = Graph::new();
        let src = build::add_generic(&mut g, None, NodeType::Clone).unwrap();
        let flip = build::add_generic(&mut g, Some(src), NodeType::FlipVertical).unwrap();
        let e = g.first_inbound_of_kind(flip, EdgeKind::Input).unwrap();
        annotate(&mut g, e);
        g.node_mut(flip).state.insert(NodeState::OPTIMIZED);

        update_state(&mut g, flip).unwrap();
        assert_eq!(
            g.node(flip).state,
            NodeState::READY_FOR_POST_OPTIMIZE_FLATTEN
        );
    }

    #[test]
    fn primitive_waits_for_executed_inputs() {
        let mut g = Graph::new();
        let src = build::add_create_canvas(&mut g, PixelFormat::Bgra32, 4, 4).unwrap();
        let flip =
            build::add_generic(&mut g, Some(src), NodeType::FlipVerticalMutate).unwrap();
        let e = g.first_inbound_of_kind(flip, EdgeKind::Input).unwrap();
        annotate(&mut g, e);
        g.node_mut(flip).state.insert(NodeState::OPTIMIZED);

        update_state(&mut g, flip).unwrap();
        // Inputs not executed yet: post-flattened but not ready.
        assert!(g
            .node(flip)
            .state
            .contains(NodeState::POST_OPTIMIZE_FLATTENED));
        assert!(!g.node(flip).state.contains(NodeState::INPUTS_EXECUTED));

        // Execute the producer; the primitive becomes ready.
        g.node_mut(src).state.insert(NodeState::EXECUTED);
        update_state(&mut g, flip).unwrap();
        assert_eq!(g.node(flip).state, NodeState::READY_FOR_EXECUTION);
    }

    #[test]
    fn executed_primitive_reaches_done() {
        let mut g = Graph::new();
        let canvas = build::add_create_canvas(&mut g, PixelFormat::Bgra32, 2, 2).unwrap();
        g.node_mut(canvas).state.insert(NodeState::OPTIMIZED);
        g.node_mut(canvas).state.insert(NodeState::EXECUTED);

        update_state(&mut g, canvas).unwrap();
        assert_eq!(g.node(canvas).state, NodeState::DONE);
    }

    #[test]
    fn update_state_is_idempotent() {
        let mut g = Graph::new();
        let canvas = build::add_create_canvas(&mut g, PixelFormat::Bgra32, 2, 2).unwrap();
        g.node_mut(canvas).state.insert(NodeState::OPTIMIZED);
        update_state(&mut g, canvas).unwrap();
        let first = g.node(canvas).state;
        update_state(&mut g, canvas).unwrap();
        assert_eq!(g.node(canvas).state, first);
    }

    #[test]
    fn graph_fully_executed_ignores_tombstones() {
        let mut g = Graph::new();
        let a = build::add_create_canvas(&mut g, PixelFormat::Bgra32, 2, 2).unwrap();
        let b = build::add_create_canvas(&mut g, PixelFormat::Bgra32, 2, 2).unwrap();
        g.node_mut(a).state.insert(NodeState::EXECUTED);
        assert!(!graph_fully_executed(&g));

        g.delete_node(b).unwrap();
        assert!(graph_fully_executed(&g));
    }
}
