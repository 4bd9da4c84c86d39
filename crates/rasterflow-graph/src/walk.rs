//! Dependency-ordered graph traversal.
//!
//! One walker serves dimension propagation, both flatten phases, the
//! optimizer, and the executor. A node is visited only once every live
//! inbound edge has been *released*: its producer visited and neither the
//! producer's node visit nor the edge visit asked to prune. Visitors that
//! rewrite the graph return `quit`; the calling phase restarts the walk
//! from scratch, because fresh node IDs may now exist.

use rasterflow_core::{EdgeId, FlowError, NodeId};

use crate::graph::Graph;

/// What a visitor asks of the walker.
#[derive(Clone, Copy, Debug, Default)]
pub struct VisitFlags {
    /// Abort the traversal entirely (the caller usually restarts).
    pub quit: bool,
    /// Do not descend through this node's (or edge's) outbound paths in
    /// this walk.
    pub skip_outbound: bool,
}

impl VisitFlags {
    /// Continue normally.
    pub fn proceed() -> Self {
        Self::default()
    }

    /// Abort the walk.
    pub fn quit() -> Self {
        Self {
            quit: true,
            skip_outbound: false,
        }
    }

    /// Prune this branch for the rest of the walk.
    pub fn skip_outbound() -> Self {
        Self {
            quit: false,
            skip_outbound: true,
        }
    }
}

/// How a walk finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkEnd {
    /// Every reachable node was visited.
    Completed,
    /// A visitor asked to quit.
    Quit,
}

#[derive(Clone, Copy, PartialEq)]
enum EdgeMark {
    Pending,
    Released,
    Blocked,
}

/// Walk `g` dependency-wise, calling `visit_node` on each ready node and
/// `visit_edge` on each outbound edge of a visited, unpruned node.
///
/// Node and edge sets are snapshotted at entry; visitors that create nodes
/// or edges must return [`VisitFlags::quit`] so the caller can re-walk.
/// Nodes left unreachable by pruning (or by a cycle, which
/// [`Graph::validate`] rejects separately) are simply not visited.
pub fn walk_dependency_wise<N, E>(
    g: &mut Graph,
    mut visit_node: N,
    mut visit_edge: E,
) -> Result<WalkEnd, FlowError>
where
    N: FnMut(&mut Graph, NodeId) -> Result<VisitFlags, FlowError>,
    E: FnMut(&mut Graph, EdgeId) -> Result<VisitFlags, FlowError>,
{
    let node_snapshot = g.node_count();
    let edge_snapshot = g.edge_count();
    let mut visited = vec![false; node_snapshot];
    let mut marks = vec![EdgeMark::Pending; edge_snapshot];

    loop {
        let mut progress = false;
        for index in 0..node_snapshot {
            let id = NodeId(index as u32);
            if visited[index] || !is_live(g, id) {
                continue;
            }
            let ready = g
                .inbound_edges(id)
                .iter()
                .all(|e| e.index() < edge_snapshot && marks[e.index()] == EdgeMark::Released);
            if !ready {
                continue;
            }

            visited[index] = true;
            progress = true;

            let flags = visit_node(g, id)?;
            if flags.quit {
                return Ok(WalkEnd::Quit);
            }

            // The node may have been deleted by its own visitor; its
            // outbound edges are tombstones then and skipped below.
            let outbound = g.outbound_edges(id);
            for e in outbound {
                if e.index() >= edge_snapshot {
                    continue;
                }
                if flags.skip_outbound {
                    marks[e.index()] = EdgeMark::Blocked;
                    continue;
                }
                let eflags = visit_edge(g, e)?;
                if eflags.quit {
                    return Ok(WalkEnd::Quit);
                }
                marks[e.index()] = if eflags.skip_outbound {
                    EdgeMark::Blocked
                } else {
                    EdgeMark::Released
                };
            }
        }
        if !progress {
            return Ok(WalkEnd::Completed);
        }
    }
}

fn is_live(g: &Graph, id: NodeId) -> bool {
    g.node(id).kind != crate::node::NodeType::Null
}
