//! The append-only graph store.

use smallvec::SmallVec;

use rasterflow_core::{EdgeId, ErrorKind, FlowError, NodeId, ParamsId, PixelFormat};

use crate::node::{Node, NodeState, NodeType};
use crate::params::NodeParams;

/// Role of a directed edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Tombstone for a deleted edge.
    Null,
    /// Carries pixel data from producer to consumer.
    Input,
    /// Delivers a pre-allocated destination bitmap to a mutating primitive.
    Canvas,
}

/// Dimension annotations propagated onto an edge.
///
/// Describes what the edge's *from* node produces. Set exactly once; the
/// graph enforces write-once via [`Graph::annotate_edge`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeDims {
    /// Produced width in pixels (always nonzero once annotated).
    pub width: u32,
    /// Produced height in pixels.
    pub height: u32,
    /// Produced pixel format.
    pub format: PixelFormat,
    /// Whether the produced alpha channel carries real data.
    pub alpha_meaningful: bool,
}

/// One directed connection between two nodes.
#[derive(Clone, Copy, Debug)]
pub struct Edge {
    /// Producer node.
    pub from: NodeId,
    /// Consumer node.
    pub to: NodeId,
    /// Edge role. `Null` marks a tombstone.
    pub kind: EdgeKind,
    pub(crate) dims: Option<EdgeDims>,
}

impl Edge {
    /// The propagated annotations, if set.
    pub fn dims(&self) -> Option<&EdgeDims> {
        self.dims.as_ref()
    }

    /// Whether dimensions have been propagated onto this edge.
    pub fn has_dims(&self) -> bool {
        self.dims.is_some()
    }

    /// Whether this edge is live (not a tombstone).
    pub fn is_live(&self) -> bool {
        self.kind != EdgeKind::Null
    }
}

/// Hard ceiling on node count; exceeding it is a programmer error.
const DEFAULT_MAX_NODES: u32 = 4096;

/// Append-only node/edge arrays with a shared parameter arena.
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    params: Vec<NodeParams>,
    max_nodes: u32,
}

impl Graph {
    /// An empty graph with the default growth ceiling.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            params: Vec::new(),
            max_nodes: DEFAULT_MAX_NODES,
        }
    }

    /// An empty graph with a custom node ceiling.
    pub fn with_max_nodes(max_nodes: u32) -> Self {
        Self {
            max_nodes,
            ..Self::new()
        }
    }

    // ── accessors ────────────────────────────────────────────

    /// Total node slots, tombstones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total edge slots, tombstones included.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The node behind `id`. Panics on an out-of-range ID; IDs are
    /// internal invariants, not caller input.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// The node behind `id`, mutably.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// The edge behind `id`.
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    /// The parameters behind `id`.
    pub fn params(&self, id: ParamsId) -> &NodeParams {
        &self.params[id.index()]
    }

    /// The parameters behind `id`, mutably (codec slots bind lazily).
    pub fn params_mut(&mut self, id: ParamsId) -> &mut NodeParams {
        &mut self.params[id.index()]
    }

    /// Convenience: the parameters of `node`.
    pub fn node_params(&self, node: NodeId) -> &NodeParams {
        self.params(self.node(node).params)
    }

    /// IDs of all live (non-tombstone) nodes, ascending.
    pub fn live_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.kind != NodeType::Null)
            .map(|(i, _)| NodeId(i as u32))
    }

    /// IDs of all live edges, ascending.
    pub fn live_edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_live())
            .map(|(i, _)| EdgeId(i as u32))
    }

    /// Live edges pointing at `node`.
    pub fn inbound_edges(&self, node: NodeId) -> SmallVec<[EdgeId; 4]> {
        self.live_edges()
            .filter(|&e| self.edge(e).to == node)
            .collect()
    }

    /// Live edges leaving `node`.
    pub fn outbound_edges(&self, node: NodeId) -> SmallVec<[EdgeId; 4]> {
        self.live_edges()
            .filter(|&e| self.edge(e).from == node)
            .collect()
    }

    /// First live inbound edge of `kind`, by edge index.
    pub fn first_inbound_of_kind(&self, node: NodeId, kind: EdgeKind) -> Option<EdgeId> {
        self.live_edges()
            .find(|&e| self.edge(e).to == node && self.edge(e).kind == kind)
    }

    /// Number of live inbound edges of `kind`.
    pub fn inbound_count_of_kind(&self, node: NodeId, kind: EdgeKind) -> usize {
        self.live_edges()
            .filter(|&e| self.edge(e).to == node && self.edge(e).kind == kind)
            .count()
    }

    // ── mutation ─────────────────────────────────────────────

    /// Append a node, returning its stable ID.
    pub fn create_node(&mut self, kind: NodeType, params: NodeParams) -> Result<NodeId, FlowError> {
        if self.nodes.len() as u32 >= self.max_nodes {
            return Err(FlowError::new(
                ErrorKind::InvalidInternalState,
                format!("graph exceeded its {} node ceiling", self.max_nodes),
            ));
        }
        let params_id = ParamsId(self.params.len() as u32);
        self.params.push(params);
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            params: params_id,
            state: NodeState::BLANK,
            result: None,
            ticks_elapsed: 0,
        });
        Ok(id)
    }

    /// Append an edge between two live nodes.
    pub fn create_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        kind: EdgeKind,
    ) -> Result<EdgeId, FlowError> {
        if kind == EdgeKind::Null {
            return Err(FlowError::new(
                ErrorKind::InvalidArgument,
                "cannot create a null edge",
            ));
        }
        if from == to {
            return Err(FlowError::new(
                ErrorKind::InvalidGraph,
                format!("self-edge on node {from}"),
            ));
        }
        for id in [from, to] {
            let live = self
                .nodes
                .get(id.index())
                .is_some_and(|n| n.kind != NodeType::Null);
            if !live {
                return Err(FlowError::new(
                    ErrorKind::InvalidInternalState,
                    format!("edge endpoint {id} is not a live node"),
                ));
            }
        }
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge {
            from,
            to,
            kind,
            dims: None,
        });
        Ok(id)
    }

    /// Set an edge's dimension annotations. Write-once: annotating an
    /// already-annotated edge is an internal-state error.
    pub fn annotate_edge(&mut self, edge: EdgeId, dims: EdgeDims) -> Result<(), FlowError> {
        if dims.width == 0 || dims.height == 0 {
            return Err(FlowError::new(
                ErrorKind::InvalidInternalState,
                format!("zero-sized annotation on edge {edge}"),
            ));
        }
        let slot = &mut self.edges[edge.index()];
        if slot.dims.is_some() {
            return Err(FlowError::new(
                ErrorKind::InvalidInternalState,
                format!("edge {edge} already has dimensions"),
            ));
        }
        slot.dims = Some(dims);
        Ok(())
    }

    /// Tombstone an edge.
    pub fn delete_edge(&mut self, edge: EdgeId) -> Result<(), FlowError> {
        let slot = &mut self.edges[edge.index()];
        if !slot.is_live() {
            return Err(FlowError::new(
                ErrorKind::InvalidInternalState,
                format!("edge {edge} already deleted"),
            ));
        }
        slot.kind = EdgeKind::Null;
        slot.dims = None;
        Ok(())
    }

    /// Tombstone a node and every edge touching it.
    pub fn delete_node(&mut self, node: NodeId) -> Result<(), FlowError> {
        if self.node(node).kind == NodeType::Null {
            return Err(FlowError::new(
                ErrorKind::InvalidInternalState,
                format!("node {node} already deleted"),
            ));
        }
        let touching: Vec<EdgeId> = self
            .live_edges()
            .filter(|&e| self.edge(e).from == node || self.edge(e).to == node)
            .collect();
        for e in touching {
            self.delete_edge(e)?;
        }
        let slot = self.node_mut(node);
        slot.kind = NodeType::Null;
        slot.state = NodeState::BLANK;
        slot.result = None;
        Ok(())
    }

    /// Re-create `src`'s edges on `dst`, preserving kind and annotations.
    ///
    /// Inbound edges keep their original producer (`from`, `dst`);
    /// outbound edges keep their original consumer (`dst`, `to`). Used by
    /// the rewriter to splice a replacement subgraph in place of `src`.
    pub fn duplicate_edges_to_another_node(
        &mut self,
        src: NodeId,
        dst: NodeId,
        inbound: bool,
        outbound: bool,
    ) -> Result<(), FlowError> {
        let copies: Vec<Edge> = self
            .live_edges()
            .filter_map(|e| {
                let edge = *self.edge(e);
                if inbound && edge.to == src {
                    Some(Edge { to: dst, ..edge })
                } else if outbound && edge.from == src {
                    Some(Edge { from: dst, ..edge })
                } else {
                    None
                }
            })
            .collect();
        for copy in copies {
            let id = self.create_edge(copy.from, copy.to, copy.kind)?;
            if let Some(dims) = copy.dims {
                self.annotate_edge(id, dims)?;
            }
        }
        Ok(())
    }

    // ── validation ───────────────────────────────────────────

    /// Structural validation: live edges reference live nodes, and the
    /// live subgraph is acyclic. Violations are programmer errors.
    pub fn validate(&self) -> Result<(), FlowError> {
        for e in self.live_edges() {
            let edge = self.edge(e);
            for endpoint in [edge.from, edge.to] {
                let live = self
                    .nodes
                    .get(endpoint.index())
                    .is_some_and(|n| n.kind != NodeType::Null);
                if !live {
                    return Err(FlowError::new(
                        ErrorKind::InvalidInternalState,
                        format!("live edge {e} references dead node {endpoint}"),
                    ));
                }
            }
        }

        // Kahn's algorithm over the live subgraph; leftovers mean a cycle.
        let mut indegree = vec![0usize; self.nodes.len()];
        for e in self.live_edges() {
            indegree[self.edge(e).to.index()] += 1;
        }
        let mut queue: Vec<NodeId> = self
            .live_nodes()
            .filter(|n| indegree[n.index()] == 0)
            .collect();
        let mut seen = 0usize;
        while let Some(n) = queue.pop() {
            seen += 1;
            for e in self.outbound_edges(n) {
                let to = self.edge(e).to;
                indegree[to.index()] -= 1;
                if indegree[to.index()] == 0 {
                    queue.push(to);
                }
            }
        }
        if seen != self.live_nodes().count() {
            return Err(FlowError::new(
                ErrorKind::InvalidGraph,
                "operation graph contains a cycle",
            ));
        }
        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_node_graph() -> (Graph, NodeId, NodeId, EdgeId) {
        let mut g = Graph::new();
        let a = g.create_node(NodeType::Decoder, NodeParams::None).unwrap();
        let b = g
            .create_node(
                NodeType::Scale,
                NodeParams::Size {
                    width: 10,
                    height: 10,
                },
            )
            .unwrap();
        let e = g.create_edge(a, b, EdgeKind::Input).unwrap();
        (g, a, b, e)
    }

    fn dims(w: u32, h: u32) -> EdgeDims {
        EdgeDims {
            width: w,
            height: h,
            format: PixelFormat::Bgra32,
            alpha_meaningful: true,
        }
    }

    // ── structural ops ───────────────────────────────────────

    #[test]
    fn node_ids_are_stable_across_deletion() {
        let (mut g, a, b, _) = two_node_graph();
        let c = g.create_node(NodeType::Encoder, NodeParams::None).unwrap();
        g.create_edge(b, c, EdgeKind::Input).unwrap();
        g.delete_node(b).unwrap();

        // b is a tombstone; a and c keep their indices and live status.
        assert_eq!(g.node(b).kind, NodeType::Null);
        assert_eq!(g.node(a).kind, NodeType::Decoder);
        assert_eq!(g.node(c).kind, NodeType::Encoder);
        assert_eq!(g.live_nodes().count(), 2);
    }

    #[test]
    fn deleting_a_node_tombstones_its_edges() {
        let (mut g, a, b, e) = two_node_graph();
        g.delete_node(b).unwrap();
        assert!(!g.edge(e).is_live());
        assert!(g.outbound_edges(a).is_empty());
        assert_eq!(g.live_edges().count(), 0);
    }

    #[test]
    fn edge_endpoints_must_be_live() {
        let (mut g, a, b, _) = two_node_graph();
        g.delete_node(a).unwrap();
        let err = g.create_edge(a, b, EdgeKind::Input).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInternalState);
    }

    #[test]
    fn self_edges_are_rejected() {
        let mut g = Graph::new();
        let a = g.create_node(NodeType::Clone, NodeParams::None).unwrap();
        assert_eq!(
            g.create_edge(a, a, EdgeKind::Input).unwrap_err().kind,
            ErrorKind::InvalidGraph
        );
    }

    #[test]
    fn node_ceiling_is_enforced() {
        let mut g = Graph::with_max_nodes(2);
        g.create_node(NodeType::Clone, NodeParams::None).unwrap();
        g.create_node(NodeType::Clone, NodeParams::None).unwrap();
        let err = g
            .create_node(NodeType::Clone, NodeParams::None)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInternalState);
    }

    // ── annotations ──────────────────────────────────────────

    #[test]
    fn edge_annotations_are_write_once() {
        let (mut g, _, _, e) = two_node_graph();
        g.annotate_edge(e, dims(100, 50)).unwrap();
        assert_eq!(g.edge(e).dims().unwrap().width, 100);

        let err = g.annotate_edge(e, dims(1, 1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidInternalState);
        // Original annotation survives.
        assert_eq!(g.edge(e).dims().unwrap().width, 100);
    }

    #[test]
    fn zero_sized_annotations_are_rejected() {
        let (mut g, _, _, e) = two_node_graph();
        assert!(g.annotate_edge(e, dims(0, 5)).is_err());
        assert!(!g.edge(e).has_dims());
    }

    // ── splicing ─────────────────────────────────────────────

    #[test]
    fn duplicate_edges_splices_with_annotations() {
        let (mut g, a, b, e) = two_node_graph();
        let c = g.create_node(NodeType::Encoder, NodeParams::None).unwrap();
        let out = g.create_edge(b, c, EdgeKind::Input).unwrap();
        g.annotate_edge(e, dims(100, 50)).unwrap();
        g.annotate_edge(out, dims(10, 10)).unwrap();

        // Replace b with r, splicing inbound and outbound.
        let r = g
            .create_node(NodeType::Render1D, NodeParams::None)
            .unwrap();
        g.duplicate_edges_to_another_node(b, r, true, true).unwrap();
        g.delete_node(b).unwrap();

        let inbound = g.inbound_edges(r);
        assert_eq!(inbound.len(), 1);
        let in_edge = g.edge(inbound[0]);
        assert_eq!(in_edge.from, a);
        assert_eq!(in_edge.dims().unwrap().width, 100);

        let outbound = g.outbound_edges(r);
        assert_eq!(outbound.len(), 1);
        let out_edge = g.edge(outbound[0]);
        assert_eq!(out_edge.to, c);
        assert_eq!(out_edge.dims().unwrap().width, 10);
    }

    #[test]
    fn duplicate_edges_can_split_inbound_from_outbound() {
        let (mut g, a, b, _) = two_node_graph();
        let c = g.create_node(NodeType::Encoder, NodeParams::None).unwrap();
        g.create_edge(b, c, EdgeKind::Input).unwrap();

        let first = g.create_node(NodeType::Render1D, NodeParams::None).unwrap();
        let last = g.create_node(NodeType::Render1D, NodeParams::None).unwrap();
        g.create_edge(first, last, EdgeKind::Input).unwrap();

        g.duplicate_edges_to_another_node(b, first, true, false)
            .unwrap();
        g.duplicate_edges_to_another_node(b, last, false, true)
            .unwrap();
        g.delete_node(b).unwrap();

        assert_eq!(g.edge(g.inbound_edges(first)[0]).from, a);
        assert_eq!(g.edge(g.outbound_edges(last)[0]).to, c);
        g.validate().unwrap();
    }

    // ── queries ──────────────────────────────────────────────

    #[test]
    fn first_inbound_of_kind_distinguishes_canvas() {
        let mut g = Graph::new();
        let src = g.create_node(NodeType::Decoder, NodeParams::None).unwrap();
        let canvas = g
            .create_node(
                NodeType::CreateCanvas,
                NodeParams::CreateCanvas {
                    format: PixelFormat::Bgra32,
                    width: 4,
                    height: 4,
                },
            )
            .unwrap();
        let op = g
            .create_node(NodeType::RenderToCanvas1D, NodeParams::None)
            .unwrap();
        g.create_edge(src, op, EdgeKind::Input).unwrap();
        g.create_edge(canvas, op, EdgeKind::Canvas).unwrap();

        let input = g.first_inbound_of_kind(op, EdgeKind::Input).unwrap();
        let cv = g.first_inbound_of_kind(op, EdgeKind::Canvas).unwrap();
        assert_eq!(g.edge(input).from, src);
        assert_eq!(g.edge(cv).from, canvas);
        assert_eq!(g.inbound_count_of_kind(op, EdgeKind::Input), 1);
        assert_eq!(g.inbound_count_of_kind(op, EdgeKind::Canvas), 1);
    }

    // ── validation ───────────────────────────────────────────

    #[test]
    fn validate_accepts_a_dag() {
        let (g, ..) = two_node_graph();
        g.validate().unwrap();
    }

    #[test]
    fn validate_detects_cycles() {
        let (mut g, a, b, _) = two_node_graph();
        g.create_edge(b, a, EdgeKind::Input).unwrap();
        assert_eq!(g.validate().unwrap_err().kind, ErrorKind::InvalidGraph);
    }
}
