//! The operation graph: nodes, edges, parameters, and traversal.
//!
//! A graph is a pair of append-only arrays (nodes, edges) plus a parameter
//! arena. Deletion tombstones entries instead of compacting, so every
//! `NodeId`/`EdgeId`/`ParamsId` stays valid across structural rewrites,
//! the property the flattener depends on. The [`walk`] module provides the
//! dependency-ordered traversal primitive shared by dimension propagation,
//! flattening, optimization, and execution.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod build;
pub mod dot;
pub mod graph;
pub mod node;
pub mod params;
pub mod walk;

pub use graph::{Edge, EdgeDims, EdgeKind, Graph};
pub use node::{Node, NodeState, NodeType};
pub use params::{CodecParams, CopyRectParams, NodeParams, Render1DParams};
pub use walk::{walk_dependency_wise, VisitFlags, WalkEnd};
