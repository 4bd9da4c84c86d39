//! Per-node-type behavior for the rasterflow engine.
//!
//! One [`NodeDef`] per node type declares arity and up to four behavior
//! callbacks: dimension rule, pre-optimize flatten, post-optimize flatten,
//! and execute. The table is static: dispatch is a match on the type tag,
//! not a vtable. The [`state`] module owns the progress state machine that
//! every engine phase consults.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod def;
mod dims;
mod exec;
mod flatten;
pub mod state;
mod stringify;

pub use def::{
    def_for, execute_node, node_stringify, populate_dimensions_to_edge, post_optimize_flatten,
    pre_optimize_flatten, validate_inputs, BitmapRefs, FlattenRule, NodeDef, OpContext,
    Replacement,
};
pub use state::{graph_fully_executed, input_edges_have_dimensions, update_state};
