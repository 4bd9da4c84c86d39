//! Rasterflow: a graph-based raster image processing engine.
//!
//! Clients build an operation graph (decode, scale, crop, rotate, flip,
//! composite, encode), attach input and output buffers, and submit the
//! job. The engine lowers the graph into executable primitives, runs them
//! in dependency order, and fills the output buffers with encoded images.
//!
//! This is the top-level facade crate re-exporting the public API of all
//! rasterflow sub-crates; adding `rasterflow` as a single dependency is
//! enough for most users.
//!
//! # Quick start
//!
//! ```rust
//! use rasterflow::prelude::*;
//! use rasterflow::graph::build;
//!
//! // A 2x2 gray image in the engine's raw container:
//! // magic, width, height, format code, alpha flag, pixel rows.
//! let mut input = b"rfb1".to_vec();
//! input.extend_from_slice(&2u32.to_le_bytes());
//! input.extend_from_slice(&2u32.to_le_bytes());
//! input.push(1); // gray8
//! input.push(0); // alpha not meaningful
//! input.extend_from_slice(&[10, 20, 30, 40]);
//!
//! let mut ctx = Context::new();
//! ctx.add_input_buffer(IoId(0), InputBytes::Owned(input)).unwrap();
//! ctx.add_output_buffer(IoId(1)).unwrap();
//!
//! // decode → flip vertically → encode.
//! let mut g = Graph::new();
//! let decode = build::add_decoder(&mut g, IoId(0)).unwrap();
//! let flip = build::add_generic(&mut g, Some(decode), NodeType::FlipVertical).unwrap();
//! build::add_encoder(&mut g, Some(flip), IoId(1), CodecKind::RawBitmap).unwrap();
//!
//! let mut job = Job::new(g);
//! ctx.execute_job(&mut job).unwrap();
//!
//! let output = ctx.get_output_buffer(IoId(1)).unwrap();
//! assert_eq!(&output[14..], &[30, 40, 10, 20]); // rows swapped
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `rasterflow-core` | IDs, errors, cancellation, pixel vocabulary |
//! | [`bitmap`] | `rasterflow-bitmap` | Bitmap pool, allocator, views |
//! | [`graph`] | `rasterflow-graph` | Graph store, walker, builders |
//! | [`render`] | `rasterflow-render` | Pixel kernels |
//! | [`codecs`] | `rasterflow-codecs` | Codec traits, registry, I/O buffers |
//! | [`nodes`] | `rasterflow-nodes` | Node behavior table and state machine |
//! | [`engine`] | `rasterflow-engine` | Context, jobs, passes, JSON endpoints |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core IDs, errors, cancellation, and pixel vocabulary
/// (`rasterflow-core`).
pub use rasterflow_core as types;

/// Bitmap storage and allocation accounting (`rasterflow-bitmap`).
pub use rasterflow_bitmap as bitmap;

/// The operation graph and its traversal (`rasterflow-graph`).
pub use rasterflow_graph as graph;

/// Pixel kernels: flips, blits, resampling (`rasterflow-render`).
pub use rasterflow_render as render;

/// Codec capability traits and I/O buffers (`rasterflow-codecs`).
pub use rasterflow_codecs as codecs;

/// Per-node-type behavior and the state machine (`rasterflow-nodes`).
pub use rasterflow_nodes as nodes;

/// The job context and execution engine (`rasterflow-engine`).
pub use rasterflow_engine as engine;

/// Common imports for typical rasterflow usage.
///
/// ```rust
/// use rasterflow::prelude::*;
/// ```
pub mod prelude {
    // Context and jobs
    pub use rasterflow_engine::{
        abi_compatible, Context, FrameSink, Job, JsonResponse, RecordingConfig,
    };

    // Graph building
    pub use rasterflow_graph::{Graph, NodeParams, NodeState, NodeType};

    // Core vocabulary
    pub use rasterflow_core::{
        CancelToken, CodecKind, ErrorKind, Filter, Floatspace, FlowError, IoId, NodeId,
        PixelFormat, PlaceholderId,
    };

    // I/O
    pub use rasterflow_codecs::{InputBytes, IoDirection};

    // Bitmap access
    pub use rasterflow_bitmap::{BitmapPool, PixelView, PixelViewMut};
}
