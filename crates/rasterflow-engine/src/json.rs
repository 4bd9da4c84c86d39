//! Wire types for the `v1/*` JSON endpoints.
//!
//! A build request carries a node list, an optional edge list, and I/O
//! bindings. When no edges are given, nodes chain sequentially in list
//! order (source first); graphs with joins or canvas edges list edges
//! explicitly by node index.

use serde::Deserialize;

use rasterflow_core::{CodecKind, ErrorKind, FlowError, IoId, PlaceholderId};
use rasterflow_graph::{build, EdgeKind, Graph, NodeType};

/// An HTTP-shaped endpoint response: status code plus UTF-8 JSON body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonResponse {
    /// HTTP-style status code.
    pub status_code: i64,
    /// UTF-8 JSON body.
    pub body: Vec<u8>,
}

/// `v1/build` request payload.
#[derive(Debug, Deserialize)]
pub struct BuildRequest {
    /// The operation graph.
    pub graph: GraphSpec,
    /// Placeholder-to-buffer bindings.
    #[serde(default)]
    pub io: Vec<IoBinding>,
}

/// Node and edge lists of a request graph.
#[derive(Debug, Deserialize)]
pub struct GraphSpec {
    /// Operations, in creation order.
    pub nodes: Vec<NodeSpec>,
    /// Explicit edges by node index; empty means "chain sequentially".
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

/// One operation in a request graph.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeSpec {
    /// Decode an input buffer; codec detected by signature.
    Decode {
        /// The input buffer to read.
        io_id: i32,
    },
    /// Encode into an output buffer.
    Encode {
        /// The output buffer to write.
        io_id: i32,
        /// Container format; raw when omitted.
        #[serde(default)]
        codec: Option<CodecSpec>,
    },
    /// Resample to `w × h`.
    Scale {
        /// Target width.
        w: u32,
        /// Target height.
        h: u32,
    },
    /// Extract `[x1, x2) × [y1, y2)`.
    Crop {
        /// Left edge (inclusive).
        x1: u32,
        /// Top edge (inclusive).
        y1: u32,
        /// Right edge (exclusive).
        x2: u32,
        /// Bottom edge (exclusive).
        y2: u32,
    },
    /// Rotate 90° clockwise.
    #[serde(rename = "rotate_90")]
    Rotate90,
    /// Rotate 180°.
    #[serde(rename = "rotate_180")]
    Rotate180,
    /// Rotate 270° clockwise.
    #[serde(rename = "rotate_270")]
    Rotate270,
    /// Mirror columns.
    FlipH,
    /// Mirror rows.
    FlipV,
    /// Swap rows and columns.
    Transpose,
    /// Duplicate the input bitmap.
    Clone,
    /// Stand-in bound to a resource at job time.
    Placeholder {
        /// The binding index.
        index: i32,
    },
}

/// Container format names on the wire.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CodecSpec {
    /// Engine-native raw bitmap.
    Raw,
    /// PNG.
    Png,
    /// JPEG.
    Jpeg,
    /// GIF.
    Gif,
}

impl From<CodecSpec> for CodecKind {
    fn from(spec: CodecSpec) -> Self {
        match spec {
            CodecSpec::Raw => CodecKind::RawBitmap,
            CodecSpec::Png => CodecKind::Png,
            CodecSpec::Jpeg => CodecKind::Jpeg,
            CodecSpec::Gif => CodecKind::Gif,
        }
    }
}

/// One explicit edge between request nodes.
#[derive(Debug, Deserialize)]
pub struct EdgeSpec {
    /// Producer node index.
    pub from: u32,
    /// Consumer node index.
    pub to: u32,
    /// Edge role; input when omitted.
    #[serde(default)]
    pub kind: EdgeKindSpec,
}

/// Edge role names on the wire.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKindSpec {
    /// Pixel data edge.
    #[default]
    Input,
    /// Pre-allocated destination edge.
    Canvas,
}

/// A placeholder-to-buffer binding; direction comes from the registered
/// buffer.
#[derive(Debug, Deserialize)]
pub struct IoBinding {
    /// Placeholder index in the graph.
    pub placeholder_id: i32,
    /// The bound buffer.
    pub io_id: i32,
}

/// Materialize a request graph.
pub fn build_graph(spec: &GraphSpec) -> Result<Graph, FlowError> {
    let mut g = Graph::new();
    let chain = spec.edges.is_empty();
    let mut ids = Vec::with_capacity(spec.nodes.len());

    for node in &spec.nodes {
        // Source nodes never auto-chain from a predecessor.
        let takes_input = !matches!(node, NodeSpec::Decode { .. });
        let prev = if chain && takes_input {
            ids.last().copied()
        } else {
            None
        };
        let id = match node {
            NodeSpec::Decode { io_id } => build::add_decoder(&mut g, IoId(*io_id))?,
            NodeSpec::Encode { io_id, codec } => build::add_encoder(
                &mut g,
                prev,
                IoId(*io_id),
                codec.map(CodecKind::from).unwrap_or(CodecKind::RawBitmap),
            )?,
            NodeSpec::Scale { w, h } => build::add_scale(&mut g, prev, *w, *h)?,
            NodeSpec::Crop { x1, y1, x2, y2 } => {
                build::add_crop(&mut g, prev, *x1, *y1, *x2, *y2)?
            }
            NodeSpec::Rotate90 => build::add_generic(&mut g, prev, NodeType::Rotate90)?,
            NodeSpec::Rotate180 => build::add_generic(&mut g, prev, NodeType::Rotate180)?,
            NodeSpec::Rotate270 => build::add_generic(&mut g, prev, NodeType::Rotate270)?,
            NodeSpec::FlipH => build::add_generic(&mut g, prev, NodeType::FlipHorizontal)?,
            NodeSpec::FlipV => build::add_generic(&mut g, prev, NodeType::FlipVertical)?,
            NodeSpec::Transpose => build::add_generic(&mut g, prev, NodeType::Transpose)?,
            NodeSpec::Clone => build::add_generic(&mut g, prev, NodeType::Clone)?,
            NodeSpec::Placeholder { index } => {
                build::add_placeholder(&mut g, prev, PlaceholderId(*index))?
            }
        };
        ids.push(id);
    }

    for edge in &spec.edges {
        let resolve = |index: u32| {
            ids.get(index as usize).copied().ok_or_else(|| {
                FlowError::new(
                    ErrorKind::InvalidGraph,
                    format!("edge references node index {index}, graph has {}", ids.len()),
                )
            })
        };
        let kind = match edge.kind {
            EdgeKindSpec::Input => EdgeKind::Input,
            EdgeKindSpec::Canvas => EdgeKind::Canvas,
        };
        g.create_edge(resolve(edge.from)?, resolve(edge.to)?, kind)?;
    }
    Ok(g)
}

/// A successful response body.
pub(crate) fn ok_response(data: serde_json::Value) -> JsonResponse {
    let body = serde_json::json!({ "success": true, "data": data });
    JsonResponse {
        status_code: 200,
        body: body.to_string().into_bytes(),
    }
}

/// An error response body mapped through the HTTP table.
pub(crate) fn error_response(error: &FlowError) -> JsonResponse {
    let body = serde_json::json!({
        "success": false,
        "error": {
            "kind": error.kind.to_string(),
            "code": error.kind as i32,
            "message": error.message,
        }
    });
    JsonResponse {
        status_code: i64::from(error.kind.http_code()),
        body: body.to_string().into_bytes(),
    }
}
