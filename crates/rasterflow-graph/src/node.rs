//! Node types, the progress-state bitmask, and the node record.

use std::fmt;

use rasterflow_core::{BitmapId, ParamsId};

/// Boundary below which a type tag is an executable primitive.
pub const NON_PRIMITIVE_NODES_BEGIN: u16 = 256;
/// Boundary below which a type tag may be optimized (primitives included).
pub const NON_OPTIMIZABLE_NODES_BEGIN: u16 = 512;

/// Every operation a graph node can denote.
///
/// Tags partition into three numeric ranges so a single integer comparison
/// answers "is this executable?" and "may this be optimized?":
/// primitives below 256, optimizable non-mutating ops below 512,
/// high-level ops above.
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    /// Tombstone for a deleted node.
    Null = 0,

    // ── executable primitives ────────────────────────────────
    /// Flip the input bitmap vertically, in place.
    FlipVerticalMutate = 1,
    /// Flip the input bitmap horizontally, in place.
    FlipHorizontalMutate = 2,
    /// Produce a header-only window into the input's pixels.
    CropMutateAlias = 3,
    /// Copy a rectangle from the input onto the canvas.
    CopyRectToCanvas = 4,
    /// Allocate a zeroed destination bitmap.
    CreateCanvas = 5,
    /// One separable resampling pass from input onto the canvas.
    RenderToCanvas1D = 6,
    /// Decode the bound input resource into a fresh bitmap.
    PrimitiveDecoder = 7,
    /// Encode the input bitmap into the bound output resource.
    PrimitiveEncoder = 8,
    /// Source or sink backed by an external bitmap reference.
    BitmapPointer = 9,

    // ── optimizable, non-mutating ────────────────────────────
    /// Mirror rows.
    FlipVertical = 256,
    /// Mirror columns.
    FlipHorizontal = 257,
    /// Swap rows and columns.
    Transpose = 258,
    /// Extract a sub-rectangle.
    Crop = 259,
    /// One 1-D resampling pass (canvas not yet materialized).
    Render1D = 260,

    // ── high-level ───────────────────────────────────────────
    /// Resample to a target size.
    Scale = 512,
    /// Rotate 90° clockwise.
    Rotate90 = 513,
    /// Rotate 180°.
    Rotate180 = 514,
    /// Rotate 270° clockwise.
    Rotate270 = 515,
    /// Duplicate the input bitmap.
    Clone = 516,
    /// Decode an image resource (codec chosen lazily).
    Decoder = 517,
    /// Encode to an image resource.
    Encoder = 518,
    /// Stand-in replaced by a concrete I/O node at job time.
    ResourcePlaceholder = 519,
}

impl NodeType {
    /// Whether this node can be executed directly.
    pub fn is_primitive(self) -> bool {
        self != Self::Null && (self as u16) < NON_PRIMITIVE_NODES_BEGIN
    }

    /// Whether the optimizer may touch this node (true for primitives and
    /// optimizable ops, false for high-level ops and tombstones).
    pub fn optimization_allowed(self) -> bool {
        self != Self::Null && (self as u16) < NON_OPTIMIZABLE_NODES_BEGIN
    }

    /// Short lowercase name used by stringification and the dot renderer.
    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "(null)",
            Self::FlipVerticalMutate => "flip vertical mutate",
            Self::FlipHorizontalMutate => "flip horizontal mutate",
            Self::CropMutateAlias => "crop mutate/alias",
            Self::CopyRectToCanvas => "copy rect",
            Self::CreateCanvas => "canvas",
            Self::RenderToCanvas1D => "render1d_p",
            Self::PrimitiveDecoder => "decode_p",
            Self::PrimitiveEncoder => "encode_p",
            Self::BitmapPointer => "bitmap ptr",
            Self::FlipVertical => "flip vertical",
            Self::FlipHorizontal => "flip horizontal",
            Self::Transpose => "transpose",
            Self::Crop => "crop",
            Self::Render1D => "render1d",
            Self::Scale => "scale",
            Self::Rotate90 => "rotate 90",
            Self::Rotate180 => "rotate 180",
            Self::Rotate270 => "rotate 270",
            Self::Clone => "clone",
            Self::Decoder => "decode",
            Self::Encoder => "encode",
            Self::ResourcePlaceholder => "placeholder",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Per-node progress bitmask.
///
/// Bits accumulate monotonically over one graph's lifetime, except across
/// a rewrite that deletes the node. [`update_state`] in the nodes crate is
/// the only sanctioned writer; everything else reads the composed
/// `READY_FOR_*` values.
///
/// [`update_state`]: NodeState::READY_FOR_EXECUTION
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodeState(u8);

impl NodeState {
    /// Freshly created.
    pub const BLANK: Self = Self(0);
    /// Every inbound edge carries dimensions.
    pub const INPUT_DIMENSIONS_KNOWN: Self = Self(1);
    /// Survived (or never needed) the pre-optimize flatten phase.
    pub const PRE_OPTIMIZE_FLATTENED: Self = Self(2);
    /// Seen by the optimizer.
    pub const OPTIMIZED: Self = Self(4);
    /// Survived (or never needed) the post-optimize flatten phase.
    pub const POST_OPTIMIZE_FLATTENED: Self = Self(8);
    /// Every inbound edge's source node has executed.
    pub const INPUTS_EXECUTED: Self = Self(16);
    /// This node's `execute` ran to completion.
    pub const EXECUTED: Self = Self(32);

    /// Eligible for the pre-optimize flatten phase.
    pub const READY_FOR_PRE_OPTIMIZE_FLATTEN: Self = Self(1);
    /// Eligible for the optimizer.
    pub const READY_FOR_OPTIMIZE: Self = Self(1 | 2);
    /// Eligible for the post-optimize flatten phase.
    pub const READY_FOR_POST_OPTIMIZE_FLATTEN: Self = Self(1 | 2 | 4);
    /// Eligible for execution.
    pub const READY_FOR_EXECUTION: Self = Self(1 | 2 | 4 | 8 | 16);
    /// All bits set.
    pub const DONE: Self = Self(63);

    /// Raw bit pattern.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Whether all of `bits` are set.
    pub fn contains(self, bits: Self) -> bool {
        self.0 & bits.0 == bits.0
    }

    /// Set all of `bits`.
    pub fn insert(&mut self, bits: Self) {
        self.0 |= bits.0;
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, Self::DONE.0)
    }
}

/// One vertex of the operation graph.
#[derive(Clone, Debug)]
pub struct Node {
    /// Operation tag. `Null` marks a tombstone.
    pub kind: NodeType,
    /// Slot in the graph's parameter arena.
    pub params: ParamsId,
    /// Progress bitmask, recomputed from graph facts.
    pub state: NodeState,
    /// The bitmap this node produced, once executed.
    pub result: Option<BitmapId>,
    /// Wall-clock ticks spent in this node's dimension and execute calls.
    pub ticks_elapsed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_ranges_partition_cleanly() {
        assert!(NodeType::CreateCanvas.is_primitive());
        assert!(NodeType::RenderToCanvas1D.is_primitive());
        assert!(NodeType::BitmapPointer.is_primitive());
        assert!(!NodeType::FlipVertical.is_primitive());
        assert!(!NodeType::Scale.is_primitive());
        assert!(!NodeType::Null.is_primitive());

        assert!(NodeType::CreateCanvas.optimization_allowed());
        assert!(NodeType::Crop.optimization_allowed());
        assert!(NodeType::Render1D.optimization_allowed());
        assert!(!NodeType::Scale.optimization_allowed());
        assert!(!NodeType::ResourcePlaceholder.optimization_allowed());
        assert!(!NodeType::Null.optimization_allowed());
    }

    #[test]
    fn ready_values_compose_the_expected_bits() {
        assert_eq!(NodeState::READY_FOR_PRE_OPTIMIZE_FLATTEN.bits(), 1);
        assert_eq!(NodeState::READY_FOR_OPTIMIZE.bits(), 3);
        assert_eq!(NodeState::READY_FOR_POST_OPTIMIZE_FLATTEN.bits(), 7);
        assert_eq!(NodeState::READY_FOR_EXECUTION.bits(), 31);
        assert_eq!(NodeState::DONE.bits(), 63);
    }

    #[test]
    fn contains_and_insert() {
        let mut state = NodeState::BLANK;
        assert!(!state.contains(NodeState::INPUT_DIMENSIONS_KNOWN));
        state.insert(NodeState::INPUT_DIMENSIONS_KNOWN);
        state.insert(NodeState::PRE_OPTIMIZE_FLATTENED);
        assert!(state.contains(NodeState::READY_FOR_OPTIMIZE));
        assert!(!state.contains(NodeState::EXECUTED));
    }

    #[test]
    fn state_displays_as_progress_fraction() {
        let mut state = NodeState::BLANK;
        state.insert(NodeState::INPUT_DIMENSIONS_KNOWN);
        assert_eq!(state.to_string(), "1/63");
    }
}
