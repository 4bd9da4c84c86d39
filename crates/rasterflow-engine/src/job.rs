//! Jobs: one operation graph plus its resources and recording state.

use std::sync::atomic::{AtomicI32, Ordering};

use rasterflow_core::{CodecKind, IoId, NodeId, PlaceholderId};
use rasterflow_codecs::IoDirection;
use rasterflow_graph::Graph;

use crate::recording::{FrameSink, RecordingConfig, RecordingState};

/// Monotonic debug-ID source for jobs in this process.
static NEXT_JOB_ID: AtomicI32 = AtomicI32::new(0);

/// Pass ceiling: the fixpoint loop must converge within this many passes.
pub const DEFAULT_MAX_PASSES: u32 = 6;

/// What backs a job resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    /// A registered I/O buffer; inputs decode, outputs encode.
    Buffer {
        /// The registered buffer.
        io_id: IoId,
        /// Container preference; `None` detects (inputs) or defaults to
        /// the raw container (outputs).
        codec: Option<CodecKind>,
    },
    /// An external bitmap reference slot.
    Bitmap {
        /// Slot in the context's bitmap-reference table.
        slot: u32,
    },
}

/// One resource to bind to the graph's placeholder nodes.
#[derive(Clone, Copy, Debug)]
pub struct JobResource {
    /// Placeholder index this resource matches.
    pub placeholder_id: PlaceholderId,
    /// Whether data flows in or out.
    pub direction: IoDirection,
    /// Backing storage.
    pub kind: ResourceKind,
}

/// A unit of work: the graph, its resources, and per-job knobs.
pub struct Job {
    graph: Graph,
    resources: Vec<JobResource>,
    max_passes: u32,
    pub(crate) recording: RecordingState,
}

impl Job {
    /// Wrap `graph` in a fresh job with a unique debug ID.
    pub fn new(graph: Graph) -> Self {
        let debug_id = NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            graph,
            resources: Vec::new(),
            max_passes: DEFAULT_MAX_PASSES,
            recording: RecordingState::new(debug_id),
        }
    }

    /// The job's debug ID (used in recording artifact names).
    pub fn debug_id(&self) -> i32 {
        self.recording.debug_id
    }

    /// The operation graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The operation graph, mutably.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Registered resources.
    pub fn resources(&self) -> &[JobResource] {
        &self.resources
    }

    /// Bind a buffer resource to a placeholder index.
    pub fn add_buffer_resource(
        &mut self,
        placeholder_id: PlaceholderId,
        direction: IoDirection,
        io_id: IoId,
        codec: Option<CodecKind>,
    ) {
        self.resources.push(JobResource {
            placeholder_id,
            direction,
            kind: ResourceKind::Buffer { io_id, codec },
        });
    }

    /// Bind an external bitmap reference slot to a placeholder index.
    pub fn add_bitmap_resource(
        &mut self,
        placeholder_id: PlaceholderId,
        direction: IoDirection,
        slot: u32,
    ) {
        self.resources.push(JobResource {
            placeholder_id,
            direction,
            kind: ResourceKind::Bitmap { slot },
        });
    }

    /// The fixpoint pass ceiling.
    pub fn max_passes(&self) -> u32 {
        self.max_passes
    }

    /// Override the pass ceiling (tests mostly).
    pub fn set_max_passes(&mut self, max_passes: u32) {
        self.max_passes = max_passes;
    }

    /// Enable or disable debug recording.
    pub fn set_recording(&mut self, config: RecordingConfig) {
        self.recording.config = config;
    }

    /// Install a frame sink for `record_frame_images`.
    pub fn set_frame_sink(&mut self, sink: Box<dyn FrameSink>) {
        self.recording.frame_sink = Some(sink);
    }

    /// Elapsed ticks per executed node, for profiling summaries.
    pub fn node_timings(&self) -> Vec<(NodeId, u64)> {
        self.graph
            .live_nodes()
            .map(|n| (n, self.graph.node(n).ticks_elapsed))
            .collect()
    }

    /// Split borrows for the pass loop: graph, resources, recording.
    pub(crate) fn split_mut(
        &mut self,
    ) -> (&mut Graph, &[JobResource], &mut RecordingState) {
        (&mut self.graph, &self.resources, &mut self.recording)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jobs_get_distinct_debug_ids() {
        let a = Job::new(Graph::new());
        let b = Job::new(Graph::new());
        assert_ne!(a.debug_id(), b.debug_id());
    }

    #[test]
    fn defaults_match_engine_conventions() {
        let job = Job::new(Graph::new());
        assert_eq!(job.max_passes(), 6);
        assert!(!job.recording.config.record_graph_versions);
        assert!(job.resources().is_empty());
    }
}
