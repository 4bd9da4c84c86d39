//! Debug recording: graph version snapshots and frame capture.
//!
//! Off by default. When graph recording is on, every structural change
//! writes `job_<id>_graph_version_<v>.dot` into the working directory,
//! capped at [`MAX_GRAPH_VERSIONS`]; a version identical to its
//! predecessor is discarded and the counter rewinds. Frame capture routes
//! decoded/rendered bitmaps through an embedder-installed [`FrameSink`]
//! (the PNG writer itself is an external capability).

use std::fs;
use std::path::PathBuf;

use rasterflow_bitmap::PixelView;
use rasterflow_core::{ErrorKind, FlowError, NodeId};
use rasterflow_graph::{dot, Graph};
use rasterflow_nodes::node_stringify;

/// Snapshot cap per job; production jobs should not record at all.
pub const MAX_GRAPH_VERSIONS: u32 = 100;

/// Which debug artifacts a job produces.
#[derive(Clone, Copy, Debug, Default)]
pub struct RecordingConfig {
    /// Write a `.dot` file per graph version.
    pub record_graph_versions: bool,
    /// Push each executed node's result bitmap into the frame sink.
    pub record_frame_images: bool,
}

/// Receives executed nodes' result bitmaps when frame recording is on.
/// `Send + Sync` because jobs (and their sinks) live inside contexts
/// that sit behind the FFI's read-write lock.
pub trait FrameSink: Send + Sync {
    /// Called once per executed node that produced a bitmap.
    fn write_frame(
        &mut self,
        job_id: i32,
        node: NodeId,
        frame: &PixelView<'_>,
    ) -> Result<(), FlowError>;
}

/// Mutable recording state carried by a job.
pub struct RecordingState {
    /// Job debug ID used in artifact names.
    pub debug_id: i32,
    /// Next graph version number to write.
    pub next_graph_version: u32,
    /// Enabled artifacts.
    pub config: RecordingConfig,
    /// Frame receiver, when installed.
    pub frame_sink: Option<Box<dyn FrameSink>>,
}

impl RecordingState {
    pub(crate) fn new(debug_id: i32) -> Self {
        Self {
            debug_id,
            next_graph_version: 0,
            config: RecordingConfig::default(),
            frame_sink: None,
        }
    }
}

fn version_path(debug_id: i32, version: u32) -> PathBuf {
    PathBuf::from(format!("job_{debug_id}_graph_version_{version}.dot"))
}

/// Record a graph snapshot if recording is enabled and the graph actually
/// changed since the previous version.
pub(crate) fn notify_graph_changed(
    state: &mut RecordingState,
    g: &Graph,
) -> Result<(), FlowError> {
    if !state.config.record_graph_versions || state.next_graph_version > MAX_GRAPH_VERSIONS {
        return Ok(());
    }
    let mut rendered = Vec::new();
    dot::write_dot(g, &mut rendered, |g, n| node_stringify(g, n)).map_err(|e| {
        FlowError::new(ErrorKind::IoError, format!("dot rendering failed: {e}"))
    })?;

    let version = state.next_graph_version;
    if version > 0 {
        let previous = version_path(state.debug_id, version - 1);
        if let Ok(prev) = fs::read(&previous) {
            if prev == rendered {
                // Unchanged graph; reuse this version number next time.
                return Ok(());
            }
        }
    }
    let path = version_path(state.debug_id, version);
    fs::write(&path, &rendered).map_err(|e| {
        FlowError::new(
            ErrorKind::IoError,
            format!("failed to write {}: {e}", path.display()),
        )
    })?;
    log::debug!(
        "job {}: recorded graph version {version}",
        state.debug_id
    );
    state.next_graph_version += 1;
    Ok(())
}

/// Push an executed node's result into the frame sink, if configured.
pub(crate) fn notify_node_complete(
    state: &mut RecordingState,
    frame: Option<&PixelView<'_>>,
    node: NodeId,
) -> Result<(), FlowError> {
    if !state.config.record_frame_images {
        return Ok(());
    }
    if let (Some(sink), Some(frame)) = (state.frame_sink.as_mut(), frame) {
        sink.write_frame(state.debug_id, node, frame)?;
    }
    Ok(())
}
