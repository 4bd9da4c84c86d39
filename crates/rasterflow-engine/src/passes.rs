//! The per-job fixpoint loop and its phase visitors.
//!
//! Each pass runs: propagate dimensions → pre-optimize flatten →
//! propagate → optimize → propagate → post-optimize flatten → propagate →
//! execute, until every node is executed or the pass ceiling trips. All
//! phases ride the same dependency-wise walker; the state machine decides
//! what each node is eligible for.

use std::time::Instant;

use rasterflow_core::{EdgeId, ErrorKind, FlowError, NodeId};
use rasterflow_graph::{walk_dependency_wise, Graph, NodeState, VisitFlags};
use rasterflow_nodes::{
    execute_node, populate_dimensions_to_edge, post_optimize_flatten, pre_optimize_flatten,
    update_state, OpContext,
};

use crate::recording::{self, RecordingState};

fn proceed_node(_: &mut Graph, _: NodeId) -> Result<VisitFlags, FlowError> {
    Ok(VisitFlags::proceed())
}

fn proceed_edge(_: &mut Graph, _: EdgeId) -> Result<VisitFlags, FlowError> {
    Ok(VisitFlags::proceed())
}

/// Annotate every edge whose producer already knows its dimensions.
///
/// Edges that cannot be populated prune their downstream subtree for this
/// pass; each successful annotation triggers a recording snapshot.
pub fn populate_dimensions_where_certain(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    rec: &mut RecordingState,
) -> Result<(), FlowError> {
    walk_dependency_wise(g, proceed_node, |g, edge| {
        if g.edge(edge).has_dims() {
            return Ok(VisitFlags::proceed());
        }
        let from = g.edge(edge).from;
        update_state(g, from)?;
        if g.node(from)
            .state
            .contains(NodeState::INPUT_DIMENSIONS_KNOWN)
        {
            let start = Instant::now();
            populate_dimensions_to_edge(ctx, g, from, edge, false)?;
            g.node_mut(from).ticks_elapsed += start.elapsed().as_nanos() as u64;
        }
        if g.edge(edge).has_dims() {
            recording::notify_graph_changed(rec, g)?;
            Ok(VisitFlags::proceed())
        } else {
            // Nothing downstream of this edge can make progress yet.
            Ok(VisitFlags::skip_outbound())
        }
    })
    .map(|_| ())
}

fn flatten_pass(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    post_optimize: bool,
) -> Result<(), FlowError> {
    loop {
        let mut rewrote = false;
        walk_dependency_wise(
            g,
            |g, node| {
                update_state(g, node)?;
                let state = g.node(node).state;
                let ready = if post_optimize {
                    state == NodeState::READY_FOR_POST_OPTIMIZE_FLATTEN
                } else {
                    state == NodeState::READY_FOR_PRE_OPTIMIZE_FLATTEN
                };
                if ready {
                    if post_optimize {
                        post_optimize_flatten(ctx, g, node)?;
                    } else {
                        pre_optimize_flatten(ctx, g, node)?;
                    }
                    g.validate()?;
                    // Fresh node IDs exist now; restart the walk.
                    rewrote = true;
                    Ok(VisitFlags::quit())
                } else if !state.contains(NodeState::INPUT_DIMENSIONS_KNOWN) {
                    // Cannot flatten past missing dimensions.
                    Ok(VisitFlags::skip_outbound())
                } else {
                    Ok(VisitFlags::proceed())
                }
            },
            proceed_edge,
        )?;
        if !rewrote {
            return Ok(());
        }
    }
}

/// Lower high-level nodes into optimizable/primitive nodes.
pub fn graph_pre_optimize_flatten(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
) -> Result<(), FlowError> {
    flatten_pass(ctx, g, false)
}

/// Lower optimizable nodes into primitives, deciding clone-vs-mutate.
pub fn graph_post_optimize_flatten(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
) -> Result<(), FlowError> {
    flatten_pass(ctx, g, true)
}

/// Mark eligible nodes optimized.
///
/// No structural rewrites yet; fusions would land here and may only
/// rewire input edges between optimizable nodes.
pub fn graph_optimize(g: &mut Graph) -> Result<(), FlowError> {
    walk_dependency_wise(
        g,
        |g, node| {
            update_state(g, node)?;
            if g.node(node).state == NodeState::READY_FOR_OPTIMIZE {
                g.node_mut(node).state.insert(NodeState::OPTIMIZED);
            }
            Ok(VisitFlags::proceed())
        },
        proceed_edge,
    )
    .map(|_| ())
}

/// Execute every primitive whose state says it is ready.
///
/// Cancellation is observed between nodes; a node that stays unexecuted
/// prunes its downstream subtree for this pass.
pub fn execute_where_certain(
    ctx: &mut OpContext<'_>,
    g: &mut Graph,
    rec: &mut RecordingState,
) -> Result<(), FlowError> {
    walk_dependency_wise(
        g,
        |g, node| {
            update_state(g, node)?;
            let state = g.node(node).state;
            if !state.contains(NodeState::EXECUTED) && state == NodeState::READY_FOR_EXECUTION {
                ctx.cancel.check()?;
                let start = Instant::now();
                execute_node(ctx, g, node)?;
                g.node_mut(node).ticks_elapsed += start.elapsed().as_nanos() as u64;

                let frame = match g.node(node).result {
                    Some(bitmap) => Some(ctx.pool.view(bitmap)?),
                    None => None,
                };
                recording::notify_node_complete(rec, frame.as_ref(), node)?;
            }
            if g.node(node).state.contains(NodeState::EXECUTED) {
                Ok(VisitFlags::proceed())
            } else {
                Ok(VisitFlags::skip_outbound())
            }
        },
        proceed_edge,
    )
    .map(|_| ())
}

/// Drive one job to completion: bind resources, then loop the phases
/// until everything executed or the ceiling trips.
pub fn run_job(
    ctx: &mut OpContext<'_>,
    job_graph: &mut Graph,
    resources: &[crate::job::JobResource],
    rec: &mut RecordingState,
    max_passes: u32,
) -> Result<(), FlowError> {
    ctx.cancel.check()?;
    crate::binder::insert_resources(job_graph, resources, rec)?;
    recording::notify_graph_changed(rec, job_graph)?;

    let mut passes = 0u32;
    while !rasterflow_nodes::graph_fully_executed(job_graph) {
        if passes >= max_passes {
            return Err(FlowError::new(
                ErrorKind::MaximumGraphPassesExceeded,
                format!("graph did not converge within {max_passes} passes"),
            ));
        }
        log::debug!("job pass {passes} starting");
        populate_dimensions_where_certain(ctx, job_graph, rec)?;
        recording::notify_graph_changed(rec, job_graph)?;

        graph_pre_optimize_flatten(ctx, job_graph)?;
        recording::notify_graph_changed(rec, job_graph)?;
        populate_dimensions_where_certain(ctx, job_graph, rec)?;

        graph_optimize(job_graph)?;
        populate_dimensions_where_certain(ctx, job_graph, rec)?;

        graph_post_optimize_flatten(ctx, job_graph)?;
        recording::notify_graph_changed(rec, job_graph)?;
        populate_dimensions_where_certain(ctx, job_graph, rec)?;

        execute_where_certain(ctx, job_graph, rec)?;
        recording::notify_graph_changed(rec, job_graph)?;
        passes += 1;
    }
    Ok(())
}
