//! Rules 3 and 4: iteration and de-iteration.
//!
//! Iteration copies a region into its container or any context the container
//! encloses. Vertices inside the region are copied as fresh vertices; edge
//! arguments that point outside the region are kept when the copied edge can
//! still reach them, and are otherwise bridged: a fresh vertex in the copied
//! edge's context, joined to the original by an identity edge placed in the
//! lowest context enclosing both.
//!
//! De-iteration removes a copy that [`correspond`]s to its original, together
//! with the identity edges joining each bridge to the outside vertex it
//! stands for. Any other edge reaching into the copy keeps it in place.

use std::collections::{BTreeMap, BTreeSet};

use crate::alphabet::IDENTITY;
use crate::error::RuleError;
use crate::graph::{Egi, GraphCore};
use crate::id::{ContextId, EdgeId, ElementId, VertexId};

use super::equivalence::correspond;
use super::polarity::remove_region;
use super::selection::Selection;
use super::{Change, RuleEngineConfig, RuleResult};

/// Map a source context of the region to its copy.
fn mapped(map: &BTreeMap<ContextId, ContextId>, ctx: ContextId) -> RuleResult<ContextId> {
    map.get(&ctx).copied().ok_or_else(|| RuleError::InvalidNesting {
        reason: format!("context {ctx} is outside the copied region"),
    })
}

/// Rule 3: copy a region into `target`.
pub(crate) fn iterate(
    core: &mut GraphCore,
    selection: &Selection,
    target: ContextId,
    config: &RuleEngineConfig,
) -> RuleResult<Change> {
    let region = selection.resolve(core, config.max_selection)?;
    if !core.tree().contains(target) {
        return Err(RuleError::NotFound {
            id: ElementId::Cut(target),
        });
    }
    if !core.dominates(region.container, target) {
        return Err(RuleError::InvalidNesting {
            reason: format!(
                "target {target} is not enclosed by {}, the context of the selection",
                region.container
            ),
        });
    }
    if region.contains(ElementId::Cut(target)) {
        return Err(RuleError::InvalidNesting {
            reason: format!("target {target} lies inside the copied region"),
        });
    }

    // Read everything up front; the copies land in the same graph.
    let mut cuts: Vec<(usize, ContextId, ContextId)> = region
        .cuts()
        .filter_map(|c| {
            let context = core.context(c)?;
            Some((context.depth(), c, context.parent()?))
        })
        .collect();
    cuts.sort();
    let vertices: Vec<(VertexId, ContextId, Option<String>)> = region
        .vertices()
        .filter_map(|v| {
            let vertex = core.vertex(v)?;
            Some((v, vertex.context(), vertex.label().map(str::to_string)))
        })
        .collect();
    let edges: Vec<(EdgeId, ContextId, String, Vec<VertexId>)> = region
        .edges()
        .filter_map(|e| {
            let edge = core.edge(e)?;
            Some((e, edge.context(), edge.relation().to_string(), edge.vertices().to_vec()))
        })
        .collect();

    let mut change = Change::default();
    let mut contexts = BTreeMap::from([(region.container, target)]);
    for (_, cut, parent) in cuts {
        let copy = core.add_cut(mapped(&contexts, parent)?)?;
        contexts.insert(cut, copy);
        change.added.insert(ElementId::Cut(copy));
        if region.top.contains(&ElementId::Cut(cut)) {
            change.placed.insert(ElementId::Cut(copy));
        }
    }

    let mut copies: BTreeMap<VertexId, VertexId> = BTreeMap::new();
    for (v, ctx, label) in vertices {
        let copy = core.add_vertex(mapped(&contexts, ctx)?, label)?;
        copies.insert(v, copy);
        change.added.insert(ElementId::Vertex(copy));
        if region.top.contains(&ElementId::Vertex(v)) {
            change.placed.insert(ElementId::Vertex(copy));
        }
    }

    let mut bridges: BTreeMap<(VertexId, ContextId), VertexId> = BTreeMap::new();
    for (e, ctx, relation, args) in edges {
        let at = mapped(&contexts, ctx)?;
        let mut copied_args = Vec::with_capacity(args.len());
        for w in args {
            if let Some(&copy) = copies.get(&w) {
                copied_args.push(copy);
                continue;
            }
            let Some(outside) = core.vertex(w) else {
                return Err(RuleError::NotFound {
                    id: ElementId::Vertex(w),
                });
            };
            let home = outside.context();
            if core.dominates(at, home) {
                copied_args.push(w);
                continue;
            }
            if let Some(&bridge) = bridges.get(&(w, at)) {
                copied_args.push(bridge);
                continue;
            }
            let label = outside.label().map(str::to_string);
            let meet = core
                .tree()
                .lowest_common_ancestor(home, at)
                .ok_or_else(|| RuleError::InvalidNesting {
                    reason: format!("{home} and {at} share no enclosing context"),
                })?;
            let bridge = core.add_vertex(at, label)?;
            let link = core.add_edge(meet, IDENTITY, &[w, bridge])?;
            tracing::trace!(original = %w, bridge = %bridge, link = %link, "bridged outside argument");
            bridges.insert((w, at), bridge);
            change.added.insert(ElementId::Vertex(bridge));
            change.added.insert(ElementId::Edge(link));
            if at == target {
                change.placed.insert(ElementId::Vertex(bridge));
            }
            copied_args.push(bridge);
        }
        let copy = core.add_edge(at, &relation, &copied_args)?;
        change.added.insert(ElementId::Edge(copy));
        if region.top.contains(&ElementId::Edge(e)) {
            change.placed.insert(ElementId::Edge(copy));
        }
    }

    Ok(change)
}

/// Rule 4: remove `copy`, a redundant occurrence of `original`.
pub(crate) fn deiterate(
    egi: &Egi,
    core: &mut GraphCore,
    copy: &Selection,
    original: &Selection,
    config: &RuleEngineConfig,
) -> RuleResult<Change> {
    let copy_region = copy.resolve(egi, config.max_selection)?;
    let original_region = original.resolve(egi, config.max_selection)?;

    if copy_region.is_empty() {
        return Err(RuleError::InvalidNesting {
            reason: "nothing selected to de-iterate".into(),
        });
    }
    if !egi.dominates(original_region.container, copy_region.container) {
        return Err(RuleError::InvalidNesting {
            reason: format!(
                "copy context {} is not enclosed by original context {}",
                copy_region.container, original_region.container
            ),
        });
    }
    if !copy_region.elements.is_disjoint(&original_region.elements) {
        return Err(RuleError::InvalidNesting {
            reason: "copy and original overlap".into(),
        });
    }
    if original_region.contains(ElementId::Cut(copy_region.container)) {
        return Err(RuleError::InvalidNesting {
            reason: "copy lies inside its original".into(),
        });
    }

    let matched = correspond(egi, &copy_region, &original_region)
        .map_err(|reason| RuleError::StructuralMismatch { reason })?;

    let mut links = BTreeSet::new();
    for v in copy_region.vertices() {
        let Some(vertex) = egi.vertex(v) else {
            continue;
        };
        for &e in vertex.incident() {
            if copy_region.contains(e) {
                continue;
            }
            // Only the identity edges joining a bridge to the vertices it
            // stands for go with the copy.
            let is_link = matched.bridges.get(&v).is_some_and(|outside| {
                egi.edge(e).is_some_and(|edge| {
                    edge.is_identity()
                        && edge.vertices().iter().any(|w| outside.contains(w))
                        && edge.vertices().iter().all(|w| *w == v || outside.contains(w))
                })
            });
            if !is_link {
                return Err(RuleError::OpenSelection { vertex: v, edge: e });
            }
            links.insert(e);
        }
    }

    for &e in &links {
        core.remove_edge(e)?;
    }
    remove_region(core, &copy_region)?;

    let mut removed = copy_region.elements;
    removed.extend(links.into_iter().map(ElementId::Edge));
    Ok(Change {
        removed,
        ..Change::default()
    })
}
