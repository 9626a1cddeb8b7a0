//! Rules 7 and 8: heavy dots.

use std::collections::BTreeSet;

use crate::error::RuleError;
use crate::graph::GraphCore;
use crate::id::{ContextId, ElementId, VertexId};

use super::{Change, RuleResult};

/// Rule 7: add a vertex with no incident edges. Any context will do.
pub(crate) fn add(core: &mut GraphCore, context: ContextId, label: Option<String>) -> RuleResult<Change> {
    if !core.tree().contains(context) {
        return Err(RuleError::NotFound {
            id: ElementId::Cut(context),
        });
    }
    let v = core.add_vertex(context, label)?;
    let added = BTreeSet::from([ElementId::Vertex(v)]);
    Ok(Change {
        placed: added.clone(),
        added,
        ..Change::default()
    })
}

/// Rule 8: remove a vertex whose incident-edge set is empty.
pub(crate) fn remove(core: &mut GraphCore, vertex: VertexId) -> RuleResult<Change> {
    let incident = core
        .vertex(vertex)
        .ok_or(RuleError::NotFound {
            id: ElementId::Vertex(vertex),
        })?
        .incident()
        .len();
    if incident > 0 {
        return Err(RuleError::NotIsolated { vertex, incident });
    }
    core.remove_vertex(vertex)?;
    Ok(Change {
        removed: BTreeSet::from([ElementId::Vertex(vertex)]),
        ..Change::default()
    })
}
