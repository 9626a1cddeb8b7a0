//! Traversal contract and snapshot export.
//!
//! Printers and layout engines read an EGI through [`GraphCore`]'s accessors
//! or take a flat [`EgiSnapshot`]: contexts in tree order, vertices, edges and
//! ligature components, as plain serde values suitable for JSON export.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::context::Polarity;
use crate::error::GraphError;
use crate::id::{ContextId, EdgeId, ElementId, VertexId};
use crate::ligature::LigatureId;

use super::{Egi, GraphCore, GraphResult};

/// Exported context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub id: ContextId,
    /// `None` for the sheet.
    pub parent: Option<ContextId>,
    pub depth: usize,
    pub polarity: Polarity,
    /// Direct child cuts.
    pub children: Vec<ContextId>,
    /// Directly enclosed elements (cuts included).
    pub enclosed: Vec<ElementId>,
}

/// Exported vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexSnapshot {
    pub id: VertexId,
    pub context: ContextId,
    pub constant: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub incident: Vec<EdgeId>,
    pub ligature: LigatureId,
}

/// Exported edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub id: EdgeId,
    pub context: ContextId,
    pub relation: String,
    pub arity: usize,
    /// Incident vertices in argument order.
    pub vertices: Vec<VertexId>,
    pub identity: bool,
}

/// Exported ligature component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LigatureSnapshot {
    pub id: LigatureId,
    pub members: Vec<VertexId>,
    pub identity_edges: Vec<EdgeId>,
}

/// The whole traversal contract as one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EgiSnapshot {
    pub sheet: ContextId,
    /// Pre-order from the sheet.
    pub contexts: Vec<ContextSnapshot>,
    pub vertices: Vec<VertexSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
    pub ligatures: Vec<LigatureSnapshot>,
}

impl EgiSnapshot {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> GraphResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| GraphError::Serialization {
            message: e.to_string(),
        })
    }

    pub fn from_json(json: &str) -> GraphResult<Self> {
        serde_json::from_str(json).map_err(|e| GraphError::Serialization {
            message: e.to_string(),
        })
    }
}

impl GraphCore {
    /// Every element transitively enclosed by `ctx`, in context pre-order.
    ///
    /// Unlike [`GraphCore::enclosed_transitively`] this keeps traversal order:
    /// a cut always precedes the elements it encloses.
    pub fn region(&self, ctx: ContextId) -> Vec<ElementId> {
        self.tree
            .descendants(ctx)
            .into_iter()
            .filter_map(|c| self.tree.get(c))
            .flat_map(|c| c.enclosed().iter().copied())
            .collect()
    }

    /// Vertices directly enclosed by `ctx`.
    pub fn vertices_in(&self, ctx: ContextId) -> impl Iterator<Item = VertexId> + '_ {
        self.tree
            .get(ctx)
            .into_iter()
            .flat_map(|c| c.enclosed().iter().filter_map(|el| el.as_vertex()))
    }

    /// Edges directly enclosed by `ctx`.
    pub fn edges_in(&self, ctx: ContextId) -> impl Iterator<Item = EdgeId> + '_ {
        self.tree
            .get(ctx)
            .into_iter()
            .flat_map(|c| c.enclosed().iter().filter_map(|el| el.as_edge()))
    }

    /// Distinct relation names used by at least one edge.
    pub fn relation_labels(&self) -> BTreeSet<&str> {
        self.edges.values().map(|e| e.relation()).collect()
    }
}

impl Egi {
    /// Flatten the traversal contract into an exportable value.
    pub fn snapshot(&self) -> EgiSnapshot {
        let contexts = self
            .contexts()
            .map(|c| ContextSnapshot {
                id: c.id(),
                parent: c.parent(),
                depth: c.depth(),
                polarity: c.polarity(),
                children: c.children().iter().copied().collect(),
                enclosed: c.enclosed().iter().copied().collect(),
            })
            .collect();

        let vertices = self
            .vertices()
            .map(|v| VertexSnapshot {
                id: v.id(),
                context: v.context(),
                constant: v.is_constant(),
                label: v.label().map(str::to_string),
                incident: v.incident().iter().copied().collect(),
                ligature: self
                    .ligature_of(v.id())
                    .unwrap_or(LigatureId::singleton(v.id())),
            })
            .collect();

        let edges = self
            .edges()
            .map(|e| EdgeSnapshot {
                id: e.id(),
                context: e.context(),
                relation: e.relation().to_string(),
                arity: e.arity(),
                vertices: e.vertices().to_vec(),
                identity: e.is_identity(),
            })
            .collect();

        let ligatures = self
            .ligatures()
            .ligatures()
            .into_iter()
            .map(|l| LigatureSnapshot {
                id: l.id,
                members: l.members.into_iter().collect(),
                identity_edges: l.identity_edges.into_iter().collect(),
            })
            .collect();

        EgiSnapshot {
            sheet: self.sheet(),
            contexts,
            vertices,
            edges,
            ligatures,
        }
    }
}
