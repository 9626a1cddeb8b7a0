//! Context-free subgraph descriptions for insertion.
//!
//! A [`Fragment`] lists local cuts, local vertices and edges. Parents and
//! arguments are local indices, so a fragment can be written before the graph
//! it will land in exists. Edge arguments may also name existing vertices of
//! the target graph, subject to the usual domination and alphabet checks.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::graph::GraphCore;
use crate::id::{ContextId, EdgeId, ElementId, VertexId};

use super::RuleResult;

/// Where a fragment element goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FragmentParent {
    /// Directly into the insertion context.
    Target,
    /// Into the fragment's local cut with this index.
    Cut(usize),
}

/// An edge argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FragmentArg {
    /// The fragment's local vertex with this index.
    Local(usize),
    /// A vertex already in the graph.
    Existing(VertexId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentCut {
    pub parent: FragmentParent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentVertex {
    pub parent: FragmentParent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentEdge {
    pub parent: FragmentParent,
    pub relation: String,
    pub args: Vec<FragmentArg>,
}

/// A subgraph to insert.
///
/// Cuts must be declared before anything placed inside them.
///
/// ```
/// use egi_calculus::rules::{Fragment, FragmentArg, FragmentParent};
///
/// // "nothing is a unicorn" as a fragment: [ x Unicorn(x) ]
/// let mut f = Fragment::new();
/// let cut = f.add_cut(FragmentParent::Target);
/// let x = f.add_vertex(FragmentParent::Cut(cut), None);
/// f.add_edge(FragmentParent::Cut(cut), "Unicorn", [FragmentArg::Local(x)]);
/// assert_eq!(f.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(default)]
    pub cuts: Vec<FragmentCut>,
    #[serde(default)]
    pub vertices: Vec<FragmentVertex>,
    #[serde(default)]
    pub edges: Vec<FragmentEdge>,
}

/// Identifiers assigned when a fragment is placed.
#[derive(Debug, Clone, Default)]
pub(crate) struct Placement {
    pub cuts: Vec<ContextId>,
    pub vertices: Vec<VertexId>,
    pub edges: Vec<EdgeId>,
    /// Elements placed directly into the target.
    pub top: BTreeSet<ElementId>,
}

impl Placement {
    pub fn added(&self) -> BTreeSet<ElementId> {
        self.cuts
            .iter()
            .map(|&c| ElementId::Cut(c))
            .chain(self.vertices.iter().map(|&v| ElementId::Vertex(v)))
            .chain(self.edges.iter().map(|&e| ElementId::Edge(e)))
            .collect()
    }
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a cut; returns its local index.
    pub fn add_cut(&mut self, parent: FragmentParent) -> usize {
        self.cuts.push(FragmentCut { parent });
        self.cuts.len() - 1
    }

    /// Declare a vertex; returns its local index.
    pub fn add_vertex(&mut self, parent: FragmentParent, label: Option<String>) -> usize {
        self.vertices.push(FragmentVertex { parent, label });
        self.vertices.len() - 1
    }

    /// Declare an edge; returns its local index.
    pub fn add_edge(
        &mut self,
        parent: FragmentParent,
        relation: impl Into<String>,
        args: impl IntoIterator<Item = FragmentArg>,
    ) -> usize {
        self.edges.push(FragmentEdge {
            parent,
            relation: relation.into(),
            args: args.into_iter().collect(),
        });
        self.edges.len() - 1
    }

    /// Total number of declared elements.
    pub fn len(&self) -> usize {
        self.cuts.len() + self.vertices.len() + self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialise the fragment under `target`.
    ///
    /// Leaves `core` partially modified on error; callers work on a scratch
    /// copy and discard it.
    pub(crate) fn place(&self, core: &mut GraphCore, target: ContextId) -> RuleResult<Placement> {
        let mut placement = Placement::default();

        for (index, cut) in self.cuts.iter().enumerate() {
            let parent = match cut.parent {
                FragmentParent::Cut(p) if p >= index => {
                    return Err(RuleError::InvalidNesting {
                        reason: format!("fragment cut {index} is declared before its parent {p}"),
                    });
                }
                other => resolve_parent(other, target, &placement.cuts)?,
            };
            let id = core.add_cut(parent)?;
            if cut.parent == FragmentParent::Target {
                placement.top.insert(ElementId::Cut(id));
            }
            placement.cuts.push(id);
        }

        for vertex in &self.vertices {
            let parent = resolve_parent(vertex.parent, target, &placement.cuts)?;
            let id = core.add_vertex(parent, vertex.label.clone())?;
            if vertex.parent == FragmentParent::Target {
                placement.top.insert(ElementId::Vertex(id));
            }
            placement.vertices.push(id);
        }

        for edge in &self.edges {
            let parent = resolve_parent(edge.parent, target, &placement.cuts)?;
            let args = edge
                .args
                .iter()
                .map(|&arg| match arg {
                    FragmentArg::Local(i) => {
                        placement
                            .vertices
                            .get(i)
                            .copied()
                            .ok_or_else(|| RuleError::InvalidNesting {
                                reason: format!("fragment edge refers to undeclared vertex {i}"),
                            })
                    }
                    FragmentArg::Existing(v) if core.vertex(v).is_some() => Ok(v),
                    FragmentArg::Existing(v) => Err(RuleError::NotFound {
                        id: ElementId::Vertex(v),
                    }),
                })
                .collect::<RuleResult<Vec<_>>>()?;
            let id = core.add_edge(parent, &edge.relation, &args)?;
            if edge.parent == FragmentParent::Target {
                placement.top.insert(ElementId::Edge(id));
            }
            placement.edges.push(id);
        }

        Ok(placement)
    }
}

fn resolve_parent(
    parent: FragmentParent,
    target: ContextId,
    cuts: &[ContextId],
) -> RuleResult<ContextId> {
    match parent {
        FragmentParent::Target => Ok(target),
        FragmentParent::Cut(i) => cuts.get(i).copied().ok_or_else(|| RuleError::InvalidNesting {
            reason: format!("fragment refers to undeclared cut {i}"),
        }),
    }
}
