//! Mutation primitives and the construction contract.
//!
//! Every primitive validates its own preconditions before touching anything,
//! so a draft that starts well formed stays well formed after each successful
//! call. A failed call leaves the draft unchanged.

use std::collections::BTreeSet;

use crate::alphabet::Alphabet;
use crate::error::{AlphabetError, GraphError};
use crate::id::{ContextId, EdgeId, ElementId, VertexId};

use super::{Edge, Egi, GraphCore, GraphResult, Vertex, WellFormedness};

impl GraphCore {
    pub(crate) fn add_cut(&mut self, parent: ContextId) -> GraphResult<ContextId> {
        if !self.tree.contains(parent) {
            return Err(GraphError::UnknownContext { context: parent });
        }
        let id = self.ids.next_context()?;
        self.tree.create_child(parent, id)?;
        tracing::trace!(cut = %id, parent = %parent, "added cut");
        Ok(id)
    }

    pub(crate) fn add_vertex(
        &mut self,
        context: ContextId,
        label: Option<String>,
    ) -> GraphResult<VertexId> {
        if !self.tree.contains(context) {
            return Err(GraphError::UnknownContext { context });
        }
        let id = self.ids.next_vertex()?;
        self.tree.enclose(context, ElementId::Vertex(id))?;
        self.vertices.insert(
            id,
            Vertex {
                id,
                context,
                label,
                incident: BTreeSet::new(),
            },
        );
        tracing::trace!(vertex = %id, context = %context, "added vertex");
        Ok(id)
    }

    pub(crate) fn add_edge(
        &mut self,
        context: ContextId,
        relation: &str,
        vertices: &[VertexId],
    ) -> GraphResult<EdgeId> {
        if !self.tree.contains(context) {
            return Err(GraphError::UnknownContext { context });
        }
        self.alphabet.check(relation, vertices.len())?;
        for &v in vertices {
            let vertex = self.vertex(v).ok_or(GraphError::NotFound {
                id: ElementId::Vertex(v),
            })?;
            if !self.tree.dominates(context, vertex.context) {
                return Err(GraphError::DominationViolation {
                    edge_context: context,
                    vertex: v,
                    vertex_context: vertex.context,
                });
            }
        }

        let id = self.ids.next_edge()?;
        self.tree.enclose(context, ElementId::Edge(id))?;
        for &v in vertices {
            if let Some(vertex) = self.vertices.get_mut(&v) {
                vertex.incident.insert(id);
            }
        }
        self.edges.insert(
            id,
            Edge {
                id,
                context,
                relation: relation.to_string(),
                vertices: vertices.to_vec(),
            },
        );
        tracing::trace!(edge = %id, relation, context = %context, "added edge");
        Ok(id)
    }

    pub(crate) fn remove_edge(&mut self, id: EdgeId) -> GraphResult<Edge> {
        let edge = self.edges.remove(&id).ok_or(GraphError::NotFound {
            id: ElementId::Edge(id),
        })?;
        for v in &edge.vertices {
            if let Some(vertex) = self.vertices.get_mut(v) {
                vertex.incident.remove(&id);
            }
        }
        self.tree.release(edge.context, ElementId::Edge(id));
        tracing::trace!(edge = %id, identity = edge.is_identity(), "removed edge");
        Ok(edge)
    }

    /// Remove a vertex, cascading to its incident edges first.
    pub(crate) fn remove_vertex(&mut self, id: VertexId) -> GraphResult<Vertex> {
        let incident: Vec<EdgeId> = self
            .vertex(id)
            .ok_or(GraphError::NotFound {
                id: ElementId::Vertex(id),
            })?
            .incident
            .iter()
            .copied()
            .collect();
        for edge in incident {
            self.remove_edge(edge)?;
        }
        let vertex = self.vertices.remove(&id).ok_or(GraphError::NotFound {
            id: ElementId::Vertex(id),
        })?;
        self.tree.release(vertex.context, ElementId::Vertex(id));
        tracing::trace!(vertex = %id, "removed vertex");
        Ok(vertex)
    }

    /// Remove a cut and everything it transitively encloses.
    ///
    /// Worklist over the subtree: edges go first, then vertices (which may
    /// still cascade to edges outside the cut), then the cuts deepest-first.
    pub(crate) fn remove_cut(&mut self, id: ContextId) -> GraphResult<BTreeSet<ElementId>> {
        if id == self.sheet() {
            return Err(GraphError::SheetRemoval);
        }
        if !self.tree.contains(id) {
            return Err(GraphError::NotFound {
                id: ElementId::Cut(id),
            });
        }
        let subtree = self.tree.descendants(id);
        let mut removed = BTreeSet::new();

        let mut edges = Vec::new();
        let mut vertices = Vec::new();
        for ctx in &subtree {
            if let Some(context) = self.tree.get(*ctx) {
                for element in context.enclosed() {
                    match *element {
                        ElementId::Edge(e) => edges.push(e),
                        ElementId::Vertex(v) => vertices.push(v),
                        ElementId::Cut(_) => {}
                    }
                }
            }
        }
        for e in edges {
            if self.edges.contains_key(&e) {
                self.remove_edge(e)?;
                removed.insert(ElementId::Edge(e));
            }
        }
        for v in vertices {
            let cascaded: Vec<EdgeId> = self
                .vertex(v)
                .map(|vertex| vertex.incident.iter().copied().collect())
                .unwrap_or_default();
            self.remove_vertex(v)?;
            removed.insert(ElementId::Vertex(v));
            removed.extend(cascaded.into_iter().map(ElementId::Edge));
        }
        for ctx in subtree.into_iter().rev() {
            self.tree.remove_empty_cut(ctx)?;
            removed.insert(ElementId::Cut(ctx));
        }
        tracing::trace!(cut = %id, removed = removed.len(), "removed cut");
        Ok(removed)
    }

    /// Remove any enclosed element.
    pub(crate) fn remove_element(&mut self, element: ElementId) -> GraphResult<()> {
        match element {
            ElementId::Vertex(v) => self.remove_vertex(v).map(|_| ()),
            ElementId::Edge(e) => self.remove_edge(e).map(|_| ()),
            ElementId::Cut(c) => self.remove_cut(c).map(|_| ()),
        }
    }

    /// Move an element, with everything it encloses, directly under `to`.
    ///
    /// Performs no domination check; rule implementations validate the
    /// relocated region beforehand and the result afterwards.
    pub(crate) fn relocate(&mut self, element: ElementId, to: ContextId) -> GraphResult<()> {
        if !self.tree.contains(to) {
            return Err(GraphError::UnknownContext { context: to });
        }
        match element {
            ElementId::Vertex(v) => {
                let vertex = self.vertices.get_mut(&v).ok_or(GraphError::NotFound { id: element })?;
                let from = std::mem::replace(&mut vertex.context, to);
                self.tree.release(from, element);
                self.tree.enclose(to, element)
            }
            ElementId::Edge(e) => {
                let edge = self.edges.get_mut(&e).ok_or(GraphError::NotFound { id: element })?;
                let from = std::mem::replace(&mut edge.context, to);
                self.tree.release(from, element);
                self.tree.enclose(to, element)
            }
            ElementId::Cut(c) => self.tree.reparent(c, to),
        }
    }

    pub(crate) fn register_relation(&mut self, name: &str, arity: usize) -> Result<(), AlphabetError> {
        self.alphabet.register(name, arity)
    }
}

/// Mutable draft of an EGI: the construction contract.
///
/// ```
/// use egi_calculus::alphabet::Alphabet;
/// use egi_calculus::graph::EgiBuilder;
///
/// let mut b = EgiBuilder::new(Alphabet::with_relations([("Human", 1)]).unwrap()).unwrap();
/// let sheet = b.sheet();
/// let cut = b.add_cut(sheet).unwrap();
/// let x = b.add_vertex(cut, None).unwrap();
/// b.add_edge(cut, "Human", &[x]).unwrap();
/// let egi = b.build().unwrap();
/// assert!(egi.is_well_formed());
/// ```
#[derive(Debug, Clone)]
pub struct EgiBuilder {
    pub(super) core: GraphCore,
}

impl EgiBuilder {
    /// Start from a fresh sheet (`new_sheet()` in the construction contract).
    pub fn new(alphabet: Alphabet) -> GraphResult<Self> {
        Ok(Self {
            core: GraphCore::new(alphabet)?,
        })
    }

    pub(crate) fn from_core(core: GraphCore) -> Self {
        Self { core }
    }

    /// Register a relation in this draft's alphabet.
    pub fn register_relation(&mut self, name: &str, arity: usize) -> Result<(), AlphabetError> {
        self.core.register_relation(name, arity)
    }

    /// Create a cut under `parent`.
    pub fn add_cut(&mut self, parent: ContextId) -> GraphResult<ContextId> {
        self.core.add_cut(parent)
    }

    /// Create a vertex; `label` makes it a constant.
    pub fn add_vertex(&mut self, context: ContextId, label: Option<String>) -> GraphResult<VertexId> {
        self.core.add_vertex(context, label)
    }

    /// Create an edge of `relation` over `vertices` in argument order.
    pub fn add_edge(
        &mut self,
        context: ContextId,
        relation: &str,
        vertices: &[VertexId],
    ) -> GraphResult<EdgeId> {
        self.core.add_edge(context, relation, vertices)
    }

    /// Remove a vertex and every edge incident to it.
    pub fn remove_vertex(&mut self, id: VertexId) -> GraphResult<()> {
        self.core.remove_vertex(id).map(|_| ())
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> GraphResult<()> {
        self.core.remove_edge(id).map(|_| ())
    }

    /// Remove a cut and everything it transitively encloses.
    ///
    /// Returns every removed element.
    pub fn remove_cut(&mut self, id: ContextId) -> GraphResult<BTreeSet<ElementId>> {
        self.core.remove_cut(id)
    }

    /// Run all invariants against the draft.
    pub fn check(&self) -> WellFormedness {
        self.core.check_with(None)
    }

    pub fn is_well_formed(&self) -> bool {
        self.check().is_ok()
    }

    /// Validate and freeze into an immutable instance.
    pub fn build(self) -> GraphResult<Egi> {
        let egi = Egi::seal(self.core);
        egi.check().into_result()?;
        tracing::debug!(
            vertices = egi.vertex_count(),
            edges = egi.edge_count(),
            cuts = egi.cut_count(),
            "built egi"
        );
        Ok(egi)
    }
}

impl std::ops::Deref for EgiBuilder {
    type Target = GraphCore;

    fn deref(&self) -> &GraphCore {
        &self.core
    }
}
