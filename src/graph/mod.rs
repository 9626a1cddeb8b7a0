//! Graph core: the EGI aggregate of contexts, vertices and edges.
//!
//! - [`GraphCore`] holds the context tree, vertices, edges and the relation
//!   alphabet, with every cross-reference expressed as identifiers. It exposes
//!   the read-only traversal contract; its mutation primitives are reachable
//!   only through [`EgiBuilder`] and the rule engine.
//! - [`Egi`] is an immutable, validated instance. It caches its
//!   [`LigatureManager`], which cannot go stale because the value never changes.
//! - [`EgiBuilder`] is a mutable draft implementing the construction contract.
//!
//! Containment direction: an edge's context dominates (equals or encloses) the
//! context of every vertex it connects.

pub mod builder;
pub mod traverse;
pub mod wellformed;

pub use builder::EgiBuilder;
pub use traverse::{ContextSnapshot, EdgeSnapshot, EgiSnapshot, LigatureSnapshot, VertexSnapshot};
pub use wellformed::{Violation, WellFormedness};

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::alphabet::{Alphabet, IDENTITY};
use crate::context::{Context, ContextTree, Polarity};
use crate::error::GraphError;
use crate::id::{ContextId, EdgeId, ElementId, IdAllocator, VertexId};
use crate::ligature::{LigatureId, LigatureManager};

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// A vertex: an existentially quantified individual, or a named constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    id: VertexId,
    context: ContextId,
    /// Constant label; `Some` exactly when the vertex is a constant.
    label: Option<String>,
    incident: BTreeSet<EdgeId>,
}

impl Vertex {
    pub fn id(&self) -> VertexId {
        self.id
    }

    /// Directly enclosing context.
    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn is_constant(&self) -> bool {
        self.label.is_some()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Edges that connect this vertex.
    pub fn incident(&self) -> &BTreeSet<EdgeId> {
        &self.incident
    }

    /// A vertex with no incident edges (a "heavy dot").
    pub fn is_isolated(&self) -> bool {
        self.incident.is_empty()
    }
}

/// An edge: one instance of a relation over an ordered list of vertices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    id: EdgeId,
    context: ContextId,
    relation: String,
    vertices: Vec<VertexId>,
}

impl Edge {
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// Directly enclosing context.
    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn arity(&self) -> usize {
        self.vertices.len()
    }

    /// Incident vertices in argument order.
    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    pub fn is_identity(&self) -> bool {
        self.relation == IDENTITY
    }
}

/// The EGI aggregate: contexts, vertices, edges and the relation alphabet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphCore {
    alphabet: Alphabet,
    ids: IdAllocator,
    tree: ContextTree,
    vertices: BTreeMap<VertexId, Vertex>,
    edges: BTreeMap<EdgeId, Edge>,
}

impl GraphCore {
    /// A graph holding only the sheet of assertion.
    pub(crate) fn new(alphabet: Alphabet) -> GraphResult<Self> {
        let mut ids = IdAllocator::new();
        let sheet = ids.next_context()?;
        Ok(Self {
            alphabet,
            ids,
            tree: ContextTree::new(sheet),
            vertices: BTreeMap::new(),
            edges: BTreeMap::new(),
        })
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// The sheet of assertion.
    pub fn sheet(&self) -> ContextId {
        self.tree.sheet()
    }

    pub fn tree(&self) -> &ContextTree {
        &self.tree
    }

    pub fn context(&self, id: ContextId) -> Option<&Context> {
        self.tree.get(id)
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// Contexts in pre-order from the sheet.
    pub fn contexts(&self) -> impl Iterator<Item = &Context> {
        self.tree
            .pre_order()
            .into_iter()
            .filter_map(move |id| self.tree.get(id))
    }

    /// Vertices ordered by identifier.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values()
    }

    /// Edges ordered by identifier.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Identity edges ordered by identifier.
    pub fn identity_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(|e| e.is_identity())
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of cuts (the sheet is not counted).
    pub fn cut_count(&self) -> usize {
        self.tree.context_count().saturating_sub(1)
    }

    /// Whether the element is live in this graph.
    pub fn contains(&self, element: ElementId) -> bool {
        match element {
            ElementId::Vertex(v) => self.vertices.contains_key(&v),
            ElementId::Edge(e) => self.edges.contains_key(&e),
            ElementId::Cut(c) => c != self.sheet() && self.tree.contains(c),
        }
    }

    /// The context directly enclosing an element (a cut's parent).
    pub fn element_context(&self, element: ElementId) -> Option<ContextId> {
        match element {
            ElementId::Vertex(v) => self.vertex(v).map(Vertex::context),
            ElementId::Edge(e) => self.edge(e).map(Edge::context),
            ElementId::Cut(c) => self.context(c).and_then(Context::parent),
        }
    }

    pub fn depth(&self, ctx: ContextId) -> Option<usize> {
        self.tree.depth(ctx)
    }

    pub fn polarity(&self, ctx: ContextId) -> Option<Polarity> {
        self.tree.polarity(ctx)
    }

    /// Whether `a` equals or transitively encloses `b`.
    pub fn dominates(&self, a: ContextId, b: ContextId) -> bool {
        self.tree.dominates(a, b)
    }

    /// Every element transitively enclosed by `ctx` (not `ctx` itself).
    pub fn enclosed_transitively(&self, ctx: ContextId) -> BTreeSet<ElementId> {
        self.tree
            .descendants(ctx)
            .into_iter()
            .filter_map(|c| self.tree.get(c))
            .flat_map(|c| c.enclosed().iter().copied())
            .collect()
    }

    /// Derive a fresh ligature manager from the current edge set.
    pub fn compute_ligatures(&self) -> LigatureManager {
        LigatureManager::build(
            self.vertices.keys().copied(),
            self.identity_edges()
                .filter_map(|e| match e.vertices() {
                    [a, b] => Some((e.id(), *a, *b)),
                    _ => None,
                }),
        )
    }

    /// Run every invariant; `ligatures` is compared against a fresh scan when given.
    pub fn check_with(&self, ligatures: Option<&LigatureManager>) -> WellFormedness {
        wellformed::check(self, ligatures)
    }

    /// Structural equality ignoring the identifier allocator.
    pub fn same_structure(&self, other: &GraphCore) -> bool {
        self.alphabet == other.alphabet
            && self.tree == other.tree
            && self.vertices == other.vertices
            && self.edges == other.edges
    }

    /// Next raw identifier the allocator would hand out.
    pub fn next_id(&self) -> u64 {
        self.ids.peek_next()
    }
}

/// A validated, immutable existential graph instance.
///
/// Read access goes through [`GraphCore`] via `Deref`. There is no way to
/// mutate an `Egi`: construction goes through [`EgiBuilder`], and rules return
/// new instances.
#[derive(Debug, Clone)]
pub struct Egi {
    core: GraphCore,
    ligatures: LigatureManager,
}

impl Egi {
    /// A sheet-only graph over the given alphabet.
    pub fn new(alphabet: Alphabet) -> GraphResult<Self> {
        Ok(Self::seal(GraphCore::new(alphabet)?))
    }

    /// A sheet-only graph whose alphabet holds only `=`.
    pub fn empty() -> GraphResult<Self> {
        Self::new(Alphabet::new())
    }

    /// Wrap a core and derive its ligatures. Callers validate afterwards.
    pub(crate) fn seal(core: GraphCore) -> Self {
        let ligatures = core.compute_ligatures();
        Self { core, ligatures }
    }

    pub(crate) fn core(&self) -> &GraphCore {
        &self.core
    }

    /// Reopen as a mutable draft. `self` is untouched.
    pub fn to_builder(&self) -> EgiBuilder {
        EgiBuilder::from_core(self.core.clone())
    }

    /// The cached ligature structure.
    pub fn ligatures(&self) -> &LigatureManager {
        &self.ligatures
    }

    /// Ligature membership of a vertex.
    pub fn ligature_of(&self, v: VertexId) -> Option<LigatureId> {
        self.ligatures.component_of(v)
    }

    /// Whether two vertices denote the same individual via identity edges.
    pub fn are_coreferent(&self, a: VertexId, b: VertexId) -> bool {
        self.ligatures.are_connected(a, b)
    }

    /// Run all four invariants.
    pub fn check(&self) -> WellFormedness {
        self.core.check_with(Some(&self.ligatures))
    }

    pub fn is_well_formed(&self) -> bool {
        self.check().is_ok()
    }
}

impl std::ops::Deref for Egi {
    type Target = GraphCore;

    fn deref(&self) -> &GraphCore {
        &self.core
    }
}

/// Equality of content: same alphabet, contexts, vertices and edges with the
/// same identifiers. Allocator position is not part of a graph's meaning.
impl PartialEq for Egi {
    fn eq(&self, other: &Self) -> bool {
        self.core.same_structure(&other.core)
    }
}

impl Eq for Egi {}

#[cfg(test)]
mod tests {
    use super::*;

    fn alphabet() -> Alphabet {
        Alphabet::with_relations([("Human", 1), ("loves", 2)]).unwrap()
    }

    #[test]
    fn empty_graph_has_only_the_sheet() {
        let egi = Egi::new(alphabet()).unwrap();
        assert_eq!(egi.cut_count(), 0);
        assert_eq!(egi.vertex_count(), 0);
        assert_eq!(egi.edge_count(), 0);
        let sheet = egi.context(egi.sheet()).unwrap();
        assert!(sheet.is_sheet());
        assert_eq!(sheet.depth(), 0);
        assert_eq!(sheet.polarity(), Polarity::Positive);
        assert!(egi.is_well_formed());
    }

    #[test]
    fn sheet_is_not_an_enclosed_element() {
        let egi = Egi::empty().unwrap();
        assert!(!egi.contains(ElementId::Cut(egi.sheet())));
        assert_eq!(egi.element_context(ElementId::Cut(egi.sheet())), None);
    }

    #[test]
    fn accessors_reflect_construction() {
        let mut b = EgiBuilder::new(alphabet()).unwrap();
        let sheet = b.sheet();
        let cut = b.add_cut(sheet).unwrap();
        let socrates = b.add_vertex(sheet, Some("Socrates".into())).unwrap();
        let x = b.add_vertex(cut, None).unwrap();
        let human = b.add_edge(sheet, "Human", &[socrates]).unwrap();
        let loves = b.add_edge(sheet, "loves", &[socrates, x]).unwrap();
        let egi = b.build().unwrap();

        assert_eq!(egi.vertex(socrates).unwrap().label(), Some("Socrates"));
        assert!(egi.vertex(socrates).unwrap().is_constant());
        assert!(!egi.vertex(x).unwrap().is_constant());
        assert_eq!(
            egi.vertex(socrates).unwrap().incident(),
            &BTreeSet::from([human, loves])
        );
        assert_eq!(egi.edge(loves).unwrap().vertices(), &[socrates, x]);
        assert_eq!(egi.edge(loves).unwrap().arity(), 2);
        assert_eq!(egi.element_context(ElementId::Vertex(x)), Some(cut));
        assert_eq!(egi.element_context(ElementId::Cut(cut)), Some(sheet));
        assert_eq!(egi.polarity(cut), Some(Polarity::Negative));
        assert!(egi.dominates(sheet, cut));
        assert_eq!(
            egi.enclosed_transitively(sheet).len(),
            egi.vertex_count() + egi.edge_count() + egi.cut_count()
        );
    }

    #[test]
    fn ligature_queries_on_instance() {
        let mut b = EgiBuilder::new(alphabet()).unwrap();
        let sheet = b.sheet();
        let a = b.add_vertex(sheet, None).unwrap();
        let c = b.add_vertex(sheet, None).unwrap();
        let d = b.add_vertex(sheet, None).unwrap();
        b.add_edge(sheet, IDENTITY, &[a, c]).unwrap();
        let egi = b.build().unwrap();

        assert!(egi.are_coreferent(a, c));
        assert!(!egi.are_coreferent(a, d));
        assert_eq!(egi.ligature_of(c), egi.ligature_of(a));
        assert_eq!(egi.identity_edges().count(), 1);
    }

    #[test]
    fn to_builder_leaves_original_untouched() {
        let egi = Egi::new(alphabet()).unwrap();
        let mut draft = egi.to_builder();
        let sheet = draft.sheet();
        draft.add_vertex(sheet, None).unwrap();
        let grown = draft.build().unwrap();
        assert_eq!(egi.vertex_count(), 0);
        assert_eq!(grown.vertex_count(), 1);
        assert_ne!(egi, grown);
    }

    #[test]
    fn equality_ignores_allocator_position() {
        let egi = Egi::new(alphabet()).unwrap();
        let mut draft = egi.to_builder();
        let sheet = draft.sheet();
        let v = draft.add_vertex(sheet, None).unwrap();
        draft.remove_vertex(v).unwrap();
        let back = draft.build().unwrap();
        assert!(back.next_id() > egi.next_id());
        assert_eq!(egi, back);
    }
}
