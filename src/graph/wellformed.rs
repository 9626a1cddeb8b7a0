//! Well-formedness: the four structural invariants of an EGI.
//!
//! [`check`] never stops at the first problem; it collects every
//! [`Violation`] so that a broken rule implementation can be diagnosed from a
//! single report. Tree acyclicity and ligature components are cross-checked
//! with `petgraph` independently of the context tree and the union-find.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::{DiGraphMap, UnGraphMap};
use petgraph::visit::Dfs;

use crate::error::GraphError;
use crate::id::{ContextId, EdgeId, ElementId, VertexId};
use crate::ligature::LigatureManager;

use super::{GraphCore, GraphResult};

/// One broken invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    // Context tree
    SheetHasParent { sheet: ContextId },
    OrphanContext { context: ContextId },
    MissingParent { context: ContextId, parent: ContextId },
    DepthMismatch { context: ContextId, depth: usize, expected: usize },
    ChildLinkMismatch { parent: ContextId, child: ContextId },
    TreeCycle,
    Unreachable { context: ContextId },

    // Enclosure bijection
    UnknownContext { element: ElementId, context: ContextId },
    DanglingEnclosure { context: ContextId, element: ElementId },
    DuplicateEnclosure { element: ElementId, count: usize },
    Unenclosed { element: ElementId },
    Misplaced { element: ElementId, recorded: ContextId, found: ContextId },

    // Edges
    UnregisteredRelation { edge: EdgeId, relation: String, arity: usize },
    MissingVertex { edge: EdgeId, vertex: VertexId },
    Domination { edge: EdgeId, vertex: VertexId },
    IncidenceMismatch { edge: EdgeId, vertex: VertexId },

    // Ligatures
    IdentityEdgeMismatch { edge: EdgeId },
    LigaturePartitionMismatch { expected: usize, found: usize },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::SheetHasParent { sheet } => write!(f, "sheet {sheet} has a parent"),
            Violation::OrphanContext { context } => write!(f, "cut {context} has no parent"),
            Violation::MissingParent { context, parent } => {
                write!(f, "cut {context} names missing parent {parent}")
            }
            Violation::DepthMismatch {
                context,
                depth,
                expected,
            } => write!(f, "context {context} has depth {depth}, expected {expected}"),
            Violation::ChildLinkMismatch { parent, child } => {
                write!(f, "parent/child links disagree between {parent} and {child}")
            }
            Violation::TreeCycle => write!(f, "context parent links form a cycle"),
            Violation::Unreachable { context } => {
                write!(f, "context {context} is not reachable from the sheet")
            }
            Violation::UnknownContext { element, context } => {
                write!(f, "{element} lives in unknown context {context}")
            }
            Violation::DanglingEnclosure { context, element } => {
                write!(f, "context {context} encloses non-existent {element}")
            }
            Violation::DuplicateEnclosure { element, count } => {
                write!(f, "{element} is enclosed {count} times")
            }
            Violation::Unenclosed { element } => write!(f, "{element} is enclosed by no context"),
            Violation::Misplaced {
                element,
                recorded,
                found,
            } => write!(f, "{element} records context {recorded} but is enclosed by {found}"),
            Violation::UnregisteredRelation {
                edge,
                relation,
                arity,
            } => write!(f, "edge {edge}: relation \"{relation}\"/{arity} is not registered"),
            Violation::MissingVertex { edge, vertex } => {
                write!(f, "edge {edge} references missing vertex {vertex}")
            }
            Violation::Domination { edge, vertex } => {
                write!(f, "context of edge {edge} does not dominate vertex {vertex}")
            }
            Violation::IncidenceMismatch { edge, vertex } => {
                write!(f, "incidence of edge {edge} and vertex {vertex} is not symmetric")
            }
            Violation::IdentityEdgeMismatch { edge } => {
                write!(f, "identity edge {edge} disagrees with the ligature manager")
            }
            Violation::LigaturePartitionMismatch { expected, found } => write!(
                f,
                "ligature partition has {found} component(s), identity edges yield {expected}"
            ),
        }
    }
}

/// Outcome of a well-formedness check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WellFormedness {
    violations: Vec<Violation>,
}

impl WellFormedness {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Collapse into a [`GraphError::Malformed`] if anything was violated.
    pub fn into_result(self) -> GraphResult<()> {
        match self.violations.first() {
            None => Ok(()),
            Some(first) => Err(GraphError::Malformed {
                count: self.violations.len(),
                first: first.to_string(),
            }),
        }
    }

    fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }
}

/// Run every invariant against `core`.
///
/// When `ligatures` is given it is compared against the identity edges found
/// by scanning; otherwise a fresh manager is derived for the comparison.
pub(crate) fn check(core: &GraphCore, ligatures: Option<&LigatureManager>) -> WellFormedness {
    let mut report = WellFormedness::default();
    check_tree(core, &mut report);
    check_enclosure(core, &mut report);
    check_edges(core, &mut report);
    match ligatures {
        Some(manager) => check_ligatures(core, manager, &mut report),
        None => check_ligatures(core, &core.compute_ligatures(), &mut report),
    }
    report
}

// ---------------------------------------------------------------------------
// Invariant 3: context tree
// ---------------------------------------------------------------------------

fn check_tree(core: &GraphCore, report: &mut WellFormedness) {
    let tree = &core.tree;
    let sheet = tree.sheet();
    let mut links: DiGraphMap<ContextId, ()> = DiGraphMap::new();

    for context in tree.iter() {
        let id = context.id();
        links.add_node(id);
        match context.parent() {
            None if id == sheet => {
                if context.depth() != 0 {
                    report.push(Violation::DepthMismatch {
                        context: id,
                        depth: context.depth(),
                        expected: 0,
                    });
                }
            }
            None => report.push(Violation::OrphanContext { context: id }),
            Some(_) if id == sheet => report.push(Violation::SheetHasParent { sheet }),
            Some(parent) => match tree.get(parent) {
                None => report.push(Violation::MissingParent {
                    context: id,
                    parent,
                }),
                Some(p) => {
                    links.add_edge(parent, id, ());
                    if context.depth() != p.depth() + 1 {
                        report.push(Violation::DepthMismatch {
                            context: id,
                            depth: context.depth(),
                            expected: p.depth() + 1,
                        });
                    }
                    if !p.children().contains(&id) {
                        report.push(Violation::ChildLinkMismatch { parent, child: id });
                    }
                }
            },
        }
        for &child in context.children() {
            let linked_back = tree.get(child).and_then(|c| c.parent()) == Some(id);
            if !linked_back || !context.enclosed().contains(&ElementId::Cut(child)) {
                report.push(Violation::ChildLinkMismatch { parent: id, child });
            }
        }
    }

    if is_cyclic_directed(&links) {
        report.push(Violation::TreeCycle);
    }

    let mut reachable = BTreeSet::new();
    if tree.contains(sheet) {
        let mut dfs = Dfs::new(&links, sheet);
        while let Some(ctx) = dfs.next(&links) {
            reachable.insert(ctx);
        }
    }
    for context in tree.iter() {
        if !reachable.contains(&context.id()) {
            report.push(Violation::Unreachable {
                context: context.id(),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Invariant 2: element enclosure bijection
// ---------------------------------------------------------------------------

fn check_enclosure(core: &GraphCore, report: &mut WellFormedness) {
    let mut found: BTreeMap<ElementId, Vec<ContextId>> = BTreeMap::new();
    for context in core.tree.iter() {
        for &element in context.enclosed() {
            if !core.contains(element) {
                report.push(Violation::DanglingEnclosure {
                    context: context.id(),
                    element,
                });
                continue;
            }
            found.entry(element).or_default().push(context.id());
        }
    }

    let recorded = core
        .vertices
        .values()
        .map(|v| (ElementId::Vertex(v.id), Some(v.context)))
        .chain(
            core.edges
                .values()
                .map(|e| (ElementId::Edge(e.id), Some(e.context))),
        )
        .chain(
            core.tree
                .iter()
                .filter(|c| !c.is_sheet())
                .map(|c| (ElementId::Cut(c.id()), c.parent())),
        );

    for (element, context) in recorded {
        let Some(context) = context else {
            // Parentless cuts are reported by the tree check.
            continue;
        };
        if !core.tree.contains(context) {
            report.push(Violation::UnknownContext { element, context });
            continue;
        }
        match found.get(&element).map(Vec::as_slice) {
            None | Some([]) => report.push(Violation::Unenclosed { element }),
            Some([single]) if *single != context => report.push(Violation::Misplaced {
                element,
                recorded: context,
                found: *single,
            }),
            Some([_]) => {}
            Some(many) => report.push(Violation::DuplicateEnclosure {
                element,
                count: many.len(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Invariant 1 and edge well-typedness
// ---------------------------------------------------------------------------

fn check_edges(core: &GraphCore, report: &mut WellFormedness) {
    for edge in core.edges.values() {
        if !core.alphabet.accepts(&edge.relation, edge.arity()) {
            report.push(Violation::UnregisteredRelation {
                edge: edge.id,
                relation: edge.relation.clone(),
                arity: edge.arity(),
            });
        }
        for &v in &edge.vertices {
            let Some(vertex) = core.vertices.get(&v) else {
                report.push(Violation::MissingVertex { edge: edge.id, vertex: v });
                continue;
            };
            if !core.tree.dominates(edge.context, vertex.context) {
                report.push(Violation::Domination { edge: edge.id, vertex: v });
            }
            if !vertex.incident.contains(&edge.id) {
                report.push(Violation::IncidenceMismatch { edge: edge.id, vertex: v });
            }
        }
    }
    for vertex in core.vertices.values() {
        for &e in &vertex.incident {
            let attached = core
                .edges
                .get(&e)
                .is_some_and(|edge| edge.vertices.contains(&vertex.id));
            if !attached {
                report.push(Violation::IncidenceMismatch { edge: e, vertex: vertex.id });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Invariant 4: ligature consistency
// ---------------------------------------------------------------------------

fn check_ligatures(core: &GraphCore, manager: &LigatureManager, report: &mut WellFormedness) {
    let scanned: BTreeSet<EdgeId> = core.identity_edges().map(|e| e.id).collect();
    let tracked = manager.identity_edges();
    for &edge in scanned.symmetric_difference(&tracked) {
        report.push(Violation::IdentityEdgeMismatch { edge });
    }

    let mut identity: UnGraphMap<VertexId, EdgeId> = UnGraphMap::new();
    for &v in core.vertices.keys() {
        identity.add_node(v);
    }
    for edge in core.identity_edges() {
        if let [a, b] = edge.vertices[..] {
            identity.add_edge(a, b, edge.id);
        }
    }

    let mut seen = BTreeSet::new();
    let mut expected: BTreeSet<BTreeSet<VertexId>> = BTreeSet::new();
    for &start in core.vertices.keys() {
        if seen.contains(&start) {
            continue;
        }
        let mut component = BTreeSet::new();
        let mut dfs = Dfs::new(&identity, start);
        while let Some(v) = dfs.next(&identity) {
            seen.insert(v);
            component.insert(v);
        }
        expected.insert(component);
    }

    let found = manager.partition();
    if found != expected {
        report.push(Violation::LigaturePartitionMismatch {
            expected: expected.len(),
            found: found.len(),
        });
    }
}
