//! Structural equivalence of two regions up to coreference.
//!
//! De-iteration may only remove a copy that matches its original. The match
//! is a bijection between the cuts and edges of both regions, plus an
//! injection from original vertices into copy vertices, such that:
//!
//! - nesting is preserved: paired elements sit in paired contexts, with the
//!   two containers paired with each other;
//! - paired edges share the relation name and arity, and their arguments
//!   correspond position by position (in either order for `=`);
//! - paired vertices share their constant label.
//!
//! An argument pointing inside the original must point at the paired copy
//! vertex. An argument pointing outside the original may be matched by the
//! same vertex, by a coreferent vertex outside the copy, or by an unpaired
//! copy vertex joined to it by an identity edge outside the copy (a *bridge*,
//! the vertex iteration creates when the copied edge cannot reach the
//! original argument). Every copy vertex ends up either paired or a bridge.
//!
//! The search is a backtracking assignment over the original's elements in
//! the order cuts (pre-order), edges, then any vertex not fixed by an edge.
//! Candidates are pruned by kind, relation, label and context before any
//! argument is compared.

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::Egi;
use crate::id::{ContextId, EdgeId, ElementId, VertexId};

use super::selection::Region;

/// Step budget for the backtracking search.
const MAX_STEPS: usize = 1_000_000;

/// A successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Correspondence {
    /// Original cut to copy cut (containers included).
    pub cuts: BTreeMap<ContextId, ContextId>,
    /// Original edge to copy edge.
    pub edges: BTreeMap<EdgeId, EdgeId>,
    /// Original vertex to copy vertex.
    pub vertices: BTreeMap<VertexId, VertexId>,
    /// Copy vertices standing in for vertices outside the original, each with
    /// the outside vertices it stands for.
    pub bridges: BTreeMap<VertexId, BTreeSet<VertexId>>,
}

/// Undo log entry.
enum Trail {
    Cut(ContextId),
    Edge(EdgeId),
    Vertex(VertexId),
    Bridge(VertexId, VertexId),
}

struct Matcher<'a> {
    egi: &'a Egi,
    copy: &'a Region,
    original: &'a Region,
    cut_map: BTreeMap<ContextId, ContextId>,
    cut_used: BTreeSet<ContextId>,
    edge_map: BTreeMap<EdgeId, EdgeId>,
    edge_used: BTreeSet<EdgeId>,
    vmap: BTreeMap<VertexId, VertexId>,
    vused: BTreeSet<VertexId>,
    bridges: BTreeMap<VertexId, BTreeMap<VertexId, usize>>,
    trail: Vec<Trail>,
    steps: usize,
}

/// Find a correspondence between `copy` and `original`, or explain why none
/// exists.
pub fn correspond(egi: &Egi, copy: &Region, original: &Region) -> Result<Correspondence, String> {
    let counts = |r: &Region| (r.cuts().count(), r.edges().count(), r.vertices().count());
    let (oc, oe, ov) = counts(original);
    let (cc, ce, cv) = counts(copy);
    if oc != cc {
        return Err(format!("{cc} cut(s) in the copy, {oc} in the original"));
    }
    if oe != ce {
        return Err(format!("{ce} edge(s) in the copy, {oe} in the original"));
    }
    if cv < ov {
        return Err(format!("{cv} vertex(es) in the copy, {ov} in the original"));
    }
    let relations = |r: &Region| -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for e in r.edges().filter_map(|e| egi.edge(e)) {
            *counts.entry(e.relation().to_string()).or_insert(0) += 1;
        }
        counts
    };
    if relations(original) != relations(copy) {
        return Err("relation names differ".into());
    }

    let mut tasks: Vec<ElementId> = egi
        .tree()
        .descendants(original.container)
        .into_iter()
        .filter(|&c| original.contains(ElementId::Cut(c)))
        .map(ElementId::Cut)
        .collect();
    tasks.extend(original.edges().map(ElementId::Edge));
    tasks.extend(original.vertices().map(ElementId::Vertex));

    let mut matcher = Matcher {
        egi,
        copy,
        original,
        cut_map: BTreeMap::from([(original.container, copy.container)]),
        cut_used: BTreeSet::new(),
        edge_map: BTreeMap::new(),
        edge_used: BTreeSet::new(),
        vmap: BTreeMap::new(),
        vused: BTreeSet::new(),
        bridges: BTreeMap::new(),
        trail: Vec::new(),
        steps: 0,
    };

    if !matcher.search(&tasks, 0) {
        return Err(if matcher.steps >= MAX_STEPS {
            "search budget exhausted".into()
        } else {
            "no nesting-, label- and argument-preserving correspondence exists".into()
        });
    }

    Ok(Correspondence {
        cuts: matcher.cut_map,
        edges: matcher.edge_map,
        vertices: matcher.vmap,
        bridges: matcher
            .bridges
            .into_iter()
            .map(|(bridge, outside)| (bridge, outside.into_keys().collect()))
            .collect(),
    })
}

impl Matcher<'_> {
    fn search(&mut self, tasks: &[ElementId], index: usize) -> bool {
        self.steps += 1;
        if self.steps >= MAX_STEPS {
            return false;
        }
        let Some(&task) = tasks.get(index) else {
            return self.complete();
        };
        match task {
            ElementId::Cut(c) => self.match_cut(tasks, index, c),
            ElementId::Edge(e) => self.match_edge(tasks, index, e),
            ElementId::Vertex(v) if self.vmap.contains_key(&v) => self.search(tasks, index + 1),
            ElementId::Vertex(v) => self.match_vertex(tasks, index, v),
        }
    }

    /// Every copy vertex is paired or a bridge.
    fn complete(&self) -> bool {
        self.copy
            .vertices()
            .all(|v| self.vused.contains(&v) || self.bridges.contains_key(&v))
    }

    fn match_cut(&mut self, tasks: &[ElementId], index: usize, cut: ContextId) -> bool {
        let egi = self.egi;
        let Some(context) = egi.context(cut) else {
            return false;
        };
        let Some(parent) = context.parent().and_then(|p| self.cut_map.get(&p).copied()) else {
            return false;
        };
        let shape = |ctx: ContextId| {
            egi.context(ctx).map(|c| {
                let mut counts = (0usize, 0usize, 0usize);
                for el in c.enclosed() {
                    match el {
                        ElementId::Cut(_) => counts.0 += 1,
                        ElementId::Edge(_) => counts.1 += 1,
                        ElementId::Vertex(_) => counts.2 += 1,
                    }
                }
                counts
            })
        };
        let wanted = shape(cut);
        let candidates: Vec<ContextId> = egi
            .context(parent)
            .map(|p| p.children().iter().copied().collect())
            .unwrap_or_default();

        for candidate in candidates {
            if !self.copy.contains(ElementId::Cut(candidate))
                || self.cut_used.contains(&candidate)
                || shape(candidate) != wanted
            {
                continue;
            }
            let mark = self.trail.len();
            self.cut_map.insert(cut, candidate);
            self.cut_used.insert(candidate);
            self.trail.push(Trail::Cut(cut));
            if self.search(tasks, index + 1) {
                return true;
            }
            self.undo(mark);
        }
        false
    }

    fn match_edge(&mut self, tasks: &[ElementId], index: usize, edge: EdgeId) -> bool {
        let egi = self.egi;
        let Some(original) = egi.edge(edge) else {
            return false;
        };
        let Some(&ctx) = self.cut_map.get(&original.context()) else {
            return false;
        };
        let candidates: Vec<EdgeId> = egi.edges_in(ctx).collect();

        for candidate in candidates {
            if !self.copy.contains(candidate) || self.edge_used.contains(&candidate) {
                continue;
            }
            let Some(copy) = egi.edge(candidate) else {
                continue;
            };
            if copy.relation() != original.relation() || copy.arity() != original.arity() {
                continue;
            }

            let straight: Vec<(VertexId, VertexId)> = original
                .vertices()
                .iter()
                .copied()
                .zip(copy.vertices().iter().copied())
                .collect();
            let mut orders = vec![straight];
            if original.is_identity() {
                if let ([a, b], [c, d]) = (original.vertices(), copy.vertices()) {
                    orders.push(vec![(*a, *d), (*b, *c)]);
                }
            }

            for pairs in orders {
                let mark = self.trail.len();
                self.edge_map.insert(edge, candidate);
                self.edge_used.insert(candidate);
                self.trail.push(Trail::Edge(edge));
                if pairs.iter().all(|&(o, c)| self.bind_arg(o, c)) && self.search(tasks, index + 1) {
                    return true;
                }
                self.undo(mark);
            }
        }
        false
    }

    fn match_vertex(&mut self, tasks: &[ElementId], index: usize, vertex: VertexId) -> bool {
        let egi = self.egi;
        let Some(ctx) = egi
            .vertex(vertex)
            .and_then(|v| self.cut_map.get(&v.context()).copied())
        else {
            return false;
        };
        let candidates: Vec<VertexId> = egi.vertices_in(ctx).collect();
        for candidate in candidates {
            let mark = self.trail.len();
            if self.pair_vertex(vertex, candidate) && self.search(tasks, index + 1) {
                return true;
            }
            self.undo(mark);
        }
        false
    }

    /// Record that original argument `o` corresponds to copy argument `c`.
    fn bind_arg(&mut self, o: VertexId, c: VertexId) -> bool {
        if self.original.contains(o) {
            return match self.vmap.get(&o) {
                Some(&paired) => paired == c,
                None => self.pair_vertex(o, c),
            };
        }
        if o == c {
            return true;
        }
        if !self.egi.are_coreferent(o, c) {
            return false;
        }
        if self.copy.contains(c) {
            if self.vused.contains(&c) || !self.linked(c, o) {
                return false;
            }
            *self.bridges.entry(c).or_default().entry(o).or_insert(0) += 1;
            self.trail.push(Trail::Bridge(c, o));
        }
        true
    }

    /// Whether an identity edge outside the copy joins `bridge` to `outside`.
    fn linked(&self, bridge: VertexId, outside: VertexId) -> bool {
        let egi = self.egi;
        egi.vertex(bridge).is_some_and(|vertex| {
            vertex.incident().iter().any(|&e| {
                !self.copy.contains(e)
                    && egi
                        .edge(e)
                        .is_some_and(|edge| edge.is_identity() && edge.vertices().contains(&outside))
            })
        })
    }

    fn pair_vertex(&mut self, o: VertexId, c: VertexId) -> bool {
        if !self.copy.contains(c) || self.vused.contains(&c) || self.bridges.contains_key(&c) {
            return false;
        }
        let egi = self.egi;
        let (Some(ov), Some(cv)) = (egi.vertex(o), egi.vertex(c)) else {
            return false;
        };
        if ov.label() != cv.label() || self.cut_map.get(&ov.context()) != Some(&cv.context()) {
            return false;
        }
        self.vmap.insert(o, c);
        self.vused.insert(c);
        self.trail.push(Trail::Vertex(o));
        true
    }

    fn undo(&mut self, mark: usize) {
        while self.trail.len() > mark {
            match self.trail.pop() {
                Some(Trail::Cut(o)) => {
                    if let Some(c) = self.cut_map.remove(&o) {
                        self.cut_used.remove(&c);
                    }
                }
                Some(Trail::Edge(o)) => {
                    if let Some(c) = self.edge_map.remove(&o) {
                        self.edge_used.remove(&c);
                    }
                }
                Some(Trail::Vertex(o)) => {
                    if let Some(c) = self.vmap.remove(&o) {
                        self.vused.remove(&c);
                    }
                }
                Some(Trail::Bridge(c, o)) => {
                    if let Some(outside) = self.bridges.get_mut(&c) {
                        if let Some(count) = outside.get_mut(&o) {
                            *count -= 1;
                            if *count == 0 {
                                outside.remove(&o);
                            }
                        }
                        if outside.is_empty() {
                            self.bridges.remove(&c);
                        }
                    }
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::{Alphabet, IDENTITY};
    use crate::graph::EgiBuilder;
    use crate::rules::Selection;

    fn builder() -> EgiBuilder {
        EgiBuilder::new(Alphabet::with_relations([("P", 1), ("Q", 1), ("R", 2)]).unwrap()).unwrap()
    }

    fn region(egi: &Egi, elements: &[ElementId]) -> Region {
        Selection::new(elements.iter().copied()).resolve(egi, 1024).unwrap()
    }

    #[test]
    fn identical_cuts_correspond() {
        let mut b = builder();
        let sheet = b.sheet();
        let mut cuts = Vec::new();
        for _ in 0..2 {
            let cut = b.add_cut(sheet).unwrap();
            let x = b.add_vertex(cut, None).unwrap();
            let y = b.add_vertex(cut, None).unwrap();
            b.add_edge(cut, "R", &[x, y]).unwrap();
            b.add_edge(cut, "P", &[y]).unwrap();
            cuts.push(cut);
        }
        let egi = b.build().unwrap();
        let m = correspond(
            &egi,
            &region(&egi, &[ElementId::Cut(cuts[1])]),
            &region(&egi, &[ElementId::Cut(cuts[0])]),
        )
        .unwrap();
        assert_eq!(m.cuts.get(&cuts[0]), Some(&cuts[1]));
        assert_eq!(m.vertices.len(), 2);
        assert!(m.bridges.is_empty());
    }

    #[test]
    fn argument_order_matters() {
        let mut b = builder();
        let sheet = b.sheet();
        let c1 = b.add_cut(sheet).unwrap();
        let x1 = b.add_vertex(c1, None).unwrap();
        let y1 = b.add_vertex(c1, None).unwrap();
        b.add_edge(c1, "R", &[x1, y1]).unwrap();
        b.add_edge(c1, "P", &[x1]).unwrap();
        let c2 = b.add_cut(sheet).unwrap();
        let x2 = b.add_vertex(c2, None).unwrap();
        let y2 = b.add_vertex(c2, None).unwrap();
        b.add_edge(c2, "R", &[x2, y2]).unwrap();
        // P on the second argument instead of the first.
        b.add_edge(c2, "P", &[y2]).unwrap();
        let egi = b.build().unwrap();
        assert!(correspond(
            &egi,
            &region(&egi, &[ElementId::Cut(c2)]),
            &region(&egi, &[ElementId::Cut(c1)]),
        )
        .is_err());
    }

    #[test]
    fn labels_must_agree() {
        let mut b = builder();
        let sheet = b.sheet();
        let c1 = b.add_cut(sheet).unwrap();
        b.add_vertex(c1, Some("Plato".into())).unwrap();
        let c2 = b.add_cut(sheet).unwrap();
        b.add_vertex(c2, Some("Aristotle".into())).unwrap();
        let egi = b.build().unwrap();
        assert!(correspond(
            &egi,
            &region(&egi, &[ElementId::Cut(c2)]),
            &region(&egi, &[ElementId::Cut(c1)]),
        )
        .is_err());
    }

    #[test]
    fn identity_edges_are_symmetric() {
        let mut b = builder();
        let sheet = b.sheet();
        let c1 = b.add_cut(sheet).unwrap();
        let a1 = b.add_vertex(c1, Some("a".into())).unwrap();
        let b1 = b.add_vertex(c1, None).unwrap();
        b.add_edge(c1, IDENTITY, &[a1, b1]).unwrap();
        let c2 = b.add_cut(sheet).unwrap();
        let a2 = b.add_vertex(c2, Some("a".into())).unwrap();
        let b2 = b.add_vertex(c2, None).unwrap();
        b.add_edge(c2, IDENTITY, &[b2, a2]).unwrap();
        let egi = b.build().unwrap();
        let m = correspond(
            &egi,
            &region(&egi, &[ElementId::Cut(c2)]),
            &region(&egi, &[ElementId::Cut(c1)]),
        )
        .unwrap();
        assert_eq!(m.vertices.get(&a1), Some(&a2));
        assert_eq!(m.vertices.get(&b1), Some(&b2));
    }

    #[test]
    fn external_arguments_match_by_coreference() {
        let mut b = builder();
        let sheet = b.sheet();
        let x = b.add_vertex(sheet, None).unwrap();
        let z = b.add_vertex(sheet, None).unwrap();
        let unrelated = b.add_vertex(sheet, None).unwrap();
        b.add_edge(sheet, IDENTITY, &[x, z]).unwrap();
        let px = b.add_edge(sheet, "P", &[x]).unwrap();
        let pz = b.add_edge(sheet, "P", &[z]).unwrap();
        let pu = b.add_edge(sheet, "P", &[unrelated]).unwrap();
        let egi = b.build().unwrap();

        let original = region(&egi, &[ElementId::Edge(px)]);
        assert!(correspond(&egi, &region(&egi, &[ElementId::Edge(pz)]), &original).is_ok());
        assert!(correspond(&egi, &region(&egi, &[ElementId::Edge(pu)]), &original).is_err());
    }

    #[test]
    fn bridge_vertices_stand_in_for_outside_arguments() {
        let mut b = builder();
        let sheet = b.sheet();
        let x = b.add_vertex(sheet, None).unwrap();
        let px = b.add_edge(sheet, "P", &[x]).unwrap();
        let cut = b.add_cut(sheet).unwrap();
        let w = b.add_vertex(cut, None).unwrap();
        let pw = b.add_edge(cut, "P", &[w]).unwrap();
        b.add_edge(sheet, IDENTITY, &[x, w]).unwrap();
        let egi = b.build().unwrap();

        let m = correspond(
            &egi,
            &region(&egi, &[ElementId::Edge(pw), ElementId::Vertex(w)]),
            &region(&egi, &[ElementId::Edge(px)]),
        )
        .unwrap();
        assert_eq!(m.bridges, BTreeMap::from([(w, BTreeSet::from([x]))]));
        assert_eq!(m.edges.get(&px), Some(&pw));
    }

    #[test]
    fn bridges_need_a_direct_link() {
        let mut b = builder();
        let sheet = b.sheet();
        let x = b.add_vertex(sheet, None).unwrap();
        let y = b.add_vertex(sheet, None).unwrap();
        b.add_edge(sheet, IDENTITY, &[x, y]).unwrap();
        let px = b.add_edge(sheet, "P", &[x]).unwrap();
        let cut = b.add_cut(sheet).unwrap();
        let w = b.add_vertex(cut, None).unwrap();
        let pw = b.add_edge(cut, "P", &[w]).unwrap();
        b.add_edge(sheet, IDENTITY, &[y, w]).unwrap();
        let egi = b.build().unwrap();
        assert!(egi.are_coreferent(x, w));

        let copy = region(&egi, &[ElementId::Edge(pw), ElementId::Vertex(w)]);
        assert!(correspond(&egi, &copy, &region(&egi, &[ElementId::Edge(px)])).is_err());
    }

    #[test]
    fn unexplained_copy_vertex_fails() {
        let mut b = builder();
        let sheet = b.sheet();
        let c1 = b.add_cut(sheet).unwrap();
        let c2 = b.add_cut(sheet).unwrap();
        b.add_vertex(c2, None).unwrap();
        let egi = b.build().unwrap();
        let err = correspond(
            &egi,
            &region(&egi, &[ElementId::Cut(c2)]),
            &region(&egi, &[ElementId::Cut(c1)]),
        )
        .unwrap_err();
        assert!(err.contains("correspondence"));
    }

    #[test]
    fn counts_are_checked_first() {
        let mut b = builder();
        let sheet = b.sheet();
        let c1 = b.add_cut(sheet).unwrap();
        b.add_cut(c1).unwrap();
        let c2 = b.add_cut(sheet).unwrap();
        let egi = b.build().unwrap();
        let err = correspond(
            &egi,
            &region(&egi, &[ElementId::Cut(c2)]),
            &region(&egi, &[ElementId::Cut(c1)]),
        )
        .unwrap_err();
        assert!(err.contains("cut(s)"));
    }
}
