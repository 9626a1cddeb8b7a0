//! Ligatures: connected components of vertices joined by identity edges.
//!
//! A ligature denotes one individual. The [`LigatureManager`] is a derived
//! structure, a pure function of the vertex set and the identity edges of a
//! graph, computed with a union-find (union by size, path halving on insert).
//! Processing order does not affect the result: every component is named by
//! its smallest vertex identifier, so two managers built from the same edges
//! in any order compare equal.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::id::{EdgeId, VertexId};

/// Name of a ligature: its smallest member vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LigatureId(VertexId);

impl LigatureId {
    /// The name a vertex carries when no identity edge touches it.
    pub fn singleton(v: VertexId) -> Self {
        LigatureId(v)
    }

    /// The representative (smallest) vertex of the component.
    pub fn representative(self) -> VertexId {
        self.0
    }
}

impl std::fmt::Display for LigatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lig:{}", self.0)
    }
}

/// One materialised ligature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ligature {
    pub id: LigatureId,
    pub members: BTreeSet<VertexId>,
    pub identity_edges: BTreeSet<EdgeId>,
}

impl Ligature {
    /// A ligature of one vertex and no identity edges.
    pub fn is_trivial(&self) -> bool {
        self.members.len() == 1
    }
}

// ---------------------------------------------------------------------------
// Union-find
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    fn new() -> Self {
        Self {
            parent: Vec::new(),
            size: Vec::new(),
        }
    }

    fn push(&mut self) -> usize {
        let idx = self.parent.len();
        self.parent.push(idx);
        self.size.push(1);
        idx
    }

    /// Find with path halving.
    fn find_mut(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    /// Find without compression; union by size keeps trees O(log n) tall.
    fn find(&self, mut x: usize) -> usize {
        while self.parent[x] != x {
            x = self.parent[x];
        }
        x
    }

    /// Union by size. Returns the surviving root and the absorbed one, or
    /// `None` if both were already joined.
    fn union(&mut self, a: usize, b: usize) -> Option<(usize, usize)> {
        let ra = self.find_mut(a);
        let rb = self.find_mut(b);
        if ra == rb {
            return None;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small] = big;
        self.size[big] += self.size[small];
        Some((big, small))
    }
}

// ---------------------------------------------------------------------------
// Ligature manager
// ---------------------------------------------------------------------------

/// Union-find over vertex identifiers, fed by identity edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LigatureManager {
    index: BTreeMap<VertexId, usize>,
    vertices: Vec<VertexId>,
    /// Smallest vertex per root slot; only meaningful at roots.
    min_member: Vec<VertexId>,
    uf: UnionFind,
    identity_edges: BTreeMap<EdgeId, (VertexId, VertexId)>,
}

impl LigatureManager {
    /// A manager with no vertices.
    pub fn new() -> Self {
        Self {
            index: BTreeMap::new(),
            vertices: Vec::new(),
            min_member: Vec::new(),
            uf: UnionFind::new(),
            identity_edges: BTreeMap::new(),
        }
    }

    /// Build from the full vertex set and every identity edge.
    ///
    /// Endpoints missing from `vertices` are added on the fly.
    pub fn build(
        vertices: impl IntoIterator<Item = VertexId>,
        identity_edges: impl IntoIterator<Item = (EdgeId, VertexId, VertexId)>,
    ) -> Self {
        let mut manager = Self::new();
        for v in vertices {
            manager.add_vertex(v);
        }
        for (edge, a, b) in identity_edges {
            manager.insert_identity_edge(edge, a, b);
        }
        manager
    }

    /// Track a vertex as its own singleton ligature. Idempotent.
    pub fn add_vertex(&mut self, v: VertexId) -> usize {
        if let Some(&idx) = self.index.get(&v) {
            return idx;
        }
        let idx = self.uf.push();
        self.index.insert(v, idx);
        self.vertices.push(v);
        self.min_member.push(v);
        idx
    }

    /// Incrementally record an identity edge. Returns `true` if two
    /// previously separate ligatures were merged.
    pub fn insert_identity_edge(&mut self, edge: EdgeId, a: VertexId, b: VertexId) -> bool {
        let ia = self.add_vertex(a);
        let ib = self.add_vertex(b);
        self.identity_edges.insert(edge, (a, b));
        match self.uf.union(ia, ib) {
            Some((big, small)) => {
                if self.min_member[small] < self.min_member[big] {
                    self.min_member[big] = self.min_member[small];
                }
                true
            }
            None => false,
        }
    }

    /// Whether the vertex is tracked.
    pub fn contains(&self, v: VertexId) -> bool {
        self.index.contains_key(&v)
    }

    /// Ligature containing `v`.
    pub fn component_of(&self, v: VertexId) -> Option<LigatureId> {
        let idx = *self.index.get(&v)?;
        let root = self.uf.find(idx);
        Some(LigatureId(self.min_member[root]))
    }

    /// Whether `a` and `b` are joined by a chain of identity edges.
    ///
    /// A vertex is always connected to itself.
    pub fn are_connected(&self, a: VertexId, b: VertexId) -> bool {
        match (self.component_of(a), self.component_of(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// Vertices of a ligature.
    pub fn members_of(&self, id: LigatureId) -> BTreeSet<VertexId> {
        self.vertices
            .iter()
            .copied()
            .filter(|&v| self.component_of(v) == Some(id))
            .collect()
    }

    /// Identity edges inside a ligature.
    pub fn identity_edges_of(&self, id: LigatureId) -> BTreeSet<EdgeId> {
        self.identity_edges
            .iter()
            .filter(|(_, (a, _))| self.component_of(*a) == Some(id))
            .map(|(&e, _)| e)
            .collect()
    }

    /// Every identity edge the manager was fed.
    pub fn identity_edges(&self) -> BTreeSet<EdgeId> {
        self.identity_edges.keys().copied().collect()
    }

    /// Endpoints of a tracked identity edge.
    pub fn endpoints(&self, edge: EdgeId) -> Option<(VertexId, VertexId)> {
        self.identity_edges.get(&edge).copied()
    }

    /// All ligatures, ordered by identifier.
    pub fn ligatures(&self) -> Vec<Ligature> {
        let mut by_id: BTreeMap<LigatureId, Ligature> = BTreeMap::new();
        for &v in &self.vertices {
            if let Some(id) = self.component_of(v) {
                by_id
                    .entry(id)
                    .or_insert_with(|| Ligature {
                        id,
                        members: BTreeSet::new(),
                        identity_edges: BTreeSet::new(),
                    })
                    .members
                    .insert(v);
            }
        }
        for (&edge, &(a, _)) in &self.identity_edges {
            if let Some(lig) = self.component_of(a).and_then(|id| by_id.get_mut(&id)) {
                lig.identity_edges.insert(edge);
            }
        }
        by_id.into_values().collect()
    }

    /// The partition of tracked vertices into ligatures.
    pub fn partition(&self) -> BTreeSet<BTreeSet<VertexId>> {
        self.ligatures().into_iter().map(|l| l.members).collect()
    }

    /// Number of distinct ligatures.
    pub fn component_count(&self) -> usize {
        (0..self.vertices.len())
            .filter(|&idx| self.uf.find(idx) == idx)
            .count()
    }

    /// Number of tracked vertices.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

impl Default for LigatureManager {
    fn default() -> Self {
        Self::new()
    }
}
