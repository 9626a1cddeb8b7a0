//! Context tree: the sheet of assertion and its nested cuts.
//!
//! Contexts form a rooted tree. The sheet is the root at depth 0; every cut
//! has exactly one parent and sits one level deeper. Polarity follows depth:
//! evenly enclosed contexts are positive, oddly enclosed ones negative.
//!
//! Dominance is the tree's ancestor-or-self relation: `a` dominates `b` when
//! walking `b`'s parent chain towards the sheet meets `a`. It is reflexive and
//! transitive. All walks here are iterative, so arbitrarily deep nesting never
//! grows the call stack.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::id::{ContextId, ElementId};

/// Polarity of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    /// Even depth (the sheet, double cuts, ...).
    Positive,
    /// Odd depth.
    Negative,
}

impl Polarity {
    /// Polarity of a context at the given depth.
    pub fn from_depth(depth: usize) -> Self {
        if depth % 2 == 0 {
            Polarity::Positive
        } else {
            Polarity::Negative
        }
    }

    pub fn is_positive(self) -> bool {
        self == Polarity::Positive
    }

    pub fn is_negative(self) -> bool {
        self == Polarity::Negative
    }

    /// The opposite polarity.
    pub fn flip(self) -> Self {
        match self {
            Polarity::Positive => Polarity::Negative,
            Polarity::Negative => Polarity::Positive,
        }
    }
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarity::Positive => write!(f, "positive"),
            Polarity::Negative => write!(f, "negative"),
        }
    }
}

/// A context: the sheet (no parent) or a cut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    id: ContextId,
    parent: Option<ContextId>,
    depth: usize,
    /// Directly enclosed vertices, edges and cuts.
    enclosed: BTreeSet<ElementId>,
    /// Directly enclosed cuts (a subset of `enclosed`, kept for fast walks).
    children: BTreeSet<ContextId>,
}

impl Context {
    fn new(id: ContextId, parent: Option<ContextId>, depth: usize) -> Self {
        Self {
            id,
            parent,
            depth,
            enclosed: BTreeSet::new(),
            children: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Parent context; `None` only for the sheet.
    pub fn parent(&self) -> Option<ContextId> {
        self.parent
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn polarity(&self) -> Polarity {
        Polarity::from_depth(self.depth)
    }

    pub fn is_sheet(&self) -> bool {
        self.parent.is_none()
    }

    /// Directly enclosed elements.
    pub fn enclosed(&self) -> &BTreeSet<ElementId> {
        &self.enclosed
    }

    /// Directly enclosed cuts.
    pub fn children(&self) -> &BTreeSet<ContextId> {
        &self.children
    }

    /// Whether nothing at all is directly enclosed.
    pub fn is_empty(&self) -> bool {
        self.enclosed.is_empty()
    }
}

/// The tree of contexts rooted at the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextTree {
    sheet: ContextId,
    contexts: BTreeMap<ContextId, Context>,
}

impl ContextTree {
    /// Create a tree holding only the sheet.
    pub fn new(sheet: ContextId) -> Self {
        let mut contexts = BTreeMap::new();
        contexts.insert(sheet, Context::new(sheet, None, 0));
        Self { sheet, contexts }
    }

    pub fn sheet(&self) -> ContextId {
        self.sheet
    }

    pub fn get(&self, id: ContextId) -> Option<&Context> {
        self.contexts.get(&id)
    }

    pub fn contains(&self, id: ContextId) -> bool {
        self.contexts.contains_key(&id)
    }

    /// Number of contexts, sheet included.
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// All contexts ordered by identifier.
    pub fn iter(&self) -> impl Iterator<Item = &Context> {
        self.contexts.values()
    }

    pub fn depth(&self, id: ContextId) -> Option<usize> {
        self.get(id).map(Context::depth)
    }

    pub fn polarity(&self, id: ContextId) -> Option<Polarity> {
        self.get(id).map(Context::polarity)
    }

    /// Whether `a` equals or transitively encloses `b`.
    ///
    /// Unknown contexts dominate nothing and are dominated by nothing.
    pub fn dominates(&self, a: ContextId, b: ContextId) -> bool {
        if !self.contains(a) {
            return false;
        }
        let mut current = Some(b);
        // Depth bounds the walk even if the parent chain were corrupted.
        let mut budget = self.contexts.len();
        while let Some(id) = current {
            if id == a {
                return true;
            }
            if budget == 0 {
                return false;
            }
            budget -= 1;
            current = self.get(id).and_then(Context::parent);
        }
        false
    }

    /// The chain from `id` up to the sheet, `id` first.
    pub fn ancestors(&self, id: ContextId) -> Vec<ContextId> {
        let mut chain = Vec::new();
        let mut current = self.get(id).map(Context::id);
        while let Some(ctx) = current {
            if chain.len() > self.contexts.len() {
                break;
            }
            chain.push(ctx);
            current = self.get(ctx).and_then(Context::parent);
        }
        chain
    }

    /// Deepest context dominating both `a` and `b`.
    pub fn lowest_common_ancestor(&self, a: ContextId, b: ContextId) -> Option<ContextId> {
        let of_a: BTreeSet<ContextId> = self.ancestors(a).into_iter().collect();
        self.ancestors(b).into_iter().find(|ctx| of_a.contains(ctx))
    }

    /// `id` and every context it transitively encloses, in pre-order.
    pub fn descendants(&self, id: ContextId) -> Vec<ContextId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut seen = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(ctx) = stack.pop() {
            if !seen.insert(ctx) {
                continue;
            }
            out.push(ctx);
            if let Some(context) = self.get(ctx) {
                // Reverse so that children come out in ascending id order.
                stack.extend(context.children.iter().rev().copied());
            }
        }
        out
    }

    /// Every context in pre-order from the sheet.
    pub fn pre_order(&self) -> Vec<ContextId> {
        self.descendants(self.sheet)
    }

    // -----------------------------------------------------------------------
    // Mutation (crate-internal; driven by the graph core)
    // -----------------------------------------------------------------------

    /// Create a cut with identifier `id` under `parent`.
    pub(crate) fn create_child(
        &mut self,
        parent: ContextId,
        id: ContextId,
    ) -> Result<&Context, GraphError> {
        let depth = self
            .depth(parent)
            .ok_or(GraphError::UnknownContext { context: parent })?;
        if let Some(p) = self.contexts.get_mut(&parent) {
            p.children.insert(id);
            p.enclosed.insert(ElementId::Cut(id));
        }
        self.contexts
            .insert(id, Context::new(id, Some(parent), depth + 1));
        self.get(id)
            .ok_or(GraphError::UnknownContext { context: id })
    }

    /// Record a vertex or edge as directly enclosed by `ctx`.
    pub(crate) fn enclose(&mut self, ctx: ContextId, element: ElementId) -> Result<(), GraphError> {
        let context = self
            .contexts
            .get_mut(&ctx)
            .ok_or(GraphError::UnknownContext { context: ctx })?;
        context.enclosed.insert(element);
        Ok(())
    }

    /// Drop a vertex or edge from `ctx`'s enclosure set.
    pub(crate) fn release(&mut self, ctx: ContextId, element: ElementId) -> bool {
        self.contexts
            .get_mut(&ctx)
            .map(|c| c.enclosed.remove(&element))
            .unwrap_or(false)
    }

    /// Remove a cut that encloses nothing, unlinking it from its parent.
    pub(crate) fn remove_empty_cut(&mut self, id: ContextId) -> Result<(), GraphError> {
        let context = self.get(id).ok_or(GraphError::NotFound {
            id: ElementId::Cut(id),
        })?;
        let parent = context.parent.ok_or(GraphError::SheetRemoval)?;
        if let Some(p) = self.contexts.get_mut(&parent) {
            p.children.remove(&id);
            p.enclosed.remove(&ElementId::Cut(id));
        }
        self.contexts.remove(&id);
        Ok(())
    }

    /// Move cut `id` (with its whole subtree) under `new_parent`, fixing depths.
    pub(crate) fn reparent(&mut self, id: ContextId, new_parent: ContextId) -> Result<(), GraphError> {
        let old_parent = self
            .get(id)
            .ok_or(GraphError::NotFound {
                id: ElementId::Cut(id),
            })?
            .parent
            .ok_or(GraphError::SheetRemoval)?;
        let parent_depth = self
            .depth(new_parent)
            .ok_or(GraphError::UnknownContext {
                context: new_parent,
            })?;
        if let Some(p) = self.contexts.get_mut(&old_parent) {
            p.children.remove(&id);
            p.enclosed.remove(&ElementId::Cut(id));
        }
        if let Some(p) = self.contexts.get_mut(&new_parent) {
            p.children.insert(id);
            p.enclosed.insert(ElementId::Cut(id));
        }
        if let Some(c) = self.contexts.get_mut(&id) {
            c.parent = Some(new_parent);
        }

        let mut stack = vec![(id, parent_depth + 1)];
        while let Some((ctx, depth)) = stack.pop() {
            if let Some(c) = self.contexts.get_mut(&ctx) {
                c.depth = depth;
                stack.extend(c.children.iter().map(|&child| (child, depth + 1)));
            }
        }
        Ok(())
    }

    /// Overwrite raw links; used by tests that need a corrupted tree.
    #[cfg(test)]
    pub(crate) fn corrupt_parent(&mut self, id: ContextId, parent: Option<ContextId>, depth: usize) {
        if let Some(c) = self.contexts.get_mut(&id) {
            c.parent = parent;
            c.depth = depth;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(raw: u64) -> ContextId {
        ContextId::new(raw).unwrap()
    }

    /// sheet(1) > c2 > c3 > c4, and sheet > c5
    fn nested() -> ContextTree {
        let mut tree = ContextTree::new(ctx(1));
        tree.create_child(ctx(1), ctx(2)).unwrap();
        tree.create_child(ctx(2), ctx(3)).unwrap();
        tree.create_child(ctx(3), ctx(4)).unwrap();
        tree.create_child(ctx(1), ctx(5)).unwrap();
        tree
    }

    #[test]
    fn polarity_follows_depth() {
        let tree = nested();
        assert_eq!(tree.polarity(ctx(1)), Some(Polarity::Positive));
        assert_eq!(tree.polarity(ctx(2)), Some(Polarity::Negative));
        assert_eq!(tree.polarity(ctx(3)), Some(Polarity::Positive));
        assert_eq!(tree.depth(ctx(4)), Some(3));
        assert_eq!(Polarity::Negative.flip(), Polarity::Positive);
    }

    #[test]
    fn create_child_under_unknown_parent_fails() {
        let mut tree = ContextTree::new(ctx(1));
        let err = tree.create_child(ctx(9), ctx(2)).unwrap_err();
        assert!(matches!(err, GraphError::UnknownContext { .. }));
        assert_eq!(tree.context_count(), 1);
    }

    #[test]
    fn dominance_is_reflexive_and_transitive() {
        let tree = nested();
        for id in tree.pre_order() {
            assert!(tree.dominates(id, id));
        }
        assert!(tree.dominates(ctx(1), ctx(4)));
        assert!(tree.dominates(ctx(2), ctx(4)));
        assert!(!tree.dominates(ctx(4), ctx(2)));
        assert!(!tree.dominates(ctx(5), ctx(3)));
        assert!(!tree.dominates(ctx(99), ctx(1)));
    }

    #[test]
    fn ancestors_and_lca() {
        let tree = nested();
        assert_eq!(tree.ancestors(ctx(4)), vec![ctx(4), ctx(3), ctx(2), ctx(1)]);
        assert_eq!(tree.lowest_common_ancestor(ctx(4), ctx(5)), Some(ctx(1)));
        assert_eq!(tree.lowest_common_ancestor(ctx(4), ctx(3)), Some(ctx(3)));
    }

    #[test]
    fn pre_order_visits_parents_first() {
        let tree = nested();
        assert_eq!(tree.pre_order(), vec![ctx(1), ctx(2), ctx(3), ctx(4), ctx(5)]);
        assert_eq!(tree.descendants(ctx(2)), vec![ctx(2), ctx(3), ctx(4)]);
    }

    #[test]
    fn reparent_shifts_subtree_depths() {
        let mut tree = nested();
        tree.reparent(ctx(3), ctx(5)).unwrap();
        assert_eq!(tree.get(ctx(3)).unwrap().parent(), Some(ctx(5)));
        assert_eq!(tree.depth(ctx(3)), Some(2));
        assert_eq!(tree.depth(ctx(4)), Some(3));
        assert!(tree.get(ctx(2)).unwrap().is_empty());
        assert!(tree.get(ctx(5)).unwrap().children().contains(&ctx(3)));
    }

    #[test]
    fn remove_empty_cut_unlinks_it() {
        let mut tree = nested();
        tree.remove_empty_cut(ctx(5)).unwrap();
        assert!(!tree.contains(ctx(5)));
        assert!(!tree.get(ctx(1)).unwrap().enclosed().contains(&ElementId::Cut(ctx(5))));
        assert!(matches!(
            tree.remove_empty_cut(ctx(1)),
            Err(GraphError::SheetRemoval)
        ));
    }

    #[test]
    fn deep_nesting_does_not_recurse() {
        let mut tree = ContextTree::new(ctx(1));
        let mut parent = ctx(1);
        for raw in 2..20_000 {
            tree.create_child(parent, ctx(raw)).unwrap();
            parent = ctx(raw);
        }
        assert!(tree.dominates(ctx(1), parent));
        assert_eq!(tree.descendants(ctx(1)).len(), 19_999);
        assert_eq!(tree.polarity(parent), Some(Polarity::Positive));
    }
}
