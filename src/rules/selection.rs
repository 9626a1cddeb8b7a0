//! Selections and the regions they resolve to.
//!
//! A [`Selection`] names elements that must all sit directly in one common
//! *container* context. Resolving it against a graph yields a [`Region`]:
//! the selected elements plus everything transitively enclosed by selected
//! cuts. An empty selection has no elements to locate its container, so it
//! must carry an explicit context.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::RuleError;
use crate::graph::GraphCore;
use crate::id::{ContextId, EdgeId, ElementId, VertexId};

use super::RuleResult;

/// A set of co-located elements targeted by a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    elements: BTreeSet<ElementId>,
    /// Expected container; mandatory for an empty selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<ContextId>,
}

impl Selection {
    pub fn new<I, E>(elements: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<ElementId>,
    {
        Self {
            elements: elements.into_iter().map(Into::into).collect(),
            context: None,
        }
    }

    /// Select one element.
    pub fn single(element: impl Into<ElementId>) -> Self {
        Self::new([element.into()])
    }

    /// The empty selection inside `context`.
    pub fn empty_in(context: ContextId) -> Self {
        Self {
            elements: BTreeSet::new(),
            context: Some(context),
        }
    }

    /// Pin the container the elements must share.
    pub fn within(mut self, context: ContextId) -> Self {
        self.context = Some(context);
        self
    }

    pub fn elements(&self) -> &BTreeSet<ElementId> {
        &self.elements
    }

    pub fn context(&self) -> Option<ContextId> {
        self.context
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Locate the selection in `core` and close it under enclosure.
    pub fn resolve(&self, core: &GraphCore, max: usize) -> RuleResult<Region> {
        if self.elements.len() > max {
            return Err(RuleError::SelectionTooLarge {
                size: self.elements.len(),
                max,
            });
        }

        let mut container = self.context;
        if let Some(ctx) = container {
            if !core.tree().contains(ctx) {
                return Err(RuleError::NotFound {
                    id: ElementId::Cut(ctx),
                });
            }
        }

        for &element in &self.elements {
            if element == ElementId::Cut(core.sheet()) {
                return Err(RuleError::InvalidNesting {
                    reason: "the sheet of assertion cannot be selected".into(),
                });
            }
            if !core.contains(element) {
                return Err(RuleError::NotFound { id: element });
            }
            let Some(ctx) = core.element_context(element) else {
                return Err(RuleError::NotFound { id: element });
            };
            match container {
                None => container = Some(ctx),
                Some(expected) if expected != ctx => {
                    return Err(RuleError::InvalidNesting {
                        reason: format!(
                            "selected elements are not co-located: {element} sits in {ctx}, not {expected}"
                        ),
                    });
                }
                Some(_) => {}
            }
        }

        let Some(container) = container else {
            return Err(RuleError::InvalidNesting {
                reason: "an empty selection needs an explicit context".into(),
            });
        };

        let mut elements = self.elements.clone();
        for cut in self.elements.iter().filter_map(|el| el.as_cut()) {
            elements.extend(core.enclosed_transitively(cut));
        }
        if elements.len() > max {
            return Err(RuleError::SelectionTooLarge {
                size: elements.len(),
                max,
            });
        }

        Ok(Region {
            container,
            top: self.elements.clone(),
            elements,
        })
    }
}

impl From<ElementId> for Selection {
    fn from(element: ElementId) -> Self {
        Self::single(element)
    }
}

impl From<EdgeId> for Selection {
    fn from(edge: EdgeId) -> Self {
        Self::single(edge)
    }
}

impl From<VertexId> for Selection {
    fn from(vertex: VertexId) -> Self {
        Self::single(vertex)
    }
}

impl From<ContextId> for Selection {
    fn from(cut: ContextId) -> Self {
        Self::single(cut)
    }
}

/// A resolved selection: the subgraph a rule acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Context directly enclosing every selected element.
    pub container: ContextId,
    /// The selected elements themselves.
    pub top: BTreeSet<ElementId>,
    /// Selected elements plus everything enclosed by selected cuts.
    pub elements: BTreeSet<ElementId>,
}

impl Region {
    pub fn contains(&self, element: impl Into<ElementId>) -> bool {
        self.elements.contains(&element.into())
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.elements.iter().filter_map(|el| el.as_vertex())
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.elements.iter().filter_map(|el| el.as_edge())
    }

    pub fn cuts(&self) -> impl Iterator<Item = ContextId> + '_ {
        self.elements.iter().filter_map(|el| el.as_cut())
    }

    /// Depth of `ctx` relative to the container, if `ctx` is the container or
    /// a cut of the region.
    pub fn relative_depth(&self, core: &GraphCore, ctx: ContextId) -> Option<usize> {
        if ctx != self.container && !self.contains(ElementId::Cut(ctx)) {
            return None;
        }
        let base = core.depth(self.container)?;
        core.depth(ctx).map(|d| d - base)
    }

    /// First edge outside the region that touches a region vertex.
    pub fn open_incidence(&self, core: &GraphCore) -> Option<(VertexId, EdgeId)> {
        self.vertices().find_map(|v| {
            core.vertex(v)?
                .incident()
                .iter()
                .find(|&&e| !self.contains(e))
                .map(|&e| (v, e))
        })
    }

    /// First region edge that references a vertex outside the region.
    pub fn external_reference(&self, core: &GraphCore) -> Option<(VertexId, EdgeId)> {
        self.edges().find_map(|e| {
            core.edge(e)?
                .vertices()
                .iter()
                .find(|&&v| !self.contains(v))
                .map(|&v| (v, e))
        })
    }
}
