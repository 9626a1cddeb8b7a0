//! Identifier space for existential graph instances.
//!
//! Every vertex, edge and context is named by a typed identifier backed by a
//! `NonZeroU64`. Identifiers are the only cross-reference mechanism: entities
//! never hold pointers to each other, all relationships are lookups through the
//! owning graph. The [`IdAllocator`] is owned by the graph it numbers and is
//! cloned into every derived instance, so identifiers stay unique along a
//! derivation.

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

use crate::error::IdError;

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(NonZeroU64);

        impl $name {
            /// Create an identifier from a raw `u64`.
            ///
            /// Returns `None` if `raw` is zero.
            pub fn new(raw: u64) -> Option<Self> {
                NonZeroU64::new(raw).map($name)
            }

            /// Get the underlying `u64` value.
            pub fn get(self) -> u64 {
                self.0.get()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

typed_id!(
    /// Identifier of a vertex (a line of identity's endpoint, Peirce's "dot").
    VertexId,
    "v"
);
typed_id!(
    /// Identifier of an edge (one instance of a relation).
    EdgeId,
    "e"
);
typed_id!(
    /// Identifier of a context: the sheet of assertion or a cut.
    ContextId,
    "c"
);

/// The kind of element an identifier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    /// The unique root context.
    Sheet,
    Vertex,
    Edge,
    Cut,
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementKind::Sheet => write!(f, "sheet"),
            ElementKind::Vertex => write!(f, "vertex"),
            ElementKind::Edge => write!(f, "edge"),
            ElementKind::Cut => write!(f, "cut"),
        }
    }
}

/// An element that can be directly enclosed by a context.
///
/// The sheet is never enclosed, so it has no variant here; cuts appear as
/// [`ElementId::Cut`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementId {
    Vertex(VertexId),
    Edge(EdgeId),
    Cut(ContextId),
}

impl ElementId {
    /// The element kind tag.
    pub fn kind(self) -> ElementKind {
        match self {
            ElementId::Vertex(_) => ElementKind::Vertex,
            ElementId::Edge(_) => ElementKind::Edge,
            ElementId::Cut(_) => ElementKind::Cut,
        }
    }

    /// The raw numeric value, unique across all kinds within one graph lineage.
    pub fn raw(self) -> u64 {
        match self {
            ElementId::Vertex(v) => v.get(),
            ElementId::Edge(e) => e.get(),
            ElementId::Cut(c) => c.get(),
        }
    }

    pub fn as_vertex(self) -> Option<VertexId> {
        match self {
            ElementId::Vertex(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_edge(self) -> Option<EdgeId> {
        match self {
            ElementId::Edge(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_cut(self) -> Option<ContextId> {
        match self {
            ElementId::Cut(c) => Some(c),
            _ => None,
        }
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementId::Vertex(v) => v.fmt(f),
            ElementId::Edge(e) => e.fmt(f),
            ElementId::Cut(c) => c.fmt(f),
        }
    }
}

impl From<VertexId> for ElementId {
    fn from(v: VertexId) -> Self {
        ElementId::Vertex(v)
    }
}

impl From<EdgeId> for ElementId {
    fn from(e: EdgeId) -> Self {
        ElementId::Edge(e)
    }
}

impl From<ContextId> for ElementId {
    fn from(c: ContextId) -> Self {
        ElementId::Cut(c)
    }
}

/// Monotone identifier allocator.
///
/// All kinds share one counter, so a raw value names at most one element of
/// a graph. Starts at 1; the sheet always receives the first value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Create a new allocator that starts from 1.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Create an allocator that resumes from a given value.
    pub fn starting_from(start: u64) -> Self {
        Self {
            next: start.max(1),
        }
    }

    fn next_raw(&mut self) -> Result<NonZeroU64, IdError> {
        let raw = NonZeroU64::new(self.next).ok_or(IdError::AllocatorExhausted)?;
        self.next = self.next.checked_add(1).unwrap_or(0);
        Ok(raw)
    }

    pub fn next_vertex(&mut self) -> Result<VertexId, IdError> {
        self.next_raw().map(VertexId)
    }

    pub fn next_edge(&mut self) -> Result<EdgeId, IdError> {
        self.next_raw().map(EdgeId)
    }

    pub fn next_context(&mut self) -> Result<ContextId, IdError> {
        self.next_raw().map(ContextId)
    }

    /// Return the next raw value that *would* be allocated, without consuming it.
    pub fn peek_next(&self) -> u64 {
        self.next
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_niche_optimized() {
        assert_eq!(
            std::mem::size_of::<Option<VertexId>>(),
            std::mem::size_of::<VertexId>()
        );
        assert_eq!(
            std::mem::size_of::<Option<ContextId>>(),
            std::mem::size_of::<ContextId>()
        );
    }

    #[test]
    fn zero_is_none() {
        assert!(EdgeId::new(0).is_none());
        assert_eq!(EdgeId::new(42).unwrap().get(), 42);
    }

    #[test]
    fn allocator_shares_one_counter_across_kinds() {
        let mut ids = IdAllocator::new();
        let c = ids.next_context().unwrap();
        let v = ids.next_vertex().unwrap();
        let e = ids.next_edge().unwrap();
        assert_eq!(c.get(), 1);
        assert_eq!(v.get(), 2);
        assert_eq!(e.get(), 3);
        assert_eq!(ids.peek_next(), 4);
    }

    #[test]
    fn allocator_starting_from() {
        let mut ids = IdAllocator::starting_from(100);
        assert_eq!(ids.next_vertex().unwrap().get(), 100);
        assert_eq!(IdAllocator::starting_from(0).peek_next(), 1);
    }

    #[test]
    fn allocator_reports_exhaustion() {
        let mut ids = IdAllocator::starting_from(u64::MAX);
        assert!(ids.next_vertex().is_ok());
        assert!(matches!(ids.next_vertex(), Err(IdError::AllocatorExhausted)));
    }

    #[test]
    fn cloned_allocators_continue_independently() {
        let mut a = IdAllocator::new();
        a.next_vertex().unwrap();
        let mut b = a.clone();
        assert_eq!(a.next_edge().unwrap().get(), b.next_edge().unwrap().get());
    }

    #[test]
    fn element_id_kind_and_display() {
        let v = VertexId::new(3).unwrap();
        let el: ElementId = v.into();
        assert_eq!(el.kind(), ElementKind::Vertex);
        assert_eq!(el.as_vertex(), Some(v));
        assert_eq!(el.as_edge(), None);
        assert_eq!(format!("{el}"), "v3");
        assert_eq!(format!("{}", ContextId::new(2).unwrap()), "c2");
        assert_eq!(format!("{}", ElementKind::Cut), "cut");
    }
}
