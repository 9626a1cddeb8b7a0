//! Rich diagnostic error types for the EGI calculus.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains. Every variant except
//! [`RuleError::MalformedResult`] is an expected outcome of an illegal request
//! and is returned as a value.

use miette::Diagnostic;
use thiserror::Error;

use crate::context::Polarity;
use crate::id::{ContextId, EdgeId, ElementId, VertexId};
use crate::rules::RuleKind;

/// Top-level error type for the crate.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum EgiError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Id(#[from] IdError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Alphabet(#[from] AlphabetError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Identifier errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IdError {
    #[error("identifier allocator exhausted: cannot allocate more than u64::MAX elements")]
    #[diagnostic(
        code(egi::id::exhausted),
        help(
            "The identifier space of this graph lineage is exhausted. \
             This requires 2^64 allocations and indicates an allocation loop."
        )
    )]
    AllocatorExhausted,
}

// ---------------------------------------------------------------------------
// Alphabet errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum AlphabetError {
    #[error("relation \"{name}\" is already registered with arity {registered}, not {requested}")]
    #[diagnostic(
        code(egi::alphabet::conflicting_arity),
        help(
            "Relation names have a fixed arity. Use a different name for the \
             {requested}-ary relation."
        )
    )]
    ConflictingArity {
        name: String,
        registered: usize,
        requested: usize,
    },

    #[error("the identity relation \"=\" is fixed at arity 2, cannot register arity {arity}")]
    #[diagnostic(
        code(egi::alphabet::identity),
        help("\"=\" is pre-registered in every alphabet and cannot be redefined.")
    )]
    IdentityRedefined { arity: usize },

    #[error("relation \"{name}\" cannot have arity 0")]
    #[diagnostic(
        code(egi::alphabet::zero_arity),
        help("Every relation connects at least one vertex. Propositional atoms take one argument.")
    )]
    ZeroArity { name: String },

    #[error("relation name must not be empty")]
    #[diagnostic(code(egi::alphabet::empty_name))]
    EmptyName,
}

// ---------------------------------------------------------------------------
// Graph core errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("element not found: {id}")]
    #[diagnostic(
        code(egi::graph::not_found),
        help("The identifier does not name a live element of this graph instance.")
    )]
    NotFound { id: ElementId },

    #[error("unknown context: {context}")]
    #[diagnostic(
        code(egi::graph::unknown_context),
        help("Create the cut with `add_cut` first, or use the sheet returned by `sheet()`.")
    )]
    UnknownContext { context: ContextId },

    #[error("relation \"{name}\" with arity {arity} is not registered")]
    #[diagnostic(
        code(egi::graph::unregistered_relation),
        help(
            "Register the relation in the alphabet before creating edges, \
             and make sure the number of vertices matches the registered arity."
        )
    )]
    UnregisteredRelation { name: String, arity: usize },

    #[error(
        "edge context {edge_context} does not dominate context {vertex_context} of vertex {vertex}"
    )]
    #[diagnostic(
        code(egi::graph::domination),
        help(
            "An edge must sit in the same context as each of its vertices or in a \
             context that encloses them."
        )
    )]
    DominationViolation {
        edge_context: ContextId,
        vertex: VertexId,
        vertex_context: ContextId,
    },

    #[error("the sheet of assertion cannot be removed")]
    #[diagnostic(
        code(egi::graph::sheet_removal),
        help("Only cuts can be removed; the sheet is the root of every graph.")
    )]
    SheetRemoval,

    #[error("graph is not well formed: {count} violation(s), first: {first}")]
    #[diagnostic(
        code(egi::graph::malformed),
        help("Inspect `check()` for the full list of violated invariants.")
    )]
    Malformed { count: usize, first: String },

    #[error("snapshot serialization failed: {message}")]
    #[diagnostic(code(egi::graph::serialization))]
    Serialization { message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Id(#[from] IdError),
}

// ---------------------------------------------------------------------------
// Rule errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RuleError {
    #[error("{rule} requires a {required} context, but {context} (depth {depth}) is not")]
    #[diagnostic(
        code(egi::rule::wrong_polarity),
        help(
            "Erasure only applies in positive (evenly enclosed) contexts; \
             insertion only in negative (oddly enclosed) ones."
        )
    )]
    WrongPolarity {
        rule: RuleKind,
        context: ContextId,
        depth: usize,
        required: Polarity,
    },

    #[error("vertex {vertex} is not isolated: {incident} incident edge(s)")]
    #[diagnostic(
        code(egi::rule::not_isolated),
        help("Erase or de-iterate the incident edges first; only heavy dots can be removed by this rule.")
    )]
    NotIsolated { vertex: VertexId, incident: usize },

    #[error("structural mismatch: {reason}")]
    #[diagnostic(
        code(egi::rule::structural_mismatch),
        help(
            "De-iteration needs a copy that matches the original up to coreference: \
             same nesting, relation names, argument order and constant labels."
        )
    )]
    StructuralMismatch { reason: String },

    #[error("invalid nesting: {reason}")]
    #[diagnostic(
        code(egi::rule::invalid_nesting),
        help(
            "Iteration may only copy inward (into the same or a deeper context); \
             double-cut removal needs a cut that directly and solely encloses another cut."
        )
    )]
    InvalidNesting { reason: String },

    #[error("element not found: {id}")]
    #[diagnostic(
        code(egi::rule::not_found),
        help("The selection refers to an identifier that does not exist in this graph instance.")
    )]
    NotFound { id: ElementId },

    #[error("selection is not closed: edge {edge} still references vertex {vertex}")]
    #[diagnostic(
        code(egi::rule::open_selection),
        help(
            "Include the edge in the selection, or leave the vertex out. \
             A rule may not leave an edge pointing at a removed or relocated vertex."
        )
    )]
    OpenSelection { vertex: VertexId, edge: EdgeId },

    #[error("selection of {size} elements exceeds the configured maximum of {max}")]
    #[diagnostic(
        code(egi::rule::selection_too_large),
        help("Raise `max_selection` in the engine configuration.")
    )]
    SelectionTooLarge { size: usize, max: usize },

    #[error("{rule} produced a malformed graph: {count} violation(s), first: {first}")]
    #[diagnostic(
        code(egi::rule::malformed_result),
        help("This is a bug in the rule implementation, not a user error. Please report it.")
    )]
    MalformedResult {
        rule: RuleKind,
        count: usize,
        first: String,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(egi::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(egi::config::parse),
        help("Check the TOML syntax. Relations are declared as `Name = arity` under `[alphabet]`.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(egi::config::write),
        help("Ensure you have write permissions to the target directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Alphabet(#[from] AlphabetError),
}

/// Convenience alias for functions returning crate-level results.
pub type EgiResult<T> = std::result::Result<T, EgiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_converts_to_egi_error() {
        let err = GraphError::UnregisteredRelation {
            name: "Mortal".into(),
            arity: 2,
        };
        let top: EgiError = err.into();
        assert!(matches!(
            top,
            EgiError::Graph(GraphError::UnregisteredRelation { .. })
        ));
    }

    #[test]
    fn rule_error_wraps_graph_error() {
        let graph_err = GraphError::SheetRemoval;
        let rule_err: RuleError = graph_err.into();
        assert!(matches!(rule_err, RuleError::Graph(GraphError::SheetRemoval)));
    }

    #[test]
    fn id_error_lifts_through_graph_error() {
        let err: GraphError = IdError::AllocatorExhausted.into();
        let top: EgiError = err.into();
        assert!(matches!(
            top,
            EgiError::Graph(GraphError::Id(IdError::AllocatorExhausted))
        ));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = RuleError::WrongPolarity {
            rule: RuleKind::Erasure,
            context: ContextId::new(2).unwrap(),
            depth: 1,
            required: Polarity::Positive,
        };
        let msg = format!("{err}");
        assert!(msg.contains("erasure"));
        assert!(msg.contains("positive"));
        assert!(msg.contains("c2"));

        let err = GraphError::UnregisteredRelation {
            name: "Mortal".into(),
            arity: 2,
        };
        assert!(format!("{err}").contains("Mortal"));
    }
}
