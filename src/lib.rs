// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # egi-calculus
//!
//! Existential Graph Instances in Dau's formalisation of Peirce's Beta graphs,
//! together with the eight-rule transformation calculus.
//!
//! ## Architecture
//!
//! - **Identifiers** (`id`): typed, niche-optimised ids and a per-lineage allocator
//! - **Context tree** (`context`): the sheet of assertion, nested cuts and polarity
//! - **Alphabet** (`alphabet`): relation names with fixed arities, `=` built in
//! - **Graph core** (`graph`): vertices, hyperedges and contexts under four invariants
//! - **Ligatures** (`ligature`): union-find over identity edges
//! - **Rules** (`rules`): the eight pure transformations and their engine
//! - **Derivations** (`derivation`): client-side proof sequences
//! - **Configuration** (`config`): TOML alphabet and engine settings
//!
//! ## Library usage
//!
//! ```
//! use egi_calculus::alphabet::Alphabet;
//! use egi_calculus::graph::EgiBuilder;
//! use egi_calculus::id::ElementId;
//! use egi_calculus::rules::{Selection, add_double_cut, apply_erasure};
//!
//! // Socrates is human.
//! let mut b = EgiBuilder::new(Alphabet::with_relations([("Human", 1), ("Mortal", 1)]).unwrap())
//!     .unwrap();
//! let sheet = b.sheet();
//! let s = b.add_vertex(sheet, Some("Socrates".into())).unwrap();
//! let human = b.add_edge(sheet, "Human", &[s]).unwrap();
//! let egi = b.build().unwrap();
//!
//! // Not (not (Socrates is human)).
//! let both = Selection::new([ElementId::Vertex(s), ElementId::Edge(human)]);
//! let wrapped = add_double_cut(&egi, &both).unwrap();
//! assert_eq!(wrapped.cut_count(), 2);
//!
//! let erased = apply_erasure(&egi, &Selection::single(human)).unwrap();
//! assert_eq!(erased.edge_count(), 0);
//! assert!(erased.is_well_formed());
//! ```

pub mod alphabet;
pub mod config;
pub mod context;
pub mod derivation;
pub mod error;
pub mod graph;
pub mod id;
pub mod ligature;
pub mod rules;

pub use alphabet::{Alphabet, IDENTITY};
pub use config::CalculusConfig;
pub use context::{Context, ContextTree, Polarity};
pub use derivation::Derivation;
pub use error::{EgiError, EgiResult};
pub use graph::{Edge, Egi, EgiBuilder, GraphCore, Vertex};
pub use id::{ContextId, EdgeId, ElementId, ElementKind, VertexId};
pub use ligature::{LigatureId, LigatureManager};
pub use rules::{Rule, RuleEngine, RuleEngineConfig, RuleKind, RuleOutcome, Selection};
