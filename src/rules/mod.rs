//! The transformation rule engine.
//!
//! The eight rules of the calculus form a closed enum, [`Rule`], dispatched by
//! a single exhaustive `match` in [`RuleEngine::apply`]. Every application is
//! pure: the engine clones the input's core, rewrites the clone, seals it into
//! a new [`Egi`] and checks the well-formedness post-condition before handing
//! it back. The input is never touched.
//!
//! ```
//! use egi_calculus::alphabet::Alphabet;
//! use egi_calculus::graph::EgiBuilder;
//! use egi_calculus::rules::{Rule, RuleEngine, Selection};
//!
//! let mut b = EgiBuilder::new(Alphabet::with_relations([("Human", 1)]).unwrap()).unwrap();
//! let sheet = b.sheet();
//! let x = b.add_vertex(sheet, None).unwrap();
//! let human = b.add_edge(sheet, "Human", &[x]).unwrap();
//! let egi = b.build().unwrap();
//!
//! let engine = RuleEngine::default();
//! let out = engine
//!     .apply(&egi, &Rule::Erasure { selection: Selection::single(human) })
//!     .unwrap();
//! assert_eq!(out.egi.edge_count(), 0);
//! assert_eq!(egi.edge_count(), 1);
//! ```

pub mod double_cut;
pub mod equivalence;
pub mod fragment;
pub mod isolated;
pub mod iteration;
pub mod polarity;
pub mod selection;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::context::Polarity;
use crate::error::RuleError;
use crate::graph::{Egi, GraphCore};
use crate::id::{ContextId, ElementId, VertexId};

pub use equivalence::{Correspondence, correspond};
pub use fragment::{Fragment, FragmentArg, FragmentCut, FragmentEdge, FragmentParent, FragmentVertex};
pub use selection::{Region, Selection};

/// Result type for rule applications.
pub type RuleResult<T> = std::result::Result<T, RuleError>;

// ---------------------------------------------------------------------------
// Rule kinds
// ---------------------------------------------------------------------------

/// The eight rules, numbered as in Dau's calculus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Erasure,
    Insertion,
    Iteration,
    Deiteration,
    DoubleCutAddition,
    DoubleCutRemoval,
    IsolatedVertexAddition,
    IsolatedVertexRemoval,
}

impl RuleKind {
    pub const ALL: [RuleKind; 8] = [
        RuleKind::Erasure,
        RuleKind::Insertion,
        RuleKind::Iteration,
        RuleKind::Deiteration,
        RuleKind::DoubleCutAddition,
        RuleKind::DoubleCutRemoval,
        RuleKind::IsolatedVertexAddition,
        RuleKind::IsolatedVertexRemoval,
    ];

    /// Position in the calculus, 1 through 8.
    pub fn number(self) -> u8 {
        match self {
            RuleKind::Erasure => 1,
            RuleKind::Insertion => 2,
            RuleKind::Iteration => 3,
            RuleKind::Deiteration => 4,
            RuleKind::DoubleCutAddition => 5,
            RuleKind::DoubleCutRemoval => 6,
            RuleKind::IsolatedVertexAddition => 7,
            RuleKind::IsolatedVertexRemoval => 8,
        }
    }

    /// The polarity a rule demands of its context, if it demands one.
    pub fn required_polarity(self) -> Option<Polarity> {
        match self {
            RuleKind::Erasure => Some(Polarity::Positive),
            RuleKind::Insertion => Some(Polarity::Negative),
            _ => None,
        }
    }
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RuleKind::Erasure => "erasure",
            RuleKind::Insertion => "insertion",
            RuleKind::Iteration => "iteration",
            RuleKind::Deiteration => "de-iteration",
            RuleKind::DoubleCutAddition => "double-cut addition",
            RuleKind::DoubleCutRemoval => "double-cut removal",
            RuleKind::IsolatedVertexAddition => "isolated-vertex addition",
            RuleKind::IsolatedVertexRemoval => "isolated-vertex removal",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Rule requests
// ---------------------------------------------------------------------------

/// One rule application, with its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    /// Remove a closed region from a positive context.
    Erasure { selection: Selection },
    /// Place a fragment into a negative context.
    Insertion { context: ContextId, fragment: Fragment },
    /// Copy a region into its container or a context it encloses.
    Iteration { selection: Selection, target: ContextId },
    /// Remove `copy`, which must match `original` up to coreference.
    Deiteration { copy: Selection, original: Selection },
    /// Wrap a co-located selection in two nested cuts.
    DoubleCutAddition { selection: Selection },
    /// Dissolve `outer` and the single cut inside it.
    DoubleCutRemoval { outer: ContextId },
    IsolatedVertexAddition {
        context: ContextId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    IsolatedVertexRemoval { vertex: VertexId },
}

impl Rule {
    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::Erasure { .. } => RuleKind::Erasure,
            Rule::Insertion { .. } => RuleKind::Insertion,
            Rule::Iteration { .. } => RuleKind::Iteration,
            Rule::Deiteration { .. } => RuleKind::Deiteration,
            Rule::DoubleCutAddition { .. } => RuleKind::DoubleCutAddition,
            Rule::DoubleCutRemoval { .. } => RuleKind::DoubleCutRemoval,
            Rule::IsolatedVertexAddition { .. } => RuleKind::IsolatedVertexAddition,
            Rule::IsolatedVertexRemoval { .. } => RuleKind::IsolatedVertexRemoval,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the rule engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleEngineConfig {
    /// Check every result for well-formedness (default: true).
    pub verify_results: bool,
    /// Panic instead of returning `MalformedResult` (default: debug builds only).
    pub fail_fast: bool,
    /// Upper bound on the elements a selection may resolve to (default: 4096).
    pub max_selection: usize,
}

impl Default for RuleEngineConfig {
    fn default() -> Self {
        Self {
            verify_results: true,
            fail_fast: cfg!(debug_assertions),
            max_selection: 4096,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What a rule implementation did to the scratch core.
#[derive(Debug, Clone, Default)]
pub(crate) struct Change {
    pub added: BTreeSet<ElementId>,
    pub removed: BTreeSet<ElementId>,
    pub placed: BTreeSet<ElementId>,
}

/// Result of a successful rule application.
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    /// The new graph instance.
    pub egi: Egi,
    /// Every element created, nested ones included.
    pub added: BTreeSet<ElementId>,
    /// Every element deleted, nested ones included.
    pub removed: BTreeSet<ElementId>,
    /// Elements created directly in the target context.
    pub placed: BTreeSet<ElementId>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Stateless dispatcher over the eight rules.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    config: RuleEngineConfig,
}

impl RuleEngine {
    pub fn new(config: RuleEngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RuleEngineConfig {
        &self.config
    }

    /// Apply one rule to `egi`, returning a new validated instance.
    pub fn apply(&self, egi: &Egi, rule: &Rule) -> RuleResult<RuleOutcome> {
        let kind = rule.kind();
        let mut core: GraphCore = egi.core().clone();
        let config = &self.config;

        let change = match rule {
            Rule::Erasure { selection } => polarity::erase(&mut core, selection, config),
            Rule::Insertion { context, fragment } => {
                polarity::insert(&mut core, *context, fragment, config)
            }
            Rule::Iteration { selection, target } => {
                iteration::iterate(&mut core, selection, *target, config)
            }
            Rule::Deiteration { copy, original } => {
                iteration::deiterate(egi, &mut core, copy, original, config)
            }
            Rule::DoubleCutAddition { selection } => double_cut::add(&mut core, selection, config),
            Rule::DoubleCutRemoval { outer } => double_cut::remove(&mut core, *outer),
            Rule::IsolatedVertexAddition { context, label } => {
                isolated::add(&mut core, *context, label.clone())
            }
            Rule::IsolatedVertexRemoval { vertex } => isolated::remove(&mut core, *vertex),
        };

        let change = match change {
            Ok(change) => change,
            Err(err) => {
                tracing::debug!(rule = %kind, error = %err, "rule rejected");
                return Err(err);
            }
        };

        let result = Egi::seal(core);
        self.verify(kind, &result)?;
        tracing::debug!(
            rule = %kind,
            added = change.added.len(),
            removed = change.removed.len(),
            vertices = result.vertex_count(),
            edges = result.edge_count(),
            cuts = result.cut_count(),
            "rule applied"
        );

        Ok(RuleOutcome {
            egi: result,
            added: change.added,
            removed: change.removed,
            placed: change.placed,
        })
    }

    /// Post-condition: the result must be well formed.
    fn verify(&self, kind: RuleKind, result: &Egi) -> RuleResult<()> {
        if !self.config.verify_results {
            return Ok(());
        }
        let report = result.check();
        if report.is_ok() {
            return Ok(());
        }
        let count = report.violations().len();
        let first = report
            .violations()
            .first()
            .map(ToString::to_string)
            .unwrap_or_default();
        tracing::error!(rule = %kind, count, first = %first, "rule produced a malformed graph");
        if self.config.fail_fast {
            panic!("{kind} produced a malformed graph: {first}");
        }
        Err(RuleError::MalformedResult {
            rule: kind,
            count,
            first,
        })
    }
}

// ---------------------------------------------------------------------------
// Free functions over the default engine
// ---------------------------------------------------------------------------

fn run(egi: &Egi, rule: Rule) -> RuleResult<Egi> {
    RuleEngine::default().apply(egi, &rule).map(|out| out.egi)
}

/// Rule 1.
pub fn apply_erasure(egi: &Egi, selection: &Selection) -> RuleResult<Egi> {
    run(egi, Rule::Erasure {
        selection: selection.clone(),
    })
}

/// Rule 2.
pub fn apply_insertion(egi: &Egi, context: ContextId, fragment: &Fragment) -> RuleResult<Egi> {
    run(egi, Rule::Insertion {
        context,
        fragment: fragment.clone(),
    })
}

/// Rule 3.
pub fn apply_iteration(egi: &Egi, selection: &Selection, target: ContextId) -> RuleResult<Egi> {
    run(egi, Rule::Iteration {
        selection: selection.clone(),
        target,
    })
}

/// Rule 4.
pub fn apply_deiteration(egi: &Egi, copy: &Selection, original: &Selection) -> RuleResult<Egi> {
    run(egi, Rule::Deiteration {
        copy: copy.clone(),
        original: original.clone(),
    })
}

/// Rule 5.
pub fn add_double_cut(egi: &Egi, selection: &Selection) -> RuleResult<Egi> {
    run(egi, Rule::DoubleCutAddition {
        selection: selection.clone(),
    })
}

/// Rule 6.
pub fn remove_double_cut(egi: &Egi, outer: ContextId) -> RuleResult<Egi> {
    run(egi, Rule::DoubleCutRemoval { outer })
}

/// Rule 7.
pub fn add_isolated_vertex(egi: &Egi, context: ContextId, label: Option<String>) -> RuleResult<Egi> {
    run(egi, Rule::IsolatedVertexAddition { context, label })
}

/// Rule 8.
pub fn remove_isolated_vertex(egi: &Egi, vertex: VertexId) -> RuleResult<Egi> {
    run(egi, Rule::IsolatedVertexRemoval { vertex })
}
