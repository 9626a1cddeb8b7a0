//! Derivations: chains of rule applications.
//!
//! The engine keeps no history. A [`Derivation`] is the client-side record of
//! a proof: the graph it started from, every rule applied so far, and each
//! intermediate graph. Only successful applications are recorded, so the rule
//! list of any derivation replays cleanly from its initial graph.

use crate::graph::Egi;
use crate::rules::{Rule, RuleEngine, RuleKind, RuleOutcome, RuleResult};

/// A proof in progress.
#[derive(Debug, Clone)]
pub struct Derivation {
    /// `states[0]` is the initial graph; `states[i + 1]` follows `steps[i]`.
    states: Vec<Egi>,
    steps: Vec<Rule>,
}

impl Derivation {
    pub fn new(initial: Egi) -> Self {
        Self {
            states: vec![initial],
            steps: Vec::new(),
        }
    }

    /// Rebuild a derivation by applying `steps` to `initial` in order.
    ///
    /// Fails with the first rejected step's error.
    pub fn replay(
        engine: &RuleEngine,
        initial: Egi,
        steps: impl IntoIterator<Item = Rule>,
    ) -> RuleResult<Self> {
        let mut derivation = Self::new(initial);
        for (index, rule) in steps.into_iter().enumerate() {
            if let Err(err) = derivation.apply(engine, rule) {
                tracing::warn!(step = index + 1, error = %err, "replay stopped");
                return Err(err);
            }
        }
        Ok(derivation)
    }

    pub fn initial(&self) -> &Egi {
        &self.states[0]
    }

    /// The graph reached by the last recorded step.
    pub fn current(&self) -> &Egi {
        &self.states[self.states.len() - 1]
    }

    pub fn steps(&self) -> &[Rule] {
        &self.steps
    }

    /// Graph after `step` applications; `state(0)` is the initial graph.
    pub fn state(&self, step: usize) -> Option<&Egi> {
        self.states.get(step)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Apply `rule` to the current graph and record it if it succeeds.
    pub fn apply(&mut self, engine: &RuleEngine, rule: Rule) -> RuleResult<RuleOutcome> {
        let outcome = engine.apply(self.current(), &rule)?;
        tracing::debug!(step = self.steps.len() + 1, rule = %rule.kind(), "derivation step");
        self.states.push(outcome.egi.clone());
        self.steps.push(rule);
        Ok(outcome)
    }

    /// Drop the last step, returning it.
    pub fn undo(&mut self) -> Option<Rule> {
        let rule = self.steps.pop()?;
        self.states.pop();
        Some(rule)
    }

    /// How often each rule was used.
    pub fn rule_counts(&self) -> [(RuleKind, usize); 8] {
        RuleKind::ALL.map(|kind| (kind, self.steps.iter().filter(|r| r.kind() == kind).count()))
    }
}
