//! End-to-end integration tests for the EGI calculus.
//!
//! These tests drive the public API only: construction through the builder,
//! proofs through the rule engine and derivations, and export through the
//! traversal snapshot and configuration files.

use std::collections::BTreeSet;

use miette::Diagnostic;

use egi_calculus::alphabet::Alphabet;
use egi_calculus::config::CalculusConfig;
use egi_calculus::context::Polarity;
use egi_calculus::derivation::Derivation;
use egi_calculus::error::{EgiError, GraphError, RuleError};
use egi_calculus::graph::{EgiBuilder, EgiSnapshot};
use egi_calculus::id::ElementId;
use egi_calculus::rules::{
    Fragment, FragmentArg, FragmentParent, Rule, RuleEngine, RuleKind, Selection, apply_erasure,
    apply_insertion, remove_double_cut,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn erasure_depends_on_enclosing_polarity() {
    init_tracing();
    let mut b = EgiBuilder::new(Alphabet::with_relations([("Human", 1)]).unwrap()).unwrap();
    let sheet = b.sheet();
    let cut1 = b.add_cut(sheet).unwrap();
    let cut2 = b.add_cut(cut1).unwrap();
    let v1 = b.add_vertex(cut1, None).unwrap();
    let e1 = b.add_edge(cut1, "Human", &[v1]).unwrap();
    let egi = b.build().unwrap();

    assert_eq!(egi.depth(cut1), Some(1));
    assert_eq!(egi.polarity(cut1), Some(Polarity::Negative));
    assert_eq!(egi.depth(cut2), Some(2));
    assert_eq!(egi.polarity(cut2), Some(Polarity::Positive));

    let err = apply_erasure(&egi, &Selection::single(e1)).unwrap_err();
    assert!(matches!(err, RuleError::WrongPolarity { rule: RuleKind::Erasure, .. }));

    // The same edge on the sheet.
    let mut b = egi.to_builder();
    b.remove_edge(e1).unwrap();
    let e1 = b.add_edge(sheet, "Human", &[v1]).unwrap();
    let egi = b.build().unwrap();

    let erased = apply_erasure(&egi, &Selection::single(e1)).unwrap();
    assert!(erased.edge(e1).is_none());
    assert!(erased.edges().all(|e| e.id() != e1));
    assert!(erased.is_well_formed());
}

#[test]
fn arity_mismatch_is_unregistered() {
    init_tracing();
    let mut b = EgiBuilder::new(Alphabet::with_relations([("Mortal", 1)]).unwrap()).unwrap();
    let sheet = b.sheet();
    let v1 = b.add_vertex(sheet, None).unwrap();
    let v2 = b.add_vertex(sheet, None).unwrap();
    let err = b.add_edge(sheet, "Mortal", &[v1, v2]).unwrap_err();
    assert!(matches!(
        err,
        GraphError::UnregisteredRelation { ref name, arity: 2 } if name == "Mortal"
    ));
    // The failed call left the draft as it was.
    assert_eq!(b.edge_count(), 0);
    assert!(b.is_well_formed());
}

#[test]
fn modus_ponens_as_a_derivation() {
    init_tracing();
    // sheet: P(a), [ P(b) [ Q(c) ] ] with a, b, c all the constant Socrates.
    let mut b =
        EgiBuilder::new(Alphabet::with_relations([("P", 1), ("Q", 1)]).unwrap()).unwrap();
    let sheet = b.sheet();
    let a = b.add_vertex(sheet, Some("Socrates".into())).unwrap();
    let pa = b.add_edge(sheet, "P", &[a]).unwrap();
    let outer = b.add_cut(sheet).unwrap();
    let bv = b.add_vertex(outer, Some("Socrates".into())).unwrap();
    let pb = b.add_edge(outer, "P", &[bv]).unwrap();
    let inner = b.add_cut(outer).unwrap();
    let c = b.add_vertex(inner, Some("Socrates".into())).unwrap();
    let qc = b.add_edge(inner, "Q", &[c]).unwrap();
    let premise = b.build().unwrap();

    let engine = RuleEngine::default();
    let mut proof = Derivation::new(premise.clone());

    // The inner P(Socrates) is a copy of the one on the sheet.
    proof
        .apply(
            &engine,
            Rule::Deiteration {
                copy: Selection::new([ElementId::Vertex(bv), ElementId::Edge(pb)]),
                original: Selection::new([ElementId::Vertex(a), ElementId::Edge(pa)]),
            },
        )
        .unwrap();
    proof.apply(&engine, Rule::DoubleCutRemoval { outer }).unwrap();

    let conclusion = proof.current();
    assert_eq!(conclusion.cut_count(), 0);
    assert_eq!(conclusion.edge(qc).unwrap().context(), sheet);
    assert_eq!(conclusion.vertex(c).unwrap().context(), sheet);
    assert!(conclusion.edge(pa).is_some());
    assert!(conclusion.vertex(bv).is_none());
    assert_eq!(proof.len(), 2);

    // The proof replays from its rule list alone.
    let replayed = Derivation::replay(&engine, premise, proof.steps().to_vec()).unwrap();
    assert_eq!(replayed.current(), conclusion);

    // Q(Socrates) may now be erased from the positive sheet.
    let erased = apply_erasure(conclusion, &Selection::single(qc)).unwrap();
    assert_eq!(erased.edge_count(), 1);
    assert!(erased.context(inner).is_none());
}

#[test]
fn iteration_round_trip_through_a_derivation() {
    init_tracing();
    let mut b =
        EgiBuilder::new(Alphabet::with_relations([("Loves", 2), ("Human", 1)]).unwrap()).unwrap();
    let sheet = b.sheet();
    let x = b.add_vertex(sheet, None).unwrap();
    let y = b.add_vertex(sheet, None).unwrap();
    let loves = b.add_edge(sheet, "Loves", &[x, y]).unwrap();
    b.add_edge(sheet, "Human", &[x]).unwrap();
    let cut = b.add_cut(sheet).unwrap();
    let start = b.build().unwrap();

    let engine = RuleEngine::default();
    let mut proof = Derivation::new(start.clone());
    let copied = proof
        .apply(
            &engine,
            Rule::Iteration {
                selection: Selection::single(loves),
                target: cut,
            },
        )
        .unwrap();

    // Both arguments live on the sheet, outside the cut: two bridges.
    let after = proof.current();
    assert_eq!(after.identity_edges().count(), 2);
    assert_eq!(copied.placed.len(), 3);
    let copy = after.edges_in(cut).next().unwrap();
    let args = after.edge(copy).unwrap().vertices().to_vec();
    assert!(after.are_coreferent(args[0], x));
    assert!(after.are_coreferent(args[1], y));
    assert!(!after.are_coreferent(args[0], y));

    proof
        .apply(
            &engine,
            Rule::Deiteration {
                copy: Selection::new(copied.placed.iter().copied()),
                original: Selection::single(loves),
            },
        )
        .unwrap();
    assert_eq!(proof.current(), &start);
}

#[test]
fn insertion_then_erasure_of_a_nested_fragment() {
    init_tracing();
    let mut b = EgiBuilder::new(
        Alphabet::with_relations([("Unicorn", 1), ("Horned", 1)]).unwrap(),
    )
    .unwrap();
    let sheet = b.sheet();
    let cut = b.add_cut(sheet).unwrap();
    let egi = b.build().unwrap();

    // [ [ x Unicorn(x) Horned(x) ] ] inserted into the negative cut.
    let mut f = Fragment::new();
    let inner = f.add_cut(FragmentParent::Target);
    let x = f.add_vertex(FragmentParent::Cut(inner), None);
    f.add_edge(FragmentParent::Cut(inner), "Unicorn", [FragmentArg::Local(x)]);
    f.add_edge(FragmentParent::Cut(inner), "Horned", [FragmentArg::Local(x)]);
    let inserted = apply_insertion(&egi, cut, &f).unwrap();
    assert_eq!(inserted.cut_count(), 2);
    assert_eq!(inserted.edge_count(), 2);

    let new_cut = *inserted.context(cut).unwrap().children().iter().next().unwrap();
    assert_eq!(inserted.polarity(new_cut), Some(Polarity::Positive));

    // Erasing the new cut from the negative context is illegal.
    let err = apply_erasure(&inserted, &Selection::single(new_cut)).unwrap_err();
    assert!(matches!(err, RuleError::WrongPolarity { .. }));

    // But the whole outer cut sits on the sheet and may go.
    let cleared = apply_erasure(&inserted, &Selection::single(cut)).unwrap();
    assert_eq!(cleared.cut_count(), 0);
    assert_eq!(cleared.vertex_count(), 0);
}

#[test]
fn rules_never_touch_their_input() {
    init_tracing();
    let mut b = EgiBuilder::new(Alphabet::with_relations([("P", 1)]).unwrap()).unwrap();
    let sheet = b.sheet();
    let x = b.add_vertex(sheet, None).unwrap();
    let px = b.add_edge(sheet, "P", &[x]).unwrap();
    let cut = b.add_cut(sheet).unwrap();
    let egi = b.build().unwrap();
    let before = egi.snapshot();

    let engine = RuleEngine::default();
    let rules = [
        Rule::Erasure {
            selection: Selection::new([ElementId::Vertex(x), ElementId::Edge(px)]),
        },
        Rule::Iteration {
            selection: Selection::single(px),
            target: cut,
        },
        Rule::DoubleCutAddition {
            selection: Selection::single(cut),
        },
        Rule::IsolatedVertexAddition {
            context: cut,
            label: None,
        },
    ];
    for rule in &rules {
        let out = engine.apply(&egi, rule).unwrap();
        assert!(out.egi.is_well_formed(), "{} broke the graph", rule.kind());
        assert_ne!(out.egi, egi);
    }
    assert_eq!(egi.snapshot(), before);
}

#[test]
fn snapshot_exports_the_traversal_contract() {
    init_tracing();
    let mut b = EgiBuilder::new(Alphabet::with_relations([("R", 2)]).unwrap()).unwrap();
    let sheet = b.sheet();
    let cut = b.add_cut(sheet).unwrap();
    let x = b.add_vertex(cut, None).unwrap();
    let y = b.add_vertex(cut, Some("Plato".into())).unwrap();
    b.add_edge(sheet, "R", &[x, y]).unwrap();
    b.add_edge(cut, "=", &[x, y]).unwrap();
    let egi = b.build().unwrap();

    let snap = egi.snapshot();
    let json = snap.to_json().unwrap();
    let back = EgiSnapshot::from_json(&json).unwrap();
    assert_eq!(back, snap);

    assert_eq!(snap.contexts.len(), 2);
    assert_eq!(snap.edges.iter().filter(|e| e.identity).count(), 1);
    assert_eq!(snap.ligatures.len(), 1);
    let members: BTreeSet<_> = snap.ligatures[0].members.iter().copied().collect();
    assert_eq!(members, BTreeSet::from([x, y]));
    let plato = snap.vertices.iter().find(|v| v.id == y).unwrap();
    assert!(plato.constant);
    assert_eq!(plato.label.as_deref(), Some("Plato"));
}

#[test]
fn configuration_file_drives_the_calculus() {
    init_tracing();
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("calculus.toml");
    std::fs::write(
        &path,
        "[alphabet]\nHuman = 1\n\n[engine]\nfail_fast = false\nmax_selection = 1\n",
    )
    .unwrap();

    let config = CalculusConfig::load(&path).unwrap();
    let mut b = EgiBuilder::new(config.alphabet().unwrap()).unwrap();
    let sheet = b.sheet();
    let x = b.add_vertex(sheet, None).unwrap();
    let human = b.add_edge(sheet, "Human", &[x]).unwrap();
    let egi = b.build().unwrap();

    let engine = RuleEngine::new(config.engine().clone());
    let err = engine
        .apply(
            &egi,
            &Rule::Erasure {
                selection: Selection::new([ElementId::Vertex(x), ElementId::Edge(human)]),
            },
        )
        .unwrap_err();
    assert!(matches!(err, RuleError::SelectionTooLarge { size: 2, max: 1 }));
    assert!(engine
        .apply(&egi, &Rule::Erasure { selection: Selection::single(human) })
        .is_ok());
}

#[test]
fn errors_carry_diagnostic_codes() {
    init_tracing();
    let egi = EgiBuilder::new(Alphabet::new()).unwrap().build().unwrap();
    let err = remove_double_cut(&egi, egi.sheet()).unwrap_err();
    assert_eq!(
        err.code().map(|c| c.to_string()).as_deref(),
        Some("egi::rule::invalid_nesting")
    );
    assert!(err.help().is_some());

    let top: EgiError = err.into();
    assert!(matches!(top, EgiError::Rule(RuleError::InvalidNesting { .. })));
    assert_eq!(
        top.code().map(|c| c.to_string()).as_deref(),
        Some("egi::rule::invalid_nesting")
    );
}
