//! Polarity-gated rules: erasure (positive contexts) and insertion
//! (negative contexts).

use crate::context::Polarity;
use crate::error::RuleError;
use crate::graph::GraphCore;
use crate::id::{ContextId, ElementId};

use super::fragment::Fragment;
use super::selection::{Region, Selection};
use super::{Change, RuleEngineConfig, RuleKind, RuleResult};

/// Fail with `WrongPolarity` unless `ctx` has the required polarity.
pub(super) fn require_polarity(
    core: &GraphCore,
    rule: RuleKind,
    ctx: ContextId,
    required: Polarity,
) -> RuleResult<()> {
    let context = core.context(ctx).ok_or(RuleError::NotFound {
        id: ElementId::Cut(ctx),
    })?;
    if context.polarity() == required {
        Ok(())
    } else {
        Err(RuleError::WrongPolarity {
            rule,
            context: ctx,
            depth: context.depth(),
            required,
        })
    }
}

/// Delete a closed region: edges first, then cuts with their contents, then
/// vertices, so no cascade ever reaches an element removed earlier.
pub(super) fn remove_region(core: &mut GraphCore, region: &Region) -> RuleResult<()> {
    let mut top: Vec<ElementId> = region.top.iter().copied().collect();
    top.sort_by_key(|el| match el {
        ElementId::Edge(_) => 0,
        ElementId::Cut(_) => 1,
        ElementId::Vertex(_) => 2,
    });
    for element in top {
        let present = match element {
            ElementId::Edge(e) => core.edge(e).is_some(),
            ElementId::Vertex(v) => core.vertex(v).is_some(),
            ElementId::Cut(c) => core.tree().contains(c),
        };
        if present {
            core.remove_element(element)?;
        }
    }
    Ok(())
}

/// Rule 1: remove a closed region from a positive context.
pub(crate) fn erase(
    core: &mut GraphCore,
    selection: &Selection,
    config: &RuleEngineConfig,
) -> RuleResult<Change> {
    let region = selection.resolve(core, config.max_selection)?;
    require_polarity(core, RuleKind::Erasure, region.container, Polarity::Positive)?;
    if let Some((vertex, edge)) = region.open_incidence(core) {
        return Err(RuleError::OpenSelection { vertex, edge });
    }
    remove_region(core, &region)?;
    Ok(Change {
        removed: region.elements,
        ..Change::default()
    })
}

/// Rule 2: place a fragment into a negative context.
pub(crate) fn insert(
    core: &mut GraphCore,
    context: ContextId,
    fragment: &Fragment,
    config: &RuleEngineConfig,
) -> RuleResult<Change> {
    if fragment.len() > config.max_selection {
        return Err(RuleError::SelectionTooLarge {
            size: fragment.len(),
            max: config.max_selection,
        });
    }
    require_polarity(core, RuleKind::Insertion, context, Polarity::Negative)?;
    let placement = fragment.place(core, context)?;
    Ok(Change {
        added: placement.added(),
        placed: placement.top,
        ..Change::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::error::GraphError;
    use crate::graph::{Egi, EgiBuilder};
    use crate::id::{EdgeId, VertexId};
    use crate::rules::{FragmentArg, FragmentParent, apply_erasure, apply_insertion};

    /// sheet ⊃ cut1 ⊃ cut2; v1 in cut1 with Human(v1) in cut1.
    fn scenario() -> (EgiBuilder, ContextId, ContextId, VertexId, EdgeId) {
        let mut b = EgiBuilder::new(Alphabet::with_relations([("Human", 1), ("Mortal", 1)]).unwrap())
            .unwrap();
        let sheet = b.sheet();
        let cut1 = b.add_cut(sheet).unwrap();
        let cut2 = b.add_cut(cut1).unwrap();
        let v1 = b.add_vertex(cut1, None).unwrap();
        let e1 = b.add_edge(cut1, "Human", &[v1]).unwrap();
        (b, cut1, cut2, v1, e1)
    }

    #[test]
    fn erasure_in_negative_context_is_rejected() {
        let (b, cut1, _, _, e1) = scenario();
        let egi = b.build().unwrap();
        let err = apply_erasure(&egi, &Selection::single(e1)).unwrap_err();
        assert!(matches!(
            err,
            RuleError::WrongPolarity {
                rule: RuleKind::Erasure,
                context,
                depth: 1,
                required: Polarity::Positive,
            } if context == cut1
        ));
    }

    #[test]
    fn erasure_on_the_sheet_succeeds() {
        let (mut b, _, _, v1, e1) = scenario();
        // Same edge, now on the sheet.
        b.remove_edge(e1).unwrap();
        let sheet = b.sheet();
        let moved = b.add_edge(sheet, "Human", &[v1]).unwrap();
        let egi = b.build().unwrap();

        let out = apply_erasure(&egi, &Selection::single(moved)).unwrap();
        assert!(out.edge(moved).is_none());
        assert_eq!(out.edge_count(), 0);
        assert_eq!(out.vertex_count(), 1);
        assert!(out.is_well_formed());
        // The input is untouched.
        assert!(egi.edge(moved).is_some());
    }

    #[test]
    fn erasure_in_even_cut_removes_whole_subtree() {
        let (mut b, _, cut2, _, _) = scenario();
        let inner = b.add_cut(cut2).unwrap();
        let w = b.add_vertex(inner, None).unwrap();
        b.add_edge(inner, "Mortal", &[w]).unwrap();
        let holder = b.add_cut(cut2).unwrap();
        let egi = b.build().unwrap();

        let out = apply_erasure(&egi, &Selection::single(inner)).unwrap();
        assert!(out.context(inner).is_none());
        assert!(out.vertex(w).is_none());
        assert!(out.context(holder).is_some());
        assert_eq!(out.cut_count(), egi.cut_count() - 1);
    }

    #[test]
    fn erasure_refuses_open_selection() {
        let (mut b, _, _, _, _) = scenario();
        let sheet = b.sheet();
        let x = b.add_vertex(sheet, None).unwrap();
        let e = b.add_edge(sheet, "Mortal", &[x]).unwrap();
        let egi = b.build().unwrap();
        let err = apply_erasure(&egi, &Selection::single(x)).unwrap_err();
        assert!(matches!(err, RuleError::OpenSelection { vertex, edge } if vertex == x && edge == e));
        let out = apply_erasure(&egi, &Selection::new([ElementId::Vertex(x), ElementId::Edge(e)]))
            .unwrap();
        assert!(out.vertex(x).is_none());
    }

    #[test]
    fn insertion_requires_negative_context() {
        let (b, cut1, cut2, v1, _) = scenario();
        let egi: Egi = b.build().unwrap();
        let mut f = Fragment::new();
        f.add_edge(FragmentParent::Target, "Mortal", [FragmentArg::Existing(v1)]);

        let err = apply_insertion(&egi, egi.sheet(), &f).unwrap_err();
        assert!(matches!(err, RuleError::WrongPolarity { required: Polarity::Negative, .. }));
        let err = apply_insertion(&egi, cut2, &f).unwrap_err();
        assert!(matches!(err, RuleError::WrongPolarity { depth: 2, .. }));

        let out = apply_insertion(&egi, cut1, &f).unwrap();
        assert_eq!(out.edge_count(), egi.edge_count() + 1);
        assert!(out.is_well_formed());
    }

    #[test]
    fn insertion_respects_domination() {
        let (mut b, cut1, cut2, _, _) = scenario();
        let deep = b.add_vertex(cut2, None).unwrap();
        let egi = b.build().unwrap();
        let mut f = Fragment::new();
        f.add_edge(FragmentParent::Target, "Mortal", [FragmentArg::Existing(deep)]);
        // cut1 encloses cut2, so this is fine.
        assert!(apply_insertion(&egi, cut1, &f).is_ok());

        let mut b = egi.to_builder();
        let sheet = b.sheet();
        let side = b.add_cut(sheet).unwrap();
        let egi = b.build().unwrap();
        let err = apply_insertion(&egi, side, &f).unwrap_err();
        assert!(matches!(err, RuleError::Graph(GraphError::DominationViolation { .. })));
    }
}
