//! Rules 5 and 6: double-cut addition and removal.
//!
//! Both rules move elements without renaming them, so identifiers outside the
//! two temporary cuts survive a round trip unchanged.

use std::collections::BTreeSet;

use crate::error::RuleError;
use crate::graph::GraphCore;
use crate::id::{ContextId, ElementId};

use super::selection::Selection;
use super::{Change, RuleEngineConfig, RuleResult};

/// Rule 5: wrap a co-located selection in two nested cuts.
pub(crate) fn add(
    core: &mut GraphCore,
    selection: &Selection,
    config: &RuleEngineConfig,
) -> RuleResult<Change> {
    let region = selection.resolve(core, config.max_selection)?;
    // An edge moved inward may not leave one of its vertices behind.
    if let Some((vertex, edge)) = region.external_reference(core) {
        return Err(RuleError::OpenSelection { vertex, edge });
    }

    let outer = core.add_cut(region.container)?;
    let inner = core.add_cut(outer)?;
    for &element in &region.top {
        core.relocate(element, inner)?;
    }
    tracing::trace!(%outer, %inner, wrapped = region.top.len(), "added double cut");

    Ok(Change {
        added: BTreeSet::from([ElementId::Cut(outer), ElementId::Cut(inner)]),
        placed: BTreeSet::from([ElementId::Cut(outer)]),
        ..Change::default()
    })
}

/// Rule 6: dissolve `outer` and the single cut it encloses.
pub(crate) fn remove(core: &mut GraphCore, outer: ContextId) -> RuleResult<Change> {
    if outer == core.sheet() {
        return Err(RuleError::InvalidNesting {
            reason: "the sheet of assertion is not a double cut".into(),
        });
    }
    let context = core.context(outer).ok_or(RuleError::NotFound {
        id: ElementId::Cut(outer),
    })?;
    let parent = context.parent().ok_or_else(|| RuleError::InvalidNesting {
        reason: format!("{outer} has no enclosing context"),
    })?;
    let inner = match context.enclosed().iter().collect::<Vec<_>>().as_slice() {
        [ElementId::Cut(inner)] => *inner,
        [] => {
            return Err(RuleError::InvalidNesting {
                reason: format!("{outer} is empty, not a double cut"),
            });
        }
        [_] => {
            return Err(RuleError::InvalidNesting {
                reason: format!("{outer} encloses no cut"),
            });
        }
        many => {
            return Err(RuleError::InvalidNesting {
                reason: format!("{outer} encloses {} elements besides the inner cut", many.len() - 1),
            });
        }
    };

    let contents: Vec<ElementId> = core
        .context(inner)
        .map(|c| c.enclosed().iter().copied().collect())
        .unwrap_or_default();
    for &element in &contents {
        core.relocate(element, parent)?;
    }
    core.remove_cut(inner)?;
    core.remove_cut(outer)?;
    tracing::trace!(%outer, %inner, released = contents.len(), "removed double cut");

    Ok(Change {
        removed: BTreeSet::from([ElementId::Cut(outer), ElementId::Cut(inner)]),
        ..Change::default()
    })
}
