//! Unkeyed lists.
//!
//! A sequence at a path that is not declared associative is a value, not a
//! keyed collection: a length change replaces it wholesale. Only when both
//! sides have the same length are elements compared one by one.

use strata_types::Value;

use super::Resolution;
use crate::context::PathContext;
use crate::error::DiffResult;
use crate::resolver::MainResolver;

pub fn supports(value: &Value, ctx: &PathContext) -> bool {
    matches!(value, Value::Sequence(_)) && !ctx.is_current_path_assoc()
}

/// Compare two sequences.
///
/// With equal lengths the result lists the changed element diffs without
/// their positions, so it cannot be replayed onto the old sequence.
pub fn resolve(
    old: &Value,
    new: &Value,
    ctx: &PathContext,
    main: &MainResolver,
) -> DiffResult<Resolution> {
    let normalizer = main.normalizer();
    let (Value::Sequence(old_items), Value::Sequence(new_items)) = (old, new) else {
        return Ok(Resolution::Changed(normalizer.normalize(new)));
    };
    if ctx.force_full_snapshot() {
        return Ok(Resolution::Changed(normalizer.normalize(new)));
    }

    if normalizer.canonical(old) == normalizer.canonical(new) {
        return Ok(Resolution::Unchanged);
    }
    if old_items.len() != new_items.len() {
        return Ok(Resolution::Changed(normalizer.normalize(new)));
    }

    let mut changed = Vec::new();
    for (index, (old_item, new_item)) in old_items.iter().zip(new_items).enumerate() {
        let child = ctx.for_path(index).with_force_full_snapshot(false);
        if let Resolution::Changed(diff) = main.resolve_at(old_item, new_item, &child)? {
            changed.push(diff);
        }
    }

    if changed.is_empty() {
        Ok(Resolution::Unchanged)
    } else {
        Ok(Resolution::Changed(Value::Sequence(changed)))
    }
}
