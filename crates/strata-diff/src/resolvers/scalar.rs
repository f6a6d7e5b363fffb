use strata_types::Value;

use super::Resolution;
use crate::context::PathContext;

pub fn supports(value: &Value) -> bool {
    matches!(value, Value::Null | Value::Scalar(_))
}

/// Strict comparison: `1`, `1.0` and `"1"` are all different.
pub fn resolve(old: &Value, new: &Value, ctx: &PathContext) -> Resolution {
    if ctx.force_full_snapshot() || old != new {
        Resolution::Changed(new.clone())
    } else {
        Resolution::Unchanged
    }
}
