//! Records, compared field by field in schema order.

use strata_types::{Key, Record, Value, ValueMap};

use super::Resolution;
use crate::context::PathContext;
use crate::error::{DiffError, DiffResult};
use crate::resolver::MainResolver;

pub fn supports(value: &Value) -> bool {
    matches!(value, Value::Record(_))
}

pub fn resolve(
    old: &Value,
    new_value: &Value,
    ctx: &PathContext,
    main: &MainResolver,
) -> DiffResult<Resolution> {
    let Value::Record(new) = new_value else {
        return Ok(Resolution::Unchanged);
    };
    let forced = ctx.force_full_snapshot();
    let old = if forced { &Value::Null } else { old };

    if !old.is_null() {
        if ctx.enforce_same_type() {
            check_same_type(old, new, ctx)?;
        }
        let normalizer = main.normalizer();
        if normalizer.normalize(old) == normalizer.normalize(new_value) {
            return Ok(Resolution::Unchanged);
        }
    }

    let mut diff = ValueMap::new();
    for field in new.fields() {
        if field.is_ignorable() {
            continue;
        }
        let value = field.value.ok_or_else(|| DiffError::InvalidObject {
            path: ctx.path().to_owned(),
            field: field.name().to_owned(),
        })?;

        let mut child = ctx.for_path(field.name());
        if field.spec.collection.is_some() && value.is_collection() {
            child = child.as_collection(field.collection_key_field());
        }

        let resolution = match old_field(old, field.name()) {
            Some(previous) => main.resolve_at(previous, value, &child)?,
            None => main.resolve_at(&Value::Null, value, &child.with_force_full_snapshot(true))?,
        };
        if let Resolution::Changed(value) = resolution {
            diff.insert(Key::from(field.name()), value);
        }
    }

    if diff.is_empty() && !forced {
        Ok(Resolution::Unchanged)
    } else {
        Ok(Resolution::Changed(Value::Map(diff)))
    }
}

fn old_field<'a>(old: &'a Value, name: &str) -> Option<&'a Value> {
    match old {
        Value::Record(record) => record.get(name),
        Value::Map(map) => map.get(&Key::from(name)),
        _ => None,
    }
}

fn check_same_type(old: &Value, new: &Record, ctx: &PathContext) -> DiffResult<()> {
    match old {
        Value::Record(previous) if previous.type_name() == new.type_name() => Ok(()),
        Value::Record(previous) => Err(mismatch(ctx, new, previous.type_name())),
        other => Err(mismatch(ctx, new, other.kind_name())),
    }
}

fn mismatch(ctx: &PathContext, new: &Record, actual: &str) -> DiffError {
    DiffError::InvalidComparison {
        path: ctx.path().to_owned(),
        expected: new.type_name().to_owned(),
        actual: actual.to_owned(),
    }
}
