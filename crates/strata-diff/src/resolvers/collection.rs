//! Keyed collections: maps, and sequences at associative paths.
//!
//! Entries are matched by key. Removed keys are reported with the context's
//! delete marker, added keys as full snapshots. When the path declares a key
//! field, items are matched by that field instead, so an item that moved to
//! another position is reported as a patch against its previous position.

use std::collections::{HashMap, HashSet};

use strata_types::{Key, Value, ValueMap, ORIGINAL_KEY_FIELD};
use tracing::warn;

use super::Resolution;
use crate::context::PathContext;
use crate::error::DiffResult;
use crate::resolver::MainResolver;

pub fn supports(value: &Value, ctx: &PathContext) -> bool {
    match value {
        Value::Map(_) => true,
        Value::Sequence(_) => ctx.is_current_path_assoc(),
        _ => false,
    }
}

pub fn resolve(
    old: &Value,
    new: &Value,
    ctx: &PathContext,
    main: &MainResolver,
) -> DiffResult<Resolution> {
    let old = unmark(old, ctx);

    if ctx.force_full_snapshot() {
        if new.is_empty_collection() {
            return Ok(Resolution::Changed(main.normalizer().normalize(new)));
        }
    } else {
        if old == new {
            return Ok(Resolution::Unchanged);
        }
        if let Some(key_field) = ctx.key_field_for_current_path() {
            match Reindex::build(old, new, key_field) {
                Ok(reindex) => return reindex.resolve(ctx, main),
                Err(reason) => {
                    if !ctx.suppress_warnings() {
                        warn!(
                            path = ctx.path(),
                            key_field,
                            %reason,
                            "cannot match collection items by key field, comparing by position"
                        );
                    }
                }
            }
        }
    }

    positional(old, new, ctx, main)
}

/// An old value equal to the delete marker stands for an absent value.
fn unmark<'a>(value: &'a Value, ctx: &PathContext) -> &'a Value {
    if value == ctx.delete_marker() {
        &Value::Null
    } else {
        value
    }
}

/// Full snapshot of a value that has no counterpart in the old snapshot.
fn snapshot(item: &Value, ctx: &PathContext, main: &MainResolver) -> DiffResult<Value> {
    let forced = ctx.with_force_full_snapshot(true);
    Ok(match main.resolve_at(&Value::Null, item, &forced)? {
        Resolution::Changed(value) => value,
        Resolution::Unchanged => main.normalizer().normalize(item),
    })
}

fn finish(old: &Value, new: &Value, diff: ValueMap, main: &MainResolver) -> Resolution {
    if !diff.is_empty() {
        Resolution::Changed(Value::Map(diff))
    } else if !old.is_collection() && new.is_collection() {
        // An empty collection replacing a non-collection.
        Resolution::Changed(main.normalizer().normalize(new))
    } else {
        Resolution::Unchanged
    }
}

fn positional(
    old: &Value,
    new: &Value,
    ctx: &PathContext,
    main: &MainResolver,
) -> DiffResult<Resolution> {
    let old_entries = if ctx.force_full_snapshot() {
        Vec::new()
    } else {
        old.entries()
    };
    let mut diff = ValueMap::new();

    for (key, old_value) in &old_entries {
        match new.get(key) {
            None => {
                diff.insert(key.clone(), ctx.delete_marker().clone());
            }
            Some(new_value) => {
                let child = ctx.for_path(key).with_force_full_snapshot(false);
                let old_value = unmark(old_value, ctx);
                if let Resolution::Changed(value) = main.resolve_at(old_value, new_value, &child)? {
                    diff.insert(key.clone(), value);
                }
            }
        }
    }

    let seen: HashSet<&Key> = old_entries.iter().map(|(key, _)| key).collect();
    for (key, new_value) in new.entries() {
        if !seen.contains(&key) {
            let value = snapshot(new_value, &ctx.for_path(&key), main)?;
            diff.insert(key, value);
        }
    }

    Ok(finish(old, new, diff, main))
}

// ---------------------------------------------------------------------------
// Matching by key field
// ---------------------------------------------------------------------------

/// Why a collection cannot be matched by its key field.
#[derive(Debug, thiserror::Error)]
enum Unkeyable {
    #[error("item `{key}` is a {kind}, not a record or map")]
    NotKeyed { key: Key, kind: &'static str },
    #[error("item `{key}` has no scalar `{field}`")]
    MissingIdentity { key: Key, field: String },
    #[error("identity `{identity}` appears more than once")]
    DuplicateIdentity { identity: Key },
}

struct Item<'a> {
    raw: Key,
    identity: Key,
    value: &'a Value,
}

fn items<'a>(side: &'a Value, key_field: &str) -> Result<Vec<Item<'a>>, Unkeyable> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for (raw, value) in side.entries() {
        let identity_value = match value {
            Value::Record(record) => record.get(key_field),
            Value::Map(map) => map.get(&Key::from(key_field)),
            other => {
                return Err(Unkeyable::NotKeyed {
                    key: raw,
                    kind: other.kind_name(),
                })
            }
        };
        let identity = identity_value
            .filter(|v| matches!(v, Value::Scalar(_)))
            .and_then(Key::from_value)
            .ok_or_else(|| Unkeyable::MissingIdentity {
                key: raw.clone(),
                field: key_field.to_owned(),
            })?;
        if !seen.insert(identity.clone()) {
            return Err(Unkeyable::DuplicateIdentity { identity });
        }
        items.push(Item {
            raw,
            identity,
            value,
        });
    }
    Ok(items)
}

struct Reindex<'a> {
    old: Vec<Item<'a>>,
    new: Vec<Item<'a>>,
    old_value: &'a Value,
    new_value: &'a Value,
}

impl<'a> Reindex<'a> {
    fn build(old: &'a Value, new: &'a Value, key_field: &str) -> Result<Self, Unkeyable> {
        Ok(Self {
            old: items(old, key_field)?,
            new: items(new, key_field)?,
            old_value: old,
            new_value: new,
        })
    }

    /// Items are matched by identity but the diff is addressed by each new
    /// item's raw key, so it replays onto positional state. A moved item
    /// carries `_originalKey` naming the key its merge base lives under; a
    /// new item landing on a key that was occupied carries `_originalKey:
    /// null` so the previous occupant is discarded.
    fn resolve(self, ctx: &PathContext, main: &MainResolver) -> DiffResult<Resolution> {
        let old_by_identity: HashMap<&Key, &Item<'_>> =
            self.old.iter().map(|item| (&item.identity, item)).collect();
        let old_raw: HashSet<&Key> = self.old.iter().map(|item| &item.raw).collect();
        let new_raw: HashSet<&Key> = self.new.iter().map(|item| &item.raw).collect();

        let mut diff = ValueMap::new();
        for item in &self.old {
            if !new_raw.contains(&item.raw) {
                diff.insert(item.raw.clone(), ctx.delete_marker().clone());
            }
        }

        for item in &self.new {
            let child = ctx.for_path(&item.raw).with_force_full_snapshot(false);
            match old_by_identity.get(&item.identity) {
                Some(previous) if previous.raw == item.raw => {
                    if let Resolution::Changed(value) =
                        main.resolve_at(previous.value, item.value, &child)?
                    {
                        diff.insert(item.raw.clone(), value);
                    }
                }
                Some(previous) => {
                    let patch = main
                        .resolve_at(previous.value, item.value, &child)?
                        .into_value()
                        .unwrap_or_else(Value::map);
                    diff.insert(item.raw.clone(), relocate(patch, previous.raw.to_value()));
                }
                None => {
                    let value = snapshot(item.value, &child, main)?;
                    let value = if old_raw.contains(&item.raw) {
                        relocate(value, Value::Null)
                    } else {
                        value
                    };
                    diff.insert(item.raw.clone(), value);
                }
            }
        }

        Ok(finish(self.old_value, self.new_value, diff, main))
    }
}

fn relocate(patch: Value, origin: Value) -> Value {
    match patch {
        Value::Map(mut map) => {
            map.insert(Key::from(ORIGINAL_KEY_FIELD), origin);
            Value::Map(map)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;
    use std::sync::{Arc, Mutex};

    use strata_types::DEFAULT_DELETE_MARKER;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{self, Layer, SubscriberExt};

    use super::*;
    use crate::error::DiffError;

    fn map<V: Into<Value>>(entries: impl IntoIterator<Item = (&'static str, V)>) -> Value {
        entries.into_iter().collect()
    }

    fn run(old: &Value, new: &Value, ctx: &PathContext) -> DiffResult<Value> {
        MainResolver::new().resolve(old, new, ctx)
    }

    fn line(sku: &str, qty: i64) -> Value {
        [("sku", Value::from(sku)), ("qty", Value::from(qty))]
            .into_iter()
            .collect()
    }

    fn keyed<V: Into<Value>>(entries: impl IntoIterator<Item = (i64, V)>) -> Value {
        entries.into_iter().collect()
    }

    #[test]
    fn supports_maps_and_assoc_sequences() {
        let ctx = PathContext::new();
        assert!(supports(&Value::map(), &ctx));
        assert!(!supports(&Value::Sequence(vec![]), &ctx));
        assert!(supports(
            &Value::Sequence(vec![]),
            &PathContext::builder().assoc_path("").build()
        ));
    }

    #[test]
    fn detects_new_item() {
        let diff = run(&map([("a", 1)]), &map([("a", 1), ("b", 2)]), &PathContext::new()).unwrap();
        assert_eq!(diff, map([("b", 2)]));
    }

    #[test]
    fn detects_deleted_item() {
        let diff = run(&map([("a", 1), ("b", 2)]), &map([("a", 1)]), &PathContext::new()).unwrap();
        assert_eq!(diff, map([("b", DEFAULT_DELETE_MARKER)]));
    }

    #[test]
    fn detects_changed_item() {
        let diff = run(
            &map([("a", 1), ("b", 2)]),
            &map([("a", 1), ("b", 3)]),
            &PathContext::new(),
        )
        .unwrap();
        assert_eq!(diff, map([("b", 3)]));
    }

    #[test]
    fn identical_maps_have_no_difference() {
        let old = map([("a", 1), ("b", 2)]);
        let err = run(&old, &old.clone(), &PathContext::new()).unwrap_err();
        assert_eq!(err, DiffError::NoDifference { path: "root".into() });
    }

    #[test]
    fn null_old_gives_full_snapshot() {
        let new = map([("a", 1), ("b", 2)]);
        assert_eq!(run(&Value::Null, &new, &PathContext::new()).unwrap(), new);
        assert_eq!(run(&Value::map(), &new, &PathContext::new()).unwrap(), new);
    }

    #[test]
    fn nested_changes_are_reported_under_their_key() {
        let old = map([("group", map([("a", 1), ("b", 2)]))]);
        let new = map([("group", map([("a", 1), ("b", 3)]))]);
        let ctx = PathContext::builder().assoc_path("group").build();
        assert_eq!(run(&old, &new, &ctx).unwrap(), map([("group", map([("b", 3)]))]));
    }

    #[test]
    fn several_changes_with_custom_marker() {
        let ctx = PathContext::builder().delete_marker("__X__").build();
        let diff = run(&map([("a", 1), ("b", 2)]), &map([("a", 10), ("c", 3)]), &ctx).unwrap();
        assert_eq!(diff, map([("a", Value::from(10)), ("b", Value::from("__X__")), ("c", Value::from(3))]));
    }

    #[test]
    fn deleted_and_added_keys() {
        let item = |id: i64, val: i64| map([("id", id), ("val", val)]);
        let old = map([("a", item(1, 100)), ("b", item(2, 200))]);
        let new = map([("b", item(2, 200)), ("c", item(3, 300))]);
        let diff = run(&old, &new, &PathContext::new()).unwrap();
        assert_eq!(
            diff,
            map([("a", Value::from(DEFAULT_DELETE_MARKER)), ("c", item(3, 300))])
        );
    }

    #[test]
    fn old_marker_counts_as_absent() {
        let item = map([("id", 2), ("val", 200)]);
        let old = map([("a", Value::from(DEFAULT_DELETE_MARKER)), ("b", item.clone())]);
        let new = map([("a", item.clone()), ("b", item.clone())]);
        assert_eq!(run(&old, &new, &PathContext::new()).unwrap(), map([("a", item)]));
    }

    #[test]
    fn emptied_map_deletes_every_key() {
        let old = map([("a", 1), ("b", 2), ("c", 3)]);
        let diff = run(&old, &Value::map(), &PathContext::new()).unwrap();
        assert_eq!(
            diff,
            map([
                ("a", DEFAULT_DELETE_MARKER),
                ("b", DEFAULT_DELETE_MARKER),
                ("c", DEFAULT_DELETE_MARKER)
            ])
        );
    }

    #[test]
    fn map_replaced_by_empty_sequence() {
        let old = map([("a", 1), ("b", 2)]);
        let diff = run(&old, &Value::Sequence(vec![]), &PathContext::new()).unwrap();
        assert_eq!(diff, Value::Sequence(vec![]));
    }

    #[test]
    fn sequence_replaced_by_map() {
        let old = Value::Sequence(vec!["a".into(), "b".into(), "c".into()]);
        let new = map([("a", "a"), ("b", "b"), ("c", "c")]);
        let diff = run(&old, &new, &PathContext::new()).unwrap();

        let expected = map([
            ("a", Value::from("a")),
            ("b", Value::from("b")),
            ("c", Value::from("c")),
            (ORIGINAL_KEY_FIELD, Value::Null),
        ]);
        assert_eq!(diff, expected);
    }

    #[test]
    fn assoc_sequence_replaced_by_its_keyed_form() {
        let old = Value::Sequence(vec!["a".into(), "b".into()]);
        let new = keyed([(0, "a"), (1, "b")]);
        let ctx = PathContext::builder().assoc_path("").build();

        let mut expected = ValueMap::new();
        expected.insert(Key::Index(0), Value::from("a"));
        expected.insert(Key::Index(1), Value::from("b"));
        expected.insert(Key::from(ORIGINAL_KEY_FIELD), Value::Null);
        assert_eq!(run(&old, &new, &ctx).unwrap(), Value::Map(expected));
    }

    #[test]
    fn assoc_sequence_by_position() {
        let old = Value::Sequence(vec![line("111", 10), line("222", 5)]);
        let new = Value::Sequence(vec![line("111", 12), line("222", 5), line("333", 7)]);
        let ctx = PathContext::builder().assoc_path("").build();
        assert_eq!(
            run(&old, &new, &ctx).unwrap(),
            keyed([(0, map([("qty", 12)])), (2, line("333", 7))])
        );
    }

    #[test]
    fn key_field_matches_in_place_items() {
        let old = Value::Sequence(vec![line("111", 10), line("222", 5)]);
        let new = Value::Sequence(vec![line("111", 12), line("222", 5), line("333", 7)]);
        let ctx = PathContext::builder().key_field("", "sku").build();
        assert_eq!(
            run(&old, &new, &ctx).unwrap(),
            keyed([(0, map([("qty", 12)])), (2, line("333", 7))])
        );
    }

    #[test]
    fn key_field_relocates_moved_items() {
        let old = Value::Sequence(vec![line("111", 10), line("222", 5), line("333", 7)]);
        let new = Value::Sequence(vec![line("333", 8), line("111", 10)]);
        let ctx = PathContext::builder().key_field("", "sku").build();

        let diff = run(&old, &new, &ctx).unwrap();
        let expected: Value = keyed([
            (2, Value::from(DEFAULT_DELETE_MARKER)),
            (
                0,
                map([("qty", Value::from(8)), (ORIGINAL_KEY_FIELD, Value::from(2))]),
            ),
            (1, map([(ORIGINAL_KEY_FIELD, 0)])),
        ]);
        assert_eq!(diff, expected);
    }

    #[test]
    fn key_field_new_item_on_occupied_key_drops_previous_occupant() {
        let old = Value::Sequence(vec![line("111", 10), line("222", 5)]);
        let new = Value::Sequence(vec![line("111", 10), line("999", 1)]);
        let ctx = PathContext::builder().key_field("", "sku").build();

        let diff = run(&old, &new, &ctx).unwrap();
        let expected = keyed([(
            1,
            map([
                ("sku", Value::from("999")),
                ("qty", Value::from(1)),
                (ORIGINAL_KEY_FIELD, Value::Null),
            ]),
        )]);
        assert_eq!(diff, expected);
    }

    #[test]
    fn duplicate_identities_fall_back_to_positions() {
        let old = Value::Sequence(vec![line("111", 10), line("111", 5)]);
        let new = Value::Sequence(vec![line("111", 10), line("111", 6)]);
        let ctx = PathContext::builder()
            .key_field("", "sku")
            .suppress_warnings(true)
            .build();
        assert_eq!(
            run(&old, &new, &ctx).unwrap(),
            keyed([(1, map([("qty", 6)]))])
        );
    }

    #[test]
    fn items_without_key_field_fall_back_to_positions() {
        let old = Value::Sequence(vec![Value::from(1), Value::from(2)]);
        let new = Value::Sequence(vec![Value::from(1), Value::from(3)]);
        let ctx = PathContext::builder().key_field("", "sku").build();
        assert_eq!(run(&old, &new, &ctx).unwrap(), keyed([(1, 3)]));
    }

    #[test]
    fn forced_empty_collection_is_kept() {
        let ctx = PathContext::new().with_force_full_snapshot(true);
        assert_eq!(
            resolve(&map([("a", 1)]), &Value::map(), &ctx, &MainResolver::new()).unwrap(),
            Resolution::Changed(Value::map())
        );
    }

    #[test]
    fn empty_map_replacing_scalar_is_a_change() {
        let old = map([("a", Value::Null)]);
        let new = map([("a", Value::map())]);
        assert_eq!(run(&old, &new, &PathContext::new()).unwrap(), new);
    }

    // -----------------------------------------------------------------------
    // Reindexing warnings
    // -----------------------------------------------------------------------

    /// Collects the messages of `WARN` events.
    #[derive(Clone, Default)]
    struct Warnings(Arc<Mutex<Vec<String>>>);

    struct MessageVisitor(String);

    impl Visit for MessageVisitor {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    impl<S: Subscriber> Layer<S> for Warnings {
        fn on_event(&self, event: &Event<'_>, _ctx: layer::Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                let mut visitor = MessageVisitor(String::new());
                event.record(&mut visitor);
                self.0.lock().unwrap().push(visitor.0);
            }
        }
    }

    fn warnings_during(f: impl FnOnce()) -> Vec<String> {
        let warnings = Warnings::default();
        let subscriber = tracing_subscriber::registry().with(warnings.clone());
        tracing::subscriber::with_default(subscriber, f);
        let captured = warnings.0.lock().unwrap().clone();
        captured
    }

    fn duplicated_lines() -> (Value, Value) {
        (
            Value::Sequence(vec![line("111", 10), line("111", 5)]),
            Value::Sequence(vec![line("111", 10), line("111", 6)]),
        )
    }

    #[test]
    fn reindexing_fallback_is_logged() {
        let (old, new) = duplicated_lines();
        let ctx = PathContext::builder().key_field("", "sku").build();

        let warnings = warnings_during(|| {
            run(&old, &new, &ctx).unwrap();
        });

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("comparing by position"), "{warnings:?}");
    }

    #[test]
    fn suppressed_fallback_is_silent() {
        let (old, new) = duplicated_lines();
        let ctx = PathContext::builder()
            .key_field("", "sku")
            .suppress_warnings(true)
            .build();

        let warnings = warnings_during(|| {
            run(&old, &new, &ctx).unwrap();
        });

        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn successful_reindexing_is_silent() {
        let old = Value::Sequence(vec![line("111", 10), line("222", 5)]);
        let new = Value::Sequence(vec![line("222", 5), line("111", 10)]);
        let ctx = PathContext::builder().key_field("", "sku").build();

        let warnings = warnings_during(|| {
            run(&old, &new, &ctx).unwrap();
        });

        assert!(warnings.is_empty(), "{warnings:?}");
    }
}
