use std::borrow::Cow;

use strata_types::{is_list_shaped, Key, Value, ValueMap, ORIGINAL_KEY_FIELD};
use tracing::trace;

use crate::context::MergeContext;

/// Applies change maps onto state maps.
///
/// For every key of the state followed by every new key of the changes:
///
/// - a change equal to the delete marker drops the key;
/// - a change that is a map is merged recursively onto the state's value
///   for that key (a sequence base is viewed as an index-keyed map);
/// - any other change replaces the state's value;
/// - keys without a change keep the state's value.
///
/// A map change carrying `_originalKey` is merged onto the state's value
/// under that key instead (`null` meaning an empty base), which is how moved
/// collection items replay. When the base was a sequence and the merged keys
/// are `0..n` in order, the result is a sequence again.
///
/// A key deleted by one change set and brought back by a later partial patch
/// only contains the patched fields: the deleted value is gone from the state
/// and there is nothing to merge the patch onto.
#[derive(Clone, Debug, Default)]
pub struct Merger {
    context: MergeContext,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(context: MergeContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &MergeContext {
        &self.context
    }

    pub fn merge(&self, state: &ValueMap, changes: &ValueMap) -> ValueMap {
        let keys = state
            .keys()
            .chain(changes.keys().filter(|key| !state.contains_key(*key)));

        let mut result = ValueMap::with_capacity(state.len() + changes.len());
        for key in keys {
            let value = match (changes.get(key), state.get(key)) {
                (Some(change), _) if *change == self.context.delete_marker => continue,
                (Some(Value::Map(patch)), _) => self.apply(state, key, patch),
                (Some(change), _) => change.clone(),
                (None, Some(current)) => current.clone(),
                (None, None) => continue,
            };
            result.insert(key.clone(), value);
        }
        result
    }

    fn apply(&self, state: &ValueMap, key: &Key, patch: &ValueMap) -> Value {
        let original_key = Key::from(ORIGINAL_KEY_FIELD);
        let (base, patch) = match patch.get(&original_key) {
            None => (state.get(key), Cow::Borrowed(patch)),
            Some(origin) => {
                trace!(%key, origin = ?origin, "merging relocated entry");
                let base = Key::from_value(origin).and_then(|from| state.get(&from));
                let mut stripped = patch.clone();
                stripped.shift_remove(&original_key);
                (base, Cow::Owned(stripped))
            }
        };

        let base_view = base.map(Value::keyed_view).unwrap_or_default();
        let merged = self.merge(&base_view, &patch);

        if matches!(base, Some(Value::Sequence(_))) && is_list_shaped(&merged) {
            Value::Sequence(merged.into_values().collect())
        } else {
            Value::Map(merged)
        }
    }
}
