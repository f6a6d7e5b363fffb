//! The resolver chain.
//!
//! Each resolver handles one shape of value. [`MainResolver`] walks
//! [`Resolver::PRIORITY`] and hands the pair to the first resolver that
//! supports it and reports a change; nested values recurse back through the
//! main resolver.
//!
//! [`MainResolver`]: crate::MainResolver

pub mod collection;
pub mod object;
pub mod scalar;
pub mod sequence;

use strata_types::{Key, Value, ORIGINAL_KEY_FIELD};

use crate::context::PathContext;
use crate::error::DiffResult;
use crate::resolver::MainResolver;

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Outcome of comparing one pair of values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The diff to record at this path.
    Changed(Value),
    /// Nothing to record; the caller omits the path.
    Unchanged,
}

impl Resolution {
    pub fn is_changed(&self) -> bool {
        matches!(self, Resolution::Changed(_))
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Resolution::Changed(value) => Some(value),
            Resolution::Unchanged => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// The built-in resolvers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resolver {
    Record,
    Collection,
    Sequence,
    Scalar,
}

impl Resolver {
    /// Dispatch order. Records go first so a record is never treated as a
    /// plain collection of its fields.
    pub const PRIORITY: [Resolver; 4] = [
        Resolver::Record,
        Resolver::Collection,
        Resolver::Sequence,
        Resolver::Scalar,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Resolver::Record => "record",
            Resolver::Collection => "collection",
            Resolver::Sequence => "sequence",
            Resolver::Scalar => "scalar",
        }
    }

    /// Whether this resolver handles values shaped like `value` at the
    /// context's path.
    pub fn supports(self, value: &Value, ctx: &PathContext) -> bool {
        match self {
            Resolver::Record => object::supports(value),
            Resolver::Collection => collection::supports(value, ctx),
            Resolver::Sequence => sequence::supports(value, ctx),
            Resolver::Scalar => scalar::supports(value),
        }
    }

    pub fn resolve(
        self,
        old: &Value,
        new: &Value,
        ctx: &PathContext,
        main: &MainResolver,
    ) -> DiffResult<Resolution> {
        match self {
            Resolver::Record => object::resolve(old, new, ctx, main),
            Resolver::Collection => collection::resolve(old, new, ctx, main),
            Resolver::Sequence => sequence::resolve(old, new, ctx, main),
            Resolver::Scalar => Ok(scalar::resolve(old, new, ctx)),
        }
    }
}

// ---------------------------------------------------------------------------
// Shape changes
// ---------------------------------------------------------------------------

/// Replacement for a list that became a keyed collection, or the reverse.
///
/// The merger reads a map diff as a patch, and a patch onto a list addresses
/// its positions. The new value is therefore recorded whole: a list replaces
/// as is, and a map carries `_originalKey: null` so it is merged onto an
/// empty base.
pub(crate) fn shape_change(old: &Value, new: &Value, main: &MainResolver) -> Option<Value> {
    match (old, new) {
        (Value::Map(_), Value::Sequence(_)) => Some(main.normalizer().normalize(new)),
        (Value::Sequence(_), Value::Map(_)) => Some(match main.normalizer().normalize(new) {
            Value::Map(mut map) => {
                map.insert(Key::from(ORIGINAL_KEY_FIELD), Value::Null);
                Value::Map(map)
            }
            other => other,
        }),
        _ => None,
    }
}
