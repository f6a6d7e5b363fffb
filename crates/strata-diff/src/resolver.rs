use std::fmt;

use strata_types::Value;
use tracing::{debug, trace};

use crate::context::PathContext;
use crate::error::{DiffError, DiffResult};
use crate::normalizer::{Normalizer, ValueNormalizer};
use crate::resolvers::{self, Resolution, Resolver};

/// Entry point of the diff engine.
///
/// Dispatches each pair of values to the built-in resolvers in
/// [`Resolver::PRIORITY`] order. Holds no mutable state, so one instance can
/// be shared across threads.
pub struct MainResolver {
    normalizer: Box<dyn Normalizer>,
}

impl Default for MainResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MainResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainResolver").finish_non_exhaustive()
    }
}

impl MainResolver {
    pub fn new() -> Self {
        Self::with_normalizer(ValueNormalizer)
    }

    /// Use a custom flattening service for equality checks.
    pub fn with_normalizer(normalizer: impl Normalizer + 'static) -> Self {
        Self {
            normalizer: Box::new(normalizer),
        }
    }

    pub fn normalizer(&self) -> &dyn Normalizer {
        self.normalizer.as_ref()
    }

    /// Compare `old` and `new` at the context's path.
    ///
    /// A list replaced by a map, or a map by a list, is recorded whole.
    /// Otherwise the resolver is picked by the shape of `new`, except when
    /// `new` is an empty collection replacing a collection: then `old`'s
    /// shape decides, so that emptying a keyed collection reports every
    /// removed key.
    pub fn resolve_at(
        &self,
        old: &Value,
        new: &Value,
        ctx: &PathContext,
    ) -> DiffResult<Resolution> {
        if !ctx.force_full_snapshot() {
            if let Some(replacement) = resolvers::shape_change(old, new, self) {
                trace!(path = ctx.path(), from = old.kind_name(), to = new.kind_name(), "shape changed");
                return Ok(Resolution::Changed(replacement));
            }
        }

        let inspected = if new.is_empty_collection() && old.is_collection() {
            old
        } else {
            new
        };

        for resolver in Resolver::PRIORITY {
            if !resolver.supports(inspected, ctx) {
                continue;
            }
            trace!(path = ctx.path(), resolver = resolver.name(), "resolving");
            if let Resolution::Changed(diff) = resolver.resolve(old, new, ctx, self)? {
                return Ok(Resolution::Changed(diff));
            }
        }
        Ok(Resolution::Unchanged)
    }

    /// Compute the diff that turns `old` into `new`.
    ///
    /// Returns [`DiffError::NoDifference`] when the two are equal.
    pub fn resolve(&self, old: &Value, new: &Value, ctx: &PathContext) -> DiffResult<Value> {
        match self.resolve_at(old, new, ctx)? {
            Resolution::Changed(diff) => {
                debug!(
                    path = ctx.path(),
                    kind = diff.kind_name(),
                    entries = diff.as_map().map_or(0, |m| m.len()),
                    "diff computed"
                );
                Ok(diff)
            }
            Resolution::Unchanged => {
                debug!(path = ctx.path(), "no difference");
                Err(DiffError::NoDifference {
                    path: ctx.path().to_owned(),
                })
            }
        }
    }

    /// Like [`Self::resolve`], with "no difference" as `None`.
    pub fn diff(&self, old: &Value, new: &Value, ctx: &PathContext) -> DiffResult<Option<Value>> {
        match self.resolve(old, new, ctx) {
            Ok(diff) => Ok(Some(diff)),
            Err(e) if e.is_no_difference() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
