use strata_merge::Merger;
use strata_types::{Value, ValueMap};
use tracing::debug;

use crate::definition::ObjectDefinition;
use crate::error::ReplayError;
use crate::factory::RecordFactory;
use crate::provider::ChangeProvider;

/// Rebuilds objects by folding their change sets through a [`Merger`].
#[derive(Clone, Debug)]
pub struct Restorer<F> {
    merger: Merger,
    factory: F,
}

impl<F: RecordFactory> Restorer<F> {
    pub fn new(factory: F) -> Self {
        Self::with_merger(Merger::new(), factory)
    }

    pub fn with_merger(merger: Merger, factory: F) -> Self {
        Self { merger, factory }
    }

    pub fn merger(&self) -> &Merger {
        &self.merger
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Fold every change set, oldest first, starting from an empty state.
    pub fn restore_state(&self, definition: &ObjectDefinition) -> Result<ValueMap, ReplayError> {
        definition
            .changes()
            .iter()
            .enumerate()
            .try_fold(ValueMap::new(), |state, (index, change)| match change {
                Value::Map(change) => Ok(self.merger.merge(&state, change)),
                other => Err(ReplayError::InvalidChange {
                    index,
                    kind: other.kind_name().to_owned(),
                }),
            })
    }

    /// Fold the change sets and build the target type from the result.
    pub fn restore(&self, definition: &ObjectDefinition) -> Result<F::Output, ReplayError> {
        let state = self.restore_state(definition)?;
        debug!(
            target_type = definition.target_type(),
            changes = definition.len(),
            fields = state.len(),
            "restored state"
        );
        self.factory.construct(definition.target_type(), state)
    }

    /// Load an object's change sets from `provider` and restore it.
    pub fn restore_from<P>(
        &self,
        provider: &P,
        target_type: &str,
        id: &str,
    ) -> Result<F::Output, ReplayError>
    where
        P: ChangeProvider + ?Sized,
    {
        let changes = provider.changes_for(target_type, id)?;
        self.restore(&ObjectDefinition::from_changes(target_type, changes))
    }
}
