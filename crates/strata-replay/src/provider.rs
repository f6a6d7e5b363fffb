use std::collections::HashMap;
use std::sync::RwLock;

use strata_types::Value;

use crate::error::ReplayError;

/// Read boundary for recorded change sets.
pub trait ChangeProvider: Send + Sync {
    /// Every change recorded for one object, oldest first.
    fn changes_for(&self, target_type: &str, id: &str) -> Result<Vec<Value>, ReplayError>;
}

/// In-memory change log for tests and embedding.
///
/// Append-only: one stream of change sets per `(target type, id)` pair.
#[derive(Debug, Default)]
pub struct InMemoryChangeLog {
    inner: RwLock<HashMap<(String, String), Vec<Value>>>,
}

impl InMemoryChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a change set to an object's stream. Returns the stream length.
    pub fn append(
        &self,
        target_type: &str,
        id: &str,
        change: impl Into<Value>,
    ) -> Result<usize, ReplayError> {
        let mut streams = self
            .inner
            .write()
            .map_err(|_| ReplayError::Storage("change log lock poisoned".into()))?;
        let stream = streams
            .entry((target_type.to_owned(), id.to_owned()))
            .or_default();
        stream.push(change.into());
        Ok(stream.len())
    }

    /// Number of change sets recorded for an object.
    pub fn stream_len(&self, target_type: &str, id: &str) -> Result<usize, ReplayError> {
        let streams = self
            .inner
            .read()
            .map_err(|_| ReplayError::Storage("change log lock poisoned".into()))?;
        Ok(streams
            .get(&(target_type.to_owned(), id.to_owned()))
            .map_or(0, Vec::len))
    }

    /// Number of objects with at least one change set.
    pub fn stream_count(&self) -> Result<usize, ReplayError> {
        let streams = self
            .inner
            .read()
            .map_err(|_| ReplayError::Storage("change log lock poisoned".into()))?;
        Ok(streams.len())
    }
}

impl ChangeProvider for InMemoryChangeLog {
    fn changes_for(&self, target_type: &str, id: &str) -> Result<Vec<Value>, ReplayError> {
        let streams = self
            .inner
            .read()
            .map_err(|_| ReplayError::Storage("change log lock poisoned".into()))?;
        streams
            .get(&(target_type.to_owned(), id.to_owned()))
            .cloned()
            .ok_or_else(|| ReplayError::StreamNotFound {
                target_type: target_type.to_owned(),
                id: id.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn streams_are_kept_per_object() {
        let log = InMemoryChangeLog::new();
        assert_eq!(log.append("Order", "1", Value::map()).unwrap(), 1);
        assert_eq!(log.append("Order", "1", Value::map()).unwrap(), 2);
        assert_eq!(log.append("Order", "2", Value::map()).unwrap(), 1);
        assert_eq!(log.append("Invoice", "1", Value::map()).unwrap(), 1);

        assert_eq!(log.stream_len("Order", "1").unwrap(), 2);
        assert_eq!(log.stream_len("Order", "3").unwrap(), 0);
        assert_eq!(log.stream_count().unwrap(), 3);
    }

    #[test]
    fn changes_come_back_in_append_order() {
        let log = InMemoryChangeLog::new();
        for i in 0..3 {
            log.append("Order", "1", [("step", i)].into_iter().collect::<Value>())
                .unwrap();
        }
        let steps: Vec<_> = log
            .changes_for("Order", "1")
            .unwrap()
            .iter()
            .map(|c| c.field("step").and_then(Value::as_i64))
            .collect();
        assert_eq!(steps, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn unknown_stream_is_an_error() {
        let log = InMemoryChangeLog::new();
        assert_eq!(
            log.changes_for("Order", "9").unwrap_err(),
            ReplayError::StreamNotFound {
                target_type: "Order".into(),
                id: "9".into()
            }
        );
    }

    #[test]
    fn concurrent_appends() {
        let log = Arc::new(InMemoryChangeLog::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for _ in 0..25 {
                        log.append("Order", "1", Value::map()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.stream_len("Order", "1").unwrap(), 100);
    }
}
