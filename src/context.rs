//! # Dispatch Context

use std::collections::BTreeMap;
use std::sync::Arc;

/// Caller context handed to listeners and formatters alongside each event.
///
/// Cloning is cheap: labels live behind an `Arc` and are only copied when a
/// clone is extended with [`Context::with_label`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    labels: Arc<BTreeMap<String, String>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.labels).insert(key.into(), value.into());
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Labels in key order.
    pub fn labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
