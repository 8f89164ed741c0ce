use super::ValueKind;
use crate::error::SnapshotError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field name to value kind mapping a status frame must honor.
///
/// Two implementations of the same subsystem are interchangeable exactly
/// when their schemas compare equal. Kinds never change once defined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: BTreeMap<String, ValueKind>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name` with `kind`.
    ///
    /// Re-declaring with the same kind is a no-op; with a different kind it
    /// is a [`SnapshotError::SchemaViolation`].
    pub fn define(&mut self, name: &str, kind: ValueKind) -> Result<(), SnapshotError> {
        match self.fields.get(name) {
            Some(&existing) if existing != kind => Err(SnapshotError::SchemaViolation {
                field: name.to_owned(),
                expected: existing,
                found: kind,
            }),
            Some(_) => Ok(()),
            None => {
                self.fields.insert(name.to_owned(), kind);
                Ok(())
            }
        }
    }

    /// Builder-style [`Schema::define`].
    pub fn with_field(mut self, name: &str, kind: ValueKind) -> Result<Self, SnapshotError> {
        self.define(name, kind)?;
        Ok(self)
    }

    pub fn kind_of(&self, name: &str) -> Option<ValueKind> {
        self.fields.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, ValueKind)> {
        self.fields.iter().map(|(name, kind)| (name.as_str(), *kind))
    }
}

/// Later entries replace earlier ones of the same name; use
/// [`Schema::define`] where a conflicting kind must be rejected.
impl<'a> FromIterator<(&'a str, ValueKind)> for Schema {
    fn from_iter<I: IntoIterator<Item = (&'a str, ValueKind)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, kind)| (name.to_owned(), kind))
                .collect(),
        }
    }
}
