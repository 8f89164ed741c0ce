use super::{FromHalValue, HalValue, Schema, ValueKind};
use crate::error::SnapshotError;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Frozen, self-consistent view of hardware state at one instant.
///
/// Frames are immutable once built; share them behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusFrame {
    schema: Arc<Schema>,
    values: BTreeMap<String, HalValue>,
}

impl StatusFrame {
    /// Builder whose schema is inferred from the inserted fields.
    pub fn builder() -> StatusFrameBuilder {
        StatusFrameBuilder {
            binding: Binding::Open(Schema::new()),
            values: BTreeMap::new(),
        }
    }

    /// Builder bound to a fixed schema: every field must be declared there,
    /// and every declared field must be set before [`StatusFrameBuilder::build`].
    pub fn builder_for(schema: Arc<Schema>) -> StatusFrameBuilder {
        StatusFrameBuilder {
            binding: Binding::Bound(schema),
            values: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn value(&self, name: &str) -> Option<&HalValue> {
        self.values.get(name)
    }

    /// Reads `name` as `T`. Fails with `SchemaViolation` if the field was
    /// declared with another kind.
    pub fn get<T: FromHalValue>(&self, name: &str) -> Result<T, SnapshotError> {
        let value = self.lookup(name, T::KIND)?;
        T::from_hal_value(value).ok_or_else(|| SnapshotError::SchemaViolation {
            field: name.to_owned(),
            expected: value.kind(),
            found: T::KIND,
        })
    }

    /// Borrowing read of a text field.
    pub fn get_text(&self, name: &str) -> Result<&str, SnapshotError> {
        match self.lookup(name, ValueKind::Text)? {
            HalValue::Text(text) => Ok(text.as_str()),
            other => Err(SnapshotError::SchemaViolation {
                field: name.to_owned(),
                expected: other.kind(),
                found: ValueKind::Text,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HalValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    fn lookup(&self, name: &str, wanted: ValueKind) -> Result<&HalValue, SnapshotError> {
        let declared = self
            .schema
            .kind_of(name)
            .ok_or_else(|| SnapshotError::UnknownField(name.to_owned()))?;
        if declared != wanted {
            return Err(SnapshotError::SchemaViolation {
                field: name.to_owned(),
                expected: declared,
                found: wanted,
            });
        }
        self.values
            .get(name)
            .ok_or_else(|| SnapshotError::MissingField(name.to_owned()))
    }
}

impl Serialize for StatusFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.values.iter())
    }
}

#[derive(Debug)]
enum Binding {
    Open(Schema),
    Bound(Arc<Schema>),
}

/// Assembles a [`StatusFrame`]; nothing is visible to readers until `build`.
#[derive(Debug)]
pub struct StatusFrameBuilder {
    binding: Binding,
    values: BTreeMap<String, HalValue>,
}

impl StatusFrameBuilder {
    /// Sets `name`. Overwriting with the same kind is allowed; any attempt
    /// to change a field's kind is rejected.
    pub fn insert(
        &mut self,
        name: &str,
        value: impl Into<HalValue>,
    ) -> Result<&mut Self, SnapshotError> {
        let value = value.into();
        match &mut self.binding {
            Binding::Open(schema) => schema.define(name, value.kind())?,
            Binding::Bound(schema) => {
                let declared = schema
                    .kind_of(name)
                    .ok_or_else(|| SnapshotError::UnknownField(name.to_owned()))?;
                if declared != value.kind() {
                    return Err(SnapshotError::SchemaViolation {
                        field: name.to_owned(),
                        expected: declared,
                        found: value.kind(),
                    });
                }
            }
        }
        self.values.insert(name.to_owned(), value);
        Ok(self)
    }

    /// Owning form of [`StatusFrameBuilder::insert`].
    pub fn with(mut self, name: &str, value: impl Into<HalValue>) -> Result<Self, SnapshotError> {
        self.insert(name, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<StatusFrame, SnapshotError> {
        let schema = match self.binding {
            Binding::Open(schema) => Arc::new(schema),
            Binding::Bound(schema) => {
                if let Some((missing, _)) =
                    schema.fields().find(|(name, _)| !self.values.contains_key(*name))
                {
                    return Err(SnapshotError::MissingField(missing.to_owned()));
                }
                schema
            }
        };
        Ok(StatusFrame {
            schema,
            values: self.values,
        })
    }
}

/// Publication point for the latest frame of one schema.
///
/// Writers replace the whole frame at once; readers get an `Arc` to a
/// complete frame and can never observe a half-written one.
#[derive(Debug)]
pub struct SnapshotCell {
    schema: Arc<Schema>,
    latest: RwLock<Option<Arc<StatusFrame>>>,
    publications: AtomicU64,
}

impl SnapshotCell {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            latest: RwLock::new(None),
            publications: AtomicU64::new(0),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn publish(&self, frame: StatusFrame) -> Result<(), SnapshotError> {
        if *frame.schema != *self.schema {
            return Err(SnapshotError::SchemaMismatch);
        }
        let frame = Arc::new(frame);
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(frame);
        self.publications.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn latest(&self) -> Option<Arc<StatusFrame>> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn publications(&self) -> u64 {
        self.publications.load(Ordering::Relaxed)
    }
}
