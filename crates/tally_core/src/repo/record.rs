//! Glue between entity structs and their schema tables.

use super::{RepoError, RepoResult};
use crate::codec::Value;
use crate::schema::{Field, Schema};
use chrono::NaiveDate;
use std::collections::HashMap;

/// An entity type that can be stored in a record file.
pub trait Record: Sized {
    type Field: Field;

    /// Static field table of this entity type.
    fn schema() -> &'static Schema<Self::Field>;

    /// Current value of `field`.
    fn value(&self, field: Self::Field) -> Value;

    /// Builds an entity from decoded persisted values.
    fn from_values(values: FieldValues<Self::Field>) -> RepoResult<Self>;
}

/// Decoded values of one row, keyed by field.
#[derive(Debug)]
pub struct FieldValues<F: Field> {
    schema: &'static Schema<F>,
    values: HashMap<F, Value>,
}

impl<F: Field> FieldValues<F> {
    pub fn new(schema: &'static Schema<F>) -> Self {
        Self {
            schema,
            values: HashMap::new(),
        }
    }

    pub fn insert(&mut self, field: F, value: Value) {
        self.values.insert(field, value);
    }

    /// Removes and returns the value of `field`.
    ///
    /// # Errors
    /// - `MissingColumn` when the row carried no value for the field.
    pub fn take(&mut self, field: F) -> RepoResult<Value> {
        self.values.remove(&field).ok_or_else(|| RepoError::MissingColumn {
            header: self
                .schema
                .spec(field)
                .and_then(|spec| spec.header)
                .unwrap_or_else(|| field.name()),
        })
    }

    pub fn string(&mut self, field: F) -> RepoResult<String> {
        match self.take(field)? {
            Value::String(value) => Ok(value),
            _ => Err(RepoError::InvalidField(field.name())),
        }
    }

    pub fn number(&mut self, field: F) -> RepoResult<f64> {
        self.take(field)?
            .as_number()
            .ok_or(RepoError::InvalidField(field.name()))
    }

    pub fn date(&mut self, field: F) -> RepoResult<NaiveDate> {
        self.take(field)?
            .as_date()
            .ok_or(RepoError::InvalidField(field.name()))
    }
}
