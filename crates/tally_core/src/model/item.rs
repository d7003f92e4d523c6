//! Expense item model.
//!
//! # Invariants
//! - `id` is the primary key and is unique within the items file.
//! - `description` is non-empty and `amount` is finite for items created
//!   through the service layer.
//! - Validated items round-trip through the items file: the description has
//!   no line breaks and the year fits the four-digit `Date` column.

use crate::codec::{DateFormat, Value};
use crate::repo::{FieldValues, Record, RepoResult};
use crate::schema::{Field, FieldSpec, Schema};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Field identifiers of [`Item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemField {
    Id,
    CreatedAt,
    Description,
    Amount,
}

impl Field for ItemField {
    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::CreatedAt => "created_at",
            Self::Description => "description",
            Self::Amount => "amount",
        }
    }
}

static ITEM_FIELDS: [FieldSpec<ItemField>; 4] = [
    FieldSpec::string(ItemField::Id, "ID").primary_key(),
    FieldSpec::date(ItemField::CreatedAt, "Date", DateFormat::IsoDate),
    FieldSpec::string(ItemField::Description, "Description"),
    FieldSpec::number(ItemField::Amount, "Amount"),
];

const MAX_YEAR: i32 = 9999;

/// Column layout: `ID,Date,Description,Amount`.
pub static ITEM_SCHEMA: Schema<ItemField> = Schema::new(&ITEM_FIELDS);

/// One recorded expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub created_at: NaiveDate,
    pub description: String,
    pub amount: f64,
}

/// Validation failures for item input.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemValidationError {
    EmptyDescription,
    /// Record files hold one row per line.
    DescriptionLineBreak,
    NonFiniteAmount(f64),
    YearOutOfRange(i32),
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDescription => write!(f, "description must not be empty"),
            Self::DescriptionLineBreak => write!(f, "description must not contain line breaks"),
            Self::NonFiniteAmount(amount) => write!(f, "amount must be a finite number, got {amount}"),
            Self::YearOutOfRange(year) => write!(f, "year must be between 0 and {MAX_YEAR}, got {year}"),
        }
    }
}

impl Error for ItemValidationError {}

impl Item {
    pub fn new(
        id: impl Into<String>,
        created_at: NaiveDate,
        description: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            id: id.into(),
            created_at,
            description: description.into(),
            amount,
        }
    }

    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.description.trim().is_empty() {
            return Err(ItemValidationError::EmptyDescription);
        }
        if self.description.contains(['\n', '\r']) {
            return Err(ItemValidationError::DescriptionLineBreak);
        }
        if !self.amount.is_finite() {
            return Err(ItemValidationError::NonFiniteAmount(self.amount));
        }
        let year = self.created_at.year();
        if !(0..=MAX_YEAR).contains(&year) {
            return Err(ItemValidationError::YearOutOfRange(year));
        }
        Ok(())
    }
}

impl Record for Item {
    type Field = ItemField;

    fn schema() -> &'static Schema<ItemField> {
        &ITEM_SCHEMA
    }

    fn value(&self, field: ItemField) -> Value {
        match field {
            ItemField::Id => Value::from(self.id.as_str()),
            ItemField::CreatedAt => Value::Date(self.created_at),
            ItemField::Description => Value::from(self.description.as_str()),
            ItemField::Amount => Value::Number(self.amount),
        }
    }

    fn from_values(mut values: FieldValues<ItemField>) -> RepoResult<Self> {
        Ok(Self {
            id: values.string(ItemField::Id)?,
            created_at: values.date(ItemField::CreatedAt)?,
            description: values.string(ItemField::Description)?,
            amount: values.number(ItemField::Amount)?,
        })
    }
}
