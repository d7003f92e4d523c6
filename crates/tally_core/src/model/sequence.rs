//! Named counter model used to mint primary keys.

use crate::codec::{CodecError, Value, ValueType};
use crate::repo::{FieldValues, Record, RepoError, RepoResult};
use crate::schema::{Field, FieldSpec, Schema};
use serde::{Deserialize, Serialize};

/// Field identifiers of [`Sequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceField {
    Name,
    SequenceNumber,
}

impl Field for SequenceField {
    fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::SequenceNumber => "sequence_number",
        }
    }
}

static SEQUENCE_FIELDS: [FieldSpec<SequenceField>; 2] = [
    FieldSpec::string(SequenceField::Name, "Name").primary_key(),
    FieldSpec::number(SequenceField::SequenceNumber, "Sequence"),
];

/// Column layout: `Name,Sequence`.
pub static SEQUENCE_SCHEMA: Schema<SequenceField> = Schema::new(&SEQUENCE_FIELDS);

/// Last value handed out for one counter name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    pub sequence_number: u64,
}

impl Record for Sequence {
    type Field = SequenceField;

    fn schema() -> &'static Schema<SequenceField> {
        &SEQUENCE_SCHEMA
    }

    fn value(&self, field: SequenceField) -> Value {
        match field {
            SequenceField::Name => Value::from(self.name.as_str()),
            // Counters stay far below 2^53, where f64 is exact.
            SequenceField::SequenceNumber => Value::Number(self.sequence_number as f64),
        }
    }

    fn from_values(mut values: FieldValues<SequenceField>) -> RepoResult<Self> {
        let name = values.string(SequenceField::Name)?;
        let number = values.number(SequenceField::SequenceNumber)?;
        if number < 0.0 || number.fract() != 0.0 || number > u64::MAX as f64 {
            return Err(RepoError::ValueParse {
                field: SequenceField::SequenceNumber.name(),
                line: None,
                source: CodecError::ValueParse {
                    value_type: ValueType::Number,
                    raw: number.to_string(),
                },
            });
        }

        Ok(Self {
            name,
            sequence_number: number as u64,
        })
    }
}
