//! Static field tables describing how an entity maps onto file columns.
//!
//! # Responsibility
//! - Declare, per entity type, which fields are persisted, under which
//!   header, with which value type and date format.
//! - Expose header, persisted-field and primary-key projections.
//!
//! # Invariants
//! - Schemas are `'static` tables built at compile time.
//! - Declaration order is the column order used for writes.
//! - Headers are unique; every primary key is persisted
//!   (checked by [`Schema::validate`]).

use crate::codec::{escape, DateFormat, ValueType};
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

/// Enumerated field identifier of one entity type.
pub trait Field: Copy + Eq + Hash + Debug + 'static {
    /// Stable field name used in diagnostics.
    fn name(self) -> &'static str;
}

/// Description of one entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec<F> {
    pub field: F,
    /// Column header. `None` means the field is not persisted.
    pub header: Option<&'static str>,
    pub value_type: ValueType,
    pub date_format: Option<DateFormat>,
    pub primary_key: bool,
}

impl<F: Copy> FieldSpec<F> {
    pub const fn string(field: F, header: &'static str) -> Self {
        Self::persisted(field, header, ValueType::String)
    }

    pub const fn number(field: F, header: &'static str) -> Self {
        Self::persisted(field, header, ValueType::Number)
    }

    pub const fn date(field: F, header: &'static str, format: DateFormat) -> Self {
        Self {
            field,
            header: Some(header),
            value_type: ValueType::Date,
            date_format: Some(format),
            primary_key: false,
        }
    }

    /// A field that lives on the entity but never reaches the file.
    pub const fn transient(field: F, value_type: ValueType) -> Self {
        Self {
            field,
            header: None,
            value_type,
            date_format: None,
            primary_key: false,
        }
    }

    /// Marks this field as part of the primary key.
    pub const fn primary_key(self) -> Self {
        Self {
            primary_key: true,
            ..self
        }
    }

    const fn persisted(field: F, header: &'static str, value_type: ValueType) -> Self {
        Self {
            field,
            header: Some(header),
            value_type,
            date_format: None,
            primary_key: false,
        }
    }

    pub const fn is_persisted(&self) -> bool {
        self.header.is_some()
    }

    /// Effective date format; undeclared formats fall back to `DD/MM/YYYY`.
    pub fn format(&self) -> DateFormat {
        self.date_format.unwrap_or(DateFormat::DEFAULT)
    }
}

/// Ordered field table for one entity type.
#[derive(Debug)]
pub struct Schema<F: 'static> {
    fields: &'static [FieldSpec<F>],
}

impl<F: 'static> Schema<F> {
    pub const fn new(fields: &'static [FieldSpec<F>]) -> Self {
        Self { fields }
    }
}

impl<F: Field> Schema<F> {
    /// All declared fields, persisted or not, in declaration order.
    pub fn fields(&self) -> &'static [FieldSpec<F>] {
        self.fields
    }

    /// Persisted fields in column order.
    pub fn columns(&self) -> impl Iterator<Item = &'static FieldSpec<F>> {
        let fields: &'static [FieldSpec<F>] = self.fields;
        fields.iter().filter(|spec| spec.is_persisted())
    }

    pub fn spec(&self, field: F) -> Option<&'static FieldSpec<F>> {
        self.fields.iter().find(|spec| spec.field == field)
    }

    /// Looks up a persisted field by its exact header text.
    pub fn by_header(&self, header: &str) -> Option<&'static FieldSpec<F>> {
        self.columns().find(|spec| spec.header == Some(header))
    }

    /// Escaped header cells of persisted fields, in column order.
    pub fn headers(&self, delimiter: char) -> Vec<String> {
        self.columns()
            .filter_map(|spec| spec.header)
            .map(|header| escape(header, delimiter))
            .collect()
    }

    /// Names of persisted fields, in column order.
    pub fn persisted_fields(&self) -> Vec<F> {
        self.columns().map(|spec| spec.field).collect()
    }

    pub fn primary_keys(&self) -> Vec<F> {
        self.fields
            .iter()
            .filter(|spec| spec.primary_key)
            .map(|spec| spec.field)
            .collect()
    }

    /// Checks the table invariants.
    ///
    /// # Errors
    /// - Duplicate field or header.
    /// - No primary key, or a primary key that is not persisted.
    pub fn validate(&self) -> Result<(), String> {
        let mut fields = HashSet::new();
        let mut headers = HashSet::new();
        for spec in self.fields {
            if !fields.insert(spec.field) {
                return Err(format!("field `{}` declared twice", spec.field.name()));
            }
            if let Some(header) = spec.header {
                if !headers.insert(header) {
                    return Err(format!("header `{header}` declared twice"));
                }
            }
            if spec.primary_key && !spec.is_persisted() {
                return Err(format!(
                    "primary key `{}` must be persisted",
                    spec.field.name()
                ));
            }
        }
        if !self.fields.iter().any(|spec| spec.primary_key) {
            return Err("schema declares no primary key".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Field, FieldSpec, Schema};
    use crate::codec::{DateFormat, ValueType};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Sample {
        Id,
        When,
        Note,
        Cached,
    }

    impl Field for Sample {
        fn name(self) -> &'static str {
            match self {
                Self::Id => "id",
                Self::When => "when",
                Self::Note => "note",
                Self::Cached => "cached",
            }
        }
    }

    static SAMPLE_FIELDS: [FieldSpec<Sample>; 4] = [
        FieldSpec::number(Sample::Id, "ID").primary_key(),
        FieldSpec::transient(Sample::Cached, ValueType::String),
        FieldSpec::date(Sample::When, "When", DateFormat::IsoDate),
        FieldSpec::string(Sample::Note, "Note, long"),
    ];
    static SAMPLE_SCHEMA: Schema<Sample> = Schema::new(&SAMPLE_FIELDS);

    #[test]
    fn headers_skip_transient_fields_and_are_escaped() {
        assert_eq!(
            SAMPLE_SCHEMA.headers(','),
            vec!["ID".to_string(), "When".to_string(), "\"Note, long\"".to_string()]
        );
    }

    #[test]
    fn projections_follow_declaration_order() {
        assert_eq!(
            SAMPLE_SCHEMA.persisted_fields(),
            vec![Sample::Id, Sample::When, Sample::Note]
        );
        assert_eq!(SAMPLE_SCHEMA.primary_keys(), vec![Sample::Id]);
        assert_eq!(SAMPLE_SCHEMA.by_header("When").map(|spec| spec.field), Some(Sample::When));
        assert!(SAMPLE_SCHEMA.by_header("Cached").is_none());
    }

    #[test]
    fn undeclared_date_format_falls_back_to_default() {
        let spec = FieldSpec::transient(Sample::When, ValueType::Date);
        assert_eq!(spec.format(), DateFormat::DEFAULT);
    }

    #[test]
    fn validate_accepts_well_formed_schema() {
        SAMPLE_SCHEMA.validate().unwrap();
    }

    #[test]
    fn validate_rejects_duplicate_headers() {
        static FIELDS: [FieldSpec<Sample>; 2] = [
            FieldSpec::string(Sample::Id, "ID").primary_key(),
            FieldSpec::string(Sample::Note, "ID"),
        ];
        static DUPLICATE: Schema<Sample> = Schema::new(&FIELDS);
        let err = DUPLICATE.validate().unwrap_err();
        assert!(err.contains("header `ID`"));
    }

    #[test]
    fn validate_rejects_missing_or_transient_primary_key() {
        static NO_KEY_FIELDS: [FieldSpec<Sample>; 1] = [FieldSpec::string(Sample::Note, "Note")];
        static NO_KEY: Schema<Sample> = Schema::new(&NO_KEY_FIELDS);
        assert!(NO_KEY.validate().unwrap_err().contains("no primary key"));

        static TRANSIENT_FIELDS: [FieldSpec<Sample>; 1] =
            [FieldSpec::transient(Sample::Id, ValueType::String).primary_key()];
        static TRANSIENT_KEY: Schema<Sample> = Schema::new(&TRANSIENT_FIELDS);
        assert!(TRANSIENT_KEY.validate().unwrap_err().contains("must be persisted"));
    }
}
