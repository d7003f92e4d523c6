//! Repository layer over delimited record files.
//!
//! # Responsibility
//! - Define the CRUD contract consumed by services (`Repository`).
//! - Implement it over one CSV file per entity type (`CsvRepository`).
//!
//! # Invariants
//! - Every operation opens the file fresh; nothing is cached between calls.
//! - `update`/`delete` never expose a partially rewritten file: they stage
//!   into a temporary file in the same directory and rename it over the
//!   original.
//! - Primary-key comparison is performed on typed values, never raw text.
//!
//! # Limitations
//! - No locking. Concurrent writers against one path race; the last rename
//!   wins. Callers needing concurrency must serialize externally.
//! - `insert_many` truncates in place and is not atomic.

use crate::codec::CodecError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

pub mod csv_repo;
pub mod record;

pub use csv_repo::{CsvRepository, Records};
pub use record::{FieldValues, Record};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for record file operations.
#[derive(Debug)]
pub enum RepoError {
    /// A key lookup did not supply every primary-key field.
    MissingPrimaryKey(&'static str),
    /// The file header names a column the schema does not know.
    SchemaMismatch { header: String },
    /// A persisted field has no column in the file header.
    MissingColumn { header: &'static str },
    /// An update patch names a transient or primary-key field.
    InvalidField(&'static str),
    /// A value failed to parse under its declared type.
    ValueParse {
        field: &'static str,
        line: Option<usize>,
        source: CodecError,
    },
    /// The schema table breaks its own invariants.
    InvalidSchema(String),
    /// The delimiter collides with quoting or line structure.
    InvalidDelimiter(char),
    /// Open/read/write/rename failure.
    Io { path: PathBuf, source: io::Error },
}

impl RepoError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns `true` when the error is an I/O failure caused by a missing file.
    pub fn is_missing_file(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }

    /// Stable short code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingPrimaryKey(_) => "missing_primary_key",
            Self::SchemaMismatch { .. } => "schema_mismatch",
            Self::MissingColumn { .. } => "missing_column",
            Self::InvalidField(_) => "invalid_field",
            Self::ValueParse { .. } => "value_parse",
            Self::InvalidSchema(_) => "invalid_schema",
            Self::InvalidDelimiter(_) => "invalid_delimiter",
            Self::Io { .. } => "io",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPrimaryKey(field) => write!(f, "missing primary key field `{field}`"),
            Self::SchemaMismatch { header } => {
                write!(f, "header `{header}` does not match any schema field")
            }
            Self::MissingColumn { header } => write!(f, "file has no `{header}` column"),
            Self::InvalidField(field) => {
                write!(f, "field `{field}` is not an updatable persisted field")
            }
            Self::ValueParse {
                field,
                line: Some(line),
                source,
            } => write!(f, "field `{field}` on line {line}: {source}"),
            Self::ValueParse {
                field,
                line: None,
                source,
            } => write!(f, "field `{field}`: {source}"),
            Self::InvalidSchema(message) => write!(f, "invalid schema: {message}"),
            Self::InvalidDelimiter(delimiter) => {
                write!(f, "delimiter {delimiter:?} cannot be used in record files")
            }
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ValueParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Field/value pairs used both as key lookups and as update patches.
pub type FieldAssignments<'a, F> = &'a [(F, crate::codec::Value)];

/// CRUD contract over one entity type.
pub trait Repository<E: Record> {
    /// Decodes every record in file order.
    fn all(&self) -> RepoResult<Vec<E>>;
    /// Returns the first record whose primary key equals `keys`.
    fn load(&self, keys: FieldAssignments<'_, E::Field>) -> RepoResult<Option<E>>;
    /// Appends one record. Never rewrites existing rows.
    fn insert(&self, record: &E) -> RepoResult<usize>;
    /// Overwrites the file with a header plus `records`.
    fn insert_many(&self, records: &[E]) -> RepoResult<usize>;
    /// Rewrites the patched columns of every row matching `keys`.
    fn update(
        &self,
        patch: FieldAssignments<'_, E::Field>,
        keys: FieldAssignments<'_, E::Field>,
    ) -> RepoResult<usize>;
    /// Removes every row matching `keys`.
    fn delete(&self, keys: FieldAssignments<'_, E::Field>) -> RepoResult<usize>;
}
