//! Sequence number generator.
//!
//! # Responsibility
//! - Mint monotonically increasing counters per name, stored as records in
//!   a sequence file.
//!
//! # Invariants
//! - The first value handed out for a name is `1`.
//! - Built entirely on the `Repository` contract; no extra file protocol.
//! - Not safe under concurrent callers on the same file (load-then-update).

use crate::codec::Value;
use crate::model::sequence::{Sequence, SequenceField};
use crate::repo::{RepoError, Repository};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for sequence use-cases.
#[derive(Debug)]
pub enum SequenceServiceError {
    /// No counter exists for the requested name.
    SequenceNotFound(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for SequenceServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SequenceNotFound(name) => write!(f, "sequence not found: {name}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SequenceServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::SequenceNotFound(_) => None,
        }
    }
}

impl From<RepoError> for SequenceServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Counter service over a sequence repository.
pub struct SequenceService<R: Repository<Sequence>> {
    repo: R,
}

impl<R: Repository<Sequence>> SequenceService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Advances the counter for `name` and returns the new value.
    ///
    /// # Contract
    /// - Absent name: inserts a record with value `1` and returns `1`.
    /// - Present name: updates the record to `n + 1` and returns it.
    pub fn next(&self, name: &str) -> Result<u64, SequenceServiceError> {
        let key = [(SequenceField::Name, Value::from(name))];

        match self.repo.load(&key)? {
            None => {
                self.repo.insert(&Sequence {
                    name: name.to_string(),
                    sequence_number: 1,
                })?;
                Ok(1)
            }
            Some(current) => {
                let next = current.sequence_number + 1;
                self.repo.update(
                    &[(SequenceField::SequenceNumber, Value::Number(next as f64))],
                    &key,
                )?;
                Ok(next)
            }
        }
    }

    /// Returns the last value handed out for `name`.
    pub fn current(&self, name: &str) -> Result<u64, SequenceServiceError> {
        self.repo
            .load(&[(SequenceField::Name, Value::from(name))])?
            .map(|sequence| sequence.sequence_number)
            .ok_or_else(|| SequenceServiceError::SequenceNotFound(name.to_string()))
    }

    /// Returns the value `next` would hand out, without advancing.
    pub fn peek_next(&self, name: &str) -> Result<u64, SequenceServiceError> {
        match self.current(name) {
            Ok(current) => Ok(current + 1),
            Err(SequenceServiceError::SequenceNotFound(_)) => Ok(1),
            Err(err) => Err(err),
        }
    }
}
