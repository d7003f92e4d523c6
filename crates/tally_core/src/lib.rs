//! Core domain logic for tally.
//! This crate owns the record file format and every storage invariant.

pub mod codec;
pub mod config;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schema;
pub mod service;

pub use codec::{CodecError, DateFormat, Value, ValueType};
pub use config::{CsvItemService, CsvSequenceService, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::item::{Item, ItemField, ItemValidationError, ITEM_SCHEMA};
pub use model::sequence::{Sequence, SequenceField, SEQUENCE_SCHEMA};
pub use repo::{CsvRepository, FieldValues, Record, Records, RepoError, RepoResult, Repository};
pub use schema::{Field, FieldSpec, Schema};
pub use service::item_service::{ItemListResult, ItemService, ItemServiceError, ITEM_SEQUENCE};
pub use service::sequence_service::{SequenceService, SequenceServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
