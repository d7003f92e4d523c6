//! Store configuration.
//!
//! # Responsibility
//! - Locate the record files and pick the delimiter they use.
//! - Build repositories and services from one settings value.
//!
//! # Invariants
//! - Both record files live directly under `data_dir`.
//! - The delimiter is never `"`, `\n` or `\r`.

use crate::logging::{default_log_level, normalize_level};
use crate::model::item::Item;
use crate::model::sequence::Sequence;
use crate::repo::csv_repo::DEFAULT_DELIMITER;
use crate::repo::{CsvRepository, RepoError, RepoResult};
use crate::service::item_service::ItemService;
use crate::service::sequence_service::SequenceService;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_ITEMS_FILE: &str = "data.csv";
const DEFAULT_SEQUENCES_FILE: &str = "sequence.csv";

/// Item service type wired to CSV repositories.
pub type CsvItemService = ItemService<CsvRepository<Item>, CsvRepository<Sequence>>;

/// Sequence service type wired to a CSV repository.
pub type CsvSequenceService = SequenceService<CsvRepository<Sequence>>;

/// Settings for the file-backed store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub delimiter: char,
    pub items_file: String,
    pub sequences_file: String,
    pub log_level: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            delimiter: DEFAULT_DELIMITER,
            items_file: DEFAULT_ITEMS_FILE.to_string(),
            sequences_file: DEFAULT_SEQUENCES_FILE.to_string(),
            log_level: default_log_level().to_string(),
        }
    }
}

impl StoreConfig {
    pub fn items_path(&self) -> PathBuf {
        self.data_dir.join(&self.items_file)
    }

    pub fn sequences_path(&self) -> PathBuf {
        self.data_dir.join(&self.sequences_file)
    }

    /// Checks settings without touching the filesystem.
    pub fn validate(&self) -> Result<(), String> {
        if matches!(self.delimiter, '"' | '\n' | '\r') {
            return Err(format!(
                "delimiter {:?} cannot be used in record files",
                self.delimiter
            ));
        }
        for (label, name) in [
            ("items_file", &self.items_file),
            ("sequences_file", &self.sequences_file),
        ] {
            if name.trim().is_empty() {
                return Err(format!("{label} cannot be empty"));
            }
        }
        if self.items_file == self.sequences_file {
            return Err("items_file and sequences_file must differ".to_string());
        }
        normalize_level(&self.log_level).map_err(|err| err.to_string())?;
        Ok(())
    }

    pub fn item_repository(&self) -> RepoResult<CsvRepository<Item>> {
        CsvRepository::with_delimiter(self.items_path(), self.delimiter)
    }

    pub fn sequence_repository(&self) -> RepoResult<CsvRepository<Sequence>> {
        CsvRepository::with_delimiter(self.sequences_path(), self.delimiter)
    }

    pub fn open_sequence_service(&self) -> RepoResult<CsvSequenceService> {
        Ok(SequenceService::new(self.sequence_repository()?))
    }

    /// Creates `data_dir` if needed and wires the item service.
    pub fn open_item_service(&self) -> RepoResult<CsvItemService> {
        std::fs::create_dir_all(&self.data_dir).map_err(|err| RepoError::io(&self.data_dir, err))?;
        Ok(ItemService::new(
            self.item_repository()?,
            SequenceService::new(self.sequence_repository()?),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::StoreConfig;
    use std::path::PathBuf;

    #[test]
    fn defaults_point_into_data_dir() {
        let config = StoreConfig::default();
        assert_eq!(config.items_path(), PathBuf::from("data").join("data.csv"));
        assert_eq!(
            config.sequences_path(),
            PathBuf::from("data").join("sequence.csv")
        );
        assert_eq!(config.delimiter, ',');
        config.validate().unwrap();
    }

    #[test]
    fn partial_json_fills_missing_fields_with_defaults() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"data_dir": "/tmp/tally", "delimiter": ";"}"#).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/tally"));
        assert_eq!(config.delimiter, ';');
        assert_eq!(config.items_file, "data.csv");
    }

    #[test]
    fn validate_rejects_quote_delimiter_and_shared_file_names() {
        let quote = StoreConfig {
            delimiter: '"',
            ..StoreConfig::default()
        };
        assert!(quote.validate().is_err());

        let shared = StoreConfig {
            sequences_file: "data.csv".to_string(),
            ..StoreConfig::default()
        };
        assert!(shared.validate().unwrap_err().contains("must differ"));
    }

    #[test]
    fn validate_rejects_unknown_log_level() {
        let config = StoreConfig {
            log_level: "chatty".to_string(),
            ..StoreConfig::default()
        };
        assert!(config.validate().unwrap_err().contains("chatty"));
    }
}
