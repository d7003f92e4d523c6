//! Expense item use-case service.
//!
//! # Responsibility
//! - Create items with minted ids and today's date.
//! - Provide list/get/delete entry points for the CLI.
//!
//! # Invariants
//! - Item ids come from the `item` sequence; the repository itself never
//!   checks id uniqueness.
//! - Input is validated before an id is minted, so rejected input does not
//!   consume a sequence value.

use crate::codec::Value;
use crate::model::item::{Item, ItemField, ItemValidationError};
use crate::model::sequence::Sequence;
use crate::repo::{RepoError, Repository};
use crate::service::sequence_service::{SequenceService, SequenceServiceError};
use chrono::{Local, NaiveDate};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Sequence name used to mint item ids.
pub const ITEM_SEQUENCE: &str = "item";

/// Service error for item use-cases.
#[derive(Debug)]
pub enum ItemServiceError {
    /// Rejected user input.
    Validation(ItemValidationError),
    /// Target item does not exist.
    ItemNotFound(String),
    /// Id minting failure.
    Sequence(SequenceServiceError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ItemServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::Sequence(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ItemServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Sequence(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::ItemNotFound(_) => None,
        }
    }
}

impl From<ItemValidationError> for ItemServiceError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<SequenceServiceError> for ItemServiceError {
    fn from(value: SequenceServiceError) -> Self {
        Self::Sequence(value)
    }
}

impl From<RepoError> for ItemServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// List result envelope used by service callers.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemListResult {
    /// Items in file order.
    pub items: Vec<Item>,
    pub total: usize,
}

/// Item service facade over item and sequence repositories.
pub struct ItemService<I: Repository<Item>, S: Repository<Sequence>> {
    items: I,
    sequences: SequenceService<S>,
}

impl<I: Repository<Item>, S: Repository<Sequence>> ItemService<I, S> {
    pub fn new(items: I, sequences: SequenceService<S>) -> Self {
        Self { items, sequences }
    }

    /// Records a new expense dated today (local time).
    pub fn add(&self, description: &str, amount: f64) -> Result<Item, ItemServiceError> {
        self.add_on(description, amount, Local::now().date_naive())
    }

    /// Records a new expense with an explicit date.
    ///
    /// # Contract
    /// - Validates input before minting an id.
    /// - Appends exactly one row.
    pub fn add_on(
        &self,
        description: &str,
        amount: f64,
        created_at: NaiveDate,
    ) -> Result<Item, ItemServiceError> {
        let mut item = Item::new(String::new(), created_at, description.trim(), amount);
        item.validate()?;

        item.id = self.sequences.next(ITEM_SEQUENCE)?.to_string();
        self.items.insert(&item)?;
        info!("event=item_add module=service status=ok id={}", item.id);
        Ok(item)
    }

    /// Lists every item. A missing items file reads as an empty list.
    pub fn list(&self) -> Result<ItemListResult, ItemServiceError> {
        let items = match self.items.all() {
            Ok(items) => items,
            Err(err) if err.is_missing_file() => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(ItemListResult {
            total: items.len(),
            items,
        })
    }

    pub fn get(&self, id: &str) -> Result<Option<Item>, ItemServiceError> {
        Ok(self.items.load(&[(ItemField::Id, Value::from(id))])?)
    }

    /// Deletes one item by id.
    ///
    /// Returns `ItemNotFound` when no row matched.
    pub fn delete(&self, id: &str) -> Result<(), ItemServiceError> {
        let deleted = match self.items.delete(&[(ItemField::Id, Value::from(id))]) {
            Ok(deleted) => deleted,
            Err(err) if err.is_missing_file() => 0,
            Err(err) => return Err(err.into()),
        };
        if deleted == 0 {
            return Err(ItemServiceError::ItemNotFound(id.to_string()));
        }
        info!("event=item_delete module=service status=ok id={id}");
        Ok(())
    }
}
