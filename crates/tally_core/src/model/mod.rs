//! Entity types persisted through the repository layer.
//!
//! # Responsibility
//! - Define the canonical records stored in record files.
//! - Bind each record to its static schema table.
//!
//! # Invariants
//! - Each entity's primary key is declared in its schema and is persisted.

pub mod item;
pub mod sequence;
