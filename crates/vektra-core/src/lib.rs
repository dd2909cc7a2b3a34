#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]

//! Core types for knowledge graph embedding pipelines.
//!
//! This crate provides the data layer shared by training, evaluation and
//! model selection:
//!
//! - [`Triple`] / [`IndexedTriple`] - (subject, predicate, object) facts in
//!   raw string and dense index form
//! - [`Vocabulary`] - string-to-index mappings with first-appearance order
//! - [`create_mappings`] / [`to_idx`] / [`filter_unseen_entities`] - moving
//!   between the two triple forms safely
//! - [`train_test_split_no_unseen`] - splits that keep every test entity
//!   and relation covered by the training set
//!
//! # Example
//!
//! ```rust
//! use vektra_core::{create_mappings, to_idx, Triple};
//!
//! let triples = vec![
//!     Triple::new("a", "x", "b"),
//!     Triple::new("c", "y", "d"),
//! ];
//!
//! let (relations, entities) = create_mappings(&triples).unwrap();
//! let indexed = to_idx(&triples, &entities, &relations).unwrap();
//!
//! assert_eq!(indexed[0].subject, 0);
//! assert_eq!(indexed[1].object, 3);
//! ```

mod error;
mod mapping;
mod split;
mod triple;

pub use error::{Error, Result};
pub use mapping::{create_mappings, filter_unseen_entities, to_idx, Vocabulary};
pub use split::{train_test_split_no_unseen, TestSize};
pub use triple::{IndexedTriple, Triple};
