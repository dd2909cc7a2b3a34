#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::uninlined_format_args)]

//! Knowledge graph embedding evaluation, search and reference models.
//!
//! Knowledge graphs store facts as (subject, predicate, object) triples:
//! `(Einstein, won, NobelPrize)`. Embedding models learn vector
//! representations whose geometry predicts missing links; this crate
//! provides everything around such a model:
//!
//! - [`corruption`] - negative triple generation for training (random,
//!   seeded) and evaluation (exhaustive, optionally filtered)
//! - [`evaluation`] - the standard link-prediction ranking protocol
//! - [`metrics`] - MR / MRR / Hits@N over rank sequences
//! - [`params`] - hyperparameter grids, hashing and deduplication
//! - [`selection`] - the train/evaluate search driver
//! - [`models`] - TransE, DistMult and ComplEx reference implementations
//!   of the [`EmbeddingModel`] contract
//!
//! # Example
//!
//! ```rust,ignore
//! use vektra_kge::{evaluate_performance, EvalConfig, RankMetrics, TrainConfig};
//! use vektra_kge::models::TransE;
//!
//! let mut model = TransE::new(TrainConfig::default().with_k(64));
//! model.fit(&train)?;
//!
//! // Filtered evaluation against train + valid + test.
//! let filter: Vec<_> = [train, valid, test.clone()].concat();
//! let ranks = evaluate_performance(&test, &model, Some(&filter), &EvalConfig::default())?;
//! println!("{}", RankMetrics::from_ranks(&ranks)?.summary());
//! ```
//!
//! Evaluation cost grows as `O(|test| x |entities|)`; pools above the
//! process-wide [`entity threshold`](config::entity_threshold) log a
//! warning but still run to completion.

pub mod config;
pub mod corruption;
mod error;
pub mod evaluation;
pub mod metrics;
pub mod model;
pub mod models;
pub mod params;
pub mod scoring;
pub mod selection;
pub mod training;

pub use config::{
    entity_threshold, reset_entity_threshold, set_entity_threshold, DEFAULT_ENTITY_THRESHOLD,
};
pub use corruption::{
    generate_corruptions_for_eval, generate_corruptions_for_fit, CorruptSide, TripleFilter,
};
pub use error::{Error, Result};
pub use evaluation::{evaluate_performance, EvalConfig};
pub use metrics::{hits_at_n_score, mr_score, mrr_score, RankMetrics};
pub use model::EmbeddingModel;
pub use params::{
    flatten_nested_keys, grid_iter, param_hash, random_iter, remove_unused_params,
    sample_parameters, unflatten_nested_keys, FlatKey, HyperParams, ParamGrid, ParamHistory,
    ParamSpec, ParamValue,
};
pub use scoring::ScoringFn;
pub use selection::{select_best_model_ranking, HistoryEntry, Selection, SelectionConfig};
pub use training::{LossKind, TrainConfig};
