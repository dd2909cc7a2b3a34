//! Rank-based evaluation for knowledge graph embeddings.
//!
//! Implements the standard link-prediction protocol: for each test triple
//! (s, p, o), score it against corruptions of its subject and/or object and
//! record the 1-based rank of the true triple.
//!
//! # Filtered vs raw
//!
//! | Setting | Description |
//! |---------|-------------|
//! | Raw | all candidate entities compete |
//! | Filtered | candidates that are known true triples are removed first |
//!
//! Filtered is the standard benchmark setting: raw evaluation penalizes the
//! model for ranking *other* true triples above the test triple.
//!
//! # Ranking
//!
//! `rank = 1 + |{candidates != true triple with score >= true score}|`
//!
//! Ties count against the model, which makes the rank pessimistic and
//! independent of candidate iteration order.
//!
//! # Protocol modes
//!
//! With `corrupt_side = Both` under the default protocol, each test triple
//! yields two ranks (subject-side and object-side) — exactly what two
//! separate single-side passes would produce. Disabling the default
//! protocol (or requesting `Joint`) instead ranks the true triple once
//! against the concatenated subject+object candidate set.

use std::collections::HashSet;

use tracing::warn;

use vektra_core::{filter_unseen_entities, to_idx, IndexedTriple, Triple, Vocabulary};

use crate::config::entity_threshold;
use crate::corruption::{generate_corruptions_for_eval, CorruptSide, TripleFilter};
use crate::model::EmbeddingModel;
use crate::{Error, Result};

/// Evaluation protocol settings.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Which side(s) of each test triple to corrupt.
    pub corrupt_side: CorruptSide,
    /// Restrict corruption candidates to these entities instead of the
    /// whole vocabulary.
    pub entities_subset: Option<Vec<String>>,
    /// With [`CorruptSide::Both`], produce one rank per side and triple
    /// (the default protocol) rather than a single rank over the
    /// concatenated candidate set.
    pub use_default_protocol: bool,
    /// Guarantee the true triple is part of the candidate set even when a
    /// restricted `entities_subset` omits its entity. Disabling this is an
    /// explicit closed-world mode: a side whose candidates are all
    /// filtered away then fails instead of falling back to the true
    /// triple as its own sole competitor.
    pub reinsert_true_entity: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            corrupt_side: CorruptSide::Both,
            entities_subset: None,
            use_default_protocol: true,
            reinsert_true_entity: true,
        }
    }
}

impl EvalConfig {
    pub fn with_corrupt_side(mut self, side: CorruptSide) -> Self {
        self.corrupt_side = side;
        self
    }

    pub fn with_entities_subset(mut self, subset: Vec<String>) -> Self {
        self.entities_subset = Some(subset);
        self
    }

    pub fn with_default_protocol(mut self, on: bool) -> Self {
        self.use_default_protocol = on;
        self
    }

    pub fn with_reinsert_true_entity(mut self, on: bool) -> Self {
        self.reinsert_true_entity = on;
        self
    }
}

/// Evaluate `test` triples against `model`, returning one rank per
/// (triple, side) pair.
///
/// Test triples with identifiers unseen during `fit` are dropped up front
/// (with a warning). With `filter_triples`, corruptions that appear in the
/// filter are excluded before ranking — pass the union of train, valid and
/// test for the standard filtered protocol. A candidate pool larger than
/// the process-wide [`entity threshold`](crate::config::entity_threshold)
/// emits a warning; evaluation still runs to completion.
pub fn evaluate_performance(
    test: &[Triple],
    model: &dyn EmbeddingModel,
    filter_triples: Option<&[Triple]>,
    config: &EvalConfig,
) -> Result<Vec<usize>> {
    if !model.is_fitted() {
        return Err(Error::NotFitted);
    }
    let entities = model.entity_to_idx();
    let relations = model.relation_to_idx();

    let test = filter_unseen_entities(test, entities, relations, false)?;
    if test.is_empty() {
        return Err(Error::Core(vektra_core::Error::EmptyInput(
            "evaluate_performance",
        )));
    }
    let test_idx = to_idx(&test, entities, relations)?;

    let filter = match filter_triples {
        Some(known) => {
            let known = filter_unseen_entities(known, entities, relations, false)?;
            Some(TripleFilter::from_triples(to_idx(
                &known, entities, relations,
            )?))
        }
        None => None,
    };

    let pool = candidate_pool(config, entities)?;
    if pool.len() > entity_threshold() {
        warn!(
            candidates = pool.len(),
            threshold = entity_threshold(),
            "ranking against a large candidate pool; cost grows as O(|test| * |entities|)"
        );
    }

    let mut ranks = Vec::new();
    for &triple in &test_idx {
        match config.corrupt_side {
            CorruptSide::Subject | CorruptSide::Object => {
                ranks.push(rank_triple(
                    triple,
                    config.corrupt_side,
                    &pool,
                    filter.as_ref(),
                    model,
                    config.reinsert_true_entity,
                )?);
            }
            CorruptSide::Both if config.use_default_protocol => {
                ranks.push(rank_triple(
                    triple,
                    CorruptSide::Subject,
                    &pool,
                    filter.as_ref(),
                    model,
                    config.reinsert_true_entity,
                )?);
                ranks.push(rank_triple(
                    triple,
                    CorruptSide::Object,
                    &pool,
                    filter.as_ref(),
                    model,
                    config.reinsert_true_entity,
                )?);
            }
            CorruptSide::Both | CorruptSide::Joint => {
                ranks.push(rank_triple(
                    triple,
                    CorruptSide::Joint,
                    &pool,
                    filter.as_ref(),
                    model,
                    config.reinsert_true_entity,
                )?);
            }
        }
    }

    Ok(ranks)
}

/// Resolve the candidate entity pool: the whole vocabulary, or the mapped
/// `entities_subset` with unknown labels skipped (warned) and duplicates
/// removed.
fn candidate_pool(config: &EvalConfig, entities: &Vocabulary) -> Result<Vec<usize>> {
    let pool = match &config.entities_subset {
        None => (0..entities.len()).collect::<Vec<_>>(),
        Some(labels) => {
            let mut seen = HashSet::new();
            let mut pool = Vec::with_capacity(labels.len());
            let mut unknown = 0usize;
            for label in labels {
                match entities.index_of(label) {
                    Some(idx) => {
                        if seen.insert(idx) {
                            pool.push(idx);
                        }
                    }
                    None => unknown += 1,
                }
            }
            if unknown > 0 {
                warn!(
                    skipped = unknown,
                    "entities_subset contains labels unseen during fit"
                );
            }
            pool
        }
    };

    if pool.is_empty() {
        return Err(Error::InvalidArgument(
            "candidate entity pool is empty".into(),
        ));
    }
    Ok(pool)
}

/// Rank one test triple for one side (or jointly for both).
fn rank_triple(
    triple: IndexedTriple,
    side: CorruptSide,
    pool: &[usize],
    filter: Option<&TripleFilter>,
    model: &dyn EmbeddingModel,
    reinsert_true_entity: bool,
) -> Result<usize> {
    let mut candidates = generate_corruptions_for_eval(triple, pool, filter, side);

    if reinsert_true_entity {
        if !candidates.contains(&triple) {
            candidates.push(triple);
        }
    } else if candidates.is_empty() {
        return Err(Error::EmptyCandidates(match side {
            CorruptSide::Subject => "s",
            CorruptSide::Object => "o",
            CorruptSide::Both => "s,o",
            CorruptSide::Joint => "s+o",
        }));
    }

    let true_score = model.score_indexed(std::slice::from_ref(&triple))?[0];
    let scores = model.score_indexed(&candidates)?;

    let better_or_tied = candidates
        .iter()
        .zip(&scores)
        .filter(|(c, &s)| **c != triple && s >= true_score)
        .count();

    Ok(1 + better_or_tied)
}
