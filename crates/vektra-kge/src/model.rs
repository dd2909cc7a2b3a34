//! The capability interface between the evaluation core and embedding models.
//!
//! The ranking evaluator and the model-selection driver depend only on this
//! trait, never on a concrete model. Anything that can fit on triples,
//! score index-form triples, and expose its vocabularies can be evaluated —
//! including a mock scorer in tests.

use vektra_core::{to_idx, IndexedTriple, Triple, Vocabulary};

use crate::{Error, Result};

/// A trainable triple-scoring model.
///
/// Scores are plausibility values where higher means more plausible; the
/// scale is model-specific (TransE scores are negative distances).
pub trait EmbeddingModel: Send + Sync {
    /// Train on a set of raw triples, building the internal vocabularies.
    fn fit(&mut self, triples: &[Triple]) -> Result<()>;

    /// Score a batch of index-form triples.
    ///
    /// Indices must come from this model's own vocabularies.
    fn score_indexed(&self, triples: &[IndexedTriple]) -> Result<Vec<f32>>;

    /// Entity vocabulary built during `fit`.
    fn entity_to_idx(&self) -> &Vocabulary;

    /// Relation vocabulary built during `fit`.
    fn relation_to_idx(&self) -> &Vocabulary;

    /// Whether `fit` has completed.
    fn is_fitted(&self) -> bool;

    /// Model name, e.g. `"TransE"`.
    fn name(&self) -> &'static str;

    /// Score raw triples by mapping them through the model vocabularies.
    ///
    /// Fails on identifiers unseen during `fit`.
    fn predict(&self, triples: &[Triple]) -> Result<Vec<f32>> {
        if !self.is_fitted() {
            return Err(Error::NotFitted);
        }
        let indexed = to_idx(triples, self.entity_to_idx(), self.relation_to_idx())?;
        self.score_indexed(&indexed)
    }
}
