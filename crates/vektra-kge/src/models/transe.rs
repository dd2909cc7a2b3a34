//! TransE: relations as translations (Bordes et al. 2013).
//!
//! If (h, r, t) holds, then h + r ≈ t in embedding space, so the score is
//! the negative translation distance `-||h + r - t||₂`. Entity rows are
//! projected back onto the unit ball after each batch, the standard TransE
//! norm constraint.

use vektra_core::{IndexedTriple, Triple, Vocabulary};

use crate::model::EmbeddingModel;
use crate::params::HyperParams;
use crate::scoring::ScoringFn;
use crate::training::TrainConfig;
use crate::Result;

use super::common::{Geometry, ModelState};

struct TransEGeometry;

impl Geometry for TransEGeometry {
    const NAME: &'static str = "TransE";
    const NORMALIZE_ENTITIES: bool = true;

    fn score(h: &[f32], r: &[f32], t: &[f32]) -> f32 {
        ScoringFn::TransE.score(h, r, t)
    }

    fn gradients(h: &[f32], r: &[f32], t: &[f32], gh: &mut [f32], gr: &mut [f32], gt: &mut [f32]) {
        // score = -||d|| with d = h + r - t, so d(score)/dh = -d / ||d||.
        let mut norm = 0.0;
        for i in 0..h.len() {
            let d = h[i] + r[i] - t[i];
            norm += d * d;
        }
        let norm = norm.sqrt().max(1e-8);
        for i in 0..h.len() {
            let d = (h[i] + r[i] - t[i]) / norm;
            gh[i] = -d;
            gr[i] = -d;
            gt[i] = d;
        }
    }
}

/// Translation-based embedding model.
pub struct TransE {
    state: ModelState,
}

impl TransE {
    /// Create an unfitted model.
    pub fn new(config: TrainConfig) -> Self {
        Self {
            state: ModelState::new(config),
        }
    }

    /// Create from a resolved hyperparameter assignment.
    pub fn from_params(params: &HyperParams) -> Result<Self> {
        Ok(Self::new(TrainConfig::from_params(params)?))
    }

    /// Embedding of an entity seen during `fit`.
    pub fn entity_embedding(&self, entity: &str) -> Option<Vec<f32>> {
        self.state.entity_embedding(entity).map(|a| a.to_vec())
    }
}

impl EmbeddingModel for TransE {
    fn fit(&mut self, triples: &[Triple]) -> Result<()> {
        self.state.fit::<TransEGeometry>(triples)
    }

    fn score_indexed(&self, triples: &[IndexedTriple]) -> Result<Vec<f32>> {
        self.state.score_batch::<TransEGeometry>(triples)
    }

    fn entity_to_idx(&self) -> &Vocabulary {
        &self.state.ent_to_idx
    }

    fn relation_to_idx(&self) -> &Vocabulary {
        &self.state.rel_to_idx
    }

    fn is_fitted(&self) -> bool {
        self.state.fitted
    }

    fn name(&self) -> &'static str {
        TransEGeometry::NAME
    }
}
