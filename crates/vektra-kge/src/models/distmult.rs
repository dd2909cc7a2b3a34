//! DistMult: bilinear diagonal model (Yang et al. 2015).
//!
//! Scores with the trilinear dot product `<h, r, t>`. Symmetric by
//! construction — it cannot distinguish (h, r, t) from (t, r, h) — but a
//! strong baseline on many benchmarks.

use vektra_core::{IndexedTriple, Triple, Vocabulary};

use crate::model::EmbeddingModel;
use crate::params::HyperParams;
use crate::scoring::ScoringFn;
use crate::training::TrainConfig;
use crate::Result;

use super::common::{Geometry, ModelState};

struct DistMultGeometry;

impl Geometry for DistMultGeometry {
    const NAME: &'static str = "DistMult";
    const NORMALIZE_ENTITIES: bool = false;

    fn score(h: &[f32], r: &[f32], t: &[f32]) -> f32 {
        ScoringFn::DistMult.score(h, r, t)
    }

    fn gradients(h: &[f32], r: &[f32], t: &[f32], gh: &mut [f32], gr: &mut [f32], gt: &mut [f32]) {
        for i in 0..h.len() {
            gh[i] = r[i] * t[i];
            gr[i] = h[i] * t[i];
            gt[i] = h[i] * r[i];
        }
    }
}

/// Bilinear diagonal embedding model.
pub struct DistMult {
    state: ModelState,
}

impl DistMult {
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
}

impl EmbeddingModel for DistMult {
    fn fit(&mut self, triples: &[Triple]) -> Result<()> {
        self.state.fit::<DistMultGeometry>(triples)
    }

    fn score_indexed(&self, triples: &[IndexedTriple]) -> Result<Vec<f32>> {
        self.state.score_batch::<DistMultGeometry>(triples)
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
        DistMultGeometry::NAME
    }
}
