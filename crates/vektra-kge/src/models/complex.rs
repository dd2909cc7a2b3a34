//! ComplEx: complex-valued embeddings (Trouillon et al. 2016).
//!
//! Extends DistMult to complex space, scoring with `Re(<h, r, conj(t)>)`.
//! The conjugate breaks symmetry, so asymmetric relations become
//! representable. Embeddings store (re, im) pairs interleaved; `k` counts
//! real dimensions, so the complex rank is `k / 2`.

use vektra_core::{IndexedTriple, Triple, Vocabulary};

use crate::model::EmbeddingModel;
use crate::params::HyperParams;
use crate::scoring::ScoringFn;
use crate::training::TrainConfig;
use crate::{Error, Result};

use super::common::{Geometry, ModelState};

struct ComplExGeometry;

impl Geometry for ComplExGeometry {
    const NAME: &'static str = "ComplEx";
    const NORMALIZE_ENTITIES: bool = false;

    fn score(h: &[f32], r: &[f32], t: &[f32]) -> f32 {
        ScoringFn::ComplEx.score(h, r, t)
    }

    fn gradients(h: &[f32], r: &[f32], t: &[f32], gh: &mut [f32], gr: &mut [f32], gt: &mut [f32]) {
        let dim = h.len() / 2;
        for i in 0..dim {
            let (h_re, h_im) = (h[2 * i], h[2 * i + 1]);
            let (r_re, r_im) = (r[2 * i], r[2 * i + 1]);
            let (t_re, t_im) = (t[2 * i], t[2 * i + 1]);

            gh[2 * i] = r_re * t_re + r_im * t_im;
            gh[2 * i + 1] = r_re * t_im - r_im * t_re;
            gr[2 * i] = h_re * t_re + h_im * t_im;
            gr[2 * i + 1] = h_re * t_im - h_im * t_re;
            gt[2 * i] = h_re * r_re - h_im * r_im;
            gt[2 * i + 1] = h_re * r_im + h_im * r_re;
        }
    }
}

/// Complex-valued embedding model.
pub struct ComplEx {
    state: ModelState,
}

impl ComplEx {
    /// Create an unfitted model. Fails if `k` is odd — the (re, im) layout
    /// needs an even number of real dimensions.
    pub fn new(config: TrainConfig) -> Result<Self> {
        if config.k % 2 != 0 {
            return Err(Error::InvalidArgument(format!(
                "ComplEx needs an even embedding dimension, got k={}",
                config.k
            )));
        }
        Ok(Self {
            state: ModelState::new(config),
        })
    }

    /// Create from a resolved hyperparameter assignment.
    pub fn from_params(params: &HyperParams) -> Result<Self> {
        Self::new(TrainConfig::from_params(params)?)
    }
}

impl EmbeddingModel for ComplEx {
    fn fit(&mut self, triples: &[Triple]) -> Result<()> {
        self.state.fit::<ComplExGeometry>(triples)
    }

    fn score_indexed(&self, triples: &[IndexedTriple]) -> Result<Vec<f32>> {
        self.state.score_batch::<ComplExGeometry>(triples)
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
        ComplExGeometry::NAME
    }
}
