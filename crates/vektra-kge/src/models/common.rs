//! Shared embedding-table state and SGD loop for the reference models.
//!
//! Each model contributes a [`Geometry`]: a scoring function plus its
//! analytic gradient. Everything else — vocabulary construction, embedding
//! init, minibatching, negative sampling, the loss — is identical across
//! models and lives here.

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use vektra_core::{create_mappings, to_idx, IndexedTriple, Triple, Vocabulary};

use crate::corruption::generate_corruptions_for_fit;
use crate::training::{LossKind, TrainConfig};
use crate::{Error, Result};

/// Scoring geometry and gradients of one model family.
pub(crate) trait Geometry {
    const NAME: &'static str;

    /// Project entity rows back onto the unit ball after each batch.
    const NORMALIZE_ENTITIES: bool;

    /// Plausibility score for one triple's embedding rows.
    fn score(h: &[f32], r: &[f32], t: &[f32]) -> f32;

    /// Write `d(score)/d{h,r,t}` into the gradient buffers.
    fn gradients(h: &[f32], r: &[f32], t: &[f32], gh: &mut [f32], gr: &mut [f32], gt: &mut [f32]);
}

/// Embedding tables, vocabularies and the training loop.
pub(crate) struct ModelState {
    pub(crate) config: TrainConfig,
    pub(crate) ent_to_idx: Vocabulary,
    pub(crate) rel_to_idx: Vocabulary,
    pub(crate) ent_emb: Array2<f32>,
    pub(crate) rel_emb: Array2<f32>,
    pub(crate) fitted: bool,
}

impl ModelState {
    pub(crate) fn new(config: TrainConfig) -> Self {
        Self {
            config,
            ent_to_idx: Vocabulary::default(),
            rel_to_idx: Vocabulary::default(),
            ent_emb: Array2::zeros((0, 0)),
            rel_emb: Array2::zeros((0, 0)),
            fitted: false,
        }
    }

    /// Uniform init in [-0.5, 0.5] with unit-normalized rows.
    fn init_table(rows: usize, dim: usize, rng: &mut ChaCha8Rng) -> Array2<f32> {
        let mut table = Array2::zeros((rows, dim));
        for mut row in table.rows_mut() {
            for v in row.iter_mut() {
                *v = rng.gen::<f32>() - 0.5;
            }
            let norm = row.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 1e-8 {
                row.mapv_inplace(|x| x / norm);
            }
        }
        table
    }

    pub(crate) fn fit<G: Geometry>(&mut self, triples: &[Triple]) -> Result<()> {
        let (relations, entities) = create_mappings(triples)?;
        let indexed = to_idx(triples, &entities, &relations)?;

        let k = self.config.k;
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        self.ent_emb = Self::init_table(entities.len(), k, &mut rng);
        self.rel_emb = Self::init_table(relations.len(), k, &mut rng);

        let pool: Vec<usize> = (0..entities.len()).collect();
        let eta = self.config.eta;
        let batch_size = indexed
            .len()
            .div_ceil(self.config.batches_count.max(1))
            .max(1);

        for epoch in 0..self.config.epochs {
            let mut epoch_loss = 0.0;
            for batch in indexed.chunks(batch_size) {
                let negatives = generate_corruptions_for_fit(
                    batch,
                    eta,
                    &self.config.corrupt_sides,
                    &pool,
                    &mut rng,
                )?;

                for (i, positive) in batch.iter().enumerate() {
                    for negative in &negatives[i * eta..(i + 1) * eta] {
                        epoch_loss += self.sgd_step::<G>(positive, negative);
                    }
                }

                if G::NORMALIZE_ENTITIES {
                    for mut row in self.ent_emb.rows_mut() {
                        let norm = row.iter().map(|x| x * x).sum::<f32>().sqrt();
                        if norm > 1.0 {
                            row.mapv_inplace(|x| x / norm);
                        }
                    }
                }
            }

            debug!(
                model = G::NAME,
                epoch,
                loss = epoch_loss / (indexed.len() * eta) as f32,
                "epoch complete"
            );
        }

        self.ent_to_idx = entities;
        self.rel_to_idx = relations;
        self.fitted = true;
        Ok(())
    }

    /// One positive/negative update; returns the pair loss.
    fn sgd_step<G: Geometry>(&mut self, positive: &IndexedTriple, negative: &IndexedTriple) -> f32 {
        let lr = self.config.lr;
        let s_pos = self.raw_score::<G>(positive);
        let s_neg = self.raw_score::<G>(negative);

        // Each triple update ascends scaled by `coeff`: positives get a
        // positive coefficient, negatives a negative one.
        let (c_pos, c_neg, loss) = match self.config.loss {
            LossKind::Pairwise { margin } => {
                let loss = margin + s_neg - s_pos;
                if loss <= 0.0 {
                    return 0.0;
                }
                (lr, -lr, loss)
            }
            LossKind::Nll => {
                let sigmoid = |x: f32| 1.0 / (1.0 + (-x).exp());
                let softplus = |x: f32| {
                    if x > 20.0 {
                        x
                    } else {
                        x.exp().ln_1p()
                    }
                };
                (
                    lr * sigmoid(-s_pos),
                    -lr * sigmoid(s_neg),
                    softplus(-s_pos) + softplus(s_neg),
                )
            }
        };

        self.apply_update::<G>(positive, c_pos);
        self.apply_update::<G>(negative, c_neg);
        loss
    }

    /// Add `coeff * d(score)/d(embeddings)` for one triple.
    fn apply_update<G: Geometry>(&mut self, triple: &IndexedTriple, coeff: f32) {
        let k = self.config.k;
        let h = self.ent_emb.row(triple.subject).to_vec();
        let r = self.rel_emb.row(triple.predicate).to_vec();
        let t = self.ent_emb.row(triple.object).to_vec();

        let mut gh = vec![0.0; k];
        let mut gr = vec![0.0; k];
        let mut gt = vec![0.0; k];
        G::gradients(&h, &r, &t, &mut gh, &mut gr, &mut gt);

        // Sequential adds keep self-loops (subject == object) correct.
        let mut row = self.ent_emb.row_mut(triple.subject);
        for (v, g) in row.iter_mut().zip(&gh) {
            *v += coeff * g;
        }
        let mut row = self.rel_emb.row_mut(triple.predicate);
        for (v, g) in row.iter_mut().zip(&gr) {
            *v += coeff * g;
        }
        let mut row = self.ent_emb.row_mut(triple.object);
        for (v, g) in row.iter_mut().zip(&gt) {
            *v += coeff * g;
        }
    }

    fn raw_score<G: Geometry>(&self, triple: &IndexedTriple) -> f32 {
        G::score(
            self.ent_emb.row(triple.subject).as_slice().unwrap_or(&[]),
            self.rel_emb.row(triple.predicate).as_slice().unwrap_or(&[]),
            self.ent_emb.row(triple.object).as_slice().unwrap_or(&[]),
        )
    }

    pub(crate) fn score_batch<G: Geometry>(
        &self,
        triples: &[IndexedTriple],
    ) -> Result<Vec<f32>> {
        if !self.fitted {
            return Err(Error::NotFitted);
        }
        let n_ent = self.ent_emb.nrows();
        let n_rel = self.rel_emb.nrows();
        triples
            .iter()
            .map(|t| {
                if t.subject >= n_ent || t.object >= n_ent || t.predicate >= n_rel {
                    return Err(Error::InvalidArgument(format!(
                        "triple {t} is out of range for this model's vocabularies"
                    )));
                }
                Ok(self.raw_score::<G>(t))
            })
            .collect()
    }

    /// Embedding row for an entity, for inspection and tests.
    pub(crate) fn entity_embedding(&self, entity: &str) -> Option<Array1<f32>> {
        let idx = self.ent_to_idx.index_of(entity)?;
        Some(self.ent_emb.row(idx).to_owned())
    }
}
