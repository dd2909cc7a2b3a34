//! Model selection: train and evaluate across a hyperparameter space.
//!
//! [`select_best_model_ranking`] drives the full search loop: expand the
//! grid (exhaustively, or by seeded random draws when the space is
//! continuous or capped), skip semantically duplicate assignments via
//! [`ParamHistory`], train one candidate at a time, score it on the
//! validation split by filtered MRR, and finally report full test metrics
//! for the winner. Candidates run strictly sequentially — one model is
//! fully trained and evaluated before the next starts.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use vektra_core::Triple;

use crate::corruption::CorruptSide;
use crate::evaluation::{evaluate_performance, EvalConfig};
use crate::metrics::{mrr_score, RankMetrics};
use crate::model::EmbeddingModel;
use crate::params::{grid_iter, random_iter, HyperParams, ParamGrid, ParamHistory};
use crate::{Error, Result};

/// Search-loop settings.
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// Cap on candidates drawn. Required when the grid has sampler leaves;
    /// with `None` an enumerable grid is swept exhaustively.
    pub max_combinations: Option<usize>,
    /// Seed for random search draws.
    pub seed: u64,
    /// Corruption side used for validation and test evaluation.
    pub corrupt_side: CorruptSide,
    /// Evaluate filtered (candidates that are known true triples removed).
    pub filtered: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_combinations: None,
            seed: 0,
            corrupt_side: CorruptSide::Both,
            filtered: true,
        }
    }
}

impl SelectionConfig {
    pub fn with_max_combinations(mut self, max: usize) -> Self {
        self.max_combinations = Some(max);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_corrupt_side(mut self, side: CorruptSide) -> Self {
        self.corrupt_side = side;
        self
    }

    pub fn with_filtered(mut self, filtered: bool) -> Self {
        self.filtered = filtered;
        self
    }
}

/// One evaluated candidate.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// The resolved assignment this candidate was built from.
    pub params: HyperParams,
    /// Filtered validation MRR it reached.
    pub valid_mrr: f64,
}

/// Outcome of a model-selection run.
pub struct Selection<M> {
    /// The model that reached the best validation MRR.
    pub best_model: M,
    /// Its hyperparameter assignment.
    pub best_params: HyperParams,
    /// Its validation MRR.
    pub best_valid_mrr: f64,
    /// Test ranks of the best model.
    pub test_ranks: Vec<usize>,
    /// Full test metrics of the best model.
    pub test_metrics: RankMetrics,
    /// Every evaluated candidate, in evaluation order; entries are
    /// semantically unique by parameter hash.
    pub history: Vec<HistoryEntry>,
}

/// Search `grid` for the model with the best filtered validation MRR, then
/// report held-out test metrics for it.
///
/// `factory` builds an unfitted model from a resolved assignment — pass
/// e.g. `TransE::from_params`. Grids without sampler leaves and without a
/// `max_combinations` cap are enumerated exhaustively; otherwise candidates
/// are drawn at random (seeded) up to the cap. A candidate whose parameter
/// hash is already in the history is skipped, so two assignments differing
/// only in inactive sub-parameters train once. Candidates that fail to
/// train or evaluate are logged and skipped; the run fails only if no
/// candidate completes. Ties on validation MRR keep the earliest candidate.
pub fn select_best_model_ranking<M, F>(
    factory: F,
    x_train: &[Triple],
    x_valid: &[Triple],
    x_test: &[Triple],
    grid: &ParamGrid,
    config: &SelectionConfig,
) -> Result<Selection<M>>
where
    M: EmbeddingModel,
    F: Fn(&HyperParams) -> Result<M>,
{
    let candidates: Box<dyn Iterator<Item = HyperParams>> =
        if grid.is_enumerable() && config.max_combinations.is_none() {
            Box::new(grid_iter(grid)?)
        } else {
            let max = config.max_combinations.ok_or(Error::NonEnumerableGrid)?;
            let rng = ChaCha8Rng::seed_from_u64(config.seed);
            Box::new(random_iter(grid, rng)?.take(max))
        };

    let eval_config = EvalConfig::default().with_corrupt_side(config.corrupt_side);

    let valid_filter: Option<Vec<Triple>> = config
        .filtered
        .then(|| [x_train, x_valid].concat());

    let mut seen = ParamHistory::new();
    let mut history = Vec::new();
    let mut best: Option<(M, HyperParams, f64)> = None;

    for params in candidates {
        if seen.contains(&params) {
            continue;
        }
        seen.add(&params);

        let mut model = match factory(&params) {
            Ok(model) => model,
            Err(err) => {
                warn!(%params, %err, "skipping candidate: model construction failed");
                continue;
            }
        };
        if let Err(err) = model.fit(x_train) {
            warn!(%params, %err, "skipping candidate: training failed");
            continue;
        }

        let ranks = match evaluate_performance(
            x_valid,
            &model,
            valid_filter.as_deref(),
            &eval_config,
        ) {
            Ok(ranks) => ranks,
            Err(err) => {
                warn!(%params, %err, "skipping candidate: validation failed");
                continue;
            }
        };
        let valid_mrr = mrr_score(&ranks)?;

        debug!(%params, valid_mrr, "candidate evaluated");
        history.push(HistoryEntry {
            params: params.clone(),
            valid_mrr,
        });

        let improved = best
            .as_ref()
            .map_or(true, |(_, _, best_mrr)| valid_mrr > *best_mrr);
        if improved {
            best = Some((model, params, valid_mrr));
        }
    }

    let (best_model, best_params, best_valid_mrr) = best.ok_or(Error::NoCandidates)?;

    let test_filter: Option<Vec<Triple>> = config
        .filtered
        .then(|| [x_train, x_valid, x_test].concat());
    let test_ranks =
        evaluate_performance(x_test, &best_model, test_filter.as_deref(), &eval_config)?;
    let test_metrics = RankMetrics::from_ranks(&test_ranks)?;

    Ok(Selection {
        best_model,
        best_params,
        best_valid_mrr,
        test_ranks,
        test_metrics,
        history,
    })
}
