//! End-to-end tests of the evaluation protocol and the search driver,
//! exercising real models on small synthetic graphs.

use rand::Rng;

use vektra_core::{create_mappings, to_idx, train_test_split_no_unseen, IndexedTriple, Triple};
use vektra_kge::models::TransE;
use vektra_kge::EmbeddingModel;
use vektra_kge::{
    evaluate_performance, flatten_nested_keys, generate_corruptions_for_eval, hits_at_n_score,
    mr_score, mrr_score, param_hash, reset_entity_threshold, select_best_model_ranking,
    set_entity_threshold, CorruptSide, EvalConfig, ParamGrid, ParamSpec, ParamValue, RankMetrics,
    SelectionConfig, TrainConfig, TripleFilter,
};

/// 12 nodes, 3 relations, 36 triples; every entity and relation occurs
/// often enough for coverage-preserving splits.
fn ring_graph() -> Vec<Triple> {
    let relations = ["linked_to", "follows", "cites"];
    let mut triples = Vec::new();
    for i in 0..12usize {
        for (j, relation) in relations.iter().enumerate() {
            let target = (i + j + 1) % 12;
            triples.push(Triple::new(
                format!("n{i}"),
                *relation,
                format!("n{target}"),
            ));
        }
    }
    triples
}

fn quick_config() -> TrainConfig {
    TrainConfig::default()
        .with_k(8)
        .with_epochs(5)
        .with_batches_count(2)
        .with_eta(2)
}

#[test]
fn eval_corruptions_match_mapping_scenario() {
    let triples = vec![
        Triple::new("a", "x", "b"),
        Triple::new("c", "x", "d"),
        Triple::new("e", "x", "f"),
        Triple::new("b", "y", "h"),
        Triple::new("a", "y", "l"),
    ];
    let (relations, entities) = create_mappings(&triples).unwrap();
    let indexed = to_idx(&triples, &entities, &relations).unwrap();

    assert_eq!(indexed[0], IndexedTriple::new(0, 0, 1));

    // Object corruption of [0,0,1] over all 8 entities: [0,0,0]..[0,0,7].
    let pool: Vec<usize> = (0..entities.len()).collect();
    let candidates =
        generate_corruptions_for_eval(indexed[0], &pool, None, CorruptSide::Object);
    let expected: Vec<IndexedTriple> = (0..8).map(|o| IndexedTriple::new(0, 0, o)).collect();
    assert_eq!(candidates, expected);

    // Both sides: 16 candidates, subject block first.
    let candidates = generate_corruptions_for_eval(indexed[0], &pool, None, CorruptSide::Both);
    assert_eq!(candidates.len(), 16);
    assert_eq!(candidates[0], IndexedTriple::new(0, 0, 1));
    assert_eq!(candidates[8], IndexedTriple::new(0, 0, 0));
}

#[test]
fn filtering_drops_exactly_the_known_triples() {
    let triple = IndexedTriple::new(0, 0, 1);
    let pool: Vec<usize> = (0..4).collect();
    let filter = TripleFilter::from_triples([
        IndexedTriple::new(1, 0, 1),
        IndexedTriple::new(2, 0, 1),
    ]);

    let candidates =
        generate_corruptions_for_eval(triple, &pool, Some(&filter), CorruptSide::Subject);

    // 4 pool entities minus 2 filtered; the true triple itself survives.
    assert_eq!(candidates.len(), 2);
    assert!(candidates.contains(&triple));
    assert!(candidates.contains(&IndexedTriple::new(3, 0, 1)));
}

#[test]
fn filtered_evaluation_end_to_end() {
    let x = ring_graph();
    let (train, test) = train_test_split_no_unseen(&x, 6usize, 0, false).unwrap();

    let mut model = TransE::new(quick_config());
    model.fit(&train).unwrap();

    let ranks =
        evaluate_performance(&test, &model, Some(&x), &EvalConfig::default()).unwrap();

    // Default protocol: one subject and one object rank per test triple.
    assert_eq!(ranks.len(), 2 * test.len());
    assert!(ranks.iter().all(|&r| (1..=12).contains(&r)));

    let metrics = RankMetrics::from_ranks(&ranks).unwrap();
    assert!(metrics.mrr > 0.0 && metrics.mrr <= 1.0);
    assert!(metrics.mr >= 1.0);
}

#[test]
fn separate_side_passes_equal_joint_default_protocol() {
    let x = ring_graph();
    let (train, test) = train_test_split_no_unseen(&x, 4usize, 1, false).unwrap();

    let mut model = TransE::new(quick_config());
    model.fit(&train).unwrap();

    let mut separate = Vec::new();
    for side in [CorruptSide::Subject, CorruptSide::Object] {
        let config = EvalConfig::default().with_corrupt_side(side);
        separate.extend(evaluate_performance(&test, &model, Some(&x), &config).unwrap());
    }

    let joint = evaluate_performance(&test, &model, Some(&x), &EvalConfig::default()).unwrap();

    let mut joint_sorted = joint.clone();
    let mut separate_sorted = separate.clone();
    joint_sorted.sort_unstable();
    separate_sorted.sort_unstable();
    assert_eq!(joint_sorted, separate_sorted);

    // Exact aggregate equality, as guaranteed by the protocol.
    assert_eq!(mr_score(&joint).unwrap(), mr_score(&separate).unwrap());
    assert!((mrr_score(&joint).unwrap() - mrr_score(&separate).unwrap()).abs() < 1e-12);
}

#[test]
fn restricted_entity_pool_bounds_ranks() {
    let x = ring_graph();

    let mut model = TransE::new(quick_config());
    model.fit(&x).unwrap();

    // Lowering the threshold only makes the evaluator warn; it must not
    // change any rank.
    set_entity_threshold(1);
    let subset: Vec<String> = (0..4).map(|i| format!("n{i}")).collect();
    let config = EvalConfig::default()
        .with_corrupt_side(CorruptSide::Object)
        .with_entities_subset(subset)
        .with_default_protocol(false);

    let ranks = evaluate_performance(&x[..6], &model, Some(&x), &config).unwrap();
    reset_entity_threshold();

    // 4 subset entities plus the reinserted true entity.
    assert!(ranks.iter().all(|&r| r <= 5));
}

#[test]
fn hits_at_n_is_monotone_on_real_ranks() {
    let x = ring_graph();
    let mut model = TransE::new(quick_config());
    model.fit(&x).unwrap();

    let ranks = evaluate_performance(&x, &model, None, &EvalConfig::default()).unwrap();

    let mut prev = 0.0;
    for n in [1, 3, 10, 12] {
        let h = hits_at_n_score(&ranks, n).unwrap();
        assert!(h >= prev);
        prev = h;
    }
}

fn selection_grid() -> ParamGrid {
    ParamGrid::new()
        .choices("batches_count", [2i64])
        .fixed("seed", 0i64)
        .choices("epochs", [2i64])
        .choices("k", [4i64, 16])
        .choices("eta", [2i64])
        .choices("loss", ["nll"])
        .nested("loss_params", ParamGrid::new())
        .nested("embedding_model_params", ParamGrid::new())
        .set("regularizer", ParamSpec::Choices(vec![ParamValue::Null]))
        .nested("regularizer_params", ParamGrid::new())
        .choices("optimizer", ["sgd"])
        .nested(
            "optimizer_params",
            ParamGrid::new().choices("lr", [1000.0, 0.0001]),
        )
        .choices("model_name", ["TransE"])
}

#[test]
fn select_best_model_ranking_grid_search() {
    let x = ring_graph();
    let (rest, test) = train_test_split_no_unseen(&x, 4usize, 0, false).unwrap();
    let (train, valid) = train_test_split_no_unseen(&rest, 4usize, 1, false).unwrap();

    let selection = select_best_model_ranking(
        TransE::from_params,
        &train,
        &valid,
        &test,
        &selection_grid(),
        &SelectionConfig::default(),
    )
    .unwrap();

    // 2 k-values x 2 learning rates, every assignment semantically unique.
    assert_eq!(selection.history.len(), 4);
    let hashes: std::collections::HashSet<String> = selection
        .history
        .iter()
        .map(|entry| param_hash(&entry.params))
        .collect();
    assert_eq!(hashes.len(), 4);

    let ks: std::collections::HashSet<i64> = selection
        .history
        .iter()
        .map(|entry| entry.params.require_i64("k").unwrap())
        .collect();
    assert_eq!(ks, [4i64, 16].into_iter().collect());

    assert!(selection.best_valid_mrr > 0.0 && selection.best_valid_mrr <= 1.0);
    assert!(selection
        .history
        .iter()
        .all(|entry| entry.valid_mrr <= selection.best_valid_mrr));

    let map = selection.test_metrics.as_map();
    let keys: Vec<&str> = map.keys().copied().collect();
    assert_eq!(keys, vec!["hits_1", "hits_10", "hits_3", "mr", "mrr"]);
    assert!(map.values().all(|v| v.is_finite() && *v >= 0.0));
    assert!(!selection.test_ranks.is_empty());
}

#[test]
fn select_best_model_ranking_random_search() {
    let x = ring_graph();
    let (rest, test) = train_test_split_no_unseen(&x, 4usize, 0, false).unwrap();
    let (train, valid) = train_test_split_no_unseen(&rest, 4usize, 1, false).unwrap();

    let (lo, hi) = (1.00001f64.ln(), 1.1f64.ln());
    let grid = selection_grid().sampler("lr_scale", move |rng| {
        ParamValue::Float(rng.gen_range(lo..hi))
    });

    let selection = select_best_model_ranking(
        TransE::from_params,
        &train,
        &valid,
        &test,
        &grid,
        &SelectionConfig::default().with_max_combinations(5).with_seed(3),
    )
    .unwrap();

    // The continuous leaf makes every draw unique.
    assert_eq!(selection.history.len(), 5);
    for entry in &selection.history {
        let lr_scale = entry.params.f64_or("lr_scale", f64::NAN).unwrap();
        assert!((lo..hi).contains(&lr_scale));
        assert!([4, 16].contains(&entry.params.require_i64("k").unwrap()));
    }

    let flat_sets: std::collections::HashSet<String> = selection
        .history
        .iter()
        .map(|entry| {
            flatten_nested_keys(&entry.params)
                .iter()
                .map(|(k, v)| format!("{k}={v:?}"))
                .collect::<Vec<_>>()
                .join(";")
        })
        .collect();
    assert_eq!(flat_sets.len(), 5);
}

#[test]
fn random_search_without_cap_is_rejected() {
    let x = ring_graph();
    let grid = selection_grid().sampler("lr_scale", |rng| {
        ParamValue::Float(rng.gen_range(0.0..1.0))
    });

    let result = select_best_model_ranking(
        TransE::from_params,
        &x,
        &x,
        &x,
        &grid,
        &SelectionConfig::default(),
    );
    assert!(result.is_err());
}
