//! Hyperparameter grids: declaration, expansion, hashing and history.
//!
//! A [`ParamGrid`] declares the search space. Each leaf is a tagged
//! variant — a fixed value, a finite list of choices, a sampler closure
//! for continuous ranges, or a nested sub-grid one level deep (e.g.
//! `optimizer_params.lr`). Expansion dispatches on the tag:
//!
//! - [`grid_iter`] lazily enumerates the full Cartesian product of all
//!   choice leaves (finite, restartable per call);
//! - [`random_iter`] lazily draws random resolutions forever (choice
//!   leaves sampled uniformly with replacement, samplers invoked fresh
//!   per draw), deterministic only through its seed.
//!
//! Resolved assignments ([`HyperParams`]) support a stable content hash
//! that ignores sub-parameters irrelevant to the selected loss, optimizer,
//! regularizer or model, so that two assignments differing only in ignored
//! fields deduplicate to one — the [`ParamHistory`] set keys on that hash.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::{Error, Result};

// ============================================================================
// Values and grid declaration
// ============================================================================

/// A single scalar hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Absent/disabled (e.g. `regularizer: None`).
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// Canonical byte encoding used for content hashing. Floats encode via
    /// their bit pattern so equal values always encode equally.
    fn canonical(&self) -> String {
        match self {
            Self::Null => "n".to_string(),
            Self::Bool(b) => format!("b:{b}"),
            Self::Int(i) => format!("i:{i}"),
            Self::Float(f) => format!("f:{:016x}", f.to_bits()),
            Self::Str(s) => format!("s:{s}"),
        }
    }

    /// The value as f64, accepting integer leaves.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The value as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The value as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether this is the null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<usize> for ParamValue {
    fn from(i: usize) -> Self {
        Self::Int(i as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// Closure producing a fresh value per draw, for continuous ranges.
pub type SamplerFn = Arc<dyn Fn(&mut ChaCha8Rng) -> ParamValue + Send + Sync>;

/// One leaf of a hyperparameter grid.
#[derive(Clone)]
pub enum ParamSpec {
    /// A single fixed value.
    Fixed(ParamValue),
    /// Finite candidate list.
    Choices(Vec<ParamValue>),
    /// Value-generating closure, invoked fresh on every draw.
    Sampler(SamplerFn),
    /// Nested sub-grid (one level, e.g. `optimizer_params`).
    Nested(ParamGrid),
}

impl fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(v) => f.debug_tuple("Fixed").field(v).finish(),
            Self::Choices(v) => f.debug_tuple("Choices").field(v).finish(),
            Self::Sampler(_) => f.write_str("Sampler(<fn>)"),
            Self::Nested(g) => f.debug_tuple("Nested").field(g).finish(),
        }
    }
}

/// Declaration of a hyperparameter search space.
#[derive(Debug, Clone, Default)]
pub struct ParamGrid {
    entries: BTreeMap<String, ParamSpec>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a leaf spec.
    pub fn set(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.entries.insert(name.into(), spec);
        self
    }

    /// Fixed-value leaf.
    pub fn fixed(self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(name, ParamSpec::Fixed(value.into()))
    }

    /// Finite-choice leaf.
    pub fn choices<V: Into<ParamValue>>(
        self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.set(
            name,
            ParamSpec::Choices(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Sampler leaf for continuous ranges.
    pub fn sampler(
        self,
        name: impl Into<String>,
        f: impl Fn(&mut ChaCha8Rng) -> ParamValue + Send + Sync + 'static,
    ) -> Self {
        self.set(name, ParamSpec::Sampler(Arc::new(f)))
    }

    /// Nested sub-grid leaf.
    pub fn nested(self, name: impl Into<String>, grid: ParamGrid) -> Self {
        self.set(name, ParamSpec::Nested(grid))
    }

    /// Whether the grid can be exhaustively enumerated (no sampler leaves).
    pub fn is_enumerable(&self) -> bool {
        self.entries.values().all(|spec| match spec {
            ParamSpec::Sampler(_) => false,
            ParamSpec::Nested(g) => g.is_enumerable(),
            _ => true,
        })
    }

    /// Normalize every fixed leaf into a single-element choice list, so
    /// expansion treats all finite leaves uniformly. Samplers are left
    /// untouched; nested grids are normalized recursively.
    pub fn scalars_into_lists(&mut self) {
        for spec in self.entries.values_mut() {
            match spec {
                ParamSpec::Fixed(v) => *spec = ParamSpec::Choices(vec![v.clone()]),
                ParamSpec::Nested(g) => g.scalars_into_lists(),
                _ => {}
            }
        }
    }

    fn validate_for_sampling(&self, nested: bool) -> Result<()> {
        for (name, spec) in &self.entries {
            match spec {
                ParamSpec::Choices(values) if values.is_empty() => {
                    return Err(Error::InvalidParam(name.clone()));
                }
                ParamSpec::Nested(_) if nested => {
                    return Err(Error::InvalidArgument(format!(
                        "sub-grid `{name}` nests deeper than one level"
                    )));
                }
                ParamSpec::Nested(g) => g.validate_for_sampling(true)?,
                _ => {}
            }
        }
        Ok(())
    }
}

// ============================================================================
// Resolved assignments
// ============================================================================

/// One resolved entry: a scalar, or a one-level map of scalars.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamLeaf {
    Value(ParamValue),
    Nested(BTreeMap<String, ParamValue>),
}

/// A fully resolved hyperparameter assignment.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HyperParams {
    #[serde(flatten)]
    entries: BTreeMap<String, ParamLeaf>,
}

impl HyperParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a top-level scalar.
    pub fn set_value(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries
            .insert(name.into(), ParamLeaf::Value(value.into()));
    }

    /// Set a scalar inside a nested sub-map, creating the map if needed.
    pub fn set_nested(
        &mut self,
        outer: impl Into<String>,
        inner: impl Into<String>,
        value: impl Into<ParamValue>,
    ) {
        let outer = outer.into();
        let entry = self
            .entries
            .entry(outer)
            .or_insert_with(|| ParamLeaf::Nested(BTreeMap::new()));
        match entry {
            ParamLeaf::Nested(map) => {
                map.insert(inner.into(), value.into());
            }
            ParamLeaf::Value(_) => {
                *entry = ParamLeaf::Nested(BTreeMap::from([(inner.into(), value.into())]));
            }
        }
    }

    /// Ensure an (empty) nested sub-map exists.
    pub fn set_empty_nested(&mut self, outer: impl Into<String>) {
        self.entries
            .entry(outer.into())
            .or_insert_with(|| ParamLeaf::Nested(BTreeMap::new()));
    }

    /// Top-level scalar, if present.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        match self.entries.get(name) {
            Some(ParamLeaf::Value(v)) => Some(v),
            _ => None,
        }
    }

    /// Nested scalar, if present.
    pub fn get_nested(&self, outer: &str, inner: &str) -> Option<&ParamValue> {
        match self.entries.get(outer) {
            Some(ParamLeaf::Nested(map)) => map.get(inner),
            _ => None,
        }
    }

    /// Nested sub-map, if present.
    pub fn nested_map(&self, outer: &str) -> Option<&BTreeMap<String, ParamValue>> {
        match self.entries.get(outer) {
            Some(ParamLeaf::Nested(map)) => Some(map),
            _ => None,
        }
    }

    /// All entries, in name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ParamLeaf)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Typed accessor: required integer.
    pub fn require_i64(&self, name: &str) -> Result<i64> {
        self.get(name)
            .and_then(ParamValue::as_i64)
            .ok_or_else(|| Error::InvalidParam(name.to_string()))
    }

    /// Typed accessor: integer with default.
    pub fn i64_or(&self, name: &str, default: i64) -> Result<i64> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_i64()
                .ok_or_else(|| Error::InvalidParam(name.to_string())),
        }
    }

    /// Typed accessor: usize with default.
    pub fn usize_or(&self, name: &str, default: usize) -> Result<usize> {
        let v = self.i64_or(name, default as i64)?;
        usize::try_from(v).map_err(|_| Error::InvalidParam(name.to_string()))
    }

    /// Typed accessor: float (accepting integers) with default.
    pub fn f64_or(&self, name: &str, default: f64) -> Result<f64> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_f64()
                .ok_or_else(|| Error::InvalidParam(name.to_string())),
        }
    }

    /// Typed accessor: string with default.
    pub fn str_or<'a>(&'a self, name: &str, default: &'a str) -> Result<&'a str> {
        match self.get(name) {
            None => Ok(default),
            Some(ParamValue::Str(s)) => Ok(s),
            Some(_) => Err(Error::InvalidParam(name.to_string())),
        }
    }

    /// Typed accessor: nested float with default.
    pub fn nested_f64_or(&self, outer: &str, inner: &str, default: f64) -> Result<f64> {
        match self.get_nested(outer, inner) {
            None => Ok(default),
            Some(v) => v
                .as_f64()
                .ok_or_else(|| Error::InvalidParam(format!("{outer}.{inner}"))),
        }
    }

    /// JSON rendering, mainly for logs and reports.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl fmt::Display for HyperParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

// ============================================================================
// Flatten / unflatten
// ============================================================================

/// Key of a flattened parameter: a top-level name or an `(outer, inner)`
/// path into a nested sub-map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FlatKey {
    Name(String),
    Path(String, String),
}

impl fmt::Display for FlatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(n) => write!(f, "{n}"),
            Self::Path(o, i) => write!(f, "{o}.{i}"),
        }
    }
}

/// Flatten a resolved assignment into path-keyed scalars.
///
/// Empty nested sub-maps carry no information and disappear; for
/// assignments without empty sub-maps, [`unflatten_nested_keys`] restores
/// the input exactly.
pub fn flatten_nested_keys(params: &HyperParams) -> BTreeMap<FlatKey, ParamValue> {
    let mut flat = BTreeMap::new();
    for (name, leaf) in params.entries() {
        match leaf {
            ParamLeaf::Value(v) => {
                flat.insert(FlatKey::Name(name.to_string()), v.clone());
            }
            ParamLeaf::Nested(map) => {
                for (inner, v) in map {
                    flat.insert(
                        FlatKey::Path(name.to_string(), inner.clone()),
                        v.clone(),
                    );
                }
            }
        }
    }
    flat
}

/// Rebuild a nested assignment from path-keyed scalars.
pub fn unflatten_nested_keys(flat: &BTreeMap<FlatKey, ParamValue>) -> HyperParams {
    let mut params = HyperParams::new();
    for (key, value) in flat {
        match key {
            FlatKey::Name(name) => params.set_value(name.clone(), value.clone()),
            FlatKey::Path(outer, inner) => {
                params.set_nested(outer.clone(), inner.clone(), value.clone());
            }
        }
    }
    params
}

// ============================================================================
// Unused-parameter pruning and hashing
// ============================================================================

/// Inner keys consumed by each loss.
fn loss_param_keys(loss: &str) -> Option<&'static [&'static str]> {
    match loss {
        "pairwise" | "absolute_margin" => Some(&["margin"]),
        "self_adversarial" => Some(&["margin", "alpha"]),
        "nll" | "multiclass_nll" => Some(&[]),
        _ => None,
    }
}

/// Inner keys consumed by each regularizer; `Null` means no regularizer.
fn regularizer_param_keys(regularizer: &ParamValue) -> Option<&'static [&'static str]> {
    match regularizer {
        ParamValue::Null => Some(&[]),
        ParamValue::Str(s) if s == "LP" => Some(&["p", "lambda"]),
        _ => None,
    }
}

/// Inner keys consumed by each optimizer.
fn optimizer_param_keys(optimizer: &str) -> Option<&'static [&'static str]> {
    match optimizer {
        "sgd" | "adam" | "adagrad" => Some(&["lr"]),
        "momentum" => Some(&["lr", "momentum"]),
        _ => None,
    }
}

/// Model-specific inner keys of `embedding_model_params`.
fn model_param_keys(model_name: &str) -> Option<&'static [&'static str]> {
    match model_name {
        "TransE" => Some(&["norm", "normalize_ent_emb"]),
        "DistMult" => Some(&["normalize_ent_emb"]),
        "ComplEx" => Some(&[]),
        _ => None,
    }
}

fn retain_keys(
    params: &mut HyperParams,
    sub_map: &str,
    keys: Option<&'static [&'static str]>,
) {
    // Unknown selector: keep the sub-map untouched.
    let Some(keys) = keys else { return };
    if let Some(ParamLeaf::Nested(map)) = params.entries.get_mut(sub_map) {
        map.retain(|k, _| keys.contains(&k.as_str()));
    }
}

/// Clear sub-parameters irrelevant to the selected loss, regularizer,
/// optimizer and model, so two assignments differing only in ignored
/// fields become identical.
///
/// Unknown selector values leave their sub-map untouched.
pub fn remove_unused_params(params: &HyperParams) -> HyperParams {
    let mut pruned = params.clone();

    let loss = params.get("loss").and_then(ParamValue::as_str);
    retain_keys(&mut pruned, "loss_params", loss.and_then(loss_param_keys));

    let regularizer = params.get("regularizer");
    retain_keys(
        &mut pruned,
        "regularizer_params",
        regularizer.and_then(regularizer_param_keys),
    );

    let optimizer = params.get("optimizer").and_then(ParamValue::as_str);
    retain_keys(
        &mut pruned,
        "optimizer_params",
        optimizer.and_then(optimizer_param_keys),
    );

    let model_name = params.get("model_name").and_then(ParamValue::as_str);
    retain_keys(
        &mut pruned,
        "embedding_model_params",
        model_name.and_then(model_param_keys),
    );

    pruned
}

/// Stable content hash over the pruned, flattened assignment.
///
/// Equal for assignments that differ only in removed fields; stable across
/// process runs for identical semantic content.
pub fn param_hash(params: &HyperParams) -> String {
    let flat = flatten_nested_keys(&remove_unused_params(params));
    let mut hasher = Sha256::new();
    for (key, value) in &flat {
        hasher.update(key.to_string().as_bytes());
        hasher.update([0x1f]);
        hasher.update(value.canonical().as_bytes());
        hasher.update([0x1e]);
    }
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Set of already-seen parameter assignments, keyed by [`param_hash`].
#[derive(Debug, Default)]
pub struct ParamHistory {
    seen: HashSet<String>,
}

impl ParamHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a semantically equal assignment was already recorded.
    pub fn contains(&self, params: &HyperParams) -> bool {
        self.seen.contains(&param_hash(params))
    }

    /// Record an assignment.
    pub fn add(&mut self, params: &HyperParams) {
        self.seen.insert(param_hash(params));
    }

    /// Number of distinct assignments recorded.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

// ============================================================================
// Expansion: exhaustive and random
// ============================================================================

/// One axis of the expanded grid.
struct Axis {
    key: FlatKey,
    values: Vec<ParamValue>,
}

/// Flatten an enumerable grid into ordered axes, plus the names of empty
/// nested sub-maps (preserved in each yielded assignment).
fn collect_axes(grid: &ParamGrid) -> (Vec<Axis>, Vec<String>) {
    let mut axes = Vec::new();
    let mut empty_nested = Vec::new();
    for (name, spec) in &grid.entries {
        match spec {
            ParamSpec::Choices(values) => axes.push(Axis {
                key: FlatKey::Name(name.clone()),
                values: values.clone(),
            }),
            ParamSpec::Fixed(v) => axes.push(Axis {
                key: FlatKey::Name(name.clone()),
                values: vec![v.clone()],
            }),
            ParamSpec::Nested(sub) => {
                let mut any = false;
                for (inner, inner_spec) in &sub.entries {
                    let values = match inner_spec {
                        ParamSpec::Choices(values) => values.clone(),
                        ParamSpec::Fixed(v) => vec![v.clone()],
                        // unreachable for enumerable grids
                        _ => continue,
                    };
                    axes.push(Axis {
                        key: FlatKey::Path(name.clone(), inner.clone()),
                        values,
                    });
                    any = true;
                }
                if !any {
                    empty_nested.push(name.clone());
                }
            }
            ParamSpec::Sampler(_) => {}
        }
    }
    (axes, empty_nested)
}

/// Lazy Cartesian product over all choice leaves of an enumerable grid.
///
/// Yields every combination exactly once, as fully resolved nested
/// assignments. Fails if the grid contains sampler leaves.
pub fn grid_iter(grid: &ParamGrid) -> Result<GridIter> {
    if !grid.is_enumerable() {
        return Err(Error::NonEnumerableGrid);
    }
    grid.validate_for_sampling(false)?;
    let (axes, empty_nested) = collect_axes(grid);
    let positions = vec![0usize; axes.len()];
    Ok(GridIter {
        axes,
        empty_nested,
        positions,
        done: false,
    })
}

/// Iterator returned by [`grid_iter`].
pub struct GridIter {
    axes: Vec<Axis>,
    empty_nested: Vec<String>,
    positions: Vec<usize>,
    done: bool,
}

impl GridIter {
    fn assemble(&self) -> HyperParams {
        let mut params = HyperParams::new();
        for name in &self.empty_nested {
            params.set_empty_nested(name.clone());
        }
        for (axis, &pos) in self.axes.iter().zip(&self.positions) {
            let value = axis.values[pos].clone();
            match &axis.key {
                FlatKey::Name(name) => params.set_value(name.clone(), value),
                FlatKey::Path(outer, inner) => {
                    params.set_nested(outer.clone(), inner.clone(), value);
                }
            }
        }
        params
    }

    fn advance(&mut self) {
        // Odometer over axis positions, last axis fastest.
        for i in (0..self.axes.len()).rev() {
            self.positions[i] += 1;
            if self.positions[i] < self.axes[i].values.len() {
                return;
            }
            self.positions[i] = 0;
        }
        self.done = true;
    }
}

impl Iterator for GridIter {
    type Item = HyperParams;

    fn next(&mut self) -> Option<HyperParams> {
        if self.done {
            return None;
        }
        let params = self.assemble();
        if self.axes.is_empty() {
            self.done = true;
        } else {
            self.advance();
        }
        Some(params)
    }
}

/// Draw one random resolution of the grid: choice leaves sampled uniformly
/// with replacement, sampler leaves invoked fresh.
pub fn sample_parameters(grid: &ParamGrid, rng: &mut ChaCha8Rng) -> Result<HyperParams> {
    grid.validate_for_sampling(false)?;
    Ok(sample_validated(grid, rng))
}

fn sample_value(spec: &ParamSpec, rng: &mut ChaCha8Rng) -> ParamValue {
    match spec {
        ParamSpec::Fixed(v) => v.clone(),
        ParamSpec::Choices(values) => values[rng.gen_range(0..values.len())].clone(),
        ParamSpec::Sampler(f) => f(rng),
        ParamSpec::Nested(_) => unreachable!("nested specs handled by caller"),
    }
}

fn sample_validated(grid: &ParamGrid, rng: &mut ChaCha8Rng) -> HyperParams {
    let mut params = HyperParams::new();
    for (name, spec) in &grid.entries {
        match spec {
            ParamSpec::Nested(sub) => {
                params.set_empty_nested(name.clone());
                for (inner, inner_spec) in &sub.entries {
                    params.set_nested(name.clone(), inner.clone(), sample_value(inner_spec, rng));
                }
            }
            _ => params.set_value(name.clone(), sample_value(spec, rng)),
        }
    }
    params
}

/// Infinite stream of random grid resolutions.
///
/// Not restartable: each `next` continues the underlying draw stream, so
/// determinism comes only from the seed baked into `rng`.
pub fn random_iter(grid: &ParamGrid, rng: ChaCha8Rng) -> Result<RandomIter> {
    grid.validate_for_sampling(false)?;
    Ok(RandomIter {
        grid: grid.clone(),
        rng,
    })
}

/// Iterator returned by [`random_iter`].
pub struct RandomIter {
    grid: ParamGrid,
    rng: ChaCha8Rng,
}

impl Iterator for RandomIter {
    type Item = HyperParams;

    fn next(&mut self) -> Option<HyperParams> {
        Some(sample_validated(&self.grid, &mut self.rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    /// The reference assignment used across pruning/hash tests.
    fn reference_params() -> HyperParams {
        let mut p = HyperParams::new();
        p.set_value("batches_count", 50i64);
        p.set_value("epochs", 4000i64);
        p.set_value("k", 200i64);
        p.set_value("eta", 15i64);
        p.set_value("loss", "nll");
        p.set_nested("loss_params", "margin", 2i64);
        p.set_empty_nested("embedding_model_params");
        p.set_value("regularizer", "LP");
        p.set_nested("regularizer_params", "p", 1i64);
        p.set_nested("regularizer_params", "lambda", 1e-5);
        p.set_value("optimizer", "adam");
        p.set_nested("optimizer_params", "lr", 0.001);
        p.set_value("verbose", false);
        p.set_value("model_name", "ComplEx");
        p
    }

    fn search_grid() -> ParamGrid {
        ParamGrid::new()
            .choices("batches_count", [50i64])
            .choices("epochs", [4000i64])
            .choices("k", [100i64, 200])
            .choices("eta", [5i64, 10, 15])
            .choices("loss", ["pairwise", "nll"])
            .nested("loss_params", ParamGrid::new().choices("margin", [2i64]))
            .nested("embedding_model_params", ParamGrid::new())
            .set(
                "regularizer",
                ParamSpec::Choices(vec![ParamValue::Str("LP".into()), ParamValue::Null]),
            )
            .nested(
                "regularizer_params",
                ParamGrid::new()
                    .choices("p", [1i64, 3])
                    .choices("lambda", [1e-4, 1e-5]),
            )
            .choices("optimizer", ["adagrad", "adam"])
            .nested(
                "optimizer_params",
                ParamGrid::new().choices("lr", [0.01, 0.001, 0.0001]),
            )
            .choices("verbose", [false])
            .choices("model_name", ["ComplEx"])
    }

    #[test]
    fn test_remove_unused_params() {
        let p = reference_params();
        let pruned = remove_unused_params(&p);

        // nll takes no loss params; ComplEx registers no model params.
        assert_eq!(pruned.nested_map("loss_params").unwrap().len(), 0);
        assert_eq!(pruned.nested_map("embedding_model_params").unwrap().len(), 0);
        // LP keeps p and lambda; adam keeps lr.
        assert_eq!(pruned.nested_map("regularizer_params").unwrap().len(), 2);
        assert_eq!(pruned.nested_map("optimizer_params").unwrap().len(), 1);
    }

    #[test]
    fn test_remove_unused_params_unknown_selectors_keep_maps() {
        let mut p = reference_params();
        p.set_value("loss", "self_adversarial");
        p.set_value("regularizer", ParamValue::Null);
        p.set_value("model_name", "unknown_model");
        p.set_nested("embedding_model_params", "useless", 2i64);

        let pruned = remove_unused_params(&p);

        // self_adversarial consumes margin; no regularizer clears its params;
        // an unknown model keeps its sub-map untouched.
        assert_eq!(
            pruned.get_nested("loss_params", "margin"),
            Some(&ParamValue::Int(2))
        );
        assert_eq!(pruned.nested_map("regularizer_params").unwrap().len(), 0);
        assert_eq!(
            pruned.get_nested("embedding_model_params", "useless"),
            Some(&ParamValue::Int(2))
        );
    }

    #[test]
    fn test_flatten_nested_keys() {
        let p = reference_params();
        let flat = flatten_nested_keys(&p);

        assert_eq!(
            flat.get(&FlatKey::Name("loss".into())),
            Some(&ParamValue::Str("nll".into()))
        );
        assert_eq!(
            flat.get(&FlatKey::Path("loss_params".into(), "margin".into())),
            Some(&ParamValue::Int(2))
        );
        assert_eq!(
            flat.get(&FlatKey::Path("optimizer_params".into(), "lr".into())),
            Some(&ParamValue::Float(0.001))
        );
        // The empty sub-map carries no flattened keys.
        assert!(!flat
            .keys()
            .any(|k| matches!(k, FlatKey::Path(o, _) if o == "embedding_model_params")));
    }

    #[test]
    fn test_flatten_unflatten_roundtrip() {
        let mut p = reference_params();
        // Drop the empty sub-map: flattening cannot represent it.
        p.entries.remove("embedding_model_params");

        let roundtripped = unflatten_nested_keys(&flatten_nested_keys(&p));
        assert_eq!(roundtripped, p);
    }

    #[test]
    fn test_param_hash_ignores_unused_fields() {
        let p1 = reference_params();

        let mut p2 = reference_params();
        p2.set_nested("embedding_model_params", "useless", 2i64);

        let mut p3 = p2.clone();
        p3.set_nested("regularizer_params", "lambda", 1e-4);

        assert_eq!(param_hash(&p1), param_hash(&p2));
        assert_ne!(param_hash(&p1), param_hash(&p3));
    }

    #[test]
    fn test_param_history() {
        let mut history = ParamHistory::new();
        let p1 = reference_params();
        let mut p2 = reference_params();
        p2.set_nested("embedding_model_params", "useless", 2i64);
        let mut p3 = p2.clone();
        p3.set_nested("regularizer_params", "lambda", 1e-4);

        assert!(!history.contains(&p1));
        history.add(&p1);
        assert!(history.contains(&p1));
        assert!(history.contains(&p2), "differs only in an ignored field");
        assert!(!history.contains(&p3));
        history.add(&p3);
        assert!(history.contains(&p3));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_grid_iter_cardinality_and_uniqueness() {
        let grid = search_grid();
        let combinations: Vec<HyperParams> = grid_iter(&grid).unwrap().collect();

        // 2 * 3 * 2 * 2 * 2 * 2 * 2 * 3 = 576 total leaf combinations.
        assert_eq!(combinations.len(), 576);

        let unique: HashSet<String> = combinations
            .iter()
            .map(|p| {
                flatten_nested_keys(p)
                    .iter()
                    .map(|(k, v)| format!("{k}={}", v.canonical()))
                    .collect::<Vec<_>>()
                    .join(";")
            })
            .collect();
        assert_eq!(unique.len(), 576);

        // Every combination keeps the empty sub-map and nested shape.
        for p in &combinations {
            assert!(p.nested_map("embedding_model_params").is_some());
            assert!(p.get_nested("optimizer_params", "lr").is_some());
        }
    }

    #[test]
    fn test_grid_iter_restartable() {
        let grid = search_grid();
        let first: Vec<_> = grid_iter(&grid).unwrap().take(5).collect();
        let second: Vec<_> = grid_iter(&grid).unwrap().take(5).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_grid_iter_rejects_samplers() {
        let grid = search_grid().sampler("lr_scale", |rng| ParamValue::Float(rng.gen_range(0.0..1.0)));
        assert!(!grid.is_enumerable());
        assert!(matches!(grid_iter(&grid), Err(Error::NonEnumerableGrid)));
    }

    #[test]
    fn test_random_iter_draws_within_bounds() {
        let grid = search_grid()
            .sampler("lr_log", |rng| ParamValue::Float(rng.gen_range(0.001..0.1)));

        let rng = ChaCha8Rng::seed_from_u64(0);
        let draws: Vec<HyperParams> = random_iter(&grid, rng).unwrap().take(200).collect();
        assert_eq!(draws.len(), 200);

        let mut continuous = HashSet::new();
        for p in &draws {
            let k = p.require_i64("k").unwrap();
            assert!(k == 100 || k == 200);
            let eta = p.require_i64("eta").unwrap();
            assert!([5, 10, 15].contains(&eta));
            let lr = p.f64_or("lr_log", f64::NAN).unwrap();
            assert!((0.001..0.1).contains(&lr));
            continuous.insert(format!("{:016x}", lr.to_bits()));
        }
        // Continuous draws collide with negligible probability.
        assert!(continuous.len() > 195);
    }

    #[test]
    fn test_random_iter_continues_stream() {
        let grid = search_grid();
        let mut it = random_iter(&grid, ChaCha8Rng::seed_from_u64(7)).unwrap();
        let first: Vec<_> = (&mut it).take(3).collect();
        let next: Vec<_> = it.take(3).collect();
        assert_ne!(first, next, "stream continues rather than restarting");

        // Same seed reproduces the same stream.
        let again: Vec<_> = random_iter(&grid, ChaCha8Rng::seed_from_u64(7))
            .unwrap()
            .take(3)
            .collect();
        assert_eq!(first, again);
    }

    #[test]
    fn test_sample_parameters_single_draw() {
        let grid = search_grid();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let p = sample_parameters(&grid, &mut rng).unwrap();
        assert_eq!(p.require_i64("batches_count").unwrap(), 50);
        assert!(p.nested_map("embedding_model_params").is_some());
    }

    #[test]
    fn test_scalars_into_lists() {
        let mut grid = ParamGrid::new()
            .fixed("batches_count", 50i64)
            .choices("k", [100i64, 200])
            .sampler("eta", |_| ParamValue::Int(5))
            .nested("loss_params", ParamGrid::new().fixed("margin", 2i64));

        grid.scalars_into_lists();

        assert!(matches!(
            grid.entries.get("batches_count"),
            Some(ParamSpec::Choices(v)) if v == &vec![ParamValue::Int(50)]
        ));
        assert!(matches!(grid.entries.get("k"), Some(ParamSpec::Choices(v)) if v.len() == 2));
        assert!(matches!(grid.entries.get("eta"), Some(ParamSpec::Sampler(_))));
        match grid.entries.get("loss_params") {
            Some(ParamSpec::Nested(sub)) => {
                assert!(matches!(
                    sub.entries.get("margin"),
                    Some(ParamSpec::Choices(v)) if v == &vec![ParamValue::Int(2)]
                ));
            }
            other => panic!("unexpected spec: {other:?}"),
        }
    }
}
