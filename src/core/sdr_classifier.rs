//! SDRClassifier module for HTM.
//!
//! Learns to map sparse distributed representations (SDRs) to future discrete output classes (buckets)
//! for multiple prediction steps. It trains one weight matrix per prediction step using error-driven
//! learning, associating past input patterns with the bucket that was observed `step` records later.
//! When using inference, it classifies the current pattern into a probability distribution over
//! buckets for every configured step.
//!
//! Mechanism:
//! - Records recent sparse input patterns with timestamps (learn_iteration).
//! - Maintains a weight matrix per prediction step, indexed `[input_bit][bucket]`.
//! - Grows every matrix with zero padding whenever a larger input index or bucket index shows up.
//! - For each new sample:
//!     - Updates weights so that the pattern seen `step` records ago predicts the current bucket.
//!     - Keeps a rolling estimate of the actual (continuous) value behind each bucket.
//!
//! Inference:
//! - Starts each bucket at a uniform prior and adds the weight rows of all active bits.
//! - Applies a softmax (exponentiate, then normalize) so the distribution sums to 1.
//! - The exponent is not shifted by the maximum activation, so very large weights can overflow.

use super::classifier_result::{ClassifierResult, ACTUAL_VALUES_KEY};
use super::matrix::{self, Matrix};
use crate::config::ClassifierParams;
use crate::error::{ClassifierError, Result};
use fxhash::FxHashMap;
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Format version written by this code into saved state.
pub const VERSION: u32 = 1;

/// Tolerance used when comparing real-valued state.
pub const EPSILON: f64 = 0.000001;

/// A classifier that learns a mapping from a sparse distributed representation (SDR)
/// to target buckets, with support for multi-step prediction.
#[derive(Debug, Clone)]
pub struct SDRClassifier {
    /// The prediction steps (horizons) that the classifier learns, ascending.
    pub(crate) steps: Vec<u32>,

    /// Learning rate for weight updates.
    pub(crate) alpha: f64,

    /// Smoothing rate of the rolling actual value per bucket.
    pub(crate) act_value_alpha: f64,

    /// The current learning iteration (offset-adjusted record number).
    pub(crate) learn_iteration: u32,

    /// Difference between the caller's record number and `learn_iteration`, fixed on the first compute.
    pub(crate) record_num_minus_learn_iteration: u32,

    /// Whether `record_num_minus_learn_iteration` has been fixed yet.
    pub(crate) record_num_minus_learn_iteration_set: bool,

    /// Length of the pattern history: largest step plus one.
    pub(crate) max_steps: u32,

    /// History of activation patterns as (learn_iteration, input pattern) pairs, newest first.
    pub(crate) pattern_history: VecDeque<(u32, Vec<usize>)>,

    /// Highest input index seen (rows of every weight matrix minus one).
    pub(crate) max_input_idx: usize,

    /// Highest bucket index seen (columns of every weight matrix minus one).
    pub(crate) max_bucket_idx: usize,

    /// One weight matrix per prediction step, indexed `[input_bit][bucket]`.
    pub(crate) weight_matrix: FxHashMap<u32, Matrix>,

    /// Rolling actual value per bucket.
    pub(crate) actual_values: Vec<f64>,

    /// Whether the bucket at the same index has received an actual value yet.
    pub(crate) actual_values_set: Vec<bool>,

    /// Format version of this state. Reset to `VERSION` after loading.
    pub(crate) version: u32,

    /// Diagnostic level, see `ClassifierParams::verbosity`.
    pub(crate) verbosity: u32,
}

impl SDRClassifier {
    /// Creates a new SDRClassifier.
    ///
    /// # Arguments
    ///
    /// * `steps` - Prediction steps to learn, strictly ascending. Include `0` to classify the current record.
    /// * `alpha` - The learning rate, in (0, 1].
    /// * `act_value_alpha` - Smoothing rate of the per-bucket actual values, in (0, 1].
    /// * `verbosity` - Diagnostic level.
    #[inline]
    pub fn new(steps: Vec<u32>, alpha: f64, act_value_alpha: f64, verbosity: u32) -> Result<Self> {
        let params = ClassifierParams {
            steps,
            alpha,
            act_value_alpha,
            verbosity,
        };
        params.validate()?;

        let max_steps = params.steps.iter().copied().max().unwrap_or(0) + 1;
        let weight_matrix = params
            .steps
            .iter()
            .map(|&step| (step, Matrix::new(1, 1)))
            .collect();

        if verbosity >= 1 {
            debug!(
                steps = ?params.steps,
                alpha,
                act_value_alpha,
                "created SDRClassifier"
            );
        }

        Ok(Self {
            steps: params.steps,
            alpha,
            act_value_alpha,
            learn_iteration: 0,
            record_num_minus_learn_iteration: 0,
            record_num_minus_learn_iteration_set: false,
            max_steps,
            pattern_history: VecDeque::new(),
            max_input_idx: 0,
            max_bucket_idx: 0,
            weight_matrix,
            actual_values: vec![0.0],
            actual_values_set: vec![false],
            version: VERSION,
            verbosity,
        })
    }

    /// Processes one input sample.
    ///
    /// This method:
    /// - Adjusts the learning iteration based on the record number.
    /// - Stores the activation pattern in history and grows the weight matrices if needed.
    /// - If inference is enabled, writes the actual values and one distribution per step into `result`.
    /// - If learning is enabled, updates the bucket's actual value and the weight matrices.
    ///
    /// # Arguments
    ///
    /// * `record_num` - The caller's record number; may skip values but must not go backwards.
    /// * `pattern` - Active indices of the SDR. Must not be empty.
    /// * `bucket_idx` - The target bucket index of this record.
    /// * `act_value` - The actual value behind `bucket_idx`.
    /// * `category` - Treat `act_value` as an exact category label instead of smoothing it.
    /// * `learn` - Whether to perform weight updates.
    /// * `infer` - Whether to compute an inference.
    /// * `result` - Sink for inference output.
    ///
    /// # Errors
    ///
    /// `ClassifierError::EmptyPattern` if `pattern` is empty. Nothing is modified in that case.
    #[inline]
    #[allow(clippy::too_many_arguments)]
    pub fn compute(
        &mut self,
        record_num: u32,
        pattern: &[usize],
        bucket_idx: usize,
        act_value: f64,
        category: bool,
        learn: bool,
        infer: bool,
        result: &mut ClassifierResult,
    ) -> Result<()> {
        let max_input_idx = *pattern.iter().max().ok_or(ClassifierError::EmptyPattern)?;

        if !self.record_num_minus_learn_iteration_set {
            self.record_num_minus_learn_iteration = record_num.wrapping_sub(self.learn_iteration);
            self.record_num_minus_learn_iteration_set = true;
        }

        self.learn_iteration = record_num.wrapping_sub(self.record_num_minus_learn_iteration);

        if self.verbosity >= 2 {
            trace!(
                record_num,
                learn_iteration = self.learn_iteration,
                bucket_idx,
                act_value,
                learn,
                infer,
                "compute"
            );
        }

        self.pattern_history
            .push_front((self.learn_iteration, pattern.to_vec()));

        if self.pattern_history.len() > self.max_steps as usize {
            self.pattern_history.pop_back();
        }

        if max_input_idx > self.max_input_idx {
            self.max_input_idx = max_input_idx;
            self.resize_weights();
        }

        if infer {
            self.infer_into(pattern, act_value, result);
        }

        if learn {
            self.learn(bucket_idx, act_value, category);
        }

        Ok(())
    }

    /// Runs inference for `pattern` without touching history, weights or actual values.
    ///
    /// Bits beyond the highest input index seen so far carry no weight and are ignored.
    #[inline]
    pub fn infer(&self, pattern: &[usize], act_value: f64) -> Result<ClassifierResult> {
        if pattern.is_empty() {
            return Err(ClassifierError::EmptyPattern);
        }

        let mut result = ClassifierResult::new();
        self.infer_into(pattern, act_value, &mut result);
        Ok(result)
    }

    /// Fills `result` with the per-bucket actual values and the distribution of every step.
    #[inline]
    fn infer_into(&self, pattern: &[usize], act_value: f64, result: &mut ClassifierResult) {
        // With a 0-step prediction the input's own value must not leak into unseen buckets.
        let unset_value = if self.steps[0] == 0 { 0.0 } else { act_value };

        let values = result.create_vector(ACTUAL_VALUES_KEY, self.actual_values.len(), 0.0);
        for ((value, &actual), &set) in values
            .iter_mut()
            .zip(&self.actual_values)
            .zip(&self.actual_values_set)
        {
            *value = if set { actual } else { unset_value };
        }

        for &step in &self.steps {
            // Steps are bounded by `MAX_STEP`, so every step maps to a non-negative key.
            let Ok(key) = i32::try_from(step) else {
                continue;
            };
            let likelihoods = result.create_vector(
                key,
                self.max_bucket_idx + 1,
                1.0 / self.actual_values.len() as f64,
            );
            self.softmax(pattern, step, likelihoods);
        }
    }

    /// Adds the weight rows of all active bits onto `likelihoods` and turns the scores into
    /// a probability distribution.
    #[inline]
    fn softmax(&self, pattern: &[usize], step: u32, likelihoods: &mut [f64]) {
        if let Some(weights) = self.weight_matrix.get(&step) {
            for &bit in pattern {
                if bit < weights.rows() {
                    matrix::add(likelihoods, weights.row(bit));
                }
            }
        }

        matrix::range_exp(1.0, likelihoods);
        matrix::normalize(likelihoods, 1.0);
    }

    /// Returns `target - predicted` for `pattern` at `step`, where target is one-hot at `bucket_idx`.
    #[inline]
    fn calculate_error(&self, bucket_idx: usize, pattern: &[usize], step: u32) -> Vec<f64> {
        let mut likelihoods = vec![1.0 / self.actual_values.len() as f64; self.max_bucket_idx + 1];
        self.softmax(pattern, step, &mut likelihoods);

        let mut target = vec![0.0; self.max_bucket_idx + 1];
        target[bucket_idx] = 1.0;

        matrix::axby(-1.0, &mut likelihoods, 1.0, &target);
        likelihoods
    }

    #[inline]
    fn learn(&mut self, bucket_idx: usize, act_value: f64, category: bool) {
        if bucket_idx > self.max_bucket_idx {
            self.max_bucket_idx = bucket_idx;
            self.resize_weights();
        }

        if self.actual_values.len() <= self.max_bucket_idx {
            self.actual_values.resize(self.max_bucket_idx + 1, 0.0);
            self.actual_values_set.resize(self.max_bucket_idx + 1, false);
        }

        if !self.actual_values_set[bucket_idx] || category {
            self.actual_values[bucket_idx] = act_value;
            self.actual_values_set[bucket_idx] = true;
        } else {
            self.actual_values[bucket_idx] = (1.0 - self.act_value_alpha)
                * self.actual_values[bucket_idx]
                + self.act_value_alpha * act_value;
        }

        let alpha = self.alpha;
        let max_bucket_idx = self.max_bucket_idx;

        for (iteration, pattern) in &self.pattern_history {
            let n_steps = self.learn_iteration.wrapping_sub(*iteration);

            if self.steps.binary_search(&n_steps).is_err() {
                continue;
            }

            let error = self.calculate_error(bucket_idx, pattern, n_steps);

            if let Some(weights) = self.weight_matrix.get_mut(&n_steps) {
                for &bit in pattern {
                    // The highest bucket never receives an update.
                    for (weight, err) in weights.row_mut(bit)[..max_bucket_idx]
                        .iter_mut()
                        .zip(&error)
                    {
                        *weight += alpha * err;
                    }
                }
            }
        }
    }

    /// Grows every weight matrix to `(max_input_idx + 1) x (max_bucket_idx + 1)`.
    #[inline]
    fn resize_weights(&mut self) {
        let rows = self.max_input_idx + 1;
        let cols = self.max_bucket_idx + 1;

        if self.verbosity >= 1 {
            debug!(rows, cols, "resizing weight matrices");
        }

        for weights in self.weight_matrix.values_mut() {
            weights.resize(rows, cols);
        }
    }

    /// The prediction steps, ascending.
    #[inline]
    pub fn steps(&self) -> &[u32] {
        &self.steps
    }

    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[inline]
    pub fn act_value_alpha(&self) -> f64 {
        self.act_value_alpha
    }

    /// The current (offset-adjusted) learning iteration.
    #[inline]
    pub fn learn_iteration(&self) -> u32 {
        self.learn_iteration
    }

    /// Maximum length of the pattern history.
    #[inline]
    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    #[inline]
    pub fn max_input_idx(&self) -> usize {
        self.max_input_idx
    }

    #[inline]
    pub fn max_bucket_idx(&self) -> usize {
        self.max_bucket_idx
    }

    #[inline]
    pub fn verbosity(&self) -> u32 {
        self.verbosity
    }

    /// Format version of the current state.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Weight matrix of `step`, indexed `[input_bit][bucket]`.
    #[inline]
    pub fn weights(&self, step: u32) -> Option<&Matrix> {
        self.weight_matrix.get(&step)
    }

    /// Rolling actual value per bucket. Only meaningful where `actual_values_set` is true.
    #[inline]
    pub fn actual_values(&self) -> &[f64] {
        &self.actual_values
    }

    #[inline]
    pub fn actual_values_set(&self) -> &[bool] {
        &self.actual_values_set
    }

    /// Stored `(learn_iteration, pattern)` pairs, newest first.
    #[inline]
    pub fn pattern_history(&self) -> impl Iterator<Item = (u32, &[usize])> {
        self.pattern_history
            .iter()
            .map(|(iteration, pattern)| (*iteration, pattern.as_slice()))
    }
}

impl PartialEq for SDRClassifier {
    /// Deep comparison of the full state. Rates and actual values are compared with `EPSILON`
    /// tolerance, everything else exactly.
    fn eq(&self, other: &Self) -> bool {
        if self.steps != other.steps {
            return false;
        }

        if (self.alpha - other.alpha).abs() > EPSILON
            || (self.act_value_alpha - other.act_value_alpha).abs() > EPSILON
            || self.learn_iteration != other.learn_iteration
            || self.record_num_minus_learn_iteration != other.record_num_minus_learn_iteration
            || self.record_num_minus_learn_iteration_set
                != other.record_num_minus_learn_iteration_set
            || self.max_steps != other.max_steps
        {
            return false;
        }

        if self.pattern_history != other.pattern_history {
            return false;
        }

        if self.max_bucket_idx != other.max_bucket_idx || self.max_input_idx != other.max_input_idx
        {
            return false;
        }

        if self.weight_matrix.len() != other.weight_matrix.len() {
            return false;
        }

        for (step, weights) in &self.weight_matrix {
            let Some(other_weights) = other.weight_matrix.get(step) else {
                return false;
            };

            for row in 0..=self.max_input_idx {
                for col in 0..=self.max_bucket_idx {
                    if weights.at(row, col) != other_weights.at(row, col) {
                        return false;
                    }
                }
            }
        }

        if self.actual_values.len() != other.actual_values.len()
            || self.actual_values_set != other.actual_values_set
        {
            return false;
        }

        if self
            .actual_values
            .iter()
            .zip(&other.actual_values)
            .any(|(a, b)| (a - b).abs() > EPSILON)
        {
            return false;
        }

        self.version == other.version && self.verbosity == other.verbosity
    }
}
