//! Persistence for the `SDRClassifier`.
//!
//! Two independent encodings are supported:
//!
//! Sequential text (`save` / `load`):
//! - Whitespace separated tokens framed by `SDRClassifier` and `~SDRClassifier` markers.
//! - The token after the start marker is the format version of the stream.
//! - Version 0 streams lack the record offset and the iteration of each history entry.
//!   Those iterations are reconstructed as `learn_iteration - (history_len - i)`.
//! - Reals are written in shortest round-trip form, so a saved state loads back bit-exact.
//!
//! Structured (`write` / `read`):
//! - The same fields as a serde record, `SdrClassifierProto`.
//! - Every weight matrix is flattened row-major into one list.
//! - `write_bytes` / `read_bytes` encode the record with bincode.
//!
//! Loading never merges: the new state is decoded and checked in full before it replaces
//! the current one, so a failed load leaves the classifier untouched.

use super::matrix::Matrix;
use super::sdr_classifier::{SDRClassifier, VERSION};
use crate::config::MAX_STEP;
use crate::error::{ClassifierError, Result};
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::str::{FromStr, SplitWhitespace};
use tracing::debug;

const START_MARKER: &str = "SDRClassifier";
const END_MARKER: &str = "~SDRClassifier";

/// Weights of one prediction step, flattened row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepWeightMatrixProto {
    pub steps: u32,
    pub weight: Vec<f64>,
}

/// Structured form of the full classifier state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdrClassifierProto {
    pub steps: Vec<u32>,
    pub alpha: f64,
    pub act_value_alpha: f64,
    pub learn_iteration: u32,
    pub record_num_minus_learn_iteration: u32,
    pub record_num_minus_learn_iteration_set: bool,
    pub max_steps: u32,
    pub pattern_nz_history: Vec<Vec<u64>>,
    pub iteration_num_history: Vec<u32>,
    pub max_bucket_idx: u64,
    pub max_input_idx: u64,
    pub weight_matrix: Vec<StepWeightMatrixProto>,
    pub actual_values: Vec<f64>,
    pub actual_values_set: Vec<bool>,
    pub version: u32,
    pub verbosity: u32,
}

fn malformed(msg: impl Into<String>) -> ClassifierError {
    ClassifierError::MalformedState(msg.into())
}

/// Rows, columns and cell count of the weight matrices for the given maximum indices.
fn weight_dimensions(max_input_idx: usize, max_bucket_idx: usize) -> Result<(usize, usize, usize)> {
    let rows = max_input_idx.checked_add(1);
    let cols = max_bucket_idx.checked_add(1);

    match (rows, cols) {
        (Some(rows), Some(cols)) => rows
            .checked_mul(cols)
            .map(|cells| (rows, cols, cells))
            .ok_or_else(|| malformed(format!("weight matrix of {rows} x {cols} is too large"))),
        _ => Err(malformed(format!(
            "max_input_idx {max_input_idx} or max_bucket_idx {max_bucket_idx} out of range"
        ))),
    }
}

/// Pulls typed values out of a whitespace separated text stream.
struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.split_whitespace(),
        }
    }

    fn next_str(&mut self, what: &str) -> Result<&'a str> {
        self.inner
            .next()
            .ok_or_else(|| malformed(format!("unexpected end of stream reading {what}")))
    }

    fn next<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let token = self.next_str(what)?;
        token
            .parse()
            .map_err(|_| malformed(format!("invalid {what}: {token:?}")))
    }

    fn next_bool(&mut self, what: &str) -> Result<bool> {
        match self.next_str(what)? {
            "0" => Ok(false),
            "1" => Ok(true),
            token => Err(malformed(format!("invalid {what}: {token:?}"))),
        }
    }

    fn expect(&mut self, marker: &str) -> Result<()> {
        let token = self.next_str(marker)?;
        if token == marker {
            Ok(())
        } else {
            Err(malformed(format!("expected {marker:?}, found {token:?}")))
        }
    }
}

impl SDRClassifier {
    /// Writes the state in the sequential text format.
    pub fn save<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "{START_MARKER}")?;
        writeln!(out, "{VERSION}")?;

        writeln!(
            out,
            "{} {} {} {} {} {} {} {} ",
            self.version,
            self.alpha,
            self.act_value_alpha,
            self.learn_iteration,
            self.max_steps,
            self.max_bucket_idx,
            self.max_input_idx,
            self.verbosity
        )?;

        write!(
            out,
            "{} {} {} ",
            self.record_num_minus_learn_iteration,
            u8::from(self.record_num_minus_learn_iteration_set),
            self.pattern_history.len()
        )?;
        for (iteration, _) in &self.pattern_history {
            write!(out, "{iteration} ")?;
        }
        writeln!(out)?;

        write!(out, "{} ", self.steps.len())?;
        for step in &self.steps {
            write!(out, "{step} ")?;
        }
        writeln!(out)?;

        write!(out, "{} ", self.pattern_history.len())?;
        for (_, pattern) in &self.pattern_history {
            write!(out, "{} ", pattern.len())?;
            for bit in pattern {
                write!(out, "{bit} ")?;
            }
        }
        writeln!(out)?;

        let mut keys: Vec<u32> = self.weight_matrix.keys().copied().collect();
        keys.sort_unstable();

        write!(out, "{} ", keys.len())?;
        for step in keys {
            write!(out, "{step} ")?;
            let weights = &self.weight_matrix[&step];
            for row in 0..weights.rows() {
                for value in weights.row(row) {
                    write!(out, "{value} ")?;
                }
                writeln!(out)?;
            }
        }
        writeln!(out)?;

        write!(out, "{} ", self.actual_values.len())?;
        for (value, &set) in self.actual_values.iter().zip(&self.actual_values_set) {
            write!(out, "{} {} ", value, u8::from(set))?;
        }
        writeln!(out)?;

        writeln!(out, "{END_MARKER}")?;

        if self.verbosity >= 1 {
            debug!(learn_iteration = self.learn_iteration, "saved SDRClassifier");
        }

        Ok(())
    }

    /// Replaces the state with one read from the sequential text format.
    ///
    /// # Errors
    ///
    /// `ClassifierError::MalformedState` on a wrong marker, an unsupported version, a truncated
    /// or unparsable stream, or inconsistent dimensions. The current state is kept on error.
    pub fn load<R: Read>(&mut self, mut input: R) -> Result<()> {
        let mut text = String::new();
        input.read_to_string(&mut text)?;

        let loaded = Self::parse_text(&text)?;
        loaded.check_state()?;

        if loaded.verbosity >= 1 {
            debug!(
                learn_iteration = loaded.learn_iteration,
                max_input_idx = loaded.max_input_idx,
                max_bucket_idx = loaded.max_bucket_idx,
                "loaded SDRClassifier"
            );
        }

        *self = loaded;
        Ok(())
    }

    fn parse_text(text: &str) -> Result<Self> {
        let mut tokens = Tokens::new(text);

        tokens.expect(START_MARKER)?;

        let stream_version: u32 = tokens.next("format version")?;
        if stream_version > VERSION {
            return Err(malformed(format!(
                "unsupported format version {stream_version}, expected at most {VERSION}"
            )));
        }

        let _state_version: u32 = tokens.next("state version")?;
        let alpha: f64 = tokens.next("alpha")?;
        let act_value_alpha: f64 = tokens.next("act_value_alpha")?;
        let learn_iteration: u32 = tokens.next("learn_iteration")?;
        let max_steps: u32 = tokens.next("max_steps")?;
        let max_bucket_idx: usize = tokens.next("max_bucket_idx")?;
        let max_input_idx: usize = tokens.next("max_input_idx")?;
        let verbosity: u32 = tokens.next("verbosity")?;

        let mut record_num_minus_learn_iteration = 0;
        let mut record_num_minus_learn_iteration_set = false;
        let mut iterations = Vec::new();

        if stream_version >= 1 {
            record_num_minus_learn_iteration = tokens.next("record offset")?;
            record_num_minus_learn_iteration_set = tokens.next_bool("record offset flag")?;
            let count: usize = tokens.next("iteration history length")?;
            for _ in 0..count {
                iterations.push(tokens.next::<u32>("history iteration")?);
            }
        }

        let num_steps: usize = tokens.next("step count")?;
        let steps = (0..num_steps)
            .map(|_| tokens.next::<u32>("step"))
            .collect::<Result<Vec<_>>>()?;

        let history_len: usize = tokens.next("pattern history length")?;
        if stream_version >= 1 && history_len != iterations.len() {
            return Err(malformed(format!(
                "{} history iterations for {history_len} patterns",
                iterations.len()
            )));
        }

        let mut pattern_history = VecDeque::new();
        for i in 0..history_len {
            let len: usize = tokens.next("pattern length")?;
            let pattern = (0..len)
                .map(|_| tokens.next::<usize>("pattern bit"))
                .collect::<Result<Vec<_>>>()?;

            let iteration = if stream_version == 0 {
                learn_iteration.wrapping_sub((history_len - i) as u32)
            } else {
                iterations[i]
            };

            pattern_history.push_back((iteration, pattern));
        }

        let (rows, cols, cells) = weight_dimensions(max_input_idx, max_bucket_idx)?;
        let num_matrices: usize = tokens.next("weight matrix count")?;
        let mut weight_matrix = FxHashMap::default();
        for _ in 0..num_matrices {
            let step: u32 = tokens.next("weight matrix step")?;
            // Grows with the tokens actually present, never with the declared size.
            let data = (0..cells)
                .map(|_| tokens.next::<f64>("weight"))
                .collect::<Result<Vec<_>>>()?;
            let weights = Matrix::from_row_major(rows, cols, data)
                .ok_or_else(|| malformed(format!("step {step} has a truncated weight matrix")))?;
            weight_matrix.insert(step, weights);
        }

        let num_buckets: usize = tokens.next("bucket count")?;
        let mut actual_values = Vec::new();
        let mut actual_values_set = Vec::new();
        for _ in 0..num_buckets {
            actual_values.push(tokens.next::<f64>("actual value")?);
            actual_values_set.push(tokens.next_bool("actual value flag")?);
        }

        tokens.expect(END_MARKER)?;

        Ok(Self {
            steps,
            alpha,
            act_value_alpha,
            learn_iteration,
            record_num_minus_learn_iteration,
            record_num_minus_learn_iteration_set,
            max_steps,
            pattern_history,
            max_input_idx,
            max_bucket_idx,
            weight_matrix,
            actual_values,
            actual_values_set,
            version: VERSION,
            verbosity,
        })
    }

    /// Size in bytes of the `save` output.
    pub fn persistent_size(&self) -> Result<usize> {
        let mut buf = Vec::new();
        self.save(&mut buf)?;
        Ok(buf.len())
    }

    /// Captures the state in the structured format.
    pub fn write(&self) -> SdrClassifierProto {
        let mut keys: Vec<u32> = self.weight_matrix.keys().copied().collect();
        keys.sort_unstable();

        SdrClassifierProto {
            steps: self.steps.clone(),
            alpha: self.alpha,
            act_value_alpha: self.act_value_alpha,
            learn_iteration: self.learn_iteration,
            record_num_minus_learn_iteration: self.record_num_minus_learn_iteration,
            record_num_minus_learn_iteration_set: self.record_num_minus_learn_iteration_set,
            max_steps: self.max_steps,
            pattern_nz_history: self
                .pattern_history
                .iter()
                .map(|(_, pattern)| pattern.iter().map(|&bit| bit as u64).collect())
                .collect(),
            iteration_num_history: self
                .pattern_history
                .iter()
                .map(|&(iteration, _)| iteration)
                .collect(),
            max_bucket_idx: self.max_bucket_idx as u64,
            max_input_idx: self.max_input_idx as u64,
            weight_matrix: keys
                .into_iter()
                .map(|step| StepWeightMatrixProto {
                    steps: step,
                    weight: self.weight_matrix[&step].as_slice().to_vec(),
                })
                .collect(),
            actual_values: self.actual_values.clone(),
            actual_values_set: self.actual_values_set.clone(),
            version: self.version,
            verbosity: self.verbosity,
        }
    }

    /// Replaces the state with the one held by `proto`.
    ///
    /// # Errors
    ///
    /// `ClassifierError::MalformedState` if list lengths disagree with the recorded dimensions.
    /// The current state is kept on error.
    pub fn read(&mut self, proto: &SdrClassifierProto) -> Result<()> {
        let to_usize = |value: u64, what: &str| {
            usize::try_from(value).map_err(|_| malformed(format!("{what} {value} out of range")))
        };

        let max_input_idx = to_usize(proto.max_input_idx, "max_input_idx")?;
        let max_bucket_idx = to_usize(proto.max_bucket_idx, "max_bucket_idx")?;

        if proto.pattern_nz_history.len() != proto.iteration_num_history.len() {
            return Err(malformed(format!(
                "{} history iterations for {} patterns",
                proto.iteration_num_history.len(),
                proto.pattern_nz_history.len()
            )));
        }

        let pattern_history = proto
            .iteration_num_history
            .iter()
            .zip(&proto.pattern_nz_history)
            .map(|(&iteration, pattern)| -> Result<(u32, Vec<usize>)> {
                let pattern = pattern
                    .iter()
                    .map(|&bit| to_usize(bit, "pattern bit"))
                    .collect::<Result<Vec<_>>>()?;
                Ok((iteration, pattern))
            })
            .collect::<Result<VecDeque<_>>>()?;

        let (rows, cols, cells) = weight_dimensions(max_input_idx, max_bucket_idx)?;
        let mut weight_matrix = FxHashMap::default();
        for step_weights in &proto.weight_matrix {
            let weights = Matrix::from_row_major(rows, cols, step_weights.weight.clone())
                .ok_or_else(|| {
                    malformed(format!(
                        "step {} has {} weights, expected {}",
                        step_weights.steps,
                        step_weights.weight.len(),
                        cells
                    ))
                })?;
            weight_matrix.insert(step_weights.steps, weights);
        }

        let loaded = Self {
            steps: proto.steps.clone(),
            alpha: proto.alpha,
            act_value_alpha: proto.act_value_alpha,
            learn_iteration: proto.learn_iteration,
            record_num_minus_learn_iteration: proto.record_num_minus_learn_iteration,
            record_num_minus_learn_iteration_set: proto.record_num_minus_learn_iteration_set,
            max_steps: proto.max_steps,
            pattern_history,
            max_input_idx,
            max_bucket_idx,
            weight_matrix,
            actual_values: proto.actual_values.clone(),
            actual_values_set: proto.actual_values_set.clone(),
            version: proto.version,
            verbosity: proto.verbosity,
        };
        loaded.check_state()?;

        if loaded.verbosity >= 1 {
            debug!(
                learn_iteration = loaded.learn_iteration,
                "read SDRClassifier from structured state"
            );
        }

        *self = loaded;
        Ok(())
    }

    /// Encodes the structured record with bincode.
    pub fn write_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.write())?)
    }

    /// Replaces the state with one decoded from `write_bytes` output.
    pub fn read_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let proto: SdrClassifierProto = bincode::deserialize(bytes)?;
        self.read(&proto)
    }

    /// Checks the invariants `compute` relies on.
    fn check_state(&self) -> Result<()> {
        if self.steps.is_empty() || self.steps.windows(2).any(|w| w[0] >= w[1]) {
            return Err(malformed(format!(
                "steps must be non-empty and ascending, got {:?}",
                self.steps
            )));
        }

        if let Some(step) = self.steps.iter().find(|&&step| step > MAX_STEP) {
            return Err(malformed(format!(
                "step {step} exceeds the largest supported step {MAX_STEP}"
            )));
        }

        if let Some(step) = self
            .steps
            .iter()
            .find(|&&step| !self.weight_matrix.contains_key(&step))
        {
            return Err(malformed(format!("no weight matrix for step {step}")));
        }

        if self.actual_values.len() != self.max_bucket_idx + 1
            || self.actual_values_set.len() != self.actual_values.len()
        {
            return Err(malformed(format!(
                "{} actual values and {} flags for {} buckets",
                self.actual_values.len(),
                self.actual_values_set.len(),
                self.max_bucket_idx + 1
            )));
        }

        if self.pattern_history.len() > self.max_steps as usize {
            return Err(malformed(format!(
                "{} history entries exceed max_steps {}",
                self.pattern_history.len(),
                self.max_steps
            )));
        }

        if self
            .pattern_history
            .iter()
            .flat_map(|(_, pattern)| pattern)
            .any(|&bit| bit > self.max_input_idx)
        {
            return Err(malformed(format!(
                "pattern history references inputs beyond max_input_idx {}",
                self.max_input_idx
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier_result::ClassifierResult;

    fn trained() -> SDRClassifier {
        let mut c = SDRClassifier::new(vec![0, 1], 0.1, 0.3, 0).unwrap();
        let mut result = ClassifierResult::new();
        c.compute(0, &[1, 3], 0, 5.0, false, true, true, &mut result)
            .unwrap();
        c.compute(1, &[2, 4], 1, 7.5, false, true, true, &mut result)
            .unwrap();
        c.compute(2, &[1, 3], 2, 1e-9, false, true, true, &mut result)
            .unwrap();
        c
    }

    fn saved(c: &SDRClassifier) -> String {
        let mut buf = Vec::new();
        c.save(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_save_layout() {
        let text = saved(&trained());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "SDRClassifier");
        assert_eq!(lines[1], "1");
        assert_eq!(lines[2], "1 0.1 0.3 2 2 2 4 0 ");
        assert_eq!(lines[3], "0 1 2 2 1 ");
        assert_eq!(lines[4], "2 0 1 ");
        assert_eq!(lines[5], "2 2 1 3 2 2 4 ");
        assert_eq!(*lines.last().unwrap(), "~SDRClassifier");
    }

    #[test]
    fn test_save_load_roundtrip() {
        let original = trained();
        let mut restored = SDRClassifier::new(vec![3], 0.5, 0.5, 0).unwrap();
        restored.load(saved(&original).as_bytes()).unwrap();
        assert!(restored == original);
    }

    #[test]
    fn test_persistent_size_matches_save() {
        let c = trained();
        assert_eq!(c.persistent_size().unwrap(), saved(&c).len());
    }

    #[test]
    fn test_load_rejects_bad_markers_and_versions() {
        let text = saved(&trained());

        let bad_start = text.replacen("SDRClassifier", "SDRClassifierX", 1);
        let bad_end = text.replace("~SDRClassifier", "~Other");
        let bad_version = text.replacen("\n1\n", "\n2\n", 1);
        let truncated = &text[..text.len() / 2];

        for input in [bad_start.as_str(), bad_end.as_str(), bad_version.as_str(), truncated] {
            let mut c = SDRClassifier::new(vec![4], 0.2, 0.2, 0).unwrap();
            let before = c.clone();
            let err = c.load(input.as_bytes());
            assert!(matches!(err, Err(ClassifierError::MalformedState(_))));
            assert!(c == before);
        }
    }

    #[test]
    fn test_load_version_zero_synthesizes_iterations() {
        let text = "SDRClassifier\n0\n\
                    0 0.1 0.3 10 3 0 2 0\n\
                    1 0\n\
                    3 2 0 1 1 1 1 2\n\
                    1 0 0 0 0\n\
                    1 4.5 1\n\
                    ~SDRClassifier\n";

        let mut c = SDRClassifier::new(vec![0], 0.1, 0.3, 0).unwrap();
        c.load(text.as_bytes()).unwrap();

        let history: Vec<(u32, Vec<usize>)> =
            c.pattern_history().map(|(i, p)| (i, p.to_vec())).collect();
        assert_eq!(
            history,
            vec![(7, vec![0, 1]), (8, vec![1]), (9, vec![2])]
        );
        assert_eq!(c.version(), VERSION);
        assert_eq!(c.learn_iteration(), 10);
        assert_eq!(c.actual_values(), &[4.5]);
        assert!(!c.record_num_minus_learn_iteration_set);
    }

    #[test]
    fn test_write_flattens_row_major() {
        let c = trained();
        let proto = c.write();

        assert_eq!(proto.weight_matrix.len(), 2);
        for step_weights in &proto.weight_matrix {
            assert_eq!(step_weights.weight.len(), 5 * 3);
            let weights = c.weights(step_weights.steps).unwrap();
            assert_eq!(step_weights.weight[2 * 3 + 1], weights.at(2, 1));
        }
    }

    #[test]
    fn test_write_read_roundtrip() {
        let original = trained();
        let mut restored = SDRClassifier::new(vec![3], 0.5, 0.5, 0).unwrap();
        restored.read(&original.write()).unwrap();
        assert!(restored == original);

        let mut from_bytes = SDRClassifier::new(vec![3], 0.5, 0.5, 0).unwrap();
        from_bytes
            .read_bytes(&original.write_bytes().unwrap())
            .unwrap();
        assert!(from_bytes == original);
    }

    #[test]
    fn test_read_rejects_wrong_weight_length() {
        let mut proto = trained().write();
        proto.weight_matrix[0].weight.pop();

        let mut c = SDRClassifier::new(vec![3], 0.5, 0.5, 0).unwrap();
        let before = c.clone();
        assert!(matches!(
            c.read(&proto),
            Err(ClassifierError::MalformedState(_))
        ));
        assert!(c == before);
    }

    fn assert_load_rejected(text: &str) {
        let mut c = SDRClassifier::new(vec![4], 0.2, 0.2, 0).unwrap();
        let before = c.clone();
        assert!(matches!(
            c.load(text.as_bytes()),
            Err(ClassifierError::MalformedState(_))
        ));
        assert!(c == before);
    }

    fn assert_read_rejected(proto: &SdrClassifierProto) {
        let mut c = SDRClassifier::new(vec![4], 0.2, 0.2, 0).unwrap();
        let before = c.clone();
        assert!(matches!(
            c.read(proto),
            Err(ClassifierError::MalformedState(_))
        ));
        assert!(c == before);
    }

    #[test]
    fn test_load_rejects_huge_declared_counts() {
        let huge = 1u64 << 62;

        let history = format!(
            "SDRClassifier\n0\n0 0.1 0.3 10 3 0 2 0\n1 0\n{huge} 1 0\n~SDRClassifier\n"
        );
        assert_load_rejected(&history);

        let buckets = format!(
            "SDRClassifier\n1\n1 0.1 0.3 0 1 0 0 0\n0 0 0\n1 0\n0\n1 0 0\n{huge} 0 0\n~SDRClassifier\n"
        );
        assert_load_rejected(&buckets);

        let matrices = format!(
            "SDRClassifier\n1\n1 0.1 0.3 0 1 0 0 0\n0 0 0\n1 0\n0\n{huge} 0 0\n~SDRClassifier\n"
        );
        assert_load_rejected(&matrices);
    }

    #[test]
    fn test_load_rejects_overflowing_dimensions() {
        let max = usize::MAX;

        let rows = format!(
            "SDRClassifier\n1\n1 0.1 0.3 0 1 0 {max} 0\n0 0 0\n1 0\n0\n1 0 0\n1 0 0\n~SDRClassifier\n"
        );
        assert_load_rejected(&rows);

        let half = 1usize << (usize::BITS / 2);
        let cells = format!(
            "SDRClassifier\n1\n1 0.1 0.3 0 1 {half} {half} 0\n0 0 0\n1 0\n0\n1 0 0\n1 0 0\n~SDRClassifier\n"
        );
        assert_load_rejected(&cells);
    }

    #[test]
    fn test_read_rejects_overflowing_dimensions() {
        let mut proto = trained().write();
        proto.max_input_idx = 1 << 33;
        proto.max_bucket_idx = 1 << 33;
        assert_read_rejected(&proto);

        let mut proto = trained().write();
        proto.max_input_idx = u64::MAX;
        assert_read_rejected(&proto);
    }

    #[test]
    fn test_read_rejects_missing_step_matrix() {
        let mut proto = trained().write();
        proto.weight_matrix.retain(|w| w.steps != 1);
        assert_read_rejected(&proto);
    }

    #[test]
    fn test_read_rejects_history_beyond_max_steps() {
        let mut proto = trained().write();
        proto.max_steps = 1;
        assert_read_rejected(&proto);
    }

    #[test]
    fn test_read_rejects_pattern_bit_beyond_inputs() {
        let mut proto = trained().write();
        proto.pattern_nz_history[0].push(proto.max_input_idx + 1);
        assert_read_rejected(&proto);
    }

    #[test]
    fn test_read_rejects_step_beyond_result_keys() {
        let mut proto = trained().write();
        let weight = proto.weight_matrix[0].weight.clone();
        proto.steps.push(u32::MAX);
        proto.weight_matrix.push(StepWeightMatrixProto {
            steps: u32::MAX,
            weight,
        });
        assert_read_rejected(&proto);
    }

    #[test]
    fn test_load_rejects_missing_step_matrix() {
        let text = "SDRClassifier\n1\n\
                    1 0.1 0.3 0 1 0 0 0\n\
                    0 0 0\n\
                    2 0 1\n\
                    0\n\
                    1 0 0\n\
                    1 0 0\n\
                    ~SDRClassifier\n";
        assert_load_rejected(text);
    }

    #[test]
    fn test_read_bytes_rejects_garbage() {
        let mut c = SDRClassifier::new(vec![3], 0.5, 0.5, 0).unwrap();
        assert!(matches!(
            c.read_bytes(&[1, 2, 3]),
            Err(ClassifierError::Encoding(_))
        ));
    }
}
