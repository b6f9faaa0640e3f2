//! The output sink filled by `SDRClassifier::compute`.
//!
//! Each prediction step gets one probability distribution over buckets. The special
//! key [`ACTUAL_VALUES_KEY`] (`-1`) holds the rolling actual value of every bucket,
//! which lets a caller translate the most likely bucket back into a scalar.

use std::collections::BTreeMap;

/// Key under which the per-bucket actual values are stored.
pub const ACTUAL_VALUES_KEY: i32 = -1;

/// Per-step likelihood vectors plus the bucket actual values.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ClassifierResult {
    vectors: BTreeMap<i32, Vec<f64>>,
}

impl ClassifierResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or replaces) the vector stored at `key` with `size` copies of `fill`
    /// and returns it for the caller to populate.
    pub fn create_vector(&mut self, key: i32, size: usize, fill: f64) -> &mut Vec<f64> {
        let slot = self.vectors.entry(key).or_default();
        slot.clear();
        slot.resize(size, fill);
        slot
    }

    /// The vector stored at `key`, if any.
    pub fn get(&self, key: i32) -> Option<&[f64]> {
        self.vectors.get(&key).map(Vec::as_slice)
    }

    /// Likelihood distribution predicted for `step`.
    pub fn step(&self, step: u32) -> Option<&[f64]> {
        i32::try_from(step).ok().and_then(|key| self.get(key))
    }

    /// Rolling actual value per bucket.
    pub fn actual_values(&self) -> Option<&[f64]> {
        self.get(ACTUAL_VALUES_KEY)
    }

    /// Returns the most likely bucket for `step` together with its probability.
    pub fn most_probable(&self, step: u32) -> Option<(usize, f64)> {
        self.step(step)?
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (bucket, p)| match best {
                Some((_, best_p)) if best_p >= p => best,
                _ => Some((bucket, p)),
            })
    }

    /// Iterates over all stored vectors in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &[f64])> {
        self.vectors.iter().map(|(&k, v)| (k, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Drops all stored vectors.
    pub fn clear(&mut self) {
        self.vectors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_vector_replaces_previous() {
        let mut result = ClassifierResult::new();
        result.create_vector(1, 3, 0.5)[2] = 0.9;
        assert_eq!(result.step(1), Some(&[0.5, 0.5, 0.9][..]));

        result.create_vector(1, 2, 0.0);
        assert_eq!(result.step(1), Some(&[0.0, 0.0][..]));
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_actual_values_key() {
        let mut result = ClassifierResult::new();
        result.create_vector(ACTUAL_VALUES_KEY, 2, 7.0);
        assert_eq!(result.actual_values(), Some(&[7.0, 7.0][..]));
        assert!(result.step(0).is_none());
    }

    #[test]
    fn test_most_probable_picks_first_maximum() {
        let mut result = ClassifierResult::new();
        result
            .create_vector(0, 4, 0.0)
            .copy_from_slice(&[0.1, 0.4, 0.4, 0.1]);
        assert_eq!(result.most_probable(0), Some((1, 0.4)));
        assert_eq!(result.most_probable(3), None);
    }

    #[test]
    fn test_iter_is_ordered() {
        let mut result = ClassifierResult::new();
        result.create_vector(5, 1, 0.0);
        result.create_vector(ACTUAL_VALUES_KEY, 1, 0.0);
        result.create_vector(0, 1, 0.0);
        let keys: Vec<i32> = result.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![-1, 0, 5]);
    }
}
