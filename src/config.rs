//! Hyperparameters for the `SDRClassifier`.
//!
//! `ClassifierParams` can be built in code or deserialized from any serde format,
//! then turned into a classifier with [`ClassifierParams::build`].

use crate::core::sdr_classifier::SDRClassifier;
use crate::error::{ClassifierError, Result};
use serde::{Deserialize, Serialize};

/// Largest prediction step. Steps double as positive `ClassifierResult` keys.
pub const MAX_STEP: u32 = i32::MAX as u32 - 1;

/// Construction parameters of an `SDRClassifier`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierParams {
    /// Prediction horizons, strictly ascending. Include `0` for same-step classification.
    pub steps: Vec<u32>,

    /// Learning rate for weight updates.
    pub alpha: f64,

    /// Smoothing rate of the rolling actual value per bucket.
    pub act_value_alpha: f64,

    /// Diagnostic level: 0 silent, 1 lifecycle events, 2 every record.
    pub verbosity: u32,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            steps: vec![1],
            alpha: 0.001,
            act_value_alpha: 0.3,
            verbosity: 0,
        }
    }
}

impl ClassifierParams {
    /// Checks that the step list is non-empty, strictly ascending and at most `MAX_STEP`,
    /// and that both rates lie in (0, 1].
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(ClassifierError::InvalidParams(
                "at least one prediction step is required".into(),
            ));
        }

        if self.steps.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ClassifierError::InvalidParams(format!(
                "steps must be distinct and ascending, got {:?}",
                self.steps
            )));
        }

        if let Some(&step) = self.steps.iter().find(|&&step| step > MAX_STEP) {
            return Err(ClassifierError::InvalidParams(format!(
                "step {step} exceeds the largest supported step {MAX_STEP}"
            )));
        }

        for (name, rate) in [("alpha", self.alpha), ("act_value_alpha", self.act_value_alpha)] {
            if !(rate > 0.0 && rate <= 1.0) {
                return Err(ClassifierError::InvalidParams(format!(
                    "{name} must be in (0, 1], got {rate}"
                )));
            }
        }

        Ok(())
    }

    /// Validates the parameters and constructs a fresh classifier.
    pub fn build(&self) -> Result<SDRClassifier> {
        SDRClassifier::new(
            self.steps.clone(),
            self.alpha,
            self.act_value_alpha,
            self.verbosity,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        assert!(ClassifierParams::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_steps() {
        let params = ClassifierParams {
            steps: vec![],
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ClassifierError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_rejects_unsorted_or_duplicate_steps() {
        for steps in [vec![2, 1], vec![0, 0, 1]] {
            let params = ClassifierParams {
                steps,
                ..Default::default()
            };
            assert!(params.validate().is_err());
        }
    }

    #[test]
    fn test_rejects_steps_beyond_result_keys() {
        for steps in [vec![0, u32::MAX], vec![i32::MAX as u32]] {
            let params = ClassifierParams {
                steps,
                ..Default::default()
            };
            assert!(matches!(
                params.validate(),
                Err(ClassifierError::InvalidParams(_))
            ));
        }

        let largest = ClassifierParams {
            steps: vec![0, MAX_STEP],
            ..Default::default()
        };
        let classifier = largest.build().unwrap();
        assert_eq!(classifier.max_steps(), MAX_STEP + 1);
    }

    #[test]
    fn test_rejects_rates_out_of_range() {
        let zero_alpha = ClassifierParams {
            alpha: 0.0,
            ..Default::default()
        };
        let large_beta = ClassifierParams {
            act_value_alpha: 1.5,
            ..Default::default()
        };
        let nan_alpha = ClassifierParams {
            alpha: f64::NAN,
            ..Default::default()
        };
        assert!(zero_alpha.validate().is_err());
        assert!(large_beta.validate().is_err());
        assert!(nan_alpha.validate().is_err());
    }

    #[test]
    fn test_build_uses_params() {
        let params = ClassifierParams {
            steps: vec![0, 1, 5],
            alpha: 0.1,
            act_value_alpha: 0.2,
            verbosity: 1,
        };
        let classifier = params.build().unwrap();
        assert_eq!(classifier.steps(), &[0, 1, 5]);
        assert_eq!(classifier.max_steps(), 6);
        assert_eq!(classifier.verbosity(), 1);
    }

    #[test]
    fn test_params_roundtrip_through_bincode() {
        let params = ClassifierParams {
            steps: vec![0, 3],
            alpha: 0.05,
            act_value_alpha: 0.5,
            verbosity: 2,
        };
        let bytes = bincode::serialize(&params).unwrap();
        let decoded: ClassifierParams = bincode::deserialize(&bytes).unwrap();
        assert_eq!(params, decoded);
    }
}
