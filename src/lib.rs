//! Multi-step SDR classifier for Hierarchical Temporal Memory (HTM).
//!
//! The classifier takes the sparse output of an HTM layer (the indices of active bits),
//! learns online which bucket of an encoded scalar tends to follow each pattern, and predicts
//! a probability distribution over buckets for several steps into the future.

pub mod config;
pub mod core;
pub mod error;

pub use crate::config::ClassifierParams;
pub use crate::core::classifier_result::{ClassifierResult, ACTUAL_VALUES_KEY};
pub use crate::core::sdr_classifier::SDRClassifier;
pub use crate::core::serialization::{SdrClassifierProto, StepWeightMatrixProto};
pub use crate::error::{ClassifierError, Result};
