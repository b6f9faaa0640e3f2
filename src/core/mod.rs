pub mod classifier_result;
pub mod matrix;
pub mod sdr_classifier;
pub mod serialization;
