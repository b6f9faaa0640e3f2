//! This example demonstrates how to use the SDR Classifier for multi-step prediction of a noisy
//! sine wave. Each value is quantized into a bucket, and the bucket is encoded as a small block of
//! contiguous active bits, standing in for the output of an HTM layer.
//!
//! The classifier learns to predict the bucket 1 and 5 steps ahead. After training, the state is
//! saved, restored, and the restored classifier is evaluated on fresh data.
//!
//! Run with `RUST_LOG=debug` to see the classifier's own diagnostics.

use anyhow::{ensure, Context, Result};
use htm_classifier::{ClassifierParams, ClassifierResult, SDRClassifier};
use rand::Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;

const NUM_BUCKETS: usize = 20;
const BITS_PER_BUCKET: usize = 8;
const PERIOD: f64 = 40.0;

/// Quantizes a value in [-1, 1] into a bucket index.
fn bucket_of(value: f64) -> usize {
    let scaled = (value + 1.0) / 2.0 * (NUM_BUCKETS - 1) as f64;
    scaled.round().clamp(0.0, (NUM_BUCKETS - 1) as f64) as usize
}

/// Encodes a bucket as a block of active bits that overlaps its neighbours.
fn encode(bucket: usize) -> Vec<usize> {
    let start = bucket * BITS_PER_BUCKET / 2;
    (start..start + BITS_PER_BUCKET).collect()
}

fn sample(t: u32, noise: f64) -> f64 {
    (t as f64 * 2.0 * std::f64::consts::PI / PERIOD).sin() + noise
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let params = ClassifierParams {
        steps: vec![1, 5],
        alpha: 0.1,
        act_value_alpha: 0.3,
        verbosity: 1,
    };
    let mut classifier = params.build().context("building classifier")?;
    let mut result = ClassifierResult::new();
    let mut rng = rand::rng();

    let training_len = 4_000;
    info!(training_len, "training classifier on noisy sine wave");

    for t in 0..training_len {
        let value = sample(t, rng.random_range(-0.02..0.02)).clamp(-1.0, 1.0);
        let bucket = bucket_of(value);
        classifier.compute(t, &encode(bucket), bucket, value, false, true, false, &mut result)?;
    }

    let mut saved = Vec::new();
    classifier.save(&mut saved)?;
    info!(bytes = saved.len(), "saved classifier state");

    let mut restored = SDRClassifier::new(vec![1], 0.1, 0.3, 0)?;
    restored.load(saved.as_slice())?;
    ensure!(restored == classifier, "restored classifier differs from the original");

    let testing_len = 400;
    let mut correct = [0usize; 2];
    let mut history: Vec<usize> = Vec::new();
    let mut predictions: Vec<[usize; 2]> = Vec::new();

    for t in training_len..training_len + testing_len {
        let value = sample(t, 0.0);
        let bucket = bucket_of(value);
        restored.compute(t, &encode(bucket), bucket, value, false, false, true, &mut result)?;

        let one = result.most_probable(1).map(|(b, _)| b).unwrap_or(0);
        let five = result.most_probable(5).map(|(b, _)| b).unwrap_or(0);
        predictions.push([one, five]);
        history.push(bucket);
    }

    for (i, &[one, five]) in predictions.iter().enumerate() {
        if history.get(i + 1) == Some(&one) {
            correct[0] += 1;
        }
        if history.get(i + 5) == Some(&five) {
            correct[1] += 1;
        }
    }

    println!(
        "1-step accuracy: {:.2}% ({} predictions)",
        100.0 * correct[0] as f64 / (testing_len - 1) as f64,
        testing_len - 1
    );
    println!(
        "5-step accuracy: {:.2}% ({} predictions)",
        100.0 * correct[1] as f64 / (testing_len - 5) as f64,
        testing_len - 5
    );

    if let Some(values) = result.actual_values() {
        println!("Bucket actual values: {:.3?}", values);
    }

    Ok(())
}
