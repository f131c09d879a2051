//! Configuration for the workshop pipeline.
//!
//! Every default reproduces the workshop exercise: the published Connect-4 CSV,
//! an 80/20 split with seed 42 and a Hyperband search capped at five epochs with
//! seed 8.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Location of the Connect-4 dataset used by the exercise.
pub const DEFAULT_FILE_URL: &str = "https://raw.githubusercontent.com/PacktWorkshops/The-TensorFlow-Workshop/master/Chapter06/dataset/connect-4.csv";

/// Pipeline configuration shared by the reference run and exercise implementations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// URL or path of the CSV file.
    pub file_url: String,
    /// Name of the label column removed from the dataset.
    pub label_column: String,
    /// Fraction of rows held out for evaluation.
    pub test_size: f64,
    /// Seed of the train/test permutation.
    pub split_seed: u64,
    pub tuner: TunerConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            file_url: DEFAULT_FILE_URL.to_string(),
            label_column: "class".to_string(),
            test_size: 0.2,
            split_seed: 42,
            tuner: TunerConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

/// Metric a tuner optimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    ValAccuracy,
    ValLoss,
}

impl Objective {
    pub fn name(&self) -> &'static str {
        match self {
            Objective::ValAccuracy => "val_accuracy",
            Objective::ValLoss => "val_loss",
        }
    }

    /// Whether `a` is a strictly better score than `b`.
    pub fn is_better(&self, a: f32, b: f32) -> bool {
        match self {
            Objective::ValAccuracy => a > b,
            Objective::ValLoss => a < b,
        }
    }
}

/// Hyperband budget and seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub objective: Objective,
    /// Maximum number of epochs any single model is trained for.
    pub max_epochs: usize,
    /// Reduction factor between successive-halving rounds.
    pub factor: usize,
    /// Number of times the full set of brackets is run.
    pub hyperband_iterations: usize,
    pub batch_size: usize,
    /// Seed for sampling, weight initialization and shuffling.
    pub seed: u64,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            objective: Objective::ValAccuracy,
            max_epochs: 5,
            factor: 3,
            hyperband_iterations: 1,
            batch_size: 32,
            seed: 8,
        }
    }
}
