mod activation;
mod loss;
mod optimizer;

pub mod config;
pub mod dataset;
pub mod error;
pub mod harness;
pub mod hyperparameters;
pub mod layers;
pub mod model;
pub mod split;
pub mod tuner;
pub mod workshop;

pub use activation::ActivationType;
pub use config::{HarnessConfig, Objective, TunerConfig};
pub use dataset::{Frame, Labels};
pub use error::{Error, Result};
pub use harness::{Check, Exercise, Harness, Mismatch, Report};
pub use hyperparameters::{Domain, HyperParameters, Value};
pub use layers::{DenseLayer, Layer, Regularizer, WeightInitStrategy};
pub use loss::Loss;
pub use model::{Evaluation, FitOptions, History, LayerConfig, Model};
pub use optimizer::Optimizer;
pub use split::{train_test_split, Split};
pub use tuner::{HyperModel, Hyperband, SearchData, Trial};
pub use workshop::{ConnectFourHyperModel, Workshop};
