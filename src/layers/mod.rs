pub mod dense;

use std::fmt::Debug;
use ndarray::{Array1, Array2};
use crate::activation::ActivationType;

/// Kernel regularization applied on top of the data loss
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Regularizer {
    L2(f32),
}

impl Regularizer {
    /// Penalty added to the reported loss
    pub fn penalty(&self, weights: &Array2<f32>) -> f32 {
        match self {
            Regularizer::L2(l2) => l2 * weights.mapv(|w| w * w).sum(),
        }
    }

    /// Gradient of the penalty w.r.t. the weights
    pub fn gradient(&self, weights: &Array2<f32>) -> Array2<f32> {
        match self {
            Regularizer::L2(l2) => weights * (2.0 * l2),
        }
    }
}

/// Weight initialization strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightInitStrategy {
    /// Glorot/Xavier uniform initialization
    #[default]
    Xavier,

    /// He initialization (good for ReLU networks)
    HeNormal,
}

#[derive(Debug, Clone)]
pub struct LayerParams {
    pub neurons: usize,
    pub inputs: usize,
    /// Kernel of shape (inputs × neurons)
    pub weights: Array2<f32>,
    pub bias: Array1<f32>,
    pub activation: ActivationType,
    pub regularizer: Option<Regularizer>,
    pub weight_grads: Array2<f32>,
    pub bias_grads: Array1<f32>,
    pub input_cache: Array2<f32>,
    pub preactivation_cache: Array2<f32>,
}

pub trait Layer: Debug {
    /// Forward pass over a batch, caching what `backward` needs
    fn forward(&mut self, input: &Array2<f32>) -> Array2<f32>;

    /// Forward pass without touching the caches
    fn infer(&self, input: &Array2<f32>) -> Array2<f32>;

    /// Stores parameter gradients and returns the gradient w.r.t. the layer input
    fn backward(&mut self, grad_output: &Array2<f32>) -> Array2<f32>;

    fn clone_box(&self) -> Box<dyn Layer>;

    fn params(&self) -> &LayerParams;
    fn params_mut(&mut self) -> &mut LayerParams;

    /// Keras-style class name shown in model summaries
    fn type_name(&self) -> &'static str;

    fn parameter_count(&self) -> usize {
        let params = self.params();
        params.weights.len() + params.bias.len()
    }

    fn regularization_loss(&self) -> f32 {
        let params = self.params();
        params
            .regularizer
            .map_or(0.0, |r| r.penalty(&params.weights))
    }
}

impl Clone for Box<dyn Layer> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

pub use dense::DenseLayer;
