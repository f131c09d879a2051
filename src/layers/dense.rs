use crate::activation::ActivationType;
use crate::error::{Error, Result};
use crate::layers::Layer;
use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use super::{LayerParams, Regularizer, WeightInitStrategy};

/// Fully-connected layer computing `activation(x · W + b)`
#[derive(Debug, Clone)]
pub struct DenseLayer {
    pub params: LayerParams,
}

impl DenseLayer {
    pub fn new<R: Rng + ?Sized>(
        inputs: usize,
        neurons: usize,
        activation: ActivationType,
        regularizer: Option<Regularizer>,
        weight_init: WeightInitStrategy,
        rng: &mut R,
    ) -> Result<Self> {
        if inputs == 0 || neurons == 0 {
            return Err(Error::InvalidLayer(format!(
                "dense layer needs at least one input and one neuron, got {inputs} × {neurons}"
            )));
        }

        let shape = (inputs, neurons);
        let weights: Array2<f32> = match weight_init {
            WeightInitStrategy::Xavier => {
                let limit = (6.0 / (inputs + neurons) as f32).sqrt();
                let dist = Uniform::new_inclusive(-limit, limit)
                    .map_err(|e| Error::InvalidLayer(e.to_string()))?;
                Array2::from_shape_fn(shape, |_| dist.sample(rng))
            }
            WeightInitStrategy::HeNormal => {
                let std_dev = (2.0 / inputs as f32).sqrt();
                let dist = Normal::new(0.0, std_dev)
                    .map_err(|e| Error::InvalidLayer(e.to_string()))?;
                Array2::from_shape_fn(shape, |_| dist.sample(rng))
            }
        };

        let params = LayerParams {
            neurons,
            inputs,
            weights,
            bias: Array1::zeros(neurons),
            activation,
            regularizer,
            weight_grads: Array2::zeros(shape),
            bias_grads: Array1::zeros(neurons),
            input_cache: Array2::zeros((0, inputs)),
            preactivation_cache: Array2::zeros((0, neurons)),
        };

        Ok(DenseLayer { params })
    }

    fn preactivation(&self, input: &Array2<f32>) -> Array2<f32> {
        assert_eq!(input.ncols(), self.params.inputs, "Input size does not match layer's input size");
        input.dot(&self.params.weights) + &self.params.bias
    }
}

impl Layer for DenseLayer {
    fn forward(&mut self, input: &Array2<f32>) -> Array2<f32> {
        let z = self.preactivation(input);
        self.params.input_cache = input.clone();
        self.params.preactivation_cache = z.clone();
        self.params.activation.forward(z)
    }

    fn infer(&self, input: &Array2<f32>) -> Array2<f32> {
        self.params.activation.forward(self.preactivation(input))
    }

    fn backward(&mut self, grad_output: &Array2<f32>) -> Array2<f32> {
        // Softmax outputs already receive the gradient w.r.t. their logits
        let delta = match self.params.activation {
            ActivationType::Softmax => grad_output.clone(),
            activation => {
                let mut delta = grad_output.clone();
                delta.zip_mut_with(&self.params.preactivation_cache, |d, &z| {
                    *d *= activation.derivative(z)
                });
                delta
            }
        };

        let mut weight_grads = self.params.input_cache.t().dot(&delta);
        if let Some(regularizer) = self.params.regularizer {
            weight_grads += &regularizer.gradient(&self.params.weights);
        }
        self.params.weight_grads = weight_grads;
        self.params.bias_grads = delta.sum_axis(Axis(0));

        delta.dot(&self.params.weights.t())
    }

    fn clone_box(&self) -> Box<dyn Layer> {
        Box::new(self.clone())
    }

    fn params(&self) -> &LayerParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut LayerParams {
        &mut self.params
    }

    fn type_name(&self) -> &'static str {
        "Dense"
    }
}
