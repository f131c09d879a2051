use ndarray::{Array1, Array2};

use crate::layers::Layer;

/// Adam with Keras' default moments and epsilon
#[derive(Debug, Clone)]
pub struct Optimizer {
    pub learning_rate: f32,
    pub beta_1: f32,
    pub beta_2: f32,
    pub epsilon: f32,
    iterations: u64,
    slots: Vec<Slots>,
}

#[derive(Debug, Clone)]
struct Slots {
    m_weights: Array2<f32>,
    v_weights: Array2<f32>,
    m_bias: Array1<f32>,
    v_bias: Array1<f32>,
}

impl Optimizer {
    pub fn adam(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta_1: 0.9,
            beta_2: 0.999,
            epsilon: 1e-7,
            iterations: 0,
            slots: Vec::new(),
        }
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Drops the moment estimates and the step count, keeping the hyperparameters
    pub fn reset(&mut self) {
        self.iterations = 0;
        self.slots.clear();
    }

    /// Applies one update using the gradients currently stored in each layer
    pub fn step(&mut self, layers: &mut [Box<dyn Layer>]) {
        if self.slots.len() != layers.len() {
            self.slots = layers
                .iter()
                .map(|layer| {
                    let params = layer.params();
                    Slots {
                        m_weights: Array2::zeros(params.weights.raw_dim()),
                        v_weights: Array2::zeros(params.weights.raw_dim()),
                        m_bias: Array1::zeros(params.bias.raw_dim()),
                        v_bias: Array1::zeros(params.bias.raw_dim()),
                    }
                })
                .collect();
        }

        self.iterations += 1;
        let t = self.iterations as i32;
        let lr_t = self.learning_rate * (1.0 - self.beta_2.powi(t)).sqrt() / (1.0 - self.beta_1.powi(t));
        let (beta_1, beta_2, epsilon) = (self.beta_1, self.beta_2, self.epsilon);

        for (layer, slots) in layers.iter_mut().zip(self.slots.iter_mut()) {
            let params = layer.params_mut();

            slots.m_weights.zip_mut_with(&params.weight_grads, |m, &g| *m = beta_1 * *m + (1.0 - beta_1) * g);
            slots.v_weights.zip_mut_with(&params.weight_grads, |v, &g| *v = beta_2 * *v + (1.0 - beta_2) * g * g);
            ndarray::Zip::from(&mut params.weights)
                .and(&slots.m_weights)
                .and(&slots.v_weights)
                .for_each(|w, &m, &v| *w -= lr_t * m / (v.sqrt() + epsilon));

            slots.m_bias.zip_mut_with(&params.bias_grads, |m, &g| *m = beta_1 * *m + (1.0 - beta_1) * g);
            slots.v_bias.zip_mut_with(&params.bias_grads, |v, &g| *v = beta_2 * *v + (1.0 - beta_2) * g * g);
            ndarray::Zip::from(&mut params.bias)
                .and(&slots.m_bias)
                .and(&slots.v_bias)
                .for_each(|b, &m, &v| *b -= lr_t * m / (v.sqrt() + epsilon));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationType;
    use crate::layers::{DenseLayer, WeightInitStrategy};
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = DenseLayer::new(2, 1, ActivationType::Linear, None, WeightInitStrategy::Xavier, &mut rng).unwrap();
        let mut layers: Vec<Box<dyn Layer>> = vec![Box::new(layer)];
        let before = layers[0].params().weights.clone();
        layers[0].params_mut().weight_grads.fill(0.5);
        layers[0].params_mut().bias_grads.fill(-2.0);

        let mut optimizer = Optimizer::adam(0.01);
        optimizer.step(&mut layers);

        // The bias-corrected first Adam step is ±lr regardless of gradient scale
        let params = layers[0].params();
        for (w, b) in params.weights.iter().zip(before.iter()) {
            assert!((b - w - 0.01).abs() < 1e-5);
        }
        assert!((params.bias[0] - 0.01).abs() < 1e-5);
        assert_eq!(optimizer.iterations(), 1);

        optimizer.reset();
        assert_eq!(optimizer.iterations(), 0);
        assert!(optimizer.slots.is_empty());
        assert_eq!(optimizer.learning_rate, 0.01);
    }
}
