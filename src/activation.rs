use ndarray::{Array2, Axis};

/// Enum representing different activation function types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationType {
    ReLU,
    Softmax,
    Linear,
}

impl ActivationType {
    /// Applies the activation to a batch of pre-activations (one row per sample)
    pub fn forward(&self, mut z: Array2<f32>) -> Array2<f32> {
        match self {
            ActivationType::ReLU => {
                z.mapv_inplace(|x| x.max(0.0));
                z
            }
            ActivationType::Softmax => {
                for mut row in z.axis_iter_mut(Axis(0)) {
                    let max = row.fold(f32::NEG_INFINITY, |m, &x| m.max(x));
                    row.mapv_inplace(|x| (x - max).exp());
                    let sum = row.sum();
                    row.mapv_inplace(|x| x / sum);
                }
                z
            }
            ActivationType::Linear => z,
        }
    }

    /// Computes the elementwise derivative of the activation function.
    ///
    /// Softmax has no elementwise derivative; its gradient is folded into the loss.
    pub fn derivative(&self, x: f32) -> f32 {
        match self {
            ActivationType::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationType::Softmax | ActivationType::Linear => 1.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActivationType::ReLU => "relu",
            ActivationType::Softmax => "softmax",
            ActivationType::Linear => "linear",
        }
    }
}
