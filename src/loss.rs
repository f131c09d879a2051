use ndarray::{Array2, ArrayView1, ArrayView2};

const EPSILON: f32 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    /// Cross entropy against integer class ids.
    SparseCategoricalCrossentropy,
}

impl Loss {
    /// Mean loss over the batch; `predictions` holds one probability row per sample.
    pub fn calculate(&self, predictions: ArrayView2<f32>, labels: ArrayView1<usize>) -> f32 {
        match self {
            Loss::SparseCategoricalCrossentropy => {
                if labels.is_empty() {
                    return 0.0;
                }
                let total: f32 = predictions
                    .outer_iter()
                    .zip(labels.iter())
                    .map(|(row, &label)| -row[label].clamp(EPSILON, 1.0 - EPSILON).ln())
                    .sum();
                total / labels.len() as f32
            }
        }
    }

    /// Gradient of the mean loss w.r.t. the logits feeding a softmax output.
    pub fn gradient(&self, predictions: ArrayView2<f32>, labels: ArrayView1<usize>) -> Array2<f32> {
        match self {
            Loss::SparseCategoricalCrossentropy => {
                let n = labels.len().max(1) as f32;
                let mut grad = predictions.to_owned();
                for (mut row, &label) in grad.outer_iter_mut().zip(labels.iter()) {
                    row[label] -= 1.0;
                }
                grad / n
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_sparse_categorical_crossentropy() {
        let p = array![[0.5, 0.25, 0.25], [0.1, 0.8, 0.1]];
        let y = array![0, 1];

        let loss = Loss::SparseCategoricalCrossentropy.calculate(p.view(), y.view());
        let expected = -(0.5f32.ln() + 0.8f32.ln()) / 2.0;
        assert!((loss - expected).abs() < 1e-6);
    }

    #[test]
    fn test_loss_is_clipped() {
        let p = array![[0.0, 1.0]];
        let y = array![0];

        let loss = Loss::SparseCategoricalCrossentropy.calculate(p.view(), y.view());
        assert!(loss.is_finite());
        assert!((loss + EPSILON.ln()).abs() < 1e-3);
    }

    #[test]
    fn test_gradient() {
        let p = array![[0.5, 0.25, 0.25], [0.1, 0.8, 0.1]];
        let y = array![2, 1];

        let grad = Loss::SparseCategoricalCrossentropy.gradient(p.view(), y.view());
        let expected = array![[0.25, 0.125, -0.375], [0.05, -0.1, 0.05]];
        for (g, e) in grad.iter().zip(expected.iter()) {
            assert!((g - e).abs() < 1e-6, "got {g}, expected {e}");
        }
    }
}
