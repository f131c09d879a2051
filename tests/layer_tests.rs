use connect4_tuner::{ActivationType, DenseLayer, Layer, Regularizer, WeightInitStrategy};
use ndarray::{array, Array2};
use rand::{rngs::StdRng, SeedableRng};

fn layer(inputs: usize, neurons: usize, activation: ActivationType) -> DenseLayer {
    DenseLayer::new(
        inputs,
        neurons,
        activation,
        None,
        WeightInitStrategy::Xavier,
        &mut StdRng::seed_from_u64(8),
    )
    .unwrap()
}

#[test]
fn test_layer_initialization() {
    let layer = layer(3, 4, ActivationType::ReLU);
    let params = layer.params();

    assert_eq!(params.inputs, 3);
    assert_eq!(params.neurons, 4);
    assert_eq!(params.weights.dim(), (3, 4));
    assert_eq!(params.bias, ndarray::Array1::<f32>::zeros(4));

    // Glorot uniform bounds
    let limit = (6.0f32 / 7.0).sqrt();
    assert!(params.weights.iter().all(|w| w.abs() <= limit));
}

#[test]
fn test_forward_propagate() {
    let mut layer = layer(3, 2, ActivationType::ReLU);

    let output = layer.forward(&array![[1.0, 2.0, 3.0], [-1.0, 0.5, 0.0]]);

    assert_eq!(output.dim(), (2, 2));
    assert!(output.iter().all(|&v| v >= 0.0));
    let inferred = layer.infer(&array![[1.0, 2.0, 3.0]]);
    for (a, b) in inferred.row(0).iter().zip(output.row(0).iter()) {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
#[should_panic(expected = "Input size does not match layer's input size")]
fn test_forward_propagate_invalid_input_size() {
    let mut layer = layer(3, 2, ActivationType::ReLU);
    layer.forward(&array![[1.0, 2.0]]);
}

#[test]
fn test_empty_layer_is_rejected() {
    let result = DenseLayer::new(
        0,
        4,
        ActivationType::ReLU,
        None,
        WeightInitStrategy::Xavier,
        &mut StdRng::seed_from_u64(0),
    );
    assert!(result.is_err());
}

#[test]
fn test_parameter_count() {
    let layer = layer(3, 4, ActivationType::ReLU);
    assert_eq!(layer.parameter_count(), 3 * 4 + 4);
}

#[test]
fn test_weight_initialization_strategies() {
    for strategy in [WeightInitStrategy::Xavier, WeightInitStrategy::HeNormal] {
        let layer = DenseLayer::new(
            3,
            4,
            ActivationType::ReLU,
            None,
            strategy,
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();

        assert!(
            layer.params().weights.iter().any(|&w| w != 0.0),
            "Failed with strategy: {:?}",
            strategy
        );
    }
}

#[test]
fn test_same_seed_same_weights() {
    let a = layer(5, 3, ActivationType::ReLU);
    let b = layer(5, 3, ActivationType::ReLU);
    assert_eq!(a.params().weights, b.params().weights);
}

#[test]
fn test_backward_gradients() {
    let mut layer = DenseLayer::new(
        3,
        2,
        ActivationType::Linear,
        Some(Regularizer::L2(0.5)),
        WeightInitStrategy::Xavier,
        &mut StdRng::seed_from_u64(3),
    )
    .unwrap();
    let input = array![[1.0, 2.0, 3.0], [0.0, -1.0, 1.0]];
    let grad_output = array![[1.0, -1.0], [0.5, 2.0]];

    layer.forward(&input);
    let grad_input = layer.backward(&grad_output);

    let weights = layer.params().weights.clone();
    let expected_weight_grads: Array2<f32> = input.t().dot(&grad_output) + &weights * 1.0;
    assert!(layer
        .params()
        .weight_grads
        .iter()
        .zip(expected_weight_grads.iter())
        .all(|(a, b)| (a - b).abs() < 1e-5));
    assert_eq!(layer.params().bias_grads, array![1.5, 1.0]);
    assert_eq!(grad_input, grad_output.dot(&weights.t()));
}

#[test]
fn test_relu_blocks_gradient_of_inactive_units() {
    let mut layer = layer(2, 3, ActivationType::ReLU);
    layer.params_mut().weights.fill(-1.0);

    layer.forward(&array![[1.0, 1.0]]);
    let grad_input = layer.backward(&array![[1.0, 1.0, 1.0]]);

    assert!(grad_input.iter().all(|&g| g == 0.0));
    assert!(layer.params().weight_grads.iter().all(|&g| g == 0.0));
}

#[test]
fn test_regularization_loss() {
    let mut layer = DenseLayer::new(
        2,
        1,
        ActivationType::Linear,
        Some(Regularizer::L2(0.1)),
        WeightInitStrategy::Xavier,
        &mut StdRng::seed_from_u64(0),
    )
    .unwrap();
    layer.params_mut().weights = array![[1.0], [2.0]];

    assert!((layer.regularization_loss() - 0.5).abs() < 1e-6);
}
