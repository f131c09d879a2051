use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::activation::ActivationType;
use crate::error::{Error, Result};
use crate::layers::{DenseLayer, Layer, Regularizer, WeightInitStrategy};
use crate::loss::Loss;
use crate::optimizer::Optimizer;

const SUMMARY_WIDTH: usize = 65;

#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    pub inputs: usize,
    pub layers: Vec<Box<dyn Layer>>,
    pub loss: Loss,
    pub optimizer: Optimizer,
}

#[derive(Debug, Clone, Copy)]
pub struct LayerConfig {
    pub neurons: usize,
    pub activation: ActivationType,
    pub regularizer: Option<Regularizer>,
}

impl LayerConfig {
    pub fn dense(neurons: usize, activation: ActivationType) -> Self {
        Self {
            neurons,
            activation,
            regularizer: None,
        }
    }

    pub fn with_regularizer(mut self, regularizer: Regularizer) -> Self {
        self.regularizer = Some(regularizer);
        self
    }
}

/// Loss and accuracy over a dataset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub loss: f32,
    pub accuracy: f32,
}

/// Metrics recorded at the end of one epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub loss: f32,
    pub accuracy: f32,
    pub validation: Option<Evaluation>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    pub epochs: Vec<EpochMetrics>,
}

/// Options for `Model::fit`
#[derive(Debug, Clone, Copy)]
pub struct FitOptions<'a> {
    /// Epoch to resume from, for warm-started training
    pub initial_epoch: usize,
    /// Epoch index at which training stops (exclusive)
    pub epochs: usize,
    pub batch_size: usize,
    pub validation: Option<(ArrayView2<'a, f32>, ArrayView1<'a, usize>)>,
}

impl Model {
    /// Create a new sequential model with the given dense layer configurations
    ///
    /// # Arguments
    ///
    /// * `inputs` - Number of input features
    /// * `layer_configs` - Layers from input to output; each takes the previous width as input
    /// * `rng` - Source of the initial weights
    pub fn new(
        inputs: usize,
        layer_configs: &[LayerConfig],
        loss: Loss,
        optimizer: Optimizer,
        rng: &mut StdRng,
    ) -> Result<Self> {
        if layer_configs.is_empty() {
            return Err(Error::InvalidLayer("a model needs at least one layer".to_string()));
        }

        let mut layers: Vec<Box<dyn Layer>> = Vec::with_capacity(layer_configs.len());
        let mut width = inputs;
        for config in layer_configs {
            let layer = DenseLayer::new(
                width,
                config.neurons,
                config.activation,
                config.regularizer,
                WeightInitStrategy::Xavier,
                rng,
            )?;
            width = config.neurons;
            layers.push(Box::new(layer));
        }

        Ok(Model {
            name: "sequential".to_string(),
            inputs,
            layers,
            loss,
            optimizer,
        })
    }

    /// Width of the output layer
    pub fn outputs(&self) -> usize {
        self.layers.last().map_or(self.inputs, |layer| layer.params().neurons)
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.parameter_count()).sum()
    }

    pub fn forward(&mut self, input: &Array2<f32>) -> Array2<f32> {
        let mut current = input.clone();
        for layer in &mut self.layers {
            current = layer.forward(&current);
        }
        current
    }

    /// Class probabilities for each row of `input`, without touching training caches
    pub fn predict(&self, input: ArrayView2<f32>) -> Array2<f32> {
        let mut current = input.to_owned();
        for layer in &self.layers {
            current = layer.infer(&current);
        }
        current
    }

    fn regularization_loss(&self) -> f32 {
        self.layers.iter().map(|layer| layer.regularization_loss()).sum()
    }

    fn check_shapes(&self, x: ArrayView2<f32>, y: ArrayView1<usize>) -> Result<()> {
        if x.ncols() != self.inputs {
            return Err(Error::ShapeMismatch {
                a: "input columns",
                b: "model inputs",
                got: x.ncols(),
                expected: self.inputs,
            });
        }
        if x.nrows() != y.len() {
            return Err(Error::ShapeMismatch {
                a: "labels",
                b: "input rows",
                got: y.len(),
                expected: x.nrows(),
            });
        }
        let classes = self.outputs();
        if let Some(&label) = y.iter().find(|&&label| label >= classes) {
            return Err(Error::ShapeMismatch {
                a: "label",
                b: "output classes",
                got: label,
                expected: classes,
            });
        }
        Ok(())
    }

    /// Runs one optimizer step on a batch and returns its loss (regularization included)
    /// and the number of correctly classified rows
    pub fn train_batch(&mut self, x: &Array2<f32>, y: ArrayView1<usize>) -> Result<(f32, usize)> {
        self.check_shapes(x.view(), y)?;

        let output = self.forward(x);
        let loss = self.loss.calculate(output.view(), y) + self.regularization_loss();
        let correct = count_correct(output.view(), y);

        let mut grad = self.loss.gradient(output.view(), y);
        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(&grad);
        }
        self.optimizer.step(&mut self.layers);

        Ok((loss, correct))
    }

    /// Trains with mini-batches, reshuffling the rows every epoch
    pub fn fit(
        &mut self,
        x: ArrayView2<f32>,
        y: ArrayView1<usize>,
        options: FitOptions,
        rng: &mut StdRng,
    ) -> Result<History> {
        self.check_shapes(x, y)?;
        if let Some((x_val, y_val)) = options.validation {
            self.check_shapes(x_val, y_val)?;
        }
        if options.batch_size == 0 {
            return Err(Error::InvalidLayer("batch size must be positive".to_string()));
        }

        let mut history = History::default();
        let mut order: Vec<usize> = (0..x.nrows()).collect();

        for epoch in options.initial_epoch..options.epochs {
            order.shuffle(rng);
            let mut weighted_loss = 0.0;
            let mut correct = 0;

            for chunk in order.chunks(options.batch_size) {
                let xb = x.select(Axis(0), chunk);
                let yb = y.select(Axis(0), chunk);
                let (loss, batch_correct) = self.train_batch(&xb, yb.view())?;
                weighted_loss += loss * chunk.len() as f32;
                correct += batch_correct;
            }

            let samples = x.nrows().max(1) as f32;
            let validation = match options.validation {
                Some((x_val, y_val)) => Some(self.evaluate(x_val, y_val)?),
                None => None,
            };
            let metrics = EpochMetrics {
                epoch,
                loss: weighted_loss / samples,
                accuracy: correct as f32 / samples,
                validation,
            };
            debug!(
                epoch = epoch + 1,
                of = options.epochs,
                loss = metrics.loss,
                accuracy = metrics.accuracy,
                val_accuracy = validation.map(|v| v.accuracy),
                "Epoch finished"
            );
            history.epochs.push(metrics);
        }

        Ok(history)
    }

    pub fn evaluate(&self, x: ArrayView2<f32>, y: ArrayView1<usize>) -> Result<Evaluation> {
        self.check_shapes(x, y)?;

        let output = self.predict(x);
        let loss = self.loss.calculate(output.view(), y) + self.regularization_loss();
        let accuracy = count_correct(output.view(), y) as f32 / y.len().max(1) as f32;

        Ok(Evaluation { loss, accuracy })
    }

    /// Layer-by-layer structural summary in the Keras text layout
    pub fn summary(&self) -> String {
        let rule = "_".repeat(SUMMARY_WIDTH);
        let double_rule = "=".repeat(SUMMARY_WIDTH);
        let mut lines = vec![
            format!("Model: \"{}\"", self.name),
            rule.clone(),
            summary_row("Layer (type)", "Output Shape", "Param #"),
            double_rule.clone(),
        ];

        let mut counts: std::collections::HashMap<&'static str, usize> = Default::default();
        for layer in &self.layers {
            let type_name = layer.type_name();
            let seen = counts.entry(type_name).or_default();
            let base = type_name.to_lowercase();
            let name = if *seen == 0 { base } else { format!("{base}_{seen}") };
            *seen += 1;

            lines.push(summary_row(
                &format!("{name} ({type_name})"),
                &format!("(None, {})", layer.params().neurons),
                &layer.parameter_count().to_string(),
            ));
        }

        let total = group_thousands(self.parameter_count());
        lines.push(double_rule);
        lines.push(format!("Total params: {total}"));
        lines.push(format!("Trainable params: {total}"));
        lines.push("Non-trainable params: 0".to_string());
        lines.push(rule);

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

fn summary_row(layer: &str, shape: &str, params: &str) -> String {
    format!(" {layer:<28}{shape:<26}{params}")
}

fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn count_correct(output: ArrayView2<f32>, y: ArrayView1<usize>) -> usize {
    output
        .outer_iter()
        .zip(y.iter())
        .filter(|(row, label)| argmax(row.iter().copied()) == **label)
        .count()
}

fn argmax(values: impl Iterator<Item = f32>) -> usize {
    let mut best = (0, f32::NEG_INFINITY);
    for (i, v) in values.enumerate() {
        if v > best.1 {
            best = (i, v);
        }
    }
    best.0
}
