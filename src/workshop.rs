//! The Connect-4 tuning exercise: load, split, search, rebuild.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::activation::ActivationType;
use crate::config::HarnessConfig;
use crate::dataset::{self, Frame, Labels};
use crate::error::{Error, Result};
use crate::harness::Exercise;
use crate::hyperparameters::HyperParameters;
use crate::layers::Regularizer;
use crate::loss::Loss;
use crate::model::{LayerConfig, Model};
use crate::optimizer::Optimizer;
use crate::split::train_test_split;
use crate::tuner::{HyperModel, Hyperband, SearchData};

/// Game outcomes in the Connect-4 label column
pub const CLASSES: usize = 3;

pub const UNITS: &str = "units";
pub const LEARNING_RATE: &str = "learning_rate";
pub const LEARNING_RATES: [f64; 3] = [0.01, 0.001, 0.0001];

const L2: f32 = 0.0001;

/// Four regularized ReLU layers feeding a softmax over the game outcomes.
///
/// The first layer's width and the Adam learning rate are tuned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectFourHyperModel {
    pub inputs: usize,
    pub classes: usize,
}

impl ConnectFourHyperModel {
    pub fn new(inputs: usize, classes: usize) -> Self {
        Self { inputs, classes }
    }
}

impl HyperModel for ConnectFourHyperModel {
    fn build(&self, hp: &mut HyperParameters, rng: &mut StdRng) -> Result<Model> {
        let units = hp.int(UNITS, 128, 512, 64)? as usize;
        let learning_rate = hp.choice(LEARNING_RATE, &LEARNING_RATES)?;

        let l2 = Regularizer::L2(L2);
        let layers = [
            LayerConfig::dense(units, ActivationType::ReLU).with_regularizer(l2),
            LayerConfig::dense(512, ActivationType::ReLU).with_regularizer(l2),
            LayerConfig::dense(128, ActivationType::ReLU).with_regularizer(l2),
            LayerConfig::dense(128, ActivationType::ReLU).with_regularizer(l2),
            LayerConfig::dense(self.classes, ActivationType::Softmax),
        ];

        Model::new(
            self.inputs,
            &layers,
            Loss::SparseCategoricalCrossentropy,
            Optimizer::adam(learning_rate as f32),
            rng,
        )
    }
}

/// Every artifact the exercise produces
#[derive(Debug, Clone)]
pub struct Workshop {
    pub file_url: String,
    pub data: Frame,
    pub target: Labels,
    pub x_train: Frame,
    pub x_test: Frame,
    pub y_train: Labels,
    pub y_test: Labels,
    pub best_units: usize,
    pub best_lr: f64,
    pub model: Model,
}

impl Workshop {
    pub fn run(config: &HarnessConfig) -> Result<Self> {
        let mut data = dataset::load(&config.file_url)?;
        let target = data.pop(&config.label_column)?;
        let split = train_test_split(&data, &target, config.test_size, config.split_seed)?;

        let hypermodel = ConnectFourHyperModel::new(data.ncols(), CLASSES);
        let mut tuner = Hyperband::new(hypermodel, config.tuner.clone())?;
        tuner.search(SearchData {
            x_train: split.x_train.values().view(),
            y_train: split.y_train.values().view(),
            x_val: split.x_test.values().view(),
            y_val: split.y_test.values().view(),
        })?;

        let mut best_hps = tuner
            .get_best_hyperparameters(1)
            .into_iter()
            .next()
            .ok_or(Error::NoCompletedTrials)?;
        let best_units = best_hps.get_int(UNITS)? as usize;
        let best_lr = best_hps.get_float(LEARNING_RATE)?;
        let model = tuner
            .hypermodel()
            .build(&mut best_hps, &mut StdRng::seed_from_u64(config.tuner.seed))?;

        info!(best_units, best_lr, trials = tuner.trials().len(), "Search complete");

        Ok(Workshop {
            file_url: config.file_url.clone(),
            data,
            target,
            x_train: split.x_train,
            x_test: split.x_test,
            y_train: split.y_train,
            y_test: split.y_test,
            best_units,
            best_lr,
            model,
        })
    }
}

impl Exercise for Workshop {
    fn file_url(&self) -> &str {
        &self.file_url
    }

    fn data(&self) -> &Frame {
        &self.data
    }

    fn target(&self) -> &Labels {
        &self.target
    }

    fn x_train(&self) -> &Frame {
        &self.x_train
    }

    fn y_train(&self) -> &Labels {
        &self.y_train
    }

    fn x_test(&self) -> &Frame {
        &self.x_test
    }

    fn y_test(&self) -> &Labels {
        &self.y_test
    }

    fn best_units(&self) -> usize {
        self.best_units
    }

    fn best_lr(&self) -> f64 {
        self.best_lr
    }

    fn model(&self) -> &Model {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_registers_search_space() {
        let mut hp = HyperParameters::new();
        let model = ConnectFourHyperModel::new(42, CLASSES)
            .build(&mut hp, &mut StdRng::seed_from_u64(8))
            .unwrap();

        let names: Vec<&str> = hp.space().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, [UNITS, LEARNING_RATE]);
        assert_eq!(hp.get_int(UNITS).unwrap(), 128);
        assert_eq!(hp.get_float(LEARNING_RATE).unwrap(), 0.01);
        assert_eq!(model.layers.len(), 5);
        assert_eq!(model.outputs(), CLASSES);
    }

    #[test]
    fn test_parameter_count_follows_units() {
        let hypermodel = ConnectFourHyperModel::new(42, CLASSES);
        for units in [128, 320, 512] {
            let mut hp = HyperParameters::new();
            hp.set(UNITS, crate::hyperparameters::Value::Int(units));
            let model = hypermodel.build(&mut hp, &mut StdRng::seed_from_u64(0)).unwrap();

            assert_eq!(model.parameter_count(), 555 * units as usize + 83075);
        }
    }
}
