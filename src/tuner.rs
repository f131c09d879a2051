//! Hyperband search over a [`HyperModel`].
//!
//! Each bracket samples fresh configurations, trains them for a few epochs and
//! promotes the best `1 / factor` to the next round, where training resumes from
//! the epoch the previous round stopped at.

use std::cmp::Ordering;
use std::collections::HashSet;

use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::{Objective, TunerConfig};
use crate::error::{Error, Result};
use crate::hyperparameters::HyperParameters;
use crate::model::{FitOptions, History, Model};

const MIN_EPOCHS: f64 = 1.0;
const MAX_COLLISIONS: usize = 20;

/// Builds a compiled model from the values in `hp`, registering its search space
pub trait HyperModel {
    fn build(&self, hp: &mut HyperParameters, rng: &mut StdRng) -> Result<Model>;
}

impl<F> HyperModel for F
where
    F: Fn(&mut HyperParameters, &mut StdRng) -> Result<Model>,
{
    fn build(&self, hp: &mut HyperParameters, rng: &mut StdRng) -> Result<Model> {
        self(hp, rng)
    }
}

/// One training run of one configuration inside a Hyperband round
#[derive(Debug, Clone)]
pub struct Trial {
    pub id: usize,
    pub hyperparameters: HyperParameters,
    pub bracket: usize,
    pub round: usize,
    pub initial_epoch: usize,
    pub epochs: usize,
    /// Best objective value over the epochs of this run
    pub score: f32,
    pub history: History,
}

struct Candidate {
    hyperparameters: HyperParameters,
    model: Model,
    rng: StdRng,
    trained_epochs: usize,
    score: Option<f32>,
}

impl Candidate {
    /// Carries the trained weights into the next round with a fresh optimizer state
    fn promote(&mut self) {
        self.model.optimizer.reset();
    }
}

/// Training and validation arrays handed to every trial
#[derive(Clone, Copy)]
pub struct SearchData<'a> {
    pub x_train: ArrayView2<'a, f32>,
    pub y_train: ArrayView1<'a, usize>,
    pub x_val: ArrayView2<'a, f32>,
    pub y_val: ArrayView1<'a, usize>,
}

pub struct Hyperband<H> {
    hypermodel: H,
    config: TunerConfig,
    rng: StdRng,
    trials: Vec<Trial>,
    tried: HashSet<String>,
}

impl<H: HyperModel> Hyperband<H> {
    pub fn new(hypermodel: H, config: TunerConfig) -> Result<Self> {
        if config.max_epochs == 0 {
            return Err(Error::search_space("max_epochs must be at least 1"));
        }
        if config.factor < 2 {
            return Err(Error::search_space("factor must be at least 2"));
        }
        if config.hyperband_iterations == 0 {
            return Err(Error::search_space("hyperband_iterations must be at least 1"));
        }
        if config.batch_size == 0 {
            return Err(Error::search_space("batch_size must be at least 1"));
        }

        Ok(Self {
            hypermodel,
            rng: StdRng::seed_from_u64(config.seed),
            config,
            trials: Vec::new(),
            tried: HashSet::new(),
        })
    }

    pub fn hypermodel(&self) -> &H {
        &self.hypermodel
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    pub fn num_brackets(&self) -> usize {
        let mut epochs = self.config.max_epochs as f64;
        let mut brackets = 0;
        while epochs >= MIN_EPOCHS {
            epochs /= self.config.factor as f64;
            brackets += 1;
        }
        brackets
    }

    /// Number of models trained in `round` of `bracket`.
    ///
    /// Every bracket ends with `ceil(1 + log_factor(max_epochs)) / factor^bracket`
    /// models, so the size only depends on how many halvings precede the round.
    pub fn round_size(&self, bracket: usize, round: usize) -> usize {
        debug_assert!(round <= bracket);
        let factor = self.config.factor;
        let mut log = 0;
        let mut reach = 1;
        while reach < self.config.max_epochs {
            reach *= factor;
            log += 1;
        }
        let bracket0_end = (1 + log) as f64;
        (bracket0_end / (factor as f64).powi(round as i32)).ceil() as usize
    }

    /// Epoch count each model reaches by the end of `round` of `bracket`
    pub fn round_epochs(&self, bracket: usize, round: usize) -> usize {
        let factor = self.config.factor as f64;
        (self.config.max_epochs as f64 / factor.powi((bracket - round) as i32)).ceil() as usize
    }

    pub fn search(&mut self, data: SearchData<'_>) -> Result<()> {
        let mut template = HyperParameters::new();
        self.hypermodel
            .build(&mut template, &mut StdRng::seed_from_u64(self.config.seed))?;
        info!(
            hyperparameters = template.space().len(),
            brackets = self.num_brackets(),
            max_epochs = self.config.max_epochs,
            "Starting Hyperband search"
        );

        'search: for iteration in 0..self.config.hyperband_iterations {
            for bracket in (0..self.num_brackets()).rev() {
                let mut candidates = Vec::new();
                for _ in 0..self.round_size(bracket, 0) {
                    let Some(mut hp) = self.next_configuration(&template) else {
                        break;
                    };
                    let mut rng = StdRng::seed_from_u64(self.rng.random());
                    let model = self.hypermodel.build(&mut hp, &mut rng)?;
                    candidates.push(Candidate {
                        hyperparameters: hp,
                        model,
                        rng,
                        trained_epochs: 0,
                        score: None,
                    });
                }

                if candidates.is_empty() {
                    warn!(iteration, bracket, "Search space exhausted, stopping");
                    break 'search;
                }

                for round in 0..=bracket {
                    if round > 0 {
                        let objective = self.config.objective;
                        candidates.sort_by(|a, b| rank(objective, a.score, b.score));
                        candidates.truncate(self.round_size(bracket, round));
                        candidates.iter_mut().for_each(Candidate::promote);
                    }
                    let epochs = self.round_epochs(bracket, round);
                    for candidate in &mut candidates {
                        self.run_trial(candidate, bracket, round, epochs, data)?;
                    }
                }
            }
        }

        if self.trials.is_empty() {
            return Err(Error::NoCompletedTrials);
        }
        Ok(())
    }

    fn next_configuration(&mut self, template: &HyperParameters) -> Option<HyperParameters> {
        for _ in 0..=MAX_COLLISIONS {
            let hp = template.sample(&mut self.rng);
            if self.tried.insert(hp.key()) {
                return Some(hp);
            }
        }
        None
    }

    fn run_trial(
        &mut self,
        candidate: &mut Candidate,
        bracket: usize,
        round: usize,
        epochs: usize,
        data: SearchData<'_>,
    ) -> Result<()> {
        let initial_epoch = candidate.trained_epochs;
        let options = FitOptions {
            initial_epoch,
            epochs,
            batch_size: self.config.batch_size,
            validation: Some((data.x_val, data.y_val)),
        };
        let history = candidate
            .model
            .fit(data.x_train, data.y_train, options, &mut candidate.rng)?;
        candidate.trained_epochs = epochs.max(initial_epoch);

        let objective = self.config.objective;
        let score = history
            .epochs
            .iter()
            .filter_map(|m| m.validation)
            .map(|v| match objective {
                Objective::ValAccuracy => v.accuracy,
                Objective::ValLoss => v.loss,
            })
            .reduce(|best, s| if objective.is_better(s, best) { s } else { best });
        let Some(score) = score.or(candidate.score) else {
            return Ok(());
        };
        candidate.score = Some(score);

        let trial = Trial {
            id: self.trials.len(),
            hyperparameters: candidate.hyperparameters.clone(),
            bracket,
            round,
            initial_epoch,
            epochs,
            score,
            history,
        };
        debug!(
            trial = trial.id,
            bracket,
            round,
            epochs,
            score,
            hyperparameters = %trial.hyperparameters.key(),
            "Trial finished"
        );
        self.trials.push(trial);
        Ok(())
    }

    /// Best trials first; ties keep trial order
    fn ranked_trials(&self) -> Vec<&Trial> {
        let objective = self.config.objective;
        let mut ranked: Vec<&Trial> = self.trials.iter().collect();
        ranked.sort_by(|a, b| rank(objective, Some(a.score), Some(b.score)));
        ranked
    }

    /// The `num_trials` best distinct configurations found so far
    pub fn get_best_hyperparameters(&self, num_trials: usize) -> Vec<HyperParameters> {
        let mut seen = HashSet::new();
        self.ranked_trials()
            .into_iter()
            .filter(|trial| seen.insert(trial.hyperparameters.key()))
            .take(num_trials)
            .map(|trial| trial.hyperparameters.clone())
            .collect()
    }

    pub fn results_summary(&self, num_trials: usize) -> String {
        let objective = self.config.objective;
        let direction = match objective {
            Objective::ValAccuracy => "max",
            Objective::ValLoss => "min",
        };
        let ranked = self.ranked_trials();
        let shown = ranked.len().min(num_trials);

        let mut out = format!(
            "Results summary\nShowing {shown} best trials\nObjective(name=\"{}\", direction=\"{direction}\")\n",
            objective.name()
        );
        for trial in ranked.into_iter().take(shown) {
            out.push('\n');
            out.push_str(&format!("Trial {:04} summary\nHyperparameters:\n", trial.id));
            out.push_str(&trial.hyperparameters.to_string());
            out.push_str(&format!(
                "tuner/epochs: {}\ntuner/initial_epoch: {}\ntuner/bracket: {}\ntuner/round: {}\nScore: {}\n",
                trial.epochs, trial.initial_epoch, trial.bracket, trial.round, trial.score
            ));
        }
        out
    }
}

/// Orders scores best first; unscored candidates sort last
fn rank(objective: Objective, a: Option<f32>, b: Option<f32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match objective {
            Objective::ValAccuracy => b.total_cmp(&a),
            Objective::ValLoss => a.total_cmp(&b),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;

    fn never_built(_: &mut HyperParameters, _: &mut StdRng) -> Result<Model> {
        Err(Error::NoCompletedTrials)
    }

    type BuildFn = fn(&mut HyperParameters, &mut StdRng) -> Result<Model>;

    fn tuner(max_epochs: usize, factor: usize) -> Hyperband<BuildFn> {
        let config = TunerConfig {
            max_epochs,
            factor,
            ..TunerConfig::default()
        };
        Hyperband::new(never_built as BuildFn, config).unwrap()
    }

    #[test]
    fn test_workshop_schedule() {
        let tuner = tuner(5, 3);

        assert_eq!(tuner.num_brackets(), 2);
        assert_eq!(tuner.round_size(1, 0), 3);
        assert_eq!(tuner.round_size(1, 1), 1);
        assert_eq!(tuner.round_size(0, 0), 3);
        assert_eq!(tuner.round_epochs(1, 0), 2);
        assert_eq!(tuner.round_epochs(1, 1), 5);
        assert_eq!(tuner.round_epochs(0, 0), 5);
    }

    #[test]
    fn test_larger_schedule() {
        let tuner = tuner(81, 3);

        assert_eq!(tuner.num_brackets(), 5);
        assert_eq!(tuner.round_epochs(4, 0), 1);
        assert_eq!(tuner.round_epochs(4, 4), 81);
        assert_eq!(tuner.round_size(4, 0), 5);
        assert_eq!(tuner.round_size(4, 1), 2);
        assert_eq!(tuner.round_size(4, 4), 1);
    }

    #[test]
    fn test_invalid_budget() {
        let config = TunerConfig {
            factor: 1,
            ..TunerConfig::default()
        };
        assert!(Hyperband::new(never_built as BuildFn, config).is_err());
    }

    #[test]
    fn test_promotion_keeps_weights_and_resets_optimizer() {
        use crate::activation::ActivationType;
        use crate::loss::Loss;
        use crate::model::LayerConfig;
        use crate::optimizer::Optimizer;
        use ndarray::{array, Array2};

        let mut rng = StdRng::seed_from_u64(4);
        let model = Model::new(
            2,
            &[
                LayerConfig::dense(4, ActivationType::ReLU),
                LayerConfig::dense(2, ActivationType::Softmax),
            ],
            Loss::SparseCategoricalCrossentropy,
            Optimizer::adam(0.01),
            &mut rng,
        )
        .unwrap();
        let mut candidate = Candidate {
            hyperparameters: HyperParameters::new(),
            model,
            rng,
            trained_epochs: 0,
            score: None,
        };

        let x = Array2::from_shape_fn((4, 2), |(r, c)| (r + c) as f32);
        let y = array![0, 1, 0, 1];
        let options = FitOptions {
            initial_epoch: 0,
            epochs: 2,
            batch_size: 2,
            validation: None,
        };
        candidate
            .model
            .fit(x.view(), y.view(), options, &mut candidate.rng)
            .unwrap();
        let trained = candidate.model.predict(x.view());
        assert_eq!(candidate.model.optimizer.iterations(), 4);

        candidate.promote();

        assert_eq!(candidate.model.optimizer.iterations(), 0);
        assert_eq!(candidate.model.optimizer.learning_rate, 0.01);
        assert_eq!(candidate.model.predict(x.view()), trained);
    }

    #[test]
    fn test_rank_orders_best_first() {
        assert_eq!(rank(Objective::ValAccuracy, Some(0.9), Some(0.5)), Ordering::Less);
        assert_eq!(rank(Objective::ValLoss, Some(0.9), Some(0.5)), Ordering::Greater);
        assert_eq!(rank(Objective::ValAccuracy, None, Some(0.0)), Ordering::Greater);
    }
}
