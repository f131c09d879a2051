//! Verification of an exercise implementation against an independent reference run.

use std::fmt;

use tracing::{info, warn};

use crate::config::HarnessConfig;
use crate::dataset::{Frame, Labels};
use crate::error::{Error, Result};
use crate::model::Model;
use crate::workshop::Workshop;

/// The artifacts an exercise implementation exposes for checking
pub trait Exercise {
    fn file_url(&self) -> &str;
    /// Dataset with the label column removed
    fn data(&self) -> &Frame;
    fn target(&self) -> &Labels;
    fn x_train(&self) -> &Frame;
    fn y_train(&self) -> &Labels;
    fn x_test(&self) -> &Frame;
    fn y_test(&self) -> &Labels;
    fn best_units(&self) -> usize;
    fn best_lr(&self) -> f64;
    /// Model rebuilt from the best hyperparameters
    fn model(&self) -> &Model;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Check {
    FileUrl,
    Data,
    Target,
    XTrain,
    YTrain,
    XTest,
    YTest,
    BestUnits,
    BestLr,
    Summary,
}

impl Check {
    pub const ALL: [Check; 10] = [
        Check::FileUrl,
        Check::Data,
        Check::Target,
        Check::XTrain,
        Check::YTrain,
        Check::XTest,
        Check::YTest,
        Check::BestUnits,
        Check::BestLr,
        Check::Summary,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Check::FileUrl => "file_url",
            Check::Data => "data",
            Check::Target => "target",
            Check::XTrain => "X_train",
            Check::YTrain => "y_train",
            Check::XTest => "X_test",
            Check::YTest => "y_test",
            Check::BestUnits => "best_units",
            Check::BestLr => "best_lr",
            Check::Summary => "summary",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed check and what differed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub check: Check,
    pub detail: String,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.check, self.detail)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub outcomes: Vec<(Check, std::result::Result<(), Mismatch>)>,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| outcome.is_ok())
    }

    pub fn failures(&self) -> Vec<&Mismatch> {
        self.outcomes
            .iter()
            .filter_map(|(_, outcome)| outcome.as_ref().err())
            .collect()
    }

    pub fn outcome(&self, check: Check) -> Option<&std::result::Result<(), Mismatch>> {
        self.outcomes
            .iter()
            .find(|(c, _)| *c == check)
            .map(|(_, outcome)| outcome)
    }

    pub fn into_result(self) -> Result<()> {
        let failed: Vec<String> = self
            .failures()
            .into_iter()
            .map(|m| m.check.name().to_string())
            .collect();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::Verification(failed))
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (check, outcome) in &self.outcomes {
            match outcome {
                Ok(()) => writeln!(f, "{check} ... ok")?,
                Err(mismatch) => writeln!(f, "{check} ... FAILED ({})", mismatch.detail)?,
            }
        }
        Ok(())
    }
}

/// Holds the reference artifacts and compares exercises against them
pub struct Harness<R = Workshop> {
    reference: R,
}

impl Harness<Workshop> {
    /// Runs the full pipeline once to produce the reference artifacts
    pub fn setup(config: &HarnessConfig) -> Result<Self> {
        info!(file_url = %config.file_url, "Computing reference artifacts");
        Ok(Self::new(Workshop::run(config)?))
    }
}

impl<R: Exercise> Harness<R> {
    pub fn new(reference: R) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> &R {
        &self.reference
    }

    pub fn check(&self, check: Check, exercise: &dyn Exercise) -> std::result::Result<(), Mismatch> {
        let expected = &self.reference;
        let detail = match check {
            Check::FileUrl => differ(expected.file_url(), exercise.file_url()),
            Check::Data => exercise.data().first_difference(expected.data()),
            Check::Target => exercise.target().first_difference(expected.target()),
            Check::XTrain => exercise.x_train().first_difference(expected.x_train()),
            Check::YTrain => exercise.y_train().first_difference(expected.y_train()),
            Check::XTest => exercise.x_test().first_difference(expected.x_test()),
            Check::YTest => exercise.y_test().first_difference(expected.y_test()),
            Check::BestUnits => differ(&expected.best_units(), &exercise.best_units()),
            Check::BestLr => differ(&expected.best_lr(), &exercise.best_lr()),
            Check::Summary => {
                let (expected, actual) = (expected.model().summary(), exercise.model().summary());
                first_line_difference(&expected, &actual)
            }
        };

        match detail {
            None => Ok(()),
            Some(detail) => Err(Mismatch { check, detail }),
        }
    }

    /// Runs every check; a failure never stops the remaining ones
    pub fn verify(&self, exercise: &dyn Exercise) -> Report {
        let outcomes = Check::ALL
            .iter()
            .map(|&check| {
                let outcome = self.check(check, exercise);
                if let Err(mismatch) = &outcome {
                    warn!(check = check.name(), detail = %mismatch.detail, "Check failed");
                }
                (check, outcome)
            })
            .collect();
        Report { outcomes }
    }
}

fn differ<T: PartialEq + fmt::Debug + ?Sized>(expected: &T, actual: &T) -> Option<String> {
    (expected != actual).then(|| format!("expected {expected:?}, got {actual:?}"))
}

fn first_line_difference(expected: &str, actual: &str) -> Option<String> {
    if expected == actual {
        return None;
    }
    let mut expected_lines = expected.lines();
    let mut actual_lines = actual.lines();
    let mut line = 1;
    loop {
        let detail = match (expected_lines.next(), actual_lines.next()) {
            (Some(e), Some(a)) if e == a => {
                line += 1;
                continue;
            }
            (Some(e), Some(a)) => format!("line {line}: expected {e:?}, got {a:?}"),
            (Some(e), None) => format!("line {line}: expected {e:?}, got end of text"),
            (None, Some(a)) => format!("line {line}: expected end of text, got {a:?}"),
            // Same lines, so only the line endings differ
            (None, None) => format!(
                "line endings differ: expected {} bytes ending {:?}, got {} bytes ending {:?}",
                expected.len(),
                tail(expected),
                actual.len(),
                tail(actual)
            ),
        };
        return Some(detail);
    }
}

fn tail(text: &str) -> &str {
    let start = text.trim_end_matches(['\r', '\n']).len();
    &text[start..]
}
