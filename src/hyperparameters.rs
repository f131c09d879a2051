use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;

use crate::error::{Error, Result};

/// A concrete hyperparameter value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
        }
    }
}

/// The set of values a hyperparameter may take
#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
    /// `min, min + step, ...` up to and including `max` when reachable
    Int { min: i64, max: i64, step: i64 },
    Choice(Vec<f64>),
}

impl Domain {
    pub fn int(min: i64, max: i64, step: i64) -> Result<Self> {
        if step <= 0 {
            return Err(Error::search_space(format!("step must be positive, got {step}")));
        }
        if min > max {
            return Err(Error::search_space(format!("min {min} is greater than max {max}")));
        }
        if usize::try_from(int_count(min, max, step)).is_err() {
            return Err(Error::search_space(format!(
                "range {min}..={max} with step {step} has too many values"
            )));
        }
        Ok(Domain::Int { min, max, step })
    }

    pub fn choice(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::search_space("a choice needs at least one value"));
        }
        if let Some(v) = values.iter().find(|v| !v.is_finite()) {
            return Err(Error::search_space(format!("choice value {v} is not finite")));
        }
        Ok(Domain::Choice(values.to_vec()))
    }

    /// Value used before a tuner assigns one
    pub fn default_value(&self) -> Value {
        match self {
            Domain::Int { min, .. } => Value::Int(*min),
            Domain::Choice(values) => Value::Float(values[0]),
        }
    }

    pub fn values(&self) -> Vec<Value> {
        match self {
            Domain::Int { min, max, step } => (*min..=*max)
                .step_by(*step as usize)
                .map(Value::Int)
                .collect(),
            Domain::Choice(values) => values.iter().copied().map(Value::Float).collect(),
        }
    }

    pub fn cardinality(&self) -> usize {
        match self {
            Domain::Int { min, max, step } => int_count(*min, *max, *step) as usize,
            Domain::Choice(values) => values.len(),
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        match (self, value) {
            (Domain::Int { min, max, step }, Value::Int(v)) => {
                v >= min && v <= max && (*v as i128 - *min as i128) % *step as i128 == 0
            }
            (Domain::Choice(values), Value::Float(v)) => values.contains(v),
            _ => false,
        }
    }

    /// Uniform draw over the domain's values
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Value {
        match self {
            Domain::Int { min, step, .. } => {
                let k = rng.random_range(0..self.cardinality()) as i128;
                Value::Int((*min as i128 + k * *step as i128) as i64)
            }
            Domain::Choice(values) => Value::Float(values[rng.random_range(0..values.len())]),
        }
    }
}

fn int_count(min: i64, max: i64, step: i64) -> i128 {
    (max as i128 - min as i128) / step as i128 + 1
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hyperparameter {
    pub name: String,
    pub domain: Domain,
}

/// Search space registered by a hypermodel, plus the current value of each entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HyperParameters {
    space: Vec<Hyperparameter>,
    values: BTreeMap<String, Value>,
}

impl HyperParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an integer range and returns its current value
    pub fn int(&mut self, name: &str, min: i64, max: i64, step: i64) -> Result<i64> {
        match self.register(name, Domain::int(min, max, step)?)? {
            Value::Int(v) => Ok(v),
            other => Err(Error::search_space(format!("`{name}` holds non-integer value {other}"))),
        }
    }

    /// Registers a discrete choice and returns its current value
    pub fn choice(&mut self, name: &str, values: &[f64]) -> Result<f64> {
        match self.register(name, Domain::choice(values)?)? {
            Value::Float(v) => Ok(v),
            other => Err(Error::search_space(format!("`{name}` holds non-float value {other}"))),
        }
    }

    fn register(&mut self, name: &str, domain: Domain) -> Result<Value> {
        match self.space.iter().find(|hp| hp.name == name) {
            Some(existing) if existing.domain != domain => {
                return Err(Error::search_space(format!(
                    "`{name}` was registered again with a different domain"
                )));
            }
            Some(_) => {}
            None => self.space.push(Hyperparameter {
                name: name.to_string(),
                domain: domain.clone(),
            }),
        }

        match self.values.get(name) {
            Some(value) if !domain.contains(value) => Err(Error::search_space(format!(
                "value {value} of `{name}` is outside its domain"
            ))),
            Some(value) => Ok(*value),
            None => {
                let value = domain.default_value();
                self.values.insert(name.to_string(), value);
                Ok(value)
            }
        }
    }

    /// Assigns a value ahead of the hypermodel registering the name
    pub fn set(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Result<Value> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownHyperparameter(name.to_string()))
    }

    pub fn get_int(&self, name: &str) -> Result<i64> {
        match self.get(name)? {
            Value::Int(v) => Ok(v),
            Value::Float(_) => Err(Error::UnknownHyperparameter(format!("{name} (integer)"))),
        }
    }

    pub fn get_float(&self, name: &str) -> Result<f64> {
        match self.get(name)? {
            Value::Float(v) => Ok(v),
            Value::Int(_) => Err(Error::UnknownHyperparameter(format!("{name} (float)"))),
        }
    }

    pub fn space(&self) -> &[Hyperparameter] {
        &self.space
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Fresh container with the same space and values drawn uniformly from it
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Self {
        let mut sampled = Self {
            space: self.space.clone(),
            values: BTreeMap::new(),
        };
        for hp in &self.space {
            sampled.values.insert(hp.name.clone(), hp.domain.sample(rng));
        }
        sampled
    }

    /// Canonical text form of the values, used to detect repeated configurations
    pub fn key(&self) -> String {
        self.values
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for HyperParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.values {
            writeln!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}
