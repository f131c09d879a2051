//! Tabular data: CSV loading, label extraction and row selection.
//!
//! A [`Frame`] keeps the original row position of every row as its index, so a
//! partition can be compared against another one including which rows it holds.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

use ndarray::{Array1, Array2, Axis};
use tracing::info;

use crate::error::{Error, Result};

/// Named feature columns over an indexed set of rows
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    index: Vec<usize>,
    values: Array2<f32>,
}

/// A single column of integer class ids
#[derive(Debug, Clone, PartialEq)]
pub struct Labels {
    name: String,
    index: Vec<usize>,
    values: Array1<usize>,
}

impl Frame {
    pub fn new(columns: Vec<String>, index: Vec<usize>, values: Array2<f32>) -> Result<Self> {
        if columns.len() != values.ncols() {
            return Err(Error::ShapeMismatch {
                a: "column names",
                b: "value columns",
                got: columns.len(),
                expected: values.ncols(),
            });
        }
        if index.len() != values.nrows() {
            return Err(Error::ShapeMismatch {
                a: "index",
                b: "value rows",
                got: index.len(),
                expected: values.nrows(),
            });
        }
        Ok(Self {
            columns,
            index,
            values,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// Removes `name` from the frame and returns it as class labels
    pub fn pop(&mut self, name: &str) -> Result<Labels> {
        let position = self
            .columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))?;

        let column = self.values.column(position);
        let mut labels = Vec::with_capacity(column.len());
        for (&row, &value) in self.index.iter().zip(column.iter()) {
            if value < 0.0 || value.fract() != 0.0 {
                return Err(Error::InvalidLabel {
                    column: name.to_string(),
                    row,
                    value,
                });
            }
            labels.push(value as usize);
        }

        let keep: Vec<usize> = (0..self.columns.len()).filter(|&c| c != position).collect();
        self.values = self.values.select(Axis(1), &keep);
        self.columns.remove(position);

        Ok(Labels {
            name: name.to_string(),
            index: self.index.clone(),
            values: Array1::from(labels),
        })
    }

    /// Selects rows by position, keeping their index labels
    pub fn take(&self, rows: &[usize]) -> Frame {
        Frame {
            columns: self.columns.clone(),
            index: rows.iter().map(|&r| self.index[r]).collect(),
            values: self.values.select(Axis(0), rows),
        }
    }

    /// Describes the first structural or value difference, if any
    pub fn first_difference(&self, other: &Frame) -> Option<String> {
        if self.shape() != other.shape() {
            return Some(format!("shape {:?} != {:?}", self.shape(), other.shape()));
        }
        if let Some(c) = (0..self.columns.len()).find(|&c| self.columns[c] != other.columns[c]) {
            return Some(format!(
                "column {c} named `{}` != `{}`",
                self.columns[c], other.columns[c]
            ));
        }
        if let Some(r) = (0..self.index.len()).find(|&r| self.index[r] != other.index[r]) {
            return Some(format!(
                "row {r} has index {} != {}",
                self.index[r], other.index[r]
            ));
        }
        self.values
            .indexed_iter()
            .zip(other.values.iter())
            // NaN cells are parse errors, so bitwise-equal floats are the only equal ones
            .find(|((_, a), b)| a != b)
            .map(|(((r, c), a), b)| format!("value at row {r}, column `{}`: {a} != {b}", self.columns[c]))
    }
}

impl Labels {
    pub fn new(name: impl Into<String>, index: Vec<usize>, values: Array1<usize>) -> Result<Self> {
        if index.len() != values.len() {
            return Err(Error::ShapeMismatch {
                a: "index",
                b: "labels",
                got: index.len(),
                expected: values.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            index,
            values,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn values(&self) -> &Array1<usize> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of classes assuming ids start at zero
    pub fn class_count(&self) -> usize {
        self.values.iter().max().map_or(0, |&m| m + 1)
    }

    pub fn take(&self, rows: &[usize]) -> Labels {
        Labels {
            name: self.name.clone(),
            index: rows.iter().map(|&r| self.index[r]).collect(),
            values: self.values.select(Axis(0), rows),
        }
    }

    /// First difference in the label values; names and index are not compared
    pub fn first_difference(&self, other: &Labels) -> Option<String> {
        if self.len() != other.len() {
            return Some(format!("length {} != {}", self.len(), other.len()));
        }
        self.values
            .iter()
            .zip(other.values.iter())
            .position(|(a, b)| a != b)
            .map(|i| format!("value at position {i}: {} != {}", self.values[i], other.values[i]))
    }
}

/// Parses a headed CSV file of numeric cells
pub fn read_csv<R: BufRead>(reader: R) -> Result<Frame> {
    let mut lines = reader.lines().enumerate();

    let columns: Vec<String> = match lines.next() {
        Some((_, header)) => header?.split(',').map(clean_cell).map(str::to_string).collect(),
        None => return Err(Error::csv(1, "missing header row")),
    };
    let mut seen = HashSet::new();
    if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
        return Err(Error::csv(1, format!("duplicate column `{dup}`")));
    }

    let mut cells: Vec<f32> = Vec::new();
    let mut rows = 0;
    for (i, line) in lines {
        let line = line?;
        let line_no = i + 1;
        if line.trim().is_empty() {
            continue;
        }

        let row: Vec<&str> = line.split(',').map(clean_cell).collect();
        if row.len() != columns.len() {
            return Err(Error::csv(
                line_no,
                format!("expected {} cells, found {}", columns.len(), row.len()),
            ));
        }
        for (cell, column) in row.iter().zip(&columns) {
            let value = cell.parse::<f32>().map_err(|_| {
                Error::csv(line_no, format!("cannot parse `{cell}` in column `{column}`"))
            })?;
            if !value.is_finite() {
                return Err(Error::csv(line_no, format!("non-finite value in column `{column}`")));
            }
            cells.push(value);
        }
        rows += 1;
    }

    let values = Array2::from_shape_vec((rows, columns.len()), cells)
        .map_err(|e| Error::csv(0, e.to_string()))?;
    Frame::new(columns, (0..rows).collect(), values)
}

fn clean_cell(cell: &str) -> &str {
    cell.trim().trim_matches('"')
}

/// Loads a CSV from an `http(s)://` URL, a `file://` URL or a plain path
pub fn load(source: &str) -> Result<Frame> {
    let frame = if source.starts_with("http://") || source.starts_with("https://") {
        let body = reqwest::blocking::get(source)?.error_for_status()?.text()?;
        read_csv(Cursor::new(body))?
    } else {
        let path = Path::new(source.strip_prefix("file://").unwrap_or(source));
        read_csv(BufReader::new(File::open(path)?))?
    };

    info!(source, rows = frame.len(), columns = frame.ncols(), "Loaded dataset");
    Ok(frame)
}
