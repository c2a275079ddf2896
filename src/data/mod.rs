//! Input tables and time-resolved series.
//!
//! A [`Frame`] is a small columnar table: named `f64` columns plus named text
//! columns, all of the same length. Column lookups fail with
//! [`Error::Schema`] so that a missing column is caught before any
//! computation uses the table.
//!
//! # Modules
//!
//! - [`read_frame`] / [`load_frame`]: comma-delimited text with a header row
//! - [`TimeSeries`]: ordered `(t, L, dL)` rows for one biscuit

mod csv;

pub use csv::{
    load_frame, load_measurements, load_microscopy, load_series, read_frame,
    read_measurements, read_microscopy, read_series,
};

use std::collections::BTreeMap;

use crate::error::{DomainError, Error, Result};

/// Column names used by the input files.
pub mod columns {
    /// Surface tension, N/m.
    pub const GAMMA: &str = "gamma";
    /// Contact angle, rad.
    pub const PHI: &str = "phi";
    /// Dynamic viscosity, Pa·s.
    pub const ETA: &str = "eta";
    /// Absorption length, m.
    pub const LENGTH: &str = "L";
    /// Dunk time, s.
    pub const TIME: &str = "t";
    /// Biscuit label.
    pub const BISCUIT: &str = "biscuit";
    /// Pore radius, m.
    pub const RADIUS: &str = "r";
    /// Length uncertainty, m.
    pub const LENGTH_ERROR: &str = "dL";

    /// Columns shared by the measurement and microscopy tables.
    pub const SHARED: [&str; 5] = [GAMMA, PHI, ETA, LENGTH, TIME];
}

/// Columnar table with named numeric and text columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    name: String,
    len: usize,
    numeric: BTreeMap<String, Vec<f64>>,
    text: BTreeMap<String, Vec<String>>,
}

impl Frame {
    /// Creates an empty table; `name` appears in schema errors.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds (or replaces) a numeric column.
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidInput`] if the column length differs from the
    /// existing columns.
    pub fn with_numeric(mut self, column: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        self.check_len(values.len())?;
        self.len = values.len();
        self.numeric.insert(column.into(), values);
        Ok(self)
    }

    /// Adds (or replaces) a text column.
    pub fn with_text(mut self, column: impl Into<String>, values: Vec<String>) -> Result<Self> {
        self.check_len(values.len())?;
        self.len = values.len();
        self.text.insert(column.into(), values);
        Ok(self)
    }

    fn check_len(&self, n: usize) -> Result<()> {
        if self.numeric.is_empty() && self.text.is_empty() {
            return Ok(());
        }
        if n != self.len {
            return Err(Error::invalid(format!(
                "column length {n} does not match table '{}' length {}",
                self.name, self.len
            )));
        }
        Ok(())
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if a numeric or text column with this name exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.numeric.contains_key(column) || self.text.contains_key(column)
    }

    fn missing(&self, column: &str) -> Error {
        Error::Schema {
            column: column.to_string(),
            table: self.name.clone(),
        }
    }

    /// Numeric column by name.
    pub fn numeric(&self, column: &str) -> Result<&[f64]> {
        self.numeric
            .get(column)
            .map(Vec::as_slice)
            .ok_or_else(|| self.missing(column))
    }

    /// Text column by name.
    pub fn text(&self, column: &str) -> Result<&[String]> {
        self.text
            .get(column)
            .map(Vec::as_slice)
            .ok_or_else(|| self.missing(column))
    }

    /// Fails on the first absent column.
    pub fn require(&self, numeric: &[&str], text: &[&str]) -> Result<()> {
        for &c in numeric {
            self.numeric(c)?;
        }
        for &c in text {
            self.text(c)?;
        }
        Ok(())
    }
}

/// One time-resolved observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    /// Time since immersion, s.
    pub t: f64,
    /// Absorption length, m.
    pub length: f64,
    /// Measurement uncertainty of `length`, m.
    pub length_error: f64,
}

/// Ordered `(t, L, dL)` rows for one biscuit.
///
/// # Invariants
///
/// - At least one row.
/// - All values finite, `t >= 0`, `dL > 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    points: Vec<SeriesPoint>,
}

impl TimeSeries {
    /// Validates and wraps the rows, keeping their order.
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidInput`] if the series is empty or violates the
    /// invariants above.
    pub fn new(points: Vec<SeriesPoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::invalid("time series is empty"));
        }
        for (i, p) in points.iter().enumerate() {
            if !(p.t.is_finite() && p.length.is_finite() && p.length_error.is_finite()) {
                return Err(Error::invalid(format!("row {i}: non-finite value")));
            }
            if p.t < 0.0 {
                return Err(Error::invalid(format!("row {i}: negative time {}", p.t)));
            }
            if p.length_error <= 0.0 {
                return Err(DomainError::InvalidInput(format!(
                    "row {i}: uncertainty must be positive, got {}",
                    p.length_error
                ))
                .into());
            }
        }
        Ok(Self { points })
    }

    /// Builds a series from parallel columns.
    pub fn from_columns(t: &[f64], length: &[f64], length_error: &[f64]) -> Result<Self> {
        if t.len() != length.len() || t.len() != length_error.len() {
            return Err(Error::invalid("time series columns differ in length"));
        }
        let points = t
            .iter()
            .zip(length)
            .zip(length_error)
            .map(|((&t, &length), &length_error)| SeriesPoint {
                t,
                length,
                length_error,
            })
            .collect();
        Self::new(points)
    }

    /// Rows in input order.
    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`; a series has at least one row.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Times, s.
    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.t).collect()
    }

    /// Observed lengths, m.
    pub fn lengths(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.length).collect()
    }

    /// Length uncertainties, m.
    pub fn length_errors(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.length_error).collect()
    }
}
