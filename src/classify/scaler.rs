//! Feature standardization.

use u_numflow::stats;

use crate::error::{Error, Result};

/// Zero-mean, unit-variance scaling with statistics frozen at fit time.
///
/// Scales use the population standard deviation (denominator n). A column
/// with zero variance is centred but not scaled.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Learns per-column mean and scale from the training rows.
    ///
    /// # Errors
    ///
    /// [`crate::DomainError::InvalidInput`] if there are no rows, rows are
    /// ragged, or any value is non-finite.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let width = rows.first().map(Vec::len).ok_or_else(|| Error::invalid("no rows to scale"))?;
        if rows.iter().any(|r| r.len() != width) {
            return Err(Error::invalid("ragged feature rows"));
        }
        if rows.iter().flatten().any(|v| !v.is_finite()) {
            return Err(Error::invalid("non-finite feature value"));
        }

        let n = rows.len() as f64;
        let mut means = Vec::with_capacity(width);
        let mut scales = Vec::with_capacity(width);
        for j in 0..width {
            let col: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            let mean = stats::mean(&col).ok_or_else(|| Error::invalid("empty column"))?;
            let var = col.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
            let sd = var.sqrt();
            means.push(mean);
            scales.push(if sd < 1e-300 { 1.0 } else { sd });
        }

        Ok(Self { means, scales })
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.means.len()
    }

    /// Column means learned at fit time.
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Column scales learned at fit time.
    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    /// Scales one row.
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.width() {
            return Err(Error::invalid(format!(
                "row has {} features, scaler expects {}",
                row.len(),
                self.width()
            )));
        }
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(&x, (&m, &s))| (x - m) / s)
            .collect())
    }

    /// Scales many rows.
    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }
}
