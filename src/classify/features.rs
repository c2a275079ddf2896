//! Feature extraction from measurement tables.

use serde::{Deserialize, Serialize};

use crate::config::PhysicalConstants;
use crate::data::{columns, Frame};
use crate::error::Result;
use crate::washburn::WashburnModel;

/// One model input column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Surface tension.
    Gamma,
    /// Contact angle.
    Phi,
    /// Viscosity.
    Eta,
    /// Absorption length.
    Length,
    /// Dunk time.
    Time,
    /// Pore radius implied by each row's own Washburn relation,
    /// r = 2ηL² / (γ t cos φ).
    ImpliedRadius,
}

impl Feature {
    /// Every feature, raw columns first.
    pub fn all() -> [Feature; 6] {
        [
            Feature::Gamma,
            Feature::Phi,
            Feature::Eta,
            Feature::Length,
            Feature::Time,
            Feature::ImpliedRadius,
        ]
    }

    /// Table columns this feature reads.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Feature::Gamma => &[columns::GAMMA],
            Feature::Phi => &[columns::PHI],
            Feature::Eta => &[columns::ETA],
            Feature::Length => &[columns::LENGTH],
            Feature::Time => &[columns::TIME],
            Feature::ImpliedRadius => &columns::SHARED,
        }
    }
}

/// Ordered list of features making up one model input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSet {
    features: Vec<Feature>,
}

impl FeatureSet {
    /// Wraps a feature list.
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Features in column order.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Number of model inputs.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns `true` if there are no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Distinct table columns the features read.
    pub fn required_columns(&self) -> Vec<&'static str> {
        let mut cols: Vec<&'static str> = Vec::new();
        for f in &self.features {
            for &c in f.columns() {
                if !cols.contains(&c) {
                    cols.push(c);
                }
            }
        }
        cols
    }

    /// Builds one row per table row.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Schema`] if a required column is missing.
    /// - [`crate::Error::Domain`] if the implied radius is undefined for a row
    ///   (obtuse contact angle or non-positive time).
    pub fn extract(&self, frame: &Frame) -> Result<Vec<Vec<f64>>> {
        frame.require(&self.required_columns(), &[])?;

        let column = |f: Feature| -> Result<&[f64]> {
            match f {
                Feature::Gamma => frame.numeric(columns::GAMMA),
                Feature::Phi => frame.numeric(columns::PHI),
                Feature::Eta => frame.numeric(columns::ETA),
                Feature::Length => frame.numeric(columns::LENGTH),
                Feature::Time => frame.numeric(columns::TIME),
                Feature::ImpliedRadius => Ok(&[]),
            }
        };

        let mut rows = vec![Vec::with_capacity(self.features.len()); frame.len()];
        for &f in &self.features {
            if f == Feature::ImpliedRadius {
                let radii = implied_radii(frame)?;
                for (row, r) in rows.iter_mut().zip(radii) {
                    row.push(r);
                }
            } else {
                for (row, &v) in rows.iter_mut().zip(column(f)?) {
                    row.push(v);
                }
            }
        }
        Ok(rows)
    }
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self::new(Feature::all().to_vec())
    }
}

fn implied_radii(frame: &Frame) -> Result<Vec<f64>> {
    let gamma = frame.numeric(columns::GAMMA)?;
    let phi = frame.numeric(columns::PHI)?;
    let eta = frame.numeric(columns::ETA)?;
    let length = frame.numeric(columns::LENGTH)?;
    let time = frame.numeric(columns::TIME)?;

    (0..frame.len())
        .map(|i| {
            let model = WashburnModel::new(&PhysicalConstants {
                gamma: gamma[i],
                phi: phi[i],
                eta: eta[i],
            })?;
            model.implied_radius(length[i], time[i])
        })
        .collect()
}
