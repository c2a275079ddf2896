//! Capillary-flow models for evidence computation.
//!
//! A [`CapillaryModel`] names its free parameters through their priors and
//! predicts lengths from a [`ModelContext`], which carries the label, the
//! pore radius and the observed series explicitly.

use crate::config::PhysicalConstants;
use crate::data::TimeSeries;
use crate::error::{Error, Result};
use crate::washburn::WashburnModel;

use super::gaussian_log_likelihood;

/// Prior of one free parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prior {
    /// Uniform on `[low, high]`.
    Uniform {
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },
}

impl Prior {
    /// Uniform prior with validated bounds.
    pub fn uniform(low: f64, high: f64) -> Result<Self> {
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(Error::invalid(format!(
                "uniform prior needs low < high, got [{low}, {high}]"
            )));
        }
        Ok(Prior::Uniform { low, high })
    }

    /// Maps a unit-cube coordinate to parameter space.
    pub fn quantile(&self, u: f64) -> f64 {
        match *self {
            Prior::Uniform { low, high } => low + u * (high - low),
        }
    }

    /// Whether `x` lies in the support.
    pub fn contains(&self, x: f64) -> bool {
        match *self {
            Prior::Uniform { low, high } => (low..=high).contains(&x),
        }
    }
}

/// Forward model mapping parameters to predicted lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forward {
    /// L = washburn(r, t); no free parameters.
    Washburn,
    /// L = a0 · washburn(r, t); one free parameter.
    ScaledWashburn,
}

/// A named model: priors plus a forward map.
#[derive(Debug, Clone, PartialEq)]
pub struct CapillaryModel {
    name: String,
    priors: Vec<Prior>,
    forward: Forward,
}

impl CapillaryModel {
    /// Plain Washburn model with the radius fixed.
    pub fn uncorrected() -> Self {
        Self {
            name: "washburn".to_string(),
            priors: Vec::new(),
            forward: Forward::Washburn,
        }
    }

    /// Washburn scaled by a0 ~ Uniform(0, `correction_max`).
    pub fn corrected(correction_max: f64) -> Result<Self> {
        Ok(Self {
            name: "corrected_washburn".to_string(),
            priors: vec![Prior::uniform(0.0, correction_max)?],
            forward: Forward::ScaledWashburn,
        })
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of free parameters.
    pub fn dimension(&self) -> usize {
        self.priors.len()
    }

    /// Priors in parameter order.
    pub fn priors(&self) -> &[Prior] {
        &self.priors
    }

    /// Forward map.
    pub fn forward(&self) -> Forward {
        self.forward
    }

    /// Maps a point of the unit hypercube to parameters.
    pub fn prior_transform(&self, u: &[f64]) -> Result<Vec<f64>> {
        if u.len() != self.dimension() {
            return Err(Error::invalid(format!(
                "model '{}' has {} parameters, got {}",
                self.name,
                self.dimension(),
                u.len()
            )));
        }
        if u.iter().any(|x| !(0.0..=1.0).contains(x)) {
            return Err(Error::invalid("unit-cube coordinate outside [0, 1]"));
        }
        Ok(self.priors.iter().zip(u).map(|(p, &x)| p.quantile(x)).collect())
    }

    /// Predicted lengths at the context's times.
    pub fn predict(&self, ctx: &ModelContext<'_>, params: &[f64]) -> Result<Vec<f64>> {
        if params.len() != self.dimension() {
            return Err(Error::invalid(format!(
                "model '{}' has {} parameters, got {}",
                self.name,
                self.dimension(),
                params.len()
            )));
        }
        let base = ctx.washburn.lengths(ctx.radius, &ctx.times)?;
        Ok(match self.forward {
            Forward::Washburn => base,
            Forward::ScaledWashburn => base.into_iter().map(|l| params[0] * l).collect(),
        })
    }

    /// Gaussian log-likelihood of the observed lengths.
    pub fn log_likelihood(&self, ctx: &ModelContext<'_>, params: &[f64]) -> Result<f64> {
        let predicted = self.predict(ctx, params)?;
        gaussian_log_likelihood(&ctx.observed, &predicted, &ctx.sigma)
    }
}

/// Everything a likelihood evaluation needs for one biscuit.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelContext<'a> {
    label: &'a str,
    radius: f64,
    washburn: WashburnModel,
    series: &'a TimeSeries,
    times: Vec<f64>,
    observed: Vec<f64>,
    sigma: Vec<f64>,
}

impl<'a> ModelContext<'a> {
    /// Binds a label, a pore radius and a series.
    ///
    /// # Errors
    ///
    /// [`crate::DomainError::InvalidInput`] for a non-positive radius, or
    /// the errors of [`WashburnModel::new`].
    pub fn new(
        label: &'a str,
        radius: f64,
        constants: &PhysicalConstants,
        series: &'a TimeSeries,
    ) -> Result<Self> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(Error::invalid(format!(
                "pore radius for '{label}' must be positive, got {radius}"
            )));
        }
        Ok(Self {
            label,
            radius,
            washburn: WashburnModel::new(constants)?,
            series,
            times: series.times(),
            observed: series.lengths(),
            sigma: series.length_errors(),
        })
    }

    /// Biscuit label.
    pub fn label(&self) -> &str {
        self.label
    }

    /// Pore radius, m.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Observed series.
    pub fn series(&self) -> &TimeSeries {
        self.series
    }

    /// Observed lengths.
    pub fn observed(&self) -> &[f64] {
        &self.observed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SeriesPoint;

    fn series() -> TimeSeries {
        TimeSeries::new(vec![
            SeriesPoint {
                t: 10.0,
                length: 0.01,
                length_error: 0.001,
            },
            SeriesPoint {
                t: 40.0,
                length: 0.02,
                length_error: 0.001,
            },
        ])
        .expect("valid")
    }

    #[test]
    fn uniform_prior_maps_unit_interval() {
        let p = Prior::uniform(0.0, 10.0).expect("valid");
        assert_eq!(p.quantile(0.25), 2.5);
        assert!(p.contains(10.0));
        assert!(!p.contains(-0.1));
        assert!(Prior::uniform(1.0, 1.0).is_err());
    }

    #[test]
    fn dimensions() {
        assert_eq!(CapillaryModel::uncorrected().dimension(), 0);
        let corrected = CapillaryModel::corrected(10.0).expect("valid");
        assert_eq!(corrected.dimension(), 1);
        assert_eq!(corrected.prior_transform(&[0.5]).expect("valid"), vec![5.0]);
        assert!(corrected.prior_transform(&[]).is_err());
        assert!(corrected.prior_transform(&[1.5]).is_err());
        assert!(CapillaryModel::corrected(0.0).is_err());
    }

    #[test]
    fn scaled_prediction_is_proportional() {
        let s = series();
        let ctx = ModelContext::new("Hobnob", 4.0e-7, &PhysicalConstants::default(), &s)
            .expect("valid");
        let plain = CapillaryModel::uncorrected().predict(&ctx, &[]).expect("valid");
        let scaled = CapillaryModel::corrected(10.0)
            .expect("valid")
            .predict(&ctx, &[2.0])
            .expect("valid");
        for (p, s) in plain.iter().zip(&scaled) {
            assert!((s - 2.0 * p).abs() < 1e-15);
        }
        assert_eq!(ctx.label(), "Hobnob");
    }

    #[test]
    fn likelihood_peaks_at_matching_scale() {
        let s = series();
        let ctx = ModelContext::new("Hobnob", 4.0e-7, &PhysicalConstants::default(), &s)
            .expect("valid");
        let model = CapillaryModel::corrected(10.0).expect("valid");
        let base = CapillaryModel::uncorrected().predict(&ctx, &[]).expect("valid");
        let best = s.lengths()[1] / base[1];
        let at_best = model.log_likelihood(&ctx, &[best]).expect("valid");
        let off = model.log_likelihood(&ctx, &[best * 1.5]).expect("valid");
        assert!(at_best > off);
    }

    #[test]
    fn context_rejects_bad_radius() {
        let s = series();
        let constants = PhysicalConstants::default();
        assert!(ModelContext::new("x", 0.0, &constants, &s).is_err());
        assert!(ModelContext::new("x", f64::NAN, &constants, &s).is_err());
    }
}
