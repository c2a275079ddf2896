//! Bayes factor between the plain and the corrected Washburn model.

use tracing::info;

use super::model::{CapillaryModel, ModelContext};
use super::nested::{nested_sampling, NestedSamplingResult};
use crate::config::NestedConfig;
use crate::error::{Error, Result};

/// Evidence summary of one model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEvidence {
    /// Model name.
    pub name: String,
    /// ln Z.
    pub log_evidence: f64,
    /// Statistical uncertainty of ln Z.
    pub log_evidence_error: f64,
    /// Information H, nats.
    pub information: f64,
    /// Posterior mean of the free parameters.
    pub posterior_mean: Vec<f64>,
}

impl ModelEvidence {
    fn new(model: &CapillaryModel, result: NestedSamplingResult) -> Self {
        Self {
            name: model.name().to_string(),
            log_evidence: result.log_evidence,
            log_evidence_error: result.log_evidence_error,
            information: result.information,
            posterior_mean: result.posterior_mean,
        }
    }
}

/// Comparison of the two models for one biscuit.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelComparison {
    /// Biscuit label.
    pub label: String,
    /// Plain Washburn model.
    pub uncorrected: ModelEvidence,
    /// Washburn scaled by a0.
    pub corrected: ModelEvidence,
    /// ln Z(corrected) - ln Z(uncorrected); positive favours the correction.
    pub bayes_factor: f64,
    /// Posterior mean of a0.
    pub correction_mean: f64,
    /// Mean squared error of the plain model's lengths.
    pub mse_uncorrected: f64,
    /// Mean squared error of the corrected model at the posterior mean a0.
    pub mse_corrected: f64,
}

/// Mean of squared differences.
///
/// # Errors
///
/// [`crate::DomainError::InvalidInput`] for empty or unequal slices.
pub fn mean_squared_error(observed: &[f64], predicted: &[f64]) -> Result<f64> {
    if observed.is_empty() || observed.len() != predicted.len() {
        return Err(Error::invalid(format!(
            "mse needs equal non-empty slices, got {} and {}",
            observed.len(),
            predicted.len()
        )));
    }
    Ok(observed
        .iter()
        .zip(predicted)
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        / observed.len() as f64)
}

/// Runs nested sampling on both models and reports their Bayes factor.
///
/// # Errors
///
/// Invalid `correction_max` or sampler settings, and likelihood errors.
pub fn compare_models(
    ctx: &ModelContext<'_>,
    correction_max: f64,
    settings: &NestedConfig,
) -> Result<ModelComparison> {
    let plain = CapillaryModel::uncorrected();
    let scaled = CapillaryModel::corrected(correction_max)?;

    let uncorrected = ModelEvidence::new(&plain, nested_sampling(&plain, ctx, settings)?);
    let corrected = ModelEvidence::new(&scaled, nested_sampling(&scaled, ctx, settings)?);

    let correction_mean = corrected
        .posterior_mean
        .first()
        .copied()
        .ok_or_else(|| Error::invalid("corrected model returned no posterior mean"))?;
    let mse_uncorrected = mean_squared_error(ctx.observed(), &plain.predict(ctx, &[])?)?;
    let mse_corrected =
        mean_squared_error(ctx.observed(), &scaled.predict(ctx, &[correction_mean])?)?;
    let bayes_factor = corrected.log_evidence - uncorrected.log_evidence;

    info!(
        label = ctx.label(),
        bayes_factor,
        correction_mean,
        mse_uncorrected,
        mse_corrected,
        "model comparison"
    );

    Ok(ModelComparison {
        label: ctx.label().to_string(),
        uncorrected,
        corrected,
        bayes_factor,
        correction_mean,
        mse_uncorrected,
        mse_corrected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicalConstants;
    use crate::data::{SeriesPoint, TimeSeries};
    use crate::washburn::WashburnModel;

    const RADIUS: f64 = 5.0e-7;

    fn series(a0: f64) -> TimeSeries {
        let model = WashburnModel::new(&PhysicalConstants::default()).expect("valid");
        let points = (1..=20)
            .map(|i| {
                let t = i as f64 * 3.0;
                let length = a0 * model.length(RADIUS, t).expect("valid");
                SeriesPoint {
                    t,
                    length,
                    length_error: 0.02 * length,
                }
            })
            .collect();
        TimeSeries::new(points).expect("valid")
    }

    fn settings() -> NestedConfig {
        NestedConfig {
            live_points: 150,
            ..NestedConfig::default()
        }
    }

    #[test]
    fn mse_basic() {
        assert_eq!(mean_squared_error(&[1.0, 2.0], &[1.0, 4.0]).expect("valid"), 2.0);
        assert!(mean_squared_error(&[], &[]).is_err());
        assert!(mean_squared_error(&[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn scaled_data_favours_correction() {
        let s = series(1.5);
        let ctx = ModelContext::new("Hobnob", RADIUS, &PhysicalConstants::default(), &s)
            .expect("valid");
        let cmp = compare_models(&ctx, 10.0, &settings()).expect("valid");
        assert!(cmp.bayes_factor > 5.0, "ln B = {}", cmp.bayes_factor);
        assert!((cmp.correction_mean - 1.5).abs() / 1.5 < 0.05, "a0 = {}", cmp.correction_mean);
        assert!(cmp.mse_corrected < cmp.mse_uncorrected);
        assert_eq!(cmp.label, "Hobnob");
        assert_eq!(cmp.uncorrected.name, "washburn");
    }

    #[test]
    fn exact_washburn_data_favours_plain_model() {
        let s = series(1.0);
        let ctx = ModelContext::new("Digestive", RADIUS, &PhysicalConstants::default(), &s)
            .expect("valid");
        let cmp = compare_models(&ctx, 10.0, &settings()).expect("valid");
        assert!(cmp.bayes_factor < 0.0, "ln B = {}", cmp.bayes_factor);
        assert_eq!(cmp.mse_uncorrected, 0.0);
    }

    #[test]
    fn invalid_correction_bound() {
        let s = series(1.0);
        let ctx = ModelContext::new("Digestive", RADIUS, &PhysicalConstants::default(), &s)
            .expect("valid");
        assert!(compare_models(&ctx, -1.0, &settings()).is_err());
    }
}
