//! End-to-end analysis.
//!
//! Per-biscuit results are built as a chain of stage records. Each stage
//! consumes the previous one by value and returns a more complete record:
//!
//! [`RadiusStage`] → [`FittedStage`] → [`ComparedStage`] → [`BiscuitSummary`]
//!
//! [`analyze`] runs every stage on in-memory inputs; [`run_analysis`] loads
//! the inputs named by the configuration and writes both output tables.

use std::collections::BTreeMap;

use tracing::info;

use crate::bayes::{compare_models, fit_radius, ModelComparison, ModelContext, RadiusPosterior};
use crate::classify::{select_best_model, ModelSelection};
use crate::config::{AnalysisConfig, McmcConfig, NestedConfig, PhysicalConstants, RadiusPrior};
use crate::data::{columns, load_measurements, load_microscopy, load_series, Frame, TimeSeries};
use crate::distribution::{estimate_radius_distributions, NormalFit};
use crate::error::{DomainError, Result};
use crate::report::{write_comparison_table, write_radius_table};
use crate::testing::agreement;

/// A label with its pore radius distribution and time-resolved series.
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusStage {
    /// Biscuit label.
    pub label: String,
    /// Radius distribution from classified microscopy trials.
    pub distribution: NormalFit,
    /// Time-resolved series assigned to the label.
    pub series: TimeSeries,
}

/// [`RadiusStage`] plus the MCMC radius and its agreement with the
/// distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedStage {
    /// Previous stage.
    pub radius: RadiusStage,
    /// Posterior of r from the series.
    pub posterior: RadiusPosterior,
    /// Two-tailed tail probability of the MCMC radius, percent.
    pub tail_probability: f64,
    /// Distance of the MCMC radius from the distribution mean, in std.
    pub std_distance: f64,
}

/// [`FittedStage`] plus the Bayesian model comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparedStage {
    /// Previous stage.
    pub fitted: FittedStage,
    /// Evidence of the plain and corrected models.
    pub comparison: ModelComparison,
}

/// Final per-biscuit record.
#[derive(Debug, Clone, PartialEq)]
pub struct BiscuitSummary {
    /// Biscuit label.
    pub label: String,
    /// Mean pore radius from microscopy, m.
    pub pore_radius_mean: f64,
    /// Std of the pore radius from microscopy, m.
    pub pore_radius_std: f64,
    /// Time-resolved series.
    pub series: TimeSeries,
    /// Posterior mean radius from the series, m.
    pub mcmc_radius: f64,
    /// Posterior mean correction factor a0.
    pub correction_mean: f64,
    /// Tail probability of the MCMC radius, percent.
    pub tail_probability: f64,
    /// Distance of the MCMC radius from the microscopy mean, in std.
    pub std_distance: f64,
    /// ln Z(corrected) - ln Z(uncorrected).
    pub bayes_factor: f64,
    /// MSE of the plain Washburn lengths.
    pub mse_uncorrected: f64,
    /// MSE of the corrected lengths.
    pub mse_corrected: f64,
}

impl RadiusStage {
    /// Starts a record.
    pub fn new(label: impl Into<String>, distribution: NormalFit, series: TimeSeries) -> Self {
        Self {
            label: label.into(),
            distribution,
            series,
        }
    }

    /// Fits r by MCMC and compares it with the microscopy distribution.
    ///
    /// # Errors
    ///
    /// Sampler errors, and [`DomainError::ZeroStd`] when the distribution
    /// has zero spread.
    pub fn fit(
        self,
        prior: &RadiusPrior,
        constants: &PhysicalConstants,
        settings: &McmcConfig,
    ) -> Result<FittedStage> {
        let posterior = fit_radius(&self.series, prior, constants, settings)?;
        let a = agreement(self.distribution.mean, self.distribution.std, posterior.mean)?;
        info!(
            label = %self.label,
            mcmc_r = posterior.mean,
            tail_probability = a.tail_probability,
            std_distance = a.std_distance,
            "radius fitted"
        );
        Ok(FittedStage {
            radius: self,
            posterior,
            tail_probability: a.tail_probability,
            std_distance: a.std_distance,
        })
    }
}

impl FittedStage {
    /// Compares the plain and corrected models at the distribution's mean
    /// radius.
    pub fn compare(
        self,
        constants: &PhysicalConstants,
        correction_max: f64,
        settings: &NestedConfig,
    ) -> Result<ComparedStage> {
        let stage = &self.radius;
        let ctx = ModelContext::new(&stage.label, stage.distribution.mean, constants, &stage.series)?;
        let comparison = compare_models(&ctx, correction_max, settings)?;
        Ok(ComparedStage {
            fitted: self,
            comparison,
        })
    }
}

impl ComparedStage {
    /// Flattens the stages into the final record.
    pub fn finish(self) -> BiscuitSummary {
        let ComparedStage { fitted, comparison } = self;
        let FittedStage {
            radius,
            posterior,
            tail_probability,
            std_distance,
        } = fitted;
        BiscuitSummary {
            label: radius.label,
            pore_radius_mean: radius.distribution.mean,
            pore_radius_std: radius.distribution.std,
            series: radius.series,
            mcmc_radius: posterior.mean,
            correction_mean: comparison.correction_mean,
            tail_probability,
            std_distance,
            bayes_factor: comparison.bayes_factor,
            mse_uncorrected: comparison.mse_uncorrected,
            mse_corrected: comparison.mse_corrected,
        }
    }
}

/// In-memory inputs of one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisInputs {
    /// Labelled dunking trials.
    pub measurements: Frame,
    /// Unlabelled trials with pore radius.
    pub microscopy: Frame,
    /// Time-resolved series per label.
    pub series: Vec<(String, TimeSeries)>,
}

/// Everything the analysis produced.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    /// Classifier search outcome.
    pub selection: ModelSelection,
    /// Predicted label of every microscopy row.
    pub microscopy_labels: Vec<String>,
    /// Pore radius distribution per label.
    pub distributions: BTreeMap<String, NormalFit>,
    /// One summary per assigned series, in assignment order.
    pub summaries: Vec<BiscuitSummary>,
}

/// Runs every stage on in-memory inputs.
///
/// # Errors
///
/// Any stage error; nothing is retried.
pub fn analyze(inputs: &AnalysisInputs, config: &AnalysisConfig) -> Result<AnalysisReport> {
    config.validate()?;

    info!(
        measurements = inputs.measurements.len(),
        microscopy = inputs.microscopy.len(),
        "selecting classifier"
    );
    let selection = select_best_model(&inputs.measurements, &config.labels, &config.classifier)?;

    let radii = inputs.microscopy.numeric(columns::RADIUS)?;
    let microscopy_labels = selection.model.predict(&inputs.microscopy)?;
    info!(rows = microscopy_labels.len(), "microscopy classified");

    let distributions = estimate_radius_distributions(&microscopy_labels, radii, &config.labels)?;

    let mut summaries = Vec::with_capacity(inputs.series.len());
    for (label, series) in &inputs.series {
        let distribution = *distributions
            .get(label)
            .ok_or_else(|| DomainError::EmptyBucket(label.clone()))?;
        info!(label = %label, points = series.len(), "analysing series");

        let summary = RadiusStage::new(label.clone(), distribution, series.clone())
            .fit(&config.radius_prior, &config.constants, &config.mcmc)?
            .compare(&config.constants, config.correction_max, &config.nested)?
            .finish();
        summaries.push(summary);
    }

    Ok(AnalysisReport {
        selection,
        microscopy_labels,
        distributions,
        summaries,
    })
}

/// Loads the configured inputs, runs [`analyze`] and writes both tables.
pub fn run_analysis(config: &AnalysisConfig) -> Result<AnalysisReport> {
    config.validate()?;
    let paths = &config.paths;

    info!(path = %paths.measurements.display(), "loading measurements");
    let measurements = load_measurements(&paths.measurements)?;
    info!(path = %paths.microscopy.display(), "loading microscopy");
    let microscopy = load_microscopy(&paths.microscopy)?;
    let series = config
        .series
        .iter()
        .map(|a| Ok((a.label.clone(), load_series(&a.path)?)))
        .collect::<Result<Vec<_>>>()?;

    let report = analyze(
        &AnalysisInputs {
            measurements,
            microscopy,
            series,
        },
        config,
    )?;

    write_radius_table(&paths.radius_table, &report.summaries)?;
    write_comparison_table(&paths.comparison_table, &report.summaries)?;
    info!(
        radius_table = %paths.radius_table.display(),
        comparison_table = %paths.comparison_table.display(),
        "tables written"
    );
    Ok(report)
}
