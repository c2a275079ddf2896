//! Analysis configuration.
//!
//! Physical constants, prior ranges, sampler settings, classifier grids and
//! the explicit assignment of time-resolved series files to labels. All
//! values default to the reference analysis; a JSON file may override any
//! subset of them.
//!
//! # Examples
//!
//! ```
//! use dunk_analytics::config::AnalysisConfig;
//!
//! let config = AnalysisConfig::from_json_str(r#"{ "correction_max": 5.0 }"#).unwrap();
//! assert_eq!(config.correction_max, 5.0);
//! assert_eq!(config.mcmc.chains, 10);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::Feature;
use crate::error::{Error, Result};

/// Tea properties entering the Washburn relation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalConstants {
    /// Surface tension, N/m.
    pub gamma: f64,
    /// Contact angle, rad.
    pub phi: f64,
    /// Dynamic viscosity, Pa·s.
    pub eta: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            gamma: 6.78e-2,
            phi: 1.45,
            eta: 9.93e-4,
        }
    }
}

/// Uniform prior bounds for the pore radius, m.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiusPrior {
    /// Lower bound.
    pub low: f64,
    /// Upper bound.
    pub high: f64,
}

impl Default for RadiusPrior {
    fn default() -> Self {
        Self {
            low: 1.5e-7,
            high: 1.2e-6,
        }
    }
}

/// Random-walk Metropolis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McmcConfig {
    /// Number of independent chains.
    pub chains: usize,
    /// Warm-up draws per chain (discarded; proposal scale adapts).
    pub tune: usize,
    /// Retained draws per chain.
    pub draws: usize,
    /// Base seed; chain `c` uses `seed + c`.
    pub seed: u64,
    /// Acceptance rate the proposal scale adapts towards.
    pub target_accept: f64,
    /// Largest acceptable split R̂.
    pub max_r_hat: f64,
}

impl Default for McmcConfig {
    fn default() -> Self {
        Self {
            chains: 10,
            tune: 1000,
            draws: 1000,
            seed: 42,
            target_accept: 0.44,
            max_r_hat: 1.05,
        }
    }
}

/// Static nested sampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NestedConfig {
    /// Number of live points.
    pub live_points: usize,
    /// Stop when the estimated remaining log-evidence falls below this.
    pub dlogz: f64,
    /// Random-walk steps per replacement draw.
    pub walk_steps: usize,
    /// Hard cap on dead points.
    pub max_iterations: usize,
    /// RNG seed.
    pub seed: u64,
}

impl Default for NestedConfig {
    fn default() -> Self {
        Self {
            live_points: 400,
            dlogz: 0.01,
            walk_steps: 25,
            max_iterations: 100_000,
            seed: 7,
        }
    }
}

/// Hyperparameter grid for the kernel-margin classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmGrid {
    /// Box constraint values.
    pub c: Vec<f64>,
    /// RBF kernel widths.
    pub gamma: Vec<f64>,
    /// KKT tolerance.
    pub tolerance: f64,
    /// Consecutive passes without change before SMO stops.
    pub max_passes: usize,
    /// Hard cap on SMO passes.
    pub max_iterations: usize,
}

impl Default for SvmGrid {
    fn default() -> Self {
        Self {
            c: vec![0.1, 1.0, 10.0],
            gamma: vec![0.1, 1.0],
            tolerance: 1e-3,
            max_passes: 5,
            max_iterations: 200,
        }
    }
}

/// Hyperparameter grid for the bagged-tree ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestGrid {
    /// Tree counts.
    pub n_trees: Vec<usize>,
    /// Depth limits (`None` grows until pure).
    pub max_depth: Vec<Option<usize>>,
    /// Minimum node size eligible for splitting.
    pub min_samples_split: Vec<usize>,
}

impl Default for ForestGrid {
    fn default() -> Self {
        Self {
            n_trees: vec![25, 100],
            max_depth: vec![None, Some(5)],
            min_samples_split: vec![2],
        }
    }
}

/// Classifier selection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Cross-validation folds.
    pub folds: usize,
    /// Fraction of rows held out for the test report.
    pub test_fraction: f64,
    /// Seed for the split, bootstraps and SMO partner choice.
    pub seed: u64,
    /// Feature columns fed to the models.
    pub features: Vec<Feature>,
    /// Kernel-margin grid.
    pub svm: SvmGrid,
    /// Bagged-tree grid.
    pub forest: ForestGrid,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            folds: 5,
            test_fraction: 0.2,
            seed: 0,
            features: Feature::all().to_vec(),
            svm: SvmGrid::default(),
            forest: ForestGrid::default(),
        }
    }
}

/// Assignment of one time-resolved series file to a label.
///
/// The mapping is supplied externally; it is never inferred from the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesAssignment {
    /// Biscuit label.
    pub label: String,
    /// Path to a `t,L,dL` file.
    pub path: PathBuf,
}

/// Input and output locations for the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    /// Labelled dunking trials.
    pub measurements: PathBuf,
    /// Microscopy trials with pore radius and no label.
    pub microscopy: PathBuf,
    /// Output: per-label radius table.
    pub radius_table: PathBuf,
    /// Output: per-label model comparison table.
    pub comparison_table: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            measurements: PathBuf::from("data/dunking-data.csv"),
            microscopy: PathBuf::from("data/microscopy-data.csv"),
            radius_table: PathBuf::from("biscuit_radii.csv"),
            comparison_table: PathBuf::from("bayes_factors.csv"),
        }
    }
}

/// Complete analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Tea properties.
    pub constants: PhysicalConstants,
    /// Pore radius prior for the MCMC fit.
    pub radius_prior: RadiusPrior,
    /// Upper bound of the Uniform(0, max) correction-factor prior.
    pub correction_max: f64,
    /// The closed set of biscuit labels.
    pub labels: Vec<String>,
    /// Time-resolved series per label.
    pub series: Vec<SeriesAssignment>,
    /// MCMC settings.
    pub mcmc: McmcConfig,
    /// Nested sampling settings.
    pub nested: NestedConfig,
    /// Classifier settings.
    pub classifier: ClassifierConfig,
    /// File locations.
    pub paths: DataPaths,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            constants: PhysicalConstants::default(),
            radius_prior: RadiusPrior::default(),
            correction_max: 10.0,
            labels: vec![
                "Digestive".to_string(),
                "Hobnob".to_string(),
                "Rich Tea".to_string(),
            ],
            series: vec![
                SeriesAssignment {
                    label: "Digestive".to_string(),
                    path: PathBuf::from("data/tr-1.csv"),
                },
                SeriesAssignment {
                    label: "Hobnob".to_string(),
                    path: PathBuf::from("data/tr-2.csv"),
                },
                SeriesAssignment {
                    label: "Rich Tea".to_string(),
                    path: PathBuf::from("data/tr-3.csv"),
                },
            ],
            mcmc: McmcConfig::default(),
            nested: NestedConfig::default(),
            classifier: ClassifierConfig::default(),
            paths: DataPaths::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        let c = &self.constants;
        if !(c.gamma.is_finite() && c.gamma > 0.0) {
            return Err(Error::Config(format!("gamma must be positive, got {}", c.gamma)));
        }
        if !(c.eta.is_finite() && c.eta > 0.0) {
            return Err(Error::Config(format!("eta must be positive, got {}", c.eta)));
        }
        if !c.phi.is_finite() {
            return Err(Error::Config("phi must be finite".to_string()));
        }

        let p = &self.radius_prior;
        if !(p.low.is_finite() && p.high.is_finite() && 0.0 <= p.low && p.low < p.high) {
            return Err(Error::Config(format!(
                "radius prior must satisfy 0 <= low < high, got [{}, {}]",
                p.low, p.high
            )));
        }
        if !(self.correction_max.is_finite() && self.correction_max > 0.0) {
            return Err(Error::Config(format!(
                "correction_max must be positive, got {}",
                self.correction_max
            )));
        }

        if self.labels.is_empty() {
            return Err(Error::Config("label set is empty".to_string()));
        }
        let mut sorted = self.labels.clone();
        sorted.sort();
        sorted.dedup();
        if sorted.len() != self.labels.len() {
            return Err(Error::Config("label set contains duplicates".to_string()));
        }
        for (i, assignment) in self.series.iter().enumerate() {
            if !self.labels.contains(&assignment.label) {
                return Err(Error::Config(format!(
                    "series '{}' assigned to unknown label '{}'",
                    assignment.path.display(),
                    assignment.label
                )));
            }
            if self.series[..i].iter().any(|s| s.label == assignment.label) {
                return Err(Error::Config(format!(
                    "label '{}' has more than one series",
                    assignment.label
                )));
            }
        }

        let m = &self.mcmc;
        if m.chains < 2 {
            return Err(Error::Config("mcmc needs at least 2 chains for R-hat".to_string()));
        }
        if m.draws < 4 {
            return Err(Error::Config("mcmc needs at least 4 retained draws".to_string()));
        }
        if !(m.target_accept > 0.0 && m.target_accept < 1.0) {
            return Err(Error::Config("target_accept must lie in (0, 1)".to_string()));
        }
        if m.max_r_hat.is_nan() || m.max_r_hat < 1.0 {
            return Err(Error::Config("max_r_hat must be at least 1".to_string()));
        }

        let n = &self.nested;
        if n.live_points < 2 {
            return Err(Error::Config("nested sampling needs at least 2 live points".to_string()));
        }
        if !(n.dlogz.is_finite() && n.dlogz > 0.0) {
            return Err(Error::Config("dlogz must be positive".to_string()));
        }
        if n.walk_steps == 0 {
            return Err(Error::Config("walk_steps must be positive".to_string()));
        }

        let k = &self.classifier;
        if k.folds < 2 {
            return Err(Error::Config("cross-validation needs at least 2 folds".to_string()));
        }
        if !(k.test_fraction > 0.0 && k.test_fraction < 1.0) {
            return Err(Error::Config("test_fraction must lie in (0, 1)".to_string()));
        }
        if k.features.is_empty() {
            return Err(Error::Config("feature list is empty".to_string()));
        }
        if k.svm.c.is_empty() && k.forest.n_trees.is_empty() {
            return Err(Error::Config("both hyperparameter grids are empty".to_string()));
        }
        if k.svm.c.iter().chain(k.svm.gamma.iter()).any(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(Error::Config("SVM grid values must be positive".to_string()));
        }
        if k.forest.n_trees.contains(&0) {
            return Err(Error::Config("forest tree count must be positive".to_string()));
        }

        Ok(())
    }
}
