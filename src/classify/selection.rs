//! Model selection between the kernel-margin and bagged-tree families.
//!
//! Every grid point is scored by k-fold cross-validated weighted F1 on the
//! training split, with the scaler refit inside each fold. The best point of
//! each family is refit on the whole training split and evaluated on the
//! held-out split. Families are then compared in declared order: a later
//! family replaces the incumbent only with a strictly higher cross-validated
//! F1, so ties keep the earlier model.

use std::fmt;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{debug, info};

use super::encoding::LabelEncoder;
use super::features::FeatureSet;
use super::forest::{ForestParams, RandomForest};
use super::metrics::{classification_report, weighted_f1, ClassificationReport};
use super::scaler::StandardScaler;
use super::svm::{SupportVectorClassifier, SvmParams};
use crate::config::ClassifierConfig;
use crate::data::{columns, Frame};
use crate::error::{Error, Result};

/// Model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFamily {
    /// One-vs-rest RBF support vector machine.
    KernelMargin,
    /// Random forest.
    BaggedTrees,
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::KernelMargin => write!(f, "svm"),
            ModelFamily::BaggedTrees => write!(f, "random_forest"),
        }
    }
}

/// One grid point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Hyperparameters {
    /// SVM settings.
    KernelMargin(SvmParams),
    /// Forest settings.
    BaggedTrees(ForestParams),
}

impl Hyperparameters {
    /// Family the grid point belongs to.
    pub fn family(&self) -> ModelFamily {
        match self {
            Hyperparameters::KernelMargin(_) => ModelFamily::KernelMargin,
            Hyperparameters::BaggedTrees(_) => ModelFamily::BaggedTrees,
        }
    }
}

/// A trained estimator of either family.
#[derive(Debug, Clone, PartialEq)]
pub enum Estimator {
    /// Trained SVM.
    KernelMargin(SupportVectorClassifier),
    /// Trained forest.
    BaggedTrees(RandomForest),
}

impl Estimator {
    /// Trains the estimator described by `params` on scaled rows.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        n_classes: usize,
        params: &Hyperparameters,
        seed: u64,
    ) -> Result<Self> {
        Ok(match *params {
            Hyperparameters::KernelMargin(p) => {
                Estimator::KernelMargin(SupportVectorClassifier::fit(x, y, n_classes, p, seed)?)
            }
            Hyperparameters::BaggedTrees(p) => {
                Estimator::BaggedTrees(RandomForest::fit(x, y, n_classes, p, seed)?)
            }
        })
    }

    /// Class code for one scaled row.
    pub fn predict(&self, row: &[f64]) -> usize {
        match self {
            Estimator::KernelMargin(m) => m.predict(row),
            Estimator::BaggedTrees(m) => m.predict(row),
        }
    }
}

/// Cross-validated score of one grid point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridScore {
    /// Grid point.
    pub params: Hyperparameters,
    /// Mean weighted F1 over folds.
    pub cv_f1: f64,
}

/// Best grid point of one family, refit and tested.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyResult {
    /// Winning grid point and its cross-validated score.
    pub best: GridScore,
    /// Scores on the held-out split.
    pub test_report: ClassificationReport,
}

/// Scaler, estimator and label codes bundled for inference.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedClassifier {
    encoder: LabelEncoder,
    features: FeatureSet,
    scaler: StandardScaler,
    estimator: Estimator,
    params: Hyperparameters,
}

impl FittedClassifier {
    /// Family of the retained estimator.
    pub fn family(&self) -> ModelFamily {
        self.params.family()
    }

    /// Hyperparameters of the retained estimator.
    pub fn params(&self) -> &Hyperparameters {
        &self.params
    }

    /// Label codes.
    pub fn encoder(&self) -> &LabelEncoder {
        &self.encoder
    }

    /// Feature columns the model reads.
    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Training-split scaling statistics.
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Predicts the label of one unscaled feature row.
    pub fn predict_row(&self, raw: &[f64]) -> Result<String> {
        let z = self.scaler.transform_row(raw)?;
        self.encoder
            .decode(self.estimator.predict(&z))
            .map(str::to_string)
    }

    /// Predicts a label for every row of `frame`.
    ///
    /// # Errors
    ///
    /// [`Error::Schema`] if a feature column is missing.
    pub fn predict(&self, frame: &Frame) -> Result<Vec<String>> {
        self.features
            .extract(frame)?
            .iter()
            .map(|row| self.predict_row(row))
            .collect()
    }
}

/// Outcome of [`select_best_model`].
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSelection {
    /// The single retained estimator.
    pub model: FittedClassifier,
    /// Its cross-validated weighted F1.
    pub cv_f1: f64,
    /// Its held-out scores.
    pub test_report: ClassificationReport,
    /// Best result of each family, in evaluation order.
    pub families: Vec<FamilyResult>,
    /// Every grid point's score.
    pub grid: Vec<GridScore>,
    /// Rows used for training and cross-validation.
    pub train_rows: usize,
    /// Rows held out for the test report.
    pub test_rows: usize,
}

/// Predicts labels for every row of `frame` with a fitted model.
pub fn predict(model: &FittedClassifier, frame: &Frame) -> Result<Vec<String>> {
    model.predict(frame)
}

/// Expands the configured grids, SVM points first.
pub fn expand_grid(config: &ClassifierConfig) -> Vec<Hyperparameters> {
    let mut grid = Vec::new();
    for &c in &config.svm.c {
        for &gamma in &config.svm.gamma {
            grid.push(Hyperparameters::KernelMargin(SvmParams {
                c,
                gamma,
                tolerance: config.svm.tolerance,
                max_passes: config.svm.max_passes,
                max_iterations: config.svm.max_iterations,
            }));
        }
    }
    for &n_trees in &config.forest.n_trees {
        for &max_depth in &config.forest.max_depth {
            for &min_samples_split in &config.forest.min_samples_split {
                grid.push(Hyperparameters::BaggedTrees(ForestParams {
                    n_trees,
                    max_depth,
                    min_samples_split,
                    max_features: None,
                }));
            }
        }
    }
    grid
}

fn select_rows(rows: &[Vec<f64>], idx: &[usize]) -> Vec<Vec<f64>> {
    idx.iter().map(|&i| rows[i].clone()).collect()
}

fn select_codes(codes: &[usize], idx: &[usize]) -> Vec<usize> {
    idx.iter().map(|&i| codes[i]).collect()
}

/// Fits scaler and estimator on `train`, returns predictions for `test`.
fn fit_and_predict(
    x: &[Vec<f64>],
    y: &[usize],
    train: &[usize],
    test: &[usize],
    n_classes: usize,
    params: &Hyperparameters,
    seed: u64,
) -> Result<(StandardScaler, Estimator, Vec<usize>)> {
    let x_train = select_rows(x, train);
    let scaler = StandardScaler::fit(&x_train)?;
    let z_train = scaler.transform(&x_train)?;
    let estimator = Estimator::fit(&z_train, &select_codes(y, train), n_classes, params, seed)?;
    let predictions = scaler
        .transform(&select_rows(x, test))?
        .iter()
        .map(|row| estimator.predict(row))
        .collect();
    Ok((scaler, estimator, predictions))
}

/// Mean weighted F1 over `folds` contiguous folds of `rows`.
pub fn cross_validate(
    x: &[Vec<f64>],
    y: &[usize],
    rows: &[usize],
    n_classes: usize,
    params: &Hyperparameters,
    folds: usize,
    seed: u64,
) -> Result<f64> {
    let n = rows.len();
    if folds < 2 || n < folds {
        return Err(Error::invalid(format!(
            "cannot split {n} rows into {folds} folds"
        )));
    }

    let mut total = 0.0;
    for fold in 0..folds {
        let start = fold * n / folds;
        let end = (fold + 1) * n / folds;
        let val: Vec<usize> = rows[start..end].to_vec();
        let train: Vec<usize> = rows[..start].iter().chain(&rows[end..]).copied().collect();

        let (_, _, predicted) = fit_and_predict(
            x,
            y,
            &train,
            &val,
            n_classes,
            params,
            seed.wrapping_add(fold as u64),
        )?;
        total += weighted_f1(&select_codes(y, &val), &predicted, n_classes);
    }
    Ok(total / folds as f64)
}

/// Chooses and fits the biscuit-type classifier.
///
/// `labels` is the closed label set; when empty, the set is taken from the
/// training rows. Label codes follow the sorted unique label list.
///
/// # Errors
///
/// - [`Error::Schema`] if a feature column or the `biscuit` column is
///   missing; raised before any fitting.
/// - [`Error::UnknownLabel`] if a training label is outside `labels`.
/// - [`crate::DomainError::InvalidInput`] if there are too few rows for the
///   split and folds, or the grid is empty.
pub fn select_best_model(
    training: &Frame,
    labels: &[String],
    config: &ClassifierConfig,
) -> Result<ModelSelection> {
    let features = FeatureSet::new(config.features.clone());
    training.require(&features.required_columns(), &[columns::BISCUIT])?;

    let raw_labels = training.text(columns::BISCUIT)?;
    let encoder = if labels.is_empty() {
        LabelEncoder::fit(raw_labels)
    } else {
        LabelEncoder::fit(labels)
    };
    let y = encoder.encode_all(raw_labels)?;
    let x = features.extract(training)?;
    let n_classes = encoder.len();

    let n = x.len();
    if n < 2 {
        return Err(Error::invalid("need at least two training rows"));
    }
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.seed);
    order.shuffle(&mut rng);
    let n_test = ((n as f64 * config.test_fraction).round() as usize).clamp(1, n - 1);
    let (test, train) = order.split_at(n_test);

    let grid = expand_grid(config);
    if grid.is_empty() {
        return Err(Error::invalid("hyperparameter grid is empty"));
    }

    info!(
        rows = n,
        train = train.len(),
        test = test.len(),
        grid = grid.len(),
        folds = config.folds,
        "searching classifier grid"
    );

    let mut scores = Vec::with_capacity(grid.len());
    for params in &grid {
        let cv_f1 = cross_validate(&x, &y, train, n_classes, params, config.folds, config.seed)?;
        debug!(family = %params.family(), ?params, cv_f1, "grid point scored");
        scores.push(GridScore {
            params: *params,
            cv_f1,
        });
    }

    let y_test = select_codes(&y, test);
    let mut families: Vec<FamilyResult> = Vec::new();
    let mut incumbent: Option<(usize, StandardScaler, Estimator)> = None;

    for family in [ModelFamily::KernelMargin, ModelFamily::BaggedTrees] {
        let mut best: Option<GridScore> = None;
        for s in scores.iter().filter(|s| s.params.family() == family) {
            if best.map_or(true, |b| s.cv_f1 > b.cv_f1) {
                best = Some(*s);
            }
        }
        let Some(best) = best else { continue };

        let (scaler, estimator, predicted) =
            fit_and_predict(&x, &y, train, test, n_classes, &best.params, config.seed)?;
        let test_report = classification_report(&y_test, &predicted, n_classes);
        info!(
            family = %family,
            cv_f1 = best.cv_f1,
            test_f1 = test_report.f1,
            "family best refit"
        );

        let replaces = match &incumbent {
            None => true,
            Some((i, _, _)) => best.cv_f1 > families[*i].best.cv_f1,
        };
        families.push(FamilyResult { best, test_report });
        if replaces {
            incumbent = Some((families.len() - 1, scaler, estimator));
        }
    }

    let (winner, scaler, estimator) =
        incumbent.ok_or_else(|| Error::invalid("no model family produced a candidate"))?;
    let chosen = &families[winner];
    info!(
        family = %chosen.best.params.family(),
        cv_f1 = chosen.best.cv_f1,
        test_f1 = chosen.test_report.f1,
        precision = chosen.test_report.precision,
        recall = chosen.test_report.recall,
        "selected classifier"
    );

    Ok(ModelSelection {
        cv_f1: chosen.best.cv_f1,
        test_report: chosen.test_report.clone(),
        model: FittedClassifier {
            encoder,
            features,
            scaler,
            estimator,
            params: chosen.best.params,
        },
        families,
        grid: scores,
        train_rows: train.len(),
        test_rows: test.len(),
    })
}
