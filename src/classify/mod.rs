//! Biscuit-type classification from dunking measurements.
//!
//! Two model families compete: a one-vs-rest RBF support vector machine
//! ([`svm`]) and a random forest ([`forest`]). [`select_best_model`] grid
//! searches both with cross-validated weighted F1 and keeps one.
//!
//! # Examples
//!
//! ```
//! use dunk_analytics::classify::LabelEncoder;
//!
//! let encoder = LabelEncoder::fit(&["Rich Tea", "Digestive", "Hobnob", "Digestive"]);
//! assert_eq!(encoder.classes(), &["Digestive", "Hobnob", "Rich Tea"]);
//! assert_eq!(encoder.encode("Hobnob").unwrap(), 1);
//! ```

mod encoding;
mod features;
pub mod forest;
mod metrics;
mod scaler;
mod selection;
pub mod svm;

pub use encoding::LabelEncoder;
pub use features::{Feature, FeatureSet};
pub use forest::{DecisionTree, ForestParams, RandomForest};
pub use metrics::{classification_report, weighted_f1, ClassMetrics, ClassificationReport};
pub use scaler::StandardScaler;
pub use selection::{
    cross_validate, expand_grid, predict, select_best_model, Estimator, FamilyResult,
    FittedClassifier, GridScore, Hyperparameters, ModelFamily, ModelSelection,
};
pub use svm::{SupportVectorClassifier, SvmParams};
