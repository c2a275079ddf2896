//! Pore radius distributions per biscuit type.
//!
//! The classifier assigns a label to every microscopy trial; the radii of
//! the trials sharing a label are summarised by a fitted Normal. When the
//! microscopy rows coincide exactly with labelled measurement rows, the
//! true labels can be joined in instead.
//!
//! # Examples
//!
//! ```
//! use dunk_analytics::distribution::estimate_radius_distributions;
//!
//! let predicted = vec!["Hobnob".to_string(), "Hobnob".to_string(), "Digestive".to_string()];
//! let radii = [2.0e-7, 4.0e-7, 8.0e-7];
//! let labels = vec!["Digestive".to_string(), "Hobnob".to_string()];
//! let fits = estimate_radius_distributions(&predicted, &radii, &labels).unwrap();
//! assert!((fits["Hobnob"].mean - 3.0e-7).abs() < 1e-20);
//! assert_eq!(fits["Digestive"].n, 1);
//! ```

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};
use u_numflow::stats;

use crate::data::{columns, Frame};
use crate::error::{DomainError, Error, Result};

/// Normal fit by maximum likelihood.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalFit {
    /// μ̂ = x̄.
    pub mean: f64,
    /// σ̂ = √((1/n) Σ(xᵢ - x̄)²), the biased MLE. Zero for a single value.
    pub std: f64,
    /// Number of values.
    pub n: usize,
}

impl NormalFit {
    /// Log-likelihood at the MLE: -n/2·ln(2π) - n·ln(σ) - n/2.
    ///
    /// `None` when σ̂ = 0.
    pub fn log_likelihood(&self) -> Option<f64> {
        if self.std <= 0.0 {
            return None;
        }
        let nf = self.n as f64;
        Some(-nf / 2.0 * (2.0 * std::f64::consts::PI).ln() - nf * self.std.ln() - nf / 2.0)
    }
}

/// Fits a Normal distribution N(μ, σ²) via MLE.
///
/// # Errors
///
/// [`DomainError::EmptyBucket`] for no data, [`DomainError::InvalidInput`]
/// for non-finite values.
///
/// # Examples
///
/// ```
/// use dunk_analytics::distribution::fit_normal;
///
/// let fit = fit_normal(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
/// assert!((fit.mean - 5.0).abs() < 1e-12);
/// assert!((fit.std - 2.0).abs() < 1e-12);
/// ```
pub fn fit_normal(data: &[f64]) -> Result<NormalFit> {
    if data.iter().any(|v| !v.is_finite()) {
        return Err(Error::invalid("non-finite value in normal fit"));
    }
    let mean = stats::mean(data)
        .ok_or_else(|| DomainError::EmptyBucket("no values to fit".to_string()))?;

    // Biased MLE variance (denominator n, not n-1)
    let nf = data.len() as f64;
    let sum_sq: f64 = data.iter().map(|&x| (x - mean).powi(2)).sum();
    Ok(NormalFit {
        mean,
        std: (sum_sq / nf).sqrt(),
        n: data.len(),
    })
}

/// Groups `radii` by predicted label and fits a Normal to every label that
/// received at least one trial.
///
/// `predicted[i]` is the label of the trial whose radius is `radii[i]`.
/// Labels without trials are absent from the map; callers that need one
/// report [`DomainError::EmptyBucket`] themselves.
///
/// # Errors
///
/// - [`DomainError::InvalidInput`] if the slices differ in length.
/// - [`Error::UnknownLabel`] if a prediction is outside `labels`.
pub fn estimate_radius_distributions(
    predicted: &[String],
    radii: &[f64],
    labels: &[String],
) -> Result<BTreeMap<String, NormalFit>> {
    if predicted.len() != radii.len() {
        return Err(Error::invalid(format!(
            "{} predictions for {} radii",
            predicted.len(),
            radii.len()
        )));
    }

    let mut buckets: BTreeMap<&str, Vec<f64>> =
        labels.iter().map(|l| (l.as_str(), Vec::new())).collect();
    for (label, &r) in predicted.iter().zip(radii) {
        let bucket = buckets.get_mut(label.as_str()).ok_or_else(|| Error::UnknownLabel {
            label: label.clone(),
            known: labels.to_vec(),
        })?;
        bucket.push(r);
    }

    let mut fits = BTreeMap::new();
    for (label, values) in buckets {
        if values.is_empty() {
            debug!(label, "no trials predicted for label");
            continue;
        }
        let fit = fit_normal(&values)?;
        debug!(label, mean = fit.mean, std = fit.std, n = fit.n, "radius distribution");
        fits.insert(label.to_string(), fit);
    }
    Ok(fits)
}

/// Bit patterns of the shared columns of one row.
type JoinKey = [u64; 5];

fn join_keys(frame: &Frame) -> Result<Vec<JoinKey>> {
    let cols = columns::SHARED
        .iter()
        .map(|c| frame.numeric(c))
        .collect::<Result<Vec<_>>>()?;
    Ok((0..frame.len())
        .map(|i| {
            let mut key = [0u64; 5];
            for (k, col) in key.iter_mut().zip(&cols) {
                *k = col[i].to_bits();
            }
            key
        })
        .collect())
}

/// Radius distributions using true labels joined from `measurements`.
///
/// A microscopy row matches every measurement row whose `gamma`, `phi`,
/// `eta`, `L` and `t` are bitwise equal, and contributes its radius once
/// per match. Labels without any matched row are left out.
///
/// # Errors
///
/// [`Error::Schema`] if either frame lacks a shared column, `measurements`
/// lacks `biscuit` or `microscopy` lacks `r`.
pub fn true_radius_distributions(
    measurements: &Frame,
    microscopy: &Frame,
) -> Result<BTreeMap<String, NormalFit>> {
    measurements.require(&columns::SHARED, &[columns::BISCUIT])?;
    let mut needed = columns::SHARED.to_vec();
    needed.push(columns::RADIUS);
    microscopy.require(&needed, &[])?;

    let labels = measurements.text(columns::BISCUIT)?;
    let mut index: HashMap<JoinKey, Vec<&str>> = HashMap::new();
    for (key, label) in join_keys(measurements)?.into_iter().zip(labels) {
        index.entry(key).or_default().push(label.as_str());
    }

    let radii = microscopy.numeric(columns::RADIUS)?;
    let mut buckets: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut unmatched = 0usize;
    for (key, &r) in join_keys(microscopy)?.iter().zip(radii) {
        match index.get(key) {
            Some(matches) => {
                for label in matches {
                    buckets.entry((*label).to_string()).or_default().push(r);
                }
            }
            None => unmatched += 1,
        }
    }
    if unmatched > 0 {
        warn!(unmatched, "microscopy rows without a labelled counterpart");
    }

    buckets
        .into_iter()
        .map(|(label, values)| fit_normal(&values).map(|fit| (label, fit)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn fit_normal_uses_population_std() {
        let fit = fit_normal(&[1.0, 3.0]).expect("valid");
        assert_eq!(fit.mean, 2.0);
        assert_eq!(fit.std, 1.0);
        assert!(fit.log_likelihood().expect("positive std").is_finite());
    }

    #[test]
    fn fit_normal_single_value() {
        let fit = fit_normal(&[4.0e-7]).expect("valid");
        assert_eq!(fit.std, 0.0);
        assert!(fit.log_likelihood().is_none());
    }

    #[test]
    fn fit_normal_rejects_bad_input() {
        assert!(matches!(
            fit_normal(&[]),
            Err(Error::Domain(DomainError::EmptyBucket(_)))
        ));
        assert!(fit_normal(&[1.0, f64::NAN]).is_err());
    }

    #[test]
    fn buckets_follow_predictions() {
        let labels = strings(&["A", "B"]);
        let fits = estimate_radius_distributions(
            &strings(&["A", "B", "A", "B"]),
            &[1.0, 10.0, 3.0, 20.0],
            &labels,
        )
        .expect("valid");
        assert_eq!(fits.len(), 2);
        assert_eq!(fits["A"].mean, 2.0);
        assert_eq!(fits["B"].mean, 15.0);
        assert_eq!(fits["B"].std, 5.0);
    }

    #[test]
    fn label_without_trials_is_left_out() {
        let labels = strings(&["A", "B", "C"]);
        let fits = estimate_radius_distributions(&strings(&["A", "B"]), &[1.0, 2.0], &labels)
            .expect("C is simply absent");
        assert_eq!(fits.len(), 2);
        assert!(!fits.contains_key("C"));
    }

    #[test]
    fn unknown_prediction_and_length_mismatch() {
        let labels = strings(&["A"]);
        assert!(matches!(
            estimate_radius_distributions(&strings(&["Z"]), &[1.0], &labels),
            Err(Error::UnknownLabel { .. })
        ));
        assert!(estimate_radius_distributions(&strings(&["A"]), &[], &labels).is_err());
    }

    fn shared(frame: Frame, rows: &[[f64; 5]]) -> Frame {
        let mut frame = frame;
        for (j, name) in columns::SHARED.iter().enumerate() {
            frame = frame
                .with_numeric(*name, rows.iter().map(|r| r[j]).collect())
                .expect("consistent");
        }
        frame
    }

    #[test]
    fn true_labels_join_on_exact_values() {
        let a = [0.07, 1.4, 1e-3, 0.01, 10.0];
        let b = [0.06, 1.3, 1e-3, 0.02, 20.0];
        let c = [0.05, 1.2, 1e-3, 0.03, 30.0];
        let measurements = shared(Frame::new("measurements"), &[a, b, a])
            .with_text("biscuit", strings(&["Hobnob", "Digestive", "Hobnob"]))
            .expect("consistent");
        let microscopy = shared(Frame::new("microscopy"), &[a, b, c])
            .with_numeric("r", vec![4.0e-7, 9.0e-7, 1.0e-6])
            .expect("consistent");

        let fits = true_radius_distributions(&measurements, &microscopy).expect("valid");
        // row a matches two labelled rows, row c matches none
        assert_eq!(fits["Hobnob"].n, 2);
        assert_eq!(fits["Hobnob"].mean, 4.0e-7);
        assert_eq!(fits["Digestive"].n, 1);
        assert_eq!(fits.len(), 2);
    }

    #[test]
    fn true_labels_need_the_radius_column() {
        let row = [0.07, 1.4, 1e-3, 0.01, 10.0];
        let measurements = shared(Frame::new("measurements"), &[row])
            .with_text("biscuit", strings(&["Hobnob"]))
            .expect("consistent");
        let microscopy = shared(Frame::new("microscopy"), &[row]);
        assert!(matches!(
            true_radius_distributions(&measurements, &microscopy),
            Err(Error::Schema { ref column, .. }) if column == "r"
        ));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn fit_normal_mean_within_range(
                data in proptest::collection::vec(1e-7_f64..2e-6, 1..=50)
            ) {
                let fit = fit_normal(&data).expect("finite");
                let lo = data.iter().cloned().fold(f64::INFINITY, f64::min);
                let hi = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(fit.mean >= lo - 1e-18 && fit.mean <= hi + 1e-18);
                prop_assert!(fit.std >= 0.0);
                prop_assert!(fit.std <= hi - lo + 1e-18);
            }
        }
    }
}
