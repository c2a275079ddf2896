//! Kernel-margin classifier: one-vs-rest RBF support vector machines.
//!
//! Each binary machine is trained by sequential minimal optimization with
//! a cached error vector. Prediction picks the class whose machine returns
//! the largest decision value. A class without training rows gets no
//! machine and scores `-inf`.
//!
//! # References
//!
//! - Platt, J. (1998). "Sequential Minimal Optimization: A Fast Algorithm
//!   for Training Support Vector Machines", Microsoft Research TR-98-14.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::error::{Error, Result};

/// SMO hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SvmParams {
    /// Box constraint C.
    pub c: f64,
    /// RBF width: K(x, z) = exp(-gamma · ‖x - z‖²).
    pub gamma: f64,
    /// KKT violation tolerance.
    pub tolerance: f64,
    /// Consecutive passes without an update before stopping.
    pub max_passes: usize,
    /// Hard cap on passes over the data.
    pub max_iterations: usize,
}

/// Minimum change in an alpha worth applying.
const ALPHA_EPS: f64 = 1e-5;

fn rbf(a: &[f64], b: &[f64], gamma: f64) -> f64 {
    let d2: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    (-gamma * d2).exp()
}

/// One binary machine: f(x) = Σ coefᵢ K(svᵢ, x) + bias.
#[derive(Debug, Clone, PartialEq)]
struct BinaryMachine {
    support: Vec<Vec<f64>>,
    coef: Vec<f64>,
    bias: f64,
}

impl BinaryMachine {
    fn decision(&self, x: &[f64], gamma: f64) -> f64 {
        self.support
            .iter()
            .zip(&self.coef)
            .map(|(sv, &c)| c * rbf(sv, x, gamma))
            .sum::<f64>()
            + self.bias
    }
}

/// Trains one machine on labels `y ∈ {-1, +1}` with a precomputed kernel.
fn smo(
    x: &[Vec<f64>],
    y: &[f64],
    kernel: &[Vec<f64>],
    params: &SvmParams,
    rng: &mut Xoshiro256PlusPlus,
) -> BinaryMachine {
    let n = x.len();
    let c = params.c;
    let tol = params.tolerance;

    let mut alpha = vec![0.0; n];
    let mut b = 0.0;
    // errors[k] = f(x_k) - y_k, with f ≡ 0 initially
    let mut errors: Vec<f64> = y.iter().map(|&yk| -yk).collect();

    let mut passes = 0;
    let mut iterations = 0;
    while passes < params.max_passes && iterations < params.max_iterations && n > 1 {
        iterations += 1;
        let mut changed = 0;

        for i in 0..n {
            let ei = errors[i];
            let r = y[i] * ei;
            if !((r < -tol && alpha[i] < c) || (r > tol && alpha[i] > 0.0)) {
                continue;
            }

            let mut j = rng.random_range(0..n - 1);
            if j >= i {
                j += 1;
            }
            let ej = errors[j];

            let (ai_old, aj_old) = (alpha[i], alpha[j]);
            let (lo, hi) = if y[i] != y[j] {
                ((aj_old - ai_old).max(0.0), (c + aj_old - ai_old).min(c))
            } else {
                ((ai_old + aj_old - c).max(0.0), (ai_old + aj_old).min(c))
            };
            if (hi - lo).abs() < 1e-12 {
                continue;
            }

            let eta = 2.0 * kernel[i][j] - kernel[i][i] - kernel[j][j];
            if eta >= 0.0 {
                continue;
            }

            let aj = (aj_old - y[j] * (ei - ej) / eta).clamp(lo, hi);
            if (aj - aj_old).abs() < ALPHA_EPS {
                continue;
            }
            let ai = ai_old + y[i] * y[j] * (aj_old - aj);

            let b1 = b - ei
                - y[i] * (ai - ai_old) * kernel[i][i]
                - y[j] * (aj - aj_old) * kernel[i][j];
            let b2 = b - ej
                - y[i] * (ai - ai_old) * kernel[i][j]
                - y[j] * (aj - aj_old) * kernel[j][j];
            let b_new = if ai > 0.0 && ai < c {
                b1
            } else if aj > 0.0 && aj < c {
                b2
            } else {
                (b1 + b2) / 2.0
            };

            let di = y[i] * (ai - ai_old);
            let dj = y[j] * (aj - aj_old);
            let db = b_new - b;
            for (k, e) in errors.iter_mut().enumerate() {
                *e += di * kernel[i][k] + dj * kernel[j][k] + db;
            }

            alpha[i] = ai;
            alpha[j] = aj;
            b = b_new;
            changed += 1;
        }

        passes = if changed == 0 { passes + 1 } else { 0 };
    }

    let mut support = Vec::new();
    let mut coef = Vec::new();
    for k in 0..n {
        if alpha[k] > 0.0 {
            support.push(x[k].clone());
            coef.push(alpha[k] * y[k]);
        }
    }
    BinaryMachine {
        support,
        coef,
        bias: b,
    }
}

/// One-vs-rest RBF support vector classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct SupportVectorClassifier {
    params: SvmParams,
    machines: Vec<Option<BinaryMachine>>,
}

impl SupportVectorClassifier {
    /// Trains one machine per class.
    ///
    /// # Errors
    ///
    /// [`crate::DomainError::InvalidInput`] if `x` is empty, lengths differ,
    /// a label is `>= n_classes`, or hyperparameters are not positive.
    pub fn fit(
        x: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        params: SvmParams,
        seed: u64,
    ) -> Result<Self> {
        if x.is_empty() || x.len() != labels.len() {
            return Err(Error::invalid("SVM needs equally sized, non-empty inputs"));
        }
        if labels.iter().any(|&l| l >= n_classes) {
            return Err(Error::invalid("label code out of range"));
        }
        if !(params.c > 0.0 && params.gamma > 0.0 && params.tolerance >= 0.0) {
            return Err(Error::invalid(format!("invalid SVM parameters {params:?}")));
        }

        let kernel: Vec<Vec<f64>> = x
            .iter()
            .map(|a| x.iter().map(|b| rbf(a, b, params.gamma)).collect())
            .collect();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let machines = (0..n_classes)
            .map(|class| {
                if !labels.contains(&class) {
                    return None;
                }
                let y: Vec<f64> = labels
                    .iter()
                    .map(|&l| if l == class { 1.0 } else { -1.0 })
                    .collect();
                Some(smo(x, &y, &kernel, &params, &mut rng))
            })
            .collect();

        Ok(Self { params, machines })
    }

    /// Hyperparameters used at fit time.
    pub fn params(&self) -> &SvmParams {
        &self.params
    }

    /// Decision value of every class machine; `-inf` for untrained classes.
    pub fn decision_function(&self, row: &[f64]) -> Vec<f64> {
        self.machines
            .iter()
            .map(|m| {
                m.as_ref()
                    .map_or(f64::NEG_INFINITY, |m| m.decision(row, self.params.gamma))
            })
            .collect()
    }

    /// Class with the largest decision value (lowest code on ties).
    pub fn predict(&self, row: &[f64]) -> usize {
        let scores = self.decision_function(row);
        let mut best = 0;
        for (k, &s) in scores.iter().enumerate() {
            if s > scores[best] {
                best = k;
            }
        }
        best
    }
}
