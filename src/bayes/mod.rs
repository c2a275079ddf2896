//! Bayesian inference for the capillary-flow models.
//!
//! - [`fit_radius`]: random-walk Metropolis posterior of the pore radius
//! - [`nested_sampling`]: Skilling's nested sampler for the evidence
//! - [`compare_models`]: Bayes factor between the plain and corrected
//!   Washburn models
//! - [`split_r_hat`] / [`effective_sample_size`]: chain diagnostics

mod comparison;
mod diagnostics;
mod mcmc;
mod model;
mod nested;

pub use comparison::{compare_models, mean_squared_error, ModelComparison, ModelEvidence};
pub use diagnostics::{effective_sample_size, split_r_hat};
pub use mcmc::{fit_radius, ChainTrace, RadiusPosterior};
pub use model::{CapillaryModel, Forward, ModelContext, Prior};
pub use nested::{nested_sampling, NestedSamplingResult};

use crate::error::{Error, Result};

const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;

/// ln N(x | mu, sigma²).
pub fn normal_log_density(x: f64, mu: f64, sigma: f64) -> f64 {
    let z = (x - mu) / sigma;
    -0.5 * z * z - sigma.ln() - LN_SQRT_2PI
}

/// Sum of independent Gaussian log densities, one per observation.
///
/// # Errors
///
/// [`crate::DomainError::InvalidInput`] if lengths differ.
pub fn gaussian_log_likelihood(observed: &[f64], predicted: &[f64], sigma: &[f64]) -> Result<f64> {
    if observed.len() != predicted.len() || observed.len() != sigma.len() {
        return Err(Error::invalid(format!(
            "likelihood needs equal lengths, got {}, {} and {}",
            observed.len(),
            predicted.len(),
            sigma.len()
        )));
    }
    Ok(observed
        .iter()
        .zip(predicted)
        .zip(sigma)
        .map(|((&y, &mu), &s)| normal_log_density(y, mu, s))
        .sum())
}

/// ln(eᵃ + eᵇ) without overflow.
pub(crate) fn log_add_exp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let m = a.max(b);
    m + ((a - m).exp() + (b - m).exp()).ln()
}
