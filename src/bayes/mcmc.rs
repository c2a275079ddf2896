//! Posterior of the pore radius under the Washburn model.
//!
//! Model: r ~ Uniform(low, high); L_i ~ Normal(washburn(r, t_i), dL_i).
//! Sampled by random-walk Metropolis with several independent chains.
//! During tuning the log proposal scale follows a Robbins-Monro update
//! towards the target acceptance rate; tuning draws are discarded.

use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{debug, info, warn};
use u_numflow::stats;

use super::diagnostics::{effective_sample_size, split_r_hat};
use super::gaussian_log_likelihood;
use crate::config::{McmcConfig, PhysicalConstants, RadiusPrior};
use crate::data::TimeSeries;
use crate::error::{Error, Result};
use crate::washburn::WashburnModel;

/// Retained draws of one chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainTrace {
    /// Post-tuning draws of r.
    pub draws: Vec<f64>,
    /// Fraction of accepted post-tuning proposals.
    pub acceptance_rate: f64,
    /// Proposal standard deviation after tuning.
    pub step_size: f64,
}

/// Pooled posterior summary and diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusPosterior {
    /// Posterior mean of r.
    pub mean: f64,
    /// Posterior standard deviation of r.
    pub std: f64,
    /// Split R̂ over all chains.
    pub r_hat: f64,
    /// Effective sample size summed over chains.
    pub ess: f64,
    /// Per-chain traces.
    pub chains: Vec<ChainTrace>,
}

impl RadiusPosterior {
    /// All retained draws, chain by chain.
    pub fn draws(&self) -> impl Iterator<Item = f64> + '_ {
        self.chains.iter().flat_map(|c| c.draws.iter().copied())
    }
}

/// Unnormalised log posterior of r.
struct Target<'a> {
    washburn: WashburnModel,
    times: Vec<f64>,
    observed: Vec<f64>,
    sigma: Vec<f64>,
    prior: &'a RadiusPrior,
}

impl Target<'_> {
    fn log_density(&self, r: f64) -> Result<f64> {
        if r < self.prior.low || r > self.prior.high {
            return Ok(f64::NEG_INFINITY);
        }
        let predicted = self.washburn.lengths(r, &self.times)?;
        gaussian_log_likelihood(&self.observed, &predicted, &self.sigma)
    }
}

fn run_chain(target: &Target<'_>, settings: &McmcConfig, seed: u64) -> Result<ChainTrace> {
    let prior = target.prior;
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    let mut r = rng.random_range(prior.low..prior.high);
    let mut log_p = target.log_density(r)?;
    let mut log_step = ((prior.high - prior.low) / 10.0).ln();

    let mut draws = Vec::with_capacity(settings.draws);
    let mut accepted = 0usize;
    for i in 0..settings.tune + settings.draws {
        let z: f64 = StandardNormal.sample(&mut rng);
        let proposal = r + log_step.exp() * z;
        let log_p_new = target.log_density(proposal)?;

        let alpha = if log_p_new.is_finite() {
            (log_p_new - log_p).exp().min(1.0)
        } else {
            0.0
        };
        let u: f64 = rng.random();
        if u < alpha {
            r = proposal;
            log_p = log_p_new;
            if i >= settings.tune {
                accepted += 1;
            }
        }

        if i < settings.tune {
            log_step += (alpha - settings.target_accept) / ((i + 1) as f64).powf(0.6);
        } else {
            draws.push(r);
        }
    }

    Ok(ChainTrace {
        acceptance_rate: accepted as f64 / settings.draws.max(1) as f64,
        step_size: log_step.exp(),
        draws,
    })
}

/// Samples the posterior of the pore radius for one time-resolved series.
///
/// Chain `c` is seeded with `settings.seed + c` and starts from a uniform
/// draw inside the prior.
///
/// # Errors
///
/// - [`crate::DomainError::InvalidInput`] for an invalid prior range or
///   fewer than two chains or four draws.
/// - [`crate::DomainError::NegativeRadicand`] if the constants make the
///   Washburn radicand negative.
/// - [`Error::NonConvergence`] if split R̂ exceeds `settings.max_r_hat`.
pub fn fit_radius(
    series: &TimeSeries,
    prior: &RadiusPrior,
    constants: &PhysicalConstants,
    settings: &McmcConfig,
) -> Result<RadiusPosterior> {
    if !(prior.low.is_finite() && prior.high.is_finite() && 0.0 <= prior.low && prior.low < prior.high)
    {
        return Err(Error::invalid(format!(
            "radius prior must satisfy 0 <= low < high, got [{}, {}]",
            prior.low, prior.high
        )));
    }
    if settings.chains < 2 || settings.draws < 4 {
        return Err(Error::invalid("mcmc needs at least 2 chains and 4 draws"));
    }

    let target = Target {
        washburn: WashburnModel::new(constants)?,
        times: series.times(),
        observed: series.lengths(),
        sigma: series.length_errors(),
        prior,
    };

    let chains = (0..settings.chains)
        .map(|c| {
            let trace = run_chain(&target, settings, settings.seed.wrapping_add(c as u64))?;
            debug!(
                chain = c,
                acceptance = trace.acceptance_rate,
                step = trace.step_size,
                "chain finished"
            );
            Ok(trace)
        })
        .collect::<Result<Vec<_>>>()?;

    let draws: Vec<Vec<f64>> = chains.iter().map(|c| c.draws.clone()).collect();
    let r_hat = split_r_hat(&draws);
    let ess = effective_sample_size(&draws);

    if !r_hat.is_finite() || r_hat > settings.max_r_hat {
        return Err(Error::NonConvergence {
            r_hat,
            max_r_hat: settings.max_r_hat,
            ess,
        });
    }
    if ess < 100.0 {
        warn!(ess, "low effective sample size");
    }

    let pooled: Vec<f64> = draws.concat();
    let mean = stats::mean(&pooled).ok_or_else(|| Error::invalid("no posterior draws"))?;
    let std = stats::std_dev(&pooled).unwrap_or(0.0);
    info!(mean, std, r_hat, ess, "radius posterior");

    Ok(RadiusPosterior {
        mean,
        std,
        r_hat,
        ess,
        chains,
    })
}
