//! Static nested sampling.
//!
//! Live points sit in the unit hypercube and are mapped through the model's
//! prior transform. Each iteration removes the lowest-likelihood point,
//! credits it with the prior-volume shell it leaves behind, and replaces it
//! by a constrained random walk started from a surviving point. The run stops
//! once the largest live likelihood times the remaining volume can no longer
//! move ln Z by more than `dlogz`; the live points are then added.
//!
//! # References
//!
//! - Skilling, J. (2006). "Nested sampling for general Bayesian
//!   computation", *Bayesian Analysis* 1(4), pp. 833-859.
//! - Sivia, D. S. & Skilling, J. (2006). *Data Analysis: A Bayesian
//!   Tutorial*, 2nd ed., ch. 9.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{debug, warn};

use super::log_add_exp;
use super::model::{CapillaryModel, ModelContext};
use crate::config::NestedConfig;
use crate::error::{Error, Result};

/// Evidence estimate and run statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedSamplingResult {
    /// ln Z.
    pub log_evidence: f64,
    /// √(H / n_live).
    pub log_evidence_error: f64,
    /// Information H, nats.
    pub information: f64,
    /// Dead points generated.
    pub iterations: usize,
    /// Posterior-weighted mean of every parameter.
    pub posterior_mean: Vec<f64>,
}

#[derive(Debug, Clone)]
struct LivePoint {
    unit: Vec<f64>,
    params: Vec<f64>,
    log_l: f64,
}

struct Sampler<'m, 'c> {
    model: &'m CapillaryModel,
    ctx: &'m ModelContext<'c>,
    rng: Xoshiro256PlusPlus,
    step: f64,
}

impl Sampler<'_, '_> {
    fn point(&self, unit: Vec<f64>) -> Result<LivePoint> {
        let params = self.model.prior_transform(&unit)?;
        let log_l = self.model.log_likelihood(self.ctx, &params)?;
        Ok(LivePoint {
            unit,
            params,
            log_l,
        })
    }

    fn draw(&mut self) -> Result<LivePoint> {
        let unit = (0..self.model.dimension())
            .map(|_| self.rng.random::<f64>())
            .collect();
        self.point(unit)
    }

    /// Random walk from `start` restricted to ln L > `floor`.
    fn explore(&mut self, start: &LivePoint, floor: f64, steps: usize) -> Result<LivePoint> {
        let mut current = start.clone();
        let mut accepted = 0u32;
        let mut rejected = 0u32;

        for _ in 0..steps {
            let unit: Vec<f64> = current
                .unit
                .iter()
                .map(|&u| u + self.step * (2.0 * self.rng.random::<f64>() - 1.0))
                .collect();
            if unit.iter().all(|u| (0.0..=1.0).contains(u)) {
                let trial = self.point(unit)?;
                if trial.log_l > floor {
                    current = trial;
                    accepted += 1;
                } else {
                    rejected += 1;
                }
            } else {
                rejected += 1;
            }

            // Sivia-Skilling scale adaptation towards 50% acceptance
            if accepted > rejected {
                self.step *= (1.0 / accepted as f64).exp();
            } else if accepted < rejected {
                self.step /= (1.0 / rejected as f64).exp();
            }
            self.step = self.step.min(1.0);
        }
        Ok(current)
    }
}

/// Accumulates ln Z, H and the weighted parameter sums.
struct Evidence {
    log_z: f64,
    information: f64,
    weighted: Vec<(f64, Vec<f64>)>,
}

impl Evidence {
    fn add(&mut self, log_weight: f64, point: &LivePoint) {
        let log_z_new = log_add_exp(self.log_z, log_weight);
        let fresh = (log_weight - log_z_new).exp() * point.log_l;
        let carried = if self.log_z == f64::NEG_INFINITY {
            0.0
        } else {
            (self.log_z - log_z_new).exp() * (self.information + self.log_z)
        };
        self.information = fresh + carried - log_z_new;
        self.log_z = log_z_new;
        self.weighted.push((log_weight, point.params.clone()));
    }

    fn posterior_mean(&self, dim: usize) -> Vec<f64> {
        let mut mean = vec![0.0; dim];
        for (log_w, params) in &self.weighted {
            let w = (log_w - self.log_z).exp();
            for (m, p) in mean.iter_mut().zip(params) {
                *m += w * p;
            }
        }
        mean
    }
}

/// Computes the evidence of `model` for the data in `ctx`.
///
/// A model without free parameters has ln Z equal to its log-likelihood.
///
/// # Errors
///
/// [`crate::DomainError::InvalidInput`] for fewer than two live points,
/// a non-positive `dlogz`, or no walk steps; likelihood errors propagate.
pub fn nested_sampling(
    model: &CapillaryModel,
    ctx: &ModelContext<'_>,
    settings: &NestedConfig,
) -> Result<NestedSamplingResult> {
    let dim = model.dimension();
    if dim == 0 {
        let log_l = model.log_likelihood(ctx, &[])?;
        return Ok(NestedSamplingResult {
            log_evidence: log_l,
            log_evidence_error: 0.0,
            information: 0.0,
            iterations: 0,
            posterior_mean: Vec::new(),
        });
    }

    let n = settings.live_points;
    if n < 2 || !(settings.dlogz > 0.0) || settings.walk_steps == 0 {
        return Err(Error::invalid(format!(
            "nested sampling needs >= 2 live points, dlogz > 0 and walk steps, got {settings:?}"
        )));
    }
    let nf = n as f64;

    let mut sampler = Sampler {
        model,
        ctx,
        rng: Xoshiro256PlusPlus::seed_from_u64(settings.seed),
        step: 0.1,
    };
    let mut live = (0..n).map(|_| sampler.draw()).collect::<Result<Vec<_>>>()?;

    let mut evidence = Evidence {
        log_z: f64::NEG_INFINITY,
        information: 0.0,
        weighted: Vec::new(),
    };
    // width of the first shell: X0 - X1 with X1 = exp(-1/n)
    let mut log_width = (1.0 - (-1.0 / nf).exp()).ln();
    let mut iterations = 0;

    loop {
        let worst = live
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.log_l.total_cmp(&b.1.log_l))
            .map(|(i, _)| i)
            .ok_or_else(|| Error::invalid("no live points"))?;
        let floor = live[worst].log_l;
        evidence.add(log_width + floor, &live[worst]);

        let mut donor = sampler.rng.random_range(0..n - 1);
        if donor >= worst {
            donor += 1;
        }
        let start = live[donor].clone();
        live[worst] = sampler.explore(&start, floor, settings.walk_steps)?;

        log_width -= 1.0 / nf;
        iterations += 1;

        let max_log_l = live
            .iter()
            .map(|p| p.log_l)
            .fold(f64::NEG_INFINITY, f64::max);
        let log_remaining = max_log_l - iterations as f64 / nf;
        let delta = log_add_exp(evidence.log_z, log_remaining) - evidence.log_z;
        if delta < settings.dlogz {
            break;
        }
        if iterations >= settings.max_iterations {
            warn!(
                model = model.name(),
                iterations,
                delta,
                "nested sampling hit the iteration cap"
            );
            break;
        }
    }

    // remaining volume X = exp(-iterations / n), shared equally by the live points
    let log_share = -(iterations as f64) / nf - nf.ln();
    for point in &live {
        evidence.add(log_share + point.log_l, point);
    }

    let information = evidence.information.max(0.0);
    let result = NestedSamplingResult {
        log_evidence: evidence.log_z,
        log_evidence_error: (information / nf).sqrt(),
        information,
        iterations,
        posterior_mean: evidence.posterior_mean(dim),
    };
    debug!(
        model = model.name(),
        label = ctx.label(),
        log_z = result.log_evidence,
        error = result.log_evidence_error,
        h = result.information,
        iterations,
        "nested sampling finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicalConstants;
    use crate::data::{SeriesPoint, TimeSeries};
    use crate::washburn::WashburnModel;

    fn scaled_series(a0: f64, radius: f64) -> TimeSeries {
        let model = WashburnModel::new(&PhysicalConstants::default()).expect("valid");
        let points = (1..=15)
            .map(|i| {
                let t = i as f64 * 4.0;
                let length = a0 * model.length(radius, t).expect("valid");
                SeriesPoint {
                    t,
                    length,
                    length_error: 0.02 * length,
                }
            })
            .collect();
        TimeSeries::new(points).expect("valid")
    }

    fn quick() -> NestedConfig {
        NestedConfig {
            live_points: 100,
            ..NestedConfig::default()
        }
    }

    #[test]
    fn zero_dimensional_evidence_is_likelihood() {
        let series = scaled_series(1.0, 4.0e-7);
        let ctx = ModelContext::new("Hobnob", 4.0e-7, &PhysicalConstants::default(), &series)
            .expect("valid");
        let model = CapillaryModel::uncorrected();
        let result = nested_sampling(&model, &ctx, &quick()).expect("valid");
        let log_l = model.log_likelihood(&ctx, &[]).expect("valid");
        assert_eq!(result.log_evidence, log_l);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn posterior_mean_recovers_scale() {
        let series = scaled_series(1.5, 4.0e-7);
        let ctx = ModelContext::new("Hobnob", 4.0e-7, &PhysicalConstants::default(), &series)
            .expect("valid");
        let model = CapillaryModel::corrected(10.0).expect("valid");
        let result = nested_sampling(&model, &ctx, &quick()).expect("valid");
        let a0 = result.posterior_mean[0];
        assert!((a0 - 1.5).abs() < 0.05, "a0 = {a0}");
        assert!(result.information > 1.0, "H = {}", result.information);
        assert!(result.log_evidence.is_finite());
        assert!(result.log_evidence_error > 0.0);
    }

    #[test]
    fn evidence_is_penalised_by_prior_volume() {
        // ln Z ≈ ln L_max + ln(posterior width / prior width); doubling the
        // prior range costs about ln 2
        let series = scaled_series(1.5, 4.0e-7);
        let ctx = ModelContext::new("Hobnob", 4.0e-7, &PhysicalConstants::default(), &series)
            .expect("valid");
        let settings = NestedConfig::default();
        let narrow = nested_sampling(&CapillaryModel::corrected(5.0).expect("valid"), &ctx, &settings)
            .expect("valid");
        let wide = nested_sampling(&CapillaryModel::corrected(10.0).expect("valid"), &ctx, &settings)
            .expect("valid");
        let diff = narrow.log_evidence - wide.log_evidence;
        assert!((diff - 2f64.ln()).abs() < 0.5, "diff = {diff}");
    }

    #[test]
    fn deterministic_for_seed() {
        let series = scaled_series(1.2, 4.0e-7);
        let ctx = ModelContext::new("Hobnob", 4.0e-7, &PhysicalConstants::default(), &series)
            .expect("valid");
        let model = CapillaryModel::corrected(10.0).expect("valid");
        let a = nested_sampling(&model, &ctx, &quick()).expect("valid");
        let b = nested_sampling(&model, &ctx, &quick()).expect("valid");
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_settings() {
        let series = scaled_series(1.0, 4.0e-7);
        let ctx = ModelContext::new("Hobnob", 4.0e-7, &PhysicalConstants::default(), &series)
            .expect("valid");
        let model = CapillaryModel::corrected(10.0).expect("valid");
        let settings = NestedConfig {
            live_points: 1,
            ..NestedConfig::default()
        };
        assert!(nested_sampling(&model, &ctx, &settings).is_err());
    }
}
