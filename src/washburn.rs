//! Washburn capillary-rise relation.
//!
//! L = √(γ·r·t·cos φ / (2η))
//!
//! where γ is the liquid surface tension, φ the contact angle, η the dynamic
//! viscosity, r the pore radius and t the time since immersion.
//!
//! A negative radicand (cos φ < 0, r < 0 or t < 0) has no physical meaning
//! and is reported as [`DomainError::NegativeRadicand`] instead of producing
//! NaN.
//!
//! # Examples
//!
//! ```
//! use dunk_analytics::washburn::washburn;
//!
//! let l = washburn(6.78e-2, 1.45, 9.93e-4, 5e-7, 10.0).unwrap();
//! assert!(l > 0.0 && l < 0.1);
//! assert!(washburn(6.78e-2, 2.0, 9.93e-4, 5e-7, 10.0).is_err()); // cos φ < 0
//! ```
//!
//! # References
//!
//! Washburn, E.W. (1921). "The Dynamics of Capillary Flow", *Physical
//! Review* 17(3), pp. 273-283.

use crate::config::PhysicalConstants;
use crate::error::{DomainError, Error, Result};

/// Computes the absorption length for scalar inputs.
///
/// Validates the constants on every call; use [`WashburnModel`] when
/// evaluating many times against the same liquid.
pub fn washburn(gamma: f64, phi: f64, eta: f64, r: f64, t: f64) -> Result<f64> {
    WashburnModel::new(&PhysicalConstants { gamma, phi, eta })?.length(r, t)
}

/// Washburn relation with the liquid constants folded into one coefficient.
///
/// # Invariants
///
/// - `coefficient = γ·cos φ / (2η)` is finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WashburnModel {
    coefficient: f64,
}

impl WashburnModel {
    /// Validates the constants and precomputes the coefficient.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidInput`] if γ or η is not positive and finite,
    ///   or φ is not finite.
    /// - [`DomainError::NegativeRadicand`] if cos φ < 0.
    pub fn new(constants: &PhysicalConstants) -> Result<Self> {
        let PhysicalConstants { gamma, phi, eta } = *constants;
        if !(gamma.is_finite() && gamma > 0.0) {
            return Err(Error::invalid(format!("surface tension must be positive, got {gamma}")));
        }
        if !(eta.is_finite() && eta > 0.0) {
            return Err(Error::invalid(format!("viscosity must be positive, got {eta}")));
        }
        if !phi.is_finite() {
            return Err(Error::invalid("contact angle must be finite"));
        }

        let coefficient = gamma * phi.cos() / (2.0 * eta);
        if coefficient < 0.0 {
            return Err(DomainError::NegativeRadicand(coefficient).into());
        }

        Ok(Self { coefficient })
    }

    /// γ·cos φ / (2η), in m/s per metre of radius.
    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    /// Absorption length at radius `r` after time `t`.
    pub fn length(&self, r: f64, t: f64) -> Result<f64> {
        if !r.is_finite() || !t.is_finite() {
            return Err(Error::invalid(format!("non-finite radius or time: r = {r}, t = {t}")));
        }
        let radicand = self.coefficient * r * t;
        if radicand < 0.0 {
            return Err(DomainError::NegativeRadicand(radicand).into());
        }
        Ok(radicand.sqrt())
    }

    /// Elementwise absorption lengths for a vector of times.
    pub fn lengths(&self, r: f64, times: &[f64]) -> Result<Vec<f64>> {
        times.iter().map(|&t| self.length(r, t)).collect()
    }

    /// Radius that reproduces length `l` at time `t`: r = L² / (coefficient · t).
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidInput`] if `t <= 0`, `l` is non-finite, or the
    /// coefficient is zero (φ = π/2, where no rise occurs).
    pub fn implied_radius(&self, l: f64, t: f64) -> Result<f64> {
        if !l.is_finite() || !(t.is_finite() && t > 0.0) {
            return Err(Error::invalid(format!(
                "implied radius needs finite length and positive time: L = {l}, t = {t}"
            )));
        }
        if self.coefficient <= 0.0 {
            return Err(Error::invalid("contact angle gives zero capillary rise"));
        }
        Ok(l * l / (self.coefficient * t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAMMA: f64 = 6.78e-2;
    const PHI: f64 = 1.45;
    const ETA: f64 = 9.93e-4;

    fn model() -> WashburnModel {
        WashburnModel::new(&PhysicalConstants::default()).expect("valid constants")
    }

    #[test]
    fn matches_closed_form() {
        let r = 7.5e-7;
        let t = 20.0;
        let expected = (GAMMA * r * t * PHI.cos() / (2.0 * ETA)).sqrt();
        let l = washburn(GAMMA, PHI, ETA, r, t).expect("valid");
        assert!((l - expected).abs() < 1e-15, "L = {l}, expected {expected}");
    }

    #[test]
    fn zero_time_gives_zero_length() {
        assert_eq!(model().length(5e-7, 0.0).expect("valid"), 0.0);
    }

    #[test]
    fn elementwise_matches_scalar() {
        let m = model();
        let times = [0.0, 1.0, 5.0, 30.0];
        let ls = m.lengths(4e-7, &times).expect("valid");
        for (&t, &l) in times.iter().zip(ls.iter()) {
            assert_eq!(l, m.length(4e-7, t).expect("valid"));
        }
    }

    #[test]
    fn obtuse_contact_angle_is_domain_error() {
        let err = washburn(GAMMA, 2.0, ETA, 5e-7, 10.0).unwrap_err();
        assert!(matches!(
            err,
            Error::Domain(DomainError::NegativeRadicand(_))
        ));
    }

    #[test]
    fn negative_time_is_domain_error() {
        let err = model().length(5e-7, -1.0).unwrap_err();
        assert!(matches!(
            err,
            Error::Domain(DomainError::NegativeRadicand(_))
        ));
    }

    #[test]
    fn rejects_non_positive_viscosity() {
        let c = PhysicalConstants {
            gamma: GAMMA,
            phi: PHI,
            eta: 0.0,
        };
        assert!(matches!(
            WashburnModel::new(&c),
            Err(Error::Domain(DomainError::InvalidInput(_)))
        ));
    }

    #[test]
    fn rejects_nan_radius() {
        assert!(model().length(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn implied_radius_inverts_length() {
        let m = model();
        let r = 6.1e-7;
        let t = 12.0;
        let l = m.length(r, t).expect("valid");
        let back = m.implied_radius(l, t).expect("valid");
        assert!((back - r).abs() / r < 1e-12, "r = {back}");
    }

    #[test]
    fn implied_radius_needs_positive_time() {
        assert!(model().implied_radius(0.01, 0.0).is_err());
    }

    #[test]
    fn right_angle_has_no_rise() {
        let c = PhysicalConstants {
            gamma: GAMMA,
            phi: std::f64::consts::FRAC_PI_2,
            eta: ETA,
        };
        // cos(π/2) rounds to a tiny positive number; the length is ~0.
        let m = WashburnModel::new(&c).expect("valid");
        assert!(m.length(5e-7, 10.0).expect("valid") < 1e-9);
    }
}
