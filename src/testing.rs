//! Agreement between an estimated radius and a reference distribution.
//!
//! Two comparators place a value against N(mean, std²): the two-tailed
//! tail probability, in percent, and the distance from the mean in units of
//! the standard deviation.
//!
//! # Examples
//!
//! ```
//! use dunk_analytics::testing::{std_distance, tail_probability};
//!
//! assert_eq!(tail_probability(5.0, 1.0, 5.0).unwrap(), 100.0);
//! let p = tail_probability(5.0, 1.0, 6.0).unwrap();
//! assert!((p - 31.731).abs() < 1e-2);
//! assert_eq!(std_distance(5.0, 2.0, 1.0).unwrap(), 2.0);
//! ```

use u_numflow::special;

use crate::error::{DomainError, Error, Result};

/// Both comparators for one value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Agreement {
    /// Two-tailed tail probability, percent.
    pub tail_probability: f64,
    /// |value - mean| / std.
    pub std_distance: f64,
}

fn check(mean: f64, std: f64, value: f64) -> Result<()> {
    if !(std.is_finite() && std > 0.0) {
        return Err(DomainError::ZeroStd(std).into());
    }
    if !mean.is_finite() || !value.is_finite() {
        return Err(Error::invalid(format!(
            "non-finite comparison input: mean = {mean}, value = {value}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tail probability
// ---------------------------------------------------------------------------

/// Two-tailed tail probability of `value` under N(mean, std²), in percent.
///
/// # Algorithm
///
/// z = (value - mean) / std; P = 200 · Φ(-|z|). Exactly 100 when
/// `value == mean`.
///
/// # Errors
///
/// [`DomainError::ZeroStd`] if `std` is not positive and finite,
/// [`DomainError::InvalidInput`] for a non-finite mean or value.
pub fn tail_probability(mean: f64, std: f64, value: f64) -> Result<f64> {
    check(mean, std, value)?;
    if value == mean {
        return Ok(100.0);
    }
    let z = (value - mean) / std;
    Ok(200.0 * special::standard_normal_cdf(-z.abs()))
}

// ---------------------------------------------------------------------------
// Standard-deviation distance
// ---------------------------------------------------------------------------

/// |value - mean| / std.
///
/// # Errors
///
/// Same as [`tail_probability`].
pub fn std_distance(mean: f64, std: f64, value: f64) -> Result<f64> {
    check(mean, std, value)?;
    Ok((value - mean).abs() / std)
}

/// Evaluates both comparators.
pub fn agreement(mean: f64, std: f64, value: f64) -> Result<Agreement> {
    Ok(Agreement {
        tail_probability: tail_probability(mean, std, value)?,
        std_distance: std_distance(mean, std, value)?,
    })
}
