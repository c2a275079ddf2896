//! # dunk-analytics
//!
//! Biscuit-dunking analysis: which biscuit was dunked, how large its pores
//! are, and whether the Washburn capillary-flow model needs a correction.
//!
//! ## Modules
//!
//! - [`washburn`]: Washburn relation L = √(γ·r·t·cos φ / (2η))
//! - [`data`]: Input tables, time-resolved series and CSV loading
//! - [`classify`]: Biscuit-type classifier (RBF SVM vs. random forest, grid search)
//! - [`distribution`]: Per-label pore radius distributions
//! - [`bayes`]: MCMC radius fit, nested sampling, Bayes factors
//! - [`testing`]: Tail probability and standard-deviation distance
//! - [`pipeline`]: Staged per-biscuit summaries and the end-to-end run
//! - [`report`]: Output tables
//! - [`config`]: Analysis configuration
//!
//! ## Design Philosophy
//!
//! - **Explicit data flow**: every model run receives its dataset and
//!   constants through a [`bayes::ModelContext`]
//! - **Deterministic**: all randomness is seeded from the configuration
//! - **Typed failures**: schema, domain and convergence errors are distinct
//!   [`Error`] variants

pub mod bayes;
pub mod classify;
pub mod config;
pub mod data;
pub mod distribution;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod testing;
pub mod washburn;

pub use error::{DomainError, Error, Result};
