//! Runner: `dunk-analytics <config.json>`.
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

use dunk_analytics::config::AnalysisConfig;
use dunk_analytics::pipeline::run_analysis;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args_os().skip(1);
    let (Some(path), None) = (args.next(), args.next()) else {
        bail!("usage: dunk-analytics <config.json>");
    };
    let path = PathBuf::from(path);

    let config = AnalysisConfig::from_path(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    let report = run_analysis(&config).context("analysis failed")?;

    for s in &report.summaries {
        tracing::info!(
            biscuit = %s.label,
            mean = s.pore_radius_mean,
            mcmc_r = s.mcmc_radius,
            tail_probability = s.tail_probability,
            bayes_factor = s.bayes_factor,
            "summary"
        );
    }
    Ok(())
}
