//! Output tables.
//!
//! Two comma-delimited tables, one row per biscuit:
//!
//! - radius table: `biscuit,mean,std,mcmc_r,tail_probability,std_distance`
//! - comparison table: `biscuit,bayes_factor,mse_uncorrected,mse_corrected`

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::pipeline::BiscuitSummary;

/// Header of the radius table.
pub const RADIUS_HEADER: &str = "biscuit,mean,std,mcmc_r,tail_probability,std_distance";
/// Header of the comparison table.
pub const COMPARISON_HEADER: &str = "biscuit,bayes_factor,mse_uncorrected,mse_corrected";

fn field(label: &str) -> String {
    if label.contains([',', '"', '\n']) {
        format!("\"{}\"", label.replace('"', "\"\""))
    } else {
        label.to_string()
    }
}

/// Writes the radius table to any writer.
pub fn write_radius_table_to_writer<W: Write>(mut out: W, summaries: &[BiscuitSummary]) -> Result<()> {
    writeln!(out, "{RADIUS_HEADER}")?;
    for s in summaries {
        writeln!(
            out,
            "{},{},{},{},{},{}",
            field(&s.label),
            s.pore_radius_mean,
            s.pore_radius_std,
            s.mcmc_radius,
            s.tail_probability,
            s.std_distance
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Writes the comparison table to any writer.
pub fn write_comparison_table_to_writer<W: Write>(
    mut out: W,
    summaries: &[BiscuitSummary],
) -> Result<()> {
    writeln!(out, "{COMPARISON_HEADER}")?;
    for s in summaries {
        writeln!(
            out,
            "{},{},{},{}",
            field(&s.label),
            s.bayes_factor,
            s.mse_uncorrected,
            s.mse_corrected
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Writes the radius table to `path`.
pub fn write_radius_table(path: &Path, summaries: &[BiscuitSummary]) -> Result<()> {
    debug!(path = %path.display(), rows = summaries.len(), "writing radius table");
    write_radius_table_to_writer(BufWriter::new(File::create(path)?), summaries)
}

/// Writes the comparison table to `path`.
pub fn write_comparison_table(path: &Path, summaries: &[BiscuitSummary]) -> Result<()> {
    debug!(path = %path.display(), rows = summaries.len(), "writing comparison table");
    write_comparison_table_to_writer(BufWriter::new(File::create(path)?), summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SeriesPoint, TimeSeries};

    fn summary(label: &str) -> BiscuitSummary {
        BiscuitSummary {
            label: label.to_string(),
            pore_radius_mean: 5.0e-7,
            pore_radius_std: 1.0e-7,
            series: TimeSeries::new(vec![SeriesPoint {
                t: 1.0,
                length: 0.01,
                length_error: 0.001,
            }])
            .expect("valid"),
            mcmc_radius: 6.0e-7,
            correction_mean: 1.2,
            tail_probability: 31.7,
            std_distance: 1.0,
            bayes_factor: 12.5,
            mse_uncorrected: 0.25,
            mse_corrected: 0.5,
        }
    }

    #[test]
    fn radius_table_layout() {
        let mut buf = Vec::new();
        write_radius_table_to_writer(&mut buf, &[summary("Hobnob")]).expect("written");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], RADIUS_HEADER);
        assert_eq!(lines[1], "Hobnob,0.0000005,0.0000001,0.0000006,31.7,1");
    }

    #[test]
    fn comparison_table_layout() {
        let mut buf = Vec::new();
        write_comparison_table_to_writer(&mut buf, &[summary("Rich Tea"), summary("Digestive")])
            .expect("written");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], COMPARISON_HEADER);
        assert_eq!(lines[1], "Rich Tea,12.5,0.25,0.5");
    }

    #[test]
    fn labels_with_commas_are_quoted() {
        assert_eq!(field("a,b"), "\"a,b\"");
        assert_eq!(field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(field("plain"), "plain");
    }
}
