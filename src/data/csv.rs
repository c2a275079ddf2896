//! Comma-delimited input parsing.
//!
//! Columns are located by header name, so column order is free and extra
//! columns (such as an exported index) are ignored. Only the requested
//! columns are parsed.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use super::{columns, Frame, TimeSeries};
use crate::error::{Error, Result};

/// Reads a table, keeping only the requested numeric and text columns.
///
/// # Errors
///
/// - [`Error::Schema`] if a requested column is absent from the header.
/// - [`Error::Parse`] if a row has too few fields or a numeric cell does
///   not parse.
pub fn read_frame<R: BufRead>(
    reader: R,
    table: &str,
    numeric: &[&str],
    text: &[&str],
) -> Result<Frame> {
    let mut lines = reader.lines().enumerate();

    let header = loop {
        match lines.next() {
            Some((_, line)) => {
                let line = line?;
                if !line.trim().is_empty() {
                    break split_record(line.trim_start_matches('\u{feff}'));
                }
            }
            None => {
                // An empty file has no header at all; report the first column.
                let column = numeric.first().or(text.first()).copied().unwrap_or("");
                return Err(Error::Schema {
                    column: column.to_string(),
                    table: table.to_string(),
                });
            }
        }
    };

    let locate = |name: &str| -> Result<usize> {
        header
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| Error::Schema {
                column: name.to_string(),
                table: table.to_string(),
            })
    };
    let numeric_idx: Vec<usize> = numeric.iter().map(|c| locate(*c)).collect::<Result<_>>()?;
    let text_idx: Vec<usize> = text.iter().map(|c| locate(*c)).collect::<Result<_>>()?;
    let width = numeric_idx
        .iter()
        .chain(text_idx.iter())
        .copied()
        .max()
        .map_or(0, |m| m + 1);

    let mut numeric_values: Vec<Vec<f64>> = vec![Vec::new(); numeric.len()];
    let mut text_values: Vec<Vec<String>> = vec![Vec::new(); text.len()];

    for (line_num, line) in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_record(&line);
        if fields.len() < width {
            return Err(Error::Parse {
                line: line_num + 1,
                message: format!("expected at least {width} fields, got {}", fields.len()),
            });
        }

        for (k, &i) in numeric_idx.iter().enumerate() {
            let cell = fields[i].trim();
            let value: f64 = cell.parse().map_err(|_| Error::Parse {
                line: line_num + 1,
                message: format!("column '{}': '{cell}' is not a number", numeric[k]),
            })?;
            numeric_values[k].push(value);
        }
        for (k, &i) in text_idx.iter().enumerate() {
            text_values[k].push(fields[i].trim().to_string());
        }
    }

    let mut frame = Frame::new(table);
    for (name, values) in numeric.iter().zip(numeric_values) {
        frame = frame.with_numeric(*name, values)?;
    }
    for (name, values) in text.iter().zip(text_values) {
        frame = frame.with_text(*name, values)?;
    }
    debug!(table, rows = frame.len(), "loaded table");
    Ok(frame)
}

/// Opens `path` and reads it with [`read_frame`].
pub fn load_frame(path: &Path, table: &str, numeric: &[&str], text: &[&str]) -> Result<Frame> {
    let file = File::open(path)?;
    read_frame(BufReader::new(file), table, numeric, text)
}

/// Reads the labelled dunking trials: `gamma, phi, eta, L, t, biscuit`.
pub fn read_measurements<R: BufRead>(reader: R) -> Result<Frame> {
    read_frame(reader, "measurements", &columns::SHARED, &[columns::BISCUIT])
}

/// Loads the labelled dunking trials from a file.
pub fn load_measurements(path: &Path) -> Result<Frame> {
    read_measurements(BufReader::new(File::open(path)?))
}

/// Reads the microscopy trials: `gamma, phi, eta, L, t, r`.
pub fn read_microscopy<R: BufRead>(reader: R) -> Result<Frame> {
    let mut cols = columns::SHARED.to_vec();
    cols.push(columns::RADIUS);
    read_frame(reader, "microscopy", &cols, &[])
}

/// Loads the microscopy trials from a file.
pub fn load_microscopy(path: &Path) -> Result<Frame> {
    read_microscopy(BufReader::new(File::open(path)?))
}

/// Reads a time-resolved series: `t, L, dL`.
pub fn read_series<R: BufRead>(reader: R, table: &str) -> Result<TimeSeries> {
    let frame = read_frame(
        reader,
        table,
        &[columns::TIME, columns::LENGTH, columns::LENGTH_ERROR],
        &[],
    )?;
    TimeSeries::from_columns(
        frame.numeric(columns::TIME)?,
        frame.numeric(columns::LENGTH)?,
        frame.numeric(columns::LENGTH_ERROR)?,
    )
}

/// Loads a time-resolved series from a file.
pub fn load_series(path: &Path) -> Result<TimeSeries> {
    let table = path.to_string_lossy();
    read_series(BufReader::new(File::open(path)?), &table)
}

/// Splits one record on commas, honouring double-quoted fields.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}
