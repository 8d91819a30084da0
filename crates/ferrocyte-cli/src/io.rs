//! CSV input and JSON output for the command-line front end.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context};
use serde::Serialize;

use ferrocyte_common::ExpressionMatrix;
use ferrocyte_markers::MarkerSpec;

/// Read a features × samples matrix.
///
/// The header row holds a corner cell followed by sample ids; every other
/// row holds a feature id followed by one value per sample.
pub fn read_matrix(path: &Path) -> anyhow::Result<ExpressionMatrix> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open matrix {}", path.display()))?;

    let samples: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .iter()
        .skip(1)
        .map(str::to_string)
        .collect();

    let mut features = Vec::new();
    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Malformed row {} in {}", line + 2, path.display()))?;
        let mut cells = record.iter();
        let Some(feature) = cells.next() else { continue };
        let values = cells
            .map(|cell| {
                cell.trim()
                    .parse::<f64>()
                    .with_context(|| format!("Non-numeric value '{}' for feature '{}' in {}", cell, feature, path.display()))
            })
            .collect::<anyhow::Result<Vec<f64>>>()?;
        features.push(feature.to_string());
        rows.push(values);
    }

    let matrix = ExpressionMatrix::from_rows(features, samples, rows)
        .with_context(|| format!("Invalid matrix in {}", path.display()))?;
    Ok(matrix)
}

/// Read a `sample,label` table and return one label per sample of
/// `samples`, in that order. Each sample may appear only once.
pub fn read_labels(path: &Path, samples: &[String]) -> anyhow::Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open labels {}", path.display()))?;

    let mut by_sample: HashMap<String, String> = HashMap::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Malformed row {} in {}", line + 2, path.display()))?;
        match (record.get(0), record.get(1)) {
            (Some(sample), Some(label)) => {
                if by_sample.insert(sample.to_string(), label.to_string()).is_some() {
                    bail!("Sample '{}' appears more than once in {}", sample, path.display());
                }
            }
            _ => bail!("Row {} in {} needs a sample and a label", line + 2, path.display()),
        }
    }

    samples
        .iter()
        .map(|s| {
            by_sample
                .get(s)
                .cloned()
                .with_context(|| format!("Sample '{}' has no label in {}", s, path.display()))
        })
        .collect()
}

pub fn read_markers(path: &Path) -> anyhow::Result<MarkerSpec> {
    let file = File::open(path).with_context(|| format!("Failed to open markers {}", path.display()))?;
    let spec = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Invalid marker specification in {}", path.display()))?;
    Ok(spec)
}

/// Pretty-print `value` as JSON to `path`, or stdout when `path` is `None`.
pub fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, value)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
