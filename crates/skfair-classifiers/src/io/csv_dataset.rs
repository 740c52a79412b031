//! Headed CSV/TSV reader producing a named design matrix and a label column.
use std::collections::HashSet;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;
use ndarray::Array2;

use crate::data::DesignMatrix;

/// Parsed dataset ready for fitting or scoring.
#[derive(Debug, Clone)]
pub struct CsvDataset {
    /// Feature matrix with the header names attached.
    pub x: DesignMatrix,
    /// Raw label cells, empty when the file has no label column.
    pub y: Vec<String>,
}

/// Configuration for reading a dataset file.
#[derive(Debug, Clone)]
pub struct DatasetReaderConfig {
    /// Column holding the class labels.
    pub label_column: String,
    /// Fail when the label column is missing (prediction inputs may lack it).
    pub require_label: bool,
    /// Optional list of feature columns to load (in order).
    /// When `None`, every column but the label and the ignored ones is a feature.
    pub feature_columns: Option<Vec<String>>,
    /// Columns to skip when auto-selecting features.
    pub ignore_columns: Vec<String>,
    /// Field delimiter; inferred from the extension (`.tsv`/`.tab` -> tab) when `None`.
    pub delimiter: Option<u8>,
}

impl Default for DatasetReaderConfig {
    fn default() -> Self {
        Self {
            label_column: "label".to_string(),
            require_label: true,
            feature_columns: None,
            ignore_columns: Vec::new(),
            delimiter: None,
        }
    }
}

impl DatasetReaderConfig {
    pub fn new(label_column: impl Into<String>) -> Self {
        Self {
            label_column: label_column.into(),
            ..Default::default()
        }
    }
}

fn delimiter_for(path: &Path, configured: Option<u8>) -> u8 {
    configured.unwrap_or_else(|| {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("tsv") | Some("tab") | Some("txt") => b'\t',
            _ => b',',
        }
    })
}

fn open_reader(path: &Path, delimiter: u8) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open dataset file: {}", path.display()))
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|header| header == name)
}

/// Read a headed CSV/TSV file into a named design matrix and label strings.
pub fn read_csv_dataset<P: AsRef<Path>>(path: P, config: &DatasetReaderConfig) -> Result<CsvDataset> {
    let path = path.as_ref();
    let mut reader = open_reader(path, delimiter_for(path, config.delimiter))?;
    let headers = reader
        .headers()
        .context("Failed to read dataset header row")?
        .clone();

    let label_idx = find_column(&headers, &config.label_column);
    if label_idx.is_none() && config.require_label {
        return Err(anyhow!(
            "Missing label column '{}' in {}",
            config.label_column,
            path.display()
        ));
    }

    let feature_indices = resolve_feature_indices(&headers, config, label_idx)?;
    if feature_indices.is_empty() {
        return Err(anyhow!("No feature columns detected in {}", path.display()));
    }

    let mut features = Vec::new();
    let mut labels = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        if let Some(idx) = label_idx {
            let label = record
                .get(idx)
                .ok_or_else(|| anyhow!("Missing label value at row {}", row_idx + 1))?;
            labels.push(label.to_string());
        }

        for &idx in &feature_indices {
            let value = record
                .get(idx)
                .ok_or_else(|| anyhow!("Missing feature value at row {}", row_idx + 1))?;
            let parsed = value.parse::<f64>().with_context(|| {
                format!(
                    "Invalid feature '{}' at row {}: {:?}",
                    headers.get(idx).unwrap_or(""),
                    row_idx + 1,
                    value
                )
            })?;
            features.push(parsed);
        }
    }

    let n_features = feature_indices.len();
    let n_samples = features.len() / n_features;
    let values = Array2::from_shape_vec((n_samples, n_features), features)
        .context("Failed to build feature matrix")?;
    let names = feature_indices
        .iter()
        .map(|&idx| headers.get(idx).unwrap_or("").to_string())
        .collect();

    Ok(CsvDataset {
        x: DesignMatrix::with_column_names(values, names)?,
        y: labels,
    })
}

/// Read whole string columns by name, in the order requested.
pub fn read_label_columns<P: AsRef<Path>>(
    path: P,
    columns: &[&str],
    delimiter: Option<u8>,
) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    let mut reader = open_reader(path, delimiter_for(path, delimiter))?;
    let headers = reader
        .headers()
        .context("Failed to read dataset header row")?
        .clone();
    let indices = columns
        .iter()
        .map(|name| {
            find_column(&headers, name)
                .ok_or_else(|| anyhow!("Missing column '{}' in {}", name, path.display()))
        })
        .collect::<Result<Vec<usize>>>()?;

    let mut out = vec![Vec::new(); columns.len()];
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;
        for (column, &idx) in out.iter_mut().zip(&indices) {
            let value = record
                .get(idx)
                .ok_or_else(|| anyhow!("Missing value for '{}' at row {}", headers.get(idx).unwrap_or(""), row_idx + 1))?;
            column.push(value.to_string());
        }
    }
    Ok(out)
}

fn resolve_feature_indices(
    headers: &StringRecord,
    config: &DatasetReaderConfig,
    label_idx: Option<usize>,
) -> Result<Vec<usize>> {
    if let Some(names) = &config.feature_columns {
        return names
            .iter()
            .map(|name| {
                find_column(headers, name)
                    .ok_or_else(|| anyhow!("Missing feature column '{}'", name))
            })
            .collect();
    }

    let ignore: HashSet<&str> = config.ignore_columns.iter().map(String::as_str).collect();
    Ok(headers
        .iter()
        .enumerate()
        .filter(|(idx, header)| Some(*idx) != label_idx && !ignore.contains(header))
        .map(|(idx, _)| idx)
        .collect())
}
