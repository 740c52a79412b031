//! `skfair predict`: apply a saved model to new data.
use std::path::Path;

use anyhow::Result;
use log::info;

use skfair_classifiers::io::{read_csv_dataset, DatasetReaderConfig};
use skfair_classifiers::{Classifier, FairnessError};

use crate::classifiers::train::SavedModel;
use crate::util::{validate_tsv_or_csv_file, write_text_output};

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionOutput {
    pub classes: Vec<String>,
    pub predictions: Vec<String>,
    /// One row per sample, columns in `classes` order. Absent for models
    /// without probability estimates.
    pub probabilities: Option<Vec<Vec<f64>>>,
}

pub fn run_prediction<P: AsRef<Path>>(model_path: P, data_path: &str) -> Result<PredictionOutput> {
    validate_tsv_or_csv_file(data_path)?;
    let saved = SavedModel::load(model_path)?;

    let reader = DatasetReaderConfig {
        label_column: saved.label_column.clone(),
        require_label: false,
        feature_columns: Some(saved.feature_columns.clone()),
        ignore_columns: Vec::new(),
        delimiter: None,
    };
    let data = read_csv_dataset(data_path, &reader)?;
    let x = match &saved.scaler {
        Some(scaler) => scaler.transform(&data.x)?,
        None => data.x,
    };

    let predictions = saved.model.predict(&x)?;
    let probabilities = match saved.model.predict_proba(&x) {
        Ok(proba) => Some(proba.rows().into_iter().map(|row| row.to_vec()).collect()),
        Err(FairnessError::NotImplemented(what)) => {
            info!("No probabilities written: {} is not implemented", what);
            None
        }
        Err(e) => return Err(e.into()),
    };
    info!("Predicted {} samples", predictions.len());

    Ok(PredictionOutput {
        classes: saved.model.classes().to_vec(),
        predictions,
        probabilities,
    })
}

/// Tab-separated `prediction` column plus one `proba_<class>` column per class.
pub fn write_predictions(output: &PredictionOutput, path: Option<&Path>) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(Vec::new());

    let mut header = vec!["prediction".to_string()];
    if output.probabilities.is_some() {
        header.extend(output.classes.iter().map(|class| format!("proba_{}", class)));
    }
    writer.write_record(&header)?;

    for (idx, prediction) in output.predictions.iter().enumerate() {
        let mut record = vec![prediction.clone()];
        if let Some(rows) = &output.probabilities {
            record.extend(rows[idx].iter().map(|p| format!("{:.6}", p)));
        }
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("{}", e))?;
    write_text_output(path, &String::from_utf8(bytes)?)
}
