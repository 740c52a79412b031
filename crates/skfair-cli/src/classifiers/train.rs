//! `skfair train`: fit a fair model from a CSV/TSV file and save it as JSON.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ArgMatches;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use skfair_classifiers::io::{read_csv_dataset, read_label_columns, DatasetReaderConfig};
use skfair_classifiers::preprocessing::Scaler;
use skfair_classifiers::report::{fairness_report, FairnessReport, ReportConfig};
use skfair_classifiers::{
    build_model, Classifier, FairModel, ModelConfig, MultiClass, SensitiveColumns,
};

use crate::util::validate_tsv_or_csv_file;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub train_data: String,
    pub output_file: String,
    pub label_column: String,
    /// Feature columns in order; every other non-label column when unset.
    pub feature_columns: Option<Vec<String>>,
    pub ignore_columns: Vec<String>,
    /// Standardize non-sensitive features before fitting.
    pub standardize: bool,
    /// Column whose values group the training predictions in a fairness report.
    pub report_group_column: Option<String>,
    pub model: ModelConfig<String>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            train_data: String::new(),
            output_file: String::from("skfair_model.json"),
            label_column: String::from("label"),
            feature_columns: None,
            ignore_columns: Vec::new(),
            standardize: false,
            report_group_column: None,
            model: ModelConfig::default(),
        }
    }
}

impl TrainConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_arguments(config_path: &PathBuf, matches: &ArgMatches) -> Result<Self> {
        let mut config = TrainConfig::load(config_path)?;

        // Apply CLI overrides
        if let Some(train_data) = matches.get_one::<String>("train_data") {
            config.train_data = train_data.clone();
        }
        validate_tsv_or_csv_file(&config.train_data)?;

        if let Some(output_file) = matches.get_one::<String>("output_file") {
            config.output_file = output_file.clone();
        }

        if let Some(multi_class) = matches.get_one::<String>("multi_class") {
            config.model.multi_class = multi_class.parse::<MultiClass>()?;
        }

        Ok(config)
    }

    /// A column the model reads as a feature, either listed explicitly or named
    /// as sensitive.
    fn is_feature_column(&self, column: &str) -> bool {
        let listed = self
            .feature_columns
            .as_ref()
            .is_some_and(|columns| columns.iter().any(|c| c == column));
        let sensitive = match &self.model.params.sensitive_cols {
            SensitiveColumns::Names(names) => names.iter().any(|name| name == column),
            SensitiveColumns::Indices(_) => false,
        };
        listed || sensitive
    }

    fn reader_config(&self) -> DatasetReaderConfig {
        let mut ignore_columns = self.ignore_columns.clone();
        if let Some(group) = &self.report_group_column {
            if !self.is_feature_column(group) && !ignore_columns.contains(group) {
                ignore_columns.push(group.clone());
            }
        }
        DatasetReaderConfig {
            label_column: self.label_column.clone(),
            require_label: true,
            feature_columns: self.feature_columns.clone(),
            ignore_columns,
            delimiter: None,
        }
    }
}

/// Everything `skfair predict` needs to apply a trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedModel {
    pub feature_columns: Vec<String>,
    pub label_column: String,
    pub scaler: Option<Scaler>,
    pub model: FairModel<String>,
}

impl SavedModel {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse model file: {}", path.display()))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write model file: {}", path.display()))
    }
}

#[derive(Debug)]
pub struct TrainSummary {
    pub n_samples: usize,
    pub classes: Vec<String>,
    pub report: Option<FairnessReport>,
}

pub fn run_training(config: &TrainConfig) -> Result<TrainSummary> {
    validate_tsv_or_csv_file(&config.train_data)?;
    let data = read_csv_dataset(&config.train_data, &config.reader_config())?;
    let feature_columns = data
        .x
        .column_names()
        .map(|names| names.to_vec())
        .unwrap_or_default();
    info!(
        "Loaded {} samples with {} features from {}",
        data.x.nrows(),
        data.x.ncols(),
        config.train_data
    );

    let (scaler, x) = if config.standardize {
        let (scaler, x) = Scaler::fit_transform(&data.x, &config.model.params.sensitive_cols)?;
        (Some(scaler), x)
    } else {
        (None, data.x)
    };

    let mut model = build_model(config.model.clone());
    model
        .fit(&x, &data.y)
        .with_context(|| format!("Failed to fit {}", model.name()))?;
    info!(
        "Fitted {} ({:?}) on classes {:?}",
        model.name(),
        model.multi_class(),
        model.classes()
    );

    let report = match &config.report_group_column {
        Some(column) if model.classes().len() == 2 => {
            let groups = read_label_columns(&config.train_data, &[column.as_str()], None)?
                .pop()
                .unwrap_or_default();
            let predictions = model.predict(&x)?;
            Some(fairness_report(
                &data.y,
                &predictions,
                &groups,
                None,
                &ReportConfig::default(),
            )?)
        }
        Some(_) => {
            warn!(
                "Skipping the fairness report: it needs a binary target, found {} classes",
                model.classes().len()
            );
            None
        }
        None => None,
    };

    let summary = TrainSummary {
        n_samples: x.nrows(),
        classes: model.classes().to_vec(),
        report,
    };

    SavedModel {
        feature_columns,
        label_column: config.label_column.clone(),
        scaler,
        model,
    }
    .save(&config.output_file)?;
    info!("Model written to {}", config.output_file);

    Ok(summary)
}
