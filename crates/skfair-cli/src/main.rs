use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use skfair_classifiers::report::OutputFormat;
use skfair_cli::classifiers::predict::{run_prediction, write_predictions};
use skfair_cli::classifiers::train::{run_training, TrainConfig};
use skfair_cli::report::{run_report, ReportArgs};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("SKFAIR_LOG", "error,skfair=info"))
        .init();

    let matches = Command::new("skfair")
        .version(clap::crate_version!())
        .about("Fairness-constrained linear classifiers: train, predict and audit")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Fit a fair classifier from a JSON configuration file")
                .arg(
                    Arg::new("config")
                        .help("Path to training configuration file")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("train_data")
                        .short('d')
                        .long("train_data")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "Path to training data (*.tsv or *.csv). Overrides the training \
                             data file specified in the configuration file.",
                        )
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output_file")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .help(
                            "File path that the fitted model (JSON) will be written to. \
                             Overrides the output file specified in the configuration file.",
                        )
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("multi_class")
                        .long("multi-class")
                        .help("Override the multiclass composition from the configuration file.")
                        .value_parser(["binary", "ovr", "ovo"])
                        .value_hint(ValueHint::Other),
                ),
        )
        .subcommand(
            Command::new("predict")
                .about("Predict labels with a fitted model")
                .arg(
                    Arg::new("model")
                        .help("Path to the fitted model file (*.json)")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("data")
                        .help("Path to the input data file (*.tsv or *.csv)")
                        .required(true)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output")
                        .help("Path to write the predictions (TSV). Defaults to stdout.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("report")
                .about("Per-group fairness report of true and predicted labels")
                .arg(
                    Arg::new("data")
                        .help("Path to a file holding the label and group columns")
                        .required(true)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("y_true")
                        .long("y-true")
                        .help("Column of true labels")
                        .required(true)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                )
                .arg(
                    Arg::new("y_pred")
                        .long("y-pred")
                        .help("Column of predicted labels")
                        .required(true)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                )
                .arg(
                    Arg::new("group")
                        .long("group")
                        .help("Column of group membership")
                        .required(true)
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                )
                .arg(
                    Arg::new("labels")
                        .long("labels")
                        .help("Negative and positive label, in that order")
                        .num_args(2)
                        .value_names(["NEGATIVE", "POSITIVE"])
                        .value_parser(clap::builder::NonEmptyStringValueParser::new()),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .help("Output format")
                        .default_value("text")
                        .value_parser(["text", "table", "dict", "json", "html"]),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output")
                        .help("Path to write the report. Defaults to stdout.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("predict", sub_m)) => handle_predict(sub_m),
        Some(("report", sub_m)) => handle_report(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config_path: &PathBuf = matches
        .get_one("config")
        .context("A configuration file is required")?;
    log::info!("[skfair::train] Training from config: {:?}", config_path);

    let config = TrainConfig::from_arguments(config_path, matches)?;
    match run_training(&config) {
        Ok(summary) => {
            eprintln!(
                "[skfair::train] Fitted {} samples over classes {:?}; model written to {}",
                summary.n_samples, summary.classes, config.output_file
            );
            if let Some(report) = summary.report {
                println!("{}", report);
            }
            Ok(())
        }
        Err(e) => {
            log::error!("Training failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let model_path: &PathBuf = matches.get_one("model").context("A model file is required")?;
    let data_path: &String = matches.get_one("data").context("A data file is required")?;
    let output_path: Option<&PathBuf> = matches.get_one("output_file");

    match run_prediction(model_path, data_path) {
        Ok(output) => write_predictions(&output, output_path.map(PathBuf::as_path)),
        Err(e) => {
            log::error!("Prediction failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_report(matches: &ArgMatches) -> Result<()> {
    let required = |name: &str| -> Result<String> {
        matches
            .get_one::<String>(name)
            .cloned()
            .with_context(|| format!("--{} is required", name))
    };
    let labels = matches
        .get_many::<String>("labels")
        .map(|values| values.cloned().collect::<Vec<String>>())
        .and_then(|values| match values.as_slice() {
            [negative, positive] => Some((negative.clone(), positive.clone())),
            _ => None,
        });
    let format: OutputFormat = required("format")?.parse()?;

    let args = ReportArgs {
        data: required("data")?,
        y_true_column: required("y_true")?,
        y_pred_column: required("y_pred")?,
        group_column: required("group")?,
        format,
        labels,
        output: matches.get_one::<PathBuf>("output_file").cloned(),
    };

    match run_report(&args) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::error!("Report failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
