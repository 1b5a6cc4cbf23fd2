//! swdeployer - Entry Point
//!
//! Runs a software deployment or deployment group described by a definition
//! file and prints its output attributes.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::{Map, Value};
use swdeployer::app::definition::Definition;
use swdeployer::app::options::AppOptions;
use swdeployer::app::run::run;
use swdeployer::app::settings::Settings;
use swdeployer::logs::{init_logging, LogOptions};
use swdeployer::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to print version: {}", e),
        }
        return ExitCode::SUCCESS;
    }

    // Retrieve the settings file
    let settings = match cli_args.get("settings") {
        Some(path) => match Settings::load(&PathBuf::from(path)).await {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Unable to read settings file: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Settings::default(),
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level,
        json_format: settings.log_json,
        log_dir: settings.log_dir.clone(),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    let (definition, signal) = match load_inputs(&cli_args).await {
        Ok(inputs) => inputs,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let options = match AppOptions::from_settings(&settings, cli_args.contains_key("memory")) {
        Ok(options) => options,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Running swdeployer {} with options: {:?}", version.version, options);
    match run(&options, &definition, signal).await {
        Ok(report) => {
            println!(
                "{} {} after {} checks",
                report.resource_name.bold(),
                report.status.to_string().green(),
                report.checks
            );
            if let Some(result) = &report.signal_result {
                println!("signal: {}", result);
            }
            match serde_json::to_string_pretty(&report.attributes) {
                Ok(json) => println!("{}", json),
                Err(e) => error!("Failed to print attributes: {}", e),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{} {}", definition.resource_name.bold(), "FAILED".red());
            error!("Failed to run the deployment: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Read the definition and optional signal details named on the command line
async fn load_inputs(
    cli_args: &HashMap<String, String>,
) -> anyhow::Result<(Definition, Option<Map<String, Value>>)> {
    let path = cli_args
        .get("definition")
        .context("Missing --definition=<path>")?;
    let definition = Definition::load(&PathBuf::from(path))
        .await
        .with_context(|| format!("Unable to read definition {}", path))?;
    let signal = cli_args
        .get("signal")
        .map(|raw| parse_signal(raw))
        .transpose()
        .context("Invalid --signal")?;
    Ok((definition, signal))
}

fn parse_signal(raw: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(details) => Ok(details),
        _ => bail!("signal details must be a JSON object"),
    }
}
