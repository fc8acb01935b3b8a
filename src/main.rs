use anyhow::{Context, Result};
use stepline::cli::commands::{parse_input_value, RunCommand, ValidateCommand};
use stepline::cli::output::*;
use stepline::cli::terminal_output::progress_callback;
use stepline::cli::{Cli, Command};
use stepline::core::config::{BuiltPipeline, PipelineConfig};
use stepline::core::{RunScope, Values};
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
    }

    Ok(())
}

async fn run_pipeline(cmd: &RunCommand) -> Result<()> {
    let config = PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline config")?;
    let pipeline = config.build()?;

    if !cmd.json {
        println!(
            "{} Loaded pipeline: {}",
            INFO,
            style(pipeline.name()).bold()
        );
    }

    let scope = RunScope::new(progress_callback(cmd.json));
    let result = match pipeline {
        BuiltPipeline::Keyed(pipeline) => {
            let inputs = keyed_inputs(cmd, pipeline.input_variables());
            if cmd.blocking {
                tokio::task::spawn_blocking(move || pipeline.invoke_in(&inputs, &scope)).await?
            } else {
                pipeline.ainvoke_in(&inputs, &scope).await
            }
        }
        BuiltPipeline::Scalar(pipeline) => {
            let text = scalar_input(cmd, pipeline.input_key())?;
            let output_key = pipeline.output_key().to_string();
            let output = if cmd.blocking {
                tokio::task::spawn_blocking(move || pipeline.invoke_in(&text, &scope)).await?
            } else {
                pipeline.ainvoke_in(&text, &scope).await
            };
            output.map(|value| {
                let mut values = Values::new();
                values.insert(output_key, serde_json::Value::String(value));
                values
            })
        }
    };

    match result {
        Ok(outputs) => {
            println!("{}", render_outputs(&outputs, cmd.json)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("\n{} {}", CROSS, style("Pipeline failed").red());
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    if !cmd.json {
        println!("{} Validating pipeline...", INFO);
    }

    let result = PipelineConfig::from_file(&cmd.file).and_then(|config| config.build());

    match result {
        Ok(pipeline) => {
            println!("{}", render_validation(&pipeline, cmd.json)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} Validation failed:", CROSS);
            eprintln!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

/// Collect keyed inputs from `--input` pairs, with `--text` filling a sole input
fn keyed_inputs(cmd: &RunCommand, input_keys: &[String]) -> Values {
    let mut inputs: Values = cmd
        .input
        .iter()
        .map(|(key, raw)| (key.clone(), parse_input_value(raw)))
        .collect();

    if let (Some(text), [key]) = (&cmd.text, input_keys) {
        inputs
            .entry(key.clone())
            .or_insert_with(|| serde_json::Value::String(text.clone()));
    }

    inputs
}

/// The text a scalar pipeline runs on: `--text`, or `--input <input_key>=...`
fn scalar_input(cmd: &RunCommand, input_key: &str) -> Result<String> {
    if let Some(text) = &cmd.text {
        return Ok(text.clone());
    }
    cmd.input
        .iter()
        .find(|(key, _)| key == input_key)
        .map(|(_, value)| value.clone())
        .with_context(|| format!("Scalar pipeline needs --text or --input {}=...", input_key))
}
