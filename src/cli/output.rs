//! CLI output formatting

use crate::core::{callback::RunStatus, config::BuiltPipeline, step::Values, PipelineEvent};
use console::{Emoji, Style};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a progress bar over a pipeline's steps
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    let template = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}");
    if let Ok(bar_style) = template {
        progress.set_style(bar_style.progress_chars("#>-"));
    }
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Terminal style for a step color tag
pub fn color_style(color: Option<&str>) -> Style {
    match color {
        Some("blue") => Style::new().blue(),
        Some("yellow") => Style::new().yellow(),
        Some("pink") => Style::new().magenta(),
        Some("green") => Style::new().green(),
        Some("red") => Style::new().red(),
        _ => Style::new(),
    }
}

/// Format a pipeline event for display
pub fn format_event(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::PipelineStarted {
            run_id,
            pipeline,
            steps,
            ..
        } => format!(
            "{} Starting pipeline {} ({} steps, {})",
            ROCKET,
            style(pipeline).bold(),
            steps,
            style(&run_id.to_string()[..8]).dim()
        ),
        PipelineEvent::StepStarted { step, index, .. } => {
            format!("{} [{}] {}", SPINNER, index + 1, style(step).cyan())
        }
        PipelineEvent::StepCompleted {
            step, output_keys, ..
        } => format!(
            "{} {} → {}",
            CHECK,
            style(step).green(),
            style(output_keys.join(", ")).dim()
        ),
        PipelineEvent::StepFailed { step, error, .. } => {
            format!("{} {}: {}", CROSS, style(step).red(), style(error).dim())
        }
        PipelineEvent::Text {
            text, color, end, ..
        } => format!("{}{}", color_style(color.as_deref()).apply_to(text), end),
        PipelineEvent::PipelineCompleted {
            pipeline, status, ..
        } => {
            let status_str = match status {
                RunStatus::Completed => format!("completed {}", style("successfully").green()),
                RunStatus::Failed => style("failed").red().to_string(),
            };
            format!("{} Pipeline {} {}", INFO, style(pipeline).bold(), status_str)
        }
    }
}

/// Lines of a text value shown before truncating
pub const MAX_VALUE_LINES: usize = 20;

/// Format a set of values, one `key = value` entry each
pub fn format_values(values: &Values) -> String {
    values
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                serde_json::Value::String(s) => format_output(s, MAX_VALUE_LINES),
                other => other.to_string(),
            };
            format!("  {} = {}", style(key).cyan(), rendered)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a run's outputs: a JSON document, or `key = value` lines
pub fn render_outputs(outputs: &Values, json: bool) -> serde_json::Result<String> {
    if json {
        serde_json::to_string_pretty(outputs)
    } else {
        Ok(format!("\n{} Outputs:\n{}", CHECK, format_values(outputs)))
    }
}

/// Render a validated pipeline's summary: a JSON document, or a styled report
pub fn render_validation(pipeline: &BuiltPipeline, json: bool) -> serde_json::Result<String> {
    if json {
        return serde_json::to_string_pretty(&serde_json::json!({
            "name": pipeline.name(),
            "steps": pipeline.step_count(),
            "input_keys": pipeline.input_keys(),
            "output_keys": pipeline.output_keys(),
        }));
    }

    Ok([
        format!("{} Pipeline definition is valid!", CHECK),
        format!("  Name: {}", style(pipeline.name()).bold()),
        format!("  Steps: {}", style(pipeline.step_count()).cyan()),
        format!("  Inputs: {}", style(pipeline.input_keys().join(", ")).cyan()),
        format!("  Outputs: {}", style(pipeline.output_keys().join(", ")).cyan()),
    ]
    .join("\n"))
}

/// Format output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}
