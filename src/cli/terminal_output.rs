//! Terminal progress display for pipeline runs
//!
//! [`TerminalCallback`] prints the events of a run as they arrive and keeps a
//! progress bar over the top-level pipeline's steps. Events from nested
//! pipelines are indented under the step that runs them.

use crate::cli::output::{create_progress_bar, format_event};
use crate::core::{NoopCallback, PipelineEvent, ProgressCallback};
use indicatif::ProgressBar;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Callback that displays pipeline events in the terminal
pub struct TerminalCallback {
    show_text: bool,
    state: Mutex<TerminalState>,
}

#[derive(Default)]
struct TerminalState {
    root_run: Option<Uuid>,
    progress: Option<ProgressBar>,
}

impl TerminalCallback {
    /// Create a terminal callback
    ///
    /// With `show_text` off, intermediate text output is not printed.
    pub fn new(show_text: bool) -> Self {
        Self {
            show_text,
            state: Mutex::new(TerminalState::default()),
        }
    }

    fn print(progress: Option<&ProgressBar>, line: &str) {
        match progress {
            Some(bar) => bar.println(line),
            None => println!("{}", line),
        }
    }
}

/// Callback for a CLI run
///
/// JSON output owns stdout, so nothing else is displayed in that mode.
pub fn progress_callback(json: bool) -> Arc<dyn ProgressCallback> {
    if json {
        Arc::new(NoopCallback)
    } else {
        Arc::new(TerminalCallback::new(true))
    }
}

impl ProgressCallback for TerminalCallback {
    fn on_event(&self, event: &PipelineEvent) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };

        if let PipelineEvent::PipelineStarted { run_id, steps, .. } = event {
            if state.root_run.is_none() {
                state.root_run = Some(*run_id);
                println!("{}", format_event(event));
                state.progress = Some(create_progress_bar(*steps));
                return;
            }
        }

        let is_root = state.root_run == Some(event.run_id());
        let progress = state.progress.clone();

        match event {
            PipelineEvent::Text { .. } if !self.show_text => {}
            PipelineEvent::Text { .. } => {
                let text = format_event(event);
                Self::print(progress.as_ref(), text.trim_end_matches('\n'));
            }
            PipelineEvent::StepStarted { step, .. } if is_root => {
                if let Some(bar) = &progress {
                    bar.set_message(step.clone());
                }
            }
            PipelineEvent::StepCompleted { .. } | PipelineEvent::StepFailed { .. } if is_root => {
                Self::print(progress.as_ref(), &format_event(event));
                if let Some(bar) = &progress {
                    bar.inc(1);
                }
            }
            PipelineEvent::PipelineCompleted { .. } if is_root => {
                if let Some(bar) = state.progress.take() {
                    bar.finish_and_clear();
                }
                state.root_run = None;
                println!("{}", format_event(event));
            }
            _ => {
                Self::print(progress.as_ref(), &format!("    {}", format_event(event)));
            }
        }
    }
}
