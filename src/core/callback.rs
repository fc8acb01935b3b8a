//! Observation channel for pipeline runs
//!
//! Pipelines report progress through a [`ProgressCallback`]. Every run gets a
//! [`RunScope`], and every step invoked by that run gets a child scope derived
//! from it, so nested pipelines report under their parent's run id.
//!
//! Callbacks are purely observational: nothing they do can change the values
//! flowing between steps.
//!
//! # Example
//!
//! ```
//! use stepline::core::callback::{PipelineEvent, ProgressCallback};
//!
//! struct Printer;
//!
//! impl ProgressCallback for Printer {
//!     fn on_event(&self, event: &PipelineEvent) {
//!         if let PipelineEvent::Text { text, end, .. } = event {
//!             print!("{}{}", text, end);
//!         }
//!     }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Colors cycled through when tagging per-step text output
pub const STEP_COLORS: &[&str] = &["blue", "yellow", "pink", "green", "red"];

/// Final status of a run, as reported to callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// Events emitted while a pipeline runs
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    PipelineStarted {
        run_id: Uuid,
        pipeline: String,
        steps: usize,
        at: DateTime<Utc>,
    },
    StepStarted {
        run_id: Uuid,
        step: String,
        index: usize,
        at: DateTime<Utc>,
    },
    StepCompleted {
        run_id: Uuid,
        step: String,
        index: usize,
        output_keys: Vec<String>,
        at: DateTime<Utc>,
    },
    StepFailed {
        run_id: Uuid,
        step: String,
        index: usize,
        error: String,
        at: DateTime<Utc>,
    },
    /// Intermediate text output, tagged for presentation
    Text {
        run_id: Uuid,
        text: String,
        color: Option<String>,
        end: String,
    },
    PipelineCompleted {
        run_id: Uuid,
        pipeline: String,
        status: RunStatus,
        at: DateTime<Utc>,
    },
}

impl PipelineEvent {
    pub fn run_id(&self) -> Uuid {
        match self {
            PipelineEvent::PipelineStarted { run_id, .. }
            | PipelineEvent::StepStarted { run_id, .. }
            | PipelineEvent::StepCompleted { run_id, .. }
            | PipelineEvent::StepFailed { run_id, .. }
            | PipelineEvent::Text { run_id, .. }
            | PipelineEvent::PipelineCompleted { run_id, .. } => *run_id,
        }
    }
}

/// Receives events as a pipeline runs
///
/// This trait is object-safe and is shared as `Arc<dyn ProgressCallback>`.
pub trait ProgressCallback: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Callback that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallback;

impl ProgressCallback for NoopCallback {
    fn on_event(&self, _event: &PipelineEvent) {}
}

/// Callback that records every event it receives
#[derive(Debug, Default)]
pub struct CollectingCallback {
    events: Mutex<Vec<PipelineEvent>>,
}

impl CollectingCallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Text payloads of all `Text` events, in order
    pub fn texts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PipelineEvent::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }
}

impl ProgressCallback for CollectingCallback {
    fn on_event(&self, event: &PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Scoped handle for one run (or one step of a run)
#[derive(Clone)]
pub struct RunScope {
    pub run_id: Uuid,
    pub parent_run_id: Option<Uuid>,
    pub tag: Option<String>,
    callback: Arc<dyn ProgressCallback>,
}

impl RunScope {
    /// Create a root scope reporting to `callback`
    pub fn new(callback: Arc<dyn ProgressCallback>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            parent_run_id: None,
            tag: None,
            callback,
        }
    }

    /// Root scope that reports nowhere
    pub fn noop() -> Self {
        Self::new(Arc::new(NoopCallback))
    }

    /// Derive a scope for a nested run, sharing this scope's callback
    pub fn child(&self, tag: Option<&str>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            parent_run_id: Some(self.run_id),
            tag: tag.map(str::to_string),
            callback: self.callback.clone(),
        }
    }

    pub fn callback(&self) -> Arc<dyn ProgressCallback> {
        self.callback.clone()
    }

    pub fn emit(&self, event: PipelineEvent) {
        self.callback.on_event(&event);
    }

    /// Report a piece of intermediate text output
    pub fn on_text(&self, text: &str, color: Option<&str>, end: &str) {
        self.emit(PipelineEvent::Text {
            run_id: self.run_id,
            text: text.to_string(),
            color: color.map(str::to_string),
            end: end.to_string(),
        });
    }
}

impl Default for RunScope {
    fn default() -> Self {
        Self::noop()
    }
}

impl std::fmt::Debug for RunScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunScope")
            .field("run_id", &self.run_id)
            .field("parent_run_id", &self.parent_run_id)
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

/// Assign a color to each step index, cycling through [`STEP_COLORS`]
pub fn color_mapping(steps: usize) -> Vec<&'static str> {
    (0..steps).map(|i| STEP_COLORS[i % STEP_COLORS.len()]).collect()
}
