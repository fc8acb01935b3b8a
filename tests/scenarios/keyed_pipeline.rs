//! Test: keyed pipelines - validation and value threading

use crate::helpers::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use stepline::core::callback::{CollectingCallback, PipelineEvent, RunStatus};
use stepline::core::{
    KeyedPipeline, KeyedPipelineConfig, RunError, SharedStep, StepError, ValidationError,
};
use stepline::steps::{FnStep, StaticMemory};

fn chain(log: &Log) -> Vec<SharedStep> {
    vec![
        CountingStep::new("step1", "a", "b", log).shared(),
        CountingStep::new("step2", "b", "c", log).shared(),
    ]
}

/// Values flow from step to step; only the last step's outputs are returned
#[test]
fn test_threads_values_through_steps() {
    let log = Log::new();
    let pipeline = KeyedPipelineConfig::new(chain(&log), ["a"]).build().unwrap();

    let out = pipeline.invoke(&vals(&[("a", json!(1))])).unwrap();

    assert_eq!(out, vals(&[("c", json!(3))]));
    assert_eq!(
        log.entries(),
        vec!["start:step1", "end:step1", "start:step2", "end:step2"]
    );
}

#[test]
fn test_return_all_controls_inferred_outputs() {
    let log = Log::new();

    let all = KeyedPipelineConfig::new(chain(&log), ["a"])
        .with_return_all(true)
        .build()
        .unwrap();
    assert_eq!(all.output_variables(), ["b", "c"]);
    assert_eq!(
        all.invoke(&vals(&[("a", json!(1))])).unwrap(),
        vals(&[("b", json!(2)), ("c", json!(3))])
    );

    let last = KeyedPipelineConfig::new(chain(&log), ["a"])
        .with_return_all(false)
        .build()
        .unwrap();
    assert_eq!(last.output_variables(), ["c"]);
}

#[test]
fn test_declared_outputs_restrict_result() {
    let log = Log::new();
    for return_all in [true, false] {
        let pipeline = KeyedPipelineConfig::new(chain(&log), ["a"])
            .with_output_variables(["a", "b"])
            .with_return_all(return_all)
            .build()
            .unwrap();

        let out = pipeline.invoke(&vals(&[("a", json!(1))])).unwrap();
        assert_eq!(out, vals(&[("a", json!(1)), ("b", json!(2))]));
    }
}

/// Construction fails before any step runs
#[test]
fn test_invalid_chains_never_run() {
    let log = Log::new();
    let steps = vec![
        CountingStep::new("step1", "a", "b", &log).shared(),
        CountingStep::new("step2", "missing", "c", &log).shared(),
    ];

    let err = KeyedPipeline::new(KeyedPipelineConfig::new(steps, ["a"])).unwrap_err();

    match err {
        ValidationError::MissingInput {
            step,
            missing,
            known,
        } => {
            assert_eq!(step, "step2");
            assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec!["missing"]);
            assert_eq!(known.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(log.entries().is_empty());
}

#[test]
fn test_later_step_cannot_shadow_earlier_name() {
    let log = Log::new();
    let steps = vec![
        CountingStep::new("step1", "a", "b", &log).shared(),
        CountingStep::new("step2", "b", "b", &log).shared(),
    ];

    let err = KeyedPipelineConfig::new(steps, ["a"]).build().unwrap_err();
    assert!(matches!(
        err,
        ValidationError::DuplicateOutput { ref step, ref duplicates }
            if step == "step2" && duplicates.contains("b")
    ));
}

#[test]
fn test_undeclared_output_rejected() {
    let log = Log::new();
    let err = KeyedPipelineConfig::new(chain(&log), ["a"])
        .with_output_variables(["c", "d"])
        .build()
        .unwrap_err();

    assert!(matches!(
        err,
        ValidationError::UnknownOutput { ref missing, .. } if missing.contains("d")
    ));
}

#[test]
fn test_memory_overlapping_inputs_rejected_first() {
    // The step's own inputs are unsatisfiable too; the overlap wins
    let step: SharedStep = Arc::new(FnStep::new("never", &["nowhere"], &["z"], |_| {
        panic!("must not run")
    }));
    let memory = StaticMemory::new(vals(&[("input", json!("m")), ("y", json!("m"))]));

    let err = KeyedPipelineConfig::new(vec![step], ["input"])
        .with_memory(Arc::new(memory))
        .build()
        .unwrap_err();

    assert!(matches!(
        err,
        ValidationError::OverlappingMemoryKeys { ref overlapping, .. } if overlapping.contains("input")
    ));
}

#[test]
fn test_memory_values_reach_steps() {
    let greet: SharedStep = Arc::new(FnStep::new("greet", &["name", "greeting"], &["line"], |inputs| {
        let line = format!(
            "{} {}",
            inputs["greeting"].as_str().unwrap_or_default(),
            inputs["name"].as_str().unwrap_or_default()
        );
        Ok(vals(&[("line", json!(line))]))
    }));
    let memory = StaticMemory::new(vals(&[("greeting", json!("Ahoy"))]));

    let pipeline = KeyedPipelineConfig::new(vec![greet], ["name"])
        .with_memory(Arc::new(memory))
        .build()
        .unwrap();

    assert_eq!(pipeline.memory_variables(), ["greeting"]);
    let out = pipeline.invoke(&vals(&[("name", json!("Ada"))])).unwrap();
    assert_eq!(out, vals(&[("line", json!("Ahoy Ada"))]));
}

/// A second invocation never sees values from the first
#[test]
fn test_invocations_are_isolated() {
    let log = Log::new();
    let step1 = CountingStep::new("step1", "a", "b", &log);
    let step2 = CountingStep::new("step2", "b", "c", &log);
    let seen = step2.seen();
    let pipeline = KeyedPipelineConfig::new(vec![step1.shared(), step2.shared()], ["a"])
        .build()
        .unwrap();

    let first = pipeline
        .invoke(&vals(&[("a", json!(1)), ("extra", json!("only once"))]))
        .unwrap();
    let second = pipeline.invoke(&vals(&[("a", json!(10))])).unwrap();

    assert_eq!(first, vals(&[("c", json!(3))]));
    assert_eq!(second, vals(&[("c", json!(12))]));

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], vec!["a", "extra", "b"]);
    assert_eq!(seen[1], vec!["a", "b"]);
}

#[test]
fn test_missing_caller_input_fails_before_steps() {
    let log = Log::new();
    let pipeline = KeyedPipelineConfig::new(chain(&log), ["a"]).build().unwrap();

    let err = pipeline.invoke(&vals(&[("b", json!(1))])).unwrap_err();

    assert!(matches!(err, RunError::MissingInputs { ref missing } if missing.contains("a")));
    assert!(log.entries().is_empty());
}

/// Step errors surface unchanged and stop the run
#[test]
fn test_step_failure_aborts_run() {
    let log = Log::new();
    let steps = vec![
        FailingStep::shared("fetch", "a", "b", &log),
        CountingStep::new("after", "b", "c", &log).shared(),
    ];
    let pipeline = KeyedPipelineConfig::new(steps, ["a"]).build().unwrap();
    let callback = Arc::new(CollectingCallback::new());

    let err = pipeline
        .invoke_with_callback(&vals(&[("a", json!(1))]), callback.clone())
        .unwrap_err();

    match err {
        RunError::Step(StepError::Failed { step, message }) => {
            assert_eq!(step, "fetch");
            assert_eq!(message, "upstream unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(log.entries(), vec!["start:fetch"]);

    let last = callback.events().pop().unwrap();
    assert!(matches!(
        last,
        PipelineEvent::PipelineCompleted { status: RunStatus::Failed, .. }
    ));
}

#[test]
fn test_empty_pipeline_with_declared_outputs() {
    let pipeline = KeyedPipelineConfig::new(vec![], ["a"])
        .with_output_variables(["a"])
        .build()
        .unwrap();

    let out = pipeline.invoke(&vals(&[("a", json!(7))])).unwrap();
    assert_eq!(out, vals(&[("a", json!(7))]));
}

#[test]
fn test_empty_pipeline_cannot_infer_last_outputs() {
    let err = KeyedPipelineConfig::new(vec![], ["a"]).build().unwrap_err();
    assert_eq!(err, ValidationError::EmptyPipeline);

    let all = KeyedPipelineConfig::new(vec![], ["a"])
        .with_return_all(true)
        .build()
        .unwrap();
    assert!(all.output_variables().is_empty());
}

#[test]
fn test_empty_pipeline_memory_overlap_reported() {
    let memory = StaticMemory::new(vals(&[("input", json!("m"))]));
    let err = KeyedPipelineConfig::new(vec![], ["input"])
        .with_memory(Arc::new(memory))
        .with_output_variables(["input"])
        .build()
        .unwrap_err();

    assert!(matches!(err, ValidationError::OverlappingMemoryKeys { .. }));
}

/// A key listed twice by one step is still produced once
#[test]
fn test_repeated_output_key_is_usable() {
    let dup: SharedStep = Arc::new(FnStep::new("dup", &["a"], &["b", "b"], |inputs| {
        Ok(vals(&[("b", json!(inputs["a"].as_i64().unwrap_or_default() + 1))]))
    }));
    let pipeline = KeyedPipelineConfig::new(vec![dup], ["a"]).build().unwrap();

    let out = pipeline.invoke(&vals(&[("a", json!(0))])).unwrap();
    assert_eq!(out, vals(&[("b", json!(1))]));
}

/// Each step is awaited to completion before the next starts
#[tokio::test]
async fn test_suspended_steps_do_not_interleave() {
    let log = Log::new();
    let steps = vec![
        CountingStep::new("slow", "a", "b", &log)
            .with_delay(Duration::from_millis(30))
            .shared(),
        CountingStep::new("fast", "b", "c", &log).shared(),
    ];
    let pipeline = KeyedPipelineConfig::new(steps, ["a"]).build().unwrap();

    let out = pipeline.ainvoke(&vals(&[("a", json!(1))])).await.unwrap();

    assert_eq!(out, vals(&[("c", json!(3))]));
    assert_eq!(
        log.entries(),
        vec!["start:slow", "end:slow", "start:fast", "end:fast"]
    );
}

#[tokio::test]
async fn test_blocking_and_suspending_agree() {
    let log = Log::new();
    let pipeline = KeyedPipelineConfig::new(chain(&log), ["a"])
        .with_return_all(true)
        .build()
        .unwrap();
    let inputs = vals(&[("a", json!(5))]);

    let sync_events = Arc::new(CollectingCallback::new());
    let async_events = Arc::new(CollectingCallback::new());
    let blocking = pipeline
        .invoke_with_callback(&inputs, sync_events.clone())
        .unwrap();
    let suspended = pipeline
        .ainvoke_with_callback(&inputs, async_events.clone())
        .await
        .unwrap();

    assert_eq!(blocking, suspended);
    assert_eq!(event_names(&sync_events), event_names(&async_events));
    assert_eq!(
        event_names(&sync_events),
        vec![
            "pipeline_started",
            "step_started",
            "step_completed",
            "step_started",
            "step_completed",
            "pipeline_completed",
        ]
    );
}

/// One pipeline serves concurrent callers, each with its own values
#[tokio::test]
async fn test_concurrent_invocations() {
    let log = Log::new();
    let steps = vec![
        CountingStep::new("step1", "a", "b", &log)
            .with_delay(Duration::from_millis(10))
            .shared(),
        CountingStep::new("step2", "b", "c", &log).shared(),
    ];
    let pipeline = Arc::new(KeyedPipelineConfig::new(steps, ["a"]).build().unwrap());

    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.ainvoke(&vals(&[("a", json!(i * 100))])).await })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        let out = task.await.unwrap().unwrap();
        assert_eq!(out, vals(&[("c", json!(i as i64 * 100 + 2))]));
    }
}

fn event_names(callback: &CollectingCallback) -> Vec<String> {
    callback
        .events()
        .iter()
        .map(|event| {
            serde_json::to_value(event).unwrap()["event"]
                .as_str()
                .unwrap()
                .to_string()
        })
        .collect()
}
